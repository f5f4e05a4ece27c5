//! First-person fly view: heading/pitch/roll around a geographic eye position,
//! WASD movement, speed levels, and a tour of preset locations.

use bevy::math::{DQuat, DVec3};
use bevy::prelude::*;

use crate::geo::{rebase_origin_near, GeoPosition, SceneOrigin};

pub const INITIAL_HEADING: f64 = 0.0;
/// 0° looks straight down, 90° at the horizon.
pub const INITIAL_PITCH: f64 = 89.0;
pub const INITIAL_ROLL: f64 = 0.0;
/// Horizontal field of view in degrees.
pub const INITIAL_FIELD_OF_VIEW: f64 = 45.0;
pub const INITIAL_EYE: GeoPosition = GeoPosition::from_degrees(45.0, -120.0, 2000.0);

const MIN_ALTITUDE: f64 = 10.0;
const TURN_RATE: f64 = 45.0;
const PITCH_RATE: f64 = 30.0;
/// Metres per second, cycled with Shift.
pub const SPEED_LEVELS: [f64; 4] = [50.0, 250.0, 1_000.0, 5_000.0];

pub struct TourStop {
    pub name: &'static str,
    pub eye: GeoPosition,
    pub heading: f64,
    pub pitch: f64,
}

/// Space bar cycles through these.
pub const TOUR: &[TourStop] = &[
    TourStop {
        name: "Cascade Range",
        eye: INITIAL_EYE,
        heading: INITIAL_HEADING,
        pitch: INITIAL_PITCH,
    },
    TourStop {
        name: "Arlington, Virginia",
        eye: GeoPosition::from_degrees(38.8790, -77.1059, 400.0),
        heading: 0.0,
        pitch: 75.0,
    },
    TourStop {
        name: "Grand Canyon",
        eye: GeoPosition::from_degrees(36.0544, -112.1401, 3_000.0),
        heading: 20.0,
        pitch: 80.0,
    },
    TourStop {
        name: "Mount Everest",
        eye: GeoPosition::from_degrees(27.9000, 86.9250, 9_500.0),
        heading: 0.0,
        pitch: 85.0,
    },
    TourStop {
        name: "Mont Blanc",
        eye: GeoPosition::from_degrees(45.7800, 6.8650, 5_500.0),
        heading: 180.0,
        pitch: 82.0,
    },
];

#[derive(Component, Clone, Debug, PartialEq)]
pub struct FlyView {
    pub eye: GeoPosition,
    pub heading: f64,
    pub pitch: f64,
    pub roll: f64,
    pub field_of_view: f64,
}

impl Default for FlyView {
    fn default() -> Self {
        Self {
            eye: INITIAL_EYE,
            heading: INITIAL_HEADING,
            pitch: INITIAL_PITCH,
            roll: INITIAL_ROLL,
            field_of_view: INITIAL_FIELD_OF_VIEW,
        }
    }
}

impl FlyView {
    /// View direction and camera up vector in globe coordinates.
    pub fn orientation(&self) -> (DVec3, DVec3) {
        let frame = self.eye.frame();
        let heading = self.heading.to_radians();
        let pitch = self.pitch.to_radians();
        let level = frame.north * heading.cos() + frame.east * heading.sin();
        let forward = -frame.up * pitch.cos() + level * pitch.sin();
        let up = frame.up * pitch.sin() + level * pitch.cos();
        let up = DQuat::from_axis_angle(forward, -self.roll.to_radians()) * up;
        (forward, up)
    }

    pub fn transform(&self, origin: &SceneOrigin) -> Transform {
        let (forward, up) = self.orientation();
        Transform::from_translation(origin.to_scene(self.eye.to_cartesian()))
            .looking_to(forward.as_vec3(), up.as_vec3())
    }

    /// Moves along the view direction and sideways, in metres.
    pub fn translate(&mut self, forward: f64, right: f64) {
        let (ahead, up) = self.orientation();
        let side = ahead.cross(up);
        let moved = self.eye.to_cartesian() + ahead * forward + side * right;
        let mut eye = GeoPosition::from_cartesian(moved);
        eye.altitude = eye.altitude.max(MIN_ALTITUDE);
        self.eye = eye;
    }

    pub fn turn(&mut self, heading: f64, pitch: f64) {
        self.heading = (self.heading + heading).rem_euclid(360.0);
        self.pitch = (self.pitch + pitch).clamp(1.0, 179.0);
    }

    pub fn jump_to(&mut self, stop: &TourStop) {
        self.eye = stop.eye;
        self.heading = stop.heading;
        self.pitch = stop.pitch;
        self.roll = INITIAL_ROLL;
    }
}

/// Vertical FOV for a horizontal FOV at the given aspect ratio.
pub fn vertical_fov(horizontal_degrees: f64, aspect_ratio: f32) -> f32 {
    let half = (horizontal_degrees.to_radians() / 2.0).tan();
    (2.0 * (half / aspect_ratio.max(1e-3) as f64).atan()) as f32
}

#[derive(Resource, Default, Debug)]
pub struct FlySpeed {
    level: usize,
}

impl FlySpeed {
    pub fn metres_per_second(&self) -> f64 {
        SPEED_LEVELS[self.level]
    }

    pub fn cycle(&mut self) -> f64 {
        self.level = (self.level + 1) % SPEED_LEVELS.len();
        self.metres_per_second()
    }
}

#[derive(Resource, Default, Debug)]
pub struct Tour {
    stop: usize,
}

impl Tour {
    pub fn advance(&mut self) -> &'static TourStop {
        self.stop = (self.stop + 1) % TOUR.len();
        &TOUR[self.stop]
    }
}

/// Sent when the viewer switches speed or jumps to another location.
#[derive(Event, Clone, Debug, PartialEq)]
pub enum NavigationEvent {
    SpeedChanged(f64),
    Arrived(&'static str),
}

pub fn fly_camera_plugin(app: &mut App) {
    app.init_resource::<FlySpeed>()
        .init_resource::<Tour>()
        .add_event::<NavigationEvent>()
        .add_systems(Update, (fly_input_system, apply_fly_view).chain());
}

/// Quits the app on Escape, with or without the fly controls.
pub fn exit_on_escape(keys: Res<ButtonInput<KeyCode>>, mut exit: EventWriter<AppExit>) {
    if keys.just_pressed(KeyCode::Escape) {
        exit.send(AppExit::Success);
    }
}

fn fly_input_system(
    keys: Res<ButtonInput<KeyCode>>,
    time: Res<Time>,
    mut speed: ResMut<FlySpeed>,
    mut tour: ResMut<Tour>,
    mut views: Query<&mut FlyView>,
    mut events: EventWriter<NavigationEvent>,
) {
    let Ok(mut view) = views.get_single_mut() else {
        return;
    };

    if keys.any_just_pressed([KeyCode::ShiftLeft, KeyCode::ShiftRight]) {
        events.send(NavigationEvent::SpeedChanged(speed.cycle()));
    }
    if keys.just_pressed(KeyCode::Space) {
        let stop = tour.advance();
        view.jump_to(stop);
        events.send(NavigationEvent::Arrived(stop.name));
        return;
    }

    let dt = time.delta_secs_f64();
    let axis = |pos: KeyCode, neg: KeyCode| -> f64 {
        f64::from(u8::from(keys.pressed(pos))) - f64::from(u8::from(keys.pressed(neg)))
    };

    let forward = axis(KeyCode::KeyW, KeyCode::KeyS);
    let right = axis(KeyCode::KeyD, KeyCode::KeyA);
    if forward != 0.0 || right != 0.0 {
        let step = speed.metres_per_second() * dt;
        view.translate(forward * step, right * step);
    }

    let turn = axis(KeyCode::ArrowRight, KeyCode::ArrowLeft);
    let tilt = axis(KeyCode::ArrowUp, KeyCode::ArrowDown);
    if turn != 0.0 || tilt != 0.0 {
        view.turn(turn * TURN_RATE * dt, tilt * PITCH_RATE * dt);
    }
}

/// Writes the rig transform from its fly view, re-centering the scene
/// origin under the viewer when needed.
pub fn apply_fly_view(
    mut origin: ResMut<SceneOrigin>,
    mut rigs: Query<(&FlyView, &mut Transform), Changed<FlyView>>,
) {
    for (view, mut transform) in &mut rigs {
        let eye = view.eye.to_cartesian();
        if origin.0 == DVec3::ZERO {
            origin.0 = eye;
        } else if rebase_origin_near(origin.bypass_change_detection(), eye) {
            origin.set_changed();
        }
        *transform = view.transform(&origin);
    }
}
