//! Stereo eye rig: one or two cameras under the fly view, presented as a
//! red/blue anaglyph, side by side, or mono.

use bevy::prelude::*;
use bevy::render::camera::{RenderTarget, Viewport};
use bevy::render::render_asset::RenderAssetUsages;
use bevy::render::render_resource::{
    AsBindGroup, Extent3d, ShaderRef, TextureDimension, TextureFormat, TextureUsages,
};
use bevy::sprite::{Material2d, Material2dPlugin};
use bevy::window::{PrimaryWindow, WindowResized};

use crate::camera::fly::{vertical_fov, FlyView};
use crate::config::StereoMode;
use crate::messages::Eye;

const ANAGLYPH_SHADER: &str = "shaders/anaglyph.wgsl";
const NEAR_PLANE: f32 = 1.0;
const FAR_PLANE: f32 = 5.0e7;
/// Eye separation grows with altitude so the terrain keeps visible depth.
const HYPERSTEREO_ALTITUDE: f64 = 10.0;

/// Stereo mode the rig actually uses after device fallback.
#[derive(Resource, Clone, Copy, Debug, PartialEq)]
pub struct ActiveStereo {
    pub requested: StereoMode,
    pub mode: StereoMode,
    pub eye_separation: f32,
}

impl ActiveStereo {
    /// There is no hardware stereo output, so `Device` degrades to side by side.
    pub fn resolve(requested: StereoMode, eye_separation: f32) -> Self {
        let mode = match requested {
            StereoMode::Device => StereoMode::SideBySide,
            other => other,
        };
        Self {
            requested,
            mode,
            eye_separation,
        }
    }

    /// Warning text when the requested mode could not be honoured.
    pub fn fallback_notice(&self) -> Option<String> {
        (self.requested != self.mode).then(|| {
            format!(
                "worldvr: stereo {:?} unavailable, falling back to {:?}",
                self.requested, self.mode
            )
        })
    }

    pub fn eyes(&self) -> &'static [Eye] {
        match self.mode {
            StereoMode::Mono => &[Eye::Center],
            _ => &[Eye::Left, Eye::Right],
        }
    }

    /// Baseline between the eyes in metres at the given altitude.
    pub fn baseline(&self, altitude: f64) -> f32 {
        let scale = (altitude / HYPERSTEREO_ALTITUDE).max(1.0);
        (self.eye_separation as f64 * scale) as f32
    }
}

/// Root entity holding the [`FlyView`]; eye cameras are its children.
#[derive(Component)]
pub struct ViewRig;

#[derive(Component, Clone, Copy, Debug, PartialEq, Eq)]
pub struct EyeCamera {
    pub eye: Eye,
}

impl EyeCamera {
    fn side(&self) -> f32 {
        match self.eye {
            Eye::Left => -0.5,
            Eye::Right => 0.5,
            Eye::Center => 0.0,
        }
    }
}

/// Combines the two eye images: red from the left, green and blue from the right.
#[derive(Asset, TypePath, AsBindGroup, Debug, Clone)]
pub struct AnaglyphMaterial {
    #[texture(0)]
    #[sampler(1)]
    pub left: Handle<Image>,
    #[texture(2)]
    #[sampler(3)]
    pub right: Handle<Image>,
}

impl Material2d for AnaglyphMaterial {
    fn fragment_shader() -> ShaderRef {
        ANAGLYPH_SHADER.into()
    }
}

/// Full-window quad showing the anaglyph composite.
#[derive(Component)]
pub struct AnaglyphScreen;

#[derive(Resource, Clone, Debug)]
pub struct AnaglyphTargets {
    pub left: Handle<Image>,
    pub right: Handle<Image>,
}

pub fn stereo_plugin(app: &mut App) {
    app.add_plugins(Material2dPlugin::<AnaglyphMaterial>::default())
        .add_systems(Startup, (report_stereo_fallback, spawn_view_rig))
        .add_systems(
            Update,
            (
                fit_side_by_side_viewports,
                resize_anaglyph_targets,
                update_eye_offsets,
                sync_eye_projection,
            ),
        );
}

fn report_stereo_fallback(stereo: Res<ActiveStereo>) {
    if let Some(notice) = stereo.fallback_notice() {
        warn!("{notice}");
    }
}

/// Left and right halves of a window, as physical (position, size).
pub fn split_viewports(physical: UVec2) -> [(UVec2, UVec2); 2] {
    let half = (physical.x / 2).max(1);
    let height = physical.y.max(1);
    [
        (UVec2::ZERO, UVec2::new(half, height)),
        (
            UVec2::new(half, 0),
            UVec2::new(physical.x.saturating_sub(half).max(1), height),
        ),
    ]
}

fn eye_target_image(size: UVec2) -> Image {
    let extent = Extent3d {
        width: size.x.max(1),
        height: size.y.max(1),
        ..default()
    };
    let mut image = Image::new_fill(
        extent,
        TextureDimension::D2,
        &[0, 0, 0, 255],
        TextureFormat::Bgra8UnormSrgb,
        RenderAssetUsages::default(),
    );
    image.texture_descriptor.usage =
        TextureUsages::TEXTURE_BINDING | TextureUsages::COPY_DST | TextureUsages::RENDER_ATTACHMENT;
    image
}

fn eye_camera(
    eye: Eye,
    order: isize,
    target: RenderTarget,
    viewport: Option<Viewport>,
    clear_color: ClearColorConfig,
) -> impl Bundle {
    (
        EyeCamera { eye },
        Camera3d::default(),
        Camera {
            order,
            target,
            viewport,
            clear_color,
            ..default()
        },
        Projection::Perspective(PerspectiveProjection {
            near: NEAR_PLANE,
            far: FAR_PLANE,
            ..default()
        }),
        Transform::default(),
    )
}

fn spawn_view_rig(
    mut commands: Commands,
    stereo: Res<ActiveStereo>,
    windows: Query<&Window, With<PrimaryWindow>>,
    mut images: ResMut<Assets<Image>>,
    mut meshes: ResMut<Assets<Mesh>>,
    mut anaglyphs: ResMut<Assets<AnaglyphMaterial>>,
) {
    let (physical, logical) = windows
        .get_single()
        .map(|w| (w.physical_size(), w.size()))
        .unwrap_or((UVec2::new(1280, 800), Vec2::new(1280.0, 800.0)));

    let rig = commands
        .spawn((ViewRig, FlyView::default(), Transform::default(), Visibility::default()))
        .id();

    match stereo.mode {
        StereoMode::Mono => {
            let camera = commands
                .spawn(eye_camera(
                    Eye::Center,
                    0,
                    RenderTarget::default(),
                    None,
                    ClearColorConfig::Default,
                ))
                .id();
            commands.entity(rig).add_child(camera);
        }
        StereoMode::SideBySide | StereoMode::Device => {
            let [left, right] = split_viewports(physical);
            let cameras = [
                (Eye::Left, left, ClearColorConfig::Default),
                (Eye::Right, right, ClearColorConfig::None),
            ]
            .into_iter()
            .enumerate()
            .map(|(order, (eye, (position, size), clear))| {
                let viewport = Viewport {
                    physical_position: position,
                    physical_size: size,
                    ..default()
                };
                commands
                    .spawn(eye_camera(
                        eye,
                        order as isize,
                        RenderTarget::default(),
                        Some(viewport),
                        clear,
                    ))
                    .id()
            })
            .collect::<Vec<_>>();
            commands.entity(rig).add_children(&cameras);
        }
        StereoMode::RedBlue => {
            let left = images.add(eye_target_image(physical));
            let right = images.add(eye_target_image(physical));
            let cameras = [(Eye::Left, left.clone()), (Eye::Right, right.clone())]
                .into_iter()
                .map(|(eye, image)| {
                    commands
                        .spawn(eye_camera(
                            eye,
                            -1,
                            RenderTarget::Image(image),
                            None,
                            ClearColorConfig::Default,
                        ))
                        .id()
                })
                .collect::<Vec<_>>();
            commands.entity(rig).add_children(&cameras);

            commands.spawn((Camera2d, Camera { order: 1, ..default() }));
            commands.spawn((
                AnaglyphScreen,
                Mesh2d(meshes.add(Rectangle::new(1.0, 1.0))),
                MeshMaterial2d(anaglyphs.add(AnaglyphMaterial {
                    left: left.clone(),
                    right: right.clone(),
                })),
                Transform::from_scale(logical.extend(1.0)),
            ));
            commands.insert_resource(AnaglyphTargets { left, right });
        }
    }
    info!("worldvr: stereo mode {:?}", stereo.mode);
}

fn fit_side_by_side_viewports(
    stereo: Res<ActiveStereo>,
    mut resized: EventReader<WindowResized>,
    windows: Query<&Window, With<PrimaryWindow>>,
    mut cameras: Query<(&EyeCamera, &mut Camera)>,
) {
    if resized.read().last().is_none() || stereo.mode != StereoMode::SideBySide {
        return;
    }
    let Ok(window) = windows.get_single() else {
        return;
    };
    let [left, right] = split_viewports(window.physical_size());
    for (eye, mut camera) in &mut cameras {
        let (position, size) = if eye.eye == Eye::Right { right } else { left };
        camera.viewport = Some(Viewport {
            physical_position: position,
            physical_size: size,
            ..default()
        });
    }
}

fn resize_anaglyph_targets(
    targets: Option<Res<AnaglyphTargets>>,
    mut resized: EventReader<WindowResized>,
    windows: Query<&Window, With<PrimaryWindow>>,
    mut images: ResMut<Assets<Image>>,
    mut screens: Query<&mut Transform, With<AnaglyphScreen>>,
) {
    if resized.read().last().is_none() {
        return;
    }
    let (Some(targets), Ok(window)) = (targets, windows.get_single()) else {
        return;
    };
    let physical = window.physical_size().max(UVec2::ONE);
    for handle in [&targets.left, &targets.right] {
        if let Some(image) = images.get_mut(handle) {
            image.resize(Extent3d {
                width: physical.x,
                height: physical.y,
                ..default()
            });
        }
    }
    for mut transform in &mut screens {
        transform.scale = window.size().extend(1.0);
    }
}

fn update_eye_offsets(
    stereo: Res<ActiveStereo>,
    rigs: Query<&FlyView, (With<ViewRig>, Changed<FlyView>)>,
    mut eyes: Query<(&EyeCamera, &mut Transform)>,
) {
    let Ok(view) = rigs.get_single() else {
        return;
    };
    let baseline = stereo.baseline(view.eye.altitude);
    for (eye, mut transform) in &mut eyes {
        transform.translation = Vec3::X * eye.side() * baseline;
    }
}

fn sync_eye_projection(
    rigs: Query<&FlyView, With<ViewRig>>,
    mut eyes: Query<&mut Projection, With<EyeCamera>>,
) {
    let Ok(view) = rigs.get_single() else {
        return;
    };
    for mut projection in &mut eyes {
        let Projection::Perspective(perspective) = &*projection else {
            continue;
        };
        let fov = vertical_fov(view.field_of_view, perspective.aspect_ratio);
        if (perspective.fov - fov).abs() <= f32::EPSILON {
            continue;
        }
        if let Projection::Perspective(perspective) = &mut *projection {
            perspective.fov = fov;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn device_falls_back_to_side_by_side() {
        let stereo = ActiveStereo::resolve(StereoMode::Device, 0.065);
        assert_eq!(stereo.mode, StereoMode::SideBySide);
        assert_eq!(stereo.eyes(), &[Eye::Left, Eye::Right]);
        assert_eq!(
            stereo.fallback_notice().as_deref(),
            Some("worldvr: stereo Device unavailable, falling back to SideBySide")
        );
        assert_eq!(ActiveStereo::resolve(StereoMode::RedBlue, 0.065).fallback_notice(), None);
        assert_eq!(ActiveStereo::resolve(StereoMode::Mono, 0.065).eyes(), &[Eye::Center]);
    }

    #[test]
    fn baseline_scales_above_threshold() {
        let stereo = ActiveStereo::resolve(StereoMode::RedBlue, 0.065);
        assert!((stereo.baseline(2.0) - 0.065).abs() < 1e-6);
        assert!((stereo.baseline(2000.0) - 13.0).abs() < 1e-3);
    }

    #[test]
    fn viewports_cover_the_window() {
        let [(lp, ls), (rp, rs)] = split_viewports(UVec2::new(1281, 800));
        assert_eq!(lp, UVec2::ZERO);
        assert_eq!(ls, UVec2::new(640, 800));
        assert_eq!(rp, UVec2::new(640, 0));
        assert_eq!(rs, UVec2::new(641, 800));
    }

    #[test]
    fn eyes_sit_on_either_side() {
        assert!(EyeCamera { eye: Eye::Left }.side() < 0.0);
        assert!(EyeCamera { eye: Eye::Right }.side() > 0.0);
        assert_eq!(EyeCamera { eye: Eye::Center }.side(), 0.0);
    }
}
