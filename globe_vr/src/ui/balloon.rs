//! Placemark picking, its per-eye label, and the balloon panel.
//!
//! Picking is a manual ray-AABB test so egui keeps its own pointer input.

use bevy::math::DVec3;
use bevy::prelude::*;
use bevy::render::camera::RenderTarget;
use bevy::render::primitives::Aabb;
use bevy::window::PrimaryWindow;
use bevy_egui::{egui, EguiContexts};

use crate::camera::EyeCamera;
use crate::geo::SceneOrigin;
use crate::messages::Eye;
use crate::scene::Placemark;

const LABEL_FONT_SIZE: f32 = 14.0;
const LABEL_OFFSET: Vec2 = Vec2::new(14.0, -8.0);

/// Label node for one placemark as seen by one eye camera.
#[derive(Component, Clone, Copy, Debug)]
pub struct PlacemarkLabel {
    pub placemark: Entity,
    pub camera: Entity,
}

pub fn balloon_plugin(app: &mut App) {
    app.add_systems(
        Update,
        (
            click_placemark_system,
            spawn_placemark_labels,
            place_placemark_labels,
            balloon_panel_system,
        ),
    );
}

/// Maps a window cursor position into a camera's viewport. Cameras rendering
/// to an image cover the whole window at the image resolution.
pub fn cursor_in_viewport(
    cursor: Vec2,
    window_size: Vec2,
    viewport: Rect,
    renders_to_image: bool,
) -> Option<Vec2> {
    if renders_to_image {
        if window_size.x <= 0.0 || window_size.y <= 0.0 {
            return None;
        }
        return Some(cursor / window_size * viewport.size());
    }
    viewport.contains(cursor).then(|| cursor - viewport.min)
}

fn click_placemark_system(
    mouse: Res<ButtonInput<MouseButton>>,
    windows: Query<&Window, With<PrimaryWindow>>,
    cameras: Query<(&Camera, &GlobalTransform, &EyeCamera)>,
    mut contexts: EguiContexts,
    mut placemarks: Query<(&mut Placemark, &GlobalTransform, &Aabb)>,
) {
    if !mouse.just_pressed(MouseButton::Left) {
        return;
    }
    if contexts.ctx_mut().is_pointer_over_area() {
        return;
    }

    let Ok(window) = windows.get_single() else {
        return;
    };
    let Some(cursor) = window.cursor_position() else {
        return;
    };

    let ray = cameras.iter().find_map(|(camera, transform, eye)| {
        if eye.eye == Eye::Right && matches!(camera.target, RenderTarget::Image(_)) {
            return None;
        }
        let viewport = camera.logical_viewport_rect()?;
        let renders_to_image = matches!(camera.target, RenderTarget::Image(_));
        let local = cursor_in_viewport(cursor, window.size(), viewport, renders_to_image)?;
        camera.viewport_to_world(transform, local).ok()
    });
    let Some(ray) = ray else {
        return;
    };

    let mut best_hit: Option<(Mut<Placemark>, f32)> = None;
    for (placemark, transform, aabb) in &mut placemarks {
        if let Some(dist) = ray_aabb_test(ray.origin, *ray.direction, transform, aabb) {
            if best_hit.as_ref().is_none_or(|(_, d)| dist < *d) {
                best_hit = Some((placemark, dist));
            }
        }
    }
    if let Some((mut placemark, _)) = best_hit {
        placemark.toggle_balloon();
        debug!(
            "worldvr: balloon {}",
            if placemark.balloon_open { "opened" } else { "closed" }
        );
    }
}

fn ray_aabb_test(
    ray_origin: Vec3,
    ray_dir: Vec3,
    transform: &GlobalTransform,
    aabb: &Aabb,
) -> Option<f32> {
    let translation = transform.translation();
    let center: Vec3 = aabb.center.into();
    let half: Vec3 = aabb.half_extents.into();
    ray_aabb_intersect(
        ray_origin,
        ray_dir,
        translation + center - half,
        translation + center + half,
    )
}

fn ray_aabb_intersect(origin: Vec3, dir: Vec3, aabb_min: Vec3, aabb_max: Vec3) -> Option<f32> {
    let inv_dir = 1.0 / dir;
    let t1 = (aabb_min - origin) * inv_dir;
    let t2 = (aabb_max - origin) * inv_dir;
    let t_min = t1.min(t2);
    let t_max = t1.max(t2);
    let t_enter = t_min.x.max(t_min.y).max(t_min.z);
    let t_exit = t_max.x.min(t_max.y).min(t_max.z);
    if t_enter <= t_exit && t_exit > 0.0 {
        Some(t_enter.max(0.0))
    } else {
        None
    }
}

fn spawn_placemark_labels(
    mut commands: Commands,
    new_cameras: Query<Entity, Added<EyeCamera>>,
    placemarks: Query<(Entity, &Placemark)>,
) {
    for camera in &new_cameras {
        for (entity, placemark) in &placemarks {
            commands.spawn((
                PlacemarkLabel {
                    placemark: entity,
                    camera,
                },
                Text::new(placemark.label.clone()),
                TextFont {
                    font_size: LABEL_FONT_SIZE,
                    ..default()
                },
                TextColor(Color::srgb(1.0, 0.95, 0.6)),
                Node {
                    position_type: PositionType::Absolute,
                    ..default()
                },
                Visibility::Hidden,
                TargetCamera(camera),
            ));
        }
    }
}

/// A point on the globe faces the viewer when the viewer is on the outer side
/// of its tangent plane.
pub fn faces_viewer(point: DVec3, viewer: DVec3) -> bool {
    (viewer - point).dot(point) > 0.0
}

fn place_placemark_labels(
    origin: Res<SceneOrigin>,
    cameras: Query<(&Camera, &GlobalTransform)>,
    placemarks: Query<&GlobalTransform, With<Placemark>>,
    mut labels: Query<(&PlacemarkLabel, &mut Node, &mut Visibility)>,
) {
    for (label, mut node, mut visibility) in &mut labels {
        let (Ok((camera, camera_transform)), Ok(placemark)) =
            (cameras.get(label.camera), placemarks.get(label.placemark))
        else {
            continue;
        };
        let world = placemark.translation();
        let facing = faces_viewer(
            origin.from_scene(world),
            origin.from_scene(camera_transform.translation()),
        );
        match camera.world_to_viewport(camera_transform, world) {
            Ok(point) if facing => {
                let point = point + LABEL_OFFSET;
                node.left = Val::Px(point.x);
                node.top = Val::Px(point.y);
                visibility.set_if_neq(Visibility::Inherited);
            }
            _ => {
                visibility.set_if_neq(Visibility::Hidden);
            }
        }
    }
}

fn balloon_panel_system(mut contexts: EguiContexts, mut placemarks: Query<&mut Placemark>) {
    for mut placemark in &mut placemarks {
        if !placemark.balloon_open {
            continue;
        }
        let mut open = true;
        let title = placemark
            .balloon
            .title
            .clone()
            .unwrap_or_else(|| placemark.label.clone());
        egui::Window::new(title)
            .open(&mut open)
            .collapsible(false)
            .resizable(false)
            .default_width(320.0)
            .frame(balloon_frame())
            .show(contexts.ctx_mut(), |ui| {
                apply_balloon_style(ui);
                for paragraph in &placemark.balloon.paragraphs {
                    ui.label(paragraph);
                    ui.add_space(4.0);
                }
                ui.add_space(8.0);
                ui.label(
                    egui::RichText::new(format!(
                        "{:.4}, {:.4}",
                        placemark.position.latitude(),
                        placemark.position.longitude()
                    ))
                    .size(11.0)
                    .color(egui::Color32::from_rgb(120, 120, 140)),
                );
            });
        if !open {
            placemark.balloon_open = false;
        }
    }
}

fn balloon_frame() -> egui::Frame {
    egui::Frame::default()
        .fill(egui::Color32::from_rgba_premultiplied(15, 15, 25, 220))
        .inner_margin(egui::Margin::same(14))
}

fn apply_balloon_style(ui: &mut egui::Ui) {
    ui.visuals_mut().override_text_color = Some(egui::Color32::from_rgb(200, 220, 240));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geo::EARTH_RADIUS;

    #[test]
    fn ray_hits_box_in_front_only() {
        let (min, max) = (Vec3::new(-1.0, -1.0, 4.0), Vec3::new(1.0, 1.0, 6.0));
        assert_eq!(ray_aabb_intersect(Vec3::ZERO, Vec3::Z, min, max), Some(4.0));
        assert_eq!(ray_aabb_intersect(Vec3::ZERO, -Vec3::Z, min, max), None);
    }

    #[test]
    fn cursor_maps_into_side_by_side_halves() {
        let window = Vec2::new(1280.0, 800.0);
        let right = Rect::new(640.0, 0.0, 1280.0, 800.0);
        assert_eq!(
            cursor_in_viewport(Vec2::new(700.0, 100.0), window, right, false),
            Some(Vec2::new(60.0, 100.0))
        );
        assert_eq!(cursor_in_viewport(Vec2::new(100.0, 100.0), window, right, false), None);
    }

    #[test]
    fn cursor_scales_onto_image_targets() {
        let image = Rect::new(0.0, 0.0, 2560.0, 1600.0);
        assert_eq!(
            cursor_in_viewport(Vec2::new(640.0, 400.0), Vec2::new(1280.0, 800.0), image, true),
            Some(Vec2::new(1280.0, 800.0))
        );
    }

    #[test]
    fn far_side_of_globe_is_hidden() {
        let point = DVec3::new(0.0, 0.0, EARTH_RADIUS);
        assert!(faces_viewer(point, DVec3::new(0.0, 0.0, EARTH_RADIUS + 2000.0)));
        assert!(!faces_viewer(point, DVec3::new(0.0, 0.0, -EARTH_RADIUS - 2000.0)));
    }
}
