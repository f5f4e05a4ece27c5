//! Status overlay: view position, speed, stereo mode, FPS. Toggled with `H`.

use bevy::diagnostic::{DiagnosticsStore, FrameTimeDiagnosticsPlugin};
use bevy::prelude::*;
use bevy_egui::{egui, EguiContexts};

use crate::camera::{ActiveStereo, FlySpeed, FlyView};
use crate::scene::ShapeSummary;

#[derive(Resource, Default)]
pub struct StatusHud {
    pub visible: bool,
}

pub fn status_hud_plugin(app: &mut App) {
    app.add_plugins(FrameTimeDiagnosticsPlugin)
        .init_resource::<StatusHud>()
        .add_systems(Update, (toggle_status_hud, status_hud_system).chain());
}

fn toggle_status_hud(keys: Res<ButtonInput<KeyCode>>, mut hud: ResMut<StatusHud>) {
    if keys.just_pressed(KeyCode::KeyH) {
        hud.visible = !hud.visible;
    }
}

fn status_hud_system(
    mut contexts: EguiContexts,
    hud: Res<StatusHud>,
    diagnostics: Res<DiagnosticsStore>,
    views: Query<&FlyView>,
    speed: Option<Res<FlySpeed>>,
    stereo: Option<Res<ActiveStereo>>,
    shapes: Option<Res<ShapeSummary>>,
) {
    if !hud.visible {
        return;
    }
    let Ok(view) = views.get_single() else {
        return;
    };
    let fps = diagnostics
        .get(&FrameTimeDiagnosticsPlugin::FPS)
        .and_then(|d| d.smoothed())
        .unwrap_or(0.0);

    egui::Window::new("WorldVR")
        .anchor(egui::Align2::LEFT_TOP, [10.0, 10.0])
        .resizable(false)
        .collapsible(false)
        .title_bar(false)
        .frame(
            egui::Frame::default()
                .fill(egui::Color32::from_rgba_premultiplied(15, 15, 25, 210))
                .inner_margin(egui::Margin::same(12))
                .corner_radius(egui::CornerRadius::same(6)),
        )
        .show(contexts.ctx_mut(), |ui| {
            ui.style_mut().override_text_style = Some(egui::TextStyle::Monospace);
            ui.visuals_mut().override_text_color = Some(egui::Color32::from_rgb(200, 220, 240));

            ui.label(
                egui::RichText::new(format!(
                    "{:.4}, {:.4}",
                    view.eye.latitude(),
                    view.eye.longitude()
                ))
                .size(16.0)
                .color(egui::Color32::from_rgb(100, 220, 180)),
            );
            ui.add_space(4.0);
            ui.label(format!("Alt      {}", format_altitude(view.eye.altitude)));
            ui.label(format!("Heading  {:.0}°", view.heading));
            ui.label(format!("Pitch    {:.0}°", view.pitch));
            if let Some(speed) = speed {
                ui.label(format!("Speed    {:.0} m/s", speed.metres_per_second()));
            }
            ui.add_space(4.0);

            ui.separator();
            if let Some(stereo) = stereo {
                ui.label(format!("Stereo   {:?}", stereo.mode));
            }
            if let Some(shapes) = shapes {
                ui.label(format!("Shapes   {} ({} sides)", shapes.shapes, shapes.sides));
            }
            ui.label(format!("FPS  {fps:.0}"));
        });
}

fn format_altitude(metres: f64) -> String {
    if metres >= 10_000.0 {
        format!("{:.1} km", metres / 1_000.0)
    } else {
        format!("{metres:.0} m")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn altitude_switches_to_kilometres() {
        assert_eq!(format_altitude(2000.0), "2000 m");
        assert_eq!(format_altitude(12_345.0), "12.3 km");
    }
}
