//! SDK entry point: a builder composing the viewer plugins into an [`App`].

use bevy::prelude::*;
use bevy::window::{MonitorSelection, WindowMode};
use bevy_egui::EguiPlugin;

use crate::camera::{
    apply_fly_view, exit_on_escape, fly_camera_plugin, stereo_plugin, ActiveStereo,
};
use crate::config::{self, report_config_issues, ViewerConfig};
use crate::geo::geo_plugin;
use crate::scene::{placemark_plugin, setup_scene, shapes_plugin};
use crate::ui::{balloon_plugin, message_hud_plugin, status_hud_plugin};

/// Builder for a WorldVR app with selectable features.
pub struct WorldVrBuilder {
    config: Option<ViewerConfig>,
    window_title: String,
    clear_color: Color,
    enable_fly_camera: bool,
    enable_messages: bool,
    enable_shapes: bool,
    enable_placemark: bool,
    enable_status_hud: bool,
}

impl Default for WorldVrBuilder {
    fn default() -> Self {
        Self {
            config: None,
            window_title: "WorldVR".to_string(),
            clear_color: Color::BLACK,
            enable_fly_camera: true,
            enable_messages: true,
            enable_shapes: true,
            enable_placemark: true,
            enable_status_hud: true,
        }
    }
}

impl WorldVrBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Use an explicit configuration instead of reading the environment.
    pub fn config(mut self, config: ViewerConfig) -> Self {
        self.config = Some(config);
        self
    }

    pub fn window_title(mut self, title: impl Into<String>) -> Self {
        self.window_title = title.into();
        self
    }

    pub fn clear_color(mut self, color: Color) -> Self {
        self.clear_color = color;
        self
    }

    pub fn disable_fly_camera(mut self) -> Self {
        self.enable_fly_camera = false;
        self
    }

    pub fn disable_messages(mut self) -> Self {
        self.enable_messages = false;
        self
    }

    pub fn disable_shapes(mut self) -> Self {
        self.enable_shapes = false;
        self
    }

    pub fn disable_placemark(mut self) -> Self {
        self.enable_placemark = false;
        self
    }

    pub fn disable_status_hud(mut self) -> Self {
        self.enable_status_hud = false;
        self
    }

    /// Build the Bevy app with the selected configuration and plugins.
    pub fn build(self) -> App {
        let config = self.config.unwrap_or_else(config::viewer_config);
        let stereo = ActiveStereo::resolve(config.stereo_mode, config.eye_separation);

        let mut app = App::new();
        app.add_plugins(DefaultPlugins.set(WindowPlugin {
            primary_window: Some(primary_window(&config, self.window_title)),
            ..default()
        }))
        .add_plugins(EguiPlugin)
        .insert_resource(ClearColor(self.clear_color))
        .insert_resource(stereo)
        .insert_resource(config)
        .add_plugins((geo_plugin, stereo_plugin))
        .add_systems(Startup, (report_config_issues, setup_scene))
        .add_systems(Update, exit_on_escape);

        if self.enable_fly_camera {
            app.add_plugins(fly_camera_plugin);
        } else {
            app.add_systems(Update, apply_fly_view);
        }
        if self.enable_messages {
            app.add_plugins(message_hud_plugin);
        }
        if self.enable_shapes {
            app.add_plugins(shapes_plugin);
        }
        if self.enable_placemark {
            app.add_plugins((placemark_plugin, balloon_plugin));
        }
        if self.enable_status_hud {
            app.add_plugins(status_hud_plugin);
        }

        app
    }
}

/// Undecorated borderless fullscreen, or a plain window at the render
/// resolution when `windowed` is set.
pub fn primary_window(config: &ViewerConfig, title: String) -> Window {
    let resolution = (config.render_width as f32, config.render_height as f32);
    if config.windowed {
        Window {
            title,
            resolution: resolution.into(),
            ..default()
        }
    } else {
        Window {
            title,
            resolution: resolution.into(),
            decorations: false,
            mode: WindowMode::BorderlessFullscreen(MonitorSelection::Primary),
            ..default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fullscreen_unless_windowed() {
        let config = ViewerConfig::default();
        let window = primary_window(&config, "WorldVR".into());
        assert!(!window.decorations);
        assert_eq!(
            window.mode,
            WindowMode::BorderlessFullscreen(MonitorSelection::Primary)
        );

        let windowed = ViewerConfig {
            windowed: true,
            ..ViewerConfig::default()
        };
        let window = primary_window(&windowed, "WorldVR".into());
        assert!(window.decorations);
        assert_eq!(window.mode, WindowMode::Windowed);
        assert_eq!(window.resolution.width(), 1280.0);
        assert_eq!(window.resolution.height(), 800.0);
    }
}
