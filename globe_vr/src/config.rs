//! Env parsing, defaults, and constants.

use std::path::PathBuf;
use std::str::FromStr;

use bevy::log::warn;
use bevy::prelude::{Res, Resource};
use thiserror::Error;

const STEREO_MODE_VAR: &str = "WORLDVR_STEREO_MODE";
const RENDER_WIDTH_VAR: &str = "WORLDVR_RENDER_WIDTH";
const RENDER_HEIGHT_VAR: &str = "WORLDVR_RENDER_HEIGHT";
const SHAPES_ARCHIVE_VAR: &str = "WORLDVR_SHAPES_ARCHIVE";
const BALLOON_HTML_VAR: &str = "WORLDVR_BALLOON_HTML";
const EYE_SEPARATION_VAR: &str = "WORLDVR_EYE_SEPARATION";
const WINDOWED_VAR: &str = "WORLDVR_WINDOWED";

pub const DEFAULT_RENDER_WIDTH: u32 = 1280;
pub const DEFAULT_RENDER_HEIGHT: u32 = 800;
pub const DEFAULT_EYE_SEPARATION: f32 = 0.065;
pub const DEFAULT_SHAPES_ARCHIVE: &str = "assets/data/demo_shapes.zip";
pub const DEFAULT_BALLOON_HTML: &str = "assets/data/balloon.html";

/// How the two eye views reach the screen.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum StereoMode {
    /// Red channel from the left eye, green and blue from the right.
    #[default]
    RedBlue,
    /// Each eye gets half of the window.
    SideBySide,
    /// Hardware stereo output.
    Device,
    /// Single centered view.
    Mono,
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("unknown stereo mode {0:?} (expected redblue, sidebyside, device or none)")]
    UnknownStereoMode(String),
    #[error("invalid value {value:?} for {var}")]
    InvalidValue { var: &'static str, value: String },
}

impl FromStr for StereoMode {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "redblue" | "anaglyph" => Ok(StereoMode::RedBlue),
            "sidebyside" | "sbs" => Ok(StereoMode::SideBySide),
            "device" => Ok(StereoMode::Device),
            "none" | "mono" => Ok(StereoMode::Mono),
            other => Err(ConfigError::UnknownStereoMode(other.to_string())),
        }
    }
}

/// Viewer settings resolved from the environment.
#[derive(Resource, Clone, Debug, PartialEq)]
pub struct ViewerConfig {
    pub stereo_mode: StereoMode,
    pub render_width: u32,
    pub render_height: u32,
    pub eye_separation: f32,
    pub shapes_archive: PathBuf,
    pub balloon_html: PathBuf,
    pub windowed: bool,
    /// Values that were rejected while reading the environment.
    pub issues: Vec<ConfigError>,
}

impl Default for ViewerConfig {
    fn default() -> Self {
        Self {
            stereo_mode: StereoMode::default(),
            render_width: DEFAULT_RENDER_WIDTH,
            render_height: DEFAULT_RENDER_HEIGHT,
            eye_separation: DEFAULT_EYE_SEPARATION,
            shapes_archive: PathBuf::from(DEFAULT_SHAPES_ARCHIVE),
            balloon_html: PathBuf::from(DEFAULT_BALLOON_HTML),
            windowed: false,
            issues: Vec::new(),
        }
    }
}

/// Reads `WORLDVR_*` variables. Invalid values are replaced by their defaults
/// and kept in [`ViewerConfig::issues`] until logging is up.
pub fn viewer_config() -> ViewerConfig {
    let defaults = ViewerConfig::default();
    let mut issues = Vec::new();
    ViewerConfig {
        stereo_mode: env_or(STEREO_MODE_VAR, defaults.stereo_mode, &mut issues, |raw| {
            raw.parse()
        }),
        render_width: env_or(RENDER_WIDTH_VAR, defaults.render_width, &mut issues, |raw| {
            parse_positive(RENDER_WIDTH_VAR, raw)
        }),
        render_height: env_or(RENDER_HEIGHT_VAR, defaults.render_height, &mut issues, |raw| {
            parse_positive(RENDER_HEIGHT_VAR, raw)
        }),
        eye_separation: env_or(
            EYE_SEPARATION_VAR,
            defaults.eye_separation,
            &mut issues,
            |raw| {
                raw.trim()
                    .parse::<f32>()
                    .ok()
                    .filter(|v| v.is_finite() && *v >= 0.0)
                    .ok_or_else(|| invalid(EYE_SEPARATION_VAR, raw))
            },
        ),
        shapes_archive: std::env::var(SHAPES_ARCHIVE_VAR)
            .map(PathBuf::from)
            .unwrap_or(defaults.shapes_archive),
        balloon_html: std::env::var(BALLOON_HTML_VAR)
            .map(PathBuf::from)
            .unwrap_or(defaults.balloon_html),
        windowed: std::env::var(WINDOWED_VAR)
            .map(|raw| matches!(raw.trim(), "1" | "true" | "yes"))
            .unwrap_or(defaults.windowed),
        issues,
    }
}

/// Startup system: logs the values [`viewer_config`] rejected.
pub fn report_config_issues(config: Res<ViewerConfig>) {
    for issue in &config.issues {
        warn!("worldvr: {issue}; using default");
    }
}

fn env_or<T>(
    var: &str,
    default: T,
    issues: &mut Vec<ConfigError>,
    parse: impl FnOnce(&str) -> Result<T, ConfigError>,
) -> T {
    let Ok(raw) = std::env::var(var) else {
        return default;
    };
    parse(&raw).unwrap_or_else(|err| {
        issues.push(err);
        default
    })
}

fn parse_positive(var: &'static str, raw: &str) -> Result<u32, ConfigError> {
    raw.trim()
        .parse::<u32>()
        .ok()
        .filter(|v| *v > 0)
        .ok_or_else(|| invalid(var, raw))
}

fn invalid(var: &'static str, raw: &str) -> ConfigError {
    ConfigError::InvalidValue {
        var,
        value: raw.to_string(),
    }
}
