//! Clickable placemark whose balloon shows an HTML document as text.

use std::path::Path;

use bevy::prelude::*;
use scraper::{Html, Selector};

use crate::config::ViewerConfig;
use crate::geo::{GeoAnchor, GeoPosition};

pub const PLACEMARK_POSITION: GeoPosition = GeoPosition::from_degrees(38.8826, -77.1059, 0.0);
pub const PLACEMARK_LABEL: &str = "Click to open balloon";
const PIN_HEIGHT: f64 = 30.0;
const PIN_RADIUS: f32 = 12.0;
const BLOCK_ELEMENTS: &str = "h1, h2, h3, h4, p, li, td";

/// Balloon text: a title plus paragraphs.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct BalloonContent {
    pub title: Option<String>,
    pub paragraphs: Vec<String>,
}

#[derive(Component, Clone, Debug)]
pub struct Placemark {
    pub position: GeoPosition,
    pub label: String,
    pub balloon: BalloonContent,
    pub balloon_open: bool,
}

impl Placemark {
    pub fn toggle_balloon(&mut self) {
        self.balloon_open = !self.balloon_open;
    }
}

/// Reads the balloon document, or the error text shown in its place.
pub fn read_balloon_content(path: &Path) -> String {
    match std::fs::read_to_string(path) {
        Ok(html) => html,
        Err(err) => {
            warn!("worldvr: cannot read balloon {}: {err}", path.display());
            format!("Exception attempting to read file {}", path.display())
        }
    }
}

fn collapse_whitespace(text: impl Iterator<Item = impl AsRef<str>>) -> String {
    let mut out = String::new();
    for piece in text {
        for word in piece.as_ref().split_whitespace() {
            if !out.is_empty() {
                out.push(' ');
            }
            out.push_str(word);
        }
    }
    out
}

/// Extracts readable text from `html`. Plain text passes through as a single
/// paragraph.
pub fn balloon_text(html: &str) -> BalloonContent {
    let document = Html::parse_document(html);
    let title = Selector::parse("title")
        .ok()
        .and_then(|selector| document.select(&selector).next())
        .map(|title| collapse_whitespace(title.text()))
        .filter(|title| !title.is_empty());

    let mut paragraphs: Vec<String> = Selector::parse(BLOCK_ELEMENTS)
        .map(|selector| {
            document
                .select(&selector)
                .map(|element| collapse_whitespace(element.text()))
                .filter(|text| !text.is_empty())
                .collect()
        })
        .unwrap_or_default();

    if paragraphs.is_empty() {
        let body = Selector::parse("body")
            .ok()
            .and_then(|selector| document.select(&selector).next())
            .map(|body| collapse_whitespace(body.text()))
            .unwrap_or_else(|| collapse_whitespace(document.root_element().text()));
        if !body.is_empty() {
            paragraphs.push(body);
        }
    }

    BalloonContent { title, paragraphs }
}

pub fn placemark_plugin(app: &mut App) {
    app.add_systems(Startup, spawn_placemark);
}

pub fn spawn_placemark(
    mut commands: Commands,
    config: Res<ViewerConfig>,
    mut meshes: ResMut<Assets<Mesh>>,
    mut materials: ResMut<Assets<StandardMaterial>>,
) {
    let balloon = balloon_text(&read_balloon_content(&config.balloon_html));
    let pin = GeoPosition {
        altitude: PIN_HEIGHT,
        ..PLACEMARK_POSITION
    };
    commands.spawn((
        Placemark {
            position: PLACEMARK_POSITION,
            label: PLACEMARK_LABEL.to_string(),
            balloon,
            balloon_open: false,
        },
        Mesh3d(meshes.add(Sphere::new(PIN_RADIUS).mesh().uv(24, 12))),
        MeshMaterial3d(materials.add(StandardMaterial {
            base_color: Color::srgb(1.0, 0.85, 0.1),
            emissive: LinearRgba::rgb(0.6, 0.5, 0.05),
            ..default()
        })),
        GeoAnchor(pin.to_cartesian()),
        Transform::default(),
    ));
}
