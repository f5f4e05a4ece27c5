//! Demo shape archive: zip entries named `<type-tag>-<label>.xml`, each holding
//! one line of restorable state.

use std::fs::File;
use std::io::{BufRead, BufReader, Read, Seek};
use std::path::Path;

use bevy::log::{info, warn};
use thiserror::Error;
use zip::ZipArchive;

use crate::shapes::airspace::{Airspace, AirspaceRegistry, AIRSPACE_TAG_PREFIX};
use crate::shapes::state::{RestorableState, StateError};

const ENTRY_SUFFIX: &str = ".xml";

#[derive(Debug, Error)]
pub enum ShapeLoadError {
    #[error("cannot open shape archive: {0}")]
    Io(#[from] std::io::Error),
    #[error("cannot read shape archive: {0}")]
    Zip(#[from] zip::result::ZipError),
    #[error("unknown shape type {0:?}")]
    UnknownType(String),
    #[error("entry is empty")]
    EmptyEntry,
    #[error(transparent)]
    State(#[from] StateError),
}

/// Type tag and label parsed from an entry file name.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EntryName<'a> {
    pub type_tag: &'a str,
    pub label: Option<&'a str>,
}

/// Splits `airspaces.Polygon-Lobby.xml` into tag and label. Directories in the
/// entry path are ignored; names outside the pattern yield `None`.
pub fn parse_entry_name(entry_path: &str) -> Option<EntryName<'_>> {
    let file_name = entry_path.rsplit(['/', '\\']).next()?;
    if !file_name.starts_with(AIRSPACE_TAG_PREFIX) {
        return None;
    }
    let stem = file_name.strip_suffix(ENTRY_SUFFIX)?;
    let (type_tag, label) = match stem.split_once('-') {
        Some((tag, label)) if !label.is_empty() => (tag, Some(label)),
        Some((tag, _)) => (tag, None),
        None => (stem, None),
    };
    Some(EntryName { type_tag, label })
}

/// Loads every shape from the archive at `path`. A missing or unreadable
/// archive gives an empty list.
pub fn load_airspaces_from_path(path: &Path, registry: &AirspaceRegistry) -> Vec<Airspace> {
    let file = match File::open(path) {
        Ok(file) => file,
        Err(err) => {
            warn!("worldvr: cannot open shape archive {}: {err}", path.display());
            return Vec::new();
        }
    };
    match read_airspaces(file, registry) {
        Ok(airspaces) => {
            info!(
                "worldvr: loaded {} shapes from {}",
                airspaces.len(),
                path.display()
            );
            airspaces
        }
        Err(err) => {
            warn!("worldvr: {err} ({})", path.display());
            Vec::new()
        }
    }
}

/// Reads shapes from a zip stream. Entries that fail to load are logged and
/// skipped; only archive-level failures are returned.
pub fn read_airspaces<R: Read + Seek>(
    reader: R,
    registry: &AirspaceRegistry,
) -> Result<Vec<Airspace>, ShapeLoadError> {
    let mut archive = ZipArchive::new(reader)?;
    let mut airspaces = Vec::new();

    for index in 0..archive.len() {
        let entry = match archive.by_index(index) {
            Ok(entry) => entry,
            Err(err) => {
                warn!("worldvr: skipping archive entry {index}: {err}");
                continue;
            }
        };
        if entry.is_dir() {
            continue;
        }
        let entry_path = entry.name().to_string();
        let Some(name) = parse_entry_name(&entry_path) else {
            continue;
        };

        match read_entry(entry, &name, registry) {
            Ok(airspace) => airspaces.push(airspace),
            Err(err) => warn!("worldvr: skipping {entry_path}: {err}"),
        }
    }

    Ok(airspaces)
}

fn read_entry(
    entry: impl Read,
    name: &EntryName<'_>,
    registry: &AirspaceRegistry,
) -> Result<Airspace, ShapeLoadError> {
    let mut kind = registry
        .instantiate(name.type_tag)
        .ok_or_else(|| ShapeLoadError::UnknownType(name.type_tag.to_string()))?;

    let mut line = String::new();
    BufReader::new(entry).read_line(&mut line)?;
    if line.trim().is_empty() {
        return Err(ShapeLoadError::EmptyEntry);
    }

    kind.restore_state(&RestorableState::parse(line.trim_end())?)?;
    Ok(Airspace {
        kind,
        display_name: name.label.map(str::to_string),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn entry_names() {
        assert_eq!(
            parse_entry_name("shapes/airspaces.Polygon-Lobby.xml"),
            Some(EntryName {
                type_tag: "airspaces.Polygon",
                label: Some("Lobby"),
            })
        );
        assert_eq!(
            parse_entry_name("airspaces.Orbit-Pattern-North.xml"),
            Some(EntryName {
                type_tag: "airspaces.Orbit",
                label: Some("Pattern-North"),
            })
        );
        assert_eq!(
            parse_entry_name("airspaces.Curtain.xml"),
            Some(EntryName {
                type_tag: "airspaces.Curtain",
                label: None,
            })
        );
        assert_eq!(parse_entry_name("airspaces.Polygon-Lobby.txt"), None);
        assert_eq!(parse_entry_name("README.xml"), None);
    }

    #[test]
    fn missing_archive_is_empty() {
        let shapes = load_airspaces_from_path(
            Path::new("/nonexistent/worldvr/shapes.zip"),
            &AirspaceRegistry::default(),
        );
        assert!(shapes.is_empty());
    }

    #[test]
    fn garbage_is_an_archive_error() {
        let err = read_airspaces(
            std::io::Cursor::new(b"not a zip".to_vec()),
            &AirspaceRegistry::default(),
        )
        .unwrap_err();
        assert!(matches!(err, ShapeLoadError::Zip(_)));
    }
}
