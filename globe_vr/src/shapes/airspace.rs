//! Airspace shape definitions and the registry that builds them from type tags.

use std::collections::HashMap;

use crate::geo::LatLon;
use crate::shapes::state::{RestorableState, StateError, StateObject};

/// Lower and upper altitude in metres.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Altitudes {
    pub lower: f64,
    pub upper: f64,
}

impl Altitudes {
    fn restore(&mut self, state: &RestorableState) -> Result<(), StateError> {
        if let Some(altitudes) = state.get("altitudes") {
            if let Some(lower) = altitudes.child("lower") {
                self.lower = lower.as_f64()?;
            }
            if let Some(upper) = altitudes.child("upper") {
                self.upper = upper.as_f64()?;
            }
        }
        Ok(())
    }
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct PolygonAirspace {
    pub locations: Vec<LatLon>,
    pub altitudes: Altitudes,
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct CurtainAirspace {
    pub locations: Vec<LatLon>,
    pub altitudes: Altitudes,
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct CappedCylinderAirspace {
    pub center: LatLon,
    pub inner_radius: f64,
    pub outer_radius: f64,
    pub altitudes: Altitudes,
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct OrbitAirspace {
    pub location1: LatLon,
    pub location2: LatLon,
    pub width: f64,
    pub altitudes: Altitudes,
}

#[derive(Clone, Debug, PartialEq)]
pub enum AirspaceKind {
    Polygon(PolygonAirspace),
    Curtain(CurtainAirspace),
    CappedCylinder(CappedCylinderAirspace),
    Orbit(OrbitAirspace),
}

impl AirspaceKind {
    /// Overwrites fields present in `state`; absent fields keep their values.
    pub fn restore_state(&mut self, state: &RestorableState) -> Result<(), StateError> {
        match self {
            AirspaceKind::Polygon(p) => {
                p.altitudes.restore(state)?;
                p.locations = restore_locations(state)?;
            }
            AirspaceKind::Curtain(c) => {
                c.altitudes.restore(state)?;
                c.locations = restore_locations(state)?;
            }
            AirspaceKind::CappedCylinder(c) => {
                c.altitudes.restore(state)?;
                c.center = state.require("center")?.as_latlon()?;
                if let Some(inner) = state.get("innerRadius") {
                    c.inner_radius = inner.as_f64()?;
                }
                c.outer_radius = state.require("outerRadius")?.as_f64()?;
            }
            AirspaceKind::Orbit(o) => {
                o.altitudes.restore(state)?;
                o.location1 = state.require("location1")?.as_latlon()?;
                o.location2 = state.require("location2")?.as_latlon()?;
                o.width = state.require("width")?.as_f64()?;
            }
        }
        Ok(())
    }

    pub fn as_polygon(&self) -> Option<&PolygonAirspace> {
        match self {
            AirspaceKind::Polygon(p) => Some(p),
            _ => None,
        }
    }
}

fn restore_locations(state: &RestorableState) -> Result<Vec<LatLon>, StateError> {
    state
        .require("locations")?
        .children_named("location")
        .map(StateObject::as_latlon)
        .collect()
}

/// A restored shape tagged with the label from its archive entry.
#[derive(Clone, Debug, PartialEq)]
pub struct Airspace {
    pub kind: AirspaceKind,
    pub display_name: Option<String>,
}

pub type AirspaceConstructor = fn() -> AirspaceKind;

/// Type tag prefix accepted by the archive loader.
pub const AIRSPACE_TAG_PREFIX: &str = "airspaces.";

/// Maps type tags (`airspaces.Polygon`, ...) to constructors.
#[derive(Clone, Debug)]
pub struct AirspaceRegistry {
    constructors: HashMap<String, AirspaceConstructor>,
}

impl Default for AirspaceRegistry {
    fn default() -> Self {
        let mut registry = Self::empty();
        registry.register("airspaces.Polygon", || {
            AirspaceKind::Polygon(PolygonAirspace::default())
        });
        registry.register("airspaces.Curtain", || {
            AirspaceKind::Curtain(CurtainAirspace::default())
        });
        registry.register("airspaces.CappedCylinder", || {
            AirspaceKind::CappedCylinder(CappedCylinderAirspace::default())
        });
        registry.register("airspaces.Orbit", || AirspaceKind::Orbit(OrbitAirspace::default()));
        registry
    }
}

impl AirspaceRegistry {
    pub fn empty() -> Self {
        Self {
            constructors: HashMap::new(),
        }
    }

    pub fn register(&mut self, tag: impl Into<String>, constructor: AirspaceConstructor) {
        self.constructors.insert(tag.into(), constructor);
    }

    pub fn instantiate(&self, tag: &str) -> Option<AirspaceKind> {
        self.constructors.get(tag).map(|construct| construct())
    }

    pub fn contains(&self, tag: &str) -> bool {
        self.constructors.contains_key(tag)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn state(xml: &str) -> RestorableState {
        RestorableState::parse(xml).unwrap()
    }

    #[test]
    fn registry_knows_builtin_tags() {
        let registry = AirspaceRegistry::default();
        assert!(matches!(
            registry.instantiate("airspaces.Polygon"),
            Some(AirspaceKind::Polygon(_))
        ));
        assert!(matches!(
            registry.instantiate("airspaces.Orbit"),
            Some(AirspaceKind::Orbit(_))
        ));
        assert!(registry.instantiate("airspaces.Box").is_none());
        assert!(AirspaceRegistry::empty().instantiate("airspaces.Polygon").is_none());
    }

    #[test]
    fn restores_capped_cylinder() {
        let mut kind = AirspaceKind::CappedCylinder(Default::default());
        kind.restore_state(&state(
            r#"<restorableState>
                <stateObject name="center">
                    <stateObject name="latitudeDegrees">40.0</stateObject>
                    <stateObject name="longitudeDegrees">-105.0</stateObject>
                </stateObject>
                <stateObject name="outerRadius">5000</stateObject>
                <stateObject name="altitudes">
                    <stateObject name="upper">1000</stateObject>
                </stateObject>
            </restorableState>"#,
        ))
        .unwrap();

        let AirspaceKind::CappedCylinder(c) = kind else {
            panic!("kind changed");
        };
        assert_eq!(c.center, LatLon::from_degrees(40.0, -105.0));
        assert_eq!(c.outer_radius, 5000.0);
        assert_eq!(c.inner_radius, 0.0);
        assert_eq!(c.altitudes, Altitudes { lower: 0.0, upper: 1000.0 });
    }

    #[test]
    fn polygon_without_locations_fails() {
        let mut kind = AirspaceKind::Polygon(Default::default());
        let err = kind
            .restore_state(&state("<restorableState/>"))
            .unwrap_err();
        assert!(matches!(err, StateError::Missing("locations")));
        assert!(kind.as_polygon().is_some());
    }
}
