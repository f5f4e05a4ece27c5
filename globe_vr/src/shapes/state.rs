//! Restorable-state documents: nested, named `stateObject` elements under a
//! `restorableState` root.
//!
//! ```xml
//! <restorableState>
//!   <stateObject name="altitudes">
//!     <stateObject name="lower">0.0</stateObject>
//!     <stateObject name="upper">40.0</stateObject>
//!   </stateObject>
//! </restorableState>
//! ```

use thiserror::Error;

use crate::geo::LatLon;

const ROOT_TAG: &str = "restorableState";
const OBJECT_TAG: &str = "stateObject";

#[derive(Debug, Error)]
pub enum StateError {
    #[error("malformed state document: {0}")]
    Xml(#[from] roxmltree::Error),
    #[error("state document root is <{0}>, expected <restorableState>")]
    UnexpectedRoot(String),
    #[error("missing state object {0:?}")]
    Missing(&'static str),
    #[error("state object {name:?} is not a number: {value:?}")]
    NotANumber { name: String, value: String },
}

/// One named value, possibly with nested children.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct StateObject {
    pub name: String,
    pub value: String,
    pub children: Vec<StateObject>,
}

impl StateObject {
    pub fn child(&self, name: &str) -> Option<&StateObject> {
        self.children.iter().find(|c| c.name == name)
    }

    pub fn children_named<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a StateObject> {
        self.children.iter().filter(move |c| c.name == name)
    }

    pub fn as_f64(&self) -> Result<f64, StateError> {
        self.value
            .trim()
            .parse()
            .map_err(|_| StateError::NotANumber {
                name: self.name.clone(),
                value: self.value.clone(),
            })
    }

    pub fn f64_child(&self, name: &'static str) -> Result<f64, StateError> {
        self.child(name).ok_or(StateError::Missing(name))?.as_f64()
    }

    /// Reads `latitudeDegrees` / `longitudeDegrees` children.
    pub fn as_latlon(&self) -> Result<LatLon, StateError> {
        Ok(LatLon::from_degrees(
            self.f64_child("latitudeDegrees")?,
            self.f64_child("longitudeDegrees")?,
        ))
    }
}

/// Parsed document; the root behaves like an unnamed state object.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct RestorableState {
    root: StateObject,
}

impl RestorableState {
    pub fn parse(xml: &str) -> Result<Self, StateError> {
        let doc = roxmltree::Document::parse(xml)?;
        let root = doc.root_element();
        if !root.has_tag_name(ROOT_TAG) {
            return Err(StateError::UnexpectedRoot(root.tag_name().name().to_string()));
        }
        Ok(Self {
            root: StateObject {
                name: String::new(),
                value: String::new(),
                children: collect_children(root),
            },
        })
    }

    pub fn get(&self, name: &str) -> Option<&StateObject> {
        self.root.child(name)
    }

    pub fn require(&self, name: &'static str) -> Result<&StateObject, StateError> {
        self.get(name).ok_or(StateError::Missing(name))
    }

    pub fn root(&self) -> &StateObject {
        &self.root
    }
}

fn collect_children(node: roxmltree::Node<'_, '_>) -> Vec<StateObject> {
    node.children()
        .filter(|child| child.is_element() && child.has_tag_name(OBJECT_TAG))
        .map(|child| {
            let children = collect_children(child);
            let value = if children.is_empty() {
                child.text().unwrap_or_default().trim().to_string()
            } else {
                String::new()
            };
            StateObject {
                name: child.attribute("name").unwrap_or_default().to_string(),
                value,
                children,
            }
        })
        .collect()
}
