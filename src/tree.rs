//! The option schema tree.
//!
//! A schema is built once as an immutable template. Feeding it a document
//! (`set_value`) clones named-set templates per discovered key, `resolve_defaults`
//! backfills unset leaves, and `validate` walks everything in visiting order,
//! failing on the first violation.
//!
//! Node taxonomy is a plain sum type:
//! - [`Leaf`]: Boolean, PositiveInteger, String, StringArray, Whitelist, HttpFlags
//! - [`Multi`]: fixed set of named children
//! - [`NamedSet`]: a `Multi` template cloned once per caller-supplied key
//! - [`Overlay`]: a `Multi` whose values back-fill a named set, emitted as one
//!   fallback instance
pub mod leaf;
pub mod merge;
pub mod multi;
pub mod named;

use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;

use crate::error::ValidationError;

pub use leaf::{Leaf, LeafKind, Origin, Predicate, Resolved, StringArraySpec};
pub use multi::{DerivedMacro, Multi};
pub use named::{DefaultSource, NamedSet};

static IDENTIFIER: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$").expect("identifier regex"));

/// Option names end up as C identifiers (members, macros, globals).
pub fn is_identifier(name: &str) -> bool {
    IDENTIFIER.is_match(name)
}

/// `parent.name`, or just `name` at the root.
pub fn qualify(parent: &str, name: &str) -> String {
    if parent.is_empty() { name.to_string() } else { format!("{parent}.{name}") }
}

/// The root has an empty path; diagnostics call it `<document>`.
pub fn display_path(path: &str) -> &str {
    if path.is_empty() { "<document>" } else { path }
}

/// `parent[key]`, the qualified name of one named-set entry.
pub fn qualify_key(parent: &str, key: &str) -> String {
    format!("{parent}[{key}]")
}

// ————————————————————————————————————————————————————————————————————————————
// NODES
// ————————————————————————————————————————————————————————————————————————————

#[derive(Debug, Clone)]
pub struct OptionNode {
    pub name: String,
    /// Also surfaces as a free-standing macro or global.
    pub top_level: bool,
    pub kind: OptionKind,
}

#[derive(Debug, Clone)]
pub enum OptionKind {
    Leaf(Leaf),
    Multi(Multi),
    NamedSet(NamedSet),
    DefaultOverlay(Overlay),
}

/// Default template for a named set. Emitted as one instance with a reserved name.
#[derive(Debug, Clone)]
pub struct Overlay {
    pub multi: Multi,
    pub struct_name: String,
    pub instance_name: String,
    /// Value of the `name` member in the emitted instance.
    pub label: String,
}

impl OptionNode {
    fn leaf(name: &str, kind: LeafKind) -> Self {
        Self { name: name.to_string(), top_level: false, kind: OptionKind::Leaf(Leaf::new(kind)) }
    }
    pub fn boolean(name: &str) -> Self {
        Self::leaf(name, LeafKind::Boolean)
    }
    pub fn positive_integer(name: &str) -> Self {
        Self::leaf(name, LeafKind::PositiveInteger)
    }
    pub fn string(name: &str) -> Self {
        Self::leaf(name, LeafKind::String)
    }
    pub fn string_array(name: &str, spec: StringArraySpec) -> Self {
        Self::leaf(name, LeafKind::StringArray(spec))
    }
    pub fn whitelist(name: &str) -> Self {
        Self::leaf(name, LeafKind::Whitelist)
    }
    pub fn http_flags(name: &str) -> Self {
        Self::leaf(name, LeafKind::HttpFlags)
    }
    pub fn multi(name: &str, multi: Multi) -> Self {
        Self { name: name.to_string(), top_level: false, kind: OptionKind::Multi(multi) }
    }
    pub fn named_set(name: &str, set: NamedSet) -> Self {
        Self { name: name.to_string(), top_level: false, kind: OptionKind::NamedSet(set) }
    }
    pub fn overlay(name: &str, overlay: Overlay) -> Self {
        Self { name: name.to_string(), top_level: false, kind: OptionKind::DefaultOverlay(overlay) }
    }

    pub fn top_level(mut self) -> Self {
        self.top_level = true;
        self
    }

    pub fn is_set(&self) -> bool {
        match &self.kind {
            OptionKind::Leaf(leaf) => leaf.is_set(),
            OptionKind::Multi(multi) => multi.is_set(),
            OptionKind::NamedSet(set) => set.is_set(),
            OptionKind::DefaultOverlay(overlay) => overlay.multi.is_set(),
        }
    }

    pub fn as_leaf(&self) -> Option<&Leaf> {
        match &self.kind {
            OptionKind::Leaf(leaf) => Some(leaf),
            _ => None,
        }
    }

    pub fn as_named_set(&self) -> Option<&NamedSet> {
        match &self.kind {
            OptionKind::NamedSet(set) => Some(set),
            _ => None,
        }
    }

    /// Composite view of this node, if it can serve as a default source.
    pub fn as_multi(&self) -> Option<&Multi> {
        match &self.kind {
            OptionKind::Multi(multi) => Some(multi),
            OptionKind::DefaultOverlay(overlay) => Some(&overlay.multi),
            _ => None,
        }
    }

    pub fn set_value(&mut self, path: &str, value: &Value) -> Result<(), ValidationError> {
        match &mut self.kind {
            OptionKind::Leaf(leaf) => leaf.set_value(path, value),
            OptionKind::Multi(multi) => multi.set_value(path, value),
            OptionKind::NamedSet(set) => set.set_value(path, value),
            OptionKind::DefaultOverlay(overlay) => overlay.multi.set_value(path, value),
        }
    }

    pub fn validate(&mut self, path: &str) -> Result<(), ValidationError> {
        match &mut self.kind {
            OptionKind::Leaf(leaf) => leaf.validate(path),
            OptionKind::Multi(multi) => multi.validate(path),
            OptionKind::NamedSet(set) => set.validate(path),
            OptionKind::DefaultOverlay(overlay) => overlay.multi.validate(path),
        }
    }
}
