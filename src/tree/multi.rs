use std::collections::BTreeSet;

use indexmap::IndexMap;
use serde_json::Value;

use super::{display_path, is_identifier, qualify, DefaultSource, LeafKind, OptionKind, OptionNode};
use crate::encode::macro_name;
use crate::error::{SchemaError, ValidationError};

/// Macro computed from other macros: true iff any operand is true.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DerivedMacro {
    pub name: String,
    /// Child option names; each must be a top-level boolean.
    pub operands: Vec<String>,
}

impl DerivedMacro {
    pub fn any_of(name: &str, operands: &[&str]) -> Self {
        Self {
            name: name.to_string(),
            operands: operands.iter().map(|s| s.to_string()).collect(),
        }
    }

    pub fn value(&self) -> String {
        let parts: Vec<String> = self.operands.iter().map(|o| macro_name(o)).collect();
        format!("({})", parts.join(" || "))
    }
}

/// Composite option: disjoint required and optional children, addressed by name.
#[derive(Debug, Clone)]
pub struct Multi {
    children: IndexMap<String, OptionNode>,
    required: BTreeSet<String>,
    /// Visiting order for validation and emission. A permutation of `children`.
    order: Vec<String>,
    derived: Vec<DerivedMacro>,
    set: bool,
}

impl Multi {
    /// Children are visited in name order unless [`Multi::with_order`] says otherwise.
    pub fn new(name: &str, required: Vec<OptionNode>, optional: Vec<OptionNode>) -> Result<Self, SchemaError> {
        let mut children = IndexMap::new();
        let mut required_names = BTreeSet::new();
        let tagged = required
            .into_iter()
            .map(|node| (node, true))
            .chain(optional.into_iter().map(|node| (node, false)));
        for (node, is_required) in tagged {
            if !is_identifier(&node.name) {
                return Err(SchemaError::InvalidName(node.name));
            }
            if children.contains_key(&node.name) {
                return Err(SchemaError::DuplicateChild { parent: name.to_string(), name: node.name });
            }
            if is_required {
                required_names.insert(node.name.clone());
            }
            children.insert(node.name.clone(), node);
        }
        let mut order: Vec<String> = children.keys().cloned().collect();
        order.sort();
        let multi = Self { children, required: required_names, order, derived: Vec::new(), set: false };
        multi.check_default_sources(name)?;
        Ok(multi)
    }

    /// Replace the visiting order. Must be exactly a permutation of the child names.
    pub fn with_order(mut self, name: &str, order: &[&str]) -> Result<Self, SchemaError> {
        let given: Vec<String> = order.iter().map(|s| s.to_string()).collect();
        let mut given_sorted = given.clone();
        given_sorted.sort();
        let mut expected: Vec<String> = self.children.keys().cloned().collect();
        expected.sort();
        if given_sorted != expected {
            return Err(SchemaError::VisitOrder { parent: name.to_string(), children: expected, order: given });
        }
        self.order = given;
        self.check_default_sources(name)?;
        Ok(self)
    }

    pub fn with_derived(mut self, name: &str, derived: DerivedMacro) -> Result<Self, SchemaError> {
        for operand in &derived.operands {
            let is_top_level_bool = self.children.get(operand).is_some_and(|child| {
                child.top_level && matches!(child.as_leaf().map(|l| &l.kind), Some(LeafKind::Boolean))
            });
            if !is_top_level_bool {
                return Err(SchemaError::DerivedOperand {
                    parent: name.to_string(),
                    name: derived.name.clone(),
                    operand: operand.clone(),
                });
            }
        }
        self.derived.push(derived);
        Ok(self)
    }

    /// A sibling default source must be a composite visited before the set it feeds.
    fn check_default_sources(&self, name: &str) -> Result<(), SchemaError> {
        for (pos, child_name) in self.order.iter().enumerate() {
            let Some(set) = self.children.get(child_name).and_then(OptionNode::as_named_set) else {
                continue;
            };
            let Some(DefaultSource::Sibling(from)) = set.defaults() else {
                continue;
            };
            let visited_before = self.order[..pos].contains(from);
            let is_composite = self.children.get(from).and_then(OptionNode::as_multi).is_some();
            if !(visited_before && is_composite) {
                return Err(SchemaError::DefaultSource {
                    parent: name.to_string(),
                    set: child_name.clone(),
                    from: from.clone(),
                });
            }
        }
        Ok(())
    }

    // ------------------------------ Access -------------------------------- //

    pub fn is_set(&self) -> bool {
        self.set
    }
    pub(super) fn mark_set(&mut self) {
        self.set = true;
    }
    pub fn is_required(&self, name: &str) -> bool {
        self.required.contains(name)
    }
    pub fn child(&self, name: &str) -> Option<&OptionNode> {
        self.children.get(name)
    }
    pub fn child_mut(&mut self, name: &str) -> Option<&mut OptionNode> {
        self.children.get_mut(name)
    }
    pub fn order(&self) -> &[String] {
        &self.order
    }
    pub fn derived(&self) -> &[DerivedMacro] {
        &self.derived
    }

    /// Children in visiting order.
    pub fn children(&self) -> impl Iterator<Item = &OptionNode> + '_ {
        self.order.iter().filter_map(|name| self.children.get(name))
    }

    /// Children that take part in validation and emission: required ones, and
    /// optional ones that were set.
    pub fn active_children(&self) -> impl Iterator<Item = &OptionNode> + '_ {
        self.children().filter(|child| self.is_required(&child.name) || child.is_set())
    }

    pub(super) fn children_mut(&mut self) -> impl Iterator<Item = (&String, &mut OptionNode)> {
        self.children.iter_mut()
    }

    // ---------------------------- Set / check ----------------------------- //

    /// Distribute a JSON object across children by name.
    pub fn set_value(&mut self, path: &str, value: &Value) -> Result<(), ValidationError> {
        let Value::Object(map) = value else {
            return Err(ValidationError::new(display_path(path), "must be an object", Some(value)));
        };
        if self.set {
            return Err(ValidationError::new(display_path(path), "value has already been set", Some(value)));
        }
        let mut unknown: Vec<&String> = map.keys().filter(|k| !self.children.contains_key(k.as_str())).collect();
        unknown.sort();
        if let Some(key) = unknown.first() {
            let known: Vec<&str> = self.order.iter().map(String::as_str).collect();
            return Err(ValidationError::new(
                qualify(path, key),
                format!("unknown option (expected one of: {})", known.join(", ")),
                map.get(key.as_str()),
            ));
        }
        self.set = true;
        for name in &self.order {
            let (Some(raw), Some(child)) = (map.get(name), self.children.get_mut(name)) else {
                continue;
            };
            child.set_value(&qualify(path, name), raw)?;
        }
        Ok(())
    }

    /// Required children first (each must be set), then optional children that were set.
    pub fn validate(&mut self, path: &str) -> Result<(), ValidationError> {
        for pass_required in [true, false] {
            for name in &self.order {
                if self.required.contains(name) != pass_required {
                    continue;
                }
                let Some(child) = self.children.get_mut(name) else { continue };
                let child_path = qualify(path, name);
                if !child.is_set() {
                    if pass_required {
                        return Err(ValidationError::new(child_path, "required option has not been specified", None));
                    }
                    continue;
                }
                child.validate(&child_path)?;
            }
        }
        Ok(())
    }
}

impl OptionNode {
    /// Leaf kinds only. Composite children make no sense inside a struct-per-key template.
    pub(super) fn is_composite(&self) -> bool {
        matches!(self.kind, OptionKind::Multi(_) | OptionKind::DefaultOverlay(_))
    }
}

// ------------------------------- Tests ------------------------------------ //
