use std::collections::BTreeMap;

use serde_json::Value;

use super::{display_path, qualify_key, Multi, Predicate};
use crate::error::{SchemaError, ValidationError};

/// Where a named set's entries take their unset leaves from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DefaultSource {
    /// A composite sibling of the named set, e.g. `default_page_config` for `page_config`.
    Sibling(String),
    /// The composite that holds the named set, e.g. a page for its `params`.
    Parent,
}

/// A composite template instantiated once per caller-supplied key.
///
/// Entries are independent clones of the template, kept sorted by key so
/// nothing downstream depends on the document's key order.
#[derive(Debug, Clone)]
pub struct NamedSet {
    template: Multi,
    key_rule: Predicate,
    defaults: Option<DefaultSource>,
    struct_name: String,
    array_name: Option<String>,
    min_entries: usize,
    entries: BTreeMap<String, Multi>,
    set: bool,
}

impl NamedSet {
    pub fn new(name: &str, template: Multi, key_rule: Predicate, struct_name: &str) -> Result<Self, SchemaError> {
        if let Some(child) = template.children().find(|c| c.is_composite()) {
            return Err(SchemaError::NestedComposite { set: name.to_string(), child: child.name.clone() });
        }
        Ok(Self {
            template,
            key_rule,
            defaults: None,
            struct_name: struct_name.to_string(),
            array_name: None,
            min_entries: 0,
            entries: BTreeMap::new(),
            set: false,
        })
    }

    pub fn with_defaults(mut self, source: DefaultSource) -> Self {
        self.defaults = Some(source);
        self
    }

    /// Emit the instance array under a fixed global name instead of a generated one.
    pub fn with_array_name(mut self, name: &str) -> Self {
        self.array_name = Some(name.to_string());
        self
    }

    pub fn with_min_entries(mut self, n: usize) -> Self {
        self.min_entries = n;
        self
    }

    pub fn template(&self) -> &Multi {
        &self.template
    }
    pub fn defaults(&self) -> Option<&DefaultSource> {
        self.defaults.as_ref()
    }
    pub fn struct_name(&self) -> &str {
        &self.struct_name
    }
    pub fn array_name(&self) -> Option<&str> {
        self.array_name.as_deref()
    }
    pub fn is_set(&self) -> bool {
        self.set
    }
    pub fn entries(&self) -> &BTreeMap<String, Multi> {
        &self.entries
    }
    pub fn entry(&self, key: &str) -> Option<&Multi> {
        self.entries.get(key)
    }
    pub(super) fn entries_mut(&mut self) -> &mut BTreeMap<String, Multi> {
        &mut self.entries
    }

    /// Clone the template once per key of a JSON object and feed each clone its value.
    pub fn set_value(&mut self, path: &str, value: &Value) -> Result<(), ValidationError> {
        let Value::Object(map) = value else {
            return Err(ValidationError::new(display_path(path), "must be an object keyed by name", Some(value)));
        };
        if self.set {
            return Err(ValidationError::new(display_path(path), "value has already been set", Some(value)));
        }
        self.set = true;
        let mut keys: Vec<&String> = map.keys().collect();
        keys.sort();
        for key in keys {
            let entry_path = qualify_key(path, key);
            let mut entry = self.template.clone();
            entry.set_value(&entry_path, &map[key.as_str()])?;
            tracing::debug!(entry = %entry_path, "cloned named-set template");
            self.entries.insert(key.clone(), entry);
        }
        Ok(())
    }

    pub fn validate(&mut self, path: &str) -> Result<(), ValidationError> {
        if self.entries.len() < self.min_entries {
            return Err(ValidationError::new(
                display_path(path),
                format!(
                    "must define at least {} entr{}",
                    self.min_entries,
                    if self.min_entries == 1 { "y" } else { "ies" }
                ),
                Some(&Value::Object(Default::default())),
            ));
        }
        for (key, entry) in self.entries.iter_mut() {
            let entry_path = qualify_key(path, key);
            if !self.key_rule.holds(key) {
                return Err(ValidationError::new(
                    entry_path,
                    format!("invalid key: {}", self.key_rule.describe),
                    Some(&Value::String(key.clone())),
                ));
            }
            entry.validate(&entry_path)?;
        }
        Ok(())
    }
}

// ------------------------------- Tests ------------------------------------ //
