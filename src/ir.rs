// Artifact model for codegen. No option-tree types here, only target-shaped text.
use indexmap::IndexMap;
use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Macro {
    pub name: String,
    pub value: String,
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize)]
pub struct Member {
    pub ty: String,                 // declared type text, e.g. `const char *`
    pub name: String,
}

impl Member {
    pub fn new(ty: &str, name: &str) -> Self {
        Self { ty: ty.to_string(), name: name.to_string() }
    }

    /// `const char *name`, `int limit`
    pub fn declarator(&self) -> String {
        if self.ty.ends_with('*') {
            format!("{}{}", self.ty, self.name)
        } else {
            format!("{} {}", self.ty, self.name)
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StructType {
    pub name: String,
    pub members: Vec<Member>,       // sorted by (ty, name)
}

impl StructType {
    pub fn new(name: &str, mut members: Vec<Member>) -> Self {
        members.sort();
        Self { name: name.to_string(), members }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Instance {
    pub name: String,
    pub struct_name: String,
    pub fields: Vec<(String, String)>, // (member, value text), sorted by member
}

/// Array of struct instances. Declared in one place, populated by the
/// initializer, so it has no single-line initializer form.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InstanceArray {
    pub name: String,
    pub struct_name: String,
    pub slots: Vec<String>,         // instance names, in slot order
}

/// Top-level storage that is not a struct instance, e.g. `const char *pages[] = {...}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PlainVariable {
    pub ty: String,
    pub name: String,
    pub suffix: String,             // `[]` for arrays, empty for scalars
    pub value: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Bundle {
    pub macros: Vec<Macro>,
    pub structs: Vec<StructType>,
    pub variables: Vec<PlainVariable>,
    pub instances: IndexMap<String, Vec<Instance>>,     // keyed by struct name, first-use order
    pub arrays: IndexMap<String, Vec<InstanceArray>>,   // keyed by struct name
    pub derived: Vec<Macro>,
}
