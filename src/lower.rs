//! Lower a validated option tree to the artifact [`Bundle`].
//!
//! Single walk, in visiting order. Instance and array names come from one
//! [`Naming`] authority threaded through the walk, so a compile is reentrant
//! and names never depend on anything but the (sorted) tree.
use std::collections::HashSet;

use crate::encode::{c_string_list, c_string_literal, macro_name};
use crate::error::EmitError;
use crate::ir::{Bundle, Instance, InstanceArray, Macro, Member, PlainVariable, StructType};
use crate::tree::{qualify, qualify_key, Leaf, Multi, NamedSet, OptionKind, Overlay};

/// Monotonic instance names (`inst_001`, `inst_002`, ...) plus a registry of
/// every name handed out, fixed names included.
#[derive(Debug, Default)]
pub struct Naming {
    next: u32,
    issued: HashSet<String>,
}

impl Naming {
    pub fn fresh(&mut self) -> String {
        self.next += 1;
        format!("inst_{:03}", self.next)
    }

    pub fn claim(&mut self, name: &str) -> Result<(), EmitError> {
        if self.issued.insert(name.to_string()) {
            Ok(())
        } else {
            Err(EmitError::DuplicateInstance(name.to_string()))
        }
    }
}

#[derive(Debug, Default)]
pub struct Lowering {
    bundle: Bundle,
    naming: Naming,
}

pub fn lower_to_bundle(root: &Multi) -> Result<Bundle, EmitError> {
    let mut lowering = Lowering::default();
    lowering.lower_multi("", root)?;
    Ok(lowering.bundle)
}

impl Lowering {
    fn lower_multi(&mut self, path: &str, multi: &Multi) -> Result<(), EmitError> {
        for child in multi.active_children() {
            let child_path = qualify(path, &child.name);
            match &child.kind {
                OptionKind::Leaf(leaf) => {
                    if child.top_level {
                        self.register_top_level(&child_path, &child.name, leaf)?;
                    }
                }
                OptionKind::Multi(inner) => self.lower_multi(&child_path, inner)?,
                OptionKind::NamedSet(set) => {
                    self.lower_named_set(&child_path, set)?;
                }
                OptionKind::DefaultOverlay(overlay) => self.lower_overlay(&child_path, overlay)?,
            }
        }
        for derived in multi.derived() {
            self.bundle.derived.push(Macro { name: derived.name.clone(), value: derived.value() });
        }
        Ok(())
    }

    /// Scalars become macros; string arrays become a global plus a `_LEN` macro.
    fn register_top_level(&mut self, path: &str, name: &str, leaf: &Leaf) -> Result<(), EmitError> {
        if let Some(value) = leaf.macro_value(path)? {
            self.bundle.macros.push(Macro { name: macro_name(name), value });
            return Ok(());
        }
        let items = leaf.strings(path)?;
        // ISO C has no empty initializer lists
        let value = if items.is_empty() { String::from("{NULL}") } else { c_string_list(items) };
        self.bundle.variables.push(PlainVariable {
            ty: String::from("const char *"),
            name: name.to_string(),
            suffix: String::from("[]"),
            value,
        });
        self.bundle.derived.push(Macro { name: format!("{}_LEN", macro_name(name)), value: items.len().to_string() });
        Ok(())
    }

    /// Register the struct for one template (nested named-set structs first).
    /// Same name and same members is a no-op; same name with other members is a bug.
    fn register_struct(&mut self, struct_name: &str, template: &Multi) -> Result<(), EmitError> {
        let mut members = vec![Member::new("const char *", "name")];
        for child in template.children() {
            match &child.kind {
                OptionKind::Leaf(leaf) => members.push(Member::new(leaf.c_type(), &child.name)),
                OptionKind::NamedSet(set) => {
                    self.register_struct(set.struct_name(), set.template())?;
                    members.push(Member::new(&format!("struct {} *", set.struct_name()), &child.name));
                    members.push(Member::new("unsigned int", &format!("{}_len", child.name)));
                }
                // refused by NamedSet::new
                OptionKind::Multi(_) | OptionKind::DefaultOverlay(_) => {}
            }
        }
        let st = StructType::new(struct_name, members);
        match self.bundle.structs.iter().find(|s| s.name == st.name) {
            Some(existing) if *existing == st => Ok(()),
            Some(_) => Err(EmitError::ConflictingStruct(st.name)),
            None => {
                self.bundle.structs.push(st);
                Ok(())
            }
        }
    }

    /// One struct instance for one composite. Nested arrays are lowered (and
    /// named) before the instance itself.
    fn lower_entry(
        &mut self,
        path: &str,
        struct_name: &str,
        label: &str,
        multi: &Multi,
        fixed_name: Option<&str>,
    ) -> Result<String, EmitError> {
        let mut fields = vec![(String::from("name"), c_string_literal(label))];
        for child in multi.active_children() {
            let child_path = qualify(path, &child.name);
            match &child.kind {
                OptionKind::Leaf(leaf) => fields.push((child.name.clone(), leaf.member_value(&child_path)?)),
                OptionKind::NamedSet(set) => {
                    let array = self.lower_named_set(&child_path, set)?;
                    fields.push((child.name.clone(), array.unwrap_or_else(|| String::from("NULL"))));
                    fields.push((format!("{}_len", child.name), set.entries().len().to_string()));
                }
                OptionKind::Multi(_) | OptionKind::DefaultOverlay(_) => {}
            }
        }
        fields.sort();
        let name = match fixed_name {
            Some(name) => name.to_string(),
            None => self.naming.fresh(),
        };
        self.naming.claim(&name)?;
        tracing::debug!(instance = %name, option = %path, "lowered struct instance");
        self.bundle.instances.entry(struct_name.to_string()).or_default().push(Instance {
            name: name.clone(),
            struct_name: struct_name.to_string(),
            fields,
        });
        Ok(name)
    }

    /// One instance per entry plus the array holding them. No entries, no array.
    fn lower_named_set(&mut self, path: &str, set: &NamedSet) -> Result<Option<String>, EmitError> {
        self.register_struct(set.struct_name(), set.template())?;
        let mut slots = Vec::with_capacity(set.entries().len());
        for (key, entry) in set.entries() {
            slots.push(self.lower_entry(&qualify_key(path, key), set.struct_name(), key, entry, None)?);
        }
        if slots.is_empty() {
            return Ok(None);
        }
        let array_name = match set.array_name() {
            Some(name) => {
                let len = Macro { name: format!("{}_LEN", macro_name(name)), value: slots.len().to_string() };
                self.bundle.derived.push(len);
                name.to_string()
            }
            None => self.naming.fresh(),
        };
        self.naming.claim(&array_name)?;
        self.bundle.arrays.entry(set.struct_name().to_string()).or_default().push(InstanceArray {
            name: array_name.clone(),
            struct_name: set.struct_name().to_string(),
            slots,
        });
        Ok(Some(array_name))
    }

    fn lower_overlay(&mut self, path: &str, overlay: &Overlay) -> Result<(), EmitError> {
        self.register_struct(&overlay.struct_name, &overlay.multi)?;
        self.lower_entry(path, &overlay.struct_name, &overlay.label, &overlay.multi, Some(&overlay.instance_name))?;
        Ok(())
    }
}

// ------------------------------- Tests ------------------------------------ //
