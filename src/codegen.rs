//! Render an artifact [`Bundle`] as two C streams.
//!
//! - declarations (`.h`): safe to include from any number of translation units
//! - definitions (`.c`): storage plus the deferred initializer, for exactly one unit
//!
//! Instance arrays are declared with a size and filled by the initializer,
//! because a braced initializer cannot copy another instance by value.
use std::path::Path;

use crate::encode::{MASK_BYTES, MASK_LEN_MACRO};
use crate::ir::{Bundle, Instance, InstanceArray, Macro, StructType};

// ————————————————————————————————————————————————————————————————————————————
// TYPES
// ————————————————————————————————————————————————————————————————————————————

const AUTOGEN_BANNER: &str = "/* Autogenerated by shim-config. Do not edit. */";
const RUNTIME_HEADER: &str = "shim.h";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmitSettings {
    pub include_guard: String,
    /// What the definitions stream `#include`s to see the declarations.
    pub header_include: String,
    pub init_function: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Output {
    pub declarations: String,
    pub definitions: String,
}

#[derive(Debug)]
pub struct Codegen<'a> {
    settings: &'a EmitSettings,
    declarations: String,
    definitions: String,
}

// ————————————————————————————————————————————————————————————————————————————
// IMPLEMENTATION
// ————————————————————————————————————————————————————————————————————————————

impl Default for EmitSettings {
    fn default() -> Self {
        Self::for_header_name("config_header.h")
    }
}

impl EmitSettings {
    /// Derive guard and include name from where the declarations will be written.
    pub fn for_header(path: &Path) -> Self {
        match path.file_name().and_then(|name| name.to_str()) {
            Some(name) => Self::for_header_name(name),
            None => Self::default(),
        }
    }

    fn for_header_name(name: &str) -> Self {
        let include_guard = name
            .chars()
            .map(|c| if c.is_ascii_alphanumeric() { c.to_ascii_uppercase() } else { '_' })
            .collect();
        Self {
            include_guard,
            header_include: name.to_string(),
            init_function: String::from("init_config_vars"),
        }
    }
}

impl<'a> Codegen<'a> {
    pub fn new(settings: &'a EmitSettings) -> Self {
        Self { settings, declarations: String::new(), definitions: String::new() }
    }

    pub fn emit(&mut self, bundle: &Bundle) {
        self.emit_declarations(bundle);
        self.emit_definitions(bundle);
    }

    pub fn into_output(self) -> Output {
        Output { declarations: self.declarations, definitions: self.definitions }
    }

    // ---- Declarations ---- //

    fn emit_declarations(&mut self, bundle: &Bundle) {
        let guard = &self.settings.include_guard;
        let out = &mut self.declarations;
        out.push_str(AUTOGEN_BANNER);
        out.push_str("\n\n");
        out.push_str(&format!("#ifndef {guard}\n#define {guard}\n\n"));
        out.push_str("#include <stdbool.h>\n#include <stddef.h>\n");
        out.push_str(&format!("#include \"{RUNTIME_HEADER}\"\n\n"));

        out.push_str("/* Macro definitions */\n\n");
        for m in &bundle.macros {
            push_macro(out, m);
        }
        push_macro(out, &Macro { name: MASK_LEN_MACRO.to_string(), value: MASK_BYTES.to_string() });
        out.push('\n');

        out.push_str("/* Struct prototypes */\n\n");
        for st in &bundle.structs {
            out.push_str(&format!("struct {};\n", st.name));
        }
        out.push('\n');

        out.push_str("/* Struct definitions */\n\n");
        for st in &bundle.structs {
            out.push_str(&struct_body(st));
            out.push('\n');
        }

        out.push_str("/* Extern declarations */\n\n");
        for var in &bundle.variables {
            out.push_str(&format!("extern {};\n", declarator(&var.ty, &var.name, &var.suffix)));
        }
        for st in &bundle.structs {
            for inst in instances_of(bundle, st) {
                out.push_str(&format!("extern struct {} {};\n", inst.struct_name, inst.name));
            }
            for array in arrays_of(bundle, st) {
                out.push_str(&format!("extern {};\n", array_declaration(array)));
            }
        }
        out.push('\n');

        if !bundle.derived.is_empty() {
            out.push_str("/* Derived macros */\n\n");
            for m in &bundle.derived {
                push_macro(out, m);
            }
            out.push('\n');
        }

        out.push_str(&format!("void {}(void);\n\n", self.settings.init_function));
        out.push_str(&format!("#endif /* {guard} */\n"));
    }

    // ---- Definitions ---- //

    fn emit_definitions(&mut self, bundle: &Bundle) {
        let out = &mut self.definitions;
        out.push_str(AUTOGEN_BANNER);
        out.push_str("\n\n");
        out.push_str(&format!("#include \"{}\"\n\n", self.settings.header_include));

        out.push_str("/* Variable definitions */\n\n");
        for var in &bundle.variables {
            let decl = declarator(&var.ty, &var.name, &var.suffix);
            out.push_str(&format!("{decl} = {};\n", var.value));
        }
        out.push('\n');

        for st in &bundle.structs {
            let instances = instances_of(bundle, st);
            if !instances.is_empty() {
                out.push_str(&format!("/* {} instances */\n\n", st.name));
                for inst in instances {
                    out.push_str(&instance_definition(inst));
                    out.push('\n');
                }
            }
            let arrays = arrays_of(bundle, st);
            if !arrays.is_empty() {
                out.push_str(&format!("/* {} arrays */\n\n", st.name));
                for array in arrays {
                    out.push_str(&format!("{};\n", array_declaration(array)));
                }
                out.push('\n');
            }
        }

        out.push_str("/* Initializer function */\n\n");
        out.push_str(&format!("void {}(void) {{\n", self.settings.init_function));
        for st in &bundle.structs {
            for array in arrays_of(bundle, st) {
                for (slot, inst) in array.slots.iter().enumerate() {
                    out.push_str(&format!("    {}[{}] = {};\n", array.name, slot, inst));
                }
            }
        }
        out.push_str("}\n");
    }
}

// ————————————————————————————————————————————————————————————————————————————
// INTERNAL HELPERS
// ————————————————————————————————————————————————————————————————————————————

fn push_macro(out: &mut String, m: &Macro) {
    out.push_str(&format!("#define {} {}\n", m.name, m.value));
}

/// `const char *pages[]`, `int limit`
fn declarator(ty: &str, name: &str, suffix: &str) -> String {
    let sep = if ty.ends_with('*') { "" } else { " " };
    format!("{ty}{sep}{name}{suffix}")
}

/// Body lines are sorted once more as text, so layout never depends on
/// registration order.
fn struct_body(st: &StructType) -> String {
    let mut lines: Vec<String> = st.members.iter().map(|m| format!("    {};", m.declarator())).collect();
    lines.sort();
    format!("struct {} {{\n{}\n}};\n", st.name, lines.join("\n"))
}

fn instance_definition(inst: &Instance) -> String {
    let mut out = format!("struct {} {} = {{\n", inst.struct_name, inst.name);
    for (member, value) in &inst.fields {
        out.push_str(&format!("    .{member} = {value},\n"));
    }
    out.push_str("};\n");
    out
}

/// The only textual form an instance array has.
fn array_declaration(array: &InstanceArray) -> String {
    format!("struct {} {}[{}]", array.struct_name, array.name, array.slots.len())
}

fn instances_of<'b>(bundle: &'b Bundle, st: &StructType) -> &'b [Instance] {
    bundle.instances.get(&st.name).map(Vec::as_slice).unwrap_or_default()
}

fn arrays_of<'b>(bundle: &'b Bundle, st: &StructType) -> &'b [InstanceArray] {
    bundle.arrays.get(&st.name).map(Vec::as_slice).unwrap_or_default()
}

// ------------------------------- Tests ------------------------------------ //

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::{Member, PlainVariable};

    fn sample_bundle() -> Bundle {
        let mut bundle = Bundle::default();
        bundle.macros.push(Macro { name: "MAX_LEN".into(), value: "8".into() });
        bundle.structs.push(StructType::new(
            "item",
            vec![
                Member::new("int", "weight"),
                Member::new("const char **", "tags"),
                Member::new("const char *", "name"),
            ],
        ));
        bundle.variables.push(PlainVariable {
            ty: "const char *".into(),
            name: "pages".into(),
            suffix: "[]".into(),
            value: r#"{"/"}"#.into(),
        });
        bundle.instances.insert(
            "item".into(),
            vec![Instance {
                name: "inst_001".into(),
                struct_name: "item".into(),
                fields: vec![("name".into(), "\"a\"".into()), ("weight".into(), "3".into())],
            }],
        );
        bundle.arrays.insert(
            "item".into(),
            vec![InstanceArray { name: "items".into(), struct_name: "item".into(), slots: vec!["inst_001".into()] }],
        );
        bundle.derived.push(Macro { name: "ITEMS_LEN".into(), value: "1".into() });
        bundle
    }

    fn render(bundle: &Bundle) -> Output {
        let settings = EmitSettings::default();
        let mut cg = Codegen::new(&settings);
        cg.emit(bundle);
        cg.into_output()
    }

    #[test]
    fn settings_follow_the_header_path() {
        let settings = EmitSettings::for_header(Path::new("out/gen-config.h"));
        assert_eq!(settings.include_guard, "GEN_CONFIG_H");
        assert_eq!(settings.header_include, "gen-config.h");
        assert_eq!(EmitSettings::default().include_guard, "CONFIG_HEADER_H");
    }

    #[test]
    fn declarations_layout() {
        let out = render(&sample_bundle()).declarations;
        assert!(out.contains("#ifndef CONFIG_HEADER_H\n#define CONFIG_HEADER_H\n"));
        // `NULL` members need <stddef.h> whatever the runtime header pulls in
        assert!(out.contains("#include <stdbool.h>\n#include <stddef.h>\n"));
        assert!(out.contains("#define MAX_LEN 8\n#define WHITELIST_MASK_LEN 32\n"));
        assert!(out.contains("struct item;\n"));
        assert!(out.contains("struct item {\n    const char **tags;\n    const char *name;\n    int weight;\n};\n"));
        assert!(out.contains("extern const char *pages[];\n"));
        assert!(out.contains("extern struct item inst_001;\n"));
        assert!(out.contains("extern struct item items[1];\n"));
        assert!(out.contains("#define ITEMS_LEN 1\n"));
        assert!(out.ends_with("void init_config_vars(void);\n\n#endif /* CONFIG_HEADER_H */\n"));
        // macros come before anything that could use them
        assert!(out.find("#define MAX_LEN").unwrap() < out.find("struct item {").unwrap());
    }

    #[test]
    fn definitions_layout() {
        let out = render(&sample_bundle()).definitions;
        assert!(out.contains("#include \"config_header.h\"\n"));
        assert!(out.contains("const char *pages[] = {\"/\"};\n"));
        assert!(out.contains("struct item inst_001 = {\n    .name = \"a\",\n    .weight = 3,\n};\n"));
        assert!(out.contains("struct item items[1];\n"));
        assert!(out.contains("void init_config_vars(void) {\n    items[0] = inst_001;\n}\n"));
        assert!(!out.contains("extern"));
        assert!(out.find("struct item items[1];").unwrap() < out.find("void init_config_vars").unwrap());
    }

    #[test]
    fn empty_bundle_still_renders_a_complete_pair() {
        let out = render(&Bundle::default());
        assert!(out.declarations.contains("#define WHITELIST_MASK_LEN 32"));
        assert!(!out.declarations.contains("Derived macros"));
        assert!(out.definitions.ends_with("void init_config_vars(void) {\n}\n"));
    }
}
