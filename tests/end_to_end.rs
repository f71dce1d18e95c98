use std::collections::BTreeMap;

use serde_json::{json, Value};
use shim_config::codegen::EmitSettings;
use shim_config::error::CompileError;
use shim_config::ir::{Bundle, Instance};
use shim_config::{compile_document, compile_str, Compilation};

const BASIC: &str = include_str!("../fixtures/basic.json");
const PARAMS: &str = include_str!("../fixtures/params.json");

fn compile(text: &str) -> Compilation {
    compile_str(text, &EmitSettings::default()).unwrap()
}

fn basic_document() -> Value {
    shim_config::source::parse_document(BASIC).unwrap()
}

fn compile_error(document: Value) -> CompileError {
    compile_document(&document, &EmitSettings::default()).unwrap_err()
}

fn instance<'a>(bundle: &'a Bundle, struct_name: &str, label: &str) -> &'a Instance {
    let quoted = format!("\"{label}\"");
    bundle.instances[struct_name]
        .iter()
        .find(|inst| inst.fields.iter().any(|(k, v)| k == "name" && *v == quoted))
        .unwrap_or_else(|| panic!("no {struct_name} instance named {label}"))
}

fn fields(inst: &Instance) -> BTreeMap<&str, &str> {
    inst.fields.iter().map(|(k, v)| (k.as_str(), v.as_str())).collect()
}

/// Re-serialize every object with its keys reversed.
fn reversed(value: &Value) -> Value {
    match value {
        Value::Object(map) => {
            Value::Object(map.iter().rev().map(|(k, v)| (k.clone(), reversed(v))).collect())
        }
        Value::Array(items) => Value::Array(items.iter().map(reversed).collect()),
        other => other.clone(),
    }
}

// ---- Emission ---- //

#[test]
fn single_override_inherits_everything_else() {
    let compilation = compile(BASIC);
    let bundle = &compilation.bundle;

    let pages = &bundle.instances["page_conf"];
    assert_eq!(pages.len(), 2, "one path instance plus the default instance");
    assert_eq!(pages[0].name, "default_page_conf");
    assert_eq!(bundle.arrays["page_conf"][0].slots, [pages[1].name.clone()]);

    let default = fields(instance(bundle, "page_conf", "*"));
    let root = fields(instance(bundle, "page_conf", "/"));
    assert_eq!(root["requires_login"], "false");
    assert_eq!(default["requires_login"], "true");
    for (member, value) in &default {
        if !matches!(*member, "name" | "requires_login") {
            assert_eq!(root.get(member), Some(value), "member {member}");
        }
    }
    assert_eq!(root["request_types"], "(HTTP_REQ_GET | HTTP_REQ_POST)");
    assert!(!root.contains_key("params"), "unset params are left zero-initialised");
}

#[test]
fn declarations_carry_macros_externs_and_derived_values() {
    let out = compile(BASIC).output.declarations;
    assert!(out.contains("#define HTTPS_CERTIFICATE \"cert.pem\"\n"));
    assert!(out.contains("#define MAX_HEADER_FIELD_LEN 256\n"));
    assert!(out.contains("#define ENABLE_HEADER_VALUE_CHECK false\n"));
    assert!(out.contains("#define WHITELIST_MASK_LEN 32\n"));
    assert!(out.contains("extern const char *successful_login_pages[];\n"));
    assert!(out.contains("extern struct page_conf default_page_conf;\n"));
    assert!(out.contains("extern struct page_conf pages_conf[1];\n"));
    assert!(out.contains("#define SUCCESSFUL_LOGIN_PAGES_LEN 1\n"));
    assert!(out.contains("#define ENABLE_HEADERS_CHECK (ENABLE_HEADER_FIELD_CHECK || ENABLE_HEADER_VALUE_CHECK)\n"));
    assert!(out.contains("#define PAGES_CONF_LEN 1\n"));
    assert!(out.contains("struct page_conf {\n"));
    assert!(out.contains("    struct params *params;\n    unsigned int params_len;\n"));
}

#[test]
fn definitions_fill_arrays_in_the_initializer() {
    let out = compile(BASIC).output.definitions;
    assert!(out.contains("const char *successful_login_pages[] = {\"/account\"};\n"));
    assert!(out.contains("struct page_conf default_page_conf = {\n"));
    assert!(out.contains("struct page_conf pages_conf[1];\n"));
    assert!(out.contains("void init_config_vars(void) {\n    pages_conf[0] = inst_001;\n}\n"));
}

#[test]
fn params_merge_per_key_then_fall_back_to_their_page() {
    let bundle = compile(PARAMS).bundle;

    let search = fields(instance(&bundle, "page_conf", "/search"));
    assert_eq!(search["params_len"], "2");
    assert_eq!(search["max_param_len"], "32");
    assert_eq!(search["request_types"], "(HTTP_REQ_HEAD | HTTP_REQ_GET)");

    let login = fields(instance(&bundle, "page_conf", "/login"));
    assert_eq!(login["request_types"], "HTTP_REQ_POST");
    assert!(!login.contains_key("params"));

    let params = &bundle.instances["params"];
    // default page: q, unused; /search: page, q
    assert_eq!(params.len(), 4);
    let search_q = &params[3];
    assert_eq!(fields(search_q)["name"], "\"q\"");
    assert_eq!(fields(search_q)["max_param_len"], "8", "matching default param wins over the page");
    let search_page = &params[2];
    assert_eq!(fields(search_page)["max_param_len"], "32", "no default param: the page value applies");
    assert_ne!(fields(search_page)["whitelist"], fields(search_q)["whitelist"]);

    let arrays: Vec<&str> = bundle.arrays["params"].iter().map(|a| a.name.as_str()).collect();
    assert_eq!(arrays.len(), 2);
    assert_eq!(search["params"], arrays[1]);
    assert_eq!(bundle.arrays["page_conf"][0].slots.len(), 2);
}

#[test]
fn empty_default_param_does_not_override_the_page() {
    let mut document = basic_document();
    document["default_page_config"]["params"] = json!({"q": {}});
    document["page_config"]["/"]["max_param_len"] = json!(32);
    document["page_config"]["/"]["params"] = json!({"q": {}});
    let bundle = compile_document(&document, &EmitSettings::default()).unwrap().bundle;

    let q: Vec<_> = bundle.instances["params"].iter().map(fields).filter(|f| f["name"] == "\"q\"").collect();
    assert_eq!(q.len(), 2);
    assert_eq!(q[0]["max_param_len"], "64", "default page's own q");
    assert_eq!(q[1]["max_param_len"], "32", "page value beats the default page");
}

#[test]
fn empty_named_set_emits_null_and_zero() {
    let mut document = basic_document();
    document["page_config"]["/"]["params"] = json!({});
    let compilation = compile_document(&document, &EmitSettings::default()).unwrap();

    let root = fields(instance(&compilation.bundle, "page_conf", "/"));
    assert_eq!(root["params"], "NULL");
    assert_eq!(root["params_len"], "0");
    assert!(!compilation.bundle.arrays.contains_key("params"));
    assert!(compilation.output.definitions.contains("    .params = NULL,\n"));
    assert!(compilation.output.definitions.contains("    .params_len = 0,\n"));
    assert!(!compilation.output.definitions.contains("struct params inst_"));
}

// ---- Determinism ---- //

#[test]
fn compiling_twice_is_byte_identical() {
    for text in [BASIC, PARAMS] {
        assert_eq!(compile(text).output, compile(text).output);
    }
}

#[test]
fn key_order_does_not_matter() {
    for text in [BASIC, PARAMS] {
        let document = shim_config::source::parse_document(text).unwrap();
        let a = compile_document(&document, &EmitSettings::default()).unwrap();
        let b = compile_document(&reversed(&document), &EmitSettings::default()).unwrap();
        assert_eq!(a.output, b.output);
    }
}

// ---- Rejections ---- //

fn validation_option(err: CompileError) -> String {
    match err {
        CompileError::Validation(err) => err.option,
        other => panic!("expected a validation error, got {other}"),
    }
}

#[test]
fn path_must_start_with_a_slash() {
    let mut document = basic_document();
    document["page_config"] = json!({"login": {}});
    assert_eq!(validation_option(compile_error(document)), "page_config[login]");
}

#[test]
fn param_name_must_not_be_escaped() {
    let mut document = basic_document();
    document["page_config"]["/"]["params"] = json!({"a%20b": {}});
    assert_eq!(validation_option(compile_error(document)), "page_config[/].params[a%20b]");
}

#[test]
fn missing_section_is_rejected() {
    let mut document = basic_document();
    document.as_object_mut().unwrap().remove("global_config");
    assert_eq!(validation_option(compile_error(document)), "global_config");
}

#[test]
fn short_string_array_is_rejected() {
    let mut document = basic_document();
    document["global_config"]["successful_login_pages"] = json!([]);
    assert_eq!(validation_option(compile_error(document)), "global_config.successful_login_pages");
}

#[test]
fn unknown_option_is_rejected() {
    let mut document = basic_document();
    document["page_config"]["/"]["colour"] = json!("red");
    assert_eq!(validation_option(compile_error(document)), "page_config[/].colour");
}

#[test]
fn at_least_one_page_is_required() {
    let mut document = basic_document();
    document["page_config"] = json!({});
    assert_eq!(validation_option(compile_error(document)), "page_config");
}

#[test]
fn malformed_json_is_a_parse_error() {
    let err = compile_str("{\n# comment\n\"a\": }", &EmitSettings::default()).unwrap_err();
    let CompileError::Parse(err) = err else { panic!("expected a parse error") };
    assert_eq!(err.line(), 3);
}
