//! The server's option schema.
//!
//! Three top-level sections, visited in this order because each later one
//! reads what the earlier ones resolved:
//! - `default_page_config`: fallback policy, emitted as `default_page_conf`
//! - `global_config`: server-wide settings, all surfaced as macros/globals
//! - `page_config`: per-path policy, one `page_conf` instance per path
use crate::error::SchemaError;
use crate::tree::{
    DefaultSource, DerivedMacro, Multi, NamedSet, OptionNode, Overlay, Predicate, StringArraySpec,
};

pub const DEFAULT_PAGE_CONFIG: &str = "default_page_config";
pub const GLOBAL_CONFIG: &str = "global_config";
pub const PAGE_CONFIG: &str = "page_config";

pub const PAGE_STRUCT: &str = "page_conf";
pub const PARAM_STRUCT: &str = "params";
pub const PAGES_ARRAY: &str = "pages_conf";
pub const DEFAULT_PAGE_INSTANCE: &str = "default_page_conf";
pub const DEFAULT_PAGE_LABEL: &str = "*";

/// Parameter names are matched raw; a `%` would mean the config author wrote
/// a percent-encoded name the shim never sees.
pub const PARAM_ESCAPE: char = '%';

pub const IS_PAGE: Predicate = Predicate { describe: "must start with '/'", test: is_page };
pub const IS_PARAM_NAME: Predicate = Predicate {
    describe: "must be non-empty and must not contain '%'",
    test: is_param_name,
};

pub fn is_page(s: &str) -> bool {
    s.starts_with('/')
}

pub fn is_param_name(s: &str) -> bool {
    !s.is_empty() && !s.contains(PARAM_ESCAPE)
}

fn param_options() -> Vec<OptionNode> {
    vec![OptionNode::positive_integer("max_param_len"), OptionNode::whitelist("whitelist")]
}

fn params_set() -> Result<NamedSet, SchemaError> {
    let template = Multi::new(PARAM_STRUCT, vec![], param_options())?;
    Ok(NamedSet::new("params", template, IS_PARAM_NAME, PARAM_STRUCT)?.with_defaults(DefaultSource::Parent))
}

/// Options of one page, minus `params`.
fn page_leaves() -> Vec<OptionNode> {
    let mut options = vec![
        OptionNode::positive_integer("max_request_payload_len"),
        OptionNode::boolean("params_allowed"),
        OptionNode::http_flags("request_types"),
        OptionNode::boolean("requires_login"),
    ];
    // page-level fallbacks for every parameter
    options.extend(param_options());
    options
}

fn default_page_config() -> Result<OptionNode, SchemaError> {
    let params = OptionNode::named_set("params", params_set()?);
    let multi = Multi::new(DEFAULT_PAGE_CONFIG, page_leaves(), vec![params])?;
    Ok(OptionNode::overlay(
        DEFAULT_PAGE_CONFIG,
        Overlay {
            multi,
            struct_name: PAGE_STRUCT.to_string(),
            instance_name: DEFAULT_PAGE_INSTANCE.to_string(),
            label: DEFAULT_PAGE_LABEL.to_string(),
        },
    ))
}

fn page_config() -> Result<OptionNode, SchemaError> {
    let mut options = page_leaves();
    options.push(OptionNode::named_set("params", params_set()?));
    let template = Multi::new(PAGE_STRUCT, vec![], options)?;
    let set = NamedSet::new(PAGE_CONFIG, template, IS_PAGE, PAGE_STRUCT)?
        .with_defaults(DefaultSource::Sibling(DEFAULT_PAGE_CONFIG.to_string()))
        .with_array_name(PAGES_ARRAY)
        .with_min_entries(1);
    Ok(OptionNode::named_set(PAGE_CONFIG, set))
}

fn global_config() -> Result<OptionNode, SchemaError> {
    let login_pages = StringArraySpec { min_len: 1, allowed: None, element: Some(IS_PAGE) };
    let required = vec![
        OptionNode::string("https_certificate").top_level(),
        OptionNode::string("https_private_key").top_level(),
        OptionNode::string_array("successful_login_pages", login_pages).top_level(),
        OptionNode::positive_integer("max_header_field_len").top_level(),
        OptionNode::positive_integer("max_header_value_len").top_level(),
        OptionNode::boolean("enable_header_field_check").top_level(),
        OptionNode::boolean("enable_header_value_check").top_level(),
        OptionNode::whitelist("header_field_whitelist").top_level(),
        OptionNode::whitelist("header_value_whitelist").top_level(),
    ];
    let multi = Multi::new(GLOBAL_CONFIG, required, vec![])?
        .with_order(
            GLOBAL_CONFIG,
            &[
                "https_certificate",
                "https_private_key",
                "successful_login_pages",
                "enable_header_field_check",
                "max_header_field_len",
                "header_field_whitelist",
                "enable_header_value_check",
                "max_header_value_len",
                "header_value_whitelist",
            ],
        )?
        .with_derived(
            GLOBAL_CONFIG,
            DerivedMacro::any_of("ENABLE_HEADERS_CHECK", &["enable_header_field_check", "enable_header_value_check"]),
        )?;
    Ok(OptionNode::multi(GLOBAL_CONFIG, multi))
}

/// Build the full schema. Fresh and unset on every call.
pub fn build() -> Result<Multi, SchemaError> {
    Multi::new("toplevel", vec![default_page_config()?, global_config()?, page_config()?], vec![])?
        .with_order("toplevel", &[DEFAULT_PAGE_CONFIG, GLOBAL_CONFIG, PAGE_CONFIG])
}
