//! Error taxonomy for the compiler pipeline.
//!
//! Three kinds, split by who is at fault:
//! - [`SchemaError`]: the static schema itself is malformed (independent of input).
//! - [`ValidationError`]: the user's document is wrong. The only data-triggered kind.
//! - [`EmitError`]: an emission invariant broke. Never reachable from well-formed input.
use serde_json::Value;
use thiserror::Error;

// ————————————————————————————————————————————————————————————————————————————
// SCHEMA
// ————————————————————————————————————————————————————————————————————————————

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SchemaError {
    #[error("`{parent}` declares child option `{name}` more than once")]
    DuplicateChild { parent: String, name: String },

    #[error("option name `{0}` is not a valid identifier")]
    InvalidName(String),

    #[error(
        "visiting order of `{parent}` is not a permutation of its children \
         (children: {children:?}, order: {order:?})"
    )]
    VisitOrder {
        parent: String,
        children: Vec<String>,
        order: Vec<String>,
    },

    #[error("derived macro `{name}` in `{parent}` refers to `{operand}`, which is not a top-level boolean child")]
    DerivedOperand {
        parent: String,
        name: String,
        operand: String,
    },

    #[error(
        "named set `{set}` in `{parent}` takes defaults from `{from}`, \
         which is not a composite sibling visited before it"
    )]
    DefaultSource {
        parent: String,
        set: String,
        from: String,
    },

    #[error("named set `{set}` may only hold leaf options and named sets, but `{child}` is a composite")]
    NestedComposite { set: String, child: String },
}

// ————————————————————————————————————————————————————————————————————————————
// VALIDATION
// ————————————————————————————————————————————————————————————————————————————

/// A problem with the user's configuration document.
///
/// Always names the fully qualified option (e.g. `page_config[/login].params[q].whitelist`)
/// and what was actually received.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid option `{option}`: {reason} (got {kind}: {repr})")]
pub struct ValidationError {
    pub option: String,
    pub reason: String,
    pub kind: &'static str,
    pub repr: String,
}

impl ValidationError {
    pub fn new(option: impl Into<String>, reason: impl Into<String>, value: Option<&Value>) -> Self {
        let (kind, repr) = match value {
            Some(value) => (value_kind(value), value.to_string()),
            None => ("nothing", String::from("<unset>")),
        };
        Self {
            option: option.into(),
            reason: reason.into(),
            kind,
            repr,
        }
    }
}

/// JSON type name of a value, as reported in diagnostics.
pub fn value_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(n) if n.is_f64() => "float",
        Value::Number(_) => "integer",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

// ————————————————————————————————————————————————————————————————————————————
// EMISSION
// ————————————————————————————————————————————————————————————————————————————

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EmitError {
    #[error("instance name `{0}` was allocated twice")]
    DuplicateInstance(String),

    #[error("struct `{0}` was registered twice with different members")]
    ConflictingStruct(String),

    #[error("option `{0}` reached emission without a validated value")]
    Unvalidated(String),
}

// ————————————————————————————————————————————————————————————————————————————
// PIPELINE
// ————————————————————————————————————————————————————————————————————————————

#[derive(Debug, Error)]
pub enum CompileError {
    #[error("schema definition error: {0}")]
    Schema(#[from] SchemaError),

    #[error("failed to parse configuration: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("configuration error: {0}")]
    Validation(#[from] ValidationError),

    #[error("internal emission error: {0}")]
    Emit(#[from] EmitError),
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn validation_error_names_option_kind_and_repr() {
        let err =
            ValidationError::new("global_config.max_header_field_len", "must be greater than 0", Some(&json!(-3)));
        let msg = err.to_string();
        assert!(msg.contains("global_config.max_header_field_len"));
        assert!(msg.contains("integer"));
        assert!(msg.contains("-3"));
    }

    #[test]
    fn missing_values_report_unset() {
        let err = ValidationError::new("toplevel.page_config", "required option has not been specified", None);
        assert_eq!(err.kind, "nothing");
        assert_eq!(err.repr, "<unset>");
    }

    #[test]
    fn floats_and_integers_are_told_apart() {
        assert_eq!(value_kind(&json!(1.5)), "float");
        assert_eq!(value_kind(&json!(2)), "integer");
        assert_eq!(value_kind(&json!({})), "object");
    }
}
