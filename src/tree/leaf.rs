use serde_json::Value;

use crate::encode::{self, Bitmask};
use crate::error::{EmitError, ValidationError};

/// Named string predicate, used for element checks and named-set keys.
#[derive(Debug, Clone, Copy)]
pub struct Predicate {
    pub describe: &'static str,
    pub test: fn(&str) -> bool,
}

impl Predicate {
    pub fn holds(&self, s: &str) -> bool {
        (self.test)(s)
    }
}

#[derive(Debug, Clone, Default)]
pub struct StringArraySpec {
    pub min_len: usize,
    pub allowed: Option<Vec<String>>,
    pub element: Option<Predicate>,
}

#[derive(Debug, Clone)]
pub enum LeafKind {
    Boolean,
    PositiveInteger,
    String,
    StringArray(StringArraySpec),
    Whitelist,
    HttpFlags,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Origin {
    Explicit,
    Default,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Assigned {
    pub raw: Value,
    pub origin: Origin,
}

/// Typed result of a successful validation. Emission reads only this.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolved {
    Bool(bool),
    Int(i64),
    Str(String),
    Strings(Vec<String>),
    Mask(Bitmask),
    Flags(Vec<&'static str>),
}

#[derive(Debug, Clone)]
pub struct Leaf {
    pub kind: LeafKind,
    value: Option<Assigned>,
    resolved: Option<Resolved>,
}

/// Target `int` range for positive integers.
const POSITIVE_INT_MAX: i64 = i32::MAX as i64;

impl Leaf {
    pub fn new(kind: LeafKind) -> Self {
        Self { kind, value: None, resolved: None }
    }

    pub fn is_set(&self) -> bool {
        self.value.is_some()
    }
    pub fn is_explicit(&self) -> bool {
        matches!(self.value, Some(Assigned { origin: Origin::Explicit, .. }))
    }
    pub fn assigned(&self) -> Option<&Assigned> {
        self.value.as_ref()
    }
    pub fn raw(&self) -> Option<&Value> {
        self.value.as_ref().map(|a| &a.raw)
    }
    pub fn resolved(&self) -> Option<&Resolved> {
        self.resolved.as_ref()
    }

    pub fn set_value(&mut self, option: &str, value: &Value) -> Result<(), ValidationError> {
        if self.is_set() {
            return Err(ValidationError::new(option, "value has already been set", Some(value)));
        }
        self.value = Some(Assigned { raw: value.clone(), origin: Origin::Explicit });
        Ok(())
    }

    /// Take `other`'s value if this leaf was never set. Deep copy.
    pub fn fill_from(&mut self, other: &Leaf) {
        if self.value.is_some() {
            return;
        }
        if let Some(assigned) = &other.value {
            self.value = Some(Assigned { raw: assigned.raw.clone(), origin: Origin::Default });
        }
    }

    /// Normalize, then check. Stores the typed value on success.
    pub fn validate(&mut self, option: &str) -> Result<(), ValidationError> {
        let Some(assigned) = &self.value else {
            return Err(ValidationError::new(option, "value has not been set", None));
        };
        let normalized = normalize(&self.kind, &assigned.raw);
        self.resolved = Some(check(&self.kind, option, &normalized)?);
        Ok(())
    }

    // ---------------------------- C encoding ------------------------------ //

    pub fn c_type(&self) -> &'static str {
        match self.kind {
            LeafKind::Boolean => "bool",
            LeafKind::PositiveInteger | LeafKind::HttpFlags => "int",
            LeafKind::String | LeafKind::Whitelist => "const char *",
            LeafKind::StringArray(_) => "const char **",
        }
    }

    fn resolved_or(&self, option: &str) -> Result<&Resolved, EmitError> {
        self.resolved.as_ref().ok_or_else(|| EmitError::Unvalidated(option.to_string()))
    }

    /// Text of this leaf as a struct-member initializer.
    pub fn member_value(&self, option: &str) -> Result<String, EmitError> {
        Ok(match self.resolved_or(option)? {
            Resolved::Strings(items) if items.is_empty() => String::from("NULL"),
            Resolved::Strings(items) => format!("(const char *[]){}", encode::c_string_list(items)),
            other => scalar_text(other),
        })
    }

    /// Text of this leaf as a macro body. Arrays never become macros.
    pub fn macro_value(&self, option: &str) -> Result<Option<String>, EmitError> {
        Ok(match self.resolved_or(option)? {
            Resolved::Strings(_) => None,
            other => Some(scalar_text(other)),
        })
    }

    pub fn strings(&self, option: &str) -> Result<&[String], EmitError> {
        match self.resolved_or(option)? {
            Resolved::Strings(items) => Ok(items.as_slice()),
            _ => Err(EmitError::Unvalidated(option.to_string())),
        }
    }
}

fn scalar_text(resolved: &Resolved) -> String {
    match resolved {
        Resolved::Bool(b) => String::from(if *b { "true" } else { "false" }),
        Resolved::Int(n) => n.to_string(),
        Resolved::Str(s) => encode::c_string_literal(s),
        Resolved::Mask(mask) => encode::c_bytes_literal(mask),
        Resolved::Flags(methods) => encode::http_flags_expr(methods),
        Resolved::Strings(items) => encode::c_string_list(items),
    }
}

// ------------------------------ Normalize --------------------------------- //

/// Coercion phase. Runs before any range check.
///
/// Positive integers accept JSON floats, truncated toward zero; everything
/// else passes through untouched.
pub fn normalize(kind: &LeafKind, raw: &Value) -> Value {
    match (kind, raw) {
        (LeafKind::PositiveInteger, Value::Number(n)) if n.is_f64() => {
            match n.as_f64().map(f64::trunc) {
                Some(t) if t >= i64::MIN as f64 && t <= i64::MAX as f64 => Value::from(t as i64),
                _ => raw.clone(),
            }
        }
        _ => raw.clone(),
    }
}

// -------------------------------- Check ----------------------------------- //

fn check(kind: &LeafKind, option: &str, value: &Value) -> Result<Resolved, ValidationError> {
    let fail = |reason: String| ValidationError::new(option, reason, Some(value));
    match kind {
        LeafKind::Boolean => match value {
            Value::Bool(b) => Ok(Resolved::Bool(*b)),
            _ => Err(fail("must be a boolean".into())),
        },
        LeafKind::PositiveInteger => {
            let n = match (value.as_i64(), value.as_u64()) {
                (Some(n), _) => n,
                (None, Some(_)) => return Err(fail(format!("must be at most {POSITIVE_INT_MAX}"))),
                (None, None) => return Err(fail("must be an integer".into())),
            };
            if n <= 0 {
                return Err(fail("must be greater than 0".into()));
            }
            if n > POSITIVE_INT_MAX {
                return Err(fail(format!("must be at most {POSITIVE_INT_MAX}")));
            }
            Ok(Resolved::Int(n))
        }
        LeafKind::String => match value {
            Value::String(s) => Ok(Resolved::Str(s.clone())),
            _ => Err(fail("must be a string".into())),
        },
        LeafKind::StringArray(spec) => check_strings(spec, value).map(Resolved::Strings).map_err(fail),
        LeafKind::Whitelist => {
            let Value::String(pattern) = value else {
                return Err(fail("must be a regular expression string".into()));
            };
            let re = encode::whitelist_regex(pattern)
                .map_err(|e| fail(format!("is not a valid regular expression: {e}")))?;
            Ok(Resolved::Mask(encode::whitelist_mask(&re)))
        }
        LeafKind::HttpFlags => {
            let items = check_strings(&StringArraySpec::default(), value).map_err(fail)?;
            let methods = encode::canonical_methods(items.iter().map(String::as_str)).map_err(|bad| {
                fail(format!(
                    "method {bad:?} is not one of {}",
                    encode::HTTP_METHODS.join(", ")
                ))
            })?;
            Ok(Resolved::Flags(methods))
        }
    }
}

fn check_strings(spec: &StringArraySpec, value: &Value) -> Result<Vec<String>, String> {
    let Value::Array(items) = value else {
        return Err("must be a list of strings".into());
    };
    let mut out = Vec::with_capacity(items.len());
    for item in items {
        match item {
            Value::String(s) => out.push(s.clone()),
            other => return Err(format!("element {other} is not a string")),
        }
    }
    if out.len() < spec.min_len {
        return Err(format!("must contain at least {} element(s)", spec.min_len));
    }
    if let Some(allowed) = &spec.allowed {
        if let Some(bad) = out.iter().find(|s| !allowed.contains(s)) {
            return Err(format!("element {bad:?} is not in the allowed set {allowed:?}"));
        }
    }
    if let Some(pred) = &spec.element {
        if let Some(bad) = out.iter().find(|s| !pred.holds(s)) {
            return Err(format!("invalid element {bad:?}: {}", pred.describe));
        }
    }
    Ok(out)
}

// ------------------------------- Tests ------------------------------------ //
