//! Schema-driven configuration compiler for the shim's C runtime.
//!
//! Pipeline: build schema → set values (clone per key) → resolve defaults →
//! validate (fail fast) → lower to a [`ir::Bundle`] → render two C streams.
pub mod cli;
pub mod codegen;
pub mod encode;
pub mod error;
pub mod ir;
pub mod lower;
pub mod schema;
pub mod source;
pub mod tree;

use serde_json::Value;

use crate::codegen::{Codegen, EmitSettings, Output};
use crate::error::CompileError;
use crate::ir::Bundle;
use crate::tree::Multi;

#[derive(Debug, Clone)]
pub struct Compilation {
    pub bundle: Bundle,
    pub output: Output,
}

/// Feed a parsed document through the schema: set, default, validate.
pub fn resolve(document: &Value) -> Result<Multi, CompileError> {
    let mut root = schema::build()?;
    root.set_value("", document)?;
    tracing::info!("values set");
    root.resolve_defaults("");
    tracing::info!("defaults resolved");
    root.validate("")?;
    tracing::info!("configuration validated");
    Ok(root)
}

pub fn compile_document(document: &Value, settings: &EmitSettings) -> Result<Compilation, CompileError> {
    let root = resolve(document)?;
    let bundle = lower::lower_to_bundle(&root)?;
    tracing::info!(
        structs = bundle.structs.len(),
        instances = bundle.instances.values().map(Vec::len).sum::<usize>(),
        "bundle lowered"
    );
    let mut cg = Codegen::new(settings);
    cg.emit(&bundle);
    Ok(Compilation { bundle, output: cg.into_output() })
}

/// Parse (with `#` comment lines) and compile.
pub fn compile_str(text: &str, settings: &EmitSettings) -> Result<Compilation, CompileError> {
    let document = source::parse_document(text)?;
    tracing::info!("configuration parsed");
    compile_document(&document, settings)
}
