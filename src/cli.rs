//! Command line: CONFIG HEADER SOURCE
use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::{ArgAction, Parser};
use tracing_subscriber::EnvFilter;

use crate::codegen::EmitSettings;

// ————————————————————————————————————————————————————————————————————————————
// TYPES
// ————————————————————————————————————————————————————————————————————————————

/// compile a shim configuration document into a C header and source file
#[derive(Parser, Debug)]
#[command(name = "shim-config", version)]
pub struct CommandLineInterface {
    /// configuration document (JSON; lines starting with `#` are comments)
    pub config: PathBuf,

    /// declarations output (.h)
    pub header: PathBuf,

    /// definitions output (.c)
    pub source: PathBuf,

    /// raise log verbosity (-v info, -vv debug); RUST_LOG overrides
    #[arg(short, long, action = ArgAction::Count)]
    pub verbose: u8,

    /// also print the lowered artifact bundle as JSON on stdout
    #[arg(long)]
    pub dump_bundle: bool,
}

// ————————————————————————————————————————————————————————————————————————————
// IMPLEMENTATION
// ————————————————————————————————————————————————————————————————————————————

impl CommandLineInterface {
    pub fn load() -> Self {
        Self::parse()
    }

    /// Both outputs are written, or neither is left behind.
    pub fn run(&self) -> anyhow::Result<()> {
        let text = std::fs::read_to_string(&self.config)
            .with_context(|| format!("failed to read config file {}", self.config.display()))?;
        tracing::info!(config = %self.config.display(), "parsing config file");
        let result = self.compile_and_write(&text);
        if result.is_err() {
            remove_partial(&self.header);
            remove_partial(&self.source);
        }
        result
    }

    fn compile_and_write(&self, text: &str) -> anyhow::Result<()> {
        let settings = EmitSettings::for_header(&self.header);
        let compilation = crate::compile_str(text, &settings)
            .with_context(|| format!("failed to compile {}", self.config.display()))?;
        write_output(&self.header, &compilation.output.declarations)?;
        write_output(&self.source, &compilation.output.definitions)?;
        if self.dump_bundle {
            let json = serde_json::to_string_pretty(&compilation.bundle).context("failed to serialize bundle")?;
            println!("{json}");
        }
        Ok(())
    }
}

/// `RUST_LOG` wins; otherwise `-v` count picks the level.
pub fn init_tracing(verbose: u8) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| match verbose {
        0 => EnvFilter::new("warn"),
        1 => EnvFilter::new("info"),
        2 => EnvFilter::new("debug"),
        _ => EnvFilter::new("trace"),
    });
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init();
}

// ————————————————————————————————————————————————————————————————————————————
// INTERNAL HELPERS
// ————————————————————————————————————————————————————————————————————————————

fn write_output(path: &Path, contents: &str) -> anyhow::Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).with_context(|| format!("failed to create {}", parent.display()))?;
    }
    std::fs::write(path, contents).with_context(|| format!("failed to write {}", path.display()))?;
    tracing::info!(output = %path.display(), "wrote output");
    Ok(())
}

fn remove_partial(path: &Path) {
    if path.exists() {
        match std::fs::remove_file(path) {
            Ok(()) => tracing::warn!(output = %path.display(), "removed partial output"),
            Err(error) => tracing::warn!(output = %path.display(), %error, "failed to remove partial output"),
        }
    }
}
