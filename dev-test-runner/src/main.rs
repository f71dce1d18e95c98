//! Fixture runner: compile every case in `fixtures/cases.json` twice and check
//! the outcome and that both runs agree byte for byte.
mod path_de;

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use colored::Colorize;
use regex::Regex;
use serde::Deserialize;
use shim_config::codegen::EmitSettings;

#[derive(Debug, Deserialize)]
struct CaseFile {
    cases: Vec<Case>,
}

#[derive(Debug, Deserialize)]
struct Case {
    name: String,
    /// Relative to the fixtures directory.
    config: PathBuf,
    expect: Expect,
    #[serde(default)]
    header_contains: Vec<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "snake_case")]
enum Expect {
    Ok,
    /// Regex matched against the rendered error.
    Error(String),
}

fn run_case(fixtures: &Path, case: &Case) -> Result<(), String> {
    let path = fixtures.join(&case.config);
    let text = std::fs::read_to_string(&path).map_err(|e| format!("failed to read {}: {e}", path.display()))?;
    let settings = EmitSettings::default();
    let first = shim_config::compile_str(&text, &settings);
    let second = shim_config::compile_str(&text, &settings);

    match (&case.expect, first, second) {
        (Expect::Ok, Ok(a), Ok(b)) => {
            if a.output != b.output {
                return Err("two compiles of the same input differ".into());
            }
            for needle in &case.header_contains {
                if !a.output.declarations.contains(needle.as_str()) {
                    return Err(format!("header is missing {needle:?}"));
                }
            }
            Ok(())
        }
        (Expect::Ok, Err(e), _) | (Expect::Ok, _, Err(e)) => Err(format!("expected success, got: {e}")),
        (Expect::Error(pattern), Err(a), Err(b)) => {
            let re = Regex::new(pattern).map_err(|e| format!("bad expectation regex: {e}"))?;
            let (a, b) = (a.to_string(), b.to_string());
            if a != b {
                return Err(format!("two compiles failed differently:\n  {a}\n  {b}"));
            }
            if !re.is_match(&a) {
                return Err(format!("error {a:?} does not match /{pattern}/"));
            }
            Ok(())
        }
        (Expect::Error(pattern), _, _) => Err(format!("expected an error matching /{pattern}/, compile succeeded")),
    }
}

fn main() -> ExitCode {
    let fixtures = std::env::args()
        .nth(1)
        .map(PathBuf::from)
        .unwrap_or_else(|| Path::new(env!("CARGO_MANIFEST_DIR")).join("../fixtures"));
    let index = fixtures.join("cases.json");
    let cases = std::fs::read_to_string(&index)
        .map_err(|e| format!("failed to read {}: {e}", index.display()))
        .and_then(|src| path_de::from_str_with_path::<CaseFile>(&src));
    let cases = match cases {
        Ok(x) => x.cases,
        Err(error) => {
            eprintln!("{} {error}", "error:".red().bold());
            return ExitCode::FAILURE;
        }
    };

    let mut failed = 0usize;
    for case in &cases {
        match run_case(&fixtures, case) {
            Ok(()) => eprintln!("{} {}", "✅".green(), case.name),
            Err(reason) => {
                failed += 1;
                eprintln!("{} {}: {reason}", "❌".red(), case.name);
            }
        }
    }
    eprintln!("{} passed, {} failed", cases.len() - failed, failed);
    if failed == 0 { ExitCode::SUCCESS } else { ExitCode::FAILURE }
}
