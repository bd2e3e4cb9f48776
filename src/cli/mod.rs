//! The Umbra command-line interface.
//!
//! This module is the entry point for all CLI commands and orchestrates the
//! core library functions: read input, run the instrument pipeline, write
//! output. Errors surface as miette diagnostics and a nonzero exit.

use std::fs;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::process;

use clap::Parser;
use difference::Changeset;
use walkdir::WalkDir;

use crate::cli::args::{Command, UmbraArgs};
use crate::engine;
use crate::errors::{io_error, print_error, SourceContext, UmbraError};
use crate::syntax::parser;

pub mod args;
pub mod output;

/// The main entry point for the CLI.
pub fn run() {
    let args = UmbraArgs::parse();

    let result = match args.command {
        Command::Instrument { file, output, map } => handle_instrument(&file, output.as_deref(), map),
        Command::Diff { file } => handle_diff(&file),
        Command::Batch { dir, ext } => handle_batch(&dir, &ext),
        Command::Ast { file } => handle_ast(&file),
    };

    if let Err(e) = result {
        print_error(e);
        process::exit(1);
    }
}

// ----------------------------------------------------------------------------
// Subcommand handlers
// ----------------------------------------------------------------------------

fn handle_instrument(
    file: &Path,
    output: Option<&Path>,
    want_map: bool,
) -> Result<(), UmbraError> {
    let (name, text) = read_input(file)?;
    let source = SourceContext::from_file(&name, &text);
    let instrumented = engine::instrument(&text, &source)?;

    let map_json = if want_map {
        Some(
            serde_json::to_string_pretty(&instrumented.map)
                .map_err(|e| io_error(format!("could not encode position map: {e}")))?,
        )
    } else {
        None
    };

    match output {
        Some(path) => {
            fs::write(path, format!("{}\n", instrumented.code))
                .map_err(|e| io_error(format!("could not write {}: {e}", path.display())))?;
            if let Some(json) = map_json {
                let map_path = map_sibling(path);
                fs::write(&map_path, json).map_err(|e| {
                    io_error(format!("could not write {}: {e}", map_path.display()))
                })?;
            }
        }
        None => {
            println!("{}", instrumented.code);
            if let Some(json) = map_json {
                eprintln!("{json}");
            }
        }
    }
    Ok(())
}

fn handle_diff(file: &Path) -> Result<(), UmbraError> {
    let (name, text) = read_input(file)?;
    let source = SourceContext::from_file(&name, &text);
    let instrumented = engine::instrument(&text, &source)?;
    let changeset = Changeset::new(text.trim_end(), &instrumented.code, "\n");
    output::print_diff(&changeset);
    Ok(())
}

fn handle_batch(dir: &Path, ext: &str) -> Result<(), UmbraError> {
    let wanted: Vec<&str> = ext.split(',').map(str::trim).collect();
    let mut done = 0usize;
    let mut failed = 0usize;

    for entry in WalkDir::new(dir).into_iter().filter_map(Result::ok) {
        let path = entry.path();
        if !entry.file_type().is_file() || !has_extension(path, &wanted) {
            continue;
        }
        // Skip our own previous output.
        if path
            .file_stem()
            .and_then(|s| s.to_str())
            .map(|s| s.ends_with(".umbra"))
            .unwrap_or(false)
        {
            continue;
        }
        match instrument_file(path) {
            Ok(()) => {
                done += 1;
                output::print_batch_line(path, true);
            }
            Err(e) => {
                failed += 1;
                output::print_batch_line(path, false);
                print_error(e);
            }
        }
    }

    output::print_batch_summary(done, failed);
    if failed > 0 {
        return Err(io_error(format!("{failed} file(s) failed to instrument")));
    }
    Ok(())
}

fn handle_ast(file: &Path) -> Result<(), UmbraError> {
    let (name, text) = read_input(file)?;
    let source = SourceContext::from_file(&name, &text);
    let program = parser::parse(&text, &source)?;
    let json = serde_json::to_string_pretty(&program)
        .map_err(|e| io_error(format!("could not encode syntax tree: {e}")))?;
    println!("{json}");
    Ok(())
}

// ----------------------------------------------------------------------------
// Helpers
// ----------------------------------------------------------------------------

fn read_input(file: &Path) -> Result<(String, String), UmbraError> {
    if file == Path::new("-") {
        let mut text = String::new();
        std::io::stdin()
            .read_to_string(&mut text)
            .map_err(|e| io_error(format!("could not read stdin: {e}")))?;
        return Ok(("<stdin>".to_string(), text));
    }
    let text = fs::read_to_string(file)
        .map_err(|e| io_error(format!("could not read {}: {e}", file.display())))?;
    Ok((file.display().to_string(), text))
}

fn instrument_file(path: &Path) -> Result<(), UmbraError> {
    let text = fs::read_to_string(path)
        .map_err(|e| io_error(format!("could not read {}: {e}", path.display())))?;
    let source = SourceContext::from_file(path.display().to_string(), &text);
    let instrumented = engine::instrument(&text, &source)?;
    let out_path = umbra_sibling(path);
    fs::write(&out_path, format!("{}\n", instrumented.code))
        .map_err(|e| io_error(format!("could not write {}: {e}", out_path.display())))
}

fn has_extension(path: &Path, wanted: &[&str]) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| wanted.contains(&e))
        .unwrap_or(false)
}

/// `src/app.js` -> `src/app.umbra.js`
fn umbra_sibling(path: &Path) -> PathBuf {
    let stem = path
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("out");
    let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("js");
    path.with_file_name(format!("{stem}.umbra.{ext}"))
}

/// `out.js` -> `out.js.map.json`
fn map_sibling(path: &Path) -> PathBuf {
    let mut name = path.as_os_str().to_os_string();
    name.push(".map.json");
    PathBuf::from(name)
}
