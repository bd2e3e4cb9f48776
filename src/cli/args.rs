//! Defines the command-line arguments and subcommands for the Umbra CLI.
//!
//! This module uses the `clap` crate with its "derive" feature to create a
//! declarative and type-safe argument parsing structure.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// The main CLI argument structure.
#[derive(Debug, Parser)]
#[command(
    name = "umbra",
    version,
    about = "Rewrites source text so every tracked value records where it was mutated."
)]
pub struct UmbraArgs {
    #[command(subcommand)]
    pub command: Command,
}

/// An enumeration of all available CLI subcommands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Instrument one file (or stdin, with `-`) and print or write the result.
    Instrument {
        /// The path to the source file to instrument, or `-` for stdin.
        #[arg(required = true)]
        file: PathBuf,
        /// Write the instrumented text here instead of stdout.
        #[arg(short, long)]
        output: Option<PathBuf>,
        /// Also emit the position map as JSON (to `<output>.map.json`, or to
        /// stderr when printing to stdout).
        #[arg(long)]
        map: bool,
    },
    /// Show a line diff between the original and instrumented text.
    Diff {
        /// The path to the source file to diff.
        #[arg(required = true)]
        file: PathBuf,
    },
    /// Instrument every matching file under a directory, writing siblings.
    Batch {
        /// The directory to walk.
        #[arg(required = true)]
        dir: PathBuf,
        /// Comma-separated list of file extensions to instrument.
        #[arg(long, default_value = "js,ts")]
        ext: String,
    },
    /// Show the parsed syntax tree for a file as JSON.
    Ast {
        /// The path to the source file to parse.
        #[arg(required = true)]
        file: PathBuf,
    },
}
