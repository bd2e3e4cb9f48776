//! Pipeline orchestration: parse, rewrite, print.
//!
//! This is the one-call entry point the CLI and tests go through. The entire
//! transform either completes or fails; there is no partial instrumentation
//! of unparsable input.

use crate::errors::{SourceContext, UmbraError};
use crate::rewrite;
use crate::syntax::printer::{self, PositionMap};
use crate::syntax::parser;

/// The result of instrumenting one module of source text.
#[derive(Debug, Clone)]
pub struct Instrumented {
    /// The rewritten source text.
    pub code: String,
    /// Generated-line to original-line correspondences for every printed
    /// statement that came from the input.
    pub map: PositionMap,
}

/// Instruments `source_text`, returning the rewritten text and its position
/// map.
pub fn instrument(source_text: &str, source: &SourceContext) -> Result<Instrumented, UmbraError> {
    let mut program = parser::parse(source_text, source)?;
    rewrite::rewrite(&mut program, source)?;
    let (code, map) = printer::print_with_map(&program);
    Ok(Instrumented { code, map })
}

/// Convenience wrapper for callers without a file on disk.
pub fn instrument_str(source_text: &str, name: &str) -> Result<Instrumented, UmbraError> {
    let source = SourceContext::from_file(name, source_text);
    instrument(source_text, &source)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pipeline_runs_end_to_end() {
        let out = instrument_str("let a = 2;", "inline.js").expect("instrument");
        assert!(out.code.starts_with("let a = 2;"));
        assert!(out.code.contains("a_shadow"));
        assert_eq!(out.map.lines[0].generated, 1);
        assert_eq!(out.map.lines[0].original, 1);
    }

    #[test]
    fn empty_input_is_identity() {
        let out = instrument_str("", "inline.js").expect("instrument");
        assert_eq!(out.code, "");
        assert!(out.map.lines.is_empty());
    }

    #[test]
    fn parse_failure_aborts_without_partial_output() {
        let err = instrument_str("let = ;", "inline.js").unwrap_err();
        assert_eq!(
            err.kind.category(),
            crate::errors::ErrorCategory::Parse
        );
    }
}
