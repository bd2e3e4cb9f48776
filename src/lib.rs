pub use crate::errors::{ErrorKind, ErrorReporting, PhaseContext, SourceContext, UmbraError};

pub mod analysis;
pub mod cli;
pub mod engine;
pub mod errors;
pub mod rewrite;
pub mod syntax;
