//! Static analysis support for the rewrite engine: the incremental binding
//! index and the initializer classifier. Both are heuristics by design; see
//! `classify` for the documented limits.

pub mod bindings;
pub mod classify;

pub use bindings::{BindingInfo, InitShape, ScopeStack};
pub use classify::{classify, Verdict};
