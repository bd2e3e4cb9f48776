//! Classifier
//!
//! Given a binding, decide how its value can be tracked. The split is a
//! heuristic, not a soundness proof: nested call results, destructured
//! declarations, and re-exported aliases are all approximated. Ambiguous
//! cases are a documented limitation of the instrumentation, not something
//! the engine second-guesses at rewrite time.

use crate::analysis::bindings::{BindingInfo, InitShape};

/// The classifier's verdict for one name at one point in the tree.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Verdict {
    /// Trackable through a companion shadow variable.
    Primitive,
    /// An object literal binding - tracked in place through metadata slots.
    ObjectLike,
    /// A bare reference to another binding; tracking it separately would
    /// double-count mutations.
    Alias,
    /// No binding is resolvable - a candidate implicit global.
    Unknown,
}

/// Classify a resolved (or unresolved) binding.
///
/// OBJECT_LIKE iff the initializer was an object literal, ALIAS iff it was a
/// bare identifier, UNKNOWN iff nothing resolved, PRIMITIVE otherwise -
/// numbers, strings, booleans, `null`, token-constructor calls, functions,
/// and array literals all land here. Array-literal bindings additionally get
/// the mutation-call treatment in the engine, keyed off their `InitShape`.
pub fn classify(binding: Option<&BindingInfo>) -> Verdict {
    match binding {
        None => Verdict::Unknown,
        Some(info) => match info.shape {
            InitShape::ObjectLiteral => Verdict::ObjectLike,
            InitShape::Alias => Verdict::Alias,
            InitShape::ArrayLiteral
            | InitShape::CallResult
            | InitShape::Function
            | InitShape::Value
            | InitShape::Absent => Verdict::Primitive,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn info(shape: InitShape) -> BindingInfo {
        BindingInfo {
            shape,
            shadowed: false,
        }
    }

    #[test]
    fn object_literals_classify_object_like() {
        assert_eq!(
            classify(Some(&info(InitShape::ObjectLiteral))),
            Verdict::ObjectLike
        );
    }

    #[test]
    fn aliases_classify_alias() {
        assert_eq!(classify(Some(&info(InitShape::Alias))), Verdict::Alias);
    }

    #[test]
    fn unresolved_names_classify_unknown() {
        assert_eq!(classify(None), Verdict::Unknown);
    }

    #[test]
    fn everything_else_classifies_primitive() {
        for shape in [
            InitShape::ArrayLiteral,
            InitShape::CallResult,
            InitShape::Function,
            InitShape::Value,
            InitShape::Absent,
        ] {
            assert_eq!(classify(Some(&info(shape))), Verdict::Primitive);
        }
    }
}
