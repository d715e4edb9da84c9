//! Non-block registered types ("patterns") usable as slot values or port
//! types.
//!
//! The original implementation's comparator hierarchy
//! (`NumberComparator`/`TextComparator`/`ListComparator`, each abstract, each
//! with several concrete subclasses) is the worked example the registry's
//! `candidates()` query exists for: `TextCondition(TextEqual("yes"))` is only
//! constructible because `TextEqual` is registered with
//! `implements: vec!["Text_Comparator"]`.
//!
//! Rust has no runtime subtype enumeration over trait objects, so the
//! subtype relation is a declared list on each concrete
//! [`TypeDescriptor`](crate::types::TypeDescriptor),
//! not derived from the `Condition` trait itself. Every comparator in this
//! crate implements the same `Condition` trait; what makes `TextEqual` a
//! `Text_Comparator` and not an `Int_Comparator` is the registry entry, not
//! the Rust type.

use crate::error::BlockError;
use crate::value::Value;

/// Marker for any non-block registered type.
pub trait Pattern: Send + Sync + std::fmt::Debug {
    fn type_name(&self) -> &'static str;
}

/// A condition pattern: checks whether a block's input value satisfies some
/// predicate. Backs the `NumberCondition`/`TextCondition`/`ListCondition`
/// builtin blocks.
pub trait Condition: Pattern {
    /// Returns `false`, rather than erroring, when `input` is not the shape
    /// the comparator expects — matching the original Python comparators,
    /// which assume the block's own signature already enforced the type.
    fn check(&self, input: &Value) -> bool;
}

/// The named trait seam standing in for the original's
/// `BaseLanguageModel`-derived wrappers (`original_source/patterns/llm.py`).
/// Real provider wrappers (OpenAI, etc.) are an explicit Non-goal — this
/// crate registers only the trait and the `MockLlm` test double
/// (`original_source/plugins/mock_llm.py`), exactly as the original ships a
/// mock alongside its real `OpenAI_*` wrappers for local development.
pub trait LlmModel: Pattern {
    fn complete(&self, prompt: &str) -> Result<String, BlockError>;
}
