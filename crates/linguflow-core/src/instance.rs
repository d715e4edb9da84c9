//! Constructed instances and constructor arguments.
//!
//! Mirrors `original_source/blocks/invoke.py`'s `construct_graph_node`: a
//! slot value is either a raw JSON primitive, a nested constructed instance,
//! or an array mixing both, and the constructor is invoked once all slot
//! arguments have been resolved.

use std::collections::BTreeMap;
use std::sync::Arc;

use crate::block::Block;
use crate::error::NodeConstructError;
use crate::pattern::{Condition, LlmModel};
use crate::value::Value;

/// A fully-resolved constructor argument, after recursing through nested
/// node specs.
#[derive(Clone)]
pub enum SlotArg {
    /// A JSON primitive or compound value passed through unchanged.
    Value(Value),
    /// A nested pattern instance (e.g. the `comparator` slot of
    /// `TextCondition`).
    Pattern(Arc<dyn Condition>),
    /// A nested LLM model instance (the `model` slot of the `LLM` block).
    Llm(Arc<dyn LlmModel>),
    /// A nested block instance, when a slot itself takes a block (not used
    /// by the builtins in this crate, but representable).
    Block(Arc<dyn Block>),
    /// An array slot value, each element independently resolved.
    List(Vec<SlotArg>),
}

impl SlotArg {
    pub fn as_value(&self) -> Option<&Value> {
        match self {
            SlotArg::Value(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_pattern(&self) -> Option<&Arc<dyn Condition>> {
        match self {
            SlotArg::Pattern(p) => Some(p),
            _ => None,
        }
    }

    pub fn as_llm(&self) -> Option<&Arc<dyn LlmModel>> {
        match self {
            SlotArg::Llm(m) => Some(m),
            _ => None,
        }
    }
}

/// The collected, named constructor arguments for one node spec.
pub type ConstructArgs = BTreeMap<String, SlotArg>;

/// What a registered type's constructor actually produces.
#[derive(Clone)]
pub enum Instance {
    Block(Arc<dyn Block>),
    Pattern(Arc<dyn Condition>),
    Llm(Arc<dyn LlmModel>),
}

impl Instance {
    pub fn into_block(self) -> Option<Arc<dyn Block>> {
        match self {
            Instance::Block(b) => Some(b),
            _ => None,
        }
    }

    pub fn into_pattern(self) -> Option<Arc<dyn Condition>> {
        match self {
            Instance::Pattern(p) => Some(p),
            _ => None,
        }
    }

    pub fn into_llm(self) -> Option<Arc<dyn LlmModel>> {
        match self {
            Instance::Llm(m) => Some(m),
            _ => None,
        }
    }
}

/// A registered type's constructor: takes the collected, named slot
/// arguments and produces an [`Instance`], or a construction error with just
/// the reason — the caller wraps it with the type name via
/// [`wrap_construct_error`].
pub type ConstructorFn = Arc<dyn Fn(ConstructArgs) -> Result<Instance, String> + Send + Sync>;

pub(crate) fn wrap_construct_error(name: &str, reason: String) -> NodeConstructError {
    NodeConstructError::ConstructFailed { name: name.to_string(), reason }
}
