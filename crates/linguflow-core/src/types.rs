//! Reflective signatures, replaced.
//!
//! The original implementation reads constructor (`__init__`) and call
//! (`__call__`) signatures via Python's `inspect` module at resolve time. A
//! systems-language port declares the same information explicitly, once, at
//! registration, so the resolver and validator never need to inspect a
//! constructor's argument list at runtime.

use serde_json::Value;

/// Where a registered name sits in the type system.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Category {
    /// A DAG node kind: has inports and an outport in addition to slots.
    Block,
    /// A non-block registered type, usable as a slot value or port type.
    Type,
    /// A registry-builtin primitive type (`text`, `int`, `float`, `bool`,
    /// `list`, `dict`, `any`). Builtins are never abstract and skip the
    /// slot/inport/outport invariant checks performed at bootstrap.
    Builtin,
}

/// How a constructor or invocation parameter is bound.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ParamKind {
    /// An ordinary named parameter.
    Positional,
    /// A variadic keyword parameter (`**kwargs`) that absorbs any
    /// otherwise-unbound named argument.
    VariadicKeyword,
}

/// A single constructor parameter ("slot").
#[derive(Debug, Clone)]
pub struct SlotDescriptor {
    pub name: String,
    pub type_tag: String,
    pub default: Option<Value>,
    pub kind: ParamKind,
}

impl SlotDescriptor {
    pub fn required(name: impl Into<String>, type_tag: impl Into<String>) -> Self {
        Self { name: name.into(), type_tag: type_tag.into(), default: None, kind: ParamKind::Positional }
    }

    pub fn with_default(name: impl Into<String>, type_tag: impl Into<String>, default: Value) -> Self {
        Self { name: name.into(), type_tag: type_tag.into(), default: Some(default), kind: ParamKind::Positional }
    }
}

/// A single invocation parameter ("inport").
#[derive(Debug, Clone)]
pub struct PortDescriptor {
    pub name: String,
    pub type_tag: String,
    pub default: Option<Value>,
    pub kind: ParamKind,
}

impl PortDescriptor {
    pub fn required(name: impl Into<String>, type_tag: impl Into<String>) -> Self {
        Self { name: name.into(), type_tag: type_tag.into(), default: None, kind: ParamKind::Positional }
    }

    pub fn with_default(name: impl Into<String>, type_tag: impl Into<String>, default: Value) -> Self {
        Self { name: name.into(), type_tag: type_tag.into(), default: Some(default), kind: ParamKind::Positional }
    }

    pub fn variadic_keyword(name: impl Into<String>) -> Self {
        Self { name: name.into(), type_tag: "any".to_string(), default: None, kind: ParamKind::VariadicKeyword }
    }

    pub fn is_variadic(&self) -> bool {
        matches!(self.kind, ParamKind::VariadicKeyword)
    }
}

/// The registry builtin that accepts any value during [`PortTypeMatch`]
/// checks.
///
/// [`PortTypeMatch`]: crate::validator::PortTypeMatch
pub const ANY: &str = "any";

/// Registry-builtin primitive type names, pre-registered by
/// [`crate::registry::Registry::bootstrap`].
pub const BUILTIN_TYPES: &[&str] = &["any", "text", "int", "float", "bool", "list", "dict", "null"];

/// A single registry entry.
///
/// Invariants (checked once, in [`crate::registry::Registry::bootstrap`]):
/// names are globally unique, impls are globally unique, and every type
/// referenced by a slot/inport/outport of a non-builtin descriptor is itself
/// registered.
#[derive(Debug, Clone)]
pub struct TypeDescriptor {
    pub name: String,
    pub alias: String,
    pub category: Category,
    /// Free-form grouping tag, populated for blocks only (mirrors the
    /// original `@block(kind=...)` decorator argument).
    pub dir: Option<String>,
    /// The underlying Rust type's stable identifier, used for `relookup`.
    pub impl_tag: String,
    /// True if this descriptor cannot be constructed directly (it declares
    /// behavior but no constructor); only `candidates()` of an abstract name
    /// are constructible.
    pub abstract_: bool,
    /// Names of abstract ancestor types this (necessarily concrete)
    /// descriptor implements, used by `candidates()`.
    pub implements: Vec<String>,
    /// Whether a non-builtin outport type provides a string-conversion
    /// capability distinct from a bare `{:?}` — gates
    /// [`GraphCheckError::TypeHasNoStrMethod`](crate::error::GraphCheckError::TypeHasNoStrMethod).
    pub displayable: bool,
    pub slots: Vec<SlotDescriptor>,
    /// Populated for blocks only.
    pub inports: Vec<PortDescriptor>,
    /// Populated for blocks only: the invocation's declared return type.
    pub outport: Option<String>,
}

impl TypeDescriptor {
    pub fn is_block(&self) -> bool {
        self.category == Category::Block
    }

    pub fn variadic_port(&self) -> Option<&PortDescriptor> {
        self.inports.iter().find(|p| p.is_variadic())
    }

    pub fn find_inport(&self, name: &str) -> Option<&PortDescriptor> {
        self.inports.iter().find(|p| p.name == name)
    }
}
