//! Process-wide catalog of declared block and pattern types.
//!
//! Registration happens once, eagerly: [`Registry::bootstrap`] builds the
//! registry from [`crate::builtins::install`] and freezes it into a
//! process-wide [`once_cell::sync::OnceCell`]. This replaces the original
//! implementation's import-time `@block`/`@pattern` decorators
//! (`original_source/resolver/resolver.py`) with an explicit registration
//! pass, per the Design Note "Reflection replacement" — there is no
//! hot-reload (an explicit Non-goal) and no implicit module-load ordering to
//! reason about.

use std::collections::HashMap;
use std::sync::Arc;

use once_cell::sync::OnceCell;

use crate::error::RegistryError;
use crate::instance::ConstructorFn;
use crate::types::{Category, TypeDescriptor, BUILTIN_TYPES};

static GLOBAL: OnceCell<Arc<Registry>> = OnceCell::new();

/// The frozen registry. Construction validates every registration invariant
/// up front; after that, all queries are plain index lookups.
pub struct Registry {
    descriptors: HashMap<String, TypeDescriptor>,
    constructors: HashMap<String, ConstructorFn>,
    impl_to_name: HashMap<String, String>,
    names_in_order: Vec<String>,
}

impl Registry {
    /// Returns the process-wide registry, building and freezing it on first
    /// call. Building is cheap enough (a few dozen descriptors) that no
    /// attempt is made to lazily avoid it; once built it is reused for the
    /// life of the process (Non-goal: hot-reload).
    pub fn bootstrap() -> Arc<Registry> {
        GLOBAL
            .get_or_init(|| {
                let mut builder = RegistryBuilder::new();
                crate::builtins::install(&mut builder);
                let registry = builder.build().expect("registry invariants hold at boot");
                tracing::info!(
                    descriptor_count = registry.names_in_order.len(),
                    "registry bootstrapped"
                );
                Arc::new(registry)
            })
            .clone()
    }

    pub fn names(&self) -> &[String] {
        &self.names_in_order
    }

    pub fn descriptor(&self, name: &str) -> Option<&TypeDescriptor> {
        self.descriptors.get(name)
    }

    pub fn relookup(&self, impl_tag: &str) -> Option<&str> {
        self.impl_to_name.get(impl_tag).map(|s| s.as_str())
    }

    pub fn constructor(&self, name: &str) -> Option<&ConstructorFn> {
        self.constructors.get(name)
    }

    pub fn is_subtype(&self, name: &str, of: &str) -> bool {
        if name == of {
            return true;
        }
        self.descriptors
            .get(name)
            .map(|d| d.implements.iter().any(|s| s == of))
            .unwrap_or(false)
    }
}

/// Accumulates descriptors before the one-shot invariant check in
/// [`RegistryBuilder::build`].
pub struct RegistryBuilder {
    descriptors: Vec<TypeDescriptor>,
    constructors: HashMap<String, ConstructorFn>,
}

impl RegistryBuilder {
    pub fn new() -> Self {
        let mut builder = Self { descriptors: Vec::new(), constructors: HashMap::new() };
        for builtin in BUILTIN_TYPES {
            builder.descriptors.push(TypeDescriptor {
                name: builtin.to_string(),
                alias: builtin.to_string(),
                category: Category::Builtin,
                dir: None,
                impl_tag: format!("builtin::{builtin}"),
                abstract_: false,
                implements: Vec::new(),
                displayable: true,
                slots: Vec::new(),
                inports: Vec::new(),
                outport: None,
            });
        }
        builder
    }

    /// Registers a descriptor with no constructor — used for abstract
    /// types, which can never be constructed directly.
    pub fn register_abstract(&mut self, descriptor: TypeDescriptor) -> &mut Self {
        assert!(descriptor.abstract_, "register_abstract requires an abstract descriptor");
        self.descriptors.push(descriptor);
        self
    }

    /// Registers a concrete descriptor along with its constructor.
    pub fn register(&mut self, descriptor: TypeDescriptor, constructor: ConstructorFn) -> &mut Self {
        assert!(!descriptor.abstract_, "register requires a concrete descriptor");
        self.constructors.insert(descriptor.name.clone(), constructor);
        self.descriptors.push(descriptor);
        self
    }

    pub fn build(self) -> Result<Registry, RegistryError> {
        let mut names_in_order = Vec::with_capacity(self.descriptors.len());
        let mut descriptors = HashMap::with_capacity(self.descriptors.len());
        let mut impl_to_name = HashMap::with_capacity(self.descriptors.len());

        for d in &self.descriptors {
            if descriptors.contains_key(&d.name) {
                return Err(RegistryError::DuplicatedName(d.name.clone()));
            }
            if impl_to_name.contains_key(&d.impl_tag) {
                return Err(RegistryError::DuplicatedType(d.impl_tag.clone()));
            }
            names_in_order.push(d.name.clone());
            impl_to_name.insert(d.impl_tag.clone(), d.name.clone());
            descriptors.insert(d.name.clone(), d.clone());
        }

        for d in &self.descriptors {
            if d.category == Category::Builtin {
                continue;
            }
            let mut referenced = Vec::new();
            if !d.abstract_ {
                for s in &d.slots {
                    referenced.push(s.type_tag.clone());
                }
            }
            if d.category == Category::Block {
                for p in &d.inports {
                    referenced.push(p.type_tag.clone());
                }
                if let Some(out) = &d.outport {
                    referenced.push(out.clone());
                }
            }
            for t in referenced {
                if !descriptors.contains_key(&t) {
                    return Err(RegistryError::Unregistered { name: d.name.clone(), referenced: t });
                }
            }
        }

        Ok(Registry { descriptors, constructors: self.constructors, impl_to_name, names_in_order })
    }
}

impl Default for RegistryBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{ParamKind, PortDescriptor, SlotDescriptor};

    #[test]
    fn rejects_duplicated_name() {
        let mut b = RegistryBuilder::new();
        let make = || TypeDescriptor {
            name: "Dup".into(),
            alias: "Dup".into(),
            category: Category::Type,
            dir: None,
            impl_tag: "t1".into(),
            abstract_: true,
            implements: vec![],
            displayable: true,
            slots: vec![],
            inports: vec![],
            outport: None,
        };
        b.register_abstract(make());
        let mut d2 = make();
        d2.impl_tag = "t2".into();
        b.register_abstract(d2);
        assert!(matches!(b.build(), Err(RegistryError::DuplicatedName(_))));
    }

    #[test]
    fn rejects_unregistered_reference() {
        let mut b = RegistryBuilder::new();
        b.register(
            TypeDescriptor {
                name: "Leaky".into(),
                alias: "Leaky".into(),
                category: Category::Block,
                dir: Some("test".into()),
                impl_tag: "leaky".into(),
                abstract_: false,
                implements: vec![],
                displayable: true,
                slots: vec![SlotDescriptor::required("x", "DoesNotExist")],
                inports: vec![PortDescriptor::required("x", "text")],
                outport: Some("text".into()),
            },
            std::sync::Arc::new(|_| Err("unused".into())),
        );
        assert!(matches!(
            b.build(),
            Err(RegistryError::Unregistered { referenced, .. }) if referenced == "DoesNotExist"
        ));
    }

    #[test]
    fn variadic_kind_has_no_referenced_type_check_bypass() {
        // a variadic inport still declares a type_tag ("any") which must resolve
        let mut b = RegistryBuilder::new();
        b.register(
            TypeDescriptor {
                name: "Variadic".into(),
                alias: "Variadic".into(),
                category: Category::Block,
                dir: Some("test".into()),
                impl_tag: "variadic".into(),
                abstract_: false,
                implements: vec![],
                displayable: true,
                slots: vec![],
                inports: vec![PortDescriptor::variadic_keyword("kwargs")],
                outport: Some("text".into()),
            },
            std::sync::Arc::new(|_| Err("unused".into())),
        );
        assert!(b.build().is_ok());
        let _ = ParamKind::VariadicKeyword;
    }
}
