//! # Type Resolver
//!
//! Turns a [`TypeName`] into a [`TypeDescriptor`] using a [`TypeCatalog`].
//!
//! A bare name is looked up in this order:
//!
//! 1. the value-object namespace family
//! 2. the engine/compute namespace family
//! 3. the process-wide table, by exact full name
//! 4. every assembly, by full or short name
//!
//! When step 4 finds several candidates the [`AmbiguityPolicy`] decides. The
//! default keeps persisted data resolving the way it always has: the entry
//! whose assembly name sorts first wins, and a Warning names the losers.
//!
//! Generic arguments are resolved recursively. A generic definition is closed
//! only when the number of arguments that resolved matches its arity;
//! otherwise the open definition is returned. Arguments that did not
//! resolve are reported as a Warning.
//!
//! Positive results are kept in a read-through cache guarded by a
//! `parking_lot::RwLock`, so concurrent documents can share one resolver.
//! Warnings raised while resolving are cached with the descriptor and
//! recorded again on every hit.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;
use tracing::{debug, trace};

use super::catalog::{CatalogEntry, TypeCatalog};
use super::descriptor::TypeDescriptor;
use super::name::TypeName;
use crate::config::AmbiguityPolicy;
use crate::diagnostics::DiagnosticSink;

pub struct TypeResolver {
    catalog: Arc<dyn TypeCatalog>,
    policy: AmbiguityPolicy,
    cache_enabled: bool,
    cache: RwLock<HashMap<String, Resolution>>,
}

#[derive(Clone)]
struct Resolution {
    descriptor: TypeDescriptor,
    warnings: Vec<String>,
}

impl TypeResolver {
    pub fn new(catalog: Arc<dyn TypeCatalog>) -> Self {
        TypeResolver {
            catalog,
            policy: AmbiguityPolicy::default(),
            cache_enabled: true,
            cache: RwLock::new(HashMap::new()),
        }
    }

    pub fn with_policy(mut self, policy: AmbiguityPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn with_cache(mut self, enabled: bool) -> Self {
        self.cache_enabled = enabled;
        self
    }

    pub fn catalog(&self) -> &Arc<dyn TypeCatalog> {
        &self.catalog
    }

    /// Drop every cached resolution
    pub fn clear_cache(&self) {
        self.cache.write().clear();
    }

    pub fn cached_len(&self) -> usize {
        self.cache.read().len()
    }

    /// Resolve a parsed type expression. Ambiguity and unresolved-argument
    /// warnings go to `sink`, whether or not the result came from the cache.
    pub fn resolve(&self, name: &TypeName, sink: &dyn DiagnosticSink) -> Option<TypeDescriptor> {
        let resolution = self.resolve_recorded(name, sink)?;
        for warning in resolution.warnings {
            sink.record_warning(warning);
        }
        Some(resolution.descriptor)
    }

    fn resolve_recorded(&self, name: &TypeName, sink: &dyn DiagnosticSink) -> Option<Resolution> {
        let key = name.to_string();
        if self.cache_enabled {
            if let Some(hit) = self.cache.read().get(&key) {
                return Some(hit.clone());
            }
        }

        let mut warnings = Vec::new();
        let base = self.resolve_bare(name.name(), &mut warnings, sink)?;
        let descriptor = if name.args().is_empty() {
            base
        } else {
            let mut args = Vec::with_capacity(name.args().len());
            let mut unresolved = Vec::new();
            for arg in name.args() {
                match self.resolve_recorded(arg, sink) {
                    Some(found) => {
                        warnings.extend(found.warnings);
                        args.push(found.descriptor);
                    }
                    None => unresolved.push(format!("`{}`", arg)),
                }
            }

            let resolved = if base.accepts_generic_args(args.len()) {
                base.close_over(args)
            } else {
                debug!(type_name = %key, resolved_args = args.len(), "generic arguments do not fit; using open definition");
                base
            };
            if !unresolved.is_empty() {
                warnings.push(format!(
                    "Type `{}`: generic argument(s) {} failed to resolve; using `{}`.",
                    key,
                    unresolved.join(", "),
                    resolved.full_name()
                ));
            }
            resolved
        };

        let resolution = Resolution { descriptor, warnings };
        if self.cache_enabled {
            self.cache.write().insert(key, resolution.clone());
        }
        Some(resolution)
    }

    /// Parse and resolve a type expression string
    pub fn resolve_str(&self, name: &str, sink: &dyn DiagnosticSink) -> Option<TypeDescriptor> {
        let parsed = TypeName::parse(name).ok()?;
        self.resolve(&parsed, sink)
    }

    fn resolve_bare(&self, name: &str, warnings: &mut Vec<String>, sink: &dyn DiagnosticSink) -> Option<TypeDescriptor> {
        if let Some(found) = self.catalog.resolve_by_name(name) {
            return Some(found);
        }
        if let Some(found) = self.catalog.resolve_engine_by_name(name) {
            return Some(found);
        }
        if let Some(found) = self.catalog.resolve_exact(name) {
            return Some(found);
        }

        let mut candidates = self.catalog.search_all_by_name(name);
        trace!(type_name = name, candidates = candidates.len(), "searching all assemblies");
        match candidates.len() {
            0 => None,
            1 => candidates.pop().map(|e| e.descriptor),
            _ => self.pick_ambiguous(name, candidates, warnings, sink),
        }
    }

    fn pick_ambiguous(
        &self,
        name: &str,
        mut candidates: Vec<CatalogEntry>,
        warnings: &mut Vec<String>,
        sink: &dyn DiagnosticSink,
    ) -> Option<TypeDescriptor> {
        candidates.sort_by(|a, b| a.assembly.cmp(&b.assembly));
        let listed: Vec<String> = candidates
            .iter()
            .map(|e| format!("{} ({})", e.descriptor.name(), e.assembly))
            .collect();

        match self.policy {
            AmbiguityPolicy::FirstAssembly => {
                let chosen = candidates.swap_remove(0);
                warnings.push(format!(
                    "Type `{}` is ambiguous between {}; using `{}` from `{}`.",
                    name,
                    listed.join(", "),
                    chosen.descriptor.name(),
                    chosen.assembly
                ));
                Some(chosen.descriptor)
            }
            AmbiguityPolicy::Reject => {
                sink.record_note(format!(
                    "Type `{}` is ambiguous between {}; an assembly-qualified name is required.",
                    name,
                    listed.join(", ")
                ));
                None
            }
        }
    }
}
