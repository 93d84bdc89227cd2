//! The option registry and its cross-product expansion.

use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::matrix::arg::Arg;
use crate::matrix::error::{MatrixError, MissingAssignment};
use crate::matrix::set::VariantSet;
use crate::matrix::value::Value;
use crate::matrix::variant::Variant;

/// Result type for matrix-level filter predicates.
///
/// A predicate probing an argument the partial variant does not yet carry
/// propagates [`MissingAssignment`] with `?`; the expansion loop treats that
/// as "retry me later", not as a failure.
pub type FilterResult = Result<bool, MissingAssignment>;

struct Filter {
    label: String,
    pred: Box<dyn Fn(&Variant) -> FilterResult + Send + Sync>,
}

/// The registry of build options, plus the filters that prune illegal
/// combinations, plus the expansion that turns both into concrete variants.
///
/// Lifecycle is two-phase: arguments, values and filters are registered
/// first; the first [`variants`](ArgMatrix::variants) call seals the registry
/// and later registration fails with
/// [`MatrixError::SealedRegistry`]. Expansion itself snapshots the registered
/// arguments, so a produced [`VariantSet`] is never affected by anything that
/// happens to the matrix afterwards.
#[derive(Default)]
pub struct ArgMatrix {
    args: Vec<Arg>,
    by_name: HashMap<String, usize>,
    filters: Vec<Filter>,
    sealed: AtomicBool,
}

impl ArgMatrix {
    pub fn new() -> Self {
        ArgMatrix::default()
    }

    /// Register an argument. Fails on a duplicate name, a duplicate short
    /// tag, an empty value set, or after the matrix has been expanded.
    pub fn register(&mut self, arg: Arg) -> Result<(), MatrixError> {
        if self.sealed.load(Ordering::Acquire) {
            return Err(MatrixError::SealedRegistry(arg.name().to_string()));
        }
        if self.by_name.contains_key(arg.name()) {
            return Err(MatrixError::DuplicateArg(arg.name().to_string()));
        }
        if let Some(existing) = self.args.iter().find(|a| a.short() == arg.short()) {
            return Err(MatrixError::DuplicateShortTag {
                short: arg.short().to_string(),
                first: existing.name().to_string(),
                second: arg.name().to_string(),
            });
        }
        if arg.values().is_empty() {
            return Err(MatrixError::EmptyArg(arg.name().to_string()));
        }
        self.by_name.insert(arg.name().to_string(), self.args.len());
        self.args.push(arg);
        Ok(())
    }

    /// Add a value to an already-registered argument.
    ///
    /// Supports incremental construction, e.g. one value per detected
    /// compiler, up until the first expansion.
    pub fn add_value(&mut self, arg: &str, value: Value) -> Result<(), MatrixError> {
        if self.sealed.load(Ordering::Acquire) {
            return Err(MatrixError::SealedRegistry(arg.to_string()));
        }
        let idx = *self
            .by_name
            .get(arg)
            .ok_or_else(|| MatrixError::UnknownArg(arg.to_string()))?;
        self.args[idx].add(value)
    }

    /// Look up a registered argument by name.
    pub fn get(&self, name: &str) -> Option<&Arg> {
        self.by_name.get(name).map(|&idx| &self.args[idx])
    }

    /// Registered arguments, in registration order.
    pub fn args(&self) -> impl Iterator<Item = &Arg> {
        self.args.iter()
    }

    /// Keep only variants for which `pred` holds.
    ///
    /// The label names the filter in diagnostics when it turns out to
    /// reference an argument that is never registered.
    pub fn retain<F>(&mut self, label: impl Into<String>, pred: F)
    where
        F: Fn(&Variant) -> FilterResult + Send + Sync + 'static,
    {
        self.filters.push(Filter {
            label: label.into(),
            pred: Box::new(pred),
        });
    }

    /// Discard variants for which `pred` holds.
    pub fn exclude<F>(&mut self, label: impl Into<String>, pred: F)
    where
        F: Fn(&Variant) -> FilterResult + Send + Sync + 'static,
    {
        self.filters.push(Filter {
            label: label.into(),
            pred: Box::new(move |v| pred(v).map(|matched| !matched)),
        });
    }

    /// Expand the cross-product of all registered arguments into variants,
    /// applying each filter as early as its referenced arguments allow.
    ///
    /// The working list starts with one empty variant and is cross-extended
    /// once per argument, in registration order. After each extension every
    /// pending filter is attempted: one that raises [`MissingAssignment`]
    /// stays pending with the list untouched, one that evaluates prunes the
    /// list and is retired for good. Retiring early is sound because
    /// assignments only grow; a verdict reached over the arguments assigned
    /// so far holds for every completion of that variant.
    ///
    /// Filters still pending at the end are forced against the complete
    /// variants; one that raises even then references an argument nobody
    /// registered and is reported as [`MatrixError::UnresolvedFilter`].
    pub fn variants(&self) -> Result<VariantSet, MatrixError> {
        self.sealed.store(true, Ordering::Release);

        let args: Vec<Arc<Arg>> = self.args.iter().cloned().map(Arc::new).collect();
        let mut working = vec![Variant::empty()];
        let mut pending: Vec<&Filter> = self.filters.iter().collect();

        for arg in &args {
            let mut extended = Vec::with_capacity(working.len() * arg.values().len());
            for variant in &working {
                for value in 0..arg.values().len() {
                    extended.push(variant.extend(arg.clone(), value));
                }
            }
            working = extended;

            // Pruning here instead of at the end keeps the working list from
            // growing combinatorially.
            let mut deferred = Vec::new();
            for filter in pending {
                match try_apply(filter, &working) {
                    Ok(kept) => {
                        tracing::debug!(
                            filter = %filter.label,
                            after = arg.name(),
                            kept = kept.len(),
                            dropped = working.len() - kept.len(),
                            "applied filter"
                        );
                        working = kept;
                    }
                    Err(_) => deferred.push(filter),
                }
            }
            pending = deferred;
        }

        for filter in pending {
            match try_apply(filter, &working) {
                Ok(kept) => working = kept,
                Err(MissingAssignment(arg)) => {
                    return Err(MatrixError::UnresolvedFilter {
                        filter: filter.label.clone(),
                        arg,
                    });
                }
            }
        }

        Ok(VariantSet::new(working))
    }
}

/// Evaluate `filter` over the whole list, all-or-nothing: if any variant
/// raises a missing assignment the caller keeps the original list and the
/// filter stays pending, so a filter can defer but never half-apply.
fn try_apply(filter: &Filter, variants: &[Variant]) -> Result<Vec<Variant>, MissingAssignment> {
    let mut kept = Vec::with_capacity(variants.len());
    for variant in variants {
        if (filter.pred)(variant)? {
            kept.push(variant.clone());
        }
    }
    Ok(kept)
}

impl fmt::Debug for ArgMatrix {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ArgMatrix")
            .field("args", &self.args)
            .field("filters", &self.filters.len())
            .finish()
    }
}
