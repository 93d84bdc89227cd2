//! A filterable, re-iterable collection of complete variants.

use std::fmt;

use crate::matrix::variant::Variant;

type PostFilter = Box<dyn Fn(&Variant) -> bool + Send + Sync>;

/// The variants produced by one expansion, with lazy post-hoc narrowing.
///
/// [`retain`](VariantSet::retain) and [`exclude`](VariantSet::exclude) queue
/// predicates without evaluating them; [`len`](VariantSet::len),
/// [`variants`](VariantSet::variants) and iteration force the queue against
/// the cached list. Forcing is idempotent and never re-runs the expansion
/// that produced the set. Predicates here see only complete variants, so
/// they are plain boolean functions.
pub struct VariantSet {
    variants: Vec<Variant>,
    pending: Vec<PostFilter>,
}

impl VariantSet {
    pub(crate) fn new(variants: Vec<Variant>) -> Self {
        VariantSet {
            variants,
            pending: Vec::new(),
        }
    }

    /// Queue a narrowing: keep only variants for which `pred` holds.
    pub fn retain<F>(&mut self, pred: F)
    where
        F: Fn(&Variant) -> bool + Send + Sync + 'static,
    {
        self.pending.push(Box::new(pred));
    }

    /// Queue a narrowing: discard variants for which `pred` holds.
    pub fn exclude<F>(&mut self, pred: F)
    where
        F: Fn(&Variant) -> bool + Send + Sync + 'static,
    {
        self.pending.push(Box::new(move |v| !pred(v)));
    }

    fn force(&mut self) {
        for pred in self.pending.drain(..) {
            self.variants.retain(|v| pred(v));
        }
    }

    /// Number of surviving variants. Forces any queued narrowing; an empty
    /// result is reported as 0, never as an error (the driver decides
    /// whether empty is fatal).
    pub fn len(&mut self) -> usize {
        self.force();
        self.variants.len()
    }

    pub fn is_empty(&mut self) -> bool {
        self.len() == 0
    }

    /// The surviving variants. Forces any queued narrowing.
    pub fn variants(&mut self) -> &[Variant] {
        self.force();
        &self.variants
    }

    /// Iterate the surviving variants. Forces any queued narrowing.
    pub fn iter(&mut self) -> std::slice::Iter<'_, Variant> {
        self.variants().iter()
    }
}

impl IntoIterator for VariantSet {
    type Item = Variant;
    type IntoIter = std::vec::IntoIter<Variant>;

    fn into_iter(mut self) -> Self::IntoIter {
        self.force();
        self.variants.into_iter()
    }
}

impl fmt::Debug for VariantSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("VariantSet")
            .field("materialized", &self.variants.len())
            .field("pending", &self.pending.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::matrix::{Arg, ArgMatrix, Value};

    fn sample_set() -> VariantSet {
        let mut matrix = ArgMatrix::new();
        let mut compiler = Arg::choice("compiler_type", "c");
        compiler.add(Value::string("clang")).unwrap();
        compiler.add(Value::string("gcc")).unwrap();
        matrix.register(compiler).unwrap();
        matrix.register(Arg::boolean("is_debug", "debug")).unwrap();
        matrix.variants().unwrap()
    }

    #[test]
    fn test_narrowing_composes() {
        let mut set = sample_set();
        assert_eq!(set.len(), 4);

        set.retain(|v| v.is("compiler_type", "clang"));
        assert_eq!(set.len(), 2);

        set.exclude(|v| v.is_true("is_debug"));
        assert_eq!(set.len(), 1);
    }

    #[test]
    fn test_forcing_is_idempotent() {
        let mut set = sample_set();
        set.retain(|v| v.is("compiler_type", "gcc"));

        assert_eq!(set.len(), 2);
        assert_eq!(set.len(), 2);
        assert_eq!(set.variants().len(), 2);
        assert_eq!(set.iter().count(), 2);
    }

    #[test]
    fn test_empty_result_is_not_an_error() {
        let mut set = sample_set();
        set.retain(|v| v.is("compiler_type", "msvc"));
        assert_eq!(set.len(), 0);
        assert!(set.is_empty());
    }

    #[test]
    fn test_into_iterator_forces() {
        let mut set = sample_set();
        set.exclude(|v| v.is_true("is_debug"));

        let dirs: Vec<String> = set.into_iter().map(|v| v.dir_name()).collect();
        assert_eq!(dirs.len(), 2);
        assert!(dirs.iter().all(|d| d.contains("debugF")));
    }
}
