//! One concrete assignment of values to build options.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use crate::matrix::arg::Arg;
use crate::matrix::error::MissingAssignment;
use crate::matrix::value::Value;

/// One assignment of values to arguments: a concrete build configuration.
///
/// During expansion variants are partial (only the arguments processed so far
/// are assigned); every variant handed out by the engine is complete. A
/// variant never loses or changes an assignment once made.
///
/// Cloning is cheap: assignments share their arguments behind `Arc`, so a
/// clone copies map nodes, not argument or value definitions.
#[derive(Clone, Default)]
pub struct Variant {
    // Keyed by argument name; BTreeMap iteration gives the name-sorted order
    // that arg_string() and to_map() rely on.
    assignments: BTreeMap<Arc<str>, Assignment>,
}

#[derive(Clone)]
struct Assignment {
    arg: Arc<Arg>,
    value: usize,
}

impl Assignment {
    fn value(&self) -> &Value {
        &self.arg.values()[self.value]
    }
}

impl Variant {
    pub(crate) fn empty() -> Self {
        Variant::default()
    }

    /// Copy this variant and assign one more argument.
    pub(crate) fn extend(&self, arg: Arc<Arg>, value: usize) -> Self {
        let mut assignments = self.assignments.clone();
        assignments.insert(Arc::from(arg.name()), Assignment { arg, value });
        Variant { assignments }
    }

    /// The value assigned to `arg`.
    ///
    /// Filters passed to the matrix call this with `?`: on a partial variant
    /// the resulting [`MissingAssignment`] tells the expansion loop to retry
    /// the filter once more arguments are assigned.
    pub fn get(&self, arg: &str) -> Result<&Value, MissingAssignment> {
        self.assignments
            .get(arg)
            .map(Assignment::value)
            .ok_or_else(|| MissingAssignment(arg.to_string()))
    }

    /// Whether `arg` is assigned to the value named `value_name`.
    ///
    /// Returns false for unassigned arguments, which keeps post-expansion
    /// predicates over complete variants total.
    pub fn is(&self, arg: &str, value_name: &str) -> bool {
        self.assignments
            .get(arg)
            .is_some_and(|a| a.value().name() == value_name)
    }

    /// Whether a boolean argument is assigned `true`.
    pub fn is_true(&self, arg: &str) -> bool {
        self.assignments
            .get(arg)
            .and_then(|a| a.value().as_bool())
            .unwrap_or(false)
    }

    /// Number of assigned arguments.
    pub fn len(&self) -> usize {
        self.assignments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.assignments.is_empty()
    }

    /// The output directory name for this configuration.
    ///
    /// Sorted concatenation of `<arg short><Value short, title-cased>`
    /// tokens, `_`-joined. Sorting makes the name independent of
    /// registration order; unique short tags make it unique per variant.
    /// Short tags keep directory names inside Windows path limits.
    pub fn dir_name(&self) -> String {
        let mut tokens: Vec<String> = self
            .assignments
            .values()
            .map(|a| format!("{}{}", a.arg.short(), title_case(a.value().short())))
            .collect();
        tokens.sort();
        tokens.join("_")
    }

    /// The `name=value` argument string passed to the generator tool.
    ///
    /// Sorted and space-joined, so the same logical configuration always
    /// produces the same string regardless of registration order.
    pub fn arg_string(&self) -> String {
        let pairs: Vec<String> = self
            .assignments
            .values()
            .map(|a| format!("{}={}", a.arg.name(), a.value().serialized()))
            .collect();
        // BTreeMap already iterates in name order.
        pairs.join(" ")
    }

    /// Argument name to serialized value, in name order.
    pub fn to_map(&self) -> BTreeMap<String, String> {
        self.assignments
            .values()
            .map(|a| (a.arg.name().to_string(), a.value().serialized().to_string()))
            .collect()
    }

    /// A short hex fingerprint of the argument string, stable across runs.
    ///
    /// The driver stamps generated output directories with this so unchanged
    /// configurations can skip regeneration.
    pub fn stable_hash(&self) -> String {
        let mut fp = crate::util::hash::Fingerprint::new();
        fp.update_str(&self.arg_string());
        fp.finish_short()
    }
}

impl fmt::Debug for Variant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map()
            .entries(
                self.assignments
                    .values()
                    .map(|a| (a.arg.name(), a.value().serialized())),
            )
            .finish()
    }
}

/// Title-case in the sense directory tokens use it: the first letter of each
/// alphabetic run is uppercased, the rest lowercased, and non-letters pass
/// through unchanged (`assert-exc` becomes `Assert-Exc`, `11` stays `11`).
fn title_case(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut in_word = false;
    for c in s.chars() {
        if c.is_alphabetic() {
            if in_word {
                out.extend(c.to_lowercase());
            } else {
                out.extend(c.to_uppercase());
            }
            in_word = true;
        } else {
            out.push(c);
            in_word = false;
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::matrix::value::Value;

    fn variant(pairs: &[(&str, &str, &str, &str)]) -> Variant {
        // (arg name, arg short, value name, value short)
        let mut v = Variant::empty();
        for (name, short, vname, vshort) in pairs {
            let mut arg = Arg::choice(*name, *short);
            arg.add(Value::quoted(*vname, *vname, *vshort)).unwrap();
            v = v.extend(Arc::new(arg), 0);
        }
        v
    }

    #[test]
    fn test_title_case() {
        assert_eq!(title_case("t"), "T");
        assert_eq!(title_case("clang"), "Clang");
        assert_eq!(title_case("assert-exc"), "Assert-Exc");
        assert_eq!(title_case("11"), "11");
        assert_eq!(title_case("LATEST"), "Latest");
    }

    #[test]
    fn test_get_signals_missing_assignment() {
        let v = variant(&[("compiler_type", "c", "clang", "clang")]);
        assert!(v.get("compiler_type").is_ok());

        let err = v.get("std_version").unwrap_err();
        assert_eq!(err.0, "std_version");
    }

    #[test]
    fn test_dir_name_sorts_tokens() {
        let v = variant(&[
            ("std_version", "std", "cpp17", "17"),
            ("compiler_type", "c", "clang", "clang"),
        ]);
        assert_eq!(v.dir_name(), "cClang_std17");
    }

    #[test]
    fn test_arg_string_sorts_by_name() {
        let v = variant(&[
            ("std_version", "std", "cpp17", "17"),
            ("compiler_type", "c", "clang", "clang"),
        ]);
        assert_eq!(v.arg_string(), "compiler_type=\"clang\" std_version=\"cpp17\"");
    }

    #[test]
    fn test_projections_are_idempotent() {
        let v = variant(&[
            ("compiler_type", "c", "clang", "clang"),
            ("std_version", "std", "cpp17", "17"),
        ]);
        assert_eq!(v.dir_name(), v.dir_name());
        assert_eq!(v.arg_string(), v.arg_string());
        assert_eq!(v.stable_hash(), v.stable_hash());
    }

    #[test]
    fn test_boolean_dir_tokens() {
        let mut v = Variant::empty();
        let arg = Arc::new(Arg::boolean("is_debug", "debug"));
        v = v.extend(arg, 0);
        assert_eq!(v.dir_name(), "debugT");
        assert!(v.is_true("is_debug"));
    }

    #[test]
    fn test_is_and_is_true_are_total() {
        let v = variant(&[("compiler_type", "c", "clang", "clang")]);
        assert!(v.is("compiler_type", "clang"));
        assert!(!v.is("compiler_type", "gcc"));
        assert!(!v.is("nonexistent", "clang"));
        assert!(!v.is_true("nonexistent"));
        assert!(!v.is_true("compiler_type"));
    }
}
