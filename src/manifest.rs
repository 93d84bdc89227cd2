//! Armada.toml parsing and rule compilation.
//!
//! The manifest declares the option matrix (arguments and their values), the
//! declarative rules that prune illegal combinations, which argument is tied
//! to compiler probing, and the external generator/builder commands. Loading
//! produces plain data; [`Manifest::compile`] turns it into an
//! [`ArgMatrix`] plus the phase-scoped rules applied after expansion.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::slice;

use anyhow::{bail, Context, Result};
use semver::Version;
use serde::Deserialize;

use crate::matrix::{Arg, ArgMatrix, FilterResult, Value, Variant};
use crate::probe::{CompilerCapability, CompilerKind};

/// The manifest file name.
pub const MANIFEST_NAME: &str = "Armada.toml";

/// Parsed Armada.toml.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields, rename_all = "kebab-case")]
pub struct Manifest {
    /// Matrix arguments, in declaration order. Order fixes expansion order,
    /// which is what lets rules prune early instead of at the end.
    #[serde(default)]
    pub args: Vec<ArgSpec>,

    /// Declarative pruning rules.
    #[serde(default)]
    pub rules: Vec<RuleSpec>,

    #[serde(default)]
    pub probe: ProbeSpec,

    #[serde(default)]
    pub driver: DriverSpec,
}

/// One `[[args]]` table.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields, rename_all = "kebab-case")]
pub struct ArgSpec {
    pub name: String,

    /// Tag used in output directory names.
    pub short: String,

    /// `bool = true` declares a true/false argument.
    #[serde(rename = "bool", default)]
    pub boolean: bool,

    /// Enumerated values for non-boolean arguments.
    #[serde(default)]
    pub values: Vec<ValueSpec>,
}

/// One entry in an argument's `values` list.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields, rename_all = "kebab-case")]
pub struct ValueSpec {
    pub name: String,

    /// Literal written into the argument string, verbatim. Defaults to the
    /// name in double quotes.
    #[serde(default)]
    pub serialized: Option<String>,

    /// Directory-name tag. Defaults to the name.
    #[serde(default)]
    pub short: Option<String>,
}

/// When a rule participates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Phase {
    /// During expansion; prunes as early as its arguments allow.
    #[default]
    Matrix,
    /// Narrows the variant set before the build step only.
    Build,
    /// Narrows additionally when the driver runs in CI mode.
    Ci,
}

/// A value-name set in a rule clause: a bare string or a list.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum ValueNames {
    One(String),
    Many(Vec<String>),
}

impl ValueNames {
    pub fn names(&self) -> &[String] {
        match self {
            ValueNames::One(name) => slice::from_ref(name),
            ValueNames::Many(names) => names,
        }
    }
}

/// One `[[rules]]` table.
///
/// A variant matches when, for every clause, its assigned value for that
/// argument is one of the listed names. `exclude` drops matching variants,
/// `keep` drops everything else; exactly one of the two must be present.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields, rename_all = "kebab-case")]
pub struct RuleSpec {
    #[serde(default)]
    pub exclude: Option<BTreeMap<String, ValueNames>>,

    #[serde(default)]
    pub keep: Option<BTreeMap<String, ValueNames>>,

    #[serde(default)]
    pub phase: Phase,

    /// The rule only applies when every listed compiler was probed at a
    /// version below the bound. Used for "old compiler lacks this standard"
    /// style excludes.
    #[serde(default)]
    pub when_compiler_below: Option<BTreeMap<CompilerKind, Version>>,
}

impl RuleSpec {
    fn clauses(&self) -> Result<(&BTreeMap<String, ValueNames>, bool)> {
        match (&self.exclude, &self.keep) {
            (Some(m), None) => Ok((m, true)),
            (None, Some(m)) => Ok((m, false)),
            (Some(_), Some(_)) => bail!("a rule cannot have both `exclude` and `keep`"),
            (None, None) => bail!("a rule needs either `exclude` or `keep`"),
        }
    }

    fn active(&self, capabilities: &[CompilerCapability]) -> bool {
        match &self.when_compiler_below {
            None => true,
            Some(gates) => gates.iter().all(|(kind, bound)| {
                capabilities
                    .iter()
                    .any(|c| c.kind == *kind && c.version < *bound)
            }),
        }
    }

    fn label(&self) -> String {
        let (clauses, exclude) = match self.clauses() {
            Ok(parts) => parts,
            Err(_) => return "malformed rule".to_string(),
        };
        let verb = if exclude { "exclude" } else { "keep" };
        let body: Vec<String> = clauses
            .iter()
            .map(|(arg, names)| format!("{}={}", arg, names.names().join("|")))
            .collect();
        format!("{} {}", verb, body.join(" & "))
    }
}

/// `[probe]` section.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields, rename_all = "kebab-case")]
pub struct ProbeSpec {
    /// The argument whose value names are compiler kinds. When set, the
    /// driver keeps only variants whose compiler was actually detected.
    #[serde(default)]
    pub compiler_arg: Option<String>,
}

/// `[driver]` section: the external command pair and where output lives.
///
/// Command argument templates substitute `{dir}` (the variant's output
/// directory) and `{args}` (the variant's argument string), so any
/// generator/builder pair with a comparable CLI shape can be driven without
/// code changes.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields, rename_all = "kebab-case", default)]
pub struct DriverSpec {
    pub out_dir: PathBuf,
    pub generator: String,
    pub generator_args: Vec<String>,
    pub builder: String,
    pub builder_args: Vec<String>,
}

impl Default for DriverSpec {
    fn default() -> Self {
        DriverSpec {
            out_dir: PathBuf::from("out"),
            generator: "gn".to_string(),
            generator_args: vec![
                "gen".to_string(),
                "{dir}".to_string(),
                "--args={args}".to_string(),
            ],
            builder: "ninja".to_string(),
            builder_args: vec!["-C".to_string(), "{dir}".to_string()],
        }
    }
}

/// A compiled build- or ci-phase rule, applied to the variant set after
/// expansion.
#[derive(Clone)]
pub struct PostRule {
    pub phase: Phase,
    pub label: String,
    exclude: bool,
    clauses: Vec<(String, Vec<String>)>,
}

impl PostRule {
    /// Whether the variant survives this rule.
    pub fn keeps(&self, variant: &Variant) -> bool {
        let matched = self
            .clauses
            .iter()
            .all(|(arg, names)| names.iter().any(|name| variant.is(arg, name)));
        matched != self.exclude
    }
}

/// The manifest compiled against the probed capabilities: a ready-to-expand
/// matrix plus the rules that narrow the set later.
pub struct CompiledMatrix {
    pub matrix: ArgMatrix,
    pub post_rules: Vec<PostRule>,
}

impl Manifest {
    /// Load a manifest from a file path.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read manifest: {}", path.display()))?;
        Self::parse(&content).with_context(|| format!("in {}", path.display()))
    }

    /// Parse manifest content and validate what can be validated statically.
    pub fn parse(content: &str) -> Result<Self> {
        let manifest: Manifest =
            toml::from_str(content).context("failed to parse Armada.toml")?;
        manifest.validate()?;
        Ok(manifest)
    }

    fn validate(&self) -> Result<()> {
        if self.args.is_empty() {
            bail!("the manifest declares no [[args]]; there is nothing to expand");
        }
        for spec in &self.args {
            if spec.boolean && !spec.values.is_empty() {
                bail!(
                    "argument `{}` is boolean and cannot also list values",
                    spec.name
                );
            }
            if !spec.boolean && spec.values.is_empty() {
                bail!("argument `{}` declares no values", spec.name);
            }
        }
        for rule in &self.rules {
            let (clauses, _) = rule.clauses()?;
            // Typo check: a clause naming a declared argument must use
            // declared value names. Clauses naming unknown arguments are
            // left to the expansion, which reports them as unresolved.
            for (arg_name, names) in clauses {
                let Some(spec) = self.args.iter().find(|a| &a.name == arg_name) else {
                    continue;
                };
                for name in names.names() {
                    let known = if spec.boolean {
                        name == "true" || name == "false"
                    } else {
                        spec.values.iter().any(|v| &v.name == name)
                    };
                    if !known {
                        bail!(
                            "rule `{}` names value `{}`, which `{}` does not declare",
                            rule.label(),
                            name,
                            arg_name
                        );
                    }
                }
            }
        }
        if let Some(ref arg) = self.probe.compiler_arg {
            if !self.args.iter().any(|a| &a.name == arg) {
                bail!("[probe] compiler-arg `{arg}` is not a declared argument");
            }
        }
        Ok(())
    }

    /// Build the matrix and sort the rules into expansion filters and
    /// post-expansion narrowings, honoring compiler-version gates.
    pub fn compile(&self, capabilities: &[CompilerCapability]) -> Result<CompiledMatrix> {
        let mut matrix = ArgMatrix::new();

        for spec in &self.args {
            let arg = if spec.boolean {
                Arg::boolean(&spec.name, &spec.short)
            } else {
                let mut arg = Arg::choice(&spec.name, &spec.short);
                for v in &spec.values {
                    let short = v.short.as_deref().unwrap_or(&v.name);
                    let value = match &v.serialized {
                        Some(literal) => Value::raw(&v.name, literal, short),
                        None => Value::quoted(&v.name, &v.name, short),
                    };
                    arg.add(value)?;
                }
                arg
            };
            matrix.register(arg)?;
        }

        let mut post_rules = Vec::new();
        for rule in &self.rules {
            if !rule.active(capabilities) {
                tracing::debug!(rule = %rule.label(), "rule inactive for this toolchain");
                continue;
            }
            let (clauses, exclude) = rule.clauses()?;
            let clauses: Vec<(String, Vec<String>)> = clauses
                .iter()
                .map(|(arg, names)| (arg.clone(), names.names().to_vec()))
                .collect();
            let label = rule.label();

            match rule.phase {
                Phase::Matrix => {
                    if exclude {
                        matrix.exclude(label, move |v| clauses_match(&clauses, v));
                    } else {
                        matrix.retain(label, move |v| clauses_match(&clauses, v));
                    }
                }
                phase => post_rules.push(PostRule {
                    phase,
                    label,
                    exclude,
                    clauses,
                }),
            }
        }

        Ok(CompiledMatrix { matrix, post_rules })
    }
}

/// Conjunction over clauses, deferring via `?` when a clause names an
/// argument the partial variant does not yet carry.
fn clauses_match(clauses: &[(String, Vec<String>)], variant: &Variant) -> FilterResult {
    for (arg, names) in clauses {
        let value = variant.get(arg)?;
        if !names.iter().any(|name| name == value.name()) {
            return Ok(false);
        }
    }
    Ok(true)
}

/// Walk up from `start` looking for the manifest file.
pub fn find_manifest(start: &Path) -> Option<PathBuf> {
    let mut dir = Some(start);
    while let Some(d) = dir {
        let candidate = d.join(MANIFEST_NAME);
        if candidate.exists() {
            return Some(candidate);
        }
        dir = d.parent();
    }
    None
}

#[cfg(test)]
mod tests {
    use std::slice;

    use super::*;

    const SMALL: &str = r#"
        [[args]]
        name = "compiler_type"
        short = "c"
        values = [{ name = "clang" }, { name = "gcc" }]

        [[args]]
        name = "is_debug"
        short = "debug"
        bool = true

        [[rules]]
        exclude = { compiler_type = "gcc", is_debug = "true" }
    "#;

    #[test]
    fn test_parse_and_compile_small_matrix() {
        let manifest = Manifest::parse(SMALL).unwrap();
        let compiled = manifest.compile(&[]).unwrap();

        let mut set = compiled.matrix.variants().unwrap();
        assert_eq!(set.len(), 3);
        for v in set.iter() {
            assert!(!(v.is("compiler_type", "gcc") && v.is_true("is_debug")));
        }
    }

    #[test]
    fn test_value_defaults() {
        let manifest = Manifest::parse(
            r#"
            [[args]]
            name = "std_version"
            short = "std"
            values = [
                { name = "cpp17", serialized = '"c++17"', short = "17" },
                { name = "plain" },
            ]
            "#,
        )
        .unwrap();
        let compiled = manifest.compile(&[]).unwrap();
        let arg = compiled.matrix.get("std_version").unwrap();

        let cpp17 = arg.get("cpp17").unwrap();
        assert_eq!(cpp17.serialized(), "\"c++17\"");
        assert_eq!(cpp17.short(), "17");

        let plain = arg.get("plain").unwrap();
        assert_eq!(plain.serialized(), "\"plain\"");
        assert_eq!(plain.short(), "plain");
    }

    #[test]
    fn test_rule_with_unknown_value_name_is_rejected() {
        let err = Manifest::parse(
            r#"
            [[args]]
            name = "is_debug"
            short = "debug"
            bool = true

            [[rules]]
            exclude = { is_debug = "yes" }
            "#,
        )
        .unwrap_err();
        assert!(err.to_string().contains("does not declare"));
    }

    #[test]
    fn test_rule_needs_exclude_or_keep() {
        let err = Manifest::parse(
            r#"
            [[args]]
            name = "is_debug"
            short = "debug"
            bool = true

            [[rules]]
            phase = "build"
            "#,
        )
        .unwrap_err();
        assert!(err.to_string().contains("either `exclude` or `keep`"));
    }

    #[test]
    fn test_version_gated_rule() {
        let toml = r#"
            [[args]]
            name = "compiler_type"
            short = "c"
            values = [{ name = "clang" }]

            [[args]]
            name = "std_version"
            short = "std"
            values = [{ name = "cpp14" }, { name = "cpp17" }]

            [[rules]]
            exclude = { compiler_type = "clang", std_version = "cpp17" }
            when-compiler-below = { clang = "9.0.0" }
        "#;
        let manifest = Manifest::parse(toml).unwrap();

        let old_clang = CompilerCapability {
            kind: CompilerKind::Clang,
            path: PathBuf::from("/usr/bin/clang++"),
            version: Version::new(7, 0, 1),
        };
        let mut set = manifest
            .compile(slice::from_ref(&old_clang))
            .unwrap()
            .matrix
            .variants()
            .unwrap();
        assert_eq!(set.len(), 1);

        let new_clang = CompilerCapability {
            version: Version::new(17, 0, 6),
            ..old_clang
        };
        let mut set = manifest
            .compile(slice::from_ref(&new_clang))
            .unwrap()
            .matrix
            .variants()
            .unwrap();
        assert_eq!(set.len(), 2);

        // Gate also fails when the compiler was not detected at all.
        let mut set = manifest
            .compile(&[])
            .unwrap()
            .matrix
            .variants()
            .unwrap();
        assert_eq!(set.len(), 2);
    }

    #[test]
    fn test_post_rules_are_phase_scoped() {
        let toml = r#"
            [[args]]
            name = "is_run_performance_tests"
            short = "perf"
            bool = true

            [[rules]]
            phase = "build"
            exclude = { is_run_performance_tests = "true" }
        "#;
        let manifest = Manifest::parse(toml).unwrap();
        let compiled = manifest.compile(&[]).unwrap();

        // Not a matrix filter: expansion keeps both variants.
        let mut set = compiled.matrix.variants().unwrap();
        assert_eq!(set.len(), 2);

        assert_eq!(compiled.post_rules.len(), 1);
        let rule = &compiled.post_rules[0];
        assert_eq!(rule.phase, Phase::Build);
        let survivors: Vec<_> = set.iter().filter(|v| rule.keeps(v)).collect();
        assert_eq!(survivors.len(), 1);
        assert!(!survivors[0].is_true("is_run_performance_tests"));
    }

    #[test]
    fn test_driver_defaults() {
        let manifest = Manifest::parse(
            r#"
            [[args]]
            name = "is_debug"
            short = "debug"
            bool = true
            "#,
        )
        .unwrap();
        assert_eq!(manifest.driver.out_dir, PathBuf::from("out"));
        assert_eq!(manifest.driver.generator, "gn");
        assert_eq!(manifest.driver.builder, "ninja");
    }

    #[test]
    fn test_find_manifest_walks_up() {
        let tmp = tempfile::TempDir::new().unwrap();
        std::fs::write(tmp.path().join(MANIFEST_NAME), "").unwrap();
        let nested = tmp.path().join("a/b");
        std::fs::create_dir_all(&nested).unwrap();

        let found = find_manifest(&nested).unwrap();
        assert_eq!(found, tmp.path().join(MANIFEST_NAME));
    }
}
