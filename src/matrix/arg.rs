//! A named build option and its enumerated set of permitted values.

use std::fmt;

use crate::matrix::error::MatrixError;
use crate::matrix::value::Value;

/// A named build option together with its permitted [`Value`]s.
///
/// Values keep their declaration order; the order fixes expansion order but
/// carries no other meaning, since every serialized projection of a variant
/// sorts its output.
#[derive(Clone)]
pub struct Arg {
    name: String,
    short: String,
    values: Vec<Value>,
}

impl Arg {
    /// An option with an open, caller-declared value set. Populate it with
    /// [`add`](Arg::add) before registering.
    pub fn choice(name: impl Into<String>, short: impl Into<String>) -> Self {
        Arg {
            name: name.into(),
            short: short.into(),
            values: Vec::new(),
        }
    }

    /// A two-valued option holding `true` and `false`, in that order.
    pub fn boolean(name: impl Into<String>, short: impl Into<String>) -> Self {
        Arg {
            name: name.into(),
            short: short.into(),
            values: vec![Value::truth(), Value::falsity()],
        }
    }

    /// Append a value. Fails if a value with the same name is already
    /// declared on this argument.
    pub fn add(&mut self, value: Value) -> Result<(), MatrixError> {
        if self.values.iter().any(|v| v.name() == value.name()) {
            return Err(MatrixError::DuplicateValue {
                arg: self.name.clone(),
                value: value.name().to_string(),
            });
        }
        self.values.push(value);
        Ok(())
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// The tag prefixed to value tags in directory names.
    pub fn short(&self) -> &str {
        &self.short
    }

    /// Declared values, in declaration order.
    pub fn values(&self) -> &[Value] {
        &self.values
    }

    /// Look up a value by name.
    pub fn get(&self, value_name: &str) -> Option<&Value> {
        self.values.iter().find(|v| v.name() == value_name)
    }
}

impl fmt::Debug for Arg {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Arg")
            .field("name", &self.name)
            .field("short", &self.short)
            .field(
                "values",
                &self.values.iter().map(|v| v.name()).collect::<Vec<_>>(),
            )
            .finish()
    }
}
