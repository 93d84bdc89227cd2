//! A single permitted setting for a build option.

use std::any::Any;
use std::fmt;
use std::sync::Arc;

/// One permitted setting for an [`Arg`](crate::matrix::Arg).
///
/// A value carries three strings: a `name` (unique within its owning
/// argument), the `serialized` literal written verbatim into the generated
/// argument string, and a `short` tag used when composing output directory
/// names. An optional opaque payload can ride along, e.g. the probed compiler
/// record that produced the value.
#[derive(Clone)]
pub struct Value {
    name: String,
    serialized: String,
    short: String,
    data: Option<Arc<dyn Any + Send + Sync>>,
}

impl Value {
    /// A value whose serialized form is the given literal, written verbatim.
    ///
    /// Use this for non-string literals such as `[]` or
    /// `["ASSERT_ON", "TERMINATE_ON_EXCEPTION_ON"]`.
    pub fn raw(
        name: impl Into<String>,
        serialized: impl Into<String>,
        short: impl Into<String>,
    ) -> Self {
        Value {
            name: name.into(),
            serialized: serialized.into(),
            short: short.into(),
            data: None,
        }
    }

    /// A string value: `inner` is wrapped in double quotes when serialized.
    pub fn quoted(
        name: impl Into<String>,
        inner: impl AsRef<str>,
        short: impl Into<String>,
    ) -> Self {
        let name = name.into();
        Value {
            serialized: format!("\"{}\"", inner.as_ref()),
            short: short.into(),
            name,
            data: None,
        }
    }

    /// A string value named after its content, with the name doubling as the
    /// short tag: `Value::string("clang")` serializes as `"clang"`.
    pub fn string(name: impl Into<String>) -> Self {
        let name = name.into();
        Value {
            serialized: format!("\"{}\"", name),
            short: name.clone(),
            name,
            data: None,
        }
    }

    /// The boolean `true` value (short tag `t`).
    pub fn truth() -> Self {
        Value::raw("true", "true", "t")
    }

    /// The boolean `false` value (short tag `f`).
    pub fn falsity() -> Self {
        Value::raw("false", "false", "f")
    }

    /// Attach an opaque payload to this value.
    pub fn with_data<T: Any + Send + Sync>(mut self, data: T) -> Self {
        self.data = Some(Arc::new(data));
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// The literal form written into the argument string.
    pub fn serialized(&self) -> &str {
        &self.serialized
    }

    /// The tag used in directory names.
    pub fn short(&self) -> &str {
        &self.short
    }

    /// Downcast the opaque payload, if one was attached with [`with_data`].
    ///
    /// [`with_data`]: Value::with_data
    pub fn data<T: Any + Send + Sync>(&self) -> Option<&T> {
        self.data.as_deref().and_then(|d| d.downcast_ref())
    }

    /// `Some(bool)` if the serialized form is a boolean literal.
    pub fn as_bool(&self) -> Option<bool> {
        match self.serialized.as_str() {
            "true" => Some(true),
            "false" => Some(false),
            _ => None,
        }
    }
}

/// Values compare by their serialized forms, so values with distinct names
/// but identical literals are interchangeable in a generated argument string.
impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        self.serialized == other.serialized
    }
}

impl Eq for Value {}

/// A boolean value compares equal to the plain `bool` it serializes to.
impl PartialEq<bool> for Value {
    fn eq(&self, other: &bool) -> bool {
        self.as_bool() == Some(*other)
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Value")
            .field("name", &self.name)
            .field("serialized", &self.serialized)
            .field("short", &self.short)
            .finish()
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.serialized)
    }
}
