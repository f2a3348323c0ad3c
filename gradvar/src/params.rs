//! Hyperparameter values and the `params.json` record.
//!
//! A hyperparameter set maps option names to [`ParamValue`]s. Besides
//! primitives, values can be named references to classes (e.g. an
//! environment) or functions (e.g. an activation). References are written
//! to the record as `{"$class": path}` or `{"$function": path}`:
//!
//! ```rust
//! use gradvar::params::{NamedRef, ParamSet, ParamValue};
//!
//! let mut params = ParamSet::new();
//! params.insert("seed".into(), ParamValue::Int(35));
//! params.insert("hidden_nonlinearity".into(), NamedRef::function("tanh").into());
//! let json = serde_json::to_string(&params).unwrap();
//! assert_eq!(json, r#"{"hidden_nonlinearity":{"$function":"tanh"},"seed":35}"#);
//! ```
use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::{
    collections::BTreeMap,
    fmt,
    fs::File,
    io::{BufReader, Write},
    path::Path,
};

/// File name of the hyperparameter record in a run directory.
pub const PARAMS_JSON: &str = "params.json";

/// A reference to a class or a function by its path.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum NamedRef {
    /// A type, e.g. `gradvar_maml::env::PointEnvRandDirec`.
    #[serde(rename = "$class")]
    Class(String),

    /// A function, e.g. `tanh`.
    #[serde(rename = "$function")]
    Function(String),
}

impl NamedRef {
    /// A reference to a type.
    pub fn class(path: impl Into<String>) -> Self {
        Self::Class(path.into())
    }

    /// A reference to a function.
    pub fn function(path: impl Into<String>) -> Self {
        Self::Function(path.into())
    }

    /// Path of the reference.
    pub fn path(&self) -> &str {
        match self {
            Self::Class(p) | Self::Function(p) => p,
        }
    }

    /// The last segment of the path, e.g. `PointEnvRandDirec`.
    pub fn name(&self) -> &str {
        let p = self.path();
        p.rsplit(|c: char| c == '.' || c == ':').next().unwrap_or(p)
    }
}

impl fmt::Display for NamedRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Class(p) => write!(f, "<class {}>", p),
            Self::Function(p) => write!(f, "<function {}>", p),
        }
    }
}

/// Value of a hyperparameter.
///
/// The variant order matters for deserialization: integers are tried
/// before floats, so `35` reads back as [`ParamValue::Int`] and `0.99` as
/// [`ParamValue::Float`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ParamValue {
    /// No value.
    None,

    /// A boolean.
    Bool(bool),

    /// An integer.
    Int(i64),

    /// A floating point number.
    Float(f64),

    /// A string.
    Str(String),

    /// A sequence of values.
    Tuple(Vec<ParamValue>),

    /// A reference to a class or a function.
    Ref(NamedRef),
}

impl ParamValue {
    /// Name of the variant, used in error messages.
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::None => "none",
            Self::Bool(_) => "bool",
            Self::Int(_) => "int",
            Self::Float(_) => "float",
            Self::Str(_) => "string",
            Self::Tuple(_) => "tuple",
            Self::Ref(_) => "reference",
        }
    }

    /// Returns `true` for primitive values, which round-trip exactly
    /// through the record.
    pub fn is_primitive(&self) -> bool {
        match self {
            Self::Ref(_) => false,
            Self::Tuple(vs) => vs.iter().all(|v| v.is_primitive()),
            _ => true,
        }
    }
}

impl fmt::Display for ParamValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::None => write!(f, "None"),
            Self::Bool(v) => write!(f, "{}", v),
            Self::Int(v) => write!(f, "{}", v),
            Self::Float(v) => write!(f, "{}", v),
            Self::Str(v) => write!(f, "{:?}", v),
            Self::Tuple(vs) => {
                write!(f, "(")?;
                for (i, v) in vs.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", v)?;
                }
                write!(f, ")")
            }
            Self::Ref(r) => write!(f, "{}", r),
        }
    }
}

impl From<bool> for ParamValue {
    fn from(v: bool) -> Self {
        Self::Bool(v)
    }
}

impl From<i64> for ParamValue {
    fn from(v: i64) -> Self {
        Self::Int(v)
    }
}

impl From<f64> for ParamValue {
    fn from(v: f64) -> Self {
        Self::Float(v)
    }
}

impl From<&str> for ParamValue {
    fn from(v: &str) -> Self {
        Self::Str(v.to_string())
    }
}

impl From<NamedRef> for ParamValue {
    fn from(v: NamedRef) -> Self {
        Self::Ref(v)
    }
}

impl<T: Into<ParamValue>> From<Option<T>> for ParamValue {
    fn from(v: Option<T>) -> Self {
        v.map(Into::into).unwrap_or(Self::None)
    }
}

/// A hyperparameter set, sorted by name.
pub type ParamSet = BTreeMap<String, ParamValue>;

/// Writes `params` to `path` as JSON with sorted keys and an indent of 2.
pub fn write_params_record(params: &ParamSet, path: impl AsRef<Path>) -> Result<()> {
    let mut file = File::create(path)?;
    file.write_all(serde_json::to_string_pretty(params)?.as_bytes())?;
    Ok(())
}

/// Reads a record written by [`write_params_record`].
pub fn read_params_record(path: impl AsRef<Path>) -> Result<ParamSet> {
    let file = File::open(path)?;
    let rdr = BufReader::new(file);
    Ok(serde_json::from_reader(rdr)?)
}
