//! Generator kinds and their parameter schemas.
//!
//! Every kind declares the option names it accepts. Binding copies only
//! those names out of a column's option bag; anything else is ignored.

use crate::schema::GeneratorOptions;
use serde_yaml_ng::Value as YamlValue;
use std::collections::BTreeMap;
use std::fmt;

/// Option key selecting the generator kind
pub const GENERATOR_KEY: &str = "generator";
/// Decoration: at most N distinct values, then recycle
pub const DISTINCT_KEY: &str = "distinct";
/// Decoration: never repeat a value
pub const UNIQUE_KEY: &str = "unique";
/// Target `table.column` of a `foreign` generator
pub const FOREIGN_KEY_PARAM: &str = "key";

/// Built-in generator kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GeneratorKind {
    Integer,
    Decimal,
    Timestamp,
    String,
    Alphanumeric,
    OneOf,
    Boolean,
    Uuid,
    Ipv4,
    Binary,
    Name,
    FirstName,
    LastName,
    Email,
    Username,
    PhoneNumber,
    Company,
    City,
    Street,
    Zip,
    Word,
    Sentence,
    /// Monotonic counter, ignores randomness
    Sequence,
    /// Draws from another column's published values
    Foreign,
}

impl GeneratorKind {
    pub const ALL: &'static [GeneratorKind] = &[
        GeneratorKind::Integer,
        GeneratorKind::Decimal,
        GeneratorKind::Timestamp,
        GeneratorKind::String,
        GeneratorKind::Alphanumeric,
        GeneratorKind::OneOf,
        GeneratorKind::Boolean,
        GeneratorKind::Uuid,
        GeneratorKind::Ipv4,
        GeneratorKind::Binary,
        GeneratorKind::Name,
        GeneratorKind::FirstName,
        GeneratorKind::LastName,
        GeneratorKind::Email,
        GeneratorKind::Username,
        GeneratorKind::PhoneNumber,
        GeneratorKind::Company,
        GeneratorKind::City,
        GeneratorKind::Street,
        GeneratorKind::Zip,
        GeneratorKind::Word,
        GeneratorKind::Sentence,
        GeneratorKind::Sequence,
        GeneratorKind::Foreign,
    ];

    /// Name used in config files
    pub fn name(&self) -> &'static str {
        match self {
            GeneratorKind::Integer => "integer",
            GeneratorKind::Decimal => "decimal",
            GeneratorKind::Timestamp => "timestamp",
            GeneratorKind::String => "string",
            GeneratorKind::Alphanumeric => "alphanumeric",
            GeneratorKind::OneOf => "oneof",
            GeneratorKind::Boolean => "boolean",
            GeneratorKind::Uuid => "uuid",
            GeneratorKind::Ipv4 => "ipv4",
            GeneratorKind::Binary => "binary",
            GeneratorKind::Name => "name",
            GeneratorKind::FirstName => "first_name",
            GeneratorKind::LastName => "last_name",
            GeneratorKind::Email => "email",
            GeneratorKind::Username => "username",
            GeneratorKind::PhoneNumber => "phone_number",
            GeneratorKind::Company => "company",
            GeneratorKind::City => "city",
            GeneratorKind::Street => "street",
            GeneratorKind::Zip => "zip",
            GeneratorKind::Word => "word",
            GeneratorKind::Sentence => "sentence",
            GeneratorKind::Sequence => "sequence",
            GeneratorKind::Foreign => "foreign",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|k| k.name() == name)
    }

    /// Parameter names this kind accepts
    pub fn params(&self) -> &'static [&'static str] {
        match self {
            GeneratorKind::Integer => &["min", "max"],
            GeneratorKind::Decimal => &["min", "max", "precision", "maxdigits"],
            GeneratorKind::Timestamp => &["start", "end", "format"],
            GeneratorKind::String => &["min", "max", "pattern"],
            GeneratorKind::Alphanumeric | GeneratorKind::Binary => &["min", "max"],
            GeneratorKind::OneOf => &["items"],
            GeneratorKind::Boolean => &["chance"],
            GeneratorKind::Sentence => &["min", "max"],
            GeneratorKind::Sequence => &["start", "step"],
            GeneratorKind::Foreign => &[FOREIGN_KEY_PARAM],
            _ => &[],
        }
    }

    /// Whether `distinct`/`unique` decorations apply
    pub fn is_decoratable(&self) -> bool {
        !matches!(self, GeneratorKind::Sequence | GeneratorKind::Foreign)
    }
}

impl fmt::Display for GeneratorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl std::str::FromStr for GeneratorKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_name(s).ok_or_else(|| format!("no valid generator found: {}", s))
    }
}

/// Parameters bound for one kind, restricted to its declared names
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Params {
    values: BTreeMap<String, YamlValue>,
}

impl Params {
    /// Copy the recognised parameter names for `kind` out of `options`
    pub fn bind(kind: GeneratorKind, options: &GeneratorOptions) -> Self {
        let values = kind
            .params()
            .iter()
            .filter_map(|&name| options.get(name).map(|v| (name.to_string(), v.clone())))
            .collect();
        Self { values }
    }

    pub fn values(&self) -> &BTreeMap<String, YamlValue> {
        &self.values
    }

    pub fn get(&self, name: &str) -> Option<&YamlValue> {
        self.values.get(name)
    }

    pub fn i64_or(&self, name: &str, default: i64) -> Result<i64, String> {
        match self.values.get(name) {
            None => Ok(default),
            Some(v) => v
                .as_i64()
                .ok_or_else(|| format!("parameter `{}` must be an integer, got {:?}", name, v)),
        }
    }

    pub fn f64_or(&self, name: &str, default: f64) -> Result<f64, String> {
        match self.values.get(name) {
            None => Ok(default),
            Some(v) => v
                .as_f64()
                .ok_or_else(|| format!("parameter `{}` must be a number, got {:?}", name, v)),
        }
    }

    pub fn usize_or(&self, name: &str, default: usize) -> Result<usize, String> {
        match self.values.get(name) {
            None => Ok(default),
            Some(v) => v.as_u64().map(|n| n as usize).ok_or_else(|| {
                format!("parameter `{}` must be a non-negative integer, got {:?}", name, v)
            }),
        }
    }

    pub fn opt_u32(&self, name: &str) -> Result<Option<u32>, String> {
        match self.values.get(name) {
            None | Some(YamlValue::Null) => Ok(None),
            Some(v) => v
                .as_u64()
                .and_then(|n| u32::try_from(n).ok())
                .map(Some)
                .ok_or_else(|| format!("parameter `{}` must be a small integer, got {:?}", name, v)),
        }
    }

    pub fn str_or<'a>(&'a self, name: &str, default: &'a str) -> Result<&'a str, String> {
        match self.values.get(name) {
            None => Ok(default),
            Some(v) => v
                .as_str()
                .ok_or_else(|| format!("parameter `{}` must be a string, got {:?}", name, v)),
        }
    }

    pub fn opt_str(&self, name: &str) -> Result<Option<&str>, String> {
        match self.values.get(name) {
            None | Some(YamlValue::Null) => Ok(None),
            Some(v) => v
                .as_str()
                .map(Some)
                .ok_or_else(|| format!("parameter `{}` must be a string, got {:?}", name, v)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_names_round_trip() {
        for kind in GeneratorKind::ALL {
            assert_eq!(GeneratorKind::from_name(kind.name()), Some(*kind));
        }
        assert!("nope".parse::<GeneratorKind>().is_err());
    }

    #[test]
    fn test_bind_ignores_unrecognised_keys() {
        let mut options = GeneratorOptions::new();
        options.insert("min".into(), YamlValue::from(3));
        options.insert("max".into(), YamlValue::from(9));
        options.insert("format".into(), YamlValue::from("%Y"));
        options.insert("colour".into(), YamlValue::from("blue"));

        let params = Params::bind(GeneratorKind::Integer, &options);
        let keys: Vec<&String> = params.values().keys().collect();
        assert_eq!(keys, vec!["max", "min"]);
        assert_eq!(params.i64_or("min", 0), Ok(3));
        assert_eq!(params.i64_or("absent", 42), Ok(42));
    }

    #[test]
    fn test_wrong_shape_is_error() {
        let mut options = GeneratorOptions::new();
        options.insert("min".into(), YamlValue::from("abc"));
        let params = Params::bind(GeneratorKind::Integer, &options);
        assert!(params.i64_or("min", 0).is_err());
    }
}
