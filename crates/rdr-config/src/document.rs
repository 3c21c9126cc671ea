//! The [`InstallConfig`] document and the [`FieldPath`]s used to address values inside it.
//!
//! An install config is deliberately kept as an untyped, nested key-value document: the resolver
//! only knows a handful of its fields and must pass everything else through unchanged, so that new
//! installer fields keep working without a release of this crate.
use std::{convert::Infallible, fmt::Display, str::FromStr};

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use snafu::Snafu;

/// Well-known keys of an install config.
pub mod keys {
    pub const API_VERSION: &str = "apiVersion";
    pub const BASE_DOMAIN: &str = "baseDomain";
    pub const COMPUTE: &str = "compute";
    pub const CONTROL_PLANE: &str = "controlPlane";
    pub const METADATA: &str = "metadata";
    pub const NAME: &str = "name";
    pub const NETWORKING: &str = "networking";
    pub const PLATFORM: &str = "platform";
    pub const PUBLISH: &str = "publish";
    pub const PULL_SECRET: &str = "pullSecret";
    pub const SSH_KEY: &str = "sshKey";
}

#[derive(Debug, PartialEq, Eq, Snafu)]
pub enum Error {
    #[snafu(display("an install config must be a key-value mapping, but found {found}"))]
    NotAMapping { found: &'static str },
}

/// A dotted path to a field of a document, e.g. `platform.aws.region`.
///
/// Sequence elements are addressed by their index, e.g. `compute.0.replicas`.
#[derive(Clone, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct FieldPath {
    segments: Vec<String>,
}

impl FieldPath {
    /// The path of the document itself.
    pub fn root() -> Self {
        Self::default()
    }

    /// Returns the path of the field `segment` below `self`.
    pub fn child(&self, segment: impl Into<String>) -> Self {
        let mut segments = self.segments.clone();
        segments.push(segment.into());
        Self { segments }
    }

    pub fn segments(&self) -> impl Iterator<Item = &str> {
        self.segments.iter().map(String::as_str)
    }

    pub fn is_root(&self) -> bool {
        self.segments.is_empty()
    }
}

impl FromStr for FieldPath {
    type Err = Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self::from(s))
    }
}

impl From<&str> for FieldPath {
    fn from(value: &str) -> Self {
        Self {
            segments: value
                .split('.')
                .filter(|segment| !segment.is_empty())
                .map(str::to_owned)
                .collect(),
        }
    }
}

impl Display for FieldPath {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.is_root() {
            return f.write_str("<root>");
        }
        for (i, segment) in self.segments.iter().enumerate() {
            if i > 0 {
                f.write_str(".")?;
            }
            f.write_str(segment)?;
        }
        Ok(())
    }
}

/// The configuration document of the cluster installer, e.g.
///
/// ```yaml
/// apiVersion: v1
/// baseDomain: example.com
/// metadata:
///   name: ocp-primary
/// controlPlane:
///   name: master
///   replicas: 3
/// compute:
///   - name: worker
///     replicas: 3
/// platform:
///   aws:
///     region: us-east-1
/// ```
///
/// Deserializing anything other than a key-value mapping fails.
#[derive(Clone, Debug, Default, Deserialize, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct InstallConfig(Map<String, Value>);

impl InstallConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn as_map(&self) -> &Map<String, Value> {
        &self.0
    }

    pub fn into_map(self) -> Map<String, Value> {
        self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    /// Looks up a nested value by its dotted `path`, e.g. `controlPlane.platform.aws.type`.
    pub fn get_path(&self, path: impl Into<FieldPath>) -> Option<&Value> {
        let path = path.into();
        let mut segments = path.segments();
        let mut current = self.0.get(segments.next()?)?;
        for segment in segments {
            current = match current {
                Value::Object(map) => map.get(segment)?,
                Value::Array(items) => items.get(segment.parse::<usize>().ok()?)?,
                _ => return None,
            };
        }
        Some(current)
    }

    /// Like [`Self::get_path`], but only returns string values.
    pub fn get_str(&self, path: impl Into<FieldPath>) -> Option<&str> {
        self.get_path(path).and_then(Value::as_str)
    }

    /// Whether the document contains a (non-null) `controlPlane`.
    ///
    /// A base without a control plane is considered minimal and gets replaced by the fallback.
    pub fn has_control_plane(&self) -> bool {
        self.0
            .get(keys::CONTROL_PLANE)
            .is_some_and(|control_plane| !control_plane.is_null())
    }

    pub(crate) fn insert(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        self.0.insert(key.into(), value.into());
    }

    pub(crate) fn get_mut(&mut self, key: &str) -> Option<&mut Value> {
        self.0.get_mut(key)
    }
}

impl From<Map<String, Value>> for InstallConfig {
    fn from(value: Map<String, Value>) -> Self {
        Self(value)
    }
}

impl From<InstallConfig> for Value {
    fn from(value: InstallConfig) -> Self {
        Value::Object(value.0)
    }
}

impl TryFrom<Value> for InstallConfig {
    type Error = Error;

    fn try_from(value: Value) -> Result<Self, Self::Error> {
        match value {
            Value::Object(map) => Ok(Self(map)),
            other => NotAMappingSnafu {
                found: value_kind(&other),
            }
            .fail(),
        }
    }
}

/// A human readable name of the JSON type of `value`, used in error messages.
pub(crate) fn value_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "a sequence",
        Value::Object(_) => "a mapping",
    }
}
