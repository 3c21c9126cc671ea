//! Deep merging of layered configuration documents.
//!
//! Install configs are supplied in layers, where a tighter layer (a per-cluster override) should
//! take precedence over a looser one (the chart defaults), but *only* for the fields it actually
//! sets. Everything the tighter layer leaves out has to survive, no matter how deep it is nested:
//!
//! ```yaml
//! # defaults                # overrides               # merged
//! platform:                 platform:                 platform:
//!   aws:                      aws:                      aws:
//!     region: us-east-1         region: us-west-2         region: us-west-2
//!     subnets: [a, b]                                     subnets: [a, b]
//! ```
//!
//! Mappings are merged key by key, recursively. Every other value (scalars and sequences) is
//! replaced as a whole by the override, as long as the override actually sets it (see
//! [`is_set`]). Sequences are never concatenated, nor merged by position.
//!
//! Some mappings don't make sense to merge at all. Their paths can be declared *atomic* in the
//! [`MergePolicy`], in which case a set override replaces the default wholesale.
use std::collections::BTreeSet;

use serde_json::{Map, Value};

use crate::document::{FieldPath, InstallConfig, keys};

/// A type that can be merged with itself
///
/// This is implemented for configuration values that can come from several sources, where a
/// tighter scope (an override) should take precedence over a looser scope (the defaults).
///
/// # Example
///
/// ```
/// use rdr_config::{InstallConfig, merge::merge};
///
/// let defaults: InstallConfig = serde_yaml::from_str("
/// metadata:
///   name: ocp-primary
/// publish: External
/// ").unwrap();
/// let overrides: InstallConfig = serde_yaml::from_str("
/// metadata:
///   name: ocp-p
/// ").unwrap();
///
/// let merged = merge(overrides, &defaults);
/// assert_eq!(merged.get_str("metadata.name"), Some("ocp-p"));
/// assert_eq!(merged.get_str("publish"), Some("External"));
/// ```
pub trait Merge {
    /// Merge with `defaults`, preferring values from `self` if they are set there
    fn merge(&mut self, defaults: &Self);
}

/// Moving version of [`Merge::merge`], to produce slightly nicer test output
pub fn merge<T: Merge>(mut overrides: T, defaults: &T) -> T {
    overrides.merge(defaults);
    overrides
}

impl<T: Merge + Clone> Merge for Option<T> {
    fn merge(&mut self, defaults: &Self) {
        match (self, defaults) {
            (Some(this), Some(defaults)) => this.merge(defaults),
            (this @ None, defaults) => this.clone_from(defaults),
            (Some(_), None) => {}
        }
    }
}

/// Merges using the [default policy](MergePolicy::default).
impl Merge for InstallConfig {
    fn merge(&mut self, defaults: &Self) {
        *self = MergePolicy::default().merge_documents(self, defaults);
    }
}

/// Decides which paths are merged recursively and which are replaced wholesale.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MergePolicy {
    atomic_paths: BTreeSet<FieldPath>,
}

/// The default policy treats `compute` as atomic. A list of machine pools can't be merged
/// meaningfully by position, so an override either supplies all pools or none.
impl Default for MergePolicy {
    fn default() -> Self {
        Self::empty().with_atomic_path(keys::COMPUTE)
    }
}

impl MergePolicy {
    /// A policy without any atomic paths: every mapping is merged recursively.
    pub fn empty() -> Self {
        Self {
            atomic_paths: BTreeSet::new(),
        }
    }

    /// Marks the value at `path` (e.g. `platform.aws.userTags`) to be replaced wholesale.
    pub fn with_atomic_path(mut self, path: impl Into<FieldPath>) -> Self {
        self.atomic_paths.insert(path.into());
        self
    }

    pub fn is_atomic(&self, path: &FieldPath) -> bool {
        self.atomic_paths.contains(path)
    }

    /// Merges two install configs, preferring values set in `overrides`.
    pub fn merge_documents(
        &self,
        overrides: &InstallConfig,
        defaults: &InstallConfig,
    ) -> InstallConfig {
        self.merge_maps(&FieldPath::root(), overrides.as_map(), defaults.as_map())
            .into()
    }

    /// Merges two arbitrary values, preferring values set in `overrides`.
    pub fn merge_values(&self, overrides: &Value, defaults: &Value) -> Value {
        self.merge_at(&FieldPath::root(), overrides, defaults)
    }

    fn merge_at(&self, path: &FieldPath, overrides: &Value, defaults: &Value) -> Value {
        match (overrides, defaults) {
            (Value::Object(overrides), Value::Object(defaults)) if !self.is_atomic(path) => {
                Value::Object(self.merge_maps(path, overrides, defaults))
            }
            (overrides, _) if is_set(overrides) => overrides.clone(),
            (_, defaults) => defaults.clone(),
        }
    }

    fn merge_maps(
        &self,
        path: &FieldPath,
        overrides: &Map<String, Value>,
        defaults: &Map<String, Value>,
    ) -> Map<String, Value> {
        let mut merged = defaults.clone();
        for (key, override_value) in overrides {
            match defaults.get(key) {
                Some(default_value) => {
                    let value =
                        self.merge_at(&path.child(key.as_str()), override_value, default_value);
                    merged.insert(key.clone(), value);
                }
                None if is_set(override_value) => {
                    merged.insert(key.clone(), override_value.clone());
                }
                None => {}
            }
        }
        merged
    }
}

/// Whether `value` counts as set when used as an override.
///
/// `null`, empty strings, empty sequences and empty mappings are unset and never replace a
/// default. `false` and `0` are explicit values.
pub fn is_set(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::String(s) => !s.is_empty(),
        Value::Array(items) => !items.is_empty(),
        Value::Object(map) => !map.is_empty(),
        Value::Bool(_) | Value::Number(_) => true,
    }
}

#[cfg(test)]
mod tests {
    use indoc::indoc;
    use rstest::rstest;
    use serde_json::json;

    use super::*;

    fn doc(yaml: &str) -> InstallConfig {
        serde_yaml::from_str(yaml).expect("test YAML is valid")
    }

    #[test]
    fn partial_platform_override_keeps_siblings() {
        let defaults = doc(indoc! {"
            platform:
              aws:
                region: us-east-1
                subnets: [a, b]
        "});
        let overrides = doc(indoc! {"
            platform:
              aws:
                region: us-west-2
        "});

        let merged = merge(overrides, &defaults);
        assert_eq!(
            merged.get_path("platform.aws"),
            Some(&json!({"region": "us-west-2", "subnets": ["a", "b"]}))
        );
    }

    #[test]
    fn control_plane_type_override_keeps_replicas() {
        let defaults = doc(indoc! {"
            controlPlane:
              name: master
              replicas: 3
              platform:
                aws:
                  type: m5.xlarge
                  zones: [us-east-1a]
        "});
        let overrides = doc(indoc! {"
            controlPlane:
              platform:
                aws:
                  type: m5.2xlarge
        "});

        let merged = merge(overrides, &defaults);
        assert_eq!(
            merged.get_path("controlPlane"),
            Some(&json!({
                "name": "master",
                "replicas": 3,
                "platform": {"aws": {"type": "m5.2xlarge", "zones": ["us-east-1a"]}}
            }))
        );
    }

    #[rstest]
    #[case::absent("{}", json!([{"name": "worker", "replicas": 3}]))]
    #[case::empty("compute: []", json!([{"name": "worker", "replicas": 3}]))]
    #[case::null("compute: null", json!([{"name": "worker", "replicas": 3}]))]
    #[case::replaced("compute: [{name: infra}]", json!([{"name": "infra"}]))]
    fn compute_is_replaced_wholesale(#[case] overrides: &str, #[case] expected: Value) {
        let defaults = doc("compute: [{name: worker, replicas: 3}]");
        let merged = merge(doc(overrides), &defaults);
        assert_eq!(merged.get_path("compute"), Some(&expected));
    }

    #[test]
    fn atomic_mapping_is_not_merged() {
        let policy = MergePolicy::empty().with_atomic_path("platform.aws.userTags");
        let defaults = json!({"platform": {"aws": {"userTags": {"team": "storage", "env": "dev"}}}});
        let overrides = json!({"platform": {"aws": {"userTags": {"env": "prod"}}}});

        assert_eq!(
            policy.merge_values(&overrides, &defaults),
            json!({"platform": {"aws": {"userTags": {"env": "prod"}}}})
        );
        assert_eq!(
            MergePolicy::empty().merge_values(&overrides, &defaults),
            json!({"platform": {"aws": {"userTags": {"team": "storage", "env": "prod"}}}})
        );
    }

    #[test]
    fn unset_overrides_never_erase_defaults() {
        let defaults = json!({
            "metadata": {"name": "ocp-primary"},
            "networking": {"networkType": "OVNKubernetes"},
            "publish": "External",
        });
        let overrides = json!({
            "metadata": {"name": ""},
            "networking": null,
            "publish": "",
            "sshKey": null,
        });

        assert_eq!(MergePolicy::default().merge_values(&overrides, &defaults), defaults);
    }

    #[test]
    fn explicit_false_and_zero_override() {
        let defaults = json!({"fips": true, "controlPlane": {"replicas": 3}});
        let overrides = json!({"fips": false, "controlPlane": {"replicas": 0}});

        assert_eq!(
            MergePolicy::default().merge_values(&overrides, &defaults),
            json!({"fips": false, "controlPlane": {"replicas": 0}})
        );
    }

    #[test]
    fn nested_sequences_are_replaced() {
        let defaults = doc("platform: {aws: {subnets: [a, b]}}");
        let overrides = doc("platform: {aws: {subnets: [c]}}");

        let merged = merge(overrides, &defaults);
        assert_eq!(merged.get_path("platform.aws.subnets"), Some(&json!(["c"])));
    }

    #[test]
    fn override_only_keys_are_added() {
        let merged = merge(doc("publish: Internal\nmetadata: {}"), &InstallConfig::new());
        assert_eq!(merged, doc("publish: Internal"));
    }

    #[test]
    fn merge_options() {
        let defaults = Some(doc("publish: External\nsshKey: ssh-ed25519 AAAA"));

        assert_eq!(merge(None, &defaults), defaults);
        assert_eq!(
            merge(Some(doc("publish: Internal")), &defaults),
            Some(doc("publish: Internal\nsshKey: ssh-ed25519 AAAA"))
        );
        assert_eq!(
            merge(Some(doc("publish: Internal")), &None),
            Some(doc("publish: Internal"))
        );
    }

    #[rstest]
    #[case(json!(null), false)]
    #[case(json!(""), false)]
    #[case(json!([]), false)]
    #[case(json!({}), false)]
    #[case(json!(false), true)]
    #[case(json!(0), true)]
    #[case(json!(" "), true)]
    #[case(json!([null]), true)]
    fn set_values(#[case] value: Value, #[case] expected: bool) {
        assert_eq!(is_set(&value), expected);
    }
}
