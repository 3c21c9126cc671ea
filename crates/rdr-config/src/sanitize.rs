//! Restricts a merged install config to what the installer accepts.
//!
//! The installer rejects unknown top-level fields as well as a few platform fields it only ever
//! reads from its own state (most notably `platform.aws.vpc`). Layers written by hand are prone to
//! contain both, so every resolved document goes through [`sanitize`] before it is handed out.
use std::collections::BTreeSet;

use serde_json::Value;

use crate::{
    document::{InstallConfig, keys},
    merge::is_set,
};

/// The `apiVersion` inserted when a document does not carry one.
pub const DEFAULT_API_VERSION: &str = "v1";

/// The top-level keys the installer schema accepts.
pub const ALLOWED_TOP_LEVEL_KEYS: &[&str] = &[
    keys::API_VERSION,
    keys::BASE_DOMAIN,
    keys::METADATA,
    keys::CONTROL_PLANE,
    keys::COMPUTE,
    keys::NETWORKING,
    keys::PLATFORM,
    keys::PUBLISH,
    keys::PULL_SECRET,
    keys::SSH_KEY,
];

/// Keys inside a provider sub-document (e.g. `platform.aws`) the installer rejects.
pub const DISALLOWED_PLATFORM_KEYS: &[&str] = &["vpc"];

/// Sanitizes `config` using the [default policy](SanitizePolicy::default).
pub fn sanitize(config: InstallConfig) -> InstallConfig {
    SanitizePolicy::default().sanitize(config)
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SanitizePolicy {
    allowed_keys: BTreeSet<String>,
    disallowed_platform_keys: BTreeSet<String>,
    default_api_version: String,
}

impl Default for SanitizePolicy {
    fn default() -> Self {
        Self {
            allowed_keys: to_set(ALLOWED_TOP_LEVEL_KEYS),
            disallowed_platform_keys: to_set(DISALLOWED_PLATFORM_KEYS),
            default_api_version: DEFAULT_API_VERSION.to_owned(),
        }
    }
}

impl SanitizePolicy {
    pub fn with_allowed_key(mut self, key: impl Into<String>) -> Self {
        self.allowed_keys.insert(key.into());
        self
    }

    pub fn with_disallowed_platform_key(mut self, key: impl Into<String>) -> Self {
        self.disallowed_platform_keys.insert(key.into());
        self
    }

    pub fn with_default_api_version(mut self, api_version: impl Into<String>) -> Self {
        self.default_api_version = api_version.into();
        self
    }

    pub fn allows(&self, key: &str) -> bool {
        self.allowed_keys.contains(key)
    }

    /// Returns a copy of `config` that
    ///
    /// 1. carries an `apiVersion` (an existing one is never overwritten),
    /// 2. contains none of the disallowed keys in any provider sub-document of `platform`,
    ///    `controlPlane.platform` and `compute[*].platform`,
    /// 3. contains only allow-listed top-level keys.
    ///
    /// Unknown keys below the top level are passed through untouched. Sanitizing is idempotent.
    pub fn sanitize(&self, config: InstallConfig) -> InstallConfig {
        let mut config = config.into_map();

        if !config.get(keys::API_VERSION).is_some_and(is_set) {
            config.insert(
                keys::API_VERSION.to_owned(),
                Value::String(self.default_api_version.clone()),
            );
        }

        self.strip_platform(config.get_mut(keys::PLATFORM));
        if let Some(Value::Object(control_plane)) = config.get_mut(keys::CONTROL_PLANE) {
            self.strip_platform(control_plane.get_mut(keys::PLATFORM));
        }
        if let Some(Value::Array(pools)) = config.get_mut(keys::COMPUTE) {
            for pool in pools.iter_mut().filter_map(Value::as_object_mut) {
                self.strip_platform(pool.get_mut(keys::PLATFORM));
            }
        }

        let dropped = config
            .keys()
            .filter(|key| !self.allows(key))
            .cloned()
            .collect::<Vec<_>>();
        if !dropped.is_empty() {
            tracing::debug!(?dropped, "dropping top-level keys which are not allow-listed");
            config.retain(|key, _| self.allowed_keys.contains(key));
        }

        config.into()
    }

    fn strip_platform(&self, platform: Option<&mut Value>) {
        let Some(Value::Object(providers)) = platform else {
            return;
        };
        for (provider, settings) in providers.iter_mut() {
            let Value::Object(settings) = settings else {
                continue;
            };
            for key in &self.disallowed_platform_keys {
                if settings.remove(key).is_some() {
                    tracing::debug!(%provider, %key, "removed disallowed platform key");
                }
            }
        }
    }
}

fn to_set(keys: &[&str]) -> BTreeSet<String> {
    keys.iter().map(|key| (*key).to_owned()).collect()
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

    fn messy_config() -> InstallConfig {
        doc(indoc! {"
            apiVersion: v1
            baseDomain: example.com
            metadata:
              name: ocp-primary
              annotations:
                team: storage
            controlPlane:
              replicas: 3
              platform:
                aws:
                  type: m5.xlarge
                  vpc: {id: vpc-cp}
            compute:
              - name: worker
                platform:
                  aws:
                    type: m5.4xlarge
                    vpc: {id: vpc-worker}
              - name: infra
            platform:
              aws:
                region: us-east-1
                subnets: [a, b]
                amiID: ami-0123
                futureField: keep-me
                vpc:
                  id: vpc-123
            clusterGroup: resilient
            version: 4.18.7
            helmRelease: rdr
        "})
    }

    #[test]
    fn removes_vpc_everywhere() {
        let sanitized = sanitize(messy_config());

        assert_eq!(sanitized.get_path("platform.aws.vpc"), None);
        assert_eq!(sanitized.get_path("controlPlane.platform.aws.vpc"), None);
        assert_eq!(sanitized.get_path("compute.0.platform.aws.vpc"), None);
        assert_eq!(
            sanitized.get_path("platform.aws"),
            Some(&json!({
                "region": "us-east-1",
                "subnets": ["a", "b"],
                "amiID": "ami-0123",
                "futureField": "keep-me",
            }))
        );
    }

    #[test]
    fn projects_onto_allow_list() {
        let sanitized = sanitize(messy_config());

        let mut keys = sanitized.as_map().keys().map(String::as_str).collect::<Vec<_>>();
        keys.sort_unstable();
        assert_eq!(
            keys,
            [
                "apiVersion",
                "baseDomain",
                "compute",
                "controlPlane",
                "metadata",
                "platform"
            ]
        );
        assert_eq!(sanitized.get_str("metadata.annotations.team"), Some("storage"));
    }

    #[rstest]
    #[case::missing("{}", "v1")]
    #[case::empty("apiVersion: ''", "v1")]
    #[case::kept("apiVersion: v2", "v2")]
    fn api_version(#[case] input: &str, #[case] expected: &str) {
        assert_eq!(sanitize(doc(input)).get_str("apiVersion"), Some(expected));
    }

    #[test]
    fn custom_default_api_version() {
        let policy = SanitizePolicy::default().with_default_api_version("v2");
        assert_eq!(policy.sanitize(InstallConfig::new()), doc("apiVersion: v2"));
    }

    #[test]
    fn custom_policy_keys() {
        let policy = SanitizePolicy::default()
            .with_allowed_key("fips")
            .with_disallowed_platform_key("hostedZone");
        let sanitized = policy.sanitize(doc(indoc! {"
            fips: true
            platform:
              aws:
                hostedZone: Z123
                region: eu-west-1
        "}));

        assert_eq!(sanitized.get_path("fips"), Some(&json!(true)));
        assert_eq!(sanitized.get_path("platform.aws"), Some(&json!({"region": "eu-west-1"})));
    }

    #[rstest]
    #[case(messy_config())]
    #[case(InstallConfig::new())]
    #[case(doc("platform: aws"))]
    #[case(doc("platform: {aws: [vpc]}\ncompute: worker"))]
    #[case(doc("metadata: {name: x}\nextra: 1\napiVersion: v9"))]
    fn idempotent(#[case] config: InstallConfig) {
        let once = sanitize(config);
        let twice = sanitize(once.clone());
        assert_eq!(once, twice);
    }
}
