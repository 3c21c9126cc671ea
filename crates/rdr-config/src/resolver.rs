//! Turns the configuration layers of a role into a [`ResolvedCluster`].
//!
//! Resolution always produces a document. Inputs that are too incomplete to provision a cluster
//! still resolve, so that the result can be inspected; judging whether the result is good enough
//! is left to [`validation`](crate::validation).
use std::collections::BTreeMap;

use serde::Serialize;
use serde_json::{Map, Value};
use strum::IntoEnumIterator;

use crate::{
    ClusterRole,
    document::{InstallConfig, keys},
    domain::{ClusterDomain, is_placeholder_base_domain},
    fallback::FallbackConfigs,
    merge::{MergePolicy, is_set},
    sanitize::SanitizePolicy,
    values::{ChartValues, ClusterDeclaration, RegionalDr},
};

pub const DEFAULT_PRIMARY_NAME: &str = "ocp-primary";
pub const DEFAULT_SECONDARY_NAME: &str = "ocp-secondary";

/// The resolved cluster of every role.
pub type ResolvedClusters = BTreeMap<ClusterRole, ResolvedCluster>;

/// Constants the resolver falls back to when the layers don't provide a value.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ResolverDefaults {
    /// Used to derive the `baseDomain` when the caller passes no cluster domain.
    pub cluster_domain: ClusterDomain,
    pub primary_name: String,
    pub secondary_name: String,
}

impl Default for ResolverDefaults {
    fn default() -> Self {
        Self {
            cluster_domain: ClusterDomain::default(),
            primary_name: DEFAULT_PRIMARY_NAME.to_owned(),
            secondary_name: DEFAULT_SECONDARY_NAME.to_owned(),
        }
    }
}

impl ResolverDefaults {
    pub fn cluster_name(&self, role: ClusterRole) -> &str {
        match role {
            ClusterRole::Primary => &self.primary_name,
            ClusterRole::Secondary => &self.secondary_name,
        }
    }
}

/// A fully resolved cluster, ready to be handed to the provisioning automation.
///
/// Serializes as
///
/// ```yaml
/// name: ocp-primary
/// version: 4.18.7
/// clusterGroup: resilient
/// install_config:
///   apiVersion: v1
///   # ...
/// ```
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ResolvedCluster {
    name: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    version: Option<String>,

    #[serde(rename = "clusterGroup", skip_serializing_if = "Option::is_none")]
    cluster_group: Option<String>,

    install_config: InstallConfig,
}

impl ResolvedCluster {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn version(&self) -> Option<&str> {
        self.version.as_deref()
    }

    pub fn cluster_group(&self) -> Option<&str> {
        self.cluster_group.as_deref()
    }

    pub fn install_config(&self) -> &InstallConfig {
        &self.install_config
    }

    pub fn into_install_config(self) -> InstallConfig {
        self.install_config
    }
}

/// Resolves the layered configuration of a [`ClusterRole`].
///
/// The resolver holds no mutable state, the same inputs always resolve to the same cluster.
/// Both roles can be resolved concurrently from a shared reference.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Resolver {
    defaults: ResolverDefaults,
    merge_policy: MergePolicy,
    sanitize_policy: SanitizePolicy,
}

impl Resolver {
    pub fn new(defaults: ResolverDefaults) -> Self {
        Self {
            defaults,
            ..Self::default()
        }
    }

    pub fn with_merge_policy(mut self, merge_policy: MergePolicy) -> Self {
        self.merge_policy = merge_policy;
        self
    }

    pub fn with_sanitize_policy(mut self, sanitize_policy: SanitizePolicy) -> Self {
        self.sanitize_policy = sanitize_policy;
        self
    }

    pub fn defaults(&self) -> &ResolverDefaults {
        &self.defaults
    }

    /// Resolves the cluster of `role`.
    ///
    /// - `region` is the regional DR declaration the base layer is taken from,
    /// - `fallback` replaces the base install config if that lacks a `controlPlane`,
    /// - `overrides` is deep-merged on top of the (effective) base,
    /// - `cluster_domain` is used to derive the `baseDomain` if none is set. The
    ///   [default](ResolverDefaults::cluster_domain) is used if it is [`None`].
    pub fn resolve(
        &self,
        role: ClusterRole,
        region: Option<&RegionalDr>,
        fallback: Option<&InstallConfig>,
        overrides: Option<&ClusterDeclaration>,
        cluster_domain: Option<&ClusterDomain>,
    ) -> ResolvedCluster {
        let base = region.and_then(|region| region.clusters.get(role));

        let effective = effective_base(role, base, fallback);
        let keep_metadata_name = keeps_metadata_name(base, fallback, overrides);
        let merged = match overrides.and_then(|overrides| overrides.install_config.as_ref()) {
            Some(override_config) => self
                .merge_policy
                .merge_documents(override_config, &effective),
            None => effective,
        };
        let mut install_config = self.sanitize_policy.sanitize(merged);

        let cluster_domain = cluster_domain.unwrap_or(&self.defaults.cluster_domain);
        self.resolve_base_domain(&mut install_config, cluster_domain);

        let name = overrides
            .and_then(ClusterDeclaration::name)
            .or_else(|| base.and_then(ClusterDeclaration::name))
            .unwrap_or_else(|| self.defaults.cluster_name(role))
            .to_owned();
        let version = overrides
            .and_then(ClusterDeclaration::version)
            .or_else(|| base.and_then(ClusterDeclaration::version))
            .map(str::to_owned);
        let cluster_group = overrides
            .and_then(ClusterDeclaration::cluster_group)
            .or_else(|| base.and_then(ClusterDeclaration::cluster_group))
            .or_else(|| region.map(|region| region.name.as_str()))
            .map(str::to_owned);
        self.fill_metadata_name(&mut install_config, &name, keep_metadata_name);

        tracing::debug!(
            %role,
            %name,
            ?version,
            ?cluster_group,
            "resolved cluster"
        );

        ResolvedCluster {
            name,
            version,
            cluster_group,
            install_config,
        }
    }

    /// Resolves both roles from the chart values.
    ///
    /// The base is taken from the regional DR declaration named `region` (the first one if
    /// [`None`]), the overrides from `clusterOverrides`. `cluster_domain` takes precedence over
    /// `global.clusterDomain`.
    pub fn resolve_values(
        &self,
        values: &ChartValues,
        region: Option<&str>,
        fallbacks: &FallbackConfigs,
        cluster_domain: Option<&ClusterDomain>,
    ) -> ResolvedClusters {
        let region = values.region(region);
        if region.is_none() {
            tracing::warn!("no matching regional DR declaration found, resolving without a base");
        }
        let cluster_domain = cluster_domain.or(values.global.cluster_domain.as_ref());

        ClusterRole::iter()
            .map(|role| {
                let resolved = self.resolve(
                    role,
                    region,
                    fallbacks.get(role),
                    values.cluster_overrides.get(role),
                    cluster_domain,
                );
                (role, resolved)
            })
            .collect()
    }

    /// The fallback document of `role` as it should be packaged: the sanitized base install
    /// config, without any overrides and without environment specific values such as the
    /// `baseDomain`.
    pub fn fallback_document(
        &self,
        role: ClusterRole,
        region: Option<&RegionalDr>,
    ) -> InstallConfig {
        let base = region
            .and_then(|region| region.clusters.get(role))
            .and_then(|base| base.install_config.clone())
            .unwrap_or_default();
        let mut fallback = self.sanitize_policy.sanitize(base).into_map();
        fallback.remove(keys::BASE_DOMAIN);
        fallback.into()
    }

    fn resolve_base_domain(
        &self,
        install_config: &mut InstallConfig,
        cluster_domain: &ClusterDomain,
    ) {
        if !self.sanitize_policy.allows(keys::BASE_DOMAIN)
            || !is_placeholder_base_domain(install_config.get(keys::BASE_DOMAIN))
        {
            return;
        }
        let base_domain = cluster_domain.base_domain();
        tracing::debug!(%cluster_domain, base_domain, "deriving baseDomain from cluster domain");
        install_config.insert(keys::BASE_DOMAIN, base_domain);
    }

    /// Sets `metadata.name` to the cluster name, unless it is set and `keep_existing` is true.
    fn fill_metadata_name(
        &self,
        install_config: &mut InstallConfig,
        name: &str,
        keep_existing: bool,
    ) {
        if !self.sanitize_policy.allows(keys::METADATA) {
            return;
        }
        match install_config.get_mut(keys::METADATA) {
            Some(Value::Object(metadata)) => {
                if !(keep_existing && metadata.get(keys::NAME).is_some_and(is_set)) {
                    metadata.insert(keys::NAME.to_owned(), Value::from(name));
                }
            }
            Some(Value::Null) | None => {
                let mut metadata = Map::new();
                metadata.insert(keys::NAME.to_owned(), Value::from(name));
                install_config.insert(keys::METADATA, metadata);
            }
            Some(_) => {}
        }
    }
}

/// Whether an explicit `metadata.name` should survive instead of being replaced by the resolved
/// cluster name.
///
/// An override's `metadata.name` always survives. The base's survives unless the override renames
/// the cluster. A fallback's never does, it names the packaged default and not this cluster.
fn keeps_metadata_name(
    base: Option<&ClusterDeclaration>,
    fallback: Option<&InstallConfig>,
    overrides: Option<&ClusterDeclaration>,
) -> bool {
    let names_cluster =
        |config: &InstallConfig| config.get_path("metadata.name").is_some_and(is_set);

    if overrides
        .and_then(|overrides| overrides.install_config.as_ref())
        .is_some_and(names_cluster)
    {
        return true;
    }
    if overrides.and_then(ClusterDeclaration::name).is_some() {
        return false;
    }
    base.and_then(|base| base.install_config.as_ref())
        .filter(|base_config| base_config.has_control_plane() || fallback.is_none())
        .is_some_and(names_cluster)
}

/// The install config the override is merged onto: the base if it is complete, the fallback
/// otherwise.
fn effective_base(
    role: ClusterRole,
    base: Option<&ClusterDeclaration>,
    fallback: Option<&InstallConfig>,
) -> InstallConfig {
    let base_config = base.and_then(|base| base.install_config.as_ref());
    match (base_config, fallback) {
        (Some(base_config), _) if base_config.has_control_plane() => base_config.clone(),
        (_, Some(fallback)) => {
            tracing::debug!(%role, "base declares no controlPlane, using the fallback instead");
            fallback.clone()
        }
        (base_config, None) => {
            tracing::warn!(
                %role,
                "base declares no controlPlane and there is no fallback, the result will be incomplete"
            );
            base_config.cloned().unwrap_or_default()
        }
    }
}
