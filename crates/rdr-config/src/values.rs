//! The chart values the layers are read from.
//!
//! ```yaml
//! global:
//!   clusterDomain: rdr.example.com
//! regionalDR:
//!   - name: resilient
//!     clusters:
//!       primary:
//!         name: ocp-primary
//!         version: 4.18.7
//!         install_config:
//!           # ... base install config
//!       secondary:
//!         name: ocp-secondary
//! clusterOverrides:
//!   primary:
//!     name: ocp-p
//!     install_config:
//!       platform:
//!         aws:
//!           region: eu-west-1
//! ```
//!
//! Keys not listed here are ignored, values files are shared with other charts.
use serde::{Deserialize, Deserializer, Serialize};

use crate::{ClusterRole, document::InstallConfig, domain::ClusterDomain};

#[derive(Clone, Debug, Default, Deserialize, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChartValues {
    #[serde(default)]
    pub global: GlobalValues,

    #[serde(default, rename = "regionalDR")]
    pub regional_dr: Vec<RegionalDr>,

    /// Per-role patches applied on top of the regional DR declaration.
    #[serde(default)]
    pub cluster_overrides: ClusterDeclarations,
}

impl ChartValues {
    /// The regional DR declaration named `name`, or the first one if no name is given.
    pub fn region(&self, name: Option<&str>) -> Option<&RegionalDr> {
        match name {
            Some(name) => self.regional_dr.iter().find(|region| region.name == name),
            None => self.regional_dr.first(),
        }
    }

    /// Replaces the overrides of every role that is declared in `overrides`.
    ///
    /// Roles `overrides` doesn't mention keep their current overrides.
    pub fn apply_overrides(&mut self, overrides: ClusterDeclarations) {
        let ClusterDeclarations { primary, secondary } = overrides;
        if primary.is_some() {
            self.cluster_overrides.primary = primary;
        }
        if secondary.is_some() {
            self.cluster_overrides.secondary = secondary;
        }
    }
}

#[derive(Clone, Debug, Default, Deserialize, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GlobalValues {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cluster_domain: Option<ClusterDomain>,
}

/// A named DR region and the declarations of its two clusters.
#[derive(Clone, Debug, Deserialize, PartialEq, Eq, Serialize)]
pub struct RegionalDr {
    pub name: String,

    #[serde(default)]
    pub clusters: ClusterDeclarations,
}

/// A [`ClusterDeclaration`] per [`ClusterRole`].
#[derive(Clone, Debug, Default, Deserialize, PartialEq, Eq, Serialize)]
pub struct ClusterDeclarations {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub primary: Option<ClusterDeclaration>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub secondary: Option<ClusterDeclaration>,
}

impl ClusterDeclarations {
    pub fn get(&self, role: ClusterRole) -> Option<&ClusterDeclaration> {
        match role {
            ClusterRole::Primary => self.primary.as_ref(),
            ClusterRole::Secondary => self.secondary.as_ref(),
        }
    }
}

/// The declaration of one cluster, either as base (in a [`RegionalDr`]) or as override.
///
/// Every field is optional. Empty strings are treated like absent values during resolution.
#[derive(Clone, Debug, Default, Deserialize, PartialEq, Eq, Serialize)]
pub struct ClusterDeclaration {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    /// The OpenShift version, e.g. `4.18.7`.
    ///
    /// Unquoted YAML numbers are accepted as well, but keep in mind that `4.10` reads as `4.1`.
    #[serde(
        default,
        deserialize_with = "deserialize_version",
        skip_serializing_if = "Option::is_none"
    )]
    pub version: Option<String>,

    #[serde(
        default,
        rename = "clusterGroup",
        skip_serializing_if = "Option::is_none"
    )]
    pub cluster_group: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub install_config: Option<InstallConfig>,
}

impl ClusterDeclaration {
    pub(crate) fn name(&self) -> Option<&str> {
        non_empty(self.name.as_deref())
    }

    pub(crate) fn version(&self) -> Option<&str> {
        non_empty(self.version.as_deref())
    }

    pub(crate) fn cluster_group(&self) -> Option<&str> {
        non_empty(self.cluster_group.as_deref())
    }
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.filter(|value| !value.trim().is_empty())
}

fn deserialize_version<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Version {
        Text(String),
        Number(serde_json::Number),
    }

    Ok(
        Option::<Version>::deserialize(deserializer)?.map(|version| match version {
            Version::Text(text) => text,
            Version::Number(number) => number.to_string(),
        }),
    )
}
