//! Cluster domains and the `baseDomain` derived from them.
use std::{env, fmt::Display, ops::Deref, str::FromStr, sync::LazyLock};

use const_format::concatcp;
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use snafu::{ResultExt, Snafu, ensure};
use tracing::instrument;

const CLUSTER_DOMAIN_ENV: &str = "RDR_CLUSTER_DOMAIN";

/// The cluster domain used when neither the caller nor the environment provide one.
pub const DEFAULT_CLUSTER_DOMAIN: &str = "cluster.example.com";

/// `baseDomain` values that are known to be stand-ins rather than real domains.
pub const BASE_DOMAIN_PLACEHOLDERS: &[&str] =
    &["PLACEHOLDER", "BASE_DOMAIN", "<base-domain>", "example.invalid"];

// See RFC 1123. Same format the Kubernetes apimachinery validation uses for subdomains, but
// allowing a trailing dot.
const DOMAIN_MAX_LENGTH: usize = 253;
const LABEL_FMT: &str = "[a-zA-Z0-9]([-a-zA-Z0-9]*[a-zA-Z0-9])?";
const DOMAIN_FMT: &str = concatcp!(LABEL_FMT, "(\\.", LABEL_FMT, ")*", "\\.?");

static DOMAIN_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!("^{DOMAIN_FMT}$")).expect("failed to compile domain regex")
});

type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, PartialEq, Eq, Snafu)]
pub enum Error {
    #[snafu(display(
        "{domain:?} is not a valid domain: a domain must consist of alphanumeric characters, '-' or '.', and must start and end with an alphanumeric character"
    ))]
    InvalidDomain { domain: String },

    #[snafu(display("domain {domain:?} is {length} bytes long but must be no more than {DOMAIN_MAX_LENGTH}"))]
    DomainTooLong { domain: String, length: usize },

    #[snafu(display("failed to parse {cluster_domain:?} from {CLUSTER_DOMAIN_ENV:?} as domain name"))]
    ParseEnvironment {
        source: Box<Error>,
        cluster_domain: String,
    },
}

/// A validated DNS domain (RFC 1123) a regional DR cluster lives in, e.g. `rdr.example.com`.
///
/// A trailing dot is accepted and stripped.
#[derive(Clone, Debug, Deserialize, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize)]
#[serde(try_from = "String", into = "String")]
pub struct ClusterDomain(String);

impl ClusterDomain {
    /// The domain installer clusters are created in: `self` without its leftmost label.
    ///
    /// ```
    /// use rdr_config::ClusterDomain;
    ///
    /// let domain: ClusterDomain = "rdr.apps.example.com".parse().unwrap();
    /// assert_eq!(domain.base_domain(), "apps.example.com");
    /// ```
    pub fn base_domain(&self) -> &str {
        derive_base_domain(&self.0)
    }
}

impl Default for ClusterDomain {
    fn default() -> Self {
        Self(DEFAULT_CLUSTER_DOMAIN.to_owned())
    }
}

impl FromStr for ClusterDomain {
    type Err = Error;

    fn from_str(value: &str) -> Result<Self> {
        ensure!(
            value.len() <= DOMAIN_MAX_LENGTH,
            DomainTooLongSnafu {
                domain: value,
                length: value.len(),
            }
        );
        ensure!(DOMAIN_REGEX.is_match(value), InvalidDomainSnafu { domain: value });
        Ok(Self(value.trim_end_matches('.').to_owned()))
    }
}

impl TryFrom<String> for ClusterDomain {
    type Error = Error;

    fn try_from(value: String) -> Result<Self> {
        value.parse()
    }
}

impl From<ClusterDomain> for String {
    fn from(value: ClusterDomain) -> Self {
        value.0
    }
}

impl Display for ClusterDomain {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl Deref for ClusterDomain {
    type Target = str;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

/// Drops the leftmost label of `cluster_domain`: `rdr.example.com` becomes `example.com`.
///
/// A domain consisting of a single label is returned unchanged.
pub fn derive_base_domain(cluster_domain: &str) -> &str {
    match cluster_domain.split_once('.') {
        Some((_, rest)) if !rest.is_empty() => rest,
        _ => cluster_domain,
    }
}

/// Whether a `baseDomain` value needs to be replaced by the derived base domain.
///
/// This is the case if it is absent, `null`, blank, or one of the [`BASE_DOMAIN_PLACEHOLDERS`]
/// (compared case-insensitively).
pub fn is_placeholder_base_domain(value: Option<&Value>) -> bool {
    match value {
        None | Some(Value::Null) => true,
        Some(Value::String(domain)) => {
            let domain = domain.trim();
            domain.is_empty()
                || BASE_DOMAIN_PLACEHOLDERS
                    .iter()
                    .any(|placeholder| placeholder.eq_ignore_ascii_case(domain))
        }
        Some(_) => false,
    }
}

/// Tries to retrieve the cluster domain.
///
/// Return `RDR_CLUSTER_DOMAIN` if set, otherwise default to [`DEFAULT_CLUSTER_DOMAIN`].
#[instrument]
pub fn retrieve_cluster_domain() -> Result<ClusterDomain> {
    tracing::debug!("Trying to determine the cluster domain...");
    cluster_domain_from(env::var(CLUSTER_DOMAIN_ENV).ok())
}

fn cluster_domain_from(value: Option<String>) -> Result<ClusterDomain> {
    Ok(match value {
        Some(cluster_domain) if !cluster_domain.is_empty() => {
            let domain = cluster_domain
                .parse::<ClusterDomain>()
                .map_err(Box::new)
                .context(ParseEnvironmentSnafu {
                    cluster_domain: cluster_domain.as_str(),
                })?;
            tracing::info!(
                cluster_domain = %domain,
                "Using cluster domain from {CLUSTER_DOMAIN_ENV:?} environment variable"
            );
            domain
        }
        _ => {
            let domain = ClusterDomain::default();
            tracing::info!(
                cluster_domain = %domain,
                "Using default cluster domain as {CLUSTER_DOMAIN_ENV:?} environment variable is not set"
            );
            domain
        }
    })
}
