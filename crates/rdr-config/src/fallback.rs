//! Packaged fallback install configs.
//!
//! A fallback is a complete, already sanitized install config per role. It replaces the base
//! layer whenever the chart values only declare a minimal cluster (one without a
//! `controlPlane`), so that callers can get away with declaring little more than a name.
//!
//! The fallbacks shipped with this crate live in `fallback/<role>.json`. Deployments can ship
//! their own as `default-install-config-<role>.json` files in a directory of their choice and
//! regenerate them with `rdr-config generate-fallback` whenever the chart defaults change.
use std::{
    fs,
    io::ErrorKind,
    path::{Path, PathBuf},
};

use snafu::{ResultExt, Snafu};

use crate::{ClusterRole, document::InstallConfig};

const BUILTIN_PRIMARY: &str = include_str!("../fallback/primary.json");
const BUILTIN_SECONDARY: &str = include_str!("../fallback/secondary.json");

type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, Snafu)]
pub enum Error {
    #[snafu(display("failed to parse the builtin {role} fallback"))]
    ParseBuiltin {
        source: serde_json::Error,
        role: ClusterRole,
    },

    #[snafu(display("failed to read fallback from {path:?}"))]
    ReadFile {
        source: std::io::Error,
        path: PathBuf,
    },

    #[snafu(display("failed to parse fallback {path:?}"))]
    ParseFile {
        source: serde_json::Error,
        path: PathBuf,
    },

    #[snafu(display("failed to serialize the {role} fallback"))]
    Serialize {
        source: serde_json::Error,
        role: ClusterRole,
    },

    #[snafu(display("failed to write fallback to {path:?}"))]
    WriteFile {
        source: std::io::Error,
        path: PathBuf,
    },
}

/// The fallback install config of each role, if any.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct FallbackConfigs {
    primary: Option<InstallConfig>,
    secondary: Option<InstallConfig>,
}

impl FallbackConfigs {
    pub fn new(primary: Option<InstallConfig>, secondary: Option<InstallConfig>) -> Self {
        Self { primary, secondary }
    }

    /// The fallbacks packaged with this crate.
    pub fn builtin() -> Result<Self> {
        let parse = |role: ClusterRole, json: &str| {
            serde_json::from_str::<InstallConfig>(json).context(ParseBuiltinSnafu { role })
        };
        Ok(Self {
            primary: Some(parse(ClusterRole::Primary, BUILTIN_PRIMARY)?),
            secondary: Some(parse(ClusterRole::Secondary, BUILTIN_SECONDARY)?),
        })
    }

    /// Loads `default-install-config-<role>.json` for every role from `dir`.
    ///
    /// A missing file leaves that role without a fallback, any other I/O or parse failure is
    /// an error.
    pub fn from_dir(dir: impl AsRef<Path>) -> Result<Self> {
        let dir = dir.as_ref();
        Ok(Self {
            primary: load_optional(&dir.join(Self::file_name(ClusterRole::Primary)))?,
            secondary: load_optional(&dir.join(Self::file_name(ClusterRole::Secondary)))?,
        })
    }

    pub fn get(&self, role: ClusterRole) -> Option<&InstallConfig> {
        match role {
            ClusterRole::Primary => self.primary.as_ref(),
            ClusterRole::Secondary => self.secondary.as_ref(),
        }
    }

    /// Uses `self` where a fallback is present and `other` everywhere else.
    pub fn or(self, other: Self) -> Self {
        Self {
            primary: self.primary.or(other.primary),
            secondary: self.secondary.or(other.secondary),
        }
    }

    pub fn file_name(role: ClusterRole) -> String {
        format!("default-install-config-{role}.json")
    }

    /// Writes `config` as pretty-printed JSON to `dir` and returns the path written to.
    pub fn write(
        dir: impl AsRef<Path>,
        role: ClusterRole,
        config: &InstallConfig,
    ) -> Result<PathBuf> {
        let path = dir.as_ref().join(Self::file_name(role));
        let mut json = serde_json::to_string_pretty(config).context(SerializeSnafu { role })?;
        json.push('\n');
        fs::write(&path, json).context(WriteFileSnafu { path: &path })?;
        tracing::info!(%role, path = %path.display(), "wrote fallback install config");
        Ok(path)
    }
}

fn load_optional(path: &Path) -> Result<Option<InstallConfig>> {
    let contents = match fs::read_to_string(path) {
        Ok(contents) => contents,
        Err(err) if err.kind() == ErrorKind::NotFound => {
            tracing::debug!(path = %path.display(), "no fallback found");
            return Ok(None);
        }
        Err(err) => return Err(err).context(ReadFileSnafu { path }),
    };
    let config = serde_json::from_str(&contents).context(ParseFileSnafu { path })?;
    tracing::debug!(path = %path.display(), "loaded fallback");
    Ok(Some(config))
}
