//! Locating and loading the YAML files the layers are read from.
use std::{
    fs,
    path::{Path, PathBuf},
};

use serde::de::DeserializeOwned;
use snafu::{OptionExt, ResultExt, Snafu};

use crate::values::{ChartValues, ClusterDeclarations};

type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, Snafu)]
pub enum Error {
    #[snafu(display(
        "failed to locate a required file in any of the following locations: {search_path:?}"
    ))]
    RequiredFileMissing { search_path: Vec<PathBuf> },

    #[snafu(display("failed to read {path:?}"))]
    ReadFile {
        source: std::io::Error,
        path: PathBuf,
    },

    #[snafu(display("failed to parse {path:?} as YAML"))]
    ParseYaml {
        source: serde_yaml::Error,
        path: PathBuf,
    },
}

/// The layout of an overrides file: a values fragment carrying only `clusterOverrides`.
#[derive(Debug, Default, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
struct OverridesFile {
    #[serde(default)]
    cluster_overrides: ClusterDeclarations,
}

/// Returns the file to read: `path` if given, the first of `default_paths` that is a file
/// otherwise.
///
/// An explicit `path` is never substituted by one of the defaults.
pub fn resolve_path<'a, P: AsRef<Path>>(
    path: Option<&'a Path>,
    default_paths: &'a [P],
) -> Result<&'a Path> {
    let candidates: Vec<&Path> = match path {
        Some(path) => vec![path],
        None => default_paths.iter().map(AsRef::as_ref).collect(),
    };
    candidates
        .iter()
        .copied()
        .find(|candidate| candidate.is_file())
        .with_context(|| RequiredFileMissingSnafu {
            search_path: candidates.iter().map(PathBuf::from).collect::<Vec<_>>(),
        })
}

/// Reads and deserializes the YAML file at `path`.
pub fn load_yaml<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let contents = fs::read_to_string(path).context(ReadFileSnafu { path })?;
    let value = serde_yaml::from_str(&contents).context(ParseYamlSnafu { path })?;
    tracing::debug!(path = %path.display(), "loaded YAML file");
    Ok(value)
}

/// Loads the chart values from `path`, or the first of `default_paths` that exists.
pub fn load_values(
    path: Option<&Path>,
    default_paths: &[impl AsRef<Path>],
) -> Result<ChartValues> {
    load_yaml(resolve_path(path, default_paths)?)
}

/// Loads the `clusterOverrides` of the values fragment at `path`.
///
/// An empty file declares no overrides.
pub fn load_overrides(path: &Path) -> Result<ClusterDeclarations> {
    let contents = fs::read_to_string(path).context(ReadFileSnafu { path })?;
    if contents.trim().is_empty() {
        return Ok(ClusterDeclarations::default());
    }
    let file: OverridesFile = serde_yaml::from_str(&contents).context(ParseYamlSnafu { path })?;
    Ok(file.cluster_overrides)
}
