use std::{io::Write, path::PathBuf};

use rdr_config::{
    ChartValues, ClusterRole, FallbackConfigs, ResolvedClusters, Resolver, ResolverDefaults,
    domain::{self, retrieve_cluster_domain},
    fallback, output, source,
    validation::{ValidationErrors, validate},
};
use snafu::{ResultExt, Snafu, ensure};

use crate::cli::{
    DEFAULT_VALUES_SEARCH_PATHS, GenerateFallbackArguments, RenderArguments, ResolveArguments,
    ValuesOptions,
};

type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, Snafu)]
pub enum Error {
    #[snafu(display("failed to load the chart values"))]
    LoadValues { source: source::Error },

    #[snafu(display("failed to load the cluster overrides"))]
    LoadOverrides { source: source::Error },

    #[snafu(display("failed to load the fallback install configs"))]
    LoadFallbacks { source: fallback::Error },

    #[snafu(display("failed to determine the cluster domain"))]
    RetrieveClusterDomain { source: domain::Error },

    #[snafu(display("the {role} cluster is invalid: {source}"))]
    InvalidCluster {
        source: ValidationErrors,
        role: ClusterRole,
    },

    #[snafu(display("{count} of the resolved clusters are invalid"))]
    InvalidClusters { count: usize },

    #[snafu(display("failed to write the resolved clusters"))]
    WriteOutput { source: output::Error },

    #[snafu(display("failed to write the validation report"))]
    WriteReport { source: std::io::Error },

    #[snafu(display("failed to write the {role} fallback"))]
    WriteFallback {
        source: fallback::Error,
        role: ClusterRole,
    },
}

/// Resolves the clusters and writes them to `out`.
///
/// A single role is written as a resolved cluster, both roles as a mapping from role to resolved
/// cluster.
pub fn render(args: &RenderArguments, out: impl Write) -> Result<()> {
    let resolved = resolve(&args.resolve)?;
    if args.validate {
        // Only the rendered roles have to be valid
        for (role, cluster) in resolved
            .iter()
            .filter(|(role, _)| args.role.is_none_or(|rendered| rendered == **role))
        {
            validate(cluster).context(InvalidClusterSnafu { role: *role })?;
        }
    }

    let written = match args.role {
        Some(role) => match resolved.get(&role) {
            Some(cluster) => args.format.write(out, cluster),
            None => Ok(()),
        },
        None => args.format.write(out, &resolved),
    };
    written.context(WriteOutputSnafu)
}

/// Resolves both roles and writes a line per role to `out`. Fails if any role is invalid.
pub fn validate_clusters(args: &ResolveArguments, mut out: impl Write) -> Result<()> {
    let resolved = resolve(args)?;

    let mut invalid = 0usize;
    for (role, cluster) in &resolved {
        let line = match validate(cluster) {
            Ok(()) => writeln!(out, "{role} ({name}): ok", name = cluster.name()),
            Err(errors) => {
                invalid += 1;
                tracing::warn!(%role, %errors, "resolved cluster is invalid");
                writeln!(out, "{role} ({name}): {errors}", name = cluster.name())
            }
        };
        line.context(WriteReportSnafu)?;
    }

    ensure!(invalid == 0, InvalidClustersSnafu { count: invalid });
    Ok(())
}

/// Writes the sanitized base install config of each role from the chart values to
/// `args.out_dir`, ready to be used as fallbacks.
pub fn generate_fallback(args: &GenerateFallbackArguments) -> Result<Vec<PathBuf>> {
    let values = load_values(&args.source)?;
    let region = values.region(args.source.region.as_deref());
    let resolver = Resolver::default();

    [ClusterRole::Primary, ClusterRole::Secondary]
        .into_iter()
        .map(|role| {
            let fallback = resolver.fallback_document(role, region);
            if !fallback.has_control_plane() {
                tracing::warn!(%role, "the generated fallback declares no controlPlane");
            }
            FallbackConfigs::write(&args.out_dir, role, &fallback)
                .context(WriteFallbackSnafu { role })
        })
        .collect()
}

fn resolve(args: &ResolveArguments) -> Result<ResolvedClusters> {
    let mut values = load_values(&args.source)?;
    if let Some(path) = &args.overrides {
        let overrides = source::load_overrides(path).context(LoadOverridesSnafu)?;
        values.apply_overrides(overrides);
    }

    let builtin = FallbackConfigs::builtin().context(LoadFallbacksSnafu)?;
    let fallbacks = match &args.fallback_dir {
        Some(dir) => FallbackConfigs::from_dir(dir)
            .context(LoadFallbacksSnafu)?
            .or(builtin),
        None => builtin,
    };

    // Only consult the environment if neither the arguments nor the values name a domain
    let mut defaults = ResolverDefaults::default();
    if args.cluster_domain.is_none() && values.global.cluster_domain.is_none() {
        defaults.cluster_domain = retrieve_cluster_domain().context(RetrieveClusterDomainSnafu)?;
    }

    Ok(Resolver::new(defaults).resolve_values(
        &values,
        args.source.region.as_deref(),
        &fallbacks,
        args.cluster_domain.as_ref(),
    ))
}

fn load_values(options: &ValuesOptions) -> Result<ChartValues> {
    source::load_values(options.values.as_deref(), DEFAULT_VALUES_SEARCH_PATHS)
        .context(LoadValuesSnafu)
}
