use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use rdr_config::{ClusterDomain, ClusterRole, output::OutputFormat};

/// Where the chart values are looked up when `--values` is not given, in order.
pub const DEFAULT_VALUES_SEARCH_PATHS: &[&str] =
    &["values-hub.yaml", "charts/hub/rdr/values.yaml"];

#[derive(Debug, PartialEq, Eq, Parser)]
#[command(
    name = "rdr-config",
    author,
    version,
    about = "Resolves the install configs of regional DR clusters"
)]
pub struct Opts {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, PartialEq, Eq, Subcommand)]
pub enum Command {
    /// Resolve and print the install configs.
    Render(RenderArguments),

    /// Resolve both roles and report every problem that keeps the installer from creating them.
    Validate(ResolveArguments),

    /// Write the fallback install configs derived from the current chart values.
    GenerateFallback(GenerateFallbackArguments),
}

/// Selects the chart values and the regional DR declaration within them.
#[derive(Debug, PartialEq, Eq, Args)]
pub struct ValuesOptions {
    /// Path to the chart values. Defaults to the first existing of `values-hub.yaml` and
    /// `charts/hub/rdr/values.yaml`.
    #[arg(long, short = 'f', value_name = "FILE", env = "RDR_CONFIG_VALUES")]
    pub values: Option<PathBuf>,

    /// Name of the regional DR declaration to resolve. Defaults to the first one.
    #[arg(long, env = "RDR_CONFIG_REGION")]
    pub region: Option<String>,
}

#[derive(Debug, PartialEq, Eq, Args)]
pub struct ResolveArguments {
    /// Path to a values fragment with `clusterOverrides`, replacing those of the chart values.
    #[arg(long, value_name = "FILE", env = "RDR_CONFIG_OVERRIDES")]
    pub overrides: Option<PathBuf>,

    /// Directory containing `default-install-config-<role>.json` fallbacks. Roles without a file
    /// there use the builtin fallback.
    #[arg(long, value_name = "DIR", env = "RDR_CONFIG_FALLBACK_DIR")]
    pub fallback_dir: Option<PathBuf>,

    /// The cluster domain the `baseDomain` is derived from.
    ///
    /// Takes precedence over `global.clusterDomain` of the chart values, which in turn takes
    /// precedence over the `RDR_CLUSTER_DOMAIN` environment variable.
    #[arg(long, value_name = "DOMAIN")]
    pub cluster_domain: Option<ClusterDomain>,

    // IMPORTANT: All (flattened) sub structs should be placed at the end to ensure the help
    // headings are correct.
    #[command(flatten)]
    pub source: ValuesOptions,
}

#[derive(Debug, PartialEq, Eq, Args)]
pub struct RenderArguments {
    /// Only render this role.
    #[arg(long, value_enum)]
    pub role: Option<ClusterRole>,

    #[arg(long, value_enum, default_value_t)]
    pub format: OutputFormat,

    /// Fail instead of rendering if a resolved cluster is incomplete.
    #[arg(long)]
    pub validate: bool,

    /// Write to this file instead of stdout.
    #[arg(long, short = 'o', value_name = "FILE")]
    pub output: Option<PathBuf>,

    #[command(flatten)]
    pub resolve: ResolveArguments,
}

#[derive(Debug, PartialEq, Eq, Args)]
pub struct GenerateFallbackArguments {
    /// Directory the fallbacks are written to.
    #[arg(long, value_name = "DIR")]
    pub out_dir: PathBuf,

    #[command(flatten)]
    pub source: ValuesOptions,
}

#[cfg(test)]
mod tests {
    use clap::CommandFactory;
    use rstest::rstest;

    use super::*;

    #[test]
    fn verify_cli() {
        Opts::command().debug_assert();
    }

    #[test]
    fn parse_render() {
        let opts = Opts::try_parse_from([
            "rdr-config",
            "render",
            "--role",
            "secondary",
            "--format",
            "json",
            "--cluster-domain",
            "rdr.example.com",
            "-f",
            "values.yaml",
        ])
        .expect("arguments are valid");

        assert_eq!(
            opts,
            Opts {
                command: Command::Render(RenderArguments {
                    role: Some(ClusterRole::Secondary),
                    format: OutputFormat::Json,
                    validate: false,
                    output: None,
                    resolve: ResolveArguments {
                        overrides: None,
                        fallback_dir: None,
                        cluster_domain: Some(
                            "rdr.example.com".parse().expect("domain is valid")
                        ),
                        source: ValuesOptions {
                            values: Some(PathBuf::from("values.yaml")),
                            region: None,
                        },
                    },
                }),
            }
        );
    }

    #[test]
    fn render_defaults_to_yaml() {
        let opts = Opts::try_parse_from(["rdr-config", "render"]).expect("arguments are valid");
        assert!(matches!(
            opts.command,
            Command::Render(RenderArguments {
                role: None,
                format: OutputFormat::Yaml,
                ..
            })
        ));
    }

    #[rstest]
    #[case::unknown_role(&["rdr-config", "render", "--role", "tertiary"])]
    #[case::invalid_domain(&["rdr-config", "validate", "--cluster-domain", "not a domain"])]
    #[case::missing_out_dir(&["rdr-config", "generate-fallback"])]
    fn reject_invalid_arguments(#[case] args: &[&str]) {
        assert!(Opts::try_parse_from(args).is_err());
    }
}
