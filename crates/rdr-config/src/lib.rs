//! Layered install-config resolution for regional disaster-recovery (DR) deployments.
//!
//! A regional DR deployment consists of a `primary` and a `secondary` managed cluster. Each of
//! them is described by an installer configuration ([`InstallConfig`]) that is assembled from
//! several layers, in increasing precedence:
//!
//! 1. a packaged [fallback](fallback) document, only consulted when the base is incomplete,
//! 2. the base declared in the chart values (`regionalDR[].clusters.<role>`),
//! 3. a partial per-role override (`clusterOverrides.<role>`).
//!
//! The [`Resolver`](resolver::Resolver) deep-merges these layers (see [`merge`]), restricts the
//! result to the fields the installer accepts (see [`sanitize`]), derives the `baseDomain` from
//! the cluster domain (see [`domain`]) and returns one [`ResolvedCluster`] per role.
//!
//! Resolution is pure: no I/O happens inside the resolver. Reading the layers from disk is the
//! job of [`source`] and [`fallback`], writing the result is the job of [`output`].
//!
//! ## Crate Features
//!
//! - `clap` derives `clap::ValueEnum` on [`ClusterRole`] and the output format.

pub mod document;
pub mod domain;
pub mod fallback;
pub mod merge;
pub mod output;
pub mod resolver;
pub mod role;
pub mod sanitize;
pub mod source;
pub mod validation;
pub mod values;

pub use document::{FieldPath, InstallConfig};
pub use domain::ClusterDomain;
pub use fallback::FallbackConfigs;
pub use resolver::{ResolvedCluster, ResolvedClusters, Resolver, ResolverDefaults};
pub use role::ClusterRole;
pub use values::{ChartValues, ClusterDeclaration, ClusterDeclarations, RegionalDr};
