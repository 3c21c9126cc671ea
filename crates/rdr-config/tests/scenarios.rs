use std::thread;

use indoc::indoc;
use rdr_config::{
    ChartValues, ClusterDomain, ClusterRole, FallbackConfigs, Resolver, source::load_values,
    validation::validate,
};
use serde_json::{Value, json};
use tempfile::tempdir;

const CHART_DEFAULTS: &str = indoc! {"
    global:
      clusterDomain: rdr.apps.example.com
    regionalDR:
      - name: resilient
        clusters:
          primary:
            name: ocp-primary
            version: 4.18.7
            install_config:
              apiVersion: v1
              metadata:
                name: ocp-primary
              controlPlane:
                name: master
                replicas: 3
                platform:
                  aws:
                    type: m5.4xlarge
              compute:
                - name: worker
                  replicas: 3
                  platform:
                    aws:
                      type: m5.4xlarge
              networking:
                networkType: OVNKubernetes
                clusterNetwork:
                  - cidr: 10.128.0.0/14
                    hostPrefix: 23
              platform:
                aws:
                  region: us-east-1
                  vpc:
                    id: vpc-123
              publish: External
              additionalTrustBundle: ignored
          secondary:
            name: ocp-secondary
            version: 4.18.7
            install_config:
              apiVersion: v1
              metadata:
                name: ocp-secondary
              controlPlane:
                replicas: 3
              compute:
                - name: worker
                  replicas: 3
              networking:
                networkType: OVNKubernetes
              platform:
                aws:
                  region: us-west-2
"};

fn chart_defaults() -> ChartValues {
    serde_yaml::from_str(CHART_DEFAULTS).expect("chart defaults are valid YAML")
}

#[test]
fn baseline_without_overrides() {
    let values = chart_defaults();
    let resolved =
        Resolver::default().resolve_values(&values, None, &FallbackConfigs::default(), None);

    let primary = &resolved[&ClusterRole::Primary];
    let config = primary.install_config();
    assert!(
        config
            .get("compute")
            .and_then(Value::as_array)
            .is_some_and(|compute| !compute.is_empty())
    );
    assert!(
        config
            .get("networking")
            .is_some_and(|networking| !networking.is_null())
    );
    assert!(config.has_control_plane());
    assert_eq!(config.get_str("metadata.name"), Some("ocp-primary"));
    assert_eq!(config.get_str("baseDomain"), Some("apps.example.com"));
    assert_eq!(config.get_path("platform.aws.vpc"), None);
    assert_eq!(config.get("additionalTrustBundle"), None);
    assert_eq!(primary.cluster_group(), Some("resilient"));

    for cluster in resolved.values() {
        assert_eq!(validate(cluster), Ok(()));
    }
}

#[test]
fn minimal_base_with_overrides() {
    let values: ChartValues = serde_yaml::from_str(indoc! {"
        regionalDR:
          - name: resilient
            clusters:
              primary:
                name: ocp-primary
                clusterGroup: resilient
        clusterOverrides:
          primary:
            install_config:
              metadata:
                name: ocp-p
              platform:
                aws:
                  region: eu-west-1
    "})
    .expect("test YAML is valid");
    let fallbacks = FallbackConfigs::builtin().expect("builtin fallbacks parse");
    let builtin_primary = fallbacks
        .get(ClusterRole::Primary)
        .expect("builtin primary fallback exists")
        .clone();

    let resolved = Resolver::default().resolve_values(&values, None, &fallbacks, None);
    let primary = &resolved[&ClusterRole::Primary];
    let config = primary.install_config();

    assert_eq!(config.get("controlPlane"), builtin_primary.get("controlPlane"));
    assert_eq!(config.get("compute"), builtin_primary.get("compute"));
    assert_eq!(config.get_str("metadata.name"), Some("ocp-p"));
    assert_eq!(config.get_str("platform.aws.region"), Some("eu-west-1"));
    assert_eq!(config.get_str("baseDomain"), Some("example.com"));
    assert_eq!(primary.name(), "ocp-primary");
    assert_eq!(validate(primary), Ok(()));

    // Nothing declared for the secondary, it resolves purely from the fallback
    let secondary = &resolved[&ClusterRole::Secondary];
    assert_eq!(secondary.name(), "ocp-secondary");
    assert_eq!(
        secondary.install_config().get_str("platform.aws.region"),
        Some("us-west-2")
    );
}

#[test]
fn fallback_substitution() {
    let values: ChartValues = serde_yaml::from_str(indoc! {"
        regionalDR:
          - name: resilient
            clusters:
              primary:
                name: ocp-primary
                clusterGroup: resilient
    "})
    .expect("test YAML is valid");
    let fallbacks = FallbackConfigs::new(
        Some(
            serde_json::from_value(json!({
                "controlPlane": {"replicas": 3},
                "compute": [{"platform": {"aws": {"type": "m5.4xlarge"}}}],
            }))
            .expect("test JSON is valid"),
        ),
        None,
    );

    let resolved = Resolver::default().resolve_values(&values, None, &fallbacks, None);
    let config = resolved[&ClusterRole::Primary].install_config();
    assert_eq!(config.get_path("controlPlane.replicas"), Some(&json!(3)));
    assert_eq!(
        config.get_str("compute.0.platform.aws.type"),
        Some("m5.4xlarge")
    );
}

#[test]
fn cluster_domain_argument_wins_over_values() {
    let values = chart_defaults();
    let cluster_domain: ClusterDomain = "dr.corp.example.net".parse().expect("domain is valid");

    let resolved = Resolver::default().resolve_values(
        &values,
        Some("resilient"),
        &FallbackConfigs::default(),
        Some(&cluster_domain),
    );
    for cluster in resolved.values() {
        assert_eq!(
            cluster.install_config().get_str("baseDomain"),
            Some("corp.example.net")
        );
    }
}

#[test]
fn unknown_region_resolves_from_fallbacks() {
    let values = chart_defaults();
    let fallbacks = FallbackConfigs::builtin().expect("builtin fallbacks parse");

    let resolved =
        Resolver::default().resolve_values(&values, Some("elsewhere"), &fallbacks, None);
    let primary = &resolved[&ClusterRole::Primary];
    assert_eq!(primary.name(), "ocp-primary");
    assert_eq!(primary.version(), None);
    assert_eq!(primary.cluster_group(), None);
    assert_eq!(
        primary.install_config().get_str("platform.aws.region"),
        Some("us-east-1")
    );
}

#[test]
fn roles_resolve_concurrently() {
    let values = chart_defaults();
    let resolver = Resolver::default();
    let fallbacks = FallbackConfigs::builtin().expect("builtin fallbacks parse");
    let region = values.region(None);

    let sequential = resolver.resolve_values(&values, None, &fallbacks, None);
    let concurrent = thread::scope(|scope| {
        let handles = [ClusterRole::Primary, ClusterRole::Secondary].map(|role| {
            let resolver = &resolver;
            let fallbacks = &fallbacks;
            let values = &values;
            scope.spawn(move || {
                let resolved = resolver.resolve(
                    role,
                    region,
                    fallbacks.get(role),
                    values.cluster_overrides.get(role),
                    values.global.cluster_domain.as_ref(),
                );
                (role, resolved)
            })
        });
        handles
            .into_iter()
            .map(|handle| handle.join().expect("resolution does not panic"))
            .collect::<rdr_config::ResolvedClusters>()
    });

    assert_eq!(sequential, concurrent);
}

#[test]
fn values_from_disk() {
    let dir = tempdir().expect("create temporary directory");
    let path = dir.path().join("values-hub.yaml");
    std::fs::write(&path, CHART_DEFAULTS).expect("write values file");

    let values = load_values(Some(&path), &[] as &[&str]).expect("values load");
    assert_eq!(values, chart_defaults());
}
