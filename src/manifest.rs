use crate::component::{self, ComponentDescriptor, EXPORTER, REDIS};
use crate::config::Config;
use anyhow::{Context, Result};
use k8s_openapi::api::core::v1::{Container, ContainerPort, EnvVar, ServicePort};
use k8s_openapi::apimachinery::pkg::util::intstr::IntOrString;
use tracing::debug;

static IMAGE_PULL_POLICY: &str = "IfNotPresent";
static PROTOCOL_TCP: &str = "TCP";

/// Main Redis container with its image pinned by digest.
pub fn redis_container(config: &Config) -> Result<Container> {
    container(&REDIS, config)
}

/// Metrics exporter sidecar, scraping Redis over the pod's loopback interface.
pub fn exporter_container(config: &Config) -> Result<Container> {
    let mut container = container(&EXPORTER, config)?;
    container.env = Some(vec![EnvVar {
        name: "REDIS_ADDR".to_string(),
        value: Some(format!("redis://localhost:{}", REDIS.port())),
        ..Default::default()
    }]);
    Ok(container)
}

pub fn containers(config: &Config) -> Result<Vec<Container>> {
    Ok(vec![redis_container(config)?, exporter_container(config)?])
}

/// Service ports for both containers, targeting the container ports by name.
pub fn service_ports() -> Vec<ServicePort> {
    component::descriptors()
        .into_iter()
        .map(|descriptor| ServicePort {
            name: Some(descriptor.port_name().to_string()),
            port: i32::from(descriptor.port()),
            target_port: Some(IntOrString::String(descriptor.port_name().to_string())),
            protocol: Some(PROTOCOL_TCP.to_string()),
            ..Default::default()
        })
        .collect()
}

fn container(descriptor: &ComponentDescriptor, config: &Config) -> Result<Container> {
    component::validate().context("Refusing to assemble containers from invalid descriptors")?;
    descriptor
        .validate()
        .context("Refusing to assemble container from invalid descriptor")?;

    let registry = config.third_party_registry(descriptor.registry_host());
    let image = descriptor
        .image_reference_from(registry)
        .with_context(|| format!("Failed to build image reference for {}", descriptor.name()))?;

    debug!(
        "Assembling container {} with image {}",
        descriptor.container_name(),
        image
    );

    Ok(Container {
        name: descriptor.container_name().to_string(),
        image: Some(image.to_string()),
        image_pull_policy: Some(IMAGE_PULL_POLICY.to_string()),
        ports: Some(vec![ContainerPort {
            name: Some(descriptor.port_name().to_string()),
            container_port: i32::from(descriptor.port()),
            protocol: Some(PROTOCOL_TCP.to_string()),
            ..Default::default()
        }]),
        ..Default::default()
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_redis_container() {
        let container = redis_container(&Config::default()).expect("container should build");
        assert_eq!(container.name, "redis");
        assert_eq!(
            container.image.as_deref(),
            Some(
                "cgr.dev/chainguard/redis@sha256:d1531c3b943009488678e47d5bc7fe0fcdde25b1c935efd53581263367c44575"
            )
        );
        let ports = container.ports.expect("container should declare ports");
        assert_eq!(ports.len(), 1);
        assert_eq!(ports[0].name.as_deref(), Some("api"));
        assert_eq!(ports[0].container_port, 6379);
        assert_eq!(container.env, None);
    }

    #[test]
    fn test_exporter_container() {
        let container = exporter_container(&Config::default()).expect("container should build");
        assert_eq!(container.name, "exporter");
        assert_eq!(
            container.image.as_deref(),
            Some(
                "quay.io/oliver006/redis_exporter@sha256:a7d498a48444c1b25d44d12387aa0223020d20cb106939cb7ddd6fee5de661ea"
            )
        );
        let ports = container.ports.expect("container should declare ports");
        assert_eq!(ports[0].name.as_deref(), Some("exporter"));
        assert_eq!(ports[0].container_port, 9500);

        let env = container.env.expect("exporter should have env");
        assert_eq!(env[0].name, "REDIS_ADDR");
        assert_eq!(env[0].value.as_deref(), Some("redis://localhost:6379"));
    }

    #[test]
    fn test_mirror_keeps_repository_and_digest() {
        let config = Config {
            repository: Some("registry.example.com/mirror".to_string()),
            ..Default::default()
        };
        let images: Vec<String> = containers(&config)
            .expect("containers should build")
            .into_iter()
            .filter_map(|c| c.image)
            .collect();
        assert_eq!(
            images,
            vec![
                "registry.example.com/mirror/chainguard/redis@sha256:d1531c3b943009488678e47d5bc7fe0fcdde25b1c935efd53581263367c44575",
                "registry.example.com/mirror/oliver006/redis_exporter@sha256:a7d498a48444c1b25d44d12387aa0223020d20cb106939cb7ddd6fee5de661ea",
            ]
        );
    }

    #[test]
    fn test_malformed_mirror_fails_to_render() {
        let config = Config {
            repository: Some("bad host with spaces@x:y".to_string()),
            ..Default::default()
        };
        let err = redis_container(&config).unwrap_err();
        assert!(
            format!("{:#}", err).contains("invalid registry"),
            "{:#}",
            err
        );
        assert!(containers(&config).is_err());
    }

    #[test]
    fn test_invalid_descriptor_fails_to_render() {
        let unpinned = ComponentDescriptor::new(
            "redis",
            "redis",
            "api",
            6379,
            "cgr.dev",
            "chainguard/redis",
            "latest",
        );
        let err = container(&unpinned, &Config::default()).unwrap_err();
        assert!(
            format!("{:#}", err).contains("is not of the form algorithm:hex"),
            "{:#}",
            err
        );
    }

    #[test]
    fn test_service_ports() {
        let ports = service_ports();
        let summary: Vec<(Option<&str>, i32)> = ports
            .iter()
            .map(|p| (p.name.as_deref(), p.port))
            .collect();
        assert_eq!(summary, vec![(Some("api"), 6379), (Some("exporter"), 9500)]);
        assert_eq!(
            ports[0].target_port,
            Some(IntOrString::String("api".to_string()))
        );
    }

    #[test]
    fn test_container_serializes_to_camel_case() {
        let container = redis_container(&Config::default()).expect("container should build");
        let value = serde_json::to_value(&container).expect("container should serialize");
        assert_eq!(value["ports"][0]["containerPort"], 6379);
        assert_eq!(value["imagePullPolicy"], "IfNotPresent");
    }
}
