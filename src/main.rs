use anyhow::Context;
use redis_component::config::{self, OutputFormat};
use redis_component::{component, manifest};
use tracing::info;

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::init();
    info!("Starting redis-component {}", env!("CARGO_PKG_VERSION"));

    let config = config::load_config_from_env("CONFIG_PATH")?;

    component::validate().context("Refusing to render manifests")?;
    info!(
        "Validated descriptors for components {}",
        component::descriptors()
            .iter()
            .map(|d| d.name())
            .collect::<Vec<_>>()
            .join(", ")
    );

    let containers = manifest::containers(&config)?;
    for container in &containers {
        info!(
            "Rendered container {} with image {}",
            container.name,
            container.image.as_deref().unwrap_or_default()
        );
    }
    info!("Service exposes {} ports", manifest::service_ports().len());

    let rendered = match config.output {
        OutputFormat::Yaml => serde_yaml_ng::to_string(&containers)
            .context("Failed to serialize containers to YAML")?,
        OutputFormat::Json => serde_json::to_string_pretty(&containers)
            .context("Failed to serialize containers to JSON")?,
    };
    println!("{}", rendered);

    Ok(())
}
