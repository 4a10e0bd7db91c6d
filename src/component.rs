use crate::image_reference::{ImageReference, ParseError, is_valid_digest};
use std::fmt;
use std::sync::LazyLock;
use tracing::debug;

pub const COMPONENT: &str = "redis";

pub const PORT_NAME: &str = "api";
pub const PORT: u16 = 6379;

pub const REGISTRY_REPO: &str = "cgr.dev";
pub const REGISTRY_IMAGE: &str = "chainguard/redis";

pub const CONTAINER_NAME: &str = "redis";
pub const IMAGE_DIGEST: &str =
    "sha256:d1531c3b943009488678e47d5bc7fe0fcdde25b1c935efd53581263367c44575";

pub const EXPORTER_REGISTRY_REPO: &str = "quay.io";
pub const EXPORTER_REGISTRY_IMAGE: &str = "oliver006/redis_exporter";
pub const EXPORTER_IMAGE_DIGEST: &str =
    "sha256:a7d498a48444c1b25d44d12387aa0223020d20cb106939cb7ddd6fee5de661ea";

pub const EXPORTER_CONTAINER_NAME: &str = "exporter";
pub const EXPORTER_PORT_NAME: &str = "exporter";
pub const EXPORTER_PORT: u16 = 9500;

/// Identifying and addressing information for one container of the workload.
///
/// Values are `'static` and never change after definition. Use [`validate`] once at
/// startup before handing descriptors to anything that renders manifests.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ComponentDescriptor {
    name: &'static str,
    container_name: &'static str,
    port_name: &'static str,
    port: u16,
    registry_host: &'static str,
    repository: &'static str,
    image_digest: &'static str,
}

/// The metrics sidecar has the same shape as the main container.
pub type ExporterDescriptor = ComponentDescriptor;

pub static REDIS: ComponentDescriptor = ComponentDescriptor::new(
    COMPONENT,
    CONTAINER_NAME,
    PORT_NAME,
    PORT,
    REGISTRY_REPO,
    REGISTRY_IMAGE,
    IMAGE_DIGEST,
);

pub static EXPORTER: ExporterDescriptor = ComponentDescriptor::new(
    EXPORTER_CONTAINER_NAME,
    EXPORTER_CONTAINER_NAME,
    EXPORTER_PORT_NAME,
    EXPORTER_PORT,
    EXPORTER_REGISTRY_REPO,
    EXPORTER_REGISTRY_IMAGE,
    EXPORTER_IMAGE_DIGEST,
);

static VALIDATION: LazyLock<Result<(), ConfigurationInvalid>> =
    LazyLock::new(|| validate_descriptors(&[REDIS, EXPORTER]));

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Field {
    Name,
    ContainerName,
    PortName,
    Port,
    RegistryHost,
    Repository,
    ImageDigest,
}

impl Field {
    pub const IDENTIFIERS: [Field; 5] = [
        Field::Name,
        Field::ContainerName,
        Field::PortName,
        Field::RegistryHost,
        Field::Repository,
    ];
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Field::Name => "name",
            Field::ContainerName => "container name",
            Field::PortName => "port name",
            Field::Port => "port",
            Field::RegistryHost => "registry host",
            Field::Repository => "repository",
            Field::ImageDigest => "image digest",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldValue {
    Text(&'static str),
    Port(u16),
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldValue::Text(text) => f.write_str(text),
            FieldValue::Port(port) => write!(f, "{}", port),
        }
    }
}

impl ComponentDescriptor {
    /// Unchecked; call [`ComponentDescriptor::validate`] before rendering from it.
    pub const fn new(
        name: &'static str,
        container_name: &'static str,
        port_name: &'static str,
        port: u16,
        registry_host: &'static str,
        repository: &'static str,
        image_digest: &'static str,
    ) -> Self {
        Self {
            name,
            container_name,
            port_name,
            port,
            registry_host,
            repository,
            image_digest,
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn container_name(&self) -> &'static str {
        self.container_name
    }

    pub fn port_name(&self) -> &'static str {
        self.port_name
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    pub fn registry_host(&self) -> &'static str {
        self.registry_host
    }

    pub fn repository(&self) -> &'static str {
        self.repository
    }

    pub fn image_digest(&self) -> &'static str {
        self.image_digest
    }

    /// (host, repository) pair the image is pulled from
    pub fn registry(&self) -> (&'static str, &'static str) {
        (self.registry_host, self.repository)
    }

    pub fn get(&self, field: Field) -> FieldValue {
        match field {
            Field::Name => FieldValue::Text(self.name),
            Field::ContainerName => FieldValue::Text(self.container_name),
            Field::PortName => FieldValue::Text(self.port_name),
            Field::Port => FieldValue::Port(self.port),
            Field::RegistryHost => FieldValue::Text(self.registry_host),
            Field::Repository => FieldValue::Text(self.repository),
            Field::ImageDigest => FieldValue::Text(self.image_digest),
        }
    }

    /// Digest-pinned reference against the descriptor's own registry
    pub fn image_reference(&self) -> Result<ImageReference, ParseError> {
        self.image_reference_from(self.registry_host)
    }

    /// Digest-pinned reference with the registry host replaced, e.g. by a mirror
    pub fn image_reference_from(&self, registry: &str) -> Result<ImageReference, ParseError> {
        ImageReference::new(registry, self.repository, self.image_digest)
    }

    pub fn validate(&self) -> Result<(), ConfigurationInvalid> {
        for field in Field::IDENTIFIERS {
            let FieldValue::Text(value) = self.get(field) else {
                continue;
            };
            if value.is_empty() {
                return Err(ConfigurationInvalid::EmptyIdentifier {
                    component: self.name,
                    field,
                });
            }
            if value.chars().any(char::is_whitespace) {
                return Err(ConfigurationInvalid::WhitespaceInIdentifier {
                    component: self.name,
                    field,
                    value,
                });
            }
        }

        if self.port == 0 {
            return Err(ConfigurationInvalid::PortOutOfRange {
                component: self.name,
                port: self.port,
            });
        }

        if !is_valid_digest(self.image_digest) {
            return Err(ConfigurationInvalid::MalformedDigest {
                component: self.name,
                digest: self.image_digest,
            });
        }

        Ok(())
    }
}

/// Fails with the first violated constraint of the built-in descriptors.
/// The check runs once per process, later calls return the cached outcome.
pub fn validate() -> Result<(), ConfigurationInvalid> {
    VALIDATION.clone()
}

/// Built-in descriptors, in rendering order: main container first, then the sidecar.
pub fn descriptors() -> [&'static ComponentDescriptor; 2] {
    [&REDIS, &EXPORTER]
}

/// Checks each descriptor on its own, then the constraints between containers of one workload.
pub fn validate_descriptors(
    descriptors: &[ComponentDescriptor],
) -> Result<(), ConfigurationInvalid> {
    for descriptor in descriptors {
        descriptor.validate()?;
    }

    for (i, first) in descriptors.iter().enumerate() {
        for second in &descriptors[i + 1..] {
            if first.port == second.port {
                return Err(ConfigurationInvalid::PortCollision {
                    first: first.name,
                    second: second.name,
                    port: first.port,
                });
            }
            if first.registry() == second.registry() && first.image_digest != second.image_digest
            {
                return Err(ConfigurationInvalid::ConflictingDigest {
                    registry: first.registry_host,
                    repository: first.repository,
                });
            }
        }
    }

    debug!("Validated {} component descriptors", descriptors.len());
    Ok(())
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigurationInvalid {
    EmptyIdentifier {
        component: &'static str,
        field: Field,
    },
    WhitespaceInIdentifier {
        component: &'static str,
        field: Field,
        value: &'static str,
    },
    PortOutOfRange {
        component: &'static str,
        port: u16,
    },
    MalformedDigest {
        component: &'static str,
        digest: &'static str,
    },
    PortCollision {
        first: &'static str,
        second: &'static str,
        port: u16,
    },
    ConflictingDigest {
        registry: &'static str,
        repository: &'static str,
    },
}

impl std::error::Error for ConfigurationInvalid {}
impl fmt::Display for ConfigurationInvalid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigurationInvalid::EmptyIdentifier { component, field } => {
                write!(f, "component {:?}: {} is empty", component, field)
            }
            ConfigurationInvalid::WhitespaceInIdentifier {
                component,
                field,
                value,
            } => write!(
                f,
                "component {:?}: {} {:?} contains whitespace",
                component, field, value
            ),
            ConfigurationInvalid::PortOutOfRange { component, port } => write!(
                f,
                "component {:?}: port {} is outside 1-65535",
                component, port
            ),
            ConfigurationInvalid::MalformedDigest { component, digest } => write!(
                f,
                "component {:?}: image digest {:?} is not of the form algorithm:hex",
                component, digest
            ),
            ConfigurationInvalid::PortCollision {
                first,
                second,
                port,
            } => write!(
                f,
                "components {:?} and {:?} both use port {}",
                first, second, port
            ),
            ConfigurationInvalid::ConflictingDigest {
                registry,
                repository,
            } => write!(
                f,
                "image {}/{} is pinned to different digests",
                registry, repository
            ),
        }
    }
}
