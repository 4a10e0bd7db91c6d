use regex::Regex;
use std::fmt;
use std::sync::LazyLock;

static DIGEST_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[a-z0-9]+:[0-9a-f]{32,}$").expect("digest pattern is a valid regex")
});

// registry host with an optional port, e.g. `localhost:5000`
static HOST_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[a-zA-Z0-9](?:[a-zA-Z0-9.-]*[a-zA-Z0-9])?(?::[0-9]+)?$")
        .expect("host pattern is a valid regex")
});

// one `/`-separated segment of a repository path
static PATH_COMPONENT_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[a-z0-9]+(?:(?:[._]|__|-+)[a-z0-9]+)*$")
        .expect("path component pattern is a valid regex")
});

/// Content-addressed image digest in `algorithm:hex` form, e.g. `sha256:d153...`
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Digest(String);

impl Digest {
    pub fn parse(s: &str) -> Result<Self, ParseError> {
        if !is_valid_digest(s) {
            return Err(ParseError::InvalidDigest(s.to_string()));
        }
        Ok(Digest(s.to_string()))
    }

    pub fn algorithm(&self) -> &str {
        self.0.split_once(':').map(|(alg, _)| alg).unwrap_or_default()
    }

    pub fn hex(&self) -> &str {
        self.0.split_once(':').map(|(_, hex)| hex).unwrap_or_default()
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Digest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

pub fn is_valid_digest(s: &str) -> bool {
    DIGEST_PATTERN.is_match(s)
}

/// Image reference pinned to a digest: `registry/repository@algorithm:hex`.
///
/// `registry` is the host (with optional port) only. Any path a registry mirror
/// adds lives at the front of `repository`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageReference {
    pub registry: String,
    pub repository: String,
    pub digest: Digest,
}

#[derive(Debug, PartialEq, Eq)]
pub enum ParseError {
    MissingRegistry,
    MissingRepository,
    MissingDigest,
    InvalidRegistry(String),
    InvalidRepository(String),
    InvalidDigest(String),
    InvalidFormat(String),
    TagNotAllowed,
}

impl std::error::Error for ParseError {}
impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParseError::TagNotAllowed => {
                write!(f, "tag references are not allowed, pin the image by digest")
            }
            ParseError::MissingRegistry => write!(f, "registry is missing"),
            ParseError::MissingRepository => write!(f, "repository is missing"),
            ParseError::MissingDigest => write!(f, "digest is missing"),
            ParseError::InvalidRegistry(registry) => write!(f, "invalid registry: {:?}", registry),
            ParseError::InvalidRepository(repository) => {
                write!(f, "invalid repository: {:?}", repository)
            }
            ParseError::InvalidDigest(digest) => write!(f, "invalid digest: {}", digest),
            ParseError::InvalidFormat(image) => write!(f, "invalid image format: {}", image),
        }
    }
}

impl fmt::Display for ImageReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}@{}", self.registry, self.repository, self.digest)
    }
}

/// Splits `host[:port][/path]` into host and optional path, checking both.
fn split_registry(registry: &str) -> Result<(&str, Option<&str>), ParseError> {
    let registry = registry.trim_end_matches('/');
    let (host, path) = match registry.split_once('/') {
        Some((host, path)) => (host, Some(path)),
        None => (registry, None),
    };
    if host.is_empty() {
        return Err(ParseError::MissingRegistry);
    }
    if !HOST_PATTERN.is_match(host) {
        return Err(ParseError::InvalidRegistry(registry.to_string()));
    }
    if let Some(path) = path {
        if !is_valid_repository(path) {
            return Err(ParseError::InvalidRegistry(registry.to_string()));
        }
    }
    Ok((host, path))
}

fn is_valid_repository(repository: &str) -> bool {
    repository
        .split('/')
        .all(|segment| PATH_COMPONENT_PATTERN.is_match(segment))
}

/// Checks a registry, optionally with a path such as a mirror `host/prefix`.
pub fn validate_registry(registry: &str) -> Result<(), ParseError> {
    split_registry(registry).map(|_| ())
}

impl ImageReference {
    pub fn new(registry: &str, repository: &str, digest: &str) -> Result<Self, ParseError> {
        let (host, prefix) = split_registry(registry)?;
        if repository.is_empty() {
            return Err(ParseError::MissingRepository);
        }
        let repository = match prefix {
            Some(prefix) => format!("{}/{}", prefix, repository),
            None => repository.to_string(),
        };
        if !is_valid_repository(&repository) {
            return Err(ParseError::InvalidRepository(repository));
        }
        Ok(Self {
            registry: host.to_string(),
            repository,
            digest: Digest::parse(digest)?,
        })
    }

    pub fn parse(s: &str) -> Result<Self, ParseError> {
        let Some((name, digest)) = s.split_once('@') else {
            // any colon after the registry host is a tag
            return match s.split_once('/') {
                Some((_, repository)) if repository.contains(':') => {
                    Err(ParseError::TagNotAllowed)
                }
                _ => Err(ParseError::MissingDigest),
            };
        };
        if digest.is_empty() {
            return Err(ParseError::MissingDigest);
        }

        // Split into registry and repository by the first slash
        let Some((registry, repository)) = name.split_once('/') else {
            return Err(ParseError::InvalidFormat(s.to_string()));
        };
        if repository.contains(':') {
            return Err(ParseError::TagNotAllowed);
        }

        Self::new(registry, repository, digest)
    }
}
