//! Deployment descriptors for the Redis component and its metrics exporter sidecar.
//!
//! Descriptors are `'static` data validated once per process with
//! [`component::validate`]. [`manifest`] turns them into Kubernetes container specs
//! with digest-pinned images.

pub mod component;
pub mod config;
pub mod image_reference;
pub mod manifest;
