//! Infrastructure providers.

pub mod docker;

pub use docker::DockerProvider;
