#![allow(clippy::too_many_arguments)]
pub mod endpoints;
pub mod imdb;
pub mod omdb;
pub mod provider;
pub mod record;
pub mod tmdb;
pub mod transport;
pub mod tvdb;

use thiserror::Error;

pub use provider::{
    MetadataStream, Provider, ProviderOptions, SearchQuery, YearWindow, create_provider,
};
pub use record::{Metadata, MetadataMovie, MetadataTelevision};

#[derive(Error, Debug)]
pub enum MetadataError {
    /// A required credential is missing or the provider name is unknown.
    #[error("configuration error: {0}")]
    Configuration(String),
    /// The caller's criteria are malformed.
    #[error("invalid request: {0}")]
    Validation(String),
    #[error("unauthorized: {0}")]
    Unauthorized(String),
    /// The backend has no matching record. An expected outcome, not a fault.
    #[error("not found")]
    NotFound,
    #[error("network error: {0}")]
    Network(String),
}

impl MetadataError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound)
    }
}
