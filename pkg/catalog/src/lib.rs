//! Mesh catalog access: the wire model of the agent HTTP API, the
//! `CatalogClient` capability trait and its reqwest implementation.

pub mod client;
pub mod error;
pub mod http;
pub mod model;

pub use client::CatalogClient;
pub use error::CatalogError;
pub use http::HttpCatalogClient;
