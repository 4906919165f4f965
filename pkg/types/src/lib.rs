//! Shared data model for meshsync.
//!
//! Orchestration-side objects (pods, endpoints), mesh-side objects
//! (service instances, owner keys) and the typed per-pod mesh
//! configuration derived from annotations.

pub mod agent;
pub mod config;
pub mod endpoint;
pub mod instance;
pub mod key;
pub mod mesh_config;
pub mod owner;
pub mod pod;
