//! Centralized constants for the meshsync project.
//!
//! All project-wide constant values live here.
//! Change a value in one place and it applies everywhere.

pub mod annotations;
pub mod mesh;
pub mod paths;
pub mod state;
