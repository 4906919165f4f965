//! Orchestration-state access: the SlateDB-backed store plus typed
//! readers for the objects the controller consumes.

pub mod client;
pub mod reader;
pub mod watch;
