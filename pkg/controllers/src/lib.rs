//! Reconciliation engine: keeps the mesh catalog in sync with the
//! orchestration layer's endpoints objects.

pub mod diff;
pub mod dispatcher;
pub mod endpoints;
pub mod error;

pub use dispatcher::{Dispatcher, Reconciler};
pub use endpoints::EndpointsController;
pub use error::ReconcileError;
