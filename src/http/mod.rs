//! HTTP adapter: the pre-handler admission filter for the request router.

mod middleware;

pub use middleware::{enforce, AdmissionGate};
