//! Admission decisions and counter state management.

mod controller;
mod counter;
mod policy;
mod store;
mod sweeper;

pub use controller::AdmissionController;
pub use counter::WindowCounter;
pub use policy::{Policy, PolicyCatalog, RouteClass};
pub use store::{Admission, CounterId, CounterStore, MemoryCounterStore};
pub use sweeper::Sweeper;
