//! News grouping pipeline: registry, orchestrator, and caller-facing service.

mod grouper;
pub mod registry;
mod service;
pub mod types;

pub use grouper::NewsGrouper;
pub use registry::{
    AGGLOMERATIVE_GROUPER, DBSCAN_GROUPER, Grouper, GrouperDescriptor, GrouperRegistry,
    RegistryError,
};
pub use service::{GroupingApi, GroupingService};
pub use types::{GroupingError, InitError};
