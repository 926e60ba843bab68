//! Name-keyed catalog of grouping strategies.

use crate::clustering::{
    AgglomerativeClustering, ClusteringSettings, ClusteringStrategy, DbscanClustering,
};
use serde::Serialize;
use std::sync::Arc;
use thiserror::Error;

/// Name of the complete-linkage grouper.
pub const AGGLOMERATIVE_GROUPER: &str = "Embeddings Agglomerative";
/// Name of the density-based grouper.
pub const DBSCAN_GROUPER: &str = "Embeddings DBSCAN";

/// Errors raised while registering or resolving groupers.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum RegistryError {
    /// A grouper was registered without a name.
    #[error("Grouper name must not be empty")]
    MissingName,
    /// A grouper was registered without a description.
    #[error("Grouper '{0}' must define a description")]
    MissingDescription(String),
    /// Another grouper already uses this name.
    #[error("Grouper name '{0}' is not unique")]
    DuplicateName(String),
    /// No grouper matches the requested name.
    #[error("Grouper with name '{0}' not found")]
    NotFound(String),
}

/// Public metadata identifying a registered grouper.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GrouperDescriptor {
    /// Unique name callers use to select the grouper.
    pub name: String,
    /// Human-readable description of how it groups posts.
    pub description: String,
}

/// A registered grouper: descriptor plus the clustering step it plugs into the pipeline.
#[derive(Clone)]
pub struct Grouper {
    descriptor: GrouperDescriptor,
    strategy: Arc<dyn ClusteringStrategy>,
}

impl Grouper {
    /// Unique grouper name.
    pub fn name(&self) -> &str {
        &self.descriptor.name
    }

    /// Grouper metadata.
    pub fn descriptor(&self) -> &GrouperDescriptor {
        &self.descriptor
    }

    /// Clustering step used by this grouper.
    pub fn strategy(&self) -> Arc<dyn ClusteringStrategy> {
        Arc::clone(&self.strategy)
    }
}

/// Registry populated once at process start and read-only afterwards.
#[derive(Clone, Default)]
pub struct GrouperRegistry {
    groupers: Vec<Grouper>,
}

impl GrouperRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry holding the agglomerative and DBSCAN groupers.
    pub fn with_defaults(settings: &ClusteringSettings) -> Result<Self, RegistryError> {
        let mut registry = Self::new();
        registry.register(
            AGGLOMERATIVE_GROUPER,
            "Better for grouping same news. Converts posts into embeddings using Gemini API, \
             groups them using agglomerative clustering and writes summaries using Gemini API.",
            Arc::new(AgglomerativeClustering::new(
                settings.agglomerative_distance_threshold,
            )),
        )?;
        registry.register(
            DBSCAN_GROUPER,
            "Better for grouping related news. Converts posts into embeddings using Gemini API, \
             groups them using DBSCAN and writes summaries using Gemini API.",
            Arc::new(DbscanClustering::new(
                settings.dbscan_eps,
                settings.dbscan_min_samples,
            )),
        )?;
        Ok(registry)
    }

    /// Add a grouper, rejecting blank metadata and names already in use.
    pub fn register(
        &mut self,
        name: impl Into<String>,
        description: impl Into<String>,
        strategy: Arc<dyn ClusteringStrategy>,
    ) -> Result<(), RegistryError> {
        let name = name.into();
        let description = description.into();
        if name.trim().is_empty() {
            return Err(RegistryError::MissingName);
        }
        if description.trim().is_empty() {
            return Err(RegistryError::MissingDescription(name));
        }
        if self.groupers.iter().any(|grouper| grouper.name() == name) {
            return Err(RegistryError::DuplicateName(name));
        }
        tracing::debug!(grouper = %name, "Registered grouper");
        self.groupers.push(Grouper {
            descriptor: GrouperDescriptor { name, description },
            strategy,
        });
        Ok(())
    }

    /// Descriptors of every registered grouper, in registration order.
    pub fn list(&self) -> Vec<GrouperDescriptor> {
        self.groupers
            .iter()
            .map(|grouper| grouper.descriptor.clone())
            .collect()
    }

    /// Find a grouper by exact, case-sensitive name.
    pub fn resolve(&self, name: &str) -> Result<&Grouper, RegistryError> {
        self.groupers
            .iter()
            .find(|grouper| grouper.name() == name)
            .ok_or_else(|| RegistryError::NotFound(name.to_string()))
    }
}
