//! Shared application state.

use std::sync::Arc;

use crate::artifacts::ArtifactStore;
use crate::config::ServerConfig;
use crate::metrics::RunMetrics;
use crate::orchestrator::Orchestrator;
use crate::registry::ModuleRegistry;

/// Shared application state.
#[derive(Debug)]
pub struct AppState {
    pub config: ServerConfig,

    /// Modules indexed by name.
    pub modules: ModuleRegistry,

    pub orchestrator: Orchestrator,

    /// Output directory access for downloads.
    pub artifacts: ArtifactStore,

    pub metrics: Arc<RunMetrics>,
}

impl AppState {
    /// Create a new AppState wrapped in Arc.
    pub fn new(config: ServerConfig, modules: ModuleRegistry) -> Arc<Self> {
        Arc::new(Self {
            orchestrator: Orchestrator::new(&config),
            artifacts: ArtifactStore::new(config.output_dir.clone()),
            metrics: Arc::new(RunMetrics::new()),
            modules,
            config,
        })
    }
}
