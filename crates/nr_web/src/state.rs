use std::sync::Arc;

use nr_core::{ContentAgent, Storage};
use nr_ingest::UrlImporter;

use crate::auth::AuthConfig;
use crate::events::EventHub;
use crate::services::{DistributionService, ProcessService};

/// Shared state handed to every handler.
#[derive(Clone)]
pub struct AppState {
    pub storage: Arc<dyn Storage>,
    pub agent: Arc<dyn ContentAgent>,
    pub events: Arc<EventHub>,
    pub auth: AuthConfig,
    pub importer: UrlImporter,
}

impl AppState {
    pub fn new(storage: Arc<dyn Storage>, agent: Arc<dyn ContentAgent>, auth: AuthConfig) -> Self {
        Self {
            storage,
            agent,
            events: Arc::new(EventHub::default()),
            auth,
            importer: UrlImporter::default(),
        }
    }

    pub fn with_importer(mut self, importer: UrlImporter) -> Self {
        self.importer = importer;
        self
    }

    pub fn process_service(&self) -> ProcessService {
        ProcessService::new(self.storage.clone(), self.agent.clone(), self.events.clone())
    }

    pub fn distribution_service(&self) -> DistributionService {
        DistributionService::new(self.storage.clone(), self.events.clone())
    }
}
