use std::sync::Arc;

use crate::ml::ModelArtifacts;

/// Shared router state. Artifacts are never mutated after startup.
#[derive(Clone)]
pub struct AppState {
    pub artifacts: Arc<ModelArtifacts>,
}

impl AppState {
    pub fn new(artifacts: ModelArtifacts) -> Self {
        Self {
            artifacts: Arc::new(artifacts),
        }
    }
}
