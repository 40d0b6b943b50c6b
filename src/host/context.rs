use std::sync::Arc;

use crate::host::config::HostConfig;
use crate::host::progress::{LogProgress, ProgressSink};

/// Host services available to a node during one invocation.
#[derive(Clone)]
pub struct HostContext {
    config: HostConfig,
    progress: Arc<dyn ProgressSink>,
}

impl HostContext {
    pub fn new(config: HostConfig) -> Self {
        Self {
            config,
            progress: Arc::new(LogProgress),
        }
    }

    pub fn with_progress(mut self, progress: Arc<dyn ProgressSink>) -> Self {
        self.progress = progress;
        self
    }

    pub fn config(&self) -> &HostConfig {
        &self.config
    }

    pub fn progress(&self) -> &dyn ProgressSink {
        self.progress.as_ref()
    }
}

impl Default for HostContext {
    fn default() -> Self {
        Self::new(HostConfig::default())
    }
}

impl std::fmt::Debug for HostContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HostContext")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}
