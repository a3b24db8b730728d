//! The example plugin's operations.
//!
//! `Execute` echoes its payload. Replace it with real business logic.

use plugin_core::{
    BuildInfo, ExecuteCommand, ExecuteOutcome, MetadataInfo, MetadataQuery, PluginService,
};
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

pub const PLUGIN_NAME: &str = "example-plugin";

/// Build constants baked in at compile time.
///
/// Set `EXAMPLE_PLUGIN_COMMIT` and `EXAMPLE_PLUGIN_BUILD_DATE` when building
/// to stamp a release.
pub fn build_info() -> BuildInfo {
    BuildInfo::new(PLUGIN_NAME, env!("CARGO_PKG_VERSION"))
        .with_commit(option_env!("EXAMPLE_PLUGIN_COMMIT").unwrap_or("none"))
        .with_date(option_env!("EXAMPLE_PLUGIN_BUILD_DATE").unwrap_or("unknown"))
}

pub struct ExamplePlugin {
    build: Arc<BuildInfo>,
    execute_delay: Duration,
}

impl ExamplePlugin {
    pub fn new(build: Arc<BuildInfo>) -> Self {
        Self {
            build,
            execute_delay: Duration::ZERO,
        }
    }

    /// Latency added to every `Execute` call before it answers.
    pub fn with_execute_delay(mut self, delay: Duration) -> Self {
        self.execute_delay = delay;
        self
    }
}

#[async_trait::async_trait]
impl PluginService for ExamplePlugin {
    async fn get_metadata(&self, _query: MetadataQuery) -> plugin_core::Result<MetadataInfo> {
        Ok(MetadataInfo {
            name: self.build.name.clone(),
            version: self.build.version.clone(),
            description: format!(
                "Example plugin (built from {} on {})",
                self.build.short_commit(),
                self.build.date
            ),
        })
    }

    async fn execute(&self, command: ExecuteCommand) -> plugin_core::Result<ExecuteOutcome> {
        info!(
            "Executing action: {} with data: {}",
            command.action,
            String::from_utf8_lossy(&command.data)
        );
        if !self.execute_delay.is_zero() {
            tokio::time::sleep(self.execute_delay).await;
        }
        Ok(ExecuteOutcome {
            success: true,
            result: command.data,
        })
    }
}
