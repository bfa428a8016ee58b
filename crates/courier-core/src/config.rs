//! Engine configuration.

use std::time::Duration;

use derive_builder::Builder;
use serde::{Deserialize, Serialize};

/// Tunables shared by the watchdog, the drivers and the local primitives.
#[derive(Debug, Clone, Builder, Serialize, Deserialize)]
#[builder(setter(into), build_fn(validate = "Self::validate"))]
pub struct EngineConfig {
    /// Sleep between two watchdog samples.
    #[builder(default = "Duration::from_millis(100)")]
    #[serde(default = "default_poll_interval")]
    pub poll_interval: Duration,

    /// Length of the window throughput is averaged over.
    #[builder(default = "Duration::from_secs(2)")]
    #[serde(default = "default_throughput_window")]
    pub throughput_window: Duration,

    /// Bytes read or written per primitive step. Also bounds cancellation
    /// latency and is the unit of hash progress.
    #[builder(default = "128 * 1024")]
    #[serde(default = "default_transfer_chunk_size")]
    pub transfer_chunk_size: usize,

    /// Work units charged per directory in copy estimates.
    #[builder(default = "4096")]
    #[serde(default = "default_directory_overhead")]
    pub directory_overhead: u64,

    /// Destination prefix that skips the capacity check.
    #[builder(default = "Some(\"host0:\".to_string())")]
    #[serde(default = "default_always_available_volume")]
    pub always_available_volume: Option<String>,

    /// Root of the media library exports are copied into.
    #[builder(default = "\"ux0:\".to_string()")]
    #[serde(default = "default_media_library")]
    pub media_library: String,

    /// Name given to the watchdog thread.
    #[builder(default = "\"courier-watchdog\".to_string()")]
    #[serde(default = "default_watchdog_thread_name")]
    pub watchdog_thread_name: String,

    /// Stack size of the watchdog thread.
    #[builder(default = "256 * 1024")]
    #[serde(default = "default_watchdog_stack_size")]
    pub watchdog_stack_size: usize,

    /// User agent sent by the HTTP transport.
    #[builder(default = "default_user_agent()")]
    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    /// Connect timeout of the HTTP transport.
    #[builder(default = "Duration::from_secs(30)")]
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout: Duration,
}

fn default_poll_interval() -> Duration {
    Duration::from_millis(100)
}

fn default_throughput_window() -> Duration {
    Duration::from_secs(2)
}

fn default_transfer_chunk_size() -> usize {
    128 * 1024
}

fn default_directory_overhead() -> u64 {
    4096
}

fn default_always_available_volume() -> Option<String> {
    Some("host0:".to_string())
}

fn default_media_library() -> String {
    "ux0:".to_string()
}

fn default_watchdog_thread_name() -> String {
    "courier-watchdog".to_string()
}

fn default_watchdog_stack_size() -> usize {
    256 * 1024
}

fn default_user_agent() -> String {
    format!("courier/{}", env!("CARGO_PKG_VERSION"))
}

fn default_connect_timeout() -> Duration {
    Duration::from_secs(30)
}

impl EngineConfigBuilder {
    fn validate(&self) -> Result<(), String> {
        if self.transfer_chunk_size == Some(0) {
            return Err("Transfer chunk size must be greater than zero".to_string());
        }
        if self.poll_interval.is_some_and(|d| d.is_zero()) {
            return Err("Poll interval must be greater than zero".to_string());
        }
        if self.throughput_window.is_some_and(|d| d.is_zero()) {
            return Err("Throughput window must be greater than zero".to_string());
        }
        Ok(())
    }
}

impl EngineConfig {
    /// Create a new config builder.
    pub fn builder() -> EngineConfigBuilder {
        EngineConfigBuilder::default()
    }

    /// Check whether `destination` is on the volume that needs no capacity check.
    pub fn skips_capacity_check(&self, destination: &str) -> bool {
        self.always_available_volume
            .as_deref()
            .is_some_and(|volume| destination.starts_with(volume))
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            poll_interval: default_poll_interval(),
            throughput_window: default_throughput_window(),
            transfer_chunk_size: default_transfer_chunk_size(),
            directory_overhead: default_directory_overhead(),
            always_available_volume: default_always_available_volume(),
            media_library: default_media_library(),
            watchdog_thread_name: default_watchdog_thread_name(),
            watchdog_stack_size: default_watchdog_stack_size(),
            user_agent: default_user_agent(),
            connect_timeout: default_connect_timeout(),
        }
    }
}
