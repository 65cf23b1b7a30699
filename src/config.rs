//! Selector configuration

use std::time::Duration;

use serde::Deserialize;

use crate::discovery::{DEFAULT_EXCLUDE_PATTERN, STALE_AFTER};
use crate::relay::VISCA_PORT;

/// Default number of camera slots
pub const DEFAULT_CAMERA_COUNT: usize = 7;

/// Default first relay receive port (slot 0)
pub const DEFAULT_RELAY_BASE_PORT: u16 = 10001;

/// Default show-control UDP port
pub const DEFAULT_TRIGGER_PORT: u16 = 16759;

/// Show-control trigger settings
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct TriggerConfig {
    /// Host the trigger datagrams are sent to
    pub host: String,

    /// UDP port on that host
    pub port: u16,

    /// Button page
    pub page: String,

    /// Button row
    pub row: u32,
}

impl Default for TriggerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".into(),
            port: DEFAULT_TRIGGER_PORT,
            page: "0".into(),
            row: 0,
        }
    }
}

/// Selector configuration options
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SelectorConfig {
    /// Number of camera slots
    pub camera_count: usize,

    /// Receive port of the relay for slot 0; slot `i` uses `base + i`
    pub relay_base_port: u16,

    /// PTZ control port on the cameras
    pub camera_port: u16,

    /// Advertised sources whose name contains this are never cached
    pub exclude_pattern: String,

    /// A dynamic source not seen for longer than this is stale
    #[serde(skip)]
    pub stale_after: Duration,

    /// Delay between discovery polls
    #[serde(skip)]
    pub poll_interval: Duration,

    /// Delay before the first discovery poll
    #[serde(skip)]
    pub poll_startup_delay: Duration,

    /// How long discovery gets to repopulate before saved bindings are restored
    #[serde(skip)]
    pub restore_delay: Duration,

    /// Rewrite inquiries that controllers wrap in command frames
    pub fix_inquiry: bool,

    /// Show-control trigger (disabled when `None`)
    pub trigger: Option<TriggerConfig>,
}

impl Default for SelectorConfig {
    fn default() -> Self {
        Self {
            camera_count: DEFAULT_CAMERA_COUNT,
            relay_base_port: DEFAULT_RELAY_BASE_PORT,
            camera_port: VISCA_PORT,
            exclude_pattern: DEFAULT_EXCLUDE_PATTERN.into(),
            stale_after: STALE_AFTER,
            poll_interval: Duration::from_secs(2),
            poll_startup_delay: Duration::from_secs(1),
            restore_delay: Duration::from_millis(2500),
            fix_inquiry: true,
            trigger: None,
        }
    }
}

impl SelectorConfig {
    /// Load a config from JSON; missing fields take their defaults
    pub fn from_json(json: &str) -> crate::error::Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Set the number of camera slots
    pub fn camera_count(mut self, count: usize) -> Self {
        self.camera_count = count;
        self
    }

    /// Set the relay base port
    pub fn relay_base_port(mut self, port: u16) -> Self {
        self.relay_base_port = port;
        self
    }

    /// Set the camera-side PTZ port
    pub fn camera_port(mut self, port: u16) -> Self {
        self.camera_port = port;
        self
    }

    /// Set the discovery poll interval
    pub fn poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    /// Set the delay before the first discovery poll
    pub fn poll_startup_delay(mut self, delay: Duration) -> Self {
        self.poll_startup_delay = delay;
        self
    }

    /// Set the deferred-restore delay
    pub fn restore_delay(mut self, delay: Duration) -> Self {
        self.restore_delay = delay;
        self
    }

    /// Disable the INQUIRY rewrite
    pub fn disable_inquiry_fix(mut self) -> Self {
        self.fix_inquiry = false;
        self
    }

    /// Enable the show-control trigger
    pub fn trigger(mut self, trigger: TriggerConfig) -> Self {
        self.trigger = Some(trigger);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = SelectorConfig::default();

        assert_eq!(config.camera_count, 7);
        assert_eq!(config.relay_base_port, 10001);
        assert_eq!(config.camera_port, 52381);
        assert_eq!(config.exclude_pattern, "Remote Connection");
        assert_eq!(config.stale_after, Duration::from_secs(60));
        assert!(config.fix_inquiry);
        assert!(config.trigger.is_none());
    }

    #[test]
    fn test_builder_chaining() {
        let config = SelectorConfig::default()
            .camera_count(4)
            .relay_base_port(20000)
            .camera_port(1259)
            .poll_interval(Duration::from_millis(100))
            .disable_inquiry_fix()
            .trigger(TriggerConfig::default());

        assert_eq!(config.camera_count, 4);
        assert_eq!(config.relay_base_port, 20000);
        assert_eq!(config.camera_port, 1259);
        assert_eq!(config.poll_interval, Duration::from_millis(100));
        assert!(!config.fix_inquiry);
        assert_eq!(config.trigger.unwrap().port, 16759);
    }

    #[test]
    fn test_from_json_partial() {
        let config = SelectorConfig::from_json(
            r#"{ "camera_count": 3, "trigger": { "host": "10.0.0.5", "page": "2" } }"#,
        )
        .unwrap();

        assert_eq!(config.camera_count, 3);
        assert_eq!(config.relay_base_port, 10001);
        assert_eq!(config.poll_interval, Duration::from_secs(2));

        let trigger = config.trigger.unwrap();
        assert_eq!(trigger.host, "10.0.0.5");
        assert_eq!(trigger.port, 16759);
        assert_eq!(trigger.page, "2");
        assert_eq!(trigger.row, 0);
    }

    #[test]
    fn test_from_json_invalid() {
        assert!(SelectorConfig::from_json("{ not json").is_err());
    }
}
