use std::time::Duration;

use crate::frame::DEFAULT_FRAME_INTERVAL;

/// Tunables for a [`Host`](crate::host::Host).
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct HostConfig {
    /// Nominal tick cadence; ticks arriving sooner are coalesced.
    pub frame_interval: Duration,
    /// Outbound backlog size at which a warning is logged.
    pub delivery_backlog_warning: usize,
    /// Moves shorter than this (in root units) report as stationary.
    pub stationary_epsilon: f32,
    pub hover_tracking: bool,
}

impl Default for HostConfig {
    fn default() -> Self {
        Self {
            frame_interval: DEFAULT_FRAME_INTERVAL,
            delivery_backlog_warning: 256,
            stationary_epsilon: 0.0,
            hover_tracking: true,
        }
    }
}

impl HostConfig {
    pub fn with_frame_interval(mut self, interval: Duration) -> Self {
        self.frame_interval = interval;
        self
    }

    pub fn with_backlog_warning(mut self, items: usize) -> Self {
        self.delivery_backlog_warning = items;
        self
    }

    pub fn with_stationary_epsilon(mut self, epsilon: f32) -> Self {
        self.stationary_epsilon = epsilon;
        self
    }

    pub fn with_hover_tracking(mut self, enabled: bool) -> Self {
        self.hover_tracking = enabled;
        self
    }
}

#[cfg(all(test, feature = "serde"))]
mod tests {
    use super::*;

    #[test]
    fn partial_json_fills_defaults() {
        let cfg: HostConfig = serde_json::from_str(r#"{ "hover_tracking": false }"#).unwrap();
        assert_eq!(cfg, HostConfig::default().with_hover_tracking(false));
    }
}
