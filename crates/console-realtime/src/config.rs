//! Realtime client configuration.

use std::time::Duration;

/// Realtime client configuration.
#[derive(Debug, Clone)]
pub struct RealtimeConfig {
    /// Origin of the bot server (e.g., https://bot.example.com). The
    /// WebSocket endpoint is `/ws` on the same host, `wss` for `https`.
    pub server_origin: String,
    /// Reconnect attempts after an unexpected close before giving up.
    pub max_reconnect_attempts: u32,
    /// Base reconnect delay; attempt `n` waits `base * 2^n`.
    pub reconnect_base_delay: Duration,
    /// Maximum reconnect delay.
    pub reconnect_max_delay: Duration,
    /// Send `subscribe` for every registered group after each open.
    pub resubscribe_on_open: bool,
    /// Outbound frame buffer per connection.
    pub outbound_buffer: usize,
    /// Capacity of the lifecycle event broadcast channel.
    pub event_buffer: usize,
}

impl Default for RealtimeConfig {
    fn default() -> Self {
        Self {
            server_origin: "http://127.0.0.1:8080".to_string(),
            max_reconnect_attempts: 5,
            reconnect_base_delay: Duration::from_millis(1_000),
            reconnect_max_delay: Duration::from_millis(30_000),
            resubscribe_on_open: true,
            outbound_buffer: 100,
            event_buffer: 100,
        }
    }
}

impl RealtimeConfig {
    /// Delay before reconnect attempt `attempt` (1-based):
    /// `min(base * 2^attempt, max)`.
    pub fn reconnect_delay(&self, attempt: u32) -> Duration {
        let factor = 2u32.checked_pow(attempt).unwrap_or(u32::MAX);
        self.reconnect_base_delay
            .checked_mul(factor)
            .map_or(self.reconnect_max_delay, |delay| {
                delay.min(self.reconnect_max_delay)
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_realtime_config_default() {
        let config = RealtimeConfig::default();
        assert_eq!(config.max_reconnect_attempts, 5);
        assert_eq!(config.reconnect_base_delay, Duration::from_secs(1));
        assert_eq!(config.reconnect_max_delay, Duration::from_secs(30));
        assert!(config.resubscribe_on_open);
    }

    #[test]
    fn test_reconnect_delay_sequence() {
        let config = RealtimeConfig::default();
        let delays: Vec<u128> = (1..=5)
            .map(|attempt| config.reconnect_delay(attempt).as_millis())
            .collect();
        assert_eq!(delays, vec![2_000, 4_000, 8_000, 16_000, 30_000]);
    }

    #[test]
    fn test_reconnect_delay_saturates() {
        let config = RealtimeConfig::default();
        assert_eq!(config.reconnect_delay(40), Duration::from_secs(30));
        assert_eq!(config.reconnect_delay(u32::MAX), Duration::from_secs(30));
    }

    #[test]
    fn test_reconnect_delay_custom_base() {
        let config = RealtimeConfig {
            reconnect_base_delay: Duration::from_millis(250),
            reconnect_max_delay: Duration::from_secs(5),
            ..Default::default()
        };
        assert_eq!(config.reconnect_delay(1), Duration::from_millis(500));
        assert_eq!(config.reconnect_delay(4), Duration::from_millis(4_000));
        assert_eq!(config.reconnect_delay(5), Duration::from_secs(5));
    }
}
