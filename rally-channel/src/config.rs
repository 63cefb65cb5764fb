//! Channel configuration.

use std::time::Duration;

/// Which delivered events reach registered listeners.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FanOutPolicy {
    /// Only `roomUpdate` reaches listeners. Lifecycle and error events are
    /// logged and nothing else.
    #[default]
    RoomUpdateOnly,
    /// Every event name is delivered to listeners registered under it,
    /// including the synthesized `connect`, `disconnect` and `error`.
    Uniform,
}

/// What `emit` does while a connection exists but its link is down.
///
/// With no connection at all, `emit` always drops.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EmitPolicy {
    #[default]
    Drop,
    /// Buffer up to `capacity` frames and flush them on the next link.
    Queue { capacity: usize },
}

/// Exponential backoff with jitter and a retry ceiling.
#[derive(Debug, Clone, PartialEq)]
pub struct ReconnectPolicy {
    /// Consecutive failed attempts allowed before giving up. 0 = never retry.
    pub max_retries: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
    /// Extra random delay, as a fraction of the computed delay
    pub jitter_ratio: f64,
}

impl Default for ReconnectPolicy {
    fn default() -> Self {
        Self {
            max_retries: 5,
            base_delay: Duration::from_millis(500),
            max_delay: Duration::from_secs(30),
            jitter_ratio: 0.2,
        }
    }
}

impl ReconnectPolicy {
    /// Fail on the first lost or refused connection.
    pub fn disabled() -> Self {
        Self {
            max_retries: 0,
            ..Self::default()
        }
    }

    /// Whether another attempt is allowed after `attempt` consecutive failures.
    pub fn allows(&self, attempt: u32) -> bool {
        attempt < self.max_retries
    }

    /// Delay before retry number `attempt` (0-based).
    pub fn delay(&self, attempt: u32) -> Duration {
        self.delay_with(attempt, rand::random::<f64>())
    }

    /// Same as [`delay`](Self::delay) with the random draw supplied, `unit` ∈ [0, 1).
    pub fn delay_with(&self, attempt: u32, unit: f64) -> Duration {
        let exp = 2u32.saturating_pow(attempt.min(16));
        let delay = self.base_delay.saturating_mul(exp).min(self.max_delay);
        let jitter = delay.mul_f64((self.jitter_ratio * unit.clamp(0.0, 1.0)).max(0.0));
        delay + jitter
    }
}

/// Channel configuration.
#[derive(Debug, Clone)]
pub struct ChannelConfig {
    /// Realtime endpoint; `http(s)` is rewritten to `ws(s)`
    pub websocket_url: String,
    pub fan_out: FanOutPolicy,
    pub emit_policy: EmitPolicy,
    pub reconnect: ReconnectPolicy,
    /// Bound on commands waiting for the session task
    pub outgoing_capacity: usize,
}

impl Default for ChannelConfig {
    fn default() -> Self {
        Self {
            websocket_url: "ws://localhost:8080/ws".to_string(),
            fan_out: FanOutPolicy::default(),
            emit_policy: EmitPolicy::default(),
            reconnect: ReconnectPolicy::default(),
            outgoing_capacity: 256,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backoff_doubles_until_ceiling() {
        let policy = ReconnectPolicy {
            max_retries: 10,
            base_delay: Duration::from_millis(100),
            max_delay: Duration::from_secs(1),
            jitter_ratio: 0.0,
        };
        assert_eq!(policy.delay(0), Duration::from_millis(100));
        assert_eq!(policy.delay(1), Duration::from_millis(200));
        assert_eq!(policy.delay(3), Duration::from_millis(800));
        assert_eq!(policy.delay(4), Duration::from_secs(1));
        assert_eq!(policy.delay(100), Duration::from_secs(1));
    }

    #[test]
    fn test_jitter_bounds() {
        let policy = ReconnectPolicy {
            base_delay: Duration::from_millis(100),
            jitter_ratio: 0.5,
            ..ReconnectPolicy::default()
        };
        assert_eq!(policy.delay_with(0, 0.0), Duration::from_millis(100));
        assert_eq!(policy.delay_with(0, 1.0), Duration::from_millis(150));
        for _ in 0..100 {
            let d = policy.delay(0);
            assert!(d >= Duration::from_millis(100) && d <= Duration::from_millis(150));
        }
    }

    #[test]
    fn test_retry_ceiling() {
        let policy = ReconnectPolicy::default();
        assert!(policy.allows(0));
        assert!(policy.allows(4));
        assert!(!policy.allows(5));
        assert!(!ReconnectPolicy::disabled().allows(0));
    }

    #[test]
    fn test_defaults() {
        let config = ChannelConfig::default();
        assert_eq!(config.fan_out, FanOutPolicy::RoomUpdateOnly);
        assert_eq!(config.emit_policy, EmitPolicy::Drop);
        assert_eq!(config.outgoing_capacity, 256);
    }
}
