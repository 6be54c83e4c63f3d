/******************************************************************************
   Author: Joaquín Béjar García
   Email: jb@taunais.com
   Date: 27/1/26
******************************************************************************/

//! Multiplexer configuration.

use std::time::Duration;

/// Terminal id (DE 41) and STAN (DE 11), the usual request identity.
pub const DEFAULT_KEY_FIELDS: [u16; 2] = [41, 11];

/// Configuration for a [`Mux`](crate::Mux).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MuxConfig {
    /// Fields whose values form the correlation key, in key order.
    pub key_fields: Vec<u16>,
    /// Timeout used by [`Mux::request_default`](crate::Mux::request_default).
    pub default_timeout: Duration,
    /// Whether inbound request-class messages bypass matching.
    pub responses_only: bool,
}

impl MuxConfig {
    /// Creates the default configuration: key on DE 41 and DE 11, 30 second
    /// timeout, every inbound message eligible for matching.
    #[must_use]
    pub fn new() -> Self {
        Self {
            key_fields: DEFAULT_KEY_FIELDS.to_vec(),
            default_timeout: Duration::from_secs(30),
            responses_only: false,
        }
    }

    /// Sets the correlation key fields.
    #[must_use]
    pub fn with_key_fields(mut self, fields: impl Into<Vec<u16>>) -> Self {
        self.key_fields = fields.into();
        self
    }

    /// Sets the default request timeout.
    #[must_use]
    pub const fn with_default_timeout(mut self, timeout: Duration) -> Self {
        self.default_timeout = timeout;
        self
    }

    /// Sets whether only response-class messages are matched.
    #[must_use]
    pub const fn with_responses_only(mut self, responses_only: bool) -> Self {
        self.responses_only = responses_only;
        self
    }
}

impl Default for MuxConfig {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_builder() {
        let config = MuxConfig::new()
            .with_key_fields([37, 11])
            .with_default_timeout(Duration::from_millis(500))
            .with_responses_only(true);
        assert_eq!(config.key_fields, vec![37, 11]);
        assert_eq!(config.default_timeout, Duration::from_millis(500));
        assert!(config.responses_only);
        assert_eq!(MuxConfig::default().key_fields, vec![41, 11]);
    }
}
