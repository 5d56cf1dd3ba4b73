use std::time::Duration;

use lwtp_frame::{FrameConfig, DEFAULT_TX_BUFFER_SIZE, REQUEST_OVERHEAD, RESPONSE_OVERHEAD};

use crate::error::{Result, ServerError};

/// Controls per-session buffering.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionConfig {
    /// Marker byte and receive buffer bound.
    pub frame: FrameConfig,
    /// Transmit buffer bound in bytes, including header and checksum. Default: 1 KiB.
    pub tx_buffer_size: usize,
    /// Discard a partially received frame once no bytes arrived for this long.
    /// Must be non-zero. Default: `None` (partial frames wait indefinitely).
    pub idle_timeout: Option<Duration>,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            frame: FrameConfig::default(),
            tx_buffer_size: DEFAULT_TX_BUFFER_SIZE,
            idle_timeout: None,
        }
    }
}

impl SessionConfig {
    /// Check that both buffers can hold at least an empty frame and that a
    /// configured idle timeout leaves room for a frame split across reads.
    pub fn validate(&self) -> Result<()> {
        if self.frame.rx_buffer_size < REQUEST_OVERHEAD {
            return Err(ServerError::InvalidConfig(format!(
                "rx_buffer_size {} is below the {REQUEST_OVERHEAD} byte request overhead",
                self.frame.rx_buffer_size
            )));
        }
        if self.tx_buffer_size < RESPONSE_OVERHEAD {
            return Err(ServerError::InvalidConfig(format!(
                "tx_buffer_size {} is below the {RESPONSE_OVERHEAD} byte response overhead",
                self.tx_buffer_size
            )));
        }
        if self.idle_timeout == Some(Duration::ZERO) {
            return Err(ServerError::InvalidConfig(
                "idle_timeout must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }
}

/// Controls dispatch table growth.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DispatchConfig {
    /// Maximum number of bindings accepted by `register`.
    pub max_handlers: usize,
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self { max_handlers: 256 }
    }
}
