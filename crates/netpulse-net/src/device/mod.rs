//! ---
//! np_section: "05-networking-external-interfaces"
//! np_subsection: "module"
//! np_type: "source"
//! np_scope: "code"
//! np_description: "Field-device register access."
//! np_version: "v0.1.0"
//! np_owner: "tbd"
//! ---
use std::time::Duration;

use async_trait::async_trait;

pub mod memory;
pub mod modbus_tcp;

/// Failure talking to a field device.
#[derive(Debug, thiserror::Error)]
pub enum DeviceError {
    /// The connection could not be established.
    #[error("unable to connect to {endpoint}: {reason}")]
    Connect {
        /// Device address.
        endpoint: String,
        /// Underlying cause.
        reason: String,
    },
    /// The device did not answer within the I/O timeout.
    #[error("device did not respond within {0:?}")]
    Timeout(Duration),
    /// Socket-level failure on an established connection.
    #[error("device i/o failed: {0}")]
    Io(#[from] std::io::Error),
    /// The device answered with a protocol exception.
    #[error("device returned exception code {code:#04x} for function {function:#04x}")]
    Exception {
        /// Function code of the request.
        function: u8,
        /// Exception code reported by the device.
        code: u8,
    },
    /// The response was malformed or did not match the request.
    #[error("protocol violation: {0}")]
    Protocol(String),
}

impl DeviceError {
    /// Whether the connection should be dropped and re-established.
    pub fn breaks_connection(&self) -> bool {
        matches!(
            self,
            DeviceError::Io(_) | DeviceError::Timeout(_) | DeviceError::Protocol(_)
        )
    }
}

/// Stateful register reader owned by a single polling task.
#[async_trait]
pub trait RegisterSource: Send {
    /// Establish the session. Failure here at startup is fatal to the caller.
    async fn connect(&mut self) -> Result<(), DeviceError>;

    /// Read `count` holding registers starting at `start`.
    async fn read_holding_registers(
        &mut self,
        start: u16,
        count: u16,
    ) -> Result<Vec<u16>, DeviceError>;

    /// Address used in logs.
    fn endpoint(&self) -> String;
}
