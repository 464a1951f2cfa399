//! ---
//! np_section: "05-networking-external-interfaces"
//! np_subsection: "module"
//! np_type: "source"
//! np_scope: "code"
//! np_description: "In-memory holding register bank."
//! np_version: "v0.1.0"
//! np_owner: "tbd"
//! ---
use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::Mutex;

use super::{DeviceError, RegisterSource};

/// Shared in-memory holding registers. Unset addresses read as zero.
///
/// Clones share the same bank, so a test can keep one handle to change
/// values while another is owned by the poller.
#[derive(Debug, Clone)]
pub struct InMemoryRegisters {
    device_id: String,
    registers: Arc<Mutex<HashMap<u16, u16>>>,
}

impl InMemoryRegisters {
    /// Create an empty bank identified by `device_id` in logs.
    pub fn new(device_id: impl Into<String>) -> Self {
        Self {
            device_id: device_id.into(),
            registers: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Bank pre-loaded with consecutive values from address `start`.
    pub fn with_values(device_id: impl Into<String>, start: u16, values: &[u16]) -> Self {
        let bank = Self::new(device_id);
        let mut map = HashMap::with_capacity(values.len());
        for (offset, value) in values.iter().enumerate() {
            map.insert(start.wrapping_add(offset as u16), *value);
        }
        Self {
            registers: Arc::new(Mutex::new(map)),
            ..bank
        }
    }

    /// Read a range of holding registers.
    pub async fn read(&self, start: u16, count: u16) -> Result<Vec<u16>, DeviceError> {
        let end = u32::from(start) + u32::from(count);
        if end > u32::from(u16::MAX) + 1 {
            return Err(DeviceError::Exception {
                function: 0x03,
                code: 0x02,
            });
        }
        let registers = self.registers.lock().await;
        Ok((0..count)
            .map(|offset| *registers.get(&(start + offset)).unwrap_or(&0))
            .collect())
    }

    /// Write a single holding register.
    pub async fn write(&self, address: u16, value: u16) {
        self.registers.lock().await.insert(address, value);
    }
}

#[async_trait]
impl RegisterSource for InMemoryRegisters {
    async fn connect(&mut self) -> Result<(), DeviceError> {
        Ok(())
    }

    async fn read_holding_registers(
        &mut self,
        start: u16,
        count: u16,
    ) -> Result<Vec<u16>, DeviceError> {
        self.read(start, count).await
    }

    fn endpoint(&self) -> String {
        format!("memory://{}", self.device_id)
    }
}
