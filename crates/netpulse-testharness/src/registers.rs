//! ---
//! np_section: "11-simulation"
//! np_subsection: "module"
//! np_type: "source"
//! np_scope: "code"
//! np_description: "Scripted register source."
//! np_version: "v0.1.0"
//! np_owner: "tbd"
//! ---
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use netpulse_net::{DeviceError, RegisterSource};

/// One canned answer to a register read.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScriptedRead {
    Values(Vec<u16>),
    Timeout,
    Exception(u8),
    Disconnected,
}

impl ScriptedRead {
    fn into_result(self) -> Result<Vec<u16>, DeviceError> {
        match self {
            ScriptedRead::Values(values) => Ok(values),
            ScriptedRead::Timeout => Err(DeviceError::Timeout(Duration::from_secs(3))),
            ScriptedRead::Exception(code) => Err(DeviceError::Exception {
                function: 0x03,
                code,
            }),
            ScriptedRead::Disconnected => Err(DeviceError::Io(std::io::Error::new(
                std::io::ErrorKind::ConnectionReset,
                "scripted disconnect",
            ))),
        }
    }
}

/// Register source replaying a script; once exhausted it repeats `fallback`.
#[derive(Debug)]
pub struct ScriptedRegisterSource {
    script: VecDeque<ScriptedRead>,
    fallback: ScriptedRead,
    refuse_connect: bool,
    reads: Arc<AtomicUsize>,
}

impl ScriptedRegisterSource {
    pub fn new(script: impl IntoIterator<Item = ScriptedRead>) -> Self {
        Self {
            script: script.into_iter().collect(),
            fallback: ScriptedRead::Timeout,
            refuse_connect: false,
            reads: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Always answer with `values`.
    pub fn steady(values: &[u16]) -> Self {
        Self::new(std::iter::empty()).with_fallback(ScriptedRead::Values(values.to_vec()))
    }

    /// Source whose `connect` always fails.
    pub fn unreachable() -> Self {
        Self {
            refuse_connect: true,
            ..Self::new(std::iter::empty())
        }
    }

    pub fn with_fallback(mut self, fallback: ScriptedRead) -> Self {
        self.fallback = fallback;
        self
    }

    /// Shared counter of read calls, usable after the source is moved.
    pub fn read_counter(&self) -> Arc<AtomicUsize> {
        self.reads.clone()
    }
}

#[async_trait]
impl RegisterSource for ScriptedRegisterSource {
    async fn connect(&mut self) -> Result<(), DeviceError> {
        if self.refuse_connect {
            return Err(DeviceError::Connect {
                endpoint: self.endpoint(),
                reason: "scripted refusal".to_owned(),
            });
        }
        Ok(())
    }

    async fn read_holding_registers(
        &mut self,
        _start: u16,
        _count: u16,
    ) -> Result<Vec<u16>, DeviceError> {
        self.reads.fetch_add(1, Ordering::SeqCst);
        let next = self
            .script
            .pop_front()
            .unwrap_or_else(|| self.fallback.clone());
        next.into_result()
    }

    fn endpoint(&self) -> String {
        "scripted://sensor".to_owned()
    }
}
