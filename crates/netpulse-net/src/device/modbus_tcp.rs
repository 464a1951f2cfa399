//! ---
//! np_section: "05-networking-external-interfaces"
//! np_subsection: "module"
//! np_type: "source"
//! np_scope: "code"
//! np_description: "Modbus/TCP holding register client."
//! np_version: "v0.1.0"
//! np_owner: "tbd"
//! ---
use std::time::Duration;

use async_trait::async_trait;
use bytes::{Buf, BufMut, BytesMut};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::time::timeout;
use tracing::{debug, warn};

use super::{DeviceError, RegisterSource};

/// Read Holding Registers.
pub const FN_READ_HOLDING_REGISTERS: u8 = 0x03;
/// Set on the function code of an exception response.
const EXCEPTION_FLAG: u8 = 0x80;
/// Protocol limit for one read.
pub const MAX_READ_REGISTERS: u16 = 125;
const MBAP_HEADER_LEN: usize = 7;

/// Connection settings for [`ModbusTcpClient`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModbusTcpConfig {
    /// `host:port` of the device.
    pub endpoint: String,
    /// Unit identifier carried in every request.
    pub unit_id: u8,
    /// Bound on establishing the TCP connection.
    pub connect_timeout: Duration,
    /// Bound on one request/response exchange.
    pub io_timeout: Duration,
}

impl ModbusTcpConfig {
    /// Settings with the usual defaults: unit 1, 5 s connect, 3 s I/O.
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            unit_id: 1,
            connect_timeout: Duration::from_secs(5),
            io_timeout: Duration::from_secs(3),
        }
    }
}

/// Modbus/TCP client that reconnects lazily after a broken exchange.
#[derive(Debug)]
pub struct ModbusTcpClient {
    config: ModbusTcpConfig,
    stream: Option<TcpStream>,
    transaction_id: u16,
}

impl ModbusTcpClient {
    /// Create a disconnected client.
    pub fn new(config: ModbusTcpConfig) -> Self {
        Self {
            config,
            stream: None,
            transaction_id: 0,
        }
    }

    /// Whether a session is currently open.
    pub fn is_connected(&self) -> bool {
        self.stream.is_some()
    }

    async fn open(&self) -> Result<TcpStream, DeviceError> {
        let endpoint = &self.config.endpoint;
        let connect = TcpStream::connect(endpoint.as_str());
        let stream = match timeout(self.config.connect_timeout, connect).await {
            Ok(Ok(stream)) => stream,
            Ok(Err(err)) => {
                return Err(DeviceError::Connect {
                    endpoint: endpoint.clone(),
                    reason: err.to_string(),
                })
            }
            Err(_) => {
                return Err(DeviceError::Connect {
                    endpoint: endpoint.clone(),
                    reason: format!("timed out after {:?}", self.config.connect_timeout),
                })
            }
        };
        stream.set_nodelay(true)?;
        Ok(stream)
    }

    fn next_transaction_id(&mut self) -> u16 {
        self.transaction_id = self.transaction_id.wrapping_add(1);
        self.transaction_id
    }
}

/// Encode an MBAP-framed Read Holding Registers request.
pub fn encode_read_request(transaction_id: u16, unit_id: u8, start: u16, count: u16) -> BytesMut {
    let mut frame = BytesMut::with_capacity(MBAP_HEADER_LEN + 5);
    frame.put_u16(transaction_id);
    frame.put_u16(0);
    // Length counts the unit id plus the 5-byte PDU.
    frame.put_u16(6);
    frame.put_u8(unit_id);
    frame.put_u8(FN_READ_HOLDING_REGISTERS);
    frame.put_u16(start);
    frame.put_u16(count);
    frame
}

/// Parsed MBAP header fields needed to validate a response.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MbapHeader {
    /// Echoed transaction id.
    pub transaction_id: u16,
    /// Always zero for Modbus.
    pub protocol_id: u16,
    /// Bytes following the length field (unit id + PDU).
    pub length: u16,
    /// Echoed unit id.
    pub unit_id: u8,
}

impl MbapHeader {
    /// Parse the fixed 7-byte header.
    pub fn parse(mut raw: &[u8]) -> Result<Self, DeviceError> {
        if raw.len() < MBAP_HEADER_LEN {
            return Err(DeviceError::Protocol(format!(
                "short MBAP header: {} bytes",
                raw.len()
            )));
        }
        Ok(Self {
            transaction_id: raw.get_u16(),
            protocol_id: raw.get_u16(),
            length: raw.get_u16(),
            unit_id: raw.get_u8(),
        })
    }

    /// Number of PDU bytes still to read after the header.
    pub fn pdu_len(&self) -> Result<usize, DeviceError> {
        match self.length {
            2..=254 => Ok(usize::from(self.length) - 1),
            other => Err(DeviceError::Protocol(format!("invalid MBAP length {other}"))),
        }
    }
}

/// Validate a response against its request and extract the register values.
pub fn decode_read_response(
    header: &MbapHeader,
    pdu: &[u8],
    transaction_id: u16,
    unit_id: u8,
    count: u16,
) -> Result<Vec<u16>, DeviceError> {
    if header.transaction_id != transaction_id {
        return Err(DeviceError::Protocol(format!(
            "transaction id mismatch: sent {transaction_id}, got {}",
            header.transaction_id
        )));
    }
    if header.protocol_id != 0 {
        return Err(DeviceError::Protocol(format!(
            "unexpected protocol id {}",
            header.protocol_id
        )));
    }
    if header.unit_id != unit_id {
        return Err(DeviceError::Protocol(format!(
            "unit id mismatch: sent {unit_id}, got {}",
            header.unit_id
        )));
    }

    let mut pdu = pdu;
    if pdu.len() < 2 {
        return Err(DeviceError::Protocol("truncated PDU".to_owned()));
    }
    let function = pdu.get_u8();
    if function == FN_READ_HOLDING_REGISTERS | EXCEPTION_FLAG {
        return Err(DeviceError::Exception {
            function: FN_READ_HOLDING_REGISTERS,
            code: pdu.get_u8(),
        });
    }
    if function != FN_READ_HOLDING_REGISTERS {
        return Err(DeviceError::Protocol(format!(
            "unexpected function code {function:#04x}"
        )));
    }
    let byte_count = usize::from(pdu.get_u8());
    if byte_count != usize::from(count) * 2 || pdu.remaining() != byte_count {
        return Err(DeviceError::Protocol(format!(
            "expected {} register bytes, got byte count {byte_count} with {} remaining",
            usize::from(count) * 2,
            pdu.remaining()
        )));
    }
    Ok((0..count).map(|_| pdu.get_u16()).collect())
}

async fn exchange(
    stream: &mut TcpStream,
    request: &[u8],
    transaction_id: u16,
    unit_id: u8,
    count: u16,
) -> Result<Vec<u16>, DeviceError> {
    stream.write_all(request).await?;
    let mut raw_header = [0_u8; MBAP_HEADER_LEN];
    stream.read_exact(&mut raw_header).await?;
    let header = MbapHeader::parse(&raw_header)?;
    let mut pdu = vec![0_u8; header.pdu_len()?];
    stream.read_exact(&mut pdu).await?;
    decode_read_response(&header, &pdu, transaction_id, unit_id, count)
}

#[async_trait]
impl RegisterSource for ModbusTcpClient {
    async fn connect(&mut self) -> Result<(), DeviceError> {
        let stream = self.open().await?;
        debug!(target: "netpulse::net::modbus", endpoint = %self.config.endpoint, "connected");
        self.stream = Some(stream);
        Ok(())
    }

    async fn read_holding_registers(
        &mut self,
        start: u16,
        count: u16,
    ) -> Result<Vec<u16>, DeviceError> {
        if count == 0 || count > MAX_READ_REGISTERS {
            return Err(DeviceError::Protocol(format!(
                "register count {count} outside 1..={MAX_READ_REGISTERS}"
            )));
        }
        if self.stream.is_none() {
            debug!(target: "netpulse::net::modbus", endpoint = %self.config.endpoint, "reconnecting");
            self.connect().await?;
        }

        let transaction_id = self.next_transaction_id();
        let unit_id = self.config.unit_id;
        let io_timeout = self.config.io_timeout;
        let request = encode_read_request(transaction_id, unit_id, start, count);
        let Some(stream) = self.stream.as_mut() else {
            return Err(DeviceError::Protocol("connection unavailable".to_owned()));
        };
        let result = match timeout(
            io_timeout,
            exchange(stream, &request, transaction_id, unit_id, count),
        )
        .await
        {
            Ok(result) => result,
            Err(_) => Err(DeviceError::Timeout(io_timeout)),
        };

        if let Err(err) = &result {
            if err.breaks_connection() {
                warn!(
                    target: "netpulse::net::modbus",
                    endpoint = %self.config.endpoint,
                    error = %err,
                    "dropping connection after failed exchange"
                );
                self.stream = None;
            }
        }
        result
    }

    fn endpoint(&self) -> String {
        self.config.endpoint.clone()
    }
}
