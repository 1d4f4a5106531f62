//! Shared fixtures for integration tests: a schema-driven codec with parse
//! counting, static system-message tables, and a recording connection.
#![allow(dead_code)]

use packet_dispatch::codec::{CodecResult, ProtocolCodec};
use packet_dispatch::core::frame;
use packet_dispatch::{
    CodecError, Connection, Dispatch, DispatchConfig, SysmsgTables, Value,
};
use std::cell::{Cell, RefCell};
use std::rc::Rc;

pub const PROTOCOL: u32 = 1;
pub const REVISION: &str = "EU-308.02/12";
pub const SYSMSG_VERSION: u32 = 12;

pub const OP_S_CHAT: u16 = 0x1234;
pub const OP_C_CHAT: u16 = 0x2345;
pub const OP_S_PING: u16 = 0x0101;
pub const OP_CHECK_VERSION: u16 = 19900;

pub const S_CHAT_VERSION: u32 = 3;

/// Fixture codec: a fixed name/opcode map with one latest definition version
/// per message. Ordinary messages parse into `{ data: Bytes }`; the
/// version-check message parses its payload as 5-byte `(index u8, value u32
/// LE)` entries into `{ version: [{ index, value }] }`.
pub struct TestCodec {
    pub parse_calls: Cell<u32>,
    pub write_calls: Cell<u32>,
    pub fail_parse: Cell<bool>,
    pub fail_write: Cell<bool>,
}

impl TestCodec {
    pub fn new() -> Rc<Self> {
        Rc::new(Self {
            parse_calls: Cell::new(0),
            write_calls: Cell::new(0),
            fail_parse: Cell::new(false),
            fail_write: Cell::new(false),
        })
    }

    fn table(&self) -> &'static [(&'static str, u16, u32)] {
        &[
            ("S_CHAT", OP_S_CHAT, S_CHAT_VERSION),
            ("C_CHAT", OP_C_CHAT, 1),
            ("S_PING", OP_S_PING, 1),
            ("C_CHECK_VERSION", OP_CHECK_VERSION, 1),
        ]
    }
}

impl ProtocolCodec for TestCodec {
    fn has_protocol(&self, protocol: u32) -> bool {
        protocol == PROTOCOL
    }

    fn first_protocol(&self) -> Option<u32> {
        Some(PROTOCOL)
    }

    fn revision(&self, protocol: u32) -> Option<String> {
        (protocol == PROTOCOL).then(|| REVISION.to_string())
    }

    fn opcode(&self, protocol: u32, name: &str) -> Option<u16> {
        if protocol != PROTOCOL {
            return None;
        }
        self.table()
            .iter()
            .find(|(entry, _, _)| *entry == name)
            .map(|(_, opcode, _)| *opcode)
    }

    fn message_name(&self, protocol: u32, opcode: u16) -> Option<String> {
        if protocol != PROTOCOL {
            return None;
        }
        self.table()
            .iter()
            .find(|(_, entry, _)| *entry == opcode)
            .map(|(name, _, _)| name.to_string())
    }

    fn latest_version(&self, protocol: u32, name: &str) -> Option<u32> {
        if protocol != PROTOCOL {
            return None;
        }
        self.table()
            .iter()
            .find(|(entry, _, _)| *entry == name)
            .map(|(_, _, version)| *version)
    }

    fn parse(
        &self,
        _protocol: u32,
        opcode: u16,
        _version: u32,
        data: &[u8],
    ) -> CodecResult<Value> {
        self.parse_calls.set(self.parse_calls.get() + 1);
        if self.fail_parse.get() {
            return Err(CodecError::new("parse failure injected"));
        }
        if data.len() < 4 {
            return Err(CodecError::new("frame shorter than header"));
        }

        let payload = &data[4..];
        if opcode == OP_CHECK_VERSION {
            let mut entries = Vec::new();
            for chunk in payload.chunks_exact(5) {
                entries.push(Value::object([
                    ("index", Value::UInt(u64::from(chunk[0]))),
                    (
                        "value",
                        Value::UInt(u64::from(u32::from_le_bytes([
                            chunk[1], chunk[2], chunk[3], chunk[4],
                        ]))),
                    ),
                ]));
            }
            return Ok(Value::object([("version", Value::Array(entries))]));
        }

        Ok(Value::object([("data", Value::Bytes(payload.to_vec()))]))
    }

    fn write(
        &self,
        _protocol: u32,
        opcode: u16,
        _version: u32,
        event: &Value,
    ) -> CodecResult<Vec<u8>> {
        self.write_calls.set(self.write_calls.get() + 1);
        if self.fail_write.get() {
            return Err(CodecError::new("write failure injected"));
        }

        if opcode == OP_CHECK_VERSION {
            let entries = event
                .get("version")
                .and_then(Value::as_array)
                .ok_or_else(|| CodecError::new("missing version array"))?;
            let mut payload = Vec::new();
            for entry in entries {
                let index = entry
                    .get("index")
                    .and_then(Value::as_u64)
                    .ok_or_else(|| CodecError::new("missing index"))?;
                let value = entry
                    .get("value")
                    .and_then(Value::as_u64)
                    .ok_or_else(|| CodecError::new("missing value"))?;
                payload.push(index as u8);
                payload.extend_from_slice(&(value as u32).to_le_bytes());
            }
            return Ok(frame::build(opcode, &payload));
        }

        let payload = event
            .get("data")
            .and_then(Value::as_bytes)
            .ok_or_else(|| CodecError::new("missing data field"))?;
        Ok(frame::build(opcode, payload))
    }
}

/// Fixture system-message tables: one table at version 12.
pub struct TestTables;

impl SysmsgTables for TestTables {
    fn has_version(&self, version: u32) -> bool {
        version == SYSMSG_VERSION
    }

    fn code(&self, version: u32, name: &str) -> Option<u32> {
        if version != SYSMSG_VERSION {
            return None;
        }
        match name {
            "SMT_MEGAPHONE" => Some(1234),
            "SMT_PARTY_INVITE" => Some(77),
            _ => None,
        }
    }

    fn name(&self, version: u32, code: u32) -> Option<String> {
        if version != SYSMSG_VERSION {
            return None;
        }
        match code {
            1234 => Some("SMT_MEGAPHONE".into()),
            77 => Some("SMT_PARTY_INVITE".into()),
            _ => None,
        }
    }
}

/// Records every forwarded frame per side.
#[derive(Default)]
pub struct RecordingConnection {
    pub to_server: RefCell<Vec<Vec<u8>>>,
    pub to_client: RefCell<Vec<Vec<u8>>>,
}

impl Connection for RecordingConnection {
    fn send_server(&self, data: &[u8]) {
        self.to_server.borrow_mut().push(data.to_vec());
    }

    fn send_client(&self, data: &[u8]) {
        self.to_client.borrow_mut().push(data.to_vec());
    }
}

/// A dispatch wired to the fixtures with the protocol already negotiated.
pub fn negotiated_dispatch() -> (Dispatch, Rc<TestCodec>, Rc<RecordingConnection>) {
    let codec = TestCodec::new();
    let connection = Rc::new(RecordingConnection::default());
    let dispatch = Dispatch::new(
        Rc::clone(&codec) as Rc<dyn ProtocolCodec>,
        Rc::new(TestTables),
        DispatchConfig::default(),
    );
    dispatch.set_connection(Rc::clone(&connection) as Rc<dyn Connection>);
    dispatch.set_protocol_version(PROTOCOL);
    (dispatch, codec, connection)
}

/// A dispatch wired to the fixtures with no protocol version set.
pub fn unnegotiated_dispatch() -> (Dispatch, Rc<TestCodec>, Rc<RecordingConnection>) {
    let codec = TestCodec::new();
    let connection = Rc::new(RecordingConnection::default());
    let dispatch = Dispatch::new(
        Rc::clone(&codec) as Rc<dyn ProtocolCodec>,
        Rc::new(TestTables),
        DispatchConfig::default(),
    );
    dispatch.set_connection(Rc::clone(&connection) as Rc<dyn Connection>);
    (dispatch, codec, connection)
}

/// A version-check frame advertising `version` at index 0.
pub fn check_version_frame(version: u32) -> Vec<u8> {
    let mut payload = vec![0u8];
    payload.extend_from_slice(&version.to_le_bytes());
    frame::build(OP_CHECK_VERSION, &payload)
}

/// An S_CHAT frame with the given payload bytes.
pub fn chat_frame(payload: &[u8]) -> Vec<u8> {
    frame::build(OP_S_CHAT, payload)
}
