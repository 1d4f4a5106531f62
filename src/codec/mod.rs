//! # Codec Registry Interface
//!
//! The dispatch core never defines the concrete protocol: message names,
//! opcode maps, and per-version field schemas live in an external codec
//! supplied by the embedding proxy. This module pins down that boundary.
//!
//! ## Components
//! - **ProtocolCodec**: name/opcode maps, definition versions, parse/write
//! - **Revision**: protocol revision string parsing
//! - **Sysmsg**: system-message tables and the textual message format
//!
//! Codec failures surface as [`CodecError`] and are routed to the handler
//! pipeline's error path, where they are logged and contained.

pub mod sysmsg;
pub mod version;

pub use crate::error::CodecError;
use crate::core::value::Value;

/// Result alias for codec operations.
pub type CodecResult<T> = std::result::Result<T, CodecError>;

/// Contract for the external protocol-definition registry.
///
/// A protocol version selects a name↔opcode map and a set of per-message
/// schemas. Each message name carries one or more definition versions; the
/// highest one is the only version hooks may target.
pub trait ProtocolCodec {
    /// Whether `protocol` has a name/opcode map.
    fn has_protocol(&self, protocol: u32) -> bool;

    /// The lowest protocol version this codec knows. Used once, to parse the
    /// version-check message before negotiation has happened.
    fn first_protocol(&self) -> Option<u32>;

    /// Revision string for a protocol version, e.g. `"EU-308.02/12"`.
    fn revision(&self, protocol: u32) -> Option<String>;

    /// Resolve a message name to its opcode under `protocol`.
    fn opcode(&self, protocol: u32, name: &str) -> Option<u16>;

    /// Resolve an opcode back to its message name under `protocol`.
    fn message_name(&self, protocol: u32, opcode: u16) -> Option<String>;

    /// Latest known definition version for a message name, if the codec has
    /// any schema for it.
    fn latest_version(&self, protocol: u32, name: &str) -> Option<u32>;

    /// Parse a complete frame into a structured value using the schema at
    /// `version`.
    fn parse(&self, protocol: u32, opcode: u16, version: u32, data: &[u8]) -> CodecResult<Value>;

    /// Serialize a structured value back into a complete frame using the
    /// schema at `version`.
    fn write(&self, protocol: u32, opcode: u16, version: u32, event: &Value)
        -> CodecResult<Vec<u8>>;
}
