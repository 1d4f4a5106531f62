//! # Core Components
//!
//! Frame header handling and structured event values.
//!
//! ## Components
//! - **Frame**: length-prefixed wire frame accessors
//! - **Value**: structured representation of parsed messages
//!
//! ## Wire Format
//! ```text
//! [Length(2, LE)] [Opcode(2, LE)] [Payload(N)]
//! ```
//!
//! The dispatch core receives complete frames from the I/O collaborator; it
//! never splits or reassembles the byte stream.

pub mod frame;
pub mod value;
