//! # packet-dispatch
//!
//! Transparent, pluggable interception core for length-prefixed binary game
//! protocol streams.
//!
//! The crate sits between a game client and server and lets independent
//! extension modules observe, modify, fabricate, or suppress individual
//! messages without either endpoint noticing. It owns the per-message hook
//! pipeline: an ordered, multi-tenant hook registry keyed by message
//! identity, on-demand parsing through a version-aware codec, deterministic
//! hook execution with mutation and suppression tracking, re-encoding of
//! committed events, and a per-invocation parse cache.
//!
//! Socket I/O, framing, cryptography, module discovery, and the concrete
//! protocol definitions are external collaborators reached through the
//! [`codec::ProtocolCodec`], [`codec::sysmsg::SysmsgTables`],
//! [`protocol::Connection`], and [`protocol::ModuleLoader`] traits.
//!
//! ## Example
//! ```no_run
//! use packet_dispatch::{DefVersion, Dispatch, HookInput, HookOptions, HookOutput};
//! # fn demo(dispatch: &Dispatch) -> packet_dispatch::error::Result<()> {
//! let handle = dispatch.hook(
//!     "chat-filter",
//!     "S_CHAT",
//!     DefVersion::Version(3),
//!     HookOptions::default(),
//!     |input| {
//!         if let HookInput::Event { event, .. } = input {
//!             if event.get("name").and_then(|v| v.as_str()) == Some("spammer") {
//!                 return HookOutput::Deliver(false);
//!             }
//!         }
//!         HookOutput::Pass
//!     },
//! )?;
//! dispatch.unhook(&handle);
//! # Ok(())
//! # }
//! ```

pub mod codec;
pub mod config;
pub mod core;
pub mod error;
pub mod protocol;
pub mod utils;

pub use codec::sysmsg::{SysmsgTables, SystemMessage};
pub use codec::version::Revision;
pub use codec::ProtocolCodec;
pub use config::DispatchConfig;
pub use core::value::Value;
pub use error::{CodecError, DispatchError};
pub use protocol::{
    Connection, DefVersion, Dispatch, Filter, FrameFlags, HookHandle, HookInput, HookOptions,
    HookOutput, HookTarget, Module, ModuleInstance, ModuleLoader, ProtocolState, Wrapper,
};
