//! # Dispatch Protocol Components
//!
//! The hook registry, handler pipeline, dispatch facade, and module host.
//!
//! ## Components
//! - **Hook**: hook records, filters, callback types
//! - **Registry**: ordered multi-tenant hook storage with merged traversal
//! - **Pipeline**: per-frame hook execution with parse caching
//! - **Dispatch**: public facade, version negotiation, frame synthesis
//! - **Module**: module host and namespaced wrapper

pub mod dispatch;
pub mod hook;
pub mod module;
pub mod pipeline;
pub mod registry;


pub use dispatch::{Connection, Dispatch, ProtocolState};
pub use hook::{
    DefVersion, Filter, FrameFlags, HookHandle, HookInput, HookOptions, HookOutput, HookTarget,
};
pub use module::{Module, ModuleInstance, ModuleLoader, Wrapper};
