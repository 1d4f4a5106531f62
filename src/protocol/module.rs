//! Module host and namespaced wrapper.
//!
//! Extension modules never touch the dispatch directly; each gets a
//! [`Wrapper`] bound to its namespace. Every hook a module registers is
//! tagged with that namespace so `unload` can tear all of them down, even
//! when the module's constructor failed partway through.

use crate::core::value::Value;
use crate::error::{DispatchError, Result};
use crate::protocol::dispatch::DispatchInner;
use crate::protocol::hook::{DefVersion, HookHandle, HookInput, HookOptions, HookOutput, HookTarget};
use std::cell::RefCell;
use std::rc::{Rc, Weak};

/// An extension module. The destructor is optional; the default does
/// nothing.
pub trait Module {
    fn destructor(&mut self) {}
}

/// Shared handle to a loaded module instance.
pub type ModuleInstance = Rc<RefCell<Box<dyn Module>>>;

/// Resolves module names to constructed instances. Implementations close
/// over whatever construction state their modules need.
pub trait ModuleLoader {
    fn construct(&self, name: &str, wrapper: Wrapper) -> Result<Box<dyn Module>>;
}

/// A module's namespaced facade onto the dispatch. Forwards hook
/// registration and frame synthesis with the module's namespace bound.
#[derive(Clone)]
pub struct Wrapper {
    inner: Weak<DispatchInner>,
    namespace: String,
}

impl Wrapper {
    pub(crate) fn new(inner: Weak<DispatchInner>, namespace: String) -> Self {
        Self { inner, namespace }
    }

    pub fn name(&self) -> &str {
        &self.namespace
    }

    fn dispatch(&self) -> Result<Rc<DispatchInner>> {
        self.inner
            .upgrade()
            .ok_or_else(|| DispatchError::Module("dispatch is no longer alive".into()))
    }

    /// Register a hook under this module's namespace.
    pub fn hook(
        &self,
        target: impl Into<HookTarget>,
        version: DefVersion,
        opts: HookOptions,
        callback: impl Fn(HookInput<'_>) -> HookOutput + 'static,
    ) -> Result<HookHandle> {
        self.dispatch()?.register_hook(
            &self.namespace,
            target.into(),
            version,
            opts,
            Rc::new(callback),
        )
    }

    /// Remove a hook. Idempotent.
    pub fn unhook(&self, handle: &HookHandle) {
        if let Ok(dispatch) = self.dispatch() {
            dispatch.unregister_hook(&handle.0);
        }
    }

    /// Synthesize a raw frame. See [`crate::Dispatch::write_raw`].
    pub fn write_raw(&self, outgoing: bool, data: Vec<u8>) -> bool {
        match self.dispatch() {
            Ok(dispatch) => dispatch.write_frame(outgoing, data),
            Err(_) => false,
        }
    }

    /// Serialize and synthesize a named message. See
    /// [`crate::Dispatch::write_message`].
    pub fn write_message(&self, outgoing: bool, name: &str, version: u32, event: &Value) -> bool {
        match self.dispatch() {
            Ok(dispatch) => dispatch.write_message(outgoing, name, version, event),
            Err(_) => false,
        }
    }
}
