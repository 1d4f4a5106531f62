//! Dispatch facade.
//!
//! The public surface of the interception layer: hook registration and
//! removal, protocol version negotiation, frame synthesis through `write`,
//! system-message helpers, and module lifecycle. The facade owns the hook
//! registry and protocol state behind `Rc`/`RefCell`; all operations run on
//! one logical task and callbacks execute synchronously, so no interior
//! borrow is ever held across a callback and synchronous re-entry is safe.

use crate::codec::sysmsg::{self, SysmsgTables, SystemMessage};
use crate::codec::version::Revision;
use crate::codec::ProtocolCodec;
use crate::config::DispatchConfig;
use crate::core::value::Value;
use crate::error::{constants, DispatchError, Result};
use crate::protocol::hook::{
    DefVersion, Hook, HookFn, HookHandle, HookInput, HookKey, HookOptions, HookOutput, HookTarget,
};
use crate::protocol::module::{ModuleInstance, ModuleLoader, Wrapper};
use crate::protocol::pipeline;
use crate::protocol::registry::HookRegistry;
use crate::utils::metrics::{Metrics, MetricsSnapshot};
use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::rc::Rc;
use std::time::Duration;
use tracing::{debug, error, info, warn};

/// The I/O collaborator. Owns the sockets and framing; calls
/// [`Dispatch::handle`] for frames arriving off the wire and forwards the
/// frames the dispatch hands back.
pub trait Connection {
    /// Forward a frame toward the game server.
    fn send_server(&self, data: &[u8]);
    /// Forward a frame toward the game client.
    fn send_client(&self, data: &[u8]);
}

/// Negotiated protocol state. Mutated only by
/// [`Dispatch::set_protocol_version`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProtocolState {
    /// Current protocol version; `0` means not yet negotiated.
    pub protocol_version: u32,
    pub region: Option<String>,
    pub major_patch: Option<u32>,
    pub minor_patch: Option<u32>,
    /// Selected system-message table version, when one is mapped.
    pub sysmsg_version: Option<u32>,
}

impl ProtocolState {
    pub fn negotiated(&self) -> bool {
        self.protocol_version != 0
    }
}

pub(crate) type InitListener = Rc<dyn Fn(&ProtocolState)>;

pub(crate) struct DispatchInner {
    pub(crate) codec: Rc<dyn ProtocolCodec>,
    pub(crate) sysmsg: Rc<dyn SysmsgTables>,
    pub(crate) config: DispatchConfig,
    pub(crate) metrics: Metrics,
    pub(crate) connection: RefCell<Option<Rc<dyn Connection>>>,
    pub(crate) state: RefCell<ProtocolState>,
    pub(crate) registry: RefCell<HookRegistry>,
    pub(crate) modules: RefCell<HashMap<String, ModuleInstance>>,
    pub(crate) init_listeners: RefCell<Vec<InitListener>>,
}

/// The dispatch core. Cheap to clone; clones share all state.
#[derive(Clone)]
pub struct Dispatch {
    inner: Rc<DispatchInner>,
}

impl Dispatch {
    pub fn new(
        codec: Rc<dyn ProtocolCodec>,
        sysmsg: Rc<dyn SysmsgTables>,
        config: DispatchConfig,
    ) -> Self {
        Self {
            inner: Rc::new(DispatchInner {
                codec,
                sysmsg,
                config,
                metrics: Metrics::new(),
                connection: RefCell::new(None),
                state: RefCell::new(ProtocolState::default()),
                registry: RefCell::new(HookRegistry::new()),
                modules: RefCell::new(HashMap::new()),
                init_listeners: RefCell::new(Vec::new()),
            }),
        }
    }

    /// Attach the I/O collaborator frames are forwarded through.
    pub fn set_connection(&self, connection: Rc<dyn Connection>) {
        *self.inner.connection.borrow_mut() = Some(connection);
    }

    /// Register a listener invoked after each successful version negotiation.
    pub fn on_init(&self, listener: impl Fn(&ProtocolState) + 'static) {
        self.inner.init_listeners.borrow_mut().push(Rc::new(listener));
    }

    /// Current negotiated protocol state.
    pub fn protocol_state(&self) -> ProtocolState {
        self.inner.state.borrow().clone()
    }

    /// Point-in-time metrics.
    pub fn metrics(&self) -> MetricsSnapshot {
        self.inner.metrics.snapshot()
    }

    /// Register a hook under a module namespace.
    pub fn hook(
        &self,
        namespace: &str,
        target: impl Into<HookTarget>,
        version: DefVersion,
        opts: HookOptions,
        callback: impl Fn(HookInput<'_>) -> HookOutput + 'static,
    ) -> Result<HookHandle> {
        self.inner
            .register_hook(namespace, target.into(), version, opts, Rc::new(callback))
    }

    /// Remove a hook. Idempotent; cancels any armed timeout.
    pub fn unhook(&self, handle: &HookHandle) {
        self.inner.unregister_hook(&handle.0);
    }

    /// Run a frame through the hook pipeline. Returns the possibly-modified
    /// bytes, or `None` when a hook suppressed the frame.
    pub fn handle(&self, data: Vec<u8>, incoming: bool, fake: bool) -> Option<Vec<u8>> {
        pipeline::handle_frame(self.inner.as_ref(), data, incoming, fake)
    }

    /// Synthesize a frame from raw bytes: it re-enters the pipeline marked
    /// fake and, unless suppressed, is forwarded on the proper side. Returns
    /// whether the frame went out.
    pub fn write_raw(&self, outgoing: bool, data: Vec<u8>) -> bool {
        self.inner.write_frame(outgoing, data)
    }

    /// Serialize and synthesize a named message. A definition version older
    /// than the latest known warns but proceeds; serialization failure logs
    /// and returns false.
    pub fn write_message(&self, outgoing: bool, name: &str, version: u32, event: &Value) -> bool {
        self.inner.write_message(outgoing, name, version, event)
    }

    /// Store the negotiated protocol version and resolve its revision.
    pub fn set_protocol_version(&self, version: u32) {
        self.inner.set_protocol_version(version);
    }

    /// Decode a textual system message using the selected table.
    pub fn parse_system_message(&self, message: &str) -> Result<SystemMessage> {
        let version = self.inner.state.borrow().sysmsg_version;
        sysmsg::parse(self.inner.sysmsg.as_ref(), version, message)
    }

    /// Encode a system message back to text using the selected table.
    pub fn build_system_message(&self, message: &SystemMessage) -> Result<String> {
        let version = self.inner.state.borrow().sysmsg_version;
        sysmsg::build(self.inner.sysmsg.as_ref(), version, message)
    }

    /// Instantiate a module, or return the already-loaded instance.
    pub fn load(&self, name: &str, loader: &dyn ModuleLoader) -> Option<ModuleInstance> {
        self.inner.load(name, loader)
    }

    /// Tear down a module: every hook in its namespace is removed, then its
    /// destructor runs. Returns false when no such module is loaded.
    pub fn unload(&self, name: &str) -> bool {
        self.inner.unload(name)
    }

    pub fn is_loaded(&self, name: &str) -> bool {
        self.inner.modules.borrow().contains_key(name)
    }

    /// Unload every module and clear all hook state.
    pub fn reset(&self) {
        self.inner.reset();
    }
}

impl DispatchInner {
    pub(crate) fn register_hook(
        self: &Rc<Self>,
        namespace: &str,
        target: HookTarget,
        version: DefVersion,
        opts: HookOptions,
        callback: Rc<HookFn>,
    ) -> Result<HookHandle> {
        if version == DefVersion::Version(0) {
            return Err(DispatchError::InvalidArgument(
                constants::ERR_ZERO_VERSION.into(),
            ));
        }

        let (key, name) = match target {
            HookTarget::Wildcard => {
                if matches!(version, DefVersion::Version(_)) {
                    return Err(DispatchError::InvalidArgument(
                        constants::ERR_WILDCARD_VERSIONED.into(),
                    ));
                }
                (HookKey::Wildcard, None)
            }
            HookTarget::Name(name) => {
                let protocol = self.state.borrow().protocol_version;
                let Some(opcode) = self.codec.opcode(protocol, &name) else {
                    return Err(DispatchError::UnmappedName(name));
                };
                if version != DefVersion::Raw {
                    let latest = self.codec.latest_version(protocol, &name).ok_or_else(|| {
                        DispatchError::UnknownDefinition {
                            name: name.clone(),
                            requested: version.to_string(),
                            latest: None,
                        }
                    })?;
                    if let DefVersion::Version(requested) = version {
                        if requested < latest {
                            return Err(DispatchError::ObsoleteDefinition {
                                name,
                                requested,
                                latest,
                            });
                        }
                        if requested > latest {
                            return Err(DispatchError::UnknownDefinition {
                                name,
                                requested: requested.to_string(),
                                latest: Some(latest),
                            });
                        }
                    }
                }
                (HookKey::Opcode(opcode), Some(name))
            }
        };

        let timeout = opts.timeout.or(self.config.hooks.default_timeout);
        let hook = {
            let mut registry = self.registry.borrow_mut();
            let hook = Rc::new(Hook {
                id: registry.allocate_id(),
                namespace: namespace.to_string(),
                key,
                name,
                version,
                filter: opts.filter,
                order: opts.order,
                callback,
                active: Cell::new(true),
                timer: RefCell::new(None),
            });
            registry.insert(Rc::clone(&hook));
            hook
        };
        self.metrics.hook_registered();
        debug!(
            namespace,
            hook = %hook.label(),
            order = hook.order,
            "hook registered"
        );

        if let Some(timeout) = timeout {
            self.arm_timeout(&hook, timeout);
        }
        Ok(HookHandle(hook))
    }

    /// Arm the one-shot expiry timer. Runs on the local task set; delivery
    /// does not cancel it, only `unregister_hook` does.
    fn arm_timeout(self: &Rc<Self>, hook: &Rc<Hook>, timeout: Duration) {
        let weak = Rc::downgrade(self);
        let hook_rc = Rc::clone(hook);
        let task = tokio::task::spawn_local(async move {
            tokio::time::sleep(timeout).await;
            let Some(inner) = weak.upgrade() else {
                return;
            };
            if !hook_rc.active.get() {
                return;
            }
            debug!(
                namespace = %hook_rc.namespace,
                hook = %hook_rc.label(),
                "hook timed out"
            );
            inner.unregister_hook(&hook_rc);
            inner.metrics.hook_invoked();
            if let Err(payload) =
                catch_unwind(AssertUnwindSafe(|| (hook_rc.callback)(HookInput::Expired)))
            {
                inner.metrics.callback_failure();
                let err = DispatchError::Callback {
                    namespace: hook_rc.namespace.clone(),
                    hook: hook_rc.label(),
                    message: pipeline::panic_message(payload),
                };
                error!(error = %err, "timeout callback panicked");
            }
        });
        *hook.timer.borrow_mut() = Some(task.abort_handle());
    }

    pub(crate) fn unregister_hook(&self, hook: &Hook) {
        if !hook.active.get() {
            return;
        }
        hook.deactivate();
        if self.registry.borrow_mut().remove(hook) {
            self.metrics.hook_removed();
            debug!(namespace = %hook.namespace, hook = %hook.label(), "hook removed");
        }
    }

    pub(crate) fn set_protocol_version(&self, version: u32) {
        let negotiated = {
            let mut state = self.state.borrow_mut();
            *state = ProtocolState {
                protocol_version: version,
                ..ProtocolState::default()
            };

            if version == 0 {
                // Pre-negotiation sentinel; accepted silently.
                false
            } else if !self.codec.has_protocol(version) {
                // The version is remembered even though the codec has no
                // data for it.
                error!(version, "no protocol data mapped for version");
                false
            } else {
                match self.codec.revision(version) {
                    Some(revision) => match Revision::parse(&revision) {
                        Ok(parsed) => {
                            let table = parsed.sysmsg_version();
                            state.region = parsed.region;
                            state.major_patch = Some(parsed.major);
                            state.minor_patch = parsed.minor;
                            if self.sysmsg.has_version(table) {
                                state.sysmsg_version = Some(table);
                            } else {
                                error!(version, table, "no system-message table for revision");
                            }
                            true
                        }
                        Err(err) => {
                            error!(version, revision = %revision, error = %err, "bad revision string");
                            false
                        }
                    },
                    None => {
                        error!(version, "protocol is mapped but has no revision string");
                        false
                    }
                }
            }
        };

        if negotiated {
            let state = self.state.borrow().clone();
            info!(
                version,
                region = state.region.as_deref().unwrap_or("-"),
                major = state.major_patch.unwrap_or(0),
                sysmsg = state.sysmsg_version.unwrap_or(0),
                "protocol version negotiated"
            );
            let listeners = self.init_listeners.borrow().clone();
            for listener in listeners {
                listener(&state);
            }
        }
    }

    pub(crate) fn write_frame(&self, outgoing: bool, data: Vec<u8>) -> bool {
        match pipeline::handle_frame(self, data, !outgoing, true) {
            Some(bytes) => {
                let connection = self.connection.borrow().clone();
                match connection {
                    Some(connection) => {
                        if outgoing {
                            connection.send_server(&bytes);
                        } else {
                            connection.send_client(&bytes);
                        }
                        true
                    }
                    None => {
                        warn!("no connection attached; dropping synthesized frame");
                        false
                    }
                }
            }
            None => false,
        }
    }

    pub(crate) fn write_message(
        &self,
        outgoing: bool,
        name: &str,
        version: u32,
        event: &Value,
    ) -> bool {
        let protocol = self.state.borrow().protocol_version;
        let Some(opcode) = self.codec.opcode(protocol, name) else {
            error!(name, "cannot write message not mapped by current protocol");
            return false;
        };
        if let Some(latest) = self.codec.latest_version(protocol, name) {
            if version < latest {
                warn!(
                    name,
                    version, latest, "writing with an outdated definition version"
                );
            }
        }

        match self.codec.write(protocol, opcode, version, event) {
            Ok(bytes) => self.write_frame(outgoing, bytes),
            Err(err) => {
                let err = DispatchError::Codec {
                    context: format!("serializing {name}@{version}"),
                    source: err,
                };
                error!(error = %err, "write failed");
                false
            }
        }
    }

    pub(crate) fn load(self: &Rc<Self>, name: &str, loader: &dyn ModuleLoader) -> Option<ModuleInstance> {
        if let Some(existing) = self.modules.borrow().get(name) {
            return Some(Rc::clone(existing));
        }

        let wrapper = Wrapper::new(Rc::downgrade(self), name.to_string());
        match catch_unwind(AssertUnwindSafe(|| loader.construct(name, wrapper))) {
            Ok(Ok(module)) => {
                let instance: ModuleInstance = Rc::new(RefCell::new(module));
                self.modules
                    .borrow_mut()
                    .insert(name.to_string(), Rc::clone(&instance));
                self.metrics.module_loaded();
                info!(module = name, "module loaded");
                Some(instance)
            }
            Ok(Err(err)) => {
                self.rollback_namespace(name);
                error!(module = name, error = %err, "module failed to load");
                None
            }
            Err(payload) => {
                self.rollback_namespace(name);
                error!(
                    module = name,
                    panic = %pipeline::panic_message(payload),
                    "module constructor panicked"
                );
                None
            }
        }
    }

    pub(crate) fn unload(&self, name: &str) -> bool {
        // Hooks go first so a misbehaving destructor cannot leave any behind.
        self.rollback_namespace(name);

        let instance = self.modules.borrow_mut().remove(name);
        match instance {
            Some(instance) => {
                if let Err(payload) =
                    catch_unwind(AssertUnwindSafe(|| instance.borrow_mut().destructor()))
                {
                    error!(
                        module = name,
                        panic = %pipeline::panic_message(payload),
                        "module destructor panicked"
                    );
                }
                self.metrics.module_unloaded();
                info!(module = name, "module unloaded");
                true
            }
            None => {
                warn!(module = name, "unload requested for module that is not loaded");
                false
            }
        }
    }

    fn rollback_namespace(&self, namespace: &str) {
        let removed = self.registry.borrow_mut().remove_namespace(namespace);
        for _ in &removed {
            self.metrics.hook_removed();
        }
    }

    pub(crate) fn reset(&self) {
        let names: Vec<String> = self.modules.borrow().keys().cloned().collect();
        for name in names {
            self.unload(&name);
        }

        let stragglers = self.registry.borrow_mut().clear();
        for _ in 0..stragglers {
            self.metrics.hook_removed();
        }
        self.metrics.log_summary();
        info!("dispatch reset");
    }

    /// Whether a frame's opcode should be snooped for the embedded protocol
    /// version. Confines the dynamic-negotiation special case to one place.
    pub(crate) fn is_version_probe(&self, opcode: u16) -> bool {
        opcode == crate::config::CHECK_VERSION_OPCODE && !self.state.borrow().negotiated()
    }
}
