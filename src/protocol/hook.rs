//! Hook records, filters, and callback types.
//!
//! A hook binds a module-provided callback to a message (by name or the
//! wildcard), a definition version, a tri-state filter, and an integer order.
//! Hooks are owned by a namespace so the module host can tear down everything
//! a module registered in one sweep.

use crate::core::value::Value;
use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::Rc;
use std::time::Duration;
use tokio::task::AbortHandle;

/// Registration target: a message name resolved through the codec, or the
/// wildcard matching every opcode.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HookTarget {
    Wildcard,
    Name(String),
}

impl From<&str> for HookTarget {
    fn from(name: &str) -> Self {
        HookTarget::Name(name.to_string())
    }
}

impl From<String> for HookTarget {
    fn from(name: String) -> Self {
        HookTarget::Name(name)
    }
}

/// Internal registry key a target resolves to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub(crate) enum HookKey {
    Wildcard,
    Opcode(u16),
}

/// Definition version a hook parses against.
///
/// `Version(n)` parses the frame with the schema at revision `n`. `Any` and
/// `Raw` both hand the callback raw bytes; they differ only at registration
/// time (`Any` still requires the message to have a known schema, `Raw`
/// requires only that the name resolves).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DefVersion {
    Version(u32),
    Any,
    Raw,
}

impl fmt::Display for DefVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DefVersion::Version(v) => write!(f, "{v}"),
            DefVersion::Any => f.write_str("*"),
            DefVersion::Raw => f.write_str("raw"),
        }
    }
}

/// Per-frame flags observed by filters and callbacks, snapshot at the moment
/// each callback runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct FrameFlags {
    /// Frame was synthesized through `write` rather than read off the wire
    pub fake: bool,
    /// Server-to-client direction
    pub incoming: bool,
    /// A prior hook mutated the payload during this invocation
    pub modified: bool,
    /// A prior hook requested suppression
    pub silenced: bool,
}

/// Tri-state frame filter. `None` matches either value.
///
/// The defaults hide fake and silenced frames, so a hook does not see frames
/// it or its peers injected or dropped unless it opts in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Filter {
    pub fake: Option<bool>,
    pub incoming: Option<bool>,
    pub modified: Option<bool>,
    pub silenced: Option<bool>,
}

impl Default for Filter {
    fn default() -> Self {
        Self {
            fake: Some(false),
            incoming: None,
            modified: None,
            silenced: Some(false),
        }
    }
}

impl Filter {
    pub fn matches(&self, flags: FrameFlags) -> bool {
        fn accept(predicate: Option<bool>, actual: bool) -> bool {
            predicate.map_or(true, |required| required == actual)
        }

        accept(self.fake, flags.fake)
            && accept(self.incoming, flags.incoming)
            && accept(self.modified, flags.modified)
            && accept(self.silenced, flags.silenced)
    }
}

/// Registration options.
#[derive(Debug, Clone, Default)]
pub struct HookOptions {
    /// Dispatch order; lower runs earlier. Hooks sharing an order form a
    /// group and run in registration order.
    pub order: i32,
    pub filter: Filter,
    /// One-shot expiry: when it fires before the hook is unregistered, the
    /// hook is removed and its callback invoked once with
    /// [`HookInput::Expired`].
    pub timeout: Option<Duration>,
}

impl HookOptions {
    pub fn with_order(order: i32) -> Self {
        Self {
            order,
            ..Self::default()
        }
    }
}

/// Payload handed to a hook callback.
pub enum HookInput<'a> {
    /// Structured event for version-targeted hooks. Mutations become wire
    /// bytes only when the callback returns `Deliver(true)`.
    Event { event: &'a mut Value, flags: FrameFlags },
    /// Raw frame bytes for `Raw`/`Any` hooks. In-place mutation is observed
    /// and marks the frame modified.
    Raw {
        opcode: u16,
        data: &'a mut [u8],
        flags: FrameFlags,
    },
    /// The hook's one-shot timeout fired; the hook has already been removed.
    Expired,
}

/// Verdict returned by a hook callback.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HookOutput {
    /// No verdict; the frame continues unchanged apart from any in-place
    /// mutation a raw hook performed.
    Pass,
    /// `true` clears silencing (and, for structured hooks, commits the event
    /// back to wire bytes); `false` silences the frame.
    Deliver(bool),
    /// Raw hooks only: replace the frame bytes outright.
    Replace(Vec<u8>),
}

/// Hook callback. Runs synchronously inside `handle`/`write`.
pub type HookFn = dyn Fn(HookInput<'_>) -> HookOutput + 'static;

/// A registered hook.
pub(crate) struct Hook {
    pub id: u64,
    pub namespace: String,
    pub key: HookKey,
    /// Original message name, kept for diagnostics.
    pub name: Option<String>,
    pub version: DefVersion,
    pub filter: Filter,
    pub order: i32,
    pub callback: Rc<HookFn>,
    pub active: Cell<bool>,
    pub timer: RefCell<Option<AbortHandle>>,
}

impl Hook {
    /// Deactivate the hook and cancel its timeout. Safe to call repeatedly.
    pub fn deactivate(&self) {
        self.active.set(false);
        if let Some(timer) = self.timer.borrow_mut().take() {
            timer.abort();
        }
    }

    /// Diagnostic label: message name when known, otherwise the key.
    pub fn label(&self) -> String {
        match (&self.name, self.key) {
            (Some(name), _) => format!("{name}@{}", self.version),
            (None, HookKey::Wildcard) => format!("*@{}", self.version),
            (None, HookKey::Opcode(op)) => format!("opcode {op}@{}", self.version),
        }
    }
}

impl fmt::Debug for Hook {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Hook")
            .field("id", &self.id)
            .field("namespace", &self.namespace)
            .field("key", &self.key)
            .field("version", &self.version)
            .field("order", &self.order)
            .field("active", &self.active.get())
            .finish_non_exhaustive()
    }
}

/// Owner token for a registered hook; pass it back to `unhook`.
#[derive(Clone)]
pub struct HookHandle(pub(crate) Rc<Hook>);

impl HookHandle {
    pub fn namespace(&self) -> &str {
        &self.0.namespace
    }

    pub fn message_name(&self) -> Option<&str> {
        self.0.name.as_deref()
    }

    pub fn order(&self) -> i32 {
        self.0.order
    }

    pub fn is_active(&self) -> bool {
        self.0.active.get()
    }
}

impl fmt::Debug for HookHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}
