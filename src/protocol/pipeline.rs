//! Per-frame hook execution.
//!
//! `handle_frame` runs the registered hooks against one frame, tracking
//! mutation and suppression and caching parsed events per definition version
//! so the codec parses each version at most once per invocation. The hook
//! list is snapshot up front; hooks deactivated mid-flight are skipped, so a
//! callback may unregister any hook, including itself.
//!
//! Runtime failures never escape: codec errors and callback panics are
//! logged with hook identity and a bounded hex dump of the frame, and the
//! loop continues with the current state.

use crate::config::{CHECK_VERSION_DEF, CHECK_VERSION_OPCODE};
use crate::core::frame;
use crate::core::value::Value;
use crate::error::DispatchError;
use crate::protocol::dispatch::DispatchInner;
use crate::protocol::hook::{DefVersion, FrameFlags, Hook, HookInput, HookOutput};
use crate::utils::hexdump;
use std::any::Any;
use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::panic::{catch_unwind, AssertUnwindSafe};
use tracing::{debug, error, warn};

/// Run one frame through the pipeline. Returns the current bytes, or `None`
/// when a hook silenced the frame.
pub(crate) fn handle_frame(
    inner: &DispatchInner,
    mut data: Vec<u8>,
    incoming: bool,
    fake: bool,
) -> Option<Vec<u8>> {
    inner.metrics.frame_handled(fake);

    let Some(opcode) = frame::opcode(&data) else {
        warn!(len = data.len(), "frame shorter than header; passing through");
        return Some(data);
    };

    if inner.is_version_probe(opcode) {
        snoop_protocol_version(inner, &data);
    }

    let hooks = inner.registry.borrow().hooks_for_opcode(opcode);
    if hooks.is_empty() {
        return Some(data);
    }

    let original = data.clone();
    let protocol = inner.state.borrow().protocol_version;

    let mut modified = false;
    let mut silenced = false;
    let mut event_cache: HashMap<u32, Value> = HashMap::new();
    let last_index = hooks.len() - 1;

    for (index, hook) in hooks.iter().enumerate() {
        if !hook.active.get() {
            continue;
        }

        let flags = FrameFlags {
            fake,
            incoming,
            modified,
            silenced,
        };
        if !hook.filter.matches(flags) {
            continue;
        }

        match hook.version {
            DefVersion::Raw | DefVersion::Any => {
                inner.metrics.hook_invoked();
                let outcome = {
                    let payload: &mut [u8] = &mut data;
                    catch_unwind(AssertUnwindSafe(|| {
                        (hook.callback)(HookInput::Raw {
                            opcode,
                            data: payload,
                            flags,
                        })
                    }))
                };

                match outcome {
                    Ok(HookOutput::Replace(next)) => {
                        if next != data {
                            modified = true;
                        }
                        data = next;
                    }
                    // Non-buffer results compare against the ORIGINAL bytes,
                    // so in-place mutation is still detected.
                    Ok(HookOutput::Deliver(deliver)) => {
                        if data != original {
                            modified = true;
                        }
                        silenced = !deliver;
                    }
                    Ok(HookOutput::Pass) => {
                        if data != original {
                            modified = true;
                        }
                    }
                    Err(payload) => log_callback_panic(inner, hook, opcode, &data, payload),
                }
            }
            DefVersion::Version(version) => {
                match event_cache.entry(version) {
                    Entry::Occupied(_) => inner.metrics.parse_cache_hit(),
                    Entry::Vacant(slot) => {
                        match inner.codec.parse(protocol, opcode, version, &data) {
                            Ok(event) => {
                                inner.metrics.parse();
                                slot.insert(event);
                            }
                            Err(err) => {
                                log_codec_failure(inner, hook, opcode, &data, "parsing", err);
                                continue;
                            }
                        }
                    }
                }

                // The final hook of the traversal owns the cached event;
                // earlier consumers work on a deep clone so an uncommitted
                // mutation cannot leak into later hooks.
                let last = index == last_index;
                let mut scratch: Option<Value> = None;
                let event: &mut Value = if last {
                    match event_cache.get_mut(&version) {
                        Some(event) => event,
                        None => continue,
                    }
                } else {
                    scratch = event_cache.get(&version).cloned();
                    match scratch.as_mut() {
                        Some(event) => event,
                        None => continue,
                    }
                };

                inner.metrics.hook_invoked();
                let outcome = catch_unwind(AssertUnwindSafe(|| {
                    (hook.callback)(HookInput::Event { event, flags })
                }));

                match outcome {
                    Ok(HookOutput::Deliver(true)) => {
                        modified = true;
                        silenced = false;
                        inner.metrics.commit();

                        let committed = if last {
                            event_cache.get(&version)
                        } else {
                            scratch.as_ref()
                        };
                        // Present by construction; skip the commit otherwise.
                        let Some(committed) = committed else { continue };

                        match inner.codec.write(protocol, opcode, version, committed) {
                            Ok(bytes) => {
                                data = bytes;
                                // Later hooks must re-parse from the
                                // rewritten bytes.
                                event_cache.clear();
                            }
                            Err(err) => {
                                log_codec_failure(
                                    inner,
                                    hook,
                                    opcode,
                                    &data,
                                    "re-serializing",
                                    err,
                                );
                            }
                        }
                    }
                    Ok(HookOutput::Deliver(false)) => silenced = true,
                    Ok(HookOutput::Pass) | Ok(HookOutput::Replace(_)) => {}
                    Err(payload) => log_callback_panic(inner, hook, opcode, &data, payload),
                }
            }
        }
    }

    if modified {
        inner.metrics.frame_modified();
    }
    if silenced {
        inner.metrics.frame_silenced();
        let name = inner.codec.message_name(protocol, opcode);
        debug!(opcode, name = name.as_deref().unwrap_or("?"), "frame silenced");
        return None;
    }
    Some(data)
}

/// Extract the protocol version embedded in a pre-negotiation version-check
/// frame. Failures are logged and otherwise ignored; frame handling
/// continues either way.
fn snoop_protocol_version(inner: &DispatchInner, data: &[u8]) {
    let Some(probe_protocol) = inner.codec.first_protocol() else {
        debug!("codec knows no protocol versions; skipping version probe");
        return;
    };

    match inner
        .codec
        .parse(probe_protocol, CHECK_VERSION_OPCODE, CHECK_VERSION_DEF, data)
    {
        Ok(event) => {
            inner.metrics.parse();
            let entry = event
                .get("version")
                .and_then(Value::as_array)
                .and_then(<[Value]>::first);
            let index = entry.and_then(|e| e.get("index")).and_then(Value::as_u64);
            let value = entry.and_then(|e| e.get("value")).and_then(Value::as_u64);

            match (index, value) {
                (Some(0), Some(version)) => {
                    debug!(version, "version probe matched");
                    inner.set_protocol_version(version as u32);
                }
                (Some(_), _) => {}
                _ => debug!("version probe frame had unexpected shape"),
            }
        }
        Err(err) => debug!(error = %err, "version probe parse failed"),
    }
}

fn log_codec_failure(
    inner: &DispatchInner,
    hook: &Hook,
    opcode: u16,
    data: &[u8],
    context: &str,
    source: crate::error::CodecError,
) {
    inner.metrics.callback_failure();
    let err = DispatchError::Codec {
        context: format!("{context} {}", hook.label()),
        source,
    };
    error!(
        namespace = %hook.namespace,
        opcode,
        frame = %hexdump::dump(data, inner.config.diagnostics.max_dump_bytes),
        error = %err,
        "codec failure in hook pipeline"
    );
}

fn log_callback_panic(
    inner: &DispatchInner,
    hook: &Hook,
    opcode: u16,
    data: &[u8],
    payload: Box<dyn Any + Send>,
) {
    inner.metrics.callback_failure();
    let err = DispatchError::Callback {
        namespace: hook.namespace.clone(),
        hook: hook.label(),
        message: panic_message(payload),
    };
    error!(
        opcode,
        frame = %hexdump::dump(data, inner.config.diagnostics.max_dump_bytes),
        error = %err,
        "hook callback panicked"
    );
}

/// Render a panic payload for logging, surfacing the module's own message
/// rather than a framework backtrace.
pub(crate) fn panic_message(payload: Box<dyn Any + Send>) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "non-string panic payload".to_string()
    }
}
