#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
//! Failure containment: panicking callbacks, codec failures mid-pipeline,
//! and malformed frames. A broken module must never take the proxy down.

mod common;

use common::{chat_frame, negotiated_dispatch, S_CHAT_VERSION};
use packet_dispatch::{DefVersion, HookInput, HookOptions, HookOutput, Value};
use std::cell::Cell;
use std::rc::Rc;

// ============================================================================
// CALLBACK PANIC CONTAINMENT
// ============================================================================

#[test]
fn test_panicking_raw_hook_does_not_stop_pipeline() {
    packet_dispatch::utils::logging::init_default();
    let (dispatch, _codec, _conn) = negotiated_dispatch();
    let later_runs = Rc::new(Cell::new(0u32));

    dispatch
        .hook(
            "buggy",
            "S_CHAT",
            DefVersion::Raw,
            HookOptions::with_order(0),
            |_input| panic!("module bug"),
        )
        .unwrap();

    let later = Rc::clone(&later_runs);
    dispatch
        .hook(
            "healthy",
            "S_CHAT",
            DefVersion::Raw,
            HookOptions::with_order(10),
            move |_input| {
                later.set(later.get() + 1);
                HookOutput::Pass
            },
        )
        .unwrap();

    let data = chat_frame(&[1, 2]);
    let result = dispatch.handle(data.clone(), true, false);

    assert_eq!(result, Some(data));
    assert_eq!(later_runs.get(), 1);
    assert_eq!(dispatch.metrics().callback_failures, 1);
}

#[test]
fn test_panicking_structured_hook_does_not_stop_pipeline() {
    let (dispatch, _codec, _conn) = negotiated_dispatch();
    let later_runs = Rc::new(Cell::new(0u32));

    dispatch
        .hook(
            "buggy",
            "S_CHAT",
            DefVersion::Version(S_CHAT_VERSION),
            HookOptions::with_order(0),
            |_input| panic!("module bug"),
        )
        .unwrap();

    let later = Rc::clone(&later_runs);
    dispatch
        .hook(
            "healthy",
            "S_CHAT",
            DefVersion::Version(S_CHAT_VERSION),
            HookOptions::with_order(10),
            move |_input| {
                later.set(later.get() + 1);
                HookOutput::Pass
            },
        )
        .unwrap();

    let data = chat_frame(&[3]);
    assert_eq!(dispatch.handle(data.clone(), true, false), Some(data));
    assert_eq!(later_runs.get(), 1);
}

// ============================================================================
// CODEC FAILURES MID-PIPELINE
// ============================================================================

#[test]
fn test_parse_failure_skips_hook_but_continues() {
    let (dispatch, codec, _conn) = negotiated_dispatch();
    let structured_runs = Rc::new(Cell::new(0u32));
    let raw_runs = Rc::new(Cell::new(0u32));

    let structured = Rc::clone(&structured_runs);
    dispatch
        .hook(
            "structured",
            "S_CHAT",
            DefVersion::Version(S_CHAT_VERSION),
            HookOptions::with_order(0),
            move |_input| {
                structured.set(structured.get() + 1);
                HookOutput::Pass
            },
        )
        .unwrap();

    let raw = Rc::clone(&raw_runs);
    dispatch
        .hook(
            "raw",
            "S_CHAT",
            DefVersion::Raw,
            HookOptions::with_order(10),
            move |_input| {
                raw.set(raw.get() + 1);
                HookOutput::Pass
            },
        )
        .unwrap();

    codec.fail_parse.set(true);
    let data = chat_frame(&[1]);
    let result = dispatch.handle(data.clone(), true, false);

    assert_eq!(result, Some(data));
    assert_eq!(structured_runs.get(), 0, "hook without an event cannot run");
    assert_eq!(raw_runs.get(), 1, "raw hooks are unaffected by parse failures");
}

#[test]
fn test_failed_rewrite_keeps_current_bytes() {
    let (dispatch, codec, _conn) = negotiated_dispatch();
    let observed_modified = Rc::new(Cell::new(false));

    dispatch
        .hook(
            "committer",
            "S_CHAT",
            DefVersion::Version(S_CHAT_VERSION),
            HookOptions::with_order(0),
            |input| {
                if let HookInput::Event { event, .. } = input {
                    event.set("data", Value::Bytes(vec![0xEE]));
                }
                HookOutput::Deliver(true)
            },
        )
        .unwrap();

    let observed = Rc::clone(&observed_modified);
    dispatch
        .hook(
            "observer",
            "S_CHAT",
            DefVersion::Raw,
            HookOptions::with_order(10),
            move |input| {
                if let HookInput::Raw { flags, .. } = input {
                    observed.set(flags.modified);
                }
                HookOutput::Pass
            },
        )
        .unwrap();

    // Parse works, re-serialize fails: the pre-commit bytes stay in play but
    // the modified flag was already raised.
    codec.fail_write.set(true);
    let data = chat_frame(&[0x11]);
    let result = dispatch.handle(data.clone(), true, false);

    assert_eq!(result, Some(data));
    assert!(observed_modified.get());
    assert_eq!(dispatch.metrics().callback_failures, 1);
}

// ============================================================================
// MALFORMED AND UNMATCHED FRAMES
// ============================================================================

#[test]
fn test_frames_without_hooks_flow_untouched() {
    let (dispatch, codec, _conn) = negotiated_dispatch();

    let data = packet_dispatch::core::frame::build(0x7777, &[9, 9]);
    assert_eq!(dispatch.handle(data.clone(), true, false), Some(data));
    assert_eq!(codec.parse_calls.get(), 0);
}

#[test]
fn test_undersized_frame_passes_through() {
    let (dispatch, _codec, _conn) = negotiated_dispatch();
    assert_eq!(dispatch.handle(vec![0x06], true, false), Some(vec![0x06]));
    assert_eq!(dispatch.handle(Vec::new(), true, false), Some(Vec::new()));
}

#[test]
fn test_empty_payload_frame_is_hookable() {
    let (dispatch, _codec, _conn) = negotiated_dispatch();
    let runs = Rc::new(Cell::new(0u32));

    let runs_inner = Rc::clone(&runs);
    dispatch
        .hook(
            "m",
            "S_CHAT",
            DefVersion::Raw,
            HookOptions::default(),
            move |_input| {
                runs_inner.set(runs_inner.get() + 1);
                HookOutput::Pass
            },
        )
        .unwrap();

    let data = chat_frame(&[]);
    assert_eq!(dispatch.handle(data.clone(), true, false), Some(data));
    assert_eq!(runs.get(), 1);
}
