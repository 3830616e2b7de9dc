//! End-to-end tests of the error events produced by the hooks

mod common;

use std::cell::Cell;

use common::{test_config, FakeSubscribers, Host};
use luaerror_core::lifecycle::ErrorHooks;
use luaerror_core::types::{ScriptValue, SubjectId};

const RUNTIME_ERROR: &str = "addons/cool/lua/autorun/init.lua:12: attempt to index a nil value";

fn initialized(host: &Host) -> ErrorHooks
{
    ErrorHooks::initialize(host.bindings(), test_config()).expect("initialize")
}

/// What the host does for a runtime error: report, then deliver.
fn raise_runtime_error(host: &Host, hooks: &ErrorHooks, message: &str)
{
    hooks.on_runtime_error(Some(message), || ());
    host.delegates.current().lua_error(message);
}

#[test]
fn test_runtime_error_event()
{
    let host = Host::new(FakeSubscribers::listening(None));
    let hooks = initialized(&host);
    assert!(hooks.set_runtime_capture(true));

    raise_runtime_error(&host, &hooks, RUNTIME_ERROR);

    let call = host.subscribers.last_call();
    assert_eq!(call.args[0], "LuaError");
    assert_eq!(call.args[1], "true");
    assert_eq!(call.args[2], RUNTIME_ERROR);
    assert_eq!(call.args[3], "addons/cool/lua/autorun/init.lua");
    assert_eq!(call.args[4], "12");
    assert_eq!(call.args[5], "attempt to index a nil value");
    assert_eq!(call.args[6], "frames:2");
    assert_eq!(call.args[7], "Cool Addon");
    assert_eq!(call.args[8], "2837464823");
    // Default handling still ran
    assert_eq!(*host.original.errors.lock().unwrap(), vec![RUNTIME_ERROR.to_string()]);
}

#[test]
fn test_runtime_error_suppressed()
{
    let host = Host::new(FakeSubscribers::listening(Some(ScriptValue::Boolean(true))));
    let hooks = initialized(&host);
    hooks.set_runtime_capture(true);

    raise_runtime_error(&host, &hooks, RUNTIME_ERROR);

    assert_eq!(host.subscribers.call_count(), 1);
    assert_eq!(host.original.error_count(), 0);
}

#[test]
fn test_reporter_always_runs_original()
{
    let host = Host::new(FakeSubscribers::listening(Some(ScriptValue::Boolean(true))));
    let hooks = initialized(&host);
    hooks.set_runtime_capture(true);
    assert_eq!(hooks.on_runtime_error(None, || 5), 5);
}

#[test]
fn test_compile_error_captures_live_stack()
{
    let host = Host::new(FakeSubscribers::listening(None));
    let hooks = initialized(&host);
    hooks.set_compile_capture(true);

    host.delegates
        .current()
        .lua_error("addons/cool/lua/autorun/init.lua:3: '=' expected near 'x'");

    let call = host.subscribers.last_call();
    assert_eq!(call.args[5], "'=' expected near 'x'");
    assert_eq!(call.args[6], "frames:2");
    assert_eq!(host.original.error_count(), 1);
}

#[test]
fn test_compile_error_dispatched_when_only_runtime_enabled()
{
    let host = Host::new(FakeSubscribers::listening(None));
    let hooks = initialized(&host);
    hooks.set_runtime_capture(true);

    // Delivered without a preceding report
    host.delegates.current().lua_error("x.lua:1: unexpected symbol");

    let call = host.subscribers.last_call();
    assert_eq!(call.args[1], "false");
    assert_eq!(call.args[2], "x.lua:1: unexpected symbol");
    assert_eq!(host.original.error_count(), 1);
}

#[test]
fn test_switch_filter_skips_compile_error_when_only_runtime_enabled()
{
    let host = Host::new(FakeSubscribers::listening(Some(ScriptValue::Boolean(true))));
    let hooks = ErrorHooks::initialize(host.bindings(), test_config().with_switch_filter(true)).expect("initialize");
    hooks.set_runtime_capture(true);

    host.delegates.current().lua_error("x.lua:1: unexpected symbol");

    assert_eq!(host.subscribers.call_count(), 0);
    assert_eq!(host.original.error_count(), 1);
}

#[test]
fn test_runtime_event_uses_reported_message()
{
    let host = Host::new(FakeSubscribers::listening(None));
    let hooks = initialized(&host);
    hooks.set_runtime_capture(true);

    hooks.on_runtime_error(Some("addons/cool/lua/autorun/init.lua:12: attempt to call a nil value"), || ());
    host.delegates.current().lua_error("something went wrong");

    let call = host.subscribers.last_call();
    assert_eq!(call.args[1], "true");
    assert_eq!(call.args[2], "addons/cool/lua/autorun/init.lua:12: attempt to call a nil value");
    assert_eq!(call.args[3], "addons/cool/lua/autorun/init.lua");
    assert_eq!(call.args[4], "12");
    assert_eq!(call.args[5], "attempt to call a nil value");
    assert_eq!(call.args[7], "Cool Addon");
    // The host's own handler still sees what it delivered
    assert_eq!(*host.original.errors.lock().unwrap(), vec!["something went wrong".to_string()]);
}

#[test]
fn test_runtime_event_without_reported_text_uses_delivered_message()
{
    let host = Host::new(FakeSubscribers::listening(None));
    let hooks = initialized(&host);
    hooks.set_runtime_capture(true);

    hooks.on_runtime_error(None, || ());
    host.delegates.current().lua_error(RUNTIME_ERROR);

    let call = host.subscribers.last_call();
    assert_eq!(call.args[1], "true");
    assert_eq!(call.args[2], RUNTIME_ERROR);
    assert_eq!(call.args[6], "frames:2");
}

#[test]
fn test_bridged_context_used_once()
{
    let host = Host::new(FakeSubscribers::listening(None));
    let hooks = initialized(&host);
    hooks.set_runtime_capture(true);
    hooks.set_compile_capture(true);

    raise_runtime_error(&host, &hooks, RUNTIME_ERROR);
    host.runtime.frames.lock().unwrap().truncate(1);
    // Next delivery has no report in front of it, so it is compile-time and
    // gets the live (shorter) stack instead of the stale one
    host.delegates.current().lua_error("b.lua:2: oops");

    let calls = host.subscribers.calls.lock().unwrap();
    assert_eq!(calls.len(), 2);
    assert_eq!(calls[0].args[6], "frames:2");
    assert_eq!(calls[1].args[6], "frames:1");
}

#[test]
fn test_disabling_runtime_capture_drops_pending_context()
{
    let host = Host::new(FakeSubscribers::listening(None));
    let hooks = initialized(&host);
    hooks.set_runtime_capture(true);
    hooks.set_compile_capture(true);

    hooks.on_runtime_error(Some(RUNTIME_ERROR), || ());
    hooks.set_runtime_capture(false);
    host.runtime.frames.lock().unwrap().clear();
    host.delegates.current().lua_error(RUNTIME_ERROR);

    assert_eq!(host.subscribers.last_call().args[6], "frames:0");
}

#[test]
fn test_no_subscribers_skips_capture()
{
    let host = Host::new(FakeSubscribers::nobody());
    let hooks = initialized(&host);
    hooks.set_compile_capture(true);

    host.delegates.current().lua_error("x.lua:1: boom");

    assert_eq!(host.original.error_count(), 1);
    assert_eq!(host.runtime.frame_queries.load(std::sync::atomic::Ordering::SeqCst), 0);
}

#[test]
fn test_wrapper_forwards_other_callbacks()
{
    let host = Host::new(FakeSubscribers::listening(None));
    let hooks = initialized(&host);
    hooks.set_compile_capture(true);

    let current = host.delegates.current();
    current.msg("hello\n");
    current.error_print("bad thing", true);

    assert_eq!(*host.original.messages.lock().unwrap(), vec!["hello\n".to_string()]);
    assert_eq!(*host.original.prints.lock().unwrap(), vec![("bad thing".to_string(), true)]);
}

#[test]
fn test_client_error_event()
{
    let host = Host::new(FakeSubscribers::listening(None));
    let hooks = initialized(&host);
    hooks.set_server_error_relay(true).unwrap();

    let ran = Cell::new(0);
    let result = hooks.on_client_error(
        SubjectId(2),
        "[ERROR] addons/cool/lua/autorun/init.lua:12: attempt to index a nil value\n  1. explode - addons/cool/lua/autorun/init.lua:12\n   2. unknown - addons/cool/lua/autorun/init.lua:40\n",
        || ran.set(ran.get() + 1),
    );
    assert!(result.is_some());
    assert_eq!(ran.get(), 1);

    let call = host.subscribers.last_call();
    assert_eq!(call.args[0], "ClientLuaError");
    assert_eq!(call.args[1], "Player [2][Garry]");
    assert!(call.args[2].starts_with("addons/cool/lua/autorun/init.lua:12:"));
    assert_eq!(call.args[4], "12");
    assert_eq!(call.args[6], "traceback:2");
    assert_eq!(call.args[8], "2837464823");
}

#[test]
fn test_client_error_suppressed()
{
    let host = Host::new(FakeSubscribers::listening(Some(true.into())));
    let hooks = initialized(&host);

    let ran = Cell::new(false);
    assert!(hooks.on_client_error(SubjectId(2), "x.lua:1: y", || ran.set(true)).is_none());
    assert!(!ran.get());
}

#[test]
fn test_client_error_with_unresolvable_subject_runs_original()
{
    let host = Host::new(FakeSubscribers {
        subject_fails: true,
        ..FakeSubscribers::listening(Some(true.into()))
    });
    let hooks = initialized(&host);

    let ran = Cell::new(false);
    assert!(hooks.on_client_error(SubjectId(2), "x.lua:1: y", || ran.set(true)).is_some());
    assert!(ran.get());
    assert_eq!(host.subscribers.notices.lock().unwrap().len(), 1);
}
