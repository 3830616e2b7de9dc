//! In-memory stand-ins for the host capabilities.

#![allow(dead_code)]

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use luaerror_core::attribution::ContentRegistry;
use luaerror_core::capture::{Introspection, RawSlot};
use luaerror_core::config::HookConfig;
use luaerror_core::dispatch::{PayloadArg, SubscriberHost};
use luaerror_core::error::{HookError, Result};
use luaerror_core::hooks::{DelegateHost, ErrorDelegate, Interceptor};
use luaerror_core::lifecycle::HostBindings;
use luaerror_core::symbols::{Signature, SymbolResolver};
use luaerror_core::types::{Address, AttributionRecord, FunctionInfo, ScriptValue, StackTrace, SubjectId};

pub const REPORTER: Address = Address::new(0x7000_1000);
pub const REPORTER_REPLACEMENT: Address = Address::new(0x5000_1000);
pub const RELAY: Address = Address::new(0x7000_2000);
pub const RELAY_REPLACEMENT: Address = Address::new(0x5000_2000);

/// Interception primitive that records detours in a map.
#[derive(Default)]
pub struct FakeInterceptor
{
    detours: Mutex<HashMap<Address, bool>>,
    rejected: Mutex<Vec<Address>>,
    fail_enable: Mutex<Vec<Address>>,
}

impl FakeInterceptor
{
    pub fn reject(&self, target: Address)
    {
        self.rejected.lock().unwrap().push(target);
    }

    pub fn fail_enable(&self, target: Address)
    {
        self.fail_enable.lock().unwrap().push(target);
    }

    /// Detours created and not destroyed.
    pub fn installed(&self) -> usize
    {
        self.detours.lock().unwrap().len()
    }

    /// Detours currently redirecting calls.
    pub fn active(&self) -> usize
    {
        self.detours.lock().unwrap().values().filter(|active| **active).count()
    }

    pub fn is_active(&self, target: Address) -> bool
    {
        self.detours.lock().unwrap().get(&target).copied().unwrap_or(false)
    }
}

impl Interceptor for FakeInterceptor
{
    fn create(&self, target: Address, _replacement: Address) -> Result<Address>
    {
        if self.rejected.lock().unwrap().contains(&target) {
            return Err(HookError::InterceptRejected {
                target,
                reason: "page is not writable".to_string(),
            });
        }
        let mut detours = self.detours.lock().unwrap();
        if detours.contains_key(&target) {
            return Err(HookError::AlreadyHooked(target));
        }
        detours.insert(target, false);
        Ok(target + 0x0100_0000)
    }

    fn enable(&self, target: Address) -> Result<()>
    {
        if self.fail_enable.lock().unwrap().contains(&target) {
            return Err(HookError::InterceptRejected {
                target,
                reason: "unsupported prologue".to_string(),
            });
        }
        match self.detours.lock().unwrap().get_mut(&target) {
            Some(active) => {
                *active = true;
                Ok(())
            }
            None => Err(HookError::InvalidArgument(format!("no detour at {target}"))),
        }
    }

    fn disable(&self, target: Address) -> Result<()>
    {
        match self.detours.lock().unwrap().get_mut(&target) {
            Some(active) => {
                *active = false;
                Ok(())
            }
            None => Err(HookError::InvalidArgument(format!("no detour at {target}"))),
        }
    }

    fn destroy(&self, target: Address) -> Result<()>
    {
        self.detours
            .lock()
            .unwrap()
            .remove(&target)
            .map(|_| ())
            .ok_or_else(|| HookError::InvalidArgument(format!("no detour at {target}")))
    }
}

/// Resolver answering every query with a fixed address.
pub struct FakeResolver
{
    answer: Option<Address>,
    pub queries: AtomicUsize,
    pub last_image: Mutex<Option<PathBuf>>,
}

impl FakeResolver
{
    pub fn found(address: Address) -> Self
    {
        Self {
            answer: Some(address),
            queries: AtomicUsize::new(0),
            last_image: Mutex::new(None),
        }
    }

    pub fn missing() -> Self
    {
        Self {
            answer: None,
            queries: AtomicUsize::new(0),
            last_image: Mutex::new(None),
        }
    }

    pub fn query_count(&self) -> usize
    {
        self.queries.load(Ordering::SeqCst)
    }
}

impl SymbolResolver for FakeResolver
{
    fn resolve(&self, image: &Path, _signature: &Signature) -> Option<Address>
    {
        self.queries.fetch_add(1, Ordering::SeqCst);
        *self.last_image.lock().unwrap() = Some(image.to_path_buf());
        self.answer
    }
}

/// The host's own callback object; records what reaches it.
#[derive(Default)]
pub struct RecordingDelegate
{
    pub errors: Mutex<Vec<String>>,
    pub prints: Mutex<Vec<(String, bool)>>,
    pub messages: Mutex<Vec<String>>,
}

impl RecordingDelegate
{
    pub fn error_count(&self) -> usize
    {
        self.errors.lock().unwrap().len()
    }
}

impl ErrorDelegate for RecordingDelegate
{
    fn lua_error(&self, message: &str)
    {
        self.errors.lock().unwrap().push(message.to_string());
    }

    fn error_print(&self, message: &str, print: bool)
    {
        self.prints.lock().unwrap().push((message.to_string(), print));
    }

    fn msg(&self, message: &str)
    {
        self.messages.lock().unwrap().push(message.to_string());
    }
}

/// Holder of the callback pointer.
pub struct FakeDelegateHost
{
    current: Mutex<Option<Arc<dyn ErrorDelegate>>>,
    pub swaps: AtomicUsize,
}

impl FakeDelegateHost
{
    pub fn with(delegate: Arc<dyn ErrorDelegate>) -> Self
    {
        Self {
            current: Mutex::new(Some(delegate)),
            swaps: AtomicUsize::new(0),
        }
    }

    pub fn empty() -> Self
    {
        Self {
            current: Mutex::new(None),
            swaps: AtomicUsize::new(0),
        }
    }

    pub fn current(&self) -> Arc<dyn ErrorDelegate>
    {
        self.current.lock().unwrap().clone().expect("no callback object")
    }

    pub fn swap_count(&self) -> usize
    {
        self.swaps.load(Ordering::SeqCst)
    }

    /// Whether the installed object is `delegate` itself.
    pub fn holds(&self, delegate: &Arc<dyn ErrorDelegate>) -> bool
    {
        std::ptr::eq(Arc::as_ptr(&self.current()).cast::<()>(), Arc::as_ptr(delegate).cast::<()>())
    }
}

impl DelegateHost for FakeDelegateHost
{
    fn current_delegate(&self) -> Option<Arc<dyn ErrorDelegate>>
    {
        self.current.lock().unwrap().clone()
    }

    fn set_delegate(&self, delegate: Arc<dyn ErrorDelegate>)
    {
        self.swaps.fetch_add(1, Ordering::SeqCst);
        *self.current.lock().unwrap() = Some(delegate);
    }
}

/// One activation record of the fake runtime.
#[derive(Clone, Default)]
pub struct FakeFrame
{
    pub info: FunctionInfo,
    pub locals: Vec<RawSlot>,
    pub upvalues: Vec<RawSlot>,
}

impl FakeFrame
{
    pub fn lua(name: &str, source: &str, line: i32) -> Self
    {
        Self {
            info: FunctionInfo {
                name: name.to_string(),
                namewhat: "global".to_string(),
                what: "Lua".to_string(),
                source: format!("@{source}"),
                short_src: source.to_string(),
                currentline: line,
                ..FunctionInfo::default()
            },
            ..Self::default()
        }
    }

    pub fn with_local(mut self, name: &str, value: impl Into<ScriptValue>) -> Self
    {
        self.locals.push(RawSlot::new(name, value.into()));
        self
    }

    pub fn with_upvalue(mut self, name: &str, value: impl Into<ScriptValue>) -> Self
    {
        self.upvalues.push(RawSlot::new(name, value.into()));
        self.info.nups += 1;
        self
    }
}

/// Script runtime whose stack is a fixed list of frames, innermost first.
#[derive(Default)]
pub struct FakeRuntime
{
    pub frames: Mutex<Vec<FakeFrame>>,
    pub frame_queries: AtomicUsize,
}

impl FakeRuntime
{
    pub fn with_frames(frames: Vec<FakeFrame>) -> Self
    {
        Self {
            frames: Mutex::new(frames),
            frame_queries: AtomicUsize::new(0),
        }
    }
}

impl Introspection for FakeRuntime
{
    fn frame(&self, level: usize) -> Option<FunctionInfo>
    {
        self.frame_queries.fetch_add(1, Ordering::SeqCst);
        self.frames.lock().unwrap().get(level).map(|frame| frame.info.clone())
    }

    fn local(&self, level: usize, index: usize) -> Option<RawSlot>
    {
        self.frames.lock().unwrap().get(level)?.locals.get(index.checked_sub(1)?).cloned()
    }

    fn upvalue(&self, level: usize, index: usize) -> Option<RawSlot>
    {
        self.frames.lock().unwrap().get(level)?.upvalues.get(index.checked_sub(1)?).cloned()
    }
}

/// What a subscriber call looked like, rendered to strings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedCall
{
    pub args: Vec<String>,
}

pub fn render(arg: &PayloadArg<'_>) -> String
{
    match arg {
        PayloadArg::Absent => "nil".to_string(),
        PayloadArg::Text(text) => text.to_string(),
        PayloadArg::Integer(value) => value.to_string(),
        PayloadArg::Boolean(value) => value.to_string(),
        PayloadArg::Value(value) => value.to_string(),
        PayloadArg::Stack(StackTrace::Frames(frames)) => format!("frames:{}", frames.len()),
        PayloadArg::Stack(StackTrace::Traceback(entries)) => format!("traceback:{}", entries.len()),
    }
}

/// Subscriber table with a configurable verdict.
pub struct FakeSubscribers
{
    pub count: Option<usize>,
    pub verdict: Mutex<std::result::Result<Option<ScriptValue>, String>>,
    pub subject_fails: bool,
    pub calls: Mutex<Vec<RecordedCall>>,
    pub notices: Mutex<Vec<String>>,
    pub count_queries: AtomicUsize,
}

impl FakeSubscribers
{
    pub fn listening(verdict: Option<ScriptValue>) -> Self
    {
        Self {
            count: Some(1),
            verdict: Mutex::new(Ok(verdict)),
            subject_fails: false,
            calls: Mutex::new(Vec::new()),
            notices: Mutex::new(Vec::new()),
            count_queries: AtomicUsize::new(0),
        }
    }

    pub fn nobody() -> Self
    {
        Self {
            count: Some(0),
            ..Self::listening(None)
        }
    }

    pub fn raising(message: &str) -> Self
    {
        let subscribers = Self::listening(None);
        *subscribers.verdict.lock().unwrap() = Err(message.to_string());
        subscribers
    }

    pub fn set_verdict(&self, verdict: Option<ScriptValue>)
    {
        *self.verdict.lock().unwrap() = Ok(verdict);
    }

    pub fn call_count(&self) -> usize
    {
        self.calls.lock().unwrap().len()
    }

    pub fn last_call(&self) -> RecordedCall
    {
        self.calls.lock().unwrap().last().cloned().expect("no subscriber call")
    }
}

impl SubscriberHost for FakeSubscribers
{
    fn subscriber_count(&self, _event: &str) -> Option<usize>
    {
        self.count_queries.fetch_add(1, Ordering::SeqCst);
        self.count
    }

    fn resolve_subject(&self, subject: SubjectId) -> Result<ScriptValue>
    {
        if self.subject_fails {
            return Err(HookError::MissingCapability("the global Entity function"));
        }
        Ok(ScriptValue::Opaque {
            type_name: "Player".to_string(),
            display: format!("Player [{}][Garry]", subject.0),
        })
    }

    fn call_subscribers(&self, args: &[PayloadArg<'_>]) -> Result<Option<ScriptValue>>
    {
        self.calls.lock().unwrap().push(RecordedCall {
            args: args.iter().map(render).collect(),
        });
        self.verdict
            .lock()
            .unwrap()
            .clone()
            .map_err(HookError::SubscriberFault)
    }

    fn notice(&self, message: &str)
    {
        self.notices.lock().unwrap().push(message.to_string());
    }
}

/// Registry mapping exact paths to packages, counting lookups.
#[derive(Default)]
pub struct FakeRegistry
{
    owners: HashMap<String, AttributionRecord>,
    pub lookups: AtomicUsize,
}

impl FakeRegistry
{
    pub fn with_owner(mut self, path: &str, title: &str, id: u64) -> Self
    {
        self.owners.insert(
            path.to_string(),
            AttributionRecord {
                title: title.to_string(),
                id,
            },
        );
        self
    }

    pub fn lookup_count(&self) -> usize
    {
        self.lookups.load(Ordering::SeqCst)
    }
}

impl ContentRegistry for FakeRegistry
{
    fn find_file_owner(&self, path: &str) -> Option<AttributionRecord>
    {
        self.lookups.fetch_add(1, Ordering::SeqCst);
        self.owners.get(path).cloned()
    }
}

/// Every fake wired together, with handles kept for assertions.
pub struct Host
{
    pub interceptor: Arc<FakeInterceptor>,
    pub resolver: Arc<FakeResolver>,
    pub original: Arc<RecordingDelegate>,
    pub delegates: Arc<FakeDelegateHost>,
    pub runtime: Arc<FakeRuntime>,
    pub subscribers: Arc<FakeSubscribers>,
    pub registry: Arc<FakeRegistry>,
}

impl Host
{
    pub fn new(subscribers: FakeSubscribers) -> Self
    {
        let original = Arc::new(RecordingDelegate::default());
        Self {
            interceptor: Arc::new(FakeInterceptor::default()),
            resolver: Arc::new(FakeResolver::found(RELAY)),
            delegates: Arc::new(FakeDelegateHost::with(original.clone())),
            original,
            runtime: Arc::new(FakeRuntime::with_frames(vec![
                FakeFrame::lua("explode", "addons/cool/lua/autorun/init.lua", 12).with_local("ply", "Garry"),
                FakeFrame::lua("main", "addons/cool/lua/autorun/init.lua", 40),
            ])),
            subscribers: Arc::new(subscribers),
            registry: Arc::new(FakeRegistry::default().with_owner(
                "addons/cool/lua/autorun/init.lua",
                "Cool Addon",
                2_837_464_823,
            )),
        }
    }

    pub fn bindings(&self) -> HostBindings
    {
        HostBindings {
            interceptor: self.interceptor.clone(),
            resolver: self.resolver.clone(),
            delegates: self.delegates.clone(),
            runtime: self.runtime.clone(),
            subscribers: Some(self.subscribers.clone()),
            registry: Some(self.registry.clone()),
            reporter: Some(REPORTER),
            reporter_replacement: REPORTER_REPLACEMENT,
            relay_replacement: RELAY_REPLACEMENT,
        }
    }

    pub fn original_delegate(&self) -> Arc<dyn ErrorDelegate>
    {
        self.original.clone()
    }
}

/// Config pinned to a fixed image and signature so tests do not depend on
/// the platform they run on.
pub fn test_config() -> HookConfig
{
    HookConfig::default()
        .with_server_binary("garrysmod/bin/server_srv.so")
        .with_relay_signature(Signature::parse("@_Z20HandleClientLuaErrorP11CBasePlayerPKc").expect("valid signature"))
}
