//! Stack frame types.

use smallvec::SmallVec;

use super::ScriptValue;

/// One named slot (local or upvalue) of a frame.
#[derive(Debug, Clone, PartialEq)]
pub struct NamedSlot
{
    /// Variable name as reported by the runtime.
    pub name: String,
    /// Value at capture time.
    pub value: ScriptValue,
}

/// Ordered name → value mapping, in the order the runtime enumerated the slots.
///
/// Names are not deduplicated: shadowed locals legitimately share a name and
/// both are kept.
pub type SlotMap = SmallVec<[NamedSlot; 4]>;

/// Function identity metadata for one activation record.
///
/// Field names follow the runtime's debug record. Strings the runtime leaves
/// unset are captured as empty strings.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FunctionInfo
{
    /// Best-effort function name.
    pub name: String,
    /// How the name was found (`global`, `local`, `method`, `field`, ...).
    pub namewhat: String,
    /// Function kind (`Lua`, `C`, `main`, `tail`).
    pub what: String,
    /// Declaring chunk name.
    pub source: String,
    /// Printable version of `source`.
    pub short_src: String,
    /// Line currently executing, `-1` when unavailable.
    pub currentline: i32,
    /// First line of the function definition.
    pub linedefined: i32,
    /// Last line of the function definition.
    pub lastlinedefined: i32,
    /// Number of upvalues.
    pub nups: u32,
    /// Hook event code of the record.
    pub event: i32,
}

/// Captured stack frame.
#[derive(Debug, Clone, PartialEq)]
pub struct StackFrame
{
    /// Nesting level, 1-based, innermost = 1.
    pub level: usize,
    /// Function identity metadata.
    pub function: FunctionInfo,
    /// Named locals, `None` when the frame has no named local.
    pub locals: Option<SlotMap>,
    /// Named upvalues, `None` when the frame has no named upvalue.
    pub upvalues: Option<SlotMap>,
}

impl StackFrame
{
    /// Look up the first local with the given name.
    pub fn local(&self, name: &str) -> Option<&ScriptValue>
    {
        find_slot(self.locals.as_ref(), name)
    }

    /// Look up the first upvalue with the given name.
    pub fn upvalue(&self, name: &str) -> Option<&ScriptValue>
    {
        find_slot(self.upvalues.as_ref(), name)
    }
}

fn find_slot<'a>(slots: Option<&'a SlotMap>, name: &str) -> Option<&'a ScriptValue>
{
    slots?.iter().find(|slot| slot.name == name).map(|slot| &slot.value)
}

/// One entry of a textual traceback embedded in an error message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TracebackEntry
{
    /// Level exactly as written in the message.
    pub level: i64,
    /// Function name token.
    pub name: String,
    /// Source path.
    pub source: String,
    /// Line in `source`.
    pub currentline: i64,
}
