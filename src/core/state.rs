//! The VM state container.
//!
//! `State` is a flat struct of fields, not an opaque object behind an
//! "engine" wrapper: every piece of machine state is a public field, and
//! `step`/`run_to_halt` are inherent methods directly on it. Embedders and
//! tests read and, within the documented contract, write these fields
//! directly.

use crate::core::memory::MemoryLayout;
use crate::core::program::Program;
use crate::core::trap::{Trap, TraceEntry, TrapPayload};
use crate::core::value::{AxionLogEntry, EnumValue, OptionValue, Policy, ResultValue, Shape, Tensor, ValueTag};

/// Number of addressable registers. Register indices `0..REGISTER_COUNT`
/// are valid; `REGISTER_COUNT` and above fail validation.
pub const REGISTER_COUNT: usize = 243;

/// A program counter crossing this many steps increments `gc_cycles`.
pub const GC_INTERVAL: u64 = 64;

/// The `{zero, negative, positive}` condition flags. At most one is set
/// after any arithmetic, comparison, or load operation; all other
/// opcodes leave flags untouched.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Flags {
    pub zero: bool,
    pub negative: bool,
    pub positive: bool,
}

impl Flags {
    pub fn from_value(v: i64) -> Flags {
        Flags {
            zero: v == 0,
            negative: v < 0,
            positive: v > 0,
        }
    }
}

/// The complete machine state: registers, memory, handle pools, call and
/// frame stacks, trace, axion log, and bookkeeping counters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct State {
    pub pc: usize,
    pub halted: bool,

    pub registers: [i64; REGISTER_COUNT],
    pub register_tags: [ValueTag; REGISTER_COUNT],
    pub flags: Flags,

    pub memory: Vec<i64>,
    pub layout: MemoryLayout,

    pub sp: usize,
    pub heap_ptr: usize,
    /// `(start, size)` frames pushed by `StackAlloc`, popped in LIFO order
    /// by `StackFree`.
    pub stack_frames: Vec<(usize, usize)>,
    /// `(start, size)` blocks allocated by `HeapAlloc`, freed in LIFO
    /// order by `HeapFree`.
    pub heap_frames: Vec<(usize, usize)>,
    /// Return addresses pushed by `Call`, popped by `Ret`.
    pub call_stack: Vec<usize>,

    pub tensor_pool: Vec<Tensor>,
    pub shape_pool: Vec<Shape>,
    pub option_pool: Vec<OptionValue>,
    pub result_pool: Vec<ResultValue>,
    pub enum_pool: Vec<EnumValue>,

    pub trace: Vec<TraceEntry>,
    pub axion_log: Vec<AxionLogEntry>,
    pub last_trap_payload: Option<TrapPayload>,
    pub policy: Option<Policy>,

    pub gc_cycles: u64,
    pub steps: u64,

    /// A validation failure detected at load time, deferred here so
    /// `core::loader::load_program` never itself returns an error. The
    /// first call to `step` surfaces it and halts the machine.
    pub preload_trap: Option<Trap>,

    pub program: Program,
}

// `State::load_program`, `State::set_register`, `State::step`, and
// `State::run_to_halt` are implemented in `core::interpreter`, which is
// also where the opcode dispatch table lives.
