//! # t81vm
//!
//! A deterministic register-based virtual machine for the TISC
//! ("ternary instruction set, core") opcode family: tagged registers,
//! segmented linear memory, append-only handle pools, a static
//! validator, and a trap pipeline that turns every illegal operation
//! into a typed, inspectable fault.
//!
//! `core::state::State` is the machine; `core::interpreter` dispatches
//! one `core::program::Insn` per `State::step`. `format` parses programs
//! from text or JSON; `ffi` exposes the same operations as a C ABI.

pub mod core;
pub mod ffi;
pub mod format;

pub use core::loader::load_program;
pub use core::opcode::Opcode;
pub use core::program::{Insn, Program};
pub use core::state::State;
pub use core::summary::{snapshot_summary, state_hash};
pub use core::trap::Trap;
