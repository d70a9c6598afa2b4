//! C ABI embedding wrapper.
//!
//! An opaque handle plus `extern "C"` functions, forwarding every
//! operation to `core::state::State`. This is the thinnest possible
//! shell: no opcode semantics live here, only marshalling between Rust
//! and C-compatible types.

use std::ffi::CStr;
use std::os::raw::c_char;
use std::path::Path;

use crate::core::state::State;
use crate::core::trap::Trap;
use crate::format::{load_program_from_file, LoadError};

/// The positive `Trap` code surfaced across the FFI boundary: the
/// enum's discriminant plus one, so `0` is reserved for "no trap" /
/// success and every trap value is strictly positive (§7: "the
/// positive integer value of the enum"). `t81vm_step`,
/// `t81vm_run_to_halt`, `t81vm_last_trap`, and `t81vm_trace_get` all
/// use this same encoding.
fn trap_code(trap: Trap) -> i32 {
    trap.as_u64() as i32 + 1
}

/// An opaque VM instance. Owns exactly one `State`; external code must
/// not reach into it except through the functions below.
pub struct T81VmHandle {
    state: State,
}

/// Create a fresh, unloaded VM instance. The returned pointer must be
/// freed with `t81vm_destroy`.
#[no_mangle]
pub extern "C" fn t81vm_create() -> *mut T81VmHandle {
    // An empty program validates trivially and traps `DecodeFault` on its
    // first step via the `pc >= code.limit` guard, until a real program
    // is loaded with `t81vm_load_file`.
    let state = crate::core::loader::load_program(&crate::core::program::Program::default());
    Box::into_raw(Box::new(T81VmHandle { state }))
}

/// Destroy a VM instance created by `t81vm_create`.
///
/// # Safety
/// `handle` must be a pointer returned by `t81vm_create` and not
/// previously destroyed.
#[no_mangle]
pub unsafe extern "C" fn t81vm_destroy(handle: *mut T81VmHandle) {
    if !handle.is_null() {
        drop(Box::from_raw(handle));
    }
}

/// Load a program from a file path into `handle`. Returns `0` on
/// success, `-1` for a null/invalid argument, `-2` for an I/O or parse
/// failure, or the positive `Trap` code of a validation failure
/// surfaced as a preload trap on the next step (loading itself never
/// fails on a bad program — see `core::loader`).
///
/// # Safety
/// `handle` must be a live pointer from `t81vm_create`; `path` must be a
/// valid, NUL-terminated C string.
#[no_mangle]
pub unsafe extern "C" fn t81vm_load_file(handle: *mut T81VmHandle, path: *const c_char) -> i32 {
    if handle.is_null() || path.is_null() {
        return -1;
    }
    let path_str = match CStr::from_ptr(path).to_str() {
        Ok(s) => s,
        Err(_) => return -1,
    };
    match load_program_from_file(Path::new(path_str)) {
        Ok(program) => {
            (*handle).state.load_program(&program);
            0
        }
        Err(LoadError::Io(_)) | Err(LoadError::Parse(_)) => -2,
    }
}

/// Step the VM once. Returns `0` on success or the positive `Trap` code.
///
/// # Safety
/// `handle` must be a live pointer from `t81vm_create`.
#[no_mangle]
pub unsafe extern "C" fn t81vm_step(handle: *mut T81VmHandle) -> i32 {
    if handle.is_null() {
        return -1;
    }
    match (*handle).state.step() {
        Ok(()) => 0,
        Err(trap) => trap_code(trap),
    }
}

/// Run until halted or `max_steps` is exhausted. Same return convention
/// as `t81vm_step`.
///
/// # Safety
/// `handle` must be a live pointer from `t81vm_create`.
#[no_mangle]
pub unsafe extern "C" fn t81vm_run_to_halt(handle: *mut T81VmHandle, max_steps: u64) -> i32 {
    if handle.is_null() {
        return -1;
    }
    match (*handle).state.run_to_halt(max_steps) {
        Ok(()) => 0,
        Err(trap) => trap_code(trap),
    }
}

/// The most recent trap code, or `-1` if none is pending. Uses the same
/// positive encoding as `t81vm_step`/`t81vm_run_to_halt`, so a caller can
/// compare this directly against what `step` just returned.
///
/// # Safety
/// `handle` must be a live pointer from `t81vm_create`.
#[no_mangle]
pub unsafe extern "C" fn t81vm_last_trap(handle: *const T81VmHandle) -> i32 {
    if handle.is_null() {
        return -1;
    }
    match &(*handle).state.last_trap_payload {
        Some(payload) => trap_code(payload.trap),
        None => -1,
    }
}

/// The current program counter.
///
/// # Safety
/// `handle` must be a live pointer from `t81vm_create`.
#[no_mangle]
pub unsafe extern "C" fn t81vm_pc(handle: *const T81VmHandle) -> u64 {
    if handle.is_null() {
        return 0;
    }
    (*handle).state.pc as u64
}

/// `1` if the VM is halted, `0` otherwise.
///
/// # Safety
/// `handle` must be a live pointer from `t81vm_create`.
#[no_mangle]
pub unsafe extern "C" fn t81vm_halted(handle: *const T81VmHandle) -> i32 {
    if handle.is_null() {
        return 0;
    }
    (*handle).state.halted as i32
}

/// The canonical FNV-1a state digest.
///
/// # Safety
/// `handle` must be a live pointer from `t81vm_create`.
#[no_mangle]
pub unsafe extern "C" fn t81vm_state_hash(handle: *const T81VmHandle) -> u64 {
    if handle.is_null() {
        return 0;
    }
    crate::core::summary::state_hash(&(*handle).state)
}

/// Read register `index`. Returns `0` for an out-of-range index.
///
/// # Safety
/// `handle` must be a live pointer from `t81vm_create`.
#[no_mangle]
pub unsafe extern "C" fn t81vm_register(handle: *const T81VmHandle, index: u64) -> i64 {
    if handle.is_null() {
        return 0;
    }
    let state = &(*handle).state;
    if (index as usize) < state.registers.len() {
        state.registers[index as usize]
    } else {
        0
    }
}

/// Number of entries recorded in the execution trace so far.
///
/// # Safety
/// `handle` must be a live pointer from `t81vm_create`.
#[no_mangle]
pub unsafe extern "C" fn t81vm_trace_len(handle: *const T81VmHandle) -> u64 {
    if handle.is_null() {
        return 0;
    }
    (*handle).state.trace.len() as u64
}

/// A trace entry copied out for embedders: `pc`, the opcode byte, and a
/// signed trap code (`-1` when the step did not trap, otherwise the same
/// positive encoding `t81vm_last_trap` uses).
#[repr(C)]
pub struct T81TraceEntry {
    pub pc: u64,
    pub opcode: u8,
    pub trap: i32,
}

/// Copy out trace entry `index`. Returns `false` if `index` is out of
/// range.
///
/// # Safety
/// `handle` must be a live pointer from `t81vm_create`; `out` must be a
/// valid pointer to a `T81TraceEntry`.
#[no_mangle]
pub unsafe extern "C" fn t81vm_trace_get(handle: *const T81VmHandle, index: u64, out: *mut T81TraceEntry) -> bool {
    if handle.is_null() || out.is_null() {
        return false;
    }
    let trace = &(*handle).state.trace;
    match trace.get(index as usize) {
        Some(entry) => {
            *out = T81TraceEntry {
                pc: entry.pc as u64,
                opcode: entry.opcode.as_u64() as u8,
                trap: entry.trap.map(trap_code).unwrap_or(-1),
            };
            true
        }
        None => false,
    }
}
