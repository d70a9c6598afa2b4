//! Turn a `Program` into a fresh `State`.
//!
//! Loading never fails. Layout sizing and `POLICY` parsing are pure and
//! total; the one thing that can go wrong — an invalid instruction
//! stream — is validated here but stashed as `State::preload_trap`
//! rather than returned, so the loader's signature stays infallible and
//! the first `step()` is what surfaces the fault.

use crate::core::memory::{
    MemoryLayout, Segment, DEFAULT_HEAP_SIZE, DEFAULT_META_SIZE, DEFAULT_STACK_SIZE,
    DEFAULT_TENSOR_SIZE,
};
use crate::core::program::Program;
use crate::core::state::{Flags, State, REGISTER_COUNT};
use crate::core::validator::validate_program;
use crate::core::value::{Policy, ValueTag};

/// Extract the `(tier N)` clause from a raw `POLICY` directive, if
/// present. Reproduces the original engine's `\(tier\s+([0-9]+)\)` regex
/// without pulling in a regex dependency: the literal `(tier` prefix,
/// mandatory whitespace, one or more digits, and a closing `)` are all
/// required, in that order.
fn parse_policy(text: &str) -> Option<Policy> {
    for (idx, _) in text.match_indices("(tier") {
        let rest = &text[idx + "(tier".len()..];
        if let Some(tier) = parse_tier_clause(rest) {
            return Some(Policy { tier });
        }
    }
    None
}

/// `rest` is the text immediately after a `(tier` match. Consumes
/// mandatory whitespace, then digits, then requires a closing `)`.
fn parse_tier_clause(rest: &str) -> Option<u32> {
    let mut ws_end = 0;
    for (i, c) in rest.char_indices() {
        if c.is_whitespace() {
            ws_end = i + c.len_utf8();
        } else {
            break;
        }
    }
    if ws_end == 0 {
        return None;
    }
    let after_ws = &rest[ws_end..];
    let digits_end = after_ws.find(|c: char| !c.is_ascii_digit()).unwrap_or(after_ws.len());
    if digits_end == 0 {
        return None;
    }
    if !after_ws[digits_end..].starts_with(')') {
        return None;
    }
    after_ws[..digits_end].parse().ok()
}

/// Build a fresh `State` for `program`. Segment sizes follow the
/// documented defaults; Code is sized exactly to the instruction count.
pub fn load_program(program: &Program) -> State {
    let code = Segment { start: 0, limit: program.len() };
    let stack = Segment {
        start: code.limit,
        limit: code.limit + DEFAULT_STACK_SIZE,
    };
    let heap = Segment {
        start: stack.limit,
        limit: stack.limit + DEFAULT_HEAP_SIZE,
    };
    let tensor = Segment {
        start: heap.limit,
        limit: heap.limit + DEFAULT_TENSOR_SIZE,
    };
    let meta = Segment {
        start: tensor.limit,
        limit: tensor.limit + DEFAULT_META_SIZE,
    };
    let layout = MemoryLayout { code, stack, heap, tensor, meta };

    let policy = program.axion_policy_text.as_deref().and_then(parse_policy);
    let preload_trap = validate_program(program);

    State {
        pc: 0,
        halted: false,
        registers: [0; REGISTER_COUNT],
        register_tags: [ValueTag::Int; REGISTER_COUNT],
        flags: Flags::default(),
        memory: vec![0; layout.total_size()],
        layout,
        sp: stack.limit,
        heap_ptr: heap.start,
        stack_frames: Vec::new(),
        heap_frames: Vec::new(),
        call_stack: Vec::new(),
        tensor_pool: Vec::new(),
        shape_pool: Vec::new(),
        option_pool: Vec::new(),
        result_pool: Vec::new(),
        enum_pool: Vec::new(),
        trace: Vec::new(),
        axion_log: Vec::new(),
        last_trap_payload: None,
        policy,
        gc_cycles: 0,
        steps: 0,
        preload_trap,
        program: program.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::opcode::Opcode;
    use crate::core::program::Insn;

    #[test]
    fn lays_out_segments_contiguously_with_defaults() {
        let program = Program {
            insns: vec![
                Insn { opcode: Opcode::Nop, a: 0, b: 0, c: 0 },
                Insn { opcode: Opcode::Halt, a: 0, b: 0, c: 0 },
            ],
            axion_policy_text: None,
        };
        let state = load_program(&program);
        assert_eq!(state.layout.code, Segment { start: 0, limit: 2 });
        assert_eq!(state.layout.stack, Segment { start: 2, limit: 2 + 256 });
        assert_eq!(state.layout.heap, Segment { start: 258, limit: 258 + 768 });
        assert_eq!(state.layout.tensor, Segment { start: 1026, limit: 1026 + 256 });
        assert_eq!(state.layout.meta, Segment { start: 1282, limit: 1282 + 256 });
        assert_eq!(state.sp, state.layout.stack.limit);
        assert_eq!(state.heap_ptr, state.layout.heap.start);
        assert_eq!(state.preload_trap, None);
    }

    #[test]
    fn parses_tier_from_policy_text() {
        let program = Program {
            insns: vec![Insn { opcode: Opcode::Halt, a: 0, b: 0, c: 0 }],
            axion_policy_text: Some("axion guard (tier 0) enforced".to_string()),
        };
        let state = load_program(&program);
        assert_eq!(state.policy, Some(Policy { tier: 0 }));
    }

    #[test]
    fn invalid_program_defers_trap_to_preload() {
        use crate::core::trap::Trap;
        let program = Program {
            insns: vec![Insn { opcode: Opcode::LoadImm, a: 9999, b: 1, c: 0 }],
            axion_policy_text: None,
        };
        let state = load_program(&program);
        assert_eq!(state.preload_trap, Some(Trap::DecodeFault));
        assert!(!state.halted);
    }
}
