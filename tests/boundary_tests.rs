//! Boundary cases called out explicitly in the design notes.

mod common;

use common::{insn, load, prog, prog_with_policy};
use t81vm::core::opcode::Opcode;
use t81vm::core::trap::Trap;
use t81vm::core::validator::validate_program;

#[test]
fn write_to_last_memory_cell_succeeds_next_cell_traps() {
    let program = prog(vec![
        insn(Opcode::LoadImm, 0, 99, 0),
        insn(Opcode::Store, 2, 0, 0),
        insn(Opcode::Halt, 0, 0, 0),
    ]);
    let mut state = load(&program);
    let last = state.memory.len() - 1;

    state.program.insns[1].a = last as i64;
    state.step().unwrap();
    state.step().unwrap();
    assert_eq!(state.memory[last], 99);

    let program2 = prog(vec![
        insn(Opcode::LoadImm, 0, 99, 0),
        insn(Opcode::Store, 2, 0, 0),
        insn(Opcode::Halt, 0, 0, 0),
    ]);
    let mut state2 = load(&program2);
    let past_end = state2.memory.len() as i64;
    state2.program.insns[1].a = past_end;
    state2.step().unwrap();
    let err = state2.step().unwrap_err();
    assert_eq!(err, Trap::BoundsFault);
}

#[test]
fn stack_alloc_exact_fit_succeeds_one_more_overflows() {
    let program = prog(vec![insn(Opcode::Halt, 0, 0, 0)]);
    let mut state = load(&program);
    let exact = (state.layout.stack.limit - state.layout.stack.start) as i64;

    state.program.insns = vec![insn(Opcode::StackAlloc, 0, exact, 0), insn(Opcode::Halt, 0, 0, 0)];
    assert!(state.step().is_ok());
    assert_eq!(state.sp, state.layout.stack.start);

    let mut overflow_state = load(&prog(vec![insn(Opcode::Halt, 0, 0, 0)]));
    overflow_state.program.insns = vec![insn(Opcode::StackAlloc, 0, exact + 1, 0), insn(Opcode::Halt, 0, 0, 0)];
    let err = overflow_state.step().unwrap_err();
    assert_eq!(err, Trap::StackFault);
}

#[test]
fn heap_alloc_until_exhausted_then_traps_bounds_fault() {
    let program = prog(vec![insn(Opcode::Halt, 0, 0, 0)]);
    let mut state = load(&program);
    let heap_size = (state.layout.heap.limit - state.layout.heap.start) as i64;

    state.program.insns = vec![insn(Opcode::HeapAlloc, 0, heap_size, 0), insn(Opcode::Halt, 0, 0, 0)];
    assert!(state.step().is_ok());
    assert_eq!(state.heap_ptr, state.layout.heap.limit);

    state.program.insns.insert(1, insn(Opcode::HeapAlloc, 1, 1, 0));
    let err = state.step().unwrap_err();
    assert_eq!(err, Trap::BoundsFault);
}

#[test]
fn validator_rejects_jump_to_code_limit_accepts_limit_minus_one() {
    let accepted = prog(vec![
        insn(Opcode::Jump, 1, 0, 0),
        insn(Opcode::Halt, 0, 0, 0),
    ]);
    assert_eq!(validate_program(&accepted), None);

    let rejected = prog(vec![
        insn(Opcode::Jump, 2, 0, 0),
        insn(Opcode::Halt, 0, 0, 0),
    ]);
    assert_eq!(validate_program(&rejected), Some(Trap::DecodeFault));
}

#[test]
fn register_242_is_valid_243_decode_faults() {
    let ok = prog(vec![insn(Opcode::LoadImm, 242, 1, 0), insn(Opcode::Halt, 0, 0, 0)]);
    assert_eq!(validate_program(&ok), None);

    let bad = prog(vec![insn(Opcode::LoadImm, 243, 1, 0), insn(Opcode::Halt, 0, 0, 0)]);
    assert_eq!(validate_program(&bad), Some(Trap::DecodeFault));

    let state = load(&bad);
    assert_eq!(state.preload_trap, Some(Trap::DecodeFault));
}

#[test]
fn tsoftmax_of_single_zero_is_one_thousand() {
    let program = prog_with_policy(vec![insn(Opcode::Halt, 0, 0, 0)], "(tier 2)");
    let mut state = load(&program);
    state.tensor_pool.push(t81vm::core::value::Tensor { shape: vec![1], data: vec![0] });
    state.registers[0] = 1;
    state.register_tags[0] = t81vm::core::value::ValueTag::TensorHandle;

    let op = insn(Opcode::TSoftmax, 1, 0, 0);
    state.program.insns = vec![op, insn(Opcode::Halt, 0, 0, 0)];
    state.step().unwrap();

    assert_eq!(state.register_tags[1], t81vm::core::value::ValueTag::TensorHandle);
    let handle = state.registers[1] as usize;
    assert_eq!(state.tensor_pool[handle - 1].data, vec![1000]);
}
