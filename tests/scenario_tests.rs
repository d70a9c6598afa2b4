//! The literal end-to-end scenarios from the design notes, reproduced
//! exactly.

mod common;

use common::{insn, load, prog, prog_with_policy};
use t81vm::core::opcode::Opcode;
use t81vm::core::trap::Trap;
use t81vm::core::value::{Tensor, ValueTag};

#[test]
fn scenario_1_div_and_mod_both_land_correctly() {
    let program = prog(vec![
        insn(Opcode::LoadImm, 0, 10, 0),
        insn(Opcode::LoadImm, 1, 3, 0),
        insn(Opcode::Div, 2, 0, 1),
        insn(Opcode::Mod, 3, 0, 1),
        insn(Opcode::Halt, 0, 0, 0),
    ]);
    let mut state = load(&program);
    let result = state.run_to_halt(10);
    assert!(result.is_ok());
    assert_eq!(state.registers[2], 3);
    assert_eq!(state.registers[3], 1);
    assert!(state.halted);
}

#[test]
fn scenario_2_division_by_zero_traps_with_payload() {
    let program = prog(vec![
        insn(Opcode::LoadImm, 0, 5, 0),
        insn(Opcode::LoadImm, 1, 0, 0),
        insn(Opcode::Div, 2, 0, 1),
    ]);
    let mut state = load(&program);
    let err = state.run_to_halt(10).unwrap_err();
    assert_eq!(err, Trap::DivisionFault);
    let payload = state.last_trap_payload.as_ref().unwrap();
    assert_eq!(payload.detail, "division by zero");
    assert_eq!(payload.opcode, Opcode::Div);
}

#[test]
fn scenario_3_jump_if_zero_skips_the_next_loadimm() {
    let program = prog(vec![
        insn(Opcode::LoadImm, 0, 0, 0),
        insn(Opcode::JumpIfZero, 3, 0, 0),
        insn(Opcode::LoadImm, 1, 1, 0),
        insn(Opcode::Halt, 0, 0, 0),
    ]);
    let mut state = load(&program);
    state.run_to_halt(10).unwrap();
    assert_eq!(state.registers[1], 0);
    assert!(state.flags.zero);
}

#[test]
fn scenario_4_tier_zero_policy_denies_ax_read() {
    let program = prog_with_policy(vec![insn(Opcode::AxRead, 0, 1, 0)], "(policy (tier 0))");
    let mut state = load(&program);
    let err = state.run_to_halt(10).unwrap_err();
    assert_eq!(err, Trap::SecurityFault);
    assert!(state.axion_log.iter().any(|e| e.reason.contains("deny=tier0")));
}

#[test]
fn scenario_5_tvec_add_interns_the_elementwise_sum() {
    let program = prog(vec![insn(Opcode::TVecAdd, 3, 1, 2), insn(Opcode::Halt, 0, 0, 0)]);
    let mut state = load(&program);
    state.tensor_pool.push(Tensor { shape: vec![3], data: vec![1, 2, 3] });
    state.tensor_pool.push(Tensor { shape: vec![3], data: vec![4, 5, 6] });
    state.registers[1] = 1;
    state.register_tags[1] = ValueTag::TensorHandle;
    state.registers[2] = 2;
    state.register_tags[2] = ValueTag::TensorHandle;

    state.run_to_halt(10).unwrap();

    assert_eq!(state.register_tags[3], ValueTag::TensorHandle);
    let handle = state.registers[3] as usize;
    let result = &state.tensor_pool[handle - 1];
    assert_eq!(result.shape, vec![3]);
    assert_eq!(result.data, vec![5, 7, 9]);
}

#[test]
fn scenario_6_bounds_fault_after_eighty_nops_with_gc_and_policy() {
    let mut insns: Vec<_> = (0..80).map(|_| insn(Opcode::Nop, 0, 0, 0)).collect();
    insns.push(insn(Opcode::LoadImm, 0, 1, 0));
    insns.push(insn(Opcode::Load, 1, 9999, 0));
    let program = prog_with_policy(insns, "(tier 2)");

    let mut state = load(&program);
    assert_eq!(state.policy, Some(t81vm::core::value::Policy { tier: 2 }));

    let err = state.run_to_halt(200).unwrap_err();
    assert_eq!(err, Trap::BoundsFault);

    let payload = state.last_trap_payload.as_ref().unwrap();
    assert_eq!(payload.pc, 81);
    assert_eq!(payload.opcode, Opcode::Load);
    assert_eq!(payload.a, 1);
    assert_eq!(payload.b, 9999);
    assert_eq!(payload.segment.as_str(), "unknown");
    assert_eq!(payload.detail, "memory load");
    assert!(state.gc_cycles >= 1);
}
