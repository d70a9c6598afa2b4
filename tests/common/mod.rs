//! Shared helpers for building small programs inline.

use t81vm::core::opcode::Opcode;
use t81vm::core::program::{Insn, Program};
use t81vm::core::state::State;

#[allow(dead_code)]
pub fn insn(opcode: Opcode, a: i64, b: i64, c: i64) -> Insn {
    Insn { opcode, a, b, c }
}

#[allow(dead_code)]
pub fn prog(insns: Vec<Insn>) -> Program {
    Program { insns, axion_policy_text: None }
}

#[allow(dead_code)]
pub fn prog_with_policy(insns: Vec<Insn>, policy: &str) -> Program {
    Program { insns, axion_policy_text: Some(policy.to_string()) }
}

#[allow(dead_code)]
pub fn load(program: &Program) -> State {
    t81vm::core::loader::load_program(program)
}

#[allow(dead_code)]
pub fn run_to_halt(program: &Program, max_steps: u64) -> (State, Result<(), t81vm::core::trap::Trap>) {
    let mut state = load(program);
    let result = state.run_to_halt(max_steps);
    (state, result)
}
