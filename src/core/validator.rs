//! Static validation of a loaded program.
//!
//! Validation never happens inline during loading: `core::loader` always
//! succeeds, stashing the first validation failure (if any) into
//! `State::preload_trap` so it surfaces on the first `step()` call
//! instead. `validate_program` itself is a pure function so it can be
//! unit-tested without constructing a `State`.

use crate::core::opcode::Opcode;
use crate::core::program::{Insn, Program};
use crate::core::state::REGISTER_COUNT;
use crate::core::trap::Trap;

fn valid_reg(idx: i64) -> bool {
    idx >= 0 && (idx as usize) < REGISTER_COUNT
}

fn valid_target(target: i64, program_len: usize) -> bool {
    target >= 0 && (target as usize) < program_len
}

/// Check every instruction's opcode validity, operand shape, and (for
/// branches) jump-target range. Returns the first violation found, in
/// program order.
pub fn validate_program(program: &Program) -> Option<Trap> {
    let len = program.len();
    for insn in &program.insns {
        if let Some(trap) = validate_insn(insn, len) {
            return Some(trap);
        }
    }
    None
}

fn validate_insn(insn: &Insn, program_len: usize) -> Option<Trap> {
    use Opcode::*;
    let bad = Some(Trap::DecodeFault);

    let reg = |v: i64| if valid_reg(v) { None } else { bad };

    match insn.opcode {
        Nop | Halt | Trap | Ret => None,

        LoadImm => reg(insn.a),
        Mov => reg(insn.a).or_else(|| reg(insn.b)),
        Inc | Dec => reg(insn.a),
        Neg => reg(insn.a).or_else(|| reg(insn.b)),

        Load => reg(insn.a),
        Store => reg(insn.b),

        Add | Sub | Mul | Div | Mod | FAdd | FSub | FMul | FDiv | FracAdd | FracSub | FracMul
        | FracDiv => reg(insn.a).or_else(|| reg(insn.b)).or_else(|| reg(insn.c)),

        I2F | F2I | I2Frac | Frac2I => reg(insn.a).or_else(|| reg(insn.b)),

        Cmp => reg(insn.a).or_else(|| reg(insn.b)),
        Less | LessEqual | Greater | GreaterEqual | Equal | NotEqual => {
            reg(insn.a).or_else(|| reg(insn.b)).or_else(|| reg(insn.c))
        }

        TNot => reg(insn.a).or_else(|| reg(insn.b)),
        TAnd | TOr | TXor => reg(insn.a).or_else(|| reg(insn.b)).or_else(|| reg(insn.c)),

        Jump | JumpIfZero | JumpIfNotZero | JumpIfNegative | JumpIfPositive => {
            if valid_target(insn.a, program_len) {
                None
            } else {
                bad
            }
        }

        Call => reg(insn.a),
        Push | Pop => reg(insn.a),

        StackAlloc | HeapAlloc => reg(insn.a),
        StackFree | HeapFree => reg(insn.a),

        TVecAdd | TVecMul | TMatMul | TTenDot | ChkShape => {
            reg(insn.a).or_else(|| reg(insn.b)).or_else(|| reg(insn.c))
        }
        TTranspose => reg(insn.a).or_else(|| reg(insn.b)),
        TExp | TSqrt | TSiLU | TSoftmax | TRMSNorm | TRoPE => {
            reg(insn.a).or_else(|| reg(insn.b))
        }
        WeightsLoad => reg(insn.a),
        SetF => reg(insn.a).or_else(|| reg(insn.b)),

        MakeOptionSome => reg(insn.a).or_else(|| reg(insn.b)),
        MakeOptionNone => reg(insn.a),
        OptionIsSome | OptionUnwrap => reg(insn.a).or_else(|| reg(insn.b)),

        MakeResultOk | MakeResultErr => reg(insn.a).or_else(|| reg(insn.b)),
        ResultIsOk | ResultUnwrapOk | ResultUnwrapErr => reg(insn.a).or_else(|| reg(insn.b)),

        MakeEnumVariant => reg(insn.a),
        MakeEnumVariantPayload => reg(insn.a).or_else(|| reg(insn.b)),
        EnumIsVariant => reg(insn.a).or_else(|| reg(insn.b)),
        EnumUnwrapPayload => reg(insn.a).or_else(|| reg(insn.b)),

        AxRead | AxSet | AxVerify => reg(insn.a),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn prog(insns: Vec<Insn>) -> Program {
        Program { insns, axion_policy_text: None }
    }

    #[test]
    fn nop_halt_always_valid() {
        let p = prog(vec![Insn { opcode: Opcode::Nop, a: 0, b: 0, c: 0 }, Insn { opcode: Opcode::Halt, a: 0, b: 0, c: 0 }]);
        assert_eq!(validate_program(&p), None);
    }

    #[test]
    fn out_of_range_register_faults() {
        let p = prog(vec![Insn { opcode: Opcode::LoadImm, a: 243, b: 7, c: 0 }]);
        assert_eq!(validate_program(&p), Some(Trap::DecodeFault));
    }

    #[test]
    fn negative_register_faults() {
        let p = prog(vec![Insn { opcode: Opcode::Inc, a: -1, b: 0, c: 0 }]);
        assert_eq!(validate_program(&p), Some(Trap::DecodeFault));
    }

    #[test]
    fn jump_target_out_of_range_faults() {
        let p = prog(vec![Insn { opcode: Opcode::Jump, a: 5, b: 0, c: 0 }]);
        assert_eq!(validate_program(&p), Some(Trap::DecodeFault));
    }

    #[test]
    fn jump_target_in_range_ok() {
        let p = prog(vec![
            Insn { opcode: Opcode::Jump, a: 1, b: 0, c: 0 },
            Insn { opcode: Opcode::Halt, a: 0, b: 0, c: 0 },
        ]);
        assert_eq!(validate_program(&p), None);
    }

    #[test]
    fn alu_triple_checks_all_three_registers() {
        let p = prog(vec![Insn { opcode: Opcode::Add, a: 0, b: 1, c: 300 }]);
        assert_eq!(validate_program(&p), Some(Trap::DecodeFault));
    }

    #[test]
    fn store_checks_register_operand_only() {
        let p = prog(vec![Insn { opcode: Opcode::Store, a: 9999, b: 2, c: 0 }]);
        assert_eq!(validate_program(&p), None);
    }
}
