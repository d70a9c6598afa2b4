//! Axion guard opcodes: `AxRead`, `AxSet`, `AxVerify`.
//!
//! `policy.tier == 0` is the sole gate — tier absence means "allow", and
//! every invocation logs regardless of verdict. Further tiers are
//! reserved by the design (see DESIGN.md).

use crate::core::opcode::Opcode;
use crate::core::program::Insn;
use crate::core::state::State;
use crate::core::trap::Trap;
use crate::core::value::{AxionLogEntry, ValueTag};

type Write = Option<(usize, i64, ValueTag)>;

fn denied(state: &State) -> bool {
    matches!(state.policy, Some(p) if p.tier == 0)
}

fn log(state: &mut State, opcode: Opcode, prefix: &str, addr: i64, value: Option<i64>, denied: bool) {
    let verdict = if denied { "deny=tier0" } else { "allow" };
    let reason = match value {
        Some(v) => format!("{prefix} addr={addr} value={v} {verdict}"),
        None => format!("{prefix} addr={addr} {verdict}"),
    };
    state.axion_log.push(AxionLogEntry { opcode, reason });
}

pub fn ax_read(state: &mut State, insn: Insn) -> Result<Write, Trap> {
    let blocked = denied(state);
    log(state, Opcode::AxRead, "AxRead guard", insn.b, Some(insn.b), blocked);
    if blocked {
        return Err(Trap::SecurityFault);
    }
    Ok(Some((insn.a as usize, insn.b, ValueTag::Int)))
}

pub fn ax_set(state: &mut State, insn: Insn) -> Result<Write, Trap> {
    let blocked = denied(state);
    log(state, Opcode::AxSet, "AxSet guard", insn.b, None, blocked);
    if blocked {
        return Err(Trap::SecurityFault);
    }
    Ok(None)
}

pub fn ax_verify(state: &mut State, insn: Insn) -> Result<Write, Trap> {
    let blocked = denied(state);
    log(state, Opcode::AxVerify, "AxVerify guard", insn.b, None, blocked);
    if blocked {
        return Err(Trap::SecurityFault);
    }
    Ok(Some((insn.a as usize, 0, ValueTag::Int)))
}
