//! Option/Result/Enum pool opcodes.
//!
//! Each family follows the same shape: a `Make*` op interns a value and
//! hands back a 1-based handle; the rest read through that handle after
//! checking the register's tag.

use crate::core::program::Insn;
use crate::core::state::State;
use crate::core::trap::Trap;
use crate::core::value::{EnumValue, OptionValue, ResultValue, ValueTag};

type Write = Option<(usize, i64, ValueTag)>;

fn option_at(state: &State, reg: usize) -> Result<usize, Trap> {
    if state.register_tags[reg] != ValueTag::OptionHandle {
        return Err(Trap::TypeFault);
    }
    let h = state.registers[reg];
    if h < 1 || (h as usize) > state.option_pool.len() {
        return Err(Trap::DecodeFault);
    }
    Ok((h - 1) as usize)
}

fn result_at(state: &State, reg: usize) -> Result<usize, Trap> {
    if state.register_tags[reg] != ValueTag::ResultHandle {
        return Err(Trap::TypeFault);
    }
    let h = state.registers[reg];
    if h < 1 || (h as usize) > state.result_pool.len() {
        return Err(Trap::DecodeFault);
    }
    Ok((h - 1) as usize)
}

fn enum_at(state: &State, reg: usize) -> Result<usize, Trap> {
    if state.register_tags[reg] != ValueTag::EnumHandle {
        return Err(Trap::TypeFault);
    }
    let h = state.registers[reg];
    if h < 1 || (h as usize) > state.enum_pool.len() {
        return Err(Trap::DecodeFault);
    }
    Ok((h - 1) as usize)
}

pub fn make_option_some(state: &mut State, insn: Insn) -> Result<Write, Trap> {
    let value = state.registers[insn.b as usize];
    state.option_pool.push(OptionValue { some: Some(value) });
    let handle = state.option_pool.len() as i64;
    Ok(Some((insn.a as usize, handle, ValueTag::OptionHandle)))
}

pub fn make_option_none(state: &mut State, insn: Insn) -> Result<Write, Trap> {
    state.option_pool.push(OptionValue { some: None });
    let handle = state.option_pool.len() as i64;
    Ok(Some((insn.a as usize, handle, ValueTag::OptionHandle)))
}

pub fn option_is_some(state: &mut State, insn: Insn) -> Result<Write, Trap> {
    let idx = option_at(state, insn.b as usize)?;
    let is_some = state.option_pool[idx].some.is_some();
    Ok(Some((insn.a as usize, is_some as i64, ValueTag::Int)))
}

pub fn option_unwrap(state: &mut State, insn: Insn) -> Result<Write, Trap> {
    let idx = option_at(state, insn.b as usize)?;
    match state.option_pool[idx].some {
        Some(v) => Ok(Some((insn.a as usize, v, ValueTag::Int))),
        None => Err(Trap::DecodeFault),
    }
}

pub fn make_result_ok(state: &mut State, insn: Insn) -> Result<Write, Trap> {
    let value = state.registers[insn.b as usize];
    state.result_pool.push(ResultValue { ok: true, value });
    let handle = state.result_pool.len() as i64;
    Ok(Some((insn.a as usize, handle, ValueTag::ResultHandle)))
}

pub fn make_result_err(state: &mut State, insn: Insn) -> Result<Write, Trap> {
    let value = state.registers[insn.b as usize];
    state.result_pool.push(ResultValue { ok: false, value });
    let handle = state.result_pool.len() as i64;
    Ok(Some((insn.a as usize, handle, ValueTag::ResultHandle)))
}

pub fn result_is_ok(state: &mut State, insn: Insn) -> Result<Write, Trap> {
    let idx = result_at(state, insn.b as usize)?;
    let ok = state.result_pool[idx].ok;
    Ok(Some((insn.a as usize, ok as i64, ValueTag::Int)))
}

pub fn result_unwrap_ok(state: &mut State, insn: Insn) -> Result<Write, Trap> {
    let idx = result_at(state, insn.b as usize)?;
    let rv = state.result_pool[idx];
    if !rv.ok {
        return Err(Trap::DecodeFault);
    }
    Ok(Some((insn.a as usize, rv.value, ValueTag::Int)))
}

pub fn result_unwrap_err(state: &mut State, insn: Insn) -> Result<Write, Trap> {
    let idx = result_at(state, insn.b as usize)?;
    let rv = state.result_pool[idx];
    if rv.ok {
        return Err(Trap::DecodeFault);
    }
    Ok(Some((insn.a as usize, rv.value, ValueTag::Int)))
}

pub fn make_enum_variant(state: &mut State, insn: Insn) -> Result<Write, Trap> {
    state.enum_pool.push(EnumValue { variant: insn.b, payload: None });
    let handle = state.enum_pool.len() as i64;
    Ok(Some((insn.a as usize, handle, ValueTag::EnumHandle)))
}

pub fn make_enum_variant_payload(state: &mut State, insn: Insn) -> Result<Write, Trap> {
    if insn.c < 0 {
        return Err(Trap::DecodeFault);
    }
    let payload = state.registers[insn.b as usize];
    state.enum_pool.push(EnumValue { variant: insn.c, payload: Some(payload) });
    let handle = state.enum_pool.len() as i64;
    Ok(Some((insn.a as usize, handle, ValueTag::EnumHandle)))
}

pub fn enum_is_variant(state: &mut State, insn: Insn) -> Result<Write, Trap> {
    let idx = enum_at(state, insn.b as usize)?;
    let matches = state.enum_pool[idx].variant == insn.c;
    Ok(Some((insn.a as usize, matches as i64, ValueTag::Int)))
}

pub fn enum_unwrap_payload(state: &mut State, insn: Insn) -> Result<Write, Trap> {
    let idx = enum_at(state, insn.b as usize)?;
    match state.enum_pool[idx].payload {
        Some(v) => Ok(Some((insn.a as usize, v, ValueTag::Int))),
        None => Err(Trap::DecodeFault),
    }
}
