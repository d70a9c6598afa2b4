//! Tensor-pool opcodes: vector/matrix arithmetic and the fixed-point
//! activation family, plus the two opcodes that touch the shape and
//! weights handles (`ChkShape`, `WeightsLoad`).
//!
//! Every op here interns its result as a fresh pool entry and writes the
//! new 1-based handle back into register `a` — pools are append-only, so
//! there is no in-place mutation of a tensor another handle still points
//! at.

use crate::core::program::Insn;
use crate::core::state::State;
use crate::core::trap::Trap;
use crate::core::value::{Tensor, ValueTag};

type Write = Option<(usize, i64, ValueTag)>;

fn tensor_at(state: &State, reg: usize) -> Result<usize, Trap> {
    if state.register_tags[reg] != ValueTag::TensorHandle {
        return Err(Trap::TypeFault);
    }
    let h = state.registers[reg];
    if h < 1 || (h as usize) > state.tensor_pool.len() {
        return Err(Trap::DecodeFault);
    }
    Ok((h - 1) as usize)
}

fn intern_tensor(state: &mut State, dest: usize, tensor: Tensor) -> Write {
    state.tensor_pool.push(tensor);
    let handle = state.tensor_pool.len() as i64;
    Some((dest, handle, ValueTag::TensorHandle))
}

fn rank1_pair<'a>(state: &'a State, b: usize, c: usize) -> Result<(&'a Tensor, &'a Tensor), Trap> {
    let bi = tensor_at(state, b)?;
    let ci = tensor_at(state, c)?;
    let tb = &state.tensor_pool[bi];
    let tc = &state.tensor_pool[ci];
    if tb.rank() != 1 || tc.rank() != 1 || tb.shape != tc.shape || tb.data.len() != tc.data.len() {
        return Err(Trap::ShapeFault);
    }
    Ok((tb, tc))
}

pub fn tvec_add(state: &mut State, insn: Insn) -> Result<Write, Trap> {
    let (tb, tc) = rank1_pair(state, insn.b as usize, insn.c as usize)?;
    let data: Vec<i64> = tb.data.iter().zip(&tc.data).map(|(x, y)| x.wrapping_add(*y)).collect();
    let shape = tb.shape.clone();
    Ok(intern_tensor(state, insn.a as usize, Tensor { shape, data }))
}

pub fn tvec_mul(state: &mut State, insn: Insn) -> Result<Write, Trap> {
    let (tb, tc) = rank1_pair(state, insn.b as usize, insn.c as usize)?;
    let data: Vec<i64> = tb.data.iter().zip(&tc.data).map(|(x, y)| x.wrapping_mul(*y)).collect();
    let shape = tb.shape.clone();
    Ok(intern_tensor(state, insn.a as usize, Tensor { shape, data }))
}

pub fn tmat_mul(state: &mut State, insn: Insn) -> Result<Write, Trap> {
    let bi = tensor_at(state, insn.b as usize)?;
    let ci = tensor_at(state, insn.c as usize)?;
    let tb = &state.tensor_pool[bi];
    let tc = &state.tensor_pool[ci];
    if tb.rank() != 2 || tc.rank() != 2 || tb.shape[1] != tc.shape[0] {
        return Err(Trap::ShapeFault);
    }
    let (m, k, n) = (tb.shape[0] as usize, tb.shape[1] as usize, tc.shape[1] as usize);
    let mut data = vec![0i64; m * n];
    for i in 0..m {
        for j in 0..n {
            let mut acc = 0i64;
            for p in 0..k {
                acc = acc.wrapping_add(tb.data[i * k + p].wrapping_mul(tc.data[p * n + j]));
            }
            data[i * n + j] = acc;
        }
    }
    Ok(intern_tensor(state, insn.a as usize, Tensor { shape: vec![m as i64, n as i64], data }))
}

pub fn tten_dot(state: &mut State, insn: Insn) -> Result<Write, Trap> {
    let bi = tensor_at(state, insn.b as usize)?;
    let ci = tensor_at(state, insn.c as usize)?;
    let tb = &state.tensor_pool[bi];
    let tc = &state.tensor_pool[ci];
    if tb.data.len() != tc.data.len() {
        return Err(Trap::ShapeFault);
    }
    let sum: i64 = tb.data.iter().zip(&tc.data).map(|(x, y)| x.wrapping_mul(*y)).fold(0i64, |a, b| a.wrapping_add(b));
    Ok(intern_tensor(state, insn.a as usize, Tensor { shape: vec![1], data: vec![sum] }))
}

pub fn ttranspose(state: &mut State, insn: Insn) -> Result<Write, Trap> {
    let bi = tensor_at(state, insn.b as usize)?;
    let tb = &state.tensor_pool[bi];
    if tb.rank() != 2 {
        return Err(Trap::ShapeFault);
    }
    let (r, c) = (tb.shape[0] as usize, tb.shape[1] as usize);
    let mut data = vec![0i64; r * c];
    for i in 0..r {
        for j in 0..c {
            data[j * r + i] = tb.data[i * c + j];
        }
    }
    Ok(intern_tensor(state, insn.a as usize, Tensor { shape: vec![c as i64, r as i64], data }))
}

fn round_ties_away(x: f64) -> i64 {
    x.round() as i64
}

pub fn texp(state: &mut State, insn: Insn) -> Result<Write, Trap> {
    let bi = tensor_at(state, insn.b as usize)?;
    let tb = &state.tensor_pool[bi];
    let data: Vec<i64> = tb
        .data
        .iter()
        .map(|&x| {
            let clamped = x.clamp(-20, 20) as f64;
            round_ties_away(clamped.exp())
        })
        .collect();
    let shape = tb.shape.clone();
    Ok(intern_tensor(state, insn.a as usize, Tensor { shape, data }))
}

pub fn tsqrt(state: &mut State, insn: Insn) -> Result<Write, Trap> {
    let bi = tensor_at(state, insn.b as usize)?;
    let tb = &state.tensor_pool[bi];
    let data: Vec<i64> = tb
        .data
        .iter()
        .map(|&x| round_ties_away((x.max(0) as f64).sqrt()))
        .collect();
    let shape = tb.shape.clone();
    Ok(intern_tensor(state, insn.a as usize, Tensor { shape, data }))
}

pub fn tsilu(state: &mut State, insn: Insn) -> Result<Write, Trap> {
    let bi = tensor_at(state, insn.b as usize)?;
    let tb = &state.tensor_pool[bi];
    let data: Vec<i64> = tb
        .data
        .iter()
        .map(|&x| {
            let xf = x as f64;
            round_ties_away(xf / (1.0 + (-xf).exp()))
        })
        .collect();
    let shape = tb.shape.clone();
    Ok(intern_tensor(state, insn.a as usize, Tensor { shape, data }))
}

pub fn tsoftmax(state: &mut State, insn: Insn) -> Result<Write, Trap> {
    let bi = tensor_at(state, insn.b as usize)?;
    let tb = &state.tensor_pool[bi];
    if tb.data.is_empty() {
        return Err(Trap::ShapeFault);
    }
    let max = *tb.data.iter().max().unwrap();
    let exps: Vec<f64> = tb.data.iter().map(|&x| ((x - max) as f64).exp()).collect();
    let sum: f64 = exps.iter().sum();
    if sum == 0.0 {
        return Err(Trap::ShapeFault);
    }
    let data: Vec<i64> = exps.iter().map(|&e| round_ties_away(e / sum * 1000.0)).collect();
    let shape = tb.shape.clone();
    Ok(intern_tensor(state, insn.a as usize, Tensor { shape, data }))
}

pub fn trmsnorm(state: &mut State, insn: Insn) -> Result<Write, Trap> {
    let bi = tensor_at(state, insn.b as usize)?;
    let tb = &state.tensor_pool[bi];
    if tb.data.is_empty() {
        return Err(Trap::ShapeFault);
    }
    let mean_sq: f64 = tb.data.iter().map(|&x| (x as f64) * (x as f64)).sum::<f64>() / tb.data.len() as f64;
    let rms = mean_sq.sqrt();
    let data: Vec<i64> = if rms == 0.0 {
        vec![0; tb.data.len()]
    } else {
        tb.data.iter().map(|&x| round_ties_away(x as f64 / rms)).collect()
    };
    let shape = tb.shape.clone();
    Ok(intern_tensor(state, insn.a as usize, Tensor { shape, data }))
}

pub fn trope(state: &mut State, insn: Insn) -> Result<Write, Trap> {
    let bi = tensor_at(state, insn.b as usize)?;
    let tb = &state.tensor_pool[bi];
    if tb.data.len() % 2 != 0 {
        return Err(Trap::ShapeFault);
    }
    let mut data = tb.data.clone();
    let mut i = 0;
    while i < data.len() {
        let (x, y) = (data[i], data[i + 1]);
        data[i] = y;
        data[i + 1] = -x;
        i += 2;
    }
    let shape = tb.shape.clone();
    Ok(intern_tensor(state, insn.a as usize, Tensor { shape, data }))
}

pub fn chk_shape(state: &mut State, insn: Insn) -> Result<Write, Trap> {
    let b = insn.b as usize;
    if state.register_tags[b] != ValueTag::TensorHandle {
        return Err(Trap::TypeFault);
    }
    let c = insn.c as usize;
    if state.register_tags[c] != ValueTag::ShapeHandle {
        return Err(Trap::TypeFault);
    }
    let tensor_h = state.registers[b];
    if tensor_h < 1 || (tensor_h as usize) > state.tensor_pool.len() {
        return Err(Trap::DecodeFault);
    }
    let shape_h = state.registers[c];
    if shape_h < 1 || (shape_h as usize) > state.shape_pool.len() {
        return Err(Trap::DecodeFault);
    }
    let tensor = &state.tensor_pool[(tensor_h - 1) as usize];
    let shape = &state.shape_pool[(shape_h - 1) as usize];
    let matches = tensor.shape == shape.dims;
    Ok(Some((insn.a as usize, matches as i64, ValueTag::Int)))
}

pub fn weights_load(state: &mut State, insn: Insn) -> Result<Write, Trap> {
    let b = insn.b;
    let handle = if b > 0 { b } else { 1000 + state.pc as i64 };
    state.axion_log.push(crate::core::value::AxionLogEntry {
        opcode: crate::core::opcode::Opcode::WeightsLoad,
        reason: format!("weights handle loaded handle={}", handle),
    });
    Ok(Some((insn.a as usize, handle, ValueTag::WeightsTensorHandle)))
}

pub fn set_f(state: &mut State, insn: Insn) -> Result<Write, Trap> {
    let b = insn.b as usize;
    let value = state.registers[b];
    Ok(Some((insn.a as usize, value, ValueTag::Int)))
}
