//! The quantified invariants from the design notes (I1-I7).

mod common;

use common::{insn, load, prog, prog_with_policy, run_to_halt};
use t81vm::core::memory::segment_of;
use t81vm::core::opcode::Opcode;
use t81vm::core::trap::SegmentKind;
use t81vm::core::value::ValueTag;
use t81vm::format::json;
use t81vm::format::text;

/// I1: after any successful step, every persisted `sp`, `heap_ptr`, and
/// frame start resolves to the segment it's supposed to live in.
#[test]
fn i1_persisted_pointers_stay_in_their_segment() {
    let program = prog(vec![
        insn(Opcode::StackAlloc, 0, 4, 0),
        insn(Opcode::HeapAlloc, 1, 8, 0),
        insn(Opcode::Push, 0, 0, 0),
        insn(Opcode::Halt, 0, 0, 0),
    ]);
    let mut state = load(&program);
    for _ in 0..4 {
        state.step().unwrap();
        assert_eq!(segment_of(&state.layout, state.sp), SegmentKind::Stack, "sp left the stack segment");
        assert!(state.layout.heap.contains(state.heap_ptr) || state.heap_ptr == state.layout.heap.limit);
        for &(start, _) in &state.stack_frames {
            assert_eq!(segment_of(&state.layout, start), SegmentKind::Stack);
        }
        for &(start, _) in &state.heap_frames {
            assert!(state.layout.heap.contains(start));
        }
    }
}

/// I2: a trace entry's recorded write matches what's actually in the
/// register immediately afterward.
#[test]
fn i2_trace_writes_match_register_reads() {
    let program = prog(vec![
        insn(Opcode::LoadImm, 0, 42, 0),
        insn(Opcode::Inc, 0, 0, 0),
        insn(Opcode::Halt, 0, 0, 0),
    ]);
    let mut state = load(&program);
    state.run_to_halt(10).unwrap();
    for entry in &state.trace {
        if let Some((reg, value, tag)) = entry.write {
            assert_eq!(state.registers[reg], value);
            assert_eq!(state.register_tags[reg], tag);
        }
    }
}

/// I3: two fresh VMs loaded with the same program and stepped identically
/// produce identical `state_hash` at every step.
#[test]
fn i3_identical_programs_hash_identically_at_every_step() {
    let program = prog(vec![
        insn(Opcode::LoadImm, 0, 7, 0),
        insn(Opcode::LoadImm, 1, 3, 0),
        insn(Opcode::Add, 2, 0, 1),
        insn(Opcode::Halt, 0, 0, 0),
    ]);
    let mut a = load(&program);
    let mut b = load(&program);
    for _ in 0..4 {
        a.step().unwrap();
        b.step().unwrap();
        assert_eq!(t81vm::core::summary::state_hash(&a), t81vm::core::summary::state_hash(&b));
    }
}

/// I4: `register_tags` reflects the producing instruction's output tag.
#[test]
fn i4_register_tags_match_producer_output() {
    let program = prog(vec![
        insn(Opcode::LoadImm, 0, 5, 0),
        insn(Opcode::MakeOptionSome, 1, 0, 0),
        insn(Opcode::MakeResultOk, 2, 0, 0),
        insn(Opcode::MakeEnumVariant, 3, 1, 0),
        insn(Opcode::Halt, 0, 0, 0),
    ]);
    let mut state = load(&program);
    state.run_to_halt(10).unwrap();
    assert_eq!(state.register_tags[0], ValueTag::Int);
    assert_eq!(state.register_tags[1], ValueTag::OptionHandle);
    assert_eq!(state.register_tags[2], ValueTag::ResultHandle);
    assert_eq!(state.register_tags[3], ValueTag::EnumHandle);
}

/// I5: any handle-tagged register value is a valid 1-based index into its
/// pool.
#[test]
fn i5_handles_are_in_range_for_their_pool() {
    let program = prog(vec![
        insn(Opcode::MakeOptionSome, 0, 1, 0),
        insn(Opcode::MakeOptionNone, 1, 0, 0),
        insn(Opcode::Halt, 0, 0, 0),
    ]);
    let mut state = load(&program);
    state.run_to_halt(10).unwrap();
    for (reg, &tag) in state.register_tags.iter().enumerate() {
        let h = state.registers[reg];
        match tag {
            ValueTag::OptionHandle => assert!(h >= 1 && (h as usize) <= state.option_pool.len()),
            ValueTag::ResultHandle => assert!(h >= 1 && (h as usize) <= state.result_pool.len()),
            ValueTag::EnumHandle => assert!(h >= 1 && (h as usize) <= state.enum_pool.len()),
            ValueTag::TensorHandle => assert!(h >= 1 && (h as usize) <= state.tensor_pool.len()),
            ValueTag::ShapeHandle => assert!(h >= 1 && (h as usize) <= state.shape_pool.len()),
            _ => {}
        }
    }
}

/// I6: text -> Program -> JSON -> Program round-trips to an identical
/// `Program`.
#[test]
fn i6_text_to_json_round_trip_is_identical() {
    let source = "POLICY (tier 1)\nLOADIMM 0 10 0\nLOADIMM 1 3 0\nDIV 2 0 1\nHALT\n";
    let parsed = text::parse(source).unwrap();
    let as_json = json::to_json(&parsed);
    let reparsed = json::parse(&as_json).unwrap();
    assert_eq!(parsed, reparsed);
}

/// I7: stepping a halted machine any number of times is a no-op; the hash
/// never moves.
#[test]
fn i7_halt_is_idempotent() {
    let program = prog(vec![insn(Opcode::Halt, 0, 0, 0)]);
    let (mut state, result) = run_to_halt(&program, 10);
    assert!(result.is_ok());
    let hash_before = t81vm::core::summary::state_hash(&state);
    for _ in 0..5 {
        assert!(state.step().is_ok());
    }
    assert_eq!(t81vm::core::summary::state_hash(&state), hash_before);
}

#[test]
fn axion_policy_text_without_tier_leaves_policy_unset() {
    let program = prog_with_policy(vec![insn(Opcode::Halt, 0, 0, 0)], "no tier mentioned here");
    let state = load(&program);
    assert_eq!(state.policy, None);
}
