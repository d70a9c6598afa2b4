//! Canonical state hashing and human-readable snapshots.
//!
//! `state_hash` is FNV-1a over a fixed, normative field order — every
//! implementation of this VM MUST hash fields in exactly this sequence to
//! produce identical digests. `snapshot_summary` renders the same
//! information as stable text for the CLI's `--snapshot` output.

use crate::core::state::State;
use crate::core::trap::TrapPayload;

const FNV_OFFSET_BASIS: u64 = 0xcbf29ce484222325;
const FNV_PRIME: u64 = 0x100000001b3;

struct Fnv1a(u64);

impl Fnv1a {
    fn new() -> Self {
        Fnv1a(FNV_OFFSET_BASIS)
    }

    fn write(&mut self, bytes: &[u8]) {
        for &b in bytes {
            self.0 ^= b as u64;
            self.0 = self.0.wrapping_mul(FNV_PRIME);
        }
    }

    fn write_u64(&mut self, v: u64) {
        self.write(&v.to_le_bytes());
    }

    fn write_i64(&mut self, v: i64) {
        self.write_u64(v as u64);
    }

    fn write_bool(&mut self, v: bool) {
        self.write(&[v as u8]);
    }

    fn write_presence<T>(&mut self, value: &Option<T>, then: impl FnOnce(&mut Self, &T)) {
        match value {
            Some(v) => {
                self.write_bool(true);
                then(self, v);
            }
            None => self.write_bool(false),
        }
    }

    fn finish(self) -> u64 {
        self.0
    }
}

/// FNV-1a over the documented canonical field order. Two VMs loaded with
/// the same `Program` and stepped identically MUST produce the same
/// digest at every step.
pub fn state_hash(state: &State) -> u64 {
    let mut h = Fnv1a::new();

    h.write_u64(state.pc as u64);
    h.write_bool(state.halted);
    h.write_u64(state.gc_cycles);

    for &r in &state.registers {
        h.write_i64(r);
    }

    for &cell in &state.memory {
        h.write_i64(cell);
    }

    h.write_u64(state.trace.len() as u64);
    for entry in &state.trace {
        h.write_u64(entry.pc as u64);
        h.write_u64(entry.opcode.as_u64());
        h.write_presence(&entry.write, |h, &(idx, value, tag)| {
            h.write_u64(idx as u64);
            h.write_i64(value);
            h.write_u64(tag.as_u64());
        });
        h.write_presence(&entry.trap, |h, trap| h.write_u64(trap.as_u64()));
    }

    h.write_presence(&state.last_trap_payload, |h, payload| {
        h.write_u64(payload.trap.as_u64());
        h.write_u64(payload.pc as u64);
        h.write_u64(payload.opcode.as_u64());
        h.write_i64(payload.a);
        h.write_i64(payload.b);
        h.write_i64(payload.c);
        h.write_u64(payload.segment.as_u64());
        h.write(payload.detail.as_bytes());
    });

    h.write_presence(&state.policy, |h, policy| h.write_u64(policy.tier as u64));

    h.finish()
}

/// Backslash-escape `"`, `\`, and newline, matching the closed escaping
/// rule for `TRAP_PAYLOAD detail="..."` text.
fn escape_detail(detail: &str) -> String {
    let mut out = String::with_capacity(detail.len());
    for ch in detail.chars() {
        match ch {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            _ => out.push(ch),
        }
    }
    out
}

fn format_trap_payload(payload: &TrapPayload) -> String {
    format!(
        "TRAP_PAYLOAD trap={} pc={} opcode={} a={} b={} c={} segment={} detail=\"{}\"",
        payload.trap.name(),
        payload.pc,
        payload.opcode.as_u64(),
        payload.a,
        payload.b,
        payload.c,
        payload.segment,
        escape_detail(&payload.detail),
    )
}

/// Render the four normative snapshot lines: `SNAPSHOT`, `REGISTERS`, an
/// optional `TRAP_PAYLOAD`, and `STATE_HASH`.
pub fn snapshot_summary(state: &State) -> String {
    let mut lines = Vec::with_capacity(4);

    let mut snapshot = format!(
        "SNAPSHOT pc={} halted={} gc_cycles={}",
        state.pc,
        state.halted as u8,
        state.gc_cycles
    );
    if let Some(policy) = state.policy {
        snapshot.push_str(&format!(" policy_tier={}", policy.tier));
    }
    lines.push(snapshot);

    let registers: Vec<String> = state.registers.iter().enumerate().map(|(i, v)| format!("r{i}={v}")).collect();
    lines.push(format!("REGISTERS {}", registers.join(" ")));

    if let Some(payload) = &state.last_trap_payload {
        lines.push(format_trap_payload(payload));
    }

    lines.push(format!("STATE_HASH 0x{:016x}", state_hash(state)));

    lines.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::loader::load_program;
    use crate::core::opcode::Opcode;
    use crate::core::program::{Insn, Program};

    fn halted_state() -> State {
        let program = Program {
            insns: vec![Insn { opcode: Opcode::Halt, a: 0, b: 0, c: 0 }],
            axion_policy_text: None,
        };
        let mut state = load_program(&program);
        state.step().unwrap();
        state
    }

    #[test]
    fn identical_programs_hash_identically() {
        let a = halted_state();
        let b = halted_state();
        assert_eq!(state_hash(&a), state_hash(&b));
    }

    #[test]
    fn snapshot_has_four_lines_without_trap() {
        let state = halted_state();
        let text = snapshot_summary(&state);
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 3);
        assert!(lines[0].starts_with("SNAPSHOT"));
        assert!(lines[1].starts_with("REGISTERS"));
        assert!(lines[2].starts_with("STATE_HASH 0x"));
    }

    #[test]
    fn escapes_quotes_and_backslashes_and_newlines() {
        assert_eq!(escape_detail("a\"b\\c\nd"), "a\\\"b\\\\c\\nd");
    }
}
