//! The `.t81`/`.t81vm` line-oriented text format.
//!
//! Empty lines and `#`-comments are skipped. A `POLICY` line's remainder
//! is passed verbatim into `axion_policy_text`. Any other line is
//! `OPCODE A B C`, with `A`/`B`/`C` optional signed decimals defaulting
//! to 0, and `OPCODE` matched case-insensitively with `_`/`-` stripped
//! (see `core::opcode::Opcode::from_name` for the alias table).

use crate::core::opcode::Opcode;
use crate::core::program::{Insn, Program};
use crate::format::LoadError;

/// Parse a complete `.t81` source string into a `Program`.
pub fn parse(source: &str) -> Result<Program, LoadError> {
    let mut insns = Vec::new();
    let mut axion_policy_text = None;

    for (lineno, raw_line) in source.lines().enumerate() {
        let line = raw_line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        if let Some(rest) = line.strip_prefix("POLICY") {
            let existing = axion_policy_text.get_or_insert_with(String::new);
            if !existing.is_empty() {
                existing.push('\n');
            }
            existing.push_str(rest.trim_start());
            continue;
        }

        let mut parts = line.split_whitespace();
        let mnemonic = parts.next().ok_or_else(|| {
            LoadError::Parse(format!("line {}: missing opcode", lineno + 1))
        })?;
        let opcode = Opcode::from_name(mnemonic)
            .ok_or_else(|| LoadError::Parse(format!("line {}: unknown opcode {mnemonic:?}", lineno + 1)))?;

        let mut operands = [0i64; 3];
        for (slot, token) in operands.iter_mut().zip(parts.by_ref()) {
            *slot = token
                .parse::<i64>()
                .map_err(|_| LoadError::Parse(format!("line {}: bad operand {token:?}", lineno + 1)))?;
        }

        insns.push(Insn { opcode, a: operands[0], b: operands[1], c: operands[2] });
    }

    if insns.is_empty() {
        return Err(LoadError::Parse("program has no instructions".to_string()));
    }

    Ok(Program { insns, axion_policy_text })
}
