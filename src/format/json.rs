//! The `.json` program format: `{ axion_policy_text?, insns: [...] }`.

use serde::Deserialize;

use crate::core::opcode::Opcode;
use crate::core::program::{Insn, Program};
use crate::format::LoadError;

#[derive(Debug, Deserialize)]
struct WireInsn {
    opcode: String,
    #[serde(default)]
    a: i64,
    #[serde(default)]
    b: i64,
    #[serde(default)]
    c: i64,
}

#[derive(Debug, Deserialize)]
struct WireProgram {
    axion_policy_text: Option<String>,
    insns: Vec<WireInsn>,
}

/// Parse a complete JSON document into a `Program`.
pub fn parse(source: &str) -> Result<Program, LoadError> {
    let wire: WireProgram = serde_json::from_str(source).map_err(|e| LoadError::Parse(e.to_string()))?;

    if wire.insns.is_empty() {
        return Err(LoadError::Parse("program has no instructions".to_string()));
    }

    let insns = wire
        .insns
        .into_iter()
        .map(|w| {
            Opcode::from_name(&w.opcode)
                .map(|opcode| Insn { opcode, a: w.a, b: w.b, c: w.c })
                .ok_or_else(|| LoadError::Parse(format!("unknown opcode {:?}", w.opcode)))
        })
        .collect::<Result<Vec<_>, _>>()?;

    Ok(Program { insns, axion_policy_text: wire.axion_policy_text })
}

/// Serialize a `Program` back to its JSON wire format, the inverse of
/// `parse`. Used by the round-trip invariant (text -> execute -> JSON ->
/// parse yields an identical `Program`).
pub fn to_json(program: &Program) -> String {
    #[derive(serde::Serialize)]
    struct Out<'a> {
        axion_policy_text: &'a Option<String>,
        insns: Vec<OutInsn>,
    }
    #[derive(serde::Serialize)]
    struct OutInsn {
        opcode: String,
        a: i64,
        b: i64,
        c: i64,
    }

    let out = Out {
        axion_policy_text: &program.axion_policy_text,
        insns: program
            .insns
            .iter()
            .map(|i| OutInsn { opcode: i.opcode.name().to_string(), a: i.a, b: i.b, c: i.c })
            .collect(),
    };
    serde_json::to_string_pretty(&out).expect("Program serializes infallibly")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_minimal_program() {
        let src = r#"{"insns":[{"opcode":"HALT","a":0,"b":0,"c":0}]}"#;
        let p = parse(src).unwrap();
        assert_eq!(p.insns, vec![Insn { opcode: Opcode::Halt, a: 0, b: 0, c: 0 }]);
        assert_eq!(p.axion_policy_text, None);
    }

    #[test]
    fn defaults_missing_operand_fields() {
        let src = r#"{"insns":[{"opcode":"NOP"}]}"#;
        let p = parse(src).unwrap();
        assert_eq!(p.insns[0], Insn { opcode: Opcode::Nop, a: 0, b: 0, c: 0 });
    }

    #[test]
    fn empty_insns_is_an_error() {
        let src = r#"{"insns":[]}"#;
        assert!(parse(src).is_err());
    }

    #[test]
    fn round_trips_through_to_json() {
        let program = Program {
            insns: vec![
                Insn { opcode: Opcode::LoadImm, a: 0, b: 7, c: 0 },
                Insn { opcode: Opcode::Halt, a: 0, b: 0, c: 0 },
            ],
            axion_policy_text: Some("(tier 2)".to_string()),
        };
        let json = to_json(&program);
        let parsed = parse(&json).unwrap();
        assert_eq!(parsed, program);
    }
}
