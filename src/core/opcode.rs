//! TISC opcode tag set.
//!
//! Closed enumeration: every instruction's `opcode` field is one of these.
//! Discriminants are part of the observable contract (they appear in trace
//! entries, trap payloads, and the embedding ABI's `opcode` byte) so they
//! must never be renumbered once assigned.

/// The closed set of TISC opcodes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum Opcode {
    Nop = 0,
    Halt,
    Trap,
    Ret,

    LoadImm,
    Mov,
    Inc,
    Dec,
    Neg,

    Load,
    Store,

    Add,
    Sub,
    Mul,
    Div,
    Mod,

    FAdd,
    FSub,
    FMul,
    FDiv,

    FracAdd,
    FracSub,
    FracMul,
    FracDiv,

    I2F,
    F2I,
    I2Frac,
    Frac2I,

    Cmp,
    Less,
    LessEqual,
    Greater,
    GreaterEqual,
    Equal,
    NotEqual,

    TNot,
    TAnd,
    TOr,
    TXor,

    Jump,
    JumpIfZero,
    JumpIfNotZero,
    JumpIfNegative,
    JumpIfPositive,

    Call,

    Push,
    Pop,

    StackAlloc,
    StackFree,
    HeapAlloc,
    HeapFree,

    TVecAdd,
    TVecMul,
    TMatMul,
    TTenDot,
    TTranspose,
    TExp,
    TSqrt,
    TSiLU,
    TSoftmax,
    TRMSNorm,
    TRoPE,
    ChkShape,
    WeightsLoad,
    SetF,

    MakeOptionSome,
    MakeOptionNone,
    OptionIsSome,
    OptionUnwrap,

    MakeResultOk,
    MakeResultErr,
    ResultIsOk,
    ResultUnwrapOk,
    ResultUnwrapErr,

    MakeEnumVariant,
    MakeEnumVariantPayload,
    EnumIsVariant,
    EnumUnwrapPayload,

    AxRead,
    AxSet,
    AxVerify,
}

impl Opcode {
    /// Every opcode, in discriminant order. Used by the validator's
    /// membership check and by the text/JSON format loaders' name table.
    pub const ALL: &'static [Opcode] = &[
        Opcode::Nop,
        Opcode::Halt,
        Opcode::Trap,
        Opcode::Ret,
        Opcode::LoadImm,
        Opcode::Mov,
        Opcode::Inc,
        Opcode::Dec,
        Opcode::Neg,
        Opcode::Load,
        Opcode::Store,
        Opcode::Add,
        Opcode::Sub,
        Opcode::Mul,
        Opcode::Div,
        Opcode::Mod,
        Opcode::FAdd,
        Opcode::FSub,
        Opcode::FMul,
        Opcode::FDiv,
        Opcode::FracAdd,
        Opcode::FracSub,
        Opcode::FracMul,
        Opcode::FracDiv,
        Opcode::I2F,
        Opcode::F2I,
        Opcode::I2Frac,
        Opcode::Frac2I,
        Opcode::Cmp,
        Opcode::Less,
        Opcode::LessEqual,
        Opcode::Greater,
        Opcode::GreaterEqual,
        Opcode::Equal,
        Opcode::NotEqual,
        Opcode::TNot,
        Opcode::TAnd,
        Opcode::TOr,
        Opcode::TXor,
        Opcode::Jump,
        Opcode::JumpIfZero,
        Opcode::JumpIfNotZero,
        Opcode::JumpIfNegative,
        Opcode::JumpIfPositive,
        Opcode::Call,
        Opcode::Push,
        Opcode::Pop,
        Opcode::StackAlloc,
        Opcode::StackFree,
        Opcode::HeapAlloc,
        Opcode::HeapFree,
        Opcode::TVecAdd,
        Opcode::TVecMul,
        Opcode::TMatMul,
        Opcode::TTenDot,
        Opcode::TTranspose,
        Opcode::TExp,
        Opcode::TSqrt,
        Opcode::TSiLU,
        Opcode::TSoftmax,
        Opcode::TRMSNorm,
        Opcode::TRoPE,
        Opcode::ChkShape,
        Opcode::WeightsLoad,
        Opcode::SetF,
        Opcode::MakeOptionSome,
        Opcode::MakeOptionNone,
        Opcode::OptionIsSome,
        Opcode::OptionUnwrap,
        Opcode::MakeResultOk,
        Opcode::MakeResultErr,
        Opcode::ResultIsOk,
        Opcode::ResultUnwrapOk,
        Opcode::ResultUnwrapErr,
        Opcode::MakeEnumVariant,
        Opcode::MakeEnumVariantPayload,
        Opcode::EnumIsVariant,
        Opcode::EnumUnwrapPayload,
        Opcode::AxRead,
        Opcode::AxSet,
        Opcode::AxVerify,
    ];

    /// Canonical uppercase mnemonic, used by the text/JSON loaders and by
    /// `Display`.
    pub const fn name(self) -> &'static str {
        match self {
            Opcode::Nop => "NOP",
            Opcode::Halt => "HALT",
            Opcode::Trap => "TRAP",
            Opcode::Ret => "RET",
            Opcode::LoadImm => "LOADIMM",
            Opcode::Mov => "MOV",
            Opcode::Inc => "INC",
            Opcode::Dec => "DEC",
            Opcode::Neg => "NEG",
            Opcode::Load => "LOAD",
            Opcode::Store => "STORE",
            Opcode::Add => "ADD",
            Opcode::Sub => "SUB",
            Opcode::Mul => "MUL",
            Opcode::Div => "DIV",
            Opcode::Mod => "MOD",
            Opcode::FAdd => "FADD",
            Opcode::FSub => "FSUB",
            Opcode::FMul => "FMUL",
            Opcode::FDiv => "FDIV",
            Opcode::FracAdd => "FRACADD",
            Opcode::FracSub => "FRACSUB",
            Opcode::FracMul => "FRACMUL",
            Opcode::FracDiv => "FRACDIV",
            Opcode::I2F => "I2F",
            Opcode::F2I => "F2I",
            Opcode::I2Frac => "I2FRAC",
            Opcode::Frac2I => "FRAC2I",
            Opcode::Cmp => "CMP",
            Opcode::Less => "LESS",
            Opcode::LessEqual => "LESSEQUAL",
            Opcode::Greater => "GREATER",
            Opcode::GreaterEqual => "GREATEREQUAL",
            Opcode::Equal => "EQUAL",
            Opcode::NotEqual => "NOTEQUAL",
            Opcode::TNot => "TNOT",
            Opcode::TAnd => "TAND",
            Opcode::TOr => "TOR",
            Opcode::TXor => "TXOR",
            Opcode::Jump => "JUMP",
            Opcode::JumpIfZero => "JUMPIFZERO",
            Opcode::JumpIfNotZero => "JUMPIFNOTZERO",
            Opcode::JumpIfNegative => "JUMPIFNEGATIVE",
            Opcode::JumpIfPositive => "JUMPIFPOSITIVE",
            Opcode::Call => "CALL",
            Opcode::Push => "PUSH",
            Opcode::Pop => "POP",
            Opcode::StackAlloc => "STACKALLOC",
            Opcode::StackFree => "STACKFREE",
            Opcode::HeapAlloc => "HEAPALLOC",
            Opcode::HeapFree => "HEAPFREE",
            Opcode::TVecAdd => "TVECADD",
            Opcode::TVecMul => "TVECMUL",
            Opcode::TMatMul => "TMATMUL",
            Opcode::TTenDot => "TTENDOT",
            Opcode::TTranspose => "TTRANSPOSE",
            Opcode::TExp => "TEXP",
            Opcode::TSqrt => "TSQRT",
            Opcode::TSiLU => "TSILU",
            Opcode::TSoftmax => "TSOFTMAX",
            Opcode::TRMSNorm => "TRMSNORM",
            Opcode::TRoPE => "TROPE",
            Opcode::ChkShape => "CHKSHAPE",
            Opcode::WeightsLoad => "WEIGHTSLOAD",
            Opcode::SetF => "SETF",
            Opcode::MakeOptionSome => "MAKEOPTIONSOME",
            Opcode::MakeOptionNone => "MAKEOPTIONNONE",
            Opcode::OptionIsSome => "OPTIONISSOME",
            Opcode::OptionUnwrap => "OPTIONUNWRAP",
            Opcode::MakeResultOk => "MAKERESULTOK",
            Opcode::MakeResultErr => "MAKERESULTERR",
            Opcode::ResultIsOk => "RESULTISOK",
            Opcode::ResultUnwrapOk => "RESULTUNWRAPOK",
            Opcode::ResultUnwrapErr => "RESULTUNWRAPERR",
            Opcode::MakeEnumVariant => "MAKEENUMVARIANT",
            Opcode::MakeEnumVariantPayload => "MAKEENUMVARIANTPAYLOAD",
            Opcode::EnumIsVariant => "ENUMISVARIANT",
            Opcode::EnumUnwrapPayload => "ENUMUNWRAPPAYLOAD",
            Opcode::AxRead => "AXREAD",
            Opcode::AxSet => "AXSET",
            Opcode::AxVerify => "AXVERIFY",
        }
    }

    /// Recognize a mnemonic, matched case-insensitively with `_`/`-`
    /// stripped, including the documented aliases. Shared by the text and
    /// JSON loaders.
    pub fn from_name(raw: &str) -> Option<Opcode> {
        let mut s = String::with_capacity(raw.len());
        for ch in raw.chars() {
            if ch == '_' || ch == '-' {
                continue;
            }
            s.push(ch.to_ascii_uppercase());
        }
        Some(match s.as_str() {
            "NOP" => Opcode::Nop,
            "HALT" => Opcode::Halt,
            "TRAP" => Opcode::Trap,
            "RET" => Opcode::Ret,
            "LOADIMM" => Opcode::LoadImm,
            "MOV" => Opcode::Mov,
            "INC" => Opcode::Inc,
            "DEC" => Opcode::Dec,
            "NEG" => Opcode::Neg,
            "LOAD" => Opcode::Load,
            "STORE" => Opcode::Store,
            "ADD" => Opcode::Add,
            "SUB" => Opcode::Sub,
            "MUL" => Opcode::Mul,
            "DIV" => Opcode::Div,
            "MOD" => Opcode::Mod,
            "FADD" => Opcode::FAdd,
            "FSUB" => Opcode::FSub,
            "FMUL" => Opcode::FMul,
            "FDIV" => Opcode::FDiv,
            "FRACADD" => Opcode::FracAdd,
            "FRACSUB" => Opcode::FracSub,
            "FRACMUL" => Opcode::FracMul,
            "FRACDIV" => Opcode::FracDiv,
            "I2F" => Opcode::I2F,
            "F2I" => Opcode::F2I,
            "I2FRAC" => Opcode::I2Frac,
            "FRAC2I" => Opcode::Frac2I,
            "CMP" => Opcode::Cmp,
            "LESS" | "LT" => Opcode::Less,
            "LESSEQUAL" | "LE" => Opcode::LessEqual,
            "GREATER" | "GT" => Opcode::Greater,
            "GREATEREQUAL" | "GE" => Opcode::GreaterEqual,
            "EQUAL" | "EQ" => Opcode::Equal,
            "NOTEQUAL" | "NEQ" => Opcode::NotEqual,
            "TNOT" => Opcode::TNot,
            "TAND" => Opcode::TAnd,
            "TOR" => Opcode::TOr,
            "TXOR" => Opcode::TXor,
            "JUMP" | "JMP" => Opcode::Jump,
            "JUMPIFZERO" | "JZ" => Opcode::JumpIfZero,
            "JUMPIFNOTZERO" | "JNZ" => Opcode::JumpIfNotZero,
            "JUMPIFNEGATIVE" | "JN" => Opcode::JumpIfNegative,
            "JUMPIFPOSITIVE" | "JP" => Opcode::JumpIfPositive,
            "CALL" => Opcode::Call,
            "PUSH" => Opcode::Push,
            "POP" => Opcode::Pop,
            "STACKALLOC" => Opcode::StackAlloc,
            "STACKFREE" => Opcode::StackFree,
            "HEAPALLOC" => Opcode::HeapAlloc,
            "HEAPFREE" => Opcode::HeapFree,
            "TVECADD" => Opcode::TVecAdd,
            "TVECMUL" => Opcode::TVecMul,
            "TMATMUL" => Opcode::TMatMul,
            "TTENDOT" => Opcode::TTenDot,
            "TTRANSPOSE" => Opcode::TTranspose,
            "TEXP" => Opcode::TExp,
            "TSQRT" => Opcode::TSqrt,
            "TSILU" => Opcode::TSiLU,
            "TSOFTMAX" => Opcode::TSoftmax,
            "TRMSNORM" => Opcode::TRMSNorm,
            "TROPE" => Opcode::TRoPE,
            "CHKSHAPE" => Opcode::ChkShape,
            "WEIGHTSLOAD" => Opcode::WeightsLoad,
            "SETF" => Opcode::SetF,
            "MAKEOPTIONSOME" => Opcode::MakeOptionSome,
            "MAKEOPTIONNONE" => Opcode::MakeOptionNone,
            "OPTIONISSOME" => Opcode::OptionIsSome,
            "OPTIONUNWRAP" => Opcode::OptionUnwrap,
            "MAKERESULTOK" => Opcode::MakeResultOk,
            "MAKERESULTERR" => Opcode::MakeResultErr,
            "RESULTISOK" => Opcode::ResultIsOk,
            "RESULTUNWRAPOK" => Opcode::ResultUnwrapOk,
            "RESULTUNWRAPERR" => Opcode::ResultUnwrapErr,
            "MAKEENUMVARIANT" => Opcode::MakeEnumVariant,
            "MAKEENUMVARIANTPAYLOAD" => Opcode::MakeEnumVariantPayload,
            "ENUMISVARIANT" => Opcode::EnumIsVariant,
            "ENUMUNWRAPPAYLOAD" => Opcode::EnumUnwrapPayload,
            "AXREAD" => Opcode::AxRead,
            "AXSET" => Opcode::AxSet,
            "AXVERIFY" => Opcode::AxVerify,
            _ => return None,
        })
    }

    #[inline]
    pub const fn as_u64(self) -> u64 {
        self as u8 as u64
    }
}

impl std::fmt::Display for Opcode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}
