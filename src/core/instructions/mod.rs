//! Opcode family implementations consumed by `core::interpreter`'s
//! dispatch table. Control flow, moves, memory, ALU, comparisons,
//! ternary logic, calls, and stack/frame management are small enough to
//! live directly on `core::interpreter::State::dispatch`; the larger
//! families get their own module here, mirroring how the rest of this
//! crate splits instruction families by file.

pub mod axion;
pub mod structured;
pub mod tensor;
