//! Opcode dispatch: the fetch-decode-execute cycle.
//!
//! `State::step` is the single entry point every opcode's semantics runs
//! through. Simple instruction families (control flow, moves, memory,
//! ALU, comparisons, ternary logic, the call/branch/stack machinery) are
//! implemented directly below; the larger tensor, structured-value, and
//! axion-guard families live in `core::instructions::{tensor,structured,axion}`
//! to keep this file to the dispatch table plus the families that are
//! genuinely a few lines each.

use crate::core::instructions::{axion, structured, tensor};
use crate::core::memory::segment_of;
use crate::core::opcode::Opcode;
use crate::core::program::Insn;
use crate::core::state::{Flags, State, GC_INTERVAL};
use crate::core::trap::{SegmentKind, Trap, TraceEntry, TrapPayload};
use crate::core::value::{AxionLogEntry, ValueTag};

type Write = Option<(usize, i64, ValueTag)>;

impl State {
    /// Replace `self` with a fresh initial state built by `core::loader`,
    /// dropping every pool, the call stack, and the step counter.
    pub fn load_program(&mut self, program: &crate::core::program::Program) {
        *self = crate::core::loader::load_program(program);
    }

    /// Write `value` into register `index`, tagging it `Int`. The only
    /// mutation external callers may perform besides stepping.
    pub fn set_register(&mut self, index: usize, value: i64) {
        if index < crate::core::state::REGISTER_COUNT {
            self.registers[index] = value;
            self.register_tags[index] = ValueTag::Int;
        }
    }

    /// Execute one instruction. A halted machine returns `Ok(())` without
    /// side effects; any fault is recorded in `trace` and
    /// `last_trap_payload` before being returned.
    pub fn step(&mut self) -> Result<(), Trap> {
        if self.halted {
            return Ok(());
        }

        if let Some(trap) = self.preload_trap.take() {
            log::debug!("preload trap surfaced at pc={}: {trap}", self.pc);
            self.trace.push(TraceEntry { pc: self.pc, opcode: Opcode::Nop, write: None, trap: Some(trap) });
            self.last_trap_payload = Some(TrapPayload {
                trap,
                pc: self.pc,
                opcode: Opcode::Nop,
                a: 0,
                b: 0,
                c: 0,
                segment: SegmentKind::Unknown,
                detail: String::new(),
            });
            return Err(trap);
        }

        if self.pc >= self.layout.code.limit {
            return Err(self.fault(Insn { opcode: Opcode::Nop, a: 0, b: 0, c: 0 }, Trap::DecodeFault, SegmentKind::Unknown, ""));
        }

        let insn = self.program.insns[self.pc];
        self.steps += 1;
        if self.steps % GC_INTERVAL == 0 {
            self.gc_cycles += 1;
        }
        log::trace!("step pc={} opcode={}", self.pc, insn.opcode);

        match self.dispatch(insn) {
            Ok((write, next_pc)) => {
                if let Some((idx, value, tag)) = write {
                    self.registers[idx] = value;
                    self.register_tags[idx] = tag;
                }
                self.trace.push(TraceEntry { pc: self.pc, opcode: insn.opcode, write, trap: None });
                self.pc = next_pc;
                Ok(())
            }
            Err(trap) => Err(trap),
        }
    }

    /// Step up to `max_steps` times. Any trap from `step` is forwarded
    /// immediately; if the machine is still running after the budget,
    /// return the watchdog trap `TrapInstruction`.
    pub fn run_to_halt(&mut self, max_steps: u64) -> Result<(), Trap> {
        for _ in 0..max_steps {
            self.step()?;
            if self.halted {
                return Ok(());
            }
        }
        if self.halted {
            Ok(())
        } else {
            Err(Trap::TrapInstruction)
        }
    }

    /// Record a trace entry and trap payload for `trap`, return it.
    fn fault(&mut self, insn: Insn, trap: Trap, segment: SegmentKind, detail: &str) -> Trap {
        self.trace.push(TraceEntry { pc: self.pc, opcode: insn.opcode, write: None, trap: Some(trap) });
        self.last_trap_payload = Some(TrapPayload {
            trap,
            pc: self.pc,
            opcode: insn.opcode,
            a: insn.a,
            b: insn.b,
            c: insn.c,
            segment,
            detail: detail.to_string(),
        });
        log::debug!("trap {trap} at pc={} opcode={} detail={detail:?}", self.pc, insn.opcode);
        trap
    }

    fn segment_of_addr(&self, addr: i64) -> SegmentKind {
        if addr < 0 || addr as usize >= self.memory.len() {
            SegmentKind::Unknown
        } else {
            segment_of(&self.layout, addr as usize)
        }
    }

    fn bounds_ok(&self, addr: i64) -> bool {
        addr >= 0 && (addr as usize) < self.memory.len() && self.segment_of_addr(addr) != SegmentKind::Unknown
    }

    fn log_bounds_fault(&mut self, addr: i64, detail: &str) {
        let segment = self.segment_of_addr(addr);
        self.axion_log.push(AxionLogEntry {
            opcode: Opcode::Store,
            reason: format!("bounds fault segment={segment} addr={addr} action={detail}"),
        });
    }

    fn push_frame_log(&mut self, opcode: Opcode, reason: String) {
        self.axion_log.push(AxionLogEntry { opcode, reason });
    }

    /// Run one instruction's semantics. Returns the register write (if
    /// any) and the next program counter; the caller appends the trace
    /// entry and commits `pc`.
    fn dispatch(&mut self, insn: Insn) -> Result<(Write, usize), Trap> {
        let pc = self.pc;
        let next = pc + 1;

        use Opcode::*;
        let outcome: Result<Write, Trap> = match insn.opcode {
            Nop => Ok(None),
            Halt => {
                self.halted = true;
                Ok(None)
            }
            Trap => Err(self.fault(insn, crate::core::trap::Trap::TrapInstruction, SegmentKind::Unknown, "")),
            Ret => {
                match self.call_stack.pop() {
                    Some(target) => return Ok((None, target)),
                    None => Err(self.fault(insn, crate::core::trap::Trap::StackFault, SegmentKind::Unknown, "")),
                }
            }

            LoadImm => {
                self.flags = Flags::from_value(insn.b);
                Ok(Some((insn.a as usize, insn.b, ValueTag::Int)))
            }
            Mov => {
                let b = insn.b as usize;
                let (value, tag) = (self.registers[b], self.register_tags[b]);
                self.flags = Flags::from_value(value);
                Ok(Some((insn.a as usize, value, tag)))
            }
            Inc => {
                let a = insn.a as usize;
                let value = self.registers[a].wrapping_add(1);
                self.flags = Flags::from_value(value);
                Ok(Some((a, value, ValueTag::Int)))
            }
            Dec => {
                let a = insn.a as usize;
                let value = self.registers[a].wrapping_sub(1);
                self.flags = Flags::from_value(value);
                Ok(Some((a, value, ValueTag::Int)))
            }
            Neg => {
                let value = self.registers[insn.b as usize].wrapping_neg();
                self.flags = Flags::from_value(value);
                Ok(Some((insn.a as usize, value, ValueTag::Int)))
            }

            Load => self.exec_load(insn),
            Store => self.exec_store(insn),

            Add => self.exec_alu(insn, i64::wrapping_add),
            Sub => self.exec_alu(insn, i64::wrapping_sub),
            Mul => self.exec_alu(insn, i64::wrapping_mul),
            Div => self.exec_divmod(insn, true),
            Mod => self.exec_divmod(insn, false),

            FAdd => self.exec_alu(insn, i64::wrapping_add),
            FSub => self.exec_alu(insn, i64::wrapping_sub),
            FMul => self.exec_alu(insn, i64::wrapping_mul),
            FDiv => self.exec_divmod(insn, true),

            FracAdd => self.exec_alu(insn, i64::wrapping_add),
            FracSub => self.exec_alu(insn, i64::wrapping_sub),
            FracMul => self.exec_alu(insn, i64::wrapping_mul),
            FracDiv => self.exec_divmod(insn, true),

            I2F | F2I | I2Frac | Frac2I => {
                let b = insn.b as usize;
                let (value, tag) = (self.registers[b], self.register_tags[b]);
                self.flags = Flags::from_value(value);
                Ok(Some((insn.a as usize, value, tag)))
            }

            Cmp => {
                let diff = self.registers[insn.a as usize].wrapping_sub(self.registers[insn.b as usize]);
                self.flags = Flags::from_value(diff);
                Ok(None)
            }
            Less => self.exec_cmp(insn, |x, y| x < y),
            LessEqual => self.exec_cmp(insn, |x, y| x <= y),
            Greater => self.exec_cmp(insn, |x, y| x > y),
            GreaterEqual => self.exec_cmp(insn, |x, y| x >= y),
            Equal => self.exec_cmp(insn, |x, y| x == y),
            NotEqual => self.exec_cmp(insn, |x, y| x != y),

            TNot => {
                let value = -tclamp(self.registers[insn.b as usize]);
                self.flags = Flags::from_value(value);
                Ok(Some((insn.a as usize, value, ValueTag::Int)))
            }
            TAnd => {
                let value = tclamp(self.registers[insn.b as usize]).min(tclamp(self.registers[insn.c as usize]));
                self.flags = Flags::from_value(value);
                Ok(Some((insn.a as usize, value, ValueTag::Int)))
            }
            TOr => {
                let value = tclamp(self.registers[insn.b as usize]).max(tclamp(self.registers[insn.c as usize]));
                self.flags = Flags::from_value(value);
                Ok(Some((insn.a as usize, value, ValueTag::Int)))
            }
            TXor => {
                let raw = tclamp(self.registers[insn.b as usize]) - tclamp(self.registers[insn.c as usize]);
                let value = if raw > 1 { -1 } else if raw < -1 { 1 } else { raw };
                self.flags = Flags::from_value(value);
                Ok(Some((insn.a as usize, value, ValueTag::Int)))
            }

            Jump => {
                let target = self.check_branch_target(insn)?;
                return Ok((None, target));
            }
            JumpIfZero => return self.exec_conditional_jump(insn, self.flags.zero, next),
            JumpIfNotZero => return self.exec_conditional_jump(insn, !self.flags.zero, next),
            JumpIfNegative => return self.exec_conditional_jump(insn, self.flags.negative, next),
            JumpIfPositive => return self.exec_conditional_jump(insn, self.flags.positive, next),

            Call => {
                let a = insn.a as usize;
                let target = self.registers[a];
                if target < 0 || (target as usize) >= self.layout.code.limit {
                    Err(self.fault(insn, crate::core::trap::Trap::DecodeFault, SegmentKind::Unknown, ""))
                } else {
                    self.call_stack.push(next);
                    return Ok((None, target as usize));
                }
            }

            Push => self.exec_push(insn),
            Pop => self.exec_pop(insn),

            StackAlloc => self.exec_stack_alloc(insn),
            StackFree => self.exec_stack_free(insn),
            HeapAlloc => self.exec_heap_alloc(insn),
            HeapFree => self.exec_heap_free(insn),

            TVecAdd => self.via_submodule(insn, tensor::tvec_add),
            TVecMul => self.via_submodule(insn, tensor::tvec_mul),
            TMatMul => self.via_submodule(insn, tensor::tmat_mul),
            TTenDot => self.via_submodule(insn, tensor::tten_dot),
            TTranspose => self.via_submodule(insn, tensor::ttranspose),
            TExp => self.via_submodule(insn, tensor::texp),
            TSqrt => self.via_submodule(insn, tensor::tsqrt),
            TSiLU => self.via_submodule(insn, tensor::tsilu),
            TSoftmax => self.via_submodule(insn, tensor::tsoftmax),
            TRMSNorm => self.via_submodule(insn, tensor::trmsnorm),
            TRoPE => self.via_submodule(insn, tensor::trope),
            ChkShape => self.via_submodule(insn, tensor::chk_shape),
            WeightsLoad => self.via_submodule(insn, tensor::weights_load),
            SetF => self.via_submodule(insn, tensor::set_f),

            MakeOptionSome => self.via_submodule(insn, structured::make_option_some),
            MakeOptionNone => self.via_submodule(insn, structured::make_option_none),
            OptionIsSome => self.via_submodule(insn, structured::option_is_some),
            OptionUnwrap => self.via_submodule(insn, structured::option_unwrap),

            MakeResultOk => self.via_submodule(insn, structured::make_result_ok),
            MakeResultErr => self.via_submodule(insn, structured::make_result_err),
            ResultIsOk => self.via_submodule(insn, structured::result_is_ok),
            ResultUnwrapOk => self.via_submodule(insn, structured::result_unwrap_ok),
            ResultUnwrapErr => self.via_submodule(insn, structured::result_unwrap_err),

            MakeEnumVariant => self.via_submodule(insn, structured::make_enum_variant),
            MakeEnumVariantPayload => self.via_submodule(insn, structured::make_enum_variant_payload),
            EnumIsVariant => self.via_submodule(insn, structured::enum_is_variant),
            EnumUnwrapPayload => self.via_submodule(insn, structured::enum_unwrap_payload),

            AxRead => self.via_submodule(insn, axion::ax_read),
            AxSet => self.via_submodule(insn, axion::ax_set),
            AxVerify => self.via_submodule(insn, axion::ax_verify),
        };

        match outcome {
            Ok(write) => Ok((write, next)),
            Err(trap) => Err(trap),
        }
    }

    /// Run a tensor/structured/axion opcode function and, on trap, route it
    /// through `fault` so the trace entry and `last_trap_payload` are
    /// recorded exactly as they are for the opcodes handled inline above.
    /// These families never fault on a classifiable address, so the
    /// payload's segment is always `Unknown` and its detail empty — the
    /// same convention the inline call/ret/trap-instruction faults use.
    fn via_submodule(&mut self, insn: Insn, f: fn(&mut State, Insn) -> Result<Write, Trap>) -> Result<Write, Trap> {
        f(self, insn).map_err(|trap| self.fault(insn, trap, SegmentKind::Unknown, ""))
    }

    fn check_branch_target(&mut self, insn: Insn) -> Result<usize, Trap> {
        if insn.a < 0 || (insn.a as usize) >= self.layout.code.limit {
            Err(self.fault(insn, crate::core::trap::Trap::DecodeFault, SegmentKind::Unknown, ""))
        } else {
            Ok(insn.a as usize)
        }
    }

    fn exec_conditional_jump(&mut self, insn: Insn, taken: bool, fallthrough: usize) -> Result<(Write, usize), Trap> {
        if taken {
            let target = self.check_branch_target(insn)?;
            Ok((None, target))
        } else {
            Ok((None, fallthrough))
        }
    }

    fn exec_load(&mut self, insn: Insn) -> Result<Write, Trap> {
        let addr = insn.b;
        if !self.bounds_ok(addr) {
            self.log_bounds_fault(addr, "memory load");
            return Err(self.fault(insn, crate::core::trap::Trap::BoundsFault, self.segment_of_addr(addr), "memory load"));
        }
        let value = self.memory[addr as usize];
        self.flags = Flags::from_value(value);
        Ok(Some((insn.a as usize, value, ValueTag::Int)))
    }

    fn exec_store(&mut self, insn: Insn) -> Result<Write, Trap> {
        let addr = insn.a;
        if !self.bounds_ok(addr) {
            self.log_bounds_fault(addr, "memory store");
            return Err(self.fault(insn, crate::core::trap::Trap::BoundsFault, self.segment_of_addr(addr), "memory store"));
        }
        let value = self.registers[insn.b as usize];
        self.memory[addr as usize] = value;
        let segment = self.segment_of_addr(addr);
        self.push_frame_log(Opcode::Store, format!("segment access {segment}"));
        Ok(None)
    }

    fn exec_alu(&mut self, insn: Insn, op: fn(i64, i64) -> i64) -> Result<Write, Trap> {
        let value = op(self.registers[insn.b as usize], self.registers[insn.c as usize]);
        self.flags = Flags::from_value(value);
        Ok(Some((insn.a as usize, value, ValueTag::Int)))
    }

    fn exec_divmod(&mut self, insn: Insn, is_div: bool) -> Result<Write, Trap> {
        let divisor = self.registers[insn.c as usize];
        if divisor == 0 {
            return Err(self.fault(insn, crate::core::trap::Trap::DivisionFault, SegmentKind::Unknown, "division by zero"));
        }
        let lhs = self.registers[insn.b as usize];
        let value = if is_div { lhs.wrapping_div(divisor) } else { lhs.wrapping_rem(divisor) };
        self.flags = Flags::from_value(value);
        Ok(Some((insn.a as usize, value, ValueTag::Int)))
    }

    fn exec_cmp(&mut self, insn: Insn, cmp: fn(i64, i64) -> bool) -> Result<Write, Trap> {
        let value = cmp(self.registers[insn.b as usize], self.registers[insn.c as usize]) as i64;
        self.flags = Flags::from_value(value);
        Ok(Some((insn.a as usize, value, ValueTag::Int)))
    }

    fn exec_push(&mut self, insn: Insn) -> Result<Write, Trap> {
        if self.sp == 0 || self.sp - 1 < self.layout.stack.start {
            return Err(self.fault(insn, crate::core::trap::Trap::StackFault, SegmentKind::Stack, "stack push"));
        }
        self.sp -= 1;
        self.memory[self.sp] = self.registers[insn.a as usize];
        Ok(None)
    }

    fn exec_pop(&mut self, insn: Insn) -> Result<Write, Trap> {
        if self.sp >= self.layout.stack.limit {
            return Err(self.fault(insn, crate::core::trap::Trap::StackFault, SegmentKind::Stack, "stack pop"));
        }
        let value = self.memory[self.sp];
        self.sp += 1;
        Ok(Some((insn.a as usize, value, ValueTag::Int)))
    }

    fn exec_stack_alloc(&mut self, insn: Insn) -> Result<Write, Trap> {
        let size = insn.b;
        if size <= 0 || (self.sp as i64) - size < self.layout.stack.start as i64 {
            return Err(self.fault(insn, crate::core::trap::Trap::StackFault, SegmentKind::Stack, "stack frame allocate"));
        }
        self.sp -= size as usize;
        self.stack_frames.push((self.sp, size as usize));
        self.push_frame_log(Opcode::StackAlloc, format!("stack frame allocated start={} size={}", self.sp, size));
        Ok(Some((insn.a as usize, self.sp as i64, ValueTag::Int)))
    }

    fn exec_stack_free(&mut self, insn: Insn) -> Result<Write, Trap> {
        let top = match self.stack_frames.last() {
            Some(&f) => f,
            None => return Err(self.fault(insn, crate::core::trap::Trap::StackFault, SegmentKind::Stack, "stack frame free")),
        };
        if self.registers[insn.a as usize] != top.0 as i64 || insn.b != top.1 as i64 {
            return Err(self.fault(insn, crate::core::trap::Trap::StackFault, SegmentKind::Stack, "stack frame free"));
        }
        self.stack_frames.pop();
        self.sp = top.0 + top.1;
        self.push_frame_log(Opcode::StackFree, format!("stack frame freed start={} size={}", top.0, top.1));
        Ok(None)
    }

    fn exec_heap_alloc(&mut self, insn: Insn) -> Result<Write, Trap> {
        let size = insn.b;
        if size <= 0 {
            return Err(self.fault(insn, crate::core::trap::Trap::DecodeFault, SegmentKind::Heap, ""));
        }
        if self.heap_ptr + size as usize > self.layout.heap.limit {
            return Err(self.fault(insn, crate::core::trap::Trap::BoundsFault, SegmentKind::Heap, "heap block allocate"));
        }
        let start = self.heap_ptr;
        self.heap_ptr += size as usize;
        self.heap_frames.push((start, size as usize));
        self.push_frame_log(Opcode::HeapAlloc, format!("heap block allocated start={start} size={size}"));
        Ok(Some((insn.a as usize, start as i64, ValueTag::Int)))
    }

    fn exec_heap_free(&mut self, insn: Insn) -> Result<Write, Trap> {
        let top = match self.heap_frames.last() {
            Some(&f) => f,
            None => return Err(self.fault(insn, crate::core::trap::Trap::DecodeFault, SegmentKind::Heap, "heap block free")),
        };
        if self.registers[insn.a as usize] != top.0 as i64 || insn.b != top.1 as i64 {
            return Err(self.fault(insn, crate::core::trap::Trap::DecodeFault, SegmentKind::Heap, "heap block free"));
        }
        self.heap_frames.pop();
        self.heap_ptr = top.0;
        self.push_frame_log(Opcode::HeapFree, format!("heap block freed start={} size={}", top.0, top.1));
        Ok(None)
    }
}

fn tclamp(v: i64) -> i64 {
    v.clamp(-1, 1)
}
