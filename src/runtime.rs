use crate::isa::{MemImage, Opcode, Register, MEMORY_MAX, TAG_REG};

/// Why the interpreter stopped.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Halt {
    /// HLT executed.
    Normal,
    /// The word at `addr` is not a defined opcode.
    UnknownOpcode { addr: u16, word: u16 },
    /// A register-id operand word at `addr` names no register.
    BadRegister { addr: u16, word: u16 },
}

/// Represents complete program state during runtime.
pub struct RunState {
    /// System memory - 65536 words, code and data undivided.
    mem: Box<[u16; MEMORY_MAX]>,
    /// 7x 16-bit registers, IP and FLAGS included.
    reg: [u16; Register::COUNT],
    /// Log each fetch to stderr.
    trace: bool,
}

impl RunState {
    /// Fresh zeroed machine with the given image loaded at address 0.
    pub fn from_image(image: MemImage) -> RunState {
        RunState {
            mem: image.into_words(),
            reg: [0; Register::COUNT],
            trace: false,
        }
    }

    pub fn set_trace(&mut self, trace: bool) {
        self.trace = trace;
    }

    pub fn reg(&self, reg: Register) -> u16 {
        self.reg[reg as usize]
    }

    fn reg_mut(&mut self, reg: Register) -> &mut u16 {
        &mut self.reg[reg as usize]
    }

    fn ip(&self) -> u16 {
        self.reg(Register::Ip)
    }

    /// Operand addresses wrap mod 65536 rather than reading out of bounds.
    fn mem_at(&self, addr: u16) -> u16 {
        self.mem[addr as usize]
    }

    /// Run the fetch-decode-execute cycle until the machine halts.
    ///
    /// There is no step budget: a program without a reachable HLT runs
    /// forever. Registers stay observable whichever way the loop ends.
    pub fn run(&mut self) -> Halt {
        loop {
            if let Err(halt) = self.step() {
                return halt;
            }
        }
    }

    /// Execute a single instruction. `Err` means the machine stopped, with IP
    /// left pointing at the word it stopped on.
    fn step(&mut self) -> Result<(), Halt> {
        let at = self.ip();
        let word = self.mem_at(at);
        let opcode =
            Opcode::try_from(word).map_err(|()| Halt::UnknownOpcode { addr: at, word })?;

        if self.trace {
            eprintln!("{at:04x}: {opcode:?}");
        }

        match opcode {
            Opcode::Hlt => return Err(Halt::Normal),
            Opcode::MovImm => {
                let dest = self.reg_operand(at, 1)?;
                let val = self.mem_at(at.wrapping_add(2));
                *self.reg_mut(dest) = val;
            }
            Opcode::AddImm => {
                let dest = self.reg_operand(at, 1)?;
                let val = self.mem_at(at.wrapping_add(2));
                *self.reg_mut(dest) = self.reg(dest).wrapping_add(val);
            }
            Opcode::SubImm => {
                let dest = self.reg_operand(at, 1)?;
                let val = self.mem_at(at.wrapping_add(2));
                *self.reg_mut(dest) = self.reg(dest).wrapping_sub(val);
            }
            Opcode::MovReg => {
                let dest = self.reg_operand(at, 1)?;
                let src = self.reg_operand(at, 2)?;
                *self.reg_mut(dest) = self.reg(src);
            }
            Opcode::AddReg => {
                let dest = self.reg_operand(at, 1)?;
                let src = self.reg_operand(at, 2)?;
                *self.reg_mut(dest) = self.reg(dest).wrapping_add(self.reg(src));
            }
            Opcode::SubReg => {
                let dest = self.reg_operand(at, 1)?;
                let src = self.reg_operand(at, 2)?;
                *self.reg_mut(dest) = self.reg(dest).wrapping_sub(self.reg(src));
            }
            Opcode::Jmp => {
                let addr = self.mem_at(at.wrapping_add(1));
                *self.reg_mut(Register::Ip) = addr;
                return Ok(());
            }
            Opcode::Cmp => {
                let lhs = self.tagged_operand(at, 1)?;
                let rhs = self.tagged_operand(at, 3)?;
                *self.reg_mut(Register::Flags) = (lhs == rhs) as u16;
            }
            Opcode::Je | Opcode::Jne => {
                let addr = self.mem_at(at.wrapping_add(1));
                let flags = self.reg(Register::Flags);
                let taken = match opcode {
                    Opcode::Je => flags == 1,
                    _ => flags == 0,
                };
                if taken {
                    *self.reg_mut(Register::Ip) = addr;
                    return Ok(());
                }
                // Not taken: skip the address word via the width advance.
            }
        }

        // IP is re-read here so an instruction that wrote to IP still gets
        // advanced by its own width on top of the written value.
        let width = 1 + opcode.arity();
        *self.reg_mut(Register::Ip) = self.ip().wrapping_add(width);
        Ok(())
    }

    /// Decode a register-id operand word.
    fn reg_operand(&self, at: u16, offs: u16) -> Result<Register, Halt> {
        let addr = at.wrapping_add(offs);
        let word = self.mem_at(addr);
        Register::try_from(word).map_err(|()| Halt::BadRegister { addr, word })
    }

    /// Resolve one CMP operand from its type tag and value word. Tag 0 means
    /// the value word is a register id; anything else means it is a literal.
    fn tagged_operand(&self, at: u16, offs: u16) -> Result<u16, Halt> {
        let tag = self.mem_at(at.wrapping_add(offs));
        let val_addr = at.wrapping_add(offs + 1);
        let val = self.mem_at(val_addr);
        if tag == TAG_REG {
            let reg = Register::try_from(val)
                .map_err(|()| Halt::BadRegister { addr: val_addr, word: val })?;
            Ok(self.reg(reg))
        } else {
            Ok(val)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::asm::assemble;
    use crate::isa::MemImage;

    fn image(words: &[u16]) -> MemImage {
        let mut img = MemImage::new();
        for &word in words {
            assert!(img.push(word));
        }
        img
    }

    fn run_raw(words: &[u16]) -> (RunState, Halt) {
        let mut state = RunState::from_image(image(words));
        let halt = state.run();
        (state, halt)
    }

    fn run_src(src: &'static str) -> (RunState, Halt) {
        let mut state = RunState::from_image(assemble(src).unwrap());
        let halt = state.run();
        (state, halt)
    }

    #[test]
    fn hlt_at_zero() {
        let (state, halt) = run_src("HLT");
        assert_eq!(halt, Halt::Normal);
        for reg in Register::ALL {
            assert_eq!(state.reg(reg), 0);
        }
    }

    #[test]
    fn mov_imm_then_halt() {
        let (state, halt) = run_src("MOV AX, 5\nHLT");
        assert_eq!(halt, Halt::Normal);
        assert_eq!(state.reg(Register::Ax), 5);
        assert_eq!(state.reg(Register::Ip), 3);
    }

    #[test]
    fn add_reg_to_reg() {
        let (state, _) = run_src("MOV AX, 5\nMOV BX, 3\nADD AX, BX\nHLT");
        assert_eq!(state.reg(Register::Ax), 8);
        assert_eq!(state.reg(Register::Bx), 3);
    }

    #[test]
    fn sub_wraps_below_zero() {
        let (state, _) = run_src("SUB AX, 1\nHLT");
        assert_eq!(state.reg(Register::Ax), 0xFFFF);
    }

    #[test]
    fn cmp_sets_and_clears_flags() {
        let (state, _) = run_src("MOV AX, 4\nCMP AX, 4\nHLT");
        assert_eq!(state.reg(Register::Flags), 1);

        let (state, _) = run_src("MOV AX, 4\nCMP AX, 5\nHLT");
        assert_eq!(state.reg(Register::Flags), 0);
    }

    #[test]
    fn je_taken_skips_instruction() {
        // Words: MOV 0..=2, CMP 3..=7, JE 8..=9, MOV BX 10..=12, HLT 13.
        let (state, halt) = run_src("MOV AX, 4\nCMP AX, 4\nJE 13\nMOV BX, 99\nHLT");
        assert_eq!(halt, Halt::Normal);
        assert_eq!(state.reg(Register::Flags), 1);
        assert_eq!(state.reg(Register::Bx), 0);
        assert_eq!(state.reg(Register::Ip), 13);
    }

    #[test]
    fn jne_taken_skips_instruction() {
        let (state, halt) = run_src("MOV AX, 1\nCMP AX, 2\nJNE 13\nMOV BX, 77\nHLT");
        assert_eq!(halt, Halt::Normal);
        assert_eq!(state.reg(Register::Flags), 0);
        assert_eq!(state.reg(Register::Bx), 0);
    }

    #[test]
    fn je_not_taken_advances_by_width() {
        // FLAGS starts 0, so JE falls through past its address word.
        let (state, halt) = run_raw(&[9, 0, 0]);
        assert_eq!(halt, Halt::Normal);
        assert_eq!(state.reg(Register::Ip), 2);
    }

    #[test]
    fn cmp_reg_reg_operands() {
        let (state, _) = run_src("MOV AX, 3\nMOV BX, 3\nCMP AX, BX\nHLT");
        assert_eq!(state.reg(Register::Flags), 1);
    }

    #[test]
    fn jmp_is_unconditional() {
        // JMP 3 lands on the zero word there, which is HLT.
        let (state, halt) = run_raw(&[7, 3, 99]);
        assert_eq!(halt, Halt::Normal);
        assert_eq!(state.reg(Register::Ip), 3);
    }

    #[test]
    fn unknown_opcode_halts_abnormally() {
        let (state, halt) = run_raw(&[1, 0, 7, 99]);
        assert_eq!(halt, Halt::UnknownOpcode { addr: 3, word: 99 });
        // Register state as of the fault stays observable.
        assert_eq!(state.reg(Register::Ax), 7);
        assert_eq!(state.reg(Register::Ip), 3);
    }

    #[test]
    fn bad_register_id_halts_abnormally() {
        let (_, halt) = run_raw(&[4, 9, 0]);
        assert_eq!(halt, Halt::BadRegister { addr: 1, word: 9 });
    }

    #[test]
    fn operand_read_wraps_at_top_of_memory() {
        let mut words = vec![0u16; MEMORY_MAX];
        words[0] = 7; // JMP 0xFFFE
        words[1] = 0xFFFE;
        words[0xFFFE] = 1; // MOV AX, <immediate past the end of memory>
        words[0xFFFF] = 0;
        let (state, halt) = run_raw(&words);
        // The immediate word sits at wrapped address 0, which holds the JMP
        // opcode word; the advanced IP wraps to 1 and faults on the target
        // address word there.
        assert_eq!(state.reg(Register::Ax), 7);
        assert_eq!(halt, Halt::UnknownOpcode { addr: 1, word: 0xFFFE });
    }

    #[test]
    fn mov_to_ip_is_advanced_past() {
        // The width advance applies on top of the written IP value.
        let (state, halt) = run_raw(&[1, 5, 7]);
        assert_eq!(halt, Halt::Normal);
        assert_eq!(state.reg(Register::Ip), 10);
    }

    #[test]
    fn loop_counts_down() {
        // Decrement CX from 3 to 0. Words: MOV 0..=2, SUB 3..=5,
        // CMP 6..=10, JNE 11..=12, HLT 13.
        let (state, halt) = run_src(
            "MOV CX, 3\n\
             SUB CX, 1\n\
             CMP CX, 0\n\
             JNE 3\n\
             HLT",
        );
        assert_eq!(halt, Halt::Normal);
        assert_eq!(state.reg(Register::Cx), 0);
        assert_eq!(state.reg(Register::Flags), 1);
    }
}
