use std::fmt;
use std::str::FromStr;

/// The machine can address 65536 16-bit words.
pub const MEMORY_MAX: usize = 0x10000;

/// Represents the CPU registers.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Debug)]
pub enum Register {
    Ax = 0,
    Bx,
    Cx,
    Dx,
    /// Reserved as the stack pointer. Declared by the ISA but not touched by
    /// any opcode.
    Sp,
    /// Instruction pointer. Holds the memory index of the next word to fetch.
    Ip,
    /// Equality flag set by CMP, consulted by JE/JNE.
    Flags,
}

impl Register {
    pub const COUNT: usize = 7;

    /// All registers in encoding order.
    pub const ALL: [Register; Self::COUNT] = [
        Register::Ax,
        Register::Bx,
        Register::Cx,
        Register::Dx,
        Register::Sp,
        Register::Ip,
        Register::Flags,
    ];
}

impl FromStr for Register {
    type Err = ();

    /// Expects an upper-cased name.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "AX" => Ok(Register::Ax),
            "BX" => Ok(Register::Bx),
            "CX" => Ok(Register::Cx),
            "DX" => Ok(Register::Dx),
            "SP" => Ok(Register::Sp),
            "IP" => Ok(Register::Ip),
            "FLAGS" => Ok(Register::Flags),
            _ => Err(()),
        }
    }
}

impl TryFrom<u16> for Register {
    type Error = ();

    fn try_from(value: u16) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(Register::Ax),
            1 => Ok(Register::Bx),
            2 => Ok(Register::Cx),
            3 => Ok(Register::Dx),
            4 => Ok(Register::Sp),
            5 => Ok(Register::Ip),
            6 => Ok(Register::Flags),
            _ => Err(()),
        }
    }
}

impl fmt::Display for Register {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Register::Ax => "AX",
            Register::Bx => "BX",
            Register::Cx => "CX",
            Register::Dx => "DX",
            Register::Sp => "SP",
            Register::Ip => "IP",
            Register::Flags => "FLAGS",
        };
        f.write_str(name)
    }
}

/// Low-level opcodes as they appear in memory.
///
/// MOV/ADD/SUB exist in two variants so that the operand kind is decided once
/// at encode time and the interpreter never re-inspects it. CMP is the one
/// exception: both of its operands carry an explicit 0/1 type tag.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Opcode {
    Hlt = 0,
    MovImm = 1,
    AddImm = 2,
    SubImm = 3,
    MovReg = 4,
    AddReg = 5,
    SubReg = 6,
    Jmp = 7,
    Cmp = 8,
    Je = 9,
    Jne = 10,
}

impl Opcode {
    /// Number of operand words following the opcode word.
    pub fn arity(&self) -> u16 {
        match self {
            Opcode::Hlt => 0,
            Opcode::MovImm
            | Opcode::AddImm
            | Opcode::SubImm
            | Opcode::MovReg
            | Opcode::AddReg
            | Opcode::SubReg => 2,
            Opcode::Jmp | Opcode::Je | Opcode::Jne => 1,
            Opcode::Cmp => 4,
        }
    }
}

impl TryFrom<u16> for Opcode {
    type Error = ();

    fn try_from(value: u16) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(Opcode::Hlt),
            1 => Ok(Opcode::MovImm),
            2 => Ok(Opcode::AddImm),
            3 => Ok(Opcode::SubImm),
            4 => Ok(Opcode::MovReg),
            5 => Ok(Opcode::AddReg),
            6 => Ok(Opcode::SubReg),
            7 => Ok(Opcode::Jmp),
            8 => Ok(Opcode::Cmp),
            9 => Ok(Opcode::Je),
            10 => Ok(Opcode::Jne),
            _ => Err(()),
        }
    }
}

/// CMP operand type tag: the following word is a register id.
pub const TAG_REG: u16 = 0;
/// CMP operand type tag: the following word is a literal value.
pub const TAG_IMM: u16 = 1;

/// A populated memory image produced by the assembler.
///
/// Code and data share the flat word array; the write cursor only ever moves
/// forward and starts at 0.
#[derive(PartialEq, Eq, Debug)]
pub struct MemImage {
    words: Box<[u16; MEMORY_MAX]>,
    len: usize,
}

impl MemImage {
    pub fn new() -> Self {
        MemImage {
            words: Box::new([0; MEMORY_MAX]),
            len: 0,
        }
    }

    /// Append a word at the write cursor. Returns `false` once the image is
    /// full.
    pub fn push(&mut self, word: u16) -> bool {
        if self.len >= MEMORY_MAX {
            return false;
        }
        self.words[self.len] = word;
        self.len += 1;
        true
    }

    /// Words written so far.
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn words(&self) -> &[u16; MEMORY_MAX] {
        &self.words
    }

    pub fn into_words(self) -> Box<[u16; MEMORY_MAX]> {
        self.words
    }
}

impl Default for MemImage {
    fn default() -> Self {
        Self::new()
    }
}
