use std::str::FromStr;

use miette::Result;

use crate::error;
use crate::isa::{MemImage, Opcode, Register, TAG_IMM, TAG_REG};
use crate::source::{Span, SrcOffset};

/// Assemble source text into a fresh memory image.
///
/// One instruction per line; `//` starts a comment; blank lines are skipped.
/// Stops at the first malformed line.
pub fn assemble(src: &'static str) -> Result<MemImage> {
    Assembler::new(src).assemble()
}

/// Encodes mnemonic instructions into a flat word image, one line at a time.
///
/// The write cursor starts at 0 and only ever moves forward, so jump targets
/// are raw absolute word offsets the programmer computes by hand.
pub struct Assembler {
    /// Reference to the source file
    src: &'static str,
    /// Image under construction
    mem: MemImage,
}

/// What an operand token turned out to be.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
enum Classified {
    Imm(u16),
    Reg(Register),
    /// All digits, but does not parse.
    BadLiteral,
    /// Neither a number nor a register name.
    Unknown,
}

impl Assembler {
    pub fn new(src: &'static str) -> Self {
        Assembler {
            src,
            mem: MemImage::new(),
        }
    }

    /// Encode every line in order. First error wins; no partial image is
    /// returned on failure.
    pub fn assemble(mut self) -> Result<MemImage> {
        let src = self.src;
        let mut offs = 0;
        for (idx, line) in src.split('\n').enumerate() {
            self.encode_line(line, idx + 1, offs)?;
            offs += line.len() + 1;
        }
        Ok(self.mem)
    }

    fn encode_line(&mut self, line: &str, line_num: usize, base: usize) -> Result<()> {
        // Strip the comment suffix, then surrounding whitespace.
        let code = match line.find("//") {
            Some(at) => &line[..at],
            None => line,
        };
        let text = code.trim();
        if text.is_empty() {
            return Ok(());
        }

        // Mnemonic ends at the first whitespace; the first operand ends at
        // the first comma.
        let (mnemonic, rest) = match text.find(char::is_whitespace) {
            Some(at) => (&text[..at], text[at..].trim()),
            None => (text, ""),
        };
        let operands: Vec<&str> = if rest.is_empty() {
            Vec::new()
        } else {
            match rest.split_once(',') {
                Some((first, second)) => {
                    let second = second.trim();
                    if second.is_empty() {
                        vec![first.trim()]
                    } else {
                        vec![first.trim(), second]
                    }
                }
                None => vec![rest],
            }
        };

        let upper = mnemonic.to_ascii_uppercase();
        let stmt_span = self.span_of(base, line, text);

        match upper.as_str() {
            "HLT" => {
                if !operands.is_empty() {
                    return Err(error::asm_operand_count(
                        stmt_span, self.src, line_num, &upper, 0,
                    ));
                }
                self.emit(&[Opcode::Hlt as u16], stmt_span, line_num)?;
            }
            "MOV" | "ADD" | "SUB" => {
                if operands.len() != 2 {
                    return Err(error::asm_operand_count(
                        stmt_span, self.src, line_num, &upper, 2,
                    ));
                }
                let dest = self.expect_register(operands[0], base, line, line_num)?;
                let (imm_op, reg_op) = match upper.as_str() {
                    "MOV" => (Opcode::MovImm, Opcode::MovReg),
                    "ADD" => (Opcode::AddImm, Opcode::AddReg),
                    _ => (Opcode::SubImm, Opcode::SubReg),
                };

                let src_tok = operands[1];
                let src_span = self.span_of(base, line, src_tok);
                let words = match classify(src_tok) {
                    Classified::Imm(val) => [imm_op as u16, dest as u16, val],
                    Classified::Reg(src) => [reg_op as u16, dest as u16, src as u16],
                    Classified::BadLiteral => {
                        return Err(error::asm_bad_literal(src_span, self.src, line_num, src_tok))
                    }
                    Classified::Unknown => {
                        return Err(error::asm_invalid_operand(
                            src_span, self.src, line_num, src_tok,
                        ))
                    }
                };
                self.emit(&words, stmt_span, line_num)?;
            }
            "JMP" | "JE" | "JNE" => {
                if operands.len() != 1 {
                    return Err(error::asm_operand_count(
                        stmt_span, self.src, line_num, &upper, 1,
                    ));
                }
                let tok = operands[0];
                let tok_span = self.span_of(base, line, tok);
                let addr = match classify(tok) {
                    Classified::Imm(addr) => addr,
                    Classified::BadLiteral => {
                        return Err(error::asm_bad_literal(tok_span, self.src, line_num, tok))
                    }
                    _ => {
                        return Err(error::asm_expected_address(
                            tok_span, self.src, line_num, &upper,
                        ))
                    }
                };
                let op = match upper.as_str() {
                    "JMP" => Opcode::Jmp,
                    "JE" => Opcode::Je,
                    _ => Opcode::Jne,
                };
                self.emit(&[op as u16, addr], stmt_span, line_num)?;
            }
            "CMP" => {
                if operands.len() != 2 {
                    return Err(error::asm_operand_count(
                        stmt_span, self.src, line_num, &upper, 2,
                    ));
                }
                // Only the first operand is constrained to a register; the
                // second carries an explicit type tag in the encoding.
                let lhs = self.expect_register(operands[0], base, line, line_num)?;
                let rhs_tok = operands[1];
                let rhs_span = self.span_of(base, line, rhs_tok);
                let (tag, val) = match classify(rhs_tok) {
                    Classified::Imm(val) => (TAG_IMM, val),
                    Classified::Reg(reg) => (TAG_REG, reg as u16),
                    Classified::BadLiteral => {
                        return Err(error::asm_bad_literal(rhs_span, self.src, line_num, rhs_tok))
                    }
                    Classified::Unknown => {
                        return Err(error::asm_invalid_operand(
                            rhs_span, self.src, line_num, rhs_tok,
                        ))
                    }
                };
                self.emit(
                    &[Opcode::Cmp as u16, TAG_REG, lhs as u16, tag, val],
                    stmt_span,
                    line_num,
                )?;
            }
            _ => {
                let span = self.span_of(base, line, mnemonic);
                return Err(error::asm_unknown_instr(span, self.src, line_num, mnemonic));
            }
        }
        Ok(())
    }

    /// Append an instruction's words at the write cursor.
    fn emit(&mut self, words: &[u16], span: Span, line_num: usize) -> Result<()> {
        for &word in words {
            if !self.mem.push(word) {
                return Err(error::asm_image_full(span, self.src, line_num));
            }
        }
        Ok(())
    }

    fn expect_register(
        &self,
        token: &str,
        base: usize,
        line: &str,
        line_num: usize,
    ) -> Result<Register> {
        match classify(token) {
            Classified::Reg(reg) => Ok(reg),
            _ => Err(error::asm_invalid_register(
                self.span_of(base, line, token),
                self.src,
                line_num,
                token,
            )),
        }
    }

    /// Absolute span of `token`, a subslice of `line` starting at `base`.
    fn span_of(&self, base: usize, line: &str, token: &str) -> Span {
        let offs = base + (token.as_ptr() as usize - line.as_ptr() as usize);
        Span::new(SrcOffset(offs), token.len())
    }
}

fn classify(token: &str) -> Classified {
    if is_number(token) {
        // Truncated to 16 bits, so negative literals land as their two's
        // complement.
        match token.parse::<i32>() {
            Ok(val) => Classified::Imm(val as u16),
            Err(_) => Classified::BadLiteral,
        }
    } else {
        match Register::from_str(&token.to_ascii_uppercase()) {
            Ok(reg) => Classified::Reg(reg),
            Err(()) => Classified::Unknown,
        }
    }
}

/// Decimal digits with an optional single leading `-`.
fn is_number(token: &str) -> bool {
    let digits = token.strip_prefix('-').unwrap_or(token);
    !digits.is_empty() && digits.bytes().all(|b| b.is_ascii_digit())
}

#[cfg(test)]
mod tests {
    use super::assemble;
    use crate::isa::MemImage;

    fn words_of(src: &'static str) -> Vec<u16> {
        let image = assemble(src).unwrap();
        image.words()[..image.len()].to_vec()
    }

    #[test]
    fn encode_hlt() {
        assert_eq!(words_of("HLT"), vec![0]);
    }

    #[test]
    fn encode_mov_imm() {
        assert_eq!(words_of("MOV AX, 5\nHLT"), vec![1, 0, 5, 0]);
    }

    #[test]
    fn encode_mov_reg() {
        assert_eq!(words_of("MOV BX, AX"), vec![4, 1, 0]);
    }

    #[test]
    fn encode_add_sub_variants() {
        assert_eq!(words_of("ADD CX, 2"), vec![2, 2, 2]);
        assert_eq!(words_of("ADD CX, DX"), vec![5, 2, 3]);
        assert_eq!(words_of("SUB DX, 1"), vec![3, 3, 1]);
        assert_eq!(words_of("SUB DX, AX"), vec![6, 3, 0]);
    }

    #[test]
    fn encode_jumps() {
        assert_eq!(words_of("JMP 100"), vec![7, 100]);
        assert_eq!(words_of("JE 8"), vec![9, 8]);
        assert_eq!(words_of("JNE 8"), vec![10, 8]);
    }

    #[test]
    fn encode_cmp_imm() {
        assert_eq!(words_of("CMP AX, 4"), vec![8, 0, 0, 1, 4]);
    }

    #[test]
    fn encode_cmp_reg() {
        assert_eq!(words_of("CMP AX, BX"), vec![8, 0, 0, 0, 1]);
    }

    #[test]
    fn encode_negative_imm() {
        assert_eq!(words_of("MOV AX, -1"), vec![1, 0, 0xFFFF]);
    }

    #[test]
    fn case_insensitive() {
        assert_eq!(words_of("mov ax, 5"), words_of("MOV AX, 5"));
        assert_eq!(words_of("CmP aX, fLaGs"), vec![8, 0, 0, 0, 6]);
    }

    #[test]
    fn comments_and_blanks_skipped() {
        let src = "// header\n\n   \nMOV AX, 1 // trailing\nHLT\n";
        assert_eq!(words_of(src), vec![1, 0, 1, 0]);
    }

    #[test]
    fn unknown_instruction() {
        let err = assemble("FOO AX, 1").unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("FOO"), "{msg}");
        assert!(msg.contains("line 1"), "{msg}");
    }

    #[test]
    fn error_line_counts_skipped_lines() {
        // Blank and comment lines still count toward line numbers.
        let err = assemble("// one\n\nFOO").unwrap_err();
        assert!(err.to_string().contains("line 3"));
    }

    #[test]
    fn invalid_register() {
        let err = assemble("MOV BZ, 1").unwrap_err();
        assert!(err.to_string().contains("BZ"));
    }

    #[test]
    fn invalid_operand() {
        let err = assemble("MOV AX, BZ").unwrap_err();
        assert!(err.to_string().contains("BZ"));
    }

    #[test]
    fn jump_requires_numeric_address() {
        assert!(assemble("JMP AX").is_err());
        assert!(assemble("JE label").is_err());
    }

    #[test]
    fn missing_operands() {
        assert!(assemble("MOV AX").is_err());
        assert!(assemble("MOV AX,").is_err());
        assert!(assemble("CMP AX").is_err());
        assert!(assemble("JMP").is_err());
    }

    #[test]
    fn hlt_takes_no_operands() {
        assert!(assemble("HLT AX").is_err());
    }

    #[test]
    fn cmp_first_operand_must_be_register() {
        assert!(assemble("CMP 1, AX").is_err());
    }

    #[test]
    fn oversized_literal() {
        assert!(assemble("MOV AX, 99999999999").is_err());
    }

    #[test]
    fn program_too_large_for_memory() {
        // 21846 three-word instructions need 65538 words, two past the end.
        let src: &'static str = Box::leak("MOV AX, 1\n".repeat(21846).into_boxed_str());
        let err = assemble(src).unwrap_err();
        assert!(err.to_string().contains("too large"));
    }

    #[test]
    fn reassembly_is_idempotent() {
        let src = "MOV AX, 5\nMOV BX, 3\nADD AX, BX\nCMP AX, 8\nJE 18\nSUB AX, 1\nHLT";
        let first: MemImage = assemble(src).unwrap();
        let second: MemImage = assemble(src).unwrap();
        assert_eq!(first.len(), second.len());
        assert!(first.words()[..] == second.words()[..]);
    }
}
