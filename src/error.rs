use miette::{miette, LabeledSpan, Report, Severity};

use crate::source::Span;

// Assembler errors.
//
// Line numbers are 1-based and count physical input lines, including blank
// and comment-only lines, so they match what an editor shows.

pub fn asm_unknown_instr(span: Span, src: &'static str, line: usize, mnemonic: &str) -> Report {
    miette!(
        severity = Severity::Error,
        code = "asm::unknown_instr",
        help = "available instructions are HLT, MOV, ADD, SUB, JMP, CMP, JE and JNE.",
        labels = vec![LabeledSpan::at(span, "unknown instruction")],
        "Unknown instruction '{mnemonic}' on line {line}",
    )
    .with_source_code(src)
}

pub fn asm_operand_count(
    span: Span,
    src: &'static str,
    line: usize,
    mnemonic: &str,
    expected: usize,
) -> Report {
    miette!(
        severity = Severity::Error,
        code = "asm::operand_count",
        help = "operands are separated from the mnemonic by whitespace and from each other by a comma.",
        labels = vec![LabeledSpan::at(span, "wrong number of operands")],
        "{mnemonic} requires exactly {expected} operand(s) on line {line}",
    )
    .with_source_code(src)
}

pub fn asm_invalid_register(span: Span, src: &'static str, line: usize, token: &str) -> Report {
    miette!(
        severity = Severity::Error,
        code = "asm::invalid_register",
        help = "valid registers are AX, BX, CX, DX, SP, IP and FLAGS.",
        labels = vec![LabeledSpan::at(span, "not a register")],
        "Invalid register '{token}' on line {line}",
    )
    .with_source_code(src)
}

pub fn asm_invalid_operand(span: Span, src: &'static str, line: usize, token: &str) -> Report {
    miette!(
        severity = Severity::Error,
        code = "asm::invalid_operand",
        help = "this operand may be a register name or a decimal literal like 42 or -1.",
        labels = vec![LabeledSpan::at(span, "not a number or register")],
        "Invalid operand '{token}' on line {line}: not a number or register",
    )
    .with_source_code(src)
}

pub fn asm_expected_address(span: Span, src: &'static str, line: usize, mnemonic: &str) -> Report {
    miette!(
        severity = Severity::Error,
        code = "asm::expected_address",
        help = "jump targets are raw absolute word offsets, computed by hand.",
        labels = vec![LabeledSpan::at(span, "not a numeric address")],
        "{mnemonic} requires a numeric address on line {line}",
    )
    .with_source_code(src)
}

pub fn asm_bad_literal(span: Span, src: &'static str, line: usize, token: &str) -> Report {
    miette!(
        severity = Severity::Error,
        code = "asm::bad_literal",
        help = "literals are truncated to 16 bits, but must fit in a 32-bit integer to parse.",
        labels = vec![LabeledSpan::at(span, "out-of-range literal")],
        "Numeric literal '{token}' is out of range on line {line}",
    )
    .with_source_code(src)
}

pub fn asm_image_full(span: Span, src: &'static str, line: usize) -> Report {
    miette!(
        severity = Severity::Error,
        code = "asm::image_full",
        help = "the machine addresses 65536 words of memory; the program must fit within them.",
        labels = vec![LabeledSpan::at(span, "does not fit in memory")],
        "Program is too large for memory at line {line}",
    )
    .with_source_code(src)
}
