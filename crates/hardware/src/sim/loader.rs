//! Assembly loader: parses an ASCII APEX program into a [`CodeMemory`] (§6).
//!
//! Grammar, one instruction per non-blank line: an opcode token (case-
//! sensitive exact match, §6) followed by zero or more comma-separated
//! operands. A register operand is `R` followed by a non-negative index; a
//! literal operand is `#` followed by a signed integer. `//` starts a
//! line comment; blank lines and comment-only lines are skipped. `HALT` is
//! accepted with or without a trailing newline (whatever text follows it,
//! if any, must itself be blank or a comment) — there is no statement
//! terminator in the grammar, so this falls out of ordinary line splitting.

use std::fs;
use std::path::Path;

use crate::common::error::SimError;
use crate::isa::{CodeMemory, Instruction, Opcode};

/// Parses `path` into a [`CodeMemory`] addressed from `code_base` with
/// `code_stride` bytes between instructions.
pub fn load(path: &Path, code_base: u64, code_stride: u64) -> Result<CodeMemory, SimError> {
    let text = fs::read_to_string(path).map_err(|source| SimError::ProgramFileUnreadable {
        path: path.display().to_string(),
        source,
    })?;

    let mut instructions = Vec::new();
    for (i, raw_line) in text.lines().enumerate() {
        let line = strip_comment(raw_line).trim();
        if line.is_empty() {
            continue;
        }
        let instr = parse_line(line).ok_or_else(|| SimError::MalformedInstruction {
            line: i + 1,
            text: raw_line.to_string(),
        })?;
        instructions.push(instr);
    }

    let count = instructions.len();
    if let Some(last_index) = count.checked_sub(1) {
        let last_offset = (last_index as u64)
            .checked_mul(code_stride)
            .ok_or(SimError::ProgramTooLarge { count })?;
        code_base
            .checked_add(last_offset)
            .ok_or(SimError::ProgramTooLarge { count })?;
    }

    Ok(CodeMemory::new(instructions, code_base, code_stride))
}

fn strip_comment(line: &str) -> &str {
    line.find("//").map_or(line, |idx| &line[..idx])
}

fn parse_line(line: &str) -> Option<Instruction> {
    let (opcode_token, rest) = match line.split_once(char::is_whitespace) {
        Some((head, tail)) => (head, tail.trim()),
        None => (line, ""),
    };
    let opcode = Opcode::parse(opcode_token)?;
    let operands: Vec<&str> = if rest.is_empty() {
        Vec::new()
    } else {
        rest.split(',').map(str::trim).collect()
    };

    let mut instr = Instruction::bare(opcode);
    match opcode {
        Opcode::Movc => {
            let [rd, imm] = take::<2>(&operands)?;
            instr.rd = Some(reg(rd)?);
            instr.imm = literal(imm)?;
        }
        Opcode::Add | Opcode::Sub | Opcode::Mul | Opcode::And | Opcode::Or | Opcode::Xor => {
            let [rd, rs1, rs2] = take::<3>(&operands)?;
            instr.rd = Some(reg(rd)?);
            instr.rs1 = Some(reg(rs1)?);
            instr.rs2 = Some(reg(rs2)?);
        }
        Opcode::Addl | Opcode::Subl | Opcode::Load => {
            let [rd, rs1, imm] = take::<3>(&operands)?;
            instr.rd = Some(reg(rd)?);
            instr.rs1 = Some(reg(rs1)?);
            instr.imm = literal(imm)?;
        }
        Opcode::Store => {
            let [rs1, rs2, imm] = take::<3>(&operands)?;
            instr.rs1 = Some(reg(rs1)?);
            instr.rs2 = Some(reg(rs2)?);
            instr.imm = literal(imm)?;
        }
        Opcode::Ldr => {
            let [rd, rs1, rs2] = take::<3>(&operands)?;
            instr.rd = Some(reg(rd)?);
            instr.rs1 = Some(reg(rs1)?);
            instr.rs2 = Some(reg(rs2)?);
        }
        Opcode::Str => {
            let [rs1, rs2, rs3] = take::<3>(&operands)?;
            instr.rs1 = Some(reg(rs1)?);
            instr.rs2 = Some(reg(rs2)?);
            instr.rs3 = Some(reg(rs3)?);
        }
        Opcode::Bz | Opcode::Bnz => {
            let [imm] = take::<1>(&operands)?;
            instr.imm = literal(imm)?;
        }
        Opcode::Jump => {
            let [rs1, imm] = take::<2>(&operands)?;
            instr.rs1 = Some(reg(rs1)?);
            instr.imm = literal(imm)?;
        }
        Opcode::Halt => {
            if !operands.is_empty() {
                return None;
            }
        }
    }
    Some(instr)
}

fn take<const N: usize>(operands: &[&str]) -> Option<[&str; N]> {
    <[&str; N]>::try_from(operands).ok()
}

fn reg(token: &str) -> Option<u8> {
    token.strip_prefix('R')?.parse().ok()
}

fn literal(token: &str) -> Option<i64> {
    token.strip_prefix('#')?.parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_program(text: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().expect("create temp file");
        file.write_all(text.as_bytes()).expect("write temp file");
        file
    }

    #[test]
    fn parses_arithmetic_chain() {
        let file = write_program("MOVC R1,#5\nMOVC R2,#7\nADD R3,R1,R2\nHALT\n");
        let code = load(file.path(), 4000, 4).expect("parse");
        assert_eq!(code.len(), 4);
        assert_eq!(code.fetch(4000).unwrap().opcode, Opcode::Movc);
        assert_eq!(code.fetch(4000).unwrap().imm, 5);
        let add = code.fetch(4008).unwrap();
        assert_eq!(add.opcode, Opcode::Add);
        assert_eq!(add.rd, Some(3));
        assert_eq!(add.rs1, Some(1));
        assert_eq!(add.rs2, Some(2));
        assert_eq!(code.fetch(4012).unwrap().opcode, Opcode::Halt);
    }

    #[test]
    fn halt_with_no_trailing_newline_parses() {
        let file = write_program("MOVC R1,#1\nHALT");
        let code = load(file.path(), 4000, 4).expect("parse");
        assert_eq!(code.len(), 2);
        assert_eq!(code.fetch(4004).unwrap().opcode, Opcode::Halt);
    }

    #[test]
    fn blank_lines_and_comments_are_skipped() {
        let file = write_program("// a program\n\nMOVC R1,#1\n\n// done\nHALT\n");
        let code = load(file.path(), 4000, 4).expect("parse");
        assert_eq!(code.len(), 2);
    }

    #[test]
    fn three_register_and_store_operand_order() {
        let file = write_program(
            "MOVC R1,#3\nMOVC R2,#50\nMOVC R3,#4\nSTR R1,R2,R3\nLDR R4,R2,R3\nHALT\n",
        );
        let code = load(file.path(), 4000, 4).expect("parse");
        let str_instr = code.fetch(4012).unwrap();
        assert_eq!(str_instr.opcode, Opcode::Str);
        assert_eq!(str_instr.rs1, Some(1));
        assert_eq!(str_instr.rs2, Some(2));
        assert_eq!(str_instr.rs3, Some(3));
        let ldr_instr = code.fetch(4016).unwrap();
        assert_eq!(ldr_instr.rd, Some(4));
        assert_eq!(ldr_instr.rs1, Some(2));
        assert_eq!(ldr_instr.rs2, Some(3));
    }

    #[test]
    fn unreadable_path_is_an_error() {
        let err = load(Path::new("/nonexistent/program.asm"), 4000, 4).unwrap_err();
        assert!(matches!(err, SimError::ProgramFileUnreadable { .. }));
    }

    #[test]
    fn malformed_line_is_reported_with_line_number() {
        let file = write_program("MOVC R1,#1\nBOGUS R2\nHALT\n");
        let err = load(file.path(), 4000, 4).unwrap_err();
        match err {
            SimError::MalformedInstruction { line, text } => {
                assert_eq!(line, 2);
                assert_eq!(text, "BOGUS R2");
            }
            other => panic!("expected MalformedInstruction, got {other:?}"),
        }
    }

    #[test]
    fn case_sensitive_opcode_rejects_lowercase() {
        let file = write_program("movc R1,#1\nHALT\n");
        let err = load(file.path(), 4000, 4).unwrap_err();
        assert!(matches!(err, SimError::MalformedInstruction { line: 1, .. }));
    }

    #[test]
    fn program_whose_code_image_address_would_overflow_is_too_large() {
        let file = write_program("MOVC R1,#1\nHALT\n");
        let err = load(file.path(), u64::MAX - 2, u64::MAX).unwrap_err();
        assert!(matches!(err, SimError::ProgramTooLarge { count: 2 }));
    }
}
