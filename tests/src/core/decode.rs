use pydis_core::decode::*;
use pydis_core::opcode::{OpcodeTable, EXTENDED_ARG};
use pydis_core::DisError;

use crate::util::{asm, FOO_SRC};

fn check_gapless(insns: &[Instruction<'_>], len: usize) {
    let mut expect = 0;
    for insn in insns {
        assert_eq!(insn.offset, expect, "gap before {}", insn.mnemonic());
        assert_eq!(insn.size, insn.def.size());
        expect = insn.next_offset();
    }
    assert_eq!(expect, len, "trailing bytes left undecoded");
}

#[test]
fn decode_foo() {
    let t = OpcodeTable::cpython35();
    let code = asm(FOO_SRC);
    let insns = decode_all(&code, &t).unwrap();
    assert_eq!(insns.len(), 11);

    let offsets: Vec<usize> = insns.iter().map(|i| i.offset).collect();
    assert_eq!(offsets, vec![0, 3, 6, 9, 12, 15, 18, 21, 24, 25, 28]);

    let names: Vec<&str> = insns.iter().map(|i| i.mnemonic()).collect();
    assert_eq!(
        names,
        vec![
            "LOAD_CONST",
            "STORE_FAST",
            "LOAD_CONST",
            "STORE_FAST",
            "LOAD_GLOBAL",
            "LOAD_ATTR",
            "LOAD_FAST",
            "LOAD_FAST",
            "BINARY_MULTIPLY",
            "CALL_FUNCTION",
            "RETURN_VALUE",
        ]
    );
    assert_eq!(insns[0].arg, Some(1));
    assert_eq!(insns[5].arg, Some(1));
    assert_eq!(insns[8].arg, None);
    assert!(!insns[8].has_operand());

    let last = insns.last().unwrap();
    assert_eq!(last.offset + last.size, code.len());
    check_gapless(&insns, code.len());
}

#[test]
fn decode_empty() {
    let t = OpcodeTable::cpython35();
    let mut d = Decoder::new(&[], &t);
    assert!(d.next().is_none());
    assert_eq!(d.position(), 0);
}

#[test]
fn operand_is_little_endian() {
    let t = OpcodeTable::cpython35();
    let insns = decode_all(&[100, 0x34, 0x12], &t).unwrap();
    assert_eq!(insns[0].arg, Some(0x1234));
}

#[test]
fn truncated_operand_with_no_bytes() {
    let t = OpcodeTable::cpython35();
    let mut code = asm("LOAD_CONST 1; POP_TOP");
    code.push(100);
    let err = decode_all(&code, &t).unwrap_err();
    assert_eq!(
        err,
        DisError::TruncatedStream {
            offset: 4,
            mnemonic: "LOAD_CONST".to_string(),
            needed: 2,
            available: 0,
        }
    );
    assert_eq!(err.offset(), Some(4));
}

#[test]
fn truncated_operand_with_one_byte() {
    let t = OpcodeTable::cpython35();
    let err = decode_all(&[124, 1], &t).unwrap_err();
    assert!(matches!(
        err,
        DisError::TruncatedStream {
            offset: 0,
            available: 1,
            ..
        }
    ));
}

#[test]
fn unknown_opcode_stops_decoding() {
    let t = OpcodeTable::cpython35();
    let code = [1, 0, 1];
    let mut d = Decoder::new(&code, &t);
    assert_eq!(d.next().unwrap().unwrap().mnemonic(), "POP_TOP");
    assert_eq!(
        d.next().unwrap().unwrap_err(),
        DisError::UnknownOpcode {
            opcode: 0,
            offset: 1
        }
    );
    // Fused after the error.
    assert!(d.next().is_none());
    assert!(d.next().is_none());
}

#[test]
fn error_after_valid_prefix_discards_collection() {
    let t = OpcodeTable::cpython35();
    let mut code = asm("NOP; NOP");
    code.push(125);
    assert!(decode_all(&code, &t).is_err());
}

#[test]
fn extended_arg_folds_into_next_operand() {
    let t = OpcodeTable::cpython35();
    let code = asm("EXTENDED_ARG 1; LOAD_CONST 2; LOAD_CONST 3");
    let insns = decode_all(&code, &t).unwrap();
    assert_eq!(insns.len(), 3);
    assert_eq!(insns[0].opcode, EXTENDED_ARG);
    assert_eq!(insns[0].arg, Some(1));
    assert_eq!(insns[1].arg, Some(0x1_0002));
    // Prefix applies to one instruction only.
    assert_eq!(insns[2].arg, Some(3));
}

#[test]
fn extended_arg_carried_across_argless() {
    let t = OpcodeTable::cpython35();
    let code = asm("EXTENDED_ARG 1; NOP; LOAD_CONST 2");
    let insns = decode_all(&code, &t).unwrap();
    // NOP has no operand; the pending high bits reach LOAD_CONST.
    assert_eq!(insns[1].arg, None);
    assert_eq!(insns[2].arg, Some(0x1_0002));
}

#[test]
fn redecode_is_identical() {
    let t = OpcodeTable::cpython35();
    let code = asm(FOO_SRC);
    let a = decode_all(&code, &t).unwrap();
    let b = decode_all(&code, &t).unwrap();
    assert_eq!(a, b);
}

#[test]
fn gapless_over_mixed_streams() {
    let t = OpcodeTable::cpython35();
    for src in [
        "NOP",
        "LOAD_CONST 0",
        "NOP; NOP; NOP; LOAD_FAST 3; RETURN_VALUE",
        "SETUP_LOOP 20; LOAD_GLOBAL 0; GET_ITER; FOR_ITER 6; STORE_FAST 0; \
         JUMP_ABSOLUTE 9; POP_BLOCK; LOAD_CONST 0; RETURN_VALUE",
    ] {
        let code = asm(src);
        let insns = decode_all(&code, &t).unwrap();
        check_gapless(&insns, code.len());
        let count = src.split(';').count();
        assert_eq!(insns.len(), count, "{src}");
    }
}

#[test]
fn decoder_position_tracks_progress() {
    let t = OpcodeTable::cpython35();
    let code = asm("LOAD_CONST 0; NOP");
    let mut d = Decoder::new(&code, &t);
    d.next();
    assert_eq!(d.position(), 3);
    d.next();
    assert_eq!(d.position(), 4);
    assert!(d.next().is_none());
}
