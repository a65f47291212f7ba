//! Property-based tests for machine invariants.
//!
//! These tests use proptest to verify that sign extension, flag updates
//! and ALU results hold across all operand combinations.

use lc3::cpu::{decode, encode, Condition, Instruction, Operand, Reg};
use lc3::{sign_extend, Machine, ScriptedConsole, Word};
use proptest::prelude::*;

/// Build a machine with one instruction at x3000 and the given registers.
fn setup(instr: Instruction, regs: [Word; 8]) -> Machine {
    let mut machine = Machine::new();
    machine.load_program(&[encode(&instr)]).unwrap();
    machine.regs.gpr = regs;
    machine
}

fn reg() -> impl Strategy<Value = Reg> {
    (0u16..8).prop_map(Reg::from_field)
}

fn condition() -> impl Strategy<Value = Condition> {
    prop_oneof![
        Just(Condition::Negative),
        Just(Condition::Zero),
        Just(Condition::Positive),
    ]
}

fn expected_condition(value: Word) -> Condition {
    let signed = value as i16;
    if signed < 0 {
        Condition::Negative
    } else if signed == 0 {
        Condition::Zero
    } else {
        Condition::Positive
    }
}

proptest! {
    #[test]
    fn sign_extend_preserves_low_bits(value in any::<Word>(), bits in 1u32..=16) {
        let mask = if bits == 16 { 0xFFFF } else { (1u16 << bits) - 1 };
        prop_assert_eq!(sign_extend(value, bits) & mask, value & mask);
    }

    #[test]
    fn sign_extend_matches_signed_value(value in any::<Word>(), bits in 1u32..16) {
        let low = (value & ((1u16 << bits) - 1)) as i32;
        let signed = if low >= 1 << (bits - 1) { low - (1 << bits) } else { low };
        prop_assert_eq!(sign_extend(value, bits) as i16 as i32, signed);
    }

    #[test]
    fn add_wraps_and_sets_one_flag(
        regs in any::<[Word; 8]>(),
        dst in reg(),
        src1 in reg(),
        src2 in reg(),
    ) {
        let expected = regs[src1.index()].wrapping_add(regs[src2.index()]);
        let mut machine = setup(
            Instruction::Add { dst, src1, operand: Operand::Reg(src2) },
            regs,
        );

        machine.step(&mut ScriptedConsole::new()).unwrap();

        prop_assert_eq!(machine.regs.get(dst), expected);
        prop_assert_eq!(machine.regs.cond, expected_condition(expected));
    }

    #[test]
    fn add_immediate_uses_sign_extended_imm5(
        regs in any::<[Word; 8]>(),
        dst in reg(),
        src1 in reg(),
        imm5 in -16i16..16,
    ) {
        let expected = regs[src1.index()].wrapping_add(imm5 as Word);
        let mut machine = setup(
            Instruction::Add { dst, src1, operand: Operand::Imm(imm5 as Word) },
            regs,
        );

        machine.step(&mut ScriptedConsole::new()).unwrap();

        prop_assert_eq!(machine.regs.get(dst), expected);
    }

    #[test]
    fn and_is_bitwise_and(
        regs in any::<[Word; 8]>(),
        dst in reg(),
        src1 in reg(),
        src2 in reg(),
    ) {
        let expected = regs[src1.index()] & regs[src2.index()];
        let mut machine = setup(
            Instruction::And { dst, src1, operand: Operand::Reg(src2) },
            regs,
        );

        machine.step(&mut ScriptedConsole::new()).unwrap();

        prop_assert_eq!(machine.regs.get(dst), expected);
        prop_assert_eq!(machine.regs.cond, expected_condition(expected));
    }

    #[test]
    fn not_complements(regs in any::<[Word; 8]>(), dst in reg(), src in reg()) {
        let expected = !regs[src.index()];
        let mut machine = setup(Instruction::Not { dst, src }, regs);

        machine.step(&mut ScriptedConsole::new()).unwrap();

        prop_assert_eq!(machine.regs.get(dst), expected);
        prop_assert_eq!(machine.regs.cond, expected_condition(expected));
    }

    #[test]
    fn br_follows_mask(mask in 0u16..8, offset in -256i16..256, start in condition()) {
        let mut machine = setup(
            Instruction::Br { mask, offset: offset as Word },
            [0; 8],
        );
        machine.regs.cond = start;

        machine.step(&mut ScriptedConsole::new()).unwrap();

        let expected = if mask & start.bits() != 0 {
            0x3001u16.wrapping_add(offset as Word)
        } else {
            0x3001
        };
        prop_assert_eq!(machine.regs.pc, expected);
        prop_assert_eq!(machine.regs.cond, start);
    }

    #[test]
    fn cond_changes_only_when_flags_are_set(
        word in any::<Word>(),
        regs in any::<[Word; 8]>(),
        start in condition(),
    ) {
        let instr = decode(word);
        prop_assume!(!matches!(
            instr,
            Instruction::Trap { .. } | Instruction::Rti | Instruction::Res
        ));
        let mut machine = Machine::new();
        machine.mem.write(0x3000, word);
        machine.regs.gpr = regs;
        machine.regs.cond = start;

        machine.step(&mut ScriptedConsole::new()).unwrap();

        if !instr.sets_flags() {
            prop_assert_eq!(machine.regs.cond, start);
        }
    }

    #[test]
    fn decode_encode_is_stable(word in any::<Word>()) {
        let instr = decode(word);
        prop_assert_eq!(decode(encode(&instr)), instr);
    }
}
