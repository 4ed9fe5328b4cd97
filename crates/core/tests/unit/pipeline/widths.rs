//! Cross-Width Properties.
//!
//! Every supported issue width must produce the architectural state of the
//! serial reference model, and wider configurations must not be slower on
//! independent work.

use pretty_assertions::assert_eq;
use rstest::rstest;

use crate::common::asm;
use crate::common::harness::{PROGRAM_BASE, TestContext, direct_reference};

/// All supported issue widths.
const WIDTHS: [usize; 5] = [1, 2, 4, 6, 8];

/// Runs a program at one width and compares X0–X30 against the serial model.
fn assert_arch_equivalent(width: usize, program: &[u32], presets: &[(u8, u64)], mem: &[(u64, u64)]) {
    let mut reference = direct_reference(PROGRAM_BASE, program, presets);
    for &(addr, val) in mem {
        reference.mem.write_u64(addr, val);
    }
    reference.run(100_000);
    assert!(reference.halted(), "reference model must terminate");

    let mut ctx = TestContext::new(width).load_program(PROGRAM_BASE, program);
    for &(reg, val) in presets {
        ctx.set_reg(reg, val);
    }
    for &(addr, val) in mem {
        ctx.write_u64(addr, val);
    }
    let _ = ctx.run_to_halt();

    for reg in 0..31 {
        assert_eq!(
            ctx.get_reg(reg),
            reference.regs.read(reg),
            "X{reg} diverged at width {width}"
        );
    }
    for &(addr, _) in mem {
        assert_eq!(
            ctx.read_u64(addr),
            reference.mem.read_u64(addr),
            "memory at {addr:#x} diverged at width {width}"
        );
        assert_eq!(ctx.read_u64(addr + 8), reference.mem.read_u64(addr + 8));
        assert_eq!(ctx.read_u64(addr + 16), reference.mem.read_u64(addr + 16));
        assert_eq!(ctx.read_u64(addr + 24), reference.mem.read_u64(addr + 24));
    }
}

/// Dependent arithmetic with multiplies, divides, moves, and selects.
fn arithmetic_program() -> Vec<u32> {
    vec![
        asm::movz(0, 1000),
        asm::movz(1, 37),
        asm::add_reg(2, 0, 1),      // X2 = 1037
        asm::sub_imm(3, 2, 37),     // X3 = 1000
        asm::madd(4, 2, 1, 3),      // X4 = 1037*37 + 1000
        asm::sdiv(5, 4, 1),         // X5 = X4 / 37
        asm::movk(0, 0xBEEF, 1),    // X0 = merge high half
        asm::subs_imm(31, 5, 1),    // CMP X5, #1
        asm::orr_reg(6, 31, 5),     // X6 = X5
        asm::add_imm(7, 6, 1),
        asm::svc(),
    ]
}

/// Loads, stores, pairs, and pre/post-indexed addressing.
fn memory_program() -> Vec<u32> {
    vec![
        asm::movz(1, 0x2000),
        asm::movz(2, 111),
        asm::str64_post(2, 1, 8),   // [0x2000] = 111, X1 = 0x2008
        asm::movz(3, 222),
        asm::str64(3, 1, 0),        // [0x2008] = 222
        asm::ldr64_pre(4, 1, -8),   // X1 = 0x2000, X4 = 111
        asm::ldr64(5, 1, 8),        // X5 = 222
        asm::stp64(4, 5, 1, 16),    // [0x2010], [0x2018]
        asm::ldp64(6, 7, 1, 16),    // X6 = 111, X7 = 222
        asm::ldr64_reg(9, 1, 10),   // X9 = [X1 + X10]
        asm::svc(),
    ]
}

/// Calls, returns, a counted loop, and a conditional skip.
fn control_program() -> Vec<u32> {
    vec![
        asm::movz(0, 5),            // 0x1000
        asm::bl(24),                // 0x1004: call 0x101C
        asm::add_imm(1, 0, 100),    // 0x1008: after return
        asm::movz(2, 3),            // 0x100C: loop counter
        asm::subs_imm(2, 2, 1),     // 0x1010: loop body
        asm::b_cond(1, -4),         // 0x1014: B.NE loop
        asm::svc(),                 // 0x1018
        // The callee sits past the SVC, appended by the test.
    ]
}

#[rstest]
#[case::one(1)]
#[case::two(2)]
#[case::four(4)]
#[case::six(6)]
#[case::eight(8)]
fn arithmetic_matches_reference(#[case] width: usize) {
    assert_arch_equivalent(width, &arithmetic_program(), &[], &[]);
}

#[rstest]
#[case::one(1)]
#[case::two(2)]
#[case::four(4)]
#[case::six(6)]
#[case::eight(8)]
fn memory_matches_reference(#[case] width: usize) {
    assert_arch_equivalent(
        width,
        &memory_program(),
        &[(10, 16)],
        &[(0x2000, 0), (0x2020, 0xAAAA)],
    );
}

#[rstest]
#[case::one(1)]
#[case::two(2)]
#[case::four(4)]
#[case::six(6)]
#[case::eight(8)]
fn control_flow_matches_reference(#[case] width: usize) {
    let mut program = control_program();
    // Callee: bump X0 and return.
    program.push(asm::add_imm(0, 0, 1)); // 0x101C
    program.push(asm::ret());            // 0x1020
    assert_arch_equivalent(width, &program, &[], &[]);
}

/// Throughput monotonicity on independent work: wider never takes more
/// cycles.
#[test]
fn throughput_monotonic_across_widths() {
    let mut program: Vec<u32> = (0..16).map(|i| asm::movz(i % 28, 100 + i)).collect();
    program.push(asm::svc());

    let mut cycles = Vec::new();
    for width in WIDTHS {
        let mut ctx = TestContext::new(width).load_program(PROGRAM_BASE, &program);
        let _ = ctx.run_to_halt();
        cycles.push(ctx.stats().cycles);
    }
    for pair in cycles.windows(2) {
        assert!(
            pair[1] <= pair[0],
            "cycles must not increase with width: {cycles:?}"
        );
    }
}
