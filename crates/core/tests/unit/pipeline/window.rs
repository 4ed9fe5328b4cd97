//! Instruction Window Tests.
//!
//! Verifies program-order preservation, re-queueing of unissued entries,
//! capacity behavior, and flush.

use a64sim_core::core::pipeline::latches::IfIdEntry;
use a64sim_core::core::pipeline::window::InstructionWindow;

fn entry(pc: u64) -> IfIdEntry {
    IfIdEntry {
        valid: true,
        pc,
        ..Default::default()
    }
}

#[test]
fn fetch_appends_in_order() {
    let mut window = InstructionWindow::new(4);
    assert!(window.push_fetched(entry(0x1000)));
    assert!(window.push_fetched(entry(0x1004)));
    assert_eq!(window.len(), 2);
    assert_eq!(window.entries()[0].pc, 0x1000);
    assert_eq!(window.entries()[1].pc, 0x1004);
}

#[test]
fn full_window_drops_fetch() {
    let mut window = InstructionWindow::new(2);
    assert!(window.push_fetched(entry(0x1000)));
    assert!(window.push_fetched(entry(0x1004)));
    assert!(!window.push_fetched(entry(0x1008)));
    assert_eq!(window.len(), 2);
}

#[test]
fn pop_fills_slots_and_compacts() {
    let mut window = InstructionWindow::new(4);
    for i in 0..3 {
        let _ = window.push_fetched(entry(0x1000 + i * 4));
    }
    let mut ifid = [IfIdEntry::default(); 2];
    window.pop_to_ifid(&mut ifid, 2);
    assert_eq!(ifid[0].pc, 0x1000);
    assert_eq!(ifid[1].pc, 0x1004);
    assert_eq!(window.len(), 1);
    assert_eq!(window.entries()[0].pc, 0x1008);
}

#[test]
fn pop_clears_unfilled_slots() {
    let mut window = InstructionWindow::new(4);
    let _ = window.push_fetched(entry(0x1000));
    let mut ifid = [entry(0xDEAD), entry(0xDEAD)];
    window.pop_to_ifid(&mut ifid, 2);
    assert!(ifid[0].valid);
    assert!(!ifid[1].valid, "empty window slots become bubbles");
}

#[test]
fn unconsumed_entries_requeue_at_front_in_order() {
    let mut window = InstructionWindow::new(6);
    let _ = window.push_fetched(entry(0x2000));
    let ifid = [entry(0x1000), entry(0x1004), entry(0x1008)];
    let consumed = [true, false, false];
    window.push_unconsumed(&ifid, &consumed);
    assert_eq!(window.len(), 3);
    assert_eq!(window.entries()[0].pc, 0x1004);
    assert_eq!(window.entries()[1].pc, 0x1008);
    assert_eq!(window.entries()[2].pc, 0x2000);
}

#[test]
fn requeue_overflow_drops_youngest() {
    let mut window = InstructionWindow::new(2);
    let _ = window.push_fetched(entry(0x2000));
    let _ = window.push_fetched(entry(0x2004));
    let ifid = [entry(0x1000)];
    window.push_unconsumed(&ifid, &[false]);
    assert_eq!(window.len(), 2);
    assert_eq!(window.entries()[0].pc, 0x1000, "re-queued entry leads");
    assert_eq!(window.entries()[1].pc, 0x2000, "youngest entry dropped");
}

#[test]
fn requeue_preserves_prediction_fields() {
    let mut window = InstructionWindow::new(4);
    let ifid = [IfIdEntry {
        valid: true,
        pc: 0x1000,
        predicted_taken: true,
        predicted_target: 0x3000,
        after_branch: true,
        ..Default::default()
    }];
    window.push_unconsumed(&ifid, &[false]);
    let requeued = window.entries()[0];
    assert!(requeued.predicted_taken);
    assert_eq!(requeued.predicted_target, 0x3000);
    assert!(requeued.after_branch);
}

#[test]
fn flush_empties_the_window() {
    let mut window = InstructionWindow::new(4);
    let _ = window.push_fetched(entry(0x1000));
    let _ = window.push_fetched(entry(0x1004));
    window.flush();
    assert!(window.is_empty());
}

#[test]
fn clear_after_branch_drops_the_gate() {
    let mut window = InstructionWindow::new(4);
    let _ = window.push_fetched(IfIdEntry {
        valid: true,
        pc: 0x1000,
        after_branch: true,
        ..Default::default()
    });
    window.clear_after_branch();
    assert!(!window.entries()[0].after_branch);
}
