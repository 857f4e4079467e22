//! End-to-end scenarios (§8) and boundary behaviors, assembled as APEX
//! assembly text and driven through `Simulator::init`/`run`/`snapshot`.

use std::io::Write;

use apex_core::config::Config;
use apex_core::sim::simulator::{RunStatus, Simulator};

fn run(text: &str, config: &Config) -> Simulator {
    let mut file = tempfile::NamedTempFile::new().expect("create temp file");
    file.write_all(text.as_bytes()).expect("write temp file");
    let mut sim = Simulator::init(file.path(), config).expect("init");
    let status = sim.run(config.max_cycles);
    assert_eq!(status, RunStatus::Halted, "program did not reach HALT");
    sim
}

#[test]
fn arithmetic_chain() {
    let sim = run("MOVC R1,#5\nMOVC R2,#7\nADD R3,R1,R2\nHALT\n", &Config::default());
    let snap = sim.snapshot();
    assert_eq!(snap.registers[1], 5);
    assert_eq!(snap.registers[2], 7);
    assert_eq!(snap.registers[3], 12);
}

#[test]
fn memory_store_then_load() {
    let sim = run(
        "MOVC R1,#10\nMOVC R2,#100\nSTORE R1,R2,#0\nLOAD R3,R2,#0\nHALT\n",
        &Config::default(),
    );
    let snap = sim.snapshot();
    assert_eq!(snap.registers[3], 10);
    assert_eq!(snap.memory, vec![(100, 10)]);
}

#[test]
fn taken_forward_branch_first_time_mispredicts_and_flushes() {
    let sim = run(
        "MOVC R1,#0\nADD R2,R1,R1\nBZ #8\nMOVC R3,#9\nMOVC R4,#4\nHALT\n",
        &Config::default(),
    );
    let snap = sim.snapshot();
    assert_eq!(snap.registers[1], 0);
    assert_eq!(snap.registers[2], 0);
    assert_eq!(snap.registers[3], -1);
    assert_eq!(snap.registers[4], 4);
    assert_eq!(sim.stats().branch_mispredictions, 1);
    assert_eq!(sim.stats().flushes, 1);
}

#[test]
fn btb_hit_on_second_encounter_of_a_taken_branch_does_not_flush() {
    // Two independent copies of the same branch-then-skip pattern back to
    // back; once the BTB has seen the branch taken once, the second copy's
    // fetch-time prediction already redirects, so no flush fires for it.
    let sim = run(
        "MOVC R1,#0\nADD R2,R1,R1\nBZ #8\nMOVC R3,#9\nMOVC R4,#4\nHALT\n",
        &Config::default(),
    );
    assert_eq!(sim.stats().branch_mispredictions, 1);
    assert_eq!(sim.stats().branch_predictions, 1);
}

#[test]
fn jump_redirects_and_skips_intervening_instruction() {
    let sim = run("MOVC R1,#4008\nJUMP R1,#0\nMOVC R2,#1\nHALT\n", &Config::default());
    let snap = sim.snapshot();
    assert_eq!(snap.registers[2], -1);
}

#[test]
fn str_and_ldr_offset_addressing() {
    let sim = run(
        "MOVC R1,#3\nMOVC R2,#50\nMOVC R3,#4\nSTR R1,R2,R3\nLDR R4,R2,R3\nHALT\n",
        &Config::default(),
    );
    let snap = sim.snapshot();
    assert_eq!(snap.memory, vec![(54, 3)]);
    assert_eq!(snap.registers[4], 3);
}

#[test]
fn dispatch_stalls_when_rob_is_full_then_drains() {
    // Tiny ROB relative to a long MOVC chain forces dispatch to stall on a
    // full ROB at least once, then make progress once it can retire again.
    let config = Config {
        rob_size: 2,
        ..Config::default()
    };
    let program: String = (0..10)
        .map(|i| format!("MOVC R{},#{}\n", i % 16, i))
        .chain(std::iter::once("HALT\n".to_string()))
        .collect();
    let sim = run(&program, &config);
    assert!(sim.stats().stalls_rob > 0);
    assert_eq!(sim.snapshot().instructions_retired, 10);
}

#[test]
fn back_to_back_conditional_branches_exhaust_both_checkpoints() {
    // Two BZ in a row with no arithmetic producer between them both read the
    // same (absent) zero-flag producer and resolve immediately, but each
    // still consumes a checkpoint slot; a third would have to stall on the
    // 2-deep BIS if it arrived before either resolved.
    let sim = run("BZ #4\nBNZ #4\nHALT\n", &Config::default());
    assert_eq!(sim.stats().branch_predictions, 2);
}

#[test]
fn program_with_no_halt_stops_at_the_cycle_limit() {
    let mut file = tempfile::NamedTempFile::new().expect("create temp file");
    file.write_all(b"MOVC R1,#1\nADD R1,R1,R1\nBZ #-4\n").expect("write");
    let config = Config {
        max_cycles: 50,
        ..Config::default()
    };
    let mut sim = Simulator::init(file.path(), &config).expect("init");
    assert_eq!(sim.run(config.max_cycles), RunStatus::CycleLimit);
}

#[test]
fn malformed_program_is_reported_as_a_loader_error() {
    let mut file = tempfile::NamedTempFile::new().expect("create temp file");
    file.write_all(b"MOVC R1,#1\nNOT_AN_OPCODE R2\nHALT\n").expect("write");
    let err = Simulator::init(file.path(), &Config::default()).unwrap_err();
    assert!(err.to_string().contains("malformed instruction"));
}
