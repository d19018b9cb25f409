//! Periodic work: sampling, the overvoltage interlock and the dew heater.

use crate::mock_hw::{Bench, MockHardware, SENSE_12V, SENSE_15V};

use powerbox::app::events::AppEvent;
use powerbox::app::service::PowerBox;
use powerbox::error::SafetyFault;
use powerbox::power::percent_to_level;

fn board_with_probe(t_centi: i32, rh_centi: i32) -> Bench {
    Bench::boot(
        PowerBox::new(true, false, false),
        MockHardware::with_ambient(t_centi, rh_centi),
    )
}

#[test]
fn status_reports_measurements_and_ambient() {
    let mut b = board_with_probe(2_000, 5_000);
    b.run_for(1_000);
    let status = b.send("S");
    let fields: Vec<&str> = status
        .trim_start_matches(">S:")
        .trim_end_matches('#')
        .split(':')
        .collect();
    // 14 states, 14 currents, input current and voltage, T/RH/DP.
    assert_eq!(fields.len(), 33, "{status}");
    assert_eq!(fields[29], "12.00");
    assert_eq!(fields[30], "20.00");
    assert_eq!(fields[31], "50.00");
}

#[test]
fn status_without_probe_has_no_ambient_fields() {
    let mut b = Bench::boot(PowerBox::new(false, false, false), MockHardware::new());
    b.run_for(1_000);
    let status = b.send("S");
    assert_eq!(status.split(':').count(), 31, "{status}");
}

#[test]
fn overvoltage_blocks_switch_on_until_cleared() {
    let mut b = Bench::boot(PowerBox::new(false, false, false), MockHardware::new());
    b.hw.input_sense_mv = Some(SENSE_15V);
    b.tick();
    assert_eq!(
        b.sink
            .count(|e| *e == AppEvent::FaultDetected(SafetyFault::InputOvervoltage)),
        1
    );
    assert!(b.pb.safety().has_fault(SafetyFault::InputOvervoltage));

    assert_eq!(b.send("O:2"), ">ERR#");
    assert_eq!(b.send("F:2"), ">FOK#");
    assert_eq!(b.send("W:8:0"), ">WOK#");
    assert_eq!(b.send("W:8:5"), ">ERR#");
    assert!(!b.pb.registry().is_on(2));

    b.hw.input_sense_mv = Some(SENSE_12V);
    b.run_for(4 * 200);
    assert_eq!(
        b.sink
            .count(|e| *e == AppEvent::FaultCleared(SafetyFault::InputOvervoltage)),
        1
    );
    assert_eq!(b.send("O:2"), ">OOK#");
}

#[test]
fn failed_input_sample_keeps_previous_average() {
    let mut b = Bench::boot(PowerBox::new(false, false, false), MockHardware::new());
    b.run_for(1_000);
    assert_eq!(b.pb.registry().measurements().input_mv(), 12_000);
    b.hw.input_sense_mv = None;
    b.run_for(1_000);
    assert_eq!(b.pb.registry().measurements().input_mv(), 12_000);
}

#[test]
fn dew_heater_engages_and_ramps_within_slew() {
    // 10 degC at 95 %RH: the margin is well under the turn-on point.
    let mut b = board_with_probe(1_000, 9_500);
    assert_eq!(b.send("C:8:2"), ">COK#");
    assert!(b.pb.dew().is_active());
    assert_eq!(b.pb.dew().duty_pct(), 20);
    assert_eq!(b.hw.pwm_level(8), Some(percent_to_level(20)));
    assert_eq!(
        b.sink.count(|e| matches!(
            e,
            AppEvent::DewStateChanged { active: true, .. }
        )),
        1
    );

    let mut prev = b.pb.dew().duty_pct();
    for _ in 0..10 {
        b.run_for(1_000);
        let duty = b.pb.dew().duty_pct();
        assert!(duty.abs_diff(prev) <= 10, "{prev} -> {duty}");
        assert!((20..=80).contains(&duty));
        assert_eq!(b.hw.pwm_level(8), Some(percent_to_level(duty)));
        assert_eq!(b.pb.registry().pwm_level(8), Some(percent_to_level(duty)));
        prev = duty;
    }
    assert!(prev > 20, "duty should have ramped up");

    // Only the dew port follows the heater.
    assert_eq!(b.hw.pwm_level(9), Some(0));
}

#[test]
fn second_dew_port_ramps_from_minimum() {
    let mut b = board_with_probe(1_000, 9_500);
    assert_eq!(b.send("C:8:2"), ">COK#");
    b.run_for(5_000);
    let shared = b.pb.dew().duty_pct();
    assert!(shared > 30, "duty {shared}");

    assert_eq!(b.send("C:9:2"), ">COK#");
    let mut levels = Vec::new();
    for _ in 0..8 {
        b.run_for(1_000);
        levels.push(b.hw.pwm_level(9).unwrap_or(0));
    }
    let running: Vec<u8> = levels.iter().copied().skip_while(|&l| l == 0).collect();
    assert_eq!(running.first(), Some(&percent_to_level(20)), "{levels:?}");
    for pair in running.windows(2) {
        assert!(pair[1] <= pair[0] + percent_to_level(10) + 1, "{levels:?}");
    }
    // Caught up with the shared duty by the end.
    assert_eq!(b.hw.pwm_level(9), b.hw.pwm_level(8));
}

#[test]
fn dew_heater_releases_in_dry_air() {
    let mut b = board_with_probe(1_000, 9_500);
    assert_eq!(b.send("C:8:2"), ">COK#");
    b.run_for(3_000);
    assert!(b.pb.dew().is_active());

    b.hw.set_ambient(2_000, 3_000);
    b.run_for(60_000);
    assert!(!b.pb.dew().is_active());
    assert_eq!(b.pb.dew().duty_pct(), 0);
    assert_eq!(b.hw.pwm_level(8), Some(0));
    assert_eq!(
        b.sink.count(|e| matches!(
            e,
            AppEvent::DewStateChanged { active: false, .. }
        )),
        1
    );
}

#[test]
fn leaving_dew_mode_stops_the_heater() {
    let mut b = board_with_probe(1_000, 9_500);
    assert_eq!(b.send("C:8:2"), ">COK#");
    b.run_for(2_000);
    assert!(b.pb.dew().duty_pct() > 0);

    assert_eq!(b.send("C:8:0"), ">COK#");
    assert_eq!(b.hw.pwm_level(8), Some(0));
    assert_eq!(b.pb.registry().pwm_level(8), Some(0));
    b.run_for(2_000);
    assert!(!b.pb.dew().is_active());
    assert_eq!(b.hw.pwm_level(8), Some(0));
}

#[test]
fn probe_failure_keeps_last_reading() {
    let mut b = board_with_probe(2_000, 5_000);
    b.run_for(1_000);
    assert_eq!(b.pb.probe().temperature_centi(), 2_000);

    b.hw.probe = None;
    b.run_for(1_000);
    assert!(b.sink.count(|e| matches!(e, AppEvent::ProbeReadFailed(_))) >= 1);
    assert_eq!(b.pb.probe().temperature_centi(), 2_000);
    assert_eq!(b.pb.probe().humidity_centi(), 5_000);
}

#[test]
fn no_probe_means_no_probe_reads() {
    let mut b = Bench::boot(PowerBox::new(false, false, false), MockHardware::new());
    b.run_for(5_000);
    assert_eq!(b.hw.probe_reads, 0);
    assert_eq!(b.pb.probe().margin_centi(), None);
}

#[test]
fn fake_probe_drives_dew_mode_when_debugging() {
    let mut b = Bench::boot(PowerBox::new(false, false, true), MockHardware::new());
    assert_eq!(b.send("X:5:99"), ">XOK#");
    assert_eq!(b.send("C:9:2"), ">COK#");
    b.run_for(2_000);
    assert!(b.pb.dew().is_active());
    assert_eq!(b.hw.probe_reads, 0);
}
