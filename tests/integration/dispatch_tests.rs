//! Serial command dispatch against a booted board.
//!
//! Every test drives the board through raw bytes on the mock serial link
//! and checks both the response frame and the resulting output calls.

use crate::mock_hw::{Bench, LogSink, MockHardware, OutputCall};

use powerbox::app::events::AppEvent;
use powerbox::app::service::PowerBox;
use powerbox::board::{PORT_COUNT, PortType};
use powerbox::power::PwmMode;

fn board() -> Bench {
    Bench::boot(PowerBox::new(false, false, false), MockHardware::new())
}

fn board_with_probe() -> Bench {
    Bench::boot(
        PowerBox::new(true, false, false),
        MockHardware::with_ambient(2_000, 5_000),
    )
}

#[test]
fn ping_and_discovery() {
    let mut b = board();
    assert_eq!(b.send("P"), ">POK#");
    assert_eq!(b.send("D"), ">D:BigPowerBox:013:mmmmmmmmppppaa#");

    let mut b = board_with_probe();
    assert_eq!(b.send("D"), ">D:BigPowerBox:013:mmmmmmmmppppaaf#");
}

#[test]
fn relay_port_on_and_off() {
    let mut b = board();
    assert_eq!(b.send("O:2"), ">OOK#");
    assert!(b.pb.registry().is_on(2));
    assert_eq!(b.hw.relay_on(2), Some(true));

    assert_eq!(b.send("F:2"), ">FOK#");
    assert!(!b.pb.registry().is_on(2));
    assert_eq!(b.hw.relay_on(2), Some(false));
}

#[test]
fn relay_bus_failure_leaves_state_untouched() {
    let mut b = board();
    b.hw.relay_fail = true;
    assert_eq!(b.send("O:2"), ">ERR#");
    assert!(!b.pb.registry().is_on(2));
    assert!(!b.pb.config().port_on(2));
}

#[test]
fn always_on_ports_cannot_be_switched() {
    let mut b = board();
    assert_eq!(b.send("F:12"), ">ERR#");
    assert_eq!(b.send("O:13"), ">ERR#");
    assert!(b.pb.registry().is_on(12));
    assert!(b.pb.registry().is_on(13));
}

#[test]
fn out_of_range_port_and_level() {
    let mut b = board();
    assert_eq!(b.send("O:14"), ">ERR#");
    assert_eq!(b.send("W:8:300"), ">ERR#");
    assert_eq!(b.pb.registry().pwm_level(8), Some(0));
}

#[test]
fn pwm_level_rejected_on_relay_port() {
    let mut b = board();
    let before = b.hw.calls.len();
    assert_eq!(b.send("W:3:9"), ">ERR#");
    assert_eq!(b.hw.calls.len(), before);
}

#[test]
fn pwm_level_rejected_on_direct_port_of_other_layout() {
    let layout: [PortType; PORT_COUNT] = core::array::from_fn(|i| {
        let sig = b"mmmmmmmmspppaa";
        PortType::from_signature(sig[i]).expect("valid signature")
    });
    let mut b = Bench::boot(
        PowerBox::with_layout(layout, false, false, false),
        MockHardware::new(),
    );
    assert_eq!(b.send("W:8:9"), ">ERR#");
    assert_eq!(b.send("O:8"), ">OOK#");
    assert!(b.hw.calls.contains(&OutputCall::Direct { port: 8, on: true }));
}

#[test]
fn variable_pwm_level() {
    let mut b = board();
    assert_eq!(b.send("W:9:128"), ">WOK#");
    assert_eq!(b.hw.pwm_level(9), Some(128));
    assert!(b.pb.registry().is_on(9));
    // Variable PWM ports are not switched with O/F.
    assert_eq!(b.send("O:9"), ">ERR#");
    assert_eq!(b.send("W:9:0"), ">WOK#");
    assert!(!b.pb.registry().is_on(9));
}

#[test]
fn switchable_pwm_mode() {
    let mut b = board();
    assert_eq!(b.send("W:10:40"), ">WOK#");
    assert_eq!(b.send("C:10:1"), ">COK#");
    assert_eq!(b.send("G:10"), ">G:10:1#");
    // Was on, so switchable keeps it on at full duty.
    assert_eq!(b.hw.pwm_level(10), Some(255));
    assert_eq!(b.send("W:10:40"), ">ERR#");
    assert_eq!(b.send("F:10"), ">FOK#");
    assert_eq!(b.hw.pwm_level(10), Some(0));
    assert_eq!(b.send("O:10"), ">OOK#");
    assert_eq!(b.hw.pwm_level(10), Some(255));
}

#[test]
fn pwm_mode_queries_and_errors() {
    let mut b = board();
    assert_eq!(b.send("G:8"), ">G:08:0#");
    assert_eq!(b.send("G:2"), ">ERR#");
    assert_eq!(b.send("C:8:7"), ">ERR#");
    assert_eq!(b.send("C:2:1"), ">ERR#");
}

#[test]
fn dew_mode_requires_probe() {
    let mut b = board();
    assert_eq!(b.send("C:8:2"), ">ERR#");
    assert_eq!(b.pb.registry().pwm_mode(8), Some(PwmMode::Variable));

    let mut b = board_with_probe();
    assert_eq!(b.send("C:8:2"), ">COK#");
    assert_eq!(b.send("G:8"), ">G:08:2#");
}

#[test]
fn names_round_trip_and_reset() {
    let mut b = board();
    assert_eq!(b.send("N:3"), ">N:03:Port03#");
    assert_eq!(b.send("M:3:Heater"), ">MOK#");
    assert_eq!(b.send("N:3"), ">N:03:Heater#");
    assert_eq!(b.send("M:3:"), ">ERR#");
    assert_eq!(b.send("N:3"), ">N:03:Heater#");
    assert_eq!(b.send("R:NAMES"), ">ROK#");
    assert_eq!(b.send("N:3"), ">N:03:Port03#");
}

#[test]
fn legacy_commands() {
    let mut b = board();
    assert_eq!(b.send("T"), ">TOK#");
    assert_eq!(b.send("H:8"), ">H:08:3#");
    assert_eq!(b.send("K:1"), ">KOK#");
    assert_eq!(b.send("H:8"), ">H:08:1#");
}

#[test]
fn reset_conf_turns_everything_off() {
    let mut b = board();
    assert_eq!(b.send("O:0"), ">OOK#");
    assert_eq!(b.send("W:8:100"), ">WOK#");
    assert_eq!(b.send("C:9:1"), ">COK#");
    assert_eq!(b.send("O:9"), ">OOK#");
    assert_eq!(b.send("K:2:30:60"), ">KOK#");

    assert_eq!(b.send("R:CONF"), ">ROK#");

    let status = b.send("S");
    let fields: Vec<&str> = status
        .trim_start_matches(">S:")
        .trim_end_matches('#')
        .split(':')
        .collect();
    for (port, value) in fields.iter().take(12).enumerate() {
        assert_eq!(*value, "0", "port {port} should be off");
    }
    assert_eq!(fields[12], "1");
    assert_eq!(fields[13], "1");
    assert_eq!(b.send("G:9"), ">G:09:0#");
    assert_eq!(b.send("H:8"), ">H:08:3#");
    assert_eq!(b.hw.relay_on(0), Some(false));
}

#[test]
fn unknown_and_empty_frames_answer_err() {
    let mut b = board();
    assert_eq!(b.send("Z"), ">ERR#");
    assert_eq!(b.send(""), ">ERR#");
    assert_eq!(b.send("R:EVERYTHING"), ">ERR#");
}

#[test]
fn debug_override_requires_flag() {
    let mut b = board_with_probe();
    assert_eq!(b.send("X:12:80"), ">ERR#");

    let mut b = Bench::boot(PowerBox::new(false, false, true), MockHardware::new());
    assert_eq!(b.pb.signature(), "mmmmmmmmppppaaf");
    assert_eq!(b.send("X:12:80"), ">XOK#");
    b.run_for(1_000);
    assert_eq!(b.pb.probe().temperature_centi(), 1_200);
    assert_eq!(b.pb.probe().humidity_centi(), 8_000);
    assert_eq!(b.hw.probe_reads, 0);
    assert_eq!(b.send("X:"), ">XOK#");
}

#[test]
fn garbage_and_split_frames() {
    let mut b = board();
    b.serial.inject(b"noise>O:3#more noise>O:");
    b.tick();
    assert_eq!(b.serial.take_output(), b">OOK#");
    b.serial.inject(b"4#");
    b.tick();
    assert_eq!(b.serial.take_output(), b">OOK#");
    assert!(b.pb.registry().is_on(3));
    assert!(b.pb.registry().is_on(4));
}

#[test]
fn sixth_frame_in_one_burst_is_dropped() {
    let mut b = board();
    b.sink = LogSink::new();
    b.serial.inject(b">P#>P#>P#>P#>P#>P#");
    b.tick();
    assert_eq!(b.serial.take_output(), b">POK#>POK#>POK#>POK#>POK#");
    assert_eq!(b.sink.count(|e| *e == AppEvent::QueueOverflow), 1);
}

#[test]
fn overlong_frame_is_dropped_silently() {
    let mut b = board();
    b.sink = LogSink::new();
    b.serial.inject(b">M:1:ABCDEFGHIJKLMNOPQRSTUVWXYZ#>P#");
    b.tick();
    assert_eq!(b.serial.take_output(), b">POK#");
    assert_eq!(b.sink.count(|e| *e == AppEvent::FrameDropped), 1);
}
