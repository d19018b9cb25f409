//! State that must survive a power cycle, and storage wear.

use crate::mock_hw::{Bench, MockHardware};

use powerbox::adapters::eeprom::MemEeprom;
use powerbox::app::events::AppEvent;
use powerbox::app::service::PowerBox;
use powerbox::power::PwmMode;
use powerbox::storage::config_log::SLOT_SIZE;
use powerbox::storage::{CONFIG_BASE, CURRENT_FLAG, EEPROM_SIZE};

fn plain() -> PowerBox {
    PowerBox::new(false, false, false)
}

fn live_slots(eeprom: &MemEeprom) -> usize {
    eeprom.bytes()[CONFIG_BASE..]
        .chunks_exact(SLOT_SIZE)
        .filter(|slot| slot[0] == CURRENT_FLAG)
        .count()
}

#[test]
fn port_state_survives_reboot() {
    let mut b = Bench::boot(plain(), MockHardware::new());
    assert_eq!(b.send("O:2"), ">OOK#");
    assert_eq!(b.send("W:9:77"), ">WOK#");
    assert_eq!(b.send("C:10:1"), ">COK#");
    assert_eq!(b.send("O:10"), ">OOK#");

    let b = b.reboot(plain(), MockHardware::new());
    assert!(b.pb.registry().is_on(2));
    assert_eq!(b.hw.relay_on(2), Some(true));
    assert_eq!(b.hw.relay_on(3), Some(false));
    assert_eq!(b.pb.registry().pwm_level(9), Some(77));
    assert_eq!(b.hw.pwm_level(9), Some(77));
    assert_eq!(b.pb.registry().pwm_mode(10), Some(PwmMode::Switchable));
    assert_eq!(b.hw.pwm_level(10), Some(255));
    // Nothing changed, so boot wrote no new record.
    assert_eq!(b.sink.count(|e| matches!(e, AppEvent::ConfigSaved { .. })), 0);
}

#[test]
fn names_and_tuning_survive_reboot() {
    let mut b = Bench::boot(plain(), MockHardware::new());
    assert_eq!(b.send("M:4:Mount"), ">MOK#");
    assert_eq!(b.send("K:2:30:60"), ">KOK#");

    let mut b = b.reboot(plain(), MockHardware::new());
    assert_eq!(b.send("N:4"), ">N:04:Mount#");
    assert_eq!(b.send("H:8"), ">H:08:2#");
    assert_eq!(b.pb.config().dew_duty_min_pct, 30);
    assert_eq!(b.pb.config().dew_duty_max_pct, 60);
}

#[test]
fn dew_port_boots_off_and_reverts_without_probe() {
    let mut b = Bench::boot(
        PowerBox::new(true, false, false),
        MockHardware::with_ambient(1_000, 9_500),
    );
    assert_eq!(b.send("C:8:2"), ">COK#");
    b.run_for(3_000);
    assert!(b.hw.pwm_level(8).is_some_and(|l| l > 0));

    // Same board with the probe: dew mode kept, output starts off.
    let b = b.reboot(
        PowerBox::new(true, false, false),
        MockHardware::with_ambient(1_000, 9_500),
    );
    assert_eq!(b.pb.registry().pwm_mode(8), Some(PwmMode::DewAmbient));
    assert_eq!(b.hw.pwm_level(8), Some(0));

    // Probe gone: the port drops back to variable and that is persisted.
    let b = b.reboot(plain(), MockHardware::new());
    assert_eq!(b.pb.registry().pwm_mode(8), Some(PwmMode::Variable));
    assert_eq!(b.pb.registry().pwm_level(8), Some(0));
    assert_eq!(b.sink.count(|e| matches!(e, AppEvent::ConfigSaved { .. })), 1);

    let b = b.reboot(
        PowerBox::new(true, false, false),
        MockHardware::with_ambient(1_000, 9_500),
    );
    assert_eq!(b.pb.registry().pwm_mode(8), Some(PwmMode::Variable));
}

#[test]
fn repeated_command_writes_nothing() {
    let mut b = Bench::boot(plain(), MockHardware::new());
    assert_eq!(b.send("O:5"), ">OOK#");
    let writes = b.eeprom.write_count();
    assert_eq!(b.send("O:5"), ">OOK#");
    assert_eq!(b.send("M:5:Port05"), ">MOK#");
    assert_eq!(b.eeprom.write_count(), writes);
}

#[test]
fn dew_duty_changes_are_not_persisted() {
    let mut b = Bench::boot(
        PowerBox::new(true, false, false),
        MockHardware::with_ambient(1_000, 9_500),
    );
    assert_eq!(b.send("C:8:2"), ">COK#");
    let writes = b.eeprom.write_count();
    b.run_for(10_000);
    assert_eq!(b.eeprom.write_count(), writes);
}

#[test]
fn rotation_keeps_a_single_live_slot() {
    let mut b = Bench::boot(plain(), MockHardware::new());
    let slots = (EEPROM_SIZE - CONFIG_BASE) / SLOT_SIZE;
    for i in 0..slots + 3 {
        let level = (i % 200) + 1;
        assert_eq!(b.send(&format!("W:8:{level}")), ">WOK#");
        assert_eq!(live_slots(&b.eeprom), 1);
    }
    let last = ((slots + 2) % 200) + 1;

    let b = b.reboot(plain(), MockHardware::new());
    assert_eq!(b.pb.registry().pwm_level(8), Some(last as u8));
}

#[test]
fn corrupt_record_is_repaired_on_boot() {
    let mut b = Bench::boot(plain(), MockHardware::new());
    assert_eq!(b.send("O:1"), ">OOK#");

    // Erase the live record's payload but keep its flag.
    let mut image = b.eeprom.bytes().to_vec();
    let live = image[CONFIG_BASE..]
        .chunks_exact(SLOT_SIZE)
        .position(|slot| slot[0] == CURRENT_FLAG)
        .expect("one live slot");
    let offset = CONFIG_BASE + live * SLOT_SIZE;
    image[offset + 1..offset + SLOT_SIZE].fill(0xFF);

    let b = Bench::boot_with(plain(), MockHardware::new(), MemEeprom::from_bytes(image));
    assert_eq!(b.sink.count(|e| *e == AppEvent::ConfigRecovered), 1);
    assert!(!b.pb.registry().is_on(1));
    assert_eq!(live_slots(&b.eeprom), 1);
}
