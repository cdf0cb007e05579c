//! Integration tests for sleep/wake negotiation.

use ncilink::app::commands::EngineCommand;
use ncilink::app::events::{HalEvent, HalStatus};
use ncilink::config::HalConfig;
use ncilink::error::{CommandError, Error};
use ncilink::nci::{LogicalMessage, deactivate, discovery, interface};
use ncilink::power::PowerState;

use crate::mock_transport::*;

fn pm() -> HalConfig {
    HalConfig {
        power_management_enabled: true,
        ..HalConfig::default()
    }
}

fn cmd(bytes: &[u8]) -> LogicalMessage {
    LogicalMessage::from_bytes(bytes).unwrap()
}

/// Discover answered OK with power management on: sleep requested.
fn sleep_requested() -> Engine {
    let mut e = ready_engine(pm());
    e.send(cmd(&RF_DISCOVER_CMD)).unwrap();
    feed(&mut e, &RF_DISCOVER_RSP);
    e
}

fn sleeping() -> Engine {
    let mut e = sleep_requested();
    feed(&mut e, &PROP_SLEEP_RSP);
    e.transport_mut().writes.clear();
    e.transport_mut().wakes.clear();
    e
}

#[test]
fn discover_response_requests_sleep() {
    let mut e = sleep_requested();
    assert_eq!(e.transport().last_write(), Some(&PROP_SLEEP_CMD[..]));
    assert_eq!(e.power_state(), PowerState::SleepRequested);
    assert!(e.is_command_pending());

    feed(&mut e, &PROP_SLEEP_RSP);
    assert_eq!(e.power_state(), PowerState::Sleeping);
    assert!(!e.is_command_pending());
    assert_eq!(e.transport().wakes, vec![false]);
    // The sleep response is consumed.
    assert_eq!(e.callbacks().messages, vec![RF_DISCOVER_RSP.to_vec()]);
}

#[test]
fn no_sleep_request_without_power_management() {
    let mut e = ready_engine(HalConfig::default());
    e.send(cmd(&RF_DISCOVER_CMD)).unwrap();
    feed(&mut e, &RF_DISCOVER_RSP);
    assert_eq!(e.power_state(), PowerState::Full);
    assert_eq!(e.transport().writes.len(), 1);
}

#[test]
fn send_while_sleeping_is_deferred_once() {
    let mut e = sleeping();
    e.send(cmd(&CORE_INIT_CMD)).unwrap();
    assert!(e.transport().writes.is_empty());
    assert!(e.has_deferred());

    assert_eq!(
        e.send(cmd(&CORE_INIT_CMD)),
        Err(Error::Command(CommandError::DeferSlotFull))
    );
}

#[test]
fn activation_while_sleeping_wakes_once_and_flushes() {
    let mut e = sleeping();
    e.send(cmd(&CORE_INIT_CMD)).unwrap();

    feed(&mut e, &intf_activated(interface::ISO_DEP, discovery::POLL_A, 1));
    assert_eq!(e.power_state(), PowerState::Full);
    assert_eq!(e.transport().wake_asserts(), 1);
    assert_eq!(e.transport().writes, vec![CORE_INIT_CMD.to_vec()]);
    assert!(e.is_command_pending());
    assert!(!e.has_deferred());
}

#[test]
fn host_wake_flushes_deferred() {
    let mut e = sleeping();
    e.send(cmd(&CORE_INIT_CMD)).unwrap();
    e.handle(EngineCommand::Wake).unwrap();
    assert_eq!(e.power_state(), PowerState::Full);
    assert_eq!(e.transport().wakes, vec![true]);
    assert_eq!(e.transport().last_write(), Some(&CORE_INIT_CMD[..]));
}

#[test]
fn command_deferred_across_sleep_confirmation_wakes() {
    let mut e = sleep_requested();
    e.send(cmd(&CORE_INIT_CMD)).unwrap();
    assert!(e.has_deferred());

    feed(&mut e, &PROP_SLEEP_RSP);
    assert_eq!(e.power_state(), PowerState::Full);
    assert_eq!(e.transport().wakes, vec![false, true]);
    assert_eq!(e.transport().last_write(), Some(&CORE_INIT_CMD[..]));
}

#[test]
fn unanswered_sleep_request_reverts_to_full() {
    let mut e = sleep_requested();
    e.send(cmd(&CORE_INIT_CMD)).unwrap();
    let token = e.pending_token().unwrap();

    e.handle(EngineCommand::CommandTimeout(token)).unwrap();
    assert_eq!(e.power_state(), PowerState::Full);
    assert_eq!(
        e.callbacks().events,
        vec![HalEvent::Error(HalStatus::ErrCmdTimeout)]
    );
    assert_eq!(e.transport().last_write(), Some(&CORE_INIT_CMD[..]));
    assert!(e.is_command_pending());
}

#[test]
fn deferred_command_sent_when_sleep_request_expires_after_wake() {
    let mut e = sleep_requested();
    let sleep_token = e.pending_token().unwrap();
    e.send(cmd(&CORE_INIT_CMD)).unwrap();
    assert!(e.has_deferred());

    // Activation wakes the controller, but the sleep command still blocks the flush.
    feed(&mut e, &intf_activated(interface::ISO_DEP, discovery::POLL_A, 1));
    assert_eq!(e.power_state(), PowerState::Full);
    assert!(e.has_deferred());
    assert_eq!(e.pending_token(), Some(sleep_token));

    e.handle(EngineCommand::CommandTimeout(sleep_token)).unwrap();
    assert_eq!(e.transport().last_write(), Some(&CORE_INIT_CMD[..]));
    assert!(!e.has_deferred());
    assert!(e.is_command_pending());
    assert_ne!(e.pending_token(), Some(sleep_token));
}

#[test]
fn discovery_deactivation_after_poll_requests_sleep() {
    let mut e = ready_engine(pm());
    feed(&mut e, &intf_activated(interface::ISO_DEP, discovery::POLL_A, 1));
    feed(&mut e, &deactivate_ntf(deactivate::DISCOVERY));
    assert_eq!(e.transport().last_write(), Some(&PROP_SLEEP_CMD[..]));
    assert_eq!(e.power_state(), PowerState::SleepRequested);
}

#[test]
fn listen_mode_deactivation_stays_awake() {
    let mut e = ready_engine(pm());
    feed(&mut e, &intf_activated(interface::ISO_DEP, discovery::LISTEN_A, 1));
    feed(&mut e, &deactivate_ntf(deactivate::DISCOVERY));
    assert!(e.transport().writes.is_empty());
    assert_eq!(e.power_state(), PowerState::Full);
}

#[test]
fn nfc_dep_sleeps_after_second_set_config() {
    let mut e = ready_engine(pm());
    feed(&mut e, &intf_activated(interface::NFC_DEP, discovery::POLL_A, 1));

    feed(&mut e, &deactivate_ntf(deactivate::DISCOVERY));
    assert!(e.transport().writes.is_empty(), "NFC-DEP deactivation wakes, never sleeps");

    feed(&mut e, &CORE_SET_CONFIG_RSP);
    assert!(e.transport().writes.is_empty());
    feed(&mut e, &CORE_SET_CONFIG_RSP);
    assert_eq!(e.transport().last_write(), Some(&PROP_SLEEP_CMD[..]));
}

#[test]
fn unsolicited_sleep_notification_clears_pending() {
    let mut e = ready_engine(HalConfig::default());
    e.send(cmd(&CORE_INIT_CMD)).unwrap();
    let token = e.pending_token().unwrap();

    feed(&mut e, &[0x6F, 0x02, 0x00]);
    assert_eq!(e.power_state(), PowerState::Sleeping);
    assert!(!e.is_command_pending());
    assert!(e.timer().cancelled.contains(&token));
    assert_eq!(e.callbacks().messages, vec![vec![0x6F, 0x02, 0x00]]);
}
