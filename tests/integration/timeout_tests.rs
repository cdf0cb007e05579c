//! Integration tests for lifecycle-dependent timeout recovery.

use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};

use ncilink::app::commands::EngineCommand;
use ncilink::app::events::{HalEvent, HalStatus};
use ncilink::config::HalConfig;
use ncilink::lifecycle::InitState;
use ncilink::nci::LogicalMessage;

use crate::mock_transport::*;

const T: HalStatus = HalStatus::ErrCmdTimeout;

fn send_and_expire(e: &mut Engine, bytes: &[u8]) {
    e.send(LogicalMessage::from_bytes(bytes).unwrap()).unwrap();
    let token = e.pending_token().unwrap();
    e.handle(EngineCommand::CommandTimeout(token)).unwrap();
}

fn in_state(state: InitState) -> Engine {
    let mut e = ready_engine(HalConfig::default());
    e.set_init_state(state);
    e
}

#[test]
fn core_reset_timeout_aborts_open_once() {
    let mut e = engine(HalConfig::default());
    e.open().unwrap();
    e.send(LogicalMessage::from_bytes(&CORE_RESET_CMD).unwrap()).unwrap();
    let token = e.pending_token().unwrap();

    e.handle(EngineCommand::CommandTimeout(token)).unwrap();
    assert_eq!(e.callbacks().events, vec![HalEvent::OpenComplete(T)]);
    assert!(!e.is_command_pending());
    assert_eq!(e.init_state(), InitState::Idle);

    // The same deadline firing again is stale.
    e.handle(EngineCommand::CommandTimeout(token)).unwrap();
    assert_eq!(e.callbacks().events.len(), 1);
}

#[test]
fn patch_download_timeout_goes_to_download_recovery() {
    let mut e = in_state(InitState::W4AppComplete);
    e.set_patch_download_active(true);
    send_and_expire(&mut e, &CORE_INIT_CMD);
    assert_eq!(e.callbacks().patch_timeouts, 1);
    assert!(e.callbacks().events.is_empty());
}

#[test]
fn app_complete_timeout_without_download_aborts() {
    let mut e = in_state(InitState::W4AppComplete);
    send_and_expire(&mut e, &CORE_INIT_CMD);
    assert_eq!(e.callbacks().events, vec![HalEvent::OpenComplete(T)]);
}

#[test]
fn post_init_timeout_reports_post_init() {
    let mut e = in_state(InitState::W4PostInitDone);
    send_and_expire(&mut e, &CORE_INIT_CMD);
    assert_eq!(e.callbacks().events, vec![HalEvent::PostInitComplete(T)]);
    assert_eq!(e.init_state(), InitState::Idle);
}

#[test]
fn control_timeout_releases_control() {
    let mut e = in_state(InitState::W4ControlDone);
    send_and_expire(&mut e, &CORE_INIT_CMD);
    assert_eq!(e.callbacks().events, vec![HalEvent::ReleaseControl(T)]);
}

#[test]
fn prediscover_timeout_reports_prediscover() {
    let mut e = in_state(InitState::W4PrediscoverDone);
    send_and_expire(&mut e, &CORE_INIT_CMD);
    assert_eq!(e.callbacks().events, vec![HalEvent::PreDiscoverComplete(T)]);
}

#[test]
fn idle_timeout_reported_as_error() {
    let mut e = ready_engine(HalConfig::default());
    send_and_expire(&mut e, &CORE_INIT_CMD);
    assert_eq!(e.callbacks().events, vec![HalEvent::Error(T)]);
    assert!(!e.is_command_pending());
}

#[test]
fn late_response_skips_completion() {
    let mut e = ready_engine(HalConfig::default());
    let calls = Arc::new(AtomicU32::new(0));
    let counter = Arc::clone(&calls);
    e.send_with_completion(
        LogicalMessage::from_bytes(&CORE_INIT_CMD).unwrap(),
        Some(Box::new(move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
        })),
    )
    .unwrap();
    let token = e.pending_token().unwrap();
    e.handle(EngineCommand::CommandTimeout(token)).unwrap();

    feed(&mut e, &CORE_INIT_RSP);
    assert_eq!(calls.load(Ordering::SeqCst), 0);
    assert_eq!(e.callbacks().messages, vec![CORE_INIT_RSP.to_vec()]);
}

#[test]
fn next_command_gets_fresh_deadline() {
    let mut e = ready_engine(HalConfig::default());
    send_and_expire(&mut e, &CORE_INIT_CMD);
    e.send(LogicalMessage::from_bytes(&CORE_INIT_CMD).unwrap()).unwrap();
    let started = &e.timer().started;
    assert_eq!(started.len(), 2);
    assert_ne!(started[0].0, started[1].0);
    assert_eq!(started[1].1, HalConfig::default().cmd_timeout_ms);
}
