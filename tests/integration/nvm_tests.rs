//! Integration tests for the NVM poke loop.

use ncilink::adapters::patch_file::PatchFile;
use ncilink::config::HalConfig;
use ncilink::lifecycle::InitState;
use ncilink::nci::LogicalMessage;
use ncilink::nvm::PatchRecord;

use crate::mock_transport::*;

fn nvm_config() -> HalConfig {
    HalConfig {
        nvm_update_enabled: true,
        ..HalConfig::default()
    }
}

fn two_records() -> PatchFile {
    PatchFile::from_records(vec![
        PatchRecord {
            address: 0x0020_0100,
            data: vec![0xAA, 0xBB],
        },
        PatchRecord {
            address: 0x0020_0110,
            data: vec![0x7F],
        },
    ])
}

fn init_answered(config: HalConfig, patch: PatchFile) -> Engine {
    let mut e = ready_engine(config);
    e.set_patch_source(Box::new(patch));
    e.send(LogicalMessage::from_bytes(&CORE_INIT_CMD).unwrap()).unwrap();
    feed(&mut e, &CORE_INIT_RSP);
    e
}

#[test]
fn pokes_one_record_per_response() {
    let mut e = init_answered(nvm_config(), two_records());
    assert_eq!(
        e.transport().last_write(),
        Some(&[0x2F, 0x03, 0x08, 0x01, 0x00, 0x01, 0x20, 0x00, 0x02, 0xAA, 0xBB][..])
    );
    assert!(e.is_command_pending());
    assert_eq!(e.callbacks().messages, vec![CORE_INIT_RSP.to_vec()]);

    feed(&mut e, &MEMACCESS_RSP);
    assert_eq!(
        e.transport().last_write(),
        Some(&[0x2F, 0x03, 0x07, 0x01, 0x10, 0x01, 0x20, 0x00, 0x01, 0x7F][..])
    );
    assert_eq!(e.callbacks().nvm_complete, 0);

    feed(&mut e, &MEMACCESS_RSP);
    assert_eq!(e.callbacks().nvm_complete, 1);
    assert_eq!(e.init_state(), InitState::W4PostInitDone);
    assert_eq!(e.transport().writes.len(), 3);
}

#[test]
fn completion_reported_once() {
    let mut e = init_answered(nvm_config(), two_records());
    feed(&mut e, &MEMACCESS_RSP);
    feed(&mut e, &MEMACCESS_RSP);
    e.set_init_state(InitState::Idle);
    feed(&mut e, &MEMACCESS_RSP);
    assert_eq!(e.callbacks().nvm_complete, 1);
    assert_eq!(e.transport().writes.len(), 3);
}

#[test]
fn factory_test_mode_disables_loop() {
    let config = HalConfig {
        ftm_mode: true,
        ..nvm_config()
    };
    let e = init_answered(config, two_records());
    assert_eq!(e.transport().writes, vec![CORE_INIT_CMD.to_vec()]);
}

#[test]
fn disabled_flag_disables_loop() {
    let e = init_answered(HalConfig::default(), two_records());
    assert_eq!(e.transport().writes.len(), 1);
}

#[test]
fn empty_patch_source_is_quiet() {
    let mut e = init_answered(nvm_config(), PatchFile::default());
    assert_eq!(e.transport().writes.len(), 1);
    feed(&mut e, &MEMACCESS_RSP);
    assert_eq!(e.callbacks().nvm_complete, 0);
    assert_eq!(e.init_state(), InitState::Idle);
}
