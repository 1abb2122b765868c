//! Deserializing the mailbox section of a host configuration.
//!
//! Run with: `cargo test -p ringmailbox --features serde --test settings_tests`

#![cfg(feature = "serde")]

use ringmailbox::{ConfigError, MailboxConfig, MailboxSettings, RingMailbox, WaitStrategyKind};
use std::time::Duration;

#[test]
fn test_settings_full_section() {
    let settings: MailboxSettings = serde_json::from_str(
        r#"{
            "mailbox-capacity": 1024,
            "wait-strategy": "busy-spin",
            "wait-timeout-ms": 50,
            "enable-metrics": true
        }"#,
    )
    .unwrap();

    assert_eq!(settings.mailbox_capacity, 1024);
    assert_eq!(settings.wait_strategy, WaitStrategyKind::BusySpin);
    assert_eq!(settings.wait_timeout_ms, Some(50));
    assert!(settings.enable_metrics);

    let config = MailboxConfig::try_from(settings).unwrap();
    assert_eq!(config.capacity().get(), 1024);
    assert_eq!(config.wait_timeout, Some(Duration::from_millis(50)));
    assert!(format!("{:?}", config.wait_strategy()).contains("BusySpin"));
}

#[test]
fn test_settings_defaults() {
    let settings: MailboxSettings =
        serde_json::from_str(r#"{ "mailbox-capacity": 16 }"#).unwrap();

    assert_eq!(settings, MailboxSettings::new(16));
    assert_eq!(settings.wait_strategy, WaitStrategyKind::Sleeping);

    let mailbox = RingMailbox::from_settings(settings).unwrap();
    assert!(format!("{:?}", mailbox.config().wait_strategy()).contains("Sleeping"));
    assert_eq!(mailbox.config().wait_timeout, None);
    assert!(!mailbox.config().enable_metrics);
}

#[test]
fn test_settings_reject_unknown_keys() {
    let err = serde_json::from_str::<MailboxSettings>(
        r#"{ "mailbox-capacity": 16, "mailbox-push-timeout-time": "10s" }"#,
    )
    .unwrap_err();
    assert!(err.to_string().contains("unknown field"), "{err}");

    assert!(serde_json::from_str::<MailboxSettings>(r#"{ "wait-strategy": "yielding" }"#).is_err());
    assert!(serde_json::from_str::<MailboxSettings>(
        r#"{ "mailbox-capacity": 16, "wait-strategy": "blocking" }"#
    )
    .is_err());
}

#[test]
fn test_settings_invalid_capacity_surfaces_on_creation() {
    let settings: MailboxSettings =
        serde_json::from_str(r#"{ "mailbox-capacity": 1000 }"#).unwrap();
    assert_eq!(
        RingMailbox::from_settings(settings).unwrap_err(),
        ConfigError::NotPowerOfTwo { capacity: 1000 }
    );

    let settings: MailboxSettings =
        serde_json::from_str(r#"{ "mailbox-capacity": 0 }"#).unwrap();
    let err = RingMailbox::from_settings(settings).unwrap_err();
    assert_eq!(err, ConfigError::NonPositive { capacity: 0 });
    assert_eq!(
        err.to_string(),
        "mailbox capacity must not be less than 1 (got 0)"
    );
}
