use std::time::Duration;

use certmail::config::DispatcherConfig;
use certmail::EnvConfig;

#[test]
fn dispatcher_config_defaults() {
    let config = DispatcherConfig::default();

    assert_eq!(config.pacing_ms, 1000);
    assert_eq!(config.send_timeout_secs, 20);
    assert_eq!(config.store_retries, 3);

    assert_eq!(config.pacing(), Duration::from_millis(1000));
    assert_eq!(config.send_timeout(), Duration::from_secs(20));
}

#[test]
fn dispatcher_config_loads_from_environment() {
    std::env::set_var("CERTMAIL_PACING_MS", "250");
    std::env::set_var("CERTMAIL_SEND_TIMEOUT_SECS", "5");

    let config = DispatcherConfig::from_env_with_prefix("CERTMAIL").unwrap();

    assert_eq!(config.pacing_ms, 250);
    assert_eq!(config.send_timeout_secs, 5);
    // Unset knobs fall back to their defaults.
    assert_eq!(config.store_retries, 3);

    std::env::remove_var("CERTMAIL_PACING_MS");
    std::env::remove_var("CERTMAIL_SEND_TIMEOUT_SECS");
}
