use std::env;

use guardops::config::Config;
use pretty_assertions::assert_eq;
use serial_test::serial;

mod common;

const KEYS: [&str; 7] = [
    "DATABASE_URL",
    "DATABASE_MAX_CONNECTIONS",
    "JWT_SECRET",
    "HOST",
    "PORT",
    "ENVIRONMENT",
    "NOTIFICATION_SWEEP_INTERVAL_SECS",
];

fn with_clean_env<F: FnOnce()>(vars: &[(&str, &str)], f: F) {
    let saved: Vec<(&str, Option<String>)> =
        KEYS.iter().map(|key| (*key, env::var(key).ok())).collect();

    unsafe {
        for key in KEYS {
            env::remove_var(key);
        }
        for (key, value) in vars {
            env::set_var(key, value);
        }
    }

    f();

    unsafe {
        for (key, value) in saved {
            match value {
                Some(value) => env::set_var(key, value),
                None => env::remove_var(key),
            }
        }
    }
}

#[test]
#[serial]
fn test_config_defaults() {
    common::setup_test_env();

    with_clean_env(&[], || {
        let config = Config::from_env_only().unwrap();

        assert_eq!(config.database_url, "postgres://@localhost:5432/guardops");
        assert_eq!(config.database_max_connections, 10);
        assert_eq!(config.host, "127.0.0.1");
        assert_eq!(config.port, 8080);
        assert_eq!(config.environment, "development");
        assert_eq!(config.notification_sweep_interval_secs, 300);
    });
}

#[test]
#[serial]
fn test_config_custom_values() {
    common::setup_test_env();

    with_clean_env(
        &[
            ("DATABASE_URL", "postgres://guard:pw@db:5432/ops"),
            ("JWT_SECRET", "custom-secret"),
            ("HOST", "0.0.0.0"),
            ("PORT", "9000"),
            ("ENVIRONMENT", "production"),
            ("NOTIFICATION_SWEEP_INTERVAL_SECS", "0"),
        ],
        || {
            let config = Config::from_env_only().unwrap();

            assert_eq!(config.database_url, "postgres://guard:pw@db:5432/ops");
            assert_eq!(config.jwt_secret, "custom-secret");
            assert_eq!(config.server_address(), "0.0.0.0:9000");
            assert_eq!(config.notification_sweep_interval_secs, 0);
            assert_eq!(config.environment, "production");
        },
    );
}

#[test]
#[serial]
fn test_unparsable_numbers_fall_back_to_defaults() {
    common::setup_test_env();

    with_clean_env(
        &[
            ("PORT", "not-a-port"),
            ("NOTIFICATION_SWEEP_INTERVAL_SECS", "-5"),
        ],
        || {
            let config = Config::from_env_only().unwrap();

            assert_eq!(config.port, 8080);
            assert_eq!(config.notification_sweep_interval_secs, 300);
        },
    );
}
