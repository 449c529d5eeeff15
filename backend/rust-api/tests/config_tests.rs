use serial_test::serial;

use chess_patterns_api::config::Config;

fn clear_config_env() {
    for key in [
        "APP_ENV",
        "MONGO_URI",
        "MONGO_DATABASE",
        "REDIS_URI",
        "JWT_SECRET",
        "APP_DATABASE__MONGO_URI",
        "APP_DATABASE__MONGO_DATABASE",
        "APP_REDIS__URI",
        "APP_AUTH__JWT_SECRET",
    ] {
        std::env::remove_var(key);
    }
}

#[test]
#[serial]
fn loads_from_plain_env_vars() {
    clear_config_env();
    std::env::set_var("SKIP_ROOT_ENV", "1");
    std::env::set_var("MONGO_URI", "mongodb://localhost:27017/test");
    std::env::set_var("REDIS_URI", "redis://127.0.0.1:6379/1");
    std::env::set_var("JWT_SECRET", "test-secret");

    let config = Config::load().expect("config should load");

    assert_eq!(config.mongo_uri, "mongodb://localhost:27017/test");
    assert_eq!(config.redis_uri, "redis://127.0.0.1:6379/1");
    assert_eq!(config.jwt_secret, "test-secret");
    // Database name falls back to the default when unset.
    assert_eq!(config.mongo_database, "chess_patterns");

    clear_config_env();
}

#[test]
#[serial]
fn app_prefixed_env_overrides_win() {
    clear_config_env();
    std::env::set_var("SKIP_ROOT_ENV", "1");
    std::env::set_var("MONGO_URI", "mongodb://plain:27017/ignored");
    std::env::set_var("APP_DATABASE__MONGO_URI", "mongodb://prefixed:27017/app");
    std::env::set_var("REDIS_URI", "redis://127.0.0.1:6379/0");
    std::env::set_var("JWT_SECRET", "test-secret");

    let config = Config::load().expect("config should load");

    assert_eq!(config.mongo_uri, "mongodb://prefixed:27017/app");

    clear_config_env();
}

#[test]
#[serial]
fn dev_environment_gets_a_default_jwt_secret() {
    clear_config_env();
    std::env::set_var("SKIP_ROOT_ENV", "1");
    std::env::set_var("MONGO_URI", "mongodb://localhost:27017/test");
    std::env::set_var("REDIS_URI", "redis://127.0.0.1:6379/0");

    let config = Config::load().expect("config should load");

    assert!(!config.jwt_secret.is_empty());

    clear_config_env();
}
