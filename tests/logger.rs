use yougile_sync::config::LoggingConfig;
use yougile_sync::logger;

#[test]
fn test_file_logging_disabled() {
    let config = LoggingConfig::default();
    assert!(logger::resolve_log_path(&config).unwrap().is_none());
    assert!(logger::dispatch(&config).is_ok());
}

#[test]
fn test_explicit_log_path_is_created() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("logs").join("sync.log");
    let config = LoggingConfig {
        file: true,
        level: "debug".to_string(),
        path: Some(path.clone()),
        ..LoggingConfig::default()
    };

    assert_eq!(logger::resolve_log_path(&config).unwrap(), Some(path.clone()));
    assert!(logger::dispatch(&config).is_ok());
    assert!(path.exists());
}

#[test]
fn test_default_log_path() {
    if let Ok(path) = logger::get_log_file_path() {
        assert!(path.ends_with("yougile-sync/yougile-sync.log"));
    }
}

#[test]
fn test_invalid_level_is_rejected() {
    let config = LoggingConfig {
        level: "chatty".to_string(),
        ..LoggingConfig::default()
    };
    assert!(logger::dispatch(&config).is_err());
}

#[test]
fn test_invalid_console_level_is_rejected() {
    let config = LoggingConfig {
        console_level: "everything".to_string(),
        ..LoggingConfig::default()
    };
    assert!(logger::dispatch(&config).is_err());
}
