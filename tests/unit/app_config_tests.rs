/*!
 * Tests for application configuration functionality
 */

use std::time::Duration;

use phrase_drill::app_config::{Config, LogLevel};
use phrase_drill::speech::SpeechBackend;

use crate::common::create_temp_dir;

/// Test default configuration values
#[test]
fn test_default_config_withNoParameters_shouldHaveCorrectDefaults() {
    let config = Config::default();

    assert_eq!(config.playback.rate, 0.85);
    assert_eq!(config.playback.pitch, 1.0);
    assert_eq!(config.playback.repetitions, 3);
    assert_eq!(config.playback.category, "All");
    assert!(!config.playback.shuffle);
    assert_eq!(config.speech.silent_delay_ms, 300);
    assert!(config.user.is_none());
    assert!(config.database_path.is_none());
    assert_eq!(config.log_level, LogLevel::Info);
}

/// Test configuration validation
#[test]
fn test_config_validation_withVariousConfigs_shouldValidateCorrectly() {
    let mut config = Config::default();
    assert!(config.validate().is_ok());

    config.playback.rate = 0.4;
    assert!(config.validate().is_err());
    config.playback.rate = 1.5;
    assert!(config.validate().is_ok());

    config.playback.repetitions = 11;
    assert!(config.validate().is_err());
    config.playback.repetitions = 10;
    assert!(config.validate().is_ok());

    config.playback.category = "  ".to_string();
    assert!(config.validate().is_err());
    config.playback.category = "greetings".to_string();

    config.speech.backend = SpeechBackend::Espeak;
    config.speech.espeak_binary = String::new();
    assert!(config.validate().is_err());
    config.speech.backend = SpeechBackend::Silent;
    assert!(config.validate().is_ok());

    config.user = Some(" ".to_string());
    assert!(config.validate().is_err());
}

#[test]
fn test_config_serialization_shouldUseLowercaseEnums() {
    let mut config = Config::default();
    config.speech.backend = SpeechBackend::Silent;
    config.log_level = LogLevel::Debug;

    let json = serde_json::to_string(&config).unwrap();

    assert!(json.contains("\"backend\":\"silent\""));
    assert!(json.contains("\"log_level\":\"debug\""));
    let back: Config = serde_json::from_str(&json).unwrap();
    assert_eq!(back, config);
}

#[test]
fn test_config_fromEmptyObject_shouldUseDefaults() {
    let config: Config = serde_json::from_str("{}").unwrap();
    assert_eq!(config, Config::default());
}

#[test]
fn test_loadOrCreate_withExistingFile_shouldReadIt() {
    let dir = create_temp_dir().unwrap();
    let path = dir.path().join("drill.json");
    std::fs::write(&path, r#"{ "playback": { "repetitions": 5, "shuffle": true }, "user": "bob" }"#).unwrap();

    let config = Config::load_or_create(&path).unwrap();

    assert_eq!(config.playback.repetitions, 5);
    assert!(config.playback.shuffle);
    assert_eq!(config.user.as_deref(), Some("bob"));
}

#[test]
fn test_loadOrCreate_withInvalidJson_shouldFail() {
    let dir = create_temp_dir().unwrap();
    let path = dir.path().join("drill.json");
    std::fs::write(&path, "{ not json").unwrap();

    assert!(Config::load_or_create(&path).is_err());
}

#[test]
fn test_planParams_shouldMirrorPlayback() {
    let mut config = Config::default();
    config.playback.repetitions = 4;
    config.playback.category = "greetings".to_string();
    config.playback.settle_delay_ms = 0;

    let params = config.plan_params();

    assert_eq!(params.repetitions, 4);
    assert_eq!(params.category, "greetings");
    assert_eq!(config.playback_settings().settle_delay, Duration::ZERO);
}

#[test]
fn test_logLevel_toLevelFilter_shouldMapEachLevel() {
    assert_eq!(LogLevel::Error.to_level_filter(), log::LevelFilter::Error);
    assert_eq!(LogLevel::Trace.to_level_filter(), log::LevelFilter::Trace);
}
