use std::sync::Mutex;

use tempfile::NamedTempFile;

use accident_kernel::config::AppConfig;
use accident_kernel::{error_kind, ErrorKind};

static ENV_LOCK: Mutex<()> = Mutex::new(());

fn clear_env() {
    for key in [
        "ACCIDENT_CONFIG",
        "ACCIDENT_DB_PATH",
        "ACCIDENT_LOCATION",
        "ACCIDENT_BACKEND",
        "ACCIDENT_MODEL_PATH",
        "ACCIDENT_CADENCE",
        "ACCIDENT_INPUT_WIDTH",
        "ACCIDENT_INPUT_HEIGHT",
    ] {
        std::env::remove_var(key);
    }
}

#[test]
fn loads_defaults_without_config() {
    let _guard = ENV_LOCK.lock().unwrap();
    clear_env();

    let cfg = AppConfig::load().expect("load config");
    assert_eq!(cfg.db_path, "accident_history.db");
    assert_eq!(cfg.cadence, 5);
    assert_eq!(cfg.geometry.width, 224);
    assert_eq!(cfg.geometry.height, 224);
    assert_eq!(cfg.classifier.backend, "stub");
    assert_eq!(cfg.location, "Unknown Location");
}

#[test]
fn loads_config_from_file_and_env_overrides() {
    let _guard = ENV_LOCK.lock().unwrap();
    clear_env();

    let mut file = NamedTempFile::new().expect("temp config");
    let json = r#"{
        "db_path": "history_prod.db",
        "location": "Highway 9",
        "sampling": { "cadence": 10 },
        "classifier": {
            "backend": "stub",
            "input_width": 192,
            "input_height": 192
        }
    }"#;
    std::io::Write::write_all(&mut file, json.as_bytes()).expect("write config");

    std::env::set_var("ACCIDENT_CONFIG", file.path());
    std::env::set_var("ACCIDENT_CADENCE", "3");
    std::env::set_var("ACCIDENT_LOCATION", "Exit 4");

    let cfg = AppConfig::load().expect("load config");

    assert_eq!(cfg.db_path, "history_prod.db");
    assert_eq!(cfg.location, "Exit 4");
    assert_eq!(cfg.cadence, 3);
    assert_eq!(cfg.geometry.width, 192);
    assert_eq!(cfg.geometry.height, 192);
    assert_eq!(cfg.pipeline_settings().unwrap().sampler.cadence(), 3);

    clear_env();
}

#[test]
fn toml_config_is_detected_by_extension() {
    let _guard = ENV_LOCK.lock().unwrap();
    clear_env();

    let file = tempfile::Builder::new()
        .suffix(".toml")
        .tempfile()
        .expect("temp config");
    std::fs::write(file.path(), "db_path = \"from_toml.db\"\n[sampling]\ncadence = 2\n")
        .expect("write config");
    std::env::set_var("ACCIDENT_CONFIG", file.path());

    let cfg = AppConfig::load().expect("load config");
    assert_eq!(cfg.db_path, "from_toml.db");
    assert_eq!(cfg.cadence, 2);

    clear_env();
}

#[test]
fn rejects_zero_cadence_and_bad_numbers() {
    let _guard = ENV_LOCK.lock().unwrap();
    clear_env();

    std::env::set_var("ACCIDENT_CADENCE", "0");
    let err = AppConfig::load().unwrap_err();
    assert_eq!(error_kind(&err), Some(ErrorKind::Config));

    std::env::set_var("ACCIDENT_CADENCE", "five");
    let err = AppConfig::load().unwrap_err();
    assert_eq!(error_kind(&err), Some(ErrorKind::Config));

    clear_env();
}

#[test]
fn rejects_unknown_backend_and_modelless_tract() {
    let _guard = ENV_LOCK.lock().unwrap();
    clear_env();

    std::env::set_var("ACCIDENT_BACKEND", "keras");
    assert!(AppConfig::load().is_err());

    std::env::set_var("ACCIDENT_BACKEND", "tract");
    assert!(AppConfig::load().is_err());

    std::env::set_var("ACCIDENT_MODEL_PATH", "models/accident.onnx");
    let cfg = AppConfig::load().expect("load config");
    assert_eq!(cfg.classifier.backend, "tract");

    clear_env();
}
