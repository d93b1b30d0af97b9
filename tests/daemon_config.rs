use std::io::Write;
use std::sync::Mutex;
use std::time::Duration;

use tempfile::{Builder, NamedTempFile};

use cube_vision::config::{DaemonConfig, MAX_FRAME_DIMENSION};

static ENV_LOCK: Mutex<()> = Mutex::new(());

fn clear_env() {
    for key in [
        "CUBE_VISION_STREAM_URL",
        "CUBE_VISION_API_ADDR",
        "CUBE_VISION_FRAME_WIDTH",
        "CUBE_VISION_FRAME_HEIGHT",
        "CUBE_VISION_THROTTLE_MS",
        "CUBE_VISION_RETRY_MS",
    ] {
        std::env::remove_var(key);
    }
}

#[test]
fn defaults_match_the_fixed_constants() {
    let _guard = ENV_LOCK.lock().unwrap();
    clear_env();

    let cfg = DaemonConfig::load(None).expect("load defaults");

    assert_eq!(cfg.stream.url, "http://192.168.1.22:8080/video");
    assert_eq!(cfg.api_addr, "0.0.0.0:8500");
    assert_eq!((cfg.stream.width, cfg.stream.height), (640, 480));
    assert_eq!(cfg.stream.throttle, Duration::from_millis(100));
    assert_eq!(cfg.stream.retry_delay, Duration::from_millis(100));

    let capture = cfg.stream.capture_config();
    assert_eq!(capture.frame_width, 640);
    assert_eq!(capture.throttle, Duration::from_millis(100));
}

#[test]
fn loads_json_file_and_env_overrides() {
    let _guard = ENV_LOCK.lock().unwrap();
    clear_env();

    let mut file = NamedTempFile::new().expect("temp config");
    let json = r#"{
        "stream": {
            "url": "http://10.0.0.5:8080/video",
            "width": 800,
            "height": 600,
            "throttle_ms": 250
        },
        "api": {
            "addr": "127.0.0.1:9000"
        }
    }"#;
    file.write_all(json.as_bytes()).expect("write config");

    std::env::set_var("CUBE_VISION_STREAM_URL", "stub://bench");
    std::env::set_var("CUBE_VISION_RETRY_MS", "40");

    let cfg = DaemonConfig::load(Some(file.path())).expect("load config");

    assert_eq!(cfg.stream.url, "stub://bench");
    assert_eq!(cfg.api_addr, "127.0.0.1:9000");
    assert_eq!((cfg.stream.width, cfg.stream.height), (800, 600));
    assert_eq!(cfg.stream.throttle, Duration::from_millis(250));
    assert_eq!(cfg.stream.retry_delay, Duration::from_millis(40));

    clear_env();
}

#[test]
fn loads_toml_file() {
    let _guard = ENV_LOCK.lock().unwrap();
    clear_env();

    let mut file = Builder::new()
        .suffix(".toml")
        .tempfile()
        .expect("temp config");
    let toml = r#"
        [stream]
        url = "http://camera.local/video"
        retry_ms = 500

        [api]
        addr = "0.0.0.0:8600"
    "#;
    file.write_all(toml.as_bytes()).expect("write config");

    let cfg = DaemonConfig::load(Some(file.path())).expect("load config");

    assert_eq!(cfg.stream.url, "http://camera.local/video");
    assert_eq!(cfg.stream.retry_delay, Duration::from_millis(500));
    assert_eq!(cfg.stream.throttle, Duration::from_millis(100));
    assert_eq!(cfg.api_addr, "0.0.0.0:8600");
}

#[test]
fn rejects_invalid_values() {
    let _guard = ENV_LOCK.lock().unwrap();
    clear_env();

    std::env::set_var("CUBE_VISION_THROTTLE_MS", "fast");
    let err = DaemonConfig::load(None).unwrap_err();
    assert!(err.to_string().contains("CUBE_VISION_THROTTLE_MS"));
    clear_env();

    std::env::set_var("CUBE_VISION_FRAME_WIDTH", "0");
    assert!(DaemonConfig::load(None).is_err());
    clear_env();

    std::env::set_var("CUBE_VISION_API_ADDR", "not-an-addr");
    assert!(DaemonConfig::load(None).is_err());
    clear_env();
}

#[test]
fn rejects_unknown_config_keys() {
    let _guard = ENV_LOCK.lock().unwrap();
    clear_env();

    let mut file = NamedTempFile::new().expect("temp config");
    file.write_all(br#"{"stream": {"fps": 30}}"#)
        .expect("write config");

    let err = DaemonConfig::load(Some(file.path())).unwrap_err();
    assert!(err.to_string().contains("invalid config file"));
}

#[test]
fn rejects_oversized_frames() {
    let _guard = ENV_LOCK.lock().unwrap();
    clear_env();

    std::env::set_var("CUBE_VISION_FRAME_WIDTH", u32::MAX.to_string());
    let err = DaemonConfig::load(None).unwrap_err();
    assert!(err.to_string().contains("exceeds"));
    clear_env();

    std::env::set_var("CUBE_VISION_FRAME_HEIGHT", (MAX_FRAME_DIMENSION + 1).to_string());
    assert!(DaemonConfig::load(None).is_err());
    clear_env();

    let mut file = NamedTempFile::new().expect("temp config");
    file.write_all(br#"{"stream": {"width": 100000}}"#)
        .expect("write config");
    assert!(DaemonConfig::load(Some(file.path())).is_err());

    std::env::set_var("CUBE_VISION_FRAME_WIDTH", MAX_FRAME_DIMENSION.to_string());
    let cfg = DaemonConfig::load(None).expect("largest frame accepted");
    assert_eq!(cfg.stream.width, MAX_FRAME_DIMENSION);
    clear_env();
}
