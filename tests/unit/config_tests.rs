// Configuration loading tests

use std::io::Write;
use tilemark::config::Config;
use tilemark::WatermarkError;

#[test]
fn test_can_deserialize_full_yaml_config() {
    let yaml = r##"
watermark:
  text: "Confidential"
  font_size: 32
  angle: 30
  color: "#FF000080"
  column_spacing: 2
  row_spacing: 3
font:
  search_dirs: ["./assets", "/usr/local/share/fonts"]
  file_name: "MiSans-Medium.ttf"
  system_fallback: false
pipeline:
  workers: 6
encoder:
  ffmpeg_path: /opt/ffmpeg/bin/ffmpeg
  video_codec: libx265
  audio_codec: aac
  output_args: ["-crf", "22"]
logging:
  level: debug
  json: true
"##;
    let config = Config::from_yaml(yaml).expect("Failed to parse YAML");

    assert_eq!(config.watermark.text, "Confidential");
    assert_eq!(config.watermark.font_size, 32);
    assert_eq!(config.watermark.angle, 30.0);
    assert_eq!(config.watermark.column_spacing, 2);
    assert_eq!(config.watermark.row_spacing, 3);
    // Unspecified fields keep their defaults
    assert_eq!(config.watermark.origin, 10);
    assert_eq!(config.watermark.margin, 10);

    assert_eq!(config.font.search_dirs.len(), 2);
    assert!(!config.font.system_fallback);
    assert_eq!(config.pipeline.workers, 6);
    assert_eq!(
        config.encoder.ffmpeg_path.as_deref(),
        Some("/opt/ffmpeg/bin/ffmpeg")
    );
    assert_eq!(config.encoder.video_codec, "libx265");
    assert_eq!(config.encoder.audio_codec, "aac");
    assert_eq!(config.encoder.pixel_format, "yuv420p");
    assert_eq!(config.encoder.output_args, vec!["-crf", "22"]);
    assert_eq!(config.logging.level, "debug");
    assert!(config.logging.json);

    assert!(config.validate().is_ok());
}

#[test]
fn test_env_var_substitution() {
    std::env::set_var("TILEMARK_TEST_WATERMARK_TEXT", "Draft copy");
    let yaml = r#"
watermark:
  text: "${TILEMARK_TEST_WATERMARK_TEXT}"
"#;
    let config = Config::from_yaml(yaml).unwrap();
    assert_eq!(config.watermark.text, "Draft copy");
}

#[test]
fn test_from_file() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(file, "watermark:\n  text: from file\n  angle: -15").unwrap();

    let config = Config::from_file(file.path()).unwrap();
    assert_eq!(config.watermark.text, "from file");
    assert_eq!(config.watermark.angle, -15.0);
}

#[test]
fn test_missing_file_is_configuration_error() {
    let result = Config::from_file("/definitely/not/here/tilemark.yaml");
    assert!(matches!(result, Err(WatermarkError::Configuration(_))));
}

#[test]
fn test_malformed_yaml_is_configuration_error() {
    let result = Config::from_yaml("watermark: [this is not a mapping");
    assert!(matches!(result, Err(WatermarkError::Configuration(_))));
}

#[test]
fn test_wrong_type_is_rejected() {
    let result = Config::from_yaml("watermark:\n  font_size: large\n");
    assert!(matches!(result, Err(WatermarkError::Configuration(_))));
}

#[test]
fn test_validate_rejects_bad_values() {
    let config = Config::from_yaml("watermark:\n  color: \"not-a-color\"\n").unwrap();
    assert!(matches!(
        config.validate(),
        Err(WatermarkError::Configuration(_))
    ));

    let config = Config::from_yaml("watermark:\n  row_spacing: 0\n").unwrap();
    assert!(config.validate().is_err());

    let config = Config::from_yaml("watermark:\n  text: \"\"\n").unwrap();
    assert!(config.validate().is_err());

    let config = Config::from_yaml("encoder:\n  video_codec: \"\"\n").unwrap();
    assert!(config.validate().is_err());
}
