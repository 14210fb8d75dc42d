//! Normalization tests

use cfgdeploy::content::{normalize, ConfigurationProfileKind, FileKind};
use cfgdeploy::errors::DeployError;

const FREEFORM: ConfigurationProfileKind = ConfigurationProfileKind::Freeform;
const FLAGS: ConfigurationProfileKind = ConfigurationProfileKind::FeatureFlags;

#[test]
fn test_json_order_and_whitespace_invariance() {
    let compact = normalize(br#"{"b":2,"a":1}"#, FileKind::Json, FREEFORM).unwrap();
    let spaced = normalize(br#"{"a": 1, "b": 2}"#, FileKind::Json, FREEFORM).unwrap();

    assert_eq!(compact, spaced);
    assert_eq!(compact, "{\n  \"a\": 1,\n  \"b\": 2\n}");
}

#[test]
fn test_normalization_is_idempotent() {
    let cases: [(&[u8], FileKind, ConfigurationProfileKind); 5] = [
        (
            br#"{"z":[1,{"y":null,"x":true}],"a":"s","n":1.5}"#,
            FileKind::Json,
            FREEFORM,
        ),
        (
            br#"{"flags":{"f":{"_createdAt":"t","name":"f"}},"values":{}}"#,
            FileKind::Json,
            FLAGS,
        ),
        (b"b: 2\na:\n  - x\n  - y: 'yes'\n", FileKind::Yaml, FREEFORM),
        (b"line one\r\nline two\r\n\r\n", FileKind::Text, FREEFORM),
        (b"", FileKind::Text, FREEFORM),
    ];

    for (content, kind, profile) in cases {
        let once = normalize(content, kind, profile).unwrap();
        let twice = normalize(once.as_bytes(), kind, profile).unwrap();
        assert_eq!(once, twice, "not idempotent for {:?}", kind);
    }
}

#[test]
fn test_timestamp_stripping_is_recursive_for_feature_flags() {
    let input = br#"{"flags":{"f":{"_updatedAt":"x","name":"f"}},"_createdAt":"y"}"#;

    let flags = normalize(input, FileKind::Json, FLAGS).unwrap();
    assert!(!flags.contains("_updatedAt"));
    assert!(!flags.contains("_createdAt"));
    assert!(flags.contains("\"name\": \"f\""));

    let freeform = normalize(input, FileKind::Json, FREEFORM).unwrap();
    assert!(freeform.contains("_updatedAt"));
    assert!(freeform.contains("_createdAt"));
}

#[test]
fn test_yaml_is_not_stripped() {
    let input = b"flags:\n  f:\n    _updatedAt: x\n    name: f\n";
    let out = normalize(input, FileKind::Yaml, FLAGS).unwrap();
    assert!(out.contains("_updatedAt"));
}

#[test]
fn test_yaml_key_order_invariance() {
    let a = normalize(b"b: 2\na: 1\n", FileKind::Yaml, FREEFORM).unwrap();
    let b = normalize(b"a:   1\r\nb: 2", FileKind::Yaml, FREEFORM).unwrap();

    assert_eq!(a, b);
    assert_eq!(a, "a: 1\nb: 2\n");
}

#[test]
fn test_text_line_endings() {
    let unix = normalize(b"a\nb\n", FileKind::Text, FREEFORM).unwrap();
    let windows = normalize(b"a\r\nb\r\n\r\n", FileKind::Text, FREEFORM).unwrap();
    let no_newline = normalize(b"a\nb", FileKind::Text, FREEFORM).unwrap();

    assert_eq!(unix, "a\nb\n");
    assert_eq!(windows, unix);
    assert_eq!(no_newline, unix);
}

#[test]
fn test_invalid_syntax() {
    assert!(matches!(
        normalize(b"{\"a\": }", FileKind::Json, FREEFORM),
        Err(DeployError::InvalidSyntax(_))
    ));
    assert!(matches!(
        normalize(b"a: [1, 2\n", FileKind::Yaml, FREEFORM),
        Err(DeployError::InvalidSyntax(_))
    ));
}
