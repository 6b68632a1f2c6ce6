use std::num::NonZeroUsize;
use std::path::PathBuf;

use serde_json::Value;

use crate::assets::{read_to_string, AssetsRoot};
use crate::displace::{DEFAULT_BIAS_STEP, DEFAULT_DISPLACE_SCALE};
use crate::error::EngineError;
use crate::mapper::{DEFAULT_BIPOLAR_CC, DEFAULT_UNIPOLAR_CC};
use crate::queue::DEFAULT_CAPACITY;

/// How strictly to interpret the config file.
///
/// - `Lenient` is forward-compatible: unknown fields only produce warnings and missing
///   keys fall back to defaults.
/// - `Strict` is fail-fast: unknown fields and an unexpected `version` become errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigMode {
    Lenient,
    Strict,
}

/// Typed view of `assets/config.json`. Every key is optional.
#[derive(Debug, Clone, PartialEq, serde::Deserialize)]
pub struct AppConfig {
    #[serde(default = "default_version")]
    pub version: u32,
    #[serde(default)]
    pub midi: MidiConfig,
    #[serde(default)]
    pub render: RenderConfig,
    #[serde(default)]
    pub keys: KeysConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            version: default_version(),
            midi: MidiConfig::default(),
            render: RenderConfig::default(),
            keys: KeysConfig::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, serde::Deserialize)]
pub struct MidiConfig {
    /// Port opened when no name/virtual port is configured.
    #[serde(default = "default_port_index")]
    pub port_index: usize,
    /// Case-insensitive substring match against port names; wins over `port_index`.
    #[serde(default)]
    pub port_name_contains: Option<String>,
    /// Open a virtual input port with this name instead (not available on Windows).
    #[serde(default)]
    pub virtual_port: Option<String>,
    #[serde(default)]
    pub ignore_sysex: bool,
    #[serde(default)]
    pub ignore_timing: bool,
    #[serde(default)]
    pub ignore_active_sense: bool,
    /// Log every received message.
    #[serde(default = "default_true")]
    pub verbose: bool,
    #[serde(default = "default_queue_capacity")]
    pub queue_capacity: usize,
    #[serde(default = "default_unipolar_cc")]
    pub unipolar_cc: u8,
    #[serde(default = "default_bipolar_cc")]
    pub bipolar_cc: u8,
}

impl MidiConfig {
    /// Queue capacity as a non-zero count. Zero (rejected by validation) maps to the default.
    pub fn capacity(&self) -> NonZeroUsize {
        NonZeroUsize::new(self.queue_capacity)
            .or(NonZeroUsize::new(DEFAULT_CAPACITY))
            .unwrap_or(NonZeroUsize::MIN)
    }
}

impl Default for MidiConfig {
    fn default() -> Self {
        Self {
            port_index: default_port_index(),
            port_name_contains: None,
            virtual_port: None,
            ignore_sysex: false,
            ignore_timing: false,
            ignore_active_sense: false,
            verbose: true,
            queue_capacity: default_queue_capacity(),
            unipolar_cc: default_unipolar_cc(),
            bipolar_cc: default_bipolar_cc(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, serde::Deserialize)]
pub struct RenderConfig {
    /// Source/feedback resolution.
    #[serde(default = "default_width")]
    pub width: u32,
    #[serde(default = "default_height")]
    pub height: u32,
    /// Preview window size; the feedback buffers are scaled into it.
    #[serde(default = "default_window_width")]
    pub window_width: u32,
    #[serde(default = "default_window_height")]
    pub window_height: u32,
    #[serde(default = "default_fps")]
    pub fps: f32,
    #[serde(default = "default_true")]
    pub vsync: bool,
    #[serde(default = "default_true")]
    pub hide_cursor: bool,
    #[serde(default)]
    pub show_fps: bool,
    #[serde(default = "default_frag")]
    pub frag: String,
    #[serde(default = "default_present_frag")]
    pub present_frag: String,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            width: default_width(),
            height: default_height(),
            window_width: default_window_width(),
            window_height: default_window_height(),
            fps: default_fps(),
            vsync: true,
            hide_cursor: true,
            show_fps: false,
            frag: default_frag(),
            present_frag: default_present_frag(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, serde::Deserialize)]
pub struct KeysConfig {
    #[serde(default = "default_bias_step")]
    pub bias_step: f32,
    #[serde(default = "default_displace_scale")]
    pub displace_scale: f32,
}

impl Default for KeysConfig {
    fn default() -> Self {
        Self {
            bias_step: default_bias_step(),
            displace_scale: default_displace_scale(),
        }
    }
}

fn default_version() -> u32 { 1 }
fn default_true() -> bool { true }
fn default_port_index() -> usize { 1 }
fn default_queue_capacity() -> usize { DEFAULT_CAPACITY }
fn default_unipolar_cc() -> u8 { DEFAULT_UNIPOLAR_CC }
fn default_bipolar_cc() -> u8 { DEFAULT_BIPOLAR_CC }
fn default_width() -> u32 { 640 }
fn default_height() -> u32 { 480 }
fn default_window_width() -> u32 { 720 }
fn default_window_height() -> u32 { 480 }
fn default_fps() -> f32 { 30.0 }
fn default_frag() -> String { "shaders/feedback.frag".into() }
fn default_present_frag() -> String { "shaders/present.frag".into() }
fn default_bias_step() -> f32 { DEFAULT_BIAS_STEP }
fn default_displace_scale() -> f32 { DEFAULT_DISPLACE_SCALE }

const TOP_KEYS: &[&str] = &["version", "midi", "render", "keys"];
const MIDI_KEYS: &[&str] = &[
    "port_index",
    "port_name_contains",
    "virtual_port",
    "ignore_sysex",
    "ignore_timing",
    "ignore_active_sense",
    "verbose",
    "queue_capacity",
    "unipolar_cc",
    "bipolar_cc",
];
const RENDER_KEYS: &[&str] = &[
    "width",
    "height",
    "window_width",
    "window_height",
    "fps",
    "vsync",
    "hide_cursor",
    "show_fps",
    "frag",
    "present_frag",
];
const KEYS_KEYS: &[&str] = &["bias_step", "displace_scale"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IssueLevel {
    Warn,
    Error,
}

/// One finding from config validation, addressed by a JSON-pointer-ish path.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidationIssue {
    pub level: IssueLevel,
    pub path: String,
    pub message: String,
    pub hint: Option<String>,
}

impl ValidationIssue {
    pub fn warn(path: impl Into<String>, message: impl Into<String>, hint: Option<String>) -> Self {
        Self { level: IssueLevel::Warn, path: path.into(), message: message.into(), hint }
    }
    pub fn error(path: impl Into<String>, message: impl Into<String>, hint: Option<String>) -> Self {
        Self { level: IssueLevel::Error, path: path.into(), message: message.into(), hint }
    }
}

/// A config resolved from disk (or defaults when the file is absent).
#[derive(Debug, Clone)]
pub struct LoadedConfig {
    pub path: PathBuf,
    /// `false` when the file did not exist and defaults were used.
    pub from_file: bool,
    pub config: AppConfig,
    /// Warnings that did not prevent loading.
    pub issues: Vec<ValidationIssue>,
}

/// Load `config(.<os>).json` from the assets directory.
///
/// A missing file is not an error. Any `Error`-level validation issue fails the load.
pub fn load_config(assets: &AssetsRoot, mode: ConfigMode) -> Result<LoadedConfig, EngineError> {
    let path = assets.pick_platform_json("config");

    if !path.exists() {
        let config = AppConfig::default();
        let issues = validate_config(&config);
        return Ok(LoadedConfig { path, from_file: false, config, issues });
    }

    let src = read_to_string(&path)?;
    let (config, issues) = parse_config_str(&src, mode).map_err(|e| match e {
        ParseFailure::Json(source) => EngineError::Json { path: path.clone(), source },
        ParseFailure::Invalid(msg) => EngineError::InvalidConfig { path: path.clone(), msg },
    })?;

    Ok(LoadedConfig { path, from_file: true, config, issues })
}

#[derive(Debug)]
pub enum ParseFailure {
    Json(serde_json::Error),
    Invalid(String),
}

/// Parse and validate config JSON text. Returns the config plus non-fatal issues.
pub fn parse_config_str(src: &str, mode: ConfigMode) -> Result<(AppConfig, Vec<ValidationIssue>), ParseFailure> {
    let value: Value = serde_json::from_str(src).map_err(ParseFailure::Json)?;
    if !value.is_object() {
        return Err(ParseFailure::Invalid("config.json must be a JSON object".into()));
    }

    let mut issues = unknown_key_issues(&value, mode);

    let config: AppConfig = serde_json::from_value(value).map_err(ParseFailure::Json)?;

    if mode == ConfigMode::Strict && config.version != 1 {
        issues.push(ValidationIssue::error(
            "config.json:/version",
            format!("unsupported version {} (expected 1)", config.version),
            None,
        ));
    }

    issues.extend(validate_config(&config));

    let errors: Vec<String> = issues
        .iter()
        .filter(|i| i.level == IssueLevel::Error)
        .map(|i| format!("{}: {}", i.path, i.message))
        .collect();
    if !errors.is_empty() {
        return Err(ParseFailure::Invalid(errors.join("; ")));
    }

    Ok((config, issues))
}

fn unknown_key_issues(value: &Value, mode: ConfigMode) -> Vec<ValidationIssue> {
    let mut issues = Vec::new();
    let mut check = |base: &str, obj: Option<&serde_json::Map<String, Value>>, known: &[&str]| {
        let Some(obj) = obj else { return };
        for k in obj.keys() {
            if known.contains(&k.as_str()) {
                continue;
            }
            let path = format!("config.json:{base}/{k}");
            let msg = format!("unknown field '{k}'");
            let hint = Some(format!("known fields: {}", known.join(", ")));
            issues.push(match mode {
                ConfigMode::Lenient => ValidationIssue::warn(path, msg, hint),
                ConfigMode::Strict => ValidationIssue::error(path, msg, hint),
            });
        }
    };

    check("", value.as_object(), TOP_KEYS);
    check("/midi", value.get("midi").and_then(|v| v.as_object()), MIDI_KEYS);
    check("/render", value.get("render").and_then(|v| v.as_object()), RENDER_KEYS);
    check("/keys", value.get("keys").and_then(|v| v.as_object()), KEYS_KEYS);
    issues
}

/// Semantic checks on an already-typed config.
pub fn validate_config(cfg: &AppConfig) -> Vec<ValidationIssue> {
    let mut issues = Vec::new();

    if cfg.midi.queue_capacity == 0 {
        issues.push(ValidationIssue::error(
            "config.json:/midi/queue_capacity",
            "queue capacity must be greater than zero",
            Some(format!("the default is {DEFAULT_CAPACITY}")),
        ));
    }
    for (name, cc) in [("unipolar_cc", cfg.midi.unipolar_cc), ("bipolar_cc", cfg.midi.bipolar_cc)] {
        if cc > 127 {
            issues.push(ValidationIssue::error(
                format!("config.json:/midi/{name}"),
                format!("controller number {cc} is outside 0..127"),
                None,
            ));
        }
    }
    if cfg.midi.unipolar_cc == cfg.midi.bipolar_cc {
        issues.push(ValidationIssue::warn(
            "config.json:/midi/bipolar_cc",
            format!("unipolar_cc and bipolar_cc are both {}", cfg.midi.unipolar_cc),
            Some("the bipolar parameter will never move; pick distinct controllers".into()),
        ));
    }

    if cfg.render.fps.is_nan() || cfg.render.fps <= 0.0 {
        issues.push(ValidationIssue::error(
            "config.json:/render/fps",
            format!("fps must be positive (got {})", cfg.render.fps),
            None,
        ));
    }
    for (name, v) in [
        ("width", cfg.render.width),
        ("height", cfg.render.height),
        ("window_width", cfg.render.window_width),
        ("window_height", cfg.render.window_height),
    ] {
        if v == 0 {
            issues.push(ValidationIssue::error(
                format!("config.json:/render/{name}"),
                "size must be non-zero",
                None,
            ));
        }
    }

    issues
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_object_gives_defaults() {
        let (cfg, issues) = parse_config_str("{}", ConfigMode::Strict).unwrap();
        assert_eq!(cfg, AppConfig::default());
        assert!(issues.is_empty());
        assert_eq!(cfg.midi.port_index, 1);
        assert_eq!(cfg.midi.queue_capacity, 64);
        assert_eq!(cfg.midi.unipolar_cc, 16);
        assert_eq!(cfg.midi.bipolar_cc, 17);
        assert_eq!(cfg.render.fps, 30.0);
        assert_eq!((cfg.render.width, cfg.render.height), (640, 480));
        assert_eq!((cfg.render.window_width, cfg.render.window_height), (720, 480));
    }

    #[test]
    fn partial_sections_keep_other_defaults() {
        let src = r#"{ "midi": { "queue_capacity": 8, "verbose": false }, "keys": { "bias_step": 0.001 } }"#;
        let (cfg, _) = parse_config_str(src, ConfigMode::Lenient).unwrap();
        assert_eq!(cfg.midi.queue_capacity, 8);
        assert!(!cfg.midi.verbose);
        assert_eq!(cfg.midi.unipolar_cc, 16);
        assert_eq!(cfg.keys.bias_step, 0.001);
        assert_eq!(cfg.keys.displace_scale, 0.01);
    }

    #[test]
    fn unknown_fields_warn_when_lenient() {
        let src = r#"{ "midi": { "colour": "blue" } }"#;
        let (_, issues) = parse_config_str(src, ConfigMode::Lenient).unwrap();
        assert_eq!(issues.len(), 1);
        assert_eq!(issues[0].level, IssueLevel::Warn);
        assert_eq!(issues[0].path, "config.json:/midi/colour");
    }

    #[test]
    fn unknown_fields_fail_when_strict() {
        let src = r#"{ "extra": 1 }"#;
        assert!(matches!(parse_config_str(src, ConfigMode::Strict), Err(ParseFailure::Invalid(_))));
    }

    #[test]
    fn strict_checks_version() {
        let src = r#"{ "version": 2 }"#;
        assert!(parse_config_str(src, ConfigMode::Lenient).is_ok());
        assert!(matches!(parse_config_str(src, ConfigMode::Strict), Err(ParseFailure::Invalid(_))));
    }

    #[test]
    fn zero_capacity_is_rejected() {
        let src = r#"{ "midi": { "queue_capacity": 0 } }"#;
        match parse_config_str(src, ConfigMode::Lenient) {
            Err(ParseFailure::Invalid(msg)) => assert!(msg.contains("queue_capacity")),
            other => panic!("expected invalid config, got {other:?}"),
        }
    }

    #[test]
    fn out_of_range_cc_is_rejected() {
        let src = r#"{ "midi": { "unipolar_cc": 200 } }"#;
        assert!(matches!(parse_config_str(src, ConfigMode::Lenient), Err(ParseFailure::Invalid(_))));
    }

    #[test]
    fn shared_cc_only_warns() {
        let mut cfg = AppConfig::default();
        cfg.midi.bipolar_cc = 16;
        let issues = validate_config(&cfg);
        assert_eq!(issues.len(), 1);
        assert_eq!(issues[0].level, IssueLevel::Warn);
    }

    #[test]
    fn non_positive_fps_is_rejected() {
        let src = r#"{ "render": { "fps": 0 } }"#;
        assert!(matches!(parse_config_str(src, ConfigMode::Lenient), Err(ParseFailure::Invalid(_))));
    }

    #[test]
    fn malformed_json_is_a_json_error() {
        assert!(matches!(parse_config_str("{ nope", ConfigMode::Lenient), Err(ParseFailure::Json(_))));
        assert!(matches!(parse_config_str("[1, 2]", ConfigMode::Lenient), Err(ParseFailure::Invalid(_))));
    }

    #[test]
    fn missing_file_uses_defaults() {
        let dir = std::env::temp_dir().join(format!("feedbackcam-config-missing-{}", std::process::id()));
        let _ = std::fs::remove_dir_all(&dir);
        std::fs::create_dir_all(&dir).unwrap();

        let loaded = load_config(&AssetsRoot::at(&dir), ConfigMode::Strict).unwrap();
        assert!(!loaded.from_file);
        assert_eq!(loaded.config, AppConfig::default());
    }

    #[test]
    fn file_errors_carry_the_path() {
        let dir = std::env::temp_dir().join(format!("feedbackcam-config-bad-{}", std::process::id()));
        let _ = std::fs::remove_dir_all(&dir);
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("config.json");
        std::fs::write(&path, r#"{ "midi": { "queue_capacity": 0 } }"#).unwrap();

        match load_config(&AssetsRoot::at(&dir), ConfigMode::Lenient) {
            Err(EngineError::InvalidConfig { path: p, .. }) => assert_eq!(p, path),
            other => panic!("expected InvalidConfig, got {other:?}"),
        }
    }
}
