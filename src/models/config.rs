//! Settings document (config.json) and the immutable run snapshot derived from it.
//!
//! The settings document is loose: numbers are frequently stored as strings
//! (`"aimSpeed": "20"`). `RunConfig::from_settings` validates everything once,
//! before the loop starts; nothing is re-validated per frame.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::detection::InferenceParams;
use crate::error::{AimError, Result};
use crate::telemetry::hotkey::HotkeySpec;

pub const DEFAULT_CONFIDENCE_THRESHOLD: f64 = 0.5;
pub const DEFAULT_IOU_THRESHOLD: f64 = 0.45;
pub const DEFAULT_IOU_TRACK_THRESHOLD: f64 = 0.4;
pub const DEFAULT_DEADZONE: f64 = 1.5;
pub const DEFAULT_MAX_DETECTIONS: u32 = 10;
pub const DEFAULT_IMAGE_SIZE: u32 = 640;
pub const DEFAULT_HOTKEY: &str = "CapsLock";

/// A settings value as found in the document: number, numeric string or flag.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SettingValue {
    Number(f64),
    Flag(bool),
    Text(String),
}

impl SettingValue {
    fn text(value: &str) -> Option<Self> {
        Some(Self::Text(value.to_string()))
    }

    fn as_f64(&self) -> Option<f64> {
        let number = match self {
            SettingValue::Number(n) => Some(*n),
            SettingValue::Text(s) => s.trim().parse::<f64>().ok(),
            SettingValue::Flag(_) => None,
        };
        number.filter(|n| n.is_finite())
    }

    fn as_bool(&self) -> Option<bool> {
        match self {
            SettingValue::Flag(b) => Some(*b),
            SettingValue::Text(s) => match s.trim().to_ascii_lowercase().as_str() {
                "true" | "1" => Some(true),
                "false" | "0" => Some(false),
                _ => None,
            },
            SettingValue::Number(n) => Some(*n != 0.0),
        }
    }

    fn as_text(&self) -> String {
        match self {
            SettingValue::Text(s) => s.clone(),
            SettingValue::Number(n) => n.to_string(),
            SettingValue::Flag(b) => b.to_string(),
        }
    }
}

/// Raw settings document, field names as persisted.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Settings {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<SettingValue>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hotkey: Option<SettingValue>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub range_width: Option<SettingValue>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub range_height: Option<SettingValue>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub aim_speed: Option<SettingValue>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub offset_x: Option<SettingValue>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub offset_y: Option<SettingValue>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub confidence_threshold: Option<SettingValue>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub iou_threshold: Option<SettingValue>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub iou_track_threshold: Option<SettingValue>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deadzone: Option<SettingValue>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_detection: Option<SettingValue>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_size: Option<SettingValue>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub show_scope: Option<SettingValue>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub enable_draw: Option<SettingValue>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fp16: Option<SettingValue>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub augment: Option<SettingValue>,
}

impl Settings {
    /// The document written on first run.
    pub fn with_defaults() -> Self {
        Self {
            model: SettingValue::text("MRZH.pt"),
            hotkey: SettingValue::text(DEFAULT_HOTKEY),
            range_width: SettingValue::text("320"),
            range_height: SettingValue::text("320"),
            aim_speed: SettingValue::text("20"),
            offset_x: SettingValue::text("0"),
            offset_y: SettingValue::text("0"),
            confidence_threshold: SettingValue::text("0.30"),
            iou_threshold: SettingValue::text("0.45"),
            iou_track_threshold: None,
            deadzone: None,
            max_detection: SettingValue::text("10"),
            image_size: SettingValue::text("640"),
            show_scope: Some(SettingValue::Flag(true)),
            enable_draw: Some(SettingValue::Flag(true)),
            fp16: Some(SettingValue::Flag(true)),
            augment: Some(SettingValue::Flag(false)),
        }
    }

    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }
}

/// Immutable snapshot taken at loop start.
#[derive(Debug, Clone, PartialEq)]
pub struct RunConfig {
    pub model: Option<String>,
    /// Logical capture size; the physical region is this times `scaling_factor`.
    pub range_width: u32,
    pub range_height: u32,
    pub aim_speed: f64,
    /// Signed percentage of the locked box width.
    pub offset_x_pct: f64,
    /// Signed percentage of the locked box height.
    pub offset_y_pct: f64,
    pub confidence_threshold: f64,
    pub iou_threshold: f64,
    pub iou_track_threshold: f64,
    pub deadzone: f64,
    pub max_detections: u32,
    pub image_size: u32,
    pub half_precision: bool,
    pub augment: bool,
    pub enable_draw: bool,
    pub show_scope: bool,
    pub hotkey: HotkeySpec,
    pub scaling_factor: f64,
}

impl RunConfig {
    /// Validates a settings document. `scaling_factor` comes from the monitor DPI.
    pub fn from_settings(settings: &Settings, scaling_factor: f64) -> Result<Self> {
        let range_width = required_number(&settings.range_width, "rangeWidth")?;
        let range_height = required_number(&settings.range_height, "rangeHeight")?;
        let aim_speed = required_number(&settings.aim_speed, "aimSpeed")?;
        let offset_x_pct = required_number(&settings.offset_x, "offsetX")?;
        let offset_y_pct = required_number(&settings.offset_y, "offsetY")?;

        let confidence_threshold = optional_number(
            &settings.confidence_threshold,
            "confidenceThreshold",
            DEFAULT_CONFIDENCE_THRESHOLD,
        )?;
        let iou_threshold =
            optional_number(&settings.iou_threshold, "iouThreshold", DEFAULT_IOU_THRESHOLD)?;
        let iou_track_threshold = optional_number(
            &settings.iou_track_threshold,
            "iouTrackThreshold",
            DEFAULT_IOU_TRACK_THRESHOLD,
        )?;
        let deadzone = optional_number(&settings.deadzone, "deadzone", DEFAULT_DEADZONE)?;
        let max_detections = optional_number(
            &settings.max_detection,
            "maxDetection",
            DEFAULT_MAX_DETECTIONS as f64,
        )?;
        let image_size =
            optional_number(&settings.image_size, "imageSize", DEFAULT_IMAGE_SIZE as f64)?;

        let hotkey_text = settings
            .hotkey
            .as_ref()
            .map(SettingValue::as_text)
            .unwrap_or_else(|| DEFAULT_HOTKEY.to_string());
        let hotkey = HotkeySpec::parse(&hotkey_text)
            .map_err(|e| AimError::config(format!("hotkey: {e}")))?;

        let config = Self {
            model: settings.model.as_ref().map(SettingValue::as_text),
            range_width: range_width as u32,
            range_height: range_height as u32,
            aim_speed,
            offset_x_pct,
            offset_y_pct,
            confidence_threshold,
            iou_threshold,
            iou_track_threshold,
            deadzone,
            max_detections: max_detections as u32,
            image_size: image_size as u32,
            half_precision: optional_flag(&settings.fp16, "fp16", true)?,
            augment: optional_flag(&settings.augment, "augment", false)?,
            enable_draw: optional_flag(&settings.enable_draw, "enableDraw", true)?,
            show_scope: optional_flag(&settings.show_scope, "showScope", true)?,
            hotkey,
            scaling_factor,
        };
        config.validate()?;
        Ok(config)
    }

    /// Range checks on the typed values. Also applied by `start` to hand-built configs.
    pub fn validate(&self) -> Result<()> {
        ensure(
            self.scaling_factor.is_finite() && self.scaling_factor > 0.0,
            "scalingFactor",
            self.scaling_factor,
            "must be positive",
        )?;
        ensure(self.range_width >= 1, "rangeWidth", self.range_width as f64, "must be >= 1")?;
        ensure(self.range_height >= 1, "rangeHeight", self.range_height as f64, "must be >= 1")?;
        ensure(
            self.aim_speed.is_finite() && self.aim_speed >= 0.0,
            "aimSpeed",
            self.aim_speed,
            "must be >= 0",
        )?;
        ensure(
            (-100.0..=100.0).contains(&self.offset_x_pct),
            "offsetX",
            self.offset_x_pct,
            "must be within -100..=100",
        )?;
        ensure(
            (-100.0..=100.0).contains(&self.offset_y_pct),
            "offsetY",
            self.offset_y_pct,
            "must be within -100..=100",
        )?;
        ensure(
            (0.0..=1.0).contains(&self.confidence_threshold),
            "confidenceThreshold",
            self.confidence_threshold,
            "must be within 0..=1",
        )?;
        ensure(
            (0.0..=1.0).contains(&self.iou_threshold),
            "iouThreshold",
            self.iou_threshold,
            "must be within 0..=1",
        )?;
        ensure(
            (0.0..1.0).contains(&self.iou_track_threshold),
            "iouTrackThreshold",
            self.iou_track_threshold,
            "must be within 0..1",
        )?;
        ensure(
            self.deadzone.is_finite() && self.deadzone >= 0.0,
            "deadzone",
            self.deadzone,
            "must be >= 0",
        )?;
        ensure(
            self.max_detections >= 1,
            "maxDetection",
            self.max_detections as f64,
            "must be >= 1",
        )?;
        ensure(
            self.image_size >= 32,
            "imageSize",
            self.image_size as f64,
            "must be >= 32",
        )?;
        Ok(())
    }

    /// Proportional gain of the aim controller.
    pub fn gain(&self) -> f64 {
        self.aim_speed / 200.0
    }

    /// Physical capture size (`logical * scaling`, truncated).
    pub fn physical_capture_size(&self) -> (u32, u32) {
        (
            (self.range_width as f64 * self.scaling_factor) as u32,
            (self.range_height as f64 * self.scaling_factor) as u32,
        )
    }

    pub fn inference_params(&self) -> InferenceParams {
        InferenceParams {
            confidence: self.confidence_threshold as f32,
            iou: self.iou_threshold as f32,
            max_detections: self.max_detections,
            image_size: self.image_size,
            half_precision: self.half_precision,
            augment: self.augment,
        }
    }
}

fn required_number(value: &Option<SettingValue>, name: &str) -> Result<f64> {
    let value = value
        .as_ref()
        .ok_or_else(|| AimError::config(format!("{name} is required")))?;
    value
        .as_f64()
        .ok_or_else(|| AimError::config(format!("{name} is not numeric: {value:?}")))
}

fn optional_number(value: &Option<SettingValue>, name: &str, default: f64) -> Result<f64> {
    match value {
        None => Ok(default),
        Some(value) => value
            .as_f64()
            .ok_or_else(|| AimError::config(format!("{name} is not numeric: {value:?}"))),
    }
}

fn optional_flag(value: &Option<SettingValue>, name: &str, default: bool) -> Result<bool> {
    match value {
        None => Ok(default),
        Some(value) => value
            .as_bool()
            .ok_or_else(|| AimError::config(format!("{name} is not a boolean: {value:?}"))),
    }
}

fn ensure(ok: bool, name: &str, value: f64, rule: &str) -> Result<()> {
    if ok {
        Ok(())
    } else {
        Err(AimError::config(format!("{name} {rule}, got {value}")))
    }
}

/// `{config_dir}/scopelock/config.json`.
pub fn default_settings_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("scopelock").join("config.json"))
}

/// Reads the settings document, writing the defaults first when it does not exist.
pub fn load_settings(path: &Path) -> Result<Settings> {
    if !path.exists() {
        log::info!(
            "load_settings: {} not found, writing defaults",
            path.display()
        );
        let defaults = Settings::with_defaults();
        save_settings(path, &defaults)?;
        return Ok(defaults);
    }

    let json = std::fs::read_to_string(path)?;
    Settings::from_json(&json)
}

pub fn save_settings(path: &Path, settings: &Settings) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let json = serde_json::to_string_pretty(settings)?;
    std::fs::write(path, json)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base_settings() -> Settings {
        Settings::with_defaults()
    }

    #[test]
    fn defaults_validate() {
        let config = RunConfig::from_settings(&base_settings(), 1.25).unwrap();
        assert_eq!(config.range_width, 320);
        assert_eq!(config.physical_capture_size(), (400, 400));
        assert_eq!(config.aim_speed, 20.0);
        assert_eq!(config.gain(), 0.1);
        assert_eq!(config.confidence_threshold, 0.30);
        assert_eq!(config.iou_track_threshold, DEFAULT_IOU_TRACK_THRESHOLD);
        assert_eq!(config.deadzone, DEFAULT_DEADZONE);
        assert!(config.enable_draw);
        assert!(config.show_scope);
        assert_eq!(config.model.as_deref(), Some("MRZH.pt"));
    }

    #[test]
    fn parses_string_and_number_values() {
        let settings = Settings::from_json(
            r#"{
                "rangeWidth": 256,
                "rangeHeight": "192",
                "aimSpeed": "40",
                "offsetX": -10,
                "offsetY": "25.5",
                "showScope": "false",
                "enableDraw": false,
                "hotkey": "ctrl+f2"
            }"#,
        )
        .unwrap();
        let config = RunConfig::from_settings(&settings, 1.0).unwrap();
        assert_eq!(config.range_width, 256);
        assert_eq!(config.range_height, 192);
        assert_eq!(config.gain(), 0.2);
        assert_eq!(config.offset_x_pct, -10.0);
        assert_eq!(config.offset_y_pct, 25.5);
        assert!(!config.show_scope);
        assert!(!config.enable_draw);
        assert_eq!(config.confidence_threshold, DEFAULT_CONFIDENCE_THRESHOLD);
    }

    #[test]
    fn missing_required_field_is_config_error() {
        let mut settings = base_settings();
        settings.aim_speed = None;
        let err = RunConfig::from_settings(&settings, 1.0).unwrap_err();
        assert!(matches!(err, AimError::Config(msg) if msg.contains("aimSpeed")));
    }

    #[test]
    fn non_numeric_field_is_config_error() {
        let mut settings = base_settings();
        settings.range_width = Some(SettingValue::Text("wide".to_string()));
        let err = RunConfig::from_settings(&settings, 1.0).unwrap_err();
        assert!(matches!(err, AimError::Config(msg) if msg.contains("rangeWidth")));
    }

    #[test]
    fn out_of_range_values_are_rejected() {
        let mut settings = base_settings();
        settings.confidence_threshold = Some(SettingValue::Number(1.5));
        assert!(RunConfig::from_settings(&settings, 1.0).is_err());

        let mut settings = base_settings();
        settings.deadzone = Some(SettingValue::Number(-1.0));
        assert!(RunConfig::from_settings(&settings, 1.0).is_err());

        assert!(RunConfig::from_settings(&base_settings(), 0.0).is_err());
    }

    #[test]
    fn bad_hotkey_is_config_error() {
        let mut settings = base_settings();
        settings.hotkey = Some(SettingValue::Text("ctrl+".to_string()));
        assert!(matches!(
            RunConfig::from_settings(&settings, 1.0),
            Err(AimError::Config(_))
        ));
    }

    #[test]
    fn inference_params_follow_config() {
        let config = RunConfig::from_settings(&base_settings(), 1.0).unwrap();
        let params = config.inference_params();
        assert_eq!(params.max_detections, 10);
        assert_eq!(params.image_size, 640);
        assert!(params.half_precision);
        assert!(!params.augment);
    }

    #[test]
    fn load_settings_writes_defaults_when_missing() {
        let dir = std::env::temp_dir().join(format!("scopelock-test-{}", uuid::Uuid::new_v4()));
        let path = dir.join("config.json");

        let loaded = load_settings(&path).unwrap();
        assert_eq!(loaded, Settings::with_defaults());
        assert!(path.exists());

        let reloaded = load_settings(&path).unwrap();
        assert_eq!(reloaded, loaded);

        std::fs::remove_dir_all(&dir).ok();
    }
}
