//! Filter parameter model and validation.
//!
//! One canonical range table is shared by every producer. Anything coming from
//! outside the process (remote service, quiz file, saved record, CLI flag) is
//! turned into a [`FilterParameters`] by [`validate`], which never fails.

use crate::{PhotoFilterError, PhotoFilterResult};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::{fmt, str::FromStr};

pub const DEFAULT_NAME: &str = "Custom Filter";
pub const MAX_NAME_LEN: usize = 40;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ParamRange {
    pub min: f32,
    pub max: f32,
    pub default: f32,
}

impl ParamRange {
    pub const fn new(min: f32, max: f32, default: f32) -> Self {
        Self { min, max, default }
    }

    pub fn midpoint(&self) -> f32 {
        (self.min + self.max) / 2.0
    }

    pub fn contains(&self, value: f32) -> bool {
        value >= self.min && value <= self.max
    }
}

pub const BRIGHTNESS: ParamRange = ParamRange::new(0.6, 1.5, 1.0);
pub const CONTRAST: ParamRange = ParamRange::new(0.6, 1.5, 1.0);
pub const SATURATION: ParamRange = ParamRange::new(0.3, 1.8, 1.0);
pub const TEMPERATURE: ParamRange = ParamRange::new(-40.0, 40.0, 0.0);
pub const TINT: ParamRange = ParamRange::new(-25.0, 25.0, 0.0);
pub const GRAIN: ParamRange = ParamRange::new(0.0, 0.4, 0.0);
pub const VIGNETTE: ParamRange = ParamRange::new(0.0, 0.6, 0.0);
pub const FADE: ParamRange = ParamRange::new(0.0, 0.35, 0.0);

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Param {
    Brightness,
    Contrast,
    Saturation,
    Temperature,
    Tint,
    Grain,
    Vignette,
    Fade,
}

impl Param {
    pub const ALL: [Param; 8] = [
        Param::Brightness,
        Param::Contrast,
        Param::Saturation,
        Param::Temperature,
        Param::Tint,
        Param::Grain,
        Param::Vignette,
        Param::Fade,
    ];

    pub fn key(&self) -> &'static str {
        match self {
            Param::Brightness => "brightness",
            Param::Contrast => "contrast",
            Param::Saturation => "saturation",
            Param::Temperature => "temperature",
            Param::Tint => "tint",
            Param::Grain => "grain",
            Param::Vignette => "vignette",
            Param::Fade => "fade",
        }
    }

    pub fn range(&self) -> ParamRange {
        match self {
            Param::Brightness => BRIGHTNESS,
            Param::Contrast => CONTRAST,
            Param::Saturation => SATURATION,
            Param::Temperature => TEMPERATURE,
            Param::Tint => TINT,
            Param::Grain => GRAIN,
            Param::Vignette => VIGNETTE,
            Param::Fade => FADE,
        }
    }

    pub fn default_value(&self) -> f32 {
        self.range().default
    }

    pub fn from_key(key: &str) -> Option<Param> {
        let key = key.trim().to_ascii_lowercase();
        Param::ALL.into_iter().find(|p| p.key() == key)
    }

    // Quantization used by the remote producers.
    fn decimals(&self) -> i32 {
        match self {
            Param::Temperature | Param::Tint => 0,
            Param::Grain | Param::Fade => 3,
            _ => 2,
        }
    }
}

impl fmt::Display for Param {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

impl FromStr for Param {
    type Err = PhotoFilterError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Param::from_key(s).ok_or_else(|| PhotoFilterError::UnknownParameter(s.to_string()))
    }
}

/// Bound `value` to `range`; non-finite input maps to the range midpoint.
pub fn clamp(value: f64, range: ParamRange) -> f32 {
    if !value.is_finite() {
        return range.midpoint();
    }

    value.clamp(range.min as f64, range.max as f64) as f32
}

/// Like [`clamp`], for an arbitrary JSON value. Anything that is not a JSON
/// number maps to the range midpoint.
pub fn clamp_value(value: &Value, range: ParamRange) -> f32 {
    match value.as_f64() {
        Some(v) => clamp(v, range),
        None => range.midpoint(),
    }
}

fn sanitize_name(name: &str) -> String {
    let name = name.trim();
    if name.is_empty() {
        return DEFAULT_NAME.to_string();
    }

    name.chars().take(MAX_NAME_LEN).collect::<String>().trim_end().to_string()
}

/// An immutable, always in-range filter parameter set.
///
/// Edits return a new instance; deserialization goes through [`validate`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "Value")]
pub struct FilterParameters {
    name: String,
    brightness: f32,
    contrast: f32,
    saturation: f32,
    temperature: f32,
    tint: f32,
    grain: f32,
    vignette: f32,
    fade: f32,
}

impl Default for FilterParameters {
    fn default() -> Self {
        Self {
            name: DEFAULT_NAME.to_string(),
            brightness: BRIGHTNESS.default,
            contrast: CONTRAST.default,
            saturation: SATURATION.default,
            temperature: TEMPERATURE.default,
            tint: TINT.default,
            grain: GRAIN.default,
            vignette: VIGNETTE.default,
            fade: FADE.default,
        }
    }
}

impl FilterParameters {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn brightness(&self) -> f32 {
        self.brightness
    }

    pub fn contrast(&self) -> f32 {
        self.contrast
    }

    pub fn saturation(&self) -> f32 {
        self.saturation
    }

    pub fn temperature(&self) -> f32 {
        self.temperature
    }

    pub fn tint(&self) -> f32 {
        self.tint
    }

    pub fn grain(&self) -> f32 {
        self.grain
    }

    pub fn vignette(&self) -> f32 {
        self.vignette
    }

    pub fn fade(&self) -> f32 {
        self.fade
    }

    pub fn get(&self, param: Param) -> f32 {
        match param {
            Param::Brightness => self.brightness,
            Param::Contrast => self.contrast,
            Param::Saturation => self.saturation,
            Param::Temperature => self.temperature,
            Param::Tint => self.tint,
            Param::Grain => self.grain,
            Param::Vignette => self.vignette,
            Param::Fade => self.fade,
        }
    }

    fn slot(&mut self, param: Param) -> &mut f32 {
        match param {
            Param::Brightness => &mut self.brightness,
            Param::Contrast => &mut self.contrast,
            Param::Saturation => &mut self.saturation,
            Param::Temperature => &mut self.temperature,
            Param::Tint => &mut self.tint,
            Param::Grain => &mut self.grain,
            Param::Vignette => &mut self.vignette,
            Param::Fade => &mut self.fade,
        }
    }

    /// Copy with `param` replaced by `value`, clamped into its range.
    pub fn with(mut self, param: Param, value: f64) -> Self {
        *self.slot(param) = clamp(value, param.range());
        self
    }

    pub fn with_name(mut self, name: &str) -> Self {
        self.name = sanitize_name(name);
        self
    }

    /// Parse a `key=value` manual edit and apply it.
    pub fn with_assignment(self, assignment: &str) -> PhotoFilterResult<Self> {
        let (key, value) = assignment.split_once('=').ok_or_else(|| {
            PhotoFilterError::InvalidParameter(format!("expected key=value, got `{assignment}`"))
        })?;

        if key.trim().eq_ignore_ascii_case("name") {
            return Ok(self.with_name(value));
        }

        let param = key.parse::<Param>()?;
        let value = value.trim().parse::<f64>().map_err(|e| {
            PhotoFilterError::InvalidParameter(format!("{param}: `{}` {e}", value.trim()))
        })?;

        Ok(self.with(param, value))
    }

    /// Quantize the knobs the way the remote producers report them.
    pub fn rounded(mut self) -> Self {
        for param in Param::ALL {
            let scale = 10f64.powi(param.decimals());
            let value = (self.get(param) as f64 * scale).round() / scale;
            *self.slot(param) = clamp(value, param.range());
        }
        self
    }

    pub fn is_neutral(&self) -> bool {
        Param::ALL
            .iter()
            .all(|p| self.get(*p) == p.default_value())
    }

    pub fn to_json(&self) -> Value {
        serde_json::to_value(self).unwrap_or(Value::Null)
    }
}

impl From<Value> for FilterParameters {
    fn from(value: Value) -> Self {
        validate(&value)
    }
}

/// Total function from any JSON value to an in-range parameter set.
///
/// Missing fields take their default, present-but-invalid fields take the
/// range midpoint, a non-object input yields the defaults.
pub fn validate(raw: &Value) -> FilterParameters {
    let mut params = FilterParameters::default();

    let Some(fields) = raw.as_object() else {
        return params;
    };

    for param in Param::ALL {
        if let Some(value) = fields.get(param.key()) {
            *params.slot(param) = clamp_value(value, param.range());
        }
    }

    if let Some(name) = fields.get("name").and_then(Value::as_str) {
        params.name = sanitize_name(name);
    }

    params
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_clamp() {
        assert_eq!(clamp(2.0, BRIGHTNESS), 1.5);
        assert_eq!(clamp(0.1, BRIGHTNESS), 0.6);
        assert_eq!(clamp(1.2, BRIGHTNESS), 1.2);
        assert_eq!(clamp(f64::NAN, GRAIN), 0.2);
        assert_eq!(clamp(f64::INFINITY, TEMPERATURE), 0.0);
        assert_eq!(clamp(1e300, TINT), 25.0);
    }

    #[test]
    fn test_validate_fills_defaults() {
        let params = validate(&json!({}));
        assert_eq!(params, FilterParameters::default());
        assert!(params.is_neutral());

        let params = validate(&json!("not an object"));
        assert_eq!(params, FilterParameters::default());
    }

    #[test]
    fn test_validate_replaces_garbage_with_midpoint() {
        let params = validate(&json!({
            "brightness": "bright",
            "contrast": null,
            "saturation": [1.0],
            "temperature": true,
            "fade": {"value": 0.1},
        }));

        assert_eq!(params.brightness(), BRIGHTNESS.midpoint());
        assert_eq!(params.contrast(), CONTRAST.midpoint());
        assert_eq!(params.saturation(), SATURATION.midpoint());
        assert_eq!(params.temperature(), TEMPERATURE.midpoint());
        assert_eq!(params.fade(), FADE.midpoint());
        assert_eq!(params.tint(), 0.0);
    }

    #[test]
    fn test_validate_every_field_in_range() {
        let inputs = [
            json!({"brightness": 99, "contrast": -3, "saturation": 1.9, "temperature": 400,
                   "tint": -400, "grain": 2, "vignette": -1, "fade": 0.9}),
            json!({"brightness": -1e30, "contrast": 1e30, "saturation": 0,
                   "temperature": "hot", "tint": 12.5, "grain": 0.01, "vignette": 0.59, "fade": null}),
            json!([1, 2, 3]),
            json!(null),
        ];

        for raw in inputs {
            let params = validate(&raw);
            for param in Param::ALL {
                assert!(
                    param.range().contains(params.get(param)),
                    "{param} = {} out of range for {raw}",
                    params.get(param)
                );
            }
        }
    }

    #[test]
    fn test_validate_name() {
        assert_eq!(validate(&json!({"name": "  Morning Dew  "})).name(), "Morning Dew");
        assert_eq!(validate(&json!({"name": ""})).name(), DEFAULT_NAME);
        assert_eq!(validate(&json!({"name": 42})).name(), DEFAULT_NAME);

        let long = "x".repeat(100);
        assert_eq!(validate(&json!({ "name": long })).name().len(), MAX_NAME_LEN);
    }

    #[test]
    fn test_deserialize_goes_through_validate() -> anyhow::Result<()> {
        let params: FilterParameters =
            serde_json::from_str(r#"{"name":"Test","brightness":3.0,"grain":"x"}"#)?;
        assert_eq!(params.brightness(), 1.5);
        assert_eq!(params.grain(), GRAIN.midpoint());

        let text = serde_json::to_string(&params)?;
        let back: FilterParameters = serde_json::from_str(&text)?;
        assert_eq!(back, params);
        Ok(())
    }

    #[test]
    fn test_with_is_clamped_and_immutable() {
        let base = FilterParameters::default();
        let edited = base.clone().with(Param::Vignette, 5.0);
        assert_eq!(edited.vignette(), 0.6);
        assert_eq!(base.vignette(), 0.0);
    }

    #[test]
    fn test_with_assignment() -> anyhow::Result<()> {
        let params = FilterParameters::default()
            .with_assignment("temperature=12")?
            .with_assignment(" Fade = 0.1 ")?
            .with_assignment("name=Fern Light")?;

        assert_eq!(params.temperature(), 12.0);
        assert_eq!(params.fade(), 0.1);
        assert_eq!(params.name(), "Fern Light");

        assert!(FilterParameters::default().with_assignment("sharpness=1").is_err());
        assert!(FilterParameters::default().with_assignment("grain").is_err());
        assert!(FilterParameters::default().with_assignment("grain=lots").is_err());
        Ok(())
    }

    #[test]
    fn test_rounded() {
        let params = validate(&json!({
            "brightness": 1.23456, "temperature": 12.6, "grain": 0.12345, "vignette": 0.599
        }))
        .rounded();

        assert_eq!(params.brightness(), 1.23);
        assert_eq!(params.temperature(), 13.0);
        assert_eq!(params.grain(), 0.123);
        assert_eq!(params.vignette(), 0.6);
    }

    #[test]
    fn test_param_keys() {
        for param in Param::ALL {
            assert_eq!(Param::from_key(param.key()), Some(param));
        }
        assert_eq!("SATURATION".parse::<Param>().ok(), Some(Param::Saturation));
    }
}
