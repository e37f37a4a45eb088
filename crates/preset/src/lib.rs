//! TOML presets describing one dot-matrix effect and how to preview it.

use std::fmt;
use std::time::Duration;

use dotmatrix::{CenterAxes, ColorRgb, Overlay, RenderConfig};
use serde::de::{self, Deserializer};
use serde::ser::Serializer;
use serde::{Deserialize, Serialize};

pub const CURRENT_VERSION: u32 = 1;

/// Names accepted by [`builtin`].
pub const BUILTIN_NAMES: [&str; 2] = ["default", "swap-backdrop"];

const DEFAULT_OPACITIES: [f64; 10] = [0.3, 0.3, 0.3, 0.5, 0.5, 0.5, 0.8, 0.8, 0.8, 1.0];

#[derive(Debug, thiserror::Error)]
pub enum PresetError {
    #[error("failed to parse preset: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("failed to serialize preset: {0}")]
    Serialize(#[from] toml::ser::Error),
    #[error("invalid preset: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct PresetFile {
    pub version: u32,
    #[serde(default)]
    pub effect: EffectSection,
    #[serde(default)]
    pub window: WindowSection,
    #[serde(default)]
    pub overlay: OverlaySection,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct EffectSection {
    #[serde(default = "default_colors")]
    pub colors: Vec<PresetColor>,
    #[serde(default = "default_opacities")]
    pub opacities: Vec<f64>,
    #[serde(default = "default_cell_size")]
    pub cell_size: f32,
    #[serde(default = "default_dot_size")]
    pub dot_size: f32,
    #[serde(default = "default_animation_speed")]
    pub animation_speed: f32,
    #[serde(default)]
    pub reverse: bool,
    #[serde(default = "default_show_gradient")]
    pub show_gradient: bool,
    #[serde(default = "default_center")]
    pub center: Vec<Axis>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Axis {
    X,
    Y,
}

#[derive(Debug, Clone, PartialEq, Default, Deserialize, Serialize)]
pub struct WindowSection {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fps: Option<f32>,
    #[serde(
        default,
        deserialize_with = "deserialize_size_opt",
        serialize_with = "serialize_size_opt",
        skip_serializing_if = "Option::is_none"
    )]
    pub size: Option<(u32, u32)>,
    /// Period after which the preview flips between reveal and collapse.
    #[serde(
        default,
        deserialize_with = "deserialize_duration_opt",
        serialize_with = "serialize_duration_opt",
        skip_serializing_if = "Option::is_none"
    )]
    pub alternate: Option<Duration>,
}

/// Extra dark layers drawn above the dots, beyond the gradient that
/// `effect.show_gradient` controls.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
pub struct OverlaySection {
    #[serde(default)]
    pub vignette: bool,
    #[serde(default)]
    pub top_fade: bool,
}

/// A color written either as a hex string or as an `[r, g, b]` triple.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PresetColor(pub ColorRgb);

impl Serialize for PresetColor {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.collect_str(&self.0)
    }
}

impl<'de> Deserialize<'de> for PresetColor {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Helper {
            Hex(String),
            Triple(Vec<i64>),
        }

        match Helper::deserialize(deserializer)? {
            Helper::Hex(raw) => ColorRgb::from_hex(&raw)
                .map(PresetColor)
                .ok_or_else(|| de::Error::custom(format!("invalid hex color '{raw}'"))),
            Helper::Triple(channels) => parse_triple(&channels)
                .map(PresetColor)
                .map_err(de::Error::custom),
        }
    }
}

fn parse_triple(channels: &[i64]) -> Result<ColorRgb, String> {
    let [r, g, b] = channels else {
        return Err(format!(
            "color triple must have 3 channels, got {}",
            channels.len()
        ));
    };
    let channel = |value: i64| {
        u8::try_from(value).map_err(|_| format!("color channel {value} is outside 0-255"))
    };
    Ok(ColorRgb::new(channel(*r)?, channel(*g)?, channel(*b)?))
}

fn default_colors() -> Vec<PresetColor> {
    vec![PresetColor(ColorRgb::CYAN)]
}

fn default_opacities() -> Vec<f64> {
    DEFAULT_OPACITIES.to_vec()
}

fn default_cell_size() -> f32 {
    20.0
}

fn default_dot_size() -> f32 {
    3.0
}

fn default_animation_speed() -> f32 {
    10.0
}

fn default_show_gradient() -> bool {
    true
}

fn default_center() -> Vec<Axis> {
    vec![Axis::X, Axis::Y]
}

impl Default for EffectSection {
    fn default() -> Self {
        Self {
            colors: default_colors(),
            opacities: default_opacities(),
            cell_size: default_cell_size(),
            dot_size: default_dot_size(),
            animation_speed: default_animation_speed(),
            reverse: false,
            show_gradient: default_show_gradient(),
            center: default_center(),
        }
    }
}

/// Parses `WIDTHxHEIGHT`, for example `1280x720`.
pub fn parse_size(raw: &str) -> Result<(u32, u32), String> {
    let (width, height) = raw
        .trim()
        .split_once(['x', 'X'])
        .ok_or_else(|| format!("invalid size '{raw}'; expected WIDTHxHEIGHT"))?;
    let parse = |value: &str| {
        value
            .trim()
            .parse::<u32>()
            .map_err(|err| format!("invalid size '{raw}': {err}"))
    };
    let size = (parse(width)?, parse(height)?);
    if size.0 == 0 || size.1 == 0 {
        return Err(format!("invalid size '{raw}'; dimensions must be non-zero"));
    }
    Ok(size)
}

fn deserialize_size_opt<'de, D>(deserializer: D) -> Result<Option<(u32, u32)>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Option<String> = Option::deserialize(deserializer)?;
    raw.map(|raw| parse_size(&raw).map_err(de::Error::custom))
        .transpose()
}

fn serialize_size_opt<S>(size: &Option<(u32, u32)>, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    match size {
        Some((width, height)) => serializer.collect_str(&format_args!("{width}x{height}")),
        None => serializer.serialize_none(),
    }
}

fn deserialize_duration_opt<'de, D>(deserializer: D) -> Result<Option<Duration>, D::Error>
where
    D: Deserializer<'de>,
{
    struct Visitor;
    impl<'de> de::Visitor<'de> for Visitor {
        type Value = Option<Duration>;

        fn expecting(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
            formatter.write_str("a duration as number of seconds or human-readable string")
        }

        fn visit_str<E>(self, v: &str) -> Result<Self::Value, E>
        where
            E: de::Error,
        {
            humantime::parse_duration(v)
                .map(Some)
                .map_err(|err| E::custom(format!("invalid duration '{v}': {err}")))
        }

        fn visit_u64<E>(self, v: u64) -> Result<Self::Value, E>
        where
            E: de::Error,
        {
            Ok(Some(Duration::from_secs(v)))
        }

        fn visit_i64<E>(self, v: i64) -> Result<Self::Value, E>
        where
            E: de::Error,
        {
            u64::try_from(v)
                .map(|secs| Some(Duration::from_secs(secs)))
                .map_err(|_| E::custom("duration must be non-negative"))
        }

        fn visit_f64<E>(self, v: f64) -> Result<Self::Value, E>
        where
            E: de::Error,
        {
            if !v.is_finite() || v.is_sign_negative() {
                return Err(E::custom("duration must be non-negative"));
            }
            Ok(Some(Duration::from_secs_f64(v)))
        }
    }

    deserializer.deserialize_any(Visitor)
}

fn serialize_duration_opt<S>(duration: &Option<Duration>, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    match duration {
        Some(duration) => serializer.collect_str(&humantime::format_duration(*duration)),
        None => serializer.serialize_none(),
    }
}

/// Built-in preset by name; see [`BUILTIN_NAMES`].
pub fn builtin(name: &str) -> Option<PresetFile> {
    match name {
        "default" => Some(PresetFile::default()),
        "swap-backdrop" => Some(PresetFile {
            effect: EffectSection {
                colors: vec![PresetColor(ColorRgb::WHITE), PresetColor(ColorRgb::WHITE)],
                dot_size: 6.0,
                animation_speed: 3.0,
                ..EffectSection::default()
            },
            overlay: OverlaySection {
                vignette: true,
                top_fade: true,
            },
            ..PresetFile::default()
        }),
        _ => None,
    }
}

impl Default for PresetFile {
    fn default() -> Self {
        Self {
            version: CURRENT_VERSION,
            effect: EffectSection::default(),
            window: WindowSection::default(),
            overlay: OverlaySection::default(),
        }
    }
}

impl PresetFile {
    pub fn from_toml_str(input: &str) -> Result<Self, PresetError> {
        let raw: PresetFile = toml::from_str(input)?;
        raw.validate()?;
        Ok(raw)
    }

    pub fn to_toml_string(&self) -> Result<String, PresetError> {
        Ok(toml::to_string_pretty(self)?)
    }

    pub fn validate(&self) -> Result<(), PresetError> {
        if self.version != CURRENT_VERSION {
            return Err(PresetError::Invalid(format!(
                "unsupported preset version {}; expected {CURRENT_VERSION}",
                self.version
            )));
        }

        let effect = &self.effect;
        if effect.colors.is_empty() || effect.colors.len() > 3 {
            return Err(PresetError::Invalid(format!(
                "effect.colors must list 1 to 3 colors, got {}",
                effect.colors.len()
            )));
        }

        if effect.opacities.len() != DEFAULT_OPACITIES.len() {
            return Err(PresetError::Invalid(format!(
                "effect.opacities must list exactly {} values, got {}",
                DEFAULT_OPACITIES.len(),
                effect.opacities.len()
            )));
        }
        if let Some(bad) = effect
            .opacities
            .iter()
            .find(|value| !(0.0..=1.0).contains(*value))
        {
            return Err(PresetError::Invalid(format!(
                "effect.opacities value {bad} is outside [0, 1]"
            )));
        }

        for (name, value) in [
            ("effect.cell_size", effect.cell_size),
            ("effect.dot_size", effect.dot_size),
        ] {
            if !value.is_finite() || value <= 0.0 {
                return Err(PresetError::Invalid(format!(
                    "{name} must be greater than zero"
                )));
            }
        }

        if !effect.animation_speed.is_finite() || effect.animation_speed < 0.0 {
            return Err(PresetError::Invalid(
                "effect.animation_speed must be >= 0".into(),
            ));
        }

        if let Some(fps) = self.window.fps {
            if fps.is_nan() || fps < 0.0 {
                return Err(PresetError::Invalid("window.fps must be >= 0".into()));
            }
        }

        if let Some(alternate) = self.window.alternate {
            if alternate.is_zero() {
                return Err(PresetError::Invalid(
                    "window.alternate must be greater than zero".into(),
                ));
            }
        }

        Ok(())
    }

    /// Effect configuration for a dot-matrix session.
    pub fn render_config(&self) -> RenderConfig {
        let effect = &self.effect;
        RenderConfig {
            colors: effect.colors.iter().map(|color| color.0).collect(),
            opacities: effect.opacities.iter().map(|value| *value as f32).collect(),
            cell_size: effect.cell_size,
            dot_size: effect.dot_size,
            animation_speed: effect.animation_speed,
            reverse: effect.reverse,
            show_gradient: effect.show_gradient,
            center: CenterAxes {
                x: effect.center.contains(&Axis::X),
                y: effect.center.contains(&Axis::Y),
            },
        }
    }

    /// Overlay layers: the gradient from the effect plus the extra layers.
    pub fn overlay(&self) -> Overlay {
        Overlay::for_config(&self.render_config())
            .with_vignette(self.overlay.vignette)
            .with_top_fade(self.overlay.top_fade)
    }
}
