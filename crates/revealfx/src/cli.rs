use std::path::PathBuf;
use std::time::Duration;

use clap::{Args, Parser, Subcommand};
use dotmatrix::{CenterAxes, ColorRgb};
use preset::BUILTIN_NAMES;

#[derive(Parser, Debug)]
#[command(
    name = "revealfx",
    author,
    version,
    about = "Animated dot-matrix reveal backdrop"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Open the animated preview window.
    Window(WindowArgs),
    /// Render one frame on the CPU and write it as PNG.
    Still(StillArgs),
    /// Print the effective preset as TOML.
    Preset(PresetArgs),
}

/// Where the effect comes from and what to override on top of it.
#[derive(Args, Debug, Clone, Default)]
pub struct EffectArgs {
    /// Preset TOML file to start from.
    #[arg(long, value_name = "FILE", conflicts_with = "builtin")]
    pub preset: Option<PathBuf>,

    /// Built-in preset to start from (`default` or `swap-backdrop`).
    #[arg(long, value_name = "NAME", value_parser = parse_builtin)]
    pub builtin: Option<String>,

    /// Replace the palette; repeat for up to three colors (`#rrggbb` or `r,g,b`).
    #[arg(long = "color", value_name = "COLOR", value_parser = parse_color)]
    pub colors: Vec<ColorRgb>,

    /// Grid cell size in device pixels.
    #[arg(long, value_name = "PIXELS")]
    pub cell_size: Option<f32>,

    /// Dot size in device pixels.
    #[arg(long, value_name = "PIXELS")]
    pub dot_size: Option<f32>,

    /// Animation speed recorded in the preset.
    #[arg(long, value_name = "SPEED")]
    pub animation_speed: Option<f32>,

    /// Collapse toward the center instead of revealing outward.
    #[arg(long)]
    pub reverse: bool,

    /// Hide the bottom-to-top gradient.
    #[arg(long)]
    pub no_gradient: bool,

    /// Axes the grid is centered on: `xy`, `x`, `y`, or `none`.
    #[arg(long, value_name = "AXES", value_parser = parse_center)]
    pub center: Option<CenterAxes>,

    /// Darken the middle with a radial vignette.
    #[arg(long)]
    pub vignette: bool,

    /// Fade the top third to black.
    #[arg(long)]
    pub top_fade: bool,

    /// Window size; for stills the viewport (the PNG is twice as large).
    #[arg(long, value_name = "WIDTHxHEIGHT", value_parser = preset::parse_size)]
    pub size: Option<(u32, u32)>,
}

#[derive(Args, Debug)]
pub struct WindowArgs {
    #[command(flatten)]
    pub effect: EffectArgs,

    /// FPS cap; defaults to 60, 0 renders every display callback.
    #[arg(long, value_name = "FPS")]
    pub fps: Option<f32>,

    /// Swap between reveal and collapse every SECS seconds.
    #[arg(long, value_name = "SECS", value_parser = parse_seconds)]
    pub alternate: Option<Duration>,
}

#[derive(Args, Debug)]
pub struct StillArgs {
    #[command(flatten)]
    pub effect: EffectArgs,

    /// Timestamp in seconds to evaluate.
    #[arg(long, value_name = "SECONDS", default_value_t = 5.0, value_parser = parse_time)]
    pub time: f32,

    /// Destination PNG path.
    #[arg(long, value_name = "PATH")]
    pub out: PathBuf,
}

#[derive(Args, Debug)]
pub struct PresetArgs {
    #[command(flatten)]
    pub effect: EffectArgs,
}

pub fn parse() -> Cli {
    Cli::parse()
}

pub fn parse_builtin(value: &str) -> Result<String, String> {
    let normalized = value.trim().to_ascii_lowercase();
    if BUILTIN_NAMES.contains(&normalized.as_str()) {
        Ok(normalized)
    } else {
        Err(format!(
            "unknown built-in preset '{value}'; expected one of {}",
            BUILTIN_NAMES.join(", ")
        ))
    }
}

pub fn parse_color(value: &str) -> Result<ColorRgb, String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err("color must not be empty".to_string());
    }

    if trimmed.contains(',') {
        let channels = trimmed
            .split(',')
            .map(|channel| {
                channel
                    .trim()
                    .parse::<u8>()
                    .map_err(|_| format!("invalid color channel '{channel}' in '{trimmed}'"))
            })
            .collect::<Result<Vec<_>, _>>()?;
        return match channels.as_slice() {
            [r, g, b] => Ok(ColorRgb::new(*r, *g, *b)),
            _ => Err(format!("color '{trimmed}' must have exactly 3 channels")),
        };
    }

    ColorRgb::from_hex(trimmed)
        .ok_or_else(|| format!("invalid color '{trimmed}'; expected #rrggbb or r,g,b"))
}

pub fn parse_center(value: &str) -> Result<CenterAxes, String> {
    match value.trim().to_ascii_lowercase().as_str() {
        "xy" | "yx" | "both" => Ok(CenterAxes::BOTH),
        "x" => Ok(CenterAxes { x: true, y: false }),
        "y" => Ok(CenterAxes { x: false, y: true }),
        "none" | "" => Ok(CenterAxes::NONE),
        other => Err(format!(
            "unknown center axes '{other}'; expected xy, x, y, or none"
        )),
    }
}

pub fn parse_seconds(value: &str) -> Result<Duration, String> {
    let seconds: f64 = value
        .trim()
        .parse()
        .map_err(|_| format!("invalid duration '{value}'; expected seconds"))?;
    if !seconds.is_finite() || seconds <= 0.0 {
        return Err(format!("duration '{value}' must be greater than zero"));
    }
    Ok(Duration::from_secs_f64(seconds))
}

pub fn parse_time(value: &str) -> Result<f32, String> {
    let seconds: f32 = value
        .trim()
        .parse()
        .map_err(|_| format!("invalid timestamp '{value}'; expected seconds"))?;
    if !seconds.is_finite() || seconds < 0.0 {
        return Err(format!("timestamp '{value}' must be non-negative"));
    }
    Ok(seconds)
}
