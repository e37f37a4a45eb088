use std::fmt;

use crate::uniforms::OPACITY_STEPS;

/// 8-bit sRGB triple as authored in presets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ColorRgb {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl ColorRgb {
    pub const BLACK: Self = Self::new(0, 0, 0);
    pub const WHITE: Self = Self::new(255, 255, 255);
    pub const CYAN: Self = Self::new(0, 255, 255);

    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    /// Channels divided by 255.
    pub fn normalized(self) -> [f32; 3] {
        [
            f32::from(self.r) / 255.0,
            f32::from(self.g) / 255.0,
            f32::from(self.b) / 255.0,
        ]
    }

    /// Parses `#rrggbb`, `rrggbb`, or the short `#rgb` form.
    pub fn from_hex(value: &str) -> Option<Self> {
        let digits = value.trim().trim_start_matches('#');
        if !digits.chars().all(|ch| ch.is_ascii_hexdigit()) {
            return None;
        }
        match digits.len() {
            6 => {
                let channel = |range: std::ops::Range<usize>| {
                    u8::from_str_radix(&digits[range], 16).ok()
                };
                Some(Self::new(channel(0..2)?, channel(2..4)?, channel(4..6)?))
            }
            3 => {
                let channel = |index: usize| {
                    u8::from_str_radix(&digits[index..index + 1], 16)
                        .ok()
                        .map(|nibble| nibble * 17)
                };
                Some(Self::new(channel(0)?, channel(1)?, channel(2)?))
            }
            _ => None,
        }
    }
}

impl fmt::Display for ColorRgb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
    }
}

/// Axes along which the dot grid is shifted to sit centered in the viewport.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CenterAxes {
    pub x: bool,
    pub y: bool,
}

impl CenterAxes {
    pub const BOTH: Self = Self { x: true, y: true };
    pub const NONE: Self = Self { x: false, y: false };
}

impl Default for CenterAxes {
    fn default() -> Self {
        Self::BOTH
    }
}

/// Logical viewport size reported by the host.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Viewport {
    pub width: f32,
    pub height: f32,
}

impl Viewport {
    pub fn new(width: f32, height: f32) -> Self {
        Self { width, height }
    }

    /// Resolution handed to the program: the grid math works in device
    /// pixels, which are assumed to be twice the logical size.
    pub fn device_resolution(&self) -> [f32; 2] {
        [self.width * 2.0, self.height * 2.0]
    }
}

/// Default opacity ramp of the reveal effect.
pub const DEFAULT_OPACITIES: [f32; OPACITY_STEPS] =
    [0.3, 0.3, 0.3, 0.5, 0.5, 0.5, 0.8, 0.8, 0.8, 1.0];

/// Parameters of one rendering session.
///
/// A config is never mutated once a session is built from it; hosts that
/// want a different look build a new session and swap it in.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderConfig {
    /// One to three base colors.
    pub colors: Vec<ColorRgb>,
    /// Opacity tiers indexed by the per-cell hash.
    pub opacities: Vec<f32>,
    /// Size of one grid cell in pixels.
    pub cell_size: f32,
    /// Size of the square dot carved from each cell.
    pub dot_size: f32,
    /// Speed knob carried from presets. The program keeps a fixed timing factor.
    pub animation_speed: f32,
    /// Collapse toward the center instead of revealing outward.
    pub reverse: bool,
    /// Composite the dark gradient overlay on top of the dots.
    pub show_gradient: bool,
    pub center: CenterAxes,
}

impl RenderConfig {
    /// Backdrop used behind the swap demo: white dots, larger cells of light.
    pub fn swap_backdrop() -> Self {
        Self {
            colors: vec![ColorRgb::WHITE, ColorRgb::WHITE],
            dot_size: 6.0,
            animation_speed: 3.0,
            ..Self::default()
        }
    }

    pub fn with_reverse(mut self, reverse: bool) -> Self {
        self.reverse = reverse;
        self
    }
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            colors: vec![ColorRgb::CYAN],
            opacities: DEFAULT_OPACITIES.to_vec(),
            cell_size: 20.0,
            dot_size: 3.0,
            animation_speed: 10.0,
            reverse: false,
            show_gradient: true,
            center: CenterAxes::BOTH,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_hex_colors() {
        assert_eq!(ColorRgb::from_hex("#00ffff"), Some(ColorRgb::CYAN));
        assert_eq!(ColorRgb::from_hex("FFFFFF"), Some(ColorRgb::WHITE));
        assert_eq!(ColorRgb::from_hex("#0ff"), Some(ColorRgb::CYAN));
        assert_eq!(ColorRgb::from_hex("#12345"), None);
        assert_eq!(ColorRgb::from_hex("#gg0000"), None);
        assert_eq!(ColorRgb::from_hex("+1+2+3"), None);
    }

    #[test]
    fn display_round_trips_through_hex() {
        let color = ColorRgb::new(18, 52, 86);
        assert_eq!(color.to_string(), "#123456");
        assert_eq!(ColorRgb::from_hex(&color.to_string()), Some(color));
    }

    #[test]
    fn device_resolution_doubles_viewport() {
        let viewport = Viewport::new(800.0, 600.0);
        assert_eq!(viewport.device_resolution(), [1600.0, 1200.0]);
    }
}
