//! Dark overlays composited above the dots by the embedding layer.

use crate::program::params_block;
use crate::types::RenderConfig;

pub const DEFINE_BOTTOM_FADE: &str = "OVERLAY_BOTTOM_FADE";
pub const DEFINE_VIGNETTE: &str = "OVERLAY_VIGNETTE";
pub const DEFINE_TOP_FADE: &str = "OVERLAY_TOP_FADE";

/// Peak opacity of the radial vignette at the viewport center.
pub const VIGNETTE_STRENGTH: f32 = 0.8;
/// Fraction of the viewport height covered by the top fade.
pub const TOP_FADE_EXTENT: f32 = 1.0 / 3.0;

/// Which black overlay layers to draw, bottom-most first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Overlay {
    /// Opaque at the bottom edge, transparent at the top.
    pub bottom_fade: bool,
    /// Radial darkening from the center out to the corners.
    pub vignette: bool,
    /// Opaque at the top edge, transparent a third of the way down.
    pub top_fade: bool,
}

impl Overlay {
    pub fn for_config(config: &RenderConfig) -> Self {
        Self {
            bottom_fade: config.show_gradient,
            ..Self::default()
        }
    }

    pub fn with_vignette(mut self, enabled: bool) -> Self {
        self.vignette = enabled;
        self
    }

    pub fn with_top_fade(mut self, enabled: bool) -> Self {
        self.top_fade = enabled;
        self
    }

    pub fn is_empty(&self) -> bool {
        !(self.bottom_fade || self.vignette || self.top_fade)
    }

    pub fn defines(&self) -> Vec<(&'static str, &'static str)> {
        [
            (self.bottom_fade, DEFINE_BOTTOM_FADE),
            (self.vignette, DEFINE_VIGNETTE),
            (self.top_fade, DEFINE_TOP_FADE),
        ]
        .into_iter()
        .filter(|(enabled, _)| *enabled)
        .map(|(_, define)| (define, "1"))
        .collect()
    }

    /// Fraction of the underlying color that survives at `frag_coord`.
    pub fn transmittance(&self, frag_coord: [f32; 2], resolution: [f32; 2]) -> f32 {
        let [width, height] = [resolution[0].max(1.0), resolution[1].max(1.0)];
        let v = frag_coord[1] / height;
        let mut keep = 1.0;
        if self.bottom_fade {
            keep *= 1.0 - v.clamp(0.0, 1.0);
        }
        if self.vignette {
            let half = [width * 0.5, height * 0.5];
            let radius = (half[0] * half[0] + half[1] * half[1]).sqrt();
            let dx = frag_coord[0] - half[0];
            let dy = frag_coord[1] - half[1];
            let falloff = (1.0 - (dx * dx + dy * dy).sqrt() / radius).clamp(0.0, 1.0);
            keep *= 1.0 - VIGNETTE_STRENGTH * falloff;
        }
        if self.top_fade {
            keep *= 1.0 - (1.0 - v / TOP_FADE_EXTENT).clamp(0.0, 1.0);
        }
        keep
    }

    /// Composites the black overlay over a premultiplied color.
    pub fn composite(&self, rgba: [f32; 4], frag_coord: [f32; 2], resolution: [f32; 2]) -> [f32; 4] {
        if self.is_empty() {
            return rgba;
        }
        let keep = self.transmittance(frag_coord, resolution);
        let [r, g, b, a] = rgba;
        [r * keep, g * keep, b * keep, 1.0 - (1.0 - a) * keep]
    }
}

/// Overlay fragment program sharing the dot-matrix vertex stage and uniforms.
pub const FRAGMENT_GLSL: &str = concat!(
    "#version 450\n",
    params_block!(),
    r"layout(location = 0) in vec2 v_frag_coord;
layout(location = 0) out vec4 out_color;

void main() {
    vec2 size = max(params.resolution, vec2(1.0));
    float v = v_frag_coord.y / size.y;
    float keep = 1.0;
#ifdef OVERLAY_BOTTOM_FADE
    keep *= 1.0 - clamp(v, 0.0, 1.0);
#endif
#ifdef OVERLAY_VIGNETTE
    vec2 half_size = size * 0.5;
    float falloff = clamp(1.0 - distance(v_frag_coord, half_size) / length(half_size), 0.0, 1.0);
    keep *= 1.0 - 0.8 * falloff;
#endif
#ifdef OVERLAY_TOP_FADE
    keep *= 1.0 - clamp(1.0 - v * 3.0, 0.0, 1.0);
#endif
    out_color = vec4(0.0, 0.0, 0.0, 1.0 - keep);
}
"
);
