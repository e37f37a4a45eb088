//! The dot-matrix shading program.
//!
//! The program exists twice: as GLSL compiled by the GPU backend and as a CPU
//! evaluator used for still frames and tests. Both follow the same steps:
//!
//! ```text
//!   frag coord ─▶ center ─▶ edge clamp ─▶ cell index ─▶ hash
//!        ─▶ opacity tier × dot mask × reveal gate ─▶ premultiplied rgba
//! ```
//!
//! Axis centering and the reveal direction are baked into one of eight
//! [`ProgramVariant`]s through preprocessor defines, so a configuration change
//! selects a variant rather than generating new source text.

use std::fmt;

use crate::error::{DotMatrixError, Result};
use crate::marshal::BindingSet;
use crate::palette::PALETTE_LEN;
use crate::types::RenderConfig;
use crate::uniforms::{
    UniformValue, CELL_SIZE, COLORS, DOT_SIZE, ELAPSED_TIME, OPACITIES, OPACITY_STEPS,
    RESOLUTION, REVERSE_MODE,
};

/// Golden ratio used by the cell hash.
pub const PHI: f32 = 1.618_034;
/// Time units between opacity re-rolls of a cell.
pub const FREQUENCY: f32 = 5.0;
/// Scale from elapsed seconds to reveal phase.
pub const TIMING_FACTOR: f32 = 0.5;
/// Duration (in phase units) of the flash after a cell switches on.
pub const POP_DURATION: f32 = 0.1;
/// Opacity multiplier during the flash.
pub const POP_BOOST: f32 = 1.25;

pub const DEFINE_CENTER_X: &str = "DOTMATRIX_CENTER_X";
pub const DEFINE_CENTER_Y: &str = "DOTMATRIX_CENTER_Y";
pub const DEFINE_REVERSE: &str = "DOTMATRIX_REVERSE";

/// Compile-time flavour of the program.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct ProgramVariant {
    pub center_x: bool,
    pub center_y: bool,
    pub reverse: bool,
}

impl ProgramVariant {
    /// Every variant, in define-bit order.
    pub const ALL: [ProgramVariant; 8] = {
        let mut all = [ProgramVariant {
            center_x: false,
            center_y: false,
            reverse: false,
        }; 8];
        let mut bits = 0;
        while bits < 8 {
            all[bits] = ProgramVariant {
                center_x: bits & 1 != 0,
                center_y: bits & 2 != 0,
                reverse: bits & 4 != 0,
            };
            bits += 1;
        }
        all
    };

    pub fn for_config(config: &RenderConfig) -> Self {
        Self {
            center_x: config.center.x,
            center_y: config.center.y,
            reverse: config.reverse,
        }
    }

    /// Preprocessor defines selecting this variant's branches.
    pub fn defines(&self) -> Vec<(&'static str, &'static str)> {
        let mut defines = Vec::with_capacity(3);
        if self.center_x {
            defines.push((DEFINE_CENTER_X, "1"));
        }
        if self.center_y {
            defines.push((DEFINE_CENTER_Y, "1"));
        }
        if self.reverse {
            defines.push((DEFINE_REVERSE, "1"));
        }
        defines
    }
}

impl fmt::Display for ProgramVariant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let axes = match (self.center_x, self.center_y) {
            (true, true) => "xy",
            (true, false) => "x",
            (false, true) => "y",
            (false, false) => "none",
        };
        let direction = if self.reverse { "collapse" } else { "reveal" };
        write!(f, "center-{axes}/{direction}")
    }
}

/// Uniform values in the shape the evaluator consumes.
#[derive(Debug, Clone, PartialEq)]
pub struct ProgramInputs {
    pub colors: [[f32; 3]; PALETTE_LEN],
    pub opacities: [f32; OPACITY_STEPS],
    pub cell_size: f32,
    pub dot_size: f32,
    pub elapsed_time: f32,
    pub reverse_mode: bool,
    pub resolution: [f32; 2],
}

impl ProgramInputs {
    /// Extracts the program inputs from marshalled bindings.
    pub fn from_bindings(bindings: &BindingSet) -> Result<Self> {
        let colors = match bindings.get(COLORS) {
            Some(UniformValue::Vec3Array(values)) => fixed::<[f32; 3], PALETTE_LEN>(values),
            _ => None,
        }
        .ok_or_else(|| missing(COLORS))?;
        let opacities = match bindings.get(OPACITIES) {
            Some(UniformValue::FloatArray(values)) => fixed::<f32, OPACITY_STEPS>(values),
            _ => None,
        }
        .ok_or_else(|| missing(OPACITIES))?;
        let reverse_mode = match bindings.get(REVERSE_MODE) {
            Some(UniformValue::Int(value)) => *value != 0,
            _ => return Err(missing(REVERSE_MODE)),
        };

        Ok(Self {
            colors,
            opacities,
            cell_size: bindings.float(CELL_SIZE).ok_or_else(|| missing(CELL_SIZE))?,
            dot_size: bindings.float(DOT_SIZE).ok_or_else(|| missing(DOT_SIZE))?,
            elapsed_time: bindings
                .float(ELAPSED_TIME)
                .ok_or_else(|| missing(ELAPSED_TIME))?,
            reverse_mode,
            resolution: bindings.resolution().ok_or_else(|| missing(RESOLUTION))?,
        })
    }
}

fn fixed<T: Copy, const N: usize>(values: &[T]) -> Option<[T; N]> {
    values.try_into().ok()
}

fn missing(name: &str) -> DotMatrixError {
    DotMatrixError::Configuration(format!("binding '{name}' is missing or malformed"))
}

/// Intermediate results of one fragment, exposed for inspection.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ShadedFragment {
    pub cell: [f32; 2],
    pub color_index: usize,
    pub opacity_index: usize,
    /// 1.0 inside the dot, 0.0 elsewhere.
    pub mask: f32,
    /// Reveal/collapse multiplier (0, 1, or the pop boost).
    pub gate: f32,
    pub opacity: f32,
    /// Premultiplied color.
    pub rgba: [f32; 4],
}

/// GLSL `fract`.
pub fn fract(x: f32) -> f32 {
    x - x.floor()
}

/// GLSL `mod`.
pub fn glsl_mod(x: f32, y: f32) -> f32 {
    x - y * (x / y).floor()
}

/// GLSL `step`.
pub fn step(edge: f32, x: f32) -> f32 {
    if x < edge {
        0.0
    } else {
        1.0
    }
}

fn distance(a: [f32; 2], b: [f32; 2]) -> f32 {
    let dx = a[0] - b[0];
    let dy = a[1] - b[1];
    (dx * dx + dy * dy).sqrt()
}

/// Non-cryptographic hash in `[0, 1)` for finite inputs.
pub fn random(p: [f32; 2]) -> f32 {
    let scaled = [p[0] * PHI, p[1] * PHI];
    fract((distance(scaled, p) * 0.5).tan() * p[0])
}

/// Shift applied to one axis so the grid sits centered in the viewport.
pub fn centering_offset(resolution: f32, cell_size: f32, dot_size: f32) -> f32 {
    ((glsl_mod(resolution, cell_size) - dot_size) * 0.5).floor().abs()
}

/// 1.0 when the position inside the cell lies within the dot on both axes.
pub fn dot_mask(st: [f32; 2], cell_size: f32, dot_size: f32) -> f32 {
    let ratio = dot_size / cell_size;
    (1.0 - step(ratio, fract(st[0] / cell_size))) * (1.0 - step(ratio, fract(st[1] / cell_size)))
}

/// Delay before a cell switches on when revealing outward from the center.
pub fn intro_offset(dist_from_center: f32, show_offset: f32) -> f32 {
    dist_from_center * 0.01 + show_offset * 0.15
}

/// Delay before a cell switches off when collapsing toward the center.
pub fn outro_offset(max_dist: f32, dist_from_center: f32, cell: [f32; 2]) -> f32 {
    (max_dist - dist_from_center) * 0.02 + random([cell[0] + 42.0, cell[1] + 42.0]) * 0.2
}

/// Opacity multiplier for a cell whose threshold is `offset` at `phase`.
pub fn timing_gate(offset: f32, phase: f32, reverse: bool) -> f32 {
    if reverse {
        (1.0 - step(offset, phase))
            * (step(offset + POP_DURATION, phase) * POP_BOOST).clamp(1.0, POP_BOOST)
    } else {
        step(offset, phase)
            * ((1.0 - step(offset + POP_DURATION, phase)) * POP_BOOST).clamp(1.0, POP_BOOST)
    }
}

fn table_index(value: f32, len: usize) -> usize {
    // Saturating cast: NaN becomes 0, infinities saturate.
    ((value * len as f32) as i64).clamp(0, len as i64 - 1) as usize
}

/// Runs the program for one fragment in device pixels (origin top-left).
pub fn shade(variant: ProgramVariant, inputs: &ProgramInputs, frag_coord: [f32; 2]) -> ShadedFragment {
    let cell_size = inputs.cell_size;
    let [res_x, res_y] = inputs.resolution;
    let mut st = frag_coord;
    if variant.center_x {
        st[0] -= centering_offset(res_x, cell_size, inputs.dot_size);
    }
    if variant.center_y {
        st[1] -= centering_offset(res_y, cell_size, inputs.dot_size);
    }

    let edge = step(0.0, st[0]) * step(0.0, st[1]);
    let cell = [(st[0] / cell_size).floor(), (st[1] / cell_size).floor()];

    let show_offset = random(cell);
    let epoch = (inputs.elapsed_time / FREQUENCY + show_offset + FREQUENCY).floor();
    let rand = random([cell[0] * epoch, cell[1] * epoch]);
    let opacity_index = table_index(rand, OPACITY_STEPS);
    let mask = dot_mask(st, cell_size, inputs.dot_size);
    let color_index = table_index(show_offset, PALETTE_LEN);

    let center = [res_x / 2.0 / cell_size, res_y / 2.0 / cell_size];
    let dist = distance(center, cell);
    let phase = inputs.elapsed_time * TIMING_FACTOR;
    let offset = if variant.reverse {
        outro_offset(distance(center, [0.0, 0.0]), dist, cell)
    } else {
        intro_offset(dist, show_offset)
    };
    let gate = timing_gate(offset, phase, variant.reverse);

    let opacity = edge * inputs.opacities[opacity_index] * mask * gate;
    let [r, g, b] = inputs.colors[color_index];
    ShadedFragment {
        cell,
        color_index,
        opacity_index,
        mask,
        gate,
        opacity,
        rgba: [r * opacity, g * opacity, b * opacity, opacity],
    }
}

macro_rules! params_block {
    () => {
        r"layout(std140, set = 0, binding = 0) uniform DotMatrixParams {
    vec4 colors[6];
    vec4 opacities[10];
    float cell_size;
    float dot_size;
    float elapsed_time;
    int reverse_mode;
    vec2 resolution;
    vec2 padding;
} params;
"
    };
}

pub(crate) use params_block;

/// Full-screen triangle that forwards device-pixel coordinates (origin
/// top-left) spanning the `resolution` uniform.
pub const VERTEX_GLSL: &str = concat!(
    "#version 450\n",
    params_block!(),
    r"layout(location = 0) out vec2 v_frag_coord;

const vec2 positions[3] = vec2[3](
    vec2(-1.0, -3.0),
    vec2(3.0, 1.0),
    vec2(-1.0, 1.0)
);

void main() {
    uint vertex_index = uint(gl_VertexIndex);
    vec2 pos = positions[vertex_index];
    vec2 uv = pos * 0.5 + vec2(0.5, 0.5);
    v_frag_coord = vec2(uv.x, 1.0 - uv.y) * params.resolution;
    gl_Position = vec4(pos, 0.0, 1.0);
}
"
);

/// Fragment program; branches are selected by [`ProgramVariant::defines`].
pub const FRAGMENT_GLSL: &str = concat!(
    "#version 450\n",
    params_block!(),
    r"layout(location = 0) in vec2 v_frag_coord;
layout(location = 0) out vec4 out_color;

const float PHI = 1.61803398874989484820459;
const float FREQUENCY = 5.0;
const float TIMING_FACTOR = 0.5;

float random(vec2 xy) {
    return fract(tan(distance(xy * PHI, xy) * 0.5) * xy.x);
}

void main() {
    vec2 st = v_frag_coord;
#ifdef DOTMATRIX_CENTER_X
    st.x -= abs(floor((mod(params.resolution.x, params.cell_size) - params.dot_size) * 0.5));
#endif
#ifdef DOTMATRIX_CENTER_Y
    st.y -= abs(floor((mod(params.resolution.y, params.cell_size) - params.dot_size) * 0.5));
#endif

    float opacity = step(0.0, st.x) * step(0.0, st.y);
    vec2 cell = floor(st / params.cell_size);

    float show_offset = random(cell);
    float rand = random(cell * floor(params.elapsed_time / FREQUENCY + show_offset + FREQUENCY));
    opacity *= params.opacities[clamp(int(rand * 10.0), 0, 9)].x;

    float dot_ratio = params.dot_size / params.cell_size;
    opacity *= 1.0 - step(dot_ratio, fract(st.x / params.cell_size));
    opacity *= 1.0 - step(dot_ratio, fract(st.y / params.cell_size));

    vec3 color = params.colors[clamp(int(show_offset * 6.0), 0, 5)].rgb;

    vec2 center_grid = params.resolution / 2.0 / params.cell_size;
    float dist_from_center = distance(center_grid, cell);
    float phase = params.elapsed_time * TIMING_FACTOR;
#ifdef DOTMATRIX_REVERSE
    float max_grid_dist = distance(center_grid, vec2(0.0, 0.0));
    float offset = (max_grid_dist - dist_from_center) * 0.02 + random(cell + 42.0) * 0.2;
    opacity *= 1.0 - step(offset, phase);
    opacity *= clamp(step(offset + 0.1, phase) * 1.25, 1.0, 1.25);
#else
    float offset = dist_from_center * 0.01 + show_offset * 0.15;
    opacity *= step(offset, phase);
    opacity *= clamp((1.0 - step(offset + 0.1, phase)) * 1.25, 1.0, 1.25);
#endif

    out_color = vec4(color * opacity, opacity);
}
"
);

#[cfg(test)]
mod tests {
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    use super::*;
    use crate::marshal::marshal;
    use crate::types::Viewport;
    use crate::uniforms;

    fn inputs(config: &RenderConfig, viewport: Viewport, time: f32) -> ProgramInputs {
        let mut bindings = marshal(&uniforms::build(config).unwrap(), viewport);
        bindings.set(ELAPSED_TIME, UniformValue::Float(time));
        ProgramInputs::from_bindings(&bindings).unwrap()
    }

    #[test]
    fn variants_cover_every_flag_combination() {
        let mut seen = std::collections::HashSet::new();
        for variant in ProgramVariant::ALL {
            assert!(seen.insert(variant));
        }
        assert_eq!(seen.len(), 8);
        let config = RenderConfig::default();
        assert!(ProgramVariant::ALL.contains(&ProgramVariant::for_config(&config)));
    }

    #[test]
    fn defines_follow_flags() {
        let variant = ProgramVariant {
            center_x: true,
            center_y: false,
            reverse: true,
        };
        assert_eq!(
            variant.defines(),
            vec![(DEFINE_CENTER_X, "1"), (DEFINE_REVERSE, "1")]
        );
        assert!(ProgramVariant::default().defines().is_empty());
        assert_eq!(variant.to_string(), "center-x/collapse");
    }

    #[test]
    fn glsl_sources_reference_every_define_and_uniform() {
        for define in [DEFINE_CENTER_X, DEFINE_CENTER_Y, DEFINE_REVERSE] {
            assert!(FRAGMENT_GLSL.contains(define));
        }
        for name in [COLORS, OPACITIES, CELL_SIZE, DOT_SIZE, ELAPSED_TIME, RESOLUTION] {
            assert!(FRAGMENT_GLSL.contains(&format!("params.{name}")), "{name}");
        }
        assert!(VERTEX_GLSL.contains("uniform DotMatrixParams"));
    }

    #[test]
    fn hash_of_origin_is_zero() {
        assert_eq!(random([0.0, 0.0]), 0.0);
        assert_eq!(random([0.0, 7.0]), 0.0);
    }

    #[test]
    fn hash_stays_in_unit_interval() {
        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..2_000 {
            let p = [rng.gen_range(0.0..200.0f32).floor(), rng.gen_range(0.0..200.0f32).floor()];
            let value = random(p);
            if value.is_finite() {
                assert!((0.0..=1.0).contains(&value), "{p:?} -> {value}");
            }
        }
    }

    #[test]
    fn centering_offset_is_never_negative() {
        let mut rng = StdRng::seed_from_u64(42);
        for _ in 0..5_000 {
            let resolution = rng.gen_range(1.0..8_000.0f32).floor();
            let cell = rng.gen_range(1.0..64.0f32).floor();
            let dot = rng.gen_range(0.0..=cell);
            assert!(centering_offset(resolution, cell, dot) >= 0.0);
        }
    }

    #[test]
    fn centering_offset_matches_remainder() {
        // 1600 mod 20 = 0, minus a 2px dot, halved: |-1| = 1.
        assert_eq!(centering_offset(1600.0, 20.0, 2.0), 1.0);
        // 1610 mod 20 = 10, minus 2, halved: 4.
        assert_eq!(centering_offset(1610.0, 20.0, 2.0), 4.0);
    }

    #[test]
    fn dot_mask_cuts_at_dot_ratio() {
        // 2 / 20 = 0.1 of each cell is lit.
        assert_eq!(dot_mask([1.0, 1.0], 20.0, 2.0), 1.0);
        assert_eq!(dot_mask([1.9, 0.5], 20.0, 2.0), 1.0);
        assert_eq!(dot_mask([2.0, 1.0], 20.0, 2.0), 0.0);
        assert_eq!(dot_mask([1.0, 2.5], 20.0, 2.0), 0.0);
        assert_eq!(dot_mask([41.0, 61.5], 20.0, 2.0), 1.0);
        assert_eq!(dot_mask([45.0, 61.5], 20.0, 2.0), 0.0);
    }

    #[test]
    fn forward_gate_flashes_then_settles() {
        assert_eq!(timing_gate(0.5, 0.4, false), 0.0);
        assert_eq!(timing_gate(0.5, 0.5, false), POP_BOOST);
        assert_eq!(timing_gate(0.5, 0.55, false), POP_BOOST);
        assert_eq!(timing_gate(0.5, 0.7, false), 1.0);
    }

    #[test]
    fn reverse_gate_turns_cells_off() {
        assert_eq!(timing_gate(0.5, 0.4, true), 1.0);
        assert_eq!(timing_gate(0.5, 0.55, true), 0.0);
        assert_eq!(timing_gate(0.5, 5.0, true), 0.0);
    }

    #[test]
    fn negative_coordinates_are_transparent() {
        let config = RenderConfig::default();
        let inputs = inputs(&config, Viewport::new(400.0, 300.0), 100.0);
        let variant = ProgramVariant::for_config(&config);
        let offset = centering_offset(inputs.resolution[0], inputs.cell_size, inputs.dot_size);
        assert!(offset > 0.0);
        let fragment = shade(variant, &inputs, [offset - 0.5, 10.5]);
        assert_eq!(fragment.opacity, 0.0);
        assert_eq!(fragment.rgba, [0.0; 4]);
    }

    #[test]
    fn reverse_changes_timing_only() {
        let forward = RenderConfig::default();
        let reverse = RenderConfig::default().with_reverse(true);
        let viewport = Viewport::new(160.0, 120.0);
        let mut gates_differ = false;
        for time in [0.0f32, 0.4, 1.3, 2.2, 50.0] {
            let a = inputs(&forward, viewport, time);
            let b = inputs(&reverse, viewport, time);
            for y in (0..240).step_by(3) {
                for x in (0..320).step_by(3) {
                    let frag = [x as f32 + 0.5, y as f32 + 0.5];
                    let fa = shade(ProgramVariant::for_config(&forward), &a, frag);
                    let fb = shade(ProgramVariant::for_config(&reverse), &b, frag);
                    assert_eq!(fa.color_index, fb.color_index);
                    assert_eq!(fa.mask, fb.mask);
                    assert_eq!(fa.opacity_index, fb.opacity_index);
                    gates_differ |= fa.gate != fb.gate;
                }
            }
        }
        assert!(gates_differ);
    }

    #[test]
    fn reveal_ends_lit_and_collapse_ends_dark() {
        let viewport = Viewport::new(160.0, 120.0);
        let forward = RenderConfig::default();
        let reverse = RenderConfig::default().with_reverse(true);
        let a = inputs(&forward, viewport, 100.0);
        let b = inputs(&reverse, viewport, 100.0);
        let mut lit = 0;
        for y in 0..240 {
            for x in 0..320 {
                let frag = [x as f32 + 0.5, y as f32 + 0.5];
                let fa = shade(ProgramVariant::for_config(&forward), &a, frag);
                let fb = shade(ProgramVariant::for_config(&reverse), &b, frag);
                if fa.opacity > 0.0 {
                    lit += 1;
                }
                assert_eq!(fb.opacity, 0.0);
            }
        }
        assert!(lit > 0);
    }

    #[test]
    fn output_is_premultiplied() {
        let config = RenderConfig {
            colors: vec![crate::types::ColorRgb::new(255, 128, 0)],
            ..RenderConfig::default()
        };
        let inputs = inputs(&config, Viewport::new(160.0, 120.0), 100.0);
        let variant = ProgramVariant::for_config(&config);
        let mut checked = 0;
        for y in 0..240 {
            for x in 0..320 {
                let fragment = shade(variant, &inputs, [x as f32 + 0.5, y as f32 + 0.5]);
                let [r, g, b, a] = fragment.rgba;
                assert!((r - a).abs() < 1e-6);
                assert!((g - a * 128.0 / 255.0).abs() < 1e-6);
                assert_eq!(b, 0.0);
                if a > 0.0 {
                    checked += 1;
                }
            }
        }
        assert!(checked > 0);
    }

    #[test]
    fn inputs_require_every_binding() {
        let bindings = marshal(&uniforms::DescriptorSet::new(), Viewport::new(1.0, 1.0));
        assert!(matches!(
            ProgramInputs::from_bindings(&bindings),
            Err(DotMatrixError::Configuration(_))
        ));
    }
}
