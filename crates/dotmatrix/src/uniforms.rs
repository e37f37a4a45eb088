//! API-independent description of the program's uniforms.

use std::collections::BTreeMap;
use std::fmt;

use crate::error::{DotMatrixError, Result};
use crate::palette::{self, PALETTE_LEN};
use crate::types::RenderConfig;

/// Number of opacity tiers the program samples from.
pub const OPACITY_STEPS: usize = 10;

pub const COLORS: &str = "colors";
pub const OPACITIES: &str = "opacities";
pub const CELL_SIZE: &str = "cell_size";
pub const DOT_SIZE: &str = "dot_size";
pub const REVERSE_MODE: &str = "reverse_mode";
pub const ELAPSED_TIME: &str = "elapsed_time";
pub const RESOLUTION: &str = "resolution";

/// Shape of a uniform value as the graphics API sees it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UniformKind {
    Float,
    Int,
    Vec2,
    Vec3,
    FloatArray,
    Vec3Array,
}

impl fmt::Display for UniformKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            UniformKind::Float => "float",
            UniformKind::Int => "int",
            UniformKind::Vec2 => "vec2",
            UniformKind::Vec3 => "vec3",
            UniformKind::FloatArray => "float[]",
            UniformKind::Vec3Array => "vec3[]",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum UniformValue {
    Float(f32),
    Int(i32),
    Vec2([f32; 2]),
    Vec3([f32; 3]),
    FloatArray(Vec<f32>),
    Vec3Array(Vec<[f32; 3]>),
}

impl UniformValue {
    pub fn kind(&self) -> UniformKind {
        match self {
            UniformValue::Float(_) => UniformKind::Float,
            UniformValue::Int(_) => UniformKind::Int,
            UniformValue::Vec2(_) => UniformKind::Vec2,
            UniformValue::Vec3(_) => UniformKind::Vec3,
            UniformValue::FloatArray(_) => UniformKind::FloatArray,
            UniformValue::Vec3Array(_) => UniformKind::Vec3Array,
        }
    }
}

/// Declared kind plus the semantic value it should carry.
#[derive(Debug, Clone, PartialEq)]
pub struct UniformDescriptor {
    pub kind: UniformKind,
    pub value: UniformValue,
}

impl UniformDescriptor {
    pub fn new(value: UniformValue) -> Self {
        Self {
            kind: value.kind(),
            value,
        }
    }
}

/// Named uniforms derived from a [`RenderConfig`], ordered by name.
pub type DescriptorSet = BTreeMap<String, UniformDescriptor>;

/// Builds the five configuration uniforms of the program.
///
/// Time and resolution are not part of the set; the marshaller injects them.
pub fn build(config: &RenderConfig) -> Result<DescriptorSet> {
    if config.opacities.len() != OPACITY_STEPS {
        return Err(DotMatrixError::Configuration(format!(
            "opacity curve needs {OPACITY_STEPS} entries, got {}",
            config.opacities.len()
        )));
    }
    let palette = palette::expand(&config.colors);
    if palette.entries().len() != PALETTE_LEN {
        return Err(DotMatrixError::Configuration(format!(
            "palette needs {PALETTE_LEN} entries, got {}",
            palette.entries().len()
        )));
    }

    let entries = [
        (COLORS, UniformValue::Vec3Array(palette.entries().to_vec())),
        (OPACITIES, UniformValue::FloatArray(config.opacities.clone())),
        (CELL_SIZE, UniformValue::Float(config.cell_size)),
        (DOT_SIZE, UniformValue::Float(config.dot_size)),
        (REVERSE_MODE, UniformValue::Int(i32::from(config.reverse))),
    ];
    Ok(entries
        .into_iter()
        .map(|(name, value)| (name.to_string(), UniformDescriptor::new(value)))
        .collect())
}
