use tracing::error;

use crate::error::{DotMatrixError, Result};
use crate::types::Viewport;
use crate::uniforms::{DescriptorSet, UniformDescriptor, UniformKind, UniformValue};
use crate::uniforms::{ELAPSED_TIME, RESOLUTION};

/// A uniform ready to hand to the graphics API.
#[derive(Debug, Clone, PartialEq)]
pub struct UniformBinding {
    pub name: String,
    pub value: UniformValue,
}

impl UniformBinding {
    pub fn new(name: impl Into<String>, value: UniformValue) -> Self {
        Self {
            name: name.into(),
            value,
        }
    }

    pub fn kind(&self) -> UniformKind {
        self.value.kind()
    }
}

/// Output of [`marshal`]: the accepted bindings plus the names that were
/// rejected for carrying a value of the wrong kind.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct BindingSet {
    bindings: Vec<UniformBinding>,
    skipped: Vec<String>,
}

impl BindingSet {
    pub fn iter(&self) -> impl Iterator<Item = &UniformBinding> {
        self.bindings.iter()
    }

    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }

    pub fn get(&self, name: &str) -> Option<&UniformValue> {
        self.bindings
            .iter()
            .find(|binding| binding.name == name)
            .map(|binding| &binding.value)
    }

    pub fn float(&self, name: &str) -> Option<f32> {
        match self.get(name)? {
            UniformValue::Float(value) => Some(*value),
            _ => None,
        }
    }

    pub fn resolution(&self) -> Option<[f32; 2]> {
        match self.get(RESOLUTION)? {
            UniformValue::Vec2(value) => Some(*value),
            _ => None,
        }
    }

    pub fn skipped(&self) -> &[String] {
        &self.skipped
    }

    /// Replaces the value of an existing binding. Returns false when no
    /// binding of that name and kind exists.
    pub fn set(&mut self, name: &str, value: UniformValue) -> bool {
        match self
            .bindings
            .iter_mut()
            .find(|binding| binding.name == name && binding.kind() == value.kind())
        {
            Some(binding) => {
                binding.value = value;
                true
            }
            None => false,
        }
    }

    /// All bindings except the driver-owned elapsed time.
    pub fn without_time(&self) -> Vec<&UniformBinding> {
        self.bindings
            .iter()
            .filter(|binding| binding.name != ELAPSED_TIME)
            .collect()
    }
}

/// Converts descriptors into bindings for a viewport.
///
/// Descriptors whose value disagrees with their declared kind are logged and
/// skipped; the remaining uniforms are still produced. `elapsed_time` (0.0)
/// and `resolution` (viewport doubled) are always appended.
pub fn marshal(descriptors: &DescriptorSet, viewport: Viewport) -> BindingSet {
    let mut set = BindingSet::default();
    for (name, descriptor) in descriptors {
        match bind(name, descriptor) {
            Ok(value) => set.bindings.push(UniformBinding::new(name.as_str(), value)),
            Err(err) => {
                error!(uniform = %name, error = %err, "skipping uniform");
                set.skipped.push(name.clone());
            }
        }
    }

    set.bindings
        .push(UniformBinding::new(ELAPSED_TIME, UniformValue::Float(0.0)));
    set.bindings.push(UniformBinding::new(
        RESOLUTION,
        UniformValue::Vec2(viewport.device_resolution()),
    ));
    set
}

fn bind(name: &str, descriptor: &UniformDescriptor) -> Result<UniformValue> {
    let value = match (descriptor.kind, &descriptor.value) {
        (UniformKind::Float, UniformValue::Float(value)) => UniformValue::Float(*value),
        (UniformKind::Int, UniformValue::Int(value)) => UniformValue::Int(*value),
        (UniformKind::Vec2, UniformValue::Vec2(value)) => UniformValue::Vec2(*value),
        (UniformKind::Vec3, UniformValue::Vec3(value)) => UniformValue::Vec3(*value),
        (UniformKind::FloatArray, UniformValue::FloatArray(values)) => {
            UniformValue::FloatArray(values.clone())
        }
        (UniformKind::Vec3Array, UniformValue::Vec3Array(values)) => {
            UniformValue::Vec3Array(values.clone())
        }
        (expected, found) => {
            return Err(DotMatrixError::UnsupportedUniformKind {
                name: name.to_string(),
                expected,
                found: found.kind(),
            })
        }
    };
    Ok(value)
}
