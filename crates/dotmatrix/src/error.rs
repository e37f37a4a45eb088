use crate::program::ProgramVariant;
use crate::uniforms::UniformKind;

/// Failures surfaced while building, marshalling, or compiling an effect.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum DotMatrixError {
    /// Palette or opacity tables with the wrong length. Valid `RenderConfig`
    /// values never produce this.
    #[error("invalid configuration: {0}")]
    Configuration(String),
    /// A descriptor declared one kind but carried a value of another.
    #[error("unsupported uniform kind for '{name}': declared {expected}, found {found}")]
    UnsupportedUniformKind {
        name: String,
        expected: UniformKind,
        found: UniformKind,
    },
    /// The graphics backend rejected a program variant.
    #[error("failed to compile program variant {variant}: {message}")]
    ProgramCompile {
        variant: ProgramVariant,
        message: String,
    },
}

pub type Result<T, E = DotMatrixError> = std::result::Result<T, E>;
