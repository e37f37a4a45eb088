use std::borrow::Cow;

use dotmatrix::{overlay, program, Overlay, ProgramVariant};
use wgpu::naga::ShaderStage;

/// Compiles the full-screen triangle vertex shader shared by every pass.
pub(crate) fn compile_vertex_shader(device: &wgpu::Device) -> wgpu::ShaderModule {
    glsl_module(
        device,
        "dotmatrix vertex",
        program::VERTEX_GLSL,
        ShaderStage::Vertex,
        &[],
    )
}

/// Compiles the dot-matrix fragment program with the variant's branches enabled.
pub(crate) fn compile_program_fragment(
    device: &wgpu::Device,
    variant: ProgramVariant,
) -> wgpu::ShaderModule {
    let defines = variant.defines();
    glsl_module(
        device,
        &program_label(variant),
        program::FRAGMENT_GLSL,
        ShaderStage::Fragment,
        &defines,
    )
}

/// Compiles the overlay fragment program with the requested layers enabled.
pub(crate) fn compile_overlay_fragment(
    device: &wgpu::Device,
    layers: Overlay,
) -> wgpu::ShaderModule {
    let defines = layers.defines();
    glsl_module(
        device,
        "dotmatrix overlay fragment",
        overlay::FRAGMENT_GLSL,
        ShaderStage::Fragment,
        &defines,
    )
}

/// Runs `build` inside a validation error scope.
///
/// naga reports GLSL parse and validation failures through the device error
/// sink rather than a return value; the scope turns them into an `Err`.
pub(crate) fn with_validation<T>(
    device: &wgpu::Device,
    build: impl FnOnce() -> T,
) -> Result<T, String> {
    device.push_error_scope(wgpu::ErrorFilter::Validation);
    let value = build();
    match pollster::block_on(device.pop_error_scope()) {
        Some(err) => Err(err.to_string()),
        None => Ok(value),
    }
}

pub(crate) fn program_label(variant: ProgramVariant) -> String {
    format!("dotmatrix fragment ({variant})")
}

fn glsl_module(
    device: &wgpu::Device,
    label: &str,
    source: &'static str,
    stage: ShaderStage,
    defines: &[(&str, &str)],
) -> wgpu::ShaderModule {
    tracing::trace!(label, ?stage, ?defines, "compiling GLSL module");
    device.create_shader_module(wgpu::ShaderModuleDescriptor {
        label: Some(label),
        source: wgpu::ShaderSource::Glsl {
            shader: Cow::Borrowed(source),
            stage,
            defines,
        },
    })
}
