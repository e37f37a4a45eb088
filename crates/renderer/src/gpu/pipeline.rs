use anyhow::{anyhow, Result};
use dotmatrix::{DotMatrixError, Overlay, ProgramVariant};

use crate::compile::{
    compile_overlay_fragment, compile_program_fragment, compile_vertex_shader, program_label,
    with_validation,
};

use super::uniforms::DotMatrixUniforms;

/// Dot pass: `src * src_alpha + dst` on premultiplied output.
pub(crate) const DOT_BLENDING: wgpu::BlendState = wgpu::BlendState {
    color: wgpu::BlendComponent {
        src_factor: wgpu::BlendFactor::SrcAlpha,
        dst_factor: wgpu::BlendFactor::One,
        operation: wgpu::BlendOperation::Add,
    },
    alpha: wgpu::BlendComponent {
        src_factor: wgpu::BlendFactor::SrcAlpha,
        dst_factor: wgpu::BlendFactor::One,
        operation: wgpu::BlendOperation::Add,
    },
};

/// Overlay pass: black layers composited over the dots.
pub(crate) const OVERLAY_BLENDING: wgpu::BlendState =
    wgpu::BlendState::PREMULTIPLIED_ALPHA_BLENDING;

/// Layout objects shared by every program and overlay pipeline.
pub(crate) struct PipelineLayouts {
    pub uniform_layout: wgpu::BindGroupLayout,
    pub pipeline_layout: wgpu::PipelineLayout,
    pub vertex_module: wgpu::ShaderModule,
}

impl PipelineLayouts {
    pub fn new(device: &wgpu::Device) -> Result<Self> {
        let uniform_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("dotmatrix uniform layout"),
            entries: &[wgpu::BindGroupLayoutEntry {
                binding: 0,
                visibility: wgpu::ShaderStages::VERTEX_FRAGMENT,
                ty: wgpu::BindingType::Buffer {
                    ty: wgpu::BufferBindingType::Uniform,
                    has_dynamic_offset: false,
                    min_binding_size: wgpu::BufferSize::new(DotMatrixUniforms::size()),
                },
                count: None,
            }],
        });
        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("dotmatrix pipeline layout"),
            bind_group_layouts: &[&uniform_layout],
            push_constant_ranges: &[],
        });

        let vertex_module = with_validation(device, || compile_vertex_shader(device))
            .map_err(|message| anyhow!("vertex shader failed to compile: {message}"))?;

        Ok(Self {
            uniform_layout,
            pipeline_layout,
            vertex_module,
        })
    }
}

/// Builds the pipeline for one program variant.
///
/// Parse and validation failures of the variant come back as
/// [`DotMatrixError::ProgramCompile`].
pub(crate) fn create_program_pipeline(
    device: &wgpu::Device,
    layouts: &PipelineLayouts,
    surface_format: wgpu::TextureFormat,
    variant: ProgramVariant,
) -> Result<wgpu::RenderPipeline, DotMatrixError> {
    let label = program_label(variant);
    with_validation(device, || {
        let fragment = compile_program_fragment(device, variant);
        build_pipeline(
            device,
            layouts,
            surface_format,
            &label,
            &fragment,
            DOT_BLENDING,
        )
    })
    .map_err(|message| DotMatrixError::ProgramCompile { variant, message })
}

/// Builds the pipeline drawing the enabled overlay layers.
pub(crate) fn create_overlay_pipeline(
    device: &wgpu::Device,
    layouts: &PipelineLayouts,
    surface_format: wgpu::TextureFormat,
    layers: Overlay,
) -> Result<wgpu::RenderPipeline> {
    with_validation(device, || {
        let fragment = compile_overlay_fragment(device, layers);
        build_pipeline(
            device,
            layouts,
            surface_format,
            "dotmatrix overlay pipeline",
            &fragment,
            OVERLAY_BLENDING,
        )
    })
    .map_err(|message| anyhow!("overlay program failed to compile: {message}"))
}

fn build_pipeline(
    device: &wgpu::Device,
    layouts: &PipelineLayouts,
    surface_format: wgpu::TextureFormat,
    label: &str,
    fragment_module: &wgpu::ShaderModule,
    blend: wgpu::BlendState,
) -> wgpu::RenderPipeline {
    device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
        label: Some(label),
        layout: Some(&layouts.pipeline_layout),
        vertex: wgpu::VertexState {
            module: &layouts.vertex_module,
            entry_point: Some("main"),
            buffers: &[],
            compilation_options: wgpu::PipelineCompilationOptions::default(),
        },
        primitive: wgpu::PrimitiveState {
            topology: wgpu::PrimitiveTopology::TriangleList,
            strip_index_format: None,
            front_face: wgpu::FrontFace::Ccw,
            cull_mode: None,
            polygon_mode: wgpu::PolygonMode::Fill,
            unclipped_depth: false,
            conservative: false,
        },
        depth_stencil: None,
        multisample: wgpu::MultisampleState::default(),
        fragment: Some(wgpu::FragmentState {
            module: fragment_module,
            entry_point: Some("main"),
            targets: &[Some(wgpu::ColorTargetState {
                format: surface_format,
                blend: Some(blend),
                write_mask: wgpu::ColorWrites::ALL,
            })],
            compilation_options: wgpu::PipelineCompilationOptions::default(),
        }),
        multiview: None,
        cache: None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dot_blend_adds_alpha_weighted_source() {
        for component in [DOT_BLENDING.color, DOT_BLENDING.alpha] {
            assert_eq!(component.src_factor, wgpu::BlendFactor::SrcAlpha);
            assert_eq!(component.dst_factor, wgpu::BlendFactor::One);
            assert_eq!(component.operation, wgpu::BlendOperation::Add);
        }
    }

    #[test]
    fn overlay_blend_is_premultiplied_over() {
        for component in [OVERLAY_BLENDING.color, OVERLAY_BLENDING.alpha] {
            assert_eq!(component.src_factor, wgpu::BlendFactor::One);
            assert_eq!(component.dst_factor, wgpu::BlendFactor::OneMinusSrcAlpha);
            assert_eq!(component.operation, wgpu::BlendOperation::Add);
        }
    }
}
