use bytemuck::{Pod, Zeroable};
use dotmatrix::palette::PALETTE_LEN;
use dotmatrix::uniforms::OPACITY_STEPS;
use dotmatrix::ProgramInputs;

/// Host mirror of the `DotMatrixParams` std140 block.
///
/// Array elements are padded to 16 bytes: colors use `.xyz`, opacities `.x`.
#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, Pod, Zeroable)]
pub(crate) struct DotMatrixUniforms {
    pub colors: [[f32; 4]; PALETTE_LEN],
    pub opacities: [[f32; 4]; OPACITY_STEPS],
    pub cell_size: f32,
    pub dot_size: f32,
    pub elapsed_time: f32,
    pub reverse_mode: i32,
    pub resolution: [f32; 2],
    pub padding: [f32; 2],
}

impl DotMatrixUniforms {
    pub fn from_inputs(inputs: &ProgramInputs) -> Self {
        let mut uniforms = Self::zeroed();
        for (slot, color) in uniforms.colors.iter_mut().zip(inputs.colors.iter()) {
            *slot = [color[0], color[1], color[2], 0.0];
        }
        for (slot, opacity) in uniforms.opacities.iter_mut().zip(inputs.opacities.iter()) {
            slot[0] = *opacity;
        }
        uniforms.cell_size = inputs.cell_size;
        uniforms.dot_size = inputs.dot_size;
        uniforms.elapsed_time = inputs.elapsed_time;
        uniforms.reverse_mode = i32::from(inputs.reverse_mode);
        uniforms.resolution = inputs.resolution;
        uniforms
    }

    pub fn size() -> u64 {
        std::mem::size_of::<Self>() as u64
    }
}
