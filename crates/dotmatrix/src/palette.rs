use crate::types::ColorRgb;

/// Number of entries the shading program indexes into.
pub const PALETTE_LEN: usize = 6;

/// Normalized color table consumed by the shading program.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PaletteTable {
    entries: [[f32; 3]; PALETTE_LEN],
}

impl PaletteTable {
    pub fn entries(&self) -> &[[f32; 3]; PALETTE_LEN] {
        &self.entries
    }

    pub fn get(&self, index: usize) -> [f32; 3] {
        self.entries[index.min(PALETTE_LEN - 1)]
    }
}

/// Expands one to three base colors into the six-slot table.
///
/// * one color fills every slot
/// * two colors split the table in halves (`AAABBB`)
/// * three colors take two slots each (`AABBCC`)
///
/// Any other length falls back to the single-color rule using the first
/// entry; an empty slice renders black.
pub fn expand(colors: &[ColorRgb]) -> PaletteTable {
    let first = colors.first().copied().unwrap_or(ColorRgb::BLACK);
    let slots: [ColorRgb; PALETTE_LEN] = match colors {
        [a, b] => [*a, *a, *a, *b, *b, *b],
        [a, b, c] => [*a, *a, *b, *b, *c, *c],
        _ => [first; PALETTE_LEN],
    };
    PaletteTable {
        entries: slots.map(ColorRgb::normalized),
    }
}
