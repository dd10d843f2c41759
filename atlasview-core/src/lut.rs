//! Color lookup table for label values
//!
//! Every label value gets its own well-separated color by walking the hue
//! circle with the golden ratio. Index 0 is the background and is fully
//! transparent so label slices only paint anatomical structures.

/// Number of table entries
pub const LUT_SIZE: usize = 256;

const GOLDEN_RATIO_CONJUGATE: f64 = 0.6180339887;
const LABEL_ALPHA: f64 = 0.8;

/// RGBA color with components in `[0, 1]`
pub type Rgba = [f64; 4];

/// Immutable 256-entry label color table
#[derive(Debug, Clone, PartialEq)]
pub struct ColorLookupTable {
    table: Vec<Rgba>,
}

impl ColorLookupTable {
    /// Build the table with a distinct color for every label 1..=255
    pub fn new() -> Self {
        let mut table = Vec::with_capacity(LUT_SIZE);
        table.push([0.0, 0.0, 0.0, 0.0]);
        for i in 1..LUT_SIZE {
            let i = i as f64;
            let hue = (i * GOLDEN_RATIO_CONJUGATE) % 1.0;
            let saturation = 0.7 + 0.3 * ((i * 0.382) % 1.0);
            let value = 0.8 + 0.2 * ((i * 0.236) % 1.0);
            let [r, g, b] = hsv_to_rgb(hue, saturation, value);
            table.push([r, g, b, LABEL_ALPHA]);
        }
        Self { table }
    }

    pub fn len(&self) -> usize {
        self.table.len()
    }

    pub fn is_empty(&self) -> bool {
        self.table.is_empty()
    }

    /// Color for a label index, clamped into the table
    pub fn color(&self, index: i64) -> Rgba {
        let idx = index.clamp(0, LUT_SIZE as i64 - 1) as usize;
        self.table[idx]
    }

    /// RGB part of a label color
    pub fn rgb(&self, index: i64) -> [f64; 3] {
        let [r, g, b, _] = self.color(index);
        [r, g, b]
    }

    /// Map a scalar sample to 8-bit RGBA, rounding to the nearest label
    pub fn map_scalar(&self, value: f32) -> [u8; 4] {
        let index = if value.is_finite() {
            value.round() as i64
        } else {
            0
        };
        let rgba = self.color(index);
        rgba.map(|c| (c.clamp(0.0, 1.0) * 255.0).round() as u8)
    }
}

impl Default for ColorLookupTable {
    fn default() -> Self {
        Self::new()
    }
}

/// HSV to RGB conversion with all components in `[0, 1]`
pub fn hsv_to_rgb(h: f64, s: f64, v: f64) -> [f64; 3] {
    if s == 0.0 {
        return [v, v, v];
    }
    let sector = (h * 6.0).floor();
    let f = h * 6.0 - sector;
    let p = v * (1.0 - s);
    let q = v * (1.0 - s * f);
    let t = v * (1.0 - s * (1.0 - f));
    match (sector as i64).rem_euclid(6) {
        0 => [v, t, p],
        1 => [q, v, p],
        2 => [p, v, t],
        3 => [p, q, v],
        4 => [t, p, v],
        _ => [v, p, q],
    }
}
