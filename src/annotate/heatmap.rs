/// HLS gradient color mapping for the matrix heatmap, plus the amino-acid
/// palette used by the alignment cells.

pub const DEFAULT_COLOR_SATURATION: f64 = 0.3;
/// Contrast knob for the heatmap. Raise towards 2.0 for count matrices with a
/// large max - min range.
pub const DEFAULT_BASE_LIGHTNESS: f64 = 1.1;
pub const DEFAULT_HUE_UP: f64 = 0.5;
pub const DEFAULT_HUE_DOWN: f64 = 0.2;
pub const DEFAULT_CENTER_COLOR: &str = "#f8f8ff"; // ghostwhite

/// Two-sided color gradient diverging around a center value. Values above the
/// center use `hue_up`, values below use `hue_down`, and the cell gets darker
/// the further the value sits from the center.
#[derive(Debug, Clone)]
pub struct HeatmapScale {
    pub center: f64,
    pub max_magnitude: f64,
    pub hue_up: f64,
    pub hue_down: f64,
    pub center_color: String,
    pub base_lightness: f64,
}

impl HeatmapScale {
    /// Derive the gradient magnitude from the matrix extrema. When the center
    /// sits at or below the minimum only the upper gradient is in play, and
    /// the two magnitudes are summed instead of maxed to keep the denominator
    /// away from zero. Intentional, inherited from the original scaling.
    pub fn new(center: f64, matrix_min: f64, matrix_max: f64, base_lightness: f64) -> Self {
        let up = (center - matrix_max).abs();
        let down = (center - matrix_min).abs();
        let max_magnitude = if center <= matrix_min {
            down + up
        } else {
            up.max(down)
        };

        Self {
            center,
            max_magnitude,
            hue_up: DEFAULT_HUE_UP,
            hue_down: DEFAULT_HUE_DOWN,
            center_color: DEFAULT_CENTER_COLOR.to_string(),
            base_lightness,
        }
    }

    /// Hex color for one matrix value.
    pub fn color(&self, value: f64) -> String {
        if value == self.center {
            return self.center_color.clone();
        }

        let hue = if value > self.center {
            self.hue_up
        } else {
            self.hue_down
        };

        let delta = (self.center - value).abs();
        let lightness = (1.0 - (delta * self.base_lightness) / self.max_magnitude).clamp(0.0, 1.0);
        hls_to_hex(hue, lightness, DEFAULT_COLOR_SATURATION)
    }
}

/// HLS to RGB, all channels in [0, 1].
pub fn hls_to_rgb(h: f64, l: f64, s: f64) -> (f64, f64, f64) {
    if s == 0.0 {
        return (l, l, l);
    }

    let m2 = if l <= 0.5 { l * (1.0 + s) } else { l + s - l * s };
    let m1 = 2.0 * l - m2;

    (
        hue_channel(m1, m2, h + 1.0 / 3.0),
        hue_channel(m1, m2, h),
        hue_channel(m1, m2, h - 1.0 / 3.0),
    )
}

fn hue_channel(m1: f64, m2: f64, hue: f64) -> f64 {
    let hue = hue.rem_euclid(1.0);
    if hue < 1.0 / 6.0 {
        m1 + (m2 - m1) * hue * 6.0
    } else if hue < 0.5 {
        m2
    } else if hue < 2.0 / 3.0 {
        m1 + (m2 - m1) * (2.0 / 3.0 - hue) * 6.0
    } else {
        m1
    }
}

fn hls_to_hex(h: f64, l: f64, s: f64) -> String {
    let (r, g, b) = hls_to_rgb(h, l, s);
    format!(
        "#{:02x}{:02x}{:02x}",
        (r.clamp(0.0, 1.0) * 255.0) as u8,
        (g.clamp(0.0, 1.0) * 255.0) as u8,
        (b.clamp(0.0, 1.0) * 255.0) as u8
    )
}

/// Parse a `#rrggbb` string. Anything malformed comes back black.
pub fn hex_to_rgb(hex: &str) -> (u8, u8, u8) {
    let hex = hex.trim_start_matches('#');
    if hex.len() != 6 {
        return (0, 0, 0);
    }
    let r = u8::from_str_radix(&hex[0..2], 16).unwrap_or(0);
    let g = u8::from_str_radix(&hex[2..4], 16).unwrap_or(0);
    let b = u8::from_str_radix(&hex[4..6], 16).unwrap_or(0);
    (r, g, b)
}

/// Background color for one aligned amino-acid cell, Clustal-like grouping.
pub fn residue_color(residue: char) -> &'static str {
    match residue.to_ascii_uppercase() {
        'A' | 'I' | 'L' | 'M' | 'F' | 'W' | 'V' | 'C' => "#80a0f0", // hydrophobic
        'K' | 'R' => "#f01505",                                     // positive
        'D' | 'E' => "#c048c0",                                     // negative
        'N' | 'Q' | 'S' | 'T' => "#15c015",                         // polar
        'G' => "#f09048",
        'P' => "#c0c000",
        'H' | 'Y' => "#15a4a4", // aromatic
        '-' | '.' => "#ffffff", // gap
        _ => "#c8c8c8",
    }
}
