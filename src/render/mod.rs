use anyhow::Result;

use crate::annotate::heatmap::{self, residue_color};
use crate::annotate::{FamilyMap, LeafPanel};
use crate::tree::layout::TreeLayout;
use crate::tree::Tree;

/// Plain RGB color shared by every backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Color {
    pub const BLACK: Color = Color::new(0, 0, 0);
    pub const WHITE: Color = Color::new(255, 255, 255);
    pub const LIGHT_GRAY: Color = Color::new(211, 211, 211);

    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    pub fn from_hex(hex: &str) -> Self {
        let (r, g, b) = heatmap::hex_to_rgb(hex);
        Self { r, g, b }
    }

    pub fn to_hex(self) -> String {
        format!("#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Anchor {
    Start,
    Middle,
    End,
}

/// Draw primitives in scene coordinates (pixels, origin top-left).
#[derive(Debug, Clone)]
pub enum Shape {
    Line {
        from: (f32, f32),
        to: (f32, f32),
        width: f32,
        color: Color,
    },
    Rect {
        min: (f32, f32),
        size: (f32, f32),
        fill: Color,
    },
    Text {
        pos: (f32, f32),
        text: String,
        size: f32,
        color: Color,
        anchor: Anchor,
        /// Counter-clockwise rotation around `pos`, in degrees.
        rotation: f32,
    },
}

/// Backend-independent draw list for one annotated tree.
#[derive(Debug, Clone)]
pub struct Scene {
    pub width: f32,
    pub height: f32,
    pub shapes: Vec<Shape>,
}

/// Rendering backend seam: the scene is built once, then handed to the
/// interactive viewer or a vector file writer.
pub trait Renderer {
    fn render(&mut self, scene: &Scene) -> Result<()>;
}

/// Visual knobs for scene building. Node markers default to size 0 (hidden),
/// and support labels default to off, matching the original figures.
#[derive(Debug, Clone)]
pub struct Style {
    pub branch_width: f32,
    pub branch_color: Color,
    pub marker_size: f32,
    pub marker_color: Color,
    pub tip_font_size: f32,
    pub family_font_size: f32,
    pub header_font_size: f32,
    pub support_font_size: f32,
    pub show_support: bool,
    pub row_height: f32,
    pub tree_width: f32,
    pub seq_cell_width: f32,
    pub heat_cell_width: f32,
    pub guiding_lines: bool,
    pub guiding_line_color: Color,
}

impl Default for Style {
    fn default() -> Self {
        Self {
            branch_width: 1.8,
            branch_color: Color::BLACK,
            marker_size: 0.0,
            marker_color: Color::BLACK,
            tip_font_size: 13.0,
            family_font_size: 12.0,
            header_font_size: 12.0,
            support_font_size: 9.0,
            show_support: false,
            row_height: 26.0,
            tree_width: 620.0,
            seq_cell_width: 10.0,
            heat_cell_width: 26.0,
            guiding_lines: true,
            guiding_line_color: Color::LIGHT_GRAY,
        }
    }
}

// Rough proportional-font advance per character, as a fraction of font size.
const CHAR_ADVANCE: f32 = 0.62;

fn text_width(text: &str, font_size: f32) -> f32 {
    text.chars().count() as f32 * font_size * CHAR_ADVANCE
}

/// Assemble the draw list: branches, tip labels, the aligned panel (sequence
/// glyphs or heatmap cells plus rotated column headers), optional family
/// labels, and optional internal support labels.
pub fn build_scene(
    tree: &Tree,
    layout: &TreeLayout,
    panel: Option<&LeafPanel>,
    families: &FamilyMap,
    style: &Style,
) -> Scene {
    let mut shapes = Vec::new();

    let x_scale = style.tree_width / layout.width.max(1e-6);
    let row_h = style.row_height;

    // Rotated column headers need a band above the heatmap.
    let top_pad = match panel {
        Some(LeafPanel::Heatmap(heat)) => {
            let longest = heat
                .header
                .iter()
                .map(|name| text_width(name, style.header_font_size))
                .fold(0.0f32, f32::max);
            longest + 12.0
        }
        _ => 6.0,
    };

    let to_px = |pos: (f32, f32)| -> (f32, f32) {
        (pos.0 * x_scale, top_pad + pos.1 * row_h + row_h * 0.5)
    };

    // Branches.
    for segment in &layout.segments {
        shapes.push(Shape::Line {
            from: to_px(segment.start),
            to: to_px(segment.end),
            width: style.branch_width,
            color: style.branch_color,
        });
    }

    // Node markers (hidden by default).
    if style.marker_size > 0.0 {
        for node in &tree.nodes {
            let (x, y) = to_px(layout.positions[node.id]);
            let half = style.marker_size / 2.0;
            shapes.push(Shape::Rect {
                min: (x - half, y - half),
                size: (style.marker_size, style.marker_size),
                fill: style.marker_color,
            });
        }
    }

    // Support labels on internal branches, off by default.
    if style.show_support {
        for node in &tree.nodes {
            if node.is_leaf() || node.is_root() {
                continue;
            }
            if let Some(label) = &node.name {
                let (x, y) = to_px(layout.positions[node.id]);
                shapes.push(Shape::Text {
                    pos: (x + 3.0, y - row_h * 0.3),
                    text: label.clone(),
                    size: style.support_font_size,
                    color: Color::BLACK,
                    anchor: Anchor::Start,
                    rotation: 0.0,
                });
            }
        }
    }

    // Tip labels, and the widest one decides where the aligned panel starts.
    let mut label_end = style.tree_width;
    for leaf in tree.leaves() {
        let (x, y) = to_px(layout.positions[leaf.id]);
        let name = leaf.name.clone().unwrap_or_default();
        label_end = label_end.max(x + 4.0 + text_width(&name, style.tip_font_size));
        shapes.push(Shape::Text {
            pos: (x + 4.0, y),
            text: name,
            size: style.tip_font_size,
            color: Color::BLACK,
            anchor: Anchor::Start,
            rotation: 0.0,
        });
    }
    let panel_x = label_end + 14.0;

    let mut scene_width = panel_x;
    match panel {
        Some(LeafPanel::Alignment(aln)) => {
            let cell_w = style.seq_cell_width;
            let cell_h = row_h * 0.85;
            let seq_end = panel_x + aln.columns as f32 * cell_w;

            for leaf in tree.leaves() {
                let Some(seq) = aln.rows[leaf.id].as_deref() else {
                    continue;
                };
                let (_, y) = to_px(layout.positions[leaf.id]);

                push_guiding_line(&mut shapes, tree, layout, leaf.id, panel_x, style, to_px);

                for (i, residue) in seq.chars().enumerate() {
                    let x = panel_x + i as f32 * cell_w;
                    shapes.push(Shape::Rect {
                        min: (x, y - cell_h / 2.0),
                        size: (cell_w, cell_h),
                        fill: Color::from_hex(residue_color(residue)),
                    });
                    if residue != '-' && residue != '.' {
                        shapes.push(Shape::Text {
                            pos: (x + cell_w / 2.0, y),
                            text: residue.to_string(),
                            size: cell_w * 0.8,
                            color: Color::BLACK,
                            anchor: Anchor::Middle,
                            rotation: 0.0,
                        });
                    }
                }

                // Family label sits after the sequence block.
                if let Some(label) = family_label(families, leaf.name.as_deref()) {
                    shapes.push(Shape::Text {
                        pos: (seq_end + 10.0, y),
                        text: label.to_string(),
                        size: style.family_font_size,
                        color: Color::BLACK,
                        anchor: Anchor::Start,
                        rotation: 0.0,
                    });
                    scene_width = scene_width
                        .max(seq_end + 10.0 + text_width(label, style.family_font_size));
                }
            }
            scene_width = scene_width.max(seq_end);
        }
        Some(LeafPanel::Heatmap(heat)) => {
            // Family labels come first, then one colored cell per column.
            let family_w = if families.is_empty() {
                0.0
            } else {
                let longest = tree
                    .leaves()
                    .filter_map(|leaf| family_label(families, leaf.name.as_deref()))
                    .map(|label| text_width(label, style.family_font_size))
                    .fold(0.0f32, f32::max);
                longest + 12.0
            };
            let cells_x = panel_x + family_w;
            let cell_w = style.heat_cell_width;
            let cell_h = row_h * 0.85;

            for (i, name) in heat.header.iter().enumerate() {
                shapes.push(Shape::Text {
                    pos: (cells_x + i as f32 * cell_w + cell_w * 0.5, top_pad - 6.0),
                    text: name.clone(),
                    size: style.header_font_size,
                    color: Color::BLACK,
                    anchor: Anchor::Start,
                    rotation: 90.0,
                });
            }

            for leaf in tree.leaves() {
                let Some(values) = heat.rows[leaf.id].as_deref() else {
                    continue;
                };
                let (_, y) = to_px(layout.positions[leaf.id]);

                push_guiding_line(&mut shapes, tree, layout, leaf.id, panel_x, style, to_px);

                if let Some(label) = family_label(families, leaf.name.as_deref()) {
                    shapes.push(Shape::Text {
                        pos: (panel_x, y),
                        text: label.to_string(),
                        size: style.family_font_size,
                        color: Color::BLACK,
                        anchor: Anchor::Start,
                        rotation: 0.0,
                    });
                }

                for (i, &value) in values.iter().enumerate() {
                    shapes.push(Shape::Rect {
                        min: (cells_x + i as f32 * cell_w, y - cell_h / 2.0),
                        size: (cell_w, cell_h),
                        fill: Color::from_hex(&heat.scale.color(value)),
                    });
                }
            }
            scene_width = scene_width.max(cells_x + heat.header.len() as f32 * cell_w);
        }
        None => {}
    }

    Scene {
        width: scene_width + 12.0,
        height: top_pad + layout.leaf_count as f32 * row_h + 6.0,
        shapes,
    }
}

fn family_label<'a>(families: &'a FamilyMap, leaf_name: Option<&str>) -> Option<&'a str> {
    leaf_name.and_then(|name| families.label_for(name))
}

fn push_guiding_line(
    shapes: &mut Vec<Shape>,
    tree: &Tree,
    layout: &TreeLayout,
    leaf_id: crate::tree::NodeId,
    panel_x: f32,
    style: &Style,
    to_px: impl Fn((f32, f32)) -> (f32, f32),
) {
    if !style.guiding_lines {
        return;
    }
    let (x, y) = to_px(layout.positions[leaf_id]);
    let name_w = tree.nodes[leaf_id]
        .name
        .as_deref()
        .map(|name| text_width(name, style.tip_font_size))
        .unwrap_or(0.0);
    let start = x + 8.0 + name_w;
    if start < panel_x - 4.0 {
        shapes.push(Shape::Line {
            from: (start, y),
            to: (panel_x - 4.0, y),
            width: 0.8,
            color: style.guiding_line_color,
        });
    }
}
