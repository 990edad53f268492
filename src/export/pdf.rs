use std::fs::File;
use std::io::BufWriter;
use std::path::{Path, PathBuf};

use anyhow::{anyhow, Context, Result};
use printpdf::path::PaintMode;
use printpdf::{
    BuiltinFont, Color as PdfColor, IndirectFontRef, Line as PdfLine, Mm, PdfDocument,
    PdfLayerReference, Point, Polygon as PdfPolygon, Pt, Rgb, TextMatrix,
};

use crate::render::{Anchor, Color, Renderer, Scene, Shape};

// Scene coordinates are 96 DPI pixels.
const MM_PER_PX: f32 = 25.4 / 96.0;
const PT_PER_PX: f32 = 72.0 / 96.0;

// Helvetica advance approximation, used for anchor adjustment.
const CHAR_WIDTH_FACTOR: f32 = 0.6;

/// Writes a scene to a single-page PDF using the built-in Helvetica face.
pub struct PdfFile {
    path: PathBuf,
    title: String,
}

impl PdfFile {
    pub fn new(path: impl Into<PathBuf>, title: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            title: title.into(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Renderer for PdfFile {
    fn render(&mut self, scene: &Scene) -> Result<()> {
        let width_mm = scene.width * MM_PER_PX;
        let height_mm = scene.height * MM_PER_PX;

        let (doc, page, layer) =
            PdfDocument::new(&self.title, Mm(width_mm), Mm(height_mm), "Layer 1");
        let layer = doc.get_page(page).get_layer(layer);

        let font = doc
            .add_builtin_font(BuiltinFont::Helvetica)
            .map_err(|e| anyhow!("failed to load built-in font: {e}"))?;

        draw_background(&layer, width_mm, height_mm);

        for shape in &scene.shapes {
            match shape {
                Shape::Line {
                    from,
                    to,
                    width,
                    color,
                } => {
                    layer.set_outline_color(pdf_color(*color));
                    layer.set_outline_thickness(width * PT_PER_PX);
                    layer.add_line(PdfLine {
                        points: vec![
                            (pdf_point(*from, scene.height), false),
                            (pdf_point(*to, scene.height), false),
                        ],
                        is_closed: false,
                    });
                }
                Shape::Rect { min, size, fill } => {
                    draw_rect(&layer, *min, *size, *fill, scene.height);
                }
                Shape::Text {
                    pos,
                    text,
                    size,
                    color,
                    anchor,
                    rotation,
                } => {
                    draw_text(
                        &layer,
                        &font,
                        text,
                        *pos,
                        *size,
                        *color,
                        *anchor,
                        *rotation,
                        scene.height,
                    );
                }
            }
        }

        let file = File::create(&self.path)
            .with_context(|| format!("failed to create PDF file: {}", self.path.display()))?;
        doc.save(&mut BufWriter::new(file))
            .map_err(|e| anyhow!("failed to save PDF: {e}"))
    }
}

/// Scene (top-left origin) to PDF (bottom-left origin) coordinates.
fn pdf_point(pos: (f32, f32), scene_height: f32) -> Point {
    Point::new(Mm(pos.0 * MM_PER_PX), Mm((scene_height - pos.1) * MM_PER_PX))
}

fn pdf_color(color: Color) -> PdfColor {
    PdfColor::Rgb(Rgb::new(
        color.r as f32 / 255.0,
        color.g as f32 / 255.0,
        color.b as f32 / 255.0,
        None,
    ))
}

fn draw_background(layer: &PdfLayerReference, width_mm: f32, height_mm: f32) {
    let mut polygon = PdfPolygon::default();
    polygon.mode = PaintMode::Fill;
    polygon.rings.push(vec![
        (Point::new(Mm(0.0), Mm(0.0)), false),
        (Point::new(Mm(width_mm), Mm(0.0)), false),
        (Point::new(Mm(width_mm), Mm(height_mm)), false),
        (Point::new(Mm(0.0), Mm(height_mm)), false),
    ]);

    layer.set_fill_color(PdfColor::Rgb(Rgb::new(1.0, 1.0, 1.0, None)));
    layer.add_polygon(polygon);
}

fn draw_rect(
    layer: &PdfLayerReference,
    min: (f32, f32),
    size: (f32, f32),
    fill: Color,
    scene_height: f32,
) {
    let max = (min.0 + size.0, min.1 + size.1);

    let mut polygon = PdfPolygon::default();
    polygon.mode = PaintMode::Fill;
    polygon.rings.push(vec![
        (pdf_point(min, scene_height), false),
        (pdf_point((max.0, min.1), scene_height), false),
        (pdf_point(max, scene_height), false),
        (pdf_point((min.0, max.1), scene_height), false),
    ]);

    layer.set_fill_color(pdf_color(fill));
    layer.add_polygon(polygon);
}

#[allow(clippy::too_many_arguments)]
fn draw_text(
    layer: &PdfLayerReference,
    font: &IndirectFontRef,
    text: &str,
    pos: (f32, f32),
    size_px: f32,
    color: Color,
    anchor: Anchor,
    rotation: f32,
    scene_height: f32,
) {
    let font_size_pt = size_px * PT_PER_PX;
    let text_width_pt = text.chars().count() as f32 * size_px * CHAR_WIDTH_FACTOR * PT_PER_PX;

    let anchor_shift = match anchor {
        Anchor::Start => 0.0,
        Anchor::Middle => -text_width_pt * 0.5,
        Anchor::End => -text_width_pt,
    };

    let x_pt = pos.0 * PT_PER_PX;
    // Scene text positions name the vertical center of the glyph line.
    let y_pt = (scene_height - pos.1) * PT_PER_PX - font_size_pt * 0.35;

    layer.begin_text_section();
    layer.set_font(font, font_size_pt);
    layer.set_fill_color(pdf_color(color));

    if rotation.abs() > 0.1 {
        // The anchor shift runs along the rotated baseline.
        let angle = rotation.to_radians();
        let shifted_x = x_pt + anchor_shift * angle.cos();
        let shifted_y = y_pt + anchor_shift * angle.sin();
        layer.set_text_matrix(TextMatrix::TranslateRotate(
            Pt(shifted_x),
            Pt(shifted_y),
            rotation,
        ));
    } else {
        layer.set_text_matrix(TextMatrix::Translate(Pt(x_pt + anchor_shift), Pt(y_pt)));
    }

    layer.write_text(text, font);
    layer.end_text_section();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn y_axis_flips_between_scene_and_page() {
        let top = pdf_point((0.0, 0.0), 100.0);
        let bottom = pdf_point((0.0, 100.0), 100.0);
        assert!(top.y > bottom.y);
    }

    #[test]
    fn writes_a_parsable_pdf_header() {
        let dir = std::env::temp_dir().join("phylomap-pdf-test");
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("out.pdf");

        let scene = Scene {
            width: 120.0,
            height: 60.0,
            shapes: vec![
                Shape::Line {
                    from: (0.0, 30.0),
                    to: (50.0, 30.0),
                    width: 1.8,
                    color: Color::BLACK,
                },
                Shape::Rect {
                    min: (60.0, 20.0),
                    size: (20.0, 20.0),
                    fill: Color::new(248, 248, 255),
                },
                Shape::Text {
                    pos: (85.0, 30.0),
                    text: "tipA".to_string(),
                    size: 13.0,
                    color: Color::BLACK,
                    anchor: Anchor::Start,
                    rotation: 0.0,
                },
            ],
        };

        let mut backend = PdfFile::new(&path, "test export");
        backend.render(&scene).unwrap();

        let written = std::fs::read(&path).unwrap();
        assert!(written.starts_with(b"%PDF"));
        std::fs::remove_file(&path).ok();
    }
}
