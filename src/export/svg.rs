use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use svg::node::element::{Line as SvgLine, Rectangle, Text as SvgText};
use svg::Document;

use crate::render::{Anchor, Renderer, Scene, Shape};

/// Writes a scene to an SVG file.
pub struct SvgFile {
    path: PathBuf,
}

impl SvgFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Renderer for SvgFile {
    fn render(&mut self, scene: &Scene) -> Result<()> {
        let document = document_for(scene);
        svg::save(&self.path, &document)
            .with_context(|| format!("failed to save SVG: {}", self.path.display()))
    }
}

pub(crate) fn document_for(scene: &Scene) -> Document {
    let mut document = Document::new()
        .set("width", scene.width)
        .set("height", scene.height)
        .set("viewBox", (0, 0, scene.width as i32, scene.height as i32));

    // White background behind everything.
    let background = Rectangle::new()
        .set("width", "100%")
        .set("height", "100%")
        .set("fill", "white");
    document = document.add(background);

    for shape in &scene.shapes {
        match shape {
            Shape::Line {
                from,
                to,
                width,
                color,
            } => {
                let line = SvgLine::new()
                    .set("x1", from.0)
                    .set("y1", from.1)
                    .set("x2", to.0)
                    .set("y2", to.1)
                    .set("stroke", color.to_hex())
                    .set("stroke-width", *width);
                document = document.add(line);
            }
            Shape::Rect { min, size, fill } => {
                let rect = Rectangle::new()
                    .set("x", min.0)
                    .set("y", min.1)
                    .set("width", size.0)
                    .set("height", size.1)
                    .set("fill", fill.to_hex())
                    .set("stroke", "none");
                document = document.add(rect);
            }
            Shape::Text {
                pos,
                text,
                size,
                color,
                anchor,
                rotation,
            } => {
                let anchor = match anchor {
                    Anchor::Start => "start",
                    Anchor::Middle => "middle",
                    Anchor::End => "end",
                };

                let content = svg::node::Text::new(text.clone());
                let mut element = SvgText::new("")
                    .set("x", pos.0)
                    .set("y", pos.1)
                    .set("font-size", *size)
                    .set("font-family", "Helvetica, Arial, sans-serif")
                    .set("fill", color.to_hex())
                    .set("dominant-baseline", "middle")
                    .set("text-anchor", anchor);

                // Scene rotation is counter-clockwise; the SVG y axis points
                // down, so the sign flips.
                if rotation.abs() > 0.1 {
                    element = element.set(
                        "transform",
                        format!("rotate({} {} {})", -rotation, pos.0, pos.1),
                    );
                }

                document = document.add(element.add(content));
            }
        }
    }

    document
}
