use anyhow::{anyhow, Result};
use eframe::egui::{self, Align2, Color32, FontId, Pos2, Rect, Sense, Stroke, Vec2};

use crate::render::{Anchor, Color, Scene, Shape};
use crate::rotated_text::RotatedText;

const MIN_ZOOM: f32 = 0.1;
const MAX_ZOOM: f32 = 10.0;

/// Interactive scene viewer: drag to pan, scroll to zoom around the pointer.
pub struct ViewerApp {
    scene: Scene,
    offset: Vec2,
    zoom: f32,
}

impl ViewerApp {
    pub fn new(scene: Scene) -> Self {
        Self {
            scene,
            offset: Vec2::new(16.0, 16.0),
            zoom: 1.0,
        }
    }
}

impl eframe::App for ViewerApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        egui::CentralPanel::default()
            .frame(egui::Frame::default().fill(Color32::WHITE))
            .show(ctx, |ui| {
                let (response, painter) = ui.allocate_painter(ui.available_size(), Sense::drag());

                if response.dragged() {
                    self.offset += response.drag_delta();
                }

                let scroll = ui.input(|i| i.raw_scroll_delta.y);
                let factor = if scroll != 0.0 {
                    (scroll * 0.002).exp()
                } else {
                    ui.input(|i| i.zoom_delta())
                };
                if (factor - 1.0).abs() > f32::EPSILON {
                    if let Some(pointer) = response.hover_pos() {
                        let new_zoom = (self.zoom * factor).clamp(MIN_ZOOM, MAX_ZOOM);
                        let applied = new_zoom / self.zoom;
                        let q = pointer - response.rect.min;
                        self.offset = q - (q - self.offset) * applied;
                        self.zoom = new_zoom;
                    }
                }

                let origin = response.rect.min + self.offset;
                let zoom = self.zoom;
                let to_screen =
                    |pos: (f32, f32)| -> Pos2 { origin + Vec2::new(pos.0, pos.1) * zoom };

                for shape in &self.scene.shapes {
                    match shape {
                        Shape::Line {
                            from,
                            to,
                            width,
                            color,
                        } => {
                            painter.line_segment(
                                [to_screen(*from), to_screen(*to)],
                                Stroke::new(width * zoom, egui_color(*color)),
                            );
                        }
                        Shape::Rect { min, size, fill } => {
                            let rect = Rect::from_min_size(
                                to_screen(*min),
                                Vec2::new(size.0, size.1) * zoom,
                            );
                            painter.rect_filled(rect, 0.0, egui_color(*fill));
                        }
                        Shape::Text {
                            pos,
                            text,
                            size,
                            color,
                            anchor,
                            rotation,
                        } => {
                            let align = match anchor {
                                Anchor::Start => Align2::LEFT_CENTER,
                                Anchor::Middle => Align2::CENTER_CENTER,
                                Anchor::End => Align2::RIGHT_CENTER,
                            };
                            let font_id = FontId::proportional(size * zoom);
                            if rotation.abs() > 0.1 {
                                // egui angles run clockwise with y pointing down.
                                painter.rotated_text(
                                    to_screen(*pos),
                                    align,
                                    text,
                                    font_id,
                                    egui_color(*color),
                                    -rotation.to_radians(),
                                );
                            } else {
                                painter.text(
                                    to_screen(*pos),
                                    align,
                                    text,
                                    font_id,
                                    egui_color(*color),
                                );
                            }
                        }
                    }
                }
            });
    }
}

fn egui_color(color: Color) -> Color32 {
    Color32::from_rgb(color.r, color.g, color.b)
}

/// Open the viewer window and block until it is closed.
pub fn show_window(scene: Scene, title: &str) -> Result<()> {
    let width = (scene.width + 48.0).clamp(640.0, 1600.0);
    let height = (scene.height + 48.0).clamp(420.0, 1000.0);

    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_title(title)
            .with_inner_size([width, height]),
        ..Default::default()
    };

    eframe::run_native(
        title,
        options,
        Box::new(move |_cc| Ok(Box::new(ViewerApp::new(scene)))),
    )
    .map_err(|e| anyhow!("failed to start viewer: {e}"))
}
