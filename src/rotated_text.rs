use eframe::egui::{epaint::TextShape, *};

/// Rotated text for [`Painter`], used by the heatmap column headers.
pub trait RotatedText {
    fn rotated_text(
        &self,
        pos: Pos2,
        anchor: Align2,
        text: impl ToString,
        font_id: FontId,
        text_color: Color32,
        angle: f32,
    );
}

impl RotatedText for Painter {
    fn rotated_text(
        &self,
        pos: Pos2,
        anchor: Align2,
        text: impl ToString,
        font_id: FontId,
        text_color: Color32,
        angle: f32,
    ) {
        let galley = self.layout_no_wrap(text.to_string(), font_id, text_color);
        let text_size = galley.size();

        // Offset of the galley origin from the anchor, before rotation.
        let anchor_offset = match anchor {
            Align2::LEFT_CENTER => Vec2::new(0.0, text_size.y / 2.0),
            Align2::RIGHT_CENTER => Vec2::new(text_size.x, text_size.y / 2.0),
            _ => anchor.to_sign() * text_size / 2.0,
        };

        let cos_a = angle.cos();
        let sin_a = angle.sin();
        let rotated_offset = Vec2::new(
            anchor_offset.x * cos_a - anchor_offset.y * sin_a,
            anchor_offset.x * sin_a + anchor_offset.y * cos_a,
        );

        self.add(TextShape {
            pos: pos - rotated_offset,
            galley,
            angle,
            override_text_color: Some(text_color),
            fallback_color: text_color,
            underline: Stroke::NONE,
            opacity_factor: 1.0,
        });
    }
}
