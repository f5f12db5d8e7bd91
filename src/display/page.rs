/*
 *  display/page.rs
 *
 *  PaperPi - e-paper plugin rotation
 *  (c) 2020-26 Stuart Hunter
 *
 *  Page layout - renders plugin data into a framebuffer field by field
 *
 *  This program is free software: you can redistribute it and/or modify
 *  it under the terms of the GNU General Public License as published by
 *  the Free Software Foundation, either version 3 of the License, or
 *  (at your option) any later version.
 *
 *  This program is distributed in the hope that it will be useful,
 *  but WITHOUT ANY WARRANTY; without even the implied warranty of
 *  MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
 *  GNU General Public License for more details.
 *
 *  See <http://www.gnu.org/licenses/> to get a copy of the GNU General
 *  Public License.
 *
 */

use embedded_graphics::prelude::*;
use embedded_graphics::pixelcolor::{BinaryColor, Gray4};
use embedded_graphics::mono_font::MonoTextStyle;
use embedded_graphics::primitives::{PrimitiveStyle, Rectangle};
use embedded_text::{style::TextBoxStyleBuilder, TextBox};
use serde_json::Value;

use super::color::Color;
use super::error::DisplayError;
use super::field::Field;
use super::framebuffer::FrameBuffer;
use super::traits::ColorDepth;
use crate::plugin::PluginData;

/// Page layout - collection of fields making up one plugin look
#[derive(Debug, Clone)]
pub struct PageLayout {
    pub name: String,
    pub fields: Vec<Field>,
}

impl PageLayout {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            fields: Vec::new(),
        }
    }

    /// Add a field to the page
    pub fn add_field(mut self, field: Field) -> Self {
        self.fields.push(field);
        self
    }

    pub fn get_field(&self, name: &str) -> Option<&Field> {
        self.fields.iter().find(|f| f.name == name)
    }

    pub fn fields(&self) -> &[Field] {
        &self.fields
    }

    /// Apply text/background overrides to every field that accepts them
    pub fn recolor(&mut self, fg: Color, bg: Color) {
        for field in self.fields.iter_mut().filter(|f| f.recolor) {
            field.fg_color = fg;
            field.bg_color = Some(bg);
        }
    }

    /// Render `data` onto a fresh paper-colored frame
    ///
    /// Keys missing from `data` leave their field blank.
    pub fn render(&self, data: &PluginData, width: u32, height: u32, depth: ColorDepth) -> Result<FrameBuffer, DisplayError> {
        if width == 0 || height == 0 {
            return Err(DisplayError::DrawingError(format!("cannot render '{}' at {}x{}", self.name, width, height)));
        }
        let mut frame = FrameBuffer::new(width, height, depth);
        for field in &self.fields {
            let bounds = field.area.resolve(width, height);
            if bounds.size.width == 0 || bounds.size.height == 0 {
                continue;
            }
            let text = data.get(&field.name).map(value_text).unwrap_or_default();
            match &mut frame {
                FrameBuffer::Mono(fb) => {
                    fill_and_border(fb, bounds, field, field.fg_color.to_binary(), field.bg_color.map(|c| c.to_binary()))?;
                    if !text.is_empty() {
                        let style = MonoTextStyle::new(field.fit_font(&bounds, &text), field.fg_color.to_binary());
                        Self::draw_field_text_mono(fb, field, bounds, &text, style)?;
                    }
                }
                FrameBuffer::Gray4(fb) => {
                    fill_and_border(fb, bounds, field, field.fg_color.to_gray4(), field.bg_color.map(|c| c.to_gray4()))?;
                    if !text.is_empty() {
                        let style = MonoTextStyle::new(field.fit_font(&bounds, &text), field.fg_color.to_gray4());
                        Self::draw_field_text_gray4(fb, field, bounds, &text, style)?;
                    }
                }
            }
        }
        Ok(frame)
    }

    fn draw_field_text_mono(
        target: &mut impl DrawTarget<Color = BinaryColor>,
        field: &Field,
        bounds: Rectangle,
        text: &str,
        style: MonoTextStyle<'static, BinaryColor>,
    ) -> Result<(), DisplayError> {
        let textbox_style = TextBoxStyleBuilder::new()
            .alignment(field.horizontal_alignment)
            .vertical_alignment(field.vertical_alignment)
            .build();

        TextBox::with_textbox_style(text, bounds, style, textbox_style)
            .draw(target)
            .map(|_| ())
            .map_err(|_| DisplayError::DrawingError(format!("failed to draw field '{}'", field.name)))
    }

    fn draw_field_text_gray4(
        target: &mut impl DrawTarget<Color = Gray4>,
        field: &Field,
        bounds: Rectangle,
        text: &str,
        style: MonoTextStyle<'static, Gray4>,
    ) -> Result<(), DisplayError> {
        let textbox_style = TextBoxStyleBuilder::new()
            .alignment(field.horizontal_alignment)
            .vertical_alignment(field.vertical_alignment)
            .build();

        TextBox::with_textbox_style(text, bounds, style, textbox_style)
            .draw(target)
            .map(|_| ())
            .map_err(|_| DisplayError::DrawingError(format!("failed to draw field '{}'", field.name)))
    }
}

fn fill_and_border<D, C>(target: &mut D, bounds: Rectangle, field: &Field, fg: C, bg: Option<C>) -> Result<(), DisplayError>
where
    D: DrawTarget<Color = C>,
    C: PixelColor,
{
    if let Some(bg) = bg {
        bounds
            .into_styled(PrimitiveStyle::with_fill(bg))
            .draw(target)
            .map_err(|_| DisplayError::DrawingError(format!("failed to fill field '{}'", field.name)))?;
    }
    if field.border > 0 {
        bounds
            .into_styled(PrimitiveStyle::with_stroke(fg, field.border as u32))
            .draw(target)
            .map_err(|_| DisplayError::DrawingError(format!("failed to border field '{}'", field.name)))?;
    }
    Ok(())
}

/// Flatten a data value into display text
fn value_text(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        Value::Array(items) => items.iter().map(value_text).collect::<Vec<_>>().join(" "),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::display::field::FieldArea;
    use serde_json::json;

    fn clock_layout() -> PageLayout {
        PageLayout::new("layout")
            .add_field(Field::new_text("digit_time", FieldArea::new(0.0, 0.0, 1.0, 0.6)))
            .add_field(Field::new_text("msg", FieldArea::new(0.0, 0.6, 1.0, 0.4)).max_lines(2))
    }

    fn data(pairs: serde_json::Value) -> PluginData {
        pairs.as_object().cloned().unwrap_or_default()
    }

    #[test]
    fn test_render_draws_ink() {
        let frame = clock_layout()
            .render(&data(json!({"digit_time": "12:34", "msg": "hello"})), 200, 100, ColorDepth::Monochrome)
            .unwrap();
        assert_eq!(frame.dimensions(), (200, 100));
        assert!(frame.ink_count() > 0);
    }

    #[test]
    fn test_missing_keys_render_blank() {
        let frame = clock_layout().render(&PluginData::new(), 200, 100, ColorDepth::Gray4).unwrap();
        assert_eq!(frame.ink_count(), 0);
    }

    #[test]
    fn test_render_is_deterministic() {
        let d = data(json!({"digit_time": "07:00", "msg": ["a", "b", 3]}));
        let a = clock_layout().render(&d, 160, 80, ColorDepth::Monochrome).unwrap();
        let b = clock_layout().render(&d, 160, 80, ColorDepth::Monochrome).unwrap();
        assert_eq!(a, b);
        assert_eq!(value_text(&json!(["a", "b", 3])), "a b 3");
    }

    #[test]
    fn test_recolor_fills_background() {
        let mut layout = clock_layout();
        layout.recolor(Color::White, Color::Black);
        let frame = layout.render(&PluginData::new(), 100, 50, ColorDepth::Gray4).unwrap();
        // black background everywhere, nothing left as paper
        assert_eq!(frame.ink_count(), 100 * 50);
    }

    #[test]
    fn test_zero_size_is_an_error() {
        assert!(clock_layout().render(&PluginData::new(), 0, 10, ColorDepth::Monochrome).is_err());
    }
}
