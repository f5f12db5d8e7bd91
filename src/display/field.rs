/*
 *  display/field.rs
 *
 *  PaperPi - e-paper plugin rotation
 *  (c) 2020-26 Stuart Hunter
 *
 *  Field definition - resolution independent text blocks
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
use embedded_graphics::primitives::Rectangle;
use embedded_graphics::mono_font::MonoFont;
use embedded_graphics::mono_font::ascii::{
    FONT_4X6, FONT_5X8, FONT_6X10, FONT_6X13, FONT_7X14, FONT_8X13, FONT_9X15, FONT_9X18, FONT_10X20,
};
use embedded_text::alignment::{HorizontalAlignment, VerticalAlignment};
use super::color::Color;

/// Fonts tried when fitting text, largest first
const FIT_FONTS: &[&MonoFont<'static>] = &[
    &FONT_10X20, &FONT_9X18, &FONT_9X15, &FONT_8X13, &FONT_7X14, &FONT_6X13, &FONT_6X10, &FONT_5X8, &FONT_4X6,
];

/// Fractional placement within the screen, 0.0..=1.0 on both axes
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FieldArea {
    pub x: f32,
    pub y: f32,
    pub w: f32,
    pub h: f32,
}

impl FieldArea {
    pub const FULL: FieldArea = FieldArea { x: 0.0, y: 0.0, w: 1.0, h: 1.0 };

    pub const fn new(x: f32, y: f32, w: f32, h: f32) -> Self {
        Self { x, y, w, h }
    }

    /// Pixel rectangle for a concrete screen, never spilling off the edge
    pub fn resolve(&self, width: u32, height: u32) -> Rectangle {
        let scale = |frac: f32, total: u32| ((frac.clamp(0.0, 1.0) * total as f32).round() as u32).min(total);
        let x = scale(self.x, width);
        let y = scale(self.y, height);
        let w = scale(self.w, width).min(width - x);
        let h = scale(self.h, height).min(height - y);
        Rectangle::new(Point::new(x as i32, y as i32), Size::new(w, h))
    }
}

/// A text block fed by one key of the plugin data
#[derive(Debug, Clone)]
pub struct Field {
    /// Data key rendered into this block
    pub name: String,

    pub area: FieldArea,

    /// Lines the text is expected to wrap to, drives font fitting
    pub max_lines: u32,

    /// Border, >0 draw border of specified width
    pub border: u8,

    pub fg_color: Color,

    /// Background color (None for transparent)
    pub bg_color: Option<Color>,

    pub horizontal_alignment: HorizontalAlignment,
    pub vertical_alignment: VerticalAlignment,

    /// Picks up `text_color` / `bkground_color` overrides
    pub recolor: bool,
}

impl Field {
    /// Create a new text field, black on paper and centered
    pub fn new_text(name: impl Into<String>, area: FieldArea) -> Self {
        Self {
            name: name.into(),
            area,
            max_lines: 1,
            border: 0,
            fg_color: Color::Black,
            bg_color: None,
            horizontal_alignment: HorizontalAlignment::Center,
            vertical_alignment: VerticalAlignment::Middle,
            recolor: true,
        }
    }

    /// Builder: set expected line count
    pub fn max_lines(mut self, lines: u32) -> Self {
        self.max_lines = lines.max(1);
        self
    }

    /// Builder: set border
    pub fn border(mut self, border: u8) -> Self {
        self.border = border;
        self
    }

    /// Builder: set alignment
    pub fn align(mut self, horizontal: HorizontalAlignment, vertical: VerticalAlignment) -> Self {
        self.horizontal_alignment = horizontal;
        self.vertical_alignment = vertical;
        self
    }

    /// Builder: set colors (will adapt to display color depth)
    pub fn colors(mut self, fg: Color, bg: Option<Color>) -> Self {
        self.fg_color = fg;
        self.bg_color = bg;
        self
    }

    /// Builder: opt out of color overrides
    pub fn fixed_colors(mut self) -> Self {
        self.recolor = false;
        self
    }

    /// Largest font whose line height and wrapped width fit `bounds`
    pub fn fit_font(&self, bounds: &Rectangle, text: &str) -> &'static MonoFont<'static> {
        let chars = text.chars().count().max(1) as u32;
        let per_line = chars.div_ceil(self.max_lines);
        FIT_FONTS
            .iter()
            .copied()
            .find(|font| {
                let cs = font.character_size;
                let step = cs.width + font.character_spacing;
                cs.height * self.max_lines <= bounds.size.height && step * per_line <= bounds.size.width
            })
            .unwrap_or(&FONT_4X6)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_area_resolves_and_clamps() {
        let r = FieldArea::new(0.5, 0.25, 0.5, 0.5).resolve(200, 100);
        assert_eq!(r.top_left, Point::new(100, 25));
        assert_eq!(r.size, Size::new(100, 50));

        let r = FieldArea::new(0.75, 0.0, 0.5, 2.0).resolve(200, 100);
        assert_eq!(r.size, Size::new(50, 100));
    }

    #[test]
    fn test_fit_font_prefers_largest() {
        let field = Field::new_text("msg", FieldArea::FULL);
        let big = Rectangle::new(Point::zero(), Size::new(400, 100));
        assert_eq!(field.fit_font(&big, "12:00").character_size, Size::new(10, 20));

        let small = Rectangle::new(Point::zero(), Size::new(30, 8));
        assert_eq!(field.fit_font(&small, "12:00").character_size, Size::new(5, 8));
    }

    #[test]
    fn test_fit_font_accounts_for_lines() {
        let field = Field::new_text("msg", FieldArea::FULL).max_lines(3);
        let bounds = Rectangle::new(Point::zero(), Size::new(400, 45));
        // 3 * 15 fits, 3 * 18 does not
        assert_eq!(field.fit_font(&bounds, "a few words here").character_size.height, 15);
    }
}
