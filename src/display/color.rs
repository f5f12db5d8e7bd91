/*
 *  display/color.rs
 *
 *  PaperPi - e-paper plugin rotation
 *  (c) 2020-26 Stuart Hunter
 *
 *  Color abstraction that adapts to different display capabilities
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

use embedded_graphics::pixelcolor::{BinaryColor, Gray4};
use rand::Rng;
use rand::seq::IndexedRandom;

/// Universal color value that adapts to display capabilities
///
/// Layouts are written once in these terms and converted at render time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Color {
    Black,
    DarkGray,
    Gray,
    LightGray,
    White,
    /// Custom grayscale value (0-255)
    Grayscale(u8),
}

/// Names accepted by the `text_color` / `bkground_color` plugin options
pub const NAMED_COLORS: &[(&str, Color)] = &[
    ("BLACK", Color::Black),
    ("DARKGRAY", Color::DarkGray),
    ("GRAY", Color::Gray),
    ("LIGHTGRAY", Color::LightGray),
    ("WHITE", Color::White),
];

impl Color {
    /// Monochrome panels: anything darker than mid gray is ink
    pub fn to_binary(&self) -> BinaryColor {
        if self.luminance() < 128 {
            BinaryColor::On
        } else {
            BinaryColor::Off
        }
    }

    /// Convert to Gray4 (4-bit grayscale: 0-15)
    pub fn to_gray4(&self) -> Gray4 {
        Gray4::new(((self.luminance() as u16 * 15) / 255) as u8)
    }

    /// Get luminance value (0-255)
    pub fn luminance(&self) -> u8 {
        match self {
            Color::Black => 0,
            Color::DarkGray => 85,
            Color::Gray => 128,
            Color::LightGray => 170,
            Color::White => 255,
            Color::Grayscale(val) => *val,
        }
    }

    /// Case-insensitive lookup by name, `GREY` spellings included
    pub fn from_name(name: &str) -> Option<Color> {
        let upper = name.trim().to_ascii_uppercase().replace("GREY", "GRAY");
        NAMED_COLORS
            .iter()
            .find(|(n, _)| *n == upper)
            .map(|(_, c)| *c)
    }
}

/// Resolve a foreground/background pair from plugin options
///
/// `random` on either side draws from the named palette and never hands back
/// the same color for both. Unknown names fall back to the defaults.
pub fn resolve_text_colors<R: Rng + ?Sized>(
    text: Option<&str>,
    background: Option<&str>,
    defaults: (Color, Color),
    rng: &mut R,
) -> (Color, Color) {
    let is_random = |v: Option<&str>| v.is_some_and(|s| s.trim().eq_ignore_ascii_case("random"));
    let named = |v: Option<&str>, fallback: Color| v.and_then(Color::from_name).unwrap_or(fallback);

    let palette: Vec<Color> = NAMED_COLORS.iter().map(|(_, c)| *c).collect();

    let mut fg = if is_random(text) {
        palette.choose(rng).copied().unwrap_or(defaults.0)
    } else {
        named(text, defaults.0)
    };

    let bg = if is_random(background) {
        let others: Vec<Color> = palette.iter().copied().filter(|c| *c != fg).collect();
        others.choose(rng).copied().unwrap_or(defaults.1)
    } else {
        named(background, defaults.1)
    };

    if fg == bg {
        if is_random(text) {
            let others: Vec<Color> = palette.iter().copied().filter(|c| *c != bg).collect();
            fg = others.choose(rng).copied().unwrap_or(defaults.0);
        } else {
            return defaults;
        }
    }
    (fg, bg)
}
