/*
 *  display/framebuffer.rs
 *
 *  PaperPi - e-paper plugin rotation
 *  (c) 2020-26 Stuart Hunter
 *
 *  Runtime-sized framebuffers with enum dispatch over the panel color depth
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

use core::convert::Infallible;
use embedded_graphics::geometry::{OriginDimensions, Size};
use embedded_graphics::pixelcolor::{BinaryColor, Gray4, PixelColor};
use embedded_graphics::prelude::*;
use embedded_graphics::primitives::Rectangle;

use crate::display::traits::ColorDepth;

/// A runtime-sized framebuffer for embedded-graphics.
#[derive(Debug, Clone, PartialEq)]
pub struct VarFrameBuf<C: PixelColor> {
    buf: Vec<C>,
    w: usize,
    h: usize,
}

impl<C: PixelColor> VarFrameBuf<C> {
    pub fn new(width: u32, height: u32, fill: C) -> Self {
        let (w, h) = (width as usize, height as usize);
        Self { buf: vec![fill; w * h], w, h }
    }

    pub fn width(&self) -> usize { self.w }
    pub fn height(&self) -> usize { self.h }

    pub fn as_slice(&self) -> &[C] { &self.buf }

    pub fn clear_color(&mut self, color: C) {
        self.buf.fill(color);
    }

    pub fn pixel(&self, x: usize, y: usize) -> Option<C> {
        if x < self.w && y < self.h {
            Some(self.buf[y * self.w + x])
        } else {
            None
        }
    }

    #[inline]
    fn idx(&self, p: Point) -> Option<usize> {
        if p.x >= 0 && p.y >= 0 {
            let (x, y) = (p.x as usize, p.y as usize);
            if x < self.w && y < self.h {
                return Some(y * self.w + x);
            }
        }
        None
    }

    /// Clockwise rotation in quarter turns; anything else is a copy
    pub fn rotated(&self, degrees: i16) -> Self {
        let (w, h) = (self.w, self.h);
        match degrees.rem_euclid(360) {
            90 => self.remap(h, w, |nx, ny| (ny, h - 1 - nx)),
            180 => self.remap(w, h, |nx, ny| (w - 1 - nx, h - 1 - ny)),
            270 => self.remap(h, w, |nx, ny| (w - 1 - ny, nx)),
            _ => self.clone(),
        }
    }

    /// Left/right mirror
    pub fn mirrored(&self) -> Self {
        let w = self.w;
        self.remap(self.w, self.h, |nx, ny| (w - 1 - nx, ny))
    }

    // Build a new buffer of `nw` x `nh` where each pixel is pulled from `source(nx, ny)`
    fn remap(&self, nw: usize, nh: usize, source: impl Fn(usize, usize) -> (usize, usize)) -> Self {
        let mut buf = Vec::with_capacity(nw * nh);
        for ny in 0..nh {
            for nx in 0..nw {
                let (ox, oy) = source(nx, ny);
                buf.push(self.buf[oy * self.w + ox]);
            }
        }
        Self { buf, w: nw, h: nh }
    }
}

impl<C: PixelColor> OriginDimensions for VarFrameBuf<C> {
    fn size(&self) -> Size {
        Size::new(self.w as u32, self.h as u32)
    }
}

impl<C: PixelColor> DrawTarget for VarFrameBuf<C> {
    type Color = C;
    type Error = Infallible;

    fn draw_iter<I>(&mut self, pixels: I) -> Result<(), Self::Error>
    where
        I: IntoIterator<Item = Pixel<Self::Color>>,
    {
        for Pixel(p, c) in pixels {
            if let Some(i) = self.idx(p) {
                self.buf[i] = c;
            }
        }
        Ok(())
    }

    fn clear(&mut self, color: Self::Color) -> Result<(), Self::Error> {
        self.clear_color(color);
        Ok(())
    }

    fn fill_contiguous<I>(&mut self, area: &Rectangle, colors: I) -> Result<(), Self::Error>
    where
        I: IntoIterator<Item = Self::Color>,
    {
        // colors arrive row-major over the full area, clip per pixel
        let mut it = colors.into_iter();
        for point in area.points() {
            match it.next() {
                Some(c) => {
                    if let Some(i) = self.idx(point) {
                        self.buf[i] = c;
                    }
                }
                None => return Ok(()),
            }
        }
        Ok(())
    }
}

/// Paper color for each depth, what a blank frame looks like
pub const MONO_PAPER: BinaryColor = BinaryColor::Off;
pub const GRAY_PAPER_LUMA: u8 = 15;

/// Enum dispatch over the two panel color types
///
/// Monochrome pixels are ink when `On`. Gray4 pixels follow luma, so 0 is
/// black ink and 15 is bare paper.
#[derive(Debug, Clone, PartialEq)]
pub enum FrameBuffer {
    /// Monochrome framebuffer (1-bit per pixel)
    Mono(VarFrameBuf<BinaryColor>),

    /// 4-bit grayscale framebuffer (16 levels)
    Gray4(VarFrameBuf<Gray4>),
}

impl FrameBuffer {
    /// Blank (all paper) frame of the given geometry
    pub fn new(width: u32, height: u32, depth: ColorDepth) -> Self {
        match depth {
            ColorDepth::Monochrome => FrameBuffer::Mono(VarFrameBuf::new(width, height, MONO_PAPER)),
            ColorDepth::Gray4 => FrameBuffer::Gray4(VarFrameBuf::new(width, height, Gray4::new(GRAY_PAPER_LUMA))),
        }
    }

    pub fn dimensions(&self) -> (u32, u32) {
        match self {
            FrameBuffer::Mono(fb) => (fb.width() as u32, fb.height() as u32),
            FrameBuffer::Gray4(fb) => (fb.width() as u32, fb.height() as u32),
        }
    }

    pub fn color_depth(&self) -> ColorDepth {
        match self {
            FrameBuffer::Mono(_) => ColorDepth::Monochrome,
            FrameBuffer::Gray4(_) => ColorDepth::Gray4,
        }
    }

    /// Reset to bare paper
    pub fn clear(&mut self) {
        match self {
            FrameBuffer::Mono(fb) => fb.clear_color(MONO_PAPER),
            FrameBuffer::Gray4(fb) => fb.clear_color(Gray4::new(GRAY_PAPER_LUMA)),
        }
    }

    pub fn as_mono(&self) -> Option<&VarFrameBuf<BinaryColor>> {
        match self {
            FrameBuffer::Mono(fb) => Some(fb),
            _ => None,
        }
    }

    pub fn as_gray4(&self) -> Option<&VarFrameBuf<Gray4>> {
        match self {
            FrameBuffer::Gray4(fb) => Some(fb),
            _ => None,
        }
    }

    /// Number of pixels carrying any ink
    pub fn ink_count(&self) -> usize {
        match self {
            FrameBuffer::Mono(fb) => fb.as_slice().iter().filter(|p| p.is_on()).count(),
            FrameBuffer::Gray4(fb) => fb.as_slice().iter().filter(|p| p.luma() < GRAY_PAPER_LUMA).count(),
        }
    }

    /// Apply panel orientation, rotation first then mirror
    pub fn oriented(&self, rotation: i16, mirror: bool) -> Self {
        match self {
            FrameBuffer::Mono(fb) => {
                let r = fb.rotated(rotation);
                FrameBuffer::Mono(if mirror { r.mirrored() } else { r })
            }
            FrameBuffer::Gray4(fb) => {
                let r = fb.rotated(rotation);
                FrameBuffer::Gray4(if mirror { r.mirrored() } else { r })
            }
        }
    }

    /// Encode as binary netpbm, P4 for monochrome and P5 for grayscale
    ///
    /// P4 rows are padded to whole bytes, MSB first, a set bit is black.
    pub fn to_netpbm(&self) -> Vec<u8> {
        let (w, h) = self.dimensions();
        match self {
            FrameBuffer::Mono(fb) => {
                let mut out = format!("P4\n{} {}\n", w, h).into_bytes();
                let row_bytes = (w as usize).div_ceil(8);
                for row in fb.as_slice().chunks(w.max(1) as usize) {
                    let mut packed = vec![0u8; row_bytes];
                    for (x, pixel) in row.iter().enumerate() {
                        if pixel.is_on() {
                            packed[x / 8] |= 0x80 >> (x % 8);
                        }
                    }
                    out.extend_from_slice(&packed);
                }
                out
            }
            FrameBuffer::Gray4(fb) => {
                let mut out = format!("P5\n{} {}\n255\n", w, h).into_bytes();
                out.extend(fb.as_slice().iter().map(|p| p.luma() * 17));
                out
            }
        }
    }

    /// File extension matching `to_netpbm`
    pub fn netpbm_extension(&self) -> &'static str {
        match self {
            FrameBuffer::Mono(_) => "pbm",
            FrameBuffer::Gray4(_) => "pgm",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use embedded_graphics::primitives::PrimitiveStyle;

    #[test]
    fn test_new_is_blank_paper() {
        let fb = FrameBuffer::new(16, 8, ColorDepth::Monochrome);
        assert_eq!(fb.dimensions(), (16, 8));
        assert_eq!(fb.ink_count(), 0);
        let fb = FrameBuffer::new(16, 8, ColorDepth::Gray4);
        assert_eq!(fb.ink_count(), 0);
        assert_eq!(fb.color_depth(), ColorDepth::Gray4);
    }

    #[test]
    fn test_fill_contiguous_clips() {
        let mut fb = VarFrameBuf::new(4, 4, BinaryColor::Off);
        Rectangle::new(Point::new(2, 2), Size::new(4, 4))
            .into_styled(PrimitiveStyle::with_fill(BinaryColor::On))
            .draw(&mut fb)
            .unwrap();
        let on = fb.as_slice().iter().filter(|p| p.is_on()).count();
        assert_eq!(on, 4);
        assert_eq!(fb.pixel(0, 0), Some(BinaryColor::Off));
        assert_eq!(fb.pixel(3, 3), Some(BinaryColor::On));
    }

    #[test]
    fn test_rotation_moves_corner() {
        let mut fb = VarFrameBuf::new(3, 2, BinaryColor::Off);
        Pixel(Point::new(0, 0), BinaryColor::On).draw(&mut fb).unwrap();

        let r90 = fb.rotated(90);
        assert_eq!((r90.width(), r90.height()), (2, 3));
        assert_eq!(r90.pixel(1, 0), Some(BinaryColor::On));

        let r180 = fb.rotated(180);
        assert_eq!(r180.pixel(2, 1), Some(BinaryColor::On));

        let r270 = fb.rotated(-90);
        assert_eq!((r270.width(), r270.height()), (2, 3));
        assert_eq!(r270.pixel(0, 2), Some(BinaryColor::On));

        let m = fb.mirrored();
        assert_eq!(m.pixel(2, 0), Some(BinaryColor::On));
    }

    #[test]
    fn test_pbm_encoding() {
        let mut fb = FrameBuffer::new(10, 2, ColorDepth::Monochrome);
        if let FrameBuffer::Mono(inner) = &mut fb {
            Pixel(Point::new(0, 0), BinaryColor::On).draw(inner).unwrap();
            Pixel(Point::new(9, 1), BinaryColor::On).draw(inner).unwrap();
        }
        let bytes = fb.to_netpbm();
        let header = b"P4\n10 2\n";
        assert_eq!(&bytes[..header.len()], header);
        assert_eq!(&bytes[header.len()..], &[0x80, 0x00, 0x00, 0x40]);
        assert_eq!(fb.netpbm_extension(), "pbm");
    }

    #[test]
    fn test_pgm_encoding_is_full_range() {
        let fb = FrameBuffer::new(2, 1, ColorDepth::Gray4);
        let bytes = fb.to_netpbm();
        assert!(bytes.starts_with(b"P5\n2 1\n255\n"));
        assert_eq!(&bytes[bytes.len() - 2..], &[255, 255]);
    }
}
