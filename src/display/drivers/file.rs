/*
 *  display/drivers/file.rs
 *
 *  PaperPi - e-paper plugin rotation
 *  (c) 2020-26 Stuart Hunter
 *
 *  Simulated panel - writes every frame as a netpbm image
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

use std::fs;
use std::path::{Path, PathBuf};

use log::{debug, info};

use crate::config::DisplayConfig;
use crate::display::error::{DisplayError, DisplayInitError};
use crate::display::framebuffer::FrameBuffer;
use crate::display::traits::{ColorDepth, DisplayCapabilities, DisplaySink};

const FRAME_STEM: &str = "paperpi_latest";

/// Writes `paperpi_latest.pbm` (or `.pgm`) into the output directory
///
/// Frames are staged to a temp name and renamed so a viewer never sees a
/// half written image. Rotation and mirroring are applied on the way out,
/// the rest of the program only sees the logical geometry.
#[derive(Debug)]
pub struct FileScreen {
    output_dir: PathBuf,
    capabilities: DisplayCapabilities,
    rotation: i16,
    mirror: bool,
    writes: u64,
}

impl FileScreen {
    pub fn new(config: &DisplayConfig) -> Result<Self, DisplayInitError> {
        let dir = config.output_dir.clone();
        fs::create_dir_all(&dir).map_err(|e| DisplayInitError::from_io(e, &dir))?;

        // make sure we can actually write here before committing to it
        let probe = dir.join(".paperpi_probe");
        fs::write(&probe, b"").map_err(|e| DisplayInitError::from_io(e, &dir))?;
        let _ = fs::remove_file(&probe);

        let (width, height) = config.logical_resolution();
        let depth = config.effective_mode().color_depth();
        info!("file screen {}x{} {:?} writing to {}", width, height, depth, dir.display());

        Ok(Self {
            output_dir: dir,
            capabilities: DisplayCapabilities {
                width,
                height,
                color_depth: depth,
                supports_refresh_budget: config.supports_refresh_budget(),
            },
            rotation: config.rotation,
            mirror: config.mirror,
            writes: 0,
        })
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    /// Path of the most recent frame for a given depth
    pub fn latest_frame(&self) -> PathBuf {
        let ext = match self.capabilities.color_depth {
            ColorDepth::Monochrome => "pbm",
            ColorDepth::Gray4 => "pgm",
        };
        self.output_dir.join(format!("{}.{}", FRAME_STEM, ext))
    }

    pub fn writes(&self) -> u64 {
        self.writes
    }

    fn store(&self, frame: &FrameBuffer) -> Result<(), DisplayError> {
        let physical = frame.oriented(self.rotation, self.mirror);
        let target = self.output_dir.join(format!("{}.{}", FRAME_STEM, physical.netpbm_extension()));
        let staging = target.with_extension("part");
        fs::write(&staging, physical.to_netpbm())?;
        fs::rename(&staging, &target)?;
        Ok(())
    }
}

impl DisplaySink for FileScreen {
    fn capabilities(&self) -> &DisplayCapabilities {
        &self.capabilities
    }

    fn write(&mut self, image: &FrameBuffer) -> Result<(), DisplayError> {
        let expected = self.resolution();
        let actual = image.dimensions();
        if expected != actual {
            return Err(DisplayError::SizeMismatch { expected, actual });
        }
        self.store(image)?;
        self.writes += 1;
        debug!("frame {} written to {}", self.writes, self.output_dir.display());
        Ok(())
    }

    fn clear(&mut self) -> Result<(), DisplayError> {
        let (w, h) = self.resolution();
        self.store(&FrameBuffer::new(w, h, self.capabilities.color_depth))
            .map_err(|e| DisplayError::ClearFailed(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::display::traits::ScreenMode;
    use rand::Rng;

    fn scratch_config(rotation: i16) -> DisplayConfig {
        let dir = std::env::temp_dir().join(format!("paperpi_file_screen_{}", rand::rng().random::<u32>()));
        DisplayConfig {
            output_dir: dir,
            width: 40,
            height: 20,
            rotation,
            screen_mode: ScreenMode::OneBit,
            ..DisplayConfig::default()
        }
    }

    #[test]
    fn test_write_produces_pbm() {
        let config = scratch_config(0);
        let mut screen = FileScreen::new(&config).unwrap();
        assert_eq!(screen.resolution(), (40, 20));
        screen.write(&FrameBuffer::new(40, 20, ColorDepth::Monochrome)).unwrap();
        let bytes = fs::read(screen.latest_frame()).unwrap();
        assert!(bytes.starts_with(b"P4\n40 20\n"));
        assert_eq!(screen.writes(), 1);
        fs::remove_dir_all(&config.output_dir).ok();
    }

    #[test]
    fn test_rotation_swaps_logical_size() {
        let config = scratch_config(90);
        let mut screen = FileScreen::new(&config).unwrap();
        assert_eq!(screen.resolution(), (20, 40));
        screen.write(&FrameBuffer::new(20, 40, ColorDepth::Monochrome)).unwrap();
        // stored in panel orientation
        let bytes = fs::read(screen.latest_frame()).unwrap();
        assert!(bytes.starts_with(b"P4\n40 20\n"));
        fs::remove_dir_all(&config.output_dir).ok();
    }

    #[test]
    fn test_wrong_size_is_rejected() {
        let config = scratch_config(0);
        let mut screen = FileScreen::new(&config).unwrap();
        let err = screen.write(&FrameBuffer::new(10, 10, ColorDepth::Monochrome)).unwrap_err();
        assert!(matches!(err, DisplayError::SizeMismatch { .. }));
        assert_eq!(screen.writes(), 0);
        fs::remove_dir_all(&config.output_dir).ok();
    }
}
