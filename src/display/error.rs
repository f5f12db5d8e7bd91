/*
 *  display/error.rs
 *
 *  PaperPi - e-paper plugin rotation
 *  (c) 2020-26 Stuart Hunter
 *
 *  Unified error types for display subsystem
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

use std::fmt;
use std::error::Error;
use std::io;
use std::path::PathBuf;

/// Runtime errors from writing to or clearing a screen
#[derive(Debug)]
pub enum DisplayError {
    /// Frame could not be pushed to the panel
    WriteFailed(String),

    /// Panel refused a clear
    ClearFailed(String),

    /// Frame does not match the panel geometry
    SizeMismatch { expected: (u32, u32), actual: (u32, u32) },

    /// Drawing operation failed while composing a frame
    DrawingError(String),

    /// Underlying I/O error
    Io(io::Error),
}

impl fmt::Display for DisplayError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DisplayError::WriteFailed(msg) =>
                write!(f, "Display write failed: {}", msg),
            DisplayError::ClearFailed(msg) =>
                write!(f, "Display clear failed: {}", msg),
            DisplayError::SizeMismatch { expected, actual } =>
                write!(f, "Frame size mismatch: expected {}x{}, got {}x{}",
                    expected.0, expected.1, actual.0, actual.1),
            DisplayError::DrawingError(msg) =>
                write!(f, "Drawing error: {}", msg),
            DisplayError::Io(err) =>
                write!(f, "Display I/O error: {}", err),
        }
    }
}

impl Error for DisplayError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            DisplayError::Io(err) => Some(err),
            _ => None,
        }
    }
}

impl From<io::Error> for DisplayError {
    fn from(err: io::Error) -> Self {
        DisplayError::Io(err)
    }
}

/// Startup errors, each one is fatal and carries an actionable message
#[derive(Debug)]
pub enum DisplayInitError {
    /// Process lacks access to the device or output directory
    PermissionDenied(PathBuf),

    /// Interface (SPI bus, output directory parent) is not present
    InterfaceMissing(PathBuf),

    /// Configured display type is not known
    UnknownDevice(String),

    /// Configuration values cannot drive this screen
    InvalidConfiguration(String),
}

impl fmt::Display for DisplayInitError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DisplayInitError::PermissionDenied(path) =>
                write!(f, "Permission denied accessing {}; check group membership or run with the right user", path.display()),
            DisplayInitError::InterfaceMissing(path) =>
                write!(f, "Display interface {} does not exist; is the interface enabled?", path.display()),
            DisplayInitError::UnknownDevice(name) =>
                write!(f, "Unknown display type '{}'; use 'file' or 'null'", name),
            DisplayInitError::InvalidConfiguration(msg) =>
                write!(f, "Invalid display configuration: {}", msg),
        }
    }
}

impl Error for DisplayInitError {}

impl DisplayInitError {
    /// Map an I/O failure on `path` to the matching startup error
    pub fn from_io(err: io::Error, path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        match err.kind() {
            io::ErrorKind::PermissionDenied => DisplayInitError::PermissionDenied(path),
            io::ErrorKind::NotFound => DisplayInitError::InterfaceMissing(path),
            _ => DisplayInitError::InvalidConfiguration(format!("{}: {}", path.display(), err)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_init_error_from_io_kind() {
        let err = DisplayInitError::from_io(io::Error::from(io::ErrorKind::PermissionDenied), "/dev/spidev0.0");
        assert!(matches!(err, DisplayInitError::PermissionDenied(_)));
        let err = DisplayInitError::from_io(io::Error::from(io::ErrorKind::NotFound), "/dev/spidev0.0");
        assert!(matches!(err, DisplayInitError::InterfaceMissing(_)));
        assert!(err.to_string().contains("/dev/spidev0.0"));
    }

    #[test]
    fn test_display_error_source() {
        let err = DisplayError::from(io::Error::other("disk full"));
        assert!(err.source().is_some());
        assert!(DisplayError::WriteFailed("x".into()).source().is_none());
    }
}
