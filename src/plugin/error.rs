/*
 *  plugin/error.rs
 *
 *  PaperPi - e-paper plugin rotation
 *  (c) 2020-26 Stuart Hunter
 *
 *  Plugin error types
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

use thiserror::Error;

/// Transient failure inside one fetch, the unit keeps its previous state
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("{0}")]
    Message(String),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("bad data: {0}")]
    Data(#[from] serde_json::Error),
}

impl FetchError {
    pub fn msg(message: impl Into<String>) -> Self {
        FetchError::Message(message.into())
    }
}

/// Failure to build a unit from its configuration
#[derive(Debug, Error)]
pub enum PluginError {
    #[error("plugin '{name}' could not be constructed: {reason}")]
    Construction { name: String, reason: String },
    #[error("no plugin named '{0}' is available")]
    Unknown(String),
    #[error("plugin '{plugin}' has no layout '{layout}'")]
    UnknownLayout { plugin: String, layout: String },
}

impl PluginError {
    pub fn construction(name: impl Into<String>, reason: impl Into<String>) -> Self {
        PluginError::Construction { name: name.into(), reason: reason.into() }
    }
}
