/*
 *  snapshot.rs
 *
 *  PaperPi - e-paper plugin rotation
 *  (c) 2020-26 Stuart Hunter
 *
 *  Per-unit debug snapshots written at shutdown
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
use std::sync::atomic::{AtomicU32, Ordering};

use chrono::{DateTime, Local};
use log::{debug, warn};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::constants::SNAPSHOT_VERSION;
use crate::plugin::{PluginData, PluginUnit};

static SEQUENCE: AtomicU32 = AtomicU32::new(0);

#[derive(Debug, Error)]
pub enum SnapshotError {
    #[error("snapshot I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("snapshot encoding error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("unsupported snapshot version {0}")]
    Version(u32),
}

/// Structured state of one unit; the image is rebuilt from `data`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UnitSnapshot {
    pub version: u32,
    pub name: String,
    pub taken_at: DateTime<Local>,
    pub priority: i32,
    pub max_priority: i32,
    pub hash: String,
    pub layout: String,
    pub data: PluginData,
}

impl UnitSnapshot {
    pub fn from_unit(unit: &PluginUnit) -> Self {
        Self {
            version: SNAPSHOT_VERSION,
            name: unit.name().to_string(),
            taken_at: Local::now(),
            priority: unit.priority(),
            max_priority: unit.max_priority(),
            hash: unit.hash().to_string(),
            layout: unit.layout_name().to_string(),
            data: unit.data().clone(),
        }
    }
}

/// Directory of JSON snapshots, `keep` newest per unit
#[derive(Debug, Clone)]
pub struct SnapshotStore {
    dir: PathBuf,
    keep: usize,
}

impl SnapshotStore {
    pub fn new(dir: impl Into<PathBuf>, keep: usize) -> Self {
        Self { dir: dir.into(), keep: keep.max(1) }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn write(&self, snapshot: &UnitSnapshot) -> Result<PathBuf, SnapshotError> {
        fs::create_dir_all(&self.dir)?;
        let stem = file_stem(&snapshot.name);
        let file = self.dir.join(format!(
            "{}_{}_{:04}.json",
            stem,
            snapshot.taken_at.format("%Y%m%dT%H%M%S%.6f"),
            SEQUENCE.fetch_add(1, Ordering::Relaxed) % 10_000
        ));
        fs::write(&file, serde_json::to_vec_pretty(snapshot)?)?;
        debug!("snapshot for '{}' written to {}", snapshot.name, file.display());
        self.prune(&stem);
        Ok(file)
    }

    /// Most recent snapshot of `name`, if any
    pub fn load_latest(&self, name: &str) -> Result<Option<UnitSnapshot>, SnapshotError> {
        let Some(latest) = self.files_for(&file_stem(name)).pop() else {
            return Ok(None);
        };
        let snapshot: UnitSnapshot = serde_json::from_slice(&fs::read(latest)?)?;
        if snapshot.version != SNAPSHOT_VERSION {
            return Err(SnapshotError::Version(snapshot.version));
        }
        Ok(Some(snapshot))
    }

    /// Oldest first
    fn files_for(&self, stem: &str) -> Vec<PathBuf> {
        let mut files: Vec<PathBuf> = match fs::read_dir(&self.dir) {
            Ok(entries) => entries
                .filter_map(Result::ok)
                .map(|e| e.path())
                .filter(|p| {
                    p.extension().is_some_and(|ext| ext == "json")
                        && p.file_stem()
                            .and_then(|n| n.to_str())
                            .and_then(owner_stem)
                            .is_some_and(|owner| owner == stem)
                })
                .collect(),
            Err(_) => Vec::new(),
        };
        files.sort();
        files
    }

    fn prune(&self, stem: &str) {
        let files = self.files_for(stem);
        let excess = files.len().saturating_sub(self.keep);
        for old in files.into_iter().take(excess) {
            if let Err(e) = fs::remove_file(&old) {
                warn!("could not prune snapshot {}: {}", old.display(), e);
            }
        }
    }
}

/// Unit stem of `{stem}_{timestamp}_{seq}`, read from the right since
/// stems may themselves contain underscores
fn owner_stem(file_stem: &str) -> Option<&str> {
    let mut parts = file_stem.rsplitn(3, '_');
    let seq = parts.next()?;
    let taken = parts.next()?;
    let owner = parts.next()?;
    let valid = !seq.is_empty()
        && seq.chars().all(|c| c.is_ascii_digit())
        && taken.starts_with(|c: char| c.is_ascii_digit());
    valid.then_some(owner)
}

fn file_stem(name: &str) -> String {
    name.chars()
        .map(|c| if c.is_ascii_alphanumeric() { c.to_ascii_lowercase() } else { '_' })
        .collect()
}
