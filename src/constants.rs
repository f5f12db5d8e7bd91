//! This module contains global constants used across the engine, plugins and shell.

pub const APP_NAME: &str = "PaperPi";
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
pub const URL: &str = "https://github.com/txoof/PaperPi";

/// Base configuration shipped next to the binary, always read first when present.
pub const CONFIG_BASE: &str = "config/paperpi.yaml";
/// Per-user configuration, relative to the home directory.
pub const CONFIG_USER: &str = ".config/paperpi/paperpi.yaml";
/// System-wide configuration used in daemon mode.
pub const CONFIG_SYSTEM: &str = "/etc/default/paperpi.yaml";

/// Priority at or above which a unit is never put on screen.
pub const INACTIVE_PRIORITY: i32 = 1 << 15;
/// Floor reported when no unit exists; one step above inactive.
pub const PRIORITY_FLOOR_SENTINEL: i32 = 1 << 16;

pub const DEFAULT_LOG_LEVEL: &str = "warn";
pub const DEFAULT_DISPLAY_TYPE: &str = "file";
pub const DEFAULT_OUTPUT_DIR: &str = "/tmp/paperpi_frames";
pub const DEFAULT_WIDTH: u32 = 640;
pub const DEFAULT_HEIGHT: u32 = 384;
pub const DEFAULT_MAX_REFRESH: u32 = 5;
pub const DEFAULT_TICK_SECONDS: u64 = 5;
pub const DEFAULT_PLUGIN_TIMEOUT: u64 = 35;

pub const DEFAULT_REFRESH_RATE: u64 = 60;
pub const DEFAULT_MIN_DISPLAY_TIME: u64 = 30;
pub const DEFAULT_LAYOUT: &str = "layout";

pub const DEFAULT_SNAPSHOT_KEEP: usize = 5;
pub const SNAPSHOT_VERSION: u32 = 1;

/// Prefix used when the cache lives in a throwaway temp directory.
pub const CACHE_PREFIX: &str = "paperpi_";

/// How long the blocking pool gets to wind down abandoned fetches on exit.
pub const SHUTDOWN_GRACE_SECONDS: u64 = 2;
