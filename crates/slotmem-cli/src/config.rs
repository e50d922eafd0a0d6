//! Configuration Vault – reads/writes `~/.slotmem/config.toml`.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use slotmem_kernel::{SearchRadius, SessionConfig};
use slotmem_memory::persistence::{WorldKey, data_file_for};
use slotmem_types::PersistenceMode;

/// Persisted user configuration stored in `~/.slotmem/config.toml`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// `persistent` keys containers by position and writes to disk;
    /// `session` forgets everything when a container closes.
    #[serde(default)]
    pub persistence_mode: PersistenceMode,

    /// Root directory for per-world data files.
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,

    /// Delay between the first unsaved change and the write.  0 saves on
    /// every change.
    #[serde(default)]
    pub save_debounce_ms: u64,

    /// Horizontal (x and z) half-extent of the nearby-container search.
    #[serde(default = "default_search_radius_xz")]
    pub search_radius_xz: i32,

    /// Vertical half-extent of the nearby-container search.
    #[serde(default = "default_search_radius_y")]
    pub search_radius_y: i32,

    /// Minimum gap between accepted memorize clicks.
    #[serde(default = "default_click_debounce_ms")]
    pub click_debounce_ms: u64,

    /// Trailing slots of every container screen that belong to the player.
    #[serde(default = "default_player_inventory_slots")]
    pub player_inventory_slots: usize,
}

fn home_dir() -> String {
    std::env::var("HOME")
        .or_else(|_| std::env::var("USERPROFILE"))
        .unwrap_or_else(|_| ".".to_string())
}

fn default_data_dir() -> PathBuf {
    data_dir_for_home(&home_dir())
}
fn default_search_radius_xz() -> i32 {
    3
}
fn default_search_radius_y() -> i32 {
    2
}
fn default_click_debounce_ms() -> u64 {
    100
}
fn default_player_inventory_slots() -> usize {
    36
}

impl Default for Config {
    fn default() -> Self {
        Self {
            persistence_mode: PersistenceMode::default(),
            data_dir: default_data_dir(),
            save_debounce_ms: 0,
            search_radius_xz: default_search_radius_xz(),
            search_radius_y: default_search_radius_y(),
            click_debounce_ms: default_click_debounce_ms(),
            player_inventory_slots: default_player_inventory_slots(),
        }
    }
}

impl Config {
    /// Session settings for `world`.
    pub fn to_session_config(&self, world: &WorldKey) -> SessionConfig {
        SessionConfig {
            persistence_mode: self.persistence_mode,
            data_file: Some(data_file_for(&self.data_dir, world)),
            save_debounce: Duration::from_millis(self.save_debounce_ms),
            search_radius: SearchRadius {
                horizontal: self.search_radius_xz,
                vertical: self.search_radius_y,
            },
            click_debounce: Duration::from_millis(self.click_debounce_ms),
        }
    }
}

/// Return the path to `~/.slotmem/config.toml`.
pub fn config_path() -> PathBuf {
    config_path_for_home(&home_dir())
}

/// Build the config path relative to the given home directory.
pub(crate) fn config_path_for_home(home: &str) -> PathBuf {
    PathBuf::from(home).join(".slotmem").join("config.toml")
}

pub(crate) fn data_dir_for_home(home: &str) -> PathBuf {
    PathBuf::from(home).join(".slotmem").join("data")
}

/// Load the config from disk and apply environment overrides.  Returns
/// `None` if the file does not exist.
pub fn load() -> Result<Option<Config>, String> {
    let mut cfg = load_from(&config_path())?;
    if let Some(cfg) = cfg.as_mut() {
        apply_env_overrides(cfg);
    }
    Ok(cfg)
}

/// Load the config from a specific path, without environment overrides.
pub(crate) fn load_from(path: &Path) -> Result<Option<Config>, String> {
    if !path.exists() {
        return Ok(None);
    }
    let raw = fs::read_to_string(path)
        .map_err(|e| format!("Failed to read config at {}: {}", path.display(), e))?;
    let cfg: Config =
        toml::from_str(&raw).map_err(|e| format!("Failed to parse config: {}", e))?;
    Ok(Some(cfg))
}

/// Apply `SLOTMEM_*` environment variable overrides to `cfg`.
///
/// | Variable | Config field |
/// |---|---|
/// | `SLOTMEM_PERSISTENCE_MODE` | `persistence_mode` |
/// | `SLOTMEM_DATA_DIR` | `data_dir` |
/// | `SLOTMEM_SAVE_DEBOUNCE_MS` | `save_debounce_ms` |
///
/// Unparsable values are ignored.
pub fn apply_env_overrides(cfg: &mut Config) {
    if let Ok(v) = std::env::var("SLOTMEM_PERSISTENCE_MODE")
        && let Ok(mode) = v.parse::<PersistenceMode>()
    {
        cfg.persistence_mode = mode;
    }
    if let Ok(v) = std::env::var("SLOTMEM_DATA_DIR")
        && !v.is_empty()
    {
        cfg.data_dir = PathBuf::from(v);
    }
    if let Ok(v) = std::env::var("SLOTMEM_SAVE_DEBOUNCE_MS")
        && let Ok(ms) = v.parse::<u64>()
    {
        cfg.save_debounce_ms = ms;
    }
}

/// Save the config to disk, creating `~/.slotmem/` if necessary.
pub fn save(cfg: &Config) -> Result<(), String> {
    save_to(cfg, &config_path())
}

/// Save the config to a specific path.
pub(crate) fn save_to(cfg: &Config, path: &Path) -> Result<(), String> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .map_err(|e| format!("Failed to create config directory: {}", e))?;
        // Owner only (rwx------) on Unix.
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            fs::set_permissions(parent, fs::Permissions::from_mode(0o700))
                .map_err(|e| format!("Failed to set config directory permissions: {}", e))?;
        }
    }
    let raw =
        toml::to_string_pretty(cfg).map_err(|e| format!("Failed to serialize config: {}", e))?;
    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        fs::OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(true)
            .mode(0o600)
            .open(path)
            .and_then(|mut f| {
                use std::io::Write;
                f.write_all(raw.as_bytes())
            })
            .map_err(|e| format!("Failed to write config at {}: {}", path.display(), e))?;
    }
    #[cfg(not(unix))]
    fs::write(path, raw)
        .map_err(|e| format!("Failed to write config at {}: {}", path.display(), e))?;
    Ok(())
}
