pub mod ignore;
pub mod model;

use parking_lot::RwLock;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{error, info};

use crate::error::ConfigError;

pub use ignore::IgnoreList;
pub use model::{normalize_channel, ConnectionConfig, EventFlags, GameFlags, RelayConfig};

const CONFIG_FILE: &str = "config.toml";
const IGNORE_FILE: &str = "ignorelist.txt";
const DEFAULT_CONFIG: &str = include_str!("default_config.toml");

/// `<config dir>/ircrelay`, or `./ircrelay` when the platform has none.
pub fn default_dir() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("ircrelay")
}

/// One loaded configuration: the raw TOML table for key lookups, the
/// validated connection snapshot and the ignore list, all from the same load.
#[derive(Debug)]
pub struct Snapshot {
    raw: toml::Table,
    connection: Arc<ConnectionConfig>,
    ignores: IgnoreList,
}

impl Snapshot {
    /// Parse and validate `text`. `origin` only labels parse errors.
    pub fn parse(text: &str, origin: &Path, ignores: IgnoreList) -> Result<Self, ConfigError> {
        let parse_err = |source| ConfigError::Parse {
            path: origin.to_path_buf(),
            source,
        };
        let raw: toml::Table = toml::from_str(text).map_err(parse_err)?;
        let relay: RelayConfig = toml::from_str(text).map_err(parse_err)?;
        let connection = ConnectionConfig::from_relay(&relay)?;
        Ok(Self {
            raw,
            connection: Arc::new(connection),
            ignores,
        })
    }

    fn lookup(&self, key: &str) -> Option<&toml::Value> {
        let mut parts = key.split('.');
        let mut value = self.raw.get(parts.next()?)?;
        for part in parts {
            value = value.as_table()?.get(part)?;
        }
        Some(value)
    }

    pub fn get_string(&self, key: &str) -> String {
        match self.lookup(key) {
            Some(toml::Value::String(s)) => s.clone(),
            Some(toml::Value::Integer(i)) => i.to_string(),
            Some(toml::Value::Float(f)) => f.to_string(),
            Some(toml::Value::Boolean(b)) => b.to_string(),
            _ => String::new(),
        }
    }

    pub fn get_bool(&self, key: &str) -> bool {
        match self.lookup(key) {
            Some(toml::Value::Boolean(b)) => *b,
            Some(toml::Value::String(s)) => s.trim().eq_ignore_ascii_case("true"),
            _ => false,
        }
    }

    pub fn get_int(&self, key: &str) -> i64 {
        match self.lookup(key) {
            Some(toml::Value::Integer(i)) => *i,
            Some(toml::Value::String(s)) => s.trim().parse().unwrap_or(0),
            _ => 0,
        }
    }
}

/// Reloadable configuration provider.
///
/// Readers take an `Arc` of the current [`Snapshot`] and keep it for as long
/// as they need it; a reload swaps in a new one without touching snapshots
/// already handed out. A failed reload leaves the current snapshot active.
#[derive(Debug)]
pub struct ConfigStore {
    dir: PathBuf,
    current: RwLock<Option<Arc<Snapshot>>>,
}

impl ConfigStore {
    /// A store reading `config.toml` and `ignorelist.txt` from `dir`. Nothing
    /// is loaded until [`load`](Self::load) is called.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            current: RwLock::new(None),
        }
    }

    /// A store that starts out with an already-built snapshot.
    pub fn with_snapshot(dir: impl Into<PathBuf>, snapshot: Snapshot) -> Self {
        Self {
            dir: dir.into(),
            current: RwLock::new(Some(Arc::new(snapshot))),
        }
    }

    /// (Re)load from disk. Returns `false` and keeps the previous snapshot if
    /// anything is missing or invalid.
    pub fn load(&self) -> bool {
        match self.read_snapshot() {
            Ok(snapshot) => {
                *self.current.write() = Some(Arc::new(snapshot));
                info!("Configuration has been loaded.");
                true
            }
            Err(ConfigError::Created(path)) => {
                info!(path = %path.display(), "No config file found. Created a default configuration file.");
                info!("You must edit this file before the relay can connect.");
                false
            }
            Err(e) => {
                error!(error = %e, "Configuration rejected; previous settings stay active");
                false
            }
        }
    }

    fn read_snapshot(&self) -> Result<Snapshot, ConfigError> {
        let path = self.dir.join(CONFIG_FILE);
        if !path.exists() {
            write_default(&path)?;
            return Err(ConfigError::Created(path));
        }
        let text = fs::read_to_string(&path).map_err(|e| ConfigError::io(&path, e))?;
        let ignores = IgnoreList::load_or_create(&self.dir.join(IGNORE_FILE))?;
        Snapshot::parse(&text, &path, ignores)
    }

    pub fn snapshot(&self) -> Option<Arc<Snapshot>> {
        self.current.read().clone()
    }

    pub fn connection(&self) -> Option<Arc<ConnectionConfig>> {
        self.current.read().as_ref().map(|s| s.connection.clone())
    }

    pub fn is_ignored(&self, nick: &str) -> bool {
        self.current
            .read()
            .as_ref()
            .map(|s| s.ignores.contains(nick))
            .unwrap_or(false)
    }

    pub fn get_string(&self, key: &str) -> String {
        self.snapshot().map(|s| s.get_string(key)).unwrap_or_default()
    }

    pub fn get_bool(&self, key: &str) -> bool {
        self.snapshot().map(|s| s.get_bool(key)).unwrap_or(false)
    }

    pub fn get_int(&self, key: &str) -> i64 {
        self.snapshot().map(|s| s.get_int(key)).unwrap_or(0)
    }
}

fn write_default(path: &Path) -> Result<(), ConfigError> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(|e| ConfigError::io(parent, e))?;
    }
    fs::write(path, DEFAULT_CONFIG).map_err(|e| ConfigError::io(path, e))
}
