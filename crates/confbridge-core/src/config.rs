use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};

use serde::{Deserialize, Serialize};
use tokio::runtime::Handle;

use crate::sdk::{DEFAULT_SDK_DOMAIN, SdkConfig};

const CONFIG_FILE: &str = "bridge.json";

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct BridgeConfig {
    #[serde(default = "default_domain")]
    pub sdk_domain: String,
    #[serde(default)]
    pub app_key: Option<String>,
    #[serde(default = "default_true")]
    pub enable_sdk_log: bool,
    /// Prefill for the join form; never substituted for a missing user name.
    #[serde(default)]
    pub default_user_name: Option<String>,
}

fn default_domain() -> String {
    DEFAULT_SDK_DOMAIN.to_string()
}

fn default_true() -> bool {
    true
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            sdk_domain: default_domain(),
            app_key: None,
            enable_sdk_log: true,
            default_user_name: None,
        }
    }
}

impl BridgeConfig {
    pub fn sdk_config(&self) -> SdkConfig {
        SdkConfig {
            domain: self.sdk_domain.clone(),
            app_key: self.app_key.clone(),
            enable_log: self.enable_sdk_log,
        }
    }
}

/// Bridge configuration persisted as JSON in the host's data directory.
///
/// Reads are served from memory. A store built with [`ConfigStore::with_runtime`]
/// writes the file on the runtime's blocking pool so setters never touch the
/// disk on the calling thread.
pub struct ConfigStore {
    config: Mutex<Versioned>,
    file: Arc<ConfigFile>,
    writer: Option<Handle>,
}

struct Versioned {
    config: BridgeConfig,
    generation: u64,
}

struct ConfigFile {
    path: PathBuf,
    // Generation currently on disk.
    written: Mutex<u64>,
}

impl ConfigStore {
    pub fn new(data_dir: &str) -> Self {
        let path = PathBuf::from(data_dir).join(CONFIG_FILE);
        let config = Self::load(&path);
        Self {
            config: Mutex::new(Versioned {
                config,
                generation: 0,
            }),
            file: Arc::new(ConfigFile {
                path,
                written: Mutex::new(0),
            }),
            writer: None,
        }
    }

    /// Like [`ConfigStore::new`], with writes moved onto `runtime`.
    pub fn with_runtime(data_dir: &str, runtime: Handle) -> Self {
        Self {
            writer: Some(runtime),
            ..Self::new(data_dir)
        }
    }

    pub fn get(&self) -> BridgeConfig {
        self.lock().config.clone()
    }

    pub fn set_sdk_domain(&self, domain: String) {
        self.update(|c| c.sdk_domain = domain);
    }

    pub fn set_app_key(&self, key: Option<String>) {
        self.update(|c| c.app_key = key);
    }

    pub fn set_enable_sdk_log(&self, enabled: bool) {
        self.update(|c| c.enable_sdk_log = enabled);
    }

    pub fn set_default_user_name(&self, name: Option<String>) {
        self.update(|c| c.default_user_name = name);
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Versioned> {
        self.config.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn update(&self, apply: impl FnOnce(&mut BridgeConfig)) {
        let (snapshot, generation) = {
            let mut current = self.lock();
            apply(&mut current.config);
            current.generation += 1;
            (current.config.clone(), current.generation)
        };
        match &self.writer {
            Some(runtime) => {
                let file = self.file.clone();
                runtime.spawn_blocking(move || file.save(generation, &snapshot));
            }
            None => self.file.save(generation, &snapshot),
        }
    }

    fn load(path: &Path) -> BridgeConfig {
        match std::fs::read_to_string(path) {
            Ok(contents) => serde_json::from_str(&contents).unwrap_or_else(|e| {
                tracing::warn!("ignoring unreadable {}: {e}", path.display());
                BridgeConfig::default()
            }),
            Err(_) => BridgeConfig::default(),
        }
    }
}

impl ConfigFile {
    /// Write `config` unless a newer generation already reached the disk.
    fn save(&self, generation: u64, config: &BridgeConfig) {
        let mut written = self.written.lock().unwrap_or_else(PoisonError::into_inner);
        if *written >= generation {
            tracing::debug!(generation, "skipping superseded config write");
            return;
        }
        if let Some(parent) = self.path.parent() {
            let _ = std::fs::create_dir_all(parent);
        }
        let result = serde_json::to_string_pretty(config)
            .map_err(|e| e.to_string())
            .and_then(|json| std::fs::write(&self.path, json).map_err(|e| e.to_string()));
        match result {
            Ok(()) => *written = generation,
            Err(e) => tracing::warn!("failed to save {}: {e}", self.path.display()),
        }
    }
}
