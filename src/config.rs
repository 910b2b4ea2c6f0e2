//! Application-level configuration loading, including the campus task catalog.

use std::{env, fs, io::ErrorKind, path::PathBuf, time::Duration};

use serde::Deserialize;
use tracing::{info, warn};

/// Default location on disk where the core looks for the JSON configuration.
const DEFAULT_CONFIG_PATH: &str = "config/app.json";
/// Environment variable that overrides [`DEFAULT_CONFIG_PATH`].
const CONFIG_PATH_ENV: &str = "HUSKY_SEEKER_CONFIG_PATH";

/// How many fresh codes to draw before giving up on a collision streak.
const DEFAULT_CODE_ATTEMPTS: u32 = 8;
/// Bounded timeout applied to every persistence gateway call.
const DEFAULT_GATEWAY_TIMEOUT_MS: u64 = 5_000;

#[derive(Debug, Clone)]
/// Immutable runtime configuration shared across the core.
pub struct AppConfig {
    /// Upper bound on code-generation retries when codes collide.
    pub code_attempts: u32,
    /// Timeout applied to each gateway call.
    pub gateway_timeout: Duration,
    /// Campus task catalog used to seed new games.
    pub task_catalog: Vec<TaskSeed>,
}

/// One catalog entry a game's task list is seeded from.
#[derive(Debug, Clone, Deserialize)]
pub struct TaskSeed {
    /// What the player has to do.
    pub description: String,
    /// Campus location label shown next to the task.
    pub location: String,
    /// Points awarded once the task is verified.
    pub points: u32,
}

impl AppConfig {
    /// Load the configuration from disk, falling back to baked-in defaults.
    pub fn load() -> Self {
        let path = resolve_config_path();
        match fs::read_to_string(&path) {
            Ok(contents) => match serde_json::from_str::<RawConfig>(&contents) {
                Ok(raw) => {
                    let app_config: Self = raw.into();
                    info!(
                        path = %path.display(),
                        tasks = app_config.task_catalog.len(),
                        "loaded task catalog from config"
                    );
                    app_config
                }
                Err(err) => {
                    warn!(
                        path = %path.display(),
                        error = %err,
                        "failed to parse config; falling back to defaults"
                    );
                    Self::default()
                }
            },
            Err(err) if err.kind() == ErrorKind::NotFound => {
                info!(
                    path = %path.display(),
                    "config file not found; using built-in defaults"
                );
                Self::default()
            }
            Err(err) => {
                warn!(
                    path = %path.display(),
                    error = %err,
                    "failed to read config; falling back to defaults"
                );
                Self::default()
            }
        }
    }

    /// Return `count` catalog entries, cycling when a game asks for more tasks
    /// than the catalog holds.
    pub fn seed_tasks(&self, count: u32) -> Vec<TaskSeed> {
        self.task_catalog
            .iter()
            .cycle()
            .take(count as usize)
            .cloned()
            .collect()
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            code_attempts: DEFAULT_CODE_ATTEMPTS,
            gateway_timeout: Duration::from_millis(DEFAULT_GATEWAY_TIMEOUT_MS),
            task_catalog: default_task_catalog(),
        }
    }
}

#[derive(Debug, Deserialize)]
/// JSON representation of the configuration file located at [`DEFAULT_CONFIG_PATH`].
struct RawConfig {
    #[serde(default)]
    code_attempts: Option<u32>,
    #[serde(default)]
    gateway_timeout_ms: Option<u64>,
    #[serde(default)]
    tasks: Vec<TaskSeed>,
}

impl From<RawConfig> for AppConfig {
    fn from(value: RawConfig) -> Self {
        let defaults = AppConfig::default();
        Self {
            code_attempts: value.code_attempts.unwrap_or(defaults.code_attempts),
            gateway_timeout: value
                .gateway_timeout_ms
                .map(Duration::from_millis)
                .unwrap_or(defaults.gateway_timeout),
            task_catalog: if value.tasks.is_empty() {
                defaults.task_catalog
            } else {
                value.tasks
            },
        }
    }
}

/// Resolve the configuration path taking the environment override into account.
fn resolve_config_path() -> PathBuf {
    env::var_os(CONFIG_PATH_ENV)
        .map(PathBuf::from)
        .filter(|path| !path.as_os_str().is_empty())
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATH))
}

/// Built-in task catalog shipped with the crate.
fn default_task_catalog() -> Vec<TaskSeed> {
    [
        ("Find the hidden key", "Suzzallo Library", 30),
        ("Count the sundial markings", "Red Square", 10),
        ("Photograph the bronze husky statue", "Husky Stadium", 20),
        ("Trace the fountain inscription", "Drumheller Fountain", 15),
        ("Collect a cherry blossom petal", "The Quad", 10),
        ("Read the plaque by the old gate", "Memorial Way", 15),
        ("Sketch the totem pole", "The HUB", 20),
        ("Find the mislabeled tree", "Sylvan Grove", 25),
        ("Locate the oldest brick", "Denny Hall", 25),
        ("Spot the weathervane", "Gerberding Hall", 10),
    ]
    .into_iter()
    .map(|(description, location, points)| TaskSeed {
        description: description.to_string(),
        location: location.to_string(),
        points,
    })
    .collect()
}
