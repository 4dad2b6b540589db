use config::{Config, ConfigError, Environment, File, FileFormat};
use serde::Deserialize;
use sonar_echo::{CycleTiming, RangeLimits};
use tracing::{error, info};

pub const DEFAULT_CONFIG_PATH: &str = "config/default.toml";
pub const ENV_PREFIX: &str = "SONAR";

/// GPIO wiring of the sensor. Recorded for the logs; the host build drives
/// simulated pins.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct PinMap {
    pub echo: u8,
    pub trigger: u8,
}

impl Default for PinMap {
    fn default() -> Self {
        PinMap {
            echo: 15,
            trigger: 17,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct SimulationSettings {
    /// Obstacle distances replayed in order, one per cycle. A negative entry
    /// swallows the echo.
    pub distances_cm: Vec<f32>,
    /// Sensor latency between the trigger falling and the echo rising (µs).
    pub response_delay_us: u64,
    /// Stop after this many cycles. Runs forever when unset.
    pub max_cycles: Option<u64>,
}

impl Default for SimulationSettings {
    fn default() -> Self {
        SimulationSettings {
            distances_cm: vec![10.29, 42.0, 150.0, -1.0, 1.0, 450.0, 320.5],
            response_delay_us: 250,
            max_cycles: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct TelemetrySettings {
    pub stats_interval_ms: u64,
}

impl Default for TelemetrySettings {
    fn default() -> Self {
        TelemetrySettings {
            stats_interval_ms: 5_000,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub timing: CycleTiming,
    pub limits: RangeLimits,
    pub pins: PinMap,
    pub simulation: SimulationSettings,
    pub telemetry: TelemetrySettings,
}

pub fn load_config() -> Result<Settings, ConfigError> {
    load_from(DEFAULT_CONFIG_PATH, ENV_PREFIX)
}

/// Layers `path` (optional) under `<PREFIX>__SECTION__KEY` environment
/// variables.
pub fn load_from(path: &str, env_prefix: &str) -> Result<Settings, ConfigError> {
    info!("Attempting to load configuration from {}", path);

    let settings = Config::builder()
        .add_source(File::new(path, FileFormat::Toml).required(false))
        .add_source(
            Environment::with_prefix(env_prefix)
                .separator("__")
                .try_parsing(true),
        )
        .build()
        .and_then(|c| c.try_deserialize::<Settings>());

    match settings {
        Ok(settings) => {
            info!(?settings, "Successfully loaded configuration");
            Ok(settings)
        }
        Err(e) => {
            error!("Failed to load configuration: {}", e);
            Err(e)
        }
    }
}
