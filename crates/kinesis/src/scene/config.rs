use glam::Vec2;
use serde::Deserialize;
use std::{
    fs, io,
    path::{Path, PathBuf},
};
use thiserror::Error;

/// Scene tunables. Every field has a default, so a config file only needs to list what it
/// changes.
///
/// ```
/// # use kinesis::SceneConfig;
/// let config = SceneConfig::from_toml_str(r#"
///     entity_growth = 100
///
///     [physics]
///     gravity = [0.0, -20.0]
///     fixed_timestep = 0.01
/// "#).unwrap();
///
/// assert_eq!(config.entity_growth, 100);
/// assert_eq!(config.physics.max_substeps, 8);
/// ```
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SceneConfig {
    /// Entity slots the universe grows by once it runs out.
    pub entity_growth: u32,
    /// Initial message bus capacity.
    pub message_capacity: usize,
    /// Frames of timing history kept by the profiler.
    pub profiler_history: usize,
    pub physics: PhysicsConfig,
}

impl Default for SceneConfig {
    fn default() -> Self {
        Self {
            entity_growth: crate::ecs::ECS_GROW_AMOUNT,
            message_capacity: 512,
            profiler_history: 600,
            physics: PhysicsConfig::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PhysicsConfig {
    /// World gravity, in scene units per second squared.
    pub gravity: Vec2,
    /// Scene units per solver meter.
    pub pixels_per_meter: f32,
    /// When set, the solver is stepped in fixed increments of this many seconds, with leftover
    /// frame time carried over to the next frame.
    pub fixed_timestep: Option<f32>,
    /// Upper bound of fixed steps taken in a single frame.
    pub max_substeps: u32,
}

impl Default for PhysicsConfig {
    fn default() -> Self {
        Self {
            gravity: Vec2::new(0.0, -9.81),
            pixels_per_meter: 1.0,
            fixed_timestep: None,
            max_substeps: 8,
        }
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("couldn't read config file `{}`: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("malformed config: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("invalid config value `{field}`: {reason}")]
    Invalid {
        field: &'static str,
        reason: &'static str,
    },
}

impl SceneConfig {
    pub fn from_toml_str(source: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(source)?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let source = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_owned(),
            source,
        })?;
        Self::from_toml_str(&source)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.entity_growth == 0 {
            return Err(ConfigError::Invalid {
                field: "entity_growth",
                reason: "must be at least 1",
            });
        }

        let physics = &self.physics;
        if !(physics.pixels_per_meter.is_finite() && physics.pixels_per_meter > 0.0) {
            return Err(ConfigError::Invalid {
                field: "physics.pixels_per_meter",
                reason: "must be a positive number",
            });
        }
        if let Some(step) = physics.fixed_timestep {
            if !(step.is_finite() && step > 0.0) {
                return Err(ConfigError::Invalid {
                    field: "physics.fixed_timestep",
                    reason: "must be a positive number",
                });
            }
        }
        if physics.max_substeps == 0 {
            return Err(ConfigError::Invalid {
                field: "physics.max_substeps",
                reason: "must be at least 1",
            });
        }

        Ok(())
    }
}
