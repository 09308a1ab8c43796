use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result, bail};
use log::*;
use serde::{Deserialize, Serialize};
use ustr::Ustr;

use crate::{Detectors, InteractionSettings, utils};

/// The name of the config file in the mod directory.
const FILE_NAME: &str = "inkling-pets.json";

/// The user's configuration for the mod, loaded from [FILE_NAME].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Config {
    /// Seconds between pet checks.
    check_interval: f32,

    /// The keyword that marks an entity as a pet by name.
    keyword: String,

    /// Tags that mark an entity as a pet.
    target_tags: Vec<Ustr>,

    /// The detectors to use when looking for pets.
    detectors: Detectors,

    /// The interaction attached to each pet.
    interaction: InteractionSettings,

    /// How close a pet must be to the player to show up in nearby-pet
    /// diagnostics.
    nearby_radius: f32,

    /// The most verbose level written to the log file.
    log_level: LevelFilter,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            check_interval: 2.,
            keyword: "inkling".into(),
            target_tags: vec![Ustr::from("Inkling"), Ustr::from("Pet")],
            detectors: Detectors::all(),
            interaction: Default::default(),
            nearby_radius: 10.,
            log_level: LevelFilter::Info,
        }
    }
}

impl Config {
    /// Loads the config from the mod directory.
    pub fn load() -> Result<Self> {
        Self::load_from(utils::mod_directory()?)
    }

    /// Loads the config from `dir`. If there's no config file there yet, this
    /// writes one with the default settings so the user has something to
    /// edit.
    pub fn load_from(dir: impl AsRef<Path>) -> Result<Self> {
        let path = Self::path_in(&dir);
        if !path.exists() {
            info!("No config found at {}, writing defaults", path.display());
            let config = Self::default();
            if let Err(err) = config.save_to(&dir) {
                warn!("Couldn't write default config: {err:?}");
            }
            return Ok(config);
        }

        let text = fs::read_to_string(&path)
            .with_context(|| format!("Couldn't read {}", path.display()))?;
        let config: Self = json::from_str(&text)
            .with_context(|| format!("{} isn't a valid config file", path.display()))?;
        config.validate()?;
        Ok(config)
    }

    /// Writes this config to `dir`.
    pub fn save_to(&self, dir: impl AsRef<Path>) -> Result<()> {
        fs::create_dir_all(&dir)?;
        fs::write(Self::path_in(dir), json::to_string_pretty(self)?)?;
        Ok(())
    }

    fn path_in(dir: impl AsRef<Path>) -> PathBuf {
        dir.as_ref().join(FILE_NAME)
    }

    /// Returns an error if any values are out of range.
    fn validate(&self) -> Result<()> {
        if !(self.check_interval > 0.)
            || Duration::try_from_secs_f32(self.check_interval).is_err()
        {
            bail!(
                "checkInterval must be a positive number of seconds, was {}",
                self.check_interval
            );
        }
        if !(self.interaction.interact_distance.is_finite()
            && self.interaction.interact_distance > 0.)
        {
            bail!(
                "interaction.interactDistance must be positive, was {}",
                self.interaction.interact_distance
            );
        }
        if Duration::try_from_secs_f32(self.interaction.cooldown).is_err() {
            bail!(
                "interaction.cooldown must be a non-negative number of seconds, was {}",
                self.interaction.cooldown
            );
        }
        if self.interaction.label.is_empty() {
            bail!("interaction.label can't be empty");
        }
        Ok(())
    }

    /// The time between pet checks. An interval too long to represent means
    /// checks only run when forced.
    pub fn check_interval(&self) -> Duration {
        Duration::try_from_secs_f32(self.check_interval).unwrap_or(Duration::MAX)
    }

    /// The keyword that marks an entity as a pet by name.
    pub fn keyword(&self) -> &str {
        &self.keyword
    }

    /// Tags that mark an entity as a pet.
    pub fn target_tags(&self) -> &[Ustr] {
        &self.target_tags
    }

    pub fn detectors(&self) -> Detectors {
        self.detectors
    }

    pub fn interaction(&self) -> &InteractionSettings {
        &self.interaction
    }

    pub fn nearby_radius(&self) -> f32 {
        self.nearby_radius
    }

    pub fn log_level(&self) -> LevelFilter {
        self.log_level
    }
}
