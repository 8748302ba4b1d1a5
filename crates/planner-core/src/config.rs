use std::fs;
use std::path::{
  Path,
  PathBuf
};

use anyhow::{
  Context,
  anyhow,
  bail
};
use chrono_tz::Tz;
use planner_shared::EntityKind;
use serde::{
  Deserialize,
  Serialize
};
use tracing::{
  debug,
  info,
  warn
};

use crate::archive::DEFAULT_RETENTION_DAYS;
use crate::datetime::resolve_timezone;
use crate::settings::{
  Settings,
  SettingsChange
};

pub const CONFIG_ENV_VAR: &str =
  "PLANNER_CONFIG";

#[derive(
  Debug,
  Clone,
  PartialEq,
  Serialize,
  Deserialize,
)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
  pub timezone:    Option<String>,
  pub color:       bool,
  pub archive:     ArchiveConfig,
  pub quick_add:   QuickAddConfig,
  pub fixtures:    FixturesConfig,
  pub settings:    SettingsConfig,
  #[serde(skip)]
  pub loaded_file: Option<PathBuf>
}

#[derive(
  Debug,
  Clone,
  PartialEq,
  Serialize,
  Deserialize,
)]
#[serde(default, deny_unknown_fields)]
pub struct ArchiveConfig {
  pub retention_days: i64
}

#[derive(
  Debug,
  Clone,
  Default,
  PartialEq,
  Serialize,
  Deserialize,
)]
#[serde(default, deny_unknown_fields)]
pub struct QuickAddConfig {
  pub default_kind: Option<EntityKind>
}

#[derive(
  Debug,
  Clone,
  PartialEq,
  Serialize,
  Deserialize,
)]
#[serde(default, deny_unknown_fields)]
pub struct FixturesConfig {
  pub load: bool
}

/// Startup values for the in-session
/// preferences. Unset keys keep the
/// built-in defaults.
#[derive(
  Debug,
  Clone,
  Default,
  PartialEq,
  Serialize,
  Deserialize,
)]
#[serde(default, deny_unknown_fields)]
pub struct SettingsConfig {
  pub dark_mode:          Option<bool>,
  pub ring_duration_secs: Option<u32>,
  pub snooze_minutes:     Option<u32>,
  pub ringtone:           Option<String>
}

impl Default for Config {
  fn default() -> Self {
    Self {
      timezone:    None,
      color:       true,
      archive:     ArchiveConfig::default(),
      quick_add:   QuickAddConfig::default(),
      fixtures:    FixturesConfig::default(),
      settings:    SettingsConfig::default(),
      loaded_file: None
    }
  }
}

impl Default for ArchiveConfig {
  fn default() -> Self {
    Self {
      retention_days:
        DEFAULT_RETENTION_DAYS
    }
  }
}

impl Default for FixturesConfig {
  fn default() -> Self {
    Self {
      load: true
    }
  }
}

impl Config {
  #[tracing::instrument(skip(
    config_override
  ))]
  pub fn load(
    config_override: Option<&Path>
  ) -> anyhow::Result<Self> {
    let Some(path) =
      resolve_config_path(
        config_override
      )?
    else {
      debug!(
        "no config file; using \
         defaults"
      );
      return Ok(Self::default());
    };

    info!(config = %path.display(), "loading config");
    let text =
      fs::read_to_string(&path)
        .with_context(|| {
          format!(
            "failed to read {}",
            path.display()
          )
        })?;
    let mut cfg: Config =
      toml::from_str(&text)
        .with_context(|| {
          format!(
            "invalid config file {}",
            path.display()
          )
        })?;
    cfg.validate().with_context(
      || {
        format!(
          "invalid config file {}",
          path.display()
        )
      }
    )?;
    cfg.loaded_file = Some(path);
    Ok(cfg)
  }

  /// Applies `key=value` overrides on
  /// top of the file. Keys use the
  /// dotted TOML path.
  #[tracing::instrument(skip(
    self, overrides
  ))]
  pub fn apply_overrides<I>(
    &mut self,
    overrides: I
  ) -> anyhow::Result<()>
  where
    I: IntoIterator<
      Item = (String, String)
    >
  {
    for (key, value) in overrides {
      debug!(key = %key, value = %value, "applying override");
      self
        .set(key.trim(), value.trim())
        .with_context(|| {
          format!(
            "invalid override \
             {key}={value}"
          )
        })?;
    }
    self.validate()
  }

  fn set(
    &mut self,
    key: &str,
    value: &str
  ) -> anyhow::Result<()> {
    match key {
      | "timezone" => {
        self.timezone =
          non_empty(value)
      }
      | "color" => {
        self.color = parse_bool(value)?
      }
      | "archive.retention_days" => {
        self.archive.retention_days =
          value.parse().with_context(
            || "expected a number of days"
          )?
      }
      | "quick_add.default_kind" => {
        self.quick_add.default_kind =
          Some(
            value
              .parse::<EntityKind>()
              .map_err(|e| anyhow!(e))?
          )
      }
      | "fixtures.load" => {
        self.fixtures.load =
          parse_bool(value)?
      }
      | "settings.dark_mode" => {
        self.settings.dark_mode =
          Some(parse_bool(value)?)
      }
      | "settings.ring_duration_secs" => {
        self
          .settings
          .ring_duration_secs = Some(
          value.parse().with_context(
            || "expected seconds"
          )?
        )
      }
      | "settings.snooze_minutes" => {
        self.settings.snooze_minutes =
          Some(value.parse().with_context(
            || "expected minutes"
          )?)
      }
      | "settings.ringtone" => {
        self.settings.ringtone =
          non_empty(value)
      }
      | other => {
        bail!("unknown config key: {other}")
      }
    }
    Ok(())
  }

  fn validate(
    &self
  ) -> anyhow::Result<()> {
    if self.archive.retention_days < 1
    {
      bail!(
        "archive.retention_days must \
         be at least 1, got {}",
        self.archive.retention_days
      );
    }
    Ok(())
  }

  pub fn tz(
    &self
  ) -> anyhow::Result<Tz> {
    resolve_timezone(
      self.timezone.as_deref()
    )
  }

  /// Preferences the session starts
  /// with, range-checked the same way
  /// as in-session changes.
  pub fn initial_settings(
    &self
  ) -> anyhow::Result<Settings> {
    let mut settings =
      Settings::default();
    let mut changes = Vec::new();

    if self.settings.dark_mode
      == Some(true)
    {
      changes.push(
        SettingsChange::ToggleDarkMode
      );
    }
    if let Some(secs) =
      self.settings.ring_duration_secs
    {
      changes.push(
        SettingsChange::RingDuration(
          secs
        )
      );
    }
    if let Some(minutes) =
      self.settings.snooze_minutes
    {
      changes.push(
        SettingsChange::SnoozeDuration(
          minutes
        )
      );
    }
    if let Some(name) =
      &self.settings.ringtone
    {
      changes.push(
        SettingsChange::Ringtone(
          name.clone()
        )
      );
    }

    for change in changes {
      settings
        .apply(change)
        .context(
          "invalid settings in config"
        )?;
    }
    Ok(settings)
  }
}

#[tracing::instrument(skip(
  override_path
))]
fn resolve_config_path(
  override_path: Option<&Path>
) -> anyhow::Result<Option<PathBuf>> {
  if let Some(path) = override_path {
    return Ok(Some(path.to_path_buf()));
  }

  if let Ok(env_path) =
    std::env::var(CONFIG_ENV_VAR)
  {
    if env_path == "/dev/null" {
      return Ok(None);
    }
    return Ok(Some(PathBuf::from(
      env_path
    )));
  }

  let Some(config_dir) =
    dirs::config_dir()
  else {
    warn!(
      "cannot determine config \
       directory; using defaults"
    );
    return Ok(None);
  };
  let candidate = config_dir
    .join("planner")
    .join("planner.toml");
  if candidate.exists() {
    return Ok(Some(candidate));
  }

  Ok(None)
}

fn non_empty(
  value: &str
) -> Option<String> {
  (!value.is_empty())
    .then(|| value.to_string())
}

fn parse_bool(
  s: &str
) -> anyhow::Result<bool> {
  match s
    .trim()
    .to_ascii_lowercase()
    .as_str()
  {
    | "1" | "y" | "yes" | "on"
    | "true" => Ok(true),
    | "0" | "n" | "no" | "off"
    | "false" => Ok(false),
    | other => Err(anyhow!(
      "expected a boolean, got \
       {other}"
    ))
  }
}

#[cfg(test)]
mod tests {
  use std::io::Write;

  use super::*;

  #[test]
  fn loads_toml_file() {
    let mut file =
      tempfile::NamedTempFile::new()
        .expect("temp file");
    writeln!(
      file,
      "timezone = \"Europe/Berlin\"\n\
       color = false\n\
       [archive]\n\
       retention_days = 14\n\
       [quick_add]\n\
       default_kind = \"goal\"\n\
       [settings]\n\
       snooze_minutes = 10"
    )
    .expect("write config");

    let cfg =
      Config::load(Some(file.path()))
        .expect("load");
    assert_eq!(
      cfg.timezone.as_deref(),
      Some("Europe/Berlin")
    );
    assert!(!cfg.color);
    assert_eq!(
      cfg.archive.retention_days,
      14
    );
    assert_eq!(
      cfg.quick_add.default_kind,
      Some(EntityKind::Goal)
    );
    assert!(cfg.fixtures.load);
    assert_eq!(
      cfg
        .initial_settings()
        .expect("settings")
        .snooze_minutes,
      10
    );
    assert_eq!(
      cfg.loaded_file.as_deref(),
      Some(file.path())
    );
  }

  #[test]
  fn unknown_file_key_is_rejected() {
    let mut file =
      tempfile::NamedTempFile::new()
        .expect("temp file");
    writeln!(file, "colour = true")
      .expect("write config");
    assert!(
      Config::load(Some(file.path()))
        .is_err()
    );
  }

  #[test]
  fn overrides_apply_and_validate() {
    let mut cfg = Config::default();
    cfg
      .apply_overrides([
        (
          "fixtures.load".to_string(),
          "off".to_string()
        ),
        (
          "settings.dark_mode"
            .to_string(),
          "yes".to_string()
        )
      ])
      .expect("overrides");
    assert!(!cfg.fixtures.load);
    assert!(
      cfg
        .initial_settings()
        .expect("settings")
        .dark_mode
    );

    assert!(
      cfg
        .apply_overrides([(
          "nope".to_string(),
          "1".to_string()
        )])
        .is_err()
    );
    assert!(
      cfg
        .apply_overrides([(
          "archive.retention_days"
            .to_string(),
          "0".to_string()
        )])
        .is_err()
    );
  }

  #[test]
  fn out_of_range_setting_fails_startup()
  {
    let mut cfg = Config::default();
    cfg.settings.ring_duration_secs =
      Some(7);
    assert!(
      cfg.initial_settings().is_err()
    );
  }
}
