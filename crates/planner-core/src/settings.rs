use anyhow::{anyhow, bail};
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

pub const RING_DURATION_RANGE: (u32, u32) = (5, 60);
pub const RING_DURATION_STEP: u32 = 5;
pub const SNOOZE_RANGE: (u32, u32) = (1, 30);

/// Built-in ringtones as `(id, display name)`.
pub const DEFAULT_RINGTONES: [(&str, &str); 5] = [
    ("default", "Default Chime"),
    ("gentle", "Gentle Bell"),
    ("classic", "Classic Ring"),
    ("modern", "Modern Tone"),
    ("nature", "Nature Sounds"),
];

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Settings {
    pub dark_mode: bool,
    pub ring_duration_secs: u32,
    pub snooze_minutes: u32,
    pub selected_ringtone: String,
    pub custom_ringtones: Vec<String>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            dark_mode: false,
            ring_duration_secs: 30,
            snooze_minutes: 5,
            selected_ringtone: "default".to_string(),
            custom_ringtones: vec![],
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SettingsChange {
    ToggleDarkMode,
    RingDuration(u32),
    SnoozeDuration(u32),
    Ringtone(String),
    AddCustomRingtone(String),
}

impl Settings {
    #[instrument(skip(self))]
    pub fn apply(&mut self, change: SettingsChange) -> anyhow::Result<()> {
        match change {
            SettingsChange::ToggleDarkMode => {
                self.dark_mode = !self.dark_mode;
            }
            SettingsChange::RingDuration(secs) => {
                let (min, max) = RING_DURATION_RANGE;
                if !(min..=max).contains(&secs) || secs % RING_DURATION_STEP != 0 {
                    bail!("ring duration must be {min}-{max} seconds in steps of {RING_DURATION_STEP}, got {secs}");
                }
                self.ring_duration_secs = secs;
            }
            SettingsChange::SnoozeDuration(minutes) => {
                let (min, max) = SNOOZE_RANGE;
                if !(min..=max).contains(&minutes) {
                    bail!("snooze duration must be {min}-{max} minutes, got {minutes}");
                }
                self.snooze_minutes = minutes;
            }
            SettingsChange::Ringtone(name) => {
                let name = name.trim();
                if !self.has_ringtone(name) {
                    return Err(anyhow!("unknown ringtone: {name}"));
                }
                self.selected_ringtone = name.to_string();
            }
            SettingsChange::AddCustomRingtone(name) => {
                let name = name.trim();
                if name.is_empty() {
                    bail!("ringtone name cannot be empty");
                }
                if self.has_ringtone(name) {
                    bail!("ringtone already exists: {name}");
                }
                self.custom_ringtones.push(name.to_string());
            }
        }
        debug!(settings = ?self, "settings updated");
        Ok(())
    }

    pub fn has_ringtone(&self, name: &str) -> bool {
        DEFAULT_RINGTONES.iter().any(|(id, _)| *id == name) || self.custom_ringtones.iter().any(|c| c == name)
    }

    /// Every selectable ringtone as `(id, display name)`, built-ins first.
    pub fn ringtones(&self) -> Vec<(String, String)> {
        DEFAULT_RINGTONES
            .iter()
            .map(|(id, name)| (id.to_string(), name.to_string()))
            .chain(self.custom_ringtones.iter().map(|c| (c.clone(), c.clone())))
            .collect()
    }
}
