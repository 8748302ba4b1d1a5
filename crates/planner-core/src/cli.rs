use std::io::IsTerminal;
use std::path::PathBuf;

use anyhow::{anyhow, bail};
use clap::{ArgAction, Args, Parser, Subcommand};
use planner_shared::{EntityKind, Priority};
use tracing::debug;
use tracing_subscriber::EnvFilter;

use crate::archive::KindFilter;
use crate::filter::StatusFilter;

#[derive(Debug, Clone)]
pub struct KeyVal {
    pub key: String,
    pub value: String,
}

impl std::str::FromStr for KeyVal {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (k, v) = s
            .split_once('=')
            .ok_or_else(|| anyhow!("expected KEY=VALUE, got: {s}"))?;
        Ok(Self {
            key: k.trim().to_string(),
            value: v.trim().to_string(),
        })
    }
}

#[derive(Parser, Debug, Clone)]
#[command(
    name = "planner",
    version,
    about = "Personal planner for tasks, events and goals",
    after_help = "Commands are read from stdin, one per line. Type `help` in a session for the list."
)]
pub struct GlobalCli {
    #[arg(short = 'v', long = "verbose", action = ArgAction::Count)]
    pub verbose: u8,

    #[arg(short = 'q', long = "quiet", action = ArgAction::Count)]
    pub quiet: u8,

    /// Config file; overrides PLANNER_CONFIG and the default location.
    #[arg(long = "config")]
    pub config: Option<PathBuf>,

    /// Override a config key, e.g. `--set archive.retention_days=14`.
    #[arg(
        long = "set",
        value_parser = clap::builder::ValueParser::new(|s: &str| s.parse::<KeyVal>()),
        action = ArgAction::Append
    )]
    pub overrides: Vec<KeyVal>,

    /// Start with empty stores instead of the sample data.
    #[arg(long = "no-fixtures")]
    pub no_fixtures: bool,
}

pub fn init_tracing(verbose: u8, quiet: u8) -> anyhow::Result<()> {
    let default_level = if quiet >= 2 {
        "error"
    } else if quiet == 1 {
        "warn"
    } else if verbose >= 3 {
        "trace"
    } else if verbose == 2 {
        "debug"
    } else if verbose == 1 {
        "info"
    } else {
        "warn"
    };

    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(default_level))
        .map_err(|e| anyhow!("invalid RUST_LOG / log filter: {e}"))?;

    let init_result = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .with_target(true)
        .with_level(true)
        .with_ansi(std::io::stderr().is_terminal())
        .try_init();

    if let Err(err) = init_result {
        debug!(error = %err, "tracing subscriber already set, continuing");
    }

    Ok(())
}

/// One line typed into a session.
#[derive(Parser, Debug, Clone)]
#[command(
    name = "planner",
    no_binary_name = true,
    disable_help_subcommand = true,
    disable_version_flag = true
)]
pub struct SessionLine {
    #[command(subcommand)]
    pub action: Action,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Action {
    /// List tasks
    Tasks {
        query: Option<String>,
        #[arg(long, value_enum, default_value_t = StatusFilter::All)]
        status: StatusFilter,
    },
    /// List events, or the events on one date
    Events {
        query: Option<String>,
        #[arg(long, value_enum, default_value_t = StatusFilter::All)]
        status: StatusFilter,
        #[arg(long)]
        on: Option<String>,
    },
    /// List goals with progress
    Goals {
        query: Option<String>,
        #[arg(long, value_enum, default_value_t = StatusFilter::All)]
        status: StatusFilter,
    },
    /// Completed items with their retention countdown
    Archive {
        query: Option<String>,
        #[arg(long, value_enum, default_value_t = KindFilter::All)]
        kind: KindFilter,
    },
    /// Overview of open work
    Dashboard,
    /// Quick-add a task, event or goal
    Add {
        kind: Option<EntityKind>,
        #[command(flatten)]
        fields: FormFields,
    },
    /// Edit a record through its form
    Edit {
        kind: EntityKind,
        id: String,
        #[command(flatten)]
        fields: FormFields,
    },
    /// Toggle completion of a task or event
    Done { kind: EntityKind, id: String },
    /// Toggle one section of a goal
    Section { goal_id: String, section_id: String },
    /// Remove a record
    Delete { kind: EntityKind, id: String },
    /// Show or change preferences
    Settings {
        #[command(subcommand)]
        change: Option<SettingsAction>,
    },
    /// Remove every task, event and goal
    ClearAll,
    /// Print all state as JSON
    Export,
    /// Current time and date
    Clock,
    /// Show this help
    Help,
    /// Leave the session
    #[command(alias = "exit")]
    Quit,
}

#[derive(Subcommand, Debug, Clone)]
pub enum SettingsAction {
    Show,
    DarkMode,
    Ring { secs: u32 },
    Snooze { minutes: u32 },
    Ringtone { name: String },
    AddRingtone { name: String },
}

/// Form fields settable from the command line. Which ones apply depends
/// on the record kind.
#[derive(Args, Debug, Clone, Default)]
pub struct FormFields {
    #[arg(long)]
    pub title: Option<String>,
    #[arg(long)]
    pub description: Option<String>,
    /// Task due date; `none` clears it
    #[arg(long)]
    pub due: Option<String>,
    #[arg(long)]
    pub priority: Option<Priority>,
    #[arg(long)]
    pub date: Option<String>,
    #[arg(long)]
    pub start: Option<String>,
    #[arg(long)]
    pub end: Option<String>,
    #[arg(long)]
    pub location: Option<String>,
    #[arg(long = "start-date")]
    pub start_date: Option<String>,
    #[arg(long = "end-date")]
    pub end_date: Option<String>,
    /// Goal section title; repeat to replace all sections
    #[arg(long = "section", action = ArgAction::Append)]
    pub sections: Vec<String>,
    #[arg(long = "add-section", action = ArgAction::Append)]
    pub add_sections: Vec<String>,
    #[arg(long = "remove-section", action = ArgAction::Append)]
    pub remove_sections: Vec<String>,
    /// `ID=TITLE`
    #[arg(
        long = "rename-section",
        value_parser = clap::builder::ValueParser::new(|s: &str| s.parse::<KeyVal>()),
        action = ArgAction::Append
    )]
    pub rename_sections: Vec<KeyVal>,
}

impl FormFields {
    pub fn is_empty(&self) -> bool {
        self.title.is_none()
            && self.description.is_none()
            && self.due.is_none()
            && self.priority.is_none()
            && self.date.is_none()
            && self.start.is_none()
            && self.end.is_none()
            && self.location.is_none()
            && self.start_date.is_none()
            && self.end_date.is_none()
            && self.sections.is_empty()
            && self.add_sections.is_empty()
            && self.remove_sections.is_empty()
            && self.rename_sections.is_empty()
    }

    /// First flag given that the `kind` form has no field for.
    pub fn foreign_to(&self, kind: EntityKind) -> Option<&'static str> {
        let task_only = [("due", self.due.is_some()), ("priority", self.priority.is_some())];
        let event_only = [
            ("date", self.date.is_some()),
            ("start", self.start.is_some()),
            ("end", self.end.is_some()),
            ("location", self.location.is_some()),
        ];
        let goal_only = [
            ("start-date", self.start_date.is_some()),
            ("end-date", self.end_date.is_some()),
            ("section", !self.sections.is_empty()),
            ("add-section", !self.add_sections.is_empty()),
            ("remove-section", !self.remove_sections.is_empty()),
            ("rename-section", !self.rename_sections.is_empty()),
        ];

        let foreign: Vec<(&'static str, bool)> = match kind {
            EntityKind::Task => event_only.into_iter().chain(goal_only).collect(),
            EntityKind::Event => task_only.into_iter().chain(goal_only).collect(),
            EntityKind::Goal => task_only.into_iter().chain(event_only).collect(),
        };
        foreign.into_iter().find(|(_, set)| *set).map(|(flag, _)| flag)
    }
}

/// Splits a session line into words. Single or double quotes group
/// words; a backslash escapes the next character.
pub fn split_line(line: &str) -> anyhow::Result<Vec<String>> {
    let mut words = Vec::new();
    let mut current = String::new();
    let mut in_word = false;
    let mut quote: Option<char> = None;
    let mut chars = line.chars();

    while let Some(ch) = chars.next() {
        match (quote, ch) {
            (_, '\\') => {
                let escaped = chars
                    .next()
                    .ok_or_else(|| anyhow!("line ends with a bare backslash"))?;
                current.push(escaped);
                in_word = true;
            }
            (Some(q), c) if c == q => quote = None,
            (Some(_), c) => current.push(c),
            (None, '"' | '\'') => {
                quote = Some(ch);
                in_word = true;
            }
            (None, c) if c.is_whitespace() => {
                if in_word {
                    words.push(std::mem::take(&mut current));
                    in_word = false;
                }
            }
            (None, c) => {
                current.push(c);
                in_word = true;
            }
        }
    }

    if let Some(q) = quote {
        bail!("unterminated {q} quote");
    }
    if in_word {
        words.push(current);
    }
    Ok(words)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quotes_group_words() {
        let words = split_line(r#"add task --title "Write report" --description 'for Q1'"#).expect("split");
        assert_eq!(words, vec!["add", "task", "--title", "Write report", "--description", "for Q1"]);
    }

    #[test]
    fn empty_quotes_make_an_empty_word() {
        assert_eq!(split_line(r#"tasks """#).expect("split"), vec!["tasks", ""]);
        assert!(split_line("  ").expect("split").is_empty());
    }

    #[test]
    fn unterminated_quote_is_an_error() {
        assert!(split_line("add task --title \"oops").is_err());
    }

    #[test]
    fn parses_session_lines() {
        let line = SessionLine::try_parse_from(["events", "--status", "pending", "--on", "tomorrow"]).expect("parse");
        match line.action {
            Action::Events { query, status, on } => {
                assert_eq!(query, None);
                assert_eq!(status, StatusFilter::Pending);
                assert_eq!(on.as_deref(), Some("tomorrow"));
            }
            other => panic!("unexpected {other:?}"),
        }

        let line = SessionLine::try_parse_from(["settings", "add-ringtone", "birds"]).expect("parse");
        assert!(matches!(
            line.action,
            Action::Settings {
                change: Some(SettingsAction::AddRingtone { .. })
            }
        ));

        let line = SessionLine::try_parse_from(["exit"]).expect("parse");
        assert!(matches!(line.action, Action::Quit));
    }

    #[test]
    fn foreign_fields_are_detected() {
        let fields = FormFields {
            start: Some("10:00".to_string()),
            ..FormFields::default()
        };
        assert_eq!(fields.foreign_to(EntityKind::Task), Some("start"));
        assert_eq!(fields.foreign_to(EntityKind::Event), None);
        assert!(!fields.is_empty());
        assert!(FormFields::default().is_empty());
    }

    #[test]
    fn key_val_requires_equals() {
        assert!("archive.retention_days".parse::<KeyVal>().is_err());
        let kv: KeyVal = "color = off".parse().expect("kv");
        assert_eq!((kv.key.as_str(), kv.value.as_str()), ("color", "off"));
    }
}
