use chrono::NaiveDate;
use planner_shared::EntityKind;
use tracing::{debug, info, instrument};

use crate::form::{EntityForm, Submission};

/// Single create entry point: pick a kind, open its form, forward the
/// submission.
#[derive(Debug, Clone)]
pub struct QuickAdd {
    selected: EntityKind,
    form: Option<EntityForm>,
}

impl QuickAdd {
    pub fn new(default_kind: Option<EntityKind>) -> Self {
        Self {
            selected: default_kind.unwrap_or(EntityKind::Task),
            form: None,
        }
    }

    /// The three choices with the current selection marked.
    pub fn options(&self) -> Vec<(EntityKind, bool)> {
        EntityKind::ALL
            .iter()
            .map(|kind| (*kind, *kind == self.selected))
            .collect()
    }

    pub fn selected(&self) -> EntityKind {
        self.selected
    }

    pub fn select(&mut self, kind: EntityKind) {
        debug!(%kind, "quick-add selection changed");
        self.selected = kind;
    }

    /// Opens a blank form of the selected kind, replacing any open one.
    #[instrument(skip(self, today), fields(kind = %self.selected))]
    pub fn confirm(&mut self, today: NaiveDate) -> &mut EntityForm {
        debug!("opening quick-add form");
        self.form.insert(EntityForm::create(self.selected, today))
    }

    pub fn is_open(&self) -> bool {
        self.form.is_some()
    }

    pub fn form_mut(&mut self) -> Option<&mut EntityForm> {
        self.form.as_mut()
    }

    /// Submits the open form. A valid submission goes to `on_submit` and
    /// closes the dialog; an invalid one is dropped silently and the form
    /// stays open. Returns whether anything was forwarded.
    #[instrument(skip(self, on_submit))]
    pub fn submit<F>(&mut self, on_submit: F) -> bool
    where
        F: FnOnce(Submission),
    {
        let Some(form) = self.form.as_mut() else {
            debug!("no quick-add form open");
            return false;
        };

        match form.submit() {
            Ok(submission) => {
                info!(kind = %submission.input.kind(), "quick-add submitted");
                self.form = None;
                on_submit(submission);
                true
            }
            Err(err) => {
                debug!(error = %err, "quick-add submission rejected");
                false
            }
        }
    }

    pub fn cancel(&mut self) {
        if self.form.take().is_some() {
            debug!("quick-add form cancelled");
        }
    }
}

impl Default for QuickAdd {
    fn default() -> Self {
        Self::new(None)
    }
}
