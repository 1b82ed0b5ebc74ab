use tracing::{info, warn};

use super::error::{TransportError, ValidationError};
use super::types::{LabelSubmission, QueueItem};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FormField {
    #[default]
    Label,
    Confidence,
    Notes,
    User,
    Count,
}

impl FormField {
    pub const ALL: [FormField; 5] = [
        FormField::Label,
        FormField::Confidence,
        FormField::Notes,
        FormField::User,
        FormField::Count,
    ];

    pub fn next(self) -> Self {
        let idx = Self::ALL.iter().position(|f| *f == self).unwrap_or(0);
        Self::ALL[(idx + 1) % Self::ALL.len()]
    }

    pub fn title(self) -> &'static str {
        match self {
            FormField::Label => "Label",
            FormField::Confidence => "Confidence",
            FormField::Notes => "Notes",
            FormField::User => "User",
            FormField::Count => "Count",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub enum FormStatus {
    #[default]
    Idle,
    Invalid(ValidationError),
    Submitting,
    Saved,
    Failed(TransportError),
}

#[derive(Debug, Clone, PartialEq)]
pub struct SubmitTicket {
    id: String,
    submission: LabelSubmission,
}

impl SubmitTicket {
    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn submission(&self) -> &LabelSubmission {
        &self.submission
    }
}

#[derive(Debug, Clone, Default)]
pub struct LabelForm {
    pub label: String,
    pub confidence: String,
    pub notes: String,
    pub user: String,
    pub count: String,
    focus: FormField,
    status: FormStatus,
}

impl LabelForm {
    pub fn with_user(user: Option<String>) -> Self {
        Self {
            user: user.unwrap_or_default(),
            ..Self::default()
        }
    }

    pub fn focus(&self) -> FormField {
        self.focus
    }

    pub fn focus_next(&mut self) {
        self.focus = self.focus.next();
    }

    pub fn status(&self) -> &FormStatus {
        &self.status
    }

    pub fn is_submitting(&self) -> bool {
        self.status == FormStatus::Submitting
    }

    pub fn field(&self, field: FormField) -> &str {
        match field {
            FormField::Label => &self.label,
            FormField::Confidence => &self.confidence,
            FormField::Notes => &self.notes,
            FormField::User => &self.user,
            FormField::Count => &self.count,
        }
    }

    pub fn field_mut(&mut self, field: FormField) -> &mut String {
        match field {
            FormField::Label => &mut self.label,
            FormField::Confidence => &mut self.confidence,
            FormField::Notes => &mut self.notes,
            FormField::User => &mut self.user,
            FormField::Count => &mut self.count,
        }
    }

    pub fn set_label(&mut self, label: &str) {
        self.label = label.to_string();
    }

    pub fn validate(&self, current_id: Option<&str>) -> Result<LabelSubmission, ValidationError> {
        if current_id.is_none() {
            return Err(ValidationError::MissingSelection);
        }
        let label = self.label.trim();
        if label.is_empty() {
            return Err(ValidationError::MissingLabel);
        }

        let confidence = match self.confidence.trim() {
            "" => None,
            raw => match raw.parse::<f64>() {
                Ok(value) if (0.0..=1.0).contains(&value) => Some(value),
                _ => return Err(ValidationError::InvalidConfidence(raw.to_string())),
            },
        };
        let count = match self.count.trim() {
            "" => None,
            raw => Some(
                raw.parse::<u64>()
                    .map_err(|_| ValidationError::InvalidCount(raw.to_string()))?,
            ),
        };

        Ok(LabelSubmission {
            label: label.to_string(),
            confidence,
            notes: non_blank(&self.notes),
            user: non_blank(&self.user),
            count,
        })
    }

    pub fn begin_submit(
        &mut self,
        current_id: Option<&str>,
    ) -> Result<SubmitTicket, ValidationError> {
        match self.validate(current_id) {
            Ok(submission) => {
                let id = current_id.unwrap_or_default().to_string();
                self.status = FormStatus::Submitting;
                info!(%id, label = %submission.label, "submitting label");
                Ok(SubmitTicket { id, submission })
            }
            Err(err) => {
                self.status = FormStatus::Invalid(err.clone());
                Err(err)
            }
        }
    }

    pub fn apply_submit(
        &mut self,
        ticket: &SubmitTicket,
        result: &Result<QueueItem, TransportError>,
    ) {
        match result {
            Ok(_) => {
                info!(id = %ticket.id, label = %ticket.submission.label, "label saved");
                self.status = FormStatus::Saved;
            }
            Err(err) => {
                warn!(id = %ticket.id, error = %err, "label submission failed");
                self.status = FormStatus::Failed(err.clone());
            }
        }
    }

    pub fn prefill(&mut self, item: &QueueItem) {
        self.label.clear();
        if let Some(user) = item.human_user.as_deref().filter(|u| !u.is_empty()) {
            self.user = user.to_string();
        }
        self.confidence = item
            .human_confidence
            .map(|c| c.to_string())
            .unwrap_or_default();
        self.notes = item.human_notes.clone().unwrap_or_default();
        self.count = item.count.map(|c| c.to_string()).unwrap_or_default();
    }

    pub fn clear(&mut self) {
        self.label.clear();
        self.confidence.clear();
        self.notes.clear();
        self.count.clear();
        self.status = FormStatus::Idle;
    }
}

fn non_blank(value: &str) -> Option<String> {
    let trimmed = value.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}
