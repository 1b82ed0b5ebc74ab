use chrono::{DateTime, Local};

use super::label_form::{FormField, FormStatus};
use super::queue::QueueStatus;
use super::session::ReviewSession;
use super::types::QueueItem;

pub const MISSING: &str = "–";
pub const DETAIL_PLACEHOLDER: &str = "No item selected. Pick a row and press Enter.";

#[derive(Debug, Clone, PartialEq)]
pub struct ReviewView {
    pub meta: String,
    pub filter_summary: String,
    pub page_label: String,
    pub prev_enabled: bool,
    pub next_enabled: bool,
    pub loading: bool,
    pub body: QueueBody,
    pub detail: DetailView,
    pub form: FormView,
}

#[derive(Debug, Clone, PartialEq)]
pub enum QueueBody {
    Loading,
    Empty,
    Failed(String),
    Rows(Vec<QueueRow>),
}

#[derive(Debug, Clone, PartialEq)]
pub struct QueueRow {
    pub id: String,
    pub detector: String,
    pub model_label: String,
    pub confidence: String,
    pub model_confidence: Option<f64>,
    pub received: String,
    pub status: String,
    pub human_label: Option<String>,
    pub selected: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub enum DetailView {
    Placeholder(String),
    Item {
        id: String,
        fields: Vec<(&'static str, String)>,
        error: Option<String>,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub struct FormView {
    pub choices: Vec<LabelChoice>,
    pub fields: Vec<FormFieldView>,
    pub status: Option<String>,
    pub status_is_error: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct LabelChoice {
    pub key: char,
    pub label: String,
    pub chosen: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FormFieldView {
    pub title: &'static str,
    pub value: String,
    pub focused: bool,
}

pub fn project(session: &ReviewSession) -> ReviewView {
    let queue = session.queue();
    let filter = queue.filter();
    let pagination = queue.pagination();
    let (page, pages) = pagination.page_position();

    let selected = session.selection().current_id();
    let body = match queue.status() {
        QueueStatus::Failed(err) => QueueBody::Failed(err.detail().to_string()),
        QueueStatus::Loading | QueueStatus::Idle if queue.items().is_empty() => QueueBody::Loading,
        _ if queue.items().is_empty() => QueueBody::Empty,
        _ => QueueBody::Rows(
            queue
                .items()
                .iter()
                .map(|item| queue_row(item, selected == Some(item.id.as_str())))
                .collect(),
        ),
    };

    let mut filter_summary = if filter.pending_only {
        "pending only".to_string()
    } else {
        "all items".to_string()
    };
    if let Some(detector) = &filter.detector_id {
        filter_summary.push_str(&format!(" · detector {detector}"));
    }
    filter_summary.push_str(&format!(" · limit {}", filter.limit));

    ReviewView {
        meta: format!("Showing {} of {}", queue.items().len(), queue.total()),
        filter_summary,
        page_label: format!("page {page}/{pages}"),
        prev_enabled: pagination.prev_enabled(),
        next_enabled: pagination.next_enabled(),
        loading: queue.is_loading(),
        body,
        detail: detail_view(session),
        form: form_view(session),
    }
}

fn queue_row(item: &QueueItem, selected: bool) -> QueueRow {
    QueueRow {
        id: item.id.clone(),
        detector: text_or_missing(item.detector_id.as_deref()),
        model_label: text_or_missing(item.model_label.as_deref()),
        confidence: format_confidence(item.model_confidence),
        model_confidence: item.model_confidence,
        received: format_timestamp(item.received_ts.as_deref()),
        status: review_state(item),
        human_label: item.human_label.clone(),
        selected,
    }
}

fn review_state(item: &QueueItem) -> String {
    match item.human_label.as_deref() {
        Some(label) => format!("Labeled ({label})"),
        None => "Pending".to_string(),
    }
}

fn detail_view(session: &ReviewSession) -> DetailView {
    let selection = session.selection();
    let error = selection.error().map(|err| err.detail().to_string());
    let Some(item) = selection.detail() else {
        let text = match (selection.pending_id(), &error) {
            (Some(id), _) => format!("Loading {id}…"),
            (None, Some(err)) => format!("Could not load item: {err}"),
            (None, None) => DETAIL_PLACEHOLDER.to_string(),
        };
        return DetailView::Placeholder(text);
    };

    let count = item.count.map(|c| c.to_string());
    let fields = vec![
        ("Detector", text_or_missing(item.detector_id.as_deref())),
        ("Status", text_or_missing(item.status.as_deref())),
        ("Result type", text_or_missing(item.result_type.as_deref())),
        ("Model label", text_or_missing(item.model_label.as_deref())),
        ("Model confidence", format_confidence(item.model_confidence)),
        ("Count", text_or_missing(count.as_deref())),
        ("Received", format_timestamp(item.received_ts.as_deref())),
        ("Updated", format_timestamp(item.updated_ts.as_deref())),
        ("Human label", text_or_missing(item.human_label.as_deref())),
        ("Human confidence", format_confidence(item.human_confidence)),
        ("Reviewer", text_or_missing(item.human_user.as_deref())),
        ("Notes", text_or_missing(item.human_notes.as_deref())),
        ("Labeled at", format_timestamp(item.human_labeled_at.as_deref())),
        ("Image", text_or_missing(item.image_uri.as_deref())),
    ];
    DetailView::Item {
        id: item.id.clone(),
        fields,
        error,
    }
}

fn form_view(session: &ReviewSession) -> FormView {
    let form = session.form();
    let choices = session
        .labels()
        .iter()
        .take(9)
        .enumerate()
        .map(|(idx, label)| LabelChoice {
            key: char::from_digit(idx as u32 + 1, 10).unwrap_or('?'),
            label: label.clone(),
            chosen: form.label == *label,
        })
        .collect();
    let fields = FormField::ALL
        .iter()
        .map(|field| FormFieldView {
            title: field.title(),
            value: form.field(*field).to_string(),
            focused: form.focus() == *field,
        })
        .collect();

    let (status, status_is_error) = match form.status() {
        FormStatus::Idle => (None, false),
        FormStatus::Submitting => (Some("Saving…".to_string()), false),
        FormStatus::Saved => (Some("Label saved".to_string()), false),
        FormStatus::Invalid(err) => (Some(err.to_string()), true),
        FormStatus::Failed(err) => (Some(format!("Save failed: {}", err.detail())), true),
    };

    FormView {
        choices,
        fields,
        status,
        status_is_error,
    }
}

fn text_or_missing(value: Option<&str>) -> String {
    match value {
        Some(text) if !text.is_empty() => text.to_string(),
        _ => MISSING.to_string(),
    }
}

pub fn format_confidence(value: Option<f64>) -> String {
    match value {
        Some(value) if value.is_finite() => format!("{:.1}%", value * 100.0),
        _ => MISSING.to_string(),
    }
}

pub fn format_timestamp(value: Option<&str>) -> String {
    let Some(raw) = value.filter(|raw| !raw.trim().is_empty()) else {
        return MISSING.to_string();
    };
    match DateTime::parse_from_rfc3339(raw) {
        Ok(ts) => ts
            .with_timezone(&Local)
            .format("%Y-%m-%d %H:%M:%S")
            .to_string(),
        Err(_) => raw.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::error::TransportError;
    use crate::app::test_support::{labeled_item, sample_item, sample_page};
    use crate::app::types::{Filter, QueuePage};

    fn session() -> ReviewSession {
        ReviewSession::new(
            Filter::default(),
            ["YES", "NO", "UNCLEAR"].map(String::from).to_vec(),
            None,
        )
    }

    #[test]
    fn confidence_and_timestamp_formatting() {
        assert_eq!(format_confidence(Some(0.875)), "87.5%");
        assert_eq!(format_confidence(Some(1.0)), "100.0%");
        assert_eq!(format_confidence(None), MISSING);
        assert_eq!(format_timestamp(None), MISSING);
        assert_eq!(format_timestamp(Some("yesterday")), "yesterday");

        let expected = DateTime::parse_from_rfc3339("2026-10-01T08:30:00+00:00")
            .unwrap()
            .with_timezone(&Local)
            .format("%Y-%m-%d %H:%M:%S")
            .to_string();
        assert_eq!(
            format_timestamp(Some("2026-10-01T08:30:00+00:00")),
            expected
        );
    }

    #[test]
    fn fresh_session_shows_loading_and_placeholder() {
        let view = project(&session());
        assert_eq!(view.body, QueueBody::Loading);
        assert_eq!(
            view.detail,
            DetailView::Placeholder(DETAIL_PLACEHOLDER.to_string())
        );
        assert_eq!(view.meta, "Showing 0 of 0");
        assert_eq!(view.page_label, "page 1/1");
    }

    #[test]
    fn accepted_page_projects_rows_and_meta() {
        let mut session = session();
        let ticket = session.begin_load(Filter::new(true, Some("det_parking".into()), 50, 50));
        session.on_queue_result(ticket, Ok(sample_page(&["a", "b"], 120)));
        let ticket = session.begin_select("b");
        session.on_detail_result(ticket, Ok(sample_item("b")));

        let view = project(&session);
        assert_eq!(view.meta, "Showing 2 of 120");
        assert_eq!(view.page_label, "page 2/3");
        assert_eq!(
            view.filter_summary,
            "pending only · detector det_parking · limit 50"
        );
        assert!(view.prev_enabled && view.next_enabled);
        let QueueBody::Rows(rows) = view.body else {
            panic!("expected rows");
        };
        assert_eq!(rows[0].confidence, "42.0%");
        assert!(!rows[0].selected);
        assert!(rows[1].selected);
    }

    #[test]
    fn status_column_shows_review_state() {
        let mut session = session();
        let ticket = session.refresh();
        session.on_queue_result(
            ticket,
            Ok(QueuePage {
                items: vec![sample_item("a"), labeled_item("b", "NO", "bo")],
                total: 2,
            }),
        );

        let QueueBody::Rows(rows) = project(&session).body else {
            panic!("expected rows");
        };
        assert_eq!(rows[0].status, "Pending");
        assert_eq!(rows[1].status, "Labeled (NO)");
    }

    #[test]
    fn empty_and_failed_queues_are_explicit() {
        let mut session = session();
        let ticket = session.refresh();
        session.on_queue_result(ticket, Ok(sample_page(&[], 0)));
        assert_eq!(project(&session).body, QueueBody::Empty);

        let ticket = session.refresh();
        let err = TransportError::from_status(503, None, r#"{"detail":"db offline"}"#.into());
        session.on_queue_result(ticket, Err(err));
        assert_eq!(
            project(&session).body,
            QueueBody::Failed("db offline".to_string())
        );
    }

    #[test]
    fn detail_lists_human_fields() {
        let mut session = session();
        let ticket = session.refresh();
        session.on_queue_result(ticket, Ok(sample_page(&["a"], 1)));
        let ticket = session.begin_select("a");
        session.on_detail_result(ticket, Ok(labeled_item("a", "NO", "bo")));

        let DetailView::Item { id, fields, error } = project(&session).detail else {
            panic!("expected detail");
        };
        assert_eq!(id, "a");
        assert_eq!(error, None);
        let lookup = |name: &str| {
            fields
                .iter()
                .find(|(title, _)| *title == name)
                .map(|(_, value)| value.clone())
        };
        assert_eq!(lookup("Human label").as_deref(), Some("NO"));
        assert_eq!(lookup("Reviewer").as_deref(), Some("bo"));
        assert_eq!(lookup("Human confidence").as_deref(), Some("90.0%"));
        assert_eq!(lookup("Count").as_deref(), Some(MISSING));
    }

    #[test]
    fn form_view_marks_choice_focus_and_errors() {
        let mut session = session();
        session.choose_label(1);
        let _ = session.begin_submit();

        let form = project(&session).form;
        assert_eq!(form.choices.len(), 3);
        assert_eq!(form.choices[1].key, '2');
        assert!(form.choices[1].chosen);
        assert!(form.fields[0].focused);
        assert_eq!(
            form.status.as_deref(),
            Some("select an item before submitting")
        );
        assert!(form.status_is_error);
    }
}
