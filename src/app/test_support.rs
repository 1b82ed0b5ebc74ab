use std::collections::VecDeque;
use std::sync::Mutex;

use async_trait::async_trait;

use super::client::ReviewApi;
use super::error::TransportError;
use super::types::{Filter, LabelSubmission, QueueItem, QueuePage};

pub(crate) fn sample_item(id: &str) -> QueueItem {
    QueueItem {
        id: id.to_string(),
        detector_id: Some("det_parking".to_string()),
        model_label: Some("YES".to_string()),
        model_confidence: Some(0.42),
        result_type: Some("binary".to_string()),
        status: Some("DONE".to_string()),
        count: None,
        received_ts: Some("2026-10-01T08:30:00+00:00".to_string()),
        updated_ts: Some("2026-10-01T08:30:02+00:00".to_string()),
        human_label: None,
        human_confidence: None,
        human_user: None,
        human_notes: None,
        human_labeled_at: None,
        image_uri: Some(format!("https://blob.example/{id}.jpg")),
    }
}

pub(crate) fn labeled_item(id: &str, label: &str, user: &str) -> QueueItem {
    QueueItem {
        human_label: Some(label.to_string()),
        human_user: Some(user.to_string()),
        human_confidence: Some(0.9),
        human_notes: Some("checked at full size".to_string()),
        human_labeled_at: Some("2026-10-02T10:00:00+00:00".to_string()),
        ..sample_item(id)
    }
}

pub(crate) fn sample_page(ids: &[&str], total: u64) -> QueuePage {
    QueuePage {
        items: ids.iter().map(|id| sample_item(id)).collect(),
        total,
    }
}

#[derive(Default)]
pub(crate) struct ScriptedApi {
    pages: Mutex<VecDeque<Result<QueuePage, TransportError>>>,
    items: Mutex<VecDeque<Result<QueueItem, TransportError>>>,
    pub list_calls: Mutex<Vec<Filter>>,
    pub get_calls: Mutex<Vec<String>>,
    pub submit_calls: Mutex<Vec<(String, LabelSubmission)>>,
}

impl ScriptedApi {
    pub fn with_pages(pages: Vec<Result<QueuePage, TransportError>>) -> Self {
        Self {
            pages: Mutex::new(pages.into()),
            ..Self::default()
        }
    }

    pub fn push_item(&self, item: Result<QueueItem, TransportError>) {
        self.items.lock().unwrap().push_back(item);
    }

    pub fn request_count(&self) -> usize {
        self.list_calls.lock().unwrap().len()
            + self.get_calls.lock().unwrap().len()
            + self.submit_calls.lock().unwrap().len()
    }
}

#[async_trait]
impl ReviewApi for ScriptedApi {
    async fn list_queue(&self, filter: &Filter) -> Result<QueuePage, TransportError> {
        self.list_calls.lock().unwrap().push(filter.clone());
        self.pages
            .lock()
            .unwrap()
            .pop_front()
            .expect("unscripted list_queue call")
    }

    async fn get_item(&self, id: &str) -> Result<QueueItem, TransportError> {
        self.get_calls.lock().unwrap().push(id.to_string());
        self.items
            .lock()
            .unwrap()
            .pop_front()
            .expect("unscripted get_item call")
    }

    async fn submit_label(
        &self,
        id: &str,
        submission: &LabelSubmission,
    ) -> Result<QueueItem, TransportError> {
        self.submit_calls
            .lock()
            .unwrap()
            .push((id.to_string(), submission.clone()));
        self.items
            .lock()
            .unwrap()
            .pop_front()
            .expect("unscripted submit_label call")
    }
}
