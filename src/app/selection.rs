use std::collections::HashSet;

use tracing::{debug, info, warn};

use super::client::ReviewApi;
use super::error::TransportError;
use super::types::QueueItem;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectTicket {
    seq: u64,
    id: String,
}

impl SelectTicket {
    pub fn id(&self) -> &str {
        &self.id
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum SelectOutcome {
    Applied,
    Stale,
    Vanished,
    Failed(TransportError),
}

#[derive(Debug, Default)]
pub struct SelectionController {
    current_id: Option<String>,
    detail: Option<QueueItem>,
    pending_id: Option<String>,
    visible: HashSet<String>,
    error: Option<TransportError>,
    issued: u64,
}

impl SelectionController {
    pub fn current_id(&self) -> Option<&str> {
        self.current_id.as_deref()
    }

    pub fn detail(&self) -> Option<&QueueItem> {
        self.detail.as_ref()
    }

    pub fn pending_id(&self) -> Option<&str> {
        self.pending_id.as_deref()
    }

    pub fn error(&self) -> Option<&TransportError> {
        self.error.as_ref()
    }

    pub fn begin_select(&mut self, id: &str) -> SelectTicket {
        self.issued += 1;
        self.pending_id = Some(id.to_string());
        debug!(seq = self.issued, id, "detail request issued");
        SelectTicket {
            seq: self.issued,
            id: id.to_string(),
        }
    }

    pub fn apply_select(
        &mut self,
        ticket: SelectTicket,
        result: Result<QueueItem, TransportError>,
    ) -> SelectOutcome {
        if ticket.seq != self.issued {
            debug!(
                seq = ticket.seq,
                latest = self.issued,
                id = %ticket.id,
                "discarding superseded detail response"
            );
            return SelectOutcome::Stale;
        }
        self.pending_id = None;

        if !self.visible.contains(&ticket.id) {
            info!(id = %ticket.id, "selected item left the queue before its detail arrived");
            return SelectOutcome::Vanished;
        }

        match result {
            Ok(item) => {
                self.current_id = Some(ticket.id);
                self.detail = Some(item);
                self.error = None;
                SelectOutcome::Applied
            }
            Err(err) => {
                warn!(id = %ticket.id, error = %err, "failed to load selected item");
                self.error = Some(err.clone());
                SelectOutcome::Failed(err)
            }
        }
    }

    pub fn reconcile(&mut self, items: &[QueueItem]) -> bool {
        self.visible = items.iter().map(|item| item.id.clone()).collect();
        let Some(current) = self.current_id.as_deref() else {
            return false;
        };
        if self.visible.contains(current) {
            return false;
        }
        debug!(id = current, "selection no longer on the page, clearing detail");
        self.clear();
        true
    }

    pub fn apply_submitted(&mut self, item: QueueItem) -> bool {
        if self.current_id.as_deref() != Some(item.id.as_str()) {
            debug!(id = %item.id, "submit response for an item that is no longer selected");
            return false;
        }
        // An in-flight detail for this id is older than the submit echo.
        if self.pending_id.as_deref() == Some(item.id.as_str()) {
            self.issued += 1;
            self.pending_id = None;
        }
        self.detail = Some(item);
        self.error = None;
        true
    }

    pub fn clear(&mut self) {
        self.current_id = None;
        self.detail = None;
        self.error = None;
    }

    pub async fn select<A: ReviewApi + ?Sized>(&mut self, api: &A, id: &str) -> SelectOutcome {
        let ticket = self.begin_select(id);
        let result = api.get_item(id).await;
        self.apply_select(ticket, result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::test_support::{ScriptedApi, labeled_item, sample_item, sample_page};

    fn controller_with_page(ids: &[&str]) -> SelectionController {
        let mut selection = SelectionController::default();
        selection.reconcile(&sample_page(ids, ids.len() as u64).items);
        selection
    }

    #[test]
    fn applies_detail_from_the_item_endpoint() {
        let mut selection = controller_with_page(&["x", "y"]);
        let ticket = selection.begin_select("x");
        assert_eq!(selection.pending_id(), Some("x"));
        assert_eq!(selection.current_id(), None);

        let outcome = selection.apply_select(ticket, Ok(labeled_item("x", "YES", "ana")));
        assert_eq!(outcome, SelectOutcome::Applied);
        assert_eq!(selection.current_id(), Some("x"));
        assert_eq!(
            selection.detail().and_then(|d| d.human_label.as_deref()),
            Some("YES")
        );
        assert_eq!(selection.pending_id(), None);
    }

    #[test]
    fn only_the_last_selection_is_rendered() {
        let mut selection = controller_with_page(&["x", "y"]);
        let x = selection.begin_select("x");
        let y = selection.begin_select("y");

        assert_eq!(
            selection.apply_select(y, Ok(sample_item("y"))),
            SelectOutcome::Applied
        );
        assert_eq!(
            selection.apply_select(x, Ok(sample_item("x"))),
            SelectOutcome::Stale
        );
        assert_eq!(selection.current_id(), Some("y"));
        assert_eq!(selection.detail().map(|d| d.id.as_str()), Some("y"));
    }

    #[test]
    fn slow_first_response_is_dropped_even_if_second_is_pending() {
        let mut selection = controller_with_page(&["x", "y"]);
        let x = selection.begin_select("x");
        let _y = selection.begin_select("y");

        assert_eq!(
            selection.apply_select(x, Ok(sample_item("x"))),
            SelectOutcome::Stale
        );
        assert!(selection.detail().is_none());
        assert_eq!(selection.pending_id(), Some("y"));
    }

    #[test]
    fn failed_select_keeps_previous_selection() {
        let mut selection = controller_with_page(&["x", "y"]);
        let ticket = selection.begin_select("x");
        selection.apply_select(ticket, Ok(sample_item("x")));

        let ticket = selection.begin_select("y");
        let err = TransportError::from_status(404, None, r#"{"detail":"not found"}"#.into());
        assert_eq!(
            selection.apply_select(ticket, Err(err.clone())),
            SelectOutcome::Failed(err.clone())
        );
        assert_eq!(selection.current_id(), Some("x"));
        assert_eq!(selection.error(), Some(&err));
    }

    #[test]
    fn reconcile_keeps_selection_present_on_new_page() {
        let mut selection = controller_with_page(&["x", "y"]);
        let ticket = selection.begin_select("y");
        selection.apply_select(ticket, Ok(sample_item("y")));

        assert!(!selection.reconcile(&sample_page(&["w", "y"], 2).items));
        assert_eq!(selection.current_id(), Some("y"));
        assert!(selection.detail().is_some());
    }

    #[test]
    fn reconcile_clears_selection_missing_from_new_page() {
        let mut selection = controller_with_page(&["x", "y"]);
        let ticket = selection.begin_select("y");
        selection.apply_select(ticket, Ok(sample_item("y")));

        assert!(selection.reconcile(&sample_page(&["a", "b"], 2).items));
        assert_eq!(selection.current_id(), None);
        assert!(selection.detail().is_none());
    }

    #[test]
    fn detail_for_item_that_left_the_page_is_not_applied() {
        let mut selection = controller_with_page(&["x"]);
        let ticket = selection.begin_select("x");
        selection.reconcile(&sample_page(&["z"], 1).items);

        assert_eq!(
            selection.apply_select(ticket, Ok(sample_item("x"))),
            SelectOutcome::Vanished
        );
        assert_eq!(selection.current_id(), None);
    }

    #[test]
    fn submitted_item_replaces_detail_and_supersedes_older_fetch() {
        let mut selection = controller_with_page(&["x"]);
        let ticket = selection.begin_select("x");
        selection.apply_select(ticket, Ok(sample_item("x")));
        let refetch = selection.begin_select("x");

        assert!(selection.apply_submitted(labeled_item("x", "NO", "ana")));
        assert_eq!(
            selection.apply_select(refetch, Ok(sample_item("x"))),
            SelectOutcome::Stale
        );
        assert_eq!(
            selection.detail().and_then(|d| d.human_label.as_deref()),
            Some("NO")
        );
    }

    #[test]
    fn submitted_item_is_ignored_after_selection_moved() {
        let mut selection = controller_with_page(&["x", "y"]);
        let ticket = selection.begin_select("y");
        selection.apply_select(ticket, Ok(sample_item("y")));

        assert!(!selection.apply_submitted(labeled_item("x", "NO", "ana")));
        assert_eq!(selection.detail().map(|d| d.id.as_str()), Some("y"));
    }

    #[tokio::test]
    async fn select_fetches_detail_through_the_api() {
        let api = ScriptedApi::default();
        api.push_item(Ok(labeled_item("x", "UNCLEAR", "bo")));
        let mut selection = controller_with_page(&["x"]);

        assert_eq!(selection.select(&api, "x").await, SelectOutcome::Applied);
        assert_eq!(*api.get_calls.lock().unwrap(), vec!["x".to_string()]);
        assert_eq!(
            selection.detail().and_then(|d| d.human_user.as_deref()),
            Some("bo")
        );
    }
}
