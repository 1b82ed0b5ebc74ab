use tracing::{debug, info};

use super::client::ReviewApi;
use super::error::{SubmitError, TransportError, ValidationError};
use super::label_form::{LabelForm, SubmitTicket};
use super::queue::{LoadOutcome, LoadTicket, QueueStore};
use super::selection::{SelectOutcome, SelectTicket, SelectionController};
use super::types::{DEFAULT_LIMIT, Filter, LIMIT_CHOICES, QueueItem, QueuePage};

#[derive(Debug)]
pub struct ReviewSession {
    queue: QueueStore,
    selection: SelectionController,
    form: LabelForm,
    labels: Vec<String>,
}

impl ReviewSession {
    pub fn new(filter: Filter, labels: Vec<String>, user: Option<String>) -> Self {
        Self {
            queue: QueueStore::new(filter),
            selection: SelectionController::default(),
            form: LabelForm::with_user(user),
            labels,
        }
    }

    pub fn queue(&self) -> &QueueStore {
        &self.queue
    }

    pub fn selection(&self) -> &SelectionController {
        &self.selection
    }

    pub fn form(&self) -> &LabelForm {
        &self.form
    }

    pub fn form_mut(&mut self) -> &mut LabelForm {
        &mut self.form
    }

    pub fn labels(&self) -> &[String] {
        &self.labels
    }

    pub fn choose_label(&mut self, index: usize) -> bool {
        let Some(label) = self.labels.get(index) else {
            return false;
        };
        self.form.set_label(label);
        true
    }

    pub fn begin_load(&mut self, filter: Filter) -> LoadTicket {
        self.queue.begin_load(filter)
    }

    pub fn refresh(&mut self) -> LoadTicket {
        self.queue.reload()
    }

    pub fn next_page(&mut self) -> Option<LoadTicket> {
        let pagination = self.queue.pagination();
        if !pagination.next_enabled() {
            return None;
        }
        let filter = self.queue.filter().with_offset(pagination.next());
        Some(self.queue.begin_load(filter))
    }

    pub fn prev_page(&mut self) -> Option<LoadTicket> {
        let pagination = self.queue.pagination();
        if !pagination.prev_enabled() {
            return None;
        }
        let filter = self.queue.filter().with_offset(pagination.prev());
        Some(self.queue.begin_load(filter))
    }

    pub fn set_detector(&mut self, detector_id: Option<String>) -> LoadTicket {
        let current = self.queue.filter();
        let filter = Filter::new(current.pending_only, detector_id, current.limit, 0);
        self.queue.begin_load(filter)
    }

    pub fn toggle_pending(&mut self) -> LoadTicket {
        let current = self.queue.filter();
        let filter = Filter::new(
            !current.pending_only,
            current.detector_id.clone(),
            current.limit,
            0,
        );
        self.queue.begin_load(filter)
    }

    pub fn step_limit(&mut self, grow: bool) -> Option<LoadTicket> {
        let current = self.queue.filter();
        let idx = LIMIT_CHOICES.iter().position(|choice| *choice == current.limit);
        let limit = match (idx, grow) {
            (Some(idx), true) => *LIMIT_CHOICES.get(idx + 1)?,
            (Some(idx), false) => *LIMIT_CHOICES.get(idx.checked_sub(1)?)?,
            (None, _) => DEFAULT_LIMIT,
        };
        let offset = current.offset / limit * limit;
        let filter = Filter::new(
            current.pending_only,
            current.detector_id.clone(),
            limit,
            offset,
        );
        Some(self.queue.begin_load(filter))
    }

    pub fn on_queue_result(
        &mut self,
        ticket: LoadTicket,
        result: Result<QueuePage, TransportError>,
    ) -> LoadOutcome {
        let outcome = self.queue.apply_load(ticket, result);
        if outcome == LoadOutcome::Accepted {
            self.reconcile_selection();
        }
        outcome
    }

    fn reconcile_selection(&mut self) {
        if self.selection.reconcile(self.queue.items()) {
            info!("selected item left the queue");
        }
    }

    pub fn begin_select(&mut self, id: &str) -> SelectTicket {
        self.selection.begin_select(id)
    }

    pub fn on_detail_result(
        &mut self,
        ticket: SelectTicket,
        result: Result<QueueItem, TransportError>,
    ) -> SelectOutcome {
        let outcome = self.selection.apply_select(ticket, result);
        if outcome == SelectOutcome::Applied {
            self.prefill_from_detail();
        }
        outcome
    }

    fn prefill_from_detail(&mut self) {
        if let Some(item) = self.selection.detail() {
            self.form.prefill(item);
        }
    }

    pub fn begin_submit(&mut self) -> Result<SubmitTicket, ValidationError> {
        self.form.begin_submit(self.selection.current_id())
    }

    pub fn on_submit_result(
        &mut self,
        ticket: &SubmitTicket,
        result: Result<QueueItem, TransportError>,
    ) -> Option<LoadTicket> {
        self.form.apply_submit(ticket, &result);
        let item = result.ok()?;
        if self.selection.apply_submitted(item) {
            self.prefill_from_detail();
        } else {
            debug!(id = ticket.id(), "selection moved on before the label was saved");
        }
        Some(self.queue.reload())
    }

    pub async fn load_now<A: ReviewApi + ?Sized>(&mut self, api: &A, filter: Filter) -> LoadOutcome {
        let outcome = self.queue.load(api, filter).await;
        if outcome == LoadOutcome::Accepted {
            self.reconcile_selection();
        }
        outcome
    }

    pub async fn select_now<A: ReviewApi + ?Sized>(&mut self, api: &A, id: &str) -> SelectOutcome {
        let outcome = self.selection.select(api, id).await;
        if outcome == SelectOutcome::Applied {
            self.prefill_from_detail();
        }
        outcome
    }

    pub async fn submit_now<A: ReviewApi + ?Sized>(
        &mut self,
        api: &A,
    ) -> Result<QueueItem, SubmitError> {
        let ticket = self.begin_submit()?;
        let result = api.submit_label(ticket.id(), ticket.submission()).await;
        let reload = self.on_submit_result(&ticket, result.clone());
        let saved = result?;
        if let Some(reload) = reload {
            let outcome = self.queue.drive(api, reload).await;
            if outcome == LoadOutcome::Accepted {
                self.reconcile_selection();
            }
        }
        Ok(saved)
    }
}
