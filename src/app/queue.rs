use tracing::{debug, info, warn};

use super::client::ReviewApi;
use super::error::TransportError;
use super::pagination::Pagination;
use super::types::{Filter, QueueItem, QueuePage};

#[derive(Debug, Clone, PartialEq)]
pub enum QueueStatus {
    Idle,
    Loading,
    Ready,
    Failed(TransportError),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadTicket {
    seq: u64,
    filter: Filter,
    corrective: bool,
}

impl LoadTicket {
    pub fn seq(&self) -> u64 {
        self.seq
    }

    pub fn filter(&self) -> &Filter {
        &self.filter
    }

    pub fn is_corrective(&self) -> bool {
        self.corrective
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum LoadOutcome {
    Accepted,
    Stale,
    Failed(TransportError),
    Reissue(LoadTicket),
}

#[derive(Debug)]
pub struct QueueStore {
    filter: Filter,
    items: Vec<QueueItem>,
    total: u64,
    status: QueueStatus,
    issued: u64,
}

impl QueueStore {
    pub fn new(filter: Filter) -> Self {
        Self {
            filter,
            items: Vec::new(),
            total: 0,
            status: QueueStatus::Idle,
            issued: 0,
        }
    }

    pub fn filter(&self) -> &Filter {
        &self.filter
    }

    pub fn items(&self) -> &[QueueItem] {
        &self.items
    }

    pub fn total(&self) -> u64 {
        self.total
    }

    pub fn status(&self) -> &QueueStatus {
        &self.status
    }

    pub fn is_loading(&self) -> bool {
        self.status == QueueStatus::Loading
    }

    pub fn pagination(&self) -> Pagination {
        Pagination::new(self.filter.offset, self.filter.limit, self.total)
    }

    pub fn begin_load(&mut self, filter: Filter) -> LoadTicket {
        self.issue(filter, false)
    }

    pub fn reload(&mut self) -> LoadTicket {
        self.issue(self.filter.clone(), false)
    }

    fn issue(&mut self, filter: Filter, corrective: bool) -> LoadTicket {
        self.issued += 1;
        self.filter = filter.clone();
        self.status = QueueStatus::Loading;
        debug!(
            seq = self.issued,
            offset = filter.offset,
            limit = filter.limit,
            corrective,
            "queue load issued"
        );
        LoadTicket {
            seq: self.issued,
            filter,
            corrective,
        }
    }

    pub fn apply_load(
        &mut self,
        ticket: LoadTicket,
        result: Result<QueuePage, TransportError>,
    ) -> LoadOutcome {
        if ticket.seq != self.issued {
            debug!(
                seq = ticket.seq,
                latest = self.issued,
                "discarding superseded queue response"
            );
            return LoadOutcome::Stale;
        }

        let mut page = match result {
            Ok(page) => page,
            Err(err) => {
                warn!(error = %err, "queue load failed");
                self.items.clear();
                self.total = 0;
                self.status = QueueStatus::Failed(err.clone());
                return LoadOutcome::Failed(err);
            }
        };

        let filter = &ticket.filter;
        if page.items.is_empty()
            && filter.offset > 0
            && filter.offset >= page.total
            && !ticket.corrective
        {
            let corrected = filter.with_offset(page.total.saturating_sub(filter.limit));
            info!(
                offset = filter.offset,
                total = page.total,
                corrected = corrected.offset,
                "offset past end of queue, reloading once"
            );
            return LoadOutcome::Reissue(self.issue(corrected, true));
        }

        let limit = usize::try_from(filter.limit).unwrap_or(usize::MAX);
        if page.items.len() > limit {
            warn!(
                received = page.items.len(),
                limit,
                "server returned more items than requested"
            );
            page.items.truncate(limit);
        }

        info!(
            items = page.items.len(),
            total = page.total,
            offset = filter.offset,
            "queue page accepted"
        );
        self.items = page.items;
        self.total = page.total;
        self.status = QueueStatus::Ready;
        LoadOutcome::Accepted
    }

    pub async fn load<A: ReviewApi + ?Sized>(&mut self, api: &A, filter: Filter) -> LoadOutcome {
        let ticket = self.begin_load(filter);
        self.drive(api, ticket).await
    }

    pub async fn drive<A: ReviewApi + ?Sized>(
        &mut self,
        api: &A,
        mut ticket: LoadTicket,
    ) -> LoadOutcome {
        loop {
            let result = api.list_queue(ticket.filter()).await;
            match self.apply_load(ticket, result) {
                LoadOutcome::Reissue(next) => ticket = next,
                outcome => return outcome,
            }
        }
    }
}

impl Default for QueueStore {
    fn default() -> Self {
        Self::new(Filter::default())
    }
}
