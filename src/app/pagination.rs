#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pagination {
    pub offset: u64,
    pub limit: u64,
    pub total: u64,
}

impl Pagination {
    pub fn new(offset: u64, limit: u64, total: u64) -> Self {
        Self {
            offset,
            limit,
            total,
        }
    }

    pub fn prev_enabled(&self) -> bool {
        self.offset > 0
    }

    pub fn next_enabled(&self) -> bool {
        self.offset.saturating_add(self.limit) < self.total
    }

    pub fn prev(&self) -> u64 {
        self.offset.saturating_sub(self.limit)
    }

    // Not clamped against total; an overshoot is corrected by the queue store.
    pub fn next(&self) -> u64 {
        self.offset.saturating_add(self.limit)
    }

    pub fn page_position(&self) -> (u64, u64) {
        let limit = self.limit.max(1);
        let pages = self.total.div_ceil(limit).max(1);
        (self.offset / limit + 1, pages)
    }
}
