//! Paged listing of the pending queue
//!
//! A pure query surface for UI consumption. The page contents and the
//! total come from one store snapshot, so a count can never disagree with
//! the page it was returned with. The gateway never adjusts page numbers
//! on its own: a caller whose page emptied out re-requests the previous
//! page itself.

use std::sync::Arc;

use crate::types::{Proposal, ReviewError};

use super::store::ProposalStore;

/// One page of pending proposals
#[derive(Debug)]
pub struct Page {
    pub items: Vec<Proposal>,
    /// Total pending count in the same snapshot as `items`
    pub total: u64,
    pub page_number: u64,
    pub page_size: u64,
}

impl Page {
    /// Number of pages the snapshot total spans
    pub fn page_count(&self) -> u64 {
        if self.total == 0 {
            0
        } else {
            self.total.div_ceil(self.page_size)
        }
    }

    pub fn has_previous(&self) -> bool {
        self.page_number > 1
    }

    pub fn has_next(&self) -> bool {
        self.page_number < self.page_count()
    }
}

/// Read-only pagination over the pending queue
pub struct PaginationGateway {
    store: Arc<ProposalStore>,
}

impl PaginationGateway {
    pub fn new(store: Arc<ProposalStore>) -> Self {
        Self { store }
    }

    /// Fetch one page, oldest proposals first. Page numbers start at 1.
    pub async fn list_page(
        &self,
        group_id: Option<&str>,
        page_size: u64,
        page_number: u64,
    ) -> Result<Page, ReviewError> {
        if page_size == 0 {
            return Err(ReviewError::Validation("page_size must be positive".into()));
        }
        if page_number == 0 {
            return Err(ReviewError::Validation("page numbers start at 1".into()));
        }

        let offset = (page_number - 1) * page_size;
        let (items, total) = self.store.list_pending(group_id, page_size, offset).await?;

        Ok(Page {
            items,
            total,
            page_number,
            page_size,
        })
    }
}
