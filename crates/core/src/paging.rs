//! Page window arithmetic for stores without offset or cursor support.
//!
//! A request for page `n` fetches the first `n * page_size` records in order
//! and slices the last window locally. The cost grows with the page number,
//! not with the collection size, and the exact total is only known once the
//! store returns fewer records than were asked for.

use serde::{Deserialize, Serialize};

use crate::errors::DomainError;

/// Sentinel `total` meaning "exact count unknown, at least `page * page_size`
/// records exist".
pub const UNKNOWN_TOTAL: i64 = -1;

/// Largest limit a single store query accepts (the REST API encodes it as int32).
pub const MAX_FETCH_LIMIT: u32 = i32::MAX as u32;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PageWindow {
    page: u32,
    page_size: u32,
}

impl PageWindow {
    pub fn new(page: u32, page_size: u32) -> Result<Self, DomainError> {
        if page == 0 {
            return Err(DomainError::InvalidArgument("page must be at least 1".to_string()));
        }
        if page_size == 0 {
            return Err(DomainError::InvalidArgument("pageSize must be at least 1".to_string()));
        }
        match page.checked_mul(page_size) {
            Some(limit) if limit <= MAX_FETCH_LIMIT => Ok(Self { page, page_size }),
            _ => Err(DomainError::InvalidArgument(format!(
                "page {page} with pageSize {page_size} exceeds the maximum fetch window"
            ))),
        }
    }

    /// Number of records to request from the store: every record up to the end
    /// of this page.
    pub fn fetch_limit(&self) -> u32 {
        self.page * self.page_size
    }

    pub fn offset(&self) -> u32 {
        (self.page - 1) * self.page_size
    }

    /// Slices one page out of the accumulated fetch.
    ///
    /// `fetched` must be the store's answer to a query limited to
    /// [`fetch_limit`](Self::fetch_limit). A short answer means the end of the
    /// collection was reached, so its length is the exact total.
    pub fn paginate<T>(&self, fetched: Vec<T>) -> Page<T> {
        let fetched_count = fetched.len();
        let total = if fetched_count < self.fetch_limit() as usize {
            fetched_count as i64
        } else {
            UNKNOWN_TOTAL
        };

        let items = fetched
            .into_iter()
            .skip(self.offset() as usize)
            .take(self.page_size as usize)
            .collect();

        Page { items, total, page: self.page, page_size: self.page_size }
    }

    pub fn empty<T>(&self) -> Page<T> {
        Page { items: Vec::new(), total: 0, page: self.page, page_size: self.page_size }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Page<T> {
    pub items: Vec<T>,
    pub total: i64,
    pub page: u32,
    pub page_size: u32,
}

impl<T> Page<T> {
    pub fn has_more(&self) -> bool {
        self.total == UNKNOWN_TOTAL
    }

    /// Maps every item, dropping the ones `f` rejects. `total` is left as the
    /// store reported it.
    pub fn filter_map_items<U>(self, f: impl FnMut(T) -> Option<U>) -> Page<U> {
        Page {
            items: self.items.into_iter().filter_map(f).collect(),
            total: self.total,
            page: self.page,
            page_size: self.page_size,
        }
    }
}
