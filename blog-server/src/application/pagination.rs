//! Page-number pagination over a counted result set.
//!
//! Lookups are lenient the way classic server-rendered paginators are: a
//! missing or malformed page token falls back to the first page, and a number
//! past either end clamps to the last page. [`Paginator::validate_number`]
//! exposes the strict check underneath.

use serde::Serialize;
use thiserror::Error;

pub const PAGE_SIZE: u32 = 10;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PaginationError {
    #[error("page number is not an integer")]
    NotAnInteger,
    #[error("page number is less than 1")]
    LessThanOne,
    #[error("page {0} contains no results")]
    OutOfRange(u64),
}

/// Integers too wide for `i64` are still integers: out of range on either side.
fn overflow_error(raw: &str) -> PaginationError {
    let digits = raw.strip_prefix(['+', '-']).unwrap_or(raw);
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        PaginationError::NotAnInteger
    } else if raw.starts_with('-') {
        PaginationError::LessThanOne
    } else {
        PaginationError::OutOfRange(u64::MAX)
    }
}

#[derive(Debug, Clone, Copy)]
pub struct Paginator {
    count: u64,
    per_page: u64,
}

impl Paginator {
    pub fn new(count: u64, per_page: u32) -> Self {
        Self {
            count,
            per_page: u64::from(per_page.max(1)),
        }
    }

    pub fn count(&self) -> u64 {
        self.count
    }

    /// An empty result set still has one (empty) page.
    pub fn num_pages(&self) -> u64 {
        if self.count == 0 {
            1
        } else {
            self.count.div_ceil(self.per_page)
        }
    }

    pub fn validate_number(&self, raw: &str) -> Result<u64, PaginationError> {
        let raw = raw.trim();
        let number: i64 = raw.parse().map_err(|_| overflow_error(raw))?;
        if number < 1 {
            return Err(PaginationError::LessThanOne);
        }
        let number = number.unsigned_abs();
        if number > self.num_pages() {
            return Err(PaginationError::OutOfRange(number));
        }
        Ok(number)
    }

    pub fn page_number(&self, raw: Option<&str>) -> u64 {
        match raw.map(|r| self.validate_number(r)) {
            Some(Ok(number)) => number,
            None | Some(Err(PaginationError::NotAnInteger)) => 1,
            Some(Err(PaginationError::LessThanOne | PaginationError::OutOfRange(_))) => {
                self.num_pages()
            }
        }
    }

    pub fn limit(&self) -> u64 {
        self.per_page
    }

    pub fn offset(&self, number: u64) -> u64 {
        number.saturating_sub(1) * self.per_page
    }

    pub fn page<T>(&self, number: u64, items: Vec<T>) -> Page<T> {
        let num_pages = self.num_pages();
        let has_previous = number > 1;
        let has_next = number < num_pages;
        Page {
            items,
            number,
            num_pages,
            count: self.count,
            has_previous,
            has_next,
            previous_page_number: has_previous.then(|| number - 1),
            next_page_number: has_next.then(|| number + 1),
        }
    }
}

/// Canonical form of a page token, for keying cached pages without knowing
/// the source size. Tokens that always resolve to the same page share a key:
/// anything non-numeric is page 1 and anything below 1 is the last page.
pub fn page_key(raw: Option<&str>) -> String {
    let unbounded = Paginator::new(u64::MAX, 1);
    match raw.map(|r| unbounded.validate_number(r)) {
        None | Some(Err(PaginationError::NotAnInteger)) => "1".to_string(),
        Some(Ok(number)) => number.to_string(),
        Some(Err(_)) => "last".to_string(),
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub number: u64,
    pub num_pages: u64,
    pub count: u64,
    pub has_previous: bool,
    pub has_next: bool,
    pub previous_page_number: Option<u64>,
    pub next_page_number: Option<u64>,
}
