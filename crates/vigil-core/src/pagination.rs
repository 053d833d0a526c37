// ── Pagination controller ──
//
// Translates a view's (page index, page size) into the backend's
// skip/limit parameters. The backend reports no total count, so "last
// page" is only ever a guess from a short page.

use std::fmt;

use vigil_api::types::PageRequest;

use crate::error::CoreError;

/// Page sizes offered to views.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum PageSize {
    Five,
    #[default]
    Ten,
    TwentyFive,
}

impl PageSize {
    pub const ALL: [Self; 3] = [Self::Five, Self::Ten, Self::TwentyFive];

    pub fn get(self) -> u32 {
        match self {
            Self::Five => 5,
            Self::Ten => 10,
            Self::TwentyFive => 25,
        }
    }
}

impl TryFrom<u32> for PageSize {
    type Error = CoreError;

    fn try_from(value: u32) -> Result<Self, Self::Error> {
        match value {
            5 => Ok(Self::Five),
            10 => Ok(Self::Ten),
            25 => Ok(Self::TwentyFive),
            other => Err(CoreError::validation(format!(
                "page size must be 5, 10 or 25 (got {other})"
            ))),
        }
    }
}

impl fmt::Display for PageSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.get())
    }
}

/// What a received page says about the pages after it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageHint {
    /// A full page came back; there may be more.
    MaybeMore,
    /// Fewer rows than the page size; probably the end.
    ProbablyLast,
}

/// Current position in a paged list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PaginationController {
    page_index: u32,
    page_size: PageSize,
}

impl PaginationController {
    pub fn new(page_size: PageSize) -> Self {
        Self {
            page_index: 0,
            page_size,
        }
    }

    /// Start at a given page.
    pub fn at(page_index: u32, page_size: PageSize) -> Self {
        Self {
            page_index,
            page_size,
        }
    }

    pub fn page_index(&self) -> u32 {
        self.page_index
    }

    pub fn page_size(&self) -> PageSize {
        self.page_size
    }

    /// `skip = page_index * page_size`, `limit = page_size`.
    pub fn request(&self) -> PageRequest {
        let size = self.page_size.get();
        PageRequest::new(u64::from(self.page_index) * u64::from(size), size)
    }

    /// Advance one page. Always allowed; the caller finds out from the
    /// response whether anything was there.
    pub fn next_page(&mut self) -> PageRequest {
        self.page_index = self.page_index.saturating_add(1);
        self.request()
    }

    /// Go back one page, stopping at the first.
    pub fn previous_page(&mut self) -> PageRequest {
        self.page_index = self.page_index.saturating_sub(1);
        self.request()
    }

    /// Change the page size and return to the first page.
    pub fn set_page_size(&mut self, page_size: PageSize) -> PageRequest {
        self.page_size = page_size;
        self.page_index = 0;
        self.request()
    }

    /// Classify a page that came back with `received` rows.
    pub fn observe(&self, received: usize) -> PageHint {
        let full = usize::try_from(self.page_size.get()).unwrap_or(usize::MAX);
        if received < full {
            PageHint::ProbablyLast
        } else {
            PageHint::MaybeMore
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn third_page_of_ten_skips_twenty() {
        let pager = PaginationController::at(2, PageSize::Ten);
        assert_eq!(pager.request(), PageRequest::new(20, 10));
    }

    #[test]
    fn defaults_to_first_page_of_ten() {
        let pager = PaginationController::default();
        assert_eq!(pager.request(), PageRequest::new(0, 10));
    }

    #[test]
    fn previous_saturates_at_zero() {
        let mut pager = PaginationController::new(PageSize::Five);
        assert_eq!(pager.previous_page(), PageRequest::new(0, 5));
        assert_eq!(pager.next_page(), PageRequest::new(5, 5));
        assert_eq!(pager.next_page(), PageRequest::new(10, 5));
        assert_eq!(pager.previous_page(), PageRequest::new(5, 5));
    }

    #[test]
    fn changing_size_resets_to_first_page() {
        let mut pager = PaginationController::at(4, PageSize::Ten);
        assert_eq!(pager.set_page_size(PageSize::TwentyFive), PageRequest::new(0, 25));
        assert_eq!(pager.page_index(), 0);
    }

    #[test]
    fn short_page_is_probably_last() {
        let pager = PaginationController::new(PageSize::Ten);
        assert_eq!(pager.observe(10), PageHint::MaybeMore);
        assert_eq!(pager.observe(3), PageHint::ProbablyLast);
        assert_eq!(pager.observe(0), PageHint::ProbablyLast);
    }

    #[test]
    fn only_offered_sizes_are_accepted() {
        assert_eq!(PageSize::try_from(25).ok(), Some(PageSize::TwentyFive));
        assert!(matches!(
            PageSize::try_from(50),
            Err(CoreError::ValidationFailed { .. })
        ));
    }
}
