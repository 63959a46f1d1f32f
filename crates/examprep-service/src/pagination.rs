//! Page/limit validation shared by list endpoints.

use serde::Serialize;

use crate::error::ApiError;

/// Largest page size any list endpoint accepts.
pub const MAX_LIMIT: u32 = 100;

/// A validated page request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    /// 1-based page number.
    pub page: u32,
    /// Rows per page.
    pub limit: u32,
}

impl PageRequest {
    /// Validate `page >= 1` and `1 <= limit <= MAX_LIMIT`, filling in defaults.
    ///
    /// Takes signed values so that `?page=-1` is reported as an invalid page
    /// rather than a query parse failure.
    pub fn new(page: Option<i64>, limit: Option<i64>, default_limit: u32) -> Result<Self, ApiError> {
        let page = page.unwrap_or(1);
        let limit = limit.unwrap_or(i64::from(default_limit));
        let page = u32::try_from(page)
            .ok()
            .filter(|p| *p >= 1)
            .ok_or(ApiError::InvalidPage)?;
        let limit = u32::try_from(limit)
            .ok()
            .filter(|l| (1..=MAX_LIMIT).contains(l))
            .ok_or(ApiError::InvalidLimit { max: MAX_LIMIT })?;
        Ok(Self { page, limit })
    }

    /// Rows to skip.
    #[must_use]
    pub fn offset(&self) -> usize {
        (self.page as usize - 1) * self.limit as usize
    }

    /// Rows to fetch.
    #[must_use]
    pub fn limit(&self) -> usize {
        self.limit as usize
    }

    /// Pagination metadata for a result set with `total` rows.
    #[must_use]
    pub fn paginate(&self, total: u64) -> Pagination {
        Pagination {
            page: self.page,
            limit: self.limit,
            total,
            total_pages: total.div_ceil(u64::from(self.limit)),
        }
    }
}

/// Pagination metadata returned next to a page of rows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Pagination {
    /// 1-based page number.
    pub page: u32,
    /// Rows per page.
    pub limit: u32,
    /// Rows across all pages.
    pub total: u64,
    /// `ceil(total / limit)`.
    pub total_pages: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_and_bounds() {
        let req = PageRequest::new(None, None, 20).unwrap();
        assert_eq!((req.page, req.limit), (1, 20));
        assert_eq!(req.offset(), 0);

        assert!(matches!(PageRequest::new(Some(0), None, 20), Err(ApiError::InvalidPage)));
        assert!(matches!(
            PageRequest::new(None, Some(0), 20),
            Err(ApiError::InvalidLimit { max: 100 })
        ));
        assert!(matches!(
            PageRequest::new(None, Some(101), 20),
            Err(ApiError::InvalidLimit { .. })
        ));
        assert!(matches!(PageRequest::new(Some(-1), None, 20), Err(ApiError::InvalidPage)));
        assert!(PageRequest::new(None, Some(100), 20).is_ok());
    }

    #[test]
    fn total_pages_rounds_up() {
        let req = PageRequest::new(Some(3), Some(20), 20).unwrap();
        assert_eq!(req.offset(), 40);
        assert_eq!(req.paginate(0).total_pages, 0);
        assert_eq!(req.paginate(20).total_pages, 1);
        assert_eq!(req.paginate(41).total_pages, 3);
    }
}
