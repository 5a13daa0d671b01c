//! Page/limit handling shared by the list endpoints

use serde::Serialize;

use crate::error::{AppError, AppResult};

/// Validated page request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    pub page: i64,
    pub limit: i64,
}

impl PageRequest {
    /// `page` defaults to 1 and `limit` to `default_limit`. Values outside
    /// `page >= 1` and `1..=max_limit` are rejected, not clamped.
    pub fn new(
        page: Option<i64>,
        limit: Option<i64>,
        default_limit: i64,
        max_limit: i64,
    ) -> AppResult<Self> {
        let page = page.unwrap_or(1);
        let limit = limit.unwrap_or(default_limit);

        if page < 1 {
            return Err(AppError::InvalidRequest("page must be at least 1".to_string()));
        }
        if !(1..=max_limit).contains(&limit) {
            return Err(AppError::InvalidRequest(format!(
                "limit must be between 1 and {}",
                max_limit
            )));
        }

        Ok(Self { page, limit })
    }

    pub fn offset(&self) -> i64 {
        (self.page - 1).saturating_mul(self.limit)
    }

    pub fn pagination(&self, total: i64) -> Pagination {
        let pages = if total == 0 {
            0
        } else {
            (total + self.limit - 1) / self.limit
        };

        Pagination {
            page: self.page,
            limit: self.limit,
            total,
            pages,
            has_next: self.page < pages,
            has_prev: self.page > 1,
        }
    }
}

/// Pagination block of a list response
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Pagination {
    pub page: i64,
    pub limit: i64,
    pub total: i64,
    pub pages: i64,
    pub has_next: bool,
    pub has_prev: bool,
}
