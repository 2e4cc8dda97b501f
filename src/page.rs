//! Paging requests and results.

use crate::core::value::NamedParams;
use crate::core::{Result, WeaveError};
use serde::Serialize;

/// Parameter names the data query's `limit {pageStart},{pageSize}` binds.
pub const PAGE_START_PARAM: &str = "pageStart";
pub const PAGE_SIZE_PARAM: &str = "pageSize";

/// A 1-based page of a named-parameter query.
#[derive(Debug, Clone, PartialEq)]
pub struct PageRequest {
    pub current_page: u32,
    pub page_size: u32,
    pub params: NamedParams,
}

impl PageRequest {
    pub fn new(current_page: u32, page_size: u32) -> Self {
        PageRequest {
            current_page,
            page_size,
            params: NamedParams::new(),
        }
    }

    pub fn with_params(mut self, params: NamedParams) -> Self {
        self.params = params;
        self
    }

    /// Page number used for offsets; page 0 is read as page 1.
    pub fn page(&self) -> u32 {
        self.current_page.max(1)
    }

    /// Row offset of the first row on this page.
    pub fn page_start(&self) -> i64 {
        (i64::from(self.page()) - 1) * i64::from(self.page_size)
    }

    pub(crate) fn validate(&self) -> Result<()> {
        if self.page_size == 0 {
            return Err(WeaveError::InvalidPage("page size must be at least 1".to_string()));
        }
        Ok(())
    }

    /// The caller's parameters plus `pageStart` and `pageSize`; the request
    /// itself is left untouched.
    pub(crate) fn data_params(&self) -> NamedParams {
        self.params
            .clone()
            .with(PAGE_START_PARAM, self.page_start())
            .with(PAGE_SIZE_PARAM, i64::from(self.page_size))
    }
}

/// One page of results with the totals needed to render a pager.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PageResult<T> {
    pub rows: Vec<T>,
    pub page_size: u32,
    pub current_page: u32,
    pub total_count: u64,
    pub page_total: u64,
}

impl<T> PageResult<T> {
    pub fn new(rows: Vec<T>, request: &PageRequest, total_count: u64) -> Self {
        PageResult {
            rows,
            page_size: request.page_size,
            current_page: request.page(),
            total_count,
            page_total: page_total(total_count, request.page_size),
        }
    }

    pub fn has_next(&self) -> bool {
        u64::from(self.current_page) < self.page_total
    }
}

/// Number of pages needed for `total_count` rows; an exact multiple adds no
/// extra page. A zero page size yields zero pages.
pub fn page_total(total_count: u64, page_size: u32) -> u64 {
    if page_size == 0 {
        return 0;
    }
    total_count.div_ceil(u64::from(page_size))
}
