use serde::{Deserialize, Serialize};

pub const DEFAULT_PAGE_SIZE: u32 = 10;
pub const MAX_PAGE_SIZE: u32 = 100;

#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageParams {
    pub page: Option<u32>,
    pub page_size: Option<u32>,
}

impl PageParams {
    /// Page numbers start at 1; out-of-range sizes fall back to the default.
    pub fn normalize(&self) -> (u32, u32) {
        let page = self.page.filter(|p| *p >= 1).unwrap_or(1);
        let page_size = self
            .page_size
            .filter(|s| (1..=MAX_PAGE_SIZE).contains(s))
            .unwrap_or(DEFAULT_PAGE_SIZE);
        (page, page_size)
    }

    /// Row offset for a normalized page, widened so huge page numbers cannot overflow.
    pub fn offset(page: u32, page_size: u32) -> i64 {
        (i64::from(page) - 1).max(0) * i64::from(page_size)
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PaginatedResponse<T> {
    pub items: Vec<T>,
    pub total: i64,
    pub page: u32,
    pub page_size: u32,
    pub total_pages: u32,
}

impl<T> PaginatedResponse<T> {
    pub fn new(items: Vec<T>, total: i64, page: u32, page_size: u32) -> Self {
        let total_pages = (total.max(0) as u64).div_ceil(page_size.max(1) as u64) as u32;
        Self {
            items,
            total,
            page,
            page_size,
            total_pages,
        }
    }
}
