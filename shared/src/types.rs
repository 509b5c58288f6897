//! Common types used across the storefront

use serde::{Deserialize, Serialize};

/// Authenticated caller role
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Customer,
    Admin,
}

/// Pagination query parameters as received
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PageQuery {
    pub page: Option<u32>,
    pub limit: Option<u32>,
}

/// Admin order list query parameters
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AdminOrderQuery {
    /// Status name, or `ALL` for no filter
    pub status: Option<String>,
    /// Order number fragment
    pub search: Option<String>,
    pub page: Option<u32>,
    pub limit: Option<u32>,
}

impl AdminOrderQuery {
    pub fn page_query(&self) -> PageQuery {
        PageQuery {
            page: self.page,
            limit: self.limit,
        }
    }
}

/// Resolved page window
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Page {
    pub page: u32,
    pub limit: u32,
}

impl PageQuery {
    /// Apply defaults: page at least 1, limit in `1..=max_limit`
    pub fn resolve(&self, default_limit: u32, max_limit: u32) -> Page {
        Page {
            page: self.page.unwrap_or(1).max(1),
            limit: self.limit.unwrap_or(default_limit).clamp(1, max_limit.max(1)),
        }
    }
}

impl Page {
    pub fn offset(&self) -> u64 {
        u64::from(self.page - 1) * u64::from(self.limit)
    }

    pub fn total_pages(&self, total: u64) -> u64 {
        total.div_ceil(u64::from(self.limit))
    }
}

/// One page of orders, newest first
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderPage<T> {
    pub orders: Vec<T>,
    pub total: u64,
    pub page: u32,
    pub limit: u32,
    pub total_pages: u64,
}

impl<T> OrderPage<T> {
    pub fn new(orders: Vec<T>, total: u64, page: Page) -> Self {
        Self {
            orders,
            total,
            page: page.page,
            limit: page.limit,
            total_pages: page.total_pages(total),
        }
    }
}
