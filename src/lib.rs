//! CSSD lifecycle library
//!
//! Tracks hospital instrument sets from a ward's sterilization request
//! through receiving, sterilization runs, and issue, plus stock, kits and
//! consumption reporting. All records live in a JSON document backend.
#![forbid(unsafe_code)]
#![deny(rust_2018_idioms)]
#![allow(elided_lifetimes_in_paths)]
#![warn(clippy::all, clippy::perf, clippy::dbg_macro)]

// Core modules
pub mod clock;
pub mod commands;
pub mod config;
pub mod errors;
pub mod events;
pub mod metrics;
pub mod models;
pub mod repositories;
pub mod services;

use serde::Serialize;

/// One page of an in-memory list. Pages are 1-based.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PaginatedResponse<T> {
    pub items: Vec<T>,
    pub total: u64,
    pub page: u64,
    pub per_page: u64,
    pub total_pages: u64,
}

pub type Page<T> = PaginatedResponse<T>;

impl<T> PaginatedResponse<T> {
    /// Slices `rows` to `page`. A page past the end has no items but keeps
    /// the totals; page 0 is treated as page 1.
    pub fn paginate(rows: Vec<T>, page: u64, per_page: u64) -> Self {
        let per_page = per_page.max(1);
        let page = page.max(1);
        let total = rows.len() as u64;
        let total_pages = total.div_ceil(per_page);
        let skip = ((page - 1) * per_page) as usize;

        let items = rows
            .into_iter()
            .skip(skip)
            .take(per_page as usize)
            .collect();

        Self {
            items,
            total,
            page,
            per_page,
            total_pages,
        }
    }
}

pub mod prelude {
    pub use crate::clock::{Clock, SystemClock};
    pub use crate::config::AppConfig;
    pub use crate::errors::*;
    pub use crate::events::{Event, EventSender};
    pub use crate::models::*;
    pub use crate::repositories::CssdStore;
    pub use crate::services::AppServices;
    pub use crate::{Page, PaginatedResponse};
}
