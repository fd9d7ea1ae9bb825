//! Paging with out-of-range clamping.

use serde::{Deserialize, Serialize};

/// Page sizes offered by the page-size picker.
pub const PAGE_SIZE_OPTIONS: [u32; 9] = [3, 5, 10, 20, 30, 40, 50, 100, 500];

/// Page size used when nothing valid was requested or remembered.
pub const DEFAULT_PAGE_SIZE: u32 = 10;

/// The allowed page sizes and the fallback.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageSizeOptions {
    pub options: Vec<u32>,
    pub default_size: u32,
}

impl Default for PageSizeOptions {
    fn default() -> Self {
        Self {
            options: PAGE_SIZE_OPTIONS.to_vec(),
            default_size: DEFAULT_PAGE_SIZE,
        }
    }
}

impl PageSizeOptions {
    pub fn is_allowed(&self, size: u32) -> bool {
        self.options.contains(&size)
    }

    /// `Some(size)` when `requested` is one of the options.
    pub fn accept(&self, requested: Option<u32>) -> Option<u32> {
        requested.filter(|s| self.is_allowed(*s))
    }
}

/// Number of pages needed for `total_count` rows. Never less than 1.
pub fn total_pages(total_count: u64, page_size: u32) -> u32 {
    let size = u64::from(page_size.max(1));
    let pages = (total_count + size - 1) / size;
    pages.clamp(1, u64::from(u32::MAX)) as u32
}

/// Clamp a requested 1-based page into `[1, total_pages]`.
pub fn clamp_page(requested_page: u32, total_pages: u32) -> u32 {
    requested_page.clamp(1, total_pages.max(1))
}

/// Row range for one page, for stores that page natively.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageWindow {
    pub page_index: u32,
    pub total_pages: u32,
    pub total_count: u64,
    pub page_size: u32,
    pub offset: u64,
}

impl PageWindow {
    pub fn new(total_count: u64, requested_page: u32, page_size: u32) -> Self {
        let page_size = page_size.max(1);
        let total_pages = total_pages(total_count, page_size);
        let page_index = clamp_page(requested_page, total_pages);
        Self {
            page_index,
            total_pages,
            total_count,
            page_size,
            offset: u64::from(page_index - 1) * u64::from(page_size),
        }
    }

    /// Wrap rows fetched for this window.
    pub fn into_page<T>(self, items: Vec<T>) -> Page<T> {
        Page {
            items,
            page_index: self.page_index,
            total_pages: self.total_pages,
            total_count: self.total_count,
            page_size: self.page_size,
        }
    }
}

/// One page of a filtered, sorted list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    /// 1-based, always within `[1, total_pages]`.
    pub page_index: u32,
    pub total_pages: u32,
    pub total_count: u64,
    pub page_size: u32,
}

impl<T> Page<T> {
    pub fn has_previous_page(&self) -> bool {
        self.page_index > 1
    }

    pub fn has_next_page(&self) -> bool {
        self.page_index < self.total_pages
    }

    pub fn map<U, F: FnMut(T) -> U>(self, f: F) -> Page<U> {
        Page {
            items: self.items.into_iter().map(f).collect(),
            page_index: self.page_index,
            total_pages: self.total_pages,
            total_count: self.total_count,
            page_size: self.page_size,
        }
    }
}

/// Cut one page out of an already filtered and sorted list.
///
/// A request past the last page yields the last page; page 0 yields the
/// first. An empty list still has one (empty) page.
pub fn paginate<T>(items: Vec<T>, requested_page: u32, page_size: u32) -> Page<T> {
    let window = PageWindow::new(items.len() as u64, requested_page, page_size);
    let items = items
        .into_iter()
        .skip(window.offset as usize)
        .take(window.page_size as usize)
        .collect();
    window.into_page(items)
}
