//! Per-screen navigation memory: return URLs and page-size preferences.
//!
//! Both expire. Time comes from a [`Clock`] so tests can step past the
//! expiry deterministically.

mod clock;
mod page_size;
mod return_url;

pub use clock::*;
pub use page_size::*;
pub use return_url::*;
