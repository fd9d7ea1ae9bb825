//! Photo resizing for patient pictures.
//!
//! Every uploaded picture is decoded, shrunk to fit a fixed bounding box and
//! re-encoded as PNG. The full photo and the list thumbnail are produced from
//! the same upload in one synchronous call.

pub mod photo;
pub mod resize;

pub use photo::*;
pub use resize::*;
