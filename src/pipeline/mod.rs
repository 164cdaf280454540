//! Pipeline stages for plan-to-CSV extraction.
//!
//! Each submodule implements exactly one transformation step so each can be
//! tested on its own and backends (rendering, OCR) can be swapped without
//! touching the others.
//!
//! ## Data Flow
//!
//! ```text
//! discover ──▶ render ──▶ recognize ──▶ extract ──▶ output
//! (walkdir)   (pdfium)   (tesseract)   (regex)    (X;Y csv)
//!                  └──── pages: worker pool ────┘
//! ```
//!
//! 1. [`discover`]  walk a folder tree for `plan.pdf` files (any case)
//! 2. [`render`]    rasterise every page; runs in `spawn_blocking` because
//!    pdfium is not async-safe
//! 3. [`recognize`] page image → text fragments via the shared OCR engine
//! 4. [`extract`]   numeric filtering and X/Y pairing
//! 5. [`pages`]     bounded, order-preserving pool running 3 + 4 per page
//! 6. [`output`]    table formatting and atomic writes

pub mod discover;
pub mod extract;
pub mod output;
pub mod pages;
pub mod recognize;
pub mod render;
