//! Pipeline stages for invoice extraction.
//!
//! Each submodule implements exactly one transformation step. Keeping the
//! stages separate makes each independently testable and lets us swap an
//! implementation (e.g. the rendering backend) without touching the others.
//!
//! ## Data Flow
//!
//! ```text
//! document ──▶ prepare ──▶ extract ──▶ finalize
//! (bytes+kind) (raster/    (prompt +    (validate, normalise,
//!               base64)     VLM call)    derive status)
//! ```
//!
//! 1. [`prepare`] — normalise an uploaded image or PDF into one base64
//!    JPEG/PNG; PDF rendering runs in `spawn_blocking` because pdfium is
//!    not async-safe
//! 2. [`extract`] — drive the vision-model call with a bounded timeout,
//!    parse the JSON response, and build the validated record; the only
//!    stage with network I/O

pub mod extract;
pub mod prepare;
