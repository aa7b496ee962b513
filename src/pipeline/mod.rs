//! Pipeline stages for image-to-artifact conversion.
//!
//! Each submodule implements one transformation step. Apart from `input`,
//! which does file and network I/O, the stages are plain blocking functions
//! that can be tested without a runtime; the coordinator decides where they
//! run.
//!
//! ## Data Flow
//!
//! ```text
//! input ──▶ ImageBatch ──┬──▶ compose ──▶ PDF bytes
//! (path/URL)             └──▶ record  ──▶ JSON text ──▶ record (decode)
//!                                  ▲
//!                               encode (JPEG + base64)
//! ```
//!
//! 1. [`input`]: load paths or URLs, in order, into an immutable batch
//! 2. [`encode`]: lossy JPEG compression and the base64 text-safe transform
//! 3. [`compose`]: one PDF page per image, sized to the image
//! 4. [`record`]: leading image ⇄ `{imageName, imageData, description}`

pub mod compose;
pub mod encode;
pub mod input;
pub mod record;
