//! Output generation: the lesson PDF and the manifest that indexes it.
//!
//! # Submodules
//!
//! - [`pdf`]: Lays out a `Lesson` and serializes it as a PDF document
//! - [`manifest`]: Records every generated lesson in `index.json`
//!
//! # Output Structure
//!
//! ```text
//! site/
//! ├── index.json                        # newest lesson first
//! └── pdfs/
//!     ├── spanish_lesson_2025-03-06.pdf
//!     └── spanish_lesson_2025-03-07.pdf
//! ```

pub mod manifest;
pub mod pdf;
