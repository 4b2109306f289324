//! Consolidated test modules.
//!
//! End-to-end coverage of the processor and worker pool against in-memory
//! collaborators and scripted extraction/OCR engines.

mod support;
