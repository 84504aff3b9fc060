//! Document Analysis Pipeline
//!
//! ## Architecture
//!
//! ```text
//! ┌────────────────────────────────────────────────────────────────┐
//! │  1. FETCH: resolve locator to bytes (local disk / S3 / HTTP)   │
//! │  2. EXTRACT: PDFs → compressed text transcript;                │
//! │              images → size-checked base64 payload              │
//! │  3. ANALYZE: chat-completion call (text or vision path)        │
//! │  4. PARSE: structured JSON first, regex heuristics second      │
//! │  5. COLLECT: windowed concurrency, order-preserving results    │
//! └────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Each document's journey is an independent pipeline instance; failures are
//! recorded per document and never abort the batch.

mod client;
mod fetcher;
mod orchestrator;
mod parser;
mod pdf_text;
mod summary;

pub mod config;
pub mod error;
pub mod types;

// Public API - the intake submission flow and on-demand analyze requests
// call these two entry points.
pub use client::{ChatModelClient, DocumentModel};
pub use config::AnalysisConfig;
pub use error::AnalysisError;
pub use orchestrator::{analyze_documents, analyze_documents_with};
pub use summary::generate_analysis_summary;
pub use types::{
    Amount, AnalysisResult, AnalyzeOptions, Confidence, DatedField, DocumentAnalysis, DocumentRef,
    ExtractedData,
};
