//! taxintake — document analysis pipeline for the tax-document intake
//! service.
//!
//! Clients upload tax forms (PDFs or images); this crate fetches them,
//! extracts usable content, asks an external document-understanding model
//! about each one, and turns the free-form replies into typed,
//! confidence-scored results. See [`analysis`] for the pipeline itself.

pub mod analysis;

pub use analysis::{
    analyze_documents, generate_analysis_summary, AnalysisConfig, AnalysisResult, AnalyzeOptions,
    DocumentAnalysis, DocumentRef,
};

use tracing_subscriber::EnvFilter;

/// Initialize tracing with the RUST_LOG env filter.
/// Default: warn for dependencies, info for this crate.
pub fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn,taxintake=info")),
        )
        .init();
}
