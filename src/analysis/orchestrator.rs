//! Batch Orchestrator
//!
//! Drives the per-document pipeline (fetch → extract → model → parse) over a
//! document set with bounded concurrency. Documents are processed in
//! fixed-size windows: everything in a window runs concurrently, windows run
//! sequentially, and results are appended window by window so output order
//! always matches input order.
//!
//! Every failure is caught at the document boundary and recorded on that
//! document's result; a bad document never aborts its siblings.

use base64::Engine;
use futures::future::join_all;
use uuid::Uuid;

use super::client::{ChatModelClient, DocumentModel};
use super::config::AnalysisConfig;
use super::error::{AnalysisError, Result};
use super::fetcher;
use super::parser;
use super::pdf_text;
use super::types::{
    AnalysisResult, AnalyzeOptions, DocumentAnalysis, DocumentRef, ExtractedContent, ImageFormat,
};

/// Analyze a set of uploaded documents. Order-preserving; same length as the
/// input; never fails for per-document errors.
///
/// When no model credential is configured every result carries an explicit
/// configuration-needed message instead of an analysis.
pub async fn analyze_documents(
    cfg: &AnalysisConfig,
    documents: &[DocumentRef],
    options: &AnalyzeOptions,
) -> Vec<AnalysisResult> {
    let model = ChatModelClient::from_config(cfg);
    let model_ref = model.as_ref().map(|m| m as &dyn DocumentModel);
    analyze_documents_with(cfg, documents, options, model_ref).await
}

/// Same as [`analyze_documents`] with an injected model, the seam tests use.
pub async fn analyze_documents_with(
    cfg: &AnalysisConfig,
    documents: &[DocumentRef],
    options: &AnalyzeOptions,
    model: Option<&dyn DocumentModel>,
) -> Vec<AnalysisResult> {
    if documents.is_empty() {
        return Vec::new();
    }

    let run_id = Uuid::new_v4();
    tracing::info!(
        "[Orchestrator] Run {}: analyzing {} documents (window size {})",
        run_id,
        documents.len(),
        cfg.concurrency.max(1)
    );

    let Some(model) = model else {
        tracing::warn!("[Orchestrator] Run {}: model not configured", run_id);
        return documents
            .iter()
            .map(|d| AnalysisResult::failed(&d.filename, AnalysisError::NotConfigured.to_string()))
            .collect();
    };

    let mut results = Vec::with_capacity(documents.len());
    for window in documents.chunks(cfg.concurrency.max(1)) {
        let window_results = join_all(window.iter().map(|doc| async move {
            match process_document(cfg, doc, options, model).await {
                Ok(analysis) => AnalysisResult::ok(&doc.filename, analysis),
                Err(e) => {
                    tracing::warn!(
                        "[Orchestrator] Run {}: {} failed: {}",
                        run_id,
                        doc.filename,
                        e
                    );
                    AnalysisResult::failed(&doc.filename, e.to_string())
                }
            }
        }))
        .await;
        results.extend(window_results);
    }

    let succeeded = results.iter().filter(|r| r.is_ok()).count();
    tracing::info!(
        "[Orchestrator] Run {}: {} of {} documents analyzed",
        run_id,
        succeeded,
        results.len()
    );
    results
}

/// One document's journey through the pipeline. Pure per-document: no state
/// is shared with siblings.
async fn process_document(
    cfg: &AnalysisConfig,
    doc: &DocumentRef,
    options: &AnalyzeOptions,
    model: &dyn DocumentModel,
) -> Result<DocumentAnalysis> {
    let fetched = fetcher::fetch_document(cfg, doc).await?;

    let content = if is_pdf(&fetched.content_type, &doc.filename) {
        let text = pdf_text::extract_pdf_text(&fetched.bytes, cfg.max_pdf_pages, cfg.max_text_chars);
        ExtractedContent::Text(text)
    } else {
        // Size check before any encoding or model call
        if fetched.bytes.len() > cfg.max_image_bytes {
            return Err(AnalysisError::TooLarge {
                size: fetched.bytes.len(),
                limit: cfg.max_image_bytes,
            });
        }
        ExtractedContent::Image {
            base64: base64::engine::general_purpose::STANDARD.encode(&fetched.bytes),
            format: ImageFormat::detect(&fetched.bytes),
        }
    };

    let raw = model
        .analyze(&content, &doc.filename, options.filing_status.as_deref())
        .await?;

    Ok(parser::parse_analysis_response(&raw))
}

fn is_pdf(content_type: &str, filename: &str) -> bool {
    content_type.eq_ignore_ascii_case("application/pdf")
        || filename.to_lowercase().ends_with(".pdf")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::types::Confidence;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;
    use tempfile::TempDir;

    /// Mock model: echoes the filename in a JSON reply and sleeps longer for
    /// "slow" documents so completion order differs from input order.
    struct MockModel {
        calls: AtomicUsize,
    }

    impl MockModel {
        fn new() -> Self {
            Self {
                calls: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl DocumentModel for MockModel {
        async fn analyze(
            &self,
            _content: &ExtractedContent,
            filename: &str,
            _filing_status: Option<&str>,
        ) -> crate::analysis::error::Result<String> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if filename.contains("slow") {
                tokio::time::sleep(Duration::from_millis(50)).await;
            }
            Ok(format!(
                r#"{{"documentType": "W-2", "confidence": "high", "summary": "analysis of {}"}}"#,
                filename
            ))
        }
    }

    fn png_doc(dir: &TempDir, name: &str, extra_bytes: usize) -> DocumentRef {
        let mut bytes = vec![0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A];
        bytes.resize(bytes.len() + extra_bytes, 0);
        std::fs::write(dir.path().join(name), &bytes).unwrap();
        DocumentRef {
            filename: name.to_string(),
            locator: name.to_string(),
            mime_type: "image/png".to_string(),
        }
    }

    fn test_config(dir: &TempDir) -> AnalysisConfig {
        AnalysisConfig {
            document_root: dir.path().to_path_buf(),
            concurrency: 2,
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_order_preserved_despite_completion_order() {
        let dir = tempfile::tempdir().unwrap();
        let docs = vec![
            png_doc(&dir, "slow-first.png", 16),
            png_doc(&dir, "second.png", 16),
            png_doc(&dir, "slow-third.png", 16),
            png_doc(&dir, "fourth.png", 16),
        ];
        let cfg = test_config(&dir);
        let model = MockModel::new();

        let results =
            analyze_documents_with(&cfg, &docs, &AnalyzeOptions::default(), Some(&model)).await;

        assert_eq!(results.len(), 4);
        for (doc, result) in docs.iter().zip(&results) {
            assert_eq!(result.filename, doc.filename);
            let analysis = result.analysis.as_ref().unwrap();
            assert!(analysis.summary.contains(&doc.filename));
        }
    }

    #[tokio::test]
    async fn test_one_fetch_failure_does_not_affect_siblings() {
        let dir = tempfile::tempdir().unwrap();
        let mut docs = vec![
            png_doc(&dir, "good-1.png", 16),
            png_doc(&dir, "good-2.png", 16),
        ];
        docs.insert(
            1,
            DocumentRef {
                filename: "missing.png".to_string(),
                locator: "missing.png".to_string(),
                mime_type: "image/png".to_string(),
            },
        );
        let cfg = test_config(&dir);
        let model = MockModel::new();

        let results =
            analyze_documents_with(&cfg, &docs, &AnalyzeOptions::default(), Some(&model)).await;

        assert_eq!(results.len(), 3);
        assert!(results[0].is_ok());
        assert!(!results[1].is_ok());
        assert!(results[1].error.is_some());
        assert!(results[2].is_ok());
    }

    #[tokio::test]
    async fn test_empty_input_makes_no_calls() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = test_config(&dir);
        let model = MockModel::new();

        let results =
            analyze_documents_with(&cfg, &[], &AnalyzeOptions::default(), Some(&model)).await;

        assert!(results.is_empty());
        assert_eq!(model.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_unconfigured_model_reports_per_document() {
        let dir = tempfile::tempdir().unwrap();
        let docs = vec![png_doc(&dir, "a.png", 16), png_doc(&dir, "b.png", 16)];
        let cfg = test_config(&dir);

        let results = analyze_documents_with(&cfg, &docs, &AnalyzeOptions::default(), None).await;

        assert_eq!(results.len(), 2);
        for result in &results {
            assert!(result.analysis.is_none());
            assert!(result.error.as_ref().unwrap().contains("not configured"));
        }
    }

    #[tokio::test]
    async fn test_oversized_image_fails_before_model_call() {
        let dir = tempfile::tempdir().unwrap();
        let docs = vec![
            png_doc(&dir, "huge.png", 9 * 1024 * 1024),
            png_doc(&dir, "fine.png", 16),
        ];
        let cfg = AnalysisConfig {
            max_image_bytes: 8 * 1024 * 1024,
            ..test_config(&dir)
        };
        let model = MockModel::new();

        let results =
            analyze_documents_with(&cfg, &docs, &AnalyzeOptions::default(), Some(&model)).await;

        assert!(results[0].error.as_ref().unwrap().contains("too large"));
        assert!(results[1].is_ok());
        // The oversized document never reached the model
        assert_eq!(model.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_parsed_analysis_carries_confidence() {
        let dir = tempfile::tempdir().unwrap();
        let docs = vec![png_doc(&dir, "w2.png", 16)];
        let cfg = test_config(&dir);
        let model = MockModel::new();

        let results =
            analyze_documents_with(&cfg, &docs, &AnalyzeOptions::default(), Some(&model)).await;

        let analysis = results[0].analysis.as_ref().unwrap();
        assert_eq!(analysis.document_type, "W-2");
        assert_eq!(analysis.confidence, Confidence::High);
    }

    #[test]
    fn test_pdf_detection() {
        assert!(is_pdf("application/pdf", "anything.bin"));
        assert!(is_pdf("application/octet-stream", "w2.PDF"));
        assert!(!is_pdf("image/png", "scan.png"));
    }
}
