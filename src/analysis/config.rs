//! Pipeline configuration
//!
//! All caps are deployment-tunable through `TAXINTAKE_*` environment
//! variables but ship with fixed defaults. The host loads `.env` (dotenvy)
//! before calling `from_env`.

use std::path::PathBuf;

/// Configuration for the document analysis pipeline.
#[derive(Debug, Clone)]
pub struct AnalysisConfig {
    /// Root directory for locally stored documents
    pub document_root: PathBuf,

    /// API key for the document-understanding service; `None` means the
    /// pipeline runs in degraded "not configured" mode
    pub api_key: Option<String>,

    /// Base URL of the chat-completions API
    pub base_url: String,

    /// Model used for extracted-text analysis
    pub text_model: String,

    /// Vision-capable model used for image analysis
    pub vision_model: String,

    /// Maximum PDF pages to extract; longer documents are truncated
    pub max_pdf_pages: usize,

    /// Character budget for the compressed PDF transcript
    pub max_text_chars: usize,

    /// Maximum image payload size in bytes; larger documents fail fast
    pub max_image_bytes: usize,

    /// Documents processed concurrently per window
    pub concurrency: usize,

    /// Output-token budget per model call
    pub max_output_tokens: u32,

    /// Sampling temperature; kept low for deterministic extraction
    pub temperature: f32,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            document_root: PathBuf::from("uploads"),
            api_key: None,
            base_url: "https://api.openai.com".to_string(),
            text_model: "gpt-4o-mini".to_string(),
            vision_model: "gpt-4o-mini".to_string(),
            max_pdf_pages: 10,
            max_text_chars: 8_000,
            max_image_bytes: 8 * 1024 * 1024,
            concurrency: 3,
            max_output_tokens: 900,
            temperature: 0.1,
        }
    }
}

impl AnalysisConfig {
    /// Build a config from the environment, falling back to defaults.
    pub fn from_env() -> Self {
        let defaults = Self::default();

        let api_key = std::env::var("TAXINTAKE_API_KEY")
            .or_else(|_| std::env::var("OPENAI_API_KEY"))
            .ok()
            .filter(|k| !k.trim().is_empty());

        Self {
            document_root: std::env::var("TAXINTAKE_DOCUMENT_ROOT")
                .map(PathBuf::from)
                .unwrap_or(defaults.document_root),
            api_key,
            base_url: env_or("TAXINTAKE_API_BASE_URL", defaults.base_url),
            text_model: env_or("TAXINTAKE_TEXT_MODEL", defaults.text_model),
            vision_model: env_or("TAXINTAKE_VISION_MODEL", defaults.vision_model),
            max_pdf_pages: env_parse("TAXINTAKE_MAX_PDF_PAGES", defaults.max_pdf_pages),
            max_text_chars: env_parse("TAXINTAKE_MAX_TEXT_CHARS", defaults.max_text_chars),
            max_image_bytes: env_parse("TAXINTAKE_MAX_IMAGE_BYTES", defaults.max_image_bytes),
            concurrency: env_parse("TAXINTAKE_CONCURRENCY", defaults.concurrency).max(1),
            max_output_tokens: env_parse("TAXINTAKE_MAX_OUTPUT_TOKENS", defaults.max_output_tokens),
            temperature: env_parse("TAXINTAKE_TEMPERATURE", defaults.temperature),
        }
    }

    /// Whether the external model can be called at all.
    pub fn is_model_configured(&self) -> bool {
        self.api_key.is_some()
    }
}

fn env_or(key: &str, default: String) -> String {
    std::env::var(key).ok().filter(|v| !v.is_empty()).unwrap_or(default)
}

fn env_parse<T: std::str::FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let cfg = AnalysisConfig::default();
        assert_eq!(cfg.max_pdf_pages, 10);
        assert_eq!(cfg.max_image_bytes, 8 * 1024 * 1024);
        assert_eq!(cfg.concurrency, 3);
        assert!(!cfg.is_model_configured());
    }

    #[test]
    fn test_configured_with_key() {
        let cfg = AnalysisConfig {
            api_key: Some("sk-test".to_string()),
            ..Default::default()
        };
        assert!(cfg.is_model_configured());
    }
}
