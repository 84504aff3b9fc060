//! Shared types for the document analysis pipeline

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Pointer to one uploaded document.
///
/// `locator` is either a path relative to the configured document root or an
/// absolute URL into object storage. Created by the upload/storage layer
/// before the pipeline runs; never mutated here.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentRef {
    /// Original filename as uploaded
    pub filename: String,

    /// Relative path or absolute storage URL
    pub locator: String,

    /// MIME type declared at upload time
    pub mime_type: String,
}

/// Image payload format accepted by the vision endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageFormat {
    Png,
    Jpeg,
}

impl ImageFormat {
    pub fn mime(&self) -> &'static str {
        match self {
            Self::Png => "image/png",
            Self::Jpeg => "image/jpeg",
        }
    }

    /// Detect format from magic bytes. Anything that is not a PNG is sent as
    /// JPEG; the vision endpoint tolerates a mislabeled container.
    pub fn detect(data: &[u8]) -> Self {
        if data.starts_with(&[0x89, 0x50, 0x4E, 0x47]) {
            Self::Png
        } else {
            Self::Jpeg
        }
    }
}

/// The content actually sent for analysis. Produced once per document and
/// consumed exactly once by the prompt client.
#[derive(Debug, Clone)]
pub enum ExtractedContent {
    /// Compressed text transcript (PDFs)
    Text(String),
    /// Base64-encoded image payload
    Image { base64: String, format: ImageFormat },
}

/// Coarse trust label on a single document's analysis.
///
/// `Low` if and only if the response parser fell back to heuristic
/// extraction because no structured JSON was recoverable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Confidence {
    High,
    Medium,
    Low,
}

impl Confidence {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::High => "high",
            Self::Medium => "medium",
            Self::Low => "low",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "high" => Some(Self::High),
            "medium" => Some(Self::Medium),
            "low" => Some(Self::Low),
            _ => None,
        }
    }
}

/// One labeled monetary amount extracted from a document.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Amount {
    pub label: String,
    pub value: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// One labeled date extracted from a document.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DatedField {
    pub label: String,
    pub value: String,
}

/// Structured data extracted from one document. All fields optional; the
/// model fills what it can find.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExtractedData {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub year: Option<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub amounts: Vec<Amount>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub employer: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payer: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub recipient: Option<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub dates: Vec<DatedField>,

    /// Anything else the model surfaced (string or numeric values)
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub other: BTreeMap<String, serde_json::Value>,
}

/// The structured result of understanding one document.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentAnalysis {
    /// e.g. "W-2", "1099-NEC", "Unknown"
    pub document_type: String,

    pub confidence: Confidence,

    pub extracted_data: ExtractedData,

    /// 2-4 sentence digest; bounded length
    pub summary: String,

    /// Actionable strategy bullets, 0-5 items
    pub notes: Vec<String>,
}

/// Per-document outcome returned to callers.
///
/// `analysis` is `None` when the model is unconfigured or processing failed;
/// `error` carries the reason in those cases.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisResult {
    pub filename: String,
    pub analysis: Option<DocumentAnalysis>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl AnalysisResult {
    pub fn ok(filename: impl Into<String>, analysis: DocumentAnalysis) -> Self {
        Self {
            filename: filename.into(),
            analysis: Some(analysis),
            error: None,
        }
    }

    pub fn failed(filename: impl Into<String>, error: impl Into<String>) -> Self {
        Self {
            filename: filename.into(),
            analysis: None,
            error: Some(error.into()),
        }
    }

    pub fn is_ok(&self) -> bool {
        self.analysis.is_some()
    }
}

/// Options for one batch run.
#[derive(Debug, Clone, Default)]
pub struct AnalyzeOptions {
    /// Filing-status context (e.g. "Married Filing Separately") appended to
    /// text prompts so strategy notes are tailored to it
    pub filing_status: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_confidence_round_trip() {
        assert_eq!(Confidence::from_str("HIGH"), Some(Confidence::High));
        assert_eq!(Confidence::from_str("medium"), Some(Confidence::Medium));
        assert_eq!(Confidence::from_str("bogus"), None);
        assert_eq!(
            serde_json::to_string(&Confidence::Low).unwrap(),
            "\"low\""
        );
    }

    #[test]
    fn test_analysis_serializes_camel_case() {
        let analysis = DocumentAnalysis {
            document_type: "W-2".to_string(),
            confidence: Confidence::High,
            extracted_data: ExtractedData {
                year: Some("2024".to_string()),
                ..Default::default()
            },
            summary: "A W-2 for 2024.".to_string(),
            notes: vec![],
        };
        let json = serde_json::to_value(&analysis).unwrap();
        assert_eq!(json["documentType"], "W-2");
        assert_eq!(json["extractedData"]["year"], "2024");
        // Empty collections are omitted entirely
        assert!(json["extractedData"].get("amounts").is_none());
    }

    #[test]
    fn test_image_format_detection() {
        assert_eq!(
            ImageFormat::detect(&[0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A]),
            ImageFormat::Png
        );
        assert_eq!(ImageFormat::detect(&[0xFF, 0xD8, 0xFF]), ImageFormat::Jpeg);
        assert_eq!(ImageFormat::Png.mime(), "image/png");
    }

    #[test]
    fn test_result_population() {
        let failed = AnalysisResult::failed("w2.pdf", "fetch failed");
        assert!(!failed.is_ok());
        assert!(failed.error.is_some());

        let json = serde_json::to_value(&failed).unwrap();
        assert!(json["analysis"].is_null());
        assert_eq!(json["error"], "fetch failed");
    }
}
