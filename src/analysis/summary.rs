//! Summary Generator
//!
//! Reduces a batch's results into a short human-readable digest. Pure and
//! synchronous; same input always produces the same output.

use super::types::AnalysisResult;

/// Longest summary excerpt shown per document.
const EXCERPT_CHARS: usize = 120;

/// Build a digest of a batch run: a header count plus one line per
/// successfully analyzed document.
pub fn generate_analysis_summary(results: &[AnalysisResult]) -> String {
    let analyzed: Vec<_> = results
        .iter()
        .filter_map(|r| r.analysis.as_ref().map(|a| (&r.filename, a)))
        .collect();

    if analyzed.is_empty() {
        return "No documents were successfully analyzed.".to_string();
    }

    let mut out = format!(
        "Analyzed {} of {} documents:\n",
        analyzed.len(),
        results.len()
    );

    for (filename, analysis) in analyzed {
        let mut line = format!(
            "- {}: {} ({} confidence)",
            filename,
            analysis.document_type,
            analysis.confidence.as_str()
        );

        if let Some(year) = &analysis.extracted_data.year {
            line.push_str(&format!(", tax year {}", year));
        }

        let total: f64 = analysis
            .extracted_data
            .amounts
            .iter()
            .map(|a| a.value)
            .sum();
        if !analysis.extracted_data.amounts.is_empty() {
            line.push_str(&format!(", amounts totaling ${:.2}", total));
        }

        let excerpt = excerpt(&analysis.summary);
        if !excerpt.is_empty() {
            line.push_str(&format!(". {}", excerpt));
        }

        out.push_str(&line);
        out.push('\n');
    }

    out
}

fn excerpt(text: &str) -> String {
    let trimmed = text.trim();
    if trimmed.chars().count() <= EXCERPT_CHARS {
        return trimmed.to_string();
    }
    let cut: String = trimmed.chars().take(EXCERPT_CHARS).collect();
    format!("{}...", cut.trim_end())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::types::{
        Amount, AnalysisResult, Confidence, DocumentAnalysis, ExtractedData,
    };

    fn w2_result(filename: &str) -> AnalysisResult {
        AnalysisResult::ok(
            filename,
            DocumentAnalysis {
                document_type: "W-2".to_string(),
                confidence: Confidence::High,
                extracted_data: ExtractedData {
                    year: Some("2024".to_string()),
                    amounts: vec![
                        Amount {
                            label: "Wages".to_string(),
                            value: 52000.0,
                            description: None,
                        },
                        Amount {
                            label: "Withholding".to_string(),
                            value: 6500.0,
                            description: None,
                        },
                    ],
                    ..Default::default()
                },
                summary: "W-2 from Acme Corp for 2024 showing $52,000 in wages.".to_string(),
                notes: vec![],
            },
        )
    }

    #[test]
    fn test_nothing_analyzed() {
        let results = vec![AnalysisResult::failed("a.pdf", "fetch failed")];
        assert_eq!(
            generate_analysis_summary(&results),
            "No documents were successfully analyzed."
        );
        assert_eq!(
            generate_analysis_summary(&[]),
            "No documents were successfully analyzed."
        );
    }

    #[test]
    fn test_header_counts_mixed_results() {
        let results = vec![
            w2_result("w2.pdf"),
            AnalysisResult::failed("broken.pdf", "model call failed"),
            w2_result("other.pdf"),
        ];
        let summary = generate_analysis_summary(&results);
        assert!(summary.starts_with("Analyzed 2 of 3 documents:"));
        assert!(summary.contains("w2.pdf: W-2 (high confidence)"));
        assert!(summary.contains("tax year 2024"));
        assert!(summary.contains("amounts totaling $58500.00"));
        assert!(!summary.contains("broken.pdf"));
    }

    #[test]
    fn test_summary_is_idempotent() {
        let results = vec![w2_result("w2.pdf"), w2_result("second.pdf")];
        let first = generate_analysis_summary(&results);
        let second = generate_analysis_summary(&results);
        assert_eq!(first, second);
    }

    #[test]
    fn test_long_summaries_are_excerpted() {
        let mut result = w2_result("w2.pdf");
        result.analysis.as_mut().unwrap().summary = "detail ".repeat(100);
        let summary = generate_analysis_summary(&[result]);
        let line = summary.lines().nth(1).unwrap();
        assert!(line.ends_with("..."));
    }
}
