//! Response Parser
//!
//! Converts the model's free-form reply into a typed `DocumentAnalysis`.
//! Never fails: an ordered chain of structured-parse strategies (fenced JSON
//! block, whole-string JSON, outermost-brace slice) runs first, and when no
//! JSON object is recoverable a regex/heuristic tier takes over. The model is
//! not contractually bound to emit JSON, and prose replies still carry
//! information worth keeping.
//!
//! Confidence is forced to `low` exactly when the heuristic tier ran.

use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::{Map, Value};
use std::collections::BTreeMap;

use super::types::{Amount, Confidence, DatedField, DocumentAnalysis, ExtractedData};

/// Upper bound on summary length, on every parse path.
const MAX_SUMMARY_CHARS: usize = 600;

/// Maximum strategy notes kept per document.
const MAX_NOTES: usize = 5;

static DOC_TYPE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)document\s*type\s*[:\-]\s*([A-Za-z0-9][A-Za-z0-9/\- ]{0,40})").unwrap()
});

static YEAR_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)(?:tax\s+)?year\s*[:\-]\s*((?:19|20)\d{2})").unwrap());

static CURRENCY_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\$\s?([0-9][0-9,]*(?:\.[0-9]{1,2})?)").unwrap());

/// Parse a raw model reply. Always returns a usable analysis.
pub fn parse_analysis_response(raw: &str) -> DocumentAnalysis {
    // First strategy that recovers a JSON object wins
    let strategies: [fn(&str) -> Option<Value>; 3] = [fenced_json, whole_json, brace_slice];
    for strategy in strategies {
        if let Some(Value::Object(obj)) = strategy(raw) {
            return map_structured(obj, raw);
        }
    }

    tracing::debug!("[Parser] No JSON object recoverable, using heuristic fallback");
    heuristic_parse(raw)
}

// ── Structured strategies ──────────────────────────────────────────

/// JSON inside a ```json (or plain ```) fence.
fn fenced_json(text: &str) -> Option<Value> {
    let body = if let Some(start) = text.find("```json") {
        let json_start = start + 7;
        let end = text[json_start..].find("```")?;
        &text[json_start..json_start + end]
    } else {
        let start = text.find("```")?;
        let block_start = start + 3;
        let content_start = text[block_start..]
            .find('\n')
            .map(|i| block_start + i + 1)
            .unwrap_or(block_start);
        let end = text[content_start..].find("```")?;
        &text[content_start..content_start + end]
    };
    serde_json::from_str(body.trim()).ok()
}

/// The entire reply is JSON.
fn whole_json(text: &str) -> Option<Value> {
    serde_json::from_str(text.trim()).ok()
}

/// JSON object embedded in prose: the outermost `{ .. }` slice.
fn brace_slice(text: &str) -> Option<Value> {
    let start = text.find('{')?;
    let end = text.rfind('}')?;
    if end <= start {
        return None;
    }
    serde_json::from_str(&text[start..=end]).ok()
}

// ── Structured mapping ─────────────────────────────────────────────

/// Map a parsed JSON object onto `DocumentAnalysis`, defaulting every
/// missing or malformed field rather than trusting the shape.
fn map_structured(obj: Map<String, Value>, raw: &str) -> DocumentAnalysis {
    let document_type = get_str(&obj, &["documentType", "document_type"])
        .unwrap_or("Unknown")
        .to_string();

    let confidence = get_str(&obj, &["confidence"])
        .and_then(Confidence::from_str)
        .unwrap_or(Confidence::Medium);

    let extracted_data = obj
        .get("extractedData")
        .or_else(|| obj.get("extracted_data"))
        .and_then(Value::as_object)
        .map(map_extracted_data)
        .unwrap_or_default();

    let summary = get_str(&obj, &["summary"])
        .filter(|s| !s.trim().is_empty())
        .map(|s| clamp_summary(s))
        .unwrap_or_else(|| clamp_summary(raw));

    let notes = obj
        .get("notes")
        .and_then(Value::as_array)
        .map(|arr| {
            arr.iter()
                .filter_map(Value::as_str)
                .map(str::to_string)
                .take(MAX_NOTES)
                .collect()
        })
        .unwrap_or_default();

    DocumentAnalysis {
        document_type,
        confidence,
        extracted_data,
        summary,
        notes,
    }
}

fn map_extracted_data(obj: &Map<String, Value>) -> ExtractedData {
    let year = match obj.get("year") {
        Some(Value::String(s)) if !s.is_empty() => Some(s.clone()),
        Some(Value::Number(n)) => Some(n.to_string()),
        _ => None,
    };

    let amounts = obj
        .get("amounts")
        .and_then(Value::as_array)
        .map(|arr| arr.iter().filter_map(map_amount).collect())
        .unwrap_or_default();

    let dates = obj
        .get("dates")
        .and_then(Value::as_array)
        .map(|arr| {
            arr.iter()
                .filter_map(|v| {
                    let item = v.as_object()?;
                    Some(DatedField {
                        label: item.get("label")?.as_str()?.to_string(),
                        value: item.get("value")?.as_str()?.to_string(),
                    })
                })
                .collect()
        })
        .unwrap_or_default();

    let other: BTreeMap<String, Value> = obj
        .get("other")
        .and_then(Value::as_object)
        .map(|o| {
            o.iter()
                .filter(|(_, v)| v.is_string() || v.is_number())
                .map(|(k, v)| (k.clone(), v.clone()))
                .collect()
        })
        .unwrap_or_default();

    ExtractedData {
        year,
        amounts,
        employer: get_owned_str(obj, "employer"),
        payer: get_owned_str(obj, "payer"),
        recipient: get_owned_str(obj, "recipient"),
        dates,
        other,
    }
}

/// Entries whose value fails numeric parse are dropped, never kept as NaN.
fn map_amount(value: &Value) -> Option<Amount> {
    let item = value.as_object()?;
    let numeric = match item.get("value") {
        Some(Value::Number(n)) => n.as_f64(),
        Some(Value::String(s)) => parse_currency(s),
        _ => None,
    }?;
    if !numeric.is_finite() {
        return None;
    }
    Some(Amount {
        label: item
            .get("label")
            .and_then(Value::as_str)
            .unwrap_or("amount")
            .to_string(),
        value: numeric,
        description: item
            .get("description")
            .and_then(Value::as_str)
            .map(str::to_string),
    })
}

fn get_str<'a>(obj: &'a Map<String, Value>, keys: &[&str]) -> Option<&'a str> {
    keys.iter().find_map(|k| obj.get(*k).and_then(Value::as_str))
}

fn get_owned_str(obj: &Map<String, Value>, key: &str) -> Option<String> {
    obj.get(key)
        .and_then(Value::as_str)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

// ── Heuristic fallback ─────────────────────────────────────────────

/// Regex/rule extraction for prose replies. Confidence is always `low`.
fn heuristic_parse(raw: &str) -> DocumentAnalysis {
    let document_type = DOC_TYPE_RE
        .captures(raw)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().trim().to_string())
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| "Unknown".to_string());

    let year = YEAR_RE
        .captures(raw)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().to_string());

    let amounts: Vec<Amount> = CURRENCY_RE
        .captures_iter(raw)
        .filter_map(|c| parse_currency(c.get(1)?.as_str()))
        .filter(|v| v.is_finite())
        .map(|value| Amount {
            label: "amount".to_string(),
            value,
            description: None,
        })
        .collect();

    let notes = synthesize_notes(&document_type);
    let summary = if raw.trim().is_empty() {
        template_summary(&document_type, year.as_deref(), &amounts)
    } else {
        clamp_summary(raw)
    };

    DocumentAnalysis {
        document_type,
        confidence: Confidence::Low,
        extracted_data: ExtractedData {
            year,
            amounts,
            ..Default::default()
        },
        summary,
        notes,
    }
}

/// Keyword rules for strategy notes when the model gave us prose only.
fn synthesize_notes(document_type: &str) -> Vec<String> {
    let type_lower = document_type.to_lowercase();
    let mut notes = Vec::new();

    if type_lower.contains("w-2") || type_lower.contains("w2") {
        notes.push(
            "Consider increasing retirement plan contributions to reduce taxable wages."
                .to_string(),
        );
        notes.push("Review withholding against expected liability to avoid a surprise balance due."
            .to_string());
    }
    if type_lower.contains("1099") {
        notes.push(
            "Set aside funds for estimated quarterly tax payments on this income.".to_string(),
        );
        notes.push(
            "A SEP-IRA or solo 401(k) could shelter part of this self-employment income."
                .to_string(),
        );
    }

    notes.push("Consult a tax professional to confirm these suggestions fit your situation."
        .to_string());
    notes.truncate(MAX_NOTES);
    notes
}

/// Templated summary when the raw reply carried no text at all.
fn template_summary(document_type: &str, year: Option<&str>, amounts: &[Amount]) -> String {
    let mut top: Vec<f64> = amounts.iter().map(|a| a.value).collect();
    top.sort_by(|a, b| b.partial_cmp(a).unwrap_or(std::cmp::Ordering::Equal));
    top.truncate(3);

    let amounts_text = if top.is_empty() {
        "no amounts detected".to_string()
    } else {
        top.iter()
            .map(|v| format!("${:.2}", v))
            .collect::<Vec<_>>()
            .join(", ")
    };

    format!(
        "Detected a {} document for tax year {}. Key amounts: {}.",
        document_type,
        year.unwrap_or("not specified"),
        amounts_text
    )
}

fn clamp_summary(text: &str) -> String {
    let trimmed = text.trim();
    if trimmed.chars().count() <= MAX_SUMMARY_CHARS {
        return trimmed.to_string();
    }
    trimmed.chars().take(MAX_SUMMARY_CHARS).collect()
}

fn parse_currency(s: &str) -> Option<f64> {
    s.trim()
        .trim_start_matches('$')
        .replace(',', "")
        .parse::<f64>()
        .ok()
}
