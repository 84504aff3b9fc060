//! PDF Text Extractor
//!
//! Turns PDF bytes into a compressed text transcript bounded in pages and
//! characters. Extraction never fails outward: empty, unparsable, or
//! panicking PDFs yield a sentinel string, and the pipeline still asks the
//! model about it so "could not extract text" shows up in the answer instead
//! of as a hard failure.
//!
//! Compression keeps token cost bounded on templated tax forms: consecutive
//! duplicate lines collapse, whitespace runs collapse, and the transcript is
//! hard-truncated at the character budget.

/// Returned when no text could be extracted from the PDF.
pub const EMPTY_TEXT_SENTINEL: &str =
    "[No extractable text was found in this PDF. It may be a scanned image.]";

/// Appended when the transcript was cut at the character budget.
pub const TRUNCATION_MARKER: &str = " [truncated]";

/// Extract a compressed transcript from PDF bytes.
///
/// At most `max_pages` pages are read; longer documents are truncated, not
/// rejected. Pages are labeled `[Page N]` only when more than one page
/// produced text.
pub fn extract_pdf_text(bytes: &[u8], max_pages: usize, max_chars: usize) -> String {
    // The extraction stack can panic on malformed fonts/glyphs; contain it
    let pages = match std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
        pdf_extract::extract_text_from_mem_by_pages(bytes)
    })) {
        Ok(Ok(pages)) => pages,
        Ok(Err(e)) => {
            tracing::warn!("[PdfText] Extraction failed: {}", e);
            return EMPTY_TEXT_SENTINEL.to_string();
        }
        Err(_panic) => {
            tracing::warn!("[PdfText] Extraction panicked, likely malformed fonts");
            return EMPTY_TEXT_SENTINEL.to_string();
        }
    };

    let total_pages = pages.len();
    if total_pages > max_pages {
        tracing::debug!(
            "[PdfText] Truncating {} pages to the {}-page cap",
            total_pages,
            max_pages
        );
    }

    let transcript = assemble_transcript(&pages, max_pages);
    let compressed = compress_text(&transcript, max_chars);

    if compressed.is_empty() {
        return EMPTY_TEXT_SENTINEL.to_string();
    }
    compressed
}

/// Join per-page text into one transcript, labeling pages when there is more
/// than one with content.
fn assemble_transcript(pages: &[String], max_pages: usize) -> String {
    let capped: Vec<&String> = pages.iter().take(max_pages).collect();
    let multi_page = capped.len() > 1;

    let mut transcript = String::new();
    for (i, page) in capped.iter().enumerate() {
        if multi_page {
            transcript.push_str(&format!("[Page {}]\n", i + 1));
        }
        transcript.push_str(page);
        transcript.push('\n');
    }
    transcript
}

/// Bound token cost: collapse consecutive duplicate lines, collapse
/// whitespace runs to single spaces, hard-truncate at `max_chars`.
fn compress_text(text: &str, max_chars: usize) -> String {
    // (a) consecutive duplicate lines collapse to one; templated tax forms
    // repeat boilerplate on every page
    let mut deduped: Vec<&str> = Vec::new();
    let mut last: Option<&str> = None;
    for line in text.lines() {
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }
        if last != Some(trimmed) {
            deduped.push(trimmed);
            last = Some(trimmed);
        }
    }

    // (b) whitespace runs to single spaces
    let flat = deduped.join(" ");
    let collapsed: String = flat.split_whitespace().collect::<Vec<_>>().join(" ");

    // (c) hard truncation with marker
    if collapsed.chars().count() > max_chars {
        let cut: String = collapsed.chars().take(max_chars).collect();
        return format!("{}{}", cut.trim_end(), TRUNCATION_MARKER);
    }
    collapsed
}
