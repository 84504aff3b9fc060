//! Smoke-test CLI: analyze local documents and print the results.
//!
//! Usage: taxintake-analyze [--filing-status STATUS] FILE...
//! Paths are resolved relative to TAXINTAKE_DOCUMENT_ROOT (default: uploads).

use taxintake::{
    analyze_documents, generate_analysis_summary, AnalysisConfig, AnalyzeOptions, DocumentRef,
};

#[tokio::main]
async fn main() {
    // Load .env so API keys and caps can live next to the checkout
    let _ = dotenvy::dotenv();
    taxintake::init_tracing();

    let mut args = std::env::args().skip(1).peekable();
    let mut filing_status = None;
    let mut paths = Vec::new();

    while let Some(arg) = args.next() {
        if arg == "--filing-status" {
            filing_status = args.next();
        } else {
            paths.push(arg);
        }
    }

    if paths.is_empty() {
        eprintln!("usage: taxintake-analyze [--filing-status STATUS] FILE...");
        std::process::exit(2);
    }

    let cfg = AnalysisConfig::from_env();
    let documents: Vec<DocumentRef> = paths
        .iter()
        .map(|p| DocumentRef {
            filename: std::path::Path::new(p)
                .file_name()
                .map(|n| n.to_string_lossy().to_string())
                .unwrap_or_else(|| p.clone()),
            locator: p.clone(),
            mime_type: mime_guess::from_path(p).first_or_octet_stream().to_string(),
        })
        .collect();

    let options = AnalyzeOptions { filing_status };
    let results = analyze_documents(&cfg, &documents, &options).await;

    for result in &results {
        match serde_json::to_string_pretty(result) {
            Ok(json) => println!("{}", json),
            Err(e) => eprintln!("failed to serialize result for {}: {}", result.filename, e),
        }
    }

    println!("\n{}", generate_analysis_summary(&results));
}
