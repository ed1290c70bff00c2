use anyhow::{bail, Context, Result};
use serde_json::json;
use std::path::Path;

use crate::config;
use crate::models::{IngestionOptions, IngestionSource};
use crate::pipeline::{BatchReport, Pipeline};

/// How the batch report is presented
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ReportFormat {
    #[default]
    Text,
    Json,
}

/// Run the ingestion batch and print its report.
///
/// Returns `false` when at least one source failed, so the caller can set
/// the process exit code.
pub async fn ingest(
    sources_path: &Path,
    only_slug: Option<&str>,
    options: IngestionOptions,
    format: ReportFormat,
) -> Result<bool> {
    let mut sources = config::load_sources(sources_path).context("Failed to load sources")?;

    if let Some(slug) = only_slug {
        sources.retain(|s| s.slug == slug);
        if sources.is_empty() {
            bail!("No source with slug {slug:?} in {}", sources_path.display());
        }
    }

    if options.dry_run && format == ReportFormat::Text {
        println!("Dry run: converting without writing to the library");
    }

    let pipeline = Pipeline::new(options).context("Failed to assemble pipeline")?;
    let report = pipeline.run_batch(&sources).await;

    match format {
        ReportFormat::Text => print_report(&report, &sources),
        ReportFormat::Json => println!(
            "{}",
            serde_json::to_string_pretty(&report_json(&report))
                .context("Failed to render report")?
        ),
    }

    Ok(report.all_succeeded())
}

/// Machine-readable rendering of the batch report
fn report_json(report: &BatchReport) -> serde_json::Value {
    json!({
        "all_succeeded": report.all_succeeded(),
        "duration_ms": report.duration.as_millis() as u64,
        "totals": {
            "processed": report.articles_processed(),
            "skipped": report.articles_skipped(),
            "stored": report.articles_stored(),
            "errors": report.error_count(),
        },
        "sources": report.sources.iter().map(|s| json!({
            "slug": &s.slug,
            "success": s.success,
            "processed": s.articles_processed,
            "skipped": s.articles_skipped,
            "stored": s.articles_stored,
            "duration_ms": s.duration.as_millis() as u64,
            "errors": s.errors.iter().map(|e| json!({
                "phase": e.phase.as_str(),
                "article_url": &e.article_url,
                "message": &e.message,
            })).collect::<Vec<_>>(),
        })).collect::<Vec<_>>(),
    })
}

fn print_report(report: &BatchReport, sources: &[IngestionSource]) {
    println!("\nIngestion report");
    println!("================");

    for source_report in &report.sources {
        let name = sources
            .iter()
            .find(|s| s.slug == source_report.slug)
            .map(|s| s.name.as_str())
            .unwrap_or(source_report.slug.as_str());
        let status = if source_report.success && source_report.errors.is_empty() {
            "ok"
        } else {
            "FAILED"
        };

        println!(
            "  [{status}] {name}: {} processed, {} skipped, {} stored ({} ms)",
            source_report.articles_processed,
            source_report.articles_skipped,
            source_report.articles_stored,
            source_report.duration.as_millis(),
        );
        for error in &source_report.errors {
            match &error.article_url {
                Some(url) => println!("      {} error for {url}: {}", error.phase.as_str(), error.message),
                None => println!("      {} error: {}", error.phase.as_str(), error.message),
            }
        }
    }

    println!(
        "\nTotals: {} processed, {} skipped, {} stored, {} errors in {} ms",
        report.articles_processed(),
        report.articles_skipped(),
        report.articles_stored(),
        report.error_count(),
        report.duration.as_millis(),
    );
}
