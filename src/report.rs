/*============================================================
  Synavera Project: Syn-Cat
  Module: syncat_core::report
  Etiquette: Synavera Script Etiquette — Rust Profile v1.1.1
  ------------------------------------------------------------
  Purpose:
    Assemble the Syn-Cat JSON report from collected search
    results and update details.

  Security / Safety Notes:
    Report data is written to operator-controlled paths; no
    privileged operations are performed.

  Dependencies:
    serde + serde_json for JSON serialization, chrono for
    generation timestamps.

  Operational Scope:
    Written by the syncat binary after a search completes.

  Revision History:
    2025-11-12 COD  Authored catalog search report.
  ------------------------------------------------------------
  SSE Principles Observed:
    - Deterministic ordering for reproducible reports
    - Rich metadata for audit and observability
============================================================*/

use std::collections::BTreeMap;
use std::fs::File;
use std::path::Path;

use chrono::{SecondsFormat, Utc};
use serde::Serialize;
use tracing::debug;

use crate::error::{CatalogError, Result};
use crate::postback::{SortBy, SortDirection};
use crate::session::SearchOptions;
use crate::update_info::{SearchResult, UpdateDetail};

/// Wrapper representing the full report document.
#[derive(Debug, Serialize)]
pub struct ReportDocument {
    pub metadata: ReportMetadata,
    pub results: Vec<SearchResult>,
    pub details: Vec<UpdateDetail>,
}

/// Metadata block describing report context.
#[derive(Debug, Serialize)]
pub struct ReportMetadata {
    pub generated_at: String,
    pub generated_by: String,
    pub query: String,
    pub sort_by: Option<SortBy>,
    pub sort_direction: Option<SortDirection>,
    pub ignore_duplicates: bool,
    /// Total the catalog advertised, when only the first page was read.
    pub advertised_results: Option<u32>,
    pub total_results: usize,
    pub total_size_bytes: u64,
    pub classifications: BTreeMap<String, usize>,
    pub details_collected: usize,
    pub details_failed: usize,
    pub download_links: usize,
}

/// Build a report. `details` holds one slot per attempted detail lookup,
/// `None` marking a lookup that failed.
pub fn build_report(
    query: &str,
    options: &SearchOptions,
    results: Vec<SearchResult>,
    details: Vec<Option<UpdateDetail>>,
    advertised_results: Option<u32>,
) -> ReportDocument {
    let mut classifications: BTreeMap<String, usize> = BTreeMap::new();
    let mut total_size = 0u64;
    for result in &results {
        *classifications
            .entry(result.classification.clone())
            .or_default() += 1;
        total_size = total_size.saturating_add(result.size_in_bytes);
    }

    let attempted = details.len();
    let details: Vec<UpdateDetail> = details.into_iter().flatten().collect();
    let download_links = details
        .iter()
        .map(|detail| detail.download_links.len())
        .sum();
    debug!(
        code = "REPORT",
        "{} results across {} classifications; {}/{} details collected",
        results.len(),
        classifications.len(),
        details.len(),
        attempted
    );

    let metadata = ReportMetadata {
        generated_at: Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true),
        generated_by: "syncat_core".to_string(),
        query: query.to_string(),
        sort_by: options.sort_by,
        sort_direction: options.sort_by.map(|_| options.sort_direction),
        ignore_duplicates: options.ignore_duplicates,
        advertised_results,
        total_results: results.len(),
        total_size_bytes: total_size,
        classifications,
        details_collected: details.len(),
        details_failed: attempted - details.len(),
        download_links,
    };

    ReportDocument {
        metadata,
        results,
        details,
    }
}

/// Persist the report to the given path.
pub fn write_report(document: &ReportDocument, path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(|err| {
            CatalogError::Filesystem(format!(
                "Failed to create report directory {}: {err}",
                parent.display()
            ))
        })?;
    }
    let file = File::create(path).map_err(|err| {
        CatalogError::Filesystem(format!(
            "Failed to create report file {}: {err}",
            path.display()
        ))
    })?;
    serde_json::to_writer_pretty(file, document).map_err(|err| {
        CatalogError::Serialization(format!("Failed to write report {}: {err}", path.display()))
    })?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;

    use super::*;
    use crate::update_info::{AdditionalProperties, UpdateExtension};

    fn result(id: &str, classification: &str, bytes: u64) -> SearchResult {
        SearchResult {
            title: format!("Update {id}"),
            products: vec!["SQL Server 2012".into()],
            classification: classification.into(),
            last_updated: NaiveDate::from_ymd_opt(2018, 1, 5).expect("valid"),
            version: "n/a".into(),
            size: "1 KB".into(),
            size_in_bytes: bytes,
            update_id: id.into(),
        }
    }

    fn detail(origin: &SearchResult) -> UpdateDetail {
        UpdateDetail {
            update_id: origin.update_id.clone(),
            title: origin.title.clone(),
            products: origin.products.clone(),
            classification: origin.classification.clone(),
            last_updated: origin.last_updated,
            version: origin.version.clone(),
            size: origin.size.clone(),
            size_in_bytes: origin.size_in_bytes,
            description: "desc".into(),
            architectures: vec!["AMD64".into()],
            supported_languages: vec!["all".into()],
            more_information: vec!["n/a".into()],
            support_urls: vec!["n/a".into()],
            restart_behavior: "Can request restart".into(),
            may_request_user_input: "No".into(),
            must_be_installed_exclusively: "No".into(),
            requires_network_connectivity: "No".into(),
            uninstall_notes: "n/a".into(),
            uninstall_steps: "n/a".into(),
            download_links: vec![
                "https://catalog.s.download.windowsupdate.com/a.cab".into(),
                "https://catalog.s.download.windowsupdate.com/b.cab".into(),
            ],
            extension: UpdateExtension::Patch(AdditionalProperties {
                security_bulletin: "n/a".into(),
                severity: "n/a".into(),
                kb_article_numbers: "4057116".into(),
                superseded_by: Vec::new(),
                supersedes: Vec::new(),
            }),
        }
    }

    #[test]
    fn metadata_summarises_results_and_details() {
        let results = vec![
            result("a", "Security Updates", 100),
            result("b", "Security Updates", 50),
            result("c", "Service Packs", 7),
        ];
        let details = vec![Some(detail(&results[0])), None, None];
        let options = SearchOptions {
            ignore_duplicates: true,
            sort_by: Some(SortBy::Size),
            sort_direction: SortDirection::Ascending,
        };

        let report = build_report("SQL Server 2012", &options, results, details, None);
        let meta = &report.metadata;
        assert_eq!(meta.total_results, 3);
        assert_eq!(meta.total_size_bytes, 157);
        assert_eq!(meta.classifications.get("Security Updates"), Some(&2));
        assert_eq!(meta.details_collected, 1);
        assert_eq!(meta.details_failed, 2);
        assert_eq!(meta.download_links, 2);
        assert_eq!(meta.sort_direction, Some(SortDirection::Ascending));
    }

    #[test]
    fn unsorted_report_omits_direction_and_writes_json() {
        let report = build_report(
            "KB4057116",
            &SearchOptions::default(),
            vec![result("a", "Updates", 1)],
            Vec::new(),
            Some(49),
        );
        assert_eq!(report.metadata.sort_direction, None);

        let dir = tempfile::tempdir().expect("temp dir");
        let path = dir.path().join("reports").join("latest.json");
        write_report(&report, &path).expect("write");

        let raw = std::fs::read_to_string(&path).expect("read back");
        let value: serde_json::Value = serde_json::from_str(&raw).expect("json");
        assert_eq!(value["metadata"]["query"], "KB4057116");
        assert_eq!(value["metadata"]["advertised_results"], 49);
        assert_eq!(value["results"][0]["last_updated"], "2018-01-05");
        assert_eq!(value["results"][0]["update_id"], "a");
    }
}
