/*============================================================
  Synavera Project: Syn-Cat
  Module: syncat_core::update_info
  Etiquette: Synavera Script Etiquette — Rust Profile v1.1.1
  ------------------------------------------------------------
  Purpose:
    Shared structures describing catalog search results and
    fully collected update details.

  Security / Safety Notes:
    Pure data containers; no I/O performed in this module.

  Dependencies:
    serde for report serialization, chrono for dates.

  Operational Scope:
    Produced by the page parsers, aggregated by the session
    controller, and written by the report builder.

  Revision History:
    2025-11-12 COD  Introduced shared catalog record types.
    2025-12-02 COD  Folded driver/patch subtypes into one tagged
                    extension.
  ------------------------------------------------------------
  SSE Principles Observed:
    - Clear data contracts between modules
    - Serializable structures for report output
============================================================*/

use chrono::NaiveDate;
use serde::Serialize;

/// One row of a catalog results table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SearchResult {
    pub title: String,
    pub products: Vec<String>,
    pub classification: String,
    pub last_updated: NaiveDate,
    pub version: String,
    /// Human readable size as rendered by the catalog, e.g. `944.1 MB`.
    pub size: String,
    pub size_in_bytes: u64,
    /// Opaque catalog identifier. Usually GUID shaped, never validated as one.
    pub update_id: String,
}

impl SearchResult {
    /// Key used when duplicates are ignored.
    ///
    /// Two distinct updates can share a title and byte count, so this is an
    /// approximation of identity rather than a guarantee.
    pub fn duplicate_key(&self) -> (u64, &str) {
        (self.size_in_bytes, self.title.as_str())
    }
}

/// Everything the details page and download dialog expose about one update.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UpdateDetail {
    pub update_id: String,
    pub title: String,
    pub products: Vec<String>,
    pub classification: String,
    pub last_updated: NaiveDate,
    pub version: String,
    pub size: String,
    pub size_in_bytes: u64,

    pub description: String,
    pub architectures: Vec<String>,
    pub supported_languages: Vec<String>,
    pub more_information: Vec<String>,
    pub support_urls: Vec<String>,
    pub restart_behavior: String,
    pub may_request_user_input: String,
    pub must_be_installed_exclusively: String,
    pub requires_network_connectivity: String,
    pub uninstall_notes: String,
    pub uninstall_steps: String,
    pub download_links: Vec<String>,

    pub extension: UpdateExtension,
}

impl UpdateDetail {
    /// Attach the links resolved from the download dialog.
    pub fn with_download_links(mut self, links: Vec<String>) -> Self {
        self.download_links = links;
        self
    }

    pub fn driver_properties(&self) -> Option<&DriverProperties> {
        match &self.extension {
            UpdateExtension::Driver(props) => Some(props),
            UpdateExtension::Patch(_) => None,
        }
    }

    pub fn additional_properties(&self) -> Option<&AdditionalProperties> {
        match &self.extension {
            UpdateExtension::Patch(props) => Some(props),
            UpdateExtension::Driver(_) => None,
        }
    }
}

/// Classification-specific half of an [`UpdateDetail`]. Exactly one applies.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum UpdateExtension {
    Driver(DriverProperties),
    Patch(AdditionalProperties),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DriverProperties {
    /// Company that released the driver package, e.g. Lenovo.
    pub company: String,
    pub manufacturer: String,
    /// Device class, e.g. Net or OtherHardware.
    pub device_class: String,
    pub device_model: String,
    pub provider: String,
    pub version: String,
    pub version_date: NaiveDate,
    pub hardware_ids: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AdditionalProperties {
    pub security_bulletin: String,
    pub severity: String,
    pub kb_article_numbers: String,
    /// Identifiers of updates that replace this one.
    pub superseded_by: Vec<String>,
    /// Identifiers of updates this one replaces.
    pub supersedes: Vec<String>,
}
