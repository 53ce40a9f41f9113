/*============================================================
  Synavera Project: Syn-Cat
  Module: syncat_core::details
  Etiquette: Synavera Script Etiquette — Rust Profile v1.1.1
  ------------------------------------------------------------
  Purpose:
    Turn an update details page and its download dialog into
    a typed UpdateDetail with a driver or patch extension.

  Security / Safety Notes:
    Pure parsing; download links are harvested, never fetched.

  Dependencies:
    scraper (via extract) for the parse tree, regex for CDN
    link recognition.

  Operational Scope:
    Invoked by the session controller after the details page
    and the download dialog have been loaded.

  Revision History:
    2025-11-12 COD  Authored details parser.
    2025-12-02 COD  Classification branching moved ahead of field
                    extraction; error page codes mapped to taxonomy.
  ------------------------------------------------------------
  SSE Principles Observed:
    - Unknown classifications fail loudly
    - Parsing is a pure function of the page and its origin row
============================================================*/

use std::collections::HashSet;
use std::sync::LazyLock;

use regex::Regex;
use scraper::{ElementRef, Html};

use crate::error::{CatalogError, MarkupError, Result};
use crate::extract::{
    child_elements, child_texts, compile_static_regex, find_by_id, last_child_text,
    last_child_text_by_id, list_by_id, parse_catalog_date, require_by_id, supersedence_by_id,
    text_by_id, urls_by_id, urls_in,
};
use crate::update_info::{
    AdditionalProperties, DriverProperties, SearchResult, UpdateDetail, UpdateExtension,
};

pub const ERROR_PAGE_ID: &str = "errorPageDisplayedError";
pub const CATALOG_BUSY_CODE: &str = "8DDD0010";
pub const UPDATE_NOT_FOUND_CODE: &str = "8DDD0024";

const UNINSTALL_NOTES_ID: &str = "uninstallNotesDiv";
const SUPPORT_URL_IDS: [&str; 2] = ["suportUrlDiv", "supportUrlDiv"];
const HARDWARE_IDS_ID: &str = "driverhwIDs";

const PATCH_CLASSIFICATIONS: [&str; 8] = [
    "Security Updates",
    "Critical Updates",
    "Definition Updates",
    "Feature Packs",
    "Service Packs",
    "Update Rollups",
    "Updates",
    "Hotfix",
];

static DOWNLOAD_LINK_RE: LazyLock<Regex> = LazyLock::new(|| {
    compile_static_regex(
        r#"https?://dl\.delivery\.mp\.microsoft\.com/[^'"]*|https?://download\.windowsupdate\.com/[^'"]*|https://catalog\.s\.download\.windowsupdate\.com[^'"]*"#,
    )
});

/// Which extension record a classification produces.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExtensionKind {
    Driver,
    Patch,
}

impl ExtensionKind {
    pub fn for_classification(classification: &str) -> Result<Self> {
        if classification.contains("Driver") {
            Ok(ExtensionKind::Driver)
        } else if PATCH_CLASSIFICATIONS.contains(&classification) {
            Ok(ExtensionKind::Patch)
        } else {
            Err(CatalogError::UnsupportedClassification(
                classification.to_string(),
            ))
        }
    }
}

/// Code shown on the catalog's error page, e.g. `8DDD0024`.
pub fn error_code(document: &Html) -> Option<String> {
    find_by_id(document, ERROR_PAGE_ID)
        .map(|banner| last_child_text(banner).replace(['[', ']'], "").trim().to_string())
}

/// Map an error page, when present, onto the error taxonomy.
fn check_error_page(document: &Html, update_id: &str, url: &str) -> Result<()> {
    let Some(code) = error_code(document) else {
        return Ok(());
    };
    match code.as_str() {
        CATALOG_BUSY_CODE => Err(CatalogError::TransientPage {
            url: url.to_string(),
            reason: format!("catalog cannot process the request right now ({code})"),
        }),
        UPDATE_NOT_FOUND_CODE => Err(CatalogError::UpdateNotFound {
            update_id: update_id.to_string(),
        }),
        _ => Err(CatalogError::Catalog(format!(
            "catalog returned unknown error code `{code}` for update {update_id}"
        ))),
    }
}

/// Parse a details page loaded from `url` for the row `origin`.
///
/// The returned detail carries no download links; those come from a
/// separate dialog and are attached with [`UpdateDetail::with_download_links`].
pub fn parse_details_page(body: &str, origin: &SearchResult, url: &str) -> Result<UpdateDetail> {
    let document = Html::parse_document(body);
    check_error_page(&document, &origin.update_id, url)?;

    let kind = ExtensionKind::for_classification(&origin.classification)?;
    let structure = |source| CatalogError::page_structure("update details page", source);

    let extension = match kind {
        ExtensionKind::Driver => UpdateExtension::Driver(parse_driver(&document).map_err(structure)?),
        ExtensionKind::Patch => UpdateExtension::Patch(parse_patch(&document).map_err(structure)?),
    };

    build_detail(&document, origin, extension).map_err(structure)
}

fn build_detail(
    document: &Html,
    origin: &SearchResult,
    extension: UpdateExtension,
) -> std::result::Result<UpdateDetail, MarkupError> {
    Ok(UpdateDetail {
        update_id: origin.update_id.clone(),
        title: origin.title.clone(),
        products: origin.products.clone(),
        classification: origin.classification.clone(),
        last_updated: origin.last_updated,
        version: origin.version.clone(),
        size: origin.size.clone(),
        size_in_bytes: origin.size_in_bytes,

        description: text_by_id(document, "ScopedViewHandler_desc")?,
        architectures: list_by_id(document, "archDiv")?,
        supported_languages: list_by_id(document, "languagesDiv")?,
        more_information: urls_by_id(document, "moreInfoDiv")?,
        support_urls: support_urls(document)?,
        restart_behavior: text_by_id(document, "ScopedViewHandler_rebootBehavior")?,
        may_request_user_input: text_by_id(document, "ScopedViewHandler_userInput")?,
        must_be_installed_exclusively: text_by_id(document, "ScopedViewHandler_installationImpact")?,
        requires_network_connectivity: text_by_id(document, "ScopedViewHandler_connectivity")?,
        uninstall_notes: uninstall_notes(document)?,
        uninstall_steps: last_child_text_by_id(document, "uninstallStepsDiv")?,
        download_links: Vec::new(),

        extension,
    })
}

fn support_urls(document: &Html) -> std::result::Result<Vec<String>, MarkupError> {
    SUPPORT_URL_IDS
        .iter()
        .find_map(|id| find_by_id(document, id))
        .map(urls_in)
        .ok_or_else(|| MarkupError::MissingElement {
            id: SUPPORT_URL_IDS[0].to_string(),
        })
}

/// The notes container renders either three child nodes (use the last) or a
/// longer variant whose notes sit in the fourth node.
fn uninstall_notes(document: &Html) -> std::result::Result<String, MarkupError> {
    let container = require_by_id(document, UNINSTALL_NOTES_ID)?;
    let nodes = child_texts(container);
    match nodes.len() {
        3 => Ok(nodes[2].trim().to_string()),
        found if found > 3 => Ok(nodes[3].trim().to_string()),
        found => Err(MarkupError::MissingChild {
            id: UNINSTALL_NOTES_ID.to_string(),
            expected: 3,
            found,
        }),
    }
}

fn parse_driver(document: &Html) -> std::result::Result<DriverProperties, MarkupError> {
    Ok(DriverProperties {
        company: text_by_id(document, "ScopedViewHandler_company")?,
        manufacturer: text_by_id(document, "ScopedViewHandler_manufacturer")?,
        device_class: text_by_id(document, "ScopedViewHandler_driverClass")?,
        device_model: text_by_id(document, "ScopedViewHandler_driverModel")?,
        provider: text_by_id(document, "ScopedViewHandler_driverProvider")?,
        version: text_by_id(document, "ScopedViewHandler_version")?,
        version_date: parse_catalog_date(
            "driver version date",
            &text_by_id(document, "ScopedViewHandler_versionDate")?,
        )?,
        hardware_ids: hardware_ids(document),
    })
}

/// Hardware ids listed under the driver's device container. A page without
/// the container lists none.
fn hardware_ids(document: &Html) -> Vec<String> {
    let Some(container) = find_by_id(document, HARDWARE_IDS_ID) else {
        return Vec::new();
    };
    child_elements(container, "div")
        .filter_map(|row: ElementRef<'_>| {
            let first = child_texts(row).into_iter().next().unwrap_or_default();
            let id = first.trim().replace("\\r\\n", "").to_uppercase();
            (!id.is_empty()).then_some(id)
        })
        .collect()
}

fn parse_patch(document: &Html) -> std::result::Result<AdditionalProperties, MarkupError> {
    Ok(AdditionalProperties {
        security_bulletin: last_child_text_by_id(document, "securityBullitenDiv")?,
        severity: text_by_id(document, "ScopedViewHandler_msrcSeverity")?,
        kb_article_numbers: last_child_text_by_id(document, "kbDiv")?,
        superseded_by: supersedence_by_id(document, "supersededbyInfo")?,
        supersedes: supersedence_by_id(document, "supersedesInfo")?,
    })
}

/// Binary URLs offered by the download dialog, in page order without repeats.
pub fn parse_download_links(body: &str) -> Vec<String> {
    let mut seen = HashSet::new();
    DOWNLOAD_LINK_RE
        .find_iter(body)
        .map(|found| found.as_str().to_string())
        .filter(|link| seen.insert(link.clone()))
        .collect()
}
