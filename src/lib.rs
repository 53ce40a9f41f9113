/*============================================================
  Synavera Project: Syn-Cat
  Module: syncat_core
  Etiquette: Synavera Script Etiquette — Rust Profile v1.1.1
  ------------------------------------------------------------
  Purpose:
    Client library for the Microsoft Update Catalog: search,
    postback pagination and sorting, and typed update details.

  Security / Safety Notes:
    Read-only HTTPS access to a public catalog.

  Dependencies:
    See individual modules.

  Operational Scope:
    Linked by the syncat binary and embedding applications.

  Revision History:
    2025-11-12 COD  Split library surface out of the binary.
  ------------------------------------------------------------
  SSE Principles Observed:
    - Narrow public surface re-exported from one place
============================================================*/

pub mod config;
pub mod details;
pub mod error;
pub mod extract;
pub mod logger;
pub mod postback;
pub mod report;
pub mod results;
pub mod session;
pub mod transport;
pub mod update_info;

pub use config::{CatalogConfig, SyncatConfig};
pub use error::{CatalogError, MarkupError, Result};
pub use postback::{PageState, SortBy, SortDirection};
pub use results::ResultsPage;
pub use session::{CatalogClient, SearchOptions};
pub use transport::{HttpReply, ReqwestTransport, Transport};
pub use update_info::{
    AdditionalProperties, DriverProperties, SearchResult, UpdateDetail, UpdateExtension,
};
