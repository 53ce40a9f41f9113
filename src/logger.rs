/*============================================================
  Synavera Project: Syn-Cat
  Module: syncat_core::logger
  Etiquette: Synavera Script Etiquette — Rust Profile v1.1.1
  ------------------------------------------------------------
  Purpose:
    Render tracing events as append-only Synavera log lines
    and seal each session log with a SHA-256 digest.

  Security / Safety Notes:
    Only event messages and codes are written; catalog
    postback tokens never reach the log.

  Dependencies:
    tracing + tracing-subscriber for event capture, chrono for
    timestamps, sha2 for integrity hashing.

  Operational Scope:
    Installed by the syncat binary; library code only emits
    tracing events with a `code` field.

  Revision History:
    2025-11-12 COD  Established Synavera session log.
    2025-12-02 COD  Rebuilt as a tracing layer.
  ------------------------------------------------------------
  SSE Principles Observed:
    - Append-only logging with UTC timestamps
    - Deterministic formatting for auditability
    - Graceful error propagation on I/O failures
============================================================*/

use std::fmt;
use std::fs::{File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use chrono::{SecondsFormat, Utc};
use sha2::{Digest, Sha256};
use tracing::field::{Field, Visit};
use tracing::{Event, Level, Subscriber};
use tracing_subscriber::layer::{Context, Layer};

use crate::error::{CatalogError, Result};

const DEFAULT_CODE: &str = "CORE";

type SharedWriter = Arc<Mutex<BufWriter<File>>>;

/// Session log backing file plus stderr verbosity.
pub struct SessionLog {
    file: Option<SharedWriter>,
    path: Option<PathBuf>,
    verbose: bool,
}

impl SessionLog {
    /// Open (or create) the log at `path`; `None` logs to stderr only.
    pub fn new(path: Option<PathBuf>, verbose: bool) -> Result<Self> {
        let file = match path {
            Some(ref file_path) => {
                if let Some(parent) = file_path.parent() {
                    std::fs::create_dir_all(parent).map_err(|err| {
                        CatalogError::Filesystem(format!(
                            "Failed to create log directory {}: {err}",
                            parent.display()
                        ))
                    })?;
                }
                let file = OpenOptions::new()
                    .create(true)
                    .append(true)
                    .open(file_path)
                    .map_err(|err| {
                        CatalogError::Filesystem(format!(
                            "Failed to open log file {}: {err}",
                            file_path.display()
                        ))
                    })?;
                Some(Arc::new(Mutex::new(BufWriter::new(file))))
            }
            None => None,
        };

        Ok(Self {
            file,
            path,
            verbose,
        })
    }

    /// Layer that writes into this session log.
    pub fn layer(&self) -> SessionLogLayer {
        SessionLogLayer {
            file: self.file.clone(),
            verbose: self.verbose,
        }
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Compute and persist SHA-256 digest of the log file.
    pub fn finalize(&self) -> Result<()> {
        let Some(path) = self.path() else {
            return Ok(());
        };
        if let Some(file) = &self.file {
            if let Ok(mut guard) = file.lock() {
                guard.flush()?;
            }
        }

        let data = std::fs::read(path).map_err(|err| {
            CatalogError::Filesystem(format!(
                "Failed to read log for hashing {}: {err}",
                path.display()
            ))
        })?;
        let digest = Sha256::digest(&data);
        let mut hash_os = path.as_os_str().to_os_string();
        hash_os.push(".hash");
        let hash_path = PathBuf::from(hash_os);
        let mut file = File::create(&hash_path).map_err(|err| {
            CatalogError::Filesystem(format!(
                "Failed to create hash file {}: {err}",
                hash_path.display()
            ))
        })?;
        writeln!(
            file,
            "{:x}  {}",
            digest,
            path.file_name().unwrap_or_default().to_string_lossy()
        )
        .map_err(|err| {
            CatalogError::Filesystem(format!(
                "Failed to write hash file {}: {err}",
                hash_path.display()
            ))
        })?;
        Ok(())
    }
}

/// `tracing` layer emitting `{timestamp} [LEVEL] [CODE] message` lines.
pub struct SessionLogLayer {
    file: Option<SharedWriter>,
    verbose: bool,
}

impl<S: Subscriber> Layer<S> for SessionLogLayer {
    fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
        let mut visitor = LineVisitor::default();
        event.record(&mut visitor);

        let level = *event.metadata().level();
        let timestamp = Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true);
        let payload = format_line(&timestamp, level, visitor.code(), &visitor.message());

        if self.verbose || level <= Level::WARN {
            eprintln!("{payload}");
        }

        if let Some(file) = &self.file {
            if let Ok(mut guard) = file.lock() {
                if writeln!(guard, "{payload}").is_err() || guard.flush().is_err() {
                    eprintln!("{timestamp} [ERROR] [LOGGER] Failed to write to log file");
                }
            }
        }
    }
}

fn format_line(timestamp: &str, level: Level, code: &str, message: &str) -> String {
    format!("{timestamp} [{}] [{code}] {message}", level.as_str())
}

#[derive(Default)]
struct LineVisitor {
    code: Option<String>,
    message: String,
    extras: Vec<String>,
}

impl LineVisitor {
    fn code(&self) -> &str {
        self.code.as_deref().unwrap_or(DEFAULT_CODE)
    }

    fn message(&self) -> String {
        if self.extras.is_empty() {
            self.message.clone()
        } else {
            format!("{} {}", self.message, self.extras.join(" "))
        }
    }
}

impl Visit for LineVisitor {
    fn record_str(&mut self, field: &Field, value: &str) {
        match field.name() {
            "code" => self.code = Some(value.to_string()),
            "message" => self.message = value.to_string(),
            name => self.extras.push(format!("{name}={value}")),
        }
    }

    fn record_debug(&mut self, field: &Field, value: &dyn fmt::Debug) {
        match field.name() {
            "code" => self.code = Some(format!("{value:?}").trim_matches('"').to_string()),
            "message" => self.message = format!("{value:?}"),
            name => self.extras.push(format!("{name}={value:?}")),
        }
    }
}
