//! # pasp-scan
//!
//! Single-pass translator from `.pasp` templates into document-builder
//! scripts.
//!
//! Literal text becomes `XMLServDoc.Write`/`WriteLine` calls, `<% %>`,
//! `<%= %>` and `<%@ %>` directives are copied into the script, and server
//! `<SCRIPT>`/`<OBJECT>` blocks are passed through outside the code region.
//! Output goes through a [`Writer`] so callers choose where it lands.
//!
//! ```
//! let mut out = Vec::new();
//! pasp_scan::translate(b"Hello\r\n", &mut out).unwrap();
//! assert!(out.windows(27).any(|w| w == b"XMLServDoc.WriteLine \"Hello"));
//! ```

mod cursor;
pub mod matching;
pub mod profile;
pub mod quote;
mod scanner;
pub mod writer;

use std::fmt;

use pasp_config::log_scan_debug;
use tracing::instrument;

pub use profile::LanguageProfile;
pub use scanner::{Mode, Scanner};
pub use writer::{StreamWriter, WriteError, Writer};

/// Construct left open at the end of the input.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Construct {
    Directive,
    ScriptBlock,
    ObjectBlock,
}

impl fmt::Display for Construct {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Construct::Directive => "directive",
            Construct::ScriptBlock => "server SCRIPT block",
            Construct::ObjectBlock => "server OBJECT block",
        })
    }
}

/// Translation errors
#[derive(Debug, Clone, thiserror::Error)]
pub enum ScanError {
    #[error("unterminated {construct} starting at line {line} (byte {offset})")]
    Syntax {
        construct: Construct,
        offset: usize,
        line: usize,
    },

    #[error("unsupported script language: {name}")]
    UnsupportedLanguage { name: String },

    #[error(transparent)]
    Write(#[from] WriteError),
}

pub type Result<T> = std::result::Result<T, ScanError>;

/// What a successful translation produced.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ScanSummary {
    pub profile: LanguageProfile,
    /// `Write`/`WriteLine` calls emitted for literal text.
    pub text_writes: usize,
    pub directives: usize,
    /// Server `<SCRIPT>` and `<OBJECT>` blocks.
    pub code_blocks: usize,
    /// Response-object calls redirected to the document builder.
    pub rewrites: usize,
}

/// Translate `source` into `writer`.
///
/// An empty source produces no output at all. On error, whatever was written
/// so far is incomplete and must be discarded.
#[instrument(skip(source, writer), fields(len = source.len()), level = "debug")]
pub fn translate<W: Writer>(source: &[u8], writer: W) -> Result<ScanSummary> {
    if source.is_empty() {
        return Ok(ScanSummary::default());
    }

    let profile = LanguageProfile::detect(source)?;
    let summary = Scanner::new(source, profile, writer).run()?;

    log_scan_debug!(
        "Translated",
        language = summary.profile.name(),
        text_writes = summary.text_writes,
        directives = summary.directives,
        code_blocks = summary.code_blocks,
    );
    Ok(summary)
}

/// Translate `source` into a new buffer.
pub fn translate_to_vec(source: &[u8]) -> Result<Vec<u8>> {
    let mut out = Vec::new();
    out.try_reserve(source.len() * 2 + profile::PROLOGUE.len())
        .map_err(|_| WriteError::OutOfMemory)?;
    translate(source, &mut out)?;
    Ok(out)
}
