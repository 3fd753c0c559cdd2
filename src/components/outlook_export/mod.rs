//! Reading saved Outlook web calendar pages (plain HTML or MHTML archives).

mod mhtml;
mod parser;

pub use mhtml::{extract_html, is_mhtml};
pub use parser::{parse_event_label, parse_events};

use crate::components::event::RawEventRecord;
use crate::error::{input_error, SyncResult};
use std::path::Path;
use tracing::info;

/// Read the export and return its HTML, unwrapping MHTML when detected
pub async fn read_export(path: &Path) -> SyncResult<String> {
    let content = tokio::fs::read(path)
        .await
        .map_err(|e| input_error(&format!("Cannot read '{}': {}", path.display(), e)))?;

    if is_mhtml(&content) {
        info!("Detected MHTML format, extracting HTML content");
        return extract_html(&content)
            .ok_or_else(|| input_error("MHTML archive has no text/html part"));
    }

    info!("Reading as HTML format");
    String::from_utf8(content).map_err(|e| input_error(&format!("Input is not valid UTF-8: {}", e)))
}

/// Read and scrape an export in one step
pub async fn load_records(path: &Path) -> SyncResult<Vec<RawEventRecord>> {
    info!("Reading calendar data from: {}", path.display());
    let html = read_export(path).await?;
    Ok(parse_events(&html))
}
