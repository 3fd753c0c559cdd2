use mail_parser::MessageParser;
use tracing::debug;

/// How far into the file to look for a multipart boundary declaration
const SNIFF_BYTES: usize = 4096;

/// Heuristic MHTML check on the raw file contents
pub fn is_mhtml(content: &[u8]) -> bool {
    let head = String::from_utf8_lossy(&content[..content.len().min(SNIFF_BYTES)]);
    let first_line = head.lines().next().unwrap_or("");

    let header_marker = ["From:", "MIME-Version:", "Content-Type: multipart"]
        .iter()
        .any(|marker| first_line.contains(marker));
    let boundary_marker = head.contains("multipart/related") && head.contains("boundary=");

    header_marker || boundary_marker
}

/// Extract the decoded `text/html` part of an MHTML archive
pub fn extract_html(content: &[u8]) -> Option<String> {
    let message = MessageParser::default().parse(content)?;
    let html = message.body_html(0)?;
    debug!("Extracted {} bytes of HTML from MHTML archive", html.len());
    Some(html.into_owned())
}
