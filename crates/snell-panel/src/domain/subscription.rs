//! Subscription document rendering.
//!
//! One Surge proxy line per entry:
//!
//! ```text
//! 🇯🇵 Tokyo = snell, jp.example.com, 443, psk = secret, version = 4
//! ```

use super::entry::Entry;

const REGIONAL_INDICATOR_A: u32 = 0x1F1E6;

/// Turn a two-letter country code into its flag emoji. Anything that is not
/// exactly two ASCII letters comes back unchanged.
pub fn country_flag(code: &str) -> String {
    let bytes = code.as_bytes();
    if bytes.len() != 2 || !bytes.iter().all(u8::is_ascii_alphabetic) {
        return code.to_string();
    }

    bytes
        .iter()
        .filter_map(|b| char::from_u32(REGIONAL_INDICATOR_A + u32::from(b.to_ascii_uppercase() - b'A')))
        .collect()
}

/// Label shown in the client: the flag plus either the operator-chosen name
/// or a generated one built from the geo metadata and node id.
pub fn display_name(entry: &Entry) -> String {
    let flag = country_flag(&entry.country_code);
    match entry.node_name.as_deref() {
        Some(name) if !name.is_empty() => format!("{flag} {name}"),
        _ => format!(
            "{flag} {} AS{} {} {}",
            entry.country_code, entry.asn, entry.isp, entry.node_id
        ),
    }
}

pub fn render_line(entry: &Entry) -> String {
    format!(
        "{} = snell, {}, {}, psk = {}, version = {}",
        display_name(entry),
        entry.ip,
        entry.port,
        entry.psk,
        entry.version
    )
}

/// Render all entries, newline separated, in the order given. `None` when
/// there is nothing to render.
pub fn render_document(entries: &[Entry]) -> Option<String> {
    if entries.is_empty() {
        return None;
    }
    Some(entries.iter().map(render_line).collect::<Vec<_>>().join("\n"))
}
