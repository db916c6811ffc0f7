use serde::Deserialize;
use url::Url;

use crate::{FileInfo, ReferenceLink};

/// `/api/get_links` entries arrive either as bare URLs or as full link objects.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub(crate) enum RawLink {
    Url(String),
    Link(ReferenceLink),
}

/// `/api/files` entries arrive either as bare filenames or as file records.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub(crate) enum RawFileEntry {
    Name(String),
    Info(FileInfo),
}

pub(crate) fn normalize_links(raw: Vec<RawLink>) -> Vec<ReferenceLink> {
    raw.into_iter()
        .map(|link| match link {
            RawLink::Url(url) => ReferenceLink {
                title: title_from_url(&url),
                url,
                description: None,
            },
            RawLink::Link(link) => link,
        })
        .collect()
}

pub(crate) fn normalize_files(raw: Vec<RawFileEntry>) -> Vec<FileInfo> {
    raw.into_iter()
        .map(|entry| match entry {
            RawFileEntry::Name(name) => FileInfo::from_name(name),
            RawFileEntry::Info(info) => info,
        })
        .collect()
}

/// Human-readable title for a bare reference URL.
///
/// Uses the last path segment with `-`/`_` turned into spaces and the extension
/// dropped, falls back to the host without `www.`, and to the raw input when it
/// does not parse as a URL.
pub fn title_from_url(raw: &str) -> String {
    let Ok(url) = Url::parse(raw) else {
        return raw.to_string();
    };

    let last_segment = url
        .path_segments()
        .and_then(|segments| segments.last())
        .unwrap_or("");

    if !last_segment.is_empty() {
        let spaced = last_segment.replace(['-', '_'], " ");
        return strip_extension(&spaced).to_string();
    }

    url.host_str()
        .map(|host| host.replacen("www.", "", 1))
        .unwrap_or_else(|| raw.to_string())
}

fn strip_extension(segment: &str) -> &str {
    match segment.rfind('.') {
        Some(idx) if idx > 0 && idx + 1 < segment.len() => &segment[..idx],
        _ => segment,
    }
}
