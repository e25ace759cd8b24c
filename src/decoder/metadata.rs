//! Parses the JSON emitted by a metadata probe invocation.

use std::collections::HashMap;
use std::path::Path;
use std::process::Command;

use serde::Deserialize;

use crate::error::{PlayerError, Result};

#[derive(Debug, Clone, Default)]
pub struct Metadata {
    pub title: String,
    pub artist: String,
    pub album: String,
    /// Duration in seconds; `None` if the probe didn't report one.
    pub duration_secs: Option<f64>,
}

#[derive(Deserialize)]
struct ProbeOutput {
    #[serde(default)]
    format: ProbeFormat,
    #[serde(default)]
    streams: Vec<ProbeStream>,
}

#[derive(Deserialize, Default)]
struct ProbeFormat {
    #[serde(default)]
    duration: Option<String>,
    #[serde(default)]
    tags: HashMap<String, String>,
}

#[derive(Deserialize, Default)]
struct ProbeStream {
    #[serde(default)]
    tags: HashMap<String, String>,
}

/// Invokes the probe binary on `path` and parses its JSON output.
/// `format` tags take precedence; missing tags become empty strings.
pub fn probe(path: &Path, probe_bin: &str) -> Result<Metadata> {
    let output = Command::new(probe_bin)
        .arg("-v")
        .arg("quiet")
        .arg("-print_format")
        .arg("json")
        .arg("-show_entries")
        .arg("format_tags:stream_tags")
        .arg("-show_format")
        .arg(path)
        .output()
        .map_err(|err| PlayerError::MetadataUnavailable {
            path: path.to_path_buf(),
            reason: err.to_string(),
        })?;

    if !output.status.success() {
        return Err(PlayerError::MetadataUnavailable {
            path: path.to_path_buf(),
            reason: format!("probe exited with {}", output.status),
        });
    }

    let parsed: ProbeOutput = serde_json::from_slice(&output.stdout).map_err(|err| {
        PlayerError::MetadataUnavailable {
            path: path.to_path_buf(),
            reason: err.to_string(),
        }
    })?;

    let mut merged: HashMap<String, String> = HashMap::new();
    for stream in &parsed.streams {
        for (k, v) in &stream.tags {
            merged.insert(k.to_lowercase(), v.clone());
        }
    }
    for (k, v) in &parsed.format.tags {
        merged.insert(k.to_lowercase(), v.clone());
    }

    let duration_secs = parsed
        .format
        .duration
        .as_deref()
        .and_then(|s| s.parse::<f64>().ok());

    Ok(Metadata {
        title: merged.get("title").cloned().unwrap_or_default(),
        artist: merged.get("artist").cloned().unwrap_or_default(),
        album: merged.get("album").cloned().unwrap_or_default(),
        duration_secs,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn format_tags_take_precedence_over_stream_tags() {
        let json = r#"{
            "format": {"duration": "123.4", "tags": {"Title": "Format Title"}},
            "streams": [{"tags": {"title": "Stream Title"}}]
        }"#;
        let parsed: ProbeOutput = serde_json::from_str(json).unwrap();
        let mut merged: HashMap<String, String> = HashMap::new();
        for stream in &parsed.streams {
            for (k, v) in &stream.tags {
                merged.insert(k.to_lowercase(), v.clone());
            }
        }
        for (k, v) in &parsed.format.tags {
            merged.insert(k.to_lowercase(), v.clone());
        }
        assert_eq!(merged.get("title").unwrap(), "Format Title");
        assert_eq!(parsed.format.duration.as_deref(), Some("123.4"));
    }

    #[test]
    fn missing_tags_default_to_empty() {
        let json = r#"{"format": {}, "streams": []}"#;
        let parsed: ProbeOutput = serde_json::from_str(json).unwrap();
        assert!(parsed.format.tags.is_empty());
        assert!(parsed.format.duration.is_none());
    }
}
