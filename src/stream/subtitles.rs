//! Subtitle normalization
//!
//! Turns SRT, WebVTT and XML subtitle text into one [`Cue`] sequence, and
//! fetches subtitle files over HTTP through [`SubtitleClient`].
//!
//! SRT and WebVTT share a line scanner: WebVTT only adds a `WEBVTT` header
//! block and allows a dot as fractional separator, which SRT writes as a
//! comma. Both separators produce identical seconds.

use async_trait::async_trait;
use regex::Regex;
use std::sync::OnceLock;
use thiserror::Error;

use crate::api::backend::SubtitleFetcher;
use crate::error::PlayerError;
use crate::models::{Cue, SubFormat};

/// Errors from subtitle parsing
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SubtitleError {
    #[error("Malformed timestamp '{value}' on line {line}")]
    BadTimestamp { line: usize, value: String },

    #[error("Cue on line {line} has no timing line")]
    MissingTiming { line: usize },

    #[error("Subtitle file contains no cues")]
    Empty,
}

/// Parse subtitle text of the given format into cues
pub fn parse(content: &str, format: SubFormat) -> Result<Vec<Cue>, SubtitleError> {
    let cues = match format {
        SubFormat::Srt => parse_srt(content)?,
        SubFormat::Vtt => parse_vtt(content)?,
        SubFormat::Xml => parse_xml(content),
    };

    if cues.is_empty() {
        return Err(SubtitleError::Empty);
    }
    Ok(cues)
}

/// Parse SRT content
pub fn parse_srt(content: &str) -> Result<Vec<Cue>, SubtitleError> {
    scan_cues(content.strip_prefix('\u{feff}').unwrap_or(content), 0)
}

/// Parse WebVTT content
///
/// The `WEBVTT` signature line and any header block up to the first blank
/// line are skipped, then the SRT scanner runs on the rest.
pub fn parse_vtt(content: &str) -> Result<Vec<Cue>, SubtitleError> {
    let content = content.strip_prefix('\u{feff}').unwrap_or(content);
    let lines: Vec<&str> = content.lines().collect();

    let skip = match lines.first() {
        Some(first) if first.trim_start().starts_with("WEBVTT") => lines
            .iter()
            .position(|l| l.trim().is_empty())
            .unwrap_or(lines.len()),
        _ => 0,
    };

    let body = lines[skip..].join("\n");
    scan_cues(&body, skip)
}

#[derive(Debug, PartialEq)]
enum ScanState {
    /// Between cues
    Idle,
    /// Saw an index line, timing must follow
    Timing { index_line: usize },
    /// Collecting text lines
    Text,
}

/// Line scanner shared by SRT and WebVTT
///
/// `line_offset` is added to reported line numbers.
fn scan_cues(content: &str, line_offset: usize) -> Result<Vec<Cue>, SubtitleError> {
    let mut cues = Vec::new();
    let mut state = ScanState::Idle;
    let mut start = 0.0;
    let mut end = 0.0;
    let mut text: Vec<&str> = Vec::new();

    for (idx, raw) in content.lines().enumerate() {
        let line_no = idx + 1 + line_offset;
        let line = raw.trim_end_matches('\r');
        let trimmed = line.trim();

        match state {
            ScanState::Idle => {
                if trimmed.is_empty() {
                    continue;
                }
                if trimmed.contains("-->") {
                    // WebVTT cue without index
                    (start, end) = parse_timing(trimmed, line_no)?;
                    state = ScanState::Text;
                } else if is_index_line(trimmed) {
                    state = ScanState::Timing { index_line: line_no };
                }
                // Anything else outside a cue (NOTE/STYLE blocks, cue ids) is skipped
            }
            ScanState::Timing { index_line } => {
                if trimmed.contains("-->") {
                    (start, end) = parse_timing(trimmed, line_no)?;
                    state = ScanState::Text;
                } else if trimmed.is_empty() {
                    return Err(SubtitleError::MissingTiming { line: index_line });
                }
                // WebVTT allows an identifier line after the number; skip it
            }
            ScanState::Text => {
                if trimmed.is_empty() {
                    cues.push(Cue::new(start, end, text.join("\n")));
                    text.clear();
                    state = ScanState::Idle;
                } else {
                    text.push(line.trim());
                }
            }
        }
    }

    match state {
        ScanState::Text => cues.push(Cue::new(start, end, text.join("\n"))),
        ScanState::Timing { index_line } => {
            return Err(SubtitleError::MissingTiming { line: index_line })
        }
        ScanState::Idle => {}
    }

    Ok(cues)
}

fn is_index_line(line: &str) -> bool {
    !line.is_empty() && line.chars().all(|c| c.is_ascii_digit())
}

/// Split `start --> end [settings]` into seconds
fn parse_timing(line: &str, line_no: usize) -> Result<(f64, f64), SubtitleError> {
    let (left, right) = line
        .split_once("-->")
        .ok_or(SubtitleError::MissingTiming { line: line_no })?;

    let left = left.trim();
    // WebVTT cue settings follow the end timestamp
    let right = right.split_whitespace().next().unwrap_or("");

    let bad = |value: &str| SubtitleError::BadTimestamp {
        line: line_no,
        value: value.to_string(),
    };

    let start = parse_timestamp(left).ok_or_else(|| bad(left))?;
    let end = parse_timestamp(right).ok_or_else(|| bad(right))?;
    Ok((start, end))
}

fn timestamp_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^(?:(\d+):)?(\d{1,2}):(\d{1,2})(?:[.,](\d{1,9}))?$")
            .expect("timestamp regex is valid")
    })
}

/// Parse `HH:MM:SS,mmm`, `HH:MM:SS.mmm` or `MM:SS.mmm` into seconds
///
/// Comma and dot are equivalent fractional separators.
pub fn parse_timestamp(s: &str) -> Option<f64> {
    let caps = timestamp_regex().captures(s.trim())?;

    let hours: f64 = caps
        .get(1)
        .map(|m| m.as_str().parse().ok())
        .unwrap_or(Some(0.0))?;
    let minutes: f64 = caps.get(2)?.as_str().parse().ok()?;
    let seconds: f64 = caps.get(3)?.as_str().parse().ok()?;
    let fraction: f64 = match caps.get(4) {
        Some(m) => format!("0.{}", m.as_str()).parse().ok()?,
        None => 0.0,
    };

    Some(hours * 3600.0 + minutes * 60.0 + seconds + fraction)
}

fn xml_element_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?s)<(subtitle|p|text)\b([^>]*?)(?:/>|>(.*?)</(?:subtitle|p|text)\s*>)")
            .expect("xml element regex is valid")
    })
}

fn xml_attr_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r#"([A-Za-z_:][-\w:.]*)\s*=\s*(?:"([^"]*)"|'([^']*)')"#)
            .expect("xml attribute regex is valid")
    })
}

fn xml_tag_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"<br\s*/?>|<[^>]+>").expect("xml tag regex is valid"))
}

/// Parse XML subtitle content
///
/// Every `<subtitle>`, `<p>` or `<text>` element becomes one cue. `start`
/// and `end` attributes are seconds; missing or unreadable values default
/// to zero. XML sources are best effort, so this never fails.
pub fn parse_xml(content: &str) -> Vec<Cue> {
    xml_element_regex()
        .captures_iter(content)
        .map(|caps| {
            let attrs = caps.get(2).map(|m| m.as_str()).unwrap_or("");
            let body = caps.get(3).map(|m| m.as_str()).unwrap_or("");

            let mut start = 0.0;
            let mut end = 0.0;
            for attr in xml_attr_regex().captures_iter(attrs) {
                let value = attr
                    .get(2)
                    .or_else(|| attr.get(3))
                    .map(|m| m.as_str())
                    .unwrap_or("");
                match &attr[1] {
                    "start" | "begin" => start = parse_xml_seconds(value),
                    "end" => end = parse_xml_seconds(value),
                    _ => {}
                }
            }

            Cue::new(start, end, xml_text(body))
        })
        .collect()
}

fn parse_xml_seconds(value: &str) -> f64 {
    let value = value.trim();
    value
        .trim_end_matches('s')
        .parse::<f64>()
        .ok()
        .or_else(|| parse_timestamp(value))
        .filter(|v| v.is_finite() && *v >= 0.0)
        .unwrap_or(0.0)
}

/// Strip markup, turn `<br/>` into newlines and decode entities
fn xml_text(body: &str) -> String {
    let body = body.trim();
    let body = body
        .strip_prefix("<![CDATA[")
        .and_then(|b| b.strip_suffix("]]>"))
        .map(str::to_string)
        .unwrap_or_else(|| {
            xml_tag_regex()
                .replace_all(body, |caps: &regex::Captures| {
                    if caps[0].starts_with("<br") {
                        "\n"
                    } else {
                        ""
                    }
                })
                .into_owned()
        });

    decode_entities(&body)
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}

fn decode_entities(s: &str) -> String {
    s.replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&apos;", "'")
        .replace("&#39;", "'")
        .replace("&amp;", "&")
}

// =============================================================================
// Subtitle Client
// =============================================================================

/// HTTP client for subtitle files
///
/// Relative subtitle URLs are resolved against the backend base URL.
pub struct SubtitleClient {
    base_url: String,
    client: reqwest::Client,
}

impl SubtitleClient {
    /// Create a client resolving relative URLs against `base_url`
    pub fn with_base_url(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            client: reqwest::Client::new(),
        }
    }

    /// Absolute URL for a subtitle location
    pub fn resolve(&self, url: &str) -> String {
        if url.starts_with("http://") || url.starts_with("https://") {
            url.to_string()
        } else {
            format!("{}/{}", self.base_url, url.trim_start_matches('/'))
        }
    }

    /// Download subtitle text
    pub async fn download(&self, url: &str) -> Result<String, PlayerError> {
        let url = self.resolve(url);
        tracing::debug!(%url, "fetching subtitles");

        let response = self.client.get(&url).send().await?;
        if !response.status().is_success() {
            return Err(PlayerError::Transport(format!(
                "subtitle download returned HTTP {}",
                response.status()
            )));
        }

        Ok(response.text().await?)
    }
}

#[async_trait]
impl SubtitleFetcher for SubtitleClient {
    async fn fetch(&self, url: &str) -> Result<String, PlayerError> {
        self.download(url).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_timestamp_comma_and_dot_agree() {
        assert_eq!(parse_timestamp("00:00:02,500"), Some(2.5));
        assert_eq!(parse_timestamp("00:00:02.500"), Some(2.5));
        assert_eq!(parse_timestamp("01:02:03,004"), Some(3723.004));
    }

    #[test]
    fn test_timestamp_short_forms() {
        assert_eq!(parse_timestamp("02:03.250"), Some(123.25));
        assert_eq!(parse_timestamp("00:00:07"), Some(7.0));
        assert_eq!(parse_timestamp("00:00:01,5"), Some(1.5));
    }

    #[test]
    fn test_timestamp_rejects_garbage() {
        assert_eq!(parse_timestamp("abc"), None);
        assert_eq!(parse_timestamp("1.5"), None);
        assert_eq!(parse_timestamp(""), None);
    }

    #[test]
    fn test_index_line() {
        assert!(is_index_line("12"));
        assert!(!is_index_line("12a"));
        assert!(!is_index_line(""));
    }

    #[test]
    fn test_timing_with_vtt_settings() {
        let (start, end) = parse_timing("00:01.000 --> 00:02.000 align:start line:90%", 1).unwrap();
        assert_eq!((start, end), (1.0, 2.0));
    }

    #[test]
    fn test_integer_inside_text_is_text() {
        let srt = "1\n00:00:01,000 --> 00:00:02,000\nCount:\n42\n\n";
        let cues = parse_srt(srt).unwrap();
        assert_eq!(cues.len(), 1);
        assert_eq!(cues[0].text, "Count:\n42");
    }

    #[test]
    fn test_xml_text_cleanup() {
        assert_eq!(xml_text("Tom &amp; Jerry<br/>again"), "Tom & Jerry\nagain");
        assert_eq!(xml_text("<![CDATA[<i>raw</i>]]>"), "<i>raw</i>");
        assert_eq!(xml_text("<font color=\"red\">Hi</font>"), "Hi");
    }

    #[test]
    fn test_resolve_relative_urls() {
        let client = SubtitleClient::with_base_url("http://localhost:5000/");
        assert_eq!(
            client.resolve("/static/subs/1.srt"),
            "http://localhost:5000/static/subs/1.srt"
        );
        assert_eq!(client.resolve("https://cdn/x.vtt"), "https://cdn/x.vtt");
    }
}
