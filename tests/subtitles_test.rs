//! Subtitle Normalizer Tests
//!
//! SRT, WebVTT and XML inputs all end up as the same cue sequence.
//! Downloads go through a mocked HTTP server.

use aniflix_player::models::{Cue, SubFormat};
use aniflix_player::stream::subtitles::{self, SubtitleError};
use aniflix_player::stream::SubtitleClient;
use aniflix_player::PlayerError;
use mockito::Server;

// =============================================================================
// SRT
// =============================================================================

#[test]
fn test_srt_single_cue() {
    let cues =
        subtitles::parse("1\n00:00:01,000 --> 00:00:02,500\nHello\n\n", SubFormat::Srt).unwrap();
    assert_eq!(cues, vec![Cue::new(1.0, 2.5, "Hello")]);
}

#[test]
fn test_srt_dot_separator_is_identical() {
    let comma = subtitles::parse("1\n00:00:01,000 --> 00:00:02,500\nHello", SubFormat::Srt).unwrap();
    let dot = subtitles::parse("1\n00:00:01.000 --> 00:00:02.500\nHello", SubFormat::Srt).unwrap();
    assert_eq!(comma, dot);
}

#[test]
fn test_srt_multiple_multiline_cues_in_order() {
    let srt = "\u{feff}1\r\n\
               00:00:01,000 --> 00:00:04,000\r\n\
               First line\r\n\
               Second line\r\n\
               \r\n\
               2\r\n\
               00:01:05,250 --> 00:01:07,000\r\n\
               Next\r\n";

    let cues = subtitles::parse(srt, SubFormat::Srt).unwrap();
    assert_eq!(cues.len(), 2);
    assert_eq!(cues[0].text, "First line\nSecond line");
    assert_eq!(cues[1].start, 65.25);
    assert_eq!(cues[1].end, 67.0);
    assert!(cues[0].start < cues[1].start);
}

#[test]
fn test_srt_number_in_text_stays_text() {
    let srt = "1\n00:00:01,000 --> 00:00:02,000\nThe answer is\n42\n\n2\n00:00:03,000 --> 00:00:04,000\nYes";
    let cues = subtitles::parse(srt, SubFormat::Srt).unwrap();
    assert_eq!(cues.len(), 2);
    assert_eq!(cues[0].text, "The answer is\n42");
}

#[test]
fn test_srt_malformed_timestamp_is_parse_error() {
    let err = subtitles::parse("1\n00:00:xx,000 --> 00:00:02,000\nHello", SubFormat::Srt).unwrap_err();
    assert!(matches!(err, SubtitleError::BadTimestamp { line: 2, .. }));

    let player: PlayerError = err.into();
    assert_eq!(player.class(), aniflix_player::ErrorClass::Parse);
}

#[test]
fn test_srt_index_without_timing() {
    let err = subtitles::parse("1\n\n2\n00:00:01,000 --> 00:00:02,000\nHi", SubFormat::Srt).unwrap_err();
    assert_eq!(err, SubtitleError::MissingTiming { line: 1 });
}

#[test]
fn test_empty_file_is_error() {
    assert_eq!(subtitles::parse("", SubFormat::Srt), Err(SubtitleError::Empty));
    assert_eq!(subtitles::parse("WEBVTT\n\n", SubFormat::Vtt), Err(SubtitleError::Empty));
}

// =============================================================================
// WebVTT
// =============================================================================

#[test]
fn test_vtt_header_and_settings() {
    let vtt = "WEBVTT - episode 12\n\
               Kind: captions\n\
               \n\
               NOTE translated by fans\n\
               \n\
               intro\n\
               00:01.000 --> 00:02.500 align:start position:10%\n\
               Hello\n\
               \n\
               00:00:03.000 --> 00:00:04.000\n\
               <i>World</i>\n";

    let cues = subtitles::parse(vtt, SubFormat::Vtt).unwrap();
    assert_eq!(cues.len(), 2);
    assert_eq!(cues[0], Cue::new(1.0, 2.5, "Hello"));
    assert_eq!(cues[1].start, 3.0);
}

#[test]
fn test_vtt_matches_srt() {
    let srt = subtitles::parse("1\n00:00:01,000 --> 00:00:02,500\nHello", SubFormat::Srt).unwrap();
    let vtt = subtitles::parse("WEBVTT\n\n1\n00:00:01.000 --> 00:00:02.500\nHello", SubFormat::Vtt)
        .unwrap();
    assert_eq!(srt, vtt);
}

#[test]
fn test_vtt_error_line_counts_header() {
    let err = subtitles::parse("WEBVTT\n\n00:00:01.000 --> nope\nHi", SubFormat::Vtt).unwrap_err();
    assert_eq!(
        err,
        SubtitleError::BadTimestamp {
            line: 3,
            value: "nope".to_string()
        }
    );
}

// =============================================================================
// XML
// =============================================================================

#[test]
fn test_xml_elements() {
    let xml = r#"<?xml version="1.0" encoding="UTF-8"?>
<subtitles>
  <subtitle start="1.0" end="2.5">Hello</subtitle>
  <subtitle start='3' end='4.25'>Tom &amp; Jerry<br/>again</subtitle>
</subtitles>"#;

    let cues = subtitles::parse(xml, SubFormat::Xml).unwrap();
    assert_eq!(cues.len(), 2);
    assert_eq!(cues[0], Cue::new(1.0, 2.5, "Hello"));
    assert_eq!(cues[1].text, "Tom & Jerry\nagain");
    assert_eq!(cues[1].end, 4.25);
}

#[test]
fn test_xml_missing_times_default_to_zero() {
    let cues = subtitles::parse("<subtitle>Untimed</subtitle>", SubFormat::Xml).unwrap();
    assert_eq!(cues, vec![Cue::new(0.0, 0.0, "Untimed")]);
}

#[test]
fn test_xml_ttml_paragraphs() {
    let xml = r#"<tt><body><div>
        <p begin="00:00:01.000" end="00:00:02.000"><span>Styled</span> text</p>
        <p begin="5s" end="6s"><![CDATA[Raw <b>cdata</b>]]></p>
    </div></body></tt>"#;

    let cues = subtitles::parse(xml, SubFormat::Xml).unwrap();
    assert_eq!(cues.len(), 2);
    assert_eq!(cues[0], Cue::new(1.0, 2.0, "Styled text"));
    assert_eq!(cues[1].start, 5.0);
    assert_eq!(cues[1].text, "Raw <b>cdata</b>");
}

#[test]
fn test_xml_without_elements_is_empty() {
    assert_eq!(
        subtitles::parse("<subtitles></subtitles>", SubFormat::Xml),
        Err(SubtitleError::Empty)
    );
}

// =============================================================================
// Download
// =============================================================================

#[tokio::test]
async fn test_download_relative_url() {
    let mut server = Server::new_async().await;

    let mock = server
        .mock("GET", "/subs/12/en.srt")
        .with_status(200)
        .with_body("1\n00:00:01,000 --> 00:00:02,500\nHello\n")
        .create_async()
        .await;

    let client = SubtitleClient::with_base_url(server.url());
    let text = client.download("/subs/12/en.srt").await.unwrap();

    mock.assert_async().await;

    let cues = subtitles::parse(&text, SubFormat::from_path("/subs/12/en.srt")).unwrap();
    assert_eq!(cues, vec![Cue::new(1.0, 2.5, "Hello")]);
}

#[tokio::test]
async fn test_download_http_error_is_transport() {
    let mut server = Server::new_async().await;

    let _mock = server
        .mock("GET", "/subs/missing.vtt")
        .with_status(404)
        .create_async()
        .await;

    let client = SubtitleClient::with_base_url(server.url());
    let err = client.download("subs/missing.vtt").await.unwrap_err();
    assert!(matches!(err, PlayerError::Transport(_)));
}

#[tokio::test]
async fn test_absolute_url_ignores_base() {
    let mut server = Server::new_async().await;

    let mock = server
        .mock("GET", "/cdn/en.vtt")
        .with_status(200)
        .with_body("WEBVTT\n\n00:01.000 --> 00:02.000\nHi")
        .create_async()
        .await;

    let client = SubtitleClient::with_base_url("http://unused.invalid");
    let url = format!("{}/cdn/en.vtt", server.url());
    let text = client.download(&url).await.unwrap();

    mock.assert_async().await;
    assert!(text.starts_with("WEBVTT"));
}
