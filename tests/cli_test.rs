//! CLI Command Tests
//!
//! Argument parsing plus command handlers run against temp files and a
//! mocked backend. Covers exit codes for the common failure paths.

// =============================================================================
// CLI Argument Parsing Tests
// =============================================================================

mod cli_parsing {
    use aniflix_player::cli::{Cli, Command, SubFormatArg};
    use clap::Parser;

    #[test]
    fn test_subcommand_is_required() {
        assert!(Cli::try_parse_from(["aniflix-player"]).is_err());
    }

    #[test]
    fn test_subs_aliases() {
        let cli = Cli::parse_from(["aniflix-player", "sub", "ep.xml", "-f", "xml", "--at", "1:02"]);
        match cli.command {
            Command::Subs(cmd) => {
                assert_eq!(cmd.format, Some(SubFormatArg::Xml));
                assert_eq!(cmd.at_seconds(), Some(Ok(62.0)));
                assert!(!cmd.is_remote());
            }
            _ => panic!("Expected Subs command"),
        }
    }

    #[test]
    fn test_play_flags() {
        let cli = Cli::parse_from([
            "aniflix-player",
            "play",
            "ep.json",
            "--seconds",
            "12",
            "--tick-ms",
            "100",
            "--no-report",
            "--native-hls",
            "--ended",
        ]);
        match cli.command {
            Command::Play(cmd) => {
                assert_eq!(cmd.seconds, 12);
                assert_eq!(cmd.tick_ms, 100);
                assert!(cmd.no_report && cmd.native_hls && cmd.ended);
            }
            _ => panic!("Expected Play command"),
        }
    }

    #[test]
    fn test_extract_timeout() {
        let cli = Cli::parse_from(["aniflix-player", "x", "https://www.iqiyi.com/v_1.html", "-t", "5"]);
        match cli.command {
            Command::Extract(cmd) => assert_eq!(cmd.timeout, Some(5)),
            _ => panic!("Expected Extract command"),
        }
    }
}

// =============================================================================
// Command Handler Tests
// =============================================================================

mod handlers {
    use aniflix_player::cli::{ExitCode, ExtractCmd, Output, PlayCmd, SubsCmd};
    use aniflix_player::commands;
    use aniflix_player::config::Config;
    use mockito::Server;
    use serde_json::json;
    use std::path::PathBuf;

    fn output() -> Output {
        Output {
            json: true,
            quiet: true,
        }
    }

    fn config(backend_url: &str) -> Config {
        Config {
            backend_url: backend_url.to_string(),
            cleanup_delay_ms: 0,
            ..Config::default()
        }
    }

    fn temp_file(name: &str, content: &str) -> PathBuf {
        let path = std::env::temp_dir().join(format!("aniflix-{}-{}", uuid::Uuid::new_v4(), name));
        std::fs::write(&path, content).unwrap();
        path
    }

    fn play(episode: PathBuf, sources: Vec<usize>) -> PlayCmd {
        PlayCmd {
            episode,
            sources,
            subtitle: None,
            quality: None,
            seconds: 0,
            tick_ms: 250,
            duration: 1440.0,
            no_report: true,
            native_hls: false,
            ended: false,
        }
    }

    #[tokio::test]
    async fn test_subs_local_file() {
        let path = temp_file("ep.vtt", "WEBVTT\n\n00:01.000 --> 00:02.500\nHello\n");
        let cmd = SubsCmd {
            input: path.display().to_string(),
            format: None,
            at: None,
        };
        let code = commands::subs_cmd(cmd, &config("http://127.0.0.1:1"), &output()).await;
        assert_eq!(code, ExitCode::Success);
        let _ = std::fs::remove_file(path);
    }

    #[tokio::test]
    async fn test_subs_malformed_is_parse_error() {
        let path = temp_file("bad.srt", "1\n00:00:01,000 --> later\nHello\n");
        let cmd = SubsCmd {
            input: path.display().to_string(),
            format: None,
            at: None,
        };
        let code = commands::subs_cmd(cmd, &config("http://127.0.0.1:1"), &output()).await;
        assert_eq!(code, ExitCode::ParseError);
        let _ = std::fs::remove_file(path);
    }

    #[tokio::test]
    async fn test_extract_failure_exit_code() {
        let mut server = Server::new_async().await;
        let _mock = server
            .mock("POST", "/api/extract-iqiyi-m3u8")
            .with_status(400)
            .with_body(json!({ "success": false, "error": "bad url" }).to_string())
            .create_async()
            .await;

        let cmd = ExtractCmd {
            url: "https://example.com/nothing".to_string(),
            timeout: Some(5),
        };
        let code = commands::extract_cmd(cmd, &config(&server.url()), &output()).await;
        assert_eq!(code, ExitCode::NetworkError);
    }

    #[tokio::test]
    async fn test_play_switches_sources() {
        let episode = json!({
            "episode_id": 12,
            "sources": [
                { "kind": "segmented", "url": "https://cdn.example/ep12/master.m3u8" },
                { "kind": "progressive", "url": "https://cdn.example/ep12.mp4" }
            ]
        });
        let path = temp_file("ep.json", &episode.to_string());

        let code = commands::play_cmd(play(path.clone(), vec![0, 1]), &config("http://127.0.0.1:1"), &output())
            .await;
        assert_eq!(code, ExitCode::Success);
        let _ = std::fs::remove_file(path);
    }

    #[tokio::test]
    async fn test_play_runs_clock_and_ends() {
        let episode = json!({
            "episode_id": 5,
            "sources": [{ "kind": "file", "url": "https://cdn.example/ep5.mp4" }]
        });
        let path = temp_file("ep.json", &episode.to_string());

        let mut cmd = play(path.clone(), vec![0]);
        cmd.seconds = 1;
        cmd.tick_ms = 10;
        cmd.ended = true;
        let code = commands::play_cmd(cmd, &config("http://127.0.0.1:1"), &output()).await;
        assert_eq!(code, ExitCode::Success);
        let _ = std::fs::remove_file(path);
    }

    #[tokio::test]
    async fn test_play_extraction_failure_exit_code() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("POST", "/api/extract-iqiyi-m3u8")
            .with_status(400)
            .with_body(json!({ "success": false, "error": "VIP only" }).to_string())
            .create_async()
            .await;

        let episode = json!({
            "episode_id": 3,
            "sources": [{ "kind": "iqiyi", "url": "https://www.iqiyi.com/v_3.html" }]
        });
        let path = temp_file("ep.json", &episode.to_string());

        let code = commands::play_cmd(play(path.clone(), vec![0]), &config(&server.url()), &output()).await;
        mock.assert_async().await;
        assert_eq!(code, ExitCode::NetworkError);
        let _ = std::fs::remove_file(path);
    }

    #[tokio::test]
    async fn test_play_rejects_bad_episode_file() {
        let path = temp_file("ep.json", "{ not json");
        let code = commands::play_cmd(play(path.clone(), vec![0]), &config("http://127.0.0.1:1"), &output())
            .await;
        assert_eq!(code, ExitCode::ParseError);
        let _ = std::fs::remove_file(path);
    }
}
