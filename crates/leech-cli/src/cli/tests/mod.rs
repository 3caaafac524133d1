//! CLI parse tests.

use super::{Cli, CliCommand};
use clap::Parser;
use std::path::Path;

fn parse_cli(args: &[&str]) -> Cli {
    Cli::try_parse_from(args).unwrap()
}

fn parse(args: &[&str]) -> CliCommand {
    parse_cli(args).command
}

#[test]
fn cli_parse_serve() {
    let cli = parse_cli(&["leech", "serve"]);
    assert!(matches!(cli.command, CliCommand::Serve));
    assert!(cli.config.is_none());
}

#[test]
fn cli_parse_fetch() {
    match parse(&["leech", "fetch", "https://example.com/a.mp4", "--chat", "42"]) {
        CliCommand::Fetch { reference, chat } => {
            assert_eq!(reference, "https://example.com/a.mp4");
            assert_eq!(chat, 42);
        }
        _ => panic!("expected Fetch"),
    }
}

#[test]
fn cli_parse_fetch_group_chat_id() {
    match parse(&["leech", "fetch", "magnet:?xt=urn:btih:abc", "--chat", "-1001234567890"]) {
        CliCommand::Fetch { chat, .. } => assert_eq!(chat, -1_001_234_567_890),
        _ => panic!("expected Fetch with a negative chat id"),
    }
}

#[test]
fn cli_parse_fetch_requires_chat() {
    assert!(Cli::try_parse_from(["leech", "fetch", "https://example.com/a"]).is_err());
}

#[test]
fn cli_parse_classify() {
    match parse(&["leech", "classify", "/tmp/x.torrent"]) {
        CliCommand::Classify { reference } => assert_eq!(reference, "/tmp/x.torrent"),
        _ => panic!("expected Classify"),
    }
}

#[test]
fn cli_parse_global_config() {
    let cli = parse_cli(&["leech", "serve", "--config", "/etc/leech.toml"]);
    assert_eq!(cli.config.as_deref(), Some(Path::new("/etc/leech.toml")));

    let cli = parse_cli(&["leech", "--config", "./c.toml", "classify", "x"]);
    assert_eq!(cli.config.as_deref(), Some(Path::new("./c.toml")));
}

#[test]
fn cli_parse_unknown_subcommand_fails() {
    assert!(Cli::try_parse_from(["leech", "mirror"]).is_err());
}
