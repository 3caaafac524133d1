//! Parsing of chat text into bot commands, plus the fixed reply texts.

pub const WELCOME_TEXT: &str = "🤖 Telegram Leech Bot

Welcome! I can download and upload files from:
• 🔗 Direct URLs (MP4, MKV, and other files)
• 🧲 Magnet links
• 📦 Torrent files

Commands:
/start - Show this message
/help - Show help information
/leech <url/magnet> - Download and upload to Telegram
/status - List your jobs
/cancel <job id> - Cancel one of your jobs
/stats - Show bot statistics

Simply send me a direct URL, magnet link, or torrent file, and I'll download and upload it for you!";

pub const HELP_TEXT: &str = "📖 Help & Usage

Supported sources:
1️⃣ Direct URLs: https://example.com/video.mp4
2️⃣ Magnet links: magnet:?xt=urn:btih:...
3️⃣ Torrent files: just send the .torrent file

Commands:
• /leech <url> - Download from URL/magnet
• /status - List your jobs and their progress
• /cancel <job id> - Cancel a job
• /stats - View statistics

Or just send the link directly!";

pub const UNAUTHORIZED_TEXT: &str = "⛔ You are not authorized to use this bot.";
pub const LEECH_USAGE_TEXT: &str = "❌ Please provide a URL or magnet link.\nUsage: /leech <url/magnet>";
pub const CANCEL_USAGE_TEXT: &str = "❌ Please provide a job id.\nUsage: /cancel <job id>";
pub const NOT_A_LINK_TEXT: &str =
    "❌ Please send a valid URL or magnet link, or use /help for more info.";
pub const NOT_A_TORRENT_TEXT: &str = "❌ Please send a .torrent file.";
pub const NO_JOBS_TEXT: &str = "📭 No active jobs.";

/// One inbound text message, interpreted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BotCommand<'a> {
    Start,
    Help,
    /// `/leech` with its argument (trimmed, `None` when empty).
    Leech(Option<&'a str>),
    Cancel(Option<&'a str>),
    Status,
    Stats,
    /// Text that is not a command.
    Plain(&'a str),
    Unknown(&'a str),
}

/// Split `/name@BotName args` into a command. Names are case-insensitive.
pub fn parse_command(text: &str) -> BotCommand<'_> {
    let text = text.trim();
    let Some(rest) = text.strip_prefix('/') else {
        return BotCommand::Plain(text);
    };
    let (head, args) = match rest.split_once(char::is_whitespace) {
        Some((head, args)) => (head, args.trim()),
        None => (rest, ""),
    };
    let name = head.split('@').next().unwrap_or(head);
    let arg = (!args.is_empty()).then_some(args);

    match name.to_ascii_lowercase().as_str() {
        "start" => BotCommand::Start,
        "help" => BotCommand::Help,
        "leech" => BotCommand::Leech(arg),
        "cancel" => BotCommand::Cancel(arg),
        "status" => BotCommand::Status,
        "stats" => BotCommand::Stats,
        _ => BotCommand::Unknown(name),
    }
}
