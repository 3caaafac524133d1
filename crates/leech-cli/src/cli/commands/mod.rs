//! CLI command handlers, one per file.

mod classify;
mod fetch;
mod serve;

pub use classify::run_classify;
pub use fetch::run_fetch;
pub use serve::run_serve;

use std::sync::Arc;

use leech_core::config::LeechConfig;
use leech_core::messaging::telegram::TelegramBot;
use leech_core::scheduler::Leech;
use leech_core::transport::daemon::Aria2Client;

/// Wire the production endpoint and daemon client into a service.
fn build_service(cfg: &LeechConfig) -> (Leech, Arc<TelegramBot>) {
    let bot = Arc::new(TelegramBot::new(cfg));
    let daemon = Arc::new(Aria2Client::new(&cfg.daemon));
    tracing::debug!(endpoint = %daemon.endpoint(), "download daemon client");
    let leech = Leech::new(cfg.clone(), daemon, bot.clone());
    (leech, bot)
}
