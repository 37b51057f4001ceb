use anyhow::Result;
use tracing::info;

use comment_bot::config::{Config, log_filter};
use comment_bot::notify::SmtpNotifier;
use comment_bot::pipeline::run_with_config;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(log_filter(std::env::var("RUST_LOG").ok().as_deref()))
        .init();

    let config = Config::from_env()?;
    config.log_redacted();

    info!("Comment bot started");

    let notifier = SmtpNotifier::new(config.email.clone());
    if let Some(summary) = run_with_config(&config, &notifier).await? {
        info!(
            keywords = summary.keywords,
            fetch_failures = summary.fetch_failures,
            videos = summary.videos,
            posted = summary.posted,
            post_failures = summary.post_failures,
            alerts_sent = summary.alerts_sent,
            "Comment bot finished"
        );
    }

    Ok(())
}
