use std::sync::Arc;

use anyhow::{Context, Result};
use fact_feed::config::{AppConfig, LoggingConfig};
use fact_feed::internal::feed::{FeedIntent, FeedScreen};
use fact_feed::internal::ui::view::render_feed;
use fact_feed::utils::html::content_preview;
use fact_feed::{DetailParams, FeedClient};
use tokio::io::{AsyncBufReadExt, BufReader};

const SCREEN_WIDTH: usize = 80;

/// Keeps the non-blocking file writer alive for the lifetime of `main`.
type LogGuard = Option<tracing_appender::non_blocking::WorkerGuard>;

fn init_logging(logging: &LoggingConfig) -> LogGuard {
    // RUST_LOG wins over the configured levels.
    let env_filter = match std::env::var("RUST_LOG") {
        Ok(_) => tracing_subscriber::EnvFilter::from_default_env(),
        Err(_) => tracing_subscriber::EnvFilter::new(logging.filter_directives()),
    };

    match logging.log_directory.as_deref() {
        Some(dir) => {
            let file_appender = tracing_appender::rolling::daily(dir, "fact-feed.log");
            let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);
            tracing_subscriber::fmt()
                .with_env_filter(env_filter)
                .with_writer(non_blocking)
                .with_ansi(false)
                .compact()
                .init();
            Some(guard)
        }
        None => {
            tracing_subscriber::fmt()
                .with_env_filter(env_filter)
                .with_writer(std::io::stderr)
                .compact()
                .init();
            None
        }
    }
}

fn print_detail(params: &DetailParams) -> Result<()> {
    let payload = serde_json::to_string_pretty(params).context("failed to encode detail params")?;
    println!("{payload}");
    println!("{}", content_preview(&params.content_html, SCREEN_WIDTH));
    Ok(())
}

fn today() -> jiff::civil::Date {
    jiff::Zoned::now().date()
}

#[tokio::main]
async fn main() -> Result<()> {
    let config = AppConfig::load();
    let _guard = init_logging(&config.logging);

    let client = FeedClient::new(&config.network)?;
    tracing::info!(url = %client.posts_url(), per_page = client.per_page(), "starting feed");

    let mut screen = FeedScreen::new(Arc::new(client), config.feed.refresh_indicator());
    screen.mount();
    print!("{}", render_feed(&screen.state(), today(), SCREEN_WIDTH));
    println!("commands: r = refresh, <n> = open item n, q = quit");

    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    loop {
        tokio::select! {
            Some(event) = screen.next_event() => {
                if screen.apply(event) {
                    print!("{}", render_feed(&screen.state(), today(), SCREEN_WIDTH));
                }
            }
            line = lines.next_line() => {
                let Some(line) = line.context("failed to read stdin")? else {
                    break;
                };
                match line.trim() {
                    "q" | "quit" => break,
                    "r" | "refresh" => {
                        screen.dispatch(FeedIntent::Refresh);
                        print!("{}", render_feed(&screen.state(), today(), SCREEN_WIDTH));
                    }
                    "" => {}
                    other => match other.parse::<usize>() {
                        Ok(index) => match screen.dispatch(FeedIntent::Select(index)) {
                            Some(params) => print_detail(&params)?,
                            None => println!("no item {index}"),
                        },
                        Err(_) => println!("unknown command: {other}"),
                    },
                }
            }
        }
    }

    screen.unmount();
    Ok(())
}
