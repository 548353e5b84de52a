use std::io::{self, BufRead, Write};

use linguist_core::config::CoreConfig;
use linguist_core::protocol;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

fn main() {
    dotenvy::dotenv().ok();

    // stdout carries the protocol; logs go to stderr.
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "linguist_core=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(io::stderr))
        .init();

    let config = CoreConfig::from_env();
    tracing::info!(tm_path = %config.tm_path.display(), "linguist-core ready");

    let stdin = io::stdin();
    let mut stdout = io::stdout();

    for line in stdin.lock().lines() {
        let line = match line {
            Ok(l) => l,
            Err(e) => {
                tracing::warn!(error = %e, "failed to read request line");
                continue;
            }
        };

        if line.trim().is_empty() {
            continue;
        }

        let result = std::panic::catch_unwind(|| protocol::handle(&line, &config));

        let response = match result {
            Ok(resp) => resp,
            Err(_) => {
                tracing::error!("request handler panicked");
                serde_json::json!({
                    "status": "error",
                    "message": "internal core error"
                })
                .to_string()
            }
        };

        if writeln!(stdout, "{response}").is_err() {
            break;
        }

        let _ = stdout.flush();
    }
}
