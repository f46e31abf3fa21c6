//! shelfscope CLI - command-line client for the library analytics platform.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use shelfscope::api::{ApiClient, ExportFormat};
use shelfscope::auth::FileTokenStore;
use shelfscope::commands;
use shelfscope::config::Config;

/// Initialize the tracing subscriber for logging.
/// Use RUST_LOG to control verbosity; SHELFSCOPE_LOG_FILE redirects output
/// to a file instead of stderr.
fn init_tracing() -> Option<tracing_appender::non_blocking::WorkerGuard> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));

    if let Ok(path) = std::env::var("SHELFSCOPE_LOG_FILE") {
        let path = PathBuf::from(path);
        let dir = path.parent().unwrap_or(Path::new(".")).to_path_buf();
        let file = path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_else(|| "shelfscope.log".into());
        let (writer, guard) = tracing_appender::non_blocking(tracing_appender::rolling::never(dir, file));
        tracing_subscriber::registry()
            .with(fmt::layer().with_writer(writer).with_ansi(false))
            .with(filter)
            .init();
        Some(guard)
    } else {
        tracing_subscriber::registry()
            .with(fmt::layer().with_writer(std::io::stderr))
            .with(filter)
            .init();
        None
    }
}

fn usage() {
    eprintln!(
        "Usage: shelfscope <command> [args]

Commands:
  login [email] [--remember]        Log in (--remember stores the password in the keychain)
  register <name> <email>           Register a new analyst account and log in
  logout [--forget]                 Clear the session (--forget drops the remembered password)
  whoami                            Show the authenticated user

  upload <path>                     Upload a JSON data file
  files                             List uploaded data files
  rm-file <id>                      Delete a data file

  analyze <file-id> <name>          Generate an analysis report from a data file
  reports                           List reports
  report <id>                       Show a report with its metrics
  export <id> [pdf|csv] [output]    Download a report export
  rm-report <id>                    Delete a report

  metrics <file-id> [section]       Fetch analysis metrics for a data file

Environment:
  SHELFSCOPE_API_URL                Override the API base URL
  SHELFSCOPE_LOG_FILE               Write logs to a file instead of stderr
  RUST_LOG                          Log filter (e.g. RUST_LOG=debug)"
    );
}

fn parse_id(arg: Option<&String>, what: &str) -> Result<i64> {
    arg.ok_or_else(|| anyhow::anyhow!("Missing {what}"))?
        .parse()
        .with_context(|| format!("Invalid {what}"))
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present (silently ignore if not found)
    let _ = dotenvy::dotenv();

    let _log_guard = init_tracing();

    let args: Vec<String> = std::env::args().skip(1).collect();
    let Some(command) = args.first().map(String::as_str) else {
        usage();
        std::process::exit(2);
    };
    let rest = &args[1..];

    let mut config = Config::load()?;
    let store = Arc::new(FileTokenStore::new(Config::data_dir()?));
    let client = ApiClient::new(config.api_base_url(), store)?;
    info!(command, "shelfscope starting");

    match command {
        "login" => {
            let remember = rest.iter().any(|a| a == "--remember");
            let email = rest.iter().find(|a| !a.starts_with("--")).cloned();
            commands::login(&client, &mut config, email, remember).await
        }
        "register" => {
            let (Some(name), Some(email)) = (rest.first(), rest.get(1)) else {
                anyhow::bail!("Usage: shelfscope register <name> <email>");
            };
            commands::register(&client, &mut config, name.clone(), email.clone()).await
        }
        "logout" => {
            let forget = rest.iter().any(|a| a == "--forget");
            commands::logout(&client, &config, forget)
        }
        "whoami" => commands::whoami(&client).await,
        "upload" => {
            let path = rest.first().ok_or_else(|| anyhow::anyhow!("Missing file path"))?;
            commands::upload(&client, Path::new(path)).await
        }
        "files" => commands::files(&client).await,
        "rm-file" => commands::remove_file(&client, parse_id(rest.first(), "file id")?).await,
        "analyze" => {
            let file_id = parse_id(rest.first(), "file id")?;
            let name = rest
                .get(1)
                .ok_or_else(|| anyhow::anyhow!("Missing report name"))?;
            commands::analyze(&client, file_id, name).await
        }
        "reports" => commands::reports(&client).await,
        "report" => commands::report(&client, parse_id(rest.first(), "report id")?).await,
        "export" => {
            let report_id = parse_id(rest.first(), "report id")?;
            let format = match rest.get(1) {
                Some(f) => f.parse::<ExportFormat>()?,
                None => ExportFormat::Pdf,
            };
            let output = rest.get(2).map(PathBuf::from);
            commands::export(&client, report_id, format, output).await
        }
        "rm-report" => commands::remove_report(&client, parse_id(rest.first(), "report id")?).await,
        "metrics" => {
            let file_id = parse_id(rest.first(), "file id")?;
            commands::metrics(&client, file_id, rest.get(1).map(String::as_str)).await
        }
        _ => {
            usage();
            std::process::exit(2);
        }
    }
}
