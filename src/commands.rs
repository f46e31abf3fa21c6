//! CLI command handlers.
//!
//! Each function maps one subcommand onto the API client and prints a
//! human-readable result. All user-facing messaging for business errors
//! happens here; the client itself only classifies them.

use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

use crate::api::{ApiClient, ExportFormat};
use crate::auth::CredentialStore;
use crate::config::Config;

fn prompt(label: &str) -> Result<String> {
    print!("{label}");
    std::io::stdout().flush()?;
    let mut line = String::new();
    std::io::stdin()
        .read_line(&mut line)
        .context("Failed to read input")?;
    Ok(line.trim().to_string())
}

fn resolve_email(config: &Config, email: Option<String>) -> Result<String> {
    match email.or_else(|| config.last_email.clone()) {
        Some(email) if !email.is_empty() => Ok(email),
        _ => prompt("Email: "),
    }
}

/// Log in, persisting the issued tokens. With `--remember` the password is
/// stored in the OS keychain and reused on the next login.
pub async fn login(
    client: &ApiClient,
    config: &mut Config,
    email: Option<String>,
    remember: bool,
) -> Result<()> {
    let email = resolve_email(config, email)?;

    let password = if CredentialStore::has_credentials(&email) {
        println!("Using remembered password for {email}");
        CredentialStore::get_password(&email)?
    } else {
        rpassword::prompt_password("Password: ").context("Failed to read password")?
    };

    let analyst = client.login(&email, &password).await?;

    if remember {
        CredentialStore::store(&email, &password)?;
    }
    config.last_email = Some(email);
    config.save()?;

    println!("Logged in as {} (analyst #{})", analyst.email, analyst.id);
    Ok(())
}

/// Register a new analyst account, then log in with it.
pub async fn register(
    client: &ApiClient,
    config: &mut Config,
    name: String,
    email: String,
) -> Result<()> {
    let password = rpassword::prompt_password("Password: ").context("Failed to read password")?;
    let confirm =
        rpassword::prompt_password("Confirm password: ").context("Failed to read password")?;
    if password != confirm {
        anyhow::bail!("Passwords do not match");
    }

    let analyst = client.register(&name, &email, &password).await?;
    println!("Registered {} (analyst #{})", analyst.email, analyst.id);

    client.login(&email, &password).await?;
    config.last_email = Some(email);
    config.save()?;
    println!("Logged in");
    Ok(())
}

/// Clear the stored session. With `forget`, also drop the remembered
/// keychain password for the last used account.
pub fn logout(client: &ApiClient, config: &Config, forget: bool) -> Result<()> {
    client.terminate_session();
    if forget {
        if let Some(email) = &config.last_email {
            // Nothing remembered is fine.
            let _ = CredentialStore::delete(email);
        }
    }
    println!("Logged out");
    Ok(())
}

pub async fn whoami(client: &ApiClient) -> Result<()> {
    let user = client.current_user().await?;
    println!("{} <{}> (analyst #{})", user.name, user.email, user.id);
    Ok(())
}

pub async fn upload(client: &ApiClient, path: &Path) -> Result<()> {
    let file = client.upload_data_file(path).await?;
    println!("Uploaded {} as file #{}", file.filename, file.id);
    Ok(())
}

pub async fn files(client: &ApiClient) -> Result<()> {
    let files = client.data_files().await?;
    if files.is_empty() {
        println!("No data files uploaded yet");
        return Ok(());
    }
    println!("{:<6} {:<20} FILENAME", "ID", "UPLOADED");
    for file in files {
        println!(
            "{:<6} {:<20} {}",
            file.id,
            file.upload_date.format("%Y-%m-%d %H:%M"),
            file.filename
        );
    }
    Ok(())
}

pub async fn remove_file(client: &ApiClient, file_id: i64) -> Result<()> {
    client.delete_data_file(file_id).await?;
    println!("Deleted file #{file_id}");
    Ok(())
}

pub async fn analyze(client: &ApiClient, file_id: i64, report_name: &str) -> Result<()> {
    let report = client.analyze(file_id, report_name).await?;
    println!("Generated report #{} \"{}\"", report.id, report.report_name);
    Ok(())
}

pub async fn reports(client: &ApiClient) -> Result<()> {
    let reports = client.reports().await?;
    if reports.is_empty() {
        println!("No reports yet");
        return Ok(());
    }
    println!("{:<6} {:<20} NAME", "ID", "CREATED");
    for report in reports {
        println!(
            "{:<6} {:<20} {}",
            report.id,
            report.created_at.format("%Y-%m-%d %H:%M"),
            report.report_name
        );
    }
    Ok(())
}

pub async fn report(client: &ApiClient, report_id: i64) -> Result<()> {
    let detail = client.report(report_id).await?;
    println!(
        "Report #{} \"{}\" ({} users, generated {})",
        detail.summary.id,
        detail.summary.report_name,
        detail.report_data.total_users,
        detail.report_data.report_date
    );
    println!("{}", serde_json::to_string_pretty(&detail.report_data)?);
    Ok(())
}

pub async fn export(
    client: &ApiClient,
    report_id: i64,
    format: ExportFormat,
    output: Option<PathBuf>,
) -> Result<()> {
    let bytes = client.export_report(report_id, format).await?;
    let path = output
        .unwrap_or_else(|| PathBuf::from(format!("report-{report_id}.{}", format.extension())));
    tokio::fs::write(&path, &bytes)
        .await
        .with_context(|| format!("Failed to write {}", path.display()))?;
    println!("Wrote {} bytes to {}", bytes.len(), path.display());
    Ok(())
}

pub async fn remove_report(client: &ApiClient, report_id: i64) -> Result<()> {
    client.delete_report(report_id).await?;
    println!("Deleted report #{report_id}");
    Ok(())
}

/// Print one metric section, or all five (fetched concurrently) if no
/// section is given.
pub async fn metrics(client: &ApiClient, file_id: i64, section: Option<&str>) -> Result<()> {
    let value = match section {
        None => serde_json::to_value(client.all_metrics(file_id).await?)?,
        Some("usage-patterns") => client.usage_patterns(file_id).await?,
        Some("content-performance") => client.content_performance(file_id).await?,
        Some("user-segments") => client.user_segments(file_id).await?,
        Some("search-patterns") => client.search_patterns(file_id).await?,
        Some("retention") => client.retention(file_id).await?,
        Some(other) => anyhow::bail!(
            "Unknown metric section '{other}' (expected usage-patterns, \
             content-performance, user-segments, search-patterns or retention)"
        ),
    };
    println!("{}", serde_json::to_string_pretty(&value)?);
    Ok(())
}
