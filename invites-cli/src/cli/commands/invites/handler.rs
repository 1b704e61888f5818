//! Invite command handlers

use anyhow::{Context, Result};
use chrono::Local;
use colored::*;
use serde::Serialize;
use serde_json::json;

use super::{DedupeArgs, StatusArgs};
use crate::cli::OutputFormat;
use crate::config::Config;
use crate::services::reconcile::Invite;
use crate::services::InviteService;
use crate::store::{CellRegionWrite, TabularStore};

const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Local wall-clock time as written into the sheet
pub fn default_timestamp() -> String {
    Local::now().format(TIMESTAMP_FORMAT).to_string()
}

/// Handle `list`
pub async fn handle_list<S: TabularStore>(
    service: &InviteService<S>,
    format: OutputFormat,
) -> Result<()> {
    let invites = service
        .get_outstanding_invites()
        .await
        .context("Failed to read outstanding invites")?;

    println!("{}", render_invites(&invites, format)?);
    Ok(())
}

/// Handle `count`
pub async fn handle_count<S: TabularStore>(
    service: &InviteService<S>,
    format: OutputFormat,
) -> Result<()> {
    let count = service
        .get_new_invites()
        .await
        .context("Failed to count new invites")?;

    println!("{}", render_count(count, format)?);
    Ok(())
}

/// Handle `dedupe`
pub async fn handle_dedupe<S: TabularStore>(
    service: &InviteService<S>,
    args: DedupeArgs,
    format: OutputFormat,
) -> Result<()> {
    let timestamp = args.timestamp.unwrap_or_else(default_timestamp);

    // Dry run: plan against the current sheet, write nothing
    let report = if args.dry_run {
        let writes = service
            .plan_duplicate_requests(&timestamp)
            .await
            .context("Failed to plan duplicate marking")?;
        WriteReport::planned(&writes)
    } else {
        // Fetch, plan and apply in one pass
        let written = service
            .update_duplicate_requests(&timestamp)
            .await
            .context("Failed to mark duplicate requests")?;
        WriteReport::applied(written)
    };

    println!("{}", render_report(&report, "duplicate", format)?);
    Ok(())
}

/// Handle `status`
pub async fn handle_status<S: TabularStore>(
    service: &InviteService<S>,
    args: StatusArgs,
    format: OutputFormat,
) -> Result<()> {
    // Validate arguments
    if args.status.trim().is_empty() {
        anyhow::bail!("--status must not be empty");
    }
    let timestamp = args.timestamp.unwrap_or_else(default_timestamp);

    // Dry run: show which rows the emails resolve to
    let report = if args.dry_run {
        let writes = service
            .plan_invite_status(&args.emails, &args.status, &timestamp)
            .await
            .context("Failed to plan status update")?;
        WriteReport::planned(&writes)
    } else {
        // Unknown emails are skipped, not reported as errors
        let written = service
            .update_invite_status(&args.emails, &args.status, &timestamp)
            .await
            .with_context(|| format!("Failed to set status {:?}", args.status))?;
        WriteReport::applied(written)
    };

    println!("{}", render_report(&report, "status", format)?);
    Ok(())
}

/// Handle `config`
pub fn handle_config(config: &Config, format: OutputFormat) -> Result<()> {
    let token_file = config
        .token_file
        .as_ref()
        .map(|path| path.display().to_string());

    match format {
        OutputFormat::Json => {
            let value = json!({
                "credentialsFile": config.credentials_file.display().to_string(),
                "tokenFile": token_file,
                "spreadsheetId": config.spreadsheet_id,
                "sheetName": config.sheet_name,
                "timeoutSecs": config.timeout.as_secs(),
            });
            println!(
                "{}",
                serde_json::to_string_pretty(&value).context("Failed to format JSON output")?
            );
        }
        OutputFormat::Table => {
            println!("{}", "Configuration OK".bright_green().bold());
            println!("  Credentials file: {}", config.credentials_file.display().to_string().cyan());
            match &token_file {
                Some(path) => println!("  Token file:       {}", path.cyan()),
                None => println!("  Token file:       {}", "not set".dimmed()),
            }
            println!("  Spreadsheet:      {}", config.spreadsheet_id.cyan());
            println!("  Sheet:            {}", config.sheet_name.cyan());
            println!("  Timeout:          {}s", config.timeout.as_secs());
        }
    }
    Ok(())
}

fn render_invites(invites: &[Invite], format: OutputFormat) -> Result<String> {
    if format == OutputFormat::Json {
        return serde_json::to_string_pretty(invites).context("Failed to format JSON output");
    }

    if invites.is_empty() {
        return Ok("No outstanding invite requests".dimmed().to_string());
    }

    let headers = ["Name", "Email", "Role", "Company", "Years", "Source"];
    let rows: Vec<[&str; 6]> = invites
        .iter()
        .map(|i| {
            [
                i.name.as_str(),
                i.email.as_str(),
                i.role.as_str(),
                i.company.as_str(),
                i.years_experience.as_str(),
                i.source.as_str(),
            ]
        })
        .collect();

    let mut widths = headers.map(|h| h.chars().count());
    for row in &rows {
        for (width, cell) in widths.iter_mut().zip(row) {
            *width = (*width).max(cell.chars().count());
        }
    }

    let mut out = String::new();
    let header_line: Vec<String> = headers
        .iter()
        .zip(widths)
        .map(|(h, w)| pad(h, w))
        .collect();
    out.push_str(&header_line.join("  ").bold().to_string());
    out.push('\n');

    for row in &rows {
        let line: Vec<String> = row.iter().zip(widths).map(|(c, w)| pad(c, w)).collect();
        out.push_str(line.join("  ").trim_end());
        out.push('\n');
    }

    out.push_str(&format!(
        "{} outstanding request(s)",
        invites.len().to_string().bright_green()
    ));
    Ok(out)
}

fn pad(cell: &str, width: usize) -> String {
    let fill = width.saturating_sub(cell.chars().count());
    format!("{}{}", cell, " ".repeat(fill))
}

fn render_count(count: usize, format: OutputFormat) -> Result<String> {
    match format {
        OutputFormat::Json => serde_json::to_string_pretty(&json!({ "newInvites": count }))
            .context("Failed to format JSON output"),
        OutputFormat::Table => Ok(format!(
            "{} new invite request(s)",
            count.to_string().bright_green().bold()
        )),
    }
}

/// Outcome of an update command, applied or planned
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct WriteReport {
    dry_run: bool,
    rows_written: usize,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    planned: Vec<PlannedRow>,
}

/// One staged write, positioned with 1-based sheet row numbers
#[derive(Debug, Serialize)]
struct PlannedRow {
    row: usize,
    range: String,
    values: Vec<String>,
}

impl WriteReport {
    fn planned(writes: &[CellRegionWrite]) -> Self {
        let planned = writes
            .iter()
            .map(|write| PlannedRow {
                row: write.range.start_row + 1,
                range: write.range.to_a1().unwrap_or_default(),
                values: write.values.iter().flatten().cloned().collect(),
            })
            .collect();
        Self {
            dry_run: true,
            rows_written: 0,
            planned,
        }
    }

    fn applied(rows_written: usize) -> Self {
        Self {
            dry_run: false,
            rows_written,
            planned: Vec::new(),
        }
    }
}

fn render_report(report: &WriteReport, pass: &str, format: OutputFormat) -> Result<String> {
    if format == OutputFormat::Json {
        return serde_json::to_string_pretty(report).context("Failed to format JSON output");
    }

    if !report.dry_run {
        return Ok(match report.rows_written {
            0 => format!("No {} updates needed", pass).dimmed().to_string(),
            n => format!("Updated {} row(s)", n.to_string().bright_green().bold()),
        });
    }

    if report.planned.is_empty() {
        return Ok(format!("Dry run: no {} updates needed", pass).dimmed().to_string());
    }

    let mut out = format!(
        "{} {} row(s) would be updated\n",
        "Dry run:".yellow().bold(),
        report.planned.len()
    );
    for row in &report.planned {
        let status = row.values.iter().rev().nth(1).map(String::as_str).unwrap_or("");
        let timestamp = row.values.last().map(String::as_str).unwrap_or("");
        out.push_str(&format!(
            "  row {:<5} {:<8} {} {}\n",
            row.row,
            row.range,
            status.cyan(),
            timestamp.dimmed()
        ));
    }
    Ok(out.trim_end().to_string())
}
