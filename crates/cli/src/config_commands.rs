use std::path::Path;

use anyhow::Result;

use tunedrop_config::Severity;

use crate::{locate_tools, pipeline_config};

/// ANSI color codes.
const RED: &str = "\x1b[31m";
const YELLOW: &str = "\x1b[33m";
const GREEN: &str = "\x1b[32m";
const BOLD: &str = "\x1b[1m";
const RESET: &str = "\x1b[0m";

/// Validate the config file and the external tools, report, and fail when
/// the bot could not start with them.
pub fn check(explicit: Option<&Path>) -> Result<()> {
    let (path, config) = tunedrop_config::discover_and_load(explicit)?;
    eprintln!("Checking {}\n", path.display());

    let result = tunedrop_config::validate(&config);
    for d in &result.diagnostics {
        let color = match d.severity {
            Severity::Error => RED,
            Severity::Warning => YELLOW,
        };
        eprintln!(
            "  {BOLD}{color}{}{RESET} {}: {}",
            d.severity, d.path, d.message
        );
    }

    let mut errors = result.errors().count();
    let warnings = result.warnings().count();

    if !result.has_errors() {
        match pipeline_config(&config).check() {
            Ok(segment) => eprintln!(
                "  {GREEN}ok{RESET} oversized files split every {}s",
                segment.as_secs()
            ),
            Err(e) => {
                eprintln!("  {BOLD}{RED}error{RESET} delivery: {e}");
                errors += 1;
            },
        }
    }

    match locate_tools(&config) {
        Ok((yt_dlp, ffmpeg)) => {
            eprintln!("  {GREEN}ok{RESET} yt-dlp at {}", yt_dlp.binary().display());
            eprintln!("  {GREEN}ok{RESET} ffmpeg at {}", ffmpeg.binary().display());
        },
        Err(e) => {
            eprintln!("  {BOLD}{RED}error{RESET} tools: {e}");
            errors += 1;
        },
    }

    eprintln!();
    if errors == 0 && warnings == 0 {
        eprintln!("No issues found.");
    } else {
        eprintln!("{errors} error(s), {warnings} warning(s)");
    }

    if errors > 0 {
        anyhow::bail!("configuration check failed");
    }
    Ok(())
}
