//! Plain text output formatting.
//!
//! Produces human-readable operator lines with colors and formatting.

use crate::config::ProfileConfig;
use crate::scanner::RunSummary;
use crate::storage::RegistryAnalysis;
use console::style;
use indicatif::{ProgressBar, ProgressStyle};
use std::io::{self, Write};
use std::time::Duration;

/// Line announcing a target's baseline probe.
pub fn scan_start_line(address: &str, profile: &str, ports: &str) -> String {
    format!(
        "{} Scanning {} | Profile={} | Ports={}",
        style("[*]").cyan().bold(),
        style(address).white().bold(),
        style(profile).yellow(),
        ports
    )
}

/// Line confirming a registry write-back.
pub fn synchronized_line(id: &str, ports: &str, services: &str) -> String {
    format!(
        "{} Registry Synchronized: {} -> Ports: [{}] | Services: [{}]",
        style("[+]").green().bold(),
        style(id).white().bold(),
        ports,
        services
    )
}

/// Line reporting an enumeration hit.
pub fn hit_line(status: u16, url: &str) -> String {
    let code = match status {
        200..=299 => style(status).green().bold(),
        300..=399 => style(status).cyan().bold(),
        400..=499 => style(status).yellow().bold(),
        _ => style(status).red().bold(),
    };
    format!("{} Phase 6 Hit: {} | {}", style("[+]").green().bold(), code, url)
}

/// Print the baseline banner for a target.
pub fn print_scan_start(address: &str, profile: &str, ports: &str) {
    println!("{}", scan_start_line(address, profile, ports));
}

/// Print a registry write-back confirmation.
pub fn print_synchronized(id: &str, ports: &str, services: &str) {
    println!("{}", synchronized_line(id, ports, services));
}

/// Print an enumeration hit.
pub fn print_hit(status: u16, url: &str) {
    println!("{}", hit_line(status, url));
}

/// Print the banner for an enumeration sweep.
pub fn print_enumeration_start(address: &str, profile: &str, threads: usize, delay: f64) {
    println!(
        "{} Enumerating {} | Profile={} | Threads={} | Delay={}s",
        style("[*]").cyan().bold(),
        style(address).white().bold(),
        style(profile).yellow(),
        threads,
        delay
    );
}

/// Print the end of an enumeration sweep.
pub fn print_enumeration_complete(address: &str, dispatched: usize, elapsed: Duration) {
    println!(
        "{} Enumeration complete for {}: {} requests in {:.2}s",
        style("[+]").green().bold(),
        style(address).white().bold(),
        dispatched,
        elapsed.as_secs_f64()
    );
}

/// Spinner tracking dispatched enumeration requests for one target.
pub fn enumeration_spinner(address: &str) -> ProgressBar {
    let style = ProgressStyle::with_template("{spinner:.green} [{elapsed_precise}] {prefix} {pos} requests")
        .unwrap_or_else(|_| ProgressStyle::default_spinner());
    let pb = ProgressBar::new_spinner().with_style(style);
    pb.set_prefix(address.to_string());
    pb
}

/// Print the end-of-run summary.
pub fn print_run_summary(summary: &RunSummary) -> io::Result<()> {
    let stdout = io::stdout();
    let mut out = stdout.lock();

    writeln!(out)?;
    writeln!(
        out,
        "  {} {}",
        style("Started:").bold(),
        summary.started_at.format("%Y-%m-%d %H:%M:%S UTC")
    )?;
    writeln!(
        out,
        "  {} {:.2}s",
        style("Duration:").bold(),
        summary.elapsed.as_secs_f64()
    )?;
    writeln!(out, "  {} {}", style("Targets:").bold(), summary.dispatched)?;

    if summary.enumerated() > 0 {
        writeln!(out, "  {} {}", style("Hits:").bold(), summary.hits())?;
    } else {
        writeln!(
            out,
            "  {} {}",
            style("Synchronized:").bold(),
            style(summary.synchronized()).green()
        )?;
    }

    let failed = summary.update_failures() + summary.aborted;
    if failed > 0 {
        writeln!(out, "  {} {}", style("Failed:").bold(), style(failed).red())?;
    }

    writeln!(out)?;
    writeln!(
        out,
        "{} All targets processed exactly once.",
        style("[+]").green().bold()
    )?;

    Ok(())
}

/// Print a registry analysis.
pub fn print_analysis(analysis: &RegistryAnalysis) -> io::Result<()> {
    let stdout = io::stdout();
    let mut out = stdout.lock();

    writeln!(out)?;
    writeln!(out, "  {} {}", style("Targets:").bold(), analysis.total)?;
    writeln!(
        out,
        "  {} {}",
        style("Unique services:").bold(),
        analysis.unique_services
    )?;
    writeln!(out, "  {} {}", style("Edge:").bold(), edge_line(analysis))?;

    if !analysis.top_services.is_empty() {
        writeln!(out)?;
        writeln!(out, "{}", style("Top services").cyan().bold())?;
        writeln!(out, "{:<24} {}", "SERVICE", "TARGETS")?;
        writeln!(out, "{}", "-".repeat(40))?;
        for entry in &analysis.top_services {
            writeln!(out, "{:<24} {}", truncate_string(&entry.service, 24), entry.count)?;
        }
    }

    if !analysis.clusters.is_empty() {
        writeln!(out)?;
        writeln!(out, "{}", style("Port clusters").cyan().bold())?;
        writeln!(out, "{:<48} {}", "OPEN PORTS", "TARGETS")?;
        writeln!(out, "{}", "-".repeat(60))?;
        for (ports, count) in &analysis.clusters {
            writeln!(out, "{:<48} {}", truncate_string(ports, 48), count)?;
        }
    }
    writeln!(out)?;

    Ok(())
}

/// Edge coverage as `<share>% (<n>/<total>) <vendors>`.
pub fn edge_line(analysis: &RegistryAnalysis) -> String {
    let vendors = if analysis.edge_vendors.is_empty() {
        "none".to_string()
    } else {
        analysis
            .edge_vendors
            .iter()
            .map(String::as_str)
            .collect::<Vec<_>>()
            .join(", ")
    };
    format!(
        "{:.1}% ({}/{}) {}",
        analysis.edge_share, analysis.edge_protected, analysis.total, vendors
    )
}

/// Print the profile tables.
pub fn print_profiles(config: &ProfileConfig) -> io::Result<()> {
    let stdout = io::stdout();
    let mut out = stdout.lock();

    writeln!(out)?;
    writeln!(out, "{}", style("Baseline profiles").cyan().bold())?;
    writeln!(out, "{:<24} {}", "NAME", "FLAGS")?;
    writeln!(out, "{}", "-".repeat(60))?;
    for (name, profile) in &config.baseline.scan_profiles {
        writeln!(out, "{:<24} {}", name, truncate_string(&profile.flags, 36))?;
    }

    writeln!(out)?;
    writeln!(out, "{}", style("Enumeration profiles").cyan().bold())?;
    writeln!(out, "{:<24} {:<8} {:<8} {}", "NAME", "THREADS", "DELAY", "EXTENSIONS")?;
    writeln!(out, "{}", "-".repeat(60))?;
    for (name, profile) in &config.enumeration.profiles {
        writeln!(
            out,
            "{:<24} {:<8} {:<8} {}",
            name,
            profile.threads,
            format!("{}s", profile.delay),
            truncate_string(&profile.extensions, 20)
        )?;
    }
    writeln!(out)?;

    Ok(())
}

/// Print an error message.
pub fn print_error(msg: &str) {
    eprintln!("{} {}", style("Error:").red().bold(), msg);
}

/// Print a warning message.
pub fn print_warning(msg: &str) {
    eprintln!("{} {}", style("Warning:").yellow().bold(), msg);
}

/// Print a success message.
pub fn print_success(msg: &str) {
    println!("{} {}", style("✓").green().bold(), msg);
}

/// Print an info message.
pub fn print_info(msg: &str) {
    println!("{} {}", style("ℹ").blue().bold(), msg);
}

/// Truncate a string to a maximum length, adding ellipsis if truncated.
fn truncate_string(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max_len.saturating_sub(3)).collect();
        format!("{}...", kept)
    }
}
