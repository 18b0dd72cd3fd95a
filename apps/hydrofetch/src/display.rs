//! Output rendering and formatting

use comfy_table::{presets::UTF8_FULL, Attribute, Cell, ContentArrangement, Table};
use console::{Style, Term};
use hydrofetch_provider::{FetchReport, ProviderSpec};
use hydrofetch_types::{ColorChoice, HostDescriptor, OutputFormat};
use serde::Serialize;
use std::io;

/// Result of a CLI command
#[derive(Debug, Serialize)]
#[serde(tag = "kind", content = "result", rename_all = "snake_case")]
pub enum CommandResult {
    /// `detect`: the provider spec, or nothing when no provider applies
    Detection {
        identifier: String,
        provider: Option<String>,
        spec: Option<ProviderSpec>,
    },
    Fetch(FetchReport),
    Hosts(Vec<HostDescriptor>),
}

/// Output renderer for CLI results
#[derive(Clone)]
pub struct OutputRenderer {
    /// Output format
    format: OutputFormat,
    /// Color configuration
    color_choice: ColorChoice,
    /// Terminal instance
    term: Term,
}

impl OutputRenderer {
    pub fn new(format: OutputFormat, color_choice: ColorChoice) -> Self {
        Self {
            format,
            color_choice,
            term: Term::stdout(),
        }
    }

    /// Render command result
    pub fn render_result(&self, result: &CommandResult) -> io::Result<()> {
        if self.format == OutputFormat::Json {
            let json = serde_json::to_string_pretty(result).map_err(io::Error::other)?;
            println!("{json}");
            return Ok(());
        }

        match result {
            CommandResult::Detection {
                identifier,
                provider,
                spec,
            } => self.render_detection(identifier, provider.as_deref(), spec.as_ref()),
            CommandResult::Fetch(report) => self.render_fetch_report(report),
            CommandResult::Hosts(hosts) => self.render_hosts(hosts),
        }
    }

    fn render_detection(
        &self,
        identifier: &str,
        provider: Option<&str>,
        spec: Option<&ProviderSpec>,
    ) -> io::Result<()> {
        match (provider, spec) {
            (Some(provider), Some(spec)) => {
                self.term.write_line(&format!(
                    "{} is {} resource {} (provider: {provider})",
                    identifier,
                    spec.host.name,
                    self.emphasize(spec.content_id()),
                ))?;
                self.term
                    .write_line(&format!("Bag URL: {}", spec.host.bag_url(&spec.resource)))
            }
            _ => self
                .term
                .write_line(&format!("No provider applies to {identifier}")),
        }
    }

    fn render_fetch_report(&self, report: &FetchReport) -> io::Result<()> {
        self.term.write_line(&format!(
            "Fetched {} resource {} ({}) into {}",
            report.host,
            self.emphasize(&report.resource_id),
            format_size(report.bytes),
            report.output_dir.display()
        ))?;
        for entry in &report.entries {
            self.term.write_line(&format!("  {entry}"))?;
        }
        Ok(())
    }

    fn render_hosts(&self, hosts: &[HostDescriptor]) -> io::Result<()> {
        let mut table = Table::new();
        table
            .load_preset(UTF8_FULL)
            .set_content_arrangement(ContentArrangement::Dynamic)
            .set_header(vec![
                Cell::new("Host").add_attribute(Attribute::Bold),
                Cell::new("Resource URL prefixes").add_attribute(Attribute::Bold),
                Cell::new("Bag endpoint").add_attribute(Attribute::Bold),
            ]);

        for host in hosts {
            table.add_row(vec![
                Cell::new(&host.name),
                Cell::new(host.hostnames.join("\n")),
                Cell::new(&host.bag_endpoint),
            ]);
        }

        println!("{table}");
        Ok(())
    }

    fn emphasize(&self, text: &str) -> String {
        if self.supports_color() {
            Style::new().cyan().bold().apply_to(text).to_string()
        } else {
            text.to_string()
        }
    }

    /// Check if color output is supported
    fn supports_color(&self) -> bool {
        colors_enabled(self.format, self.color_choice, &self.term)
    }
}

/// Whether `term` gets colored output; plain output never does
pub fn colors_enabled(format: OutputFormat, color_choice: ColorChoice, term: &Term) -> bool {
    if format == OutputFormat::Plain {
        return false;
    }
    match color_choice {
        ColorChoice::Always => true,
        ColorChoice::Never => false,
        ColorChoice::Auto => term.features().colors_supported(),
    }
}

/// Format byte size in human readable format
#[allow(clippy::cast_precision_loss)]
fn format_size(bytes: u64) -> String {
    const UNITS: &[&str] = &["B", "KB", "MB", "GB", "TB"];
    let mut size = bytes as f64;
    let mut unit_index = 0;

    while size >= 1024.0 && unit_index < UNITS.len() - 1 {
        size /= 1024.0;
        unit_index += 1;
    }

    if unit_index == 0 {
        format!("{size:.0} {}", UNITS[unit_index])
    } else {
        format!("{size:.1} {}", UNITS[unit_index])
    }
}
