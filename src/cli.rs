//! Command-line interface for flowpick
//!
//! Provides argument parsing, subcommand handling, and output rendering for
//! the flowpick binary.

use crate::backend::Backend;
use crate::selector::WeightedSelector;
use crate::simulate::DistributionReport;
use clap::{ArgGroup, Parser, Subcommand};
use std::sync::Arc;

/// Deterministic hash-sticky weighted backend selection
#[derive(Parser)]
#[command(name = "flowpick")]
#[command(version)]
#[command(about = "Deterministic hash-sticky weighted backend selection")]
#[command(
    long_about = "flowpick expands weighted backends into a lookup sequence and maps flow \
    hashes onto it, so the same flow always lands on the same backend. Use it to inspect \
    a configuration, resolve individual flows, and check the traffic split."
)]
pub struct Cli {
    /// Path to configuration file
    #[arg(short, long, default_value = "config.toml", global = true)]
    pub config: String,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Subcommand)]
pub enum Command {
    /// Generate a template configuration file
    Config {
        /// Output file path (prints to stdout if not specified)
        #[arg(short, long)]
        output: Option<String>,
    },

    /// Print the expanded selection table
    Table,

    /// Resolve a single hash or flow to a backend
    #[command(group(ArgGroup::new("input").required(true).args(["hash", "flow"])))]
    Select {
        /// Precomputed flow hash (negative values are normalized)
        #[arg(long, allow_negative_numbers = true)]
        hash: Option<i64>,

        /// Flow as `[tcp:|udp:]<source>-><destination>`
        #[arg(long)]
        flow: Option<String>,
    },

    /// Simulate random flows and report the traffic split
    Simulate {
        /// Number of flows to generate
        #[arg(short, long, default_value_t = 100_000)]
        flows: u64,

        /// RNG seed for reproducible runs
        #[arg(short, long)]
        seed: Option<u64>,

        /// Emit the report as JSON
        #[arg(long)]
        json: bool,
    },
}

/// Render the expansion table for `flowpick table`
///
/// Lists every configured backend; disabled ones are shown without a range.
pub fn render_table(backends: &[Arc<Backend>], selector: &WeightedSelector) -> String {
    let total = selector.total_weight();
    let mut blocks = selector.blocks().peekable();
    let mut out = String::new();

    out.push_str(&format!(
        "{:<24} {:>8} {:>20} {:>8}\n",
        "BACKEND", "WEIGHT", "HASH RANGE", "SHARE"
    ));

    for backend in backends {
        match blocks.next_if(|block| Arc::ptr_eq(block.backend, backend)) {
            Some(block) => {
                let share = block.len() as f64 / total as f64 * 100.0;
                out.push_str(&format!(
                    "{:<24} {:>8} {:>20} {:>7.2}%\n",
                    backend.name(),
                    backend.weight(),
                    format!("{}..{}", block.range.start, block.range.end),
                    share
                ));
            }
            None => {
                out.push_str(&format!(
                    "{:<24} {:>8} {:>20} {:>8}\n",
                    backend.name(),
                    backend.weight(),
                    "disabled",
                    "-"
                ));
            }
        }
    }

    out.push_str(&format!("sequence length: {}\n", selector.len()));
    out
}

/// Render a simulation report as text
pub fn render_report(report: &DistributionReport) -> String {
    let mut out = String::new();

    out.push_str(&format!(
        "{:<24} {:>8} {:>10} {:>10} {:>10}\n",
        "BACKEND", "WEIGHT", "FLOWS", "OBSERVED", "EXPECTED"
    ));
    for share in &report.backends {
        out.push_str(&format!(
            "{:<24} {:>8} {:>10} {:>9.2}% {:>9.2}%\n",
            share.name,
            share.weight,
            share.count,
            share.observed_percent,
            share.expected_percent
        ));
    }
    out.push_str(&format!(
        "flows: {}, unassigned: {}, max deviation: {:.2} points\n",
        report.flows,
        report.unassigned,
        report.max_deviation_percent()
    ));
    out
}

/// Generate template configuration content
pub fn generate_config_template() -> &'static str {
    r#"# flowpick Configuration
# ======================
#
# Backends are expanded into a lookup sequence in the order listed here.
# Each backend occupies `weight` consecutive slots; a flow hash picks the
# slot `hash % total_weight`.

# ─────────────────────────────────────────────────────────────────────────────
# BACKENDS
# ─────────────────────────────────────────────────────────────────────────────
#
# Backend fields:
#   - name: Identifier returned by selection
#   - weight: Relative traffic share (default 1). Zero or negative disables
#     the backend without removing it, e.g. while draining.
#
# The sum of positive weights must not exceed 1048576.

[[backends]]
name = "backend1"
weight = 1

[[backends]]
name = "backend2"
weight = 2

[[backends]]
name = "backend3"
weight = 3

# Temporarily drained backend:
# [[backends]]
# name = "backend4"
# weight = 0

# ─────────────────────────────────────────────────────────────────────────────
# HASHING
# ─────────────────────────────────────────────────────────────────────────────

[hashing]
# Seed for the flow hasher. Changing it remaps which flows land where.
seed = 0

# ─────────────────────────────────────────────────────────────────────────────
# OBSERVABILITY
# ─────────────────────────────────────────────────────────────────────────────

[observability]
# Log level: "trace", "debug", "info", "warn", "error"
log_level = "info"
"#
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn verify_cli() {
        Cli::command().debug_assert();
    }

    #[test]
    fn default_config_path() {
        let cli = Cli::parse_from(["flowpick"]);
        assert_eq!(cli.config, "config.toml");
        assert!(cli.command.is_none());
    }

    #[test]
    fn custom_config_path() {
        let cli = Cli::parse_from(["flowpick", "--config", "custom.toml", "table"]);
        assert_eq!(cli.config, "custom.toml");
        assert!(matches!(cli.command, Some(Command::Table)));
    }

    #[test]
    fn config_subcommand_with_output() {
        let cli = Cli::parse_from(["flowpick", "config", "-o", "my-config.toml"]);
        assert!(matches!(
            cli.command,
            Some(Command::Config { output: Some(ref path) }) if path == "my-config.toml"
        ));
    }

    #[test]
    fn select_accepts_negative_hash() {
        let cli = Cli::parse_from(["flowpick", "select", "--hash", "-5"]);
        assert!(matches!(
            cli.command,
            Some(Command::Select { hash: Some(-5), flow: None })
        ));
    }

    #[test]
    fn select_requires_hash_or_flow() {
        assert!(Cli::try_parse_from(["flowpick", "select"]).is_err());
        assert!(
            Cli::try_parse_from([
                "flowpick",
                "select",
                "--hash",
                "1",
                "--flow",
                "10.0.0.1:1->10.0.0.2:2"
            ])
            .is_err()
        );
    }

    #[test]
    fn simulate_defaults() {
        let cli = Cli::parse_from(["flowpick", "simulate"]);
        assert!(matches!(
            cli.command,
            Some(Command::Simulate {
                flows: 100_000,
                seed: None,
                json: false
            })
        ));
    }

    #[test]
    fn template_is_valid_config() {
        let config: crate::config::Config = generate_config_template()
            .parse()
            .expect("template should parse and validate");
        assert_eq!(config.backends.len(), 3);
        assert_eq!(config.total_weight(), 6);
    }

    #[test]
    fn table_lists_disabled_backends() {
        let backends: Vec<Arc<Backend>> = [("a", 1), ("off", 0), ("b", 3)]
            .into_iter()
            .map(|(name, weight)| Arc::new(Backend::new(name, weight)))
            .collect();
        let selector = WeightedSelector::new(&backends);

        let table = render_table(&backends, &selector);
        assert!(table.contains("0..1"));
        assert!(table.contains("1..4"));
        assert!(table.contains("disabled"));
        assert!(table.contains("75.00%"));
        assert!(table.contains("sequence length: 4"));
        // header, three backends, summary
        assert_eq!(table.lines().count(), 5);
        assert!(table.ends_with('\n'));
    }

    #[test]
    fn report_shows_observed_and_expected() {
        use crate::simulate::BackendShare;

        let report = DistributionReport {
            flows: 10,
            unassigned: 0,
            backends: vec![BackendShare {
                name: "a".to_string(),
                weight: 1,
                count: 10,
                observed_percent: 100.0,
                expected_percent: 100.0,
            }],
        };

        let text = render_report(&report);
        assert!(text.contains("100.00%"));
        assert!(text.contains("flows: 10, unassigned: 0"));
        assert_eq!(text.lines().count(), 3);
    }
}
