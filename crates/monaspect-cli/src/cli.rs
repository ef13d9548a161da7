//! CLI argument definitions for monaspect.
//!
//! # Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `market` | Fetch the top market list with failover |
//! | `history` | Fetch a price chart for one ticker |
//! | `news` | Fetch headlines from a sample of feeds |
//! | `analyze` | Score the market and pick best / avoid / trump |
//! | `sources` | List registered sources in failover order |
//! | `watch` | Re-run the analysis on the background refresh period |
//!
//! # Global Options
//!
//! | Option | Default | Description |
//! |--------|---------|-------------|
//! | `--strategy` | env or `sequential` | Source selection strategy |
//! | `--race-width` | env or `3` | Sources launched by a race |
//! | `--timeout-ms` | env or `4000` | Per-source deadline |
//! | `--offline` | `false` | Never touch the network |
//! | `--pretty` | `false` | Pretty-print JSON output |
//!
//! # Examples
//!
//! ```bash
//! monaspect market --limit 10 --pretty
//! monaspect history BTC --timeframe 1W
//! monaspect analyze --horizon long --strategy race
//! monaspect watch --interval-secs 60 --ticks 3 --offline
//! ```

use clap::{value_parser, Args, Parser, Subcommand, ValueEnum};

/// Multi-source crypto market dashboard
///
/// Fetches market lists, charts and headlines from redundant public
/// providers, then ranks assets for a short or long horizon.
#[derive(Debug, Parser)]
#[command(
    name = "monaspect",
    author,
    version,
    about = "Multi-source crypto market dashboard",
    long_about = "monaspect pulls crypto market data from several public providers with \
automatic failover, then scores every asset against recent headlines.\n\
\n\
  • Sequential rotation or parallel race across providers\n\
  • Stale-cache and synthetic fallbacks when providers fail\n\
  • Keyword sentiment and horizon-weighted ranking\n\
  • Structured JSON output with routing metadata\n\
\n\
Logging goes to stderr and is controlled by MONASPECT_LOG (default: warn)."
)]
pub struct Cli {
    /// Pretty-print JSON output with indentation.
    #[arg(long, global = true, default_value_t = false)]
    pub pretty: bool,

    /// Source selection strategy. Overrides MONASPECT_STRATEGY.
    #[arg(long, global = true, value_enum)]
    pub strategy: Option<StrategyArg>,

    /// Number of sources launched at once by the race strategy.
    #[arg(long, global = true, value_parser = value_parser!(u64).range(1..=16))]
    pub race_width: Option<u64>,

    /// Per-source deadline in milliseconds. Overrides MONASPECT_DEADLINE_MS.
    #[arg(long, global = true, value_parser = value_parser!(u64).range(1..))]
    pub timeout_ms: Option<u64>,

    /// Do not touch the network; serve synthetic data instead.
    #[arg(long, global = true, default_value_t = false)]
    pub offline: bool,

    #[command(subcommand)]
    pub command: Command,
}

/// Source selection strategy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum StrategyArg {
    /// One source at a time, rotating from the last one that answered.
    Sequential,
    /// Several sources at once; the first valid answer wins.
    Race,
}

/// Available CLI commands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Fetch the top market list.
    ///
    /// # Examples
    ///
    ///   monaspect market
    ///   monaspect market --limit 50 --strategy race
    Market(MarketArgs),

    /// Fetch a price chart for one ticker.
    ///
    /// # Examples
    ///
    ///   monaspect history BTC
    ///   monaspect history eth --timeframe 1M
    History(HistoryArgs),

    /// Fetch recent headlines from a random sample of feeds.
    News,

    /// Score the market against headlines and rank it.
    ///
    /// # Examples
    ///
    ///   monaspect analyze
    ///   monaspect analyze --horizon long
    Analyze(AnalyzeArgs),

    /// List registered sources in failover order.
    Sources,

    /// Refresh and re-analyze on a fixed period, one JSON line per tick.
    ///
    /// # Examples
    ///
    ///   monaspect watch
    ///   monaspect watch --interval-secs 60 --ticks 5
    Watch(WatchArgs),
}

#[derive(Debug, Args)]
pub struct MarketArgs {
    /// Number of assets to request (at least five).
    #[arg(long, value_parser = value_parser!(u64).range(5..=250))]
    pub limit: Option<u64>,
}

#[derive(Debug, Args)]
pub struct HistoryArgs {
    /// Ticker, for example BTC.
    pub symbol: String,

    /// Chart window: LIVE, 1D, 1W, 1M or 1Y.
    #[arg(long, default_value = "1D")]
    pub timeframe: String,
}

#[derive(Debug, Args)]
pub struct AnalyzeArgs {
    /// Analysis horizon: short or long.
    #[arg(long, default_value = "short")]
    pub horizon: String,
}

#[derive(Debug, Args)]
pub struct WatchArgs {
    /// Seconds between refreshes. Overrides MONASPECT_REFRESH_INTERVAL_SECS.
    #[arg(long, value_parser = value_parser!(u64).range(1..))]
    pub interval_secs: Option<u64>,

    /// Analysis horizon: short or long.
    #[arg(long, default_value = "short")]
    pub horizon: String,

    /// Stop after this many refreshes instead of running until Ctrl-C.
    #[arg(long, value_parser = value_parser!(u64).range(1..))]
    pub ticks: Option<u64>,
}
