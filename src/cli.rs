//! CLI definition and dispatch.

use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::warn;

use crate::adapters::csv_adapter::{CsvBarFeed, DEFAULT_EMA_PERIOD};
use crate::adapters::csv_audit_adapter::CsvAuditAdapter;
use crate::adapters::file_config_adapter::FileConfigAdapter;
use crate::adapters::paper_order_adapter::PaperOrderAdapter;
use crate::domain::config::EngineConfig;
use crate::domain::config_validation::build_engine_config;
use crate::domain::engine::Engine;
use crate::domain::metrics::Metrics;
use crate::domain::runner::{RunSummary, Runner};
use crate::ports::report_port::AuditPort;

/// Exit code for a run that ended on a fail-safe hard stop.
pub const HALTED_EXIT_CODE: u8 = 7;

#[derive(Parser, Debug)]
#[command(name = "bargate", about = "Bar-synchronous short-entry engine")]
pub struct Cli {
    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    pub log_json: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Replay a CSV of closed bars through the engine
    Run {
        #[arg(short, long)]
        config: PathBuf,
        #[arg(short, long)]
        bars: PathBuf,
        /// Directory for executions/exits/levels/trades CSV files
        #[arg(long)]
        audit_dir: Option<PathBuf>,
        /// EMA period for the reference series when the CSV has none
        #[arg(long, default_value_t = DEFAULT_EMA_PERIOD)]
        ema_period: usize,
    },
    /// Validate a configuration file
    Validate {
        #[arg(short, long)]
        config: PathBuf,
    },
}

pub fn run(cli: Cli) -> ExitCode {
    init_logging(cli.log_json);
    match cli.command {
        Command::Run {
            config,
            bars,
            audit_dir,
            ema_period,
        } => run_replay(&config, &bars, audit_dir.as_deref(), ema_period),
        Command::Validate { config } => run_validate(&config),
    }
}

fn init_logging(json: bool) {
    use tracing_subscriber::{fmt, EnvFilter};

    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("bargate=info"));

    // try_init: a second call in the same process keeps the first subscriber.
    let _ = if json {
        fmt()
            .json()
            .with_env_filter(env_filter)
            .with_target(true)
            .with_thread_ids(true)
            .with_writer(std::io::stderr)
            .try_init()
    } else {
        fmt()
            .with_env_filter(env_filter)
            .with_target(true)
            .with_writer(std::io::stderr)
            .try_init()
    };
}

pub fn load_config(path: &Path) -> Result<EngineConfig, ExitCode> {
    let adapter = FileConfigAdapter::from_file(path).map_err(|e| {
        eprintln!("error: {e}");
        ExitCode::from(&e)
    })?;
    build_engine_config(&adapter).map_err(|e| {
        eprintln!("error: {e}");
        ExitCode::from(&e)
    })
}

fn run_replay(
    config_path: &Path,
    bars_path: &Path,
    audit_dir: Option<&Path>,
    ema_period: usize,
) -> ExitCode {
    // Stage 1: Load and validate config
    eprintln!("Loading config from {}", config_path.display());
    let cfg = match load_config(config_path) {
        Ok(c) => c,
        Err(code) => return code,
    };

    // Stage 2: Build engine
    let mut engine = match Engine::new(cfg) {
        Ok(e) => e,
        Err(e) => {
            eprintln!("error: {e}");
            return (&e).into();
        }
    };

    // Stage 3: Load bars
    eprintln!("Loading bars from {}", bars_path.display());
    let mut feed = match CsvBarFeed::from_path(bars_path, ema_period) {
        Ok(f) => f,
        Err(e) => {
            eprintln!("error: {e}");
            return (&e).into();
        }
    };
    eprintln!(
        "Replaying {} rows for {}",
        feed.remaining(),
        engine.config().symbol
    );

    // Stage 4: Replay
    let mut orders = PaperOrderAdapter::new();
    let runner = Runner::new();
    install_stop_handler(runner.stop_handle());
    let summary = match runner.run(&mut engine, &mut feed, &mut orders) {
        Ok(s) => s,
        Err(e) => {
            eprintln!("error: {e}");
            return (&e).into();
        }
    };

    // Stage 5: Console summary
    let ledger = &engine.state().ledger;
    print_summary(&summary, &Metrics::compute(ledger), ledger.equity());

    // Stage 6: Audit trail
    if let Some(dir) = audit_dir {
        let adapter = CsvAuditAdapter::new(dir);
        if let Err(e) = adapter.write(engine.audit(), &ledger.closed_trades) {
            eprintln!("error: {e}");
            return (&e).into();
        }
        eprintln!("\nAudit written to: {}", dir.display());
    }

    if summary.halted {
        eprintln!("\nRun ended on fail-safe hard stop");
        return ExitCode::from(HALTED_EXIT_CODE);
    }
    ExitCode::SUCCESS
}

/// Ctrl-C raises `stop`; the runner finishes the current bar and returns.
fn install_stop_handler(stop: Arc<AtomicBool>) {
    if let Err(e) = ctrlc::set_handler(move || {
        warn!("Received shutdown signal");
        stop.store(true, Ordering::SeqCst);
    }) {
        warn!("Failed to set Ctrl-C handler: {e}. Replay runs to the end of the feed.");
    }
}

fn print_summary(summary: &RunSummary, metrics: &Metrics, equity: f64) {
    eprintln!("\n=== Run Summary ===");
    eprintln!("Bars Seen:        {}", summary.bars_seen);
    eprintln!("Bars Evaluated:   {}", summary.evaluated);
    eprintln!("Feed Gaps:        {}", summary.gaps);
    eprintln!("Duplicates:       {}", summary.duplicates);
    if summary.orders_simulated > 0 {
        eprintln!("Orders (SIM):     {}", summary.orders_simulated);
    } else {
        eprintln!("Orders Sent:      {}", summary.orders_submitted);
    }

    eprintln!("\n=== Results ===");
    eprintln!("Final Equity:     {:.4}", equity);
    eprintln!("Total P&L:        {:.4}", metrics.total_pnl);
    eprintln!("Total Return:     {:.2}%", metrics.total_return * 100.0);
    eprintln!("Max Drawdown:     -{:.2}%", metrics.max_drawdown * 100.0);
    eprintln!("Total Trades:     {}", metrics.total_trades);
    eprintln!("Win Rate:         {:.1}%", metrics.win_rate * 100.0);
    eprintln!("Profit Factor:    {:.2}", metrics.profit_factor);
    eprintln!("Avg Bars Held:    {:.1}", metrics.avg_bars_held);
}

fn run_validate(config_path: &Path) -> ExitCode {
    eprintln!("Validating config: {}", config_path.display());
    let cfg = match load_config(config_path) {
        Ok(c) => c,
        Err(code) => return code,
    };

    eprintln!("\n[engine]");
    eprintln!("  symbol:            {}", cfg.symbol);
    eprintln!("  engine_enable:     {}", cfg.engine_enable);
    eprintln!("  candidate_enable:  {}", cfg.candidate_enable);
    eprintln!("  entry_exec_enable: {}", cfg.entry_exec_enable);
    eprintln!("  entry_timing:      {}", cfg.entry_timing);

    eprintln!("\n[capital]");
    eprintln!(
        "  base {} ({}), max loss {}%, fail-safe {}",
        cfg.capital.base,
        if cfg.capital.use_fixed { "fixed" } else { "floating" },
        cfg.capital.max_loss_pct,
        cfg.capital.fail_safe
    );

    eprintln!("\n[gates]");
    let g = &cfg.gates;
    eprintln!("  trend_bias:  {}", on_off(g.trend_bias_enable));
    eprintln!(
        "  slope:       {}",
        if g.slope_enabled() {
            format!("min {}% over {} bars", g.slope_min_pct, g.slope_lookback_bars)
        } else {
            "off".to_string()
        }
    );
    eprintln!("  cooldown:    {}", on_off(g.cooldown_enable));
    eprintln!(
        "  rate caps:   {} per cycle, {} per day",
        g.max_entries_per_cycle, g.max_entries_per_day
    );
    eprintln!("  stale feed:  {}", on_off(g.stale_block_enable));
    eprintln!("  spread:      {}", on_off(g.spread_guard_enable));
    eprintln!("  volatility:  {}", on_off(g.volatility_enable));

    eprintln!("\n[exit]");
    eprintln!(
        "  sl {}%, tp {}%, trailing {}%, confirm {} bars",
        cfg.exit.sl_pct, cfg.exit.tp_pct, cfg.exit.trailing_pct, cfg.exit.confirm_bars
    );

    if !cfg.engine_enable {
        eprintln!("\nwarning: engine_enable is false; run will refuse to start");
    }
    eprintln!("\nConfiguration is valid.");
    ExitCode::SUCCESS
}

fn on_off(flag: bool) -> &'static str {
    if flag { "on" } else { "off" }
}
