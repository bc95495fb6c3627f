//! CLI for the dcf valuation library.
//!
//! This binary values an equity from a JSON data snapshot and exposes each
//! pipeline stage on its own for inspection.

use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand};
use dcf::{
    ConfigurableEstimator, DcfValuation, EstimatorRegistry, MetricSet, Period, Result,
    SnapshotSource, StatementSource, ValuationConfig, ValuationError,
    cash_flow::{FcfeEstimator, FcffEstimator},
    cost_of_capital::WaccEstimator,
    growth::{FirmGrowthEstimator, ShareholderGrowthEstimator},
    source::{CompanyInfoSource, parse_date},
};
use serde::Serialize;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "dcf")]
#[command(about = "Discounted-cash-flow equity valuation", long_about = None)]
#[command(version)]
struct Cli {
    /// Log intermediate values (overrides RUST_LOG)
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Print results as JSON
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List all pipeline estimators
    List,
    /// Show information about a specific estimator
    Info {
        /// Estimator name
        estimator: String,
    },
    /// Estimate the per-share value of a ticker
    Value(DataArgs),
    /// Free cash flow to equity
    Fcfe {
        #[command(flatten)]
        data: DataArgs,
        /// Averaging window in periods
        #[arg(long, default_value_t = 1)]
        years: usize,
    },
    /// Free cash flow to the firm
    Fcff {
        #[command(flatten)]
        data: DataArgs,
        /// Periods back from the most recent
        #[arg(long, default_value_t = 0)]
        lag: usize,
    },
    /// Cost of equity and WACC
    Wacc(DataArgs),
    /// Firm and shareholder growth
    Growth {
        #[command(flatten)]
        data: DataArgs,
        /// Window in periods
        #[arg(long, default_value_t = 4)]
        years: usize,
    },
}

#[derive(Args)]
struct DataArgs {
    /// Ticker symbol
    ticker: String,
    /// JSON snapshot with statements, prices and company info
    #[arg(long)]
    snapshot: PathBuf,
    /// Statement period (annual or quarterly)
    #[arg(long, default_value = "annual")]
    period: Period,
    /// Valuation date, YYYY-MM-DD (defaults to today)
    #[arg(long)]
    as_of: Option<String>,
    /// JSON valuation config; missing fields take defaults
    #[arg(long)]
    config: Option<PathBuf>,
}

/// Everything a data-driven subcommand needs.
struct Loaded {
    ticker: String,
    period: Period,
    as_of: NaiveDate,
    source: SnapshotSource,
    config: ValuationConfig,
}

impl DataArgs {
    fn load(&self) -> Result<Loaded> {
        let as_of = match &self.as_of {
            Some(date) => parse_date(date)?,
            None => chrono::Local::now().date_naive(),
        };
        let config = match &self.config {
            Some(path) => serde_json::from_str(&std::fs::read_to_string(path)?)?,
            None => ValuationConfig::default(),
        };
        tracing::debug!(snapshot = %self.snapshot.display(), %as_of, "loading snapshot");
        Ok(Loaded {
            ticker: self.ticker.clone(),
            period: self.period,
            as_of,
            source: SnapshotSource::from_path(&self.snapshot)?,
            config,
        })
    }
}

impl Loaded {
    fn metrics(&self) -> Result<MetricSet> {
        MetricSet::extract(&self.source.statements(&self.ticker, self.period)?)
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);
    let registry = EstimatorRegistry::with_defaults();

    let outcome = match &cli.command {
        Commands::List => list_estimators(&registry, cli.json),
        Commands::Info { estimator } => show_estimator_info(&registry, estimator, cli.json),
        Commands::Value(data) => value(data, cli.json),
        Commands::Fcfe { data, years } => fcfe(data, *years, cli.json),
        Commands::Fcff { data, lag } => fcff(data, *lag, cli.json),
        Commands::Wacc(data) => wacc(data, cli.json),
        Commands::Growth { data, years } => growth(data, *years, cli.json),
    };

    match outcome {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        }
    }
}

/// Log to stderr, `warn` unless RUST_LOG or `--verbose` say otherwise.
fn init_tracing(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// List all estimators grouped by pipeline stage.
fn list_estimators(registry: &EstimatorRegistry, json: bool) -> Result<()> {
    let all_info = registry.all_info();
    if json {
        return print_json(&all_info);
    }

    println!("Pipeline estimators ({} total)\n", registry.len());
    let mut current = None;
    for info in all_info {
        if current != Some(info.stage) {
            if current.is_some() {
                println!();
            }
            println!("{}:", info.stage);
            current = Some(info.stage);
        }
        println!("  {} - {}", info.name, info.description);
    }
    Ok(())
}

/// Show detailed information about a specific estimator.
fn show_estimator_info(registry: &EstimatorRegistry, name: &str, json: bool) -> Result<()> {
    let Some(info) = registry.info(name) else {
        eprintln!("Available estimators:");
        for name in registry.names() {
            eprintln!("  {name}");
        }
        return Err(ValuationError::Computation(format!("estimator '{name}' not found")));
    };
    if json {
        return print_json(&info);
    }

    println!("Estimator: {}", info.name);
    println!("Stage: {}", info.stage);
    println!("Description: {}", info.description);
    println!("Minimum periods: {}", info.min_periods);
    println!("Required metrics:");
    for metric in &info.required_metrics {
        println!("  - {} ({})", metric, metric.aliases().join(", "));
    }
    Ok(())
}

fn value(data: &DataArgs, json: bool) -> Result<()> {
    let loaded = data.load()?;
    let report = DcfValuation::from_source(&loaded.source)
        .with_config(loaded.config)
        .estimate_per_share(&loaded.ticker, loaded.period, loaded.as_of)?;
    if json {
        print_json(&report)
    } else {
        println!("{report}");
        Ok(())
    }
}

fn fcfe(data: &DataArgs, years: usize, json: bool) -> Result<()> {
    let loaded = data.load()?;
    let result = FcfeEstimator.estimate(&loaded.metrics()?, years)?;
    if json {
        return print_json(&result);
    }

    println!("FCFE ({} periods): {:.2}", result.periods, result.fcfe);
    println!("  operating cash flow  {:.2}", result.operating_cash_flow);
    println!("  capital expenditure  {:.2}", result.capital_expenditure);
    println!("  repayment of debt    {:.2}", result.repayment_of_debt);
    println!("  issuance of debt     {:.2}", result.issuance_of_debt);
    println!("  capex / ocf          {}", format_ratio(result.capex_to_ocf));
    println!("  repayment / issuance {}", format_ratio(result.repayment_to_issuance));
    Ok(())
}

fn fcff(data: &DataArgs, lag: usize, json: bool) -> Result<()> {
    let loaded = data.load()?;
    let result = FcffEstimator.estimate(&loaded.metrics()?, lag)?;
    if json {
        return print_json(&result);
    }

    println!("FCFF: {:.2}", result.fcff);
    println!("  ebitda               {:.2}", result.ebitda);
    println!("  tax provision        {:.2}", result.tax_provision);
    println!("  capital expenditure  {:.2}", result.capital_expenditure);
    println!("  non-cash wc change   {:.2}", result.change_in_non_cash_working_capital);
    Ok(())
}

fn wacc(data: &DataArgs, json: bool) -> Result<()> {
    let loaded = data.load()?;
    let result = WaccEstimator::with_config(loaded.config.wacc.clone()).estimate(
        &loaded.ticker,
        &loaded.metrics()?,
        &loaded.source,
        loaded.as_of,
    )?;
    if json {
        return print_json(&result);
    }

    println!("WACC: {:.4}", result.wacc);
    println!("  cost of equity       {:.4}", result.cost_of_equity);
    println!("  risk-free rate       {:.4}", result.risk_free_rate);
    println!("  market risk premium  {:.4}", result.market_risk_premium);
    println!("  beta                 {:.3} ({})", result.beta, result.beta_source);
    println!("  cost of debt         {:.4}", result.cost_of_debt);
    println!("  tax rate             {:.4}", result.effective_tax_rate);
    println!("  weights (E / D)      {:.3} / {:.3}", result.equity_weight, result.debt_weight);
    if !result.fallbacks.is_empty() {
        println!("  defaults used        {}", result.fallbacks.join(", "));
    }
    Ok(())
}

#[derive(Serialize)]
struct GrowthOutput {
    firm: dcf::growth::FirmGrowthResult,
    firm_average: dcf::growth::AverageGrowthResult,
    shareholder: dcf::growth::ShareholderGrowthResult,
}

fn growth(data: &DataArgs, years: usize, json: bool) -> Result<()> {
    let loaded = data.load()?;
    let metrics = loaded.metrics()?;
    let company = loaded.source.company_info(&loaded.ticker)?;

    let firm_estimator = FirmGrowthEstimator::with_config(loaded.config.firm_growth.clone());
    let output = GrowthOutput {
        firm: firm_estimator.estimate(&metrics)?,
        firm_average: firm_estimator.estimate_average(&metrics, years)?,
        shareholder: ShareholderGrowthEstimator::with_config(loaded.config.shareholder_growth.clone())
            .estimate(&metrics, company.payout_ratio, years)?,
    };
    if json {
        return print_json(&output);
    }

    println!("Firm growth: {:.4}", output.firm.growth);
    println!("  reinvestment rate    {:.4}", output.firm.reinvestment_rate);
    println!("  roic                 {:.4}", output.firm.roic);
    println!(
        "Average firm growth ({} of {} periods): {:.4}",
        output.firm_average.periods_used,
        output.firm_average.periods.len(),
        output.firm_average.average_growth
    );
    for period in &output.firm_average.periods {
        let marker = if period.included { "" } else { " (excluded)" };
        println!("  {}  {:.4}{marker}", period.period_end, period.growth);
    }
    println!("Shareholder growth: {:.4}", output.shareholder.growth);
    println!("  roe                  {:.4}", output.shareholder.roe);
    println!("  retention ratio      {:.4}", output.shareholder.retention_ratio);
    Ok(())
}

fn format_ratio(ratio: Option<f64>) -> String {
    ratio.map_or_else(|| "n/a".to_string(), |r| format!("{r:.4}"))
}
