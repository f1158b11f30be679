//! coinflow-cli: inspect a wallet snapshot and preview sends.
//!
//! Reads a JSON snapshot of chain data, reconciles it through the wallet
//! core and prints balances, history and send quotes.

mod snapshot;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use chrono::{TimeZone, Utc};
use clap::{Args, Parser, Subcommand, ValueEnum};
use coinflow_core::amount::{format_amount, format_signed, Rate, Rounding};
use coinflow_core::constants::DECIMALS;
use coinflow_core::types::{InputType, TransactionStatus};
use coinflow_core::{BalanceAdapter, TransactionFilter, TransactionRecord, TxHash, WalletConfig};
use coinflow_send::{FeeRatePriority, SendSession, SendStateViewItemFactory, SendViewItem};
use tracing::{debug, info};

use crate::snapshot::{SnapshotChain, StaticQuotes};

/// Coinflow wallet inspector.
#[derive(Parser)]
#[command(name = "coinflow-cli")]
#[command(version, about = "Inspect a wallet snapshot and preview sends.")]
struct Cli {
    /// Wallet snapshot (JSON).
    #[arg(short, long)]
    snapshot: PathBuf,

    /// Config file (default: <config dir>/coinflow/config.toml, if present).
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Log level filter; RUST_LOG takes precedence.
    #[arg(long)]
    log_level: Option<String>,

    /// Log output format ("text" or "json").
    #[arg(long, default_value = "text")]
    log_format: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show the spendable balance.
    Balance,
    /// List transactions, newest first.
    History(HistoryArgs),
    /// Show one transaction as JSON.
    Tx {
        /// Transaction hash (hex).
        hash: String,
    },
    /// Preview a send.
    Quote(QuoteArgs),
    /// Show the largest sendable amount.
    Max(MaxArgs),
}

#[derive(Clone, Copy, ValueEnum)]
enum FilterArg {
    All,
    Incoming,
    Outgoing,
}

impl From<FilterArg> for TransactionFilter {
    fn from(f: FilterArg) -> Self {
        match f {
            FilterArg::All => TransactionFilter::All,
            FilterArg::Incoming => TransactionFilter::Incoming,
            FilterArg::Outgoing => TransactionFilter::Outgoing,
        }
    }
}

#[derive(Args)]
struct HistoryArgs {
    #[arg(short, long, value_enum, default_value = "all")]
    filter: FilterArg,

    /// Start after this transaction hash.
    #[arg(long)]
    from: Option<String>,

    /// Page size (default: from config).
    #[arg(short, long)]
    limit: Option<usize>,
}

#[derive(Args)]
struct QuoteOverrides {
    /// Exchange rate override (currency per coin).
    #[arg(long)]
    rate: Option<String>,

    /// Fee rate override in base units per virtual byte.
    #[arg(long)]
    fee_rate: Option<u64>,

    /// Fee priority.
    #[arg(long, default_value = "medium")]
    priority: String,

    /// Recipient address or payment URI.
    #[arg(short, long)]
    address: Option<String>,
}

#[derive(Args)]
struct QuoteArgs {
    /// Amount as a decimal string.
    #[arg(long)]
    amount: String,

    /// Interpret the amount in the fiat currency.
    #[arg(long)]
    currency: bool,

    #[command(flatten)]
    quotes: QuoteOverrides,
}

#[derive(Args)]
struct MaxArgs {
    /// Express the maximum in the fiat currency.
    #[arg(long)]
    currency: bool,

    #[command(flatten)]
    quotes: QuoteOverrides,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = load_config(cli.config.as_deref())?;
    init_logging(cli.log_level.as_deref().unwrap_or(&config.log_level), &cli.log_format);

    let chain = Arc::new(SnapshotChain::load(&cli.snapshot, config.dust_threshold)?);
    let wallet = BalanceAdapter::new(chain.clone(), &config);
    wallet.start().context("Failed to load wallet snapshot")?;
    info!(
        tip = wallet.last_block_height(),
        transactions = wallet.pool().len(),
        "wallet loaded"
    );

    match cli.command {
        Commands::Balance => show_balance(&wallet, &chain, &config),
        Commands::History(args) => show_history(&wallet, &config, args),
        Commands::Tx { hash } => show_transaction(&wallet, &hash),
        Commands::Quote(args) => quote(&wallet, chain, &config, args).await,
        Commands::Max(args) => max(&wallet, chain, &config, args).await,
    }
}

fn load_config(path: Option<&Path>) -> Result<WalletConfig> {
    let default_path = WalletConfig::default_path();
    let path = match path {
        Some(p) => Some(p),
        None if default_path.exists() => Some(default_path.as_path()),
        None => None,
    };
    WalletConfig::load(path).context("Failed to load config")
}

fn init_logging(level_str: &str, format: &str) {
    use tracing_subscriber::filter::EnvFilter;
    use tracing_subscriber::fmt;
    use tracing_subscriber::prelude::*;

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level_str));

    if format == "json" {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().with_target(true).with_level(true))
            .init();
    }
}

fn show_balance(wallet: &BalanceAdapter, chain: &SnapshotChain, config: &WalletConfig) -> Result<()> {
    let factory = SendStateViewItemFactory::from_config(config);
    let balance = wallet.balance();
    println!("Balance: {}", factory.coin_text(balance));
    if let Some(rate) = snapshot_rate(chain)? {
        let value = rate.to_currency(balance, Rounding::Nearest)?;
        println!("Value:   {}", factory.currency_text(value, Rounding::Nearest));
    }
    println!("Tip:     {}", wallet.last_block_height());
    println!("Receive: {}", wallet.receive_address());
    Ok(())
}

fn show_history(wallet: &BalanceAdapter, config: &WalletConfig, args: HistoryArgs) -> Result<()> {
    let from = args.from.as_deref().map(parse_hash).transpose()?;
    let limit = args.limit.unwrap_or(config.page_size);
    let page = wallet.transactions(args.filter.into(), from.as_ref(), limit);
    if page.is_empty() {
        println!("No transactions.");
        return Ok(());
    }
    for record in &page {
        println!("{}", history_line(record, &config.coin_code));
    }
    if page.len() == limit {
        if let Some(last) = page.last() {
            println!("More: --from {}", last.hash);
        }
    }
    Ok(())
}

fn history_line(record: &TransactionRecord, coin_code: &str) -> String {
    let date = record
        .timestamp
        .and_then(|t| Utc.timestamp_opt(t as i64, 0).single())
        .map(|d| d.format("%Y-%m-%d %H:%M").to_string())
        .unwrap_or_else(|| "pending".to_string());
    let status = match record.status {
        TransactionStatus::Processing => "processing".to_string(),
        TransactionStatus::Verifying { progress } => format!("verifying {:.0}%", progress * 100.0),
        TransactionStatus::Completed => "completed".to_string(),
    };
    format!(
        "{}  {:<16}  {:>20} {}  {}",
        record.hash,
        date,
        format_signed(record.amount, DECIMALS),
        coin_code,
        status
    )
}

fn show_transaction(wallet: &BalanceAdapter, hash: &str) -> Result<()> {
    let hash = parse_hash(hash)?;
    let Some(record) = wallet.transaction(&hash) else {
        bail!("Transaction not found: {hash}");
    };
    println!("{}", serde_json::to_string_pretty(&record)?);
    Ok(())
}

fn parse_hash(s: &str) -> Result<TxHash> {
    s.parse::<TxHash>()
        .with_context(|| format!("Invalid transaction hash: {s}"))
}

fn snapshot_rate(chain: &SnapshotChain) -> Result<Option<Rate>> {
    chain
        .snapshot()
        .rate
        .as_deref()
        .map(|r| r.parse::<Rate>().with_context(|| format!("Invalid rate in snapshot: {r}")))
        .transpose()
}

fn quotes(chain: &SnapshotChain, overrides: &QuoteOverrides) -> Result<StaticQuotes> {
    let rate = match overrides.rate.as_deref() {
        Some(r) => Some(r.parse::<Rate>().with_context(|| format!("Invalid rate: {r}"))?),
        None => snapshot_rate(chain)?,
    };
    let mut fee_rates = chain.snapshot().fee_rates.clone();
    if let Some(fee_rate) = overrides.fee_rate {
        for priority in FeeRatePriority::ALL {
            fee_rates.insert(priority, fee_rate);
        }
    }
    Ok(StaticQuotes { rate, fee_rates })
}

/// Open a send session with quotes loaded and the address entered.
async fn open_session(
    wallet: &BalanceAdapter,
    chain: Arc<SnapshotChain>,
    config: &WalletConfig,
    overrides: &QuoteOverrides,
    currency: bool,
) -> Result<SendSession> {
    let quotes = quotes(&chain, overrides)?;
    let priority = overrides
        .priority
        .parse::<FeeRatePriority>()
        .map_err(anyhow::Error::msg)?;

    let mut session = SendSession::from_config(chain, config, wallet.balance());
    session.start();
    session.retrieve_quotes(&quotes, &quotes).await;
    if session.is_dismissed() {
        bail!("Exchange rate unavailable");
    }

    let wanted = if currency { InputType::Currency } else { InputType::Coin };
    if session.input().input_type != wanted {
        session.on_switch_clicked();
        if session.input().input_type != wanted {
            bail!("Exchange rate unavailable");
        }
    }
    session.on_fee_priority_change(priority.index());
    if let Some(address) = &overrides.address {
        session.on_address_enter(address);
    }
    debug!(session = ?session, "send session ready");
    Ok(session)
}

async fn quote(
    wallet: &BalanceAdapter,
    chain: Arc<SnapshotChain>,
    config: &WalletConfig,
    args: QuoteArgs,
) -> Result<()> {
    let mut session = open_session(wallet, chain, config, &args.quotes, args.currency).await?;
    session.on_paste_amount(&args.amount)?;
    let item = session.view_item()?;
    print_view_item(&item);

    if let Some(confirmation) = session.on_send_clicked() {
        println!();
        println!("To:     {}", confirmation.address);
        println!("Amount: {}", with_currency(&confirmation.amount_text, &confirmation.amount_currency_text));
        println!("Fee:    {}", with_currency(&confirmation.fee_text, &confirmation.fee_currency_text));
        println!("Total:  {}", with_currency(&confirmation.total_text, &confirmation.total_currency_text));
    }
    Ok(())
}

async fn max(
    wallet: &BalanceAdapter,
    chain: Arc<SnapshotChain>,
    config: &WalletConfig,
    args: MaxArgs,
) -> Result<()> {
    let mut session = open_session(wallet, chain, config, &args.quotes, args.currency).await?;
    session.on_max_clicked();
    let item = session.view_item()?;
    print_view_item(&item);
    let decimals = SendStateViewItemFactory::from_config(config).decimals(item.input_type);
    println!(
        "Max:    {}",
        format_amount(session.input().amount, decimals, Rounding::Down)
    );
    Ok(())
}

fn with_currency(coin: &str, currency: &Option<String>) -> String {
    match currency {
        Some(c) => format!("{coin} ({c})"),
        None => coin.to_string(),
    }
}

fn print_view_item(item: &SendViewItem) {
    use coinflow_send::view_item::{AddressInfo, HintInfo};

    println!("Amount: {}", item.amount.as_deref().unwrap_or("-"));
    match &item.hint {
        Some(HintInfo::Amount(a)) => println!("        ≈ {a}"),
        Some(HintInfo::Error(e)) => println!("        ! {e}"),
        None => {}
    }
    match &item.address_info {
        Some(AddressInfo::Valid(a)) => println!("To:     {a}"),
        Some(AddressInfo::Invalid { address, error }) => println!("To:     {address} ({error})"),
        None => println!("To:     -"),
    }
    let fee = item.fee_info.primary.as_deref().unwrap_or("pending");
    println!("Fee:    {}", with_currency(fee, &item.fee_info.secondary));
    if let Some(e) = &item.fee_info.error {
        println!("        ! {e}");
    }
    println!("Send:   {}", if item.send_enabled { "enabled" } else { "disabled" });
}
