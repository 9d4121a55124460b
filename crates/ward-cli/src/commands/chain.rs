//! Chain commands: `sequence`, `balances`, `recovery`, `broadcast`.

use std::path::PathBuf;

use base64::Engine;
use clap::Args;
use ward_types::{Address, Result, WardError};

use crate::context::Context;
use crate::output;
use crate::GlobalOpts;

#[derive(Args)]
pub struct SequenceArgs {
    /// Chain to query. Defaults to the host chain.
    #[arg(long)]
    chain_id: Option<String>,

    /// Account to query. Defaults to the local address.
    #[arg(long)]
    address: Option<Address>,
}

#[derive(Args)]
pub struct BroadcastArgs {
    /// Target chain.
    chain_id: String,

    #[command(flatten)]
    source: TxSource,
}

#[derive(Args)]
#[group(required = true, multiple = false)]
struct TxSource {
    /// Base64-encoded transaction bytes.
    #[arg(long)]
    tx: Option<String>,

    /// File holding raw transaction bytes.
    #[arg(long)]
    file: Option<PathBuf>,
}

impl TxSource {
    fn read(&self) -> Result<Vec<u8>> {
        if let Some(encoded) = &self.tx {
            return base64::engine::general_purpose::STANDARD
                .decode(encoded.trim())
                .map_err(|e| WardError::ConfigError {
                    reason: format!("--tx is not valid base64: {e}"),
                });
        }
        match &self.file {
            Some(path) => std::fs::read(path).map_err(|e| WardError::ConfigError {
                reason: format!("failed to read {}: {e}", path.display()),
            }),
            None => Err(WardError::ConfigError {
                reason: "either --tx or --file is required".into(),
            }),
        }
    }
}

pub async fn sequence(args: SequenceArgs, opts: &GlobalOpts) -> Result<()> {
    let ctx = Context::open(opts)?;
    let chain_id = args
        .chain_id
        .unwrap_or_else(|| ctx.config.host_chain.chain_id.to_string());
    let data = ctx.custodian.get_sequence(&chain_id, args.address.as_ref()).await?;
    output::print_kv(
        &[
            ("chain_id", chain_id),
            ("account_number", data.account_number.to_string()),
            ("sequence", data.sequence.to_string()),
        ],
        opts.json,
    );
    Ok(())
}

pub async fn balances(opts: &GlobalOpts) -> Result<()> {
    let ctx = Context::open(opts)?;
    let accounts = ctx.custodian.get_all_balances().await?;

    let mut rows = Vec::new();
    for account in &accounts {
        for coin in &account.balances {
            let (denom, amount) = match ctx.custodian.full_denom(&coin.denom, account.chain_id.as_str()) {
                Ok(meta) => (meta.coin_denom, output::format_amount(coin.amount.u128(), meta.coin_decimals)),
                Err(_) => (coin.denom.clone(), coin.amount.to_string()),
            };
            rows.push(vec![
                account.chain_id.to_string(),
                account.name.clone(),
                account.address.to_string(),
                denom,
                amount,
            ]);
        }
    }
    output::print_table(&["chain", "name", "address", "denom", "amount"], &rows, opts.json);
    Ok(())
}

pub async fn recovery(opts: &GlobalOpts) -> Result<()> {
    let ctx = Context::open(opts)?;
    let state = ctx.custodian.get_recovery_state().await?;
    output::print_value(&state, opts.json);
    Ok(())
}

pub async fn broadcast(args: BroadcastArgs, opts: &GlobalOpts) -> Result<()> {
    let tx_bytes = args.source.read()?;
    let ctx = Context::open(opts)?;
    let response = ctx.custodian.broadcast(&args.chain_id, &tx_bytes).await?;
    output::print_kv(
        &[
            ("tx_hash", response.transaction_hash),
            ("code", response.code.to_string()),
        ],
        opts.json,
    );
    Ok(())
}
