//! Account commands: `init`, `preview`, `address`.

use clap::Args;
use ward_crypto::mnemonic::generate_mnemonic;
use ward_types::{Result, WardError};
use ward_wallet::{DeriveOptions, HdWallet};
use zeroize::Zeroizing;

use crate::context::{self, Context, MNEMONIC_ENV};
use crate::output;
use crate::GlobalOpts;

#[derive(Args)]
pub struct InitArgs {
    /// Mnemonic to import. Falls back to WARD_MNEMONIC, then to a new
    /// 24-word phrase.
    #[arg(long)]
    mnemonic: Option<String>,

    /// Replace an existing account.
    #[arg(long)]
    force: bool,
}

#[derive(Args)]
pub struct PreviewArgs {
    /// Mnemonic to check. Falls back to WARD_MNEMONIC, then to stdin.
    mnemonic: Option<String>,
}

#[derive(Args)]
pub struct AddressArgs {
    /// Also resolve the host and slave contracts.
    #[arg(long)]
    contracts: bool,
}

pub async fn init(args: InitArgs, opts: &GlobalOpts) -> Result<()> {
    let ctx = Context::open(opts)?;
    if ctx.custodian.has_account().await? && !args.force {
        return Err(WardError::ConfigError {
            reason: format!(
                "an account already exists in {}; pass --force to replace it",
                opts.data_dir.display()
            ),
        });
    }

    let supplied = args
        .mnemonic
        .or_else(|| std::env::var(MNEMONIC_ENV).ok())
        .map(Zeroizing::new);
    let generated = supplied.is_none();
    let phrase = match supplied {
        Some(phrase) => phrase,
        None => Zeroizing::new(generate_mnemonic()?.as_str().to_owned()),
    };

    let password = context::read_password("Password: ")?;
    if password.is_empty() {
        return Err(WardError::ConfigError {
            reason: "password must not be empty".into(),
        });
    }
    if !context::password_from_env() {
        let confirm = context::read_secret_line("Confirm password: ")?;
        if confirm.as_str() != password.expose() {
            return Err(WardError::ConfigError {
                reason: "passwords do not match".into(),
            });
        }
    }

    let address = ctx
        .custodian
        .create_from_mnemonic(&phrase, &password, &ctx.derive_options())
        .await?;

    if generated {
        output::print_warning("write down the mnemonic below; it is shown only once", opts.json);
        output::print_kv(
            &[("address", address.to_string()), ("mnemonic", phrase.to_string())],
            opts.json,
        );
    } else {
        output::print_kv(&[("address", address.to_string())], opts.json);
    }
    if !opts.json {
        output::print_success("account created", false);
    }
    Ok(())
}

pub fn preview(args: PreviewArgs, opts: &GlobalOpts) -> Result<()> {
    let config = context::load_config(opts)?;
    let phrase = match args.mnemonic.or_else(|| std::env::var(MNEMONIC_ENV).ok()) {
        Some(phrase) => Zeroizing::new(phrase),
        None => context::read_secret_line("Mnemonic: ")?,
    };
    let address = HdWallet::from_mnemonic(&phrase, DeriveOptions::from_config(&config))?.address()?;
    output::print_kv(&[("address", address.to_string())], opts.json);
    Ok(())
}

pub async fn address(args: AddressArgs, opts: &GlobalOpts) -> Result<()> {
    let ctx = Context::open(opts)?;
    let address = ctx.custodian.get_local_address().await?;
    if !args.contracts {
        output::print_kv(&[("address", address.to_string())], opts.json);
        return Ok(());
    }

    let host = ctx.custodian.get_host_contract().await?;
    let slaves = ctx.custodian.get_slave_contracts().await?;
    if opts.json {
        let obj = serde_json::json!({
            "address": address,
            "host": host,
            "slaves": slaves,
        });
        println!("{obj}");
        return Ok(());
    }

    output::print_kv(&[("address", address.to_string()), ("host", host.to_string())], false);
    let rows: Vec<Vec<String>> = slaves
        .iter()
        .map(|(chain_id, slave)| vec![chain_id.to_string(), slave.to_string()])
        .collect();
    output::print_table(&["chain", "slave"], &rows, false);
    Ok(())
}
