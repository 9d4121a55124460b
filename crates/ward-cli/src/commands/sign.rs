//! `sign`: interactive signing through an in-process relay.
//!
//! The command plays both contexts. The requesting side asks its
//! signing engine to sign without a password, which goes through the
//! relay to the background. The background opens a prompt, served here
//! on the terminal, whose session signs with the typed password and
//! delivers the outcome back.

use std::path::PathBuf;
use std::sync::Arc;

use clap::Args;
use tokio::sync::mpsc;
use ward_relay::{
    Background, ChannelPrompt, PopupGeometry, PopupRequest, RelayClient, RelayRequest, SignOutcome,
    SignSession,
};
use ward_signer::{SignRequest, SigningEngine};
use ward_types::{Address, Result, SignMode, WardError};

use crate::context::{self, Context};
use crate::output;
use crate::GlobalOpts;

const MAX_ATTEMPTS: usize = 3;

#[derive(Args)]
pub struct SignArgs {
    /// JSON file holding the sign doc.
    doc: PathBuf,

    /// Slave contract address the doc is signed for.
    #[arg(long)]
    signer: Address,

    /// Sign mode of the doc.
    #[arg(long, default_value = "amino")]
    mode: SignMode,
}

pub async fn run(args: SignArgs, opts: &GlobalOpts) -> Result<()> {
    let text = std::fs::read_to_string(&args.doc).map_err(|e| WardError::ConfigError {
        reason: format!("failed to read {}: {e}", args.doc.display()),
    })?;
    let tx = serde_json::from_str(&text).map_err(|e| WardError::InvalidSignDoc {
        reason: format!("{} is not JSON: {e}", args.doc.display()),
    })?;
    let request = SignRequest::from_parts(args.mode, args.signer, tx)?;

    let ctx = Context::open(opts)?;
    let (surface, popups) = ChannelPrompt::new(1);
    let (hub, background) = Background::spawn(ctx.store.clone(), Arc::new(surface), ctx.config.relay);

    let page = Arc::new(hub.client());
    let requester = SigningEngine::new(ctx.custodian.clone()).with_delegate(page);
    let prompt = tokio::spawn(serve_prompt(
        popups,
        Arc::new(SigningEngine::new(ctx.custodian.clone())),
        Arc::new(hub.client()),
        opts.json,
    ));

    let signed = requester.sign(&request, None).await;

    hub.shutdown();
    let _ = background.await;
    if signed.is_err() {
        prompt.abort();
    }
    match prompt.await {
        Ok(Err(e)) => tracing::debug!(error = %e, "sign prompt ended with error"),
        Err(e) if !e.is_cancelled() => tracing::warn!(error = %e, "sign prompt task failed"),
        _ => {}
    }

    let response = signed?;
    output::print_value(&response, opts.json);
    Ok(())
}

// ---------------------------------------------------------------------------
// Terminal prompt
// ---------------------------------------------------------------------------

async fn serve_prompt(
    mut popups: mpsc::Receiver<(PopupRequest, PopupGeometry)>,
    engine: Arc<SigningEngine>,
    relay: Arc<RelayClient>,
    json: bool,
) -> Result<()> {
    let Some((popup, geometry)) = popups.recv().await else {
        return Ok(());
    };
    tracing::debug!(rid = %popup.rid, width = geometry.width, height = geometry.height, "sign prompt opened");

    let session = match SignSession::from_popup(&popup, engine, relay.clone()) {
        Ok(session) => session,
        Err(e) => {
            let reject = RelayRequest::SignDeliver {
                request_id: popup.rid,
                outcome: SignOutcome::Rejected { reason: e.to_string() },
            };
            relay.send_and_wait(reject, relay.request_timeout()).await?;
            return Err(e);
        }
    };

    show_request(&popup);
    let outcome = interact(&session, json).await;
    if !session.is_completed() {
        session.dismiss().await?;
    }
    outcome
}

async fn interact(session: &SignSession, json: bool) -> Result<()> {
    let attempts = if context::password_from_env() { 1 } else { MAX_ATTEMPTS };
    for attempt in 1..=attempts {
        let password = tokio::task::spawn_blocking(|| context::read_password("Password (empty to cancel): "))
            .await
            .map_err(|e| WardError::RelayError {
                reason: format!("password prompt failed: {e}"),
            })??;
        if password.is_empty() {
            return session.dismiss().await;
        }
        match session.submit(&password).await {
            Ok(_) => return Ok(()),
            Err(WardError::IncorrectPassword) => {
                output::print_warning(&format!("incorrect password ({attempt}/{attempts})"), json);
            }
            Err(e) => return Err(e),
        }
    }
    session.dismiss().await
}

fn show_request(popup: &PopupRequest) {
    let doc = serde_json::from_str::<serde_json::Value>(&popup.tx)
        .and_then(|value| serde_json::to_string_pretty(&value))
        .unwrap_or_else(|_| popup.tx.clone());
    eprintln!("Signature requested by {} ({})", popup.who, popup.sign_mode);
    eprintln!("{doc}");
}
