//! Relay round trips between clients, the background and a sign prompt.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use serde_json::json;
use tokio::sync::mpsc;
use ward_chain::{InMemoryChain, InMemoryConnector};
use ward_relay::{
    Background, ChannelPrompt, PopupGeometry, PopupRequest, RelayHub, RelayRequest, SignSession,
};
use ward_signer::{AminoRequest, SignRequest, SigningEngine, StdFee, StdSignDoc};
use ward_storage::{CredentialStore, KeyValueStore, MemoryStore, DEFAULT_ADDRESS_KEY};
use ward_types::config::{ChainConfig, KdfConfig, RelayConfig, WardConfig};
use ward_types::{Address, ChainId, WardError};
use ward_wallet::{DeriveOptions, KeyCustodian, Password};

type TestResult = std::result::Result<(), WardError>;

const MNEMONIC_A: &str = "abandon abandon abandon abandon abandon abandon abandon abandon \
    abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon \
    abandon abandon abandon abandon abandon art";
const PASSPHRASE: &str = "correct horse battery staple";

// ---------------------------------------------------------------------------
// Fixture
// ---------------------------------------------------------------------------

struct Relay {
    hub: RelayHub,
    store: Arc<MemoryStore>,
    popups: mpsc::Receiver<(PopupRequest, PopupGeometry)>,
}

fn relay_config() -> RelayConfig {
    RelayConfig {
        request_timeout_secs: Some(5),
        ..RelayConfig::default()
    }
}

fn start_relay() -> Relay {
    let store = Arc::new(MemoryStore::new());
    let (prompt, popups) = ChannelPrompt::new(4);
    let (hub, _task) = Background::spawn(store.clone(), Arc::new(prompt), relay_config());
    Relay { hub, store, popups }
}

struct Wallet {
    custodian: Arc<KeyCustodian>,
    slave: Address,
}

/// Account and contracts on chain `foo-1`, stored in the relay's store.
async fn wallet(relay: &Relay) -> std::result::Result<Wallet, WardError> {
    let chain = ChainConfig {
        chain_id: ChainId::from("foo-1"),
        endpoint: "http://127.0.0.1:1317".into(),
        prefix: "wasm".into(),
        name: "Foo".into(),
        denoms: vec![],
    };
    let mut config = WardConfig::default();
    config.slave_chains = BTreeMap::from([(chain.chain_id.clone(), chain.clone())]);
    config.host_chain = chain;
    config.factory_contract = Address::from_bytes("wasm", &[0xfa; 20])?;
    config.kdf = KdfConfig {
        m_cost_kib: 256,
        t_cost: 1,
        p_cost: 1,
    };
    config.relay = relay_config();
    let config = Arc::new(config);

    let connector = Arc::new(InMemoryConnector::new());
    let ledger = connector.add_chain(InMemoryChain::new("foo-1"))?;
    let custodian = Arc::new(KeyCustodian::new(
        CredentialStore::new(relay.store.clone()),
        config.clone(),
        connector,
    ));
    let options = DeriveOptions {
        hd_path: config.hd_path.clone(),
        prefix: "wasm".into(),
    };
    let local = custodian
        .create_from_mnemonic(MNEMONIC_A, &Password::new(PASSPHRASE), &options)
        .await?;

    let host = Address::from_bytes("wasm", &[0x11; 20])?;
    let slave = Address::from_bytes("wasm", &[0x22; 20])?;
    ledger.set_smart_response(
        &config.factory_contract,
        &json!({"get_host_contract": {"owner": local.as_str()}}),
        json!({"host": host.as_str()}),
    )?;
    ledger.set_smart_response(
        &host,
        &json!({"get_slaves": {}}),
        json!({"slaves": {"foo-1": slave.as_str()}}),
    )?;
    Ok(Wallet { custodian, slave })
}

fn amino_request(signer: &Address, chain_id: &str) -> SignRequest {
    SignRequest::Amino(AminoRequest {
        signer: signer.clone(),
        sign_doc: StdSignDoc {
            chain_id: chain_id.into(),
            account_number: "5".into(),
            sequence: "1".into(),
            fee: StdFee {
                amount: vec![],
                gas: "250000".into(),
                ..StdFee::default()
            },
            msgs: vec![json!({"bank": {"send": {"amount": [{"denom": "ustake", "amount": "10"}]}}})],
            memo: String::new(),
        },
    })
}

async fn next_popup(relay: &mut Relay) -> std::result::Result<PopupRequest, WardError> {
    let received = tokio::time::timeout(Duration::from_secs(5), relay.popups.recv())
        .await
        .map_err(|_| WardError::Timeout {
            operation: "popup".into(),
        })?;
    let (popup, geometry) = received.ok_or_else(|| WardError::RelayError {
        reason: "prompt channel closed".into(),
    })?;
    assert_eq!((geometry.width, geometry.height), (400, 600));
    assert!(geometry.focused);
    Ok(popup)
}

// ---------------------------------------------------------------------------
// Storage round trips
// ---------------------------------------------------------------------------

#[tokio::test]
async fn get_key_returns_stored_value_or_empty() -> TestResult {
    let relay = start_relay();
    relay.store.set("__WARD_default_address", "wasm1abc").await?;
    let client = relay.hub.client();

    let found = client
        .send_and_wait(
            RelayRequest::GetKey {
                key: "__WARD_default_address".into(),
            },
            None,
        )
        .await?;
    assert_eq!(found, json!({"__WARD_default_address": "wasm1abc"}));

    let missing = client
        .send_and_wait(RelayRequest::GetKey { key: "nope".into() }, None)
        .await?;
    assert_eq!(missing, json!({}));
    assert_eq!(client.pending_listeners(), 0);
    Ok(())
}

#[tokio::test]
async fn completed_requests_leave_no_listener() -> TestResult {
    let relay = start_relay();
    relay.store.set("k", "v1").await?;
    let client = relay.hub.client();

    client
        .send_and_wait(RelayRequest::GetKey { key: "k".into() }, None)
        .await?;
    client
        .send_and_wait(
            RelayRequest::SetKey {
                entries: BTreeMap::from([("k".to_owned(), "v2".to_owned())]),
            },
            None,
        )
        .await?;
    assert_eq!(client.pending_listeners(), 0);

    // Unsolicited results of the same event names reach nobody.
    client.send(RelayRequest::GetKey { key: "k".into() }).await?;
    client
        .send(RelayRequest::SetKey {
            entries: BTreeMap::from([("k".to_owned(), "v3".to_owned())]),
        })
        .await?;

    let next = client
        .send_and_wait(RelayRequest::GetKey { key: "k".into() }, None)
        .await?;
    assert_eq!(next, json!({"k": "v3"}));
    assert_eq!(client.pending_listeners(), 0);
    Ok(())
}

#[tokio::test]
async fn concurrent_clients_get_their_own_answers() -> TestResult {
    let relay = start_relay();
    relay.store.set("a", "1").await?;
    relay.store.set("b", "2").await?;
    let first = relay.hub.client();
    let second = relay.hub.client();

    let (a, b) = tokio::join!(
        first.send_and_wait(RelayRequest::GetKey { key: "a".into() }, None),
        second.send_and_wait(RelayRequest::GetKey { key: "b".into() }, None),
    );
    assert_eq!(a?, json!({"a": "1"}));
    assert_eq!(b?, json!({"b": "2"}));
    Ok(())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn lagging_client_fails_instead_of_hanging() -> TestResult {
    let store = Arc::new(MemoryStore::new());
    store.set("k", "v").await?;
    let (prompt, _popups) = ChannelPrompt::new(1);
    let config = RelayConfig {
        request_timeout_secs: None,
        channel_capacity: 1,
        ..RelayConfig::default()
    };
    let (hub, _task) = Background::spawn(store, Arc::new(prompt), config);

    for _ in 0..20 {
        let mut noise = tokio::task::JoinSet::new();
        for _ in 0..8 {
            let client = hub.client();
            noise.spawn(async move {
                for _ in 0..32 {
                    let _ = client.send(RelayRequest::GetKey { key: "k".into() }).await;
                }
            });
        }

        let waiter = hub.client();
        let answer = tokio::time::timeout(
            Duration::from_secs(10),
            waiter.send_and_wait(RelayRequest::GetKey { key: "k".into() }, None),
        )
        .await
        .map_err(|_| WardError::Timeout {
            operation: "getKey under load".into(),
        })?;
        match answer {
            Ok(value) => assert_eq!(value, json!({"k": "v"})),
            Err(WardError::RelayError { .. }) => {}
            Err(e) => return Err(e),
        }
        assert_eq!(waiter.pending_listeners(), 0);
        while noise.join_next().await.is_some() {}
    }
    Ok(())
}

#[tokio::test]
async fn client_proxies_the_credential_store() -> TestResult {
    let relay = start_relay();
    let proxied = CredentialStore::new(Arc::new(relay.hub.client()));
    let address = Address::from_bytes("wasm", &[7u8; 20])?;

    assert!(!proxied.has_account().await?);
    proxied.save_account(&address, "{\"blob\":1}").await?;

    assert_eq!(proxied.default_address().await?, Some(address.clone()));
    assert_eq!(
        relay.store.get(DEFAULT_ADDRESS_KEY).await?,
        Some(address.to_string())
    );
    assert_eq!(
        proxied.encrypted_blob(&address).await?.as_deref(),
        Some("{\"blob\":1}")
    );
    Ok(())
}

#[tokio::test]
async fn wait_times_out_and_cleans_up() -> TestResult {
    let relay = start_relay();
    let client = relay.hub.client();
    let signer = Address::from_bytes("wasm", &[7u8; 20])?;

    let result = client
        .send_and_wait(
            RelayRequest::Sign {
                tx: json!({}),
                sign_mode: ward_types::SignMode::Amino,
                signer,
            },
            Some(Duration::from_millis(50)),
        )
        .await;
    assert!(matches!(result, Err(WardError::Timeout { .. })));
    assert_eq!(client.pending_listeners(), 0);
    Ok(())
}

#[tokio::test]
async fn dropped_wait_removes_listener() -> TestResult {
    let relay = start_relay();
    let client = relay.hub.client();
    let signer = Address::from_bytes("wasm", &[7u8; 20])?;

    let wait = client.send_and_wait(
        RelayRequest::Sign {
            tx: json!({}),
            sign_mode: ward_types::SignMode::Amino,
            signer,
        },
        None,
    );
    assert!(tokio::time::timeout(Duration::from_millis(50), wait).await.is_err());
    assert_eq!(client.pending_listeners(), 0);
    Ok(())
}

#[tokio::test]
async fn requests_fail_after_shutdown() -> TestResult {
    let store = Arc::new(MemoryStore::new());
    let (prompt, _popups) = ChannelPrompt::new(1);
    let (hub, task) = Background::spawn(store, Arc::new(prompt), relay_config());
    let client = hub.client();

    hub.shutdown();
    task.await.map_err(|e| WardError::RelayError {
        reason: e.to_string(),
    })?;

    let result = client
        .send_and_wait(RelayRequest::GetKey { key: "k".into() }, None)
        .await;
    assert!(matches!(result, Err(WardError::RelayError { .. })));
    Ok(())
}

// ---------------------------------------------------------------------------
// Sign prompt
// ---------------------------------------------------------------------------

#[tokio::test]
async fn prompt_signs_and_delivers_to_requester() -> TestResult {
    let mut relay = start_relay();
    let wallet = wallet(&relay).await?;

    let page = Arc::new(relay.hub.client());
    let requester = SigningEngine::new(wallet.custodian.clone()).with_delegate(page.clone());
    let request = amino_request(&wallet.slave, "foo-1");
    let pending = tokio::spawn(async move { requester.sign(&request, None).await });

    let popup = next_popup(&mut relay).await?;
    assert_eq!(popup.who, wallet.slave);
    let session = SignSession::from_query(
        &popup.to_query()?,
        Arc::new(SigningEngine::new(wallet.custodian.clone())),
        Arc::new(relay.hub.client()),
    )?;

    assert!(matches!(
        session.submit(&Password::new("wrong")).await,
        Err(WardError::IncorrectPassword)
    ));
    assert!(!session.is_completed());

    let signed = session.submit(&Password::new(PASSPHRASE)).await?;
    assert!(session.is_completed());

    let delivered = pending.await.map_err(|e| WardError::RelayError {
        reason: e.to_string(),
    })??;
    assert_eq!(delivered, signed);
    assert_eq!(delivered.signed.sequence, "1");
    SigningEngine::new(wallet.custodian.clone()).verify_amino_response(&delivered)?;
    assert_eq!(page.pending_listeners(), 0);
    Ok(())
}

#[tokio::test]
async fn dismissed_prompt_releases_requester() -> TestResult {
    let mut relay = start_relay();
    let wallet = wallet(&relay).await?;

    let page = Arc::new(relay.hub.client());
    let requester = SigningEngine::new(wallet.custodian.clone()).with_delegate(page.clone());
    let request = amino_request(&wallet.slave, "foo-1");
    let pending = tokio::spawn(async move { requester.sign(&request, None).await });

    let popup = next_popup(&mut relay).await?;
    let session = SignSession::from_popup(
        &popup,
        Arc::new(SigningEngine::new(wallet.custodian.clone())),
        Arc::new(relay.hub.client()),
    )?;
    session.dismiss().await?;

    let result = pending.await.map_err(|e| WardError::RelayError {
        reason: e.to_string(),
    })?;
    assert!(matches!(result, Err(WardError::PromptDismissed)));
    assert!(session.submit(&Password::new(PASSPHRASE)).await.is_err());
    assert_eq!(wallet.custodian.decrypt_attempts(), 0);
    Ok(())
}

#[tokio::test]
async fn rejected_prompt_reports_reason() -> TestResult {
    let mut relay = start_relay();
    let wallet = wallet(&relay).await?;

    let page = Arc::new(relay.hub.client());
    let requester = SigningEngine::new(wallet.custodian.clone()).with_delegate(page);
    let request = amino_request(&wallet.slave, "bar-2");
    let pending = tokio::spawn(async move { requester.sign(&request, None).await });

    let popup = next_popup(&mut relay).await?;
    let session = SignSession::from_popup(
        &popup,
        Arc::new(SigningEngine::new(wallet.custodian.clone())),
        Arc::new(relay.hub.client()),
    )?;
    assert!(matches!(
        session.submit(&Password::new(PASSPHRASE)).await,
        Err(WardError::ChainMismatch { .. })
    ));

    match pending.await.map_err(|e| WardError::RelayError {
        reason: e.to_string(),
    })? {
        Err(WardError::RelayError { reason }) => assert!(reason.contains("does not match")),
        other => panic!("expected rejection, got {other:?}"),
    }
    Ok(())
}

#[tokio::test]
async fn unavailable_prompt_fails_the_request() -> TestResult {
    let relay = start_relay();
    let Relay { hub, popups, .. } = relay;
    drop(popups);

    let client = hub.client();
    let result = client
        .send_and_wait(
            RelayRequest::Sign {
                tx: json!({}),
                sign_mode: ward_types::SignMode::Amino,
                signer: Address::from_bytes("wasm", &[7u8; 20])?,
            },
            Some(Duration::from_secs(5)),
        )
        .await;
    assert!(matches!(result, Err(WardError::RelayError { .. })));
    Ok(())
}
