//! Account session integration tests

use std::time::Duration;

use serde_json::{json, Value};
use tracelink_primitives::Address;
use tracelink_sdk::{AccountSession, Client, SdkError};

#[tokio::test]
async fn test_bootstrap_from_node_accounts_and_unlock() {
    let (client, transport) = Client::new_mock();
    let session = AccountSession::first_available(client).await.unwrap();
    assert_eq!(
        session.active_account().to_hex(),
        "0xf07b2cb4d766ffa81bea15b99cd459c69b9f766a"
    );

    session.unlock("", Duration::from_secs(3000)).await.unwrap();
    assert!(session.is_unlocked());

    // the unlock went to the node with the session account and duration
    let params = transport.last_params("personal_unlockAccount").unwrap();
    assert_eq!(params[0], "0xf07b2cb4d766ffa81bea15b99cd459c69b9f766a");
    assert_eq!(params[2], Value::Number(3000.into()));
}

#[tokio::test]
async fn test_unlock_failure_is_authorization_error() {
    let (client, transport) = Client::new_mock();
    transport.respond("personal_unlockAccount", Value::Bool(false));
    let session = AccountSession::new(client, Address::from_bytes([0x42; 20]));

    let err = session
        .unlock("wrong passphrase", Duration::from_secs(60))
        .await
        .unwrap_err();
    assert!(matches!(err, SdkError::Authorization(_)));
    assert!(!session.is_unlocked());
}

#[tokio::test]
async fn test_clones_share_unlock_state() {
    let (client, _transport) = Client::new_mock();
    let session = AccountSession::new(client, Address::from_bytes([0x42; 20]));
    let clone = session.clone();

    session.unlock("", Duration::from_secs(600)).await.unwrap();
    // the clone observes the same session, not a copy of its state
    assert!(clone.is_unlocked());
    assert_eq!(clone.active_account(), session.active_account());
}

#[tokio::test]
async fn test_empty_account_list_is_authorization_error() {
    let (client, transport) = Client::new_mock();
    transport.respond("eth_accounts", json!([]));
    let err = AccountSession::first_available(client).await.unwrap_err();
    assert!(matches!(err, SdkError::Authorization(_)));
}
