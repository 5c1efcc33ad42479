//! Contract binding integration tests
//!
//! Drives call, send, and deploy flows end to end over the mock transport.

use std::sync::Arc;
use std::time::Duration;

use serde_json::{json, Value};
use tracelink_primitives::Address;
use tracelink_sdk::{
    AccountSession, Client, Contract, ContractAbi, MockTransport, MonitorConfig, SdkError, Token,
    TxOptions, TxStatus,
};

const ABI: &str = r#"[
    {"type": "constructor", "inputs": [{"name": "name", "type": "string"}]},
    {"type": "function", "name": "getBalance", "constant": true,
     "inputs": [], "outputs": [{"name": "", "type": "uint256"}]},
    {"type": "function", "name": "sendToken",
     "inputs": [{"name": "to", "type": "address"}, {"name": "amount", "type": "uint256"}],
     "outputs": [{"name": "", "type": "bool"}]},
    {"type": "function", "name": "createAsset", "stateMutability": "nonpayable",
     "inputs": [{"name": "name", "type": "string"},
                {"name": "keys", "type": "string[]"},
                {"name": "values", "type": "string[]"}],
     "outputs": []}
]"#;

const SENDER: &str = "0xf07b2cb4d766ffa81bea15b99cd459c69b9f766a";
const CONTRACT: &str = "0x1dbaccedfe36189819d2f6029b8036f9a0ea398b";
const TX_HASH: &str = "0x88df016429689c079f3b2f6ad39fa052532c56795b733da78a91ebe6a713944b";

fn fast_config() -> MonitorConfig {
    MonitorConfig {
        poll_interval: Duration::from_millis(10),
        mining_timeout: Duration::from_secs(5),
        max_transient_retries: 3,
        retry_backoff: Duration::from_millis(5),
    }
}

fn receipt_json(block: u64, status: u64) -> Value {
    json!({
        "transactionHash": TX_HASH,
        "blockNumber": format!("0x{:x}", block),
        "gasUsed": "0x5208",
        "status": format!("0x{:x}", status),
    })
}

fn setup() -> (Contract, Arc<MockTransport>) {
    let (client, transport) = Client::new_mock();
    let session = AccountSession::new(client, Address::from_hex(SENDER).unwrap());
    let abi = ContractAbi::parse(ABI.as_bytes()).unwrap();
    let contract = Contract::at(Address::from_hex(CONTRACT).unwrap(), abi, session)
        .with_monitor_config(fast_config());
    (contract, transport)
}

// ==================== Read-only calls ====================

#[tokio::test]
async fn test_call_sends_encoded_data_and_decodes_result() {
    let (contract, transport) = setup();
    transport.respond(
        "eth_call",
        Value::String(format!("0x{}{}", "00".repeat(31), "64")),
    );

    let values = contract.call("getBalance", &[]).await.unwrap();
    assert_eq!(values, vec![Token::uint(100u64)]);

    let params = transport.last_params("eth_call").unwrap();
    assert_eq!(params[0]["to"], CONTRACT);
    assert_eq!(params[0]["from"], SENDER);
    // data is the 4-byte selector of getBalance()
    let data = params[0]["data"].as_str().unwrap();
    assert_eq!(data.len(), 2 + 8);
}

#[tokio::test]
async fn test_call_arity_error_reaches_no_transport() {
    let (contract, transport) = setup();
    let err = contract
        .call("getBalance", &[Token::uint(1u64)])
        .await
        .unwrap_err();
    assert!(matches!(err, SdkError::Arity { expected: 0, got: 1 }));
    assert_eq!(transport.request_count("eth_call"), 0);
}

#[tokio::test]
async fn test_send_type_error_reaches_no_transport() {
    let (contract, transport) = setup();
    let err = contract
        .send(
            "sendToken",
            &[Token::string("not an address"), Token::uint(1u64)],
            TxOptions::default(),
        )
        .await
        .unwrap_err();
    assert!(matches!(err, SdkError::TypeMismatch { .. }));
    assert_eq!(transport.request_count("eth_sendTransaction"), 0);
}

// ==================== State-changing calls ====================

#[tokio::test]
async fn test_send_tracks_to_mined() {
    let (contract, transport) = setup();
    transport.respond("eth_getTransactionReceipt", receipt_json(0x12, 1));

    let recipient = Address::from_bytes([0x22; 20]);
    let pending = contract
        .send(
            "sendToken",
            &[Token::Address(recipient), Token::uint(1_000_000_000_000_000_000u64)],
            TxOptions {
                gas: Some(3_000_000),
                ..Default::default()
            },
        )
        .await
        .unwrap();

    let receipt = pending.wait().await.unwrap();
    assert_eq!(receipt.block_number, 0x12);
    assert!(matches!(pending.status(), TxStatus::Mined(_)));

    let params = transport.last_params("eth_sendTransaction").unwrap();
    assert_eq!(params[0]["to"], CONTRACT);
    assert_eq!(params[0]["gas"], "0x2dc6c0");
    // selector + address word + amount word
    let data = params[0]["data"].as_str().unwrap();
    assert_eq!(data.len(), 2 + 8 + 64 + 64);
}

#[tokio::test]
async fn test_send_with_insufficient_gas_fails_and_never_mines() {
    let (contract, transport) = setup();
    transport.enqueue_rpc_error("eth_sendTransaction", -32000, "intrinsic gas too low");

    let err = contract
        .send(
            "sendToken",
            &[Token::Address(Address::from_bytes([0x22; 20])), Token::uint(1u64)],
            TxOptions {
                gas: Some(100),
                ..Default::default()
            },
        )
        .await
        .unwrap_err();

    assert!(matches!(err, SdkError::InsufficientGas(_)));
    // rejected at submission: nothing was ever polled, nothing mined
    assert_eq!(transport.request_count("eth_getTransactionReceipt"), 0);
}

#[tokio::test]
async fn test_send_reverted_yields_transaction_failed() {
    let (contract, transport) = setup();
    transport.respond("eth_getTransactionReceipt", receipt_json(0x13, 0));

    let pending = contract
        .send(
            "sendToken",
            &[Token::Address(Address::from_bytes([0x22; 20])), Token::uint(1u64)],
            TxOptions::default(),
        )
        .await
        .unwrap();

    let err = pending.wait().await.unwrap_err();
    assert!(matches!(err, SdkError::TransactionFailed(_)));
    assert!(matches!(pending.status(), TxStatus::Failed(_)));
}

#[tokio::test]
async fn test_send_string_array_arguments() {
    let (contract, transport) = setup();
    transport.respond("eth_getTransactionReceipt", receipt_json(0x14, 1));

    let pending = contract
        .send(
            "createAsset",
            &[
                Token::string("asset1"),
                Token::Array(vec![Token::string("color"), Token::string("weight")]),
                Token::Array(vec![Token::string("red"), Token::string("0.1kg")]),
            ],
            TxOptions {
                gas: Some(30_000_000),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    pending.wait().await.unwrap();
}

// ==================== Unbound bindings ====================

#[tokio::test]
async fn test_unbound_binding_rejects_interaction() {
    let (client, transport) = Client::new_mock();
    let session = AccountSession::new(client, Address::from_hex(SENDER).unwrap());
    let contract = Contract::unbound(ContractAbi::parse(ABI.as_bytes()).unwrap(), session);

    assert_eq!(contract.address(), None);
    let err = contract.call("getBalance", &[]).await.unwrap_err();
    assert!(matches!(err, SdkError::NotBound));
    assert!(transport.requests().is_empty());
}

// ==================== Deployment ====================

fn creation_receipt(block: u64) -> Value {
    json!({
        "transactionHash": TX_HASH,
        "blockNumber": format!("0x{:x}", block),
        "contractAddress": CONTRACT,
        "gasUsed": "0x30d40",
        "status": "0x1",
    })
}

#[tokio::test]
async fn test_deploy_resolves_to_bound_contract() {
    let (client, transport) = Client::new_mock();
    transport.enqueue("eth_getTransactionReceipt", Value::Null);
    transport.respond("eth_getTransactionReceipt", creation_receipt(0x21));

    let session = AccountSession::new(client, Address::from_hex(SENDER).unwrap());
    let abi = ContractAbi::parse(ABI.as_bytes()).unwrap();
    let bytecode = vec![0x60, 0x80, 0x60, 0x40, 0x52];

    let deployment = Contract::deploy_with_config(
        abi,
        &bytecode,
        &[Token::string("asset1")],
        session,
        TxOptions {
            gas: Some(0x47b760),
            ..Default::default()
        },
        fast_config(),
    )
    .await
    .unwrap();

    assert!(!deployment.transaction_hash().is_zero());

    // creation request: no target, data = bytecode ++ encoded args
    let params = transport.last_params("eth_sendTransaction").unwrap();
    assert!(params[0].get("to").is_none());
    let data = params[0]["data"].as_str().unwrap();
    assert!(data.starts_with("0x6080604052"));
    assert_eq!(data.len(), 2 + bytecode.len() * 2 + 96 * 2);

    let contract = deployment.resolve().await.unwrap();
    assert_eq!(contract.address(), Some(Address::from_hex(CONTRACT).unwrap()));
}

#[tokio::test]
async fn test_deploy_reverted_is_deployment_error() {
    let (client, transport) = Client::new_mock();
    transport.respond("eth_getTransactionReceipt", receipt_json(0x22, 0));

    let session = AccountSession::new(client, Address::from_hex(SENDER).unwrap());
    let abi = ContractAbi::parse(ABI.as_bytes()).unwrap();

    let deployment = Contract::deploy_with_config(
        abi,
        &[0x60],
        &[Token::string("asset1")],
        session,
        TxOptions::default(),
        fast_config(),
    )
    .await
    .unwrap();

    let err = deployment.resolve().await.unwrap_err();
    assert!(matches!(err, SdkError::Deployment(_)));
}

#[tokio::test]
async fn test_deploy_timeout_is_deployment_error() {
    let (client, _transport) = Client::new_mock();
    let session = AccountSession::new(client, Address::from_hex(SENDER).unwrap());
    let abi = ContractAbi::parse(ABI.as_bytes()).unwrap();

    let config = MonitorConfig {
        mining_timeout: Duration::from_millis(50),
        poll_interval: Duration::from_millis(10),
        ..fast_config()
    };
    let deployment = Contract::deploy_with_config(
        abi,
        &[0x60],
        &[Token::string("asset1")],
        session,
        TxOptions::default(),
        config,
    )
    .await
    .unwrap();

    // receipts stay null: the budget runs out
    let err = deployment.resolve().await.unwrap_err();
    assert!(matches!(err, SdkError::Deployment(_)));
}

#[tokio::test]
async fn test_deploy_constructor_arity_checked_before_submission() {
    let (client, transport) = Client::new_mock();
    let session = AccountSession::new(client, Address::from_hex(SENDER).unwrap());
    let abi = ContractAbi::parse(ABI.as_bytes()).unwrap();

    let err = Contract::deploy(
        abi,
        &[0x60],
        &[Token::string("asset1"), Token::string("extra")],
        session,
        TxOptions::default(),
    )
    .await
    .unwrap_err();
    assert!(matches!(err, SdkError::Arity { expected: 1, got: 2 }));
    assert_eq!(transport.request_count("eth_sendTransaction"), 0);
}
