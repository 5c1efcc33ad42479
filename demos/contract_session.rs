//! Interact with a deployed contract: read state, send a token transfer,
//! and watch the events it emits.
//!
//! Run against a local node:
//!   cargo run --example contract_session -- \
//!       http://127.0.0.1:8545 build/traceability.abi 0x1dbaccedfe36189819d2f6029b8036f9a0ea398b

use std::time::Duration;

use tracelink_primitives::Address;
use tracelink_sdk::{
    AccountSession, Client, Contract, ContractAbi, EventWatcher, MatchCriteria, NodeEndpoint,
    Token, TxOptions,
};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let mut args = std::env::args().skip(1);
    let url = args.next().unwrap_or_else(|| "http://127.0.0.1:8545".into());
    let abi_path = args.next().unwrap_or_else(|| "build/traceability.abi".into());
    let address = args
        .next()
        .unwrap_or_else(|| "0x1dbaccedfe36189819d2f6029b8036f9a0ea398b".into());

    let endpoint = NodeEndpoint::new(&url)
        .with_credentials("user", "Abcd@1234")
        .with_timeout(Duration::from_secs(50));
    let client = Client::connect(&endpoint).await?;
    println!("[*] connected: network {}", client.network_id().await?);

    let session = AccountSession::first_available(client.clone()).await?;
    session.unlock("", Duration::from_secs(3000)).await?;
    println!("[*] session account: {}", session.active_account());

    let abi = ContractAbi::parse(&std::fs::read(&abi_path)?)?;
    let contract = Contract::at(Address::from_hex(&address)?, abi, session);

    let balance = contract.call("getBalance", &[]).await?;
    println!("[*] getBalance: {:?}", balance);

    // Watch the contract's events while we interact with it
    let (watcher, mut faults) = EventWatcher::new(client);
    contract.subscribe(&watcher, "TokenSent", MatchCriteria::new(), |log| {
        println!(
            "[event] TokenSent: {:?} -> {:?}, amount {:?}",
            log.get("from"),
            log.get("to"),
            log.get("amount")
        );
        Ok(())
    })?;
    contract.subscribe(&watcher, "AssetCreated", MatchCriteria::new(), |log| {
        println!("[event] AssetCreated: {:?}", log.params);
        Ok(())
    })?;
    tokio::spawn(async move {
        while let Some(fault) = faults.recv().await {
            eprintln!("[fault] {}: {}", fault.event, fault.message);
        }
    });

    let recipient = Address::from_hex("0xf07b2cb4d766ffa81bea15b99cd459c69b9f766a")?;
    let pending = contract
        .send(
            "sendToken",
            &[Token::Address(recipient), Token::uint(1_000_000_000_000_000_000u64)],
            TxOptions {
                gas: Some(3_000_000),
                ..Default::default()
            },
        )
        .await?;
    println!("[*] sendToken submitted: {}", pending.hash());

    let receipt = pending.wait().await?;
    println!("[*] mined in block {}", receipt.block_number);

    let balance = contract.call("getBalance", &[]).await?;
    println!("[*] getBalance: {:?}", balance);

    // Let one more poll cycle drain any remaining events before exiting
    tokio::time::sleep(Duration::from_secs(2)).await;
    watcher.shutdown();
    Ok(())
}
