//! Deploy a contract from an ABI blob and bytecode file.
//!
//! Run against a local node:
//!   cargo run --example deploy_contract -- \
//!       http://127.0.0.1:8545 build/traceability.abi build/traceability.bin

use std::time::Duration;

use tracelink_sdk::types::BlockId;
use tracelink_sdk::{AccountSession, Client, Contract, ContractAbi, NodeEndpoint, Token, TxOptions};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let mut args = std::env::args().skip(1);
    let url = args.next().unwrap_or_else(|| "http://127.0.0.1:8545".into());
    let abi_path = args.next().unwrap_or_else(|| "build/traceability.abi".into());
    let bin_path = args.next().unwrap_or_else(|| "build/traceability.bin".into());

    let endpoint = NodeEndpoint::new(&url)
        .with_credentials("user", "Abcd@1234")
        .with_timeout(Duration::from_secs(50));
    let client = Client::connect(&endpoint).await?;
    println!("[*] connected to {} (network {})", url, client.network_id().await?);

    let session = AccountSession::first_available(client).await?;
    println!("[*] deploying as {}", session.active_account());
    session.unlock("", Duration::from_secs(300)).await?;

    let abi = ContractAbi::parse(&std::fs::read(&abi_path)?)?;
    let bytecode_hex = std::fs::read_to_string(&bin_path)?;
    let bytecode = hex::decode(bytecode_hex.trim().trim_start_matches("0x"))?;

    let deployment = Contract::deploy(
        abi,
        &bytecode,
        &[Token::string("asset1")],
        session,
        TxOptions {
            gas: Some(0x47b760),
            ..Default::default()
        },
    )
    .await?;
    println!(
        "[*] creation transaction sent: {} waiting to be mined...",
        deployment.transaction_hash()
    );

    let contract = deployment.resolve().await?;
    let address = contract.address().expect("resolved deployment is bound");
    println!("[*] contract mined! address: {}", address);

    let code = contract
        .session()
        .client()
        .get_code(&address, BlockId::Latest)
        .await?;
    println!("[*] deployed code size: {} bytes", code.len());

    let balance = contract.call("getBalance", &[]).await?;
    if let Some(Token::Uint(value)) = balance.first() {
        println!("[*] initial balance: {}", value);
    } else {
        println!("[*] initial balance: {:?} (unexpected shape)", balance);
    }
    Ok(())
}
