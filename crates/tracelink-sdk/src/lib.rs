//! # tracelink-sdk
//!
//! Contract interaction sessions against a remote TraceLink ledger node.
//!
//! ## Features
//!
//! - **Client**: JSON-RPC client over a pluggable transport
//! - **AccountSession**: node-delegated account unlock and the session's
//!   signing identity
//! - **Contract**: bind to a deployed contract or deploy a new one from an
//!   ABI blob and bytecode
//! - **TxMonitor**: submitted transactions tracked to mined / failed /
//!   timed-out
//! - **EventWatcher**: filtered event subscriptions with ordered,
//!   duplicate-free delivery
//! - **ABI codec**: checked encoding/decoding of calls, results, and logs
//!
//! ## Quick start
//!
//! ```rust,no_run
//! use std::time::Duration;
//! use tracelink_sdk::{AccountSession, Client, Contract, NodeEndpoint, Token, TxOptions};
//! use tracelink_primitives::Address;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let endpoint = NodeEndpoint::new("http://127.0.0.1:8545")
//!         .with_credentials("user", "secret")
//!         .with_timeout(Duration::from_secs(50));
//!     let client = Client::connect(&endpoint).await?;
//!
//!     let session = AccountSession::first_available(client).await?;
//!     session.unlock("", Duration::from_secs(3000)).await?;
//!
//!     let abi = tracelink_sdk::abi::ContractAbi::parse(&std::fs::read("contract.abi")?)?;
//!     let address = Address::from_hex("0x1dbaccedfe36189819d2f6029b8036f9a0ea398b")?;
//!     let contract = Contract::at(address, abi, session);
//!
//!     // Read-only call
//!     let balance = contract.call("getBalance", &[]).await?;
//!     println!("balance: {:?}", balance);
//!
//!     // State-changing call, tracked to a terminal state
//!     let recipient = Address::from_hex("0xf07b2cb4d766ffa81bea15b99cd459c69b9f766a")?;
//!     let pending = contract
//!         .send(
//!             "sendToken",
//!             &[Token::Address(recipient), Token::uint(1_000_000_000_000_000_000u64)],
//!             TxOptions { gas: Some(3_000_000), ..Default::default() },
//!         )
//!         .await?;
//!     let receipt = pending.wait().await?;
//!     println!("mined in block {}", receipt.block_number);
//!     Ok(())
//! }
//! ```
//!
//! ## Watching events
//!
//! ```rust,no_run
//! # use tracelink_sdk::{Client, Contract, EventWatcher, MatchCriteria};
//! # async fn demo(contract: Contract, client: Client) -> Result<(), tracelink_sdk::SdkError> {
//! let (watcher, mut faults) = EventWatcher::new(client);
//! let subscription = contract.subscribe(&watcher, "AssetCreated", MatchCriteria::new(), |log| {
//!     println!("asset created: {:?}", log.get("name"));
//!     Ok(())
//! })?;
//! // a broken handler surfaces here without stopping the stream
//! if let Some(fault) = faults.recv().await {
//!     eprintln!("handler fault: {}", fault.message);
//! }
//! watcher.unsubscribe(&subscription);
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod abi;
mod client;
mod contract;
mod endpoint;
mod error;
mod events;
mod lifecycle;
mod session;
mod transport;
pub mod types;

pub use client::Client;
pub use contract::{Contract, Deployment, TxOptions};
pub use endpoint::{Credentials, NodeEndpoint};
pub use error::SdkError;
pub use events::{
    BlockRange, EventWatcher, HandlerError, HandlerFault, MatchCriteria, Subscription,
    WatcherConfig,
};
pub use lifecycle::{MonitorConfig, PendingTransaction, TxMonitor, TxStatus, TxTarget};
pub use session::AccountSession;
pub use transport::{MockTransport, Transport};

#[cfg(feature = "http")]
pub use transport::HttpTransport;

// Re-export the codec's everyday types and the primitives for convenience
pub use abi::{ContractAbi, DecodedLog, Token};
pub use tracelink_primitives::{Address, H256, U256};
