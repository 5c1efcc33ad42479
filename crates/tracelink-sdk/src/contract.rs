//! Contract binding: a typed handle over one deployed (or deploying)
//! contract

use std::sync::Arc;

use bytes::Bytes;
use tracelink_primitives::{Address, H256, U256};
use tracing::debug;

use crate::abi::{
    decode_output, encode_call, encode_constructor, ContractAbi, DecodedLog, ParamType, Token,
};
use crate::events::{EventWatcher, HandlerError, MatchCriteria, Subscription};
use crate::lifecycle::{MonitorConfig, PendingTransaction, TxMonitor, TxTarget};
use crate::session::AccountSession;
use crate::types::{BlockId, TxRequest};
use crate::SdkError;

/// Caller-supplied parameters for a state-changing transaction.
///
/// Gas is never estimated on the caller's behalf; an unset limit means the
/// node's default applies, and a node-side gas rejection surfaces as
/// [`SdkError::InsufficientGas`].
#[derive(Debug, Clone, Default)]
pub struct TxOptions {
    /// Gas limit
    pub gas: Option<u64>,
    /// Gas price
    pub gas_price: Option<u128>,
    /// Value transferred with the call
    pub value: Option<U256>,
}

/// A bound contract: address, interface, and the session that signs for it.
///
/// Bindings are immutable once constructed and cheap to clone.
#[derive(Clone, Debug)]
pub struct Contract {
    abi: Arc<ContractAbi>,
    address: Option<Address>,
    session: AccountSession,
    monitor: TxMonitor,
}

impl Contract {
    /// Bind to an already-deployed contract. Pure: no network traffic.
    pub fn at(address: Address, abi: ContractAbi, session: AccountSession) -> Self {
        let monitor = TxMonitor::new(session.client().clone());
        Self {
            abi: Arc::new(abi),
            address: Some(address),
            session,
            monitor,
        }
    }

    /// Binding with no address yet: an interface handle for a contract
    /// that is not deployed. `call`, `send`, and `subscribe` return
    /// [`SdkError::NotBound`]; deployment produces the bound binding.
    pub fn unbound(abi: ContractAbi, session: AccountSession) -> Self {
        let monitor = TxMonitor::new(session.client().clone());
        Self {
            abi: Arc::new(abi),
            address: None,
            session,
            monitor,
        }
    }

    /// Replace the transaction polling policy for this binding
    pub fn with_monitor_config(mut self, config: MonitorConfig) -> Self {
        self.monitor = TxMonitor::with_config(self.session.client().clone(), config);
        self
    }

    /// Deploy a new contract: constructor arguments are encoded and
    /// appended to the bytecode, and the creation transaction goes through
    /// the lifecycle manager. The returned [`Deployment`] resolves to a
    /// bound contract once mining confirms an address.
    pub async fn deploy(
        abi: ContractAbi,
        bytecode: &[u8],
        constructor_args: &[Token],
        session: AccountSession,
        options: TxOptions,
    ) -> Result<Deployment, SdkError> {
        Self::deploy_with_config(
            abi,
            bytecode,
            constructor_args,
            session,
            options,
            MonitorConfig::default(),
        )
        .await
    }

    /// [`Contract::deploy`] with an explicit polling policy
    pub async fn deploy_with_config(
        abi: ContractAbi,
        bytecode: &[u8],
        constructor_args: &[Token],
        session: AccountSession,
        options: TxOptions,
        config: MonitorConfig,
    ) -> Result<Deployment, SdkError> {
        let abi = Arc::new(abi);
        let data = encode_constructor(abi.constructor(), bytecode, constructor_args)?;
        let request = TxRequest {
            from: Some(session.active_account()),
            to: None,
            gas: options.gas,
            gas_price: options.gas_price,
            value: options.value,
            data: Some(Bytes::from(data)),
        };

        let monitor = TxMonitor::with_config(session.client().clone(), config.clone());
        let pending = monitor
            .submit(request, TxTarget::Create)
            .await
            .map_err(|e| match e {
                SdkError::TransactionFailed(message) => SdkError::Deployment(message),
                other => other,
            })?;
        debug!(hash = %pending.hash(), "creation transaction submitted");

        Ok(Deployment {
            pending,
            abi,
            session,
            config,
        })
    }

    /// The bound address, once known
    pub fn address(&self) -> Option<Address> {
        self.address
    }

    /// The contract's interface description
    pub fn abi(&self) -> &ContractAbi {
        &self.abi
    }

    /// The session this binding submits through
    pub fn session(&self) -> &AccountSession {
        &self.session
    }

    /// Invoke a method read-only. No transaction is created; the decoded
    /// return values come straight from the node's execution.
    pub async fn call(&self, method: &str, args: &[Token]) -> Result<Vec<Token>, SdkError> {
        let to = self.address.ok_or(SdkError::NotBound)?;
        let function = self.abi.function(method)?;
        let data = encode_call(function, args)?;

        let request = TxRequest {
            from: Some(self.session.active_account()),
            to: Some(to),
            data: Some(Bytes::from(data)),
            ..Default::default()
        };
        let raw = self.session.client().call(&request, BlockId::Latest).await?;

        let outputs: Vec<ParamType> = function.outputs.iter().map(|p| p.kind.clone()).collect();
        decode_output(&outputs, &raw)
    }

    /// Invoke a state-changing method. The transaction is tracked by the
    /// lifecycle manager; await the returned handle for the outcome.
    pub async fn send(
        &self,
        method: &str,
        args: &[Token],
        options: TxOptions,
    ) -> Result<PendingTransaction, SdkError> {
        let to = self.address.ok_or(SdkError::NotBound)?;
        let function = self.abi.function(method)?;
        let data = encode_call(function, args)?;

        let request = TxRequest {
            from: Some(self.session.active_account()),
            to: Some(to),
            gas: options.gas,
            gas_price: options.gas_price,
            value: options.value,
            data: Some(Bytes::from(data)),
        };
        self.monitor.submit(request, TxTarget::Call { to }).await
    }

    /// Subscribe a handler to one of this contract's events
    pub fn subscribe<F>(
        &self,
        watcher: &EventWatcher,
        event_name: &str,
        criteria: MatchCriteria,
        handler: F,
    ) -> Result<Subscription, SdkError>
    where
        F: Fn(&DecodedLog) -> Result<(), HandlerError> + Send + Sync + 'static,
    {
        watcher.subscribe(self, event_name, criteria, handler)
    }
}

/// A contract creation in flight.
///
/// The transaction hash is available immediately; the bound contract only
/// once mining confirms the address.
#[derive(Debug)]
pub struct Deployment {
    pending: PendingTransaction,
    abi: Arc<ContractAbi>,
    session: AccountSession,
    config: MonitorConfig,
}

impl Deployment {
    /// Hash of the creation transaction
    pub fn transaction_hash(&self) -> H256 {
        self.pending.hash()
    }

    /// The underlying pending transaction, for status observation or
    /// cancellation
    pub fn pending(&self) -> &PendingTransaction {
        &self.pending
    }

    /// Wait for mining and return the bound contract.
    ///
    /// Failure or an exhausted mining budget resolve to
    /// [`SdkError::Deployment`].
    pub async fn resolve(self) -> Result<Contract, SdkError> {
        let receipt = self.pending.wait().await.map_err(|e| match e {
            SdkError::TransactionFailed(message) => SdkError::Deployment(message),
            SdkError::Timeout(message) => SdkError::Deployment(message),
            other => other,
        })?;
        let address = receipt.contract_address.ok_or_else(|| {
            SdkError::Deployment("mined receipt reports no contract address".into())
        })?;
        debug!(%address, "contract deployed");

        let monitor = TxMonitor::with_config(self.session.client().clone(), self.config);
        Ok(Contract {
            abi: self.abi,
            address: Some(address),
            session: self.session,
            monitor,
        })
    }
}
