//! Parsing of the caller-supplied ABI description blob
//!
//! The blob is the standard JSON array of entries tagged `function`,
//! `event`, or `constructor`. Locating the blob (file, inline, registry) is
//! the caller's concern; validating it is ours.

use std::collections::HashSet;

use serde::Deserialize;
use tracelink_crypto::keccak256;
use tracelink_primitives::H256;

use super::types::ParamType;
use crate::SdkError;

/// A named, typed function or constructor parameter
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Param {
    /// Parameter name (may be empty in the blob)
    pub name: String,
    /// Declared type
    pub kind: ParamType,
}

/// An event parameter, with its indexing flag
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventParam {
    /// Parameter name
    pub name: String,
    /// Declared type
    pub kind: ParamType,
    /// Whether the parameter is carried in the log's topics
    pub indexed: bool,
}

/// A callable contract function
#[derive(Debug, Clone)]
pub struct Function {
    /// Function name
    pub name: String,
    /// Input parameters, in declaration order
    pub inputs: Vec<Param>,
    /// Output parameters, in declaration order
    pub outputs: Vec<Param>,
    /// True for read-only functions (`constant` / `view` / `pure`)
    pub read_only: bool,
}

impl Function {
    /// Canonical signature, e.g. `transfer(address,uint256)`
    pub fn signature(&self) -> String {
        signature(&self.name, self.inputs.iter().map(|p| &p.kind))
    }

    /// 4-byte call selector
    pub fn selector(&self) -> [u8; 4] {
        let hash = keccak256(self.signature().as_bytes());
        let mut selector = [0u8; 4];
        selector.copy_from_slice(&hash.as_bytes()[..4]);
        selector
    }
}

/// An event the contract may emit
#[derive(Debug, Clone)]
pub struct Event {
    /// Event name
    pub name: String,
    /// Parameters in declaration order, indexed and non-indexed interleaved
    pub inputs: Vec<EventParam>,
}

impl Event {
    /// Canonical signature, e.g. `AssetCreated(bytes32,string)`
    pub fn signature(&self) -> String {
        signature(&self.name, self.inputs.iter().map(|p| &p.kind))
    }

    /// Signature topic: the first topic of every log this event emits
    pub fn topic(&self) -> H256 {
        keccak256(self.signature().as_bytes())
    }

    /// The indexed parameters, in declaration order
    pub fn indexed_inputs(&self) -> impl Iterator<Item = &EventParam> {
        self.inputs.iter().filter(|p| p.indexed)
    }

    /// The non-indexed parameters, in declaration order
    pub fn data_inputs(&self) -> impl Iterator<Item = &EventParam> {
        self.inputs.iter().filter(|p| !p.indexed)
    }
}

/// The contract's constructor
#[derive(Debug, Clone, Default)]
pub struct Constructor {
    /// Input parameters, in declaration order
    pub inputs: Vec<Param>,
}

/// Parsed, validated contract interface description.
///
/// Entry names must be unique within one ABI; overload resolution is
/// deliberately unsupported, so a blob with two entries of the same name and
/// kind is rejected at parse time.
#[derive(Debug, Clone, Default)]
pub struct ContractAbi {
    functions: Vec<Function>,
    events: Vec<Event>,
    constructor: Option<Constructor>,
}

impl ContractAbi {
    /// Parse and validate an ABI description blob
    pub fn parse(blob: &[u8]) -> Result<Self, SdkError> {
        let raw: Vec<RawEntry> = serde_json::from_slice(blob)
            .map_err(|e| SdkError::AbiParse(format!("invalid ABI blob: {}", e)))?;
        Self::from_entries(raw)
    }

    /// Parse from an already-deserialized JSON value
    pub fn from_value(value: &serde_json::Value) -> Result<Self, SdkError> {
        let raw: Vec<RawEntry> = serde_json::from_value(value.clone())
            .map_err(|e| SdkError::AbiParse(format!("invalid ABI blob: {}", e)))?;
        Self::from_entries(raw)
    }

    fn from_entries(raw: Vec<RawEntry>) -> Result<Self, SdkError> {
        let mut abi = ContractAbi::default();
        let mut function_names = HashSet::new();
        let mut event_names = HashSet::new();

        for entry in raw {
            match entry.kind.as_str() {
                "function" => {
                    let name = required_name(&entry, "function")?;
                    if !function_names.insert(name.clone()) {
                        return Err(SdkError::AbiParse(format!(
                            "duplicate function name `{}` (overloads are not supported)",
                            name
                        )));
                    }
                    let read_only = entry.is_read_only();
                    abi.functions.push(Function {
                        name,
                        inputs: params(entry.inputs)?,
                        outputs: params(entry.outputs)?,
                        read_only,
                    });
                }
                "event" => {
                    let name = required_name(&entry, "event")?;
                    if !event_names.insert(name.clone()) {
                        return Err(SdkError::AbiParse(format!(
                            "duplicate event name `{}` (overloads are not supported)",
                            name
                        )));
                    }
                    abi.events.push(Event {
                        name,
                        inputs: event_params(entry.inputs)?,
                    });
                }
                "constructor" => {
                    if abi.constructor.is_some() {
                        return Err(SdkError::AbiParse("duplicate constructor entry".into()));
                    }
                    abi.constructor = Some(Constructor {
                        inputs: params(entry.inputs)?,
                    });
                }
                // fallback, receive and the like carry nothing we encode
                _ => {}
            }
        }

        Ok(abi)
    }

    /// Look up a function by name
    pub fn function(&self, name: &str) -> Result<&Function, SdkError> {
        self.functions
            .iter()
            .find(|f| f.name == name)
            .ok_or_else(|| SdkError::AbiParse(format!("no function named `{}`", name)))
    }

    /// Look up an event by name
    pub fn event(&self, name: &str) -> Result<&Event, SdkError> {
        self.events
            .iter()
            .find(|e| e.name == name)
            .ok_or_else(|| SdkError::AbiParse(format!("no event named `{}`", name)))
    }

    /// The constructor entry, if the blob declares one
    pub fn constructor(&self) -> Option<&Constructor> {
        self.constructor.as_ref()
    }

    /// All declared functions
    pub fn functions(&self) -> &[Function] {
        &self.functions
    }

    /// All declared events
    pub fn events(&self) -> &[Event] {
        &self.events
    }
}

fn signature<'a>(name: &str, kinds: impl Iterator<Item = &'a ParamType>) -> String {
    let types: Vec<String> = kinds.map(|k| k.to_string()).collect();
    format!("{}({})", name, types.join(","))
}

fn required_name(entry: &RawEntry, kind: &str) -> Result<String, SdkError> {
    match &entry.name {
        Some(name) if !name.is_empty() => Ok(name.clone()),
        _ => Err(SdkError::AbiParse(format!("{} entry without a name", kind))),
    }
}

fn params(raw: Option<Vec<RawParam>>) -> Result<Vec<Param>, SdkError> {
    raw.unwrap_or_default()
        .into_iter()
        .map(|p| {
            Ok(Param {
                name: p.name.unwrap_or_default(),
                kind: ParamType::parse(&p.kind)?,
            })
        })
        .collect()
}

fn event_params(raw: Option<Vec<RawParam>>) -> Result<Vec<EventParam>, SdkError> {
    raw.unwrap_or_default()
        .into_iter()
        .map(|p| {
            Ok(EventParam {
                name: p.name.unwrap_or_default(),
                kind: ParamType::parse(&p.kind)?,
                indexed: p.indexed.unwrap_or(false),
            })
        })
        .collect()
}

#[derive(Debug, Deserialize)]
struct RawEntry {
    #[serde(rename = "type")]
    kind: String,
    name: Option<String>,
    inputs: Option<Vec<RawParam>>,
    outputs: Option<Vec<RawParam>>,
    constant: Option<bool>,
    #[serde(rename = "stateMutability")]
    state_mutability: Option<String>,
}

impl RawEntry {
    fn is_read_only(&self) -> bool {
        if let Some(constant) = self.constant {
            return constant;
        }
        matches!(self.state_mutability.as_deref(), Some("view") | Some("pure"))
    }
}

#[derive(Debug, Deserialize)]
struct RawParam {
    name: Option<String>,
    #[serde(rename = "type")]
    kind: String,
    indexed: Option<bool>,
}
