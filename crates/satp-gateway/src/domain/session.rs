//! # Session
//!
//! A session is the full state of one transfer attempt. Each gateway keeps
//! its own projection: the initiating gateway holds client data, the
//! responding gateway server data. Both converge on the same session id.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use uuid::Uuid;

use super::asset::{Asset, NetworkId};
use super::claims::{ClaimSet, NetworkCapabilities};
use super::errors::SatpError;
use super::message_type::{MessageType, SatpStage};
use super::now_millis;
use crate::messages::SatpMessage;

/// Side a gateway plays in a session.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Role {
    /// Initiator: sends requests, validates responses.
    Client,
    /// Responder: validates requests, sends responses.
    Server,
}

impl Role {
    /// The other side.
    pub fn counterpart(self) -> Role {
        match self {
            Role::Client => Role::Server,
            Role::Server => Role::Client,
        }
    }
}

/// Lifecycle state of a session projection.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SessionState {
    /// Transfer in progress.
    Ongoing,
    /// Counterpart rejected the proposal; terminal.
    Rejected,
    /// Proposal rejected with counter-claims that were accepted; transfer continues.
    ConditionalRejected,
    /// Transfer completed; terminal.
    Completed,
    /// Unrecoverable protocol error; terminal.
    Error,
}

impl SessionState {
    /// Whether no further transition is allowed.
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            SessionState::Rejected | SessionState::Completed | SessionState::Error
        )
    }

    /// Whether `next` is a legal successor.
    pub fn can_transition_to(self, next: SessionState) -> bool {
        use SessionState::*;
        match (self, next) {
            (Ongoing, Rejected | ConditionalRejected | Completed | Error) => true,
            (ConditionalRejected, Rejected | Completed | Error) => true,
            _ => false,
        }
    }
}

/// Whether a ledger entry was produced locally or received.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Direction {
    /// Built and signed by this gateway.
    Sent,
    /// Received and verified by this gateway.
    Received,
}

/// Integrity record for one message type.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct LedgerEntry {
    /// SHA-256 of the full signed message.
    pub hash: String,
    /// Signature the message carries.
    pub signature: String,
    /// The exact message, kept for recovery.
    pub message: SatpMessage,
    /// Sent or received.
    pub direction: Direction,
    /// When the entry was recorded (unix millis).
    pub recorded_at: u64,
}

/// Per-message-type hashes, signatures and messages of one projection.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct IntegrityLedger {
    entries: BTreeMap<MessageType, LedgerEntry>,
}

impl IntegrityLedger {
    /// Record (or overwrite) the entry for a message type.
    pub fn record(&mut self, message_type: MessageType, entry: LedgerEntry) {
        self.entries.insert(message_type, entry);
    }

    /// Entry for a message type.
    pub fn entry(&self, message_type: MessageType) -> Option<&LedgerEntry> {
        self.entries.get(&message_type)
    }

    /// Stored hash of a message type.
    pub fn hash(&self, message_type: MessageType) -> Option<&str> {
        self.entry(message_type).map(|e| e.hash.as_str())
    }

    /// Stored signature of a message type.
    pub fn signature(&self, message_type: MessageType) -> Option<&str> {
        self.entry(message_type).map(|e| e.signature.as_str())
    }

    /// Stored message of a message type.
    pub fn message(&self, message_type: MessageType) -> Option<&SatpMessage> {
        self.entry(message_type).map(|e| &e.message)
    }

    /// Whether the type has been recorded.
    pub fn contains(&self, message_type: MessageType) -> bool {
        self.entries.contains_key(&message_type)
    }

    /// Latest message type in protocol order.
    pub fn last_type(&self) -> Option<MessageType> {
        self.entries.keys().next_back().copied()
    }

    /// Entries in protocol order.
    pub fn iter(&self) -> impl Iterator<Item = (&MessageType, &LedgerEntry)> {
        self.entries.iter()
    }

    /// Number of recorded types.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether nothing is recorded.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    #[cfg(test)]
    pub(crate) fn forget(&mut self, message_type: MessageType) -> Option<LedgerEntry> {
        self.entries.remove(&message_type)
    }
}

/// One side's view of a session.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SessionData {
    /// Session id.
    pub id: String,
    /// Transfer context the session belongs to.
    pub transfer_context_id: String,
    /// Protocol version.
    pub version: String,
    /// Resource URL the session addresses.
    pub resource_url: String,
    /// Lifecycle state.
    pub state: SessionState,
    /// Sequence number of the last message accepted or emitted.
    pub last_sequence_number: u64,

    /// Client gateway identifier.
    pub client_gateway_id: String,
    /// Server gateway identifier.
    pub server_gateway_id: String,
    /// Client gateway public key (hex).
    pub client_gateway_pubkey: String,
    /// Server gateway public key (hex).
    pub server_gateway_pubkey: String,

    /// Network the asset leaves.
    pub sender_network: Option<NetworkId>,
    /// Network the asset arrives on.
    pub receiver_network: Option<NetworkId>,
    /// Asset id.
    pub digital_asset_id: Option<String>,
    /// Asset profile id.
    pub asset_profile_id: Option<String>,
    /// Originator entity.
    pub originator: Option<String>,
    /// Beneficiary entity.
    pub beneficiary: Option<String>,
    /// Originator public key.
    pub originator_pubkey: Option<String>,
    /// Beneficiary public key.
    pub beneficiary_pubkey: Option<String>,
    /// Owner of the sender gateway.
    pub sender_gateway_owner_id: Option<String>,
    /// Owner of the receiver gateway.
    pub receiver_gateway_owner_id: Option<String>,
    /// Asset on the sender ledger.
    pub sender_asset: Option<Asset>,
    /// Asset on the receiver ledger.
    pub receiver_asset: Option<Asset>,

    /// Capabilities advertised with the proposal.
    pub capabilities: Option<NetworkCapabilities>,
    /// Whether multiple claims are allowed.
    pub multiple_claims_allowed: bool,
    /// Whether multiple cancels are allowed.
    pub multiple_cancels_allowed: bool,
    /// Hash of the agreed transfer claims.
    pub hash_transfer_init_claims: Option<String>,
    /// Hash of counter-claims accepted after a conditional reject.
    pub proposed_transfer_init_claims: Option<String>,
    /// Client-side transfer number.
    pub client_transfer_number: Option<String>,
    /// Server-side transfer number.
    pub server_transfer_number: Option<String>,
    /// Absolute lock expiry (unix millis), fixed when the lock is taken.
    pub lock_expiration: Option<u64>,

    /// Assertion claims.
    pub claims: ClaimSet,
    /// Hash chain and stored messages.
    pub ledger: IntegrityLedger,

    /// Code of the error that failed the session.
    pub error_code: Option<u32>,
    /// Message type being processed when the session failed.
    pub phase_error: Option<MessageType>,
    /// Creation time (unix millis).
    pub created_at: u64,
}

impl SessionData {
    /// Empty projection for a session.
    pub fn new(id: &str, transfer_context_id: &str, version: &str) -> Self {
        Self {
            id: id.to_string(),
            transfer_context_id: transfer_context_id.to_string(),
            version: version.to_string(),
            resource_url: String::new(),
            state: SessionState::Ongoing,
            last_sequence_number: 0,
            client_gateway_id: String::new(),
            server_gateway_id: String::new(),
            client_gateway_pubkey: String::new(),
            server_gateway_pubkey: String::new(),
            sender_network: None,
            receiver_network: None,
            digital_asset_id: None,
            asset_profile_id: None,
            originator: None,
            beneficiary: None,
            originator_pubkey: None,
            beneficiary_pubkey: None,
            sender_gateway_owner_id: None,
            receiver_gateway_owner_id: None,
            sender_asset: None,
            receiver_asset: None,
            capabilities: None,
            multiple_claims_allowed: false,
            multiple_cancels_allowed: false,
            hash_transfer_init_claims: None,
            proposed_transfer_init_claims: None,
            client_transfer_number: None,
            server_transfer_number: None,
            lock_expiration: None,
            claims: ClaimSet::default(),
            ledger: IntegrityLedger::default(),
            error_code: None,
            phase_error: None,
            created_at: now_millis(),
        }
    }

    /// Predecessor of `message_type` in this session's chain.
    pub fn expected_previous(&self, message_type: MessageType) -> Option<MessageType> {
        message_type.previous(self.ledger.contains(MessageType::InitReject))
    }

    /// Stored hash `message_type` must carry as `hashPreviousMessage`.
    ///
    /// Empty for the first message of a session.
    pub fn previous_hash(&self, message_type: MessageType) -> Result<String, SatpError> {
        match self.expected_previous(message_type) {
            None => Ok(String::new()),
            Some(previous) => self
                .ledger
                .hash(previous)
                .map(str::to_string)
                .ok_or_else(|| SatpError::SessionData(format!("no stored hash for {previous}"))),
        }
    }

    /// Move to `next` if legal.
    pub fn transition(&mut self, next: SessionState) -> Result<(), SatpError> {
        if !self.state.can_transition_to(next) {
            return Err(SatpError::SessionClosed(format!(
                "{}: {:?} -> {:?}",
                self.id, self.state, next
            )));
        }
        self.state = next;
        Ok(())
    }

    /// Fail the session with the error that stopped it.
    pub fn set_error(&mut self, error: &SatpError, phase: MessageType) {
        if self.state.is_terminal() {
            return;
        }
        self.state = SessionState::Error;
        self.error_code = Some(error.code());
        self.phase_error = Some(phase);
    }

    /// Reject operations on sessions that can make no further progress.
    pub fn verify_open(&self) -> Result<(), SatpError> {
        match self.state {
            SessionState::Completed => Err(SatpError::SessionCompleted(self.id.clone())),
            SessionState::Rejected | SessionState::Error => {
                Err(SatpError::SessionClosed(self.id.clone()))
            }
            SessionState::Ongoing | SessionState::ConditionalRejected => Ok(()),
        }
    }

    /// Stage of the latest recorded message.
    pub fn actual_stage(&self) -> Option<SatpStage> {
        self.ledger.last_type().map(MessageType::stage)
    }
}

/// One transfer attempt as seen by one gateway.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Session {
    id: String,
    transfer_context_id: String,
    client: Option<SessionData>,
    server: Option<SessionData>,
}

impl Session {
    /// Fresh session id: random uuid followed by the context id.
    pub fn generate_id(transfer_context_id: &str) -> String {
        format!("{}-{}", Uuid::new_v4(), transfer_context_id)
    }

    /// Session opened by this gateway as client.
    pub fn new_client(transfer_context_id: &str, version: &str) -> Result<Self, SatpError> {
        if transfer_context_id.is_empty() {
            return Err(SatpError::MissingParameter {
                field: "transferContextId",
            });
        }
        let id = Self::generate_id(transfer_context_id);
        Ok(Self {
            client: Some(SessionData::new(&id, transfer_context_id, version)),
            server: None,
            transfer_context_id: transfer_context_id.to_string(),
            id,
        })
    }

    /// Session created on receipt of a counterpart's session request.
    pub fn new_server(id: &str, transfer_context_id: &str, version: &str) -> Result<Self, SatpError> {
        if transfer_context_id.is_empty() {
            return Err(SatpError::MissingParameter {
                field: "transferContextId",
            });
        }
        if id.is_empty() {
            return Err(SatpError::MissingParameter { field: "sessionId" });
        }
        Ok(Self {
            id: id.to_string(),
            transfer_context_id: transfer_context_id.to_string(),
            client: None,
            server: Some(SessionData::new(id, transfer_context_id, version)),
        })
    }

    /// Session id.
    pub fn session_id(&self) -> &str {
        &self.id
    }

    /// Transfer context id.
    pub fn transfer_context_id(&self) -> &str {
        &self.transfer_context_id
    }

    /// Fail with `SessionRole` unless the session holds `role` data.
    pub fn verify(&self, role: Role) -> Result<(), SatpError> {
        let present = match role {
            Role::Client => self.client.is_some(),
            Role::Server => self.server.is_some(),
        };
        if present {
            Ok(())
        } else {
            Err(SatpError::SessionRole { expected: role })
        }
    }

    /// Projection for `role`.
    pub fn data(&self, role: Role) -> Result<&SessionData, SatpError> {
        match role {
            Role::Client => self.client.as_ref(),
            Role::Server => self.server.as_ref(),
        }
        .ok_or(SatpError::SessionRole { expected: role })
    }

    /// Mutable projection for `role`.
    pub fn data_mut(&mut self, role: Role) -> Result<&mut SessionData, SatpError> {
        match role {
            Role::Client => self.client.as_mut(),
            Role::Server => self.server.as_mut(),
        }
        .ok_or(SatpError::SessionRole { expected: role })
    }

    /// Client projection.
    pub fn client_data(&self) -> Result<&SessionData, SatpError> {
        self.data(Role::Client)
    }

    /// Server projection.
    pub fn server_data(&self) -> Result<&SessionData, SatpError> {
        self.data(Role::Server)
    }

    /// State of the held projection (client first), if any is held.
    pub fn state(&self) -> Option<SessionState> {
        self.client
            .as_ref()
            .or(self.server.as_ref())
            .map(|d| d.state)
    }

    /// Adopt the id chosen by the counterpart.
    pub(crate) fn renumber(&mut self, new_id: &str) {
        self.id = new_id.to_string();
        for data in [self.client.as_mut(), self.server.as_mut()].into_iter().flatten() {
            data.id = new_id.to_string();
        }
    }
}
