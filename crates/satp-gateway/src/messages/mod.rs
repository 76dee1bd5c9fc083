//! # Protocol Messages
//!
//! Stage-tagged message structs sharing one `CommonHeader`, and the closed
//! `SatpMessage` union used to store and recover them.
//!
//! ## Signature Fields
//!
//! The header has one signature slot per role. Requests are signed by the
//! client (`clientSignature`), responses by the server (`serverSignature`).
//! Signatures cover the message with both slots empty; hashes cover the
//! message as sent, signature included.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::domain::{MessageType, Role, SatpError};

pub mod stage0;
pub mod stage1;
pub mod stage2;
pub mod stage3;

pub use stage0::{NewSessionRequest, NewSessionResponse, PreSatpTransferRequest, PreSatpTransferResponse};
pub use stage1::{
    TransferCommenceRequest, TransferCommenceResponse, TransferProposalReceipt,
    TransferProposalRequest,
};
pub use stage2::{LockAssertionReceipt, LockAssertionRequest};
pub use stage3::{
    CommitFinalAcknowledgementReceipt, CommitFinalAssertionRequest, CommitPreparationRequest,
    CommitReadyResponse, TransferCompleteRequest, TransferCompleteResponse,
};

/// Fields every protocol message carries.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommonHeader {
    /// Protocol version.
    pub version: String,
    /// Message type.
    pub message_type: MessageType,
    /// Session id.
    pub session_id: String,
    /// Transfer context id.
    pub transfer_context_id: String,
    /// Sequence number, `last + 1` of the sending side.
    pub sequence_number: u64,
    /// Resource URL of the session.
    pub resource_url: String,
    /// Client gateway public key (hex).
    pub client_gateway_pubkey: String,
    /// Server gateway public key (hex).
    pub server_gateway_pubkey: String,
    /// Stored hash of the preceding message; empty for the first message.
    pub hash_previous_message: String,
    /// Client-side transfer number, if assigned.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client_transfer_number: Option<String>,
    /// Server-side transfer number, if assigned.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub server_transfer_number: Option<String>,
    /// Client signature (requests).
    #[serde(default)]
    pub client_signature: String,
    /// Server signature (responses).
    #[serde(default)]
    pub server_signature: String,
}

impl CommonHeader {
    /// Signature slot of `role`.
    pub fn signature(&self, role: Role) -> &str {
        match role {
            Role::Client => &self.client_signature,
            Role::Server => &self.server_signature,
        }
    }

    /// Fill the signature slot of `role`.
    pub fn set_signature(&mut self, role: Role, signature: String) {
        match role {
            Role::Client => self.client_signature = signature,
            Role::Server => self.server_signature = signature,
        }
    }

    /// Empty both signature slots.
    pub fn clear_signatures(&mut self) {
        self.client_signature.clear();
        self.server_signature.clear();
    }
}

/// Behaviour shared by every concrete message struct.
pub trait ProtocolMessage:
    Serialize + DeserializeOwned + Clone + fmt::Debug + Send + Sync + 'static
{
    /// Header.
    fn header(&self) -> &CommonHeader;

    /// Mutable header.
    fn header_mut(&mut self) -> &mut CommonHeader;

    /// Wrap into the closed union.
    fn into_envelope(self) -> SatpMessage;

    /// Unwrap from the closed union if the variant matches.
    fn from_envelope(message: SatpMessage) -> Option<Self>;

    /// Message type from the header.
    fn message_type(&self) -> MessageType {
        self.header().message_type
    }
}

macro_rules! satp_messages {
    ($($variant:ident),+ $(,)?) => {
        /// Closed union of all protocol messages.
        #[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
        #[serde(tag = "kind", content = "body")]
        pub enum SatpMessage {
            $(
                #[doc = stringify!($variant)]
                $variant($variant),
            )+
        }

        impl SatpMessage {
            /// Header of the wrapped message.
            pub fn header(&self) -> &CommonHeader {
                match self {
                    $( SatpMessage::$variant(m) => &m.common, )+
                }
            }

            /// Canonical bytes of the wrapped message, as hashed and signed.
            pub fn canonical_bytes(&self) -> Result<Vec<u8>, SatpError> {
                match self {
                    $( SatpMessage::$variant(m) => Ok(serde_json::to_vec(m)?), )+
                }
            }
        }

        $(
            impl ProtocolMessage for $variant {
                fn header(&self) -> &CommonHeader {
                    &self.common
                }

                fn header_mut(&mut self) -> &mut CommonHeader {
                    &mut self.common
                }

                fn into_envelope(self) -> SatpMessage {
                    SatpMessage::$variant(self)
                }

                fn from_envelope(message: SatpMessage) -> Option<Self> {
                    match message {
                        SatpMessage::$variant(m) => Some(m),
                        _ => None,
                    }
                }
            }

            impl From<$variant> for SatpMessage {
                fn from(message: $variant) -> Self {
                    SatpMessage::$variant(message)
                }
            }
        )+
    };
}

satp_messages!(
    NewSessionRequest,
    NewSessionResponse,
    PreSatpTransferRequest,
    PreSatpTransferResponse,
    TransferProposalRequest,
    TransferProposalReceipt,
    TransferCommenceRequest,
    TransferCommenceResponse,
    LockAssertionRequest,
    LockAssertionReceipt,
    CommitPreparationRequest,
    CommitReadyResponse,
    CommitFinalAssertionRequest,
    CommitFinalAcknowledgementReceipt,
    TransferCompleteRequest,
    TransferCompleteResponse,
);

impl SatpMessage {
    /// Message type from the header.
    pub fn message_type(&self) -> MessageType {
        self.header().message_type
    }

    /// Unwrap into a concrete message type.
    pub fn into_typed<M: ProtocolMessage>(self) -> Result<M, SatpError> {
        let actual = self.message_type();
        M::from_envelope(self).ok_or_else(|| SatpError::MessageTypeMismatch {
            expected: std::any::type_name::<M>()
                .rsplit("::")
                .next()
                .unwrap_or_default()
                .to_string(),
            actual,
        })
    }
}

/// Typed failure a server returns instead of a response.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorResponse {
    /// Session the failed request addressed.
    pub session_id: String,
    /// Type of the request that failed.
    pub message_type: MessageType,
    /// Stable error code.
    pub error_code: u32,
    /// Human readable reason.
    pub reason: String,
}

impl ErrorResponse {
    /// Build from a protocol error.
    pub fn from_error(session_id: &str, message_type: MessageType, error: &SatpError) -> Self {
        Self {
            session_id: session_id.to_string(),
            message_type,
            error_code: error.code(),
            reason: error.to_string(),
        }
    }

    /// Protocol error seen by the client.
    pub fn into_error(self) -> SatpError {
        SatpError::Rejected {
            message_type: self.message_type,
            code: self.error_code,
            reason: self.reason,
        }
    }
}
