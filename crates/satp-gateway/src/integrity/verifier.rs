//! # Message Verifier
//!
//! Validates an incoming message against the receiving side's session data.
//! Checks run in a fixed order and the first failure aborts:
//!
//! 1. Required fields
//! 2. Version
//! 3. Message type
//! 4. Session id
//! 5. Sequence number (`last + 1`)
//! 6. Hash chain (`hashPreviousMessage` equals the stored predecessor hash)
//! 7. Gateway public keys
//! 8. Transfer context
//! 9. Signature of the sending side

use super::verify_message_signature;
use crate::domain::{MessageType, Role, SatpError, SessionData};
use crate::messages::{CommonHeader, ProtocolMessage};

/// Verifier bound to one session projection.
pub struct MessageVerifier<'a> {
    session: &'a SessionData,
    session_id: &'a str,
}

impl<'a> MessageVerifier<'a> {
    /// Verifier over `session`, expecting messages to name its id.
    pub fn new(session: &'a SessionData) -> Self {
        Self {
            session,
            session_id: &session.id,
        }
    }

    /// Expect `session_id` instead of the session's own id. Only the
    /// session-opening exchange, which may renumber, needs this.
    pub fn expecting_session(mut self, session_id: &'a str) -> Self {
        self.session_id = session_id;
        self
    }

    /// Run every check on `message`, sent by `sender`, which must be one
    /// of the `accepted` types.
    pub fn verify<M: ProtocolMessage>(
        &self,
        message: &M,
        accepted: &[MessageType],
        sender: Role,
    ) -> Result<(), SatpError> {
        let header = message.header();

        check_required_fields(header)?;
        self.check_version(header)?;
        check_message_type(header, accepted)?;
        self.check_session_id(header)?;
        self.check_sequence_number(header)?;
        self.check_hash_chain(header)?;
        self.check_pubkeys(header)?;
        self.check_transfer_context(header)?;

        let sender_key = match sender {
            Role::Client => &self.session.client_gateway_pubkey,
            Role::Server => &self.session.server_gateway_pubkey,
        };
        verify_message_signature(message, sender, sender_key)
    }

    fn check_version(&self, header: &CommonHeader) -> Result<(), SatpError> {
        if header.version != self.session.version {
            return Err(SatpError::VersionMismatch {
                expected: self.session.version.clone(),
                actual: header.version.clone(),
            });
        }
        Ok(())
    }

    fn check_session_id(&self, header: &CommonHeader) -> Result<(), SatpError> {
        if header.session_id != self.session_id {
            return Err(SatpError::SessionMissMatch {
                session_id: header.session_id.clone(),
            });
        }
        Ok(())
    }

    fn check_sequence_number(&self, header: &CommonHeader) -> Result<(), SatpError> {
        let expected = self.session.last_sequence_number + 1;
        if header.sequence_number != expected {
            return Err(SatpError::SequenceNumber {
                expected,
                actual: header.sequence_number,
            });
        }
        Ok(())
    }

    fn check_hash_chain(&self, header: &CommonHeader) -> Result<(), SatpError> {
        let expected = match self.session.expected_previous(header.message_type) {
            None => "",
            Some(previous) => self.session.ledger.hash(previous).ok_or_else(|| {
                SatpError::HashChain {
                    message_type: header.message_type,
                    expected: format!("<no {previous} recorded>"),
                    actual: header.hash_previous_message.clone(),
                }
            })?,
        };
        if header.hash_previous_message != expected {
            return Err(SatpError::HashChain {
                message_type: header.message_type,
                expected: expected.to_string(),
                actual: header.hash_previous_message.clone(),
            });
        }
        Ok(())
    }

    fn check_pubkeys(&self, header: &CommonHeader) -> Result<(), SatpError> {
        if header.client_gateway_pubkey != self.session.client_gateway_pubkey {
            return Err(SatpError::ClientPubkey);
        }
        if header.server_gateway_pubkey != self.session.server_gateway_pubkey {
            return Err(SatpError::ServerPubkey);
        }
        Ok(())
    }

    fn check_transfer_context(&self, header: &CommonHeader) -> Result<(), SatpError> {
        if header.transfer_context_id != self.session.transfer_context_id {
            return Err(SatpError::TransferContextId {
                expected: self.session.transfer_context_id.clone(),
                actual: header.transfer_context_id.clone(),
            });
        }
        Ok(())
    }
}

fn check_required_fields(header: &CommonHeader) -> Result<(), SatpError> {
    let required: [(&'static str, &str); 6] = [
        ("version", header.version.as_str()),
        ("sessionId", header.session_id.as_str()),
        ("transferContextId", header.transfer_context_id.as_str()),
        ("resourceUrl", header.resource_url.as_str()),
        ("clientGatewayPubkey", header.client_gateway_pubkey.as_str()),
        ("serverGatewayPubkey", header.server_gateway_pubkey.as_str()),
    ];
    match required.iter().find(|(_, value)| value.is_empty()) {
        Some((field, _)) => Err(SatpError::MissingParameter { field: *field }),
        None => Ok(()),
    }
}

fn check_message_type(header: &CommonHeader, accepted: &[MessageType]) -> Result<(), SatpError> {
    if !accepted.contains(&header.message_type) {
        let expected = accepted
            .iter()
            .map(|t| t.as_str())
            .collect::<Vec<_>>()
            .join(" | ");
        return Err(SatpError::MessageTypeMismatch {
            expected,
            actual: header.message_type,
        });
    }
    Ok(())
}
