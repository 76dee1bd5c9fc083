//! Cross-gateway scenarios.

mod e2e_transfer;
mod integrity;
mod negotiation;
mod recovery;
