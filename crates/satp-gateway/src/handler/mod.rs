//! # Handlers
//!
//! The two faces of a gateway: `ServerHandler` answers a counterpart's
//! requests, `ClientHandler` turns the client-side stage services into
//! uniform steps for the manager.

pub mod client;
pub mod server;

pub use client::{ClientHandler, StepOutcome};
pub use server::ServerHandler;
