//! # SATP Test Suite
//!
//! Two gateways wired in process, exercising whole transfers.
//!
//! ## Structure
//!
//! ```text
//! tests/src/
//! ├── harness.rs        # Two gateways, in-memory ledgers, faulty link, crashing audit log
//! └── integration/
//!     ├── e2e_transfer.rs   # Full transfers and their ledgers
//!     ├── negotiation.rs    # Rejections and counter-claims
//!     ├── integrity.rs      # Tampering and replays against the server
//!     └── recovery.rs       # Interrupted exchanges and resumption
//! ```
//!
//! ## Running Tests
//!
//! ```bash
//! # All tests
//! cargo test -p satp-tests
//!
//! # By category
//! cargo test -p satp-tests integration::recovery::
//!
//! # With protocol logs
//! SATP_LOG_LEVEL=debug cargo test -p satp-tests -- --nocapture
//! ```

pub mod harness;
pub mod integration;
