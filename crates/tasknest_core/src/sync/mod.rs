//! Remote synchronization boundary.
//!
//! # Responsibility
//! - Define the outbound contract the store forwards mutations through.
//!
//! # Invariants
//! - The store never implements transport, retries or auth; any transport
//!   adapter implements [`backend::BackendSync`].
//! - Forwarding failures are logged at the call site and never alter store
//!   state.

pub mod backend;
