//! Storage seams consumed by the authorization server.

pub mod client;

pub use client::{ClientRepository, InMemoryClientRepository, get_client};
