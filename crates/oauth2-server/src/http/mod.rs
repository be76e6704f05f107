//! HTTP response rendering.
//!
//! Routing and the server loop belong to the embedding application; this
//! module only turns results into axum responses.

pub mod respond;
