//! Domain types consumed by the authorization server.

pub mod client;

pub use client::{
    AllowsGrantType, AllowsResponseType, Client, SimpleClient, ValidatesRedirectUri,
    ValidatesSecret,
};
