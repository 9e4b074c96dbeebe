// vk - Vault login bootstrapper, library root for testing

pub mod auth;
pub mod cli;
pub mod config;
pub mod error;
pub mod vault;
