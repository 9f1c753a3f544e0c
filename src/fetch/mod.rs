// src/fetch/mod.rs
pub mod municipalities;
pub mod pages;

use anyhow::Result;
use reqwest::Client;

use crate::config::ScrapeConfig;

/// HTTP client for both the IBGE API and the legacy CNES host. The CNES
/// endpoint still serves an expired certificate chain, hence the invalid-
/// cert tolerance.
pub fn build_client(cfg: &ScrapeConfig) -> Result<Client> {
    Client::builder()
        .user_agent(cfg.user_agent.clone())
        .timeout(cfg.request_timeout)
        .danger_accept_invalid_certs(true)
        .build()
        .map_err(Into::into)
}
