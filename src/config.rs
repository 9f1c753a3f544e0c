// src/config.rs
use std::time::Duration;

use crate::periods::Period;

/// Scrape-wide settings, built once in main and passed down explicitly.
/// The parsing core never sees this; it only receives a `DatasetSpec`.
#[derive(Debug, Clone)]
pub struct ScrapeConfig {
    /// IBGE federative-unit code (14 = Roraima).
    pub uf_code: u32,
    /// Two-letter abbreviation stored with each municipality.
    pub uf_abbr: String,
    /// Base of the legacy CNES consultation host.
    pub cnes_base: String,
    /// IBGE localities endpoint for the configured unit.
    pub ibge_municipalities_url: String,
    /// First competence with data on the portal.
    pub default_start: Period,
    pub user_agent: String,
    pub request_timeout: Duration,
    /// Pause between consecutive page requests; the portal is fragile.
    pub request_delay: Duration,
    pub max_retries: usize,
    pub retry_delay: Duration,
}

impl Default for ScrapeConfig {
    fn default() -> Self {
        let uf_code = 14;
        ScrapeConfig {
            uf_code,
            uf_abbr: "RR".to_string(),
            cnes_base: "https://cnes2.datasus.gov.br".to_string(),
            ibge_municipalities_url: format!(
                "https://servicodados.ibge.gov.br/api/v1/localidades/estados/{}/municipios",
                uf_code
            ),
            default_start: Period::new(2012, 2).expect("valid start period"),
            user_agent: "Mozilla/5.0 (compatible; CNES-scraper)".to_string(),
            request_timeout: Duration::from_secs(30),
            request_delay: Duration::from_millis(800),
            max_retries: 3,
            retry_delay: Duration::from_millis(1200),
        }
    }
}
