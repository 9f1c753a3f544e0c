// src/fetch/municipalities.rs
use anyhow::{Context, Result};
use reqwest::Client;
use serde::Deserialize;
use tracing::info;

use crate::config::ScrapeConfig;

/// One municipality of the configured federative unit, with the 6-digit
/// code the CNES query interface expects.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Municipality {
    pub code: String,
    pub name: String,
}

#[derive(Debug, Deserialize)]
struct IbgeMunicipality {
    id: u64,
    nome: String,
}

/// Fetch the municipality directory from the IBGE localities API.
///
/// IBGE ids carry seven digits; CNES drops the trailing check digit, so
/// the last digit is cut off. The list is sorted by numeric code to keep
/// run order deterministic.
pub async fn fetch_municipalities(
    client: &Client,
    cfg: &ScrapeConfig,
) -> Result<Vec<Municipality>> {
    let resp = client
        .get(&cfg.ibge_municipalities_url)
        .send()
        .await
        .context("requesting IBGE municipality directory")?
        .error_for_status()
        .context("IBGE municipality directory status")?;
    let raw: Vec<IbgeMunicipality> = resp
        .json()
        .await
        .context("decoding IBGE municipality payload")?;

    let mut out: Vec<Municipality> = raw
        .into_iter()
        .map(|m| {
            let id = m.id.to_string();
            let cut = id.len().saturating_sub(1);
            Municipality {
                code: id[..cut].to_string(),
                name: m.nome,
            }
        })
        .collect();
    out.sort_by_key(|m| m.code.parse::<u64>().unwrap_or(u64::MAX));

    info!(count = out.len(), uf = cfg.uf_code, "municipality directory loaded");
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ibge_payload_shape_decodes() {
        let payload = r#"[{"id":1400027,"nome":"Amajari","extra":{"ignored":true}},
                          {"id":1400050,"nome":"Alto Alegre"}]"#;
        let raw: Vec<IbgeMunicipality> = serde_json::from_str(payload).unwrap();
        assert_eq!(raw.len(), 2);
        assert_eq!(raw[0].nome, "Amajari");
    }

    #[test]
    fn check_digit_is_dropped() {
        let id = 1400027u64.to_string();
        assert_eq!(&id[..id.len() - 1], "140002");
    }
}
