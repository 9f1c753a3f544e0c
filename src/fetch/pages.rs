// src/fetch/pages.rs
use anyhow::Result;
use reqwest::Client;
use tokio::time::sleep;
use tracing::warn;
use url::Url;

use crate::config::ScrapeConfig;
use crate::parse::DatasetSpec;
use crate::periods::Period;

/// Fetch one indicator page for a (municipality, period) query.
///
/// Retries transient failures with a linearly growing pause. The page is
/// served as ISO-8859-1 without a charset header, so that encoding is the
/// decode fallback.
pub async fn fetch_indicator_page(
    client: &Client,
    cfg: &ScrapeConfig,
    spec: &DatasetSpec,
    municipality_code: &str,
    period: Period,
) -> Result<String> {
    let url = Url::parse_with_params(
        &format!("{}/{}", cfg.cnes_base, spec.page),
        &[
            ("VEstado", cfg.uf_code.to_string()),
            ("VMun", municipality_code.to_string()),
            ("VComp", period.vcomp()),
        ],
    )?;

    let mut attempt = 0;
    loop {
        attempt += 1;
        let backoff = cfg.retry_delay * attempt as u32;

        match client.get(url.clone()).send().await {
            Ok(resp) if resp.status().is_success() => {
                match resp.text_with_charset("ISO-8859-1").await {
                    Ok(body) => return Ok(body),
                    Err(_) if attempt < cfg.max_retries => {
                        warn!(%url, attempt, "body decode failed; retrying");
                        sleep(backoff).await;
                    }
                    Err(e) => return Err(e.into()),
                }
            }
            Ok(resp) if attempt < cfg.max_retries => {
                warn!(%url, attempt, status = %resp.status(), "bad status; retrying");
                sleep(backoff).await;
            }
            Ok(resp) => return Err(anyhow::anyhow!("HTTP error: {}", resp.status())),
            Err(_) if attempt < cfg.max_retries => {
                warn!(%url, attempt, "request failed; retrying");
                sleep(backoff).await;
            }
            Err(e) => return Err(e.into()),
        }
    }
}
