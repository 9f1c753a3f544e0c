use anyhow::Result;
use clap::{Parser, ValueEnum};
use cnesscraper::{
    config::ScrapeConfig,
    fetch, merge,
    merge::{FactKey, FactRecord},
    parse::{self, DatasetKind},
    periods::Period,
    store::{self, Store},
};
use tokio::time::sleep;
use tracing::{info, warn};
use tracing_subscriber::{fmt, EnvFilter};

#[derive(Debug, Clone, Copy, ValueEnum)]
enum KindArg {
    BedType,
    Equipment,
    FacilityType,
    All,
}

#[derive(Parser)]
#[command(about = "Scrape CNES indicator tables into Postgres")]
struct Args {
    /// Dataset to scrape.
    #[arg(long, value_enum, default_value = "all")]
    kind: KindArg,
    /// Reprocess periods already present in the fact table.
    #[arg(long)]
    force: bool,
    /// First competence, AAAAMM. Defaults to the portal's first month.
    #[arg(long)]
    from: Option<Period>,
    /// Last competence, AAAAMM. Defaults to the current month.
    #[arg(long)]
    to: Option<Period>,
}

#[tokio::main]
async fn main() -> Result<()> {
    // ─── 1) init logging ─────────────────────────────────────────────
    let env = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    fmt::Subscriber::builder().with_env_filter(env).init();
    info!("startup");

    // ─── 2) cli + config ─────────────────────────────────────────────
    let args = Args::parse();
    let cfg = ScrapeConfig::default();
    let kinds: Vec<DatasetKind> = match args.kind {
        KindArg::BedType => vec![DatasetKind::BedType],
        KindArg::Equipment => vec![DatasetKind::Equipment],
        KindArg::FacilityType => vec![DatasetKind::FacilityType],
        KindArg::All => DatasetKind::ALL.to_vec(),
    };
    let from = args.from.unwrap_or(cfg.default_start);
    let to = args.to.unwrap_or_else(Period::current);
    let periods = Period::range_inclusive(from, to);
    info!(%from, %to, months = periods.len(), "competence range");

    // ─── 3) database ─────────────────────────────────────────────────
    let store = Store::connect(&store::database_url_from_env()).await?;
    store.ensure_schema().await?;

    // ─── 4) municipality directory ───────────────────────────────────
    let client = fetch::build_client(&cfg)?;
    let municipalities = fetch::municipalities::fetch_municipalities(&client, &cfg).await?;

    // ─── 5) scrape loop ──────────────────────────────────────────────
    let mut total = 0u64;
    for kind in kinds {
        let spec = kind.spec();
        info!(kind = ?kind, "starting dataset");

        for &period in &periods {
            let period_id = store.resolve_period(period).await?;
            if !args.force && store.period_loaded(spec.item_kind, period_id).await? {
                info!(%period, kind = ?kind, "already loaded; skipping");
                continue;
            }

            let mut batch: Vec<FactRecord> = Vec::new();
            for municipality in &municipalities {
                let fetched = fetch::pages::fetch_indicator_page(
                    &client,
                    &cfg,
                    spec,
                    &municipality.code,
                    period,
                )
                .await;
                sleep(cfg.request_delay).await;

                // a failed fetch and a page without data are the same
                // thing here: this unit contributes nothing
                let html = match fetched {
                    Ok(html) => html,
                    Err(e) => {
                        warn!(%period, municipality = %municipality.code,
                              "fetch failed: {e:#}");
                        continue;
                    }
                };
                let records = match parse::parse_page(spec, &html) {
                    Ok(Some(records)) => records,
                    Ok(None) => continue,
                    Err(e) => {
                        warn!(%period, municipality = %municipality.code,
                              "parse failed: {e}");
                        continue;
                    }
                };

                let canonical = merge::aggregate(spec, records);
                let municipality_id = store
                    .resolve_municipality(&municipality.code, &cfg.uf_abbr, &municipality.name)
                    .await?;
                for record in canonical {
                    let item_id = store
                        .resolve_item(
                            spec.item_kind,
                            &record.code,
                            record.group.as_deref(),
                            record.description.as_deref(),
                        )
                        .await?;
                    batch.push(FactRecord {
                        key: FactKey {
                            period_id,
                            municipality_id,
                            item_id,
                        },
                        metrics: record.metrics,
                    });
                }
            }

            if batch.is_empty() {
                info!(%period, kind = ?kind, "no data");
                continue;
            }
            let batch = merge::dedupe(batch);
            let upserted = store.upsert_facts(&batch).await?;
            total += upserted;
            info!(%period, kind = ?kind, upserted, total, "period committed");
        }
    }

    info!(total, "all done");
    Ok(())
}
