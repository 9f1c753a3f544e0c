// src/store/mod.rs
//
// Postgres sink: three upsert-or-create dimensions and one JSONB fact
// table keyed by (period_id, municipality_id, item_id). The dedupe pass
// guarantees the batch handed to `upsert_facts` has no duplicate key.

use std::env;

use anyhow::{Context, Result};
use sqlx::postgres::{PgPool, PgPoolOptions};
use sqlx::Row;
use tracing::info;

use crate::merge::FactRecord;
use crate::periods::Period;

const SCHEMA: &[&str] = &[
    "CREATE TABLE IF NOT EXISTS dim_period (
        period_id   SERIAL PRIMARY KEY,
        vcomp       CHAR(6) NOT NULL UNIQUE,
        year        INT NOT NULL,
        month       INT NOT NULL,
        ref_date    DATE NOT NULL
    )",
    "CREATE TABLE IF NOT EXISTS dim_municipality (
        municipality_id SERIAL PRIMARY KEY,
        code            VARCHAR(6) NOT NULL UNIQUE,
        uf              CHAR(2) NOT NULL,
        name            TEXT NOT NULL
    )",
    "CREATE TABLE IF NOT EXISTS dim_item (
        item_id     BIGSERIAL PRIMARY KEY,
        kind        TEXT NOT NULL,
        code        TEXT NOT NULL,
        group_label TEXT,
        description TEXT,
        UNIQUE (kind, code)
    )",
    "CREATE TABLE IF NOT EXISTS cnes_fact (
        period_id       INT NOT NULL REFERENCES dim_period (period_id),
        municipality_id INT NOT NULL REFERENCES dim_municipality (municipality_id),
        item_id         BIGINT NOT NULL REFERENCES dim_item (item_id),
        metrics         JSONB NOT NULL,
        loaded_at       TIMESTAMPTZ NOT NULL DEFAULT NOW(),
        PRIMARY KEY (period_id, municipality_id, item_id)
    )",
];

/// Connection string from the environment: DATABASE_URL wins, otherwise
/// the conventional PG* variables with local defaults.
pub fn database_url_from_env() -> String {
    if let Ok(url) = env::var("DATABASE_URL") {
        return url;
    }
    let host = env::var("PGHOST").unwrap_or_else(|_| "localhost".to_string());
    let port = env::var("PGPORT").unwrap_or_else(|_| "5432".to_string());
    let user = env::var("PGUSER").unwrap_or_else(|_| "postgres".to_string());
    let password = env::var("PGPASSWORD").unwrap_or_else(|_| "postgres".to_string());
    let database = env::var("PGDATABASE").unwrap_or_else(|_| "saude_rr".to_string());
    format!("postgres://{user}:{password}@{host}:{port}/{database}")
}

pub struct Store {
    pool: PgPool,
}

impl Store {
    pub async fn connect(database_url: &str) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(4)
            .connect(database_url)
            .await
            .context("connecting to Postgres")?;
        Ok(Store { pool })
    }

    /// Idempotent bootstrap of the dims and the fact table.
    pub async fn ensure_schema(&self) -> Result<()> {
        for ddl in SCHEMA {
            sqlx::query(ddl)
                .execute(&self.pool)
                .await
                .context("creating schema")?;
        }
        info!("schema ensured");
        Ok(())
    }

    pub async fn resolve_period(&self, period: Period) -> Result<i32> {
        let row = sqlx::query(
            "INSERT INTO dim_period (vcomp, year, month, ref_date)
             VALUES ($1, $2, $3, $4)
             ON CONFLICT (vcomp)
             DO UPDATE SET year = EXCLUDED.year, month = EXCLUDED.month,
                           ref_date = EXCLUDED.ref_date
             RETURNING period_id",
        )
        .bind(period.vcomp())
        .bind(period.year())
        .bind(period.month() as i32)
        .bind(period.first_day())
        .fetch_one(&self.pool)
        .await
        .with_context(|| format!("resolving period {}", period))?;
        Ok(row.get(0))
    }

    pub async fn resolve_municipality(&self, code: &str, uf: &str, name: &str) -> Result<i32> {
        let row = sqlx::query(
            "INSERT INTO dim_municipality (code, uf, name)
             VALUES ($1, $2, $3)
             ON CONFLICT (code)
             DO UPDATE SET uf = EXCLUDED.uf, name = EXCLUDED.name
             RETURNING municipality_id",
        )
        .bind(code)
        .bind(uf)
        .bind(name)
        .fetch_one(&self.pool)
        .await
        .with_context(|| format!("resolving municipality {}", code))?;
        Ok(row.get(0))
    }

    /// Items keep the freshest group label but never lose a description
    /// to a month that omitted it.
    pub async fn resolve_item(
        &self,
        kind: &str,
        code: &str,
        group_label: Option<&str>,
        description: Option<&str>,
    ) -> Result<i64> {
        let row = sqlx::query(
            "INSERT INTO dim_item (kind, code, group_label, description)
             VALUES ($1, $2, $3, $4)
             ON CONFLICT (kind, code)
             DO UPDATE SET group_label = EXCLUDED.group_label,
                           description = COALESCE(EXCLUDED.description, dim_item.description)
             RETURNING item_id",
        )
        .bind(kind)
        .bind(code)
        .bind(group_label)
        .bind(description)
        .fetch_one(&self.pool)
        .await
        .with_context(|| format!("resolving item {}/{}", kind, code))?;
        Ok(row.get(0))
    }

    /// True when the fact table already has any row of `kind` for the
    /// period — the skip probe for resumed runs.
    pub async fn period_loaded(&self, kind: &str, period_id: i32) -> Result<bool> {
        let row = sqlx::query(
            "SELECT 1 FROM cnes_fact f
             JOIN dim_item i ON i.item_id = f.item_id
             WHERE f.period_id = $1 AND i.kind = $2
             LIMIT 1",
        )
        .bind(period_id)
        .bind(kind)
        .fetch_optional(&self.pool)
        .await
        .context("probing loaded period")?;
        Ok(row.is_some())
    }

    /// Upsert a deduplicated batch in one transaction; metrics overwrite
    /// on conflict and loaded_at refreshes. Returns the row count.
    pub async fn upsert_facts(&self, batch: &[FactRecord]) -> Result<u64> {
        let mut tx = self.pool.begin().await.context("opening transaction")?;
        let mut count = 0u64;
        for record in batch {
            let metrics =
                serde_json::to_value(&record.metrics).context("serializing metrics")?;
            sqlx::query(
                "INSERT INTO cnes_fact (period_id, municipality_id, item_id, metrics)
                 VALUES ($1, $2, $3, $4)
                 ON CONFLICT (period_id, municipality_id, item_id)
                 DO UPDATE SET metrics = EXCLUDED.metrics, loaded_at = NOW()",
            )
            .bind(record.key.period_id)
            .bind(record.key.municipality_id)
            .bind(record.key.item_id)
            .bind(metrics)
            .execute(&mut *tx)
            .await
            .context("upserting fact row")?;
            count += 1;
        }
        tx.commit().await.context("committing fact batch")?;
        Ok(count)
    }
}
