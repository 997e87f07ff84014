use std::str::FromStr;

use chrono::{NaiveDate, Utc};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use tse_core::AssetDocument;

use crate::error::ProviderResult;

/// Persistent store for `AssetDocument`s, keyed by `{symbol}_{provider_id}`.
#[derive(Clone)]
pub struct DocumentStore {
    pool: SqlitePool,
}

impl DocumentStore {
    pub async fn connect(database_url: &str) -> ProviderResult<Self> {
        let options = SqliteConnectOptions::from_str(database_url)?.create_if_missing(true);

        let pool = SqlitePoolOptions::new().max_connections(5).connect_with(options).await?;

        let store = Self { pool };
        store.init_schema().await?;
        Ok(store)
    }

    async fn init_schema(&self) -> ProviderResult<()> {
        let schema = include_str!("../../../schema.sql");
        for statement in schema.split(';') {
            let stmt = statement.trim();
            if !stmt.is_empty() {
                sqlx::query(stmt).execute(&self.pool).await?;
            }
        }
        Ok(())
    }

    /// Idempotent insert-or-replace keyed by the document's `_id`.
    pub async fn upsert(&self, doc: &AssetDocument) -> ProviderResult<()> {
        let body = serde_json::to_string(doc)?;
        sqlx::query(
            "INSERT INTO asset_documents (id, symbol, provider_id, analysis_datetime, document)
             VALUES (?1, ?2, ?3, ?4, ?5)
             ON CONFLICT(id) DO UPDATE SET
                analysis_datetime = excluded.analysis_datetime,
                document = excluded.document",
        )
        .bind(&doc.id)
        .bind(&doc.symbol)
        .bind(&doc.provider_id)
        .bind(doc.analysis_datetime.to_rfc3339())
        .bind(body)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    pub async fn get(&self, id: &str) -> ProviderResult<Option<AssetDocument>> {
        let row: Option<(String,)> = sqlx::query_as("SELECT document FROM asset_documents WHERE id = ?1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        match row {
            Some((body,)) => Ok(Some(serde_json::from_str(&body)?)),
            None => Ok(None),
        }
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

/// Freshness gate for the data-preparation orchestrator: re-fetch unless
/// a document already exists for today. Three cases: no document, or a
/// document whose `analysis_datetime` is strictly before today, both
/// trigger a re-run; a document dated today or a date in the future
/// (the latter logged as an anomaly, never trusted blindly) does not.
pub fn should_run(existing: Option<&AssetDocument>, today: NaiveDate) -> bool {
    match existing {
        None => true,
        Some(doc) => {
            let doc_date = doc.analysis_datetime.date_naive();
            if doc_date > today {
                tracing::warn!(id = %doc.id, doc_date = %doc_date, today = %today, "document dated in the future");
                false
            } else {
                doc_date < today
            }
        }
    }
}

pub fn today_utc() -> NaiveDate {
    Utc::now().date_naive()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{DateTime, Duration};
    use serde_json::json;

    fn doc_dated(date: NaiveDate) -> AssetDocument {
        AssetDocument {
            id: "فملی_1".into(),
            provider_id: "1".into(),
            symbol: "فملی".into(),
            short_name: "فملی".into(),
            analysis_datetime: DateTime::from_naive_utc_and_offset(date.and_hms_opt(9, 0, 0).unwrap(), Utc),
            current_price: 1000.0,
            general_snapshot: json!({}),
            technical_analysis: json!({}),
            fundamental_analysis: Default::default(),
            social_post: json!({}),
            news_announcements: json!({}),
            search: json!({}),
        }
    }

    #[test]
    fn missing_document_always_runs() {
        let today = NaiveDate::from_ymd_opt(2026, 1, 1).unwrap();
        assert!(should_run(None, today));
    }

    #[test]
    fn stale_document_runs_again() {
        let today = NaiveDate::from_ymd_opt(2026, 1, 2).unwrap();
        let doc = doc_dated(today - Duration::days(1));
        assert!(should_run(Some(&doc), today));
    }

    #[test]
    fn fresh_document_skips() {
        let today = NaiveDate::from_ymd_opt(2026, 1, 2).unwrap();
        let doc = doc_dated(today);
        assert!(!should_run(Some(&doc), today));
    }

    #[test]
    fn future_dated_document_is_treated_as_anomaly_and_skips() {
        let today = NaiveDate::from_ymd_opt(2026, 1, 2).unwrap();
        let doc = doc_dated(today + Duration::days(1));
        assert!(!should_run(Some(&doc), today));
    }

    #[tokio::test]
    async fn upsert_then_get_round_trips() {
        let store = DocumentStore::connect("sqlite::memory:").await.unwrap();
        let today = NaiveDate::from_ymd_opt(2026, 1, 1).unwrap();
        let doc = doc_dated(today);
        store.upsert(&doc).await.unwrap();
        let fetched = store.get(&doc.id).await.unwrap().unwrap();
        assert_eq!(fetched.symbol, doc.symbol);
    }
}
