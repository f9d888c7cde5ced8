use async_trait::async_trait;
use chrono::{DateTime, Utc};
use skyfare_core::repository::FareHistoryRepository;
use skyfare_core::{CoreResult, FareHistoryEntry, FarePoint};
use crate::database::db_error;
use crate::flight_repo::PgStore;

#[derive(sqlx::FromRow)]
struct FarePointRow {
    timestamp: DateTime<Utc>,
    fare_cents: i64,
}

#[async_trait]
impl FareHistoryRepository for PgStore {
    async fn append_fare(&self, entry: &FareHistoryEntry) -> CoreResult<()> {
        sqlx::query("INSERT INTO fare_history (flight_no, timestamp, fare_cents) VALUES ($1, $2, $3)")
            .bind(&entry.flight_no)
            .bind(entry.timestamp)
            .bind(entry.fare_cents)
            .execute(&self.pool)
            .await
            .map_err(db_error)?;
        Ok(())
    }

    async fn recent_fares(&self, flight_no: &str, limit: usize) -> CoreResult<Vec<FarePoint>> {
        let rows = sqlx::query_as::<_, FarePointRow>(
            r#"
            SELECT timestamp, fare_cents FROM fare_history
            WHERE flight_no = $1
            ORDER BY timestamp DESC, id DESC
            LIMIT $2
            "#,
        )
        .bind(flight_no)
        .bind(i64::try_from(limit).unwrap_or(i64::MAX))
        .fetch_all(&self.pool)
        .await
        .map_err(db_error)?;

        Ok(rows
            .into_iter()
            .map(|row| FarePoint {
                timestamp: row.timestamp,
                fare_cents: row.fare_cents,
            })
            .collect())
    }

    async fn has_fare_history(&self, flight_no: &str) -> CoreResult<bool> {
        sqlx::query_scalar::<_, bool>("SELECT EXISTS(SELECT 1 FROM fare_history WHERE flight_no = $1)")
            .bind(flight_no)
            .fetch_one(&self.pool)
            .await
            .map_err(db_error)
    }
}
