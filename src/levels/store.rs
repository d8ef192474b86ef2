use async_trait::async_trait;
use chrono::NaiveDate;
use sqlx::{PgConnection, PgPool, Postgres, QueryBuilder};
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use tokio::sync::Mutex;
use tracing::info;

use super::DailyLevel;
use crate::data::DataResult;

pub const TABLE_NAME: &str = "daily_high_low";

// Postgres caps bind parameters at 65535 per statement
const INSERT_BATCH_SIZE: usize = 1000;

/// Distinct symbols per captured date, skipping records captured on `except`
pub fn symbols_by_date(
    records: &[DailyLevel],
    except: Option<NaiveDate>,
) -> BTreeMap<NaiveDate, Vec<String>> {
    let mut grouped: BTreeMap<NaiveDate, Vec<String>> = BTreeMap::new();
    for record in records.iter().filter(|r| Some(r.captured_date) != except) {
        let symbols = grouped.entry(record.captured_date).or_default();
        if !symbols.contains(&record.symbol) {
            symbols.push(record.symbol.clone());
        }
    }
    grouped
}

/// Storage for daily level snapshots, keyed by `captured_date`
#[async_trait]
pub trait SnapshotStore: Send + Sync {
    /// Delete every record for `date`, returning the number removed
    async fn delete_snapshot(&self, date: NaiveDate) -> DataResult<u64>;

    /// Delete the records for `symbols` on `date` only
    async fn delete_symbols(&self, date: NaiveDate, symbols: &[String]) -> DataResult<u64>;

    /// Bulk insert, returning the number inserted
    async fn insert_records(&self, records: &[DailyLevel]) -> DataResult<u64>;

    /// Records for `date`, ordered by symbol
    async fn load_snapshot(&self, date: NaiveDate) -> DataResult<Vec<DailyLevel>>;

    async fn latest_captured_date(&self) -> DataResult<Option<NaiveDate>>;

    /// Clear `date`, clear the `(symbol, captured_date)` pair of any record
    /// from another date, then insert. Not atomic: a failure between the
    /// steps leaves `date` empty.
    async fn replace_snapshot(
        &self,
        date: NaiveDate,
        records: &[DailyLevel],
    ) -> DataResult<(u64, u64)> {
        let mut deleted = self.delete_snapshot(date).await?;
        for (other_date, symbols) in symbols_by_date(records, Some(date)) {
            deleted += self.delete_symbols(other_date, &symbols).await?;
        }
        let inserted = self.insert_records(records).await?;
        Ok((deleted, inserted))
    }

    /// Clear only the `(symbol, captured_date)` pairs present in `records`,
    /// then insert. Not atomic.
    async fn replace_symbols(&self, records: &[DailyLevel]) -> DataResult<(u64, u64)> {
        let mut deleted = 0;
        for (date, symbols) in symbols_by_date(records, None) {
            deleted += self.delete_symbols(date, &symbols).await?;
        }
        let inserted = self.insert_records(records).await?;
        Ok((deleted, inserted))
    }
}

pub struct PgSnapshotStore {
    pool: PgPool,
}

impl PgSnapshotStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    fn insert_query(chunk: &[DailyLevel]) -> QueryBuilder<'static, Postgres> {
        let mut builder = QueryBuilder::new(format!(
            "INSERT INTO {} (symbol, sector, today_high, today_low, today_open, today_close, captured_date) ",
            TABLE_NAME
        ));
        builder.push_values(chunk, |mut row, record| {
            row.push_bind(record.symbol.clone())
                .push_bind(record.sector.clone())
                .push_bind(record.today_high)
                .push_bind(record.today_low)
                .push_bind(record.today_open)
                .push_bind(record.today_close)
                .push_bind(record.captured_date);
        });
        builder
    }

    // persistent(false) on every statement keeps these usable behind pgBouncer

    async fn delete_date_on(conn: &mut PgConnection, date: NaiveDate) -> DataResult<u64> {
        let result = sqlx::query(&format!("DELETE FROM {} WHERE captured_date = $1", TABLE_NAME))
            .bind(date)
            .persistent(false)
            .execute(&mut *conn)
            .await?;
        Ok(result.rows_affected())
    }

    async fn delete_symbols_on(
        conn: &mut PgConnection,
        date: NaiveDate,
        symbols: &[String],
    ) -> DataResult<u64> {
        let result = sqlx::query(&format!(
            "DELETE FROM {} WHERE captured_date = $1 AND symbol = ANY($2)",
            TABLE_NAME
        ))
        .bind(date)
        .bind(symbols)
        .persistent(false)
        .execute(&mut *conn)
        .await?;
        Ok(result.rows_affected())
    }

    async fn insert_on(conn: &mut PgConnection, records: &[DailyLevel]) -> DataResult<u64> {
        let mut inserted = 0;
        for chunk in records.chunks(INSERT_BATCH_SIZE) {
            let result = Self::insert_query(chunk)
                .build()
                .persistent(false)
                .execute(&mut *conn)
                .await?;
            inserted += result.rows_affected();
        }
        Ok(inserted)
    }
}

#[async_trait]
impl SnapshotStore for PgSnapshotStore {
    async fn delete_snapshot(&self, date: NaiveDate) -> DataResult<u64> {
        let mut conn = self.pool.acquire().await?;
        Self::delete_date_on(&mut conn, date).await
    }

    async fn delete_symbols(&self, date: NaiveDate, symbols: &[String]) -> DataResult<u64> {
        let mut conn = self.pool.acquire().await?;
        Self::delete_symbols_on(&mut conn, date, symbols).await
    }

    async fn insert_records(&self, records: &[DailyLevel]) -> DataResult<u64> {
        let mut conn = self.pool.acquire().await?;
        Self::insert_on(&mut conn, records).await
    }

    async fn load_snapshot(&self, date: NaiveDate) -> DataResult<Vec<DailyLevel>> {
        let records = sqlx::query_as::<_, DailyLevel>(&format!(
            r#"
            SELECT symbol, sector,
                   today_high::float8 AS today_high,
                   today_low::float8 AS today_low,
                   today_open::float8 AS today_open,
                   today_close::float8 AS today_close,
                   captured_date
            FROM {}
            WHERE captured_date = $1
            ORDER BY symbol ASC
            "#,
            TABLE_NAME
        ))
        .bind(date)
        .persistent(false)
        .fetch_all(&self.pool)
        .await?;
        Ok(records)
    }

    async fn latest_captured_date(&self) -> DataResult<Option<NaiveDate>> {
        let row: (Option<NaiveDate>,) =
            sqlx::query_as(&format!("SELECT MAX(captured_date) FROM {}", TABLE_NAME))
                .persistent(false)
                .fetch_one(&self.pool)
                .await?;
        Ok(row.0)
    }

    /// Runs inside one transaction, so readers never see the date empty and
    /// a failed insert restores the previous snapshot.
    async fn replace_snapshot(
        &self,
        date: NaiveDate,
        records: &[DailyLevel],
    ) -> DataResult<(u64, u64)> {
        let mut tx = self.pool.begin().await?;

        let mut deleted = Self::delete_date_on(&mut tx, date).await?;
        for (other_date, symbols) in symbols_by_date(records, Some(date)) {
            deleted += Self::delete_symbols_on(&mut tx, other_date, &symbols).await?;
        }
        let inserted = Self::insert_on(&mut tx, records).await?;

        tx.commit().await?;
        info!(%date, deleted, inserted, "Snapshot replaced in one transaction");
        Ok((deleted, inserted))
    }

    async fn replace_symbols(&self, records: &[DailyLevel]) -> DataResult<(u64, u64)> {
        let mut tx = self.pool.begin().await?;

        let mut deleted = 0;
        for (date, symbols) in symbols_by_date(records, None) {
            deleted += Self::delete_symbols_on(&mut tx, date, &symbols).await?;
        }
        let inserted = Self::insert_on(&mut tx, records).await?;

        tx.commit().await?;
        info!(deleted, inserted, "Symbol levels replaced in one transaction");
        Ok((deleted, inserted))
    }
}

/// In-process store for dry runs and tests. Counts calls to the write operations.
#[derive(Default)]
pub struct MemorySnapshotStore {
    rows: Mutex<Vec<DailyLevel>>,
    delete_calls: AtomicUsize,
    insert_calls: AtomicUsize,
}

impl MemorySnapshotStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn delete_calls(&self) -> usize {
        self.delete_calls.load(Ordering::SeqCst)
    }

    pub fn insert_calls(&self) -> usize {
        self.insert_calls.load(Ordering::SeqCst)
    }

    pub async fn all_records(&self) -> Vec<DailyLevel> {
        self.rows.lock().await.clone()
    }
}

#[async_trait]
impl SnapshotStore for MemorySnapshotStore {
    async fn delete_snapshot(&self, date: NaiveDate) -> DataResult<u64> {
        self.delete_calls.fetch_add(1, Ordering::SeqCst);
        let mut rows = self.rows.lock().await;
        let before = rows.len();
        rows.retain(|r| r.captured_date != date);
        Ok((before - rows.len()) as u64)
    }

    async fn delete_symbols(&self, date: NaiveDate, symbols: &[String]) -> DataResult<u64> {
        self.delete_calls.fetch_add(1, Ordering::SeqCst);
        let mut rows = self.rows.lock().await;
        let before = rows.len();
        rows.retain(|r| r.captured_date != date || !symbols.contains(&r.symbol));
        Ok((before - rows.len()) as u64)
    }

    async fn insert_records(&self, records: &[DailyLevel]) -> DataResult<u64> {
        self.insert_calls.fetch_add(1, Ordering::SeqCst);
        self.rows.lock().await.extend_from_slice(records);
        Ok(records.len() as u64)
    }

    async fn load_snapshot(&self, date: NaiveDate) -> DataResult<Vec<DailyLevel>> {
        let mut records: Vec<DailyLevel> = self
            .rows
            .lock()
            .await
            .iter()
            .filter(|r| r.captured_date == date)
            .cloned()
            .collect();
        records.sort_by(|a, b| a.symbol.cmp(&b.symbol));
        Ok(records)
    }

    async fn latest_captured_date(&self) -> DataResult<Option<NaiveDate>> {
        Ok(self.rows.lock().await.iter().map(|r| r.captured_date).max())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn level(symbol: &str, day: u32) -> DailyLevel {
        DailyLevel {
            symbol: symbol.to_string(),
            sector: "IT".to_string(),
            today_high: 110.0,
            today_low: 90.0,
            today_open: 95.0,
            today_close: 105.0,
            captured_date: NaiveDate::from_ymd_opt(2024, 3, day).unwrap(),
        }
    }

    #[tokio::test]
    async fn test_memory_store_delete_is_date_scoped() {
        let store = MemorySnapshotStore::new();
        store
            .insert_records(&[level("TCS", 1), level("INFY", 1), level("TCS", 2)])
            .await
            .unwrap();

        let deleted = store
            .delete_snapshot(NaiveDate::from_ymd_opt(2024, 3, 1).unwrap())
            .await
            .unwrap();

        assert_eq!(deleted, 2);
        assert_eq!(store.all_records().await, vec![level("TCS", 2)]);
        assert_eq!(store.delete_calls(), 1);
        assert_eq!(store.insert_calls(), 1);
    }

    #[tokio::test]
    async fn test_memory_store_load_orders_by_symbol() {
        let store = MemorySnapshotStore::new();
        store
            .insert_records(&[level("WIPRO", 1), level("INFY", 1), level("TCS", 2)])
            .await
            .unwrap();

        let date = NaiveDate::from_ymd_opt(2024, 3, 1).unwrap();
        let symbols: Vec<String> = store
            .load_snapshot(date)
            .await
            .unwrap()
            .into_iter()
            .map(|r| r.symbol)
            .collect();
        assert_eq!(symbols, vec!["INFY", "WIPRO"]);
        assert_eq!(
            store.latest_captured_date().await.unwrap(),
            NaiveDate::from_ymd_opt(2024, 3, 2)
        );
    }

    #[tokio::test]
    async fn test_memory_store_delete_symbols_is_pair_scoped() {
        let store = MemorySnapshotStore::new();
        store
            .insert_records(&[level("TCS", 1), level("INFY", 1), level("TCS", 2)])
            .await
            .unwrap();

        let deleted = store
            .delete_symbols(
                NaiveDate::from_ymd_opt(2024, 3, 1).unwrap(),
                &["TCS".to_string()],
            )
            .await
            .unwrap();

        assert_eq!(deleted, 1);
        assert_eq!(store.all_records().await, vec![level("INFY", 1), level("TCS", 2)]);
    }

    #[test]
    fn test_symbols_by_date_groups_distinct_symbols() {
        let records = [level("TCS", 2), level("SUSP", 1), level("TCS", 2), level("INFY", 1)];
        let date = |day| NaiveDate::from_ymd_opt(2024, 3, day).unwrap();

        let all = symbols_by_date(&records, None);
        assert_eq!(all[&date(1)], vec!["SUSP", "INFY"]);
        assert_eq!(all[&date(2)], vec!["TCS"]);

        let others = symbols_by_date(&records, Some(date(2)));
        assert_eq!(others.len(), 1);
        assert!(others.contains_key(&date(1)));
    }

    #[test]
    fn test_insert_query_shape() {
        let records = [level("TCS", 1), level("INFY", 1)];
        let builder = PgSnapshotStore::insert_query(&records);
        let sql = builder.sql();
        assert!(sql.starts_with("INSERT INTO daily_high_low (symbol, sector, today_high"));
        assert!(sql.contains("$14"));
        assert!(!sql.contains("$15"));
    }
}
