use anyhow::Result;
use breakout_levels::{
    config::DatabaseConfig,
    db::Database,
    levels::{replace_snapshot, replace_symbol_levels, DailyLevel, PgSnapshotStore, ReplaceOutcome, SnapshotStore},
};
use chrono::NaiveDate;

fn level(symbol: &str, close: f64, captured_date: NaiveDate) -> DailyLevel {
    DailyLevel {
        symbol: symbol.to_string(),
        sector: "Test".to_string(),
        today_high: close + 10.0,
        today_low: close - 10.0,
        today_open: close - 2.5,
        today_close: close,
        captured_date,
    }
}

#[tokio::test]
async fn test_postgres_snapshot_replace() -> Result<()> {
    if std::env::var("DATABASE_URL").is_err() {
        // Skip test if no database configured
        return Ok(());
    }

    let db = Database::new(&DatabaseConfig::load()?).await?;
    db.health_check().await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS daily_high_low (
            symbol TEXT NOT NULL,
            sector TEXT NOT NULL,
            today_high DOUBLE PRECISION NOT NULL,
            today_low DOUBLE PRECISION NOT NULL,
            today_open DOUBLE PRECISION NOT NULL,
            today_close DOUBLE PRECISION NOT NULL,
            captured_date DATE NOT NULL
        )
        "#,
    )
    .execute(&db.pool)
    .await?;

    // A date no real snapshot will use
    let date = NaiveDate::from_ymd_opt(1999, 1, 4).expect("valid date");
    let store = PgSnapshotStore::new(db.pool.clone());

    replace_snapshot(&store, &[level("ZZTESTA", 10.0, date), level("ZZTESTB", 20.0, date)]).await?;
    let outcome = replace_snapshot(&store, &[level("ZZTESTC", 30.0, date)]).await?;

    assert_eq!(
        outcome,
        ReplaceOutcome::Replaced {
            captured_date: date,
            deleted: 2,
            inserted: 1,
        }
    );
    let stored = store.load_snapshot(date).await?;
    assert_eq!(stored, vec![level("ZZTESTC", 30.0, date)]);

    // Older-session record replaces only its own row on its own date
    let older = NaiveDate::from_ymd_opt(1999, 1, 1).expect("valid date");
    replace_snapshot(&store, &[level("ZZTESTD", 40.0, older)]).await?;
    replace_snapshot(&store, &[level("ZZTESTC", 31.0, date), level("ZZTESTD", 41.0, older)]).await?;
    assert_eq!(store.load_snapshot(older).await?, vec![level("ZZTESTD", 41.0, older)]);

    // Symbol-scoped replace leaves other symbols on the date alone
    replace_snapshot(&store, &[level("ZZTESTA", 10.0, date), level("ZZTESTB", 20.0, date)]).await?;
    replace_symbol_levels(&store, &[level("ZZTESTB", 21.0, date)]).await?;
    assert_eq!(
        store.load_snapshot(date).await?,
        vec![level("ZZTESTA", 10.0, date), level("ZZTESTB", 21.0, date)]
    );

    store.delete_snapshot(older).await?;
    store.delete_snapshot(date).await?;
    db.close().await;
    Ok(())
}
