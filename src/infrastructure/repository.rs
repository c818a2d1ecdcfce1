//! SQLite persistence for reviews and per-URL scrape results.
//!
//! Deduplication happens here: `reviews.review_id` carries a UNIQUE
//! constraint and inserts use `INSERT OR IGNORE`, so re-scraping a page is
//! idempotent and `save_reviews` reports only genuinely new rows.

use std::collections::BTreeMap;
use std::path::Path;

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::sqlite::{SqlitePool, SqlitePoolOptions};
use sqlx::Row;
use tracing::{debug, info};

use crate::domain::review::{ReviewRecord, ScrapeOutcome};
use crate::domain::services::ReviewStore;
use crate::domain::source::SourceId;

#[derive(Debug, Clone, Serialize)]
pub struct ReviewStatistics {
    pub total_reviews: i64,
    pub by_retailer: BTreeMap<String, i64>,
    pub average_rating: Option<f64>,
    /// Reviews stored within the last 24 hours.
    pub recent_reviews: i64,
}

/// Query filters for [`ReviewRepository::get_reviews`]. Unset fields do not
/// constrain the result.
#[derive(Debug, Clone, Default)]
pub struct ReviewFilter {
    pub source: Option<SourceId>,
    pub product_id: Option<String>,
    pub min_rating: Option<f64>,
    pub limit: Option<u32>,
}

#[derive(Clone)]
pub struct ReviewRepository {
    pool: SqlitePool,
}

impl ReviewRepository {
    /// Open (creating if needed) the database file and run migrations.
    pub async fn connect(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent)
                    .await
                    .with_context(|| format!("failed to create {}", parent.display()))?;
            }
        }

        let url = format!("sqlite:{}?mode=rwc", path.display());
        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect(&url)
            .await
            .with_context(|| format!("failed to open database {}", path.display()))?;

        let repo = Self { pool };
        repo.migrate().await?;
        info!(path = %path.display(), "database ready");
        Ok(repo)
    }

    /// In-memory database for tests. A single connection is required: every
    /// pooled connection would otherwise see its own empty `:memory:` database.
    pub async fn in_memory() -> Result<Self> {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .context("failed to open in-memory database")?;

        let repo = Self { pool };
        repo.migrate().await?;
        Ok(repo)
    }

    async fn migrate(&self) -> Result<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS reviews (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                review_id TEXT UNIQUE NOT NULL,
                product_id TEXT NOT NULL,
                product_name TEXT NOT NULL,
                product_url TEXT NOT NULL,
                reviewer_name TEXT NOT NULL,
                rating REAL NOT NULL,
                review_title TEXT,
                review_text TEXT,
                review_date TEXT NOT NULL,
                verified_purchase INTEGER NOT NULL DEFAULT 0,
                helpful_votes INTEGER NOT NULL DEFAULT 0,
                retailer TEXT NOT NULL,
                scraped_at TEXT NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await
        .context("failed to create reviews table")?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS scrape_results (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                retailer TEXT NOT NULL,
                product_url TEXT NOT NULL,
                total_reviews INTEGER NOT NULL,
                new_reviews INTEGER NOT NULL,
                errors INTEGER NOT NULL,
                error TEXT,
                processing_time REAL NOT NULL,
                timestamp TEXT NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await
        .context("failed to create scrape_results table")?;

        sqlx::query("CREATE INDEX IF NOT EXISTS idx_reviews_product ON reviews (product_id)")
            .execute(&self.pool)
            .await
            .context("failed to create product index")?;
        sqlx::query("CREATE INDEX IF NOT EXISTS idx_reviews_retailer ON reviews (retailer)")
            .execute(&self.pool)
            .await
            .context("failed to create retailer index")?;

        Ok(())
    }

    /// Insert reviews, skipping fingerprints already stored. Returns the
    /// number of newly inserted rows.
    pub async fn insert_reviews(&self, reviews: &[ReviewRecord]) -> Result<u32> {
        let mut inserted = 0u32;
        for review in reviews {
            let result = sqlx::query(
                r#"
                INSERT OR IGNORE INTO reviews (
                    review_id, product_id, product_name, product_url,
                    reviewer_name, rating, review_title, review_text,
                    review_date, verified_purchase, helpful_votes,
                    retailer, scraped_at
                ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
                "#,
            )
            .bind(&review.review_id)
            .bind(&review.product_id)
            .bind(&review.product_name)
            .bind(&review.product_url)
            .bind(&review.reviewer_name)
            .bind(review.rating)
            .bind(&review.review_title)
            .bind(&review.review_text)
            .bind(&review.review_date)
            .bind(review.verified_purchase)
            .bind(review.helpful_votes)
            .bind(review.source.label())
            .bind(review.scraped_at.to_rfc3339())
            .execute(&self.pool)
            .await
            .context("failed to insert review")?;

            inserted += result.rows_affected() as u32;
        }

        debug!(
            attempted = reviews.len(),
            inserted, "saved review batch"
        );
        Ok(inserted)
    }

    pub async fn insert_outcome(&self, outcome: &ScrapeOutcome) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO scrape_results (
                retailer, product_url, total_reviews, new_reviews,
                errors, error, processing_time, timestamp
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(outcome.source_label())
        .bind(&outcome.product_url)
        .bind(outcome.total_reviews)
        .bind(outcome.new_reviews)
        .bind(outcome.errors)
        .bind(&outcome.error)
        .bind(outcome.processing_time)
        .bind(outcome.timestamp.to_rfc3339())
        .execute(&self.pool)
        .await
        .context("failed to record scrape result")?;

        Ok(())
    }

    pub async fn get_reviews(&self, filter: &ReviewFilter) -> Result<Vec<ReviewRecord>> {
        let mut sql = String::from(
            "SELECT review_id, product_id, product_name, product_url, reviewer_name, \
             rating, review_title, review_text, review_date, verified_purchase, \
             helpful_votes, retailer, scraped_at FROM reviews WHERE 1=1",
        );
        if filter.source.is_some() {
            sql.push_str(" AND retailer = ?");
        }
        if filter.product_id.is_some() {
            sql.push_str(" AND product_id = ?");
        }
        if filter.min_rating.is_some() {
            sql.push_str(" AND rating >= ?");
        }
        sql.push_str(" ORDER BY scraped_at DESC");
        if filter.limit.is_some() {
            sql.push_str(" LIMIT ?");
        }

        let mut query = sqlx::query(&sql);
        if let Some(source) = filter.source {
            query = query.bind(source.label());
        }
        if let Some(product_id) = &filter.product_id {
            query = query.bind(product_id);
        }
        if let Some(min_rating) = filter.min_rating {
            query = query.bind(min_rating);
        }
        if let Some(limit) = filter.limit {
            query = query.bind(limit);
        }

        let rows = query
            .fetch_all(&self.pool)
            .await
            .context("failed to query reviews")?;

        rows.iter().map(row_to_review).collect()
    }

    pub async fn statistics(&self) -> Result<ReviewStatistics> {
        let total_reviews: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM reviews")
            .fetch_one(&self.pool)
            .await
            .context("failed to count reviews")?;

        let rows = sqlx::query("SELECT retailer, COUNT(*) AS n FROM reviews GROUP BY retailer")
            .fetch_all(&self.pool)
            .await
            .context("failed to count reviews by retailer")?;
        let mut by_retailer = BTreeMap::new();
        for row in &rows {
            let retailer: String = row.try_get("retailer")?;
            let count: i64 = row.try_get("n")?;
            by_retailer.insert(retailer, count);
        }

        let average_rating: Option<f64> = sqlx::query_scalar("SELECT AVG(rating) FROM reviews")
            .fetch_one(&self.pool)
            .await
            .context("failed to compute average rating")?;

        let cutoff = (Utc::now() - chrono::Duration::hours(24)).to_rfc3339();
        let recent_reviews: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM reviews WHERE scraped_at >= ?")
                .bind(cutoff)
                .fetch_one(&self.pool)
                .await
                .context("failed to count recent reviews")?;

        Ok(ReviewStatistics {
            total_reviews,
            by_retailer,
            average_rating,
            recent_reviews,
        })
    }

    /// Export all stored reviews as pretty-printed JSON.
    pub async fn export_json(&self) -> Result<String> {
        let reviews = self.get_reviews(&ReviewFilter::default()).await?;
        serde_json::to_string_pretty(&reviews).context("failed to serialize reviews")
    }
}

fn row_to_review(row: &sqlx::sqlite::SqliteRow) -> Result<ReviewRecord> {
    let retailer: String = row.try_get("retailer")?;
    let source = SourceId::from_label(&retailer)
        .with_context(|| format!("unknown retailer label in database: {retailer}"))?;

    let scraped_at: String = row.try_get("scraped_at")?;
    let scraped_at = DateTime::parse_from_rfc3339(&scraped_at)
        .context("invalid scraped_at timestamp in database")?
        .with_timezone(&Utc);

    Ok(ReviewRecord {
        review_id: row.try_get("review_id")?,
        product_id: row.try_get("product_id")?,
        product_name: row.try_get("product_name")?,
        product_url: row.try_get("product_url")?,
        reviewer_name: row.try_get("reviewer_name")?,
        rating: row.try_get("rating")?,
        review_title: row.try_get("review_title")?,
        review_text: row.try_get("review_text")?,
        review_date: row.try_get("review_date")?,
        verified_purchase: row.try_get("verified_purchase")?,
        helpful_votes: row.try_get::<i64, _>("helpful_votes")? as u32,
        source,
        scraped_at,
    })
}

#[async_trait]
impl ReviewStore for ReviewRepository {
    async fn save_reviews(&self, reviews: &[ReviewRecord]) -> Result<u32> {
        self.insert_reviews(reviews).await
    }

    async fn record_outcome(&self, outcome: &ScrapeOutcome) -> Result<()> {
        self.insert_outcome(outcome).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::review::ANONYMOUS_REVIEWER;

    fn review(review_id: &str, rating: f64, source: SourceId) -> ReviewRecord {
        ReviewRecord {
            review_id: review_id.to_string(),
            product_id: "123456".to_string(),
            product_name: "Gel Nail Strips".to_string(),
            product_url: "https://www.walmart.com/ip/gel-nail-strips/123456".to_string(),
            reviewer_name: ANONYMOUS_REVIEWER.to_string(),
            rating,
            review_title: Some("Great".to_string()),
            review_text: Some("Lasted two weeks.".to_string()),
            review_date: "2026-08-01".to_string(),
            verified_purchase: false,
            helpful_votes: 0,
            source,
            scraped_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn insert_skips_duplicate_fingerprints() {
        let repo = ReviewRepository::in_memory().await.unwrap();
        let batch = vec![
            review("aaa", 5.0, SourceId::Walmart),
            review("bbb", 4.0, SourceId::Walmart),
        ];

        assert_eq!(repo.insert_reviews(&batch).await.unwrap(), 2);
        // A second pass over the same page inserts nothing.
        assert_eq!(repo.insert_reviews(&batch).await.unwrap(), 0);

        let stored = repo.get_reviews(&ReviewFilter::default()).await.unwrap();
        assert_eq!(stored.len(), 2);
    }

    #[tokio::test]
    async fn filters_constrain_queries() {
        let repo = ReviewRepository::in_memory().await.unwrap();
        repo.insert_reviews(&[
            review("a", 5.0, SourceId::Walmart),
            review("b", 2.0, SourceId::Walmart),
            review("c", 4.0, SourceId::Target),
        ])
        .await
        .unwrap();

        let walmart = repo
            .get_reviews(&ReviewFilter {
                source: Some(SourceId::Walmart),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(walmart.len(), 2);

        let high = repo
            .get_reviews(&ReviewFilter {
                min_rating: Some(4.0),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(high.len(), 2);

        let limited = repo
            .get_reviews(&ReviewFilter {
                limit: Some(1),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(limited.len(), 1);
    }

    #[tokio::test]
    async fn statistics_reflect_stored_rows() {
        let repo = ReviewRepository::in_memory().await.unwrap();
        repo.insert_reviews(&[
            review("a", 5.0, SourceId::Walmart),
            review("b", 3.0, SourceId::Ulta),
        ])
        .await
        .unwrap();

        let stats = repo.statistics().await.unwrap();
        assert_eq!(stats.total_reviews, 2);
        assert_eq!(stats.by_retailer.get("Walmart"), Some(&1));
        assert_eq!(stats.by_retailer.get("ULTA"), Some(&1));
        assert_eq!(stats.recent_reviews, 2);
        let avg = stats.average_rating.unwrap();
        assert!((avg - 4.0).abs() < 1e-9);
    }

    #[tokio::test]
    async fn outcomes_are_recorded() {
        let repo = ReviewRepository::in_memory().await.unwrap();
        let outcome = ScrapeOutcome::failure(None, "https://example.com/p/1", "unsupported", 0.01);
        repo.insert_outcome(&outcome).await.unwrap();

        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM scrape_results")
            .fetch_one(&repo.pool)
            .await
            .unwrap();
        assert_eq!(count, 1);
    }

    #[tokio::test]
    async fn round_trips_review_fields() {
        let repo = ReviewRepository::in_memory().await.unwrap();
        let original = review("rt", 4.5, SourceId::Target);
        repo.insert_reviews(std::slice::from_ref(&original))
            .await
            .unwrap();

        let stored = repo.get_reviews(&ReviewFilter::default()).await.unwrap();
        assert_eq!(stored.len(), 1);
        let got = &stored[0];
        assert_eq!(got.review_id, original.review_id);
        assert_eq!(got.source, SourceId::Target);
        assert_eq!(got.review_title, original.review_title);
        assert!((got.rating - 4.5).abs() < 1e-9);
    }
}
