//! SQLite-backed subscription store.

use async_trait::async_trait;
use chrono::{DateTime, FixedOffset, Utc};
use tracing::{debug, info};

use super::types::{NewSubscription, Subscription, User};
use super::SubscriptionStore;
use crate::datetime::{parse_stored, to_storage};
use crate::db::{Database, DbPool};
use crate::{FeedbellError, Result};

/// Row type for users from database.
#[derive(Debug, Clone, sqlx::FromRow)]
struct UserRow {
    id: String,
    created_at: String,
}

impl TryFrom<UserRow> for User {
    type Error = FeedbellError;

    fn try_from(row: UserRow) -> Result<Self> {
        Ok(User {
            created_at: parse_utc(&row.created_at)?,
            id: row.id,
        })
    }
}

/// Row type for subscriptions from database.
#[derive(Debug, Clone, sqlx::FromRow)]
struct SubscriptionRow {
    id: i64,
    user_id: String,
    seq: i64,
    title: String,
    url: String,
    created_at: String,
}

impl TryFrom<SubscriptionRow> for Subscription {
    type Error = FeedbellError;

    fn try_from(row: SubscriptionRow) -> Result<Self> {
        Ok(Subscription {
            created_at: parse_utc(&row.created_at)?,
            id: row.id,
            user_id: row.user_id,
            seq: row.seq,
            title: row.title,
            url: row.url,
        })
    }
}

/// A corrupt timestamp is a store failure, not a reason to invent one.
fn parse_utc(s: &str) -> Result<DateTime<Utc>> {
    parse_stored(s).map(|dt| dt.with_timezone(&Utc))
}

/// Map an insert error, turning a URL uniqueness violation into a conflict.
fn map_insert_error(e: sqlx::Error, url: &str) -> FeedbellError {
    if let sqlx::Error::Database(ref db_err) = e {
        if db_err.is_unique_violation() && db_err.message().contains("subscriptions.url") {
            return FeedbellError::Conflict(format!("feed already subscribed: {url}"));
        }
    }
    FeedbellError::from(e)
}

/// Subscription store on top of the feedbell SQLite database.
#[derive(Debug, Clone)]
pub struct SqliteStore {
    db: Database,
}

impl SqliteStore {
    /// Create a store over an opened (migrated) database.
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    fn pool(&self) -> &DbPool {
        self.db.pool()
    }

    /// Seed the watermark if it has never been set.
    ///
    /// Part of first-run initialization; never called by a scan. Returns
    /// true when the watermark was created.
    pub async fn bootstrap(&self, initial: DateTime<FixedOffset>) -> Result<bool> {
        let result = sqlx::query("INSERT OR IGNORE INTO watermark (id, value) VALUES (1, ?)")
            .bind(to_storage(&initial))
            .execute(self.pool())
            .await?;

        let seeded = result.rows_affected() > 0;
        if seeded {
            info!("Watermark initialized to {}", initial);
        } else {
            debug!("Watermark already present");
        }
        Ok(seeded)
    }

    /// Count all subscriptions.
    pub async fn count_subscriptions(&self) -> Result<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM subscriptions")
            .fetch_one(self.pool())
            .await?;
        Ok(count)
    }
}

#[async_trait]
impl SubscriptionStore for SqliteStore {
    async fn list_users(&self) -> Result<Vec<User>> {
        let rows =
            sqlx::query_as::<_, UserRow>("SELECT id, created_at FROM users ORDER BY rowid ASC")
                .fetch_all(self.pool())
                .await?;

        rows.into_iter().map(User::try_from).collect()
    }

    async fn ensure_user(&self, user_id: &str) -> Result<()> {
        let result = sqlx::query("INSERT OR IGNORE INTO users (id) VALUES ($1)")
            .bind(user_id)
            .execute(self.pool())
            .await?;

        if result.rows_affected() > 0 {
            info!("Created user {}", user_id);
        }
        Ok(())
    }

    async fn list_subscriptions(&self, user_id: &str) -> Result<Vec<Subscription>> {
        let rows = sqlx::query_as::<_, SubscriptionRow>(
            r#"
            SELECT id, user_id, seq, title, url, created_at
            FROM subscriptions
            WHERE user_id = $1
            ORDER BY seq ASC
            "#,
        )
        .bind(user_id)
        .fetch_all(self.pool())
        .await?;

        rows.into_iter().map(Subscription::try_from).collect()
    }

    async fn add_subscription(&self, new: &NewSubscription) -> Result<Subscription> {
        // Sequence number is computed inside the INSERT so the statement stays atomic.
        let id: i64 = sqlx::query_scalar(
            r#"
            INSERT INTO subscriptions (user_id, seq, title, url)
            VALUES (
                $1,
                (SELECT COALESCE(MAX(seq), 0) + 1 FROM subscriptions WHERE user_id = $1),
                $2,
                $3
            )
            RETURNING id
            "#,
        )
        .bind(&new.user_id)
        .bind(&new.title)
        .bind(&new.url)
        .fetch_one(self.pool())
        .await
        .map_err(|e| map_insert_error(e, &new.url))?;

        let row = sqlx::query_as::<_, SubscriptionRow>(
            "SELECT id, user_id, seq, title, url, created_at FROM subscriptions WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(self.pool())
        .await?;

        row.map(Subscription::try_from)
            .ok_or_else(|| FeedbellError::NotFound("subscription".to_string()))?
    }

    async fn remove_subscription(&self, user_id: &str, seq: i64) -> Result<bool> {
        let result = sqlx::query("DELETE FROM subscriptions WHERE user_id = $1 AND seq = $2")
            .bind(user_id)
            .bind(seq)
            .execute(self.pool())
            .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn get_watermark(&self) -> Result<DateTime<FixedOffset>> {
        let value: Option<String> = sqlx::query_scalar("SELECT value FROM watermark WHERE id = 1")
            .fetch_optional(self.pool())
            .await?;

        match value {
            Some(v) => parse_stored(&v),
            None => Err(FeedbellError::NotFound("watermark".to_string())),
        }
    }

    async fn set_watermark(&self, at: DateTime<FixedOffset>) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO watermark (id, value, updated_at)
            VALUES (1, $1, datetime('now'))
            ON CONFLICT(id) DO UPDATE SET value = excluded.value, updated_at = excluded.updated_at
            "#,
        )
        .bind(to_storage(&at))
        .execute(self.pool())
        .await?;

        debug!("Watermark set to {}", at);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    async fn setup_store() -> SqliteStore {
        SqliteStore::new(Database::open_in_memory().await.unwrap())
    }

    fn taipei(h: u32) -> DateTime<FixedOffset> {
        chrono_tz::Asia::Taipei
            .with_ymd_and_hms(2024, 3, 1, h, 0, 0)
            .unwrap()
            .fixed_offset()
    }

    #[tokio::test]
    async fn test_ensure_user_is_idempotent() {
        let store = setup_store().await;
        store.ensure_user("100").await.unwrap();
        store.ensure_user("100").await.unwrap();
        store.ensure_user("200").await.unwrap();

        let users = store.list_users().await.unwrap();
        let ids: Vec<_> = users.iter().map(|u| u.id.as_str()).collect();
        assert_eq!(ids, vec!["100", "200"]);
    }

    #[tokio::test]
    async fn test_add_subscription_assigns_sequence() {
        let store = setup_store().await;
        store.ensure_user("100").await.unwrap();
        store.ensure_user("200").await.unwrap();

        let a = store
            .add_subscription(&NewSubscription::new("100", "A", "https://a.example/feed"))
            .await
            .unwrap();
        let b = store
            .add_subscription(&NewSubscription::new("100", "B", "https://b.example/feed"))
            .await
            .unwrap();
        let c = store
            .add_subscription(&NewSubscription::new("200", "C", "https://c.example/feed"))
            .await
            .unwrap();

        assert_eq!(a.seq, 1);
        assert_eq!(b.seq, 2);
        assert_eq!(c.seq, 1);
        assert_eq!(b.title, "B");
        assert_eq!(b.user_id, "100");
    }

    #[tokio::test]
    async fn test_sequence_after_removal_does_not_collide() {
        let store = setup_store().await;
        store.ensure_user("100").await.unwrap();
        for (title, url) in [("A", "https://a.example/"), ("B", "https://b.example/")] {
            store
                .add_subscription(&NewSubscription::new("100", title, url))
                .await
                .unwrap();
        }

        assert!(store.remove_subscription("100", 1).await.unwrap());
        let next = store
            .add_subscription(&NewSubscription::new("100", "C", "https://c.example/"))
            .await
            .unwrap();
        assert_eq!(next.seq, 3);
    }

    #[tokio::test]
    async fn test_add_duplicate_url_conflicts_across_users() {
        let store = setup_store().await;
        store.ensure_user("100").await.unwrap();
        store.ensure_user("200").await.unwrap();
        let url = "https://example.com/feed.xml";

        let original = store
            .add_subscription(&NewSubscription::new("100", "Original", url))
            .await
            .unwrap();

        let result = store
            .add_subscription(&NewSubscription::new("200", "Copy", url))
            .await;
        assert!(matches!(result, Err(FeedbellError::Conflict(_))));

        assert_eq!(store.list_subscriptions("100").await.unwrap(), vec![original]);
        assert_eq!(store.count_subscriptions().await.unwrap(), 1);
        assert!(store.list_subscriptions("200").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_remove_missing_subscription() {
        let store = setup_store().await;
        store.ensure_user("100").await.unwrap();
        store
            .add_subscription(&NewSubscription::new("100", "A", "https://a.example/"))
            .await
            .unwrap();

        assert!(!store.remove_subscription("100", 7).await.unwrap());
        assert!(!store.remove_subscription("999", 1).await.unwrap());
        assert_eq!(store.count_subscriptions().await.unwrap(), 1);
        assert_eq!(store.list_subscriptions("100").await.unwrap()[0].seq, 1);
    }

    #[tokio::test]
    async fn test_list_subscriptions_ordered_by_seq() {
        let store = setup_store().await;
        store.ensure_user("100").await.unwrap();
        for i in 0..3 {
            store
                .add_subscription(&NewSubscription::new(
                    "100",
                    format!("Feed {i}"),
                    format!("https://example.com/{i}"),
                ))
                .await
                .unwrap();
        }

        let subs = store.list_subscriptions("100").await.unwrap();
        let seqs: Vec<_> = subs.iter().map(|s| s.seq).collect();
        assert_eq!(seqs, vec![1, 2, 3]);
    }

    #[tokio::test]
    async fn test_watermark_missing_before_bootstrap() {
        let store = setup_store().await;
        assert!(matches!(
            store.get_watermark().await,
            Err(FeedbellError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_bootstrap_only_seeds_once() {
        let store = setup_store().await;
        assert!(store.bootstrap(taipei(8)).await.unwrap());
        assert!(!store.bootstrap(taipei(9)).await.unwrap());
        assert_eq!(store.get_watermark().await.unwrap(), taipei(8));
    }

    #[tokio::test]
    async fn test_set_watermark_keeps_offset() {
        let store = setup_store().await;
        store.bootstrap(taipei(8)).await.unwrap();
        store.set_watermark(taipei(12)).await.unwrap();

        let wm = store.get_watermark().await.unwrap();
        assert_eq!(wm, taipei(12));
        assert_eq!(wm.offset().local_minus_utc(), 8 * 3600);
    }

    #[tokio::test]
    async fn test_deleting_user_cascades() {
        let store = setup_store().await;
        store.ensure_user("100").await.unwrap();
        store
            .add_subscription(&NewSubscription::new("100", "A", "https://a.example/"))
            .await
            .unwrap();

        sqlx::query("DELETE FROM users WHERE id = '100'")
            .execute(store.pool())
            .await
            .unwrap();
        assert_eq!(store.count_subscriptions().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_corrupt_created_at_is_a_store_failure() {
        let store = setup_store().await;
        sqlx::query("INSERT INTO users (id, created_at) VALUES ('100', 'not a date')")
            .execute(store.pool())
            .await
            .unwrap();

        assert!(matches!(
            store.list_users().await,
            Err(FeedbellError::Database(_))
        ));
    }
}
