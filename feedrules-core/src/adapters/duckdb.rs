//! DuckDB repository implementation
//!
//! One connection behind a mutex serves every port. Rule matcher, scope and
//! action are stored as JSON documents; timestamps as RFC 3339 text.

use std::path::Path;
use std::sync::{Mutex, MutexGuard};
use std::thread;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use duckdb::{params, Connection};
use tracing::warn;

use crate::domain::{Article, ArticleStatus, Error, Feed, IdSet, Result, Rule};
use crate::ports::{ArticleRepository, FeedRepository, RuleRepository, TagAssociation};
use crate::services::{MigrationResult, MigrationService};

/// Maximum number of attempts when the database file is locked
const MAX_RETRIES: u32 = 5;

/// Initial retry delay in milliseconds (doubles each retry: 50, 100, 200, 400ms)
const INITIAL_RETRY_DELAY_MS: u64 = 50;

const RULE_COLUMNS: &str = "rule_id, name, matcher, scope, action, enabled, priority, \
                            stop_on_match, match_count, created_at, last_modified";

const ARTICLE_COLUMNS: &str = "article_id, feed_id, title, content, summary, author, \
                               categories, link, published_date, status, is_starred, \
                               is_favorite, highlight_color";

/// Check if an error message indicates a file locking issue that should be retried
fn is_retryable_error(err_msg: &str) -> bool {
    let lower = err_msg.to_lowercase();
    lower.contains("being used by another process")
        || lower.contains("cannot access the file")
        || lower.contains("resource temporarily unavailable")
        || lower.contains("database is locked")
        || lower.contains("file is already open")
}

/// DuckDB-backed store for rules, articles, feeds and tag associations
pub struct DuckDbRepository {
    conn: Mutex<Connection>,
}

impl DuckDbRepository {
    /// Open (or create) a database file
    ///
    /// Opening retries with exponential backoff while another process holds
    /// the file lock. Queries themselves are never retried.
    pub fn new(db_path: &Path) -> Result<Self> {
        let mut attempt = 0;
        loop {
            match Self::try_open_connection(db_path) {
                Ok(conn) => return Ok(Self::from_connection(conn)),
                Err(e) => {
                    let err_msg = e.to_string();
                    attempt += 1;
                    if !is_retryable_error(&err_msg) || attempt >= MAX_RETRIES {
                        return Err(e.into());
                    }
                    let delay = Duration::from_millis(INITIAL_RETRY_DELAY_MS * 2u64.pow(attempt - 1));
                    warn!(
                        delay_ms = delay.as_millis() as u64,
                        attempt,
                        max = MAX_RETRIES,
                        error = %err_msg,
                        "Database busy, retrying"
                    );
                    thread::sleep(delay);
                }
            }
        }
    }

    /// Open a throwaway in-memory database
    pub fn in_memory() -> Result<Self> {
        Ok(Self::from_connection(Connection::open_in_memory()?))
    }

    fn from_connection(conn: Connection) -> Self {
        Self {
            conn: Mutex::new(conn),
        }
    }

    fn try_open_connection(db_path: &Path) -> duckdb::Result<Connection> {
        // Extension autoloading stays off; JSON support is linked in via the crate feature
        let config = duckdb::Config::default().enable_autoload_extension(false)?;
        Connection::open_with_flags(db_path, config)
    }

    fn conn(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|_| Error::database("connection lock poisoned"))
    }

    /// Apply any pending schema migrations
    pub fn ensure_schema(&self) -> Result<MigrationResult> {
        let conn = self.conn()?;
        MigrationService::new(&conn)
            .run_pending()
            .map_err(|e| Error::database(format!("migration failed: {}", e)))
    }

    // ========================================================================
    // Feeds and articles (written by the reader's ingestion side)
    // ========================================================================

    /// Insert or replace a feed
    pub fn upsert_feed(&self, feed: &Feed) -> Result<()> {
        let conn = self.conn()?;
        conn.execute(
            "INSERT INTO feeds (feed_id, title, url, category_id) VALUES (?, ?, ?, ?)
             ON CONFLICT (feed_id) DO UPDATE SET
                title = EXCLUDED.title,
                url = EXCLUDED.url,
                category_id = EXCLUDED.category_id",
            params![feed.id, feed.title, feed.url, feed.category_id],
        )?;
        Ok(())
    }

    /// Insert or replace an article
    pub fn upsert_article(&self, article: &Article) -> Result<()> {
        let conn = self.conn()?;
        conn.execute(
            "INSERT INTO articles (article_id, feed_id, title, content, summary, author,
                                   categories, link, published_date, status, is_starred,
                                   is_favorite, highlight_color)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
             ON CONFLICT (article_id) DO UPDATE SET
                feed_id = EXCLUDED.feed_id,
                title = EXCLUDED.title,
                content = EXCLUDED.content,
                summary = EXCLUDED.summary,
                author = EXCLUDED.author,
                categories = EXCLUDED.categories,
                link = EXCLUDED.link,
                published_date = EXCLUDED.published_date,
                status = EXCLUDED.status,
                is_starred = EXCLUDED.is_starred,
                is_favorite = EXCLUDED.is_favorite,
                highlight_color = EXCLUDED.highlight_color",
            params![
                article.id,
                article.feed_id,
                article.title,
                article.content,
                article.summary,
                article.author,
                article.categories,
                article.link,
                article.published_date.to_rfc3339(),
                article.status.as_str(),
                article.is_starred,
                article.is_favorite,
                article.highlight_color,
            ],
        )?;
        Ok(())
    }

    /// Ids of stored articles, oldest first
    pub fn get_article_ids(&self, unread_only: bool) -> Result<Vec<i64>> {
        let conn = self.conn()?;
        let sql = if unread_only {
            "SELECT article_id FROM articles WHERE status = 'Unread' ORDER BY published_date, article_id"
        } else {
            "SELECT article_id FROM articles ORDER BY published_date, article_id"
        };
        let mut stmt = conn.prepare(sql)?;
        let ids = stmt.query_map([], |row| row.get::<_, i64>(0))?;

        let mut result = Vec::new();
        for id in ids {
            result.push(id?);
        }
        Ok(result)
    }

    /// Tag ids associated with an article
    pub fn get_article_tags(&self, article_id: i64) -> Result<Vec<i64>> {
        let conn = self.conn()?;
        let mut stmt =
            conn.prepare("SELECT tag_id FROM article_tags WHERE article_id = ? ORDER BY tag_id")?;
        let ids = stmt.query_map([article_id], |row| row.get::<_, i64>(0))?;

        let mut result = Vec::new();
        for id in ids {
            result.push(id?);
        }
        Ok(result)
    }
}

// ============================================================================
// Row mapping
// ============================================================================

/// Raw rules row, before the JSON columns are decoded
struct RuleRow {
    id: i64,
    name: String,
    matcher: String,
    scope: String,
    action: String,
    enabled: bool,
    priority: i32,
    stop_on_match: bool,
    match_count: i64,
    created_at: String,
    last_modified: String,
}

impl RuleRow {
    fn read(row: &duckdb::Row) -> duckdb::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            name: row.get(1)?,
            matcher: row.get(2)?,
            scope: row.get(3)?,
            action: row.get(4)?,
            enabled: row.get(5)?,
            priority: row.get(6)?,
            stop_on_match: row.get(7)?,
            match_count: row.get(8)?,
            created_at: row.get(9)?,
            last_modified: row.get(10)?,
        })
    }

    fn into_rule(self) -> Result<Rule> {
        Ok(Rule {
            id: self.id,
            name: self.name,
            matcher: serde_json::from_str(&self.matcher)?,
            scope: serde_json::from_str(&self.scope)?,
            action: serde_json::from_str(&self.action)?,
            enabled: self.enabled,
            priority: self.priority,
            stop_on_match: self.stop_on_match,
            match_count: self.match_count,
            created_at: parse_timestamp(&self.created_at),
            last_modified: parse_timestamp(&self.last_modified),
        })
    }
}

fn query_rules<P: duckdb::Params>(conn: &Connection, sql: &str, params: P) -> Result<Vec<Rule>> {
    let mut stmt = conn.prepare(sql)?;
    let rows = stmt.query_map(params, RuleRow::read)?;

    let mut rules = Vec::new();
    for row in rows {
        rules.push(row?.into_rule()?);
    }
    Ok(rules)
}

fn row_to_article(row: &duckdb::Row) -> duckdb::Result<Article> {
    let published: String = row.get(8)?;
    let status: String = row.get(9)?;
    Ok(Article {
        id: row.get(0)?,
        feed_id: row.get(1)?,
        title: row.get(2)?,
        content: row.get(3)?,
        summary: row.get(4)?,
        author: row.get(5)?,
        categories: row.get(6)?,
        link: row.get(7)?,
        published_date: parse_timestamp(&published),
        status: ArticleStatus::parse(&status),
        is_starred: row.get(10)?,
        is_favorite: row.get(11)?,
        highlight_color: row.get::<_, Option<String>>(12)?,
    })
}

fn row_to_feed(row: &duckdb::Row) -> duckdb::Result<Feed> {
    Ok(Feed {
        id: row.get(0)?,
        title: row.get(1)?,
        url: row.get(2)?,
        category_id: row.get::<_, Option<i64>>(3)?,
    })
}

fn parse_timestamp(s: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or_else(|_| Utc::now())
}

// ============================================================================
// Ports
// ============================================================================

#[async_trait]
impl RuleRepository for DuckDbRepository {
    async fn get_by_id(&self, id: i64) -> Result<Option<Rule>> {
        let conn = self.conn()?;
        let sql = format!("SELECT {} FROM rules WHERE rule_id = ?", RULE_COLUMNS);
        Ok(query_rules(&conn, &sql, [id])?.into_iter().next())
    }

    async fn get_all(&self) -> Result<Vec<Rule>> {
        let conn = self.conn()?;
        let sql = format!("SELECT {} FROM rules ORDER BY priority, rule_id", RULE_COLUMNS);
        query_rules(&conn, &sql, [])
    }

    async fn get_active(&self) -> Result<Vec<Rule>> {
        let conn = self.conn()?;
        let sql = format!(
            "SELECT {} FROM rules WHERE enabled = true ORDER BY priority, rule_id",
            RULE_COLUMNS
        );
        query_rules(&conn, &sql, [])
    }

    async fn exists_by_name(&self, name: &str) -> Result<bool> {
        let conn = self.conn()?;
        let count: i64 =
            conn.query_row("SELECT COUNT(*) FROM rules WHERE name = ?", [name], |row| row.get(0))?;
        Ok(count > 0)
    }

    async fn insert(&self, rule: &Rule) -> Result<Rule> {
        let matcher = serde_json::to_string(&rule.matcher)?;
        let scope = serde_json::to_string(&rule.scope)?;
        let action = serde_json::to_string(&rule.action)?;

        let conn = self.conn()?;
        let id: i64 = conn.query_row(
            "INSERT INTO rules (name, matcher, scope, action, enabled, priority, stop_on_match,
                                match_count, created_at, last_modified)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
             RETURNING rule_id",
            params![
                rule.name,
                matcher,
                scope,
                action,
                rule.enabled,
                rule.priority,
                rule.stop_on_match,
                rule.match_count,
                rule.created_at.to_rfc3339(),
                rule.last_modified.to_rfc3339(),
            ],
            |row| row.get(0),
        )?;

        let mut stored = rule.clone();
        stored.id = id;
        Ok(stored)
    }

    async fn update(&self, rule: &Rule) -> Result<()> {
        let matcher = serde_json::to_string(&rule.matcher)?;
        let scope = serde_json::to_string(&rule.scope)?;
        let action = serde_json::to_string(&rule.action)?;

        let conn = self.conn()?;
        let changed = conn.execute(
            "UPDATE rules SET name = ?, matcher = ?, scope = ?, action = ?, enabled = ?,
                              priority = ?, stop_on_match = ?, last_modified = ?
             WHERE rule_id = ?",
            params![
                rule.name,
                matcher,
                scope,
                action,
                rule.enabled,
                rule.priority,
                rule.stop_on_match,
                rule.last_modified.to_rfc3339(),
                rule.id,
            ],
        )?;
        if changed == 0 {
            return Err(Error::not_found(format!("rule {}", rule.id)));
        }
        Ok(())
    }

    async fn delete(&self, id: i64) -> Result<bool> {
        let conn = self.conn()?;
        let changed = conn.execute("DELETE FROM rules WHERE rule_id = ?", [id])?;
        Ok(changed > 0)
    }

    async fn increment_match_count(&self, id: i64, at: DateTime<Utc>) -> Result<()> {
        // Single statement, so concurrent increments of one rule never lose a count
        let conn = self.conn()?;
        conn.execute(
            "UPDATE rules SET match_count = match_count + 1, last_modified = ? WHERE rule_id = ?",
            params![at.to_rfc3339(), id],
        )?;
        Ok(())
    }

    async fn get_total_match_count(&self) -> Result<i64> {
        let conn = self.conn()?;
        let total: i64 = conn.query_row(
            "SELECT CAST(COALESCE(SUM(match_count), 0) AS BIGINT) FROM rules",
            [],
            |row| row.get(0),
        )?;
        Ok(total)
    }

    async fn get_top_by_match_count(&self, limit: usize) -> Result<Vec<Rule>> {
        let conn = self.conn()?;
        let sql = format!(
            "SELECT {} FROM rules ORDER BY match_count DESC, rule_id LIMIT ?",
            RULE_COLUMNS
        );
        query_rules(&conn, &sql, [limit as i64])
    }
}

#[async_trait]
impl ArticleRepository for DuckDbRepository {
    async fn get_by_id(&self, id: i64) -> Result<Option<Article>> {
        let conn = self.conn()?;
        let sql = format!("SELECT {} FROM articles WHERE article_id = ?", ARTICLE_COLUMNS);
        let mut stmt = conn.prepare(&sql)?;
        let mut rows = stmt.query_map([id], row_to_article)?;
        Ok(rows.next().transpose()?)
    }

    async fn update(&self, article: &Article) -> Result<()> {
        let conn = self.conn()?;
        let changed = conn.execute(
            "UPDATE articles SET status = ?, is_starred = ?, is_favorite = ?, highlight_color = ?
             WHERE article_id = ?",
            params![
                article.status.as_str(),
                article.is_starred,
                article.is_favorite,
                article.highlight_color,
                article.id,
            ],
        )?;
        if changed == 0 {
            return Err(Error::not_found(format!("article {}", article.id)));
        }
        Ok(())
    }
}

#[async_trait]
impl FeedRepository for DuckDbRepository {
    async fn get_by_id(&self, id: i64) -> Result<Option<Feed>> {
        let conn = self.conn()?;
        let mut stmt =
            conn.prepare("SELECT feed_id, title, url, category_id FROM feeds WHERE feed_id = ?")?;
        let mut rows = stmt.query_map([id], row_to_feed)?;
        Ok(rows.next().transpose()?)
    }

    async fn update(&self, feed: &Feed) -> Result<()> {
        let conn = self.conn()?;
        let changed = conn.execute(
            "UPDATE feeds SET title = ?, url = ?, category_id = ? WHERE feed_id = ?",
            params![feed.title, feed.url, feed.category_id, feed.id],
        )?;
        if changed == 0 {
            return Err(Error::not_found(format!("feed {}", feed.id)));
        }
        Ok(())
    }
}

#[async_trait]
impl TagAssociation for DuckDbRepository {
    async fn apply(&self, tag_ids: &IdSet, article_id: i64) -> Result<()> {
        let conn = self.conn()?;
        for tag_id in tag_ids.iter() {
            conn.execute(
                "INSERT INTO article_tags (article_id, tag_id) VALUES (?, ?) ON CONFLICT DO NOTHING",
                params![article_id, tag_id],
            )?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retryable_errors() {
        assert!(is_retryable_error("IO Error: Could not set lock on file: database is locked"));
        assert!(is_retryable_error("The process cannot access the file"));
        assert!(!is_retryable_error("Catalog Error: Table with name rules does not exist"));
    }

    #[test]
    fn test_parse_timestamp_round_trip() {
        let now = Utc::now();
        assert_eq!(parse_timestamp(&now.to_rfc3339()), now);
    }

    #[test]
    fn test_schema_is_idempotent() {
        let repo = DuckDbRepository::in_memory().unwrap();
        let first = repo.ensure_schema().unwrap();
        assert!(!first.applied.is_empty());
        let second = repo.ensure_schema().unwrap();
        assert!(second.applied.is_empty());
    }
}
