//! Database migrations - embedded SQL files
//!
//! Each migration is a (name, sql_content) pair compiled in with
//! include_str!, applied in name order.

/// All migrations, embedded at compile time.
///
/// When adding a migration, create `NNN_description.sql` and append it here.
pub const MIGRATIONS: &[(&str, &str)] = &[
    ("000_migrations.sql", include_str!("000_migrations.sql")),
    ("001_feeds_articles.sql", include_str!("001_feeds_articles.sql")),
    ("002_rules.sql", include_str!("002_rules.sql")),
    ("003_article_highlight.sql", include_str!("003_article_highlight.sql")),
];
