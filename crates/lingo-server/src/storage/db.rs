//! SQLite database layer (embedded, no external dependencies)

use anyhow::{Context, Result as AnyResult};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use lingo_core::ports::{SearchIndex, TagStore, TranslationStore, UserStore};
use lingo_core::{
    dedup_ids, dedup_names, LingoError, LocaleExport, NewTag, NewTranslation, Page, PageRequest,
    Result, SearchCriteria, Tag, Translation, TranslationUpdate, User,
};
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteSynchronous};
use sqlx::{QueryBuilder, Sqlite, SqliteConnection, SqlitePool, Transaction};
use std::collections::HashMap;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

const TRANSLATION_COLUMNS: &str =
    r#"t.id, t."key", t.content, t.locale, t.created_at, t.updated_at"#;

/// Ids bound per tag lookup, well under SQLite's host parameter limit
const HYDRATE_CHUNK: usize = 500;

pub struct Database {
    pool: Arc<SqlitePool>,
}

impl Database {
    pub async fn new(
        database_path: &str,
        max_connections: u32,
        busy_timeout: Duration,
    ) -> AnyResult<Self> {
        tracing::info!("Opening SQLite database at: {}", database_path);

        if let Some(parent) = std::path::Path::new(database_path).parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent).await.with_context(|| {
                    format!("Failed to create database directory: {}", parent.display())
                })?;
            }
        }

        let options = SqliteConnectOptions::new()
            .filename(database_path)
            .create_if_missing(true)
            .foreign_keys(true)
            .busy_timeout(busy_timeout)
            .journal_mode(SqliteJournalMode::Wal)
            .synchronous(SqliteSynchronous::Normal);

        let pool = SqlitePoolOptions::new()
            .max_connections(max_connections)
            .connect_with(options)
            .await
            .with_context(|| {
                format!("Failed to connect to SQLite database at: {}", database_path)
            })?;

        tracing::info!("SQLite connection established, running migrations...");

        Self::run_migrations(&pool)
            .await
            .context("Failed to run database migrations")?;

        tracing::info!("Database initialization complete");

        Ok(Self {
            pool: Arc::new(pool),
        })
    }

    /// Private in-memory database on a single pinned connection
    pub async fn in_memory() -> AnyResult<Self> {
        let options = SqliteConnectOptions::from_str("sqlite::memory:")?.foreign_keys(true);

        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect_with(options)
            .await
            .context("Failed to open in-memory SQLite database")?;

        Self::run_migrations(&pool)
            .await
            .context("Failed to run database migrations")?;

        Ok(Self {
            pool: Arc::new(pool),
        })
    }

    async fn run_migrations(pool: &SqlitePool) -> AnyResult<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS users (
                id TEXT PRIMARY KEY,
                name TEXT NOT NULL,
                email TEXT UNIQUE NOT NULL,
                password_hash TEXT NOT NULL,
                created_at TEXT NOT NULL
            )
            "#,
        )
        .execute(pool)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS translations (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                "key" TEXT NOT NULL CHECK (length("key") BETWEEN 1 AND 255),
                content TEXT NOT NULL CHECK (length(content) > 0),
                locale TEXT NOT NULL CHECK (length(locale) = 2),
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL
            )
            "#,
        )
        .execute(pool)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS tags (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                name TEXT NOT NULL UNIQUE CHECK (length(name) BETWEEN 1 AND 50),
                description TEXT CHECK (description IS NULL OR length(description) <= 255)
            )
            "#,
        )
        .execute(pool)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS translation_tag (
                translation_id INTEGER NOT NULL REFERENCES translations(id) ON DELETE CASCADE,
                tag_id INTEGER NOT NULL REFERENCES tags(id) ON DELETE CASCADE,
                PRIMARY KEY (translation_id, tag_id)
            )
            "#,
        )
        .execute(pool)
        .await?;

        for index in [
            "CREATE INDEX IF NOT EXISTS idx_translations_locale ON translations(locale)",
            r#"CREATE INDEX IF NOT EXISTS idx_translations_key ON translations("key")"#,
            "CREATE INDEX IF NOT EXISTS idx_translations_created_at ON translations(created_at)",
            "CREATE INDEX IF NOT EXISTS idx_translation_tag_tag ON translation_tag(tag_id)",
        ] {
            sqlx::query(index).execute(pool).await?;
        }

        Ok(())
    }

    /// Liveness check for the health endpoint
    pub async fn ping(&self) -> Result<()> {
        sqlx::query("SELECT 1")
            .execute(&*self.pool)
            .await
            .map_err(db_error)?;
        Ok(())
    }

    async fn begin(&self) -> Result<Transaction<'static, Sqlite>> {
        self.pool.begin().await.map_err(db_error)
    }

    async fn page(&self, request: PageRequest, order_by: &str) -> Result<Page<Translation>> {
        let mut conn = self.pool.acquire().await.map_err(db_error)?;

        let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM translations")
            .fetch_one(&mut *conn)
            .await
            .map_err(db_error)?;

        let sql = format!(
            "SELECT {TRANSLATION_COLUMNS} FROM translations t ORDER BY {order_by} LIMIT ?1 OFFSET ?2"
        );
        let rows: Vec<TranslationRow> = sqlx::query_as(&sql)
            .bind(i64::from(request.per_page))
            .bind(request.offset() as i64)
            .fetch_all(&mut *conn)
            .await
            .map_err(db_error)?;

        let data = hydrate(&mut conn, rows).await?;
        Ok(Page::new(data, request, total.max(0) as u64))
    }
}

/// Commit on success, roll back and re-raise the original error on failure
async fn finish<T>(tx: Transaction<'static, Sqlite>, result: Result<T>) -> Result<T> {
    match result {
        Ok(value) => {
            tx.commit().await.map_err(db_error)?;
            Ok(value)
        }
        Err(e) => {
            if let Err(rollback) = tx.rollback().await {
                tracing::warn!("Rollback failed after error ({}): {}", e, rollback);
            }
            Err(e)
        }
    }
}

fn db_error(e: sqlx::Error) -> LingoError {
    if let sqlx::Error::Database(db) = &e {
        if db.is_unique_violation() {
            return LingoError::Conflict(db.message().to_string());
        }
    }
    LingoError::Database(e.to_string())
}

/// Escape LIKE wildcards so the filter value matches literally
fn like_pattern(value: &str) -> String {
    let mut pattern = String::with_capacity(value.len() + 2);
    pattern.push('%');
    for c in value.chars() {
        if matches!(c, '%' | '_' | '\\') {
            pattern.push('\\');
        }
        pattern.push(c);
    }
    pattern.push('%');
    pattern
}

// Connection-level helpers shared by pooled reads and transactions

async fn fetch_translation(conn: &mut SqliteConnection, id: i64) -> Result<Option<Translation>> {
    let sql = format!("SELECT {TRANSLATION_COLUMNS} FROM translations t WHERE t.id = ?1");
    let row: Option<TranslationRow> = sqlx::query_as(&sql)
        .bind(id)
        .fetch_optional(&mut *conn)
        .await
        .map_err(db_error)?;

    match row {
        Some(row) => Ok(hydrate(conn, vec![row]).await?.pop()),
        None => Ok(None),
    }
}

async fn hydrate(conn: &mut SqliteConnection, rows: Vec<TranslationRow>) -> Result<Vec<Translation>> {
    if rows.is_empty() {
        return Ok(Vec::new());
    }

    let mut links: Vec<TagLinkRow> = Vec::new();
    for chunk in rows.chunks(HYDRATE_CHUNK) {
        let mut qb = QueryBuilder::<Sqlite>::new(
            r#"
            SELECT tt.translation_id, g.id, g.name, g.description
            FROM translation_tag tt
            JOIN tags g ON g.id = tt.tag_id
            WHERE tt.translation_id IN ("#,
        );
        let mut ids = qb.separated(", ");
        for row in chunk {
            ids.push_bind(row.id);
        }
        ids.push_unseparated(") ORDER BY g.name");

        links.extend(
            qb.build_query_as::<TagLinkRow>()
                .fetch_all(&mut *conn)
                .await
                .map_err(db_error)?,
        );
    }

    let mut by_translation: HashMap<i64, Vec<Tag>> = HashMap::new();
    for link in links {
        by_translation
            .entry(link.translation_id)
            .or_default()
            .push(Tag {
                id: link.id,
                name: link.name,
                description: link.description,
            });
    }

    Ok(rows
        .into_iter()
        .map(|row| {
            let tags = by_translation.remove(&row.id).unwrap_or_default();
            row.into_translation(tags)
        })
        .collect())
}

/// Conflict-resolving insert followed by a fetch; never check-then-insert
async fn find_or_create_tag_in(conn: &mut SqliteConnection, name: &str) -> Result<Tag> {
    sqlx::query("INSERT INTO tags (name) VALUES (?1) ON CONFLICT(name) DO NOTHING")
        .bind(name)
        .execute(&mut *conn)
        .await
        .map_err(db_error)?;

    let row: TagRow = sqlx::query_as("SELECT id, name, description FROM tags WHERE name = ?1")
        .bind(name)
        .fetch_one(&mut *conn)
        .await
        .map_err(db_error)?;

    Ok(row.into())
}

async fn missing_tag_ids_in(conn: &mut SqliteConnection, ids: &[i64]) -> Result<Vec<i64>> {
    let ids = dedup_ids(ids);
    if ids.is_empty() {
        return Ok(Vec::new());
    }

    let mut qb = QueryBuilder::<Sqlite>::new("SELECT id FROM tags WHERE id IN (");
    let mut sep = qb.separated(", ");
    for id in &ids {
        sep.push_bind(*id);
    }
    sep.push_unseparated(")");

    let found: Vec<i64> = qb
        .build_query_scalar()
        .fetch_all(&mut *conn)
        .await
        .map_err(db_error)?;

    Ok(ids.into_iter().filter(|id| !found.contains(id)).collect())
}

/// Make the association set of a translation exactly `tag_ids`:
/// orphaned links are removed and missing ones added.
async fn sync_links(conn: &mut SqliteConnection, translation_id: i64, tag_ids: &[i64]) -> Result<()> {
    let tag_ids = dedup_ids(tag_ids);

    let mut qb = QueryBuilder::<Sqlite>::new("DELETE FROM translation_tag WHERE translation_id = ");
    qb.push_bind(translation_id);
    if !tag_ids.is_empty() {
        qb.push(" AND tag_id NOT IN (");
        let mut sep = qb.separated(", ");
        for id in &tag_ids {
            sep.push_bind(*id);
        }
        sep.push_unseparated(")");
    }
    qb.build().execute(&mut *conn).await.map_err(db_error)?;

    for tag_id in tag_ids {
        sqlx::query(
            r#"
            INSERT INTO translation_tag (translation_id, tag_id)
            VALUES (?1, ?2)
            ON CONFLICT(translation_id, tag_id) DO NOTHING
            "#,
        )
        .bind(translation_id)
        .bind(tag_id)
        .execute(&mut *conn)
        .await
        .map_err(db_error)?;
    }

    Ok(())
}

async fn resolve_tag_names(conn: &mut SqliteConnection, names: &[String]) -> Result<Vec<i64>> {
    let mut ids = Vec::with_capacity(names.len());
    for name in dedup_names(names) {
        ids.push(find_or_create_tag_in(conn, name).await?.id);
    }
    Ok(ids)
}

async fn create_translation_in(conn: &mut SqliteConnection, new: &NewTranslation) -> Result<Translation> {
    let now = Utc::now();
    let id = sqlx::query(
        r#"
        INSERT INTO translations ("key", content, locale, created_at, updated_at)
        VALUES (?1, ?2, ?3, ?4, ?4)
        "#,
    )
    .bind(&new.key)
    .bind(&new.content)
    .bind(&new.locale)
    .bind(now)
    .execute(&mut *conn)
    .await
    .map_err(db_error)?
    .last_insert_rowid();

    if !new.tags.is_empty() {
        let tag_ids = resolve_tag_names(conn, &new.tags).await?;
        sync_links(conn, id, &tag_ids).await?;
    }

    fetch_translation(conn, id)
        .await?
        .ok_or_else(|| LingoError::not_found("Translation", id))
}

async fn update_translation_in(
    conn: &mut SqliteConnection,
    id: i64,
    update: &TranslationUpdate,
) -> Result<Translation> {
    let updated = sqlx::query("UPDATE translations SET content = ?1, updated_at = ?2 WHERE id = ?3")
        .bind(&update.content)
        .bind(Utc::now())
        .bind(id)
        .execute(&mut *conn)
        .await
        .map_err(db_error)?
        .rows_affected();

    if updated == 0 {
        return Err(LingoError::not_found("Translation", id));
    }

    if let Some(names) = &update.tags {
        let tag_ids = resolve_tag_names(conn, names).await?;
        sync_links(conn, id, &tag_ids).await?;
    }

    fetch_translation(conn, id)
        .await?
        .ok_or_else(|| LingoError::not_found("Translation", id))
}

async fn delete_translation_in(conn: &mut SqliteConnection, id: i64) -> Result<bool> {
    sqlx::query("DELETE FROM translation_tag WHERE translation_id = ?1")
        .bind(id)
        .execute(&mut *conn)
        .await
        .map_err(db_error)?;

    let deleted = sqlx::query("DELETE FROM translations WHERE id = ?1")
        .bind(id)
        .execute(&mut *conn)
        .await
        .map_err(db_error)?
        .rows_affected();

    Ok(deleted > 0)
}

async fn sync_tag_ids_in(conn: &mut SqliteConnection, id: i64, tag_ids: &[i64]) -> Result<Translation> {
    // Write first so the transaction holds the write lock before it reads
    let touched = sqlx::query("UPDATE translations SET updated_at = ?1 WHERE id = ?2")
        .bind(Utc::now())
        .bind(id)
        .execute(&mut *conn)
        .await
        .map_err(db_error)?
        .rows_affected();
    if touched == 0 {
        return Err(LingoError::not_found("Translation", id));
    }

    let missing = missing_tag_ids_in(conn, tag_ids).await?;
    if !missing.is_empty() {
        let list = missing
            .iter()
            .map(|id| id.to_string())
            .collect::<Vec<_>>()
            .join(", ");
        return Err(LingoError::Validation(format!("Unknown tag ids: {}", list)));
    }

    sync_links(conn, id, tag_ids).await?;

    fetch_translation(conn, id)
        .await?
        .ok_or_else(|| LingoError::not_found("Translation", id))
}

#[async_trait]
impl TagStore for Database {
    async fn create_tag(&self, tag: &NewTag) -> Result<Tag> {
        let row: TagRow = sqlx::query_as(
            r#"
            INSERT INTO tags (name, description)
            VALUES (?1, ?2)
            RETURNING id, name, description
            "#,
        )
        .bind(&tag.name)
        .bind(&tag.description)
        .fetch_one(&*self.pool)
        .await
        .map_err(db_error)?;

        Ok(row.into())
    }

    async fn get_tag(&self, id: i64) -> Result<Option<Tag>> {
        let row: Option<TagRow> =
            sqlx::query_as("SELECT id, name, description FROM tags WHERE id = ?1")
                .bind(id)
                .fetch_optional(&*self.pool)
                .await
                .map_err(db_error)?;

        Ok(row.map(Into::into))
    }

    async fn find_tag_by_name(&self, name: &str) -> Result<Option<Tag>> {
        let row: Option<TagRow> =
            sqlx::query_as("SELECT id, name, description FROM tags WHERE name = ?1")
                .bind(name)
                .fetch_optional(&*self.pool)
                .await
                .map_err(db_error)?;

        Ok(row.map(Into::into))
    }

    async fn find_or_create_tag(&self, name: &str) -> Result<Tag> {
        let mut conn = self.pool.acquire().await.map_err(db_error)?;
        find_or_create_tag_in(&mut conn, name).await
    }

    async fn list_tags(&self) -> Result<Vec<Tag>> {
        let rows: Vec<TagRow> =
            sqlx::query_as("SELECT id, name, description FROM tags ORDER BY name")
                .fetch_all(&*self.pool)
                .await
                .map_err(db_error)?;

        Ok(rows.into_iter().map(Into::into).collect())
    }

    async fn missing_tag_ids(&self, ids: &[i64]) -> Result<Vec<i64>> {
        let mut conn = self.pool.acquire().await.map_err(db_error)?;
        missing_tag_ids_in(&mut conn, ids).await
    }
}

#[async_trait]
impl TranslationStore for Database {
    async fn create_translation(&self, new: &NewTranslation) -> Result<Translation> {
        let mut tx = self.begin().await?;
        let result = create_translation_in(&mut tx, new).await;
        finish(tx, result).await
    }

    async fn update_translation(&self, id: i64, update: &TranslationUpdate) -> Result<Translation> {
        let mut tx = self.begin().await?;
        let result = update_translation_in(&mut tx, id, update).await;
        finish(tx, result).await
    }

    async fn delete_translation(&self, id: i64) -> Result<bool> {
        let mut tx = self.begin().await?;
        let result = delete_translation_in(&mut tx, id).await;
        finish(tx, result).await
    }

    async fn find_translation(&self, id: i64) -> Result<Option<Translation>> {
        let mut conn = self.pool.acquire().await.map_err(db_error)?;
        fetch_translation(&mut conn, id).await
    }

    async fn paginate(&self, request: PageRequest) -> Result<Page<Translation>> {
        self.page(request, "t.created_at DESC, t.id DESC").await
    }

    async fn list_page(&self, request: PageRequest) -> Result<Page<Translation>> {
        self.page(request, "t.id ASC").await
    }

    async fn sync_tag_ids(&self, id: i64, tag_ids: &[i64]) -> Result<Translation> {
        let mut tx = self.begin().await?;
        let result = sync_tag_ids_in(&mut tx, id, tag_ids).await;
        finish(tx, result).await
    }

    async fn export_locale(&self, locale: &str) -> Result<LocaleExport> {
        let rows: Vec<(String, String)> = sqlx::query_as(
            r#"
            SELECT "key", content FROM translations
            WHERE locale = ?1
            ORDER BY id ASC
            "#,
        )
        .bind(locale)
        .fetch_all(&*self.pool)
        .await
        .map_err(db_error)?;

        // Later rows overwrite earlier ones for a repeated key
        Ok(rows.into_iter().collect())
    }
}

#[async_trait]
impl SearchIndex for Database {
    async fn search(&self, criteria: &SearchCriteria) -> Result<Vec<Translation>> {
        let mut qb = QueryBuilder::<Sqlite>::new(format!(
            "SELECT {TRANSLATION_COLUMNS} FROM translations t WHERE 1=1"
        ));

        if let Some(key) = &criteria.key {
            qb.push(r#" AND t."key" LIKE "#)
                .push_bind(like_pattern(key))
                .push(r" ESCAPE '\'");
        }

        if let Some(content) = &criteria.content {
            qb.push(" AND t.content LIKE ")
                .push_bind(like_pattern(content))
                .push(r" ESCAPE '\'");
        }

        if let Some(locale) = &criteria.locale {
            qb.push(" AND t.locale = ").push_bind(locale.clone());
        }

        if !criteria.tags.is_empty() {
            qb.push(
                r#"
                AND EXISTS (
                    SELECT 1 FROM translation_tag tt
                    JOIN tags g ON g.id = tt.tag_id
                    WHERE tt.translation_id = t.id AND g.name IN ("#,
            );
            let mut names = qb.separated(", ");
            for name in &criteria.tags {
                names.push_bind(name.clone());
            }
            names.push_unseparated("))");
        }

        qb.push(" ORDER BY t.id ASC");

        let mut conn = self.pool.acquire().await.map_err(db_error)?;
        let rows: Vec<TranslationRow> = qb
            .build_query_as()
            .fetch_all(&mut *conn)
            .await
            .map_err(db_error)?;

        hydrate(&mut conn, rows).await
    }
}

#[async_trait]
impl UserStore for Database {
    async fn create_user(&self, name: &str, email: &str, password_hash: &str) -> Result<User> {
        let user = User {
            id: uuid::Uuid::new_v4().to_string(),
            name: name.to_string(),
            email: email.to_string(),
            created_at: Utc::now(),
        };

        sqlx::query(
            r#"
            INSERT INTO users (id, name, email, password_hash, created_at)
            VALUES (?1, ?2, ?3, ?4, ?5)
            "#,
        )
        .bind(&user.id)
        .bind(&user.name)
        .bind(&user.email)
        .bind(password_hash)
        .bind(user.created_at)
        .execute(&*self.pool)
        .await
        .map_err(db_error)?;

        Ok(user)
    }

    async fn get_user(&self, id: &str) -> Result<Option<User>> {
        let row: Option<UserRow> = sqlx::query_as(
            "SELECT id, name, email, password_hash, created_at FROM users WHERE id = ?1",
        )
        .bind(id)
        .fetch_optional(&*self.pool)
        .await
        .map_err(db_error)?;

        Ok(row.map(|r| r.into_user().0))
    }

    async fn get_user_credentials(&self, email: &str) -> Result<Option<(User, String)>> {
        let row: Option<UserRow> = sqlx::query_as(
            "SELECT id, name, email, password_hash, created_at FROM users WHERE email = ?1",
        )
        .bind(email)
        .fetch_optional(&*self.pool)
        .await
        .map_err(db_error)?;

        Ok(row.map(UserRow::into_user))
    }

    async fn update_user(
        &self,
        id: &str,
        name: &str,
        email: &str,
        password_hash: Option<&str>,
    ) -> Result<User> {
        let row: Option<UserRow> = sqlx::query_as(
            r#"
            UPDATE users
            SET name = ?1, email = ?2, password_hash = COALESCE(?3, password_hash)
            WHERE id = ?4
            RETURNING id, name, email, password_hash, created_at
            "#,
        )
        .bind(name)
        .bind(email)
        .bind(password_hash)
        .bind(id)
        .fetch_optional(&*self.pool)
        .await
        .map_err(db_error)?;

        row.map(|r| r.into_user().0)
            .ok_or_else(|| LingoError::not_found("User", id))
    }
}

// Helper structs for sqlx query_as
#[derive(sqlx::FromRow)]
struct TranslationRow {
    id: i64,
    key: String,
    content: String,
    locale: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TranslationRow {
    fn into_translation(self, tags: Vec<Tag>) -> Translation {
        Translation {
            id: self.id,
            key: self.key,
            content: self.content,
            locale: self.locale,
            created_at: self.created_at,
            updated_at: self.updated_at,
            tags,
        }
    }
}

#[derive(sqlx::FromRow)]
struct TagRow {
    id: i64,
    name: String,
    description: Option<String>,
}

impl From<TagRow> for Tag {
    fn from(r: TagRow) -> Self {
        Tag {
            id: r.id,
            name: r.name,
            description: r.description,
        }
    }
}

#[derive(sqlx::FromRow)]
struct TagLinkRow {
    translation_id: i64,
    id: i64,
    name: String,
    description: Option<String>,
}

#[derive(sqlx::FromRow)]
struct UserRow {
    id: String,
    name: String,
    email: String,
    password_hash: String,
    created_at: DateTime<Utc>,
}

impl UserRow {
    fn into_user(self) -> (User, String) {
        (
            User {
                id: self.id,
                name: self.name,
                email: self.email,
                created_at: self.created_at,
            },
            self.password_hash,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio_test::assert_ok;

    async fn db() -> Database {
        Database::in_memory().await.expect("in-memory database")
    }

    fn names(t: &Translation) -> Vec<&str> {
        t.tag_names()
    }

    #[tokio::test]
    async fn test_create_resolves_and_creates_tags() {
        let db = db().await;
        let existing = db.create_tag(&NewTag::named("web")).await.unwrap();

        let created = db
            .create_translation(
                &NewTranslation::new("test_key", "Test content", "en")
                    .with_tags(["mobile", "web", "mobile"]),
            )
            .await
            .unwrap();

        assert_eq!(created.key, "test_key");
        assert_eq!(names(&created), vec!["mobile", "web"]);
        assert!(created.tags.iter().any(|t| t.id == existing.id));
        assert_eq!(db.list_tags().await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_failed_create_leaves_no_partial_state() {
        let db = db().await;

        // Tag names longer than 50 characters violate the tags CHECK constraint
        let too_long = "x".repeat(51);
        let result = db
            .create_translation(&NewTranslation::new("k", "c", "en").with_tags(["ok", too_long.as_str()]))
            .await;

        assert!(matches!(result, Err(LingoError::Database(_))));
        let page = db.list_page(PageRequest::default()).await.unwrap();
        assert_eq!(page.total, 0);
        assert!(db.find_tag_by_name("ok").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_store_rejects_invalid_locale() {
        let db = db().await;
        let result = db
            .create_translation(&NewTranslation::new("k", "c", "eng"))
            .await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_update_replaces_tags() {
        let db = db().await;
        let created = db
            .create_translation(&NewTranslation::new("k", "Old", "en").with_tags(["mobile", "legacy"]))
            .await
            .unwrap();

        let updated = db
            .update_translation(
                created.id,
                &TranslationUpdate::content("Updated content").with_tags(["mobile", "new_tag"]),
            )
            .await
            .unwrap();
        assert_eq!(updated.content, "Updated content");
        assert_eq!(names(&updated), vec!["mobile", "new_tag"]);
        assert!(updated.updated_at >= created.updated_at);

        // Untouched when tags are not supplied
        let content_only = db
            .update_translation(created.id, &TranslationUpdate::content("Again"))
            .await
            .unwrap();
        assert_eq!(names(&content_only), vec!["mobile", "new_tag"]);

        // Detached tags survive
        assert!(db.find_tag_by_name("legacy").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_update_missing_translation_is_not_found() {
        let db = db().await;
        let err = db
            .update_translation(999, &TranslationUpdate::content("x"))
            .await
            .unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn test_delete_detaches_but_keeps_tags() {
        let db = db().await;
        let created = db
            .create_translation(&NewTranslation::new("k", "c", "en").with_tags(["mobile"]))
            .await
            .unwrap();
        let tag_id = created.tags[0].id;

        assert!(assert_ok!(db.delete_translation(created.id).await));
        assert!(!assert_ok!(db.delete_translation(created.id).await));
        assert!(db.find_translation(created.id).await.unwrap().is_none());

        let tag = db.get_tag(tag_id).await.unwrap().expect("tag survives");
        assert_eq!(tag.name, "mobile");

        let links: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM translation_tag")
            .fetch_one(&*db.pool)
            .await
            .unwrap();
        assert_eq!(links, 0);
    }

    #[tokio::test]
    async fn test_sync_tag_ids() {
        let db = db().await;
        let a = db.create_tag(&NewTag::named("a")).await.unwrap();
        let b = db.create_tag(&NewTag::named("b")).await.unwrap();
        let created = db
            .create_translation(&NewTranslation::new("k", "c", "en").with_tags(["a"]))
            .await
            .unwrap();

        let synced = db.sync_tag_ids(created.id, &[b.id, b.id]).await.unwrap();
        assert_eq!(names(&synced), vec!["b"]);

        let both = db.sync_tag_ids(created.id, &[a.id, b.id]).await.unwrap();
        assert_eq!(both.tags.len(), 2);

        let cleared = db.sync_tag_ids(created.id, &[]).await.unwrap();
        assert!(cleared.tags.is_empty());
        let again = db.sync_tag_ids(created.id, &[]).await.unwrap();
        assert!(again.tags.is_empty());
    }

    #[tokio::test]
    async fn test_sync_unknown_tag_id_rolls_back() {
        let db = db().await;
        let a = db.create_tag(&NewTag::named("a")).await.unwrap();
        let created = db
            .create_translation(&NewTranslation::new("k", "c", "en").with_tags(["a"]))
            .await
            .unwrap();

        let err = db.sync_tag_ids(created.id, &[a.id, 404]).await.unwrap_err();
        assert!(matches!(err, LingoError::Validation(_)));

        let unchanged = db.find_translation(created.id).await.unwrap().unwrap();
        assert_eq!(names(&unchanged), vec!["a"]);
        assert!(db.sync_tag_ids(999, &[]).await.unwrap_err().is_not_found());
    }

    #[tokio::test]
    async fn test_duplicate_tag_name_is_conflict() {
        let db = db().await;
        db.create_tag(&NewTag::named("web")).await.unwrap();
        let err = db.create_tag(&NewTag::named("web")).await.unwrap_err();
        assert!(matches!(err, LingoError::Conflict(_)));

        // find-or-create never errors on an existing name
        let found = db.find_or_create_tag("web").await.unwrap();
        assert_eq!(found.name, "web");
        assert_eq!(db.list_tags().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_missing_tag_ids() {
        let db = db().await;
        let a = db.create_tag(&NewTag::named("a")).await.unwrap();
        let missing = db.missing_tag_ids(&[a.id, 77, 78, 77]).await.unwrap();
        assert_eq!(missing, vec![77, 78]);
        assert!(db.missing_tag_ids(&[]).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_pagination_orders() {
        let db = db().await;
        for i in 1..=5 {
            db.create_translation(&NewTranslation::new(format!("k{i}"), "c", "en"))
                .await
                .unwrap();
        }

        let first = db.list_page(PageRequest::new(1, 2)).await.unwrap();
        assert_eq!(first.total, 5);
        assert_eq!(first.last_page, 3);
        assert_eq!(
            first.data.iter().map(|t| t.key.as_str()).collect::<Vec<_>>(),
            vec!["k1", "k2"]
        );

        let newest = db.paginate(PageRequest::new(1, 2)).await.unwrap();
        assert_eq!(
            newest.data.iter().map(|t| t.key.as_str()).collect::<Vec<_>>(),
            vec!["k5", "k4"]
        );

        let last = db.list_page(PageRequest::new(3, 2)).await.unwrap();
        assert_eq!(last.data.len(), 1);
        assert_eq!(last.current_page, 3);
    }

    #[tokio::test]
    async fn test_export_is_flat_and_scoped() {
        let db = db().await;
        db.create_translation(&NewTranslation::new("k1", "c1", "en").with_tags(["web"]))
            .await
            .unwrap();
        db.create_translation(&NewTranslation::new("k2", "c2", "en"))
            .await
            .unwrap();
        db.create_translation(&NewTranslation::new("k1", "Hola", "es"))
            .await
            .unwrap();

        let export = db.export_locale("en").await.unwrap();
        let expected: LocaleExport = [("k1", "c1"), ("k2", "c2")]
            .into_iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        assert_eq!(export, expected);
        assert!(db.export_locale("fr").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_search_filters() {
        let db = db().await;
        db.create_translation(&NewTranslation::new("welcome_message", "Welcome", "en").with_tags(["mobile"]))
            .await
            .unwrap();
        db.create_translation(&NewTranslation::new("welcome_message", "Bienvenue", "fr").with_tags(["web"]))
            .await
            .unwrap();
        db.create_translation(&NewTranslation::new("goodbye", "Bye", "en").with_tags(["desktop"]))
            .await
            .unwrap();

        let by_key_locale = db
            .search(&SearchCriteria {
                key: Some("welcome".into()),
                locale: Some("en".into()),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(by_key_locale.len(), 1);
        assert_eq!(by_key_locale[0].key, "welcome_message");
        assert_eq!(names(&by_key_locale[0]), vec!["mobile"]);

        let by_tags = db
            .search(&SearchCriteria {
                tags: vec!["mobile".into(), "web".into()],
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(by_tags.len(), 2);
        assert!(by_tags.iter().all(|t| t.has_tag("mobile") || t.has_tag("web")));

        let all = db.search(&SearchCriteria::default()).await.unwrap();
        assert_eq!(all.len(), 3);
    }

    #[tokio::test]
    async fn test_search_is_case_insensitive_and_literal() {
        let db = db().await;
        db.create_translation(&NewTranslation::new("promo_banner", "50% OFF", "en"))
            .await
            .unwrap();
        db.create_translation(&NewTranslation::new("promoXbanner", "500 OFF", "en"))
            .await
            .unwrap();

        let upper = db
            .search(&SearchCriteria {
                key: Some("PROMO".into()),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(upper.len(), 2);

        let underscore = db
            .search(&SearchCriteria {
                key: Some("promo_".into()),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(underscore.len(), 1);
        assert_eq!(underscore[0].key, "promo_banner");

        let percent = db
            .search(&SearchCriteria {
                content: Some("0%".into()),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(percent.len(), 1);
        assert_eq!(percent[0].content, "50% OFF");
    }

    #[tokio::test]
    async fn test_search_hydrates_tags_across_chunks() {
        let db = db().await;
        let rows = HYDRATE_CHUNK * 2 + 200;
        sqlx::query(
            r#"
            WITH RECURSIVE n(i) AS (SELECT 1 UNION ALL SELECT i + 1 FROM n WHERE i < ?1)
            INSERT INTO translations ("key", content, locale, created_at, updated_at)
            SELECT 'k' || i, 'c', 'en', ?2, ?2 FROM n
            "#,
        )
        .bind(rows as i64)
        .bind(Utc::now())
        .execute(&*db.pool)
        .await
        .unwrap();

        let web = db.create_tag(&NewTag::named("web")).await.unwrap();
        let tagged_ids = [1_i64, HYDRATE_CHUNK as i64 + 1, rows as i64];
        for id in tagged_ids {
            assert_ok!(db.sync_tag_ids(id, &[web.id]).await);
        }

        let all = db.search(&SearchCriteria::default()).await.unwrap();
        assert_eq!(all.len(), rows);
        for t in &all {
            if tagged_ids.contains(&t.id) {
                assert_eq!(names(t), vec!["web"], "translation {}", t.id);
            } else {
                assert!(t.tags.is_empty(), "translation {}", t.id);
            }
        }
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_creates_share_one_new_tag() {
        // File-backed so the pool really runs transactions side by side
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("lingo.db");
        let db = Arc::new(
            Database::new(path.to_str().unwrap(), 5, Duration::from_secs(5))
                .await
                .unwrap(),
        );

        let tasks = (0..8).map(|i| {
            let db = db.clone();
            tokio::spawn(async move {
                db.create_translation(
                    &NewTranslation::new(format!("key_{i}"), "c", "en").with_tags(["shared"]),
                )
                .await
            })
        });

        for result in futures::future::join_all(tasks).await {
            assert!(result.unwrap().is_ok());
        }

        let tags = db.list_tags().await.unwrap();
        assert_eq!(tags.len(), 1);
        let tagged = db
            .search(&SearchCriteria {
                tags: vec!["shared".into()],
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(tagged.len(), 8);
    }

    #[tokio::test]
    async fn test_users() {
        let db = db().await;
        let user = db.create_user("Ada", "ada@example.com", "hash").await.unwrap();
        assert_eq!(db.get_user(&user.id).await.unwrap(), Some(user.clone()));

        let (found, hash) = db
            .get_user_credentials("ada@example.com")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(found.id, user.id);
        assert_eq!(hash, "hash");

        let dup = db.create_user("Other", "ada@example.com", "h").await.unwrap_err();
        assert!(matches!(dup, LingoError::Conflict(_)));
    }

    #[tokio::test]
    async fn test_update_user() {
        let db = db().await;
        let ada = db.create_user("Ada", "ada@example.com", "hash").await.unwrap();
        db.create_user("Bob", "bob@example.com", "h").await.unwrap();

        let renamed = db
            .update_user(&ada.id, "Ada L.", "ada@lovelace.dev", None)
            .await
            .unwrap();
        assert_eq!(renamed.name, "Ada L.");
        assert_eq!(renamed.created_at, ada.created_at);
        let (_, hash) = db
            .get_user_credentials("ada@lovelace.dev")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(hash, "hash");

        assert_ok!(
            db.update_user(&ada.id, "Ada L.", "ada@lovelace.dev", Some("new-hash"))
                .await
        );
        let (_, hash) = db
            .get_user_credentials("ada@lovelace.dev")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(hash, "new-hash");

        let taken = db
            .update_user(&ada.id, "Ada", "bob@example.com", None)
            .await
            .unwrap_err();
        assert!(matches!(taken, LingoError::Conflict(_)));

        let missing = db.update_user("nobody", "N", "n@example.com", None).await.unwrap_err();
        assert!(missing.is_not_found());
    }
}
