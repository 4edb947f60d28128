use crate::db::models::{Chapter, ChapterChanges, NewChapter};
use crate::db::schema::SQLITE_INIT;
use crate::error::ChapterError;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions};
use sqlx::{Pool, Sqlite, SqliteConnection, Transaction};
use std::str::FromStr;
use std::time::Duration;

pub type SqlitePool = Pool<Sqlite>;

const SELECT_CHAPTER: &str =
    "SELECT chap_id, course_type, chapter_name, chapter_image_url FROM chapters";

/// Open a pool on `database_url`, creating the database file when missing.
pub async fn connect(database_url: &str) -> Result<SqlitePool, ChapterError> {
    let options = SqliteConnectOptions::from_str(database_url)?
        .create_if_missing(true)
        .journal_mode(SqliteJournalMode::Wal)
        .busy_timeout(Duration::from_secs(5));
    let pool = SqlitePoolOptions::new().connect_with(options).await?;
    Ok(pool)
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CreateOutcome {
    Created(i64),
    NameTaken,
    NotInserted,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UpdateOutcome {
    Updated { previous: Chapter, current: Chapter },
    Missing,
    NotUpdated,
}

#[derive(Clone)]
pub struct ChapterStorage {
    pool: SqlitePool,
}

impl ChapterStorage {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Initialize the schema by executing the bundled DDL.
    pub async fn init_schema(&self) -> Result<(), ChapterError> {
        // sqlx::query runs a single statement at a time
        for stmt in SQLITE_INIT.split(';') {
            let s = stmt.trim();
            if s.is_empty() {
                continue;
            }
            sqlx::query(s).execute(&self.pool).await?;
        }
        Ok(())
    }

    /// Start a transaction holding the write lock from its first statement.
    ///
    /// A deferred transaction that reads before writing cannot be upgraded
    /// while another connection writes; SQLite fails it with SQLITE_BUSY
    /// instead of waiting on the busy timeout.
    async fn begin_write(&self) -> Result<Transaction<'static, Sqlite>, ChapterError> {
        Ok(self.pool.begin_with("BEGIN IMMEDIATE").await?)
    }

    /// Name check and insert in one transaction.
    pub async fn create(&self, chapter: &NewChapter) -> Result<CreateOutcome, ChapterError> {
        let mut tx = self.begin_write().await?;

        let taken: Option<(i64,)> =
            sqlx::query_as("SELECT chap_id FROM chapters WHERE chapter_name = ?")
                .bind(&chapter.chapter_name)
                .fetch_optional(&mut *tx)
                .await?;
        if taken.is_some() {
            return Ok(CreateOutcome::NameTaken);
        }

        let result = sqlx::query(
            "INSERT INTO chapters (course_type, chapter_name, chapter_image_url) VALUES (?, ?, ?)",
        )
        .bind(&chapter.course_type)
        .bind(&chapter.chapter_name)
        .bind(&chapter.chapter_image_url)
        .execute(&mut *tx)
        .await
        .map_err(ChapterError::from_write)?;

        if result.rows_affected() != 1 {
            return Ok(CreateOutcome::NotInserted);
        }
        tx.commit().await?;
        Ok(CreateOutcome::Created(result.last_insert_rowid()))
    }

    /// Lookup and update in one transaction. Absent fields keep their stored values.
    pub async fn update(
        &self,
        chap_id: i64,
        changes: ChapterChanges,
    ) -> Result<UpdateOutcome, ChapterError> {
        let mut tx = self.begin_write().await?;

        let Some(previous) = Self::find(&mut tx, chap_id).await? else {
            return Ok(UpdateOutcome::Missing);
        };
        let current = changes.apply_to(&previous);

        let result = sqlx::query(
            r#"UPDATE chapters SET
                course_type = ?,
                chapter_name = ?,
                chapter_image_url = ?
              WHERE chap_id = ?"#,
        )
        .bind(&current.course_type)
        .bind(&current.chapter_name)
        .bind(&current.chapter_image_url)
        .bind(chap_id)
        .execute(&mut *tx)
        .await
        .map_err(ChapterError::from_write)?;

        if result.rows_affected() != 1 {
            return Ok(UpdateOutcome::NotUpdated);
        }
        tx.commit().await?;
        Ok(UpdateOutcome::Updated { previous, current })
    }

    /// Delete by id, returning the removed row if there was one.
    pub async fn delete(&self, chap_id: i64) -> Result<Option<Chapter>, ChapterError> {
        let mut tx = self.begin_write().await?;
        let existing = Self::find(&mut tx, chap_id).await?;
        sqlx::query("DELETE FROM chapters WHERE chap_id = ?")
            .bind(chap_id)
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;
        Ok(existing)
    }

    pub async fn get_by_id(&self, chap_id: i64) -> Result<Option<Chapter>, ChapterError> {
        let mut conn = self.pool.acquire().await?;
        Self::find(&mut conn, chap_id).await
    }

    /// All chapters whose `course_type` is one of `course_types`, by id.
    pub async fn list_by_course_types(
        &self,
        course_types: &[&str],
    ) -> Result<Vec<Chapter>, ChapterError> {
        if course_types.is_empty() {
            return Ok(Vec::new());
        }
        let placeholders = vec!["?"; course_types.len()].join(", ");
        let sql = format!("{SELECT_CHAPTER} WHERE course_type IN ({placeholders}) ORDER BY chap_id");
        let mut query = sqlx::query_as::<_, Chapter>(&sql);
        for course_type in course_types {
            query = query.bind(*course_type);
        }
        Ok(query.fetch_all(&self.pool).await?)
    }

    async fn find(
        conn: &mut SqliteConnection,
        chap_id: i64,
    ) -> Result<Option<Chapter>, ChapterError> {
        let chapter = sqlx::query_as::<_, Chapter>(&format!("{SELECT_CHAPTER} WHERE chap_id = ?"))
            .bind(chap_id)
            .fetch_optional(conn)
            .await?;
        Ok(chapter)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    async fn storage() -> (TempDir, ChapterStorage) {
        let dir = tempfile::tempdir().unwrap();
        let url = format!("sqlite:{}", dir.path().join("chapters.db").display());
        let storage = ChapterStorage::new(connect(&url).await.unwrap());
        storage.init_schema().await.unwrap();
        (dir, storage)
    }

    fn new_chapter(name: &str, course: &str) -> NewChapter {
        NewChapter {
            course_type: Some(course.to_string()),
            chapter_name: name.to_string(),
            chapter_image_url: String::new(),
        }
    }

    #[tokio::test]
    async fn create_rejects_duplicate_names() {
        let (_dir, storage) = storage().await;
        let first = storage.create(&new_chapter("Intro", "OS")).await.unwrap();
        assert!(matches!(first, CreateOutcome::Created(_)));
        let second = storage.create(&new_chapter("Intro", "AS")).await.unwrap();
        assert_eq!(second, CreateOutcome::NameTaken);
    }

    #[tokio::test]
    async fn unique_constraint_backs_renames() {
        let (_dir, storage) = storage().await;
        storage.create(&new_chapter("Intro", "OS")).await.unwrap();
        let CreateOutcome::Created(id) = storage.create(&new_chapter("Basics", "OS")).await.unwrap()
        else {
            panic!("second chapter not created");
        };
        let changes = ChapterChanges {
            chapter_name: Some("Intro".into()),
            ..Default::default()
        };
        let err = storage.update(id, changes).await.unwrap_err();
        assert!(matches!(err, ChapterError::Conflict(_)));
    }

    #[tokio::test]
    async fn update_reports_missing_rows() {
        let (_dir, storage) = storage().await;
        let outcome = storage.update(42, ChapterChanges::default()).await.unwrap();
        assert_eq!(outcome, UpdateOutcome::Missing);
    }

    #[tokio::test]
    async fn delete_returns_removed_row() {
        let (_dir, storage) = storage().await;
        let CreateOutcome::Created(id) = storage.create(&new_chapter("Intro", "OS")).await.unwrap()
        else {
            panic!("chapter not created");
        };
        let removed = storage.delete(id).await.unwrap();
        assert_eq!(removed.map(|c| c.chapter_name), Some("Intro".to_string()));
        assert_eq!(storage.get_by_id(id).await.unwrap(), None);
        assert_eq!(storage.delete(id).await.unwrap(), None);
    }

    #[tokio::test]
    async fn list_filters_by_course_type() {
        let (_dir, storage) = storage().await;
        storage.create(&new_chapter("A", "OS")).await.unwrap();
        storage.create(&new_chapter("B", "AS")).await.unwrap();
        storage.create(&new_chapter("C", "XX")).await.unwrap();

        let both = storage.list_by_course_types(&["OS", "AS"]).await.unwrap();
        let names: Vec<_> = both.iter().map(|c| c.chapter_name.as_str()).collect();
        assert_eq!(names, ["A", "B"]);

        let only = storage.list_by_course_types(&["XX"]).await.unwrap();
        assert_eq!(only.len(), 1);
        assert!(storage.list_by_course_types(&[]).await.unwrap().is_empty());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 8)]
    async fn concurrent_creates_with_distinct_names_all_succeed() {
        let (_dir, storage) = storage().await;
        let handles: Vec<_> = (0..40)
            .map(|i| {
                let storage = storage.clone();
                tokio::spawn(async move {
                    storage
                        .create(&new_chapter(&format!("Chapter {i}"), "OS"))
                        .await
                })
            })
            .collect();
        for handle in handles {
            let outcome = handle.await.unwrap().unwrap();
            assert!(matches!(outcome, CreateOutcome::Created(_)));
        }
        let all = storage.list_by_course_types(&["OS"]).await.unwrap();
        assert_eq!(all.len(), 40);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 8)]
    async fn concurrent_creates_with_one_name_yield_a_single_row() {
        let (_dir, storage) = storage().await;
        let handles: Vec<_> = (0..20)
            .map(|_| {
                let storage = storage.clone();
                tokio::spawn(async move { storage.create(&new_chapter("Intro", "OS")).await })
            })
            .collect();
        let mut created = 0;
        for handle in handles {
            match handle.await.unwrap() {
                Ok(CreateOutcome::Created(_)) => created += 1,
                Ok(CreateOutcome::NameTaken) | Err(ChapterError::Conflict(_)) => {}
                other => panic!("unexpected outcome: {other:?}"),
            }
        }
        assert_eq!(created, 1);
        assert_eq!(storage.list_by_course_types(&["OS"]).await.unwrap().len(), 1);
    }
}
