use crate::config::Config;
use crate::error::{CatalogError, Result};
use crate::model::*;
use chrono::NaiveDate;
use libsql::{Builder, Connection, Database as LibsqlDatabase};
use std::path::Path;

pub const IN_MEMORY: &str = ":memory:";

const SYSTEM_MIGRATIONS: &[(&str, &str)] =
    &[("system/000_migrations_table.sql", include_str!("migrations/system/000_migrations_table.sql"))];

const MIGRATIONS: &[(&str, &str)] = &[("001_schema.sql", include_str!("migrations/001_schema.sql"))];

const AUTHOR_COLUMNS: &str = "id, name, birth_date, death_date";
const BOOK_COLUMNS: &str = "id, author_id, title, publication_year, isbn";

pub struct Database {
    // Keeps the underlying database alive for as long as the connection is used.
    _db: LibsqlDatabase,
    conn: Connection,
}

impl Database {
    async fn is_migration_applied(conn: &Connection, name: &str) -> Result<bool> {
        let query = "SELECT 1 FROM _migrations WHERE name = ?";
        match conn.query(query, libsql::params![name]).await {
            Ok(mut rows) => Ok(rows.next().await?.is_some()),
            Err(e) => {
                if e.to_string().contains("no such table") {
                    Ok(false)
                } else {
                    Err(e.into())
                }
            }
        }
    }

    async fn record_migration(conn: &Connection, name: &str) -> Result<()> {
        let query = r#"
            INSERT INTO _migrations (name, applied_at)
            VALUES (?, strftime('%Y-%m-%dT%H:%M:%fZ', 'now'))
        "#;
        match conn.execute(query, libsql::params![name]).await {
            Ok(_) => Ok(()),
            Err(e) => {
                if e.to_string().contains("no such table") {
                    Ok(())
                } else {
                    Err(e.into())
                }
            }
        }
    }

    async fn run_migration(conn: &Connection, name: &str, sql: &str) -> Result<()> {
        if Self::is_migration_applied(conn, name).await? {
            tracing::debug!("migration {} already applied, skipping", name);
            return Ok(());
        }

        tracing::info!("applying migration: {}", name);
        conn.execute_batch(sql)
            .await
            .map_err(|e| anyhow::anyhow!("failed to execute migration {name}: {e}"))?;

        Self::record_migration(conn, name).await?;
        Ok(())
    }

    /// Opens the database named in the config. Relative paths resolve against `data_dir`.
    pub async fn new(cfg: &Config, data_dir: &Path) -> Result<Self> {
        let database = cfg.app.get_db();
        let path = if database == IN_MEMORY {
            Path::new(IN_MEMORY).to_path_buf()
        } else {
            data_dir.join(database)
        };

        tracing::info!(path = ?path, "[db] opening local database");
        Self::open(&path, cfg.app.enforce_foreign_keys).await
    }

    pub async fn open(path: &Path, enforce_foreign_keys: bool) -> Result<Self> {
        let db = Builder::new_local(path).build().await?;
        let conn = db.connect()?;
        conn.query("SELECT 1", ()).await?;

        if enforce_foreign_keys {
            conn.execute("PRAGMA foreign_keys = ON", ()).await?;
        } else {
            tracing::warn!("[db] foreign key enforcement disabled, orphaned books will be accepted");
            conn.execute("PRAGMA foreign_keys = OFF", ()).await?;
        }

        for (filename, sql) in SYSTEM_MIGRATIONS {
            Self::run_migration(&conn, filename, sql).await?;
        }

        for (filename, sql) in MIGRATIONS {
            Self::run_migration(&conn, filename, sql).await?;
        }

        Ok(Database {
            _db: db,
            conn,
        })
    }

    fn parse_date(raw: Option<String>) -> Result<Option<NaiveDate>> {
        raw.filter(|s| !s.is_empty())
            .map(|s| {
                NaiveDate::parse_from_str(&s, DATE_FORMAT)
                    .map_err(|e| CatalogError::from(anyhow::anyhow!("invalid date {s:?} in author row: {e}")))
            })
            .transpose()
    }

    fn row_to_author(row: &libsql::Row) -> Result<Author> {
        Ok(Author {
            id: row.get(0)?,
            name: row.get(1)?,
            birth_date: Self::parse_date(row.get::<Option<String>>(2)?)?,
            death_date: Self::parse_date(row.get::<Option<String>>(3)?)?,
        })
    }

    fn row_to_book(row: &libsql::Row) -> Result<Book> {
        Ok(Book {
            id: row.get(0)?,
            author_id: row.get(1)?,
            title: row.get(2)?,
            publication_year: row.get::<Option<i32>>(3)?,
            isbn: row.get::<Option<i64>>(4)?,
        })
    }

    fn date_param(date: &Option<NaiveDate>) -> Option<String> {
        date.map(|d| d.format(DATE_FORMAT).to_string())
    }

    pub async fn create_author(&self, input: &NewAuthor) -> Result<Author> {
        let query = format!(
            "INSERT INTO author (name, birth_date, death_date) VALUES (?, ?, ?) RETURNING {AUTHOR_COLUMNS}"
        );

        let mut rows = self
            .conn
            .query(
                &query,
                libsql::params![
                    input.name.as_str(),
                    Self::date_param(&input.birth_date),
                    Self::date_param(&input.death_date)
                ],
            )
            .await?;

        if let Some(row) = rows.next().await? {
            Self::row_to_author(&row)
        } else {
            Err(anyhow::anyhow!("Failed to create author").into())
        }
    }

    pub async fn create_book(&self, input: &NewBook) -> Result<Book> {
        let query = format!(
            "INSERT INTO book (author_id, title, publication_year, isbn) VALUES (?, ?, ?, ?) RETURNING {BOOK_COLUMNS}"
        );

        let mut rows = self
            .conn
            .query(
                &query,
                libsql::params![input.author_id, input.title.as_str(), input.publication_year, input.isbn],
            )
            .await?;

        if let Some(row) = rows.next().await? {
            Self::row_to_book(&row)
        } else {
            Err(anyhow::anyhow!("Failed to create book").into())
        }
    }

    pub async fn list_authors(&self) -> Result<Vec<Author>> {
        let query = format!("SELECT {AUTHOR_COLUMNS} FROM author ORDER BY id");
        let mut rows = self.conn.query(&query, ()).await?;

        let mut authors = vec![];
        while let Some(row) = rows.next().await? {
            authors.push(Self::row_to_author(&row)?);
        }
        Ok(authors)
    }

    pub async fn get_author(&self, author_id: i64) -> Result<Option<Author>> {
        let query = format!("SELECT {AUTHOR_COLUMNS} FROM author WHERE id = ?");
        let mut rows = self.conn.query(&query, libsql::params![author_id]).await?;

        match rows.next().await? {
            Some(row) => Ok(Some(Self::row_to_author(&row)?)),
            None => Ok(None),
        }
    }

    pub async fn get_book(&self, book_id: i64) -> Result<Option<Book>> {
        let query = format!("SELECT {BOOK_COLUMNS} FROM book WHERE id = ?");
        let mut rows = self.conn.query(&query, libsql::params![book_id]).await?;

        match rows.next().await? {
            Some(row) => Ok(Some(Self::row_to_book(&row)?)),
            None => Ok(None),
        }
    }

    fn escape_like(term: &str) -> String {
        let mut escaped = String::with_capacity(term.len() + 2);
        escaped.push('%');
        for c in term.chars() {
            if matches!(c, '%' | '_' | '\\') {
                escaped.push('\\');
            }
            escaped.push(c);
        }
        escaped.push('%');
        escaped
    }

    fn order_clause(sort_by: SortBy) -> &'static str {
        match sort_by {
            SortBy::Title => "ORDER BY book.title, book.id",
            SortBy::Author => "ORDER BY author.name, book.id",
            SortBy::PublicationYear => "ORDER BY book.publication_year, book.id",
        }
    }

    /// Filters by title substring first, then orders. LIKE matching is ASCII case-insensitive.
    pub async fn list_books(&self, params: &BookQuery) -> Result<Vec<BookListing>> {
        let select = r#"
SELECT
    book.id,
    book.author_id,
    book.title,
    book.publication_year,
    book.isbn,
    author.name
FROM book
LEFT JOIN author ON author.id = book.author_id
"#;
        let order = Self::order_clause(params.sort_by);

        let mut rows = match &params.search {
            Some(search) => {
                let query = format!("{select} WHERE book.title LIKE ? ESCAPE '\\' {order}");
                self.conn
                    .query(&query, libsql::params![Self::escape_like(search)])
                    .await?
            }
            None => {
                let query = format!("{select} {order}");
                self.conn.query(&query, ()).await?
            }
        };

        let mut books = vec![];
        while let Some(row) = rows.next().await? {
            books.push(BookListing {
                book: Self::row_to_book(&row)?,
                author_name: row.get::<Option<String>>(5)?,
            });
        }

        Ok(books)
    }

    pub async fn count_books_by_author(&self, author_id: i64) -> Result<i64> {
        let mut rows = self
            .conn
            .query("SELECT COUNT(*) FROM book WHERE author_id = ?", libsql::params![author_id])
            .await?;

        match rows.next().await? {
            Some(row) => Ok(row.get(0)?),
            None => Ok(0),
        }
    }

    /// Removes a book. Returns `false` when no such book existed.
    pub async fn delete_book(&self, book_id: i64) -> Result<bool> {
        let affected = self
            .conn
            .execute("DELETE FROM book WHERE id = ?", libsql::params![book_id])
            .await?;
        Ok(affected > 0)
    }

    /// Removes an author that has no books. Authors still referenced by a
    /// book are refused with a conflict.
    ///
    /// The book check and the delete are one statement, so no other write on
    /// the shared connection can interleave with them.
    pub async fn delete_author(&self, author_id: i64) -> Result<bool> {
        let query = r#"
            DELETE FROM author
            WHERE id = ?1 AND NOT EXISTS (SELECT 1 FROM book WHERE author_id = ?1)
        "#;
        let affected = self.conn.execute(query, libsql::params![author_id]).await?;
        if affected > 0 {
            return Ok(true);
        }

        let books = self.count_books_by_author(author_id).await?;
        if books > 0 {
            return Err(CatalogError::Conflict(format!(
                "author {} still has {} book(s); delete those first",
                author_id, books
            )));
        }
        Ok(false)
    }
}
