//! Persistent playback progress markers
//!
//! One row per book: the chapter and unit the listener last heard. Written
//! on every index change so an app restart resumes mid-chapter.

use crate::db::DbPool;
use crate::{Error, Result};

/// Where playback last stood in a book
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProgressMarker {
    pub book_id: String,
    pub chapter_index: usize,
    pub unit_index: usize,
}

/// Progress marker repository
pub struct ProgressStore {
    db: DbPool,
}

impl ProgressStore {
    /// Create a store backed by the given pool
    #[must_use]
    pub fn new(db: DbPool) -> Self {
        Self { db }
    }

    /// Load the marker for a book, or `None` if it was never played
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub fn get(&self, book_id: &str) -> Result<Option<ProgressMarker>> {
        let conn = self
            .db
            .get()
            .map_err(|e| Error::Database(e.to_string()))?;
        let result = conn.query_row(
            "SELECT chapter_index, unit_index FROM progress WHERE book_id = ?1",
            rusqlite::params![book_id],
            |row| Ok((row.get::<_, i64>(0)?, row.get::<_, i64>(1)?)),
        );
        match result {
            Ok((chapter, unit)) => Ok(Some(ProgressMarker {
                book_id: book_id.to_string(),
                chapter_index: usize::try_from(chapter).unwrap_or_default(),
                unit_index: usize::try_from(unit).unwrap_or_default(),
            })),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(Error::Database(e.to_string())),
        }
    }

    /// Insert or replace the marker for a book
    ///
    /// # Errors
    ///
    /// Returns an error if the database write fails.
    pub fn set(&self, marker: &ProgressMarker) -> Result<()> {
        let chapter =
            i64::try_from(marker.chapter_index).map_err(|e| Error::Database(e.to_string()))?;
        let unit = i64::try_from(marker.unit_index).map_err(|e| Error::Database(e.to_string()))?;

        let conn = self
            .db
            .get()
            .map_err(|e| Error::Database(e.to_string()))?;
        conn.execute(
            "INSERT INTO progress (book_id, chapter_index, unit_index, updated_at)
             VALUES (?1, ?2, ?3, datetime('now'))
             ON CONFLICT(book_id) DO UPDATE SET
                chapter_index = excluded.chapter_index,
                unit_index = excluded.unit_index,
                updated_at = excluded.updated_at",
            rusqlite::params![marker.book_id, chapter, unit],
        )
        .map_err(|e| Error::Database(e.to_string()))?;
        Ok(())
    }

    /// Remove the marker for a book
    ///
    /// # Errors
    ///
    /// Returns an error if the database write fails.
    pub fn clear(&self, book_id: &str) -> Result<()> {
        let conn = self
            .db
            .get()
            .map_err(|e| Error::Database(e.to_string()))?;
        conn.execute(
            "DELETE FROM progress WHERE book_id = ?1",
            rusqlite::params![book_id],
        )
        .map_err(|e| Error::Database(e.to_string()))?;
        Ok(())
    }
}
