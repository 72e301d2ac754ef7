//! Streaming row cursor.
//!
//! [`RowSeq`] wraps a driver fetch stream as an explicit single-pass
//! cursor: `next` yields rows, `close` releases the cursor, `err` reports
//! the first failure. After an error or a close, iteration yields
//! nothing; closing twice is a no-op. At most one cursor is open per
//! sequence.

use futures_util::stream::BoxStream;
use futures_util::TryStreamExt;
use sqlx::sqlite::{SqliteConnection, SqliteRow};

/// A finite, single-pass row sequence backed by a database cursor.
pub struct RowSeq<'a> {
    stream: Option<BoxStream<'a, Result<SqliteRow, sqlx::Error>>>,
    err: Option<sqlx::Error>,
}

impl<'a> RowSeq<'a> {
    /// Wraps an existing fetch stream.
    #[must_use]
    pub fn new(stream: BoxStream<'a, Result<SqliteRow, sqlx::Error>>) -> Self {
        Self {
            stream: Some(stream),
            err: None,
        }
    }

    /// Starts a query on the given connection.
    #[must_use]
    pub fn fetch(conn: &'a mut SqliteConnection, sql: &'a str) -> Self {
        Self::new(sqlx::query(sql).fetch(conn))
    }

    /// Returns the next row, or `None` on exhaustion, error, or after
    /// close. The cursor is released as soon as the sequence ends.
    pub async fn next(&mut self) -> Option<SqliteRow> {
        let stream = self.stream.as_mut()?;
        match stream.try_next().await {
            Ok(Some(row)) => Some(row),
            Ok(None) => {
                self.stream = None;
                None
            }
            Err(err) => {
                self.err = Some(err);
                self.stream = None;
                None
            }
        }
    }

    /// Releases the cursor early. Idempotent.
    pub fn close(&mut self) {
        self.stream = None;
    }

    /// The first error encountered, if any.
    #[must_use]
    pub fn err(&self) -> Option<&sqlx::Error> {
        self.err.as_ref()
    }

    /// Consumes the sequence, surfacing the first error.
    ///
    /// # Errors
    ///
    /// Returns the error that terminated iteration, if one occurred.
    pub fn finish(self) -> Result<(), sqlx::Error> {
        match self.err {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }
}
