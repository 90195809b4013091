use crate::Database;
use crate::models::{CategoryStatsRow, MessageRow, StatsSummary};
use anyhow::Result;
use rusqlite::{Connection, OptionalExtension, TransactionBehavior};

/// Outcome of a reflection registration attempt.
///
/// `AlreadyRegistered` covers both the pre-check hit and a lost race where
/// another writer inserted the same (message, voter) pair first; the UNIQUE
/// constraint on the ledger is authoritative either way.
#[derive(Debug, PartialEq, Eq)]
pub enum ReflectOutcome {
    Registered(i64),
    AlreadyRegistered,
    NotFound,
}

/// Listing order for message queries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageOrder {
    Recent,
    Popular,
}

impl Database {
    // -- Messages --

    pub fn insert_message(&self, id: &str, text: &str, category: &str, author: &str) -> Result<()> {
        self.with_write(|conn| {
            conn.execute(
                "INSERT INTO messages (id, text, category, author) VALUES (?1, ?2, ?3, ?4)",
                (id, text, category, author),
            )?;
            Ok(())
        })
    }

    pub fn get_message(&self, id: &str) -> Result<Option<MessageRow>> {
        self.with_conn(|conn| query_message(conn, id))
    }

    pub fn get_messages(
        &self,
        limit: u32,
        before: Option<&str>,
        order: MessageOrder,
    ) -> Result<Vec<MessageRow>> {
        self.with_conn(|conn| query_messages(conn, limit, before, order))
    }

    /// Removes a message; its ledger rows go with it (ON DELETE CASCADE).
    /// Returns false if no such message existed.
    pub fn delete_message(&self, id: &str) -> Result<bool> {
        self.with_write(|conn| {
            let n = conn.execute("DELETE FROM messages WHERE id = ?1", [id])?;
            Ok(n > 0)
        })
    }

    // -- Reflections --

    /// Register at most one reflection per (message, voter) pair and keep
    /// the denormalized counter in step with the ledger.
    ///
    /// The existence checks run on the writer connection, then the insert
    /// and counter increment commit as one IMMEDIATE transaction. The
    /// check-then-insert is still racy against other processes on the same
    /// database file; the UNIQUE constraint settles that race.
    pub fn register_reflection(
        &self,
        id: &str,
        message_id: &str,
        voter: &str,
    ) -> Result<ReflectOutcome> {
        self.with_write(|conn| {
            let message_exists: Option<i64> = conn
                .query_row("SELECT 1 FROM messages WHERE id = ?1", [message_id], |r| {
                    r.get(0)
                })
                .optional()?;
            if message_exists.is_none() {
                return Ok(ReflectOutcome::NotFound);
            }

            // Pre-check keeps the common repeat-vote path off the write
            // transaction; it is advisory, not the correctness guarantee.
            let existing: Option<String> = conn
                .query_row(
                    "SELECT id FROM reflections WHERE message_id = ?1 AND voter = ?2",
                    (message_id, voter),
                    |r| r.get(0),
                )
                .optional()?;
            if existing.is_some() {
                return Ok(ReflectOutcome::AlreadyRegistered);
            }

            insert_reflection(conn, id, message_id, voter)
        })
    }

    /// Ledger count for one message, the ground truth the denormalized
    /// counter must agree with.
    pub fn count_reflections(&self, message_id: &str) -> Result<i64> {
        self.with_conn(|conn| {
            let count = conn.query_row(
                "SELECT COUNT(*) FROM reflections WHERE message_id = ?1",
                [message_id],
                |r| r.get(0),
            )?;
            Ok(count)
        })
    }

    // -- Stats --

    pub fn stats(&self) -> Result<StatsSummary> {
        self.with_conn(|conn| {
            let messages: i64 = conn.query_row("SELECT COUNT(*) FROM messages", [], |r| r.get(0))?;
            let reflections: i64 =
                conn.query_row("SELECT COUNT(*) FROM reflections", [], |r| r.get(0))?;

            let mut stmt = conn.prepare(
                "SELECT category, COUNT(*), SUM(reflection_count)
                 FROM messages
                 GROUP BY category
                 ORDER BY COUNT(*) DESC, category ASC",
            )?;
            let categories = stmt
                .query_map([], |row| {
                    Ok(CategoryStatsRow {
                        category: row.get(0)?,
                        messages: row.get(1)?,
                        reflections: row.get(2)?,
                    })
                })?
                .collect::<std::result::Result<Vec<_>, _>>()?;

            Ok(StatsSummary {
                messages,
                reflections,
                categories,
            })
        })
    }
}

/// Insert the ledger row and bump the counter in one transaction. A UNIQUE
/// violation on the ledger means a concurrent identical request committed
/// between the pre-check and here: roll back and report AlreadyRegistered.
/// Every other SQLite error propagates as a storage failure.
fn insert_reflection(
    conn: &mut Connection,
    id: &str,
    message_id: &str,
    voter: &str,
) -> Result<ReflectOutcome> {
    let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

    match tx.execute(
        "INSERT INTO reflections (id, message_id, voter) VALUES (?1, ?2, ?3)",
        (id, message_id, voter),
    ) {
        Ok(_) => {}
        Err(e) if is_unique_violation(&e) => return Ok(ReflectOutcome::AlreadyRegistered),
        Err(e) => return Err(e.into()),
    }

    tx.execute(
        "UPDATE messages SET reflection_count = reflection_count + 1 WHERE id = ?1",
        [message_id],
    )?;

    let count: i64 = tx.query_row(
        "SELECT reflection_count FROM messages WHERE id = ?1",
        [message_id],
        |r| r.get(0),
    )?;

    tx.commit()?;
    Ok(ReflectOutcome::Registered(count))
}

fn is_unique_violation(err: &rusqlite::Error) -> bool {
    matches!(
        err,
        rusqlite::Error::SqliteFailure(e, _)
            if e.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE
    )
}

fn query_message(conn: &Connection, id: &str) -> Result<Option<MessageRow>> {
    let mut stmt = conn.prepare(
        "SELECT id, text, category, author, reflection_count, created_at
         FROM messages WHERE id = ?1",
    )?;

    let row = stmt
        .query_row([id], |row| {
            Ok(MessageRow {
                id: row.get(0)?,
                text: row.get(1)?,
                category: row.get(2)?,
                author: row.get(3)?,
                reflection_count: row.get(4)?,
                created_at: row.get(5)?,
            })
        })
        .optional()?;

    Ok(row)
}

fn query_messages(
    conn: &Connection,
    limit: u32,
    before: Option<&str>,
    order: MessageOrder,
) -> Result<Vec<MessageRow>> {
    let order_clause = match order {
        MessageOrder::Recent => "ORDER BY created_at DESC",
        MessageOrder::Popular => "ORDER BY reflection_count DESC, created_at DESC",
    };

    // datetime() normalizes the cursor, so both the stored format and the
    // RFC 3339 form clients echo back compare correctly.
    let sql = match before {
        Some(_) => format!(
            "SELECT id, text, category, author, reflection_count, created_at
             FROM messages WHERE created_at < datetime(?1) {} LIMIT ?2",
            order_clause
        ),
        None => format!(
            "SELECT id, text, category, author, reflection_count, created_at
             FROM messages {} LIMIT ?1",
            order_clause
        ),
    };

    let mut stmt = conn.prepare(&sql)?;
    let map_row = |row: &rusqlite::Row<'_>| {
        Ok(MessageRow {
            id: row.get(0)?,
            text: row.get(1)?,
            category: row.get(2)?,
            author: row.get(3)?,
            reflection_count: row.get(4)?,
            created_at: row.get(5)?,
        })
    };

    let rows = match before {
        Some(cursor) => stmt
            .query_map((cursor, limit), map_row)?
            .collect::<std::result::Result<Vec<_>, _>>()?,
        None => stmt
            .query_map([limit], map_row)?
            .collect::<std::result::Result<Vec<_>, _>>()?,
    };

    Ok(rows)
}
