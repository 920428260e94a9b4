//! SQLite persistence for the runner.
//!
//! RULE: Only store.rs talks to the database. The core library never
//! persists; the runner hands finished snapshots and events here.

use anyhow::{Context, Result};
use canton_core::{event::TurnEvent, snapshot::EconomySnapshot, types::Turn};
use rusqlite::{params, Connection, OptionalExtension};

pub struct SnapshotStore {
    conn: Connection,
}

impl SnapshotStore {
    /// Open (or create) the database at `path`.
    pub fn open(path: &str) -> Result<Self> {
        let conn = Connection::open(path).with_context(|| format!("opening {path}"))?;
        conn.execute_batch("PRAGMA journal_mode=WAL;")?;
        conn.execute_batch("PRAGMA foreign_keys=ON;")?;
        Ok(Self { conn })
    }

    pub fn in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch("PRAGMA foreign_keys=ON;")?;
        Ok(Self { conn })
    }

    pub fn migrate(&self) -> Result<()> {
        self.conn
            .execute_batch(include_str!("../migrations/001_turns.sql"))?;
        Ok(())
    }

    pub fn insert_game(&self, game_id: &str, seed: u64, version: &str, nation_id: &str) -> Result<()> {
        self.conn.execute(
            "INSERT OR REPLACE INTO game (game_id, seed, version, nation_id) VALUES (?1, ?2, ?3, ?4)",
            params![game_id, seed as i64, version, nation_id],
        )?;
        Ok(())
    }

    // ── Snapshots ──────────────────────────────────────────────

    pub fn save_snapshot(&self, game_id: &str, snapshot: &EconomySnapshot) -> Result<()> {
        let json = snapshot.to_json()?;
        self.conn.execute(
            "INSERT OR REPLACE INTO turn_snapshot (game_id, turn, state_json) VALUES (?1, ?2, ?3)",
            params![game_id, snapshot.turn as i64, json],
        )?;
        Ok(())
    }

    pub fn latest_snapshot(&self, game_id: &str) -> Result<Option<EconomySnapshot>> {
        let json: Option<String> = self
            .conn
            .query_row(
                "SELECT state_json FROM turn_snapshot WHERE game_id = ?1 ORDER BY turn DESC LIMIT 1",
                params![game_id],
                |row| row.get(0),
            )
            .optional()?;
        json.map(|j| EconomySnapshot::from_json(&j).map_err(Into::into))
            .transpose()
    }

    pub fn snapshot_count(&self, game_id: &str) -> Result<i64> {
        Ok(self.conn.query_row(
            "SELECT COUNT(*) FROM turn_snapshot WHERE game_id = ?1",
            params![game_id],
            |row| row.get(0),
        )?)
    }

    // ── Events ─────────────────────────────────────────────────

    pub fn append_events(&self, game_id: &str, turn: Turn, events: &[TurnEvent]) -> Result<()> {
        let mut stmt = self.conn.prepare(
            "INSERT INTO turn_event (game_id, turn, event_type, payload) VALUES (?1, ?2, ?3, ?4)",
        )?;
        for event in events {
            stmt.execute(params![
                game_id,
                turn as i64,
                event.type_name(),
                serde_json::to_string(event)?,
            ])?;
        }
        Ok(())
    }

    pub fn event_counts(&self, game_id: &str) -> Result<Vec<(String, i64)>> {
        let mut stmt = self.conn.prepare(
            "SELECT event_type, COUNT(*) FROM turn_event WHERE game_id = ?1
             GROUP BY event_type ORDER BY event_type",
        )?;
        let rows = stmt
            .query_map(params![game_id], |row| Ok((row.get(0)?, row.get(1)?)))?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
    }
}
