use anyhow::{Context, Result};
use rusqlite::Connection;
use serde::Deserialize;
use tracing::warn;

use crate::pipeline::{IngredientRecord, Status};

const DB_PATH: &str = "data/halal.sqlite";

pub fn connect() -> Result<Connection> {
    if let Some(dir) = std::path::Path::new(DB_PATH).parent() {
        std::fs::create_dir_all(dir)?;
    }
    let conn = Connection::open(DB_PATH)?;
    conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA foreign_keys=ON;")?;
    Ok(conn)
}

pub fn init_schema(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS ingredients (
            name           TEXT PRIMARY KEY,
            canonical_name TEXT NOT NULL,
            status         TEXT NOT NULL CHECK(status IN ('halal','non-halal','doubtful')),
            imported_at    TEXT NOT NULL DEFAULT (datetime('now'))
        );

        CREATE TABLE IF NOT EXISTS scans (
            id               INTEGER PRIMARY KEY,
            source           TEXT NOT NULL,
            raw_text         TEXT NOT NULL,
            verdict          TEXT NOT NULL CHECK(verdict IN ('halal','non-halal','doubtful','empty')),
            ingredient_count INTEGER NOT NULL,
            unknown          TEXT,
            advice           TEXT,
            scanned_at       TEXT NOT NULL
        );
        CREATE INDEX IF NOT EXISTS idx_scans_verdict ON scans(verdict);
        ",
    )?;
    Ok(())
}

// ── Reference dataset ──

#[derive(Debug, Deserialize)]
struct CsvRow {
    ingred_name: String,
    #[serde(default)]
    canonical_name: String,
    halal_non_halal_doubtful: String,
}

/// Parse the reference CSV into records, lowercasing string fields on the way
/// in. Rows with an empty name or an unrecognized status are skipped.
pub fn parse_records<R: std::io::Read>(reader: R) -> Result<Vec<IngredientRecord>> {
    let mut rdr = csv::Reader::from_reader(reader);
    let mut records = Vec::new();

    for (i, row) in rdr.deserialize().enumerate() {
        let row: CsvRow = row.with_context(|| format!("CSV row {}", i + 2))?;
        let name = row.ingred_name.trim().to_lowercase();
        if name.is_empty() {
            continue;
        }
        let Some(status) = Status::parse(&row.halal_non_halal_doubtful) else {
            warn!(
                "row {}: unrecognized status {:?} for {:?}, skipping",
                i + 2,
                row.halal_non_halal_doubtful,
                name
            );
            continue;
        };
        let canonical = row.canonical_name.trim().to_lowercase();
        let canonical_name = if canonical.is_empty() { name.clone() } else { canonical };
        records.push(IngredientRecord {
            name,
            canonical_name,
            status,
        });
    }

    Ok(records)
}

/// Upsert records into the ingredients table. Duplicate names: the later
/// record wins, same policy the in-memory lookup table applies.
pub fn import_records(conn: &Connection, records: &[IngredientRecord]) -> Result<usize> {
    let tx = conn.unchecked_transaction()?;
    {
        let mut stmt = tx.prepare(
            "INSERT INTO ingredients (name, canonical_name, status)
             VALUES (?1, ?2, ?3)
             ON CONFLICT(name) DO UPDATE SET
                 canonical_name = excluded.canonical_name,
                 status = excluded.status",
        )?;
        for r in records {
            stmt.execute(rusqlite::params![r.name, r.canonical_name, r.status.as_str()])?;
        }
    }
    tx.commit()?;

    let count: usize = conn.query_row("SELECT COUNT(*) FROM ingredients", [], |row| row.get(0))?;
    Ok(count)
}

pub fn load_records(conn: &Connection) -> Result<Vec<IngredientRecord>> {
    let mut stmt = conn.prepare("SELECT name, canonical_name, status FROM ingredients")?;
    let rows = stmt.query_map([], |row| {
        Ok((
            row.get::<_, String>(0)?,
            row.get::<_, String>(1)?,
            row.get::<_, String>(2)?,
        ))
    })?;

    let mut records = Vec::new();
    for row in rows {
        let (name, canonical_name, status) = row?;
        let Some(status) = Status::parse(&status) else {
            warn!("stored status {:?} for {:?} no longer parses, skipping", status, name);
            continue;
        };
        records.push(IngredientRecord {
            name,
            canonical_name,
            status,
        });
    }
    Ok(records)
}

// ── Scans ──

/// One persisted analysis.
#[derive(Debug)]
pub struct ScanRow {
    pub source: String,
    pub raw_text: String,
    /// "halal" / "non-halal" / "doubtful", or "empty" when normalization left
    /// no ingredients.
    pub verdict: String,
    pub ingredient_count: usize,
    pub unknown: Vec<String>,
    pub advice: Option<String>,
}

pub fn save_scan(conn: &Connection, row: &ScanRow) -> Result<()> {
    insert_scan(conn, row)
}

pub fn save_scans(conn: &Connection, rows: &[ScanRow]) -> Result<()> {
    let tx = conn.unchecked_transaction()?;
    for row in rows {
        insert_scan(&tx, row)?;
    }
    tx.commit()?;
    Ok(())
}

fn insert_scan(conn: &Connection, row: &ScanRow) -> Result<()> {
    let unknown = if row.unknown.is_empty() {
        None
    } else {
        Some(serde_json::to_string(&row.unknown)?)
    };
    conn.execute(
        "INSERT INTO scans (source, raw_text, verdict, ingredient_count, unknown, advice, scanned_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
        rusqlite::params![
            row.source,
            row.raw_text,
            row.verdict,
            row.ingredient_count as i64,
            unknown,
            row.advice,
            chrono::Utc::now().to_rfc3339(),
        ],
    )?;
    Ok(())
}

// ── Stats ──

pub struct Stats {
    pub ingredients: usize,
    pub halal: usize,
    pub non_halal: usize,
    pub doubtful: usize,
    pub scans: usize,
    pub flagged_scans: usize,
}

pub fn get_stats(conn: &Connection) -> Result<Stats> {
    let count_status = |status: &str| -> Result<usize> {
        Ok(conn.query_row(
            "SELECT COUNT(*) FROM ingredients WHERE status = ?1",
            [status],
            |row| row.get(0),
        )?)
    };

    Ok(Stats {
        ingredients: conn.query_row("SELECT COUNT(*) FROM ingredients", [], |r| r.get(0))?,
        halal: count_status("halal")?,
        non_halal: count_status("non-halal")?,
        doubtful: count_status("doubtful")?,
        scans: conn.query_row("SELECT COUNT(*) FROM scans", [], |r| r.get(0))?,
        flagged_scans: conn.query_row(
            "SELECT COUNT(*) FROM scans WHERE verdict IN ('non-halal','doubtful')",
            [],
            |r| r.get(0),
        )?,
    })
}

// ── Tests ──

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_csv_lowercases_and_fills_canonical() {
        let csv = "ingred_name,canonical_name,halal_non_halal_doubtful\n\
                   Lard,,non-halal\n\
                   Citric Acid,E330,halal\n";
        let records = parse_records(csv.as_bytes()).unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].name, "lard");
        assert_eq!(records[0].canonical_name, "lard");
        assert_eq!(records[0].status, Status::NonHalal);
        assert_eq!(records[1].canonical_name, "e330");
    }

    #[test]
    fn parse_csv_skips_bad_rows() {
        let csv = "ingred_name,canonical_name,halal_non_halal_doubtful\n\
                   ,,halal\n\
                   gelatin,,maybe\n\
                   honey,,halal\n";
        let records = parse_records(csv.as_bytes()).unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].name, "honey");
    }

    #[test]
    fn import_and_reload_round_trip() {
        let conn = Connection::open_in_memory().unwrap();
        init_schema(&conn).unwrap();
        let records = vec![
            IngredientRecord {
                name: "water".into(),
                canonical_name: "water".into(),
                status: Status::Halal,
            },
            IngredientRecord {
                name: "lard".into(),
                canonical_name: "lard".into(),
                status: Status::NonHalal,
            },
        ];
        let count = import_records(&conn, &records).unwrap();
        assert_eq!(count, 2);

        let loaded = load_records(&conn).unwrap();
        assert_eq!(loaded.len(), 2);
        assert!(loaded.iter().any(|r| r.name == "lard" && r.status == Status::NonHalal));
    }

    #[test]
    fn reimport_overwrites_status() {
        let conn = Connection::open_in_memory().unwrap();
        init_schema(&conn).unwrap();
        let first = vec![IngredientRecord {
            name: "gelatin".into(),
            canonical_name: "gelatin".into(),
            status: Status::Halal,
        }];
        let second = vec![IngredientRecord {
            name: "gelatin".into(),
            canonical_name: "gelatin".into(),
            status: Status::Doubtful,
        }];
        import_records(&conn, &first).unwrap();
        import_records(&conn, &second).unwrap();
        let loaded = load_records(&conn).unwrap();
        assert_eq!(loaded.len(), 1);
        assert_eq!(loaded[0].status, Status::Doubtful);
    }

    #[test]
    fn scan_persisted_with_unknown_json() {
        let conn = Connection::open_in_memory().unwrap();
        init_schema(&conn).unwrap();
        save_scan(
            &conn,
            &ScanRow {
                source: "text".into(),
                raw_text: "sugar, xylitol".into(),
                verdict: "doubtful".into(),
                ingredient_count: 2,
                unknown: vec!["xylitol".into()],
                advice: None,
            },
        )
        .unwrap();
        let stats = get_stats(&conn).unwrap();
        assert_eq!(stats.scans, 1);
        assert_eq!(stats.flagged_scans, 1);

        let unknown: String = conn
            .query_row("SELECT unknown FROM scans", [], |r| r.get(0))
            .unwrap();
        assert_eq!(unknown, r#"["xylitol"]"#);
    }
}
