use std::collections::BTreeSet;
use std::path::Path;

use rusqlite::{Connection, OptionalExtension, Row, params};
use uuid::Uuid;

use dream_core::{
    AggregateStore, AxisScore, AxisSum, CasOutcome, ClassifiedDream, DreamRecord, Quadrant,
    QuadrantCounts, QuadrantTally, SymbolParams, UserAggregate,
};

use crate::error::{Result, StoreError};
use crate::schema;

const AGGREGATE_COLUMNS: &str = "version, dream_count,
    upper_dynamic_count, upper_dynamic_last, upper_static_count, upper_static_last,
    downer_dynamic_count, downer_dynamic_last, downer_static_count, downer_static_last,
    valence_sum, energy_sum, confidence_sum,
    complexity, palette_bias, symmetry_factor, dominant_quadrant";

const DREAM_COLUMNS: &str =
    "id, user_id, sequence, text, valence, energy, quadrant, confidence, keywords, created_at";

/// One SQLite connection. Cheap to open; adapters open one per operation so
/// that concurrent writers only meet at the row-level version check.
pub struct Store {
    conn: Connection,
}

impl Store {
    pub fn open(path: &Path) -> Result<Self> {
        let conn = Connection::open(path)?;
        schema::initialize(&conn)?;
        Ok(Self { conn })
    }

    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        schema::initialize(&conn)?;
        Ok(Self { conn })
    }

    /// Run `read` inside one read transaction so every statement it issues
    /// sees the same snapshot, even while other connections commit.
    pub fn read_snapshot<T, E>(
        &self,
        read: impl FnOnce() -> std::result::Result<T, E>,
    ) -> std::result::Result<T, E>
    where
        E: From<StoreError>,
    {
        let tx = self
            .conn
            .unchecked_transaction()
            .map_err(StoreError::from)?;
        let out = read()?;
        tx.commit().map_err(StoreError::from)?;
        Ok(out)
    }

    pub fn schema_version(&self) -> Result<Option<i64>> {
        schema::get_schema_version(&self.conn)
    }

    // --- Aggregates ---

    pub fn load_aggregate(&self, user_id: &str) -> Result<Option<UserAggregate>> {
        let sql = format!("SELECT {AGGREGATE_COLUMNS} FROM aggregates WHERE user_id = ?1");
        let raw = self
            .conn
            .query_row(&sql, [user_id], RawAggregate::from_row)
            .optional()?;
        raw.map(RawAggregate::into_aggregate).transpose()
    }

    /// Write the aggregate if the stored version is still `expected_version`
    /// and, when given, insert the history record in the same transaction.
    pub fn commit(
        &self,
        user_id: &str,
        expected_version: u64,
        aggregate: &UserAggregate,
        record: Option<&DreamRecord>,
    ) -> Result<CasOutcome> {
        let tx = self.conn.unchecked_transaction()?;
        if write_aggregate(&tx, user_id, expected_version, aggregate)? == CasOutcome::Conflict {
            tracing::debug!(user_id, expected_version, "aggregate version moved, conflict");
            return Ok(CasOutcome::Conflict);
        }
        if let Some(record) = record {
            insert_dream(&tx, record)?;
        }
        tx.commit()?;
        tracing::debug!(user_id, version = aggregate.version, "aggregate stored");
        Ok(CasOutcome::Stored)
    }

    /// Every user with a stored aggregate, sorted.
    pub fn users(&self) -> Result<Vec<String>> {
        let mut stmt = self
            .conn
            .prepare("SELECT user_id FROM aggregates ORDER BY user_id")?;
        let users = stmt
            .query_map([], |row| row.get(0))?
            .collect::<std::result::Result<_, _>>()?;
        Ok(users)
    }

    // --- Dream history ---

    pub fn get_dream(&self, id: Uuid) -> Result<Option<DreamRecord>> {
        let sql = format!("SELECT {DREAM_COLUMNS} FROM dreams WHERE id = ?1");
        let raw = self
            .conn
            .query_row(&sql, [id.to_string()], RawDream::from_row)
            .optional()?;
        raw.map(RawDream::into_record).transpose()
    }

    /// A user's dreams, oldest first. `limit` keeps only the most recent ones.
    pub fn user_dreams(&self, user_id: &str, limit: Option<usize>) -> Result<Vec<DreamRecord>> {
        let limit = limit.map_or(-1, |n| i64::try_from(n).unwrap_or(i64::MAX));
        let sql = format!(
            "SELECT * FROM (
                 SELECT {DREAM_COLUMNS} FROM dreams WHERE user_id = ?1
                 ORDER BY sequence DESC LIMIT ?2
             ) ORDER BY sequence ASC"
        );
        let mut stmt = self.conn.prepare(&sql)?;
        stmt.query_map(params![user_id, limit], RawDream::from_row)?
            .map(|r| r?.into_record())
            .collect()
    }

    pub fn latest_dream(&self, user_id: &str) -> Result<Option<DreamRecord>> {
        Ok(self.user_dreams(user_id, Some(1))?.pop())
    }

    pub fn dream_count(&self) -> Result<u64> {
        let n: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM dreams", [], |row| row.get(0))?;
        from_sql_int("dream count", n)
    }
}

impl AggregateStore for Store {
    type Error = StoreError;

    fn load(&self, user_id: &str) -> Result<Option<UserAggregate>> {
        self.load_aggregate(user_id)
    }

    fn compare_and_store(
        &self,
        user_id: &str,
        expected_version: u64,
        aggregate: &UserAggregate,
    ) -> Result<CasOutcome> {
        self.commit(user_id, expected_version, aggregate, None)
    }

    fn commit_submission(
        &self,
        user_id: &str,
        expected_version: u64,
        aggregate: &UserAggregate,
        record: &DreamRecord,
    ) -> Result<CasOutcome> {
        self.commit(user_id, expected_version, aggregate, Some(record))
    }
}

fn write_aggregate(
    conn: &Connection,
    user_id: &str,
    expected_version: u64,
    agg: &UserAggregate,
) -> Result<CasOutcome> {
    let [ud, us, dd, ds] = Quadrant::ALL.map(|q| agg.quadrant_counts.tally(q));
    let mut ints = [0i64; 11];
    let raw = [
        agg.version,
        agg.dream_count,
        ud.count,
        ud.last_seen,
        us.count,
        us.last_seen,
        dd.count,
        dd.last_seen,
        ds.count,
        ds.last_seen,
        expected_version,
    ];
    for (slot, n) in ints.iter_mut().zip(raw) {
        *slot = to_sql_int(n)?;
    }
    let p = &agg.symbol_params;
    let quadrant = p.dominant_quadrant.as_str();
    let values = params![
        user_id,
        ints[0],
        ints[1],
        ints[2],
        ints[3],
        ints[4],
        ints[5],
        ints[6],
        ints[7],
        ints[8],
        ints[9],
        agg.running_axis_sum.valence,
        agg.running_axis_sum.energy,
        agg.confidence_sum,
        p.complexity,
        p.palette_bias,
        p.symmetry_factor,
        quadrant,
        ints[10],
    ];

    let changed = if expected_version == 0 {
        // An existing row means another writer got there first.
        conn.execute(
            "INSERT OR IGNORE INTO aggregates (user_id, version, dream_count,
                 upper_dynamic_count, upper_dynamic_last, upper_static_count, upper_static_last,
                 downer_dynamic_count, downer_dynamic_last, downer_static_count, downer_static_last,
                 valence_sum, energy_sum, confidence_sum,
                 complexity, palette_bias, symmetry_factor, dominant_quadrant)
             SELECT ?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16, ?17, ?18
             WHERE ?19 = 0",
            values,
        )?
    } else {
        conn.execute(
            "UPDATE aggregates SET version = ?2, dream_count = ?3,
                 upper_dynamic_count = ?4, upper_dynamic_last = ?5,
                 upper_static_count = ?6, upper_static_last = ?7,
                 downer_dynamic_count = ?8, downer_dynamic_last = ?9,
                 downer_static_count = ?10, downer_static_last = ?11,
                 valence_sum = ?12, energy_sum = ?13, confidence_sum = ?14,
                 complexity = ?15, palette_bias = ?16, symmetry_factor = ?17,
                 dominant_quadrant = ?18, updated_at = datetime('now')
             WHERE user_id = ?1 AND version = ?19",
            values,
        )?
    };

    Ok(if changed == 1 {
        CasOutcome::Stored
    } else {
        CasOutcome::Conflict
    })
}

fn insert_dream(conn: &Connection, record: &DreamRecord) -> Result<()> {
    let c = &record.classified;
    let keywords = serde_json::to_string(&c.matched_keywords)
        .map_err(|e| StoreError::InvalidData(format!("keywords: {e}")))?;
    conn.execute(
        "INSERT INTO dreams (id, user_id, sequence, text, valence, energy, quadrant, confidence, keywords)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
        params![
            record.id.to_string(),
            record.user_id,
            to_sql_int(record.sequence)?,
            record.text,
            c.axis_score.valence,
            c.axis_score.energy,
            c.quadrant.as_str(),
            c.confidence,
            keywords,
        ],
    )?;
    Ok(())
}

struct RawAggregate {
    ints: [i64; 10],
    valence_sum: f64,
    energy_sum: f64,
    confidence_sum: f64,
    complexity: u32,
    palette_bias: f64,
    symmetry_factor: f64,
    dominant_quadrant: String,
}

impl RawAggregate {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        let mut ints = [0i64; 10];
        for (i, slot) in ints.iter_mut().enumerate() {
            *slot = row.get(i)?;
        }
        Ok(Self {
            ints,
            valence_sum: row.get(10)?,
            energy_sum: row.get(11)?,
            confidence_sum: row.get(12)?,
            complexity: row.get(13)?,
            palette_bias: row.get(14)?,
            symmetry_factor: row.get(15)?,
            dominant_quadrant: row.get(16)?,
        })
    }

    fn into_aggregate(self) -> Result<UserAggregate> {
        let mut ints = [0u64; 10];
        for (slot, raw) in ints.iter_mut().zip(self.ints) {
            *slot = from_sql_int("aggregate column", raw)?;
        }
        let [version, dream_count, udc, udl, usc, usl, ddc, ddl, dsc, dsl] = ints;
        let tally = |count, last_seen| QuadrantTally { count, last_seen };
        Ok(UserAggregate {
            version,
            dream_count,
            quadrant_counts: QuadrantCounts::from_tallies([
                tally(udc, udl),
                tally(usc, usl),
                tally(ddc, ddl),
                tally(dsc, dsl),
            ]),
            running_axis_sum: AxisSum {
                valence: self.valence_sum,
                energy: self.energy_sum,
            },
            confidence_sum: self.confidence_sum,
            symbol_params: SymbolParams {
                complexity: self.complexity,
                palette_bias: self.palette_bias,
                symmetry_factor: self.symmetry_factor,
                dominant_quadrant: parse_quadrant(&self.dominant_quadrant)?,
            },
        })
    }
}

struct RawDream {
    id: String,
    user_id: String,
    sequence: i64,
    text: String,
    valence: f64,
    energy: f64,
    quadrant: String,
    confidence: f64,
    keywords: String,
    created_at: String,
}

impl RawDream {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            user_id: row.get(1)?,
            sequence: row.get(2)?,
            text: row.get(3)?,
            valence: row.get(4)?,
            energy: row.get(5)?,
            quadrant: row.get(6)?,
            confidence: row.get(7)?,
            keywords: row.get(8)?,
            created_at: row.get(9)?,
        })
    }

    fn into_record(self) -> Result<DreamRecord> {
        let matched_keywords: BTreeSet<String> = serde_json::from_str(&self.keywords)
            .map_err(|e| StoreError::InvalidData(format!("keywords of dream {}: {e}", self.id)))?;
        Ok(DreamRecord {
            id: parse_uuid(&self.id)?,
            user_id: self.user_id,
            text: self.text,
            sequence: from_sql_int("sequence", self.sequence)?,
            classified: ClassifiedDream {
                axis_score: AxisScore {
                    valence: self.valence,
                    energy: self.energy,
                },
                quadrant: parse_quadrant(&self.quadrant)?,
                confidence: self.confidence,
                matched_keywords,
            },
            created_at: Some(self.created_at),
        })
    }
}

fn parse_uuid(s: &str) -> Result<Uuid> {
    Uuid::parse_str(s).map_err(|e| StoreError::InvalidData(format!("invalid UUID '{s}': {e}")))
}

fn parse_quadrant(s: &str) -> Result<Quadrant> {
    s.parse().map_err(StoreError::InvalidData)
}

fn to_sql_int(n: u64) -> Result<i64> {
    i64::try_from(n).map_err(|_| StoreError::InvalidData(format!("{n} exceeds SQLite integer range")))
}

fn from_sql_int(what: &str, n: i64) -> Result<u64> {
    u64::try_from(n).map_err(|_| StoreError::InvalidData(format!("negative {what}: {n}")))
}
