//! Road repository — CRUD operations for the `roads` table.

use rusqlite::{params, Connection, Row};

use super::{Database, DatabaseError};

/// A raw road row from the database.
#[derive(Debug, Clone)]
pub struct RoadRow {
    pub id: String,
    pub job_id: String,
    pub terrain_id: String,
    pub control_points: String,
    pub width: f64,
    pub blend_file_path: String,
    pub preview_path: Option<String>,
    pub created_at: String,
}

impl RoadRow {
    fn from_row(row: &Row<'_>) -> Result<Self, rusqlite::Error> {
        Ok(Self {
            id: row.get("id")?,
            job_id: row.get("job_id")?,
            terrain_id: row.get("terrain_id")?,
            control_points: row.get("control_points")?,
            width: row.get("width")?,
            blend_file_path: row.get("blend_file_path")?,
            preview_path: row.get("preview_path")?,
            created_at: row.get("created_at")?,
        })
    }
}

/// Inserts a road row inside an existing transaction. Pairs with the job
/// completion update so both land atomically.
pub fn insert_conn(conn: &Connection, road: &RoadRow) -> Result<(), DatabaseError> {
    conn.execute(
        "INSERT INTO roads (id, job_id, terrain_id, control_points, width,
         blend_file_path, preview_path, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
        params![
            road.id,
            road.job_id,
            road.terrain_id,
            road.control_points,
            road.width,
            road.blend_file_path,
            road.preview_path,
            road.created_at,
        ],
    )?;
    Ok(())
}

/// Inserts a road row.
pub fn insert(db: &Database, road: &RoadRow) -> Result<(), DatabaseError> {
    db.with_conn(|conn| insert_conn(conn, road))
}

/// Finds a road by its ID.
pub fn find_by_id(db: &Database, id: &str) -> Result<Option<RoadRow>, DatabaseError> {
    db.with_conn(|conn| {
        let mut stmt = conn.prepare("SELECT * FROM roads WHERE id = ?1")?;
        let mut rows = stmt.query_map(params![id], RoadRow::from_row)?;
        match rows.next() {
            Some(Ok(row)) => Ok(Some(row)),
            Some(Err(e)) => Err(DatabaseError::Sqlite(e)),
            None => Ok(None),
        }
    })
}

/// Finds the road created by the given job, if any.
pub fn find_by_job(db: &Database, job_id: &str) -> Result<Option<RoadRow>, DatabaseError> {
    db.with_conn(|conn| {
        let mut stmt = conn.prepare("SELECT * FROM roads WHERE job_id = ?1")?;
        let mut rows = stmt.query_map(params![job_id], RoadRow::from_row)?;
        match rows.next() {
            Some(Ok(row)) => Ok(Some(row)),
            Some(Err(e)) => Err(DatabaseError::Sqlite(e)),
            None => Ok(None),
        }
    })
}

/// Lists the roads on a terrain, newest first.
pub fn list_by_terrain(db: &Database, terrain_id: &str) -> Result<Vec<RoadRow>, DatabaseError> {
    db.with_conn(|conn| {
        let mut stmt = conn
            .prepare("SELECT * FROM roads WHERE terrain_id = ?1 ORDER BY created_at DESC")?;
        let rows: Vec<RoadRow> = stmt
            .query_map(params![terrain_id], RoadRow::from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    })
}

/// Deletes a road row inside an existing transaction.
pub fn delete_conn(conn: &Connection, id: &str) -> Result<bool, DatabaseError> {
    let changed = conn.execute("DELETE FROM roads WHERE id = ?1", params![id])?;
    Ok(changed > 0)
}

/// Deletes a road row.
pub fn delete(db: &Database, id: &str) -> Result<bool, DatabaseError> {
    db.with_conn(|conn| delete_conn(conn, id))
}
