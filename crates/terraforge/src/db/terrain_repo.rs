//! Terrain repository — CRUD operations for the `terrains` table.

use rusqlite::{params, Connection, Row};

use super::{Database, DatabaseError};

/// A raw terrain row from the database.
#[derive(Debug, Clone)]
pub struct TerrainRow {
    pub id: String,
    pub job_id: String,
    pub description: String,
    pub params: String,
    pub blend_file_path: String,
    pub preview_path: Option<String>,
    pub created_at: String,
}

impl TerrainRow {
    fn from_row(row: &Row<'_>) -> Result<Self, rusqlite::Error> {
        Ok(Self {
            id: row.get("id")?,
            job_id: row.get("job_id")?,
            description: row.get("description")?,
            params: row.get("params")?,
            blend_file_path: row.get("blend_file_path")?,
            preview_path: row.get("preview_path")?,
            created_at: row.get("created_at")?,
        })
    }
}

/// Inserts a terrain row inside an existing transaction. Pairs with the
/// job completion update so both land atomically.
pub fn insert_conn(conn: &Connection, terrain: &TerrainRow) -> Result<(), DatabaseError> {
    conn.execute(
        "INSERT INTO terrains (id, job_id, description, params, blend_file_path,
         preview_path, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
        params![
            terrain.id,
            terrain.job_id,
            terrain.description,
            terrain.params,
            terrain.blend_file_path,
            terrain.preview_path,
            terrain.created_at,
        ],
    )?;
    Ok(())
}

/// Inserts a terrain row.
pub fn insert(db: &Database, terrain: &TerrainRow) -> Result<(), DatabaseError> {
    db.with_conn(|conn| insert_conn(conn, terrain))
}

/// Finds a terrain by its ID.
pub fn find_by_id(db: &Database, id: &str) -> Result<Option<TerrainRow>, DatabaseError> {
    db.with_conn(|conn| {
        let mut stmt = conn.prepare("SELECT * FROM terrains WHERE id = ?1")?;
        let mut rows = stmt.query_map(params![id], TerrainRow::from_row)?;
        match rows.next() {
            Some(Ok(row)) => Ok(Some(row)),
            Some(Err(e)) => Err(DatabaseError::Sqlite(e)),
            None => Ok(None),
        }
    })
}

/// Finds the terrain created by the given job, if any.
pub fn find_by_job(db: &Database, job_id: &str) -> Result<Option<TerrainRow>, DatabaseError> {
    db.with_conn(|conn| {
        let mut stmt = conn.prepare("SELECT * FROM terrains WHERE job_id = ?1")?;
        let mut rows = stmt.query_map(params![job_id], TerrainRow::from_row)?;
        match rows.next() {
            Some(Ok(row)) => Ok(Some(row)),
            Some(Err(e)) => Err(DatabaseError::Sqlite(e)),
            None => Ok(None),
        }
    })
}

/// Lists all terrains, newest first.
pub fn list(db: &Database) -> Result<Vec<TerrainRow>, DatabaseError> {
    db.with_conn(|conn| {
        let mut stmt = conn.prepare("SELECT * FROM terrains ORDER BY created_at DESC")?;
        let rows: Vec<TerrainRow> = stmt
            .query_map([], TerrainRow::from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    })
}

/// Deletes a terrain row inside an existing transaction. Roads referencing
/// it are removed by the FOREIGN KEY cascade.
pub fn delete_conn(conn: &Connection, id: &str) -> Result<bool, DatabaseError> {
    let changed = conn.execute("DELETE FROM terrains WHERE id = ?1", params![id])?;
    Ok(changed > 0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::job_repo;

    fn test_db() -> Database {
        Database::open_in_memory().expect("Failed to create test database")
    }

    fn insert_owning_job(db: &Database, job_id: &str) {
        job_repo::insert(
            db,
            &job_repo::JobRow {
                id: job_id.to_string(),
                job_type: "terrain".to_string(),
                status: "processing".to_string(),
                input_params: None,
                result: None,
                error: None,
                created_at: "2026-01-01T00:00:00Z".to_string(),
                updated_at: "2026-01-01T00:00:00Z".to_string(),
                completed_at: None,
            },
        )
        .unwrap();
    }

    fn sample_terrain(id: &str, job_id: &str) -> TerrainRow {
        TerrainRow {
            id: id.to_string(),
            job_id: job_id.to_string(),
            description: "rolling hills".to_string(),
            params: "{\"scale\":20.0}".to_string(),
            blend_file_path: format!("/output/{}.blend", job_id),
            preview_path: Some(format!("/output/{}_preview.png", job_id)),
            created_at: "2026-01-01T00:05:00Z".to_string(),
        }
    }

    #[test]
    fn test_insert_and_find() {
        let db = test_db();
        insert_owning_job(&db, "job-1");
        insert(&db, &sample_terrain("t1", "job-1")).unwrap();

        let found = find_by_id(&db, "t1").unwrap().unwrap();
        assert_eq!(found.description, "rolling hills");
        assert!(found.blend_file_path.ends_with("job-1.blend"));
    }

    #[test]
    fn test_find_by_job() {
        let db = test_db();
        insert_owning_job(&db, "job-2");
        insert(&db, &sample_terrain("t2", "job-2")).unwrap();

        let found = find_by_job(&db, "job-2").unwrap();
        assert_eq!(found.unwrap().id, "t2");
        assert!(find_by_job(&db, "job-none").unwrap().is_none());
    }

    #[test]
    fn test_insert_without_job_rejected() {
        let db = test_db();
        let result = insert(&db, &sample_terrain("t3", "missing-job"));
        assert!(result.is_err(), "foreign key violation expected");
    }

    #[test]
    fn test_list_newest_first() {
        let db = test_db();
        for (i, id) in ["a", "b", "c"].iter().enumerate() {
            insert_owning_job(&db, &format!("job-{}", id));
            let mut terrain = sample_terrain(id, &format!("job-{}", id));
            terrain.created_at = format!("2026-01-0{}T00:00:00Z", i + 1);
            insert(&db, &terrain).unwrap();
        }

        let rows = list(&db).unwrap();
        assert_eq!(rows.len(), 3);
        assert_eq!(rows[0].id, "c");
        assert_eq!(rows[2].id, "a");
    }

    #[test]
    fn test_delete() {
        let db = test_db();
        insert_owning_job(&db, "job-4");
        insert(&db, &sample_terrain("t4", "job-4")).unwrap();

        let deleted = db.with_conn(|conn| delete_conn(conn, "t4")).unwrap();
        assert!(deleted);
        assert!(find_by_id(&db, "t4").unwrap().is_none());

        let deleted = db.with_conn(|conn| delete_conn(conn, "t4")).unwrap();
        assert!(!deleted);
    }
}
