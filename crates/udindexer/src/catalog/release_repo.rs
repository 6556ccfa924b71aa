//! Release repository: reads and append-only writes on the `releases` table.

use rusqlite::types::Type;
use rusqlite::{params, ErrorCode, OptionalExtension, Row};

use super::{Database, DatabaseError};
use crate::classify::MediaType;

/// One cataloged release, keyed by `(filename, raw_size)`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CatalogEntry {
    pub filename: String,
    pub raw_size: u64,
    pub media_type: MediaType,
    pub descriptor_file: Option<String>,
    /// Title as classified from the release name.
    pub title: Option<String>,
    pub year: Option<u16>,
    pub season: Option<u32>,
    pub episode: Option<String>,
    /// IMDb id (`tt...`).
    pub external_id: Option<String>,
    pub tmdb_id: Option<i64>,
    pub canonical_title: Option<String>,
    pub original_title: Option<String>,
    pub release_date: Option<String>,
    pub release_year: Option<u16>,
    pub created_at: String,
}

impl CatalogEntry {
    fn from_row(row: &Row<'_>) -> Result<Self, rusqlite::Error> {
        let raw_size: i64 = row.get("raw_size")?;
        let raw_size = u64::try_from(raw_size)
            .map_err(|e| rusqlite::Error::FromSqlConversionFailure(1, Type::Integer, Box::new(e)))?;

        let media_type: String = row.get("media_type")?;
        let media_type = media_type.parse::<MediaType>().map_err(|e| {
            rusqlite::Error::FromSqlConversionFailure(
                2,
                Type::Text,
                Box::new(std::io::Error::new(std::io::ErrorKind::InvalidData, e)),
            )
        })?;

        Ok(Self {
            filename: row.get("filename")?,
            raw_size,
            media_type,
            descriptor_file: row.get("descriptor_file")?,
            title: row.get("title")?,
            year: row.get("year")?,
            season: row.get("season")?,
            episode: row.get("episode")?,
            external_id: row.get("external_id")?,
            tmdb_id: row.get("tmdb_id")?,
            canonical_title: row.get("canonical_title")?,
            original_title: row.get("original_title")?,
            release_date: row.get("release_date")?,
            release_year: row.get("release_year")?,
            created_at: row.get("created_at")?,
        })
    }
}

/// Query filter parameters for release listing.
#[derive(Debug, Default, Clone)]
pub struct ReleaseFilter {
    pub media_type: Option<MediaType>,
    pub external_id: Option<String>,
    pub season: Option<u32>,
    /// Case-insensitive match on the canonical title.
    pub title: Option<String>,
    /// `None` returns every matching row.
    pub limit: Option<u64>,
    pub offset: Option<u64>,
}

fn clamp_i64(value: u64) -> i64 {
    i64::try_from(value).unwrap_or(i64::MAX)
}

fn size_param(raw_size: u64) -> Result<i64, DatabaseError> {
    i64::try_from(raw_size).map_err(|_| DatabaseError::OutOfRange { column: "raw_size" })
}

/// Returns true if a release with this identity is already cataloged.
pub fn exists(db: &Database, filename: &str, raw_size: u64) -> Result<bool, DatabaseError> {
    let size = size_param(raw_size)?;
    db.with_conn(|conn| {
        let count: u64 = conn.query_row(
            "SELECT COUNT(*) FROM releases WHERE filename = ?1 AND raw_size = ?2",
            params![filename, size],
            |r| r.get(0),
        )?;
        Ok(count > 0)
    })
}

/// Inserts a new release. Fails with `DuplicateKey` if the identity exists;
/// existing rows are never overwritten.
pub fn insert(db: &Database, entry: &CatalogEntry) -> Result<(), DatabaseError> {
    let size = size_param(entry.raw_size)?;
    db.with_conn(|conn| {
        let result = conn.execute(
            "INSERT INTO releases (filename, raw_size, media_type, descriptor_file, title, year,
             season, episode, external_id, tmdb_id, canonical_title, original_title,
             release_date, release_year, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15)",
            params![
                entry.filename,
                size,
                entry.media_type.as_str(),
                entry.descriptor_file,
                entry.title,
                entry.year,
                entry.season,
                entry.episode,
                entry.external_id,
                entry.tmdb_id,
                entry.canonical_title,
                entry.original_title,
                entry.release_date,
                entry.release_year,
                entry.created_at,
            ],
        );

        match result {
            Ok(_) => Ok(()),
            Err(e) if e.sqlite_error_code() == Some(ErrorCode::ConstraintViolation) => {
                Err(DatabaseError::DuplicateKey {
                    filename: entry.filename.clone(),
                    raw_size: entry.raw_size,
                })
            }
            Err(e) => Err(DatabaseError::Sqlite(e)),
        }
    })
}

/// Finds a release by its identity.
pub fn find(db: &Database, filename: &str, raw_size: u64) -> Result<Option<CatalogEntry>, DatabaseError> {
    let size = size_param(raw_size)?;
    db.with_conn(|conn| {
        let entry = conn
            .query_row(
                "SELECT * FROM releases WHERE filename = ?1 AND raw_size = ?2",
                params![filename, size],
                CatalogEntry::from_row,
            )
            .optional()?;
        Ok(entry)
    })
}

/// Queries releases with filters, returning (rows, total_count).
pub fn query(db: &Database, filter: &ReleaseFilter) -> Result<(Vec<CatalogEntry>, u64), DatabaseError> {
    db.with_conn(|conn| {
        let mut conditions = Vec::new();
        let mut param_values: Vec<Box<dyn rusqlite::types::ToSql>> = Vec::new();

        if let Some(media_type) = filter.media_type {
            conditions.push(format!("media_type = ?{}", param_values.len() + 1));
            param_values.push(Box::new(media_type.as_str()));
        }
        if let Some(ref external_id) = filter.external_id {
            conditions.push(format!("external_id = ?{}", param_values.len() + 1));
            param_values.push(Box::new(external_id.clone()));
        }
        if let Some(season) = filter.season {
            conditions.push(format!("season = ?{}", param_values.len() + 1));
            param_values.push(Box::new(season));
        }
        if let Some(ref title) = filter.title {
            conditions.push(format!(
                "canonical_title = ?{} COLLATE NOCASE",
                param_values.len() + 1
            ));
            param_values.push(Box::new(title.clone()));
        }

        let where_clause = if conditions.is_empty() {
            String::new()
        } else {
            format!("WHERE {}", conditions.join(" AND "))
        };

        let count_sql = format!("SELECT COUNT(*) FROM releases {}", where_clause);
        let params_ref: Vec<&dyn rusqlite::types::ToSql> =
            param_values.iter().map(|p| p.as_ref()).collect();
        let total: u64 = conn.query_row(&count_sql, params_ref.as_slice(), |r| r.get(0))?;

        // A negative LIMIT is "no limit" in SQLite.
        let limit = filter.limit.map_or(-1, clamp_i64);
        let offset = clamp_i64(filter.offset.unwrap_or(0));
        param_values.push(Box::new(limit));
        param_values.push(Box::new(offset));
        let query_sql = format!(
            "SELECT * FROM releases {} ORDER BY created_at DESC, filename ASC LIMIT ?{} OFFSET ?{}",
            where_clause,
            param_values.len() - 1,
            param_values.len()
        );

        let params_ref: Vec<&dyn rusqlite::types::ToSql> =
            param_values.iter().map(|p| p.as_ref()).collect();
        let mut stmt = conn.prepare(&query_sql)?;
        let rows: Vec<CatalogEntry> = stmt
            .query_map(params_ref.as_slice(), CatalogEntry::from_row)?
            .collect::<Result<Vec<_>, _>>()?;

        Ok((rows, total))
    })
}

/// Series releases for one show season, every quality included.
pub fn find_series_by_external_id(
    db: &Database,
    external_id: &str,
    season: u32,
) -> Result<Vec<CatalogEntry>, DatabaseError> {
    let filter = ReleaseFilter {
        media_type: Some(MediaType::Series),
        external_id: Some(normalize_imdb_id(external_id)),
        season: Some(season),
        ..Default::default()
    };
    query(db, &filter).map(|(rows, _)| rows)
}

/// Movie releases for one film.
pub fn find_movies_by_external_id(
    db: &Database,
    external_id: &str,
) -> Result<Vec<CatalogEntry>, DatabaseError> {
    let filter = ReleaseFilter {
        media_type: Some(MediaType::Movie),
        external_id: Some(normalize_imdb_id(external_id)),
        ..Default::default()
    };
    query(db, &filter).map(|(rows, _)| rows)
}

/// Releases whose canonical title matches, ignoring case.
pub fn find_by_title(
    db: &Database,
    media_type: MediaType,
    title: &str,
) -> Result<Vec<CatalogEntry>, DatabaseError> {
    let filter = ReleaseFilter {
        media_type: Some(media_type),
        title: Some(title.to_string()),
        ..Default::default()
    };
    query(db, &filter).map(|(rows, _)| rows)
}

/// Any one release of the given type. Used by indexer connectivity probes.
pub fn random(db: &Database, media_type: MediaType) -> Result<Option<CatalogEntry>, DatabaseError> {
    db.with_conn(|conn| {
        let entry = conn
            .query_row(
                "SELECT * FROM releases WHERE media_type = ?1 ORDER BY RANDOM() LIMIT 1",
                params![media_type.as_str()],
                CatalogEntry::from_row,
            )
            .optional()?;
        Ok(entry)
    })
}

/// Prefixes bare IMDb ids with `tt`.
pub fn normalize_imdb_id(id: &str) -> String {
    let id = id.trim();
    if id.starts_with("tt") {
        id.to_string()
    } else {
        format!("tt{}", id)
    }
}
