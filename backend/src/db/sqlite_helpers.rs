//! SQLite helper utilities for type conversion
//!
//! SQLite doesn't natively support UUIDs. Identifiers are stored as their
//! 36-character hyphenated text form.

use sqlx::Row;
use sqlx::sqlite::SqliteRow;
use uuid::Uuid;

/// Convert a UUID to a SQLite-compatible string
#[inline]
pub fn uuid_to_str(id: Uuid) -> String {
    id.to_string()
}

/// Parse a SQLite string back to a UUID
#[inline]
pub fn str_to_uuid(s: &str) -> Result<Uuid, uuid::Error> {
    Uuid::parse_str(s)
}

/// Read a TEXT column and parse it as a UUID, reporting failures as a column decode error
pub fn decode_uuid(row: &SqliteRow, column: &str) -> Result<Uuid, sqlx::Error> {
    let raw: String = row.try_get(column)?;
    str_to_uuid(&raw).map_err(|e| sqlx::Error::ColumnDecode {
        index: column.to_string(),
        source: Box::new(e),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_uuid_round_trip_is_36_chars() {
        let id = Uuid::new_v4();
        let s = uuid_to_str(id);
        assert_eq!(s.len(), 36);
        assert_eq!(str_to_uuid(&s).unwrap(), id);
    }

    #[test]
    fn test_invalid_uuid() {
        assert!(str_to_uuid("not-a-uuid").is_err());
    }

    #[tokio::test]
    async fn test_decode_uuid_from_row() {
        use sqlx::sqlite::SqlitePoolOptions;

        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .unwrap();
        let id = Uuid::new_v4();

        let row = sqlx::query("SELECT ? AS id")
            .bind(uuid_to_str(id))
            .fetch_one(&pool)
            .await
            .unwrap();
        assert_eq!(decode_uuid(&row, "id").unwrap(), id);

        let bad = sqlx::query("SELECT 'garbage' AS id")
            .fetch_one(&pool)
            .await
            .unwrap();
        assert!(matches!(
            decode_uuid(&bad, "id"),
            Err(sqlx::Error::ColumnDecode { .. })
        ));
    }
}
