//! Statement text issued by the harness.
//!
//! Every backend receives the same SQL. Adapters whose client cannot bind
//! `@Name` slots rewrite them with [`positional_slots`].

/// Drops the target table if it exists.
pub const DROP_TABLE: &str = "DROP TABLE IF EXISTS Numbers";

/// Creates the target table.
pub const CREATE_TABLE: &str = "CREATE TABLE Numbers (Key INTEGER, Value REAL, PRIMARY KEY(Key))";

/// Parameterized insert compiled once by the prepared variants.
pub const INSERT_PREPARED: &str = "INSERT INTO Numbers VALUES (@Key, @Value)";

/// Reads back the table in key order for verification.
pub const SELECT_ROWS: &str = "SELECT Key, Value FROM Numbers ORDER BY Key";

/// Named parameter slots in binding order.
pub const SLOTS: [&str; 2] = ["@Key", "@Value"];

/// Fully interpolated insert used by the unprepared variants.
pub fn insert_literal(row: u64) -> String {
    format!("INSERT INTO Numbers VALUES ({row}, {row})")
}

/// Rewrites `@Key`/`@Value` into `?1`/`?2` for clients that bind by index.
///
/// sqlx's SQLite driver only accepts `?NNN` and `$NNN` parameter names and
/// rejects `@Name` at bind time.
pub fn positional_slots(sql: &str) -> String {
    SLOTS
        .iter()
        .enumerate()
        .fold(sql.to_string(), |sql, (idx, slot)| {
            sql.replace(slot, &format!("?{}", idx + 1))
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_insert_literal() {
        assert_eq!(insert_literal(0), "INSERT INTO Numbers VALUES (0, 0)");
        assert_eq!(insert_literal(42), "INSERT INTO Numbers VALUES (42, 42)");
    }

    #[test]
    fn test_positional_slots() {
        assert_eq!(
            positional_slots(INSERT_PREPARED),
            "INSERT INTO Numbers VALUES (?1, ?2)"
        );
        assert_eq!(positional_slots(SELECT_ROWS), SELECT_ROWS);
    }
}
