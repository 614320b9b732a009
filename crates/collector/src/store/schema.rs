//! The single persisted table and its column contract.
//!
//! Provisioning and insertion both derive their SQL from [`COLUMNS`], so the
//! two can never disagree on names or order.

pub const TABLE_NAME: &str = "header";

pub const ID_COLUMN: &str = "id";

/// Catch-all column. Its name collides with the appliance's own `msg` field,
/// which is consumed as a known field and never reaches the overflow.
pub const OVERFLOW_COLUMN: &str = "msg";

/// Fields copied verbatim into a column of the same name, in column order.
pub const DIRECT_FIELDS: [&str; 9] = [
    "date", "time", "devname", "devid", "logid", "type", "subtype", "level", "vd",
];

/// Every field a well-formed message must carry.
pub const KNOWN_FIELDS: [&str; 10] = [
    "date", "time", "devname", "devid", "logid", "type", "subtype", "level", "vd", "msg",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Column {
    pub name: &'static str,
    pub sql_type: &'static str,
}

const fn column(name: &'static str, sql_type: &'static str) -> Column {
    Column { name, sql_type }
}

/// Full column list in table order.
pub static COLUMNS: [Column; 11] = [
    column(ID_COLUMN, "INTEGER PRIMARY KEY AUTOINCREMENT"),
    column("date", "DATE"),
    column("time", "TIME"),
    column("devname", "TEXT"),
    column("devid", "TEXT"),
    column("logid", "TEXT"),
    column("type", "TEXT"),
    column("subtype", "TEXT"),
    column("level", "TEXT"),
    column("vd", "TEXT"),
    column(OVERFLOW_COLUMN, "TEXT"),
];

pub fn is_known(name: &str) -> bool {
    KNOWN_FIELDS.contains(&name)
}

/// Columns written by an insert: everything but the surrogate key.
pub fn value_columns() -> impl Iterator<Item = &'static Column> {
    COLUMNS.iter().filter(|c| c.name != ID_COLUMN)
}

pub fn create_table_sql() -> String {
    let defs: Vec<String> = COLUMNS
        .iter()
        .map(|c| format!("\"{}\" {}", c.name, c.sql_type))
        .collect();
    format!("CREATE TABLE \"{}\" ({})", TABLE_NAME, defs.join(", "))
}

/// Parameterized insert; values are always bound, never interpolated.
pub fn insert_sql() -> String {
    let names: Vec<String> = value_columns().map(|c| format!("\"{}\"", c.name)).collect();
    let slots: Vec<String> = (1..=names.len()).map(|i| format!("?{}", i)).collect();
    format!(
        "INSERT INTO \"{}\" ({}) VALUES ({})",
        TABLE_NAME,
        names.join(", "),
        slots.join(", ")
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_column_order_matches_contract() {
        let names: Vec<&str> = COLUMNS.iter().map(|c| c.name).collect();
        assert_eq!(
            names,
            vec!["id", "date", "time", "devname", "devid", "logid", "type", "subtype", "level", "vd", "msg"]
        );
    }

    #[test]
    fn test_direct_fields_are_the_middle_columns() {
        let middle: Vec<&str> = COLUMNS[1..10].iter().map(|c| c.name).collect();
        assert_eq!(middle, DIRECT_FIELDS.to_vec());
    }

    #[test]
    fn test_known_fields_are_direct_plus_overflow_name() {
        let mut expected = DIRECT_FIELDS.to_vec();
        expected.push(OVERFLOW_COLUMN);
        assert_eq!(KNOWN_FIELDS.to_vec(), expected);
    }

    #[test]
    fn test_insert_binds_every_value_column() {
        let sql = insert_sql();
        assert_eq!(value_columns().count(), 10);
        assert!(sql.contains("?10"));
        assert!(!sql.contains("?11"));
        assert!(!sql.contains("\"id\""));
        for column in value_columns() {
            assert!(sql.contains(&format!("\"{}\"", column.name)));
        }
    }

    #[test]
    fn test_create_table_mentions_types() {
        let sql = create_table_sql();
        assert!(sql.starts_with("CREATE TABLE \"header\""));
        assert!(sql.contains("\"id\" INTEGER PRIMARY KEY AUTOINCREMENT"));
        assert!(sql.contains("\"date\" DATE"));
        assert!(sql.contains("\"msg\" TEXT"));
    }

    #[test]
    fn test_is_known() {
        assert!(is_known("devname"));
        assert!(is_known("msg"));
        assert!(!is_known("srcip"));
        assert!(!is_known("Date"));
    }
}
