/// All entity identifiers are SQLite `INTEGER PRIMARY KEY AUTOINCREMENT`.
pub type DbId = i64;
