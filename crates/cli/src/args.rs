use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use formstore_core::roles::ROLE_STAFF;
use formstore_core::types::DbId;
use formstore_core::value::{FieldValues, Value};

#[derive(Debug, Parser)]
#[command(name = "formstore")]
#[command(about = "Generic entity store over SQLite", long_about = None)]
pub struct Cli {
    /// Catalog file declaring the entity types
    #[arg(long, env = "FORMSTORE_CATALOG", default_value = "catalog.json", global = true)]
    pub catalog: PathBuf,

    /// Log in as this user before running the command
    #[arg(long, global = true, requires = "user_password")]
    pub user: Option<String>,

    /// Password for `--user`
    #[arg(long, env = "FORMSTORE_PASSWORD", hide_env_values = true, global = true)]
    pub user_password: Option<String>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Clone, Subcommand)]
pub enum Command {
    /// Create missing tables and report the entity types
    Init,
    /// Describe every entity type in the catalog
    Entities,
    /// Insert a record
    Create {
        entity: String,
        #[command(flatten)]
        fields: FieldArgs,
    },
    /// List all records of a type
    List { entity: String },
    /// Show one record
    Get {
        entity: String,
        #[command(flatten)]
        target: Target,
    },
    /// Find records matching every `--where` condition, or a keyword in
    /// any of the `--in` fields
    Search {
        entity: String,
        /// Condition as FIELD=VALUE (repeatable)
        #[arg(
            long = "where",
            value_name = "FIELD=VALUE",
            value_parser = parse_assignment,
            conflicts_with = "keyword"
        )]
        conditions: Vec<(String, String)>,
        /// Text to look for in any of the `--in` fields
        #[arg(long, requires = "fields")]
        keyword: Option<String>,
        /// Field searched by `--keyword` (repeatable)
        #[arg(long = "in", value_name = "FIELD", requires = "keyword")]
        fields: Vec<String>,
    },
    /// Change some fields of a record
    Update {
        entity: String,
        #[command(flatten)]
        target: Target,
        #[command(flatten)]
        fields: FieldArgs,
    },
    /// Remove a record
    Delete {
        entity: String,
        #[command(flatten)]
        target: Target,
    },
    /// Create a user account
    Register {
        username: String,
        #[arg(long)]
        password: String,
        #[arg(long, default_value = ROLE_STAFF)]
        role: String,
    },
    /// Check credentials and print the user
    Login {
        username: String,
        #[arg(long)]
        password: String,
    },
}

/// A record addressed by id or by a unique field value.
#[derive(Debug, Clone, Args)]
pub struct Target {
    pub id: Option<DbId>,

    /// Address the record by FIELD=VALUE instead of id
    #[arg(
        long,
        value_name = "FIELD=VALUE",
        value_parser = parse_assignment,
        conflicts_with = "id",
        required_unless_present = "id"
    )]
    pub by: Option<(String, String)>,
}

#[derive(Debug, Clone, Default, Args)]
pub struct FieldArgs {
    /// Field value as FIELD=VALUE (repeatable)
    #[arg(long = "set", value_name = "FIELD=VALUE", value_parser = parse_assignment)]
    pub set: Vec<(String, String)>,

    /// Set a field to null (repeatable)
    #[arg(long = "clear", value_name = "FIELD")]
    pub clear: Vec<String>,
}

impl FieldArgs {
    /// Raw text values; the schema coerces them to the field types.
    pub fn to_values(&self) -> FieldValues {
        let mut values: FieldValues = self
            .set
            .iter()
            .map(|(field, value)| (field.clone(), Value::Text(value.clone())))
            .collect();
        for field in &self.clear {
            values.insert(field.clone(), Value::Null);
        }
        values
    }
}

/// Parse `FIELD=VALUE`. The value may be empty or contain further `=`.
pub fn parse_assignment(raw: &str) -> Result<(String, String), String> {
    let (field, value) = raw
        .split_once('=')
        .ok_or_else(|| format!("expected FIELD=VALUE, got '{raw}'"))?;
    let field = field.trim();
    if field.is_empty() {
        return Err(format!("missing field name in '{raw}'"));
    }
    Ok((field.to_string(), value.to_string()))
}
