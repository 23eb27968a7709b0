//! Entity schemas and the catalog a store serves.
//!
//! A schema is a named record type with an ordered list of typed fields.
//! Schemas are declared at runtime (in code or from JSON) and validated once,
//! so every table and column name that later reaches SQL has passed
//! [`validate_identifier`].

use std::collections::HashSet;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::error::CoreError;
use crate::status::StatusMachine;
use crate::validation::{validate_date, validate_identifier, validate_non_empty};
use crate::value::{FieldValues, Value};

/// Column name of the surrogate identifier every entity table carries.
pub const ID_COLUMN: &str = "id";

/// Storage and validation kind of a field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldKind {
    Text,
    Integer,
    Real,
    /// `YYYY-MM-DD` text.
    Date,
    /// Text restricted to the machine's states.
    Status(StatusMachine),
}

impl FieldKind {
    /// SQLite column type.
    pub fn sql_type(&self) -> &'static str {
        match self {
            FieldKind::Integer => "INTEGER",
            FieldKind::Real => "REAL",
            FieldKind::Text | FieldKind::Date | FieldKind::Status(_) => "TEXT",
        }
    }

    pub fn is_numeric(&self) -> bool {
        matches!(self, FieldKind::Integer | FieldKind::Real)
    }
}

/// How a search predicate on a field is matched.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchMode {
    Exact,
    /// Case-sensitive substring match.
    Contains,
}

/// One column of an entity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FieldDef {
    pub name: String,
    pub kind: FieldKind,
    #[serde(default)]
    pub required: bool,
    #[serde(default)]
    pub unique: bool,
    /// Match text exactly in search instead of by substring.
    #[serde(default)]
    pub exact: bool,
    /// Entity type whose identifier this field holds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub references: Option<String>,
}

impl FieldDef {
    fn new(name: &str, kind: FieldKind) -> Self {
        Self {
            name: name.to_string(),
            kind,
            required: false,
            unique: false,
            exact: false,
            references: None,
        }
    }

    pub fn text(name: &str) -> Self {
        Self::new(name, FieldKind::Text)
    }

    pub fn integer(name: &str) -> Self {
        Self::new(name, FieldKind::Integer)
    }

    pub fn real(name: &str) -> Self {
        Self::new(name, FieldKind::Real)
    }

    pub fn date(name: &str) -> Self {
        Self::new(name, FieldKind::Date)
    }

    pub fn status(name: &str, machine: StatusMachine) -> Self {
        Self::new(name, FieldKind::Status(machine))
    }

    /// An integer field holding the identifier of a `target` record.
    pub fn reference(name: &str, target: &str) -> Self {
        let mut field = Self::new(name, FieldKind::Integer);
        field.references = Some(target.to_string());
        field
    }

    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    pub fn unique(mut self) -> Self {
        self.unique = true;
        self
    }

    pub fn exact(mut self) -> Self {
        self.exact = true;
        self
    }

    pub fn match_mode(&self) -> MatchMode {
        match self.kind {
            FieldKind::Text if !self.exact => MatchMode::Contains,
            _ => MatchMode::Exact,
        }
    }

    /// Convert a caller-supplied value to this field's storage type.
    ///
    /// Numeric fields accept numeric text (as typed into a form); blank text
    /// on a non-text field is treated as absent.
    pub fn coerce(&self, value: &Value) -> Result<Value, CoreError> {
        let blank = matches!(value, Value::Text(s) if s.trim().is_empty());
        match (&self.kind, value) {
            (_, Value::Null) => Ok(Value::Null),
            (FieldKind::Text, Value::Text(s)) => Ok(Value::Text(s.clone())),
            (FieldKind::Text, _) => Err(self.type_error("text", value)),

            (_, Value::Text(_)) if blank => Ok(Value::Null),

            (FieldKind::Integer, Value::Integer(v)) => Ok(Value::Integer(*v)),
            (FieldKind::Integer, Value::Text(s)) => s
                .trim()
                .parse::<i64>()
                .map(Value::Integer)
                .map_err(|_| self.type_error("an integer", value)),
            (FieldKind::Integer, _) => Err(self.type_error("an integer", value)),

            (FieldKind::Real, Value::Real(v)) if v.is_finite() => Ok(Value::Real(*v)),
            (FieldKind::Real, Value::Real(_)) => Err(self.type_error("a finite number", value)),
            (FieldKind::Real, Value::Integer(v)) => Ok(Value::Real(*v as f64)),
            (FieldKind::Real, Value::Text(s)) => s
                .trim()
                .parse::<f64>()
                .ok()
                .filter(|v| v.is_finite())
                .map(Value::Real)
                .ok_or_else(|| self.type_error("a number", value)),

            (FieldKind::Date, Value::Text(s)) => {
                validate_date(s)?;
                Ok(Value::Text(s.clone()))
            }
            (FieldKind::Date, _) => Err(self.type_error("a YYYY-MM-DD date", value)),

            (FieldKind::Status(machine), Value::Text(s)) => {
                machine.validate_state(&self.name, s)?;
                Ok(Value::Text(s.clone()))
            }
            (FieldKind::Status(_), _) => Err(self.type_error("a status name", value)),
        }
    }

    /// Reject a missing or blank value on a required field.
    pub fn check_required(&self, value: &Value) -> Result<(), CoreError> {
        if !self.required {
            return Ok(());
        }
        match value {
            Value::Null => Err(CoreError::Validation(format!("{} is required", self.name))),
            Value::Text(s) => validate_non_empty(&self.name, s),
            _ => Ok(()),
        }
    }

    fn type_error(&self, expected: &str, value: &Value) -> CoreError {
        CoreError::Validation(format!("{} must be {expected}, got {value}", self.name))
    }
}

/// A named record type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct EntitySchema {
    pub name: String,
    pub fields: Vec<FieldDef>,
}

/// A prepared search condition on one column.
#[derive(Debug, Clone, PartialEq)]
pub struct Predicate {
    pub column: String,
    pub value: Value,
    pub mode: MatchMode,
}

impl EntitySchema {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            fields: Vec::new(),
        }
    }

    pub fn field(mut self, field: FieldDef) -> Self {
        self.fields.push(field);
        self
    }

    pub fn get_field(&self, name: &str) -> Option<&FieldDef> {
        self.fields.iter().find(|f| f.name == name)
    }

    /// Look up a field, failing with `Validation` when it is not declared.
    pub fn require_field(&self, name: &str) -> Result<&FieldDef, CoreError> {
        self.get_field(name).ok_or_else(|| {
            CoreError::Validation(format!("{} has no field '{name}'", self.name))
        })
    }

    /// Look up a numeric field for arithmetic updates.
    pub fn require_numeric_field(&self, name: &str) -> Result<&FieldDef, CoreError> {
        let field = self.require_field(name)?;
        if field.kind.is_numeric() {
            Ok(field)
        } else {
            Err(CoreError::Validation(format!(
                "{}.{name} is not numeric",
                self.name
            )))
        }
    }

    /// Validate and coerce values for an insert.
    ///
    /// Returns every schema field in declaration order. Status fields that
    /// are omitted or blank take their initial state; other omitted fields
    /// are `Null`.
    pub fn prepare_create(&self, values: &FieldValues) -> Result<FieldValues, CoreError> {
        self.reject_unknown(values)?;
        let mut prepared = IndexMap::with_capacity(self.fields.len());
        for field in &self.fields {
            let value = match values.get(&field.name) {
                Some(v) => field.coerce(v)?,
                None => Value::Null,
            };
            let value = match (&field.kind, value) {
                (FieldKind::Status(machine), Value::Null) => Value::Text(machine.initial.clone()),
                (_, value) => value,
            };
            field.check_required(&value)?;
            prepared.insert(field.name.clone(), value);
        }
        Ok(prepared)
    }

    /// Validate and coerce the supplied subset of values for an update.
    ///
    /// Status fields always hold a state, so they cannot be cleared.
    pub fn prepare_update(&self, values: &FieldValues) -> Result<FieldValues, CoreError> {
        self.reject_unknown(values)?;
        let mut prepared = IndexMap::with_capacity(values.len());
        for field in &self.fields {
            if let Some(v) = values.get(&field.name) {
                let value = field.coerce(v)?;
                if matches!(field.kind, FieldKind::Status(_)) && value.is_null() {
                    return Err(CoreError::Validation(format!(
                        "{} cannot be cleared; set one of its states",
                        field.name
                    )));
                }
                field.check_required(&value)?;
                prepared.insert(field.name.clone(), value);
            }
        }
        Ok(prepared)
    }

    /// Turn a predicate map into typed conditions. `id` is allowed.
    pub fn prepare_predicates(&self, values: &FieldValues) -> Result<Vec<Predicate>, CoreError> {
        values
            .iter()
            .map(|(name, value)| {
                if name == ID_COLUMN {
                    let value = FieldDef::integer(ID_COLUMN).coerce(value)?;
                    return Ok(Predicate {
                        column: ID_COLUMN.to_string(),
                        value,
                        mode: MatchMode::Exact,
                    });
                }
                let field = self.require_field(name)?;
                Ok(Predicate {
                    column: field.name.clone(),
                    value: field.coerce(value)?,
                    mode: field.match_mode(),
                })
            })
            .collect()
    }

    /// Conditions for a keyword matched against any of `fields`.
    ///
    /// Each field matches the way it does in [`prepare_predicates`]. A field
    /// whose type cannot hold the keyword (e.g. "Dune" against an integer)
    /// contributes no condition.
    ///
    /// [`prepare_predicates`]: EntitySchema::prepare_predicates
    pub fn prepare_keyword(
        &self,
        fields: &[String],
        keyword: &str,
    ) -> Result<Vec<Predicate>, CoreError> {
        validate_non_empty("keyword", keyword)?;
        if fields.is_empty() {
            return Err(CoreError::Validation(
                "Keyword search needs at least one field".into(),
            ));
        }
        let keyword = Value::Text(keyword.to_string());
        let mut predicates = Vec::with_capacity(fields.len());
        for name in fields {
            let field = self.require_field(name)?;
            if let Ok(value) = field.coerce(&keyword) {
                predicates.push(Predicate {
                    column: field.name.clone(),
                    value,
                    mode: field.match_mode(),
                });
            }
        }
        Ok(predicates)
    }

    fn reject_unknown(&self, values: &FieldValues) -> Result<(), CoreError> {
        for name in values.keys() {
            if name == ID_COLUMN {
                return Err(CoreError::Validation(format!(
                    "{}.id is assigned by the store and cannot be written",
                    self.name
                )));
            }
            self.require_field(name)?;
        }
        Ok(())
    }

    fn check(&self) -> Result<(), CoreError> {
        validate_identifier("entity", &self.name)?;
        let mut seen = HashSet::new();
        for field in &self.fields {
            validate_identifier("field", &field.name)?;
            if field.name == ID_COLUMN {
                return Err(CoreError::Validation(format!(
                    "{}: field name 'id' is reserved",
                    self.name
                )));
            }
            if !seen.insert(field.name.as_str()) {
                return Err(CoreError::Validation(format!(
                    "{}: duplicate field '{}'",
                    self.name, field.name
                )));
            }
            if let FieldKind::Status(machine) = &field.kind {
                machine.check(&field.name)?;
            }
            if field.references.is_some() && field.kind != FieldKind::Integer {
                return Err(CoreError::Validation(format!(
                    "{}.{} references another entity and must be an integer field",
                    self.name, field.name
                )));
            }
        }
        Ok(())
    }
}

/// The validated set of entity schemas one store serves.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Catalog {
    entities: IndexMap<String, EntitySchema>,
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct CatalogFile {
    entities: Vec<EntitySchema>,
}

impl Catalog {
    /// Validate `schemas` and build a catalog.
    pub fn new(schemas: impl IntoIterator<Item = EntitySchema>) -> Result<Self, CoreError> {
        let mut entities = IndexMap::new();
        for schema in schemas {
            schema.check()?;
            if entities.contains_key(&schema.name) {
                return Err(CoreError::Validation(format!(
                    "Duplicate entity type '{}'",
                    schema.name
                )));
            }
            entities.insert(schema.name.clone(), schema);
        }
        for schema in entities.values() {
            for field in &schema.fields {
                if let Some(target) = &field.references {
                    if !entities.contains_key(target) {
                        return Err(CoreError::Validation(format!(
                            "{}.{} references unknown entity type '{target}'",
                            schema.name, field.name
                        )));
                    }
                }
            }
        }
        Ok(Self { entities })
    }

    /// Parse `{"entities": [...]}` and validate it.
    pub fn from_json(json: &str) -> Result<Self, CoreError> {
        let file: CatalogFile = serde_json::from_str(json)
            .map_err(|e| CoreError::Validation(format!("Invalid catalog: {e}")))?;
        Self::new(file.entities)
    }

    /// Return a new catalog with `schema` appended.
    pub fn with(&self, schema: EntitySchema) -> Result<Self, CoreError> {
        Self::new(self.entities.values().cloned().chain(std::iter::once(schema)))
    }

    /// Look up a schema, failing with `Validation` for unknown types.
    pub fn get(&self, entity: &str) -> Result<&EntitySchema, CoreError> {
        self.entities
            .get(entity)
            .ok_or_else(|| CoreError::Validation(format!("Unknown entity type '{entity}'")))
    }

    pub fn contains(&self, entity: &str) -> bool {
        self.entities.contains_key(entity)
    }

    pub fn iter(&self) -> impl Iterator<Item = &EntitySchema> {
        self.entities.values()
    }

    pub fn len(&self) -> usize {
        self.entities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }
}
