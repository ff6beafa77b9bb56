//! Schema catalog - stores table and column descriptions

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::error::SchemaError;

/// Key used for tables that belong to no named schema
const UNNAMED_SCHEMA: &str = "";

/// Schema catalog - holds every table the analysis may resolve against
///
/// Lookups are case-insensitive. A catalog is never mutated while an analysis
/// borrows it.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Catalog {
    /// Uppercased schema name -> Schema
    pub schemas: IndexMap<String, Schema>,
    /// Schema searched first for unqualified names
    pub default_schema: Option<String>,
    /// Display tables as `SCHEMA.TABLE` in completion labels
    pub show_schema_prefix: bool,
}

impl Catalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a catalog from a flat table list
    pub fn from_tables(tables: impl IntoIterator<Item = Table>) -> Self {
        let mut catalog = Self::new();
        for table in tables {
            catalog.add_table(table);
        }
        catalog
    }

    /// Load a schema description from JSON.
    ///
    /// Accepts `{"schemas": [{"name", "tables"}], "defaultSchema", "showSchemaPrefix"}`,
    /// `{"tables": [...]}`, or a bare array of tables.
    pub fn from_json(json: &str) -> Result<Self, SchemaError> {
        let raw: RawInput = serde_json::from_str(json)?;
        Ok(raw.into_catalog())
    }

    /// Load a schema description from TOML (same shape as the JSON object form)
    pub fn from_toml(source: &str) -> Result<Self, SchemaError> {
        let raw: RawDescription = toml::from_str(source)?;
        Ok(RawInput::Description(raw).into_catalog())
    }

    /// Get or create a schema
    pub fn get_or_create_schema(&mut self, name: &str) -> &mut Schema {
        self.schemas
            .entry(name.to_uppercase())
            .or_insert_with(|| Schema {
                name: name.to_string(),
                tables: IndexMap::new(),
            })
    }

    /// Add a table to the catalog, filing it under its own schema, the
    /// default schema, or the unnamed schema.
    pub fn add_table(&mut self, table: Table) {
        let schema_name = table
            .schema
            .clone()
            .or_else(|| self.default_schema.clone())
            .unwrap_or_else(|| UNNAMED_SCHEMA.to_string());
        let schema = self.get_or_create_schema(&schema_name);
        schema.tables.insert(table.name.to_uppercase(), table);
    }

    pub fn get_schema(&self, name: &str) -> Option<&Schema> {
        self.schemas.get(&name.to_uppercase())
    }

    pub fn schema_exists(&self, name: &str) -> bool {
        !name.is_empty() && self.get_schema(name).is_some()
    }

    /// Look up a table by `TABLE` or `SCHEMA.TABLE`.
    ///
    /// Unqualified names try the default schema first, then every schema in
    /// declaration order.
    pub fn get_table(&self, name: &str) -> Option<&Table> {
        let name = QualifiedName::parse(name);
        let key = name.name.to_uppercase();

        if let Some(schema) = &name.schema {
            return self.get_schema(schema).and_then(|s| s.tables.get(&key));
        }

        if let Some(table) = self
            .default_schema
            .as_deref()
            .and_then(|d| self.get_schema(d))
            .and_then(|s| s.tables.get(&key))
        {
            return Some(table);
        }

        self.schemas.values().find_map(|s| s.tables.get(&key))
    }

    /// Mutable lookup with the same resolution order as [`Catalog::get_table`]
    pub fn get_table_mut(&mut self, name: &str) -> Option<&mut Table> {
        let name = QualifiedName::parse(name);
        let key = name.name.to_uppercase();

        if let Some(schema) = &name.schema {
            return self
                .schemas
                .get_mut(&schema.to_uppercase())
                .and_then(|s| s.tables.get_mut(&key));
        }

        if let Some(default) = self.default_schema.as_deref().map(str::to_uppercase) {
            if self
                .schemas
                .get(&default)
                .is_some_and(|s| s.tables.contains_key(&key))
            {
                return self.schemas.get_mut(&default).and_then(|s| s.tables.get_mut(&key));
            }
        }

        self.schemas.values_mut().find_map(|s| s.tables.get_mut(&key))
    }

    /// Check if a table exists
    pub fn table_exists(&self, name: &str) -> bool {
        self.get_table(name).is_some()
    }

    /// Iterate over every table in declaration order
    pub fn tables(&self) -> impl Iterator<Item = &Table> {
        self.schemas.values().flat_map(|s| s.tables.values())
    }

    /// Names of the named schemas
    pub fn schema_names(&self) -> impl Iterator<Item = &str> {
        self.schemas
            .values()
            .map(|s| s.name.as_str())
            .filter(|n| !n.is_empty())
    }

    /// Label for a table as the editor should show it
    pub fn display_name(&self, table: &Table) -> String {
        if self.show_schema_prefix {
            table.qualified_name()
        } else {
            table.name.clone()
        }
    }

    pub fn is_empty(&self) -> bool {
        self.schemas.values().all(|s| s.tables.is_empty())
    }
}

/// A database schema (namespace)
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Schema {
    pub name: String,
    /// Uppercased table name -> Table
    pub tables: IndexMap<String, Table>,
}

/// Qualified name (schema.table or just table)
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct QualifiedName {
    pub schema: Option<String>,
    pub name: String,
}

impl QualifiedName {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            schema: None,
            name: name.into(),
        }
    }

    pub fn with_schema(schema: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            schema: Some(schema.into()),
            name: name.into(),
        }
    }

    /// Parse from a dotted name like "schema.table", "db.schema.table" or
    /// just "table"
    pub fn parse(s: &str) -> Self {
        match s.rsplit_once('.') {
            Some((qualifier, name)) => {
                let schema = qualifier.rsplit('.').next().unwrap_or(qualifier);
                Self::with_schema(schema, name)
            }
            None => Self::new(s),
        }
    }
}

impl std::fmt::Display for QualifiedName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if let Some(schema) = &self.schema {
            write!(f, "{}.{}", schema, self.name)
        } else {
            write!(f, "{}", self.name)
        }
    }
}

/// Table (or view) description
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Table {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub schema: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default)]
    pub columns: Vec<Column>,
    /// `table`, `view`, `alias`, ...
    #[serde(default, rename = "type", skip_serializing_if = "Option::is_none")]
    pub table_type: Option<String>,
}

impl Table {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    pub fn in_schema(mut self, schema: impl Into<String>) -> Self {
        self.schema = Some(schema.into());
        self
    }

    pub fn with_column(mut self, column: Column) -> Self {
        self.columns.push(column);
        self
    }

    /// Get a column by name (case-insensitive)
    pub fn get_column(&self, name: &str) -> Option<&Column> {
        self.columns
            .iter()
            .find(|c| c.name.eq_ignore_ascii_case(name))
    }

    pub fn get_column_mut(&mut self, name: &str) -> Option<&mut Column> {
        self.columns
            .iter_mut()
            .find(|c| c.name.eq_ignore_ascii_case(name))
    }

    /// Check if a column exists
    pub fn column_exists(&self, name: &str) -> bool {
        self.get_column(name).is_some()
    }

    /// Get all column names
    pub fn column_names(&self) -> Vec<&str> {
        self.columns.iter().map(|c| c.name.as_str()).collect()
    }

    /// `SCHEMA.NAME` when the table has a named schema
    pub fn qualified_name(&self) -> String {
        match self.schema.as_deref() {
            Some(schema) if !schema.is_empty() => format!("{}.{}", schema, self.name),
            _ => self.name.clone(),
        }
    }

    pub fn kind_label(&self) -> &str {
        self.table_type.as_deref().unwrap_or("table")
    }
}

/// Column description
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Column {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nullable: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_primary_key: Option<bool>,
}

impl Column {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    pub fn typed(mut self, data_type: impl Into<String>) -> Self {
        self.data_type = Some(data_type.into());
        self
    }

    pub fn not_null(mut self) -> Self {
        self.nullable = Some(false);
        self
    }

    pub fn primary_key(mut self) -> Self {
        self.is_primary_key = Some(true);
        self.nullable = Some(false);
        self
    }

    /// One-line summary such as `INTEGER NOT NULL PK`
    pub fn summary(&self) -> String {
        let mut parts = vec![self.data_type.clone().unwrap_or_else(|| "unknown".into())];
        if self.nullable == Some(false) {
            parts.push("NOT NULL".into());
        }
        if self.is_primary_key == Some(true) {
            parts.push("PK".into());
        }
        parts.join(" ")
    }
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum RawInput {
    Description(RawDescription),
    Tables(Vec<Table>),
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawDescription {
    #[serde(default)]
    schemas: Vec<RawSchema>,
    #[serde(default)]
    tables: Vec<Table>,
    #[serde(default)]
    default_schema: Option<String>,
    #[serde(default)]
    show_schema_prefix: bool,
}

#[derive(Debug, Deserialize)]
struct RawSchema {
    name: String,
    #[serde(default)]
    tables: Vec<Table>,
}

impl RawInput {
    fn into_catalog(self) -> Catalog {
        let raw = match self {
            RawInput::Description(raw) => raw,
            RawInput::Tables(tables) => RawDescription {
                tables,
                ..RawDescription::default()
            },
        };

        let mut catalog = Catalog {
            default_schema: raw.default_schema,
            show_schema_prefix: raw.show_schema_prefix,
            ..Catalog::default()
        };
        for schema in raw.schemas {
            catalog.get_or_create_schema(&schema.name);
            for mut table in schema.tables {
                table.schema.get_or_insert_with(|| schema.name.clone());
                catalog.add_table(table);
            }
        }
        for table in raw.tables {
            catalog.add_table(table);
        }
        catalog
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_qualified_name_parse() {
        let name = QualifiedName::parse("users");
        assert_eq!(name.schema, None);
        assert_eq!(name.name, "users");

        let name = QualifiedName::parse("public.users");
        assert_eq!(name.schema, Some("public".to_string()));
        assert_eq!(name.name, "users");

        let name = QualifiedName::parse("db.hr.employees");
        assert_eq!(name.schema, Some("hr".to_string()));
        assert_eq!(name.name, "employees");
    }

    #[test]
    fn test_catalog_add_table() {
        let mut catalog = Catalog::new();
        catalog.add_table(Table::new("users").in_schema("public"));

        assert!(catalog.table_exists("users"));
        assert!(catalog.table_exists("USERS"));
        assert!(catalog.table_exists("public.users"));
        assert!(!catalog.table_exists("other.users"));
    }

    #[test]
    fn test_from_json_nested() {
        let json = r#"{
            "schemas": [
                {"name": "HR", "tables": [
                    {"name": "EMPLOYEES", "columns": [
                        {"name": "EMP_ID", "dataType": "INTEGER", "isPrimaryKey": true},
                        {"name": "NAME", "nullable": false}
                    ]}
                ]}
            ],
            "defaultSchema": "HR",
            "showSchemaPrefix": true
        }"#;
        let catalog = Catalog::from_json(json).unwrap();
        let table = catalog.get_table("hr.employees").unwrap();
        assert_eq!(table.schema.as_deref(), Some("HR"));
        assert_eq!(table.columns.len(), 2);
        assert_eq!(table.get_column("emp_id").unwrap().is_primary_key, Some(true));
        assert_eq!(catalog.display_name(table), "HR.EMPLOYEES");
        assert_eq!(catalog.schema_names().collect::<Vec<_>>(), vec!["HR"]);
    }

    #[test]
    fn test_from_json_flat_and_bare() {
        let flat = Catalog::from_json(r#"{"tables":[{"name":"EMPLOYEES","columns":[]}]}"#).unwrap();
        assert!(flat.table_exists("employees"));

        let bare = Catalog::from_json(r#"[{"name":"DEPTS","schema":"HR"}]"#).unwrap();
        assert!(bare.table_exists("HR.DEPTS"));
        assert!(bare.table_exists("DEPTS"));
    }

    #[test]
    fn test_from_json_rejects_garbage() {
        assert!(Catalog::from_json("{not json").is_err());
    }

    #[test]
    fn test_from_toml() {
        let source = r#"
            defaultSchema = "APP"

            [[tables]]
            name = "ORDERS"
            schema = "APP"

            [[tables.columns]]
            name = "ORDER_ID"
            dataType = "BIGINT"
        "#;
        let catalog = Catalog::from_toml(source).unwrap();
        let table = catalog.get_table("orders").unwrap();
        assert_eq!(table.columns[0].data_type.as_deref(), Some("BIGINT"));
    }

    #[test]
    fn test_column_summary() {
        let column = Column::new("ID").typed("INTEGER").primary_key();
        assert_eq!(column.summary(), "INTEGER NOT NULL PK");
    }
}
