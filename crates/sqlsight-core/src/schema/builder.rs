//! Schema builder - converts SQL DDL to a Catalog

use sqlparser::ast::{
    AlterTableOperation, ColumnDef as AstColumnDef, ColumnOption, CommentObject, ObjectName,
    Query, SelectItem, SetExpr, Statement, TableConstraint, TableFactor,
};
use sqlparser::parser::Parser;
use tracing::{debug, warn};

use crate::dialect::SqlDialect;
use crate::error::SchemaError;
use crate::schema::{Catalog, Column, QualifiedName, Table};

/// Builder for constructing a Catalog from SQL schema definitions
pub struct SchemaBuilder {
    catalog: Catalog,
    dialect: SqlDialect,
}

impl SchemaBuilder {
    pub fn new() -> Self {
        Self::with_dialect(SqlDialect::default())
    }

    pub fn with_dialect(dialect: SqlDialect) -> Self {
        let mut catalog = Catalog::new();
        let default_schema = dialect.default_schema();
        if !default_schema.is_empty() {
            catalog.default_schema = Some(default_schema.to_string());
        }
        Self { catalog, dialect }
    }

    /// Parse SQL schema definitions into the catalog.
    ///
    /// Returns the number of statements that were understood. Fails only when
    /// the text is non-empty and not a single statement could be parsed.
    pub fn parse(&mut self, sql: &str) -> Result<usize, SchemaError> {
        let dialect = self.dialect.parser_dialect();

        // Try parsing the entire SQL first (fast path)
        let processed = match Parser::parse_sql(dialect.as_ref(), sql) {
            Ok(statements) => {
                for stmt in &statements {
                    self.process_statement(stmt);
                }
                statements.len()
            }
            Err(e) => {
                debug!(error = %e, "falling back to statement-by-statement DDL parsing");
                let processed = self.parse_statements_individually(sql);
                if processed == 0 && !sql.trim().is_empty() {
                    return Err(SchemaError::Ddl(e.to_string()));
                }
                processed
            }
        };

        Ok(processed)
    }

    /// Parse SQL statements individually, skipping those that fail to parse
    /// (functions, triggers, grants and other syntax the parser rejects).
    fn parse_statements_individually(&mut self, sql: &str) -> usize {
        let dialect = self.dialect.parser_dialect();
        let mut processed = 0;

        for raw_stmt in split_sql_statements(sql) {
            let trimmed = raw_stmt.trim();
            if trimmed.is_empty() {
                continue;
            }

            match Parser::parse_sql(dialect.as_ref(), trimmed) {
                Ok(stmts) => {
                    for stmt in &stmts {
                        self.process_statement(stmt);
                    }
                    processed += stmts.len();
                }
                Err(e) => {
                    debug!(error = %e, "skipping unparseable DDL statement");
                }
            }
        }

        processed
    }

    /// Process a single SQL statement
    fn process_statement(&mut self, stmt: &Statement) {
        match stmt {
            Statement::CreateTable(create) => {
                self.process_create_table(create);
            }
            Statement::CreateView {
                name,
                columns,
                query,
                materialized,
                ..
            } => {
                self.process_create_view(name, columns, query, *materialized);
            }
            Statement::AlterTable {
                name, operations, ..
            } => {
                self.process_alter_table(name, operations);
            }
            Statement::Comment {
                object_type,
                object_name,
                comment,
                ..
            } => {
                self.process_comment(object_type, object_name, comment.as_deref());
            }
            _ => {}
        }
    }

    /// Process CREATE TABLE statement
    fn process_create_table(&mut self, create: &sqlparser::ast::CreateTable) {
        let mut table = table_from_name(&create.name);

        for column in &create.columns {
            table.columns.push(column_from_ast(column));
        }

        for constraint in &create.constraints {
            if let TableConstraint::PrimaryKey { columns, .. } = constraint {
                mark_primary_key(&mut table, columns);
            }
        }

        debug!(table = %table.qualified_name(), columns = table.columns.len(), "loaded table");
        self.catalog.add_table(table);
    }

    /// Process CREATE VIEW statement
    fn process_create_view(
        &mut self,
        name: &ObjectName,
        columns: &[sqlparser::ast::ViewColumnDef],
        query: &Query,
        materialized: bool,
    ) {
        let mut view = table_from_name(name);
        view.table_type = Some(if materialized {
            "materialized view".to_string()
        } else {
            "view".to_string()
        });

        // Determine column names: explicit column list or inferred from SELECT
        let column_names = if !columns.is_empty() {
            columns.iter().map(|c| c.name.value.clone()).collect()
        } else {
            self.infer_view_columns(&query.body)
        };
        view.columns = column_names.into_iter().map(Column::new).collect();

        self.catalog.add_table(view);
    }

    /// Infer column names from a SELECT body for VIEW definition
    fn infer_view_columns(&self, set_expr: &SetExpr) -> Vec<String> {
        use sqlparser::ast::Expr;

        let mut columns = Vec::new();

        match set_expr {
            SetExpr::SetOperation { left, .. } => return self.infer_view_columns(left),
            SetExpr::Select(select) => {
                for item in &select.projection {
                    match item {
                        SelectItem::UnnamedExpr(Expr::Identifier(ident)) => {
                            columns.push(ident.value.clone());
                        }
                        SelectItem::ExprWithAlias { alias, .. } => {
                            columns.push(alias.value.clone());
                        }
                        SelectItem::UnnamedExpr(Expr::CompoundIdentifier(idents)) => {
                            if let Some(col) = idents.last() {
                                columns.push(col.value.clone());
                            }
                        }
                        SelectItem::Wildcard(_) => {
                            // Expand * by looking up FROM tables in the catalog
                            for table_with_joins in &select.from {
                                self.expand_wildcard_columns(
                                    &table_with_joins.relation,
                                    &mut columns,
                                );
                                for join in &table_with_joins.joins {
                                    self.expand_wildcard_columns(&join.relation, &mut columns);
                                }
                            }
                        }
                        SelectItem::QualifiedWildcard(name, _) => {
                            if let Some(table) = self.catalog.get_table(&object_name_to_string(name)) {
                                columns.extend(table.columns.iter().map(|c| c.name.clone()));
                            }
                        }
                        _ => {}
                    }
                }
            }
            _ => {}
        }

        columns
    }

    /// Expand wildcard columns from a table factor
    fn expand_wildcard_columns(&self, factor: &TableFactor, columns: &mut Vec<String>) {
        if let TableFactor::Table { name, .. } = factor {
            if let Some(table) = self.catalog.get_table(&object_name_to_string(name)) {
                columns.extend(table.columns.iter().map(|c| c.name.clone()));
            }
        }
    }

    /// Process ALTER TABLE statement
    fn process_alter_table(&mut self, name: &ObjectName, operations: &[AlterTableOperation]) {
        let table_name = object_name_to_string(name);
        let Some(table) = self.catalog.get_table_mut(&table_name) else {
            warn!(
                table = %table_name,
                "ALTER TABLE references a table not found in schema"
            );
            return;
        };

        for operation in operations {
            match operation {
                AlterTableOperation::AddColumn { column_def, .. } => {
                    table.columns.push(column_from_ast(column_def));
                }
                AlterTableOperation::DropColumn { column_name, .. } => {
                    table
                        .columns
                        .retain(|c| !c.name.eq_ignore_ascii_case(&column_name.value));
                }
                AlterTableOperation::RenameColumn {
                    old_column_name,
                    new_column_name,
                } => {
                    if let Some(col) = table.get_column_mut(&old_column_name.value) {
                        col.name = new_column_name.value.clone();
                    }
                }
                AlterTableOperation::AddConstraint(TableConstraint::PrimaryKey {
                    columns, ..
                }) => {
                    mark_primary_key(table, columns);
                }
                _ => {
                    // Other ALTER TABLE operations do not change what the editor shows
                }
            }
        }
    }

    /// Process COMMENT ON TABLE / COMMENT ON COLUMN
    fn process_comment(
        &mut self,
        object_type: &CommentObject,
        object_name: &ObjectName,
        comment: Option<&str>,
    ) {
        let description = comment.map(str::to_string);
        let full = object_name_to_string(object_name);
        match object_type {
            CommentObject::Table => {
                if let Some(table) = self.catalog.get_table_mut(&full) {
                    table.description = description;
                }
            }
            CommentObject::Column => {
                let Some((table_name, column_name)) = full.rsplit_once('.') else {
                    return;
                };
                if let Some(col) = self
                    .catalog
                    .get_table_mut(table_name)
                    .and_then(|t| t.get_column_mut(column_name))
                {
                    col.description = description;
                }
            }
            _ => {}
        }
    }

    /// Consume the builder and return the catalog
    pub fn build(self) -> Catalog {
        self.catalog
    }

    /// Get a reference to the current catalog
    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }
}

impl Default for SchemaBuilder {
    fn default() -> Self {
        Self::new()
    }
}

fn table_from_name(name: &ObjectName) -> Table {
    let qualified = QualifiedName::parse(&object_name_to_string(name));
    Table {
        name: qualified.name,
        schema: qualified.schema,
        table_type: Some("table".to_string()),
        ..Table::default()
    }
}

fn mark_primary_key(table: &mut Table, columns: &[sqlparser::ast::Ident]) {
    for ident in columns {
        if let Some(col) = table.get_column_mut(&ident.value) {
            col.is_primary_key = Some(true);
            col.nullable = Some(false);
        }
    }
}

fn column_from_ast(column: &AstColumnDef) -> Column {
    let mut col = Column::new(&column.name.value).typed(column.data_type.to_string());
    col.nullable = Some(true);

    for option in &column.options {
        match &option.option {
            ColumnOption::Null => col.nullable = Some(true),
            ColumnOption::NotNull => col.nullable = Some(false),
            ColumnOption::Unique { is_primary, .. } if *is_primary => {
                col.is_primary_key = Some(true);
                col.nullable = Some(false);
            }
            ColumnOption::Comment(text) => col.description = Some(text.clone()),
            _ => {}
        }
    }

    col
}

/// Dotted name with identifier quotes removed
fn object_name_to_string(name: &ObjectName) -> String {
    name.0
        .iter()
        .map(|ident| ident.value.as_str())
        .collect::<Vec<_>>()
        .join(".")
}

/// Split SQL text into individual statements by semicolons,
/// respecting string literals and dollar-quoted strings.
fn split_sql_statements(sql: &str) -> Vec<&str> {
    let mut statements = Vec::new();
    let mut start = 0;
    let bytes = sql.as_bytes();
    let len = bytes.len();
    let mut i = 0;

    while i < len {
        match bytes[i] {
            b'\'' => {
                // Skip single-quoted string
                i += 1;
                while i < len {
                    if bytes[i] == b'\'' {
                        i += 1;
                        if i < len && bytes[i] == b'\'' {
                            i += 1; // escaped quote ''
                        } else {
                            break;
                        }
                    } else {
                        i += 1;
                    }
                }
            }
            b'$' => {
                // Check for dollar-quoted string ($$...$$ or $tag$...$tag$)
                if let Some(tag_end) = find_dollar_tag_end(sql, i) {
                    let tag = &sql[i..=tag_end];
                    i = tag_end + 1;
                    if let Some(close_pos) = sql[i..].find(tag) {
                        i += close_pos + tag.len();
                    } else {
                        i = len; // unterminated, consume rest
                    }
                } else {
                    i += 1;
                }
            }
            b'-' if i + 1 < len && bytes[i + 1] == b'-' => {
                while i < len && bytes[i] != b'\n' {
                    i += 1;
                }
            }
            b'/' if i + 1 < len && bytes[i + 1] == b'*' => {
                i += 2;
                while i + 1 < len {
                    if bytes[i] == b'*' && bytes[i + 1] == b'/' {
                        i += 2;
                        break;
                    }
                    i += 1;
                }
            }
            b';' => {
                let stmt = &sql[start..i];
                if !stmt.trim().is_empty() {
                    statements.push(stmt);
                }
                start = i + 1;
                i += 1;
            }
            _ => {
                i += 1;
            }
        }
    }

    let last = &sql[start.min(len)..];
    if !last.trim().is_empty() {
        statements.push(last);
    }

    statements
}

/// Find the end of a dollar-quote tag starting at position `start`.
/// Returns the index of the closing `$` if a valid tag is found.
fn find_dollar_tag_end(sql: &str, start: usize) -> Option<usize> {
    let bytes = sql.as_bytes();
    let len = bytes.len();
    let mut i = start + 1;
    if i < len && bytes[i] == b'$' {
        return Some(i); // $$ tag
    }
    while i < len && (bytes[i].is_ascii_alphanumeric() || bytes[i] == b'_') {
        i += 1;
    }
    if i < len && bytes[i] == b'$' {
        Some(i)
    } else {
        None
    }
}
