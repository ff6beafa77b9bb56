// Integration tests for diagnostics, subquery extraction and schema loading
use pretty_assertions::assert_eq;
use sqlsight_core::{
    parse_subqueries, sanitize, validate, Analyzer, Catalog, DiagnosticKind, SchemaBuilder,
    Severity, SqlDialect,
};

fn employees_catalog() -> Catalog {
    Catalog::from_json(
        r#"{"tables": [{"name": "EMPLOYEES", "columns": [{"name": "EMP_ID"}, {"name": "NAME"}]}]}"#,
    )
    .unwrap()
}

fn setup_catalog() -> Catalog {
    let schema_sql = r#"
            CREATE TABLE users (
                id SERIAL PRIMARY KEY,
                name VARCHAR(100) NOT NULL,
                email TEXT
            );

            CREATE TABLE orders (
                id SERIAL PRIMARY KEY,
                user_id INTEGER NOT NULL,
                total DECIMAL(10, 2)
            );

            COMMENT ON TABLE orders IS 'Customer orders';
            COMMENT ON COLUMN orders.total IS 'Order total in cents';

            CREATE VIEW big_orders AS SELECT id, total FROM orders WHERE total > 100;
        "#;

    let mut builder = SchemaBuilder::new();
    builder.parse(schema_sql).unwrap();
    builder.build()
}

#[test]
fn test_sanitize_preserves_length() {
    let inputs = [
        "",
        "SELECT 1",
        "SELECT 'abc",
        "SELECT /* open",
        "SELECT 'héllo wörld' -- ☃ comment\nFROM t",
        "/* a /* b */ c */ SELECT \"quoted\" FROM `t`",
    ];
    for text in inputs {
        assert_eq!(sanitize(text).len(), text.len(), "{text:?}");
    }
}

#[test]
fn test_single_subquery_extraction() {
    let parsed = parse_subqueries("WITH A AS (SELECT X, Y FROM T)");
    assert_eq!(parsed.len(), 1);
    let names: Vec<_> = parsed[0].columns.iter().map(|c| c.name.as_str()).collect();
    assert_eq!(parsed[0].name, "A");
    assert_eq!(names, vec!["X", "Y"]);
    assert_eq!(parsed[0].from_tables, vec!["T"]);
}

#[test]
fn test_unclosed_string_is_one_error_at_the_quote() {
    let diagnostics = validate("SELECT 'abc", None);
    assert_eq!(diagnostics.len(), 1);
    assert_eq!(diagnostics[0].kind, DiagnosticKind::UnclosedString);
    assert_eq!(diagnostics[0].severity, Severity::Error);
    assert_eq!(diagnostics[0].span.offset, 7);
}

#[test]
fn test_parenthesis_balance() {
    let diagnostics = validate("SELECT * FROM (T", None);
    assert_eq!(diagnostics.len(), 1);
    assert_eq!(diagnostics[0].kind, DiagnosticKind::UnclosedParenthesis);
    assert_eq!(diagnostics[0].span.offset, 14);

    let diagnostics = validate("SELECT * FROM T)", None);
    assert_eq!(diagnostics.len(), 1);
    assert_eq!(
        diagnostics[0].kind,
        DiagnosticKind::UnexpectedClosingParenthesis
    );
}

#[test]
fn test_comma_before_from() {
    let diagnostics = validate("SELECT a, FROM t", None);
    assert_eq!(diagnostics.len(), 1);
    assert_eq!(diagnostics[0].message, "unexpected comma before FROM");
    assert_eq!(diagnostics[0].code(), "E1004");
}

#[test]
fn test_unknown_table_and_column_are_warnings() {
    let catalog = employees_catalog();

    let diagnostics = validate("SELECT * FROM DEPTS", Some(&catalog));
    assert_eq!(diagnostics.len(), 1);
    assert_eq!(diagnostics[0].severity, Severity::Warning);
    assert_eq!(diagnostics[0].message, "unknown table: DEPTS");

    assert!(validate("SELECT * FROM EMPLOYEES", Some(&catalog)).is_empty());

    let diagnostics = validate("SELECT E.SALARY FROM EMPLOYEES E", Some(&catalog));
    assert_eq!(diagnostics.len(), 1);
    assert_eq!(diagnostics[0].severity, Severity::Warning);
    assert!(diagnostics[0].message.contains("SALARY"));
    assert!(diagnostics[0].message.contains("table EMPLOYEES"));
}

#[test]
fn test_unknown_column_in_subquery() {
    let catalog = employees_catalog();
    let diagnostics = validate(
        "WITH A AS (SELECT EMP_ID FROM EMPLOYEES) SELECT A.NAME FROM A",
        Some(&catalog),
    );
    assert_eq!(diagnostics.len(), 1);
    assert_eq!(diagnostics[0].kind, DiagnosticKind::UnknownColumn);
    assert!(diagnostics[0]
        .message
        .starts_with("unknown column NAME in subquery A"));
}

#[test]
fn test_wildcard_subquery_exposes_table_columns() {
    let catalog = employees_catalog();
    let text = "WITH A AS (SELECT * FROM EMPLOYEES), B AS (SELECT NAME FROM A) \
                SELECT B.NAME, A.EMP_ID FROM B JOIN A ON 1 = 1";
    assert!(validate(text, Some(&catalog)).is_empty());
}

#[test]
fn test_unqualified_column_in_main_query() {
    let catalog = employees_catalog();
    let text = "WITH A AS (SELECT EMP_ID FROM EMPLOYEES) SELECT EMP_ID, SALARY FROM A";
    let diagnostics = validate(text, Some(&catalog));
    assert_eq!(diagnostics.len(), 1);
    assert_eq!(
        diagnostics[0].message,
        "unknown column SALARY in subquery A (available: EMP_ID)"
    );
}

#[test]
fn test_unqualified_column_in_subquery_reading_a_subquery() {
    let catalog = employees_catalog();
    let text = "WITH A AS (SELECT EMP_ID FROM EMPLOYEES), B AS (SELECT SALARY FROM A) \
                SELECT * FROM B";
    let messages: Vec<_> = validate(text, Some(&catalog))
        .into_iter()
        .map(|d| d.message)
        .collect();
    assert_eq!(
        messages,
        vec!["unknown column SALARY in subquery A (available: EMP_ID)"]
    );

    // Bodies reading only schema tables are left alone
    let text = "WITH A AS (SELECT SALARY FROM EMPLOYEES) SELECT * FROM A";
    assert!(validate(text, Some(&catalog)).is_empty());
}

#[test]
fn test_cast_target_type_is_not_a_column() {
    let catalog = employees_catalog();
    let text = "WITH A AS (SELECT EMP_ID FROM EMPLOYEES) SELECT EMP_ID::text FROM A";
    assert!(validate(text, Some(&catalog)).is_empty());

    let text = "WITH A AS (SELECT EMP_ID FROM EMPLOYEES) SELECT EMP_ID, uuid FROM A";
    let mut analyzer = Analyzer::with_catalog(&catalog).with_dialect(SqlDialect::PostgreSQL);
    assert!(analyzer.analyze(text).is_empty());
}

#[test]
fn test_implicit_select_alias_is_not_a_column() {
    let catalog = employees_catalog();
    let text = "WITH A AS (SELECT EMP_ID FROM EMPLOYEES) \
                SELECT COUNT(*) cnt FROM A ORDER BY cnt";
    assert!(validate(text, Some(&catalog)).is_empty());

    let text = "WITH A AS (SELECT EMP_ID FROM EMPLOYEES) \
                SELECT COUNT(*) cnt FROM A ORDER BY total";
    let diagnostics = validate(text, Some(&catalog));
    assert_eq!(diagnostics.len(), 1);
    assert!(diagnostics[0].message.starts_with("unknown column total"));
}

#[test]
fn test_ddl_schema_loading() {
    let catalog = setup_catalog();

    let users = catalog.get_table("users").unwrap();
    assert_eq!(users.column_names(), vec!["id", "name", "email"]);
    assert_eq!(users.get_column("id").unwrap().is_primary_key, Some(true));
    assert_eq!(users.get_column("name").unwrap().nullable, Some(false));

    let orders = catalog.get_table("orders").unwrap();
    assert_eq!(orders.description.as_deref(), Some("Customer orders"));
    assert_eq!(
        orders.get_column("total").unwrap().description.as_deref(),
        Some("Order total in cents")
    );

    let view = catalog.get_table("big_orders").unwrap();
    assert_eq!(view.kind_label(), "view");
    assert_eq!(view.column_names(), vec!["id", "total"]);
}

#[test]
fn test_json_schema_nested_and_flat() {
    let nested = Catalog::from_json(
        r#"{
            "defaultSchema": "HR",
            "schemas": [
                {"name": "HR", "tables": [{"name": "EMPLOYEES", "columns": [{"name": "EMP_ID", "dataType": "INTEGER"}]}]}
            ]
        }"#,
    )
    .unwrap();
    assert_eq!(
        nested.get_table("HR.EMPLOYEES").unwrap().columns[0]
            .data_type
            .as_deref(),
        Some("INTEGER")
    );

    let flat = Catalog::from_json(r#"[{"name": "DEPTS", "columns": [{"name": "ID"}]}]"#).unwrap();
    assert!(flat.table_exists("depts"));
}

#[test]
fn test_analyzer_against_ddl_catalog() {
    let catalog = setup_catalog();
    let mut analyzer = Analyzer::with_catalog(&catalog);

    assert!(analyzer
        .analyze("SELECT u.id, o.total FROM users u JOIN orders o ON o.user_id = u.id")
        .is_empty());

    let diagnostics = analyzer.analyze("SELECT o.totl FROM orders o");
    assert_eq!(diagnostics.len(), 1);
    assert_eq!(diagnostics[0].help.as_deref(), Some("did you mean 'total'?"));
}

#[test]
fn test_dialect_builder_sets_default_schema() {
    let mut builder = SchemaBuilder::with_dialect(SqlDialect::PostgreSQL);
    builder.parse("CREATE TABLE t (a INT);").unwrap();
    let catalog = builder.build();
    assert_eq!(catalog.default_schema.as_deref(), Some("public"));
    assert!(catalog.table_exists("public.t"));
}

#[test]
fn test_analysis_never_fails_on_garbage() {
    let catalog = setup_catalog();
    for text in ["(((", "WITH", "WITH a AS (", "SELECT .. , , FROM", "'", "*/ */ /*"] {
        let _ = validate(text, Some(&catalog));
        let _ = parse_subqueries(text);
    }
}
