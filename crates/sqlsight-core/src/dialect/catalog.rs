//! Built-in keyword, function, type and snippet data per dialect

/// A built-in function with its call signature
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FunctionInfo {
    pub name: &'static str,
    pub signature: &'static str,
    pub description: &'static str,
}

/// A statement template; `${n:placeholder}` marks tab stops
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Snippet {
    pub label: &'static str,
    pub template: &'static str,
    pub description: &'static str,
}

/// Static completion data for one dialect
#[derive(Debug)]
pub struct DialectCatalog {
    pub keywords: &'static [&'static str],
    /// Reserved words paired with the release that introduced them
    pub reserved_words: &'static [(&'static str, &'static str)],
    pub system_services: &'static [&'static str],
    pub system_catalogs: &'static [&'static str],
    pub system_objects: &'static [&'static str],
    pub functions: &'static [FunctionInfo],
    pub data_types: &'static [&'static str],
    pub snippets: &'static [Snippet],
}

impl DialectCatalog {
    /// Functions shared by every dialect followed by the dialect's own
    pub fn all_functions(&self) -> impl Iterator<Item = &FunctionInfo> {
        COMMON_FUNCTIONS.iter().chain(self.functions.iter())
    }

    /// Templates shared by every dialect followed by the dialect's own
    pub fn all_snippets(&self) -> impl Iterator<Item = &Snippet> {
        COMMON_SNIPPETS.iter().chain(self.snippets.iter())
    }

    pub fn function(&self, name: &str) -> Option<&FunctionInfo> {
        self.all_functions()
            .find(|f| f.name.eq_ignore_ascii_case(name))
    }
}

macro_rules! function {
    ($name:literal, $signature:literal, $description:literal) => {
        FunctionInfo {
            name: $name,
            signature: $signature,
            description: $description,
        }
    };
}

macro_rules! snippet {
    ($label:literal, $template:literal, $description:literal) => {
        Snippet {
            label: $label,
            template: $template,
            description: $description,
        }
    };
}

const COMMON_KEYWORDS: &[&str] = &[
    "SELECT", "FROM", "WHERE", "AND", "OR", "NOT", "IN", "EXISTS", "BETWEEN", "LIKE", "IS",
    "NULL", "AS", "JOIN", "INNER JOIN", "LEFT JOIN", "RIGHT JOIN", "FULL OUTER JOIN",
    "CROSS JOIN", "ON", "USING", "GROUP BY", "ORDER BY", "HAVING", "DISTINCT", "UNION",
    "UNION ALL", "EXCEPT", "INTERSECT", "CASE", "WHEN", "THEN", "ELSE", "END", "WITH",
    "INSERT INTO", "VALUES", "UPDATE", "SET", "DELETE FROM", "ASC", "DESC",
];

const COMMON_FUNCTIONS: &[FunctionInfo] = &[
    function!("COUNT", "COUNT(expression)", "Number of rows or non-null values"),
    function!("SUM", "SUM(expression)", "Sum of the values"),
    function!("AVG", "AVG(expression)", "Average of the values"),
    function!("MIN", "MIN(expression)", "Smallest value"),
    function!("MAX", "MAX(expression)", "Largest value"),
    function!("COALESCE", "COALESCE(value, fallback, ...)", "First non-null argument"),
    function!("NULLIF", "NULLIF(a, b)", "NULL when both arguments are equal"),
    function!("UPPER", "UPPER(text)", "Upper-case copy of the text"),
    function!("LOWER", "LOWER(text)", "Lower-case copy of the text"),
    function!("TRIM", "TRIM(text)", "Text without leading and trailing blanks"),
    function!("SUBSTRING", "SUBSTRING(text FROM start FOR length)", "Part of a string"),
    function!("CAST", "CAST(expression AS type)", "Convert a value to another type"),
    function!("ROW_NUMBER", "ROW_NUMBER() OVER (...)", "Sequential row number in the window"),
];

const COMMON_SNIPPETS: &[Snippet] = &[
    snippet!(
        "sel",
        "SELECT ${1:*}\nFROM ${2:table}\nWHERE ${3:condition}",
        "SELECT statement"
    ),
    snippet!(
        "cte",
        "WITH ${1:name} AS (\n    SELECT ${2:*}\n    FROM ${3:table}\n)\nSELECT *\nFROM ${1:name}",
        "Common table expression"
    ),
    snippet!(
        "ins",
        "INSERT INTO ${1:table} (${2:columns})\nVALUES (${3:values})",
        "INSERT statement"
    ),
    snippet!(
        "upd",
        "UPDATE ${1:table}\nSET ${2:column} = ${3:value}\nWHERE ${4:condition}",
        "UPDATE statement"
    ),
    snippet!(
        "case",
        "CASE\n    WHEN ${1:condition} THEN ${2:result}\n    ELSE ${3:other}\nEND",
        "CASE expression"
    ),
];

pub(super) static POSTGRESQL: DialectCatalog = DialectCatalog {
    keywords: COMMON_KEYWORDS,
    reserved_words: &[
        ("LATERAL", "9.3"),
        ("TABLESAMPLE", "9.5"),
        ("MATERIALIZED", "12"),
        ("MERGE", "15"),
    ],
    system_services: &["pg_stat_activity", "pg_locks", "pg_stat_statements"],
    system_catalogs: &["pg_catalog", "information_schema"],
    system_objects: &["pg_class", "pg_namespace", "pg_attribute", "pg_index", "pg_proc"],
    functions: &[
        function!("NOW", "NOW()", "Current date and time"),
        function!("DATE_TRUNC", "DATE_TRUNC(field, source)", "Timestamp truncated to a precision"),
        function!("STRING_AGG", "STRING_AGG(expression, delimiter)", "Values joined into a string"),
        function!("JSONB_BUILD_OBJECT", "JSONB_BUILD_OBJECT(key, value, ...)", "Build a JSONB object"),
        function!("GENERATE_SERIES", "GENERATE_SERIES(start, stop, step)", "Set of values from start to stop"),
    ],
    data_types: &[
        "INTEGER", "BIGINT", "SMALLINT", "NUMERIC", "REAL", "DOUBLE PRECISION", "TEXT",
        "VARCHAR", "CHAR", "BOOLEAN", "DATE", "TIMESTAMP", "TIMESTAMPTZ", "INTERVAL", "UUID",
        "JSONB", "BYTEA", "SERIAL",
    ],
    snippets: &[snippet!(
        "upsert",
        "INSERT INTO ${1:table} (${2:columns})\nVALUES (${3:values})\nON CONFLICT (${4:key}) DO UPDATE SET ${5:column} = EXCLUDED.${5:column}",
        "INSERT ... ON CONFLICT"
    )],
};

pub(super) static MYSQL: DialectCatalog = DialectCatalog {
    keywords: COMMON_KEYWORDS,
    reserved_words: &[
        ("GENERATED", "5.7"),
        ("LATERAL", "8.0.14"),
        ("RECURSIVE", "8.0"),
        ("WINDOW", "8.0"),
    ],
    system_services: &["performance_schema", "sys"],
    system_catalogs: &["information_schema", "mysql"],
    system_objects: &["TABLES", "COLUMNS", "STATISTICS", "ROUTINES"],
    functions: &[
        function!("NOW", "NOW()", "Current date and time"),
        function!("IFNULL", "IFNULL(value, fallback)", "Fallback when the value is NULL"),
        function!("GROUP_CONCAT", "GROUP_CONCAT(expression SEPARATOR sep)", "Values joined into a string"),
        function!("DATE_FORMAT", "DATE_FORMAT(date, format)", "Format a date as text"),
        function!("JSON_EXTRACT", "JSON_EXTRACT(doc, path)", "Value at a JSON path"),
    ],
    data_types: &[
        "INT", "BIGINT", "TINYINT", "DECIMAL", "DOUBLE", "VARCHAR", "CHAR", "TEXT", "DATE",
        "DATETIME", "TIMESTAMP", "JSON", "BLOB", "ENUM",
    ],
    snippets: &[snippet!(
        "upsert",
        "INSERT INTO ${1:table} (${2:columns})\nVALUES (${3:values})\nON DUPLICATE KEY UPDATE ${4:column} = VALUES(${4:column})",
        "INSERT ... ON DUPLICATE KEY UPDATE"
    )],
};

pub(super) static DB2: DialectCatalog = DialectCatalog {
    keywords: COMMON_KEYWORDS,
    reserved_words: &[
        ("FETCH FIRST", "7.1"),
        ("MERGE", "7.1"),
        ("OFFSET", "7.2"),
        ("LIMIT", "7.3"),
    ],
    system_services: &[
        "QSYS2.ACTIVE_JOB_INFO",
        "QSYS2.SYSTEM_STATUS_INFO",
        "QSYS2.JOBLOG_INFO",
        "QSYS2.OBJECT_STATISTICS",
    ],
    system_catalogs: &["QSYS2", "SYSIBM", "SYSCAT"],
    system_objects: &["SYSTABLES", "SYSCOLUMNS", "SYSINDEXES", "SYSROUTINES", "SYSDUMMY1"],
    functions: &[
        function!("CURRENT_TIMESTAMP", "CURRENT_TIMESTAMP", "Current date and time"),
        function!("VARCHAR_FORMAT", "VARCHAR_FORMAT(expression, format)", "Format a value as text"),
        function!("DIGITS", "DIGITS(expression)", "Character representation of a number"),
        function!("LISTAGG", "LISTAGG(expression, delimiter)", "Values joined into a string"),
        function!("DAYS", "DAYS(expression)", "Day number of a date"),
    ],
    data_types: &[
        "INTEGER", "BIGINT", "SMALLINT", "DECIMAL", "NUMERIC", "DOUBLE", "CHAR", "VARCHAR",
        "CLOB", "GRAPHIC", "DATE", "TIME", "TIMESTAMP", "BLOB",
    ],
    snippets: &[snippet!(
        "fetch",
        "SELECT ${1:*}\nFROM ${2:table}\nFETCH FIRST ${3:10} ROWS ONLY",
        "SELECT with FETCH FIRST"
    )],
};
