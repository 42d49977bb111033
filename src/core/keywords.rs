// postgres keyword and function tables
// built once, read-only afterwards, shared by every analysis

use super::types::QueryCategory;
use std::collections::{HashMap, HashSet};
use std::sync::LazyLock;

const DDL_KEYWORDS: &[&str] = &["CREATE", "ALTER", "DROP", "TRUNCATE", "COMMENT", "RENAME"];

const DML_KEYWORDS: &[&str] = &[
    "SELECT", "INSERT", "UPDATE", "DELETE", "MERGE", "WITH", "VALUES", "TABLE",
];

const DCL_KEYWORDS: &[&str] = &["GRANT", "REVOKE"];

const TCL_KEYWORDS: &[&str] = &[
    "BEGIN", "COMMIT", "ROLLBACK", "SAVEPOINT", "RELEASE", "START", "END", "ABORT",
];

const UTILITY_KEYWORDS: &[&str] = &[
    "EXPLAIN", "ANALYZE", "ANALYSE", "VACUUM", "COPY", "SET", "SHOW", "RESET", "LISTEN",
    "NOTIFY", "UNLISTEN", "LOCK", "CLUSTER", "REINDEX", "CHECKPOINT", "DISCARD", "LOAD", "DO",
    "CALL", "PREPARE", "EXECUTE", "DEALLOCATE", "REFRESH", "SECURITY", "IMPORT",
];

// typos that look like a function call but are really a broken statement
const MALFORMED_KEYWORDS: &[&str] = &[
    "SELET", "SLECT", "SELCT", "SEELCT", "FORM", "FRM", "WHRE", "WEHRE", "INSRT", "INSER",
    "UPDTE", "UDPATE", "DELTE", "DELET", "CRATE", "CREAT", "DRPO", "ALTR",
];

// words that are followed by "(" in plain sql without being a function call
const RESERVED_WORDS: &[&str] = &[
    "ALL", "AND", "ANY", "ARRAY", "AS", "ASC", "BETWEEN", "BY", "CASE", "CHECK", "COLUMN",
    "CONFLICT", "CONSTRAINT", "CREATE", "CROSS", "CUBE", "DEFAULT", "DELETE", "DESC", "DISTINCT",
    "DO", "ELSE", "END", "EXCEPT", "EXISTS", "FILTER", "FOREIGN", "FROM", "FULL", "GROUP",
    "GROUPING", "HAVING", "IN", "INCLUDE", "INDEX", "INNER", "INSERT", "INTERSECT", "INTO", "IS",
    "JOIN", "KEY", "LATERAL", "LIKE", "LIMIT", "NOT", "NULL", "OF", "OFFSET", "ON",
    "ONLY", "OR", "ORDER", "OUTER", "OVER", "PARTITION", "PRIMARY", "RECURSIVE", "REFERENCES",
    "RETURNING", "RETURNS", "ROLLUP", "ROW", "SELECT", "SET", "SETS", "TABLE", "THEN",
    "UNION", "UNIQUE", "UPDATE", "USING", "VALUES", "VIEW", "WHEN", "WHERE", "WINDOW", "WITH",
    "WITHIN",
];

// type names that take a length/precision modifier
const TYPE_NAMES: &[&str] = &[
    "VARCHAR", "CHAR", "CHARACTER", "VARYING", "NUMERIC", "DECIMAL", "FLOAT", "BIT", "VARBIT",
    "TIMESTAMP", "TIMESTAMPTZ", "TIME", "TIMETZ", "INTERVAL",
];

const AGGREGATE_FUNCTIONS: &[&str] = &[
    "count", "sum", "avg", "min", "max", "array_agg", "string_agg", "json_agg", "jsonb_agg",
    "json_object_agg", "jsonb_object_agg", "bool_and", "bool_or", "every", "bit_and", "bit_or",
    "stddev", "stddev_pop", "stddev_samp", "variance", "var_pop", "var_samp", "mode",
    "percentile_cont", "percentile_disc", "corr", "covar_pop", "covar_samp",
];

const WINDOW_FUNCTIONS: &[&str] = &[
    "row_number", "rank", "dense_rank", "percent_rank", "cume_dist", "ntile", "lag", "lead",
    "first_value", "last_value", "nth_value",
];

const BUILTIN_FUNCTIONS: &[&str] = &[
    "abs", "ceil", "ceiling", "floor", "round", "trunc", "mod", "power", "sqrt", "random",
    "greatest", "least", "coalesce", "nullif", "length", "char_length", "lower", "upper",
    "trim", "ltrim", "rtrim", "btrim", "substring", "substr", "replace", "concat", "concat_ws",
    "left", "right", "lpad", "rpad", "position", "strpos", "split_part", "initcap", "reverse",
    "format", "regexp_replace", "regexp_match", "regexp_matches", "md5", "now",
    "current_date", "current_time", "current_timestamp", "localtimestamp", "date_trunc",
    "date_part", "extract", "age", "to_char", "to_date", "to_timestamp", "to_number",
    "make_date", "make_interval", "cast", "json_build_object", "jsonb_build_object",
    "json_build_array", "jsonb_build_array", "to_json", "to_jsonb", "jsonb_set",
    "jsonb_array_elements", "json_array_elements", "jsonb_each", "json_each", "array_length",
    "array_to_string", "string_to_array", "unnest", "generate_series", "gen_random_uuid",
    "uuid_generate_v4",
];

// functions with file system, process, or cross-session side effects
const DANGEROUS_FUNCTIONS: &[&str] = &[
    "pg_read_file", "pg_read_binary_file", "pg_ls_dir", "pg_stat_file", "pg_ls_logdir",
    "pg_ls_waldir", "pg_file_write", "pg_file_rename", "pg_file_unlink", "lo_import",
    "lo_export", "lo_unlink", "pg_terminate_backend", "pg_cancel_backend", "pg_reload_conf",
    "pg_rotate_logfile", "pg_promote", "pg_switch_wal", "pg_create_restore_point",
    "pg_start_backup", "pg_stop_backup", "pg_backup_start", "pg_backup_stop", "dblink",
    "dblink_exec", "dblink_connect", "set_config", "pg_sleep", "pg_advisory_lock",
    "pg_drop_replication_slot", "pg_create_logical_replication_slot",
];

const SYSTEM_SCHEMAS: &[&str] = &["pg_catalog", "information_schema", "pg_toast", "pg_temp"];

// catalog tables that do not carry the pg_ prefix
const SYSTEM_CATALOGS: &[&str] = &["tables", "columns", "schemata", "routines", "table_privileges"];

pub struct Keywords {
    categories: HashMap<&'static str, QueryCategory>,
    malformed: HashSet<&'static str>,
    reserved: HashSet<&'static str>,
    types: HashSet<&'static str>,
    aggregates: HashSet<&'static str>,
    windows: HashSet<&'static str>,
    builtins: HashSet<&'static str>,
    dangerous: HashSet<&'static str>,
    system_schemas: HashSet<&'static str>,
    system_catalogs: HashSet<&'static str>,
}

static KEYWORDS: LazyLock<Keywords> = LazyLock::new(Keywords::build);

impl Keywords {
    pub fn get() -> &'static Keywords {
        &KEYWORDS
    }

    fn build() -> Self {
        let mut categories = HashMap::new();
        let groups = [
            (DDL_KEYWORDS, QueryCategory::Ddl),
            (DML_KEYWORDS, QueryCategory::Dml),
            (DCL_KEYWORDS, QueryCategory::Dcl),
            (TCL_KEYWORDS, QueryCategory::Tcl),
            (UTILITY_KEYWORDS, QueryCategory::Utility),
        ];
        for (words, category) in groups {
            for word in words {
                categories.insert(*word, category);
            }
        }

        let set = |words: &[&'static str]| words.iter().copied().collect::<HashSet<_>>();

        Self {
            categories,
            malformed: set(MALFORMED_KEYWORDS),
            reserved: set(RESERVED_WORDS),
            types: set(TYPE_NAMES),
            aggregates: set(AGGREGATE_FUNCTIONS),
            windows: set(WINDOW_FUNCTIONS),
            builtins: set(BUILTIN_FUNCTIONS),
            dangerous: set(DANGEROUS_FUNCTIONS),
            system_schemas: set(SYSTEM_SCHEMAS),
            system_catalogs: set(SYSTEM_CATALOGS),
        }
    }

    pub fn category_of(&self, keyword: &str) -> Option<QueryCategory> {
        self.categories.get(keyword.to_uppercase().as_str()).copied()
    }

    pub fn is_malformed_keyword(&self, word: &str) -> bool {
        self.malformed.contains(word.to_uppercase().as_str())
    }

    /// True for words that may precede "(" without being a function call.
    pub fn is_non_function_word(&self, word: &str) -> bool {
        let upper = word.to_uppercase();
        self.reserved.contains(upper.as_str()) || self.types.contains(upper.as_str())
    }

    pub fn is_aggregate_function(&self, name: &str) -> bool {
        self.aggregates.contains(name.to_lowercase().as_str())
    }

    pub fn is_window_function(&self, name: &str) -> bool {
        self.windows.contains(name.to_lowercase().as_str())
    }

    pub fn is_builtin_function(&self, name: &str) -> bool {
        self.builtins.contains(name.to_lowercase().as_str())
    }

    /// Safe builtins are the side-effect-free functions: plain builtins,
    /// aggregates and window functions. Anything unknown is not safe.
    pub fn is_safe_function(&self, name: &str) -> bool {
        let lower = name.to_lowercase();
        self.builtins.contains(lower.as_str())
            || self.aggregates.contains(lower.as_str())
            || self.windows.contains(lower.as_str())
    }

    pub fn is_dangerous_function(&self, name: &str) -> bool {
        self.dangerous.contains(name.to_lowercase().as_str())
    }

    pub fn is_system_schema(&self, schema: &str) -> bool {
        let lower = schema.to_lowercase();
        self.system_schemas.contains(lower.as_str()) || lower.starts_with("pg_temp")
    }

    // accepts bare or schema-qualified names
    pub fn is_system_catalog(&self, table: &str) -> bool {
        let lower = table.to_lowercase();
        let (schema, name) = match lower.rsplit_once('.') {
            Some((schema, name)) => (Some(schema), name),
            None => (None, lower.as_str()),
        };
        if let Some(schema) = schema
            && self.is_system_schema(schema)
        {
            return true;
        }
        name.starts_with("pg_") || (schema.is_some() && self.system_catalogs.contains(name))
    }
}
