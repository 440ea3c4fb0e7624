//! Migration-text generator
//!
//! Maps database changes to guarded, re-runnable SQL. Rendering never fails:
//! a change without a SQL form, or whose desired payload cannot be decoded,
//! becomes a commented manual-intervention marker. Every identifier is
//! double-quoted.

use std::fmt::Write as _;

use chrono::{DateTime, Utc};
use ops_core::sql::{quote_ident, quote_literal};
use ops_core::{
    Change, ChangeType, ColumnSpec, IndexKind, IndexSpec, RlsPolicySpec, TableSpec,
};
use serde::de::DeserializeOwned;
use serde::Deserialize;

const DEFAULT_TEXT_SEARCH_LANGUAGE: &str = "english";
const DEFAULT_VECTOR_OPS: &str = "vector_cosine_ops";
const DEFAULT_VECTOR_LISTS: u32 = 100;

/// Columns every generated table carries
const IMPLICIT_COLUMNS: [&str; 2] = ["id", "created_at"];

#[derive(Deserialize)]
struct ColumnChange {
    table: String,
    column: ColumnSpec,
}

#[derive(Deserialize)]
struct IndexChange {
    table: String,
    index: IndexSpec,
}

#[derive(Deserialize)]
struct TableRef {
    table: String,
}

#[derive(Deserialize)]
struct PolicyChange {
    table: String,
    policy: RlsPolicySpec,
}

/// SQL fragment for a single change
pub fn change_sql(change: &Change) -> String {
    let rendered = match change.change_type {
        ChangeType::CreateTable => decode::<TableSpec>(change).map(|t| create_table(&t)),
        ChangeType::AddColumn => {
            decode::<ColumnChange>(change).map(|c| add_column(&c.table, &c.column))
        }
        ChangeType::CreateIndex => {
            decode::<IndexChange>(change).map(|i| create_index(&i.table, &i.index))
        }
        ChangeType::EnableRls => decode::<TableRef>(change).map(|t| enable_rls(&t.table)),
        ChangeType::CreatePolicy => {
            decode::<PolicyChange>(change).map(|p| create_policy(&p.table, &p.policy))
        }
        _ => return manual_marker(change, "no SQL form"),
    };

    rendered.unwrap_or_else(|e| manual_marker(change, &format!("undecodable desired state: {e}")))
}

fn decode<T: DeserializeOwned>(change: &Change) -> Result<T, serde_json::Error> {
    T::deserialize(&change.desired)
}

fn manual_marker(change: &Change, reason: &str) -> String {
    let description = change.description.replace(['\n', '\r'], " ");
    format!(
        "-- MANUAL INTERVENTION REQUIRED for {} ({reason}): {description}\n",
        change.id
    )
}

fn column_definition(column: &ColumnSpec) -> String {
    let mut definition = format!("{} {}", quote_ident(&column.name), column.data_type.trim());
    if !column.nullable {
        definition.push_str(" NOT NULL");
    }
    if let Some(default) = &column.default {
        let _ = write!(definition, " DEFAULT {}", default.trim());
    }
    if let Some(target) = &column.references {
        let _ = write!(definition, " REFERENCES {} (\"id\")", quote_ident(target));
    }
    definition
}

fn create_table(table: &TableSpec) -> String {
    let mut columns = vec![format!(
        "{} uuid PRIMARY KEY DEFAULT gen_random_uuid()",
        quote_ident("id")
    )];
    columns.extend(
        table
            .required_columns
            .iter()
            .filter(|c| !IMPLICIT_COLUMNS.contains(&c.name.as_str()))
            .map(column_definition),
    );
    columns.push(format!(
        "{} timestamptz NOT NULL DEFAULT now()",
        quote_ident("created_at")
    ));

    let mut sql = format!(
        "CREATE TABLE IF NOT EXISTS {} (\n    {}\n);\n",
        quote_ident(&table.name),
        columns.join(",\n    ")
    );
    for index in &table.indexes {
        sql.push_str(&create_index(&table.name, index));
    }
    if table.rls_enabled {
        sql.push_str(&enable_rls(&table.name));
    }
    for policy in &table.policies {
        sql.push_str(&create_policy(&table.name, policy));
    }
    sql
}

fn add_column(table: &str, column: &ColumnSpec) -> String {
    format!(
        "ALTER TABLE {} ADD COLUMN IF NOT EXISTS {};\n",
        quote_ident(table),
        column_definition(column)
    )
}

fn create_index(table: &str, index: &IndexSpec) -> String {
    let name = quote_ident(&index.name);
    let table = quote_ident(table);
    let first_column = index.columns.first().map(|c| quote_ident(c)).unwrap_or_default();

    match index.kind {
        IndexKind::Btree => {
            let columns: Vec<String> = index.columns.iter().map(|c| quote_ident(c)).collect();
            format!(
                "CREATE {}INDEX IF NOT EXISTS {name} ON {table} ({});\n",
                if index.unique { "UNIQUE " } else { "" },
                columns.join(", ")
            )
        }
        IndexKind::FullText => {
            let language = index
                .language
                .as_deref()
                .unwrap_or(DEFAULT_TEXT_SEARCH_LANGUAGE);
            format!(
                "CREATE INDEX IF NOT EXISTS {name} ON {table} USING gin (to_tsvector({}, {first_column}));\n",
                quote_literal(language)
            )
        }
        IndexKind::Vector => format!(
            "CREATE INDEX IF NOT EXISTS {name} ON {table} USING ivfflat ({first_column} {}) WITH (lists = {});\n",
            index.ops.as_deref().unwrap_or(DEFAULT_VECTOR_OPS),
            index.lists.unwrap_or(DEFAULT_VECTOR_LISTS)
        ),
    }
}

fn enable_rls(table: &str) -> String {
    format!("ALTER TABLE {} ENABLE ROW LEVEL SECURITY;\n", quote_ident(table))
}

fn create_policy(table: &str, policy: &RlsPolicySpec) -> String {
    let mut statement = format!(
        "CREATE POLICY {} ON {} FOR {}",
        quote_ident(&policy.name),
        quote_ident(table),
        policy.command.as_sql()
    );
    if let Some(using) = &policy.using {
        let _ = write!(statement, " USING ({})", using.trim());
    }
    if let Some(check) = &policy.check {
        let _ = write!(statement, " WITH CHECK ({})", check.trim());
    }

    format!(
        "DO $$\nBEGIN\n    IF NOT EXISTS (\n        SELECT 1 FROM pg_policies\n        WHERE schemaname = 'public'\n          AND tablename = {}\n          AND policyname = {}\n    ) THEN\n        {statement};\n    END IF;\nEND\n$$;\n",
        quote_literal(table),
        quote_literal(&policy.name)
    )
}

/// Combined migration for one database group
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MigrationScript {
    pub generated_at: DateTime<Utc>,
    pub change_ids: Vec<String>,
    /// Statements without transaction control
    pub body: String,
}

impl MigrationScript {
    /// Render every change, in order, into one script
    pub fn build(changes: &[&Change], generated_at: DateTime<Utc>) -> Self {
        let mut body = String::new();
        for change in changes {
            let _ = writeln!(body, "-- {}", change.id);
            body.push_str(&change_sql(change));
            body.push('\n');
        }

        Self {
            generated_at,
            change_ids: changes.iter().map(|c| c.id.clone()).collect(),
            body,
        }
    }

    /// UTC `yyyymmddHHMMSS`
    pub fn timestamp(&self) -> String {
        self.generated_at.format("%Y%m%d%H%M%S").to_string()
    }

    /// Name recorded by the migration runner
    pub fn name(&self) -> String {
        format!("{}_ops_reconcile", self.timestamp())
    }

    pub fn file_name(&self) -> String {
        format!("{}.sql", self.name())
    }

    pub fn header(&self) -> String {
        let mut header = format!(
            "-- Ops reconcile migration\n-- Generated at: {}\n-- Changes:\n",
            self.generated_at.to_rfc3339()
        );
        for id in &self.change_ids {
            let _ = writeln!(header, "--   {id}");
        }
        header
    }

    /// File form: header plus the body wrapped in one transaction
    pub fn render_file(&self) -> String {
        format!("{}\nBEGIN;\n\n{}COMMIT;\n", self.header(), self.body)
    }
}
