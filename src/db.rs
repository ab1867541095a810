use std::path::Path;

use anyhow::{Context, Result};
use rusqlite::types::Value as SqlValue;
use rusqlite::{params, params_from_iter, Connection, OptionalExtension};
use serde_json::Value;

use crate::config::Settings;
use crate::csv::Table;
use crate::merge::assemble::Dataset;
use crate::merge::resolve::SourceStats;
use crate::merge::row::{Cell, RawRow};
use crate::report::CompanyRow;

pub fn connect(path: &Path) -> Result<Connection> {
    if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
        std::fs::create_dir_all(dir)
            .with_context(|| format!("creating database directory {}", dir.display()))?;
    }
    let conn = Connection::open(path)
        .with_context(|| format!("opening database {}", path.display()))?;
    conn.execute_batch("PRAGMA journal_mode=WAL;")?;
    Ok(conn)
}

pub fn init_schema(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS merge_runs (
            id                   INTEGER PRIMARY KEY,
            run_id               TEXT NOT NULL,
            source               TEXT NOT NULL,
            rows                 INTEGER NOT NULL,
            skipped_blank_name   INTEGER NOT NULL,
            new_companies        INTEGER NOT NULL,
            merged_into_existing INTEGER NOT NULL,
            created_at           TEXT NOT NULL DEFAULT (datetime('now'))
        );
        CREATE INDEX IF NOT EXISTS idx_merge_runs_run ON merge_runs(run_id);
        ",
    )?;
    Ok(())
}

fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

pub fn table_exists(conn: &Connection, table: &str) -> Result<bool> {
    let found: Option<i64> = conn
        .query_row(
            "SELECT 1 FROM sqlite_master WHERE type = 'table' AND name = ?1",
            [table],
            |r| r.get(0),
        )
        .optional()?;
    Ok(found.is_some())
}

pub fn count_rows(conn: &Connection, table: &str) -> Result<Option<usize>> {
    if !table_exists(conn, table)? {
        return Ok(None);
    }
    let n: i64 = conn.query_row(
        &format!("SELECT COUNT(*) FROM {}", quote_ident(table)),
        [],
        |r| r.get(0),
    )?;
    Ok(Some(n as usize))
}

// ── Source tables ──

/// Every row of `table` keyed by column name, or `None` when the table is absent.
pub fn load_table(conn: &Connection, table: &str) -> Result<Option<Vec<RawRow>>> {
    if !table_exists(conn, table)? {
        return Ok(None);
    }
    let mut stmt = conn.prepare(&format!("SELECT * FROM {}", quote_ident(table)))?;
    let columns: Vec<String> = stmt.column_names().into_iter().map(String::from).collect();
    let rows = stmt
        .query_map([], |row| {
            columns
                .iter()
                .enumerate()
                .map(|(i, col)| Ok((col.clone(), Cell::from(row.get::<_, SqlValue>(i)?))))
                .collect::<rusqlite::Result<RawRow>>()
        })?
        .collect::<Result<Vec<_>, _>>()
        .with_context(|| format!("reading table {}", table))?;
    Ok(Some(rows))
}

/// Replace `table` with the CSV contents, every column TEXT.
pub fn import_table(conn: &Connection, table: &str, data: &Table) -> Result<usize> {
    let columns: Vec<String> = data.headers.iter().map(|h| quote_ident(h)).collect();
    let placeholders: Vec<String> = (1..=columns.len()).map(|i| format!("?{}", i)).collect();

    let tx = conn.unchecked_transaction()?;
    tx.execute_batch(&format!(
        "DROP TABLE IF EXISTS {t}; CREATE TABLE {t} ({cols});",
        t = quote_ident(table),
        cols = columns
            .iter()
            .map(|c| format!("{} TEXT", c))
            .collect::<Vec<_>>()
            .join(", "),
    ))?;
    let mut count = 0;
    {
        let mut stmt = tx.prepare(&format!(
            "INSERT INTO {} ({}) VALUES ({})",
            quote_ident(table),
            columns.join(", "),
            placeholders.join(", ")
        ))?;
        for row in &data.rows {
            count += stmt.execute(params_from_iter(row.iter()))?;
        }
    }
    tx.commit()?;
    Ok(count)
}

// ── Master table ──

fn column_type(column: &str) -> &'static str {
    match column {
        "data_quality_score" | "support_team_size" | "support_channels_count"
        | "support_vacancies" | "total_vacancies" | "has_support_team" | "has_24_7_support" => {
            "INTEGER"
        }
        _ => "TEXT",
    }
}

/// Nested values are stored as JSON text; booleans as 0/1.
fn to_sql(value: Option<&Value>) -> SqlValue {
    match value {
        None | Some(Value::Null) => SqlValue::Null,
        Some(Value::Bool(b)) => SqlValue::Integer(*b as i64),
        Some(Value::Number(n)) => match n.as_i64() {
            Some(i) => SqlValue::Integer(i),
            None => SqlValue::Real(n.as_f64().unwrap_or(0.0)),
        },
        Some(Value::String(s)) => SqlValue::Text(s.clone()),
        Some(nested) => SqlValue::Text(nested.to_string()),
    }
}

pub fn save_dataset(conn: &Connection, table: &str, dataset: &Dataset) -> Result<usize> {
    let tx = conn.unchecked_transaction()?;
    tx.execute(&format!("DROP TABLE IF EXISTS {}", quote_ident(table)), [])?;
    if dataset.columns.is_empty() {
        tx.commit()?;
        return Ok(0);
    }

    let defs: Vec<String> = dataset
        .columns
        .iter()
        .map(|c| format!("{} {}", quote_ident(c), column_type(c)))
        .collect();
    tx.execute(
        &format!("CREATE TABLE {} ({})", quote_ident(table), defs.join(", ")),
        [],
    )?;

    let mut count = 0;
    {
        let names: Vec<String> = dataset.columns.iter().map(|c| quote_ident(c)).collect();
        let placeholders: Vec<String> =
            (1..=names.len()).map(|i| format!("?{}", i)).collect();
        let mut stmt = tx.prepare(&format!(
            "INSERT INTO {} ({}) VALUES ({})",
            quote_ident(table),
            names.join(", "),
            placeholders.join(", ")
        ))?;
        for row in dataset.rows().context("serializing company records")? {
            let values = dataset.columns.iter().map(|c| to_sql(row.get(c)));
            count += stmt.execute(params_from_iter(values))?;
        }
    }
    tx.commit()?;
    Ok(count)
}

#[derive(Debug, Default)]
pub struct CompanyFilter<'a> {
    pub min_score: Option<u32>,
    /// Case-insensitive substring match, Unicode-aware.
    pub industry: Option<&'a str>,
    pub limit: Option<usize>,
}

pub fn fetch_companies(
    conn: &Connection,
    table: &str,
    filter: &CompanyFilter,
) -> Result<Vec<CompanyRow>> {
    if !table_exists(conn, table)? {
        return Ok(Vec::new());
    }

    let mut conditions = Vec::new();
    let mut params: Vec<Box<dyn rusqlite::types::ToSql>> = Vec::new();

    if let Some(min) = filter.min_score {
        conditions.push(format!("data_quality_score >= ?{}", params.len() + 1));
        params.push(Box::new(min));
    }
    // SQLite LIKE only folds ASCII case, so the industry match runs on the fetched rows
    let industry = filter.industry.map(str::to_lowercase);
    if industry.is_some() {
        conditions.push("industry IS NOT NULL".to_string());
    }

    let where_clause = if conditions.is_empty() {
        String::new()
    } else {
        format!(" WHERE {}", conditions.join(" AND "))
    };
    let limit_clause = match (filter.limit, &industry) {
        (Some(n), None) => format!(" LIMIT {}", n),
        _ => String::new(),
    };

    let sql = format!(
        "SELECT company_id, COALESCE(name,''), COALESCE(normalized_name,''), industry,
                primary_site, data_quality_score, has_support_team, support_team_size,
                support_channels_count, has_24_7_support
         FROM {}{}
         ORDER BY data_quality_score DESC, company_id{}",
        quote_ident(table),
        where_clause,
        limit_clause
    );

    let mut stmt = conn.prepare(&sql)?;
    let param_refs: Vec<&dyn rusqlite::types::ToSql> = params.iter().map(|p| p.as_ref()).collect();
    let rows = stmt
        .query_map(param_refs.as_slice(), |row| {
            Ok(CompanyRow {
                company_id: row.get(0)?,
                name: row.get(1)?,
                normalized_name: row.get(2)?,
                industry: row.get(3)?,
                primary_site: row.get(4)?,
                score: row.get(5)?,
                has_support_team: row.get(6)?,
                team_size: row.get(7)?,
                channels: row.get::<_, i64>(8)? as usize,
                has_24_7: row.get(9)?,
            })
        })?
        .collect::<Result<Vec<_>, _>>()?;

    let Some(needle) = industry else {
        return Ok(rows);
    };
    let matched = rows
        .into_iter()
        .filter(|r| {
            r.industry
                .as_deref()
                .is_some_and(|i| i.to_lowercase().contains(&needle))
        })
        .take(filter.limit.unwrap_or(usize::MAX))
        .collect();
    Ok(matched)
}

// ── Run metrics ──

pub fn insert_run_metrics(conn: &Connection, run_id: &str, metrics: &[SourceStats]) -> Result<()> {
    let tx = conn.unchecked_transaction()?;
    {
        let mut stmt = tx.prepare(
            "INSERT INTO merge_runs
             (run_id, source, rows, skipped_blank_name, new_companies, merged_into_existing)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        )?;
        for m in metrics {
            stmt.execute(params![
                run_id,
                m.source,
                m.rows as i64,
                m.skipped_blank_name as i64,
                m.new_companies as i64,
                m.merged as i64,
            ])?;
        }
    }
    tx.commit()?;
    Ok(())
}

/// Metrics of the most recent run, in source order.
pub fn last_run(conn: &Connection) -> Result<Option<(String, Vec<SourceStats>)>> {
    let run_id: Option<String> = conn
        .query_row(
            "SELECT run_id FROM merge_runs ORDER BY id DESC LIMIT 1",
            [],
            |r| r.get(0),
        )
        .optional()?;
    let Some(run_id) = run_id else {
        return Ok(None);
    };

    let mut stmt = conn.prepare(
        "SELECT source, rows, skipped_blank_name, new_companies, merged_into_existing
         FROM merge_runs WHERE run_id = ?1 ORDER BY id",
    )?;
    let metrics = stmt
        .query_map([&run_id], |row| {
            Ok(SourceStats {
                source: row.get(0)?,
                rows: row.get::<_, i64>(1)? as usize,
                skipped_blank_name: row.get::<_, i64>(2)? as usize,
                new_companies: row.get::<_, i64>(3)? as usize,
                merged: row.get::<_, i64>(4)? as usize,
            })
        })?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(Some((run_id, metrics)))
}

// ── Stats ──

pub struct TableCount {
    pub name: String,
    pub table: String,
    /// `None` when the table does not exist.
    pub rows: Option<usize>,
}

pub struct Stats {
    pub sources: Vec<TableCount>,
    pub master: Option<usize>,
    pub last_run: Option<(String, Vec<SourceStats>)>,
}

pub fn get_stats(conn: &Connection, settings: &Settings) -> Result<Stats> {
    let sources = settings
        .sources
        .iter()
        .map(|s| -> Result<TableCount> {
            Ok(TableCount {
                name: s.name.clone(),
                table: s.table.clone(),
                rows: count_rows(conn, &s.table)?,
            })
        })
        .collect::<Result<Vec<_>>>()?;
    Ok(Stats {
        sources,
        master: count_rows(conn, &settings.master_table)?,
        last_run: last_run(conn)?,
    })
}
