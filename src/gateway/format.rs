use crate::engine::Row;
use crate::gateway::models::QueryResult;
use serde_json::Value;
use std::fmt::{self, Write};
use tracing::error;

/// Rows shown in the report table; the rest are summarized in one line.
pub const MAX_DISPLAY_ROWS: usize = 10;

const NO_RESULTS: &str = "_Nenhum resultado encontrado_";

/// Renders a result as a markdown report. Never fails: a rendering problem
/// turns into a short error line instead.
pub fn format_result(result: &QueryResult) -> String {
    match render_report(result) {
        Ok(report) => report,
        Err(e) => {
            error!("Failed to format query result: {}", e);
            format!("Erro ao formatar resultado: {}", e)
        }
    }
}

fn render_report(result: &QueryResult) -> Result<String, fmt::Error> {
    let mut out = String::new();

    writeln!(out, "## Resultado da Consulta BI")?;
    writeln!(out)?;
    writeln!(out, "**SQL Gerado:**")?;
    writeln!(out, "```sql")?;
    writeln!(out, "{}", result.generated_sql.trim())?;
    writeln!(out, "```")?;
    writeln!(out)?;
    writeln!(out, "**Resultado:**")?;
    writeln!(out, "{}", render_rows(&result.rows)?)?;
    writeln!(out)?;
    writeln!(out, "**Visualização Sugerida:**")?;
    writeln!(out, "{}", result.chart_suggestion)?;
    writeln!(out)?;
    writeln!(out, "---")?;
    write!(out, "*Consulta processada pelo motor de BI*")?;

    Ok(out)
}

fn render_rows(rows: &[Row]) -> Result<String, fmt::Error> {
    let Some(first) = rows.first() else {
        return Ok(NO_RESULTS.to_string());
    };

    // Columns come from the first row, in the order the engine sent them
    let headers: Vec<&str> = first.keys().map(String::as_str).collect();
    let mut table = String::new();

    write!(table, "|")?;
    for header in &headers {
        write!(table, " {} |", escape_cell(header))?;
    }
    writeln!(table)?;

    write!(table, "|")?;
    for _ in &headers {
        write!(table, " --- |")?;
    }

    for row in rows.iter().take(MAX_DISPLAY_ROWS) {
        writeln!(table)?;
        write!(table, "|")?;
        for header in &headers {
            let cell = row.get(*header).map(render_value).unwrap_or_default();
            write!(table, " {} |", escape_cell(&cell))?;
        }
    }

    let hidden = rows.len().saturating_sub(MAX_DISPLAY_ROWS);
    if hidden > 0 {
        write!(table, "\n\n*... e mais {} linhas*", hidden)?;
    }

    Ok(table)
}

fn render_value(value: &Value) -> String {
    match value {
        Value::Null => "NULL".to_string(),
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn escape_cell(text: &str) -> String {
    text.replace('|', "\\|").replace(['\r', '\n'], " ")
}
