use crate::action::{Action, ActionContext, ExecutionResult, RawResponse};
use crate::error::Result;
use crate::permission::Operation;
use crate::record::{Filter, LABEL_FIELD};
use serde_json::Value;

pub const CSV_CONTENT_TYPE: &str = "text/csv; charset=utf-8";

/// Export the selection as CSV.
///
/// Never destructive, so confirmation is ignored. The header row is always
/// written, even when nothing in the selection still exists. Columns follow
/// [`ModelConfig::export_columns`](crate::model::ModelConfig::export_columns).
#[derive(Debug, Clone, Default)]
pub struct ExportCsv;

impl Action for ExportCsv {
    fn label(&self) -> &str {
        "Export selected as CSV"
    }

    fn execute(&self, ctx: &mut ActionContext<'_>, selection: &Filter) -> Result<ExecutionResult> {
        ctx.require(Operation::View)?;
        let columns = ctx.model.export_columns();
        let records = ctx.resolve(selection)?;

        let mut out = String::new();
        write_row(&mut out, columns.iter().map(String::as_str));
        for record in &records {
            let values = ctx.store.read_fields(record, &columns);
            let cells: Vec<String> = columns
                .iter()
                .zip(values)
                .map(|(column, value)| {
                    if column == LABEL_FIELD {
                        ctx.model.label(record)
                    } else {
                        cell_text(&value)
                    }
                })
                .collect();
            write_row(&mut out, cells.iter().map(String::as_str));
        }

        tracing::debug!(model = %ctx.model.name, rows = records.len(), "csv export");
        ctx.set_affected(records.len());
        Ok(ExecutionResult::Raw(RawResponse {
            content_type: CSV_CONTENT_TYPE.to_string(),
            filename: Some(format!("{}_export.csv", ctx.model.name)),
            body: out.into_bytes(),
        }))
    }
}

fn cell_text(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Append one RFC 4180 row terminated by CRLF.
fn write_row<'a>(out: &mut String, cells: impl Iterator<Item = &'a str>) {
    for (i, cell) in cells.enumerate() {
        if i > 0 {
            out.push(',');
        }
        if cell.contains([',', '"', '\r', '\n']) {
            out.push('"');
            out.push_str(&cell.replace('"', "\"\""));
            out.push('"');
        } else {
            out.push_str(cell);
        }
    }
    out.push_str("\r\n");
}
