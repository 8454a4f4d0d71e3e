use crate::output::{print_json, print_notices, print_table};
use anyhow::Context;
use clap::Subcommand;
use std::path::Path;
use umin_core::action::Notice;
use umin_core::permission::Caller;
use umin_core::query::ListQuery;
use umin_core::record::Record;

#[derive(Subcommand)]
pub enum RecordsSubcommand {
    /// List one page of a model's records
    List {
        model: String,
        /// Search term over the model's search fields
        #[arg(long, short = 'q')]
        query: Option<String>,
        /// Page number (1-based)
        #[arg(long)]
        page: Option<usize>,
        /// Equality filter on a list_filter field, as FIELD=VALUE (repeatable)
        #[arg(long = "filter", value_name = "FIELD=VALUE")]
        filters: Vec<String>,
    },

    /// Add a record under the next unused id
    Add {
        model: String,
        /// Field value as FIELD=VALUE (repeatable); values are parsed as YAML scalars
        #[arg(long = "set", value_name = "FIELD=VALUE")]
        values: Vec<String>,
    },

    /// Change fields of an existing record
    Update {
        model: String,
        id: i64,
        /// Field value as FIELD=VALUE (repeatable); unnamed fields are kept
        #[arg(long = "set", value_name = "FIELD=VALUE", required = true)]
        values: Vec<String>,
    },

    /// Delete one record
    Delete { model: String, id: i64 },
}

pub fn run(
    root: &Path,
    caller: &Caller,
    subcmd: RecordsSubcommand,
    json: bool,
) -> anyhow::Result<()> {
    match subcmd {
        RecordsSubcommand::List {
            model,
            query,
            page,
            filters,
        } => {
            let query = ListQuery {
                q: query,
                page,
                filters: parse_pairs(&filters)?.into_iter().collect(),
            };
            list(root, caller, &model, &query, json)
        }
        RecordsSubcommand::Add { model, values } => {
            let values = parse_pairs(&values)?;
            let (_, dispatcher) = super::load_site(root)?;
            let (record, notice) = dispatcher.create_one(caller, &model, &values)?;
            saved(&record, &notice, json)
        }
        RecordsSubcommand::Update { model, id, values } => {
            let values = parse_pairs(&values)?;
            let (_, dispatcher) = super::load_site(root)?;
            let (record, notice) = dispatcher.update_one(caller, &model, id, &values)?;
            saved(&record, &notice, json)
        }
        RecordsSubcommand::Delete { model, id } => delete(root, caller, &model, id, json),
    }
}

fn list(
    root: &Path,
    caller: &Caller,
    model: &str,
    query: &ListQuery,
    json: bool,
) -> anyhow::Result<()> {
    let (_, dispatcher) = super::load_site(root)?;
    let page = dispatcher.list_records(caller, model, query)?;
    if json {
        return print_json(&page);
    }

    let config = dispatcher.models().get(model)?;
    let columns = config.display_columns();
    let mut headers = vec!["ID"];
    headers.extend(columns.iter().map(String::as_str));
    let rows = page
        .records
        .iter()
        .map(|r| {
            let mut row = vec![r.id.to_string()];
            row.extend(columns.iter().map(|c| config.cell(r, c)));
            row
        })
        .collect();
    print_table(&headers, rows);
    println!(
        "\nPage {} of {} ({} total)",
        page.number, page.num_pages, page.total
    );
    Ok(())
}

fn saved(record: &Record, notice: &Notice, json: bool) -> anyhow::Result<()> {
    if json {
        print_json(record)
    } else {
        print_notices(std::slice::from_ref(notice));
        Ok(())
    }
}

fn delete(root: &Path, caller: &Caller, model: &str, id: i64, json: bool) -> anyhow::Result<()> {
    let (_, dispatcher) = super::load_site(root)?;
    let notice = dispatcher.delete_one(caller, model, id)?;
    if json {
        print_json(&notice)
    } else {
        print_notices(std::slice::from_ref(&notice));
        Ok(())
    }
}

/// Split `FIELD=VALUE` arguments. The value may itself contain `=`.
fn parse_pairs(args: &[String]) -> anyhow::Result<Vec<(String, String)>> {
    args.iter()
        .map(|arg| {
            let (k, v) = arg
                .split_once('=')
                .with_context(|| format!("expected FIELD=VALUE, got '{arg}'"))?;
            let k = k.trim();
            if k.is_empty() {
                anyhow::bail!("empty field name in '{arg}'");
            }
            Ok((k.to_string(), v.to_string()))
        })
        .collect()
}
