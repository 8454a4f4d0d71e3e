use crate::output::{print_json, print_notices};
use anyhow::Context;
use std::io::Write;
use std::path::{Path, PathBuf};
use umin_core::action::{ExecutionResult, Transport};
use umin_core::dispatch::{BulkRequest, DispatchState, Dispatcher};
use umin_core::permission::Caller;
use umin_core::record::Filter;
use umin_core::store::RecordStore;

pub struct RunArgs {
    pub model: String,
    pub action: String,
    pub ids: Vec<i64>,
    pub token: Option<String>,
    pub yes: bool,
    pub out: Option<PathBuf>,
}

/// Dispatch a bulk action from the command line.
///
/// Without `--token` or `--yes` a destructive action stops at its
/// confirmation step and prints the token to pass on the next run.
pub fn run(root: &Path, caller: &Caller, args: RunArgs, json: bool) -> anyhow::Result<()> {
    let (_, dispatcher) = super::load_site(root)?;

    let mut request = BulkRequest::new(&args.model, &args.action)
        .select(args.ids.iter().copied())
        .transport(Transport::Fragment);
    match args.token {
        Some(token) => {
            // A prompt's token covers the ids that existed when it was shown,
            // which may be fewer than the ids passed here.
            if !covers(&dispatcher, &request, &request.selected, &token) {
                let existing = existing_ids(&dispatcher, &request)?;
                if !existing.is_empty() {
                    request.selected = existing;
                }
            }
            request = request.confirmed(token);
        }
        None if args.yes => {
            let token = sign(&dispatcher, &request, &request.selected);
            request = request.confirmed(token);
        }
        None => {}
    }

    let outcome = dispatcher.dispatch(caller, &request)?;

    match outcome.result {
        ExecutionResult::Redirect => {
            if json {
                print_json(&serde_json::json!({
                    "state": outcome.state,
                    "result": "redirect",
                    "affected": outcome.affected,
                    "notices": outcome.notices,
                }))?;
            } else {
                print_notices(&outcome.notices);
            }
        }
        ExecutionResult::Raw(raw) => match args.out {
            Some(path) => {
                std::fs::write(&path, &raw.body)
                    .with_context(|| format!("failed to write {}", path.display()))?;
                if json {
                    print_json(&serde_json::json!({
                        "state": outcome.state,
                        "result": "raw",
                        "content_type": raw.content_type,
                        "path": path,
                        "affected": outcome.affected,
                    }))?;
                } else {
                    println!("Wrote {} bytes to {}", raw.body.len(), path.display());
                }
            }
            None => std::io::stdout().write_all(&raw.body)?,
        },
        ExecutionResult::Fragment(html) => {
            let prompt = if outcome.state == DispatchState::AwaitingConfirmation {
                let existing = existing_ids(&dispatcher, &request)?;
                let token = sign(&dispatcher, &request, &existing);
                Some((existing, token))
            } else {
                None
            };
            if json {
                print_json(&serde_json::json!({
                    "state": outcome.state,
                    "result": "fragment",
                    "ids": prompt.as_ref().map(|(ids, _)| ids),
                    "token": prompt.as_ref().map(|(_, token)| token),
                    "html": html,
                }))?;
            } else if let Some((ids, token)) = prompt {
                let ids: Vec<String> = ids.iter().map(i64::to_string).collect();
                println!(
                    "Confirmation required for '{}' on {} selected {}.",
                    args.action,
                    ids.len(),
                    args.model
                );
                println!("Re-run with --ids {} --token {token} to proceed.", ids.join(","));
            } else {
                println!("{html}");
            }
        }
    }
    Ok(())
}

fn existing_ids(dispatcher: &Dispatcher, request: &BulkRequest) -> anyhow::Result<Vec<i64>> {
    if dispatcher.models().get(&request.model).is_err() {
        return Ok(request.selected.clone());
    }
    let selection = Filter::ids(request.selected.iter().copied());
    let existing = dispatcher.store().filter(&request.model, &selection)?;
    Ok(existing.iter().map(|r| r.id).collect())
}

fn sign(dispatcher: &Dispatcher, request: &BulkRequest, ids: &[i64]) -> String {
    dispatcher.signer().sign(
        &request.model,
        &request.action,
        &Filter::ids(ids.iter().copied()),
    )
}

fn covers(dispatcher: &Dispatcher, request: &BulkRequest, ids: &[i64], token: &str) -> bool {
    dispatcher.signer().verify(
        &request.model,
        &request.action,
        &Filter::ids(ids.iter().copied()),
        token,
    )
}
