use crate::error::Result;
use crate::model::ModelConfig;
use crate::record::{compare_values, Filter, Record};
use crate::store::RecordStore;
use serde::Serialize;
use serde_json::Value;
use std::cmp::Ordering;
use std::collections::{BTreeMap, BTreeSet};

/// List-page parameters taken from the query string.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ListQuery {
    pub q: Option<String>,
    pub page: Option<usize>,
    /// Field equality filters. Only fields in the model's `list_filter` apply.
    pub filters: BTreeMap<String, String>,
}

impl ListQuery {
    /// Split raw query parameters into search term, page and filters. A page
    /// number that does not parse is treated as absent.
    pub fn from_params(mut params: BTreeMap<String, String>) -> Self {
        let q = params.remove("q");
        let page = params.remove("page").and_then(|p| p.trim().parse().ok());
        Self {
            q,
            page,
            filters: params,
        }
    }

    /// Query string reproducing this search and these filters on `page`,
    /// with a leading `?`, or empty when there is nothing to carry.
    pub fn query_string(&self, page: Option<usize>) -> String {
        let mut pairs: Vec<(&str, String)> = Vec::new();
        if let Some(q) = self.q.as_deref().filter(|q| !q.is_empty()) {
            pairs.push(("q", q.to_string()));
        }
        for (field, value) in &self.filters {
            if !value.is_empty() {
                pairs.push((field.as_str(), value.clone()));
            }
        }
        if let Some(page) = page {
            pairs.push(("page", page.to_string()));
        }
        if pairs.is_empty() {
            return String::new();
        }
        let encoded: Vec<String> = pairs
            .iter()
            .map(|(k, v)| format!("{}={}", urlencoding::encode(k), urlencoding::encode(v)))
            .collect();
        format!("?{}", encoded.join("&"))
    }
}

/// The distinct values a `list_filter` field takes, for the filter widget.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FilterChoice {
    pub field: String,
    pub values: Vec<String>,
}

/// Choices for every `list_filter` field of `model`, sorted, blanks omitted.
pub fn filter_choices(store: &dyn RecordStore, model: &ModelConfig) -> Result<Vec<FilterChoice>> {
    if model.list_filter.is_empty() {
        return Ok(Vec::new());
    }
    let records = store.filter(&model.name, &Filter::All)?;
    Ok(model
        .list_filter
        .iter()
        .map(|field| {
            let values: BTreeSet<String> = records
                .iter()
                .map(|r| r.display(field))
                .filter(|v| !v.is_empty())
                .collect();
            FilterChoice {
                field: field.clone(),
                values: values.into_iter().collect(),
            }
        })
        .collect())
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Page {
    pub records: Vec<Record>,
    /// 1-based.
    pub number: usize,
    pub num_pages: usize,
    pub total: usize,
}

/// Apply search, filters, ordering and pagination to a model's collection.
///
/// Search is a case-insensitive substring match over `search_fields`,
/// combined with OR. A page number past the end clamps to the last page and
/// a missing or zero page number means the first.
pub fn list(store: &dyn RecordStore, model: &ModelConfig, query: &ListQuery) -> Result<Page> {
    let mut records = store.filter(&model.name, &Filter::All)?;

    if let Some(term) = query.q.as_deref().map(str::trim).filter(|t| !t.is_empty()) {
        if !model.search_fields.is_empty() {
            let term = term.to_lowercase();
            records.retain(|r| {
                model
                    .search_fields
                    .iter()
                    .any(|f| r.display(f).to_lowercase().contains(&term))
            });
        }
    }

    for (field, wanted) in &query.filters {
        if wanted.is_empty() || !model.list_filter.iter().any(|f| f == field) {
            continue;
        }
        records.retain(|r| r.display(field) == *wanted);
    }

    if !model.ordering.is_empty() {
        records.sort_by(|a, b| compare_by(&model.ordering, a, b));
    }

    let total = records.len();
    let per_page = if model.paginate_by == 0 {
        total.max(1)
    } else {
        model.paginate_by
    };
    let num_pages = total.div_ceil(per_page).max(1);
    let number = query.page.unwrap_or(1).clamp(1, num_pages);
    let records = records
        .into_iter()
        .skip((number - 1) * per_page)
        .take(per_page)
        .collect();

    Ok(Page {
        records,
        number,
        num_pages,
        total,
    })
}

fn compare_by(ordering: &[String], a: &Record, b: &Record) -> Ordering {
    for key in ordering {
        let (field, descending) = match key.strip_prefix('-') {
            Some(field) => (field, true),
            None => (key.as_str(), false),
        };
        let left = a.field(field).unwrap_or(Value::Null);
        let right = b.field(field).unwrap_or(Value::Null);
        let ord = compare_values(&left, &right);
        let ord = if descending { ord.reverse() } else { ord };
        if ord != Ordering::Equal {
            return ord;
        }
    }
    Ordering::Equal
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
