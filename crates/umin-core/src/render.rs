//! Render collaborator.
//!
//! Everything user-facing is produced through [`Renderer::render`] with a
//! template id and a JSON context. [`BuiltinRenderer`] ships a small fixed
//! set of HTML templates so the admin works without a template engine; hosts
//! that have one implement the trait instead.
//!
//! Template ids come in pairs: `<base>` renders a full page and
//! `<base>_htmx` renders the fragment swapped in by htmx.

use crate::error::{Result, UminError};
use serde_json::{Map, Value};
use std::fmt::Write as _;

pub type Context = Map<String, Value>;

pub const LIST: &str = "list";
pub const CONFIRM_DELETE: &str = "actions/confirm_delete";
pub const FORM: &str = "form";
pub const MESSAGE: &str = "message";

/// Suffix naming the fragment variant of a template.
pub const FRAGMENT_SUFFIX: &str = "_htmx";

pub trait Renderer: Send + Sync {
    fn render(&self, template: &str, context: &Context) -> Result<String>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct BuiltinRenderer;

impl Renderer for BuiltinRenderer {
    fn render(&self, template: &str, context: &Context) -> Result<String> {
        let (base, fragment) = match template.strip_suffix(FRAGMENT_SUFFIX) {
            Some(base) => (base, true),
            None => (template, false),
        };
        let body = match base {
            LIST => list_fragment(context),
            CONFIRM_DELETE => confirm_delete_fragment(context),
            FORM => form_fragment(context),
            MESSAGE => message_fragment(context),
            _ => return Err(UminError::Render(format!("unknown template '{template}'"))),
        };
        if fragment {
            Ok(body)
        } else {
            Ok(page(context, &body))
        }
    }
}

// ---------------------------------------------------------------------------
// Context access
// ---------------------------------------------------------------------------

fn text(ctx: &Map<String, Value>, key: &str) -> String {
    match ctx.get(key) {
        None | Some(Value::Null) => String::new(),
        Some(Value::String(s)) => s.clone(),
        Some(other) => other.to_string(),
    }
}

fn items<'a>(ctx: &'a Map<String, Value>, key: &str) -> &'a [Value] {
    ctx.get(key)
        .and_then(Value::as_array)
        .map(Vec::as_slice)
        .unwrap_or(&[])
}

fn value_text(v: &Value) -> String {
    match v {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn field(v: &Value, key: &str) -> String {
    v.as_object().map(|o| text(o, key)).unwrap_or_default()
}

/// Escape text for HTML element content and double-quoted attributes.
pub fn escape(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#x27;"),
            _ => out.push(c),
        }
    }
    out
}

// ---------------------------------------------------------------------------
// Templates
// ---------------------------------------------------------------------------

fn page(ctx: &Context, body: &str) -> String {
    let title = match text(ctx, "title") {
        t if t.is_empty() => text(ctx, "site_name"),
        t => t,
    };
    format!(
        "<!DOCTYPE html>\n<html>\n<head>\n<meta charset=\"utf-8\">\n<title>{title}</title>\n\
         <script src=\"https://unpkg.com/htmx.org@2.0.4\"></script>\n</head>\n\
         <body hx-boost=\"true\">\n<main id=\"umin-content\">\n{body}</main>\n</body>\n</html>\n",
        title = escape(&title),
    )
}

fn notices(ctx: &Context, out: &mut String) {
    for notice in items(ctx, "notices") {
        let _ = writeln!(
            out,
            "<div class=\"umin-message umin-message-{}\" role=\"alert\">{}</div>",
            escape(&field(notice, "level")),
            escape(&field(notice, "message")),
        );
    }
}

fn list_fragment(ctx: &Context) -> String {
    let mut out = String::new();
    let actions_url = escape(&text(ctx, "actions_url"));
    let list_url = escape(&text(ctx, "list_url"));

    let _ = writeln!(out, "<h1>{}</h1>", escape(&text(ctx, "model_name_plural")));
    notices(ctx, &mut out);
    let create_url = text(ctx, "create_url");
    if !create_url.is_empty() {
        let _ = writeln!(
            out,
            "<a class=\"umin-add\" href=\"{0}\" hx-get=\"{0}\" hx-target=\"#umin-content\">Add {1}</a>",
            escape(&create_url),
            escape(&text(ctx, "model_name")),
        );
    }

    let _ = writeln!(
        out,
        "<form class=\"umin-search\" method=\"get\" action=\"{list_url}\" \
         hx-get=\"{list_url}\" hx-target=\"#umin-content\">\n\
         <input type=\"search\" name=\"q\" value=\"{}\">",
        escape(&text(ctx, "search_query")),
    );
    for filter in items(ctx, "filters") {
        let selected = field(filter, "selected");
        let _ = writeln!(
            out,
            "<label>{}\n<select name=\"{}\">\n<option value=\"\">All</option>",
            escape(&field(filter, "label")),
            escape(&field(filter, "field")),
        );
        let values = filter
            .get("values")
            .and_then(Value::as_array)
            .map(Vec::as_slice)
            .unwrap_or(&[]);
        for value in values {
            let value = value_text(value);
            let mark = if value == selected { " selected" } else { "" };
            let _ = writeln!(
                out,
                "<option value=\"{0}\"{mark}>{0}</option>",
                escape(&value),
            );
        }
        out.push_str("</select>\n</label>\n");
    }
    out.push_str("<button type=\"submit\">Search</button>\n</form>\n");

    let _ = writeln!(
        out,
        "<form id=\"umin-actions\" method=\"post\" action=\"{actions_url}\" \
         hx-post=\"{actions_url}\" hx-target=\"#umin-content\">"
    );
    out.push_str("<select name=\"action\">\n<option value=\"\">---------</option>\n");
    for action in items(ctx, "actions") {
        let _ = writeln!(
            out,
            "<option value=\"{}\">{}</option>",
            escape(&field(action, "name")),
            escape(&field(action, "label")),
        );
    }
    out.push_str("</select>\n<button type=\"submit\">Go</button>\n");

    out.push_str("<table class=\"umin-list\">\n<thead><tr><th></th>");
    for column in items(ctx, "columns") {
        let _ = write!(out, "<th>{}</th>", escape(&value_text(column)));
    }
    out.push_str("<th></th></tr></thead>\n<tbody>\n");
    for row in items(ctx, "rows") {
        let id = escape(&field(row, "id"));
        let _ = write!(
            out,
            "<tr><td><input type=\"checkbox\" name=\"_selected_action\" value=\"{id}\"></td>"
        );
        let cells = row
            .get("cells")
            .and_then(Value::as_array)
            .map(Vec::as_slice)
            .unwrap_or(&[]);
        for cell in cells {
            let _ = write!(out, "<td>{}</td>", escape(&value_text(cell)));
        }
        let _ = writeln!(
            out,
            "<td><a href=\"{0}\" hx-get=\"{0}\" hx-target=\"#umin-content\">Edit</a> \
             <button type=\"button\" hx-post=\"{1}\" hx-target=\"#umin-content\" \
             hx-confirm=\"Delete this item?\">Delete</button></td></tr>",
            escape(&field(row, "edit_url")),
            escape(&field(row, "delete_url")),
        );
    }
    out.push_str("</tbody>\n</table>\n</form>\n");

    if let Some(page) = ctx.get("page") {
        out.push_str("<nav class=\"umin-paginator\">\n");
        let previous = field(page, "previous_url");
        if !previous.is_empty() {
            let _ = writeln!(
                out,
                "<a href=\"{0}\" hx-get=\"{0}\" hx-target=\"#umin-content\">Previous</a>",
                escape(&previous),
            );
        }
        let _ = writeln!(
            out,
            "<span>Page {} of {} ({} total)</span>",
            escape(&field(page, "number")),
            escape(&field(page, "num_pages")),
            escape(&field(page, "total")),
        );
        let next = field(page, "next_url");
        if !next.is_empty() {
            let _ = writeln!(
                out,
                "<a href=\"{0}\" hx-get=\"{0}\" hx-target=\"#umin-content\">Next</a>",
                escape(&next),
            );
        }
        out.push_str("</nav>\n");
    }
    out
}

fn form_fragment(ctx: &Context) -> String {
    let mut out = String::new();
    let form_url = escape(&text(ctx, "form_url"));
    let _ = writeln!(
        out,
        "<h1>{} {}</h1>",
        escape(&text(ctx, "action")),
        escape(&text(ctx, "model_name")),
    );
    let _ = writeln!(
        out,
        "<form class=\"umin-form\" method=\"post\" action=\"{form_url}\" \
         hx-post=\"{form_url}\" hx-target=\"#umin-content\">"
    );
    for item in items(ctx, "fields") {
        let _ = writeln!(
            out,
            "<p><label>{}\n<input type=\"text\" name=\"{}\" value=\"{}\"></label></p>",
            escape(&field(item, "label")),
            escape(&field(item, "name")),
            escape(&field(item, "value")),
        );
    }
    let _ = writeln!(
        out,
        "<button type=\"submit\">Save</button>\n<a href=\"{}\">Cancel</a>\n</form>",
        escape(&text(ctx, "list_url")),
    );
    out
}

fn confirm_delete_fragment(ctx: &Context) -> String {
    let mut out = String::new();
    let actions_url = escape(&text(ctx, "actions_url"));

    out.push_str("<div class=\"umin-confirm\" id=\"umin-confirm\">\n");
    let _ = writeln!(
        out,
        "<p>Are you sure you want to delete {} {}?</p>",
        escape(&text(ctx, "count")),
        escape(&text(ctx, "model_name")),
    );
    out.push_str("<ul>\n");
    for item in items(ctx, "items") {
        let _ = writeln!(
            out,
            "<li data-id=\"{}\">{}</li>",
            escape(&field(item, "id")),
            escape(&field(item, "label")),
        );
    }
    out.push_str("</ul>\n");

    let _ = writeln!(
        out,
        "<form method=\"post\" action=\"{actions_url}\" hx-post=\"{actions_url}\" \
         hx-target=\"#umin-content\">"
    );
    let _ = writeln!(
        out,
        "<input type=\"hidden\" name=\"action\" value=\"{}\">",
        escape(&text(ctx, "action")),
    );
    for item in items(ctx, "items") {
        let _ = writeln!(
            out,
            "<input type=\"hidden\" name=\"_selected_action\" value=\"{}\">",
            escape(&field(item, "id")),
        );
    }
    out.push_str("<input type=\"hidden\" name=\"confirm\" value=\"yes\">\n");
    let _ = writeln!(
        out,
        "<input type=\"hidden\" name=\"token\" value=\"{}\">",
        escape(&text(ctx, "token")),
    );
    let _ = writeln!(
        out,
        "<button type=\"submit\">Yes, I'm sure</button>\n<a href=\"{}\">No, take me back</a>",
        escape(&text(ctx, "list_url")),
    );
    out.push_str("</form>\n</div>\n");
    out
}

fn message_fragment(ctx: &Context) -> String {
    let mut out = format!(
        "<div class=\"umin-message umin-message-{}\" role=\"alert\">{}</div>\n",
        escape(&text(ctx, "level")),
        escape(&text(ctx, "message")),
    );
    let back = text(ctx, "list_url");
    if !back.is_empty() {
        let _ = writeln!(out, "<a href=\"{}\">Back to list</a>", escape(&back));
    }
    out
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
