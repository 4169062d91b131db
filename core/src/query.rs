//! GraphQL list-query construction.
//!
//! The upstream protocol embeds values textually, so untrusted search text
//! is escaped into a GraphQL string literal rather than passed as a variable.

use std::fmt::Write;

use crate::types::{ListQuery, SortKey};

const LIST_ROOT: &str = "pokemon_v2_pokemon";

/// Build the GraphQL document for one page of summaries.
///
/// Pure: identical inputs always yield an identical string.
pub fn build_list_query(query: &ListQuery) -> String {
    let mut args = format!("limit: {}, offset: {}", query.limit(), query.offset());
    if let Some(filter) = query.search().map(filter_clause) {
        args.push_str(", where: ");
        args.push_str(&filter);
    }
    args.push_str(", order_by: ");
    args.push_str(order_clause(query.sort()));

    format!("query {{ {LIST_ROOT}({args}) {{ id name }} }}")
}

/// Digits-only search is an exact id lookup; anything else is a
/// case-insensitive substring match on the name.
fn filter_clause(search: &str) -> String {
    if !search.is_empty() && search.bytes().all(|b| b.is_ascii_digit()) {
        // GraphQL `Int` is 32-bit; no entry has id 0, so an id past the
        // range becomes a lookup that matches nothing.
        let id = search.parse::<i32>().unwrap_or(0);
        format!("{{id: {{_eq: {id}}}}}")
    } else {
        format!(
            "{{name: {{_ilike: \"%{}%\"}}}}",
            escape_string(&escape_like(search))
        )
    }
}

fn order_clause(sort: SortKey) -> &'static str {
    match sort {
        SortKey::ByName => "{name: asc}",
        SortKey::ByIdentifier | SortKey::Unspecified => "{id: asc}",
    }
}

/// Make `%`, `_` and `\` match themselves inside a LIKE pattern.
pub fn escape_like(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for c in raw.chars() {
        if matches!(c, '%' | '_' | '\\') {
            out.push('\\');
        }
        out.push(c);
    }
    out
}

/// Escape text for the inside of a double-quoted GraphQL string literal.
pub fn escape_string(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for c in raw.chars() {
        match c {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            c if c.is_control() => {
                let _ = write!(out, "\\u{:04x}", c as u32);
            }
            c => out.push(c),
        }
    }
    out
}
