use lazy_static::lazy_static;
use regex::Regex;

use crate::error::ScanError;
use crate::types::{Param, RowValues};

use super::parsers::is_where_keyword;
use super::walk_sql;

lazy_static! {
    static ref TRAILING_COMPARISON: Regex =
        Regex::new(r"(?:(!=|<>)|(=))\s*$").expect("static comparison regex");
}

/// Rewrite `col = ?` / `col <> ?` / `col != ?` after the first `where` into
/// `col is null` / `col is not null` when the matching argument is `Null`,
/// dropping that argument.
///
/// SQL whose markers do not line up with `params` (for instance `?1` style
/// positional markers) is returned untouched.
pub(crate) fn rewrite_null_comparisons(
    sql: &str,
    params: Vec<Param>,
) -> Result<(String, Vec<Param>), ScanError> {
    if !params
        .iter()
        .any(|p| matches!(p, Param::Value(RowValues::Null)))
    {
        return Ok((sql.to_string(), params));
    }

    let bytes = sql.as_bytes();
    let mut markers = Vec::new();
    let mut where_at = None;
    let mut numbered = false;
    walk_sql(sql, |idx| {
        if bytes[idx] == b'?' {
            numbered |= bytes.get(idx + 1).is_some_and(u8::is_ascii_digit);
            markers.push(idx);
        } else if where_at.is_none() && is_where_keyword(bytes, idx) {
            where_at = Some(idx);
        }
        Ok(idx + 1)
    })?;

    let Some(where_at) = where_at else {
        return Ok((sql.to_string(), params));
    };
    if numbered || markers.len() != params.len() {
        return Ok((sql.to_string(), params));
    }

    let mut out = String::with_capacity(sql.len() + 16);
    let mut kept = Vec::with_capacity(params.len());
    let mut copied = 0usize;
    for (marker, param) in markers.into_iter().zip(params) {
        let is_null = matches!(param, Param::Value(RowValues::Null));
        if !is_null || marker < where_at {
            kept.push(param);
            continue;
        }
        let prefix = &sql[where_at..marker];
        let Some(caps) = TRAILING_COMPARISON.captures(prefix) else {
            kept.push(param);
            continue;
        };
        let (op_start, replacement) = match (caps.get(1), caps.get(2)) {
            (Some(op), _) => (where_at + op.start(), "is not null"),
            (None, Some(op)) => {
                let before = op.start().checked_sub(1).map(|i| prefix.as_bytes()[i]);
                if matches!(before, Some(b'<' | b'>' | b'!')) {
                    kept.push(param);
                    continue;
                }
                (where_at + op.start(), "is null")
            }
            (None, None) => {
                kept.push(param);
                continue;
            }
        };
        out.push_str(&sql[copied..op_start]);
        if !out.ends_with(|c: char| c.is_whitespace()) {
            out.push(' ');
        }
        out.push_str(replacement);
        copied = marker + 1;
    }
    out.push_str(&sql[copied..]);
    Ok((out, kept))
}
