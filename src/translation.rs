use std::fmt;

mod nulls;
mod parsers;
mod scanner;

use crate::error::ScanError;

pub(crate) use nulls::rewrite_null_comparisons;
use parsers::{
    is_block_comment_end, is_block_comment_start, is_line_comment_start, matches_tag,
    try_start_dollar_quote,
};
use scanner::{State, is_word_byte, scan_digits, scan_word};

/// Where a placeholder's value comes from within its argument.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum PropertyPath {
    /// Bind the referenced argument itself (`<this>`).
    WholeArgument,
    /// Read a named property from the referenced argument.
    Property(String),
}

impl PropertyPath {
    fn from_name(name: &str) -> Self {
        if name.is_empty() {
            PropertyPath::WholeArgument
        } else {
            PropertyPath::Property(name.to_string())
        }
    }
}

impl fmt::Display for PropertyPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PropertyPath::WholeArgument => f.write_str("<this>"),
            PropertyPath::Property(name) => f.write_str(name),
        }
    }
}

/// One rewritten positional placeholder and the argument slot that feeds it.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PlaceholderBinding {
    /// 0-based index into the caller's argument list.
    pub argument_index: usize,
    pub property: PropertyPath,
}

impl PlaceholderBinding {
    #[must_use]
    pub fn new(argument_index: usize, property: PropertyPath) -> Self {
        Self {
            argument_index,
            property,
        }
    }

    /// Binding for the whole argument at `argument_index`.
    #[must_use]
    pub fn whole(argument_index: usize) -> Self {
        Self::new(argument_index, PropertyPath::WholeArgument)
    }

    /// Binding for `property` of the argument at `argument_index`.
    #[must_use]
    pub fn property(argument_index: usize, property: impl Into<String>) -> Self {
        Self::new(argument_index, PropertyPath::Property(property.into()))
    }
}

/// Ordered bindings, one per `?` in the rewritten SQL.
pub type BindingPlan = Vec<PlaceholderBinding>;

/// SQL with named placeholders rewritten to `?`, plus the binding plan.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NamedSql {
    pub sql: String,
    pub plan: BindingPlan,
}

/// Rewrite `:name`, `?N.name`, `?.name`, `?N.` and `?N` placeholders into positional `?`.
///
/// Returns `Ok(None)` when the text holds no named placeholder, so callers can
/// use the SQL unchanged. Placeholders inside quoted literals, quoted
/// identifiers, comments and dollar-quoted bodies are left alone. Once one
/// named placeholder is present, each plain `?` is bound to the whole first
/// argument so the plan always covers every positional marker.
///
/// ```rust
/// use sql_facade::translation::{PlaceholderBinding, scan_named_params};
///
/// let named = scan_named_params("select * from t where a = :a and b = ?2.b")?
///     .expect("named placeholders");
/// assert_eq!(named.sql, "select * from t where a = ? and b = ?");
/// assert_eq!(
///     named.plan,
///     vec![PlaceholderBinding::property(0, "a"), PlaceholderBinding::property(1, "b")]
/// );
/// # Ok::<(), sql_facade::ScanError>(())
/// ```
///
/// # Errors
/// Returns `ScanError::UnterminatedLiteral` for an unclosed `'` and
/// `ScanError::InvalidOrdinal` for `?0`.
pub fn scan_named_params(sql: &str) -> Result<Option<NamedSql>, ScanError> {
    let bytes = sql.as_bytes();
    let mut out = String::with_capacity(sql.len());
    let mut plan = BindingPlan::new();
    let mut named = 0usize;
    let mut copied = 0usize;

    walk_sql(sql, |idx| {
        let (end, binding) = match bytes[idx] {
            b':' => match colon_placeholder(bytes, idx) {
                Some(found) => found,
                None => return Ok(idx + 1),
            },
            b'?' => match question_placeholder(bytes, idx)? {
                Some(found) => found,
                None => {
                    plan.push(PlaceholderBinding::whole(0));
                    return Ok(idx + 1);
                }
            },
            _ => return Ok(idx + 1),
        };
        out.push_str(&sql[copied..idx]);
        out.push('?');
        copied = end;
        named += 1;
        plan.push(binding);
        Ok(end)
    })?;

    if named == 0 {
        return Ok(None);
    }
    out.push_str(&sql[copied..]);
    Ok(Some(NamedSql { sql: out, plan }))
}

fn colon_placeholder(bytes: &[u8], idx: usize) -> Option<(usize, PlaceholderBinding)> {
    if idx > 0 && bytes[idx - 1] == b':' {
        return None;
    }
    match bytes.get(idx + 1) {
        Some(b) if is_word_byte(*b) => {
            let (end, name) = scan_word(bytes, idx + 1);
            Some((end, PlaceholderBinding::new(0, PropertyPath::from_name(name))))
        }
        _ => None,
    }
}

fn question_placeholder(
    bytes: &[u8],
    idx: usize,
) -> Result<Option<(usize, PlaceholderBinding)>, ScanError> {
    let (after_ordinal, argument_index) = match scan_digits(bytes, idx + 1) {
        Some((end, digits)) => match digits.parse::<usize>() {
            Ok(ordinal) if ordinal > 0 => (end, ordinal - 1),
            _ => return Err(ScanError::InvalidOrdinal { position: idx }),
        },
        None if bytes.get(idx + 1) == Some(&b'.') => (idx + 1, 0),
        None => return Ok(None),
    };
    if bytes.get(after_ordinal) == Some(&b'.') {
        let (end, name) = scan_word(bytes, after_ordinal + 1);
        return Ok(Some((
            end,
            PlaceholderBinding::new(argument_index, PropertyPath::from_name(name)),
        )));
    }
    Ok(Some((after_ordinal, PlaceholderBinding::whole(argument_index))))
}

/// Drive `visit` over every byte of `sql` that sits outside literals, quoted
/// identifiers, comments and dollar-quoted bodies. `visit` returns the index
/// to resume from.
pub(crate) fn walk_sql<F>(sql: &str, mut visit: F) -> Result<(), ScanError>
where
    F: FnMut(usize) -> Result<usize, ScanError>,
{
    let bytes = sql.as_bytes();
    let mut state = State::Normal;
    let mut idx = 0;

    while idx < bytes.len() {
        let b = bytes[idx];
        match &state {
            State::Normal => match b {
                b'\'' => state = State::SingleQuoted { start: idx },
                b'"' => state = State::DoubleQuoted,
                _ if is_line_comment_start(bytes, idx) => {
                    state = State::LineComment;
                    idx += 1;
                }
                _ if is_block_comment_start(bytes, idx) => {
                    state = State::BlockComment(1);
                    idx += 1;
                }
                b'$' => match try_start_dollar_quote(bytes, idx) {
                    Some((tag, close)) => {
                        state = State::DollarQuoted(tag);
                        idx = close;
                    }
                    None => {
                        idx = visit(idx)?;
                        continue;
                    }
                },
                _ => {
                    idx = visit(idx)?;
                    continue;
                }
            },
            State::SingleQuoted { .. } => {
                if b == b'\'' {
                    if bytes.get(idx + 1) == Some(&b'\'') {
                        idx += 1; // escaped quote
                    } else {
                        state = State::Normal;
                    }
                }
            }
            State::DoubleQuoted => {
                if b == b'"' {
                    if bytes.get(idx + 1) == Some(&b'"') {
                        idx += 1;
                    } else {
                        state = State::Normal;
                    }
                }
            }
            State::LineComment => {
                if b == b'\n' {
                    state = State::Normal;
                }
            }
            State::BlockComment(depth) => {
                let depth = *depth;
                if is_block_comment_start(bytes, idx) {
                    state = State::BlockComment(depth + 1);
                    idx += 1;
                } else if is_block_comment_end(bytes, idx) {
                    state = if depth == 1 {
                        State::Normal
                    } else {
                        State::BlockComment(depth - 1)
                    };
                    idx += 1;
                }
            }
            State::DollarQuoted(tag) => {
                if b == b'$' && matches_tag(bytes, idx, tag) {
                    idx += tag.len() + 1;
                    state = State::Normal;
                }
            }
        }
        idx += 1;
    }

    if let State::SingleQuoted { start } = state {
        return Err(ScanError::UnterminatedLiteral { position: start });
    }
    Ok(())
}
