//! Textual substitution of table references in compiled SQL.
//!
//! There is no SQL parsing here. A reference is any case-insensitive
//! occurrence of `db.schema.table` or `"db"."schema"."table"` that is not
//! glued to other identifier characters. An occurrence inside a string
//! literal or a comment of the compiled SQL is still replaced. Mock values
//! spliced into the SQL are never searched, even when they spell another
//! mocked table's name.

use crate::manifest::TableIdentifier;

/// Characters that continue an identifier (a `.` continues a qualified name).
fn is_identifier_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_' || c == '$' || c == '.'
}

fn is_bounded(sql: &str, start: usize, end: usize) -> bool {
    let before = sql[..start].chars().next_back();
    let after = sql[end..].chars().next();
    !before.is_some_and(is_identifier_char) && !after.is_some_and(is_identifier_char)
}

/// Result of replacing one table reference.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Replacement {
    pub sql: String,
    /// Number of occurrences replaced.
    pub count: usize,
}

/// Result of replacing several table references in one pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Replacements {
    pub sql: String,
    /// Occurrences replaced, per target, in target order.
    pub counts: Vec<usize>,
}

/// Byte ranges of every bounded reference to `ident`.
///
/// `lowered` must be `sql` with ASCII lowercasing applied, so byte offsets
/// line up.
fn find_references(sql: &str, lowered: &str, ident: &TableIdentifier) -> Vec<(usize, usize)> {
    let needles = [
        ident.quoted().to_ascii_lowercase(),
        ident.to_string().to_ascii_lowercase(),
    ];

    let mut found = Vec::new();
    let mut pos = 0;

    while pos < sql.len() {
        let next = needles
            .iter()
            .filter_map(|needle| {
                lowered[pos..]
                    .find(needle.as_str())
                    .map(|offset| (pos + offset, needle.len()))
            })
            .min_by_key(|&(start, len)| (start, std::cmp::Reverse(len)));

        let Some((start, len)) = next else {
            break;
        };
        let end = start + len;

        if is_bounded(sql, start, end) {
            found.push((start, end));
            pos = end;
        } else {
            pos = start + sql[start..].chars().next().map_or(1, char::len_utf8);
        }
    }
    found
}

/// Replace the references of every `(identifier, replacement)` target.
///
/// All references are located in the original `sql` before anything is
/// spliced in, so replacement text is never searched. Where two targets
/// match at the same place the earlier target wins.
pub fn replace_table_references(sql: &str, targets: &[(&TableIdentifier, &str)]) -> Replacements {
    // ASCII lowercasing keeps byte offsets identical to `sql`.
    let lowered = sql.to_ascii_lowercase();

    let mut matches: Vec<(usize, usize, usize)> = targets
        .iter()
        .enumerate()
        .flat_map(|(index, (ident, _))| {
            find_references(sql, &lowered, ident)
                .into_iter()
                .map(move |(start, end)| (start, end, index))
        })
        .collect();
    matches.sort_by_key(|&(start, _, index)| (start, index));

    let mut out = String::with_capacity(sql.len());
    let mut counts = vec![0; targets.len()];
    let mut pos = 0;

    for (start, end, index) in matches {
        if start < pos {
            continue;
        }
        out.push_str(&sql[pos..start]);
        out.push_str(targets[index].1);
        counts[index] += 1;
        pos = end;
    }

    out.push_str(&sql[pos..]);
    Replacements { sql: out, counts }
}

/// Replace every bounded reference to `ident` in `sql` with `replacement`.
///
/// Text outside the replaced references keeps its original case.
pub fn replace_table_reference(sql: &str, ident: &TableIdentifier, replacement: &str) -> Replacement {
    let Replacements { sql, counts } = replace_table_references(sql, &[(ident, replacement)]);
    Replacement {
        sql,
        count: counts.iter().sum(),
    }
}

/// Count bounded references to `ident` in `sql`.
pub fn count_table_references(sql: &str, ident: &TableIdentifier) -> usize {
    replace_table_reference(sql, ident, "").count
}
