//! Textual placeholder substitution.
//!
//! This is not driver-level parameter binding: values are spliced into the SQL text.
//! Embedded single quotes are **not** escaped, so a value such as `O'Brien` changes the
//! structure of the resulting statement. Only feed trusted values through here.

use std::collections::HashMap;

/// Placeholder name (e.g. `:id`) to value.
pub type Arguments = HashMap<String, String>;

/// Replace every occurrence of each placeholder in `sql` with its value.
///
/// Values that parse as a base-10 64-bit integer (optional sign) are inserted bare,
/// everything else is wrapped in single quotes. Placeholders are applied longest name
/// first, so `:id` never rewrites part of `:id2`; names of equal length apply in
/// lexical order.
///
/// ```rust
/// use sql_pdo::query_builder::{Arguments, build_query};
///
/// let mut args = Arguments::new();
/// args.insert(":id".into(), "42".into());
/// args.insert(":name".into(), "Ada".into());
/// let sql = build_query("SELECT * FROM t WHERE id = :id AND name = :name", &args);
/// assert_eq!(sql, "SELECT * FROM t WHERE id = 42 AND name = 'Ada'");
/// ```
#[must_use]
pub fn build_query(sql: &str, args: &Arguments) -> String {
    let mut placeholders: Vec<(&String, &String)> = args.iter().collect();
    placeholders.sort_by(|(a, _), (b, _)| b.len().cmp(&a.len()).then_with(|| a.cmp(b)));

    let mut sql = sql.to_owned();
    for (placeholder, value) in placeholders {
        // An empty pattern would match between every character
        if placeholder.is_empty() {
            continue;
        }
        sql = sql.replace(placeholder.as_str(), &quote(value));
    }

    tracing::debug!(sql = %sql, "built query");
    sql
}

/// Render `value` the way [`build_query`] substitutes it.
#[must_use]
pub fn quote(value: &str) -> String {
    if is_integer(value) {
        value.to_owned()
    } else {
        format!("'{value}'")
    }
}

fn is_integer(value: &str) -> bool {
    value.parse::<i64>().is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(pairs: &[(&str, &str)]) -> Arguments {
        pairs
            .iter()
            .map(|(k, v)| ((*k).to_owned(), (*v).to_owned()))
            .collect()
    }

    #[test]
    fn integers_are_unquoted() {
        let sql = build_query("SELECT * FROM users WHERE id=:id", &args(&[(":id", "42")]));
        assert_eq!(sql, "SELECT * FROM users WHERE id=42");
    }

    #[test]
    fn signed_integers_are_unquoted() {
        let sql = build_query("x = :a AND y = :b", &args(&[(":a", "-7"), (":b", "+3")]));
        assert_eq!(sql, "x = -7 AND y = +3");
    }

    #[test]
    fn non_integers_are_quoted() {
        let sql = build_query(
            "x = :f AND y = :s AND z = :e",
            &args(&[(":f", "1.5"), (":s", "abc"), (":e", "")]),
        );
        assert_eq!(sql, "x = '1.5' AND y = 'abc' AND z = ''");
    }

    #[test]
    fn out_of_range_integer_is_quoted() {
        let sql = build_query("x = :big", &args(&[(":big", "99999999999999999999")]));
        assert_eq!(sql, "x = '99999999999999999999'");
    }

    #[test]
    fn embedded_quotes_are_not_escaped() {
        let sql = build_query(
            "SELECT * FROM users WHERE name=:name",
            &args(&[(":name", "O'Brien")]),
        );
        assert_eq!(sql, "SELECT * FROM users WHERE name='O'Brien'");
    }

    #[test]
    fn replaces_every_occurrence() {
        let sql = build_query("a = :v OR b = :v", &args(&[(":v", "1")]));
        assert_eq!(sql, "a = 1 OR b = 1");
    }

    #[test]
    fn longer_placeholder_wins_over_prefix() {
        let sql = build_query(
            "a = :id AND b = :id2",
            &args(&[(":id", "1"), (":id2", "two")]),
        );
        assert_eq!(sql, "a = 1 AND b = 'two'");
    }

    #[test]
    fn unknown_placeholders_are_left_alone() {
        let sql = build_query("a = :missing", &args(&[(":other", "1")]));
        assert_eq!(sql, "a = :missing");
    }

    #[test]
    fn empty_placeholder_is_ignored() {
        let sql = build_query("a = 1", &args(&[("", "x")]));
        assert_eq!(sql, "a = 1");
    }
}
