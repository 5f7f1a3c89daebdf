//! SQL composition from query descriptors.
//!
//! Identifiers (projected columns, table, ORDER BY and GROUP BY columns) are
//! always double-quoted. The WHERE and HAVING fragments and the ORDER BY
//! direction token are embedded verbatim: they come pre-composed from the
//! resource-path parser or the caller and are not validated here.

use crate::config::DEFAULT_TABLE;
use crate::descriptor::QueryDescriptor;

/// Quote an identifier for SQLite, doubling embedded double quotes.
///
/// The empty string and `*` are returned unchanged.
///
/// # Examples
///
/// ```
/// use db::query_builders::quote_identifier;
/// assert_eq!(quote_identifier("name"), "\"name\"");
/// assert_eq!(quote_identifier("a\"b"), "\"a\"\"b\"");
/// assert_eq!(quote_identifier("*"), "*");
/// ```
pub fn quote_identifier(s: &str) -> String {
    if s.is_empty() || s == "*" {
        return s.to_string();
    }
    format!("\"{}\"", s.replace('"', "\"\""))
}

/// Combine an existing predicate with an extra one as `(existing) AND (extra)`.
///
/// When either side is empty the other is returned unchanged.
pub fn combine_predicates(existing: &str, extra: &str) -> String {
    match (existing.is_empty(), extra.is_empty()) {
        (_, true) => existing.to_string(),
        (true, false) => extra.to_string(),
        (false, false) => format!("({}) AND ({})", existing, extra),
    }
}

/// Builds SELECT and COUNT statements from descriptors.
///
/// Clauses are emitted in the fixed order SELECT, FROM, WHERE, GROUP BY,
/// HAVING, ORDER BY, LIMIT, OFFSET, each only when its field is non-empty.
#[derive(Debug, Clone)]
pub struct QueryComposer {
    default_table: String,
}

impl Default for QueryComposer {
    fn default() -> Self {
        Self::new(DEFAULT_TABLE)
    }
}

impl QueryComposer {
    /// Creates a composer that falls back to `default_table` when a
    /// descriptor names no table.
    pub fn new(default_table: &str) -> Self {
        Self {
            default_table: default_table.to_string(),
        }
    }

    fn table<'a>(&'a self, desc: &'a QueryDescriptor) -> &'a str {
        if desc.table.is_empty() {
            &self.default_table
        } else {
            &desc.table
        }
    }

    fn select_list(desc: &QueryDescriptor) -> String {
        let all = desc.select.is_empty() || (desc.select.len() == 1 && desc.select[0] == "*");
        if all {
            return "*".to_string();
        }
        desc.select
            .iter()
            .map(|c| quote_identifier(c))
            .collect::<Vec<_>>()
            .join(", ")
    }

    /// Compose the full SELECT statement for `desc`.
    pub fn compose(&self, desc: &QueryDescriptor) -> String {
        let mut parts = vec![
            format!("SELECT {}", Self::select_list(desc)),
            format!("FROM {}", quote_identifier(self.table(desc))),
        ];

        if !desc.where_clause.is_empty() {
            parts.push(format!("WHERE {}", desc.where_clause));
        }
        if !desc.group_by.is_empty() {
            parts.push(format!("GROUP BY {}", quote_identifier(&desc.group_by)));
        }
        if !desc.having.is_empty() {
            parts.push(format!("HAVING {}", desc.having));
        }
        if !desc.order_by.is_empty() {
            let mut order = quote_identifier(&desc.order_by);
            if !desc.sort_direction.is_empty() {
                order.push(' ');
                order.push_str(&desc.sort_direction);
            }
            parts.push(format!("ORDER BY {}", order));
        }
        if !desc.limit.is_empty() {
            parts.push(format!("LIMIT {}", desc.limit));
        }
        if !desc.offset.is_empty() {
            parts.push(format!("OFFSET {}", desc.offset));
        }

        parts.join(" ")
    }

    /// Compose the row count for `desc`: same table and predicate, without
    /// grouping, ordering or pagination.
    pub fn compose_count(&self, desc: &QueryDescriptor) -> String {
        let mut sql = format!("SELECT COUNT(*) FROM {}", quote_identifier(self.table(desc)));
        if !desc.where_clause.is_empty() {
            sql.push_str(" WHERE ");
            sql.push_str(&desc.where_clause);
        }
        sql
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::{fixture, rstest};

    #[fixture]
    fn composer() -> QueryComposer {
        QueryComposer::default()
    }

    #[rstest]
    #[case("name", r#""name""#)]
    #[case("first name", r#""first name""#)]
    #[case(r#"a"b"#, r#""a""b""#)]
    #[case("", "")]
    #[case("*", "*")]
    fn test_quote_identifier(#[case] input: &str, #[case] expected: &str) {
        assert_eq!(quote_identifier(input), expected);
    }

    #[rstest]
    #[case("", "", "")]
    #[case("a = 1", "", "a = 1")]
    #[case("", "b = 2", "b = 2")]
    #[case("a = 1", "b = 2", "(a = 1) AND (b = 2)")]
    fn test_combine_predicates(#[case] existing: &str, #[case] extra: &str, #[case] expected: &str) {
        assert_eq!(combine_predicates(existing, extra), expected);
    }

    #[rstest]
    fn test_projection_table_and_where(composer: QueryComposer) {
        let desc = QueryDescriptor {
            select: vec!["a".into(), "b".into()],
            table: "t".into(),
            where_clause: "x>1".into(),
            ..QueryDescriptor::default()
        };
        assert_eq!(composer.compose(&desc), r#"SELECT "a", "b" FROM "t" WHERE x>1"#);
    }

    #[rstest]
    #[case(vec![])]
    #[case(vec!["*".to_string()])]
    fn test_wildcard_projection(composer: QueryComposer, #[case] select: Vec<String>) {
        let desc = QueryDescriptor {
            select,
            table: "t".into(),
            ..QueryDescriptor::default()
        };
        assert_eq!(composer.compose(&desc), r#"SELECT * FROM "t""#);
    }

    #[rstest]
    fn test_default_table_substituted(composer: QueryComposer) {
        assert_eq!(
            composer.compose(&QueryDescriptor::default()),
            r#"SELECT * FROM "tb0""#
        );
        let custom = QueryComposer::new("sheet1");
        assert_eq!(
            custom.compose(&QueryDescriptor::default()),
            r#"SELECT * FROM "sheet1""#
        );
    }

    #[rstest]
    fn test_full_clause_order(composer: QueryComposer) {
        let desc = QueryDescriptor {
            data_set_path: "x.db".into(),
            table: "orders".into(),
            select: vec!["region".into()],
            where_clause: "amount > 10".into(),
            group_by: "region".into(),
            having: "COUNT(*) > 1".into(),
            order_by: "region".into(),
            sort_direction: "DESC".into(),
            limit: "5".into(),
            offset: "10".into(),
        };
        assert_eq!(
            composer.compose(&desc),
            r#"SELECT "region" FROM "orders" WHERE amount > 10 GROUP BY "region" HAVING COUNT(*) > 1 ORDER BY "region" DESC LIMIT 5 OFFSET 10"#
        );
    }

    #[rstest]
    fn test_order_by_without_direction(composer: QueryComposer) {
        let desc = QueryDescriptor {
            table: "t".into(),
            order_by: "age".into(),
            ..QueryDescriptor::default()
        };
        assert_eq!(composer.compose(&desc), r#"SELECT * FROM "t" ORDER BY "age""#);
    }

    #[rstest]
    fn test_count_ignores_pagination(composer: QueryComposer) {
        let desc = QueryDescriptor {
            table: "t".into(),
            where_clause: "(a = 1) AND (b > ?)".into(),
            order_by: "a".into(),
            limit: "10".into(),
            offset: "20".into(),
            ..QueryDescriptor::default()
        };
        assert_eq!(
            composer.compose_count(&desc),
            r#"SELECT COUNT(*) FROM "t" WHERE (a = 1) AND (b > ?)"#
        );
    }
}
