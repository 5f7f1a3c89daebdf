//! Translation of data-grid filter models into SQL predicates.
//!
//! A filter model is a JSON object keyed by column name. Each value is
//! either a leaf filter (`filterType` + `type` + `filter` [+ `filterTo`]) or
//! a composite of two filters joined by `AND`/`OR`.
//!
//! Text values are embedded as quoted literals with single quotes doubled.
//! Numeric values are validated and bound as parameters: the generated SQL
//! carries a `?` per number and [`FilterClause::params`] carries the values
//! in placeholder order. [`FilterClause::inline`] renders the same
//! expression with the numbers written out, for logs and diagnostics.

use std::collections::BTreeMap;

use serde::Deserialize;
use serde_json::Value;
use thiserror::Error;

use crate::backend::{QueryParams, ValueType};
use crate::query_builders::quote_identifier;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum FilterError {
    #[error("Invalid filter model JSON: {message}")]
    InvalidJson { message: String },

    #[error("Invalid number value for column '{column}': {value}")]
    InvalidNumber { column: String, value: String },

    #[error("Invalid composite filter for column '{column}': missing {missing}")]
    MissingCondition { column: String, missing: &'static str },

    #[error("Unsupported composite operator for column '{column}': {operator}")]
    UnsupportedOperator { column: String, operator: String },

    #[error("Unsupported text filter type: {kind}")]
    UnsupportedTextType { kind: String },

    #[error("Unsupported number filter type: {kind}")]
    UnsupportedNumberType { kind: String },

    #[error("Range filter for column '{column}' is missing filterTo")]
    MissingRangeEnd { column: String },
}

/// Filter document as sent by the grid, before validation.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawFilter {
    filter_type: Option<String>,
    #[serde(rename = "type")]
    kind: Option<String>,
    filter: Option<Value>,
    filter_to: Option<Value>,
    operator: Option<String>,
    condition1: Option<Box<RawFilter>>,
    condition2: Option<Box<RawFilter>>,
}

/// How the two halves of a composite filter are joined.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Conjunction {
    And,
    Or,
}

impl Conjunction {
    fn as_sql(self) -> &'static str {
        match self {
            Conjunction::And => "AND",
            Conjunction::Or => "OR",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextOp {
    Equals,
    NotEqual,
    Contains,
    NotContains,
    StartsWith,
    EndsWith,
}

impl TextOp {
    fn parse(kind: &str) -> Result<Self, FilterError> {
        Ok(match kind {
            "equals" => TextOp::Equals,
            "notEqual" => TextOp::NotEqual,
            "contains" => TextOp::Contains,
            "notContains" => TextOp::NotContains,
            "startsWith" => TextOp::StartsWith,
            "endsWith" => TextOp::EndsWith,
            other => {
                return Err(FilterError::UnsupportedTextType {
                    kind: other.to_string(),
                })
            }
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NumberOp {
    Equals,
    NotEqual,
    GreaterThan,
    GreaterThanOrEqual,
    LessThan,
    LessThanOrEqual,
    InRange,
}

impl NumberOp {
    fn parse(kind: &str) -> Result<Self, FilterError> {
        Ok(match kind {
            "equals" => NumberOp::Equals,
            "notEqual" => NumberOp::NotEqual,
            "greaterThan" => NumberOp::GreaterThan,
            "greaterThanOrEqual" => NumberOp::GreaterThanOrEqual,
            "lessThan" => NumberOp::LessThan,
            "lessThanOrEqual" => NumberOp::LessThanOrEqual,
            "inRange" => NumberOp::InRange,
            other => {
                return Err(FilterError::UnsupportedNumberType {
                    kind: other.to_string(),
                })
            }
        })
    }

    fn comparator(self) -> &'static str {
        match self {
            NumberOp::Equals => "=",
            NumberOp::NotEqual => "!=",
            NumberOp::GreaterThan => ">",
            NumberOp::GreaterThanOrEqual | NumberOp::InRange => ">=",
            NumberOp::LessThan => "<",
            NumberOp::LessThanOrEqual => "<=",
        }
    }
}

/// A validated numeric literal: the value to bind plus its rendering.
#[derive(Debug, Clone, PartialEq)]
pub struct NumericLiteral {
    pub value: ValueType,
    pub text: String,
}

impl NumericLiteral {
    fn from_json(column: &str, value: Option<&Value>) -> Result<Self, FilterError> {
        let invalid = |v: String| FilterError::InvalidNumber {
            column: column.to_string(),
            value: v,
        };

        match value {
            Some(Value::Number(n)) => {
                let value = match n.as_i64() {
                    Some(i) => ValueType::Int(i),
                    None => ValueType::Float(n.as_f64().ok_or_else(|| invalid(n.to_string()))?),
                };
                Ok(Self {
                    text: value.to_literal(),
                    value,
                })
            }
            Some(Value::String(s)) => {
                let parsed = s.parse::<f64>().map_err(|_| invalid(s.clone()))?;
                if !parsed.is_finite() {
                    return Err(invalid(s.clone()));
                }
                let value = match s.parse::<i64>() {
                    Ok(i) => ValueType::Int(i),
                    Err(_) => ValueType::Float(parsed),
                };
                Ok(Self {
                    value,
                    text: s.clone(),
                })
            }
            Some(other) => Err(invalid(other.to_string())),
            None => Err(invalid("null".to_string())),
        }
    }
}

/// A single-column filter.
#[derive(Debug, Clone, PartialEq)]
pub enum LeafFilter {
    Text {
        op: TextOp,
        value: String,
    },
    Number {
        op: NumberOp,
        value: NumericLiteral,
        to: Option<NumericLiteral>,
    },
    /// Filter types the translator does not handle (dates, sets); they
    /// contribute no condition.
    Ignored { filter_type: String },
}

/// Two filters on the same column joined by a conjunction.
#[derive(Debug, Clone, PartialEq)]
pub struct CompositeFilter {
    pub operator: Conjunction,
    pub condition1: Box<FilterSpec>,
    pub condition2: Box<FilterSpec>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum FilterSpec {
    Leaf(LeafFilter),
    Composite(CompositeFilter),
}

impl FilterSpec {
    fn from_raw(column: &str, raw: RawFilter) -> Result<Self, FilterError> {
        if let Some(operator) = raw.operator.filter(|op| !op.is_empty()) {
            let conjunction = match operator.to_ascii_uppercase().as_str() {
                "AND" => Conjunction::And,
                "OR" => Conjunction::Or,
                _ => {
                    return Err(FilterError::UnsupportedOperator {
                        column: column.to_string(),
                        operator,
                    })
                }
            };
            let missing = |which| FilterError::MissingCondition {
                column: column.to_string(),
                missing: which,
            };
            let c1 = raw.condition1.ok_or_else(|| missing("condition1"))?;
            let c2 = raw.condition2.ok_or_else(|| missing("condition2"))?;
            return Ok(FilterSpec::Composite(CompositeFilter {
                operator: conjunction,
                condition1: Box::new(Self::from_raw(column, *c1)?),
                condition2: Box::new(Self::from_raw(column, *c2)?),
            }));
        }

        let filter_type = raw.filter_type.unwrap_or_default();
        let kind = raw.kind.unwrap_or_default();
        let leaf = match filter_type.as_str() {
            "text" => LeafFilter::Text {
                op: TextOp::parse(&kind)?,
                value: text_value(raw.filter.as_ref()),
            },
            "number" => {
                let op = NumberOp::parse(&kind)?;
                let value = NumericLiteral::from_json(column, raw.filter.as_ref())?;
                let to = if op == NumberOp::InRange {
                    if raw.filter_to.as_ref().is_none_or(Value::is_null) {
                        return Err(FilterError::MissingRangeEnd {
                            column: column.to_string(),
                        });
                    }
                    Some(NumericLiteral::from_json(column, raw.filter_to.as_ref())?)
                } else {
                    None
                };
                LeafFilter::Number { op, value, to }
            }
            _ => LeafFilter::Ignored { filter_type },
        };
        Ok(FilterSpec::Leaf(leaf))
    }

    fn to_clause(&self, column: &str) -> FilterClause {
        match self {
            FilterSpec::Composite(composite) => {
                let c1 = composite.condition1.to_clause(column);
                let c2 = composite.condition2.to_clause(column);
                match (c1.is_empty(), c2.is_empty()) {
                    (true, true) => FilterClause::default(),
                    (false, true) => c1,
                    (true, false) => c2,
                    (false, false) => {
                        let op = format!(" {} ", composite.operator.as_sql());
                        FilterClause::join(vec![c1, c2], &op).parenthesized()
                    }
                }
            }
            FilterSpec::Leaf(leaf) => leaf_clause(column, leaf),
        }
    }
}

/// Strings are used verbatim, other JSON scalars through their JSON form.
fn text_value(value: Option<&Value>) -> String {
    match value {
        Some(Value::String(s)) => s.clone(),
        Some(Value::Null) | None => String::new(),
        Some(other) => other.to_string(),
    }
}

fn leaf_clause(column: &str, leaf: &LeafFilter) -> FilterClause {
    let col = quote_identifier(column);
    match leaf {
        LeafFilter::Text { op, value } => {
            let v = value.replace('\'', "''");
            let sql = match op {
                TextOp::Equals => format!("{} = '{}'", col, v),
                TextOp::NotEqual => format!("{} != '{}'", col, v),
                TextOp::Contains => format!("{} LIKE '%{}%'", col, v),
                TextOp::NotContains => format!("{} NOT LIKE '%{}%'", col, v),
                TextOp::StartsWith => format!("{} LIKE '{}%'", col, v),
                TextOp::EndsWith => format!("{} LIKE '%{}'", col, v),
            };
            FilterClause::literal(sql)
        }
        LeafFilter::Number { op, value, to } => {
            let mut clause = FilterClause::comparison(&col, op.comparator(), value);
            if let (NumberOp::InRange, Some(to)) = (op, to) {
                clause = FilterClause::join(
                    vec![clause, FilterClause::comparison(&col, "<=", to)],
                    " AND ",
                );
            }
            clause
        }
        LeafFilter::Ignored { .. } => FilterClause::default(),
    }
}

/// A SQL boolean expression with its bound parameters.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FilterClause {
    /// Expression with `?` placeholders for numeric literals.
    pub sql: String,
    /// Same expression with numeric literals written out.
    pub inline: String,
    /// Values for the placeholders in `sql`, in order.
    pub params: QueryParams,
}

impl FilterClause {
    fn literal(sql: String) -> Self {
        Self {
            inline: sql.clone(),
            sql,
            params: QueryParams::new(),
        }
    }

    fn comparison(col: &str, comparator: &str, literal: &NumericLiteral) -> Self {
        let mut params = QueryParams::new();
        params.push(literal.value.clone());
        Self {
            sql: format!("{} {} ?", col, comparator),
            inline: format!("{} {} {}", col, comparator, literal.text),
            params,
        }
    }

    fn join(parts: Vec<FilterClause>, separator: &str) -> Self {
        let mut sql = Vec::with_capacity(parts.len());
        let mut inline = Vec::with_capacity(parts.len());
        let mut params = QueryParams::new();
        for part in parts {
            sql.push(part.sql);
            inline.push(part.inline);
            params.extend(part.params);
        }
        Self {
            sql: sql.join(separator),
            inline: inline.join(separator),
            params,
        }
    }

    fn parenthesized(self) -> Self {
        Self {
            sql: format!("({})", self.sql),
            inline: format!("({})", self.inline),
            params: self.params,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.sql.is_empty()
    }
}

/// A validated filter model: column name to filter, in column-name order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FilterModel {
    columns: BTreeMap<String, FilterSpec>,
}

impl FilterModel {
    /// Decode and validate a filter-model JSON document.
    ///
    /// An empty (or whitespace-only) document and `null` yield an empty model.
    pub fn parse(json: &str) -> Result<Self, FilterError> {
        if json.trim().is_empty() {
            return Ok(Self::default());
        }
        let raw: Option<BTreeMap<String, RawFilter>> =
            serde_json::from_str(json).map_err(|e| FilterError::InvalidJson {
                message: e.to_string(),
            })?;

        let mut columns = BTreeMap::new();
        for (column, filter) in raw.unwrap_or_default() {
            let spec = FilterSpec::from_raw(&column, filter)?;
            columns.insert(column, spec);
        }
        Ok(Self { columns })
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    /// Render the model: each column's expression parenthesized, columns
    /// joined with `AND`. An empty clause means no conditions.
    pub fn to_clause(&self) -> FilterClause {
        let parts: Vec<FilterClause> = self
            .columns
            .iter()
            .map(|(column, spec)| spec.to_clause(column))
            .filter(|clause| !clause.is_empty())
            .map(FilterClause::parenthesized)
            .collect();
        FilterClause::join(parts, " AND ")
    }
}

/// Translate a filter-model JSON document into a predicate.
pub fn build_where_clause(filter_model_json: &str) -> Result<FilterClause, FilterError> {
    Ok(FilterModel::parse(filter_model_json)?.to_clause())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn text_filter(column: &str, kind: &str, value: &str) -> String {
        serde_json::json!({ column: { "filterType": "text", "type": kind, "filter": value } })
            .to_string()
    }

    #[rstest]
    #[case("equals", "Alice", r#"("name" = 'Alice')"#)]
    #[case("notEqual", "Alice", r#"("name" != 'Alice')"#)]
    #[case("contains", "li", r#"("name" LIKE '%li%')"#)]
    #[case("notContains", "li", r#"("name" NOT LIKE '%li%')"#)]
    #[case("startsWith", "Al", r#"("name" LIKE 'Al%')"#)]
    #[case("endsWith", "ce", r#"("name" LIKE '%ce')"#)]
    #[case("equals", "O'Brien", r#"("name" = 'O''Brien')"#)]
    fn test_text_operators(#[case] kind: &str, #[case] value: &str, #[case] expected: &str) {
        let clause = build_where_clause(&text_filter("name", kind, value)).unwrap();
        assert_eq!(clause.sql, expected);
        assert_eq!(clause.inline, expected);
        assert!(clause.params.is_empty());
    }

    #[rstest]
    fn test_unknown_text_type_rejected() {
        let result = build_where_clause(&text_filter("name", "fuzzy", "x"));
        assert_eq!(
            result,
            Err(FilterError::UnsupportedTextType {
                kind: "fuzzy".to_string()
            })
        );
    }

    #[rstest]
    #[case("equals", r#"("age" = ?)"#, r#"("age" = 30)"#)]
    #[case("notEqual", r#"("age" != ?)"#, r#"("age" != 30)"#)]
    #[case("greaterThan", r#"("age" > ?)"#, r#"("age" > 30)"#)]
    #[case("greaterThanOrEqual", r#"("age" >= ?)"#, r#"("age" >= 30)"#)]
    #[case("lessThan", r#"("age" < ?)"#, r#"("age" < 30)"#)]
    #[case("lessThanOrEqual", r#"("age" <= ?)"#, r#"("age" <= 30)"#)]
    fn test_number_operators(#[case] kind: &str, #[case] sql: &str, #[case] inline: &str) {
        let json = serde_json::json!({ "age": { "filterType": "number", "type": kind, "filter": 30 } });
        let clause = build_where_clause(&json.to_string()).unwrap();
        assert_eq!(clause.sql, sql);
        assert_eq!(clause.inline, inline);
        assert_eq!(clause.params.params(), &[ValueType::Int(30)]);
    }

    #[rstest]
    fn test_float_renders_fixed_point() {
        let json = r#"{"score": {"filterType": "number", "type": "greaterThan", "filter": 2.5}}"#;
        let clause = build_where_clause(json).unwrap();
        assert_eq!(clause.inline, r#"("score" > 2.500000)"#);
        assert_eq!(clause.params.params(), &[ValueType::Float(2.5)]);
    }

    #[rstest]
    fn test_numeric_string_accepted() {
        let json = r#"{"age": {"filterType": "number", "type": "equals", "filter": "42"}}"#;
        let clause = build_where_clause(json).unwrap();
        assert_eq!(clause.inline, r#"("age" = 42)"#);
        assert_eq!(clause.params.params(), &[ValueType::Int(42)]);
    }

    #[rstest]
    #[case(r#""30; DROP TABLE people""#)]
    #[case(r#""abc""#)]
    #[case(r#""NaN""#)]
    #[case(r#""inf""#)]
    #[case("true")]
    #[case("null")]
    #[case("[1]")]
    fn test_non_numeric_number_value_rejected(#[case] value: &str) {
        let json = format!(
            r#"{{"age": {{"filterType": "number", "type": "equals", "filter": {}}}}}"#,
            value
        );
        let result = build_where_clause(&json);
        assert!(
            matches!(result, Err(FilterError::InvalidNumber { .. })),
            "expected InvalidNumber for {}, got {:?}",
            value,
            result
        );
    }

    #[rstest]
    fn test_in_range() {
        let json = r#"{"age": {"filterType": "number", "type": "inRange", "filter": 20, "filterTo": 35}}"#;
        let clause = build_where_clause(json).unwrap();
        assert_eq!(clause.sql, r#"("age" >= ? AND "age" <= ?)"#);
        assert_eq!(clause.inline, r#"("age" >= 20 AND "age" <= 35)"#);
        assert_eq!(
            clause.params.params(),
            &[ValueType::Int(20), ValueType::Int(35)]
        );
    }

    #[rstest]
    fn test_in_range_requires_filter_to() {
        let json = r#"{"age": {"filterType": "number", "type": "inRange", "filter": 20}}"#;
        assert_eq!(
            build_where_clause(json),
            Err(FilterError::MissingRangeEnd {
                column: "age".to_string()
            })
        );
    }

    #[rstest]
    fn test_unknown_number_type_rejected() {
        let json = r#"{"age": {"filterType": "number", "type": "between", "filter": 1}}"#;
        assert!(matches!(
            build_where_clause(json),
            Err(FilterError::UnsupportedNumberType { .. })
        ));
    }

    #[rstest]
    #[case("OR", r#"(("name" = 'Bob' OR "name" LIKE 'Al%'))"#)]
    #[case("and", r#"(("name" = 'Bob' AND "name" LIKE 'Al%'))"#)]
    fn test_composite(#[case] operator: &str, #[case] expected: &str) {
        let json = serde_json::json!({
            "name": {
                "filterType": "text",
                "operator": operator,
                "condition1": { "filterType": "text", "type": "equals", "filter": "Bob" },
                "condition2": { "filterType": "text", "type": "startsWith", "filter": "Al" }
            }
        });
        let clause = build_where_clause(&json.to_string()).unwrap();
        assert_eq!(clause.sql, expected);
    }

    #[rstest]
    fn test_nested_composite_keeps_child_parentheses() {
        let json = serde_json::json!({
            "age": {
                "operator": "OR",
                "condition1": {
                    "operator": "AND",
                    "condition1": { "filterType": "number", "type": "greaterThan", "filter": 20 },
                    "condition2": { "filterType": "number", "type": "lessThan", "filter": 30 }
                },
                "condition2": { "filterType": "number", "type": "equals", "filter": 40 }
            }
        });
        let clause = build_where_clause(&json.to_string()).unwrap();
        assert_eq!(
            clause.inline,
            r#"((("age" > 20 AND "age" < 30) OR "age" = 40))"#
        );
        assert_eq!(
            clause.params.params(),
            &[ValueType::Int(20), ValueType::Int(30), ValueType::Int(40)]
        );
    }

    #[rstest]
    #[case(r#"{"a": {"operator": "OR", "condition1": {"filterType": "text", "type": "equals", "filter": "x"}}}"#, "condition2")]
    #[case(r#"{"a": {"operator": "AND", "condition2": {"filterType": "text", "type": "equals", "filter": "x"}}}"#, "condition1")]
    fn test_composite_missing_child(#[case] json: &str, #[case] missing: &'static str) {
        assert_eq!(
            build_where_clause(json),
            Err(FilterError::MissingCondition {
                column: "a".to_string(),
                missing
            })
        );
    }

    #[rstest]
    fn test_composite_unknown_operator() {
        let json = r#"{"a": {"operator": "XOR",
            "condition1": {"filterType": "text", "type": "equals", "filter": "x"},
            "condition2": {"filterType": "text", "type": "equals", "filter": "y"}}}"#;
        assert!(matches!(
            build_where_clause(json),
            Err(FilterError::UnsupportedOperator { .. })
        ));
    }

    #[rstest]
    fn test_multiple_columns_joined_with_and() {
        let json = serde_json::json!({
            "name": { "filterType": "text", "type": "contains", "filter": "e" },
            "age": { "filterType": "number", "type": "lessThan", "filter": 40 }
        });
        let clause = build_where_clause(&json.to_string()).unwrap();
        assert_eq!(
            clause.inline,
            r#"("age" < 40) AND ("name" LIKE '%e%')"#
        );
        assert_eq!(clause.params.len(), 1);
    }

    #[rstest]
    #[case("")]
    #[case("   ")]
    #[case("null")]
    #[case("{}")]
    fn test_empty_model_yields_empty_clause(#[case] json: &str) {
        assert!(build_where_clause(json).unwrap().is_empty());
    }

    #[rstest]
    fn test_unhandled_filter_type_contributes_nothing() {
        let json = r#"{"created": {"filterType": "date", "type": "equals", "dateFrom": "2024-01-01"}}"#;
        let model = FilterModel::parse(json).unwrap();
        assert_eq!(model.len(), 1);
        assert!(model.to_clause().is_empty());
    }

    #[rstest]
    fn test_malformed_json_rejected() {
        assert!(matches!(
            build_where_clause("{not json"),
            Err(FilterError::InvalidJson { .. })
        ));
    }

    #[rstest]
    fn test_column_identifier_is_quoted() {
        let clause = build_where_clause(&text_filter(r#"we"ird"#, "equals", "v")).unwrap();
        assert_eq!(clause.sql, r#"("we""ird" = 'v')"#);
    }
}
