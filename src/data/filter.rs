use std::borrow::Cow;
use std::fmt;

use super::expr::{self, CmpOp, Expr};
use super::model::{TabularDataset, Value};
use crate::error::{FilterError, FilterResult};

// ---------------------------------------------------------------------------
// Filter expressions and the chain
// ---------------------------------------------------------------------------

/// One user-entered predicate, stored trimmed and never empty.
///
/// Syntax is not checked here; that happens when the chain is applied.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilterExpression(String);

impl FilterExpression {
    pub fn new(text: &str) -> FilterResult<Self> {
        let trimmed = text.trim();
        if trimmed.is_empty() {
            return Err(FilterError::EmptyExpression);
        }
        Ok(FilterExpression(trimmed.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for FilterExpression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Ordered filter expressions, combined with AND from left to right.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FilterChain {
    expressions: Vec<FilterExpression>,
}

impl FilterChain {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, expression: FilterExpression) {
        self.expressions.push(expression);
    }

    pub fn remove(&mut self, index: usize) -> Option<FilterExpression> {
        (index < self.expressions.len()).then(|| self.expressions.remove(index))
    }

    pub fn clear(&mut self) {
        self.expressions.clear();
    }

    pub fn len(&self) -> usize {
        self.expressions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.expressions.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &FilterExpression> {
        self.expressions.iter()
    }

    /// Apply every expression to `dataset`, returning the surviving rows.
    pub fn apply(&self, dataset: &TabularDataset) -> FilterResult<TabularDataset> {
        apply(dataset, &self.expressions)
    }

    /// Like [`FilterChain::apply`], with per-expression row counts.
    pub fn apply_detailed(&self, dataset: &TabularDataset) -> FilterResult<FilterOutcome> {
        apply_detailed(dataset, &self.expressions)
    }
}

impl FromIterator<FilterExpression> for FilterChain {
    fn from_iter<I: IntoIterator<Item = FilterExpression>>(iter: I) -> Self {
        FilterChain {
            expressions: iter.into_iter().collect(),
        }
    }
}

/// What one expression did to the rows it was given.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StageReport {
    pub expression: String,
    pub input_rows: usize,
    pub kept_rows: usize,
    /// Rows dropped because a comparison mixed incompatible types.
    pub mismatched_rows: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FilterOutcome {
    pub dataset: TabularDataset,
    pub stages: Vec<StageReport>,
}

/// Apply `expressions` in order; each one only sees rows kept by the previous ones.
///
/// Every expression is parsed and checked against the column set before any
/// row is evaluated, so a bad expression anywhere in the chain fails the whole
/// call and nothing is filtered.
pub fn apply(
    dataset: &TabularDataset,
    expressions: &[FilterExpression],
) -> FilterResult<TabularDataset> {
    apply_detailed(dataset, expressions).map(|outcome| outcome.dataset)
}

pub fn apply_detailed(
    dataset: &TabularDataset,
    expressions: &[FilterExpression],
) -> FilterResult<FilterOutcome> {
    let predicates = expressions
        .iter()
        .enumerate()
        .map(|(index, expression)| Predicate::compile(index, expression, dataset.columns()))
        .collect::<FilterResult<Vec<_>>>()?;

    let mut surviving: Vec<usize> = (0..dataset.len()).collect();
    let mut stages = Vec::with_capacity(predicates.len());

    for (predicate, expression) in predicates.iter().zip(expressions) {
        let input_rows = surviving.len();
        let mut mismatched_rows = 0;
        surviving.retain(|&i| match predicate.matches(&dataset.rows()[i]) {
            Ok(keep) => keep,
            Err(Mismatch) => {
                mismatched_rows += 1;
                false
            }
        });

        log::debug!(
            "filter `{expression}` kept {}/{input_rows} rows",
            surviving.len()
        );
        if mismatched_rows > 0 {
            log::warn!(
                "filter `{expression}` excluded {mismatched_rows} rows with incomparable values"
            );
        }

        stages.push(StageReport {
            expression: expression.to_string(),
            input_rows,
            kept_rows: surviving.len(),
            mismatched_rows,
        });
    }

    Ok(FilterOutcome {
        dataset: dataset.select_rows(&surviving),
        stages,
    })
}

// ---------------------------------------------------------------------------
// Predicate: an expression bound to column positions
// ---------------------------------------------------------------------------

/// A row whose values can't be compared as the expression asks.
/// The row is excluded; the chain keeps going.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Mismatch;

#[derive(Debug)]
enum Node {
    Compare {
        op: CmpOp,
        left: Box<Node>,
        right: Box<Node>,
    },
    And(Box<Node>, Box<Node>),
    Or(Box<Node>, Box<Node>),
    Not(Box<Node>),
    Literal(Value),
    Column(usize),
}

#[derive(Debug)]
struct Predicate {
    root: Node,
}

impl Predicate {
    fn compile(index: usize, expression: &FilterExpression, columns: &[String]) -> FilterResult<Self> {
        let parsed = expr::parse(expression.as_str()).map_err(|source| {
            FilterError::InvalidExpressionSyntax {
                index,
                expression: expression.to_string(),
                source,
            }
        })?;
        let root = bind(&parsed, columns).map_err(|column| FilterError::UnknownColumn {
            index,
            expression: expression.to_string(),
            column,
        })?;
        Ok(Predicate { root })
    }

    fn matches(&self, row: &[Value]) -> Result<bool, Mismatch> {
        truth(&*eval(&self.root, row)?)
    }
}

/// Resolve column names to positions; the error is the first unknown name.
fn bind(expr: &Expr, columns: &[String]) -> Result<Node, String> {
    Ok(match expr {
        Expr::Compare { op, left, right } => Node::Compare {
            op: *op,
            left: Box::new(bind(left, columns)?),
            right: Box::new(bind(right, columns)?),
        },
        Expr::And(l, r) => Node::And(Box::new(bind(l, columns)?), Box::new(bind(r, columns)?)),
        Expr::Or(l, r) => Node::Or(Box::new(bind(l, columns)?), Box::new(bind(r, columns)?)),
        Expr::Not(inner) => Node::Not(Box::new(bind(inner, columns)?)),
        Expr::Literal(v) => Node::Literal(v.clone()),
        Expr::Column(name) => Node::Column(
            columns
                .iter()
                .position(|c| c == name)
                .ok_or_else(|| name.clone())?,
        ),
    })
}

fn eval<'a>(node: &'a Node, row: &'a [Value]) -> Result<Cow<'a, Value>, Mismatch> {
    Ok(match node {
        Node::Literal(v) => Cow::Borrowed(v),
        Node::Column(i) => Cow::Borrowed(&row[*i]),
        Node::Compare { op, left, right } => {
            let l = eval(left, row)?;
            let r = eval(right, row)?;
            Cow::Owned(Value::Bool(compare(*op, &l, &r)?))
        }
        Node::And(l, r) => {
            let result = truth(&*eval(l, row)?)? && truth(&*eval(r, row)?)?;
            Cow::Owned(Value::Bool(result))
        }
        Node::Or(l, r) => {
            let result = truth(&*eval(l, row)?)? || truth(&*eval(r, row)?)?;
            Cow::Owned(Value::Bool(result))
        }
        Node::Not(inner) => Cow::Owned(Value::Bool(!truth(&*eval(inner, row)?)?)),
    })
}

/// Only booleans have a truth value.
fn truth(value: &Value) -> Result<bool, Mismatch> {
    match value {
        Value::Bool(b) => Ok(*b),
        _ => Err(Mismatch),
    }
}

/// Compare two cells. Numbers compare numerically across integer/float; null
/// only supports `==`/`!=`; any other cross-type comparison is a mismatch.
fn compare(op: CmpOp, left: &Value, right: &Value) -> Result<bool, Mismatch> {
    use Value::*;

    let ordering = match (left, right) {
        (Null, Null) => return equality_only(op, true),
        (Null, _) | (_, Null) => return equality_only(op, false),
        (Integer(a), Integer(b)) => a.cmp(b),
        (Integer(_) | Float(_), Integer(_) | Float(_)) => {
            let (a, b) = (left.as_f64().ok_or(Mismatch)?, right.as_f64().ok_or(Mismatch)?);
            a.partial_cmp(&b).ok_or(Mismatch)?
        }
        (String(a), String(b)) => a.cmp(b),
        (Bool(a), Bool(b)) => a.cmp(b),
        _ => return Err(Mismatch),
    };
    Ok(op.holds(ordering))
}

fn equality_only(op: CmpOp, equal: bool) -> Result<bool, Mismatch> {
    match op {
        CmpOp::Eq => Ok(equal),
        CmpOp::Ne => Ok(!equal),
        _ => Err(Mismatch),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn people() -> TabularDataset {
        TabularDataset::try_new(
            vec!["age".into(), "name".into(), "score".into(), "vip".into()],
            vec![
                vec![30i64.into(), "A".into(), 9.5.into(), true.into()],
                vec![15i64.into(), "B".into(), Value::Null, false.into()],
                vec![42i64.into(), "C".into(), 3.0.into(), false.into()],
                vec![Value::from("n/a"), "D".into(), 7.25.into(), true.into()],
            ],
        )
        .unwrap()
    }

    fn chain(exprs: &[&str]) -> FilterChain {
        exprs
            .iter()
            .map(|e| FilterExpression::new(e).unwrap())
            .collect()
    }

    fn names(ds: &TabularDataset) -> Vec<String> {
        (0..ds.len())
            .map(|i| ds.value(i, "name").unwrap().to_string())
            .collect()
    }

    #[test]
    fn test_blank_expression_rejected() {
        assert_eq!(FilterExpression::new("  \t"), Err(FilterError::EmptyExpression));
        assert_eq!(FilterExpression::new(" a > 1 ").unwrap().as_str(), "a > 1");
    }

    #[test]
    fn test_single_comparison() {
        let out = chain(&["age >= 18"]).apply(&people()).unwrap();
        assert_eq!(names(&out), ["A", "C"]);
        assert_eq!(out.columns(), people().columns());
    }

    #[test]
    fn test_chain_is_intersective() {
        let out = chain(&["age >= 18", "score < 5"]).apply(&people()).unwrap();
        assert_eq!(names(&out), ["C"]);
    }

    #[test]
    fn test_empty_chain_keeps_everything() {
        let ds = people();
        assert_eq!(FilterChain::new().apply(&ds).unwrap(), ds);
    }

    #[test]
    fn test_boolean_combinators() {
        let ds = people();
        let out = chain(&["name == 'A' or name == \"D\""]).apply(&ds).unwrap();
        assert_eq!(names(&out), ["A", "D"]);

        let out = chain(&["vip and not (score > 8)"]).apply(&ds).unwrap();
        assert_eq!(names(&out), ["D"]);
    }

    #[test]
    fn test_type_mismatch_excludes_row_only() {
        // row D has a string age: excluded, others evaluated normally
        let outcome = chain(&["age > 10"]).apply_detailed(&people()).unwrap();
        assert_eq!(names(&outcome.dataset), ["A", "B", "C"]);
        assert_eq!(outcome.stages[0].mismatched_rows, 1);
        assert_eq!(outcome.stages[0].kept_rows, 3);
    }

    #[test]
    fn test_null_semantics() {
        let ds = people();
        let out = chain(&["score == null"]).apply(&ds).unwrap();
        assert_eq!(names(&out), ["B"]);

        let out = chain(&["score != null"]).apply(&ds).unwrap();
        assert_eq!(names(&out), ["A", "C", "D"]);

        // ordering against null is a mismatch
        let outcome = chain(&["score > 1"]).apply_detailed(&ds).unwrap();
        assert_eq!(names(&outcome.dataset), ["A", "C", "D"]);
        assert_eq!(outcome.stages[0].mismatched_rows, 1);
    }

    #[test]
    fn test_int_float_compare_numerically() {
        let out = chain(&["score >= 7", "age != 3.0"]).apply(&people()).unwrap();
        // D's string age mismatches
        assert_eq!(names(&out), ["A"]);
    }

    #[test]
    fn test_non_boolean_predicate_excludes_rows() {
        let outcome = chain(&["age"]).apply_detailed(&people()).unwrap();
        assert!(outcome.dataset.is_empty());
        assert_eq!(outcome.stages[0].mismatched_rows, 4);
    }

    #[test]
    fn test_unknown_column_aborts() {
        let err = chain(&["age > 1", "salary > 10"]).apply(&people()).unwrap_err();
        assert_eq!(
            err,
            FilterError::UnknownColumn {
                index: 1,
                expression: "salary > 10".into(),
                column: "salary".into(),
            }
        );
    }

    #[test]
    fn test_column_names_are_case_sensitive() {
        let err = chain(&["Age > 1"]).apply(&people()).unwrap_err();
        assert!(matches!(err, FilterError::UnknownColumn { .. }));
    }

    #[test]
    fn test_syntax_error_aborts() {
        let err = chain(&["age > 1", "age >"]).apply(&people()).unwrap_err();
        match err {
            FilterError::InvalidExpressionSyntax { index, .. } => assert_eq!(index, 1),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_deeply_nested_filter_is_syntax_error() {
        let text = format!("{}age > 1", "not ".repeat(200_000));
        let err = chain(&[text.as_str()]).apply(&people()).unwrap_err();
        assert!(matches!(
            err,
            FilterError::InvalidExpressionSyntax { index: 0, .. }
        ));
    }

    #[test]
    fn test_nested_combinators_evaluate() {
        let out = chain(&["not (not (age >= 18 and (vip or score < 5)))"])
            .apply(&people())
            .unwrap();
        assert_eq!(names(&out), ["A", "C"]);
    }

    #[test]
    fn test_reapplying_is_idempotent() {
        let c = chain(&["age >= 18", "vip == false"]);
        let once = c.apply(&people()).unwrap();
        let twice = c.apply(&once).unwrap();
        assert_eq!(once, twice);
    }

    #[test]
    fn test_chain_editing() {
        let mut c = chain(&["a > 1", "b > 2"]);
        assert_eq!(c.remove(5), None);
        assert_eq!(c.remove(0).unwrap().as_str(), "a > 1");
        assert_eq!(c.len(), 1);
        c.clear();
        assert!(c.is_empty());
    }
}
