//! Query rule evaluation for the bundled drivers.
//!
//! Rules are plain values:
//!
//! ```text
//! rules   := null | [rule, ...]            (all rules must match)
//! rule    := [path, op, operand]
//!          | ["or" | "and" | "nor", [rule, ...]]
//! op      := "=" | "!=" | ">" | "<" | ">=" | "<="
//!          | "in" | "nin" | "contains" | "~"
//! ```
//!
//! Paths are dotted; the path `id` addresses the object's key. A missing
//! field compares equal to `null`. Ordering operators only match values of
//! the same kind (numbers compare with numbers, strings with strings).

use crate::driver::QueryParams;
use crate::error::{DriverError, DriverResult};
use persist_value::Value;
use regex::Regex;
use std::borrow::Cow;
use std::cmp::Ordering;

/// A compiled set of query rules.
#[derive(Debug, Clone)]
pub struct Filter {
    rules: Vec<Rule>,
}

#[derive(Debug, Clone)]
enum Rule {
    Compare {
        path: String,
        op: CompareOp,
        operand: Value,
    },
    Matches {
        path: String,
        pattern: Regex,
    },
    Or(Vec<Rule>),
    And(Vec<Rule>),
    Nor(Vec<Rule>),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CompareOp {
    Eq,
    Ne,
    Gt,
    Lt,
    Ge,
    Le,
    In,
    Nin,
    Contains,
}

impl Filter {
    /// Compiles rules.
    ///
    /// # Errors
    ///
    /// Returns [`DriverError::InvalidQuery`] if the rules are malformed.
    pub fn parse(rules: &Value) -> DriverResult<Self> {
        let rules = match rules {
            Value::Null => Vec::new(),
            Value::Array(items) => parse_list(items)?,
            other => {
                return Err(DriverError::invalid_query(format!(
                    "rules must be an array, found {}",
                    other.type_name()
                )))
            }
        };
        Ok(Self { rules })
    }

    /// A filter matching every object.
    #[must_use]
    pub fn all() -> Self {
        Self { rules: Vec::new() }
    }

    /// Returns true if the object stored under `id` matches.
    pub fn matches(&self, id: &str, value: &Value) -> bool {
        self.rules.iter().all(|rule| rule.matches(id, value))
    }
}

fn parse_list(items: &[Value]) -> DriverResult<Vec<Rule>> {
    items.iter().map(parse_rule).collect()
}

fn parse_rule(rule: &Value) -> DriverResult<Rule> {
    let parts = rule
        .as_array()
        .ok_or_else(|| DriverError::invalid_query("each rule must be an array"))?;

    match parts {
        [Value::Text(logic), Value::Array(children)] => {
            let children = parse_list(children)?;
            match logic.as_str() {
                "or" => Ok(Rule::Or(children)),
                "and" => Ok(Rule::And(children)),
                "nor" => Ok(Rule::Nor(children)),
                other => Err(DriverError::invalid_query(format!(
                    "unknown logic operator: {other}"
                ))),
            }
        }
        [Value::Text(path), Value::Text(op), operand] => {
            if op == "~" {
                let source = operand
                    .as_text()
                    .ok_or_else(|| DriverError::invalid_query("'~' needs a string pattern"))?;
                let pattern = Regex::new(source)
                    .map_err(|e| DriverError::invalid_query(format!("bad pattern: {e}")))?;
                return Ok(Rule::Matches {
                    path: path.clone(),
                    pattern,
                });
            }

            let op = match op.as_str() {
                "=" => CompareOp::Eq,
                "!=" => CompareOp::Ne,
                ">" => CompareOp::Gt,
                "<" => CompareOp::Lt,
                ">=" => CompareOp::Ge,
                "<=" => CompareOp::Le,
                "in" => CompareOp::In,
                "nin" => CompareOp::Nin,
                "contains" => CompareOp::Contains,
                other => {
                    return Err(DriverError::invalid_query(format!(
                        "unknown operator: {other}"
                    )))
                }
            };
            if matches!(op, CompareOp::In | CompareOp::Nin) && !operand.is_array() {
                return Err(DriverError::invalid_query("'in'/'nin' need an array operand"));
            }
            Ok(Rule::Compare {
                path: path.clone(),
                op,
                operand: operand.clone(),
            })
        }
        _ => Err(DriverError::invalid_query(
            "rule must be [path, op, value] or [logic, [rules]]",
        )),
    }
}

/// Resolves a path against an object, treating `id` as the key.
fn resolve<'a>(path: &str, id: &str, value: &'a Value) -> Cow<'a, Value> {
    if path == "id" {
        return Cow::Owned(Value::Text(id.to_string()));
    }
    value
        .get_path(path)
        .map_or(Cow::Owned(Value::Null), Cow::Borrowed)
}

fn same_kind(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Integer(_) | Value::Float(_), Value::Integer(_) | Value::Float(_)) => true,
        _ => std::mem::discriminant(a) == std::mem::discriminant(b),
    }
}

impl Rule {
    fn matches(&self, id: &str, value: &Value) -> bool {
        match self {
            Rule::Compare { path, op, operand } => {
                let field = resolve(path, id, value);
                compare(&field, *op, operand)
            }
            Rule::Matches { path, pattern } => match resolve(path, id, value).as_ref() {
                Value::Text(s) => pattern.is_match(s),
                _ => false,
            },
            Rule::Or(rules) => rules.iter().any(|r| r.matches(id, value)),
            Rule::And(rules) => rules.iter().all(|r| r.matches(id, value)),
            Rule::Nor(rules) => !rules.iter().any(|r| r.matches(id, value)),
        }
    }
}

fn compare(field: &Value, op: CompareOp, operand: &Value) -> bool {
    match op {
        CompareOp::Eq => field.loosely_equals(operand),
        CompareOp::Ne => !field.loosely_equals(operand),
        CompareOp::Gt | CompareOp::Lt | CompareOp::Ge | CompareOp::Le => {
            if !same_kind(field, operand) {
                return false;
            }
            let ord = field.cmp_total(operand);
            match op {
                CompareOp::Gt => ord == Ordering::Greater,
                CompareOp::Lt => ord == Ordering::Less,
                CompareOp::Ge => ord != Ordering::Less,
                _ => ord != Ordering::Greater,
            }
        }
        CompareOp::In => operand
            .as_array()
            .is_some_and(|items| items.iter().any(|v| field.loosely_equals(v))),
        CompareOp::Nin => !operand
            .as_array()
            .is_some_and(|items| items.iter().any(|v| field.loosely_equals(v))),
        CompareOp::Contains => match (field, operand) {
            (Value::Array(items), _) => items.iter().any(|v| v.loosely_equals(operand)),
            (Value::Text(s), Value::Text(needle)) => s.contains(needle.as_str()),
            _ => false,
        },
    }
}

/// Applies a filter and query params to a set of rows.
///
/// Rows are `(id, value)` pairs in the driver's natural order. Sorting is
/// stable, so rows with equal sort keys keep that order.
pub fn select<'a, I>(rows: I, filter: &Filter, params: &QueryParams) -> Vec<(String, Value)>
where
    I: IntoIterator<Item = (&'a String, &'a Value)>,
{
    let mut selected: Vec<(String, Value)> = rows
        .into_iter()
        .filter(|(id, value)| filter.matches(id, value))
        .map(|(id, value)| (id.clone(), value.clone()))
        .collect();

    if let Some(path) = params.sort.as_deref() {
        selected.sort_by(|(a_id, a), (b_id, b)| {
            resolve(path, a_id, a).cmp_total(&resolve(path, b_id, b))
        });
    }
    if params.descending {
        selected.reverse();
    }

    let limit = params.limit.unwrap_or(usize::MAX);
    selected
        .into_iter()
        .skip(params.offset)
        .take(limit)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use persist_value::dict;
    use std::collections::BTreeMap;

    /// Builds rules from `path op operand` clauses separated by `;`.
    fn rules(text: &str) -> Value {
        let clauses: Vec<Value> = text
            .split(';')
            .filter(|s| !s.trim().is_empty())
            .map(|s| clause(s.trim()))
            .collect();
        Value::Array(clauses)
    }

    fn clause(text: &str) -> Value {
        let mut parts = text.splitn(3, ' ');
        let path = parts.next().unwrap();
        let op = parts.next().unwrap();
        let raw = parts.next().unwrap();
        let operand = raw
            .parse::<i64>()
            .map(Value::Integer)
            .unwrap_or_else(|_| Value::from(raw.trim_matches('"')));
        Value::from(vec![Value::from(path), Value::from(op), operand])
    }

    fn ann() -> Value {
        dict! {
            "name" => "Ann",
            "age" => 31,
            "tags" => vec!["admin", "ops"],
            "address" => dict! { "city" => "Oslo" },
        }
    }

    #[test]
    fn null_rules_match_everything() {
        let filter = Filter::parse(&Value::Null).unwrap();
        assert!(filter.matches("1", &ann()));
        assert!(Filter::all().matches("1", &Value::Null));
    }

    #[test]
    fn comparison_operators() {
        let doc = ann();
        let check = |text: &str| Filter::parse(&rules(text)).unwrap().matches("1", &doc);

        assert!(check("name = Ann"));
        assert!(check("name != Bob"));
        assert!(check("age > 30"));
        assert!(!check("age < 30"));
        assert!(check("age >= 31"));
        assert!(check("age <= 31"));
        assert!(check("address.city = Oslo"));
        assert!(check("tags contains admin"));
        assert!(check("name contains An"));
        assert!(check("id = \"1\""));
        assert!(!check("missing > 1"));
        assert!(check("name = Ann; age > 30"));
        assert!(!check("name = Ann; age > 40"));
    }

    #[test]
    fn ordering_needs_matching_kinds() {
        let doc = ann();
        let filter = Filter::parse(&Value::from(vec![Value::from(vec![
            Value::from("name"),
            Value::from(">"),
            Value::Integer(1),
        ])]))
        .unwrap();
        assert!(!filter.matches("1", &doc));
    }

    #[test]
    fn missing_field_equals_null() {
        let filter = Filter::parse(&Value::from(vec![Value::from(vec![
            Value::from("nickname"),
            Value::from("="),
            Value::Null,
        ])]))
        .unwrap();
        assert!(filter.matches("1", &ann()));
    }

    #[test]
    fn membership_operators() {
        let in_rule = |op: &str| {
            Value::from(vec![Value::from(vec![
                Value::from("age"),
                Value::from(op),
                Value::from(vec![30, 31]),
            ])])
        };
        assert!(Filter::parse(&in_rule("in")).unwrap().matches("1", &ann()));
        assert!(!Filter::parse(&in_rule("nin")).unwrap().matches("1", &ann()));
    }

    #[test]
    fn regex_operator() {
        let rule = |pattern: &str| {
            Value::from(vec![Value::from(vec![
                Value::from("name"),
                Value::from("~"),
                Value::from(pattern),
            ])])
        };
        assert!(Filter::parse(&rule("^A.n$")).unwrap().matches("1", &ann()));
        assert!(!Filter::parse(&rule("^B")).unwrap().matches("1", &ann()));
        assert!(matches!(
            Filter::parse(&rule("(")),
            Err(DriverError::InvalidQuery { .. })
        ));
    }

    #[test]
    fn logic_operators() {
        let age = |op: &str, n: i64| {
            Value::from(vec![Value::from("age"), Value::from(op), Value::Integer(n)])
        };
        let logic = |name: &str, children: Vec<Value>| {
            Value::from(vec![Value::from(vec![Value::from(name), Value::Array(children)])])
        };

        let or = logic("or", vec![age("<", 10), age(">", 30)]);
        let and = logic("and", vec![age("<", 10), age(">", 30)]);
        let nor = logic("nor", vec![age("<", 10), age(">", 40)]);

        assert!(Filter::parse(&or).unwrap().matches("1", &ann()));
        assert!(!Filter::parse(&and).unwrap().matches("1", &ann()));
        assert!(Filter::parse(&nor).unwrap().matches("1", &ann()));
    }

    #[test]
    fn malformed_rules_are_rejected() {
        for bad in [
            Value::from("name = Ann"),
            Value::from(vec![Value::Integer(1)]),
            Value::from(vec![Value::from(vec!["name", "=~="])]),
            Value::from(vec![Value::from(vec![
                Value::from("name"),
                Value::from("like"),
                Value::from("A"),
            ])]),
            Value::from(vec![Value::from(vec![
                Value::from("age"),
                Value::from("in"),
                Value::Integer(3),
            ])]),
            Value::from(vec![Value::from(vec![
                Value::from("xor"),
                Value::empty_array(),
            ])]),
        ] {
            assert!(
                matches!(Filter::parse(&bad), Err(DriverError::InvalidQuery { .. })),
                "accepted {bad:?}"
            );
        }
    }

    #[test]
    fn select_sorts_and_pages() {
        let mut rows = BTreeMap::new();
        for (id, age) in [("a", 40), ("b", 20), ("c", 30), ("d", 10)] {
            rows.insert(id.to_string(), dict! { "age" => age });
        }

        let params = QueryParams::new().sort("age").offset(1).limit(2);
        let ids: Vec<String> = select(&rows, &Filter::all(), &params)
            .into_iter()
            .map(|(id, _)| id)
            .collect();
        assert_eq!(ids, ["b", "c"]);

        let params = QueryParams::new().sort("age").descending(true).limit(1);
        let ids: Vec<String> = select(&rows, &Filter::all(), &params)
            .into_iter()
            .map(|(id, _)| id)
            .collect();
        assert_eq!(ids, ["a"]);
    }
}
