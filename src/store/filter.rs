//! Filter expressions compiled into query-store predicates.
//!
//! A [`Filter`] is a nested boolean tree of per-field conditions. The
//! compiler renders it into the predicate of a `WHERE` clause for the
//! document store's SQL dialect. Filters can be built directly with the
//! typed constructors or parsed from the JSON shape tool arguments use
//! (`{"AND": {"field": {"gt": "..."}, "OR": {...}}}`).

use serde_json::Value;

use crate::error::FilterError;

/// A comparison applied to a single document field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Condition {
    Equals(String),
    NotEquals(String),
    GreaterThan(String),
    LessThan(String),
    /// Field value is one of the listed values.
    In(Vec<String>),
    /// Case-insensitive membership.
    InIgnoreCase(Vec<String>),
    /// Substring match.
    Like(String),
    /// Case-insensitive substring match.
    LikeIgnoreCase(String),
    /// Array-valued field contains any one of the listed values.
    ContainsAny(Vec<String>),
}

/// A boolean filter tree over document fields.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Filter {
    Field { field: String, condition: Condition },
    And(Vec<Filter>),
    Or(Vec<Filter>),
}

impl Filter {
    /// A single-field condition.
    pub fn field(field: impl Into<String>, condition: Condition) -> Self {
        Filter::Field {
            field: field.into(),
            condition,
        }
    }

    /// All children must match.
    pub fn and(children: Vec<Filter>) -> Self {
        Filter::And(children)
    }

    /// Any child must match.
    pub fn or(children: Vec<Filter>) -> Self {
        Filter::Or(children)
    }

    /// An empty filter; compiles to the empty string.
    pub fn empty() -> Self {
        Filter::And(Vec::new())
    }

    /// Whether this filter compiles to nothing.
    pub fn is_empty(&self) -> bool {
        self.compile().is_empty()
    }

    /// Render the filter as a query predicate.
    ///
    /// An empty filter renders as the empty string; the caller must then
    /// omit the `WHERE` keyword entirely. Values are interpolated into the
    /// predicate as quoted string literals WITHOUT escaping, so untrusted
    /// text must never reach a filter value unsanitized.
    pub fn compile(&self) -> String {
        match self {
            Filter::Field { field, condition } => compile_condition(field, condition),
            Filter::And(children) => compile_group(children, " AND "),
            Filter::Or(children) => compile_group(children, " OR "),
        }
    }

    /// Parse a filter from the JSON object shape.
    ///
    /// A node is either a combinator (`{"AND": {...}}` / `{"OR": {...}}`)
    /// or a mapping of field names to conditions. Conditions are operator
    /// maps (`{"gt": "2021-01-01"}`), bare lists (array containment over
    /// any listed value), or bare scalars (equality).
    pub fn from_value(value: &Value) -> Result<Filter, FilterError> {
        let map = value.as_object().ok_or_else(|| {
            FilterError::MalformedSpec(format!("expected an object, got {}", type_name(value)))
        })?;

        let combinators: Vec<&String> = map
            .keys()
            .filter(|k| k.as_str() == "AND" || k.as_str() == "OR")
            .collect();

        if !combinators.is_empty() {
            if map.len() > 1 {
                return Err(FilterError::MalformedSpec(
                    "a node must be exactly one of: field conditions, AND, OR".to_string(),
                ));
            }
            let key = combinators[0].as_str();
            let children = parse_children(&map[key])?;
            return Ok(match key {
                "AND" => Filter::And(children),
                _ => Filter::Or(children),
            });
        }

        let mut children = Vec::new();
        for (field, spec) in map {
            children.extend(parse_condition(field, spec)?);
        }
        Ok(Filter::And(children))
    }
}

/// Parse the children of an `AND`/`OR` node, which mix field conditions
/// with nested combinators.
fn parse_children(value: &Value) -> Result<Vec<Filter>, FilterError> {
    let map = value.as_object().ok_or_else(|| {
        FilterError::MalformedSpec(format!(
            "combinator body must be an object, got {}",
            type_name(value)
        ))
    })?;

    let mut children = Vec::new();
    for (key, spec) in map {
        match key.as_str() {
            "AND" => children.push(Filter::And(parse_children(spec)?)),
            "OR" => children.push(Filter::Or(parse_children(spec)?)),
            field => children.extend(parse_condition(field, spec)?),
        }
    }
    Ok(children)
}

/// Parse the condition(s) attached to one field. An operator map may
/// carry several operators (`{"gt": ..., "lt": ...}`), each becoming its
/// own leaf joined by the enclosing combinator.
fn parse_condition(field: &str, spec: &Value) -> Result<Vec<Filter>, FilterError> {
    match spec {
        Value::Array(items) => {
            let values = scalar_list(field, items)?;
            Ok(vec![Filter::field(field, Condition::ContainsAny(values))])
        }
        Value::Object(ops) => {
            let mut filters = Vec::new();
            for (op, value) in ops {
                let condition = match op.as_str() {
                    "eq" => Condition::Equals(scalar(field, value)?),
                    "ne" => Condition::NotEquals(scalar(field, value)?),
                    "gt" => Condition::GreaterThan(scalar(field, value)?),
                    "lt" => Condition::LessThan(scalar(field, value)?),
                    "in" => Condition::In(scalar_list(field, list(field, value)?)?),
                    "iin" => Condition::InIgnoreCase(scalar_list(field, list(field, value)?)?),
                    "like" => Condition::Like(scalar(field, value)?),
                    "ilike" => Condition::LikeIgnoreCase(scalar(field, value)?),
                    other => return Err(FilterError::UnsupportedOperator(other.to_string())),
                };
                filters.push(Filter::field(field, condition));
            }
            Ok(filters)
        }
        scalar_value => Ok(vec![Filter::field(
            field,
            Condition::Equals(scalar(field, scalar_value)?),
        )]),
    }
}

fn compile_group(children: &[Filter], join: &str) -> String {
    let parts: Vec<String> = children
        .iter()
        .map(Filter::compile)
        .filter(|s| !s.is_empty())
        .collect();

    match parts.len() {
        0 => String::new(),
        1 => parts.into_iter().next().unwrap(),
        _ => format!("({})", parts.join(join)),
    }
}

fn compile_condition(field: &str, condition: &Condition) -> String {
    match condition {
        Condition::Equals(v) => format!("{} = {}", field, quote(v)),
        Condition::NotEquals(v) => format!("{} != {}", field, quote(v)),
        Condition::GreaterThan(v) => format!("{} > {}", field, quote(v)),
        Condition::LessThan(v) => format!("{} < {}", field, quote(v)),
        Condition::In(values) => format!("{} IN ({})", field, quoted_list(values)),
        Condition::InIgnoreCase(values) => {
            let lowered: Vec<String> = values.iter().map(|v| v.to_lowercase()).collect();
            format!("LOWER({}) IN ({})", field, quoted_list(&lowered))
        }
        Condition::Like(v) => format!("{} LIKE '%{}%'", field, v),
        Condition::LikeIgnoreCase(v) => {
            format!("LOWER({}) LIKE '%{}%'", field, v.to_lowercase())
        }
        Condition::ContainsAny(values) => {
            let parts: Vec<String> = values
                .iter()
                .map(|v| format!("ARRAY_CONTAINS({}, {})", field, quote(v)))
                .collect();
            match parts.len() {
                0 => String::new(),
                1 => parts.into_iter().next().unwrap(),
                _ => format!("({})", parts.join(" OR ")),
            }
        }
    }
}

// Values are quoted verbatim; see the compile() contract.
fn quote(value: &str) -> String {
    format!("'{}'", value)
}

fn quoted_list(values: &[String]) -> String {
    values
        .iter()
        .map(|v| quote(v))
        .collect::<Vec<_>>()
        .join(", ")
}

fn scalar(field: &str, value: &Value) -> Result<String, FilterError> {
    match value {
        Value::String(s) => Ok(s.clone()),
        Value::Number(n) => Ok(n.to_string()),
        Value::Bool(b) => Ok(b.to_string()),
        other => Err(FilterError::MalformedSpec(format!(
            "field '{}' has a non-scalar value of type {}",
            field,
            type_name(other)
        ))),
    }
}

fn scalar_list(field: &str, items: &[Value]) -> Result<Vec<String>, FilterError> {
    items.iter().map(|v| scalar(field, v)).collect()
}

fn list<'a>(field: &str, value: &'a Value) -> Result<&'a Vec<Value>, FilterError> {
    value.as_array().ok_or_else(|| {
        FilterError::MalformedSpec(format!(
            "field '{}' expects a list value, got {}",
            field,
            type_name(value)
        ))
    })
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
