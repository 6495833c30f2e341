//! Expression builder
//!
//! Composes key conditions, filter conditions and projections into a single
//! [`Expression`] whose text only references aliases:
//!
//! | Alias  | Resolves to                     |
//! |--------|---------------------------------|
//! | `#nK`  | attribute name (path segment)   |
//! | `:vK`  | attribute value                 |
//!
//! Every attribute name is aliased, so reserved words never need escaping.

use aws_sdk_dynamodb::types::AttributeValue;
use serde::Serialize;
use std::collections::HashMap;

use crate::errors::{Error, Result};

/// Attribute path, e.g. `status` or `address.city`
#[derive(Debug, Clone, PartialEq)]
pub struct Name(String);

/// Side of a comparison: an attribute path or a literal value
#[derive(Debug, Clone, PartialEq)]
pub enum Operand {
    Name(Name),
    Value(AttributeValue),
    /// A value that failed to marshal, reported when the expression is built
    Invalid(String),
}

/// Marshal any serializable value into a value operand
pub fn value<T: Serialize>(v: T) -> Operand {
    match serde_dynamo::to_attribute_value::<T, AttributeValue>(v) {
        Ok(av) => Operand::Value(av),
        Err(e) => Operand::Invalid(e.to_string()),
    }
}

impl From<Name> for Operand {
    fn from(name: Name) -> Self {
        Operand::Name(name)
    }
}

impl From<AttributeValue> for Operand {
    fn from(av: AttributeValue) -> Self {
        Operand::Value(av)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Comparator {
    Equal,
    NotEqual,
    LessThan,
    LessThanEqual,
    GreaterThan,
    GreaterThanEqual,
}

impl Comparator {
    fn as_str(self) -> &'static str {
        match self {
            Comparator::Equal => "=",
            Comparator::NotEqual => "<>",
            Comparator::LessThan => "<",
            Comparator::LessThanEqual => "<=",
            Comparator::GreaterThan => ">",
            Comparator::GreaterThanEqual => ">=",
        }
    }
}

// =========================================================================
// Key conditions
// =========================================================================

/// Key attribute used in a key condition
#[derive(Debug, Clone, PartialEq)]
pub struct Key(String);

/// Key condition for a query
///
/// Valid shapes are a partition key equality, or a partition key equality
/// joined with one sort key condition through [`KeyCondition::and`].
#[derive(Debug, Clone, PartialEq)]
pub struct KeyCondition(KeyConditionKind);

#[derive(Debug, Clone, PartialEq)]
enum KeyConditionKind {
    Compare {
        key: String,
        op: Comparator,
        value: Operand,
    },
    Between {
        key: String,
        low: Operand,
        high: Operand,
    },
    BeginsWith {
        key: String,
        prefix: String,
    },
    And(Box<KeyCondition>, Box<KeyCondition>),
}

impl Key {
    /// Key attribute named `name`
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    fn compare(self, op: Comparator, value: impl Into<Operand>) -> KeyCondition {
        KeyCondition(KeyConditionKind::Compare {
            key: self.0,
            op,
            value: value.into(),
        })
    }

    /// `key = value`; the only shape allowed for a partition key
    pub fn equal(self, value: impl Into<Operand>) -> KeyCondition {
        self.compare(Comparator::Equal, value)
    }

    /// `key < value`
    pub fn less_than(self, value: impl Into<Operand>) -> KeyCondition {
        self.compare(Comparator::LessThan, value)
    }

    /// `key <= value`
    pub fn less_than_equal(self, value: impl Into<Operand>) -> KeyCondition {
        self.compare(Comparator::LessThanEqual, value)
    }

    /// `key > value`
    pub fn greater_than(self, value: impl Into<Operand>) -> KeyCondition {
        self.compare(Comparator::GreaterThan, value)
    }

    /// `key >= value`
    pub fn greater_than_equal(self, value: impl Into<Operand>) -> KeyCondition {
        self.compare(Comparator::GreaterThanEqual, value)
    }

    /// `key BETWEEN low AND high`, both bounds inclusive
    pub fn between(self, low: impl Into<Operand>, high: impl Into<Operand>) -> KeyCondition {
        KeyCondition(KeyConditionKind::Between {
            key: self.0,
            low: low.into(),
            high: high.into(),
        })
    }

    /// String sort key prefix match
    pub fn begins_with(self, prefix: impl Into<String>) -> KeyCondition {
        KeyCondition(KeyConditionKind::BeginsWith {
            key: self.0,
            prefix: prefix.into(),
        })
    }
}

impl KeyCondition {
    /// Join a partition key equality with a sort key condition
    pub fn and(self, sort_condition: KeyCondition) -> KeyCondition {
        KeyCondition(KeyConditionKind::And(Box::new(self), Box::new(sort_condition)))
    }

    fn is_equality(&self) -> bool {
        matches!(
            self.0,
            KeyConditionKind::Compare {
                op: Comparator::Equal,
                ..
            }
        )
    }

    fn render(&self, aliases: &mut Aliases) -> Result<String> {
        match &self.0 {
            KeyConditionKind::And(partition, sort) => {
                if !partition.is_equality() || matches!(sort.0, KeyConditionKind::And(..)) {
                    return Err(Error::Build(
                        "key condition must be a partition key equality and at most one sort key condition".into(),
                    ));
                }
                Ok(format!(
                    "{} AND {}",
                    partition.render_single(aliases)?,
                    sort.render_single(aliases)?
                ))
            }
            _ if !self.is_equality() => Err(Error::Build(
                "key condition must include a partition key equality".into(),
            )),
            _ => self.render_single(aliases),
        }
    }

    fn render_single(&self, aliases: &mut Aliases) -> Result<String> {
        match &self.0 {
            KeyConditionKind::Compare { key, op, value } => Ok(format!(
                "{} {} {}",
                aliases.name(key)?,
                op.as_str(),
                key_value(key, value, aliases)?
            )),
            KeyConditionKind::Between { key, low, high } => Ok(format!(
                "{} BETWEEN {} AND {}",
                aliases.name(key)?,
                key_value(key, low, aliases)?,
                key_value(key, high, aliases)?
            )),
            KeyConditionKind::BeginsWith { key, prefix } => Ok(format!(
                "begins_with({}, {})",
                aliases.name(key)?,
                aliases.value(AttributeValue::S(prefix.clone()))
            )),
            KeyConditionKind::And(..) => Err(Error::Build("nested key condition".into())),
        }
    }
}

/// Key conditions only compare against literal values
fn key_value(key: &str, operand: &Operand, aliases: &mut Aliases) -> Result<String> {
    match operand {
        Operand::Name(name) => Err(Error::Build(format!(
            "key condition on {} must compare against a value, not attribute {}",
            key,
            name.as_str()
        ))),
        _ => aliases.operand(operand),
    }
}

// =========================================================================
// Filter conditions
// =========================================================================

/// Filter condition
#[derive(Debug, Clone, PartialEq)]
pub struct Condition(ConditionKind);

#[derive(Debug, Clone, PartialEq)]
enum ConditionKind {
    Compare {
        left: Operand,
        op: Comparator,
        right: Operand,
    },
    Between {
        operand: Operand,
        low: Operand,
        high: Operand,
    },
    In {
        operand: Operand,
        list: Vec<Operand>,
    },
    BeginsWith {
        name: Name,
        prefix: String,
    },
    Contains {
        name: Name,
        operand: Operand,
    },
    AttributeExists(Name),
    AttributeNotExists(Name),
    And(Vec<Condition>),
    Or(Vec<Condition>),
    Not(Box<Condition>),
}

impl Name {
    /// Path made of `.`-separated attributes, each optionally followed by
    /// list indexes such as `[0]`
    pub fn new(path: impl Into<String>) -> Self {
        Self(path.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    fn compare(self, op: Comparator, right: impl Into<Operand>) -> Condition {
        Condition(ConditionKind::Compare {
            left: Operand::Name(self),
            op,
            right: right.into(),
        })
    }

    /// `name = right`
    pub fn equal(self, right: impl Into<Operand>) -> Condition {
        self.compare(Comparator::Equal, right)
    }

    /// `name <> right`
    pub fn not_equal(self, right: impl Into<Operand>) -> Condition {
        self.compare(Comparator::NotEqual, right)
    }

    /// `name < right`
    pub fn less_than(self, right: impl Into<Operand>) -> Condition {
        self.compare(Comparator::LessThan, right)
    }

    /// `name <= right`
    pub fn less_than_equal(self, right: impl Into<Operand>) -> Condition {
        self.compare(Comparator::LessThanEqual, right)
    }

    /// `name > right`
    pub fn greater_than(self, right: impl Into<Operand>) -> Condition {
        self.compare(Comparator::GreaterThan, right)
    }

    /// `name >= right`
    pub fn greater_than_equal(self, right: impl Into<Operand>) -> Condition {
        self.compare(Comparator::GreaterThanEqual, right)
    }

    /// `name BETWEEN low AND high`
    pub fn between(self, low: impl Into<Operand>, high: impl Into<Operand>) -> Condition {
        Condition(ConditionKind::Between {
            operand: Operand::Name(self),
            low: low.into(),
            high: high.into(),
        })
    }

    /// `IN (...)`; the list must not be empty
    pub fn in_list<I, O>(self, list: I) -> Condition
    where
        I: IntoIterator<Item = O>,
        O: Into<Operand>,
    {
        Condition(ConditionKind::In {
            operand: Operand::Name(self),
            list: list.into_iter().map(Into::into).collect(),
        })
    }

    /// `begins_with(name, prefix)`
    pub fn begins_with(self, prefix: impl Into<String>) -> Condition {
        Condition(ConditionKind::BeginsWith {
            name: self,
            prefix: prefix.into(),
        })
    }

    /// `contains(name, operand)` for strings, sets and lists
    pub fn contains(self, operand: impl Into<Operand>) -> Condition {
        Condition(ConditionKind::Contains {
            name: self,
            operand: operand.into(),
        })
    }

    /// `attribute_exists(name)`
    pub fn attribute_exists(self) -> Condition {
        Condition(ConditionKind::AttributeExists(self))
    }

    /// `attribute_not_exists(name)`
    pub fn attribute_not_exists(self) -> Condition {
        Condition(ConditionKind::AttributeNotExists(self))
    }
}

impl Condition {
    pub fn and(self, other: Condition) -> Condition {
        Condition(ConditionKind::And(vec![self, other]))
    }

    pub fn or(self, other: Condition) -> Condition {
        Condition(ConditionKind::Or(vec![self, other]))
    }

    #[allow(clippy::should_implement_trait)]
    pub fn not(self) -> Condition {
        Condition(ConditionKind::Not(Box::new(self)))
    }

    fn render(&self, aliases: &mut Aliases) -> Result<String> {
        match &self.0 {
            ConditionKind::Compare { left, op, right } => Ok(format!(
                "{} {} {}",
                aliases.operand(left)?,
                op.as_str(),
                aliases.operand(right)?
            )),
            ConditionKind::Between { operand, low, high } => Ok(format!(
                "{} BETWEEN {} AND {}",
                aliases.operand(operand)?,
                aliases.operand(low)?,
                aliases.operand(high)?
            )),
            ConditionKind::In { operand, list } => {
                if list.is_empty() {
                    return Err(Error::Build("IN requires at least one operand".into()));
                }
                let operand = aliases.operand(operand)?;
                let list = list
                    .iter()
                    .map(|o| aliases.operand(o))
                    .collect::<Result<Vec<_>>>()?;
                Ok(format!("{} IN ({})", operand, list.join(", ")))
            }
            ConditionKind::BeginsWith { name, prefix } => Ok(format!(
                "begins_with({}, {})",
                aliases.name(&name.0)?,
                aliases.value(AttributeValue::S(prefix.clone()))
            )),
            ConditionKind::Contains { name, operand } => Ok(format!(
                "contains({}, {})",
                aliases.name(&name.0)?,
                aliases.operand(operand)?
            )),
            ConditionKind::AttributeExists(name) => {
                Ok(format!("attribute_exists({})", aliases.name(&name.0)?))
            }
            ConditionKind::AttributeNotExists(name) => {
                Ok(format!("attribute_not_exists({})", aliases.name(&name.0)?))
            }
            ConditionKind::And(conditions) => join(conditions, "AND", aliases),
            ConditionKind::Or(conditions) => join(conditions, "OR", aliases),
            ConditionKind::Not(condition) => Ok(format!("NOT ({})", condition.render(aliases)?)),
        }
    }
}

fn join(conditions: &[Condition], operator: &str, aliases: &mut Aliases) -> Result<String> {
    match conditions {
        [] => Err(Error::Build(format!(
            "{} requires at least one condition",
            operator
        ))),
        [single] => single.render(aliases),
        _ => {
            let parts = conditions
                .iter()
                .map(|c| c.render(aliases).map(|text| format!("({})", text)))
                .collect::<Result<Vec<_>>>()?;
            Ok(parts.join(&format!(" {} ", operator)))
        }
    }
}

/// Join conditions with AND
///
/// A single condition is returned unchanged. Callers must pass at least one
/// condition: an empty list yields a condition that fails when the
/// expression is built.
pub fn and_conditions(mut conditions: Vec<Condition>) -> Condition {
    if conditions.len() == 1 {
        return conditions.remove(0);
    }
    Condition(ConditionKind::And(conditions))
}

// =========================================================================
// Aliases
// =========================================================================

#[derive(Default)]
struct Aliases {
    names: HashMap<String, String>,
    values: Vec<AttributeValue>,
}

impl Aliases {
    fn name(&mut self, path: &str) -> Result<String> {
        if path.is_empty() {
            return Err(Error::Build("attribute name must not be empty".into()));
        }
        let mut segments = Vec::new();
        for segment in path.split('.') {
            // `items[0][1]` aliases `items` and keeps the list indexes verbatim
            let (attribute, indexes) = segment.split_at(segment.find('[').unwrap_or(segment.len()));
            if attribute.is_empty() || !is_list_index_suffix(indexes) {
                return Err(Error::Build(format!("invalid attribute path: {}", path)));
            }
            let next = format!("#n{}", self.names.len());
            let alias = self.names.entry(attribute.to_string()).or_insert(next);
            segments.push(format!("{}{}", alias, indexes));
        }
        Ok(segments.join("."))
    }

    fn value(&mut self, value: AttributeValue) -> String {
        let alias = format!(":v{}", self.values.len());
        self.values.push(value);
        alias
    }

    fn operand(&mut self, operand: &Operand) -> Result<String> {
        match operand {
            Operand::Name(name) => self.name(&name.0),
            Operand::Value(av) => Ok(self.value(av.clone())),
            Operand::Invalid(reason) => Err(Error::Build(format!("invalid value: {}", reason))),
        }
    }

    fn into_maps(self) -> (HashMap<String, String>, HashMap<String, AttributeValue>) {
        let names = self
            .names
            .into_iter()
            .map(|(name, alias)| (alias, name))
            .collect();
        let values = self
            .values
            .into_iter()
            .enumerate()
            .map(|(i, av)| (format!(":v{}", i), av))
            .collect();
        (names, values)
    }
}

/// Zero or more `[N]` groups with a decimal index in each
fn is_list_index_suffix(mut rest: &str) -> bool {
    while !rest.is_empty() {
        let Some((index, tail)) = rest.strip_prefix('[').and_then(|r| r.split_once(']')) else {
            return false;
        };
        if index.is_empty() || !index.bytes().all(|b| b.is_ascii_digit()) {
            return false;
        }
        rest = tail;
    }
    true
}

// =========================================================================
// Builder
// =========================================================================

/// Request-ready expression
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Expression {
    names: HashMap<String, String>,
    values: HashMap<String, AttributeValue>,
    key_condition: Option<String>,
    filter: Option<String>,
    projection: Option<String>,
}

impl Expression {
    /// Alias to attribute name
    pub fn names(&self) -> &HashMap<String, String> {
        &self.names
    }

    /// Alias to attribute value
    pub fn values(&self) -> &HashMap<String, AttributeValue> {
        &self.values
    }

    pub fn key_condition(&self) -> Option<&str> {
        self.key_condition.as_deref()
    }

    pub fn filter(&self) -> Option<&str> {
        self.filter.as_deref()
    }

    pub fn projection(&self) -> Option<&str> {
        self.projection.as_deref()
    }

    /// Name aliases as a request field; DynamoDB rejects empty maps
    pub fn expression_attribute_names(&self) -> Option<HashMap<String, String>> {
        (!self.names.is_empty()).then(|| self.names.clone())
    }

    /// Value aliases as a request field; DynamoDB rejects empty maps
    pub fn expression_attribute_values(&self) -> Option<HashMap<String, AttributeValue>> {
        (!self.values.is_empty()).then(|| self.values.clone())
    }
}

/// Builder for [`Expression`]
#[derive(Debug, Clone, Default)]
pub struct ExpressionBuilder {
    key_condition: Option<KeyCondition>,
    filter: Option<Condition>,
    projection: Option<Vec<Name>>,
}

impl ExpressionBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_key_condition(mut self, key_condition: KeyCondition) -> Self {
        self.key_condition = Some(key_condition);
        self
    }

    pub fn with_filter(mut self, filter: Condition) -> Self {
        self.filter = Some(filter);
        self
    }

    pub fn with_projection<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.projection = Some(names.into_iter().map(Name::new).collect());
        self
    }

    pub fn build(self) -> Result<Expression> {
        if self.key_condition.is_none() && self.filter.is_none() && self.projection.is_none() {
            return Err(Error::Build(
                "expression needs a key condition, filter or projection".into(),
            ));
        }

        let mut aliases = Aliases::default();
        let key_condition = self
            .key_condition
            .map(|kc| kc.render(&mut aliases))
            .transpose()?;
        let filter = self
            .filter
            .map(|f| f.render(&mut aliases))
            .transpose()?;
        let projection = match self.projection {
            Some(names) if names.is_empty() => {
                return Err(Error::Build("projection must name at least one attribute".into()))
            }
            Some(names) => Some(
                names
                    .iter()
                    .map(|n| aliases.name(&n.0))
                    .collect::<Result<Vec<_>>>()?
                    .join(", "),
            ),
            None => None,
        };

        let (names, values) = aliases.into_maps();
        Ok(Expression {
            names,
            values,
            key_condition,
            filter,
            projection,
        })
    }
}

/// Build a query expression from one key condition and any number of filters
///
/// Filters are joined with AND; with no filters the expression carries no
/// filter clause.
pub fn create_expression(key_condition: KeyCondition, filters: Vec<Condition>) -> Result<Expression> {
    let mut builder = ExpressionBuilder::new().with_key_condition(key_condition);
    if !filters.is_empty() {
        builder = builder.with_filter(and_conditions(filters));
    }
    builder.build()
}
