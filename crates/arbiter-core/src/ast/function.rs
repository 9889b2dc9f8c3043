//! Function catalog
//!
//! Every function a `FunctionCall` node can name is described here: display
//! name, arity, parameter types and return type. The catalog is built once,
//! then shared read-only (typically behind an `Arc`) by evaluators and editors.

use crate::types::{DataType, Value};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

/// Function identifiers
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
pub enum Function {
    // Arithmetic
    Add,
    Subtract,
    Multiply,
    Divide,
    Abs,

    // Comparison
    Greater,
    GreaterOrEqual,
    Less,
    LessOrEqual,
    Equal,
    NotEqual,

    // Logic
    And,
    Or,
    Not,

    // Lists
    List,
    IsInList,
    IsNotInList,

    // Strings
    StringContains,
    StringNotContain,
    ContainsAnyOf,
    ContainsNoneOf,

    // Emptiness
    IsEmpty,
    IsNotEmpty,

    // Time
    TimeNow,
    TimeAdd,
}

impl fmt::Display for Function {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self)
    }
}

/// Declared type of a parameter or of a return value
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ParamType {
    Bool,
    Int,
    Float,
    /// Int or Float; Int widens to Float when mixed
    Number,
    String,
    Timestamp,
    /// Number or Timestamp
    Ordered,
    List,
    Any,
}

impl ParamType {
    /// Whether a non-null value satisfies this type
    pub fn accepts(&self, value: &Value) -> bool {
        match (self, value) {
            (ParamType::Any, _) => true,
            (ParamType::Bool, Value::Bool(_)) => true,
            (ParamType::Int, Value::Int(_)) => true,
            (ParamType::Float, Value::Float(_)) => true,
            (ParamType::Number, v) => v.is_numeric(),
            (ParamType::String, Value::String(_)) => true,
            (ParamType::Timestamp, Value::Timestamp(_)) => true,
            (ParamType::Ordered, v) => v.is_numeric() || matches!(v, Value::Timestamp(_)),
            (ParamType::List, Value::List(_)) => true,
            _ => false,
        }
    }

    /// Whether a value of type `other` can be passed where `self` is expected
    pub fn is_compatible_with(&self, other: ParamType) -> bool {
        match (self, other) {
            (ParamType::Any, _) | (_, ParamType::Any) => true,
            (a, b) if *a == b => true,
            (ParamType::Number, ParamType::Int | ParamType::Float) => true,
            (ParamType::Ordered, ParamType::Int | ParamType::Float | ParamType::Number) => true,
            (ParamType::Ordered, ParamType::Timestamp) => true,
            (ParamType::Int | ParamType::Float, ParamType::Number) => true,
            (
                ParamType::Int | ParamType::Float | ParamType::Number | ParamType::Timestamp,
                ParamType::Ordered,
            ) => true,
            _ => false,
        }
    }

    /// Type of a value, `None` for null
    pub fn of_value(value: &Value) -> Option<ParamType> {
        match value {
            Value::Null => None,
            Value::Bool(_) => Some(ParamType::Bool),
            Value::Int(_) => Some(ParamType::Int),
            Value::Float(_) => Some(ParamType::Float),
            Value::String(_) => Some(ParamType::String),
            Value::Timestamp(_) => Some(ParamType::Timestamp),
            Value::List(_) => Some(ParamType::List),
        }
    }
}

impl From<DataType> for ParamType {
    fn from(data_type: DataType) -> Self {
        match data_type {
            DataType::Bool => ParamType::Bool,
            DataType::Int => ParamType::Int,
            DataType::Float => ParamType::Float,
            DataType::String => ParamType::String,
            DataType::Timestamp => ParamType::Timestamp,
        }
    }
}

impl fmt::Display for ParamType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ParamType::Bool => "bool",
            ParamType::Int => "int",
            ParamType::Float => "float",
            ParamType::Number => "number",
            ParamType::String => "string",
            ParamType::Timestamp => "timestamp",
            ParamType::Ordered => "number or timestamp",
            ParamType::List => "list",
            ParamType::Any => "any",
        };
        write!(f, "{name}")
    }
}

/// Number of children a function takes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Arity {
    Fixed(usize),
    Variadic { min: usize },
}

impl Arity {
    pub fn accepts(&self, count: usize) -> bool {
        match self {
            Arity::Fixed(n) => count == *n,
            Arity::Variadic { min } => count >= *min,
        }
    }
}

impl fmt::Display for Arity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Arity::Fixed(n) => write!(f, "{n}"),
            Arity::Variadic { min } => write!(f, "at least {min}"),
        }
    }
}

/// Catalog entry for one function
#[derive(Debug, Clone, PartialEq)]
pub struct FunctionAttributes {
    pub function: Function,
    pub display_name: &'static str,
    pub arity: Arity,
    /// One entry per fixed parameter; variadic functions declare a single
    /// entry applying to every child
    pub params: Vec<ParamType>,
    pub return_type: ParamType,
    /// Children are evaluated lazily, left to right, stopping once the
    /// result is known. Only `And` and `Or` declare this.
    pub short_circuit: bool,
    /// Operands may be null; otherwise a null operand is an error
    pub accepts_null: bool,
    /// Calls with literal children are themselves literals
    pub is_constant_marker: bool,
}

impl FunctionAttributes {
    fn new(
        function: Function,
        display_name: &'static str,
        arity: Arity,
        params: Vec<ParamType>,
        return_type: ParamType,
    ) -> Self {
        Self {
            function,
            display_name,
            arity,
            params,
            return_type,
            short_circuit: false,
            accepts_null: false,
            is_constant_marker: false,
        }
    }

    fn binary(
        function: Function,
        display_name: &'static str,
        left: ParamType,
        right: ParamType,
        return_type: ParamType,
    ) -> Self {
        Self::new(function, display_name, Arity::Fixed(2), vec![left, right], return_type)
    }

    fn short_circuit(mut self) -> Self {
        self.short_circuit = true;
        self
    }

    fn accepts_null(mut self) -> Self {
        self.accepts_null = true;
        self
    }

    fn constant_marker(mut self) -> Self {
        self.is_constant_marker = true;
        self
    }

    /// Declared type of the child at `position`
    pub fn param_type(&self, position: usize) -> ParamType {
        match self.arity {
            Arity::Variadic { .. } => self.params.first().copied().unwrap_or(ParamType::Any),
            Arity::Fixed(_) => self.params.get(position).copied().unwrap_or(ParamType::Any),
        }
    }
}

/// Read-only export of one catalog entry for editors
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FunctionDescriptor {
    pub id: Function,
    pub display_name: String,
    pub arity: Arity,
    pub parameter_types: Vec<ParamType>,
    pub return_type: ParamType,
}

/// Registry of known functions
#[derive(Debug, Clone, Default)]
pub struct FunctionCatalog {
    entries: HashMap<Function, FunctionAttributes>,
}

impl FunctionCatalog {
    /// Catalog without any function
    pub fn empty() -> Self {
        Self::default()
    }

    /// Catalog with every built-in function
    pub fn standard() -> Self {
        use Arity::{Fixed, Variadic};
        use Function as F;
        use FunctionAttributes as A;
        use ParamType as P;

        let entries = vec![
            A::binary(F::Add, "+", P::Number, P::Number, P::Number),
            A::binary(F::Subtract, "-", P::Number, P::Number, P::Number),
            A::binary(F::Multiply, "×", P::Number, P::Number, P::Number),
            A::binary(F::Divide, "÷", P::Number, P::Number, P::Float),
            A::new(F::Abs, "abs", Fixed(1), vec![P::Number], P::Number),
            A::binary(F::Greater, ">", P::Ordered, P::Ordered, P::Bool),
            A::binary(F::GreaterOrEqual, "≥", P::Ordered, P::Ordered, P::Bool),
            A::binary(F::Less, "<", P::Ordered, P::Ordered, P::Bool),
            A::binary(F::LessOrEqual, "≤", P::Ordered, P::Ordered, P::Bool),
            A::binary(F::Equal, "=", P::Any, P::Any, P::Bool).accepts_null(),
            A::binary(F::NotEqual, "≠", P::Any, P::Any, P::Bool).accepts_null(),
            A::new(F::And, "and", Variadic { min: 1 }, vec![P::Bool], P::Bool).short_circuit(),
            A::new(F::Or, "or", Variadic { min: 1 }, vec![P::Bool], P::Bool).short_circuit(),
            A::new(F::Not, "not", Fixed(1), vec![P::Bool], P::Bool),
            A::new(F::List, "list", Variadic { min: 0 }, vec![P::Any], P::List).constant_marker(),
            A::binary(F::IsInList, "is in", P::Any, P::List, P::Bool),
            A::binary(F::IsNotInList, "is not in", P::Any, P::List, P::Bool),
            A::binary(F::StringContains, "contains", P::String, P::String, P::Bool),
            A::binary(F::StringNotContain, "does not contain", P::String, P::String, P::Bool),
            A::binary(F::ContainsAnyOf, "contains any of", P::String, P::List, P::Bool),
            A::binary(F::ContainsNoneOf, "contains none of", P::String, P::List, P::Bool),
            A::new(F::IsEmpty, "is empty", Fixed(1), vec![P::Any], P::Bool).accepts_null(),
            A::new(F::IsNotEmpty, "is not empty", Fixed(1), vec![P::Any], P::Bool).accepts_null(),
            A::new(F::TimeNow, "now", Fixed(0), vec![], P::Timestamp),
            A::binary(F::TimeAdd, "time add", P::Timestamp, P::Int, P::Timestamp),
        ];

        entries.into_iter().fold(Self::empty(), |catalog, attrs| catalog.with(attrs))
    }

    /// Add or replace an entry
    pub fn with(mut self, attributes: FunctionAttributes) -> Self {
        self.entries.insert(attributes.function, attributes);
        self
    }

    /// Remove an entry
    pub fn without(mut self, function: Function) -> Self {
        self.entries.remove(&function);
        self
    }

    pub fn get(&self, function: Function) -> Option<&FunctionAttributes> {
        self.entries.get(&function)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Listing of every function, sorted by identifier
    pub fn listing(&self) -> Vec<FunctionDescriptor> {
        let mut listing: Vec<FunctionDescriptor> = self
            .entries
            .values()
            .map(|attrs| FunctionDescriptor {
                id: attrs.function,
                display_name: attrs.display_name.to_string(),
                arity: attrs.arity,
                parameter_types: attrs.params.clone(),
                return_type: attrs.return_type,
            })
            .collect();
        listing.sort_by_key(|d| d.id);
        listing
    }
}
