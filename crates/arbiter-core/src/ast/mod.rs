//! Abstract Syntax Tree for rule formulas

pub mod function;
pub mod node;

pub use function::{
    Arity, Function, FunctionAttributes, FunctionCatalog, FunctionDescriptor, ParamType,
};
pub use node::Node;
