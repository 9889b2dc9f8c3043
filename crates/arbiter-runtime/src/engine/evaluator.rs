//! Expression tree evaluator
//!
//! Evaluation is a post-order walk: every child of a function call is
//! evaluated before the call itself. The only exceptions are functions the
//! catalog marks `short_circuit` (`And`, `Or` in the standard catalog), whose
//! children are evaluated left to right until the result is known.
//!
//! The evaluator holds nothing but the shared catalog, so one instance can
//! evaluate any number of trees concurrently against different contexts.

use super::operators;
use crate::context::EvaluationContext;
use crate::error::{EvalError, Result};
use arbiter_core::ast::{Function, FunctionAttributes, FunctionCatalog, Node};
use arbiter_core::{ClientObject, Value};
use futures::future::{BoxFuture, FutureExt};
use std::borrow::Cow;
use std::sync::Arc;

#[derive(Debug, Clone)]
pub struct Evaluator {
    catalog: Arc<FunctionCatalog>,
}

impl Evaluator {
    /// Create an evaluator over an injected catalog
    pub fn new(catalog: Arc<FunctionCatalog>) -> Self {
        Self { catalog }
    }

    /// Evaluator over the built-in catalog
    pub fn standard() -> Self {
        Self::new(Arc::new(FunctionCatalog::standard()))
    }

    pub fn catalog(&self) -> &Arc<FunctionCatalog> {
        &self.catalog
    }

    /// Evaluate a node to a value
    pub fn evaluate<'a>(
        &'a self,
        node: &'a Node,
        ctx: &'a EvaluationContext,
    ) -> BoxFuture<'a, Result<Value>> {
        async move {
            match node {
                Node::Constant { value } => Ok(value.clone()),
                Node::PayloadAccessor { field } => self.read_payload(field, ctx),
                Node::DatabaseAccessor { table, field, path } => {
                    self.read_database(table, path, field, ctx).await
                }
                Node::FunctionCall { function, children } => {
                    self.call(*function, children, ctx).await
                }
            }
        }
        .boxed()
    }

    /// Evaluate a boolean condition
    ///
    /// Null counts as false. Any other non-boolean result is an error.
    pub async fn evaluate_condition(&self, node: &Node, ctx: &EvaluationContext) -> Result<bool> {
        match self.evaluate(node, ctx).await? {
            Value::Bool(b) => Ok(b),
            Value::Null => Ok(false),
            other => Err(EvalError::NotBoolean {
                actual: other.type_name(),
            }),
        }
    }

    async fn call(
        &self,
        function: Function,
        children: &[Node],
        ctx: &EvaluationContext,
    ) -> Result<Value> {
        let attrs = self
            .catalog
            .get(function)
            .ok_or(EvalError::UnknownFunction(function))?;

        if !attrs.arity.accepts(children.len()) {
            return Err(EvalError::ArityMismatch {
                function,
                expected: attrs.arity,
                actual: children.len(),
            });
        }

        if attrs.short_circuit {
            return self.call_short_circuit(attrs, children, ctx).await;
        }

        let mut args = Vec::with_capacity(children.len());
        for child in children {
            args.push(self.evaluate(child, ctx).await?);
        }
        for (position, arg) in args.iter().enumerate() {
            check_argument(attrs, position, arg)?;
        }

        tracing::trace!("Applying {} to {} arguments", function, args.len());
        operators::apply(function, args, ctx.now())
    }

    /// Lazy boolean evaluation for `And` and `Or`
    async fn call_short_circuit(
        &self,
        attrs: &FunctionAttributes,
        children: &[Node],
        ctx: &EvaluationContext,
    ) -> Result<Value> {
        let function = attrs.function;
        let stop_on = match function {
            Function::And => false,
            Function::Or => true,
            other => {
                return Err(EvalError::UnknownFunction(other));
            }
        };

        for (position, child) in children.iter().enumerate() {
            let value = self.evaluate(child, ctx).await?;
            check_argument(attrs, position, &value)?;
            match value.as_bool() {
                Some(b) if b == stop_on => return Ok(Value::Bool(stop_on)),
                Some(_) => {}
                None => {
                    return Err(EvalError::type_mismatch(
                        function,
                        position,
                        attrs.param_type(position),
                        &value,
                    ))
                }
            }
        }
        Ok(Value::Bool(!stop_on))
    }

    fn read_payload(&self, field: &str, ctx: &EvaluationContext) -> Result<Value> {
        let table = ctx.trigger_table()?;
        if table.field(field).is_none() {
            return Err(EvalError::AccessorNotFound(format!(
                "field '{}' on table '{}'",
                field, table.name
            )));
        }
        Ok(ctx.trigger_object().get(field).clone())
    }

    /// Follow `path` from the trigger object and read `field` on the record
    /// reached. A null link key or a missing linked record reads as null.
    async fn read_database(
        &self,
        table: &str,
        path: &[String],
        field: &str,
        ctx: &EvaluationContext,
    ) -> Result<Value> {
        let trigger = ctx.trigger_object();
        if table != trigger.table_name {
            return Err(EvalError::AccessorNotFound(format!(
                "accessor starts at table '{}' but the trigger object belongs to '{}'",
                table, trigger.table_name
            )));
        }

        let mut current_table = ctx.table(table)?;
        let mut current: Cow<'_, ClientObject> = Cow::Borrowed(trigger);

        for link_name in path {
            let link = current_table.link(link_name).ok_or_else(|| {
                EvalError::AccessorNotFound(format!(
                    "link '{}' on table '{}'",
                    link_name, current_table.name
                ))
            })?;

            let key = current.get(&link.child_field);
            if key.is_null() {
                return Ok(Value::Null);
            }

            let linked = ctx
                .related_record(&link.linked_table, &link.parent_field, key)
                .await?;
            let Some(record) = linked else {
                tracing::debug!(
                    "No {} record with {} = {:?}",
                    link.linked_table,
                    link.parent_field,
                    key
                );
                return Ok(Value::Null);
            };

            current_table = ctx.table(&link.linked_table)?;
            current = Cow::Owned(record);
        }

        if current_table.field(field).is_none() {
            return Err(EvalError::AccessorNotFound(format!(
                "field '{}' on table '{}'",
                field, current_table.name
            )));
        }
        Ok(current.get(field).clone())
    }
}

/// Check one evaluated argument against the catalog signature
fn check_argument(attrs: &FunctionAttributes, position: usize, arg: &Value) -> Result<()> {
    if arg.is_null() {
        if attrs.accepts_null {
            return Ok(());
        }
        return Err(EvalError::NullOperand {
            function: attrs.function,
            position,
        });
    }

    let expected = attrs.param_type(position);
    if expected.accepts(arg) {
        Ok(())
    } else {
        Err(EvalError::type_mismatch(attrs.function, position, expected, arg))
    }
}
