use crate::error::BindError;
use crate::model::value_property;
use crate::translation::{BindingPlan, PropertyPath};
use crate::types::{Param, RowValues, StatementParam};

/// Resolve a binding plan against the caller's arguments.
///
/// The output has one entry per plan element, in plan order, ready to be
/// bound to positional placeholders `1..=plan.len()`.
///
/// ```rust
/// use std::collections::HashMap;
/// use sql_facade::prelude::*;
///
/// let plan = vec![PlaceholderBinding::whole(0), PlaceholderBinding::property(1, "name")];
/// let mut model = HashMap::new();
/// model.insert("name".to_string(), RowValues::Text("Y".into()));
/// let bound = bind(&plan, &[Param::from("X"), Param::model(model)])?;
/// assert_eq!(bound[1].as_value(), Some(&RowValues::Text("Y".into())));
/// # Ok::<(), sql_facade::BindError>(())
/// ```
///
/// # Errors
/// Returns `BindError::IndexOutOfRange` when a binding points past the
/// arguments and `BindError::PropertyNotFound` when the argument lacks the
/// property.
pub fn bind(plan: &BindingPlan, args: &[Param]) -> Result<Vec<Param>, BindError> {
    plan.iter()
        .map(|binding| {
            let index = binding.argument_index;
            let arg = args.get(index).ok_or(BindError::IndexOutOfRange {
                index: index + 1,
                len: args.len(),
            })?;
            match &binding.property {
                PropertyPath::WholeArgument => Ok(arg.clone()),
                PropertyPath::Property(name) => read_property(arg, name)
                    .map(Param::Value)
                    .ok_or_else(|| BindError::PropertyNotFound {
                        index: index + 1,
                        property: name.clone(),
                    }),
            }
        })
        .collect()
}

fn read_property(arg: &Param, name: &str) -> Option<RowValues> {
    match arg {
        Param::Model(model) => model.property(name),
        Param::Value(value) => value_property(value, name),
        Param::Out(_) | Param::InOut(..) => None,
    }
}

/// Lower caller-level parameters to what a driver statement accepts.
///
/// # Errors
/// Returns `BindError::ModelNotBindable` when a model object reaches a slot.
pub fn to_statement_params(params: Vec<Param>) -> Result<Vec<StatementParam>, BindError> {
    params
        .into_iter()
        .enumerate()
        .map(|(idx, param)| match param {
            Param::Value(value) => Ok(StatementParam::In(value)),
            Param::Out(ty) => Ok(StatementParam::Out(ty)),
            Param::InOut(value, ty) => Ok(StatementParam::InOut(value, ty)),
            Param::Model(_) => Err(BindError::ModelNotBindable { position: idx + 1 }),
        })
        .collect()
}
