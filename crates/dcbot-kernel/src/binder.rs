//! Argument binder.
//!
//! Turns a token stream into an [`Arguments`] mapping for a [`Descriptor`]
//! in two passes:
//!
//! 1. **Flagged pass.**  Tokens are walked left to right.  A token equal to
//!    the name of a still-unbound parameter opens a flag for it.  A scalar
//!    flag takes exactly the next token; a list flag takes every token up to
//!    the next flag.  Any other token goes to the positional backlog.
//! 2. **Positional pass.**  The backlog fills the remaining parameters in
//!    descriptor order.  The first list parameter reached becomes greedy and
//!    swallows the rest of the backlog, ending the pass.
//!
//! Binding is all-or-nothing.  Surplus positional tokens are ignored.

use std::collections::HashMap;

use crate::descriptor::{Descriptor, ParamKind, ParameterDescriptor};
use crate::error::BindError;
use crate::value::{Arguments, Value};

/// State of the flag most recently opened during the flagged pass.
enum OpenFlag<'d> {
    Idle,
    Scalar(&'d ParameterDescriptor),
    List(&'d ParameterDescriptor, Vec<Value>),
}

/// Bind `tokens` to the parameters of `descriptor`.
pub fn bind(descriptor: &Descriptor, tokens: &[String]) -> Result<Arguments, BindError> {
    let mut unbound: Vec<&ParameterDescriptor> = descriptor.params().iter().collect();
    let mut bound: HashMap<&str, Value> = HashMap::with_capacity(unbound.len());
    let mut backlog: Vec<&str> = Vec::new();

    // -- Phase 1: flags -----------------------------------------------------

    let mut open = OpenFlag::Idle;
    for token in tokens {
        if let Some(idx) = unbound.iter().position(|p| p.name == *token) {
            let param = unbound.remove(idx);
            close_flag(open, &mut bound)?;
            open = match param.kind {
                ParamKind::List => OpenFlag::List(param, Vec::new()),
                ParamKind::Scalar | ParamKind::OptionalScalar => OpenFlag::Scalar(param),
            };
            continue;
        }

        open = match open {
            OpenFlag::List(param, mut values) => {
                values.push(convert(param, token)?);
                OpenFlag::List(param, values)
            }
            OpenFlag::Scalar(param) => {
                bound.insert(param.name.as_str(), convert(param, token)?);
                OpenFlag::Idle
            }
            OpenFlag::Idle => {
                backlog.push(token.as_str());
                OpenFlag::Idle
            }
        };
    }
    close_flag(open, &mut bound)?;

    if unbound.is_empty() {
        if !backlog.is_empty() {
            tracing::debug!(ignored = backlog.len(), "surplus positional tokens ignored");
        }
        return Ok(collect(descriptor, bound));
    }

    // -- Phase 2: positional backlog ----------------------------------------

    let mut remaining = unbound.into_iter();
    let mut positional = backlog.into_iter();
    let mut ignored = 0usize;

    while let Some(token) = positional.next() {
        let Some(param) = remaining.next() else {
            ignored = 1 + positional.len();
            break;
        };

        if param.kind == ParamKind::List {
            let mut values = vec![convert(param, token)?];
            for rest in positional.by_ref() {
                values.push(convert(param, rest)?);
            }
            bound.insert(param.name.as_str(), Value::List(values));
            break;
        }

        bound.insert(param.name.as_str(), convert(param, token)?);
    }

    if ignored > 0 {
        tracing::debug!(ignored, "surplus positional tokens ignored");
    }

    for param in remaining {
        match param.kind {
            ParamKind::OptionalScalar => {
                bound.insert(param.name.as_str(), Value::None);
            }
            ParamKind::Scalar | ParamKind::List => {
                return Err(BindError::MissingArgument {
                    param: param.name.clone(),
                });
            }
        }
    }

    Ok(collect(descriptor, bound))
}

fn close_flag<'d>(open: OpenFlag<'d>, bound: &mut HashMap<&'d str, Value>) -> Result<(), BindError> {
    match open {
        OpenFlag::Idle => Ok(()),
        OpenFlag::List(param, values) => {
            bound.insert(param.name.as_str(), Value::List(values));
            Ok(())
        }
        OpenFlag::Scalar(param) => Err(BindError::MissingFlagValue {
            param: param.name.clone(),
        }),
    }
}

fn convert(param: &ParameterDescriptor, token: &str) -> Result<Value, BindError> {
    param
        .converter
        .convert(token)
        .map_err(|source| BindError::InvalidValue {
            param: param.name.clone(),
            token: token.to_string(),
            source,
        })
}

/// Emit bound values in descriptor order.
fn collect(descriptor: &Descriptor, mut bound: HashMap<&str, Value>) -> Arguments {
    let mut args = Arguments::new();
    for param in descriptor.params() {
        if let Some(value) = bound.remove(param.name.as_str()) {
            args.push(param.name.clone(), value);
        }
    }
    args
}
