//! Signature descriptors.
//!
//! A command declares its full parameter list as [`ParamDecl`]s, including
//! contextual parameters (the bot context, the triggering message) that the
//! runtime supplies itself.  [`describe`] strips those contextual names and
//! classifies the rest into a [`Descriptor`]: the ordered, typed shape of
//! the command's user-supplied arguments.
//!
//! The descriptor is built once at registration time and reused for every
//! invocation.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::error::{KernelError, Result};
use crate::value::Converter;

// ---------------------------------------------------------------------------
// Declarations
// ---------------------------------------------------------------------------

/// The declared type of a handler parameter.
#[derive(Debug, Clone)]
pub enum DeclaredType {
    /// A single value converted by the given converter.
    Scalar(Converter),
    /// A sequence; each element is converted individually.
    List(Converter),
    /// A single value that may be omitted.
    Optional(Converter),
    /// No declared type; the raw token is kept as a string.
    Any,
}

impl DeclaredType {
    pub fn string() -> Self {
        Self::Scalar(Converter::string())
    }

    pub fn int() -> Self {
        Self::Scalar(Converter::int())
    }

    pub fn float() -> Self {
        Self::Scalar(Converter::float())
    }

    pub fn bool() -> Self {
        Self::Scalar(Converter::bool())
    }

    pub fn list(element: Converter) -> Self {
        Self::List(element)
    }

    pub fn optional(inner: Converter) -> Self {
        Self::Optional(inner)
    }
}

/// One declared handler parameter.
#[derive(Debug, Clone)]
pub struct ParamDecl {
    pub name: String,
    pub ty: DeclaredType,
}

impl ParamDecl {
    pub fn new(name: impl Into<String>, ty: DeclaredType) -> Self {
        Self {
            name: name.into(),
            ty,
        }
    }
}

// ---------------------------------------------------------------------------
// Descriptor
// ---------------------------------------------------------------------------

/// Binding behaviour of a user-supplied parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ParamKind {
    /// Exactly one token.
    Scalar,
    /// Zero or more tokens; greedy when filled positionally.
    List,
    /// At most one token; binds to `Value::None` when absent.
    OptionalScalar,
}

/// A classified, user-supplied parameter.
#[derive(Debug, Clone)]
pub struct ParameterDescriptor {
    pub name: String,
    pub kind: ParamKind,
    /// For `List`, the element converter.
    pub converter: Converter,
}

/// Ordered parameter descriptors for one command.
///
/// Order equals handler declaration order minus the excluded contextual
/// parameters.
#[derive(Debug, Clone, Default)]
pub struct Descriptor {
    params: Vec<ParameterDescriptor>,
}

impl Descriptor {
    pub fn params(&self) -> &[ParameterDescriptor] {
        &self.params
    }

    pub fn get(&self, name: &str) -> Option<&ParameterDescriptor> {
        self.params.iter().find(|p| p.name == name)
    }

    pub fn len(&self) -> usize {
        self.params.len()
    }

    pub fn is_empty(&self) -> bool {
        self.params.is_empty()
    }

    /// One-line usage, e.g. `x:int [name:str] items:int...`.
    pub fn usage(&self) -> String {
        self.params
            .iter()
            .map(|p| match p.kind {
                ParamKind::Scalar => format!("{}:{}", p.name, p.converter.name()),
                ParamKind::List => format!("{}:{}...", p.name, p.converter.name()),
                ParamKind::OptionalScalar => format!("[{}:{}]", p.name, p.converter.name()),
            })
            .collect::<Vec<_>>()
            .join(" ")
    }
}

/// Build the descriptor for `command` from its declared parameters,
/// dropping every name in `excluded`.
///
/// Fails with [`KernelError::DuplicateParameter`] if a name is declared
/// twice.
pub fn describe(command: &str, decls: &[ParamDecl], excluded: &[String]) -> Result<Descriptor> {
    let mut seen = HashSet::new();
    let mut params = Vec::with_capacity(decls.len());

    for decl in decls {
        if !seen.insert(decl.name.as_str()) {
            return Err(KernelError::DuplicateParameter {
                command: command.to_string(),
                param: decl.name.clone(),
            });
        }
        if excluded.iter().any(|name| name == &decl.name) {
            continue;
        }

        let (kind, converter) = match &decl.ty {
            DeclaredType::Scalar(conv) => (ParamKind::Scalar, conv.clone()),
            DeclaredType::List(conv) => (ParamKind::List, conv.clone()),
            DeclaredType::Optional(conv) => (ParamKind::OptionalScalar, conv.clone()),
            DeclaredType::Any => (ParamKind::Scalar, Converter::string()),
        };

        params.push(ParameterDescriptor {
            name: decl.name.clone(),
            kind,
            converter,
        });
    }

    tracing::trace!(command, params = params.len(), "descriptor built");

    Ok(Descriptor { params })
}
