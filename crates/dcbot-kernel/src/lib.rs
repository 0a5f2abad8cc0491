//! dcbot command kernel.
//!
//! This crate turns chat text into typed command invocations:
//!
//! - **[`tokenizer`]** -- shell-style splitting of command text.
//! - **[`value`]** -- typed [`Value`]s, [`Converter`]s, and the bound
//!   [`Arguments`] mapping handlers read from.
//! - **[`descriptor`]** -- per-command parameter descriptors built once at
//!   registration from the handler's declared parameters.
//! - **[`binder`]** -- the flag-then-positional argument binder.
//! - **[`command`]** -- the [`CommandHandler`] trait and closure commands.
//! - **[`registry`]** -- prefixed command registry with duplicate detection.
//! - **[`dispatcher`]** -- message splitting, lookup, binding, invocation.
//! - **[`error`]** -- kernel error types via [`thiserror`].
//!
//! Nothing here performs I/O; the polling loop lives in `dcbot-runtime`.

pub mod binder;
pub mod command;
pub mod descriptor;
pub mod dispatcher;
pub mod error;
pub mod registry;
pub mod tokenizer;
pub mod value;

// Re-export the most commonly used types at the crate root for convenience.
pub use binder::bind;
pub use command::{CommandBuilder, CommandHandler, FnCommand, HandlerResult, command};
pub use descriptor::{DeclaredType, Descriptor, ParamDecl, ParamKind, ParameterDescriptor, describe};
pub use dispatcher::{DispatchOutcome, Dispatcher, split_command};
pub use error::{BindError, ConversionError, KernelError, ParseError, Result};
pub use registry::{Command, CommandRegistry, RegistryConfig};
pub use tokenizer::tokenize;
pub use value::{Arguments, Converter, FromValue, Value};
