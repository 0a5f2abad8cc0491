//! Command handlers.
//!
//! A command is anything implementing [`CommandHandler`]: it names itself,
//! declares its parameters (contextual ones included), and runs when
//! invoked with a bound [`Arguments`] mapping.  Most commands are written as
//! closures through [`command`]:
//!
//! ```rust
//! # use dcbot_kernel::{command, DeclaredType};
//! let add = command("add")
//!     .describe("Add two numbers")
//!     .param("ctx", DeclaredType::Any)
//!     .param("comment", DeclaredType::Any)
//!     .param("x", DeclaredType::int())
//!     .param("y", DeclaredType::int())
//!     .handler(|_ctx: (), _sender: String, args| async move {
//!         let x: i64 = args.get("x")?;
//!         let y: i64 = args.get("y")?;
//!         Ok(Some(format!("Answer {}", x + y)))
//!     });
//! ```

use std::future::Future;

use async_trait::async_trait;

use crate::descriptor::{DeclaredType, ParamDecl};
use crate::value::Arguments;

/// What a handler returns: optional reply text to post back to the sender.
pub type HandlerResult = anyhow::Result<Option<String>>;

/// A bot command.
///
/// `C` is the bot context handed to every command and `S` the sender of
/// the triggering message.
#[async_trait]
pub trait CommandHandler<C, S>: Send + Sync {
    /// Command name without prefix.
    fn name(&self) -> &str;

    /// Short help text.
    fn description(&self) -> &str {
        ""
    }

    /// Every declared parameter in declaration order.
    fn parameters(&self) -> Vec<ParamDecl>;

    /// Run the command.
    async fn call(&self, ctx: &C, sender: &S, args: Arguments) -> HandlerResult;
}

// ---------------------------------------------------------------------------
// Closure-backed commands
// ---------------------------------------------------------------------------

/// Start building a closure-backed command named `name`.
pub fn command(name: impl Into<String>) -> CommandBuilder {
    CommandBuilder {
        name: name.into(),
        description: String::new(),
        params: Vec::new(),
    }
}

/// Builder returned by [`command`].
#[derive(Debug, Clone)]
pub struct CommandBuilder {
    name: String,
    description: String,
    params: Vec<ParamDecl>,
}

impl CommandBuilder {
    pub fn describe(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// Declare the next parameter.
    pub fn param(mut self, name: impl Into<String>, ty: DeclaredType) -> Self {
        self.params.push(ParamDecl::new(name, ty));
        self
    }

    /// Attach the handler body.
    ///
    /// The context and sender are cloned into the closure so the returned
    /// future can be `'static`.
    pub fn handler<C, S, F, Fut>(self, func: F) -> FnCommand<F>
    where
        F: Fn(C, S, Arguments) -> Fut + Send + Sync,
        Fut: Future<Output = HandlerResult> + Send + 'static,
    {
        FnCommand {
            name: self.name,
            description: self.description,
            params: self.params,
            func,
        }
    }
}

/// A command whose body is a closure.
pub struct FnCommand<F> {
    name: String,
    description: String,
    params: Vec<ParamDecl>,
    func: F,
}

#[async_trait]
impl<C, S, F, Fut> CommandHandler<C, S> for FnCommand<F>
where
    C: Clone + Send + Sync + 'static,
    S: Clone + Send + Sync + 'static,
    F: Fn(C, S, Arguments) -> Fut + Send + Sync,
    Fut: Future<Output = HandlerResult> + Send + 'static,
{
    fn name(&self) -> &str {
        &self.name
    }

    fn description(&self) -> &str {
        &self.description
    }

    fn parameters(&self) -> Vec<ParamDecl> {
        self.params.clone()
    }

    async fn call(&self, ctx: &C, sender: &S, args: Arguments) -> HandlerResult {
        (self.func)(ctx.clone(), sender.clone(), args).await
    }
}
