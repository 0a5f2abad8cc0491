//! Built-in command set.
//!
//! These are the commands the `dcbot` binary ships with.  Moderation
//! commands check the sender's role and answer with a refusal instead of
//! failing, so a regular user only ever sees a polite reply.

use std::sync::{Arc, OnceLock};

use dcbot_kernel::{Converter, DeclaredType, command};
use dcbot_runtime::{
    Bot, BotBuilder, BotConfig, BotDispatcher, BotHandle, CommentChannel, HookKind,
    LifecycleEvent, Message, Role,
};

const NOT_ALLOWED: &str = "You are not allowed to do that.";

fn is_moderator(message: &Message) -> bool {
    message.sender.role != Role::Member
}

/// Assemble a bot with the built-in commands and logging hooks.
pub fn build_bot<Ch>(channel: Arc<Ch>, config: BotConfig) -> anyhow::Result<Bot<Ch>>
where
    Ch: CommentChannel + ?Sized,
{
    let prefix = config.prefixes.first().cloned().unwrap_or_default();
    let help = Arc::new(OnceLock::new());

    let bot = register(Bot::builder(channel, config), Arc::clone(&help))?
        .hook(HookKind::CommentBanned, |_bot, event| async move {
            if let LifecycleEvent::CommentBanned { reason } = event {
                tracing::error!(reason = %reason, "replies now go out as direct messages");
            }
        })
        .hook(HookKind::Authority, |_bot, event| async move {
            if let LifecycleEvent::Authority { message } = event {
                tracing::warn!(sender = %message.sender.display_name, "elder moderator is watching");
            }
        })
        .hook(HookKind::Abort, |bot, event| async move {
            tracing::info!(bot = %bot.name(), ?event, "shutting down");
        })
        .build()?;

    let _ = help.set(usage_listing(bot.dispatcher(), &prefix));
    Ok(bot)
}

/// One line per command: `<prefix><name> <usage>  <description>`.
pub fn usage_listing(dispatcher: &BotDispatcher, prefix: &str) -> String {
    dispatcher
        .registry()
        .commands()
        .iter()
        .map(|cmd| {
            let usage = cmd.descriptor().usage();
            let head = if usage.is_empty() {
                format!("{prefix}{}", cmd.name())
            } else {
                format!("{prefix}{} {usage}", cmd.name())
            };
            if cmd.description().is_empty() {
                head
            } else {
                format!("{head}  {}", cmd.description())
            }
        })
        .collect::<Vec<_>>()
        .join("\n")
}

fn register<Ch>(
    builder: BotBuilder<Ch>,
    help: Arc<OnceLock<String>>,
) -> dcbot_runtime::Result<BotBuilder<Ch>>
where
    Ch: CommentChannel + ?Sized,
{
    builder
        .command(
            command("add")
                .describe("Add two numbers")
                .param("ctx", DeclaredType::Any)
                .param("comment", DeclaredType::Any)
                .param("x", DeclaredType::int())
                .param("y", DeclaredType::int())
                .handler(|_bot: BotHandle, _msg: Message, args| async move {
                    let x: i64 = args.get("x")?;
                    let y: i64 = args.get("y")?;
                    Ok(Some(format!("Answer {}", x + y)))
                }),
        )?
        .command(
            command("sum")
                .describe("Add any amount of numbers")
                .param("items", DeclaredType::list(Converter::float()))
                .handler(|_bot: BotHandle, _msg: Message, args| async move {
                    let items: Vec<f64> = args.get("items")?;
                    Ok(Some(format!("Sum {}", items.iter().sum::<f64>())))
                }),
        )?
        .command(
            command("echo")
                .describe("Repeat the given words")
                .param("words", DeclaredType::list(Converter::string()))
                .handler(|_bot: BotHandle, _msg: Message, args| async move {
                    let words: Vec<String> = args.get("words")?;
                    Ok((!words.is_empty()).then(|| words.join(" ")))
                }),
        )?
        .command(
            command("greet")
                .describe("Say hello")
                .param("name", DeclaredType::optional(Converter::string()))
                .handler(|bot: BotHandle, msg: Message, args| async move {
                    let name: Option<String> = args.get("name")?;
                    let name = name.unwrap_or(msg.sender.display_name);
                    Ok(Some(format!("Hello {name}, I am {}", bot.name())))
                }),
        )?
        .command(
            command("ping")
                .describe("Check that the bot is alive")
                .handler(|_bot: BotHandle, _msg: Message, _args| async move {
                    Ok(Some("Pong!".to_string()))
                }),
        )?
        .command(
            command("help")
                .describe("List commands")
                .handler(move |_bot: BotHandle, _msg: Message, _args| {
                    let help = Arc::clone(&help);
                    async move { Ok(help.get().cloned()) }
                }),
        )?
        .command(
            command("ban")
                .describe("Ignore a sender's commands (moderators only)")
                .param("user", DeclaredType::int())
                .handler(|bot: BotHandle, msg: Message, args| async move {
                    if !is_moderator(&msg) {
                        return Ok(Some(NOT_ALLOWED.to_string()));
                    }
                    let user: i64 = args.get("user")?;
                    let id = u64::try_from(user)?;
                    let reply = if bot.ban(id) {
                        format!("User {id} banned")
                    } else {
                        format!("User {id} was already banned")
                    };
                    Ok(Some(reply))
                }),
        )?
        .command(
            command("unban")
                .describe("Accept a sender's commands again (moderators only)")
                .param("user", DeclaredType::int())
                .handler(|bot: BotHandle, msg: Message, args| async move {
                    if !is_moderator(&msg) {
                        return Ok(Some(NOT_ALLOWED.to_string()));
                    }
                    let user: i64 = args.get("user")?;
                    let id = u64::try_from(user)?;
                    let reply = if bot.unban(id) {
                        format!("User {id} unbanned")
                    } else {
                        format!("User {id} was not banned")
                    };
                    Ok(Some(reply))
                }),
        )?
        .command(
            command("stop")
                .describe("Finish the current page, then shut down (moderators only)")
                .handler(|bot: BotHandle, msg: Message, _args| async move {
                    if !is_moderator(&msg) {
                        return Ok(Some(NOT_ALLOWED.to_string()));
                    }
                    bot.request_abort();
                    Ok(Some("Shutting down after this page".to_string()))
                }),
        )?
        .command(
            command("kill")
                .describe("Shut down immediately (moderators only)")
                .handler(|bot: BotHandle, msg: Message, _args| async move {
                    if !is_moderator(&msg) {
                        return Ok(Some(NOT_ALLOWED.to_string()));
                    }
                    bot.force_abort();
                    Ok(None)
                }),
        )
}

#[cfg(test)]
mod tests {
    use dcbot_kernel::DispatchOutcome;
    use dcbot_runtime::{ScriptedChannel, Sender};

    use super::*;

    fn bot() -> Bot<ScriptedChannel> {
        build_bot(Arc::new(ScriptedChannel::new()), BotConfig::default()).unwrap()
    }

    fn from(role: Role, text: &str) -> Message {
        let sender = Sender {
            id: 5,
            display_name: "author".into(),
            role,
        };
        Message::new(1, sender, text)
    }

    async fn reply(bot: &Bot<ScriptedChannel>, message: Message) -> Option<String> {
        match bot
            .dispatcher()
            .dispatch(bot.handle(), &message, &message.text)
            .await
        {
            DispatchOutcome::Completed { reply, .. } => reply,
            other => panic!("unexpected outcome: {other:?}"),
        }
    }

    #[tokio::test]
    async fn add_accepts_every_spelling() {
        let bot = bot();
        for line in ["/add 1 2", "/add x 1 y 2", "/add x 1 2", "/add 1 y 2", "/add y 2 x 1"] {
            assert_eq!(
                reply(&bot, from(Role::Member, line)).await.as_deref(),
                Some("Answer 3"),
                "{line}"
            );
        }
    }

    #[tokio::test]
    async fn list_and_optional_commands() {
        let bot = bot();
        assert_eq!(
            reply(&bot, from(Role::Member, "/sum 1 2 3.5")).await.as_deref(),
            Some("Sum 6.5")
        );
        assert_eq!(
            reply(&bot, from(Role::Member, "/echo \"hello there\" friend")).await.as_deref(),
            Some("hello there friend")
        );
        // A bare list flag binds an empty list.
        assert_eq!(reply(&bot, from(Role::Member, "/echo words")).await, None);
        assert_eq!(
            reply(&bot, from(Role::Member, "/greet")).await.as_deref(),
            Some("Hello author, I am ")
        );
        assert_eq!(
            reply(&bot, from(Role::Member, "/greet name bob")).await.as_deref(),
            Some("Hello bob, I am ")
        );
    }

    #[tokio::test]
    async fn help_lists_usage() {
        let bot = bot();
        let help = reply(&bot, from(Role::Member, "/help")).await.unwrap();
        assert!(help.contains("/add x:int y:int  Add two numbers"));
        assert!(help.contains("/sum items:float..."));
        assert!(help.contains("/greet [name:str]"));
        assert!(help.lines().any(|l| l.starts_with("/ping")));
    }

    #[tokio::test]
    async fn moderation_requires_a_role() {
        let bot = bot();
        assert_eq!(
            reply(&bot, from(Role::Member, "/ban 9")).await.as_deref(),
            Some(NOT_ALLOWED)
        );
        assert!(!bot.handle().is_banned(9));

        assert_eq!(
            reply(&bot, from(Role::Moderator, "/ban 9")).await.as_deref(),
            Some("User 9 banned")
        );
        assert!(bot.handle().is_banned(9));

        assert_eq!(
            reply(&bot, from(Role::ElderModerator, "/unban user 9")).await.as_deref(),
            Some("User 9 unbanned")
        );
        assert!(!bot.handle().is_banned(9));

        assert_eq!(reply(&bot, from(Role::Moderator, "/kill")).await, None);
        assert!(bot.handle().is_force_abort_requested());
    }

    #[tokio::test]
    async fn negative_user_id_fails_the_command() {
        let bot = bot();
        let message = from(Role::Moderator, "/ban -1");
        let outcome = bot
            .dispatcher()
            .dispatch(bot.handle(), &message, &message.text)
            .await;
        assert!(matches!(outcome, DispatchOutcome::Failed { ref command, .. } if command == "ban"));
    }
}
