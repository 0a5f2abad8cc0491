//! Integration tests for the dcbot-runtime crate.
//!
//! Every test runs a real [`Bot`] against a [`ScriptedChannel`], so the
//! polling loop, reply protocol, and hooks are exercised together.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use dcbot_kernel::{DeclaredType, command};
use dcbot_runtime::{
    Bot, BotConfig, BotHandle, ChannelError, Credentials, HookKind, LifecycleEvent, LoopExit,
    Message, PollSignal, Role, Route, RuntimeError, ScriptedChannel, SendFailure, SendOutcome,
    Sender,
};

type Events = Arc<Mutex<Vec<LifecycleEvent>>>;

struct Harness {
    bot: Bot<ScriptedChannel>,
    channel: Arc<ScriptedChannel>,
    events: Events,
    notes: Arc<AtomicUsize>,
}

impl Harness {
    fn count(&self, kind: HookKind) -> usize {
        self.events
            .lock()
            .unwrap()
            .iter()
            .filter(|e| e.kind() == kind)
            .count()
    }

    fn events_of(&self, kind: HookKind) -> Vec<LifecycleEvent> {
        self.events
            .lock()
            .unwrap()
            .iter()
            .filter(|e| e.kind() == kind)
            .cloned()
            .collect()
    }

    async fn run_until_quiet(&mut self) -> LoopExit {
        let channel = Arc::clone(&self.channel);
        self.bot
            .run_until(&credentials(), channel.wait_exhausted())
            .await
            .unwrap()
    }
}

fn credentials() -> Credentials {
    Credentials::new("dailybot", "secret")
}

fn user(id: u64) -> Sender {
    Sender {
        id,
        display_name: format!("user{id}"),
        role: Role::Member,
    }
}

fn msg(id: u64, sender: u64, text: &str) -> Message {
    Message::new(id, user(sender), text)
}

fn harness(channel: ScriptedChannel) -> Harness {
    let channel = Arc::new(channel);
    let events: Events = Arc::default();
    let notes = Arc::new(AtomicUsize::new(0));

    let config = BotConfig {
        poll_interval_secs: 0,
        vpn: true,
        ..BotConfig::default()
    };

    let mut builder = Bot::builder(Arc::clone(&channel), config)
        .command(
            command("add")
                .param("x", DeclaredType::int())
                .param("y", DeclaredType::int())
                .handler(|_bot: BotHandle, _msg: Message, args| async move {
                    let x: i64 = args.get("x")?;
                    let y: i64 = args.get("y")?;
                    Ok(Some(format!("Answer {}", x + y)))
                }),
        )
        .unwrap()
        .command(command("quit").handler(|bot: BotHandle, _msg: Message, _args| async move {
            bot.force_abort();
            Ok(None)
        }))
        .unwrap()
        .command(command("stop").handler(|bot: BotHandle, _msg: Message, _args| async move {
            bot.request_abort();
            Ok(None)
        }))
        .unwrap()
        .command(
            command("ban")
                .param("target", DeclaredType::int())
                .handler(|bot: BotHandle, _msg: Message, args| async move {
                    let target: i64 = args.get("target")?;
                    bot.ban(target as u64);
                    Ok(None)
                }),
        )
        .unwrap()
        .command(command("boom").handler(|_bot: BotHandle, _msg: Message, _args| async move {
            anyhow::bail!("kaboom")
        }))
        .unwrap()
        .command({
            let notes = Arc::clone(&notes);
            command("note").handler(move |_bot: BotHandle, _msg: Message, _args| {
                let notes = Arc::clone(&notes);
                async move {
                    notes.fetch_add(1, Ordering::SeqCst);
                    Ok(None)
                }
            })
        })
        .unwrap();

    for kind in HookKind::ALL {
        let events = Arc::clone(&events);
        builder = builder.hook(kind, move |_bot, event| {
            events.lock().unwrap().push(event);
            async {}
        });
    }

    Harness {
        bot: builder.build().unwrap(),
        channel,
        events,
        notes,
    }
}

// ═══════════════════════════════════════════════════════════════════════
//  Startup
// ═══════════════════════════════════════════════════════════════════════

#[tokio::test]
async fn login_failure_stops_before_polling() {
    let channel = ScriptedChannel::new();
    channel.fail_login(ChannelError::AccessDenied("bad password".into()));
    let mut h = harness(channel);

    let result = h
        .bot
        .run_until(&credentials(), std::future::pending::<()>())
        .await;
    assert!(matches!(result, Err(RuntimeError::Login(_))));
    assert_eq!(h.channel.fetches(), 0);
    assert_eq!(h.count(HookKind::Abort), 0);
}

#[tokio::test]
async fn anonymous_session_is_rejected() {
    let channel = ScriptedChannel::new();
    channel.stay_anonymous();
    let mut h = harness(channel);

    let result = h
        .bot
        .run_until(&credentials(), std::future::pending::<()>())
        .await;
    assert!(matches!(result, Err(RuntimeError::NotAuthenticated)));
}

// ═══════════════════════════════════════════════════════════════════════
//  Polling loop
// ═══════════════════════════════════════════════════════════════════════

#[tokio::test]
async fn replies_are_posted_publicly() {
    let mut h = harness(ScriptedChannel::from_pages([vec![msg(1, 5, "/add 1 2")]]));

    let exit = h.run_until_quiet().await;
    assert_eq!(exit, LoopExit::Interrupted);
    assert_eq!(h.bot.handle().name(), "dailybot");

    let replies = h.channel.replies();
    assert_eq!(replies.len(), 1);
    assert_eq!(replies[0].target, 1);
    assert_eq!(replies[0].text, "@user5 Answer 3");
    assert_eq!(h.count(HookKind::Abort), 1);
}

#[tokio::test]
async fn redelivered_messages_are_dispatched_once() {
    let mut h = harness(ScriptedChannel::from_pages([
        vec![msg(1, 1, "/note"), msg(2, 1, "/note")],
        vec![msg(1, 1, "/note"), msg(2, 1, "/note"), msg(3, 1, "/note")],
    ]));

    h.run_until_quiet().await;
    assert_eq!(h.notes.load(Ordering::SeqCst), 3);
    assert_eq!(h.bot.dedup().iter().collect::<Vec<_>>(), vec![1, 2, 3]);
}

#[tokio::test]
async fn unknown_commands_are_ignored() {
    let mut h = harness(ScriptedChannel::from_pages([vec![
        msg(1, 1, "Blah Blah Blah"),
        msg(2, 1, "add 1 2"),
    ]]));

    h.run_until_quiet().await;
    assert!(h.channel.replies().is_empty());
    assert_eq!(h.channel.reply_attempts(), 0);
    assert!(!h.bot.session().is_banned());
    assert_eq!(h.count(HookKind::CommandFailed), 0);
}

#[tokio::test]
async fn transient_fetch_fires_dead_proxy_and_retries() {
    let channel = ScriptedChannel::new();
    channel
        .push_fetch_error(ChannelError::Transient("proxy died".into()))
        .push_page(vec![msg(1, 1, "/add 2 2")]);
    let mut h = harness(channel);

    assert_eq!(h.bot.poll_once().await, PollSignal::Retry);
    assert!(h.bot.dedup().is_empty());
    assert_eq!(h.count(HookKind::DeadProxy), 1);

    assert_eq!(h.bot.poll_once().await, PollSignal::Continue);
    assert_eq!(h.channel.replies()[0].text, "@user1 Answer 4");
}

#[tokio::test]
async fn permanent_fetch_error_skips_the_iteration() {
    let channel = ScriptedChannel::new();
    channel
        .push_fetch_error(ChannelError::AccessDenied("feed locked".into()))
        .push_page(vec![msg(1, 1, "/note")]);
    let mut h = harness(channel);

    h.run_until_quiet().await;
    assert_eq!(h.notes.load(Ordering::SeqCst), 1);
    assert_eq!(h.count(HookKind::DeadProxy), 0);
}

// ═══════════════════════════════════════════════════════════════════════
//  Shutdown
// ═══════════════════════════════════════════════════════════════════════

#[tokio::test]
async fn force_abort_stops_mid_page() {
    let mut h = harness(ScriptedChannel::from_pages([
        vec![msg(1, 1, "/add 1 1"), msg(2, 1, "/quit"), msg(3, 1, "/add 2 2")],
        vec![msg(4, 1, "/add 3 3")],
    ]));

    let exit = h
        .bot
        .run_until(&credentials(), std::future::pending::<()>())
        .await
        .unwrap();

    assert_eq!(exit, LoopExit::AbortedByCommand);
    assert_eq!(h.channel.replies().len(), 1);
    assert_eq!(h.channel.fetches(), 1);
    assert!(!h.bot.dedup().contains(3));

    let aborts = h.events_of(HookKind::Abort);
    assert_eq!(aborts.len(), 1);
    assert!(matches!(
        aborts[0],
        LifecycleEvent::Abort {
            exit: LoopExit::AbortedByCommand
        }
    ));
}

#[tokio::test]
async fn graceful_abort_drains_the_page() {
    let mut h = harness(ScriptedChannel::from_pages([
        vec![msg(1, 1, "/stop"), msg(2, 1, "/add 1 1")],
        vec![msg(3, 1, "/add 5 5")],
    ]));

    let exit = h
        .bot
        .run_until(&credentials(), std::future::pending::<()>())
        .await
        .unwrap();

    assert_eq!(exit, LoopExit::Requested);
    let replies = h.channel.replies();
    assert_eq!(replies.len(), 1);
    assert_eq!(replies[0].target, 2);
    assert_eq!(h.channel.fetches(), 1);
    assert_eq!(h.count(HookKind::Abort), 1);
}

#[tokio::test]
async fn interrupt_still_runs_the_abort_hook() {
    let mut h = harness(ScriptedChannel::new());

    let exit = h.run_until_quiet().await;
    assert_eq!(exit, LoopExit::Interrupted);

    let aborts = h.events_of(HookKind::Abort);
    assert_eq!(aborts.len(), 1);
    assert!(matches!(
        aborts[0],
        LifecycleEvent::Abort {
            exit: LoopExit::Interrupted
        }
    ));
}

#[tokio::test]
async fn abort_requested_from_outside_the_loop() {
    let mut h = harness(ScriptedChannel::new());
    let handle = h.bot.handle().clone();
    handle.request_abort();

    let exit = h
        .bot
        .run_until(&credentials(), std::future::pending::<()>())
        .await
        .unwrap();
    assert_eq!(exit, LoopExit::Requested);
    assert_eq!(h.channel.fetches(), 0);
}

// ═══════════════════════════════════════════════════════════════════════
//  Senders and hooks
// ═══════════════════════════════════════════════════════════════════════

#[tokio::test]
async fn banned_senders_are_skipped() {
    let mut h = harness(ScriptedChannel::from_pages([vec![
        msg(1, 1, "/ban 9"),
        msg(2, 9, "/note"),
        msg(3, 2, "/note"),
    ]]));

    h.run_until_quiet().await;
    assert!(h.bot.handle().is_banned(9));
    assert_eq!(h.notes.load(Ordering::SeqCst), 1);

    h.bot.handle().unban(9);
    assert!(h.bot.handle().banned_senders().is_empty());
}

#[tokio::test]
async fn elevated_senders_fire_authority() {
    let elder = Sender {
        id: 77,
        display_name: "elder".into(),
        role: Role::ElderModerator,
    };
    let moderator = Sender {
        id: 78,
        display_name: "mod".into(),
        role: Role::Moderator,
    };
    let mut h = harness(ScriptedChannel::from_pages([vec![
        Message::new(1, elder, "hello"),
        Message::new(2, moderator, "hello"),
    ]]));

    h.run_until_quiet().await;
    let events = h.events_of(HookKind::Authority);
    assert_eq!(events.len(), 1);
    assert!(matches!(&events[0], LifecycleEvent::Authority { message } if message.id == 1));
}

#[tokio::test]
async fn failed_commands_are_reported() {
    let mut h = harness(ScriptedChannel::from_pages([vec![
        msg(1, 3, "/add one 2"),
        msg(2, 3, "/boom"),
        msg(3, 3, "/add 1"),
    ]]));

    h.run_until_quiet().await;
    assert!(h.channel.replies().is_empty());

    let failures: Vec<(String, String)> = h
        .events_of(HookKind::CommandFailed)
        .into_iter()
        .filter_map(|e| match e {
            LifecycleEvent::CommandFailed {
                command,
                sender,
                error,
            } => {
                assert_eq!(sender.id, 3);
                Some((command, error))
            }
            _ => None,
        })
        .collect();

    assert_eq!(failures.len(), 3);
    assert_eq!(failures[0].0, "add");
    assert!(failures[0].1.contains("one"));
    assert_eq!(failures[1].0, "boom");
    assert!(failures[1].1.contains("kaboom"));
    assert!(failures[2].1.contains("missing required argument `y`"));
}

// ═══════════════════════════════════════════════════════════════════════
//  Reply protocol
// ═══════════════════════════════════════════════════════════════════════

#[tokio::test]
async fn ban_latch_is_irreversible() {
    let channel = ScriptedChannel::from_pages([
        vec![msg(1, 1, "/add 1 2")],
        vec![msg(2, 1, "/add 2 3")],
    ]);
    channel.script_replies([Err(ChannelError::Banned("muted".into()))]);
    let mut h = harness(channel);

    h.run_until_quiet().await;

    assert!(h.bot.session().is_banned());
    // The second reply never touched the primary route, even though it
    // would have succeeded.
    assert_eq!(h.channel.reply_attempts(), 1);
    assert!(h.channel.replies().is_empty());

    let dms = h.channel.direct_messages();
    assert_eq!(dms.len(), 2);
    assert_eq!(dms[0].text, "Answer 3");
    assert_eq!(dms[1].text, "Answer 5");
    assert_eq!(dms[0].recipient.id, 1);
    assert!(dms[0].subject.contains("No Reply Response To Command"));
    assert_ne!(dms[0].subject, "No Reply Response To Command");

    assert_eq!(h.count(HookKind::CommentBanned), 1);
}

#[tokio::test]
async fn transient_sends_stop_after_ten_attempts() {
    let channel = ScriptedChannel::from_pages([vec![msg(1, 1, "/add 1 1")]]);
    channel.set_reply_default(Err(ChannelError::Transient("timeout".into())));
    let mut h = harness(channel);

    h.run_until_quiet().await;

    assert_eq!(h.channel.reply_attempts(), 10);
    assert_eq!(h.channel.direct_message_attempts(), 0);
    assert_eq!(h.count(HookKind::DeadProxy), 10);

    let failed = h.events_of(HookKind::SendFailed);
    assert_eq!(failed.len(), 1);
    assert!(matches!(
        failed[0],
        LifecycleEvent::SendFailed {
            target: 1,
            reason: SendFailure::Exhausted,
            attempts: 10,
        }
    ));
}

#[tokio::test]
async fn backup_access_denied_stops_immediately() {
    let channel = ScriptedChannel::new();
    channel
        .script_replies([Err(ChannelError::Banned("muted".into()))])
        .set_direct_message_default(Err(ChannelError::AccessDenied("dms closed".into())));
    let mut h = harness(channel);

    let outcome = h.bot.send(&msg(1, 1, "/add 1 1"), "Answer 2").await;
    assert_eq!(
        outcome,
        SendOutcome::Failed {
            reason: SendFailure::AccessDenied,
            attempts: 1,
        }
    );
    assert_eq!(h.channel.direct_message_attempts(), 1);
}

#[tokio::test]
async fn backup_route_retries_transient_errors() {
    let channel = ScriptedChannel::new();
    channel
        .script_replies([Err(ChannelError::Banned("muted".into()))])
        .script_direct_messages([Err(ChannelError::Transient("proxy".into())), Ok(())]);
    let mut h = harness(channel);

    let outcome = h.bot.send(&msg(1, 1, "/add 1 1"), "Answer 2").await;
    assert_eq!(
        outcome,
        SendOutcome::Delivered {
            route: Route::Backup,
            attempts: 2,
        }
    );
    assert_eq!(h.channel.reply_attempts(), 1);
    assert_eq!(h.count(HookKind::DeadProxy), 1);
    assert_eq!(h.count(HookKind::CommentBanned), 1);
}

#[tokio::test]
async fn primary_access_denied_does_not_latch() {
    let channel = ScriptedChannel::new();
    channel.script_replies([Err(ChannelError::AccessDenied("thread locked".into()))]);
    let mut h = harness(channel);
    let target = msg(1, 1, "/add 1 1");

    let first = h.bot.send(&target, "Answer 2").await;
    assert_eq!(
        first,
        SendOutcome::Delivered {
            route: Route::Backup,
            attempts: 1,
        }
    );
    assert!(!h.bot.session().is_banned());

    let second = h.bot.send(&target, "Answer 2").await;
    assert_eq!(
        second,
        SendOutcome::Delivered {
            route: Route::Primary,
            attempts: 1,
        }
    );
    assert_eq!(h.count(HookKind::CommentBanned), 0);
}
