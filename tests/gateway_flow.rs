//! End-to-end exercises of the conversation gateway against the in-memory
//! store, with a scripted generator standing in for the external capability.

use async_trait::async_trait;
use chrono::{Duration, Utc};
use relaybot::channels::OwnerCommand;
use relaybot::generate::{Attachment, Generator};
use relaybot::session::{Role, Turn};
use relaybot::{Config, ConversationGateway, GatewayError, MemorySessionStore, RateLimiter, Scope, SessionStore};
use std::sync::Arc;
use tokio_test::assert_ok;

/// Echoes the prompt back, prefixed, so tests can see what context arrived.
struct EchoGenerator;

#[async_trait]
impl Generator for EchoGenerator {
    async fn generate(
        &self,
        prompt: &str,
        history: &[Turn],
        _attachment: Option<&Attachment>,
    ) -> anyhow::Result<String> {
        Ok(format!("[{} prior turns] {prompt}", history.len()))
    }
}

struct Harness {
    store: Arc<MemorySessionStore>,
    limiter: Arc<RateLimiter>,
    gateway: ConversationGateway,
}

fn harness(mutate: impl FnOnce(&mut Config)) -> Harness {
    let mut config = Config::default();
    mutate(&mut config);
    let store = Arc::new(MemorySessionStore::new());
    let limiter = Arc::new(RateLimiter::new(config.limits.daily_limit));
    let gateway = ConversationGateway::new(
        Arc::clone(&store) as Arc<dyn SessionStore>,
        Arc::clone(&limiter),
        Arc::new(EchoGenerator),
        &config,
    );
    Harness {
        store,
        limiter,
        gateway,
    }
}

#[tokio::test]
async fn conversations_accumulate_context_per_user() {
    let h = harness(|_| {});

    let first = tokio_test::assert_ok!(h.gateway.handle("alice", "hello", None).await);
    let second = tokio_test::assert_ok!(h.gateway.handle("alice", "again", None).await);
    let other = tokio_test::assert_ok!(h.gateway.handle("bob", "hi", None).await);

    assert_eq!(first, "[0 prior turns] hello");
    // Alice's second message sees her first exchange; Bob starts fresh.
    assert_eq!(second, "[2 prior turns] again");
    assert_eq!(other, "[0 prior turns] hi");
    assert_eq!(h.store.size(), 2);
}

#[tokio::test]
async fn history_window_caps_generator_context() {
    let h = harness(|c| c.session.max_history_turns = 4);

    for _ in 0..5 {
        h.gateway.handle("alice", "ping", None).await.unwrap();
    }
    let reply = h.gateway.handle("alice", "last", None).await.unwrap();

    // Ten turns stored, but only the configured window reaches the generator.
    assert_eq!(h.store.history("alice", 0).len(), 12);
    assert_eq!(reply, "[4 prior turns] last");
}

#[tokio::test]
async fn quota_is_shared_across_users() {
    let h = harness(|c| c.limits.daily_limit = 2);

    h.gateway.handle("alice", "one", None).await.unwrap();
    h.gateway.handle("bob", "two", None).await.unwrap();
    let err = h.gateway.handle("carol", "three", None).await.unwrap_err();

    assert!(matches!(err, GatewayError::QuotaExceeded));
    assert_eq!(h.limiter.remaining(&Scope::Global), 0);
}

#[tokio::test]
async fn evicted_user_starts_a_fresh_conversation() {
    let h = harness(|_| {});

    h.gateway.handle("alice", "remember me", None).await.unwrap();
    // Simulate four days of silence, then a sweep with a three-day TTL.
    let stale = Utc::now() - Duration::days(4);
    h.store
        .append("alice", Turn::at(Role::User, "idle marker", stale))
        .unwrap();
    let removed = h
        .store
        .evict_older_than(Duration::days(3), Utc::now())
        .unwrap();
    assert_eq!(removed, 1);

    let reply = h.gateway.handle("alice", "back", None).await.unwrap();
    assert_eq!(reply, "[0 prior turns] back");
}

#[tokio::test]
async fn concurrent_users_do_not_lose_exchanges() {
    let h = harness(|c| c.limits.daily_limit = 0);
    let gateway = Arc::new(h.gateway);

    // One in-flight request per user, many users in parallel.
    let mut tasks = Vec::new();
    for user in 0..4 {
        let gateway = Arc::clone(&gateway);
        tasks.push(tokio::spawn(async move {
            for i in 0..10 {
                gateway
                    .handle(&format!("user-{user}"), &format!("msg {i}"), None)
                    .await
                    .unwrap();
            }
        }));
    }
    for task in tasks {
        task.await.unwrap();
    }

    assert_eq!(h.store.size(), 4);
    for user in 0..4 {
        let history = h.store.history(&format!("user-{user}"), 0);
        // Ten exchanges, two turns each, user turn always before its reply.
        assert_eq!(history.len(), 20);
        for pair in history.chunks(2) {
            assert_eq!(pair[0].role, Role::User);
            assert_eq!(pair[1].role, Role::Assistant);
        }
    }
}

#[tokio::test]
async fn owner_commands_operate_on_live_state() {
    let h = harness(|c| c.bot_owner = Some("admin".into()));

    h.gateway.handle("alice", "hello", None).await.unwrap();
    h.gateway.handle("bob", "hello", None).await.unwrap();

    let stats = OwnerCommand::Stats.execute(h.store.as_ref(), &h.limiter);
    assert!(stats.contains("sessions: 2"));

    OwnerCommand::Forget("alice".into()).execute(h.store.as_ref(), &h.limiter);
    assert_eq!(h.store.size(), 1);

    OwnerCommand::ForgetAll.execute(h.store.as_ref(), &h.limiter);
    assert_eq!(h.store.size(), 0);
}
