//! Auto-reply engine
//!
//! Synthesizes agent-role messages without a human operator, under two
//! independent triggers: a delayed generic acknowledgement when the customer
//! is left waiting, and an instant canned answer when a message exactly
//! matches the Q&A table. Countdowns are wall-clock only; a torn-down
//! endpoint simply never sends its pending reply.

use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use rand::seq::SliceRandom;
use tokio::task::JoinHandle;

use florachat_shared::{ChatMessage, Sender, TranscriptStore};

use crate::relay::Relay;

/// Fixed greeting substituted for an absent transcript
pub const WELCOME_TEXT: &str = "Xin chào! 👋 Chúng tôi có thể giúp gì cho bạn?";

/// Pool of generic acknowledgements for the delayed reply
pub const GENERIC_REPLIES: &[&str] = &[
    "Cảm ơn bạn đã nhắn tin! Nhân viên tư vấn sẽ phản hồi bạn trong ít phút nữa ạ.",
    "Shop đã nhận được tin nhắn của bạn rồi nhé, bạn chờ shop một chút ạ!",
    "Bạn đợi shop một lát nhé, tư vấn viên đang hỗ trợ khách khác ạ. 🌸",
];

/// Exact-match question → answer table for instant replies
const INSTANT_ANSWERS: &[(&str, &str)] = &[
    (
        "Phí ship như thế nào?",
        "Shop freeship nội thành cho đơn từ 500.000đ. Đơn dưới mức này phí ship từ 30.000đ tùy khu vực bạn nhé!",
    ),
    (
        "Shop mở cửa lúc mấy giờ?",
        "Shop mở cửa từ 8h00 đến 21h00 tất cả các ngày trong tuần, kể cả lễ Tết ạ.",
    ),
    (
        "Có giao hoa trong ngày không?",
        "Có ạ! Đơn đặt trước 17h00 sẽ được giao trong ngày ở khu vực nội thành.",
    ),
    (
        "Thanh toán bằng cách nào?",
        "Shop nhận thanh toán qua chuyển khoản, Momo, ZaloPay hoặc tiền mặt khi nhận hàng ạ.",
    ),
];

/// Look up the canned answer for an exactly-matching question
pub fn instant_answer(question: &str) -> Option<&'static str> {
    INSTANT_ANSWERS
        .iter()
        .find(|(q, _)| *q == question)
        .map(|(_, a)| *a)
}

/// Timer delays for the two reply paths
#[derive(Debug, Clone)]
pub struct AutoReplyConfig {
    /// Countdown before a generic acknowledgement fires
    pub delayed_reply_after: Duration,
    /// Simulated typing time before an instant Q&A answer
    pub instant_reply_after: Duration,
}

impl Default for AutoReplyConfig {
    fn default() -> Self {
        Self {
            delayed_reply_after: Duration::from_secs(10),
            instant_reply_after: Duration::from_millis(1500),
        }
    }
}

/// Observable engine state for one open conversation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineState {
    Idle,
    AwaitingDelayedReply,
    InstantReplyPending,
}

/// A cancellable one-shot countdown: armed → fired | cancelled
///
/// Re-arming cancels the previous countdown first.
#[derive(Default)]
struct ReplyTimer {
    handle: Option<JoinHandle<()>>,
}

impl ReplyTimer {
    fn arm(&mut self, handle: JoinHandle<()>) {
        self.cancel();
        self.handle = Some(handle);
    }

    fn cancel(&mut self) {
        if let Some(handle) = self.handle.take() {
            handle.abort();
        }
    }

    fn is_armed(&self) -> bool {
        self.handle.as_ref().is_some_and(|h| !h.is_finished())
    }
}

#[derive(Default)]
struct Timers {
    delayed: ReplyTimer,
    instant: ReplyTimer,
}

/// Per-conversation auto-reply state machine
///
/// Owned by the customer endpoint (or the hosted responder standing in for
/// it); reentrant per customer message.
pub struct AutoReplyEngine {
    session_id: String,
    config: AutoReplyConfig,
    store: Arc<dyn TranscriptStore>,
    relay: Arc<dyn Relay>,
    timers: Arc<Mutex<Timers>>,
}

impl AutoReplyEngine {
    pub fn new(
        session_id: impl Into<String>,
        store: Arc<dyn TranscriptStore>,
        relay: Arc<dyn Relay>,
        config: AutoReplyConfig,
    ) -> Self {
        Self {
            session_id: session_id.into(),
            config,
            store,
            relay,
            timers: Arc::new(Mutex::new(Timers::default())),
        }
    }

    pub fn state(&self) -> EngineState {
        let timers = lock_timers(&self.timers);
        if timers.instant.is_armed() {
            EngineState::InstantReplyPending
        } else if timers.delayed.is_armed() {
            EngineState::AwaitingDelayedReply
        } else {
            EngineState::Idle
        }
    }

    /// Arm the delayed countdown if it is not already running
    ///
    /// Called when a conversation opens with a customer message at the tail.
    pub fn schedule_delayed_reply(&self) {
        let mut timers = lock_timers(&self.timers);
        if !timers.delayed.is_armed() {
            timers.delayed.arm(self.spawn_delayed());
        }
    }

    /// React to a customer send: cancel-and-restart the delayed countdown,
    /// and start the instant reply on an exact Q&A match
    pub fn handle_customer_send(&self, text: &str) {
        let mut timers = lock_timers(&self.timers);
        timers.delayed.arm(self.spawn_delayed());
        if let Some(answer) = instant_answer(text) {
            timers.instant.arm(self.spawn_instant(answer));
        }
    }

    /// A human agent message means someone took over; stop the countdown
    pub fn handle_agent_message(&self, message: &ChatMessage) {
        if message.sender == Sender::Agent && !message.is_auto_reply {
            lock_timers(&self.timers).delayed.cancel();
        }
    }

    /// Cancel both countdowns (endpoint teardown)
    pub fn cancel_all(&self) {
        let mut timers = lock_timers(&self.timers);
        timers.delayed.cancel();
        timers.instant.cancel();
    }

    fn spawn_delayed(&self) -> JoinHandle<()> {
        let session_id = self.session_id.clone();
        let store = Arc::clone(&self.store);
        let relay = Arc::clone(&self.relay);
        let delay = self.config.delayed_reply_after;

        tokio::spawn(async move {
            tokio::time::sleep(delay).await;

            // Fire only if the customer is still the one waiting
            let tail_is_customer = match store.load(&session_id).await {
                Ok(messages) => messages
                    .last()
                    .map(|m| m.sender == Sender::Customer)
                    .unwrap_or(false),
                Err(e) => {
                    tracing::warn!(
                        error = %e,
                        session_id = %session_id,
                        "Could not inspect transcript tail"
                    );
                    false
                }
            };
            if !tail_is_customer {
                return;
            }

            let text = {
                let mut rng = rand::thread_rng();
                GENERIC_REPLIES
                    .choose(&mut rng)
                    .copied()
                    .unwrap_or(GENERIC_REPLIES[0])
            };
            send_auto_reply(&store, &relay, &session_id, text).await;
        })
    }

    fn spawn_instant(&self, answer: &'static str) -> JoinHandle<()> {
        let session_id = self.session_id.clone();
        let store = Arc::clone(&self.store);
        let relay = Arc::clone(&self.relay);
        let delay = self.config.instant_reply_after;
        let timers = Arc::clone(&self.timers);

        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            send_auto_reply(&store, &relay, &session_id, answer).await;

            // The instant answer preempts the generic acknowledgement
            lock_timers(&timers).delayed.cancel();
        })
    }
}

impl Drop for AutoReplyEngine {
    fn drop(&mut self) {
        self.cancel_all();
    }
}

fn lock_timers(timers: &Mutex<Timers>) -> MutexGuard<'_, Timers> {
    timers.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Synthesize an auto-generated agent message, persist it, and broadcast it
///
/// Store and relay failures are logged and swallowed; whichever path still
/// works gets the message.
async fn send_auto_reply(
    store: &Arc<dyn TranscriptStore>,
    relay: &Arc<dyn Relay>,
    session_id: &str,
    text: &str,
) {
    let message = ChatMessage::auto_reply(text);
    if let Err(e) = store.append(session_id, &message).await {
        tracing::warn!(error = %e, session_id = %session_id, "Failed to persist auto reply");
    }
    if let Err(e) = relay.publish(session_id, &message).await {
        tracing::warn!(error = %e, session_id = %session_id, "Failed to publish auto reply");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::relay::LocalRelay;
    use florachat_shared::MemoryStore;

    fn quick_config() -> AutoReplyConfig {
        AutoReplyConfig::default()
    }

    fn engine_over(
        store: &Arc<dyn TranscriptStore>,
        relay: &Arc<dyn Relay>,
    ) -> AutoReplyEngine {
        AutoReplyEngine::new("s1", Arc::clone(store), Arc::clone(relay), quick_config())
    }

    async fn customer_says(store: &Arc<dyn TranscriptStore>, engine: &AutoReplyEngine, text: &str) {
        store
            .append("s1", &ChatMessage::customer(text))
            .await
            .unwrap();
        engine.handle_customer_send(text);
    }

    #[test]
    fn test_instant_answer_table() {
        assert!(instant_answer("Phí ship như thế nào?")
            .unwrap()
            .contains("freeship"));
        // Matching is exact, not fuzzy
        assert!(instant_answer("phí ship như thế nào?").is_none());
        assert!(instant_answer("Hoa có tươi không?").is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_delayed_reply_fires_once_from_pool() {
        let store: Arc<dyn TranscriptStore> = Arc::new(MemoryStore::new());
        let relay: Arc<dyn Relay> = Arc::new(LocalRelay::new());
        let engine = engine_over(&store, &relay);

        customer_says(&store, &engine, "Cho mình hỏi với").await;
        assert_eq!(engine.state(), EngineState::AwaitingDelayedReply);

        // Nothing before the countdown expires
        tokio::time::sleep(Duration::from_secs(9)).await;
        assert_eq!(store.load("s1").await.unwrap().len(), 1);

        tokio::time::sleep(Duration::from_secs(2)).await;
        let messages = store.load("s1").await.unwrap();
        assert_eq!(messages.len(), 2);
        let reply = &messages[1];
        assert_eq!(reply.sender, Sender::Agent);
        assert!(reply.is_auto_reply);
        assert!(GENERIC_REPLIES.contains(&reply.message.as_str()));
        assert_eq!(engine.state(), EngineState::Idle);

        // Exactly once: no second reply later
        tokio::time::sleep(Duration::from_secs(20)).await;
        assert_eq!(store.load("s1").await.unwrap().len(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_new_customer_message_restarts_countdown() {
        let store: Arc<dyn TranscriptStore> = Arc::new(MemoryStore::new());
        let relay: Arc<dyn Relay> = Arc::new(LocalRelay::new());
        let engine = engine_over(&store, &relay);

        customer_says(&store, &engine, "Alo?").await;
        tokio::time::sleep(Duration::from_secs(5)).await;
        customer_says(&store, &engine, "Còn đó không shop?").await;

        // Eleven seconds after the first send the restarted countdown has not
        // expired yet
        tokio::time::sleep(Duration::from_secs(6)).await;
        assert_eq!(store.load("s1").await.unwrap().len(), 2);

        tokio::time::sleep(Duration::from_secs(5)).await;
        assert_eq!(store.load("s1").await.unwrap().len(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_human_agent_message_cancels_countdown() {
        let store: Arc<dyn TranscriptStore> = Arc::new(MemoryStore::new());
        let relay: Arc<dyn Relay> = Arc::new(LocalRelay::new());
        let engine = engine_over(&store, &relay);

        customer_says(&store, &engine, "Mình cần tư vấn").await;

        let human = ChatMessage::agent("Chào bạn, mình nghe đây!");
        store.append("s1", &human).await.unwrap();
        engine.handle_agent_message(&human);
        assert_eq!(engine.state(), EngineState::Idle);

        tokio::time::sleep(Duration::from_secs(15)).await;
        let messages = store.load("s1").await.unwrap();
        assert_eq!(messages.len(), 2);
        assert!(!messages[1].is_auto_reply);
    }

    #[tokio::test(start_paused = true)]
    async fn test_instant_reply_sends_mapped_answer_and_preempts() {
        let store: Arc<dyn TranscriptStore> = Arc::new(MemoryStore::new());
        let relay: Arc<dyn Relay> = Arc::new(LocalRelay::new());
        let engine = engine_over(&store, &relay);

        customer_says(&store, &engine, "Phí ship như thế nào?").await;
        assert_eq!(engine.state(), EngineState::InstantReplyPending);

        tokio::time::sleep(Duration::from_secs(2)).await;
        let messages = store.load("s1").await.unwrap();
        assert_eq!(messages.len(), 2);
        assert_eq!(
            messages[1].message,
            instant_answer("Phí ship như thế nào?").unwrap()
        );
        assert!(messages[1].is_auto_reply);

        // The generic delayed reply was preempted
        tokio::time::sleep(Duration::from_secs(15)).await;
        assert_eq!(store.load("s1").await.unwrap().len(), 2);
        assert_eq!(engine.state(), EngineState::Idle);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_all_silences_both_timers() {
        let store: Arc<dyn TranscriptStore> = Arc::new(MemoryStore::new());
        let relay: Arc<dyn Relay> = Arc::new(LocalRelay::new());
        let engine = engine_over(&store, &relay);

        customer_says(&store, &engine, "Phí ship như thế nào?").await;
        engine.cancel_all();

        tokio::time::sleep(Duration::from_secs(30)).await;
        assert_eq!(store.load("s1").await.unwrap().len(), 1);
        assert_eq!(engine.state(), EngineState::Idle);
    }

    #[tokio::test(start_paused = true)]
    async fn test_delayed_reply_skipped_when_tail_moved_on() {
        let store: Arc<dyn TranscriptStore> = Arc::new(MemoryStore::new());
        let relay: Arc<dyn Relay> = Arc::new(LocalRelay::new());
        let engine = engine_over(&store, &relay);

        customer_says(&store, &engine, "Alo?").await;

        // An agent reply lands in the store without the engine hearing about
        // it (e.g. another tab); the expiry re-check still holds fire
        store
            .append("s1", &ChatMessage::agent("Mình đây ạ"))
            .await
            .unwrap();

        tokio::time::sleep(Duration::from_secs(15)).await;
        assert_eq!(store.load("s1").await.unwrap().len(), 2);
    }
}
