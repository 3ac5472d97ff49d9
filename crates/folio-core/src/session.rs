//! A single chat widget's conversation: user turns in, delayed canned replies
//! out.
//!
//! Each accepted submit schedules one reply task. The task holds only a weak
//! reference to the session plus a cancellation token, and re-checks the
//! session generation before writing, so reset, rebind and drop all make a
//! pending reply disappear instead of landing in the wrong conversation.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};
use std::time::Duration;

use folio_schema::{ChatMessage, SessionSnapshot};
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::context::MatchContext;
use crate::matcher::ResponseMatcher;

pub const DEFAULT_REPLY_DELAY: Duration = Duration::from_millis(1500);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmitOutcome {
    Accepted { message_id: u64 },
    /// Input was empty after trimming; nothing changed
    EmptyInput,
    /// A reply is still pending; nothing changed
    AwaitingResponse,
}

impl SubmitOutcome {
    pub fn is_accepted(&self) -> bool {
        matches!(self, SubmitOutcome::Accepted { .. })
    }
}

struct SessionState {
    messages: Vec<ChatMessage>,
    awaiting_response: bool,
    next_id: u64,
    generation: u64,
    context: Arc<MatchContext>,
    pending: Option<CancellationToken>,
}

impl SessionState {
    fn next_id(&mut self) -> u64 {
        self.next_id += 1;
        self.next_id
    }

    fn clear(&mut self) {
        self.generation += 1;
        if let Some(token) = self.pending.take() {
            token.cancel();
        }
        self.messages.clear();
        self.awaiting_response = false;
    }
}

struct Shared {
    id: Uuid,
    state: Mutex<SessionState>,
    updates: watch::Sender<SessionSnapshot>,
}

impl Shared {
    fn lock(&self) -> MutexGuard<'_, SessionState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn snapshot_of(&self, state: &SessionState) -> SessionSnapshot {
        SessionSnapshot {
            session_id: self.id,
            messages: state.messages.clone(),
            awaiting_response: state.awaiting_response,
        }
    }

    fn publish(&self, state: &SessionState) {
        self.updates.send_replace(self.snapshot_of(state));
    }
}

/// Conversation owned by exactly one hosting widget.
///
/// Must be used from within a tokio runtime: `submit` spawns the reply task.
pub struct ConversationSession {
    shared: Arc<Shared>,
    matcher: Arc<dyn ResponseMatcher>,
    reply_delay: Duration,
}

impl ConversationSession {
    pub fn new(matcher: Arc<dyn ResponseMatcher>, context: MatchContext) -> Self {
        let id = Uuid::new_v4();
        let (updates, _) = watch::channel(SessionSnapshot::empty(id));
        let state = SessionState {
            messages: Vec::new(),
            awaiting_response: false,
            next_id: 0,
            generation: 0,
            context: Arc::new(context),
            pending: None,
        };

        tracing::debug!(session_id = %id, "conversation session created");

        Self {
            shared: Arc::new(Shared {
                id,
                state: Mutex::new(state),
                updates,
            }),
            matcher,
            reply_delay: DEFAULT_REPLY_DELAY,
        }
    }

    pub fn with_reply_delay(mut self, delay: Duration) -> Self {
        self.reply_delay = delay;
        self
    }

    pub fn id(&self) -> Uuid {
        self.shared.id
    }

    pub fn reply_delay(&self) -> Duration {
        self.reply_delay
    }

    pub fn context(&self) -> Arc<MatchContext> {
        Arc::clone(&self.shared.lock().context)
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        let state = self.shared.lock();
        self.shared.snapshot_of(&state)
    }

    /// Receives a fresh snapshot after every state change.
    pub fn subscribe(&self) -> watch::Receiver<SessionSnapshot> {
        self.shared.updates.subscribe()
    }

    pub fn greeting(&self) -> Option<String> {
        self.matcher.greeting(&self.context())
    }

    pub fn suggestions(&self) -> Vec<String> {
        self.matcher.suggestions(&self.context())
    }

    pub fn submit(&self, text: &str) -> SubmitOutcome {
        let text = text.trim();
        if text.is_empty() {
            tracing::debug!(session_id = %self.id(), "ignoring empty submit");
            return SubmitOutcome::EmptyInput;
        }

        let mut state = self.shared.lock();
        if state.awaiting_response {
            tracing::debug!(session_id = %self.id(), "ignoring submit while a reply is pending");
            return SubmitOutcome::AwaitingResponse;
        }

        let message_id = state.next_id();
        state.messages.push(ChatMessage::user(message_id, text));
        state.awaiting_response = true;

        let token = CancellationToken::new();
        state.pending = Some(token.clone());
        let generation = state.generation;
        let context = Arc::clone(&state.context);
        self.shared.publish(&state);
        drop(state);

        tracing::debug!(session_id = %self.id(), message_id, "user message accepted");
        self.spawn_reply(text.to_string(), context, generation, token);

        SubmitOutcome::Accepted { message_id }
    }

    /// Clears the transcript and drops any pending reply.
    pub fn reset(&self) {
        let mut state = self.shared.lock();
        state.clear();
        self.shared.publish(&state);
        tracing::debug!(session_id = %self.id(), "session reset");
    }

    /// Resets and switches to a different context, e.g. another project.
    pub fn rebind(&self, context: MatchContext) {
        let mut state = self.shared.lock();
        state.clear();
        state.context = Arc::new(context);
        self.shared.publish(&state);
        tracing::debug!(session_id = %self.id(), "session rebound to new context");
    }

    /// Waits until no reply is pending and returns the resulting snapshot.
    pub async fn settled(&self) -> SessionSnapshot {
        let mut updates = self.subscribe();
        let settled = updates
            .wait_for(|snapshot| !snapshot.awaiting_response)
            .await
            .map(|snapshot| SessionSnapshot::clone(&snapshot));
        match settled {
            Ok(snapshot) => snapshot,
            Err(_) => self.snapshot(),
        }
    }

    fn spawn_reply(
        &self,
        input: String,
        context: Arc<MatchContext>,
        generation: u64,
        token: CancellationToken,
    ) {
        let shared: Weak<Shared> = Arc::downgrade(&self.shared);
        let matcher = Arc::clone(&self.matcher);
        let delay = self.reply_delay;
        let session_id = self.id();

        tokio::spawn(async move {
            tokio::select! {
                _ = token.cancelled() => {
                    tracing::debug!(session_id = %session_id, "pending reply cancelled");
                    return;
                }
                _ = tokio::time::sleep(delay) => {}
            }

            let Some(shared) = shared.upgrade() else {
                return;
            };

            let reply = matcher.respond(&input, &context);

            let mut state = shared.lock();
            if state.generation != generation || token.is_cancelled() {
                tracing::debug!(session_id = %session_id, "discarding stale reply");
                return;
            }

            let message_id = state.next_id();
            state.messages.push(ChatMessage::assistant(message_id, reply));
            state.awaiting_response = false;
            state.pending = None;
            shared.publish(&state);

            tracing::debug!(session_id = %session_id, message_id, "assistant reply appended");
        });
    }
}

impl Drop for ConversationSession {
    fn drop(&mut self) {
        let mut state = self.shared.lock();
        if let Some(token) = state.pending.take() {
            token.cancel();
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;
    use crate::rules::project_table;

    fn project_ctx(title: &str) -> MatchContext {
        MatchContext::new(title)
            .with_text("title", title)
            .with_text("category", "Web Development")
            .with_list("technologies", ["React", "TypeScript"])
    }

    fn session() -> ConversationSession {
        ConversationSession::new(Arc::new(project_table()), project_ctx("Test Project"))
    }

    struct CountingMatcher {
        calls: Arc<AtomicUsize>,
    }

    impl ResponseMatcher for CountingMatcher {
        fn respond(&self, input: &str, _ctx: &MatchContext) -> String {
            self.calls.fetch_add(1, Ordering::SeqCst);
            format!("echo: {input}")
        }
    }

    #[tokio::test(start_paused = true)]
    async fn submit_appends_user_message_and_sets_flag() {
        let session = session();
        let outcome = session.submit("  What's the tech stack?  ");
        assert_eq!(outcome, SubmitOutcome::Accepted { message_id: 1 });

        let snapshot = session.snapshot();
        assert!(snapshot.awaiting_response);
        assert_eq!(snapshot.messages.len(), 1);
        assert_eq!(snapshot.messages[0].text, "What's the tech stack?");
        assert!(snapshot.messages[0].is_user());
    }

    #[tokio::test(start_paused = true)]
    async fn empty_submit_is_a_no_op() {
        let session = session();
        assert_eq!(session.submit(""), SubmitOutcome::EmptyInput);
        assert_eq!(session.submit("   "), SubmitOutcome::EmptyInput);

        let snapshot = session.snapshot();
        assert!(snapshot.messages.is_empty());
        assert!(!snapshot.awaiting_response);
    }

    #[tokio::test(start_paused = true)]
    async fn submit_while_awaiting_is_rejected() {
        let session = session();
        assert!(session.submit("first").is_accepted());
        assert_eq!(session.submit("second"), SubmitOutcome::AwaitingResponse);

        let snapshot = session.snapshot();
        assert_eq!(snapshot.messages.len(), 1);
        assert_eq!(snapshot.messages[0].text, "first");
    }

    #[tokio::test(start_paused = true)]
    async fn reply_arrives_after_delay() {
        let session = session();
        let started = tokio::time::Instant::now();
        session.submit("What's the tech stack?");

        let snapshot = session.settled().await;
        assert!(started.elapsed() >= DEFAULT_REPLY_DELAY);
        assert!(!snapshot.awaiting_response);
        assert_eq!(snapshot.messages.len(), 2);
        assert!(!snapshot.messages[1].is_user());
        assert!(snapshot.messages[1].text.contains("React, TypeScript"));
        assert!(snapshot.messages[0].id < snapshot.messages[1].id);
    }

    #[tokio::test(start_paused = true)]
    async fn no_reply_before_delay_elapses() {
        let session = session();
        session.submit("hello");

        tokio::time::sleep(Duration::from_millis(1000)).await;
        let snapshot = session.snapshot();
        assert!(snapshot.awaiting_response);
        assert_eq!(snapshot.messages.len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn reset_mid_flight_discards_pending_reply() {
        let session = session();
        session.submit("What's the tech stack?");
        session.reset();

        tokio::time::sleep(DEFAULT_REPLY_DELAY * 2).await;
        let snapshot = session.snapshot();
        assert!(snapshot.messages.is_empty());
        assert!(!snapshot.awaiting_response);
    }

    #[tokio::test(start_paused = true)]
    async fn rebind_drops_stale_reply_from_previous_context() {
        let session = session();
        session.submit("xyzzy");
        tokio::time::sleep(Duration::from_millis(500)).await;

        session.rebind(project_ctx("Other Project"));
        assert!(session.submit("xyzzy").is_accepted());

        let snapshot = session.settled().await;
        tokio::time::sleep(DEFAULT_REPLY_DELAY * 2).await;
        let later = session.snapshot();
        assert_eq!(snapshot, later);
        assert_eq!(later.messages.len(), 2);
        assert!(later.messages[1].text.contains("Other Project"));
        assert!(!later.messages[1].text.contains("Test Project"));
    }

    #[tokio::test(start_paused = true)]
    async fn dropped_session_never_computes_reply() {
        let calls = Arc::new(AtomicUsize::new(0));
        let session = ConversationSession::new(
            Arc::new(CountingMatcher {
                calls: Arc::clone(&calls),
            }),
            MatchContext::new("x"),
        );
        session.submit("hi");
        drop(session);

        tokio::time::sleep(DEFAULT_REPLY_DELAY * 2).await;
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn each_accepted_submit_gets_exactly_one_reply() {
        let calls = Arc::new(AtomicUsize::new(0));
        let session = ConversationSession::new(
            Arc::new(CountingMatcher {
                calls: Arc::clone(&calls),
            }),
            MatchContext::new("x"),
        )
        .with_reply_delay(Duration::from_millis(10));

        for turn in ["one", "two", "three"] {
            assert!(session.submit(turn).is_accepted());
            session.settled().await;
        }

        let snapshot = session.snapshot();
        assert_eq!(calls.load(Ordering::SeqCst), 3);
        let texts: Vec<_> = snapshot.messages.iter().map(|m| m.text.as_str()).collect();
        assert_eq!(
            texts,
            vec!["one", "echo: one", "two", "echo: two", "three", "echo: three"]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn subscribers_observe_typing_flag() {
        let session = session();
        let mut updates = session.subscribe();
        session.submit("hello");

        updates.changed().await.unwrap();
        assert!(updates.borrow_and_update().awaiting_response);

        updates.changed().await.unwrap();
        let snapshot = SessionSnapshot::clone(&updates.borrow_and_update());
        assert!(!snapshot.awaiting_response);
        assert_eq!(snapshot.messages.len(), 2);
    }

    #[tokio::test]
    async fn greeting_is_not_part_of_transcript() {
        let session = ConversationSession::new(
            Arc::new(crate::rules::contact_table()),
            MatchContext::new("Alex").with_text("name", "Alex"),
        );
        assert!(session.greeting().is_some());
        assert_eq!(session.suggestions().len(), 4);
        assert!(session.snapshot().messages.is_empty());
    }
}
