//! Simulation runs
//!
//! One run owns a fresh [`SharedState`]: the CEO hears the prompt, then the
//! scheduler walks the rounds until an agent signals completion, the round
//! budget runs out, or the caller cancels.

use eyre::Result;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use crate::agent::{AgentDescriptor, MemoryItem};
use crate::observability::{EventEmitter, TurnEvent};
use crate::response::{AgentOutput, is_done};
use crate::scheduler::{Turn, TurnScheduler};
use crate::state::{Message, MessageBody, Recipient, SharedState, StateError, StateStore};
use crate::transport::Transport;

const MEMORY_TITLE_MAX: usize = 80;

/// Inbound run request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RunRequest {
    pub prompt: String,
    #[serde(alias = "maxRounds")]
    pub max_rounds: u32,
}

impl Default for RunRequest {
    fn default() -> Self {
        Self {
            prompt: "We need to build an AI-powered personal finance assistant.".to_string(),
            max_rounds: 3,
        }
    }
}

/// One transcript line
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TranscriptEntry {
    pub from: String,
    pub to: Recipient,
    pub response: MessageBody,
}

impl TranscriptEntry {
    fn new(turn: &Turn, output: &AgentOutput) -> Self {
        Self {
            from: turn.from.id().to_string(),
            to: turn.to.clone(),
            response: MessageBody::from(output),
        }
    }
}

/// Outbound run response
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunResponse {
    pub conversation: Vec<TranscriptEntry>,
    pub done: bool,
}

/// How a run ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// An agent signalled completion
    Done,
    /// Every round was played
    Exhausted,
    /// The cancel token was set between turns
    Cancelled,
}

#[derive(Debug, Clone)]
pub struct RunOutcome {
    pub outcome: Outcome,
    pub conversation: Vec<TranscriptEntry>,
}

impl RunOutcome {
    pub fn done(&self) -> bool {
        self.outcome == Outcome::Done
    }

    pub fn into_response(self) -> RunResponse {
        let done = self.done();
        RunResponse {
            conversation: self.conversation,
            done,
        }
    }
}

/// Cooperative cancellation flag, checked before every dispatch
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Drives simulation runs against one snapshot
pub struct Orchestrator<T: Transport> {
    transport: T,
    store: StateStore,
    emitter: Option<EventEmitter>,
    niche: String,
    roster: Vec<AgentDescriptor>,
}

impl<T: Transport> Orchestrator<T> {
    pub fn new(transport: T, store: StateStore, niche: &str, roster: Vec<AgentDescriptor>) -> Self {
        Self {
            transport,
            store,
            emitter: None,
            niche: niche.to_string(),
            roster,
        }
    }

    pub fn with_emitter(mut self, emitter: EventEmitter) -> Self {
        self.emitter = Some(emitter);
        self
    }

    pub fn store(&self) -> &StateStore {
        &self.store
    }

    /// Run one simulation from a fresh state.
    ///
    /// Only state persistence failures abort a run.
    pub fn run(&self, request: &RunRequest, cancel: &CancelToken) -> Result<RunOutcome> {
        let scheduler = TurnScheduler::new(request.max_rounds);
        let mut state = self.store.initialize(&self.niche, self.roster.clone())?;
        let mut conversation = Vec::with_capacity(scheduler.total_turns());

        log::info!(
            "Starting simulation: niche '{}', {} rounds, {} turns at most",
            self.niche,
            scheduler.max_rounds(),
            scheduler.total_turns()
        );

        if cancel.is_cancelled() {
            return Ok(self.finish(Outcome::Cancelled, conversation));
        }

        let (turn, mut previous) = scheduler.kickoff(&self.transport, &state, &request.prompt);
        if self.record(&mut state, &turn, &previous, &mut conversation)? {
            return Ok(self.finish(Outcome::Done, conversation));
        }

        for turn in scheduler.rounds() {
            if cancel.is_cancelled() {
                return Ok(self.finish(Outcome::Cancelled, conversation));
            }

            let output = scheduler.take_turn(&self.transport, &state, &turn, &previous.forward_text());
            if self.record(&mut state, &turn, &output, &mut conversation)? {
                return Ok(self.finish(Outcome::Done, conversation));
            }
            previous = output;
        }

        Ok(self.finish(Outcome::Exhausted, conversation))
    }

    /// Apply one turn to the state (a single save), emit its event and
    /// extend the transcript. Returns whether the output signals completion.
    fn record(
        &self,
        state: &mut SharedState,
        turn: &Turn,
        output: &AgentOutput,
        conversation: &mut Vec<TranscriptEntry>,
    ) -> Result<bool, StateError> {
        let done = is_done(output);

        if !output.is_error() {
            let decision = output.envelope().decision;
            let title = memory_title(&decision);
            if !title.is_empty()
                && let Some(agent) = state.agent_mut(turn.responder)
            {
                agent.remember(MemoryItem::new(&format!("turn_{}", turn.number), &title));
            }
            if !decision.is_empty() {
                state.append_document(turn.responder.document(), &decision);
            }
        }

        let message = Message::from_output(turn.from.id(), turn.to.clone(), &turn.subject(), output);
        self.store.append_message(state, message)?;

        if let Some(emitter) = &self.emitter {
            emitter.emit(&TurnEvent::from_turn(turn, output, done));
        }

        conversation.push(TranscriptEntry::new(turn, output));
        Ok(done)
    }

    fn finish(&self, outcome: Outcome, conversation: Vec<TranscriptEntry>) -> RunOutcome {
        match outcome {
            Outcome::Done => log::info!("Simulation done after {} turns", conversation.len()),
            Outcome::Exhausted => log::info!("Round budget exhausted after {} turns", conversation.len()),
            Outcome::Cancelled => log::info!("Simulation cancelled after {} turns", conversation.len()),
        }
        RunOutcome { outcome, conversation }
    }
}

/// First line of a decision, capped for memory titles
fn memory_title(decision: &str) -> String {
    decision
        .lines()
        .next()
        .unwrap_or("")
        .trim()
        .chars()
        .take(MEMORY_TITLE_MAX)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent::{Role, roster};
    use crate::scheduler::tests::ScriptedTransport;
    use tempfile::{TempDir, tempdir};

    fn orchestrator<T: Transport>(transport: T) -> (TempDir, Orchestrator<T>) {
        let temp = tempdir().unwrap();
        let store = StateStore::new(temp.path().join("sim_state.json"));
        let orchestrator = Orchestrator::new(transport, store, "fintech", roster("fintech"));
        (temp, orchestrator)
    }

    fn request(max_rounds: u32) -> RunRequest {
        RunRequest {
            prompt: "Build a finance app".to_string(),
            max_rounds,
        }
    }

    #[test]
    fn test_single_round_transcript() {
        let (_temp, orch) = orchestrator(ScriptedTransport::echo());
        let outcome = orch.run(&request(1), &CancelToken::new()).unwrap();

        assert_eq!(outcome.outcome, Outcome::Exhausted);
        assert!(!outcome.done());
        assert_eq!(outcome.conversation.len(), 5);

        let from: Vec<&str> = outcome.conversation.iter().map(|e| e.from.as_str()).collect();
        assert_eq!(from, ["CEO", "CEO", "CTO", "Designer", "Marketer"]);

        let to: Vec<Recipient> = outcome.conversation.iter().map(|e| e.to.clone()).collect();
        assert_eq!(
            to,
            [
                Recipient::Broadcast(vec![Role::Cto, Role::Designer, Role::Marketer]),
                Recipient::One(Role::Cto),
                Recipient::One(Role::Designer),
                Recipient::One(Role::Marketer),
                Recipient::One(Role::Ceo),
            ]
        );
    }

    #[test]
    fn test_transcript_length_per_round_budget() {
        for rounds in 1..=3 {
            let (_temp, orch) = orchestrator(ScriptedTransport::echo());
            let outcome = orch.run(&request(rounds), &CancelToken::new()).unwrap();
            assert_eq!(outcome.conversation.len(), 1 + 4 * rounds as usize);

            let state = orch.store().load().unwrap();
            assert_eq!(state.chat_history.len(), 1 + 4 * rounds as usize);
        }
    }

    #[test]
    fn test_zero_rounds_clamped_to_one() {
        let (_temp, orch) = orchestrator(ScriptedTransport::echo());
        let outcome = orch.run(&request(0), &CancelToken::new()).unwrap();
        assert_eq!(outcome.conversation.len(), 5);
    }

    #[test]
    fn test_stops_on_done_signal() {
        let transport = ScriptedTransport::new(vec![
            Ok(r#"{"decision": "plan"}"#.to_string()),
            Ok(r#"{"decision": "stack"}"#.to_string()),
            Ok(r#"{"status":"DONE"}"#.to_string()),
        ]);
        let (_temp, orch) = orchestrator(&transport);
        let outcome = orch.run(&request(3), &CancelToken::new()).unwrap();

        assert!(outcome.done());
        assert_eq!(outcome.conversation.len(), 3);
        assert_eq!(transport.calls.borrow().len(), 3);
        assert_eq!(orch.store().load().unwrap().chat_history.len(), 3);
    }

    #[test]
    fn test_plain_text_done_on_kickoff() {
        let transport = ScriptedTransport::new(vec![Ok("Everything is DONE already".to_string())]);
        let (_temp, orch) = orchestrator(&transport);
        let response = orch.run(&request(2), &CancelToken::new()).unwrap().into_response();

        assert!(response.done);
        assert_eq!(response.conversation.len(), 1);
    }

    #[test]
    fn test_transport_error_recorded_and_run_continues() {
        let transport = ScriptedTransport::new(vec![
            Ok(r#"{"decision": "plan"}"#.to_string()),
            Err(eyre::eyre!("timeout")),
        ]);
        let (_temp, orch) = orchestrator(&transport);
        let outcome = orch.run(&request(1), &CancelToken::new()).unwrap();

        assert_eq!(outcome.conversation.len(), 5);
        assert_eq!(
            outcome.conversation[1].response,
            MessageBody::Text("ERROR calling CTO agent: timeout".to_string())
        );

        // The error text is what the Designer hears next
        let calls = transport.calls.borrow();
        assert!(calls[2].1.contains("Recent CTO message: ERROR calling CTO agent: timeout"));

        let state = orch.store().load().unwrap();
        assert_eq!(state.chat_history[1].kind, "error");
        assert!(state.agent(Role::Cto).unwrap().memory.short_term.is_empty());
        assert_eq!(state.documents["roadmap"], "");
    }

    #[test]
    fn test_previous_response_forwarded_as_canonical_json() {
        let transport = ScriptedTransport::echo();
        let (_temp, orch) = orchestrator(&transport);
        orch.run(&request(1), &CancelToken::new()).unwrap();

        let calls = transport.calls.borrow();
        assert_eq!(calls[1].0, Role::Cto);
        assert!(
            calls[1]
                .1
                .contains(r#"Recent CEO message: {"messages":[],"artifacts":[],"decision":"CEO turn 1"}"#)
        );
        // Single-predecessor context: the kickoff prompt is not repeated
        assert!(!calls[1].1.contains("Build a finance app"));
    }

    #[test]
    fn test_memory_and_documents_updated() {
        let (_temp, orch) = orchestrator(ScriptedTransport::echo());
        orch.run(&request(1), &CancelToken::new()).unwrap();

        let state = orch.store().load().unwrap();
        let ceo = state.agent(Role::Ceo).unwrap();
        let ids: Vec<&str> = ceo.memory.short_term.iter().map(|m| m.id.as_str()).collect();
        assert_eq!(ids, ["turn_1", "turn_5"]);
        assert_eq!(ceo.latest_memory().unwrap().title, "CEO turn 5");
        assert_eq!(ceo.memory.long_term.len(), 2);

        assert_eq!(state.documents["business_plan"], "CEO turn 1\n\nCEO turn 5");
        assert_eq!(state.documents["roadmap"], "CTO turn 2");
        assert_eq!(state.documents["swot_analysis"], "");
        assert_eq!(state.meta.niche, "fintech");
    }

    #[test]
    fn test_empty_decision_leaves_memory_and_documents() {
        let transport = ScriptedTransport::new(vec![
            Ok(r#"{"messages": ["hello team"]}"#.to_string()),
            Ok(r#"{"decision": ""}"#.to_string()),
        ]);
        let (_temp, orch) = orchestrator(&transport);
        orch.run(&request(1), &CancelToken::new()).unwrap();

        let state = orch.store().load().unwrap();
        assert_eq!(state.chat_history.len(), 5);
        let ceo = state.agent(Role::Ceo).unwrap();
        let ids: Vec<&str> = ceo.memory.short_term.iter().map(|m| m.id.as_str()).collect();
        assert_eq!(ids, ["turn_5"]);
        assert!(state.agent(Role::Cto).unwrap().memory.short_term.is_empty());
        assert_eq!(state.documents["roadmap"], "");
        assert_eq!(state.documents["business_plan"], "CEO turn 5");
    }

    #[test]
    fn test_cancel_before_start() {
        let transport = ScriptedTransport::echo();
        let (_temp, orch) = orchestrator(&transport);
        let cancel = CancelToken::new();
        cancel.cancel();

        let outcome = orch.run(&request(2), &cancel).unwrap();
        assert_eq!(outcome.outcome, Outcome::Cancelled);
        assert!(outcome.conversation.is_empty());
        assert!(transport.calls.borrow().is_empty());
        assert!(orch.store().exists());
    }

    struct CancelAfter {
        inner: ScriptedTransport,
        token: CancelToken,
        after: usize,
    }

    impl Transport for CancelAfter {
        fn call_agent(&self, role: Role, prompt: &str) -> eyre::Result<String> {
            let reply = self.inner.call_agent(role, prompt);
            if self.inner.calls.borrow().len() >= self.after {
                self.token.cancel();
            }
            reply
        }
    }

    #[test]
    fn test_cancel_between_turns() {
        let cancel = CancelToken::new();
        let transport = CancelAfter {
            inner: ScriptedTransport::echo(),
            token: cancel.clone(),
            after: 2,
        };
        let (_temp, orch) = orchestrator(transport);

        let outcome = orch.run(&request(3), &cancel).unwrap();
        assert_eq!(outcome.outcome, Outcome::Cancelled);
        assert!(!outcome.done());
        assert_eq!(outcome.conversation.len(), 2);
        assert_eq!(orch.store().load().unwrap().chat_history.len(), 2);
    }

    #[test]
    fn test_response_serialization_shape() {
        let transport = ScriptedTransport::new(vec![Ok("let's go".to_string())]);
        let (_temp, orch) = orchestrator(&transport);
        let response = orch.run(&request(1), &CancelToken::new()).unwrap().into_response();

        let json = serde_json::to_value(&response).unwrap();
        assert_eq!(json["done"], false);
        assert_eq!(json["conversation"][0]["to"], serde_json::json!(["CTO", "Designer", "Marketer"]));
        assert_eq!(json["conversation"][0]["response"], "let's go");
        assert_eq!(json["conversation"][1]["to"], "CTO");
        assert_eq!(json["conversation"][1]["response"]["decision"], "CTO turn 2");
    }

    #[test]
    fn test_request_defaults_and_alias() {
        let request: RunRequest = serde_json::from_str(r#"{"maxRounds": 2}"#).unwrap();
        assert_eq!(request.max_rounds, 2);
        assert!(request.prompt.contains("personal finance"));

        let request: RunRequest = serde_json::from_str(r#"{"prompt": "x"}"#).unwrap();
        assert_eq!(request.max_rounds, 3);
    }

    #[test]
    fn test_memory_title_first_line_truncated() {
        assert_eq!(memory_title("  Ship MVP  \nthen iterate"), "Ship MVP");
        assert_eq!(memory_title(&"x".repeat(200)).len(), 80);
        assert_eq!(memory_title(""), "");
    }
}
