//! Round-robin turn scheduling
//!
//! The CEO hears the kickoff prompt first. After that each round walks the
//! speaking order once: the response of the previous turn goes to the next
//! role in line, tagged with the current speaker.

use crate::agent::Role;
use crate::agent::prompt::build_prompt;
use crate::response::AgentOutput;
use crate::state::{Message, Recipient, SYSTEM, SharedState};
use crate::transport::Transport;

/// One scheduled delivery
#[derive(Debug, Clone, PartialEq)]
pub struct Turn {
    /// 1-based position in the run; the kickoff is turn 1
    pub number: usize,
    /// 0 for the kickoff, 1..=max_rounds after it
    pub round: u32,
    /// Speaker the message is tagged with
    pub from: Role,
    /// Recorded addressee
    pub to: Recipient,
    /// Agent whose model is called
    pub responder: Role,
}

impl Turn {
    pub fn is_kickoff(&self) -> bool {
        self.round == 0
    }

    /// Subject line for the recorded message
    pub fn subject(&self) -> String {
        if self.is_kickoff() {
            "First action".to_string()
        } else {
            format!("Round {}: {} to {}", self.round, self.from, self.responder)
        }
    }

    /// The message the responder receives, carrying `text`
    pub fn incoming(&self, text: &str) -> Message {
        let sender = if self.is_kickoff() { SYSTEM } else { self.from.id() };
        Message::from_output(
            sender,
            Recipient::One(self.responder),
            &self.subject(),
            &AgentOutput::PlainText(text.to_string()),
        )
    }
}

/// Fixed-order cyclic dispatcher
#[derive(Debug, Clone, Copy)]
pub struct TurnScheduler {
    max_rounds: u32,
}

impl TurnScheduler {
    /// `max_rounds` below 1 is raised to 1
    pub fn new(max_rounds: u32) -> Self {
        Self {
            max_rounds: max_rounds.max(1),
        }
    }

    pub fn max_rounds(&self) -> u32 {
        self.max_rounds
    }

    /// Number of turns in a run that is never cut short
    pub fn total_turns(&self) -> usize {
        1 + Role::ORDER.len() * self.max_rounds as usize
    }

    /// The opening turn: the CEO, announcing to everyone else
    pub fn kickoff_turn(&self) -> Turn {
        Turn {
            number: 1,
            round: 0,
            from: Role::Ceo,
            to: Recipient::Broadcast(Role::Ceo.others()),
            responder: Role::Ceo,
        }
    }

    /// Every turn after the kickoff, in order
    pub fn rounds(&self) -> impl Iterator<Item = Turn> {
        let per_round = Role::ORDER.len();
        (1..=self.max_rounds).flat_map(move |round| {
            Role::ORDER.into_iter().enumerate().map(move |(i, speaker)| {
                let next = speaker.next();
                Turn {
                    number: 2 + (round as usize - 1) * per_round + i,
                    round,
                    from: speaker,
                    to: Recipient::One(next),
                    responder: next,
                }
            })
        })
    }

    /// Send the initial prompt to the CEO
    pub fn kickoff<T: Transport>(&self, transport: &T, state: &SharedState, prompt: &str) -> (Turn, AgentOutput) {
        let turn = self.kickoff_turn();
        let output = self.take_turn(transport, state, &turn, prompt);
        (turn, output)
    }

    /// Deliver `forwarded` to the turn's responder and classify the reply.
    ///
    /// Transport failures come back as [`AgentOutput::Error`]; nothing here
    /// retries or aborts.
    pub fn take_turn<T: Transport>(&self, transport: &T, state: &SharedState, turn: &Turn, forwarded: &str) -> AgentOutput {
        let incoming = turn.incoming(forwarded);
        let prompt = match state.agent(turn.responder) {
            Some(descriptor) => build_prompt(descriptor, std::slice::from_ref(&incoming)),
            None => forwarded.to_string(),
        };

        log::info!(
            "Turn {} (round {}): {} -> {} ({} prompt chars)",
            turn.number,
            turn.round,
            incoming.from,
            turn.responder,
            prompt.len()
        );

        match transport.call_agent(turn.responder, &prompt) {
            Ok(raw) => AgentOutput::from_raw(&raw),
            Err(e) => {
                log::warn!("Call to {} failed on turn {}: {:#}", turn.responder, turn.number, e);
                AgentOutput::transport_error(turn.responder.id(), &e)
            }
        }
    }
}
