// ABOUTME: Host step interface: suspendable sessions driven by run/supply_input

use crate::ast::Node;
use crate::eval::{Flow, Interpreter};
use crate::parser::{parse_program, ParseError};
use std::collections::HashMap;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("unknown session {0}")]
    UnknownSession(SessionId),
}

pub type SessionId = u64;

/// The status a step ends in. `InputRequired` leaves the session
/// resumable; the other two are terminal.
#[derive(Debug, Clone, PartialEq)]
pub enum RunStatus {
    Complete,
    InputRequired { line: u32 },
    RuntimeError(String),
}

/// The result of one step: everything printed during the step, in order,
/// plus the status the step ended in.
#[derive(Debug, Clone, PartialEq)]
pub struct StepOutput {
    pub output: Vec<String>,
    pub status: RunStatus,
}

/// A parsed program plus its evaluator state, advanced one top-level
/// statement at a time.
///
/// A suspension preserves the index of the statement that asked for input;
/// resuming re-evaluates that statement with the staged value available.
pub struct Session {
    program: Vec<Node>,
    interp: Interpreter,
    next_statement: usize,
    finished: bool,
}

impl Session {
    /// Parses the source and prepares a session. Lex and parse errors
    /// abort creation.
    pub fn new(source: &str) -> Result<Self, ParseError> {
        let (program, defs) = parse_program(source)?;
        Ok(Session {
            program,
            interp: Interpreter::with_defs(defs),
            next_statement: 0,
            finished: false,
        })
    }

    /// Runs from the next pending statement until completion, suspension,
    /// or a runtime error. Output accumulated before a failure is still
    /// returned.
    pub fn run(&mut self) -> StepOutput {
        while self.next_statement < self.program.len() {
            match self.interp.evaluate(&self.program[self.next_statement]) {
                // A top-level return is an ordinary statement result.
                Ok(_) | Err(Flow::Return(_)) => {
                    self.next_statement += 1;
                }
                Err(Flow::InputRequired { line }) => {
                    return StepOutput {
                        output: self.interp.drain_output(),
                        status: RunStatus::InputRequired { line },
                    };
                }
                Err(Flow::Error(err)) => {
                    self.finished = true;
                    return StepOutput {
                        output: self.interp.drain_output(),
                        status: RunStatus::RuntimeError(err.to_string()),
                    };
                }
            }
        }
        self.finished = true;
        StepOutput {
            output: self.interp.drain_output(),
            status: RunStatus::Complete,
        }
    }

    /// Stages a host-supplied input value and resumes.
    pub fn supply_input(&mut self, value: &str) -> StepOutput {
        self.interp.stage_input(value);
        self.run()
    }

    pub fn is_finished(&self) -> bool {
        self.finished
    }
}

/// Owns live sessions on behalf of a host, keyed by id.
#[derive(Default)]
pub struct SessionManager {
    sessions: HashMap<SessionId, Session>,
    next_id: SessionId,
}

impl SessionManager {
    pub fn new() -> Self {
        SessionManager::default()
    }

    pub fn new_session(&mut self, source: &str) -> Result<SessionId, ParseError> {
        let session = Session::new(source)?;
        let id = self.next_id;
        self.next_id += 1;
        self.sessions.insert(id, session);
        Ok(id)
    }

    pub fn run(&mut self, id: SessionId) -> Result<StepOutput, SessionError> {
        self.sessions
            .get_mut(&id)
            .map(Session::run)
            .ok_or(SessionError::UnknownSession(id))
    }

    pub fn supply_input(&mut self, id: SessionId, value: &str) -> Result<StepOutput, SessionError> {
        self.sessions
            .get_mut(&id)
            .map(|session| session.supply_input(value))
            .ok_or(SessionError::UnknownSession(id))
    }

    /// Drops the session. Abandoning a suspended session is equivalent to
    /// dropping its environment.
    pub fn dispose(&mut self, id: SessionId) {
        self.sessions.remove(&id);
    }
}
