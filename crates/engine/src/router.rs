//! The control loop: a small state machine over the loop roles.
//!
//! Routing is a pure function of the state and the last role executed,
//! so it can be unit-tested with no collaborators at all. The loop body
//! is mechanical: pick the next role, let it compute a [`StateUpdate`],
//! merge the update, emit a [`StepEvent`], repeat until terminal.
//!
//! Topology: Classify, then either one chat response or the
//! Plan → Dispatch → Critique cycle. Termination comes from the
//! terminal sentinels or the error-streak abort; there is no global
//! step cap.

use onager_core::{CapabilityProvider, CompletionService, MemoryService, Message};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{info, warn};

use crate::chat::ChatResponder;
use crate::classifier::IntentClassifier;
use crate::critic::OutcomeCritic;
use crate::dispatcher::ActionDispatcher;
use crate::planner::Planner;
use crate::state::{ExecutionState, Mode, Status};
use crate::step_event::StepEvent;

/// One step of the loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopRole {
    Classify,
    ChatRespond,
    Plan,
    Dispatch,
    Critique,
}

/// Pure transition function: which role runs next.
///
/// `last` is `None` when (re)entering the loop; a resumed run re-enters
/// wherever its state left off (unclassified runs classify, runs with a
/// pending action dispatch it, everything else plans).
pub fn next_role(state: &ExecutionState, last: Option<LoopRole>) -> Option<LoopRole> {
    if state.status == Status::Finished || state.status == Status::AwaitingApproval {
        return None;
    }

    match last {
        None => match state.mode {
            None => Some(LoopRole::Classify),
            Some(Mode::Chat) => Some(LoopRole::ChatRespond),
            Some(Mode::Task) => {
                if state.pending_action.is_some() {
                    Some(LoopRole::Dispatch)
                } else {
                    Some(LoopRole::Plan)
                }
            }
        },
        Some(LoopRole::Classify) => match state.mode {
            Some(Mode::Chat) => Some(LoopRole::ChatRespond),
            _ => Some(LoopRole::Plan),
        },
        Some(LoopRole::ChatRespond) => None,
        Some(LoopRole::Plan) => Some(LoopRole::Dispatch),
        Some(LoopRole::Dispatch) => Some(LoopRole::Critique),
        Some(LoopRole::Critique) => Some(LoopRole::Plan),
    }
}

/// Policy constants for one loop instance.
#[derive(Debug, Clone)]
pub struct LoopConfig {
    pub error_streak_limit: u32,
    pub output_max_chars: usize,
    pub chat_history_window: usize,
    pub planner_history_window: usize,
    pub log_window: usize,
    pub chat_recall_k: usize,
    pub planner_recall_k: usize,
    pub classifier_temperature: f32,
    pub planner_temperature: f32,
    pub critic_temperature: f32,
    pub chat_temperature: f32,
    /// Store each finished exchange back into memory.
    pub auto_save: bool,
}

impl Default for LoopConfig {
    fn default() -> Self {
        Self {
            error_streak_limit: 5,
            output_max_chars: 500,
            chat_history_window: 10,
            planner_history_window: 6,
            log_window: 8,
            chat_recall_k: 5,
            planner_recall_k: 3,
            classifier_temperature: 0.0,
            planner_temperature: 0.1,
            critic_temperature: 0.1,
            chat_temperature: 0.7,
            auto_save: false,
        }
    }
}

/// Cancellation handle for a streaming run. Checked between steps only;
/// a step already in flight finishes first.
#[derive(Clone, Default)]
pub struct AbortHandle(Arc<AtomicBool>);

impl AbortHandle {
    pub fn abort(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    pub fn is_aborted(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

/// The agent control loop, wired with its three collaborators.
#[derive(Clone)]
pub struct ControlLoop {
    completion: Arc<dyn CompletionService>,
    capabilities: Arc<dyn CapabilityProvider>,
    memory: Arc<dyn MemoryService>,
    config: LoopConfig,
}

impl ControlLoop {
    pub fn new(
        completion: Arc<dyn CompletionService>,
        capabilities: Arc<dyn CapabilityProvider>,
        memory: Arc<dyn MemoryService>,
    ) -> Self {
        Self {
            completion,
            capabilities,
            memory,
            config: LoopConfig::default(),
        }
    }

    pub fn with_config(mut self, config: LoopConfig) -> Self {
        self.config = config;
        self
    }

    /// Drive a fresh run to completion and return the final state.
    pub async fn run(&self, objective: &str) -> ExecutionState {
        self.drive(ExecutionState::new(objective), None, &AbortHandle::default())
            .await
    }

    /// Drive a previously captured state to completion. Re-enters the
    /// loop wherever the state left off.
    pub async fn run_resumed(&self, state: ExecutionState) -> ExecutionState {
        self.drive(state, None, &AbortHandle::default()).await
    }

    /// Streaming variant of [`run`]: the run executes on a background
    /// task, yielding one [`StepEvent`] per step over the receiver.
    pub fn run_stream(&self, objective: &str) -> (AbortHandle, mpsc::Receiver<StepEvent>) {
        self.run_stream_state(ExecutionState::new(objective))
    }

    /// Stream a run from a prepared state (resumed runs, or runs with a
    /// per-run capability enablement table).
    pub fn run_stream_state(&self, state: ExecutionState) -> (AbortHandle, mpsc::Receiver<StepEvent>) {
        let (tx, rx) = mpsc::channel(128);
        let abort = AbortHandle::default();
        let this = self.clone();
        let handle = abort.clone();
        tokio::spawn(async move {
            this.drive(state, Some(tx), &handle).await;
        });
        (abort, rx)
    }

    async fn drive(
        &self,
        mut state: ExecutionState,
        tx: Option<mpsc::Sender<StepEvent>>,
        abort: &AbortHandle,
    ) -> ExecutionState {
        let cfg = &self.config;
        let classifier = IntentClassifier::new(self.completion.clone())
            .with_temperature(cfg.classifier_temperature);
        let chat = ChatResponder::new(self.completion.clone(), self.memory.clone())
            .with_temperature(cfg.chat_temperature)
            .with_history_window(cfg.chat_history_window)
            .with_recall_k(cfg.chat_recall_k);
        let planner = Planner::new(
            self.completion.clone(),
            self.capabilities.clone(),
            self.memory.clone(),
        )
        .with_temperature(cfg.planner_temperature)
        .with_history_window(cfg.planner_history_window)
        .with_log_window(cfg.log_window)
        .with_recall_k(cfg.planner_recall_k)
        .with_error_streak_limit(cfg.error_streak_limit);
        let dispatcher = ActionDispatcher::new(self.capabilities.clone())
            .with_output_max_chars(cfg.output_max_chars);
        let critic = OutcomeCritic::new(self.completion.clone())
            .with_temperature(cfg.critic_temperature)
            .with_error_streak_limit(cfg.error_streak_limit);

        info!(run_id = %state.run_id, objective = %state.objective, "run starting");

        let mut last: Option<LoopRole> = None;
        loop {
            if abort.is_aborted() {
                warn!(run_id = %state.run_id, "run aborted between steps");
                emit(
                    &tx,
                    StepEvent::Aborted {
                        run_id: state.run_id.to_string(),
                    },
                )
                .await;
                return state;
            }

            let Some(role) = next_role(&state, last) else {
                break;
            };

            match role {
                LoopRole::Classify => {
                    let update = classifier.classify(&state).await;
                    let mode = update.mode.unwrap_or(Mode::Task);
                    let thought = update.rationale.clone().unwrap_or_default();
                    update.apply(&mut state);
                    emit(&tx, StepEvent::Classified { mode, thought }).await;
                }
                LoopRole::ChatRespond => {
                    let update = chat.respond(&state).await;
                    update.apply(&mut state);
                }
                LoopRole::Plan => {
                    let update = planner.plan(&state).await;
                    if let Some(thought) = &update.rationale {
                        emit(&tx, StepEvent::Thought { content: thought.clone() }).await;
                    }
                    if let Some(action) = &update.pending_action {
                        emit(
                            &tx,
                            StepEvent::ActionPlanned {
                                capability: action.capability.clone(),
                                arguments: action.arguments.clone(),
                            },
                        )
                        .await;
                    }
                    update.apply(&mut state);
                }
                LoopRole::Dispatch => {
                    let capability = state
                        .pending_action
                        .as_ref()
                        .map(|a| a.capability.clone())
                        .unwrap_or_default();
                    let update = dispatcher.dispatch(&state).await;
                    if let Some(message) = &update.last_error {
                        emit(&tx, StepEvent::Error { message: message.clone() }).await;
                    } else if update.final_response.is_none() {
                        emit(
                            &tx,
                            StepEvent::ActionDispatched {
                                capability,
                                output: update.last_output.clone().unwrap_or_default(),
                            },
                        )
                        .await;
                    }
                    update.apply(&mut state);
                }
                LoopRole::Critique => {
                    let update = critic.critique(&state).await;
                    if !update.is_empty() {
                        let is_error = matches!(
                            update.status,
                            Some(Status::ErrorRecovery) | Some(Status::Finished)
                        );
                        let feedback = update
                            .rationale
                            .clone()
                            .unwrap_or_else(|| "Error limit reached, aborting.".into());
                        emit(&tx, StepEvent::Critiqued { is_error, feedback }).await;
                    }
                    update.apply(&mut state);
                }
            }

            if state.is_finished() {
                break;
            }
            last = Some(role);
        }

        if let Some(response) = state.final_response.clone() {
            state.conversation.push(Message::assistant(&response));
            emit(&tx, StepEvent::Finished { response: response.clone() }).await;
            self.auto_save(&state.objective, &response).await;
            info!(run_id = %state.run_id, steps = state.execution_log.len(), "run finished");
        }

        state
    }

    async fn auto_save(&self, objective: &str, response: &str) {
        if !self.config.auto_save {
            return;
        }
        // Only keep meaningful exchanges.
        if objective.len() < 10 || response.len() < 10 {
            return;
        }
        let note = format!("User asked: {objective}\nAssistant answered: {response}");
        if let Err(e) = self.memory.store(&note).await {
            warn!("failed to auto-save exchange to memory: {e}");
        }
    }
}

async fn emit(tx: &Option<mpsc::Sender<StepEvent>>, event: StepEvent) {
    if let Some(tx) = tx {
        let _ = tx.send(event).await;
    }
}
