//! User-confirmation gate: a [`DecisionProvider`] that asks before each
//! capture.
//!
//! The question runs on a detached thread and answers through a one-shot
//! channel. In non-blocking mode the frame loop polls that channel once per
//! frame and skips frames until the answer arrives; in blocking mode the
//! frame waits for it.

use std::sync::{Arc, Mutex, PoisonError};
use std::thread;

use tokio::sync::oneshot::{self, error::TryRecvError};
use tracing::{debug, info, trace, warn};

use crate::decision::{Decision, DecisionProvider, LayerOptions};
use crate::error::LayerError;
use crate::xr::Session;

/// Caption of the confirmation dialog.
pub const PROMPT_CAPTION: &str = "OpenXR Capture Layer";

/// The user's reply to a confirmation request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Answer {
    Yes,
    No,
    /// Stop asking; no further frames are captured.
    Cancel,
}

/// What the user is asked about.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConfirmRequest {
    pub session: Session,
    pub frame: u64,
    pub blocking: bool,
}

impl ConfirmRequest {
    /// Dialog text. Only a blocking request can name its frame: by the time
    /// a non-blocking answer arrives the application has moved on.
    pub fn message(&self) -> String {
        if self.blocking {
            format!("Capture frame #{} (Session {}) ?", self.frame, self.session)
        } else {
            format!("Capture current frame (Session {}) ?", self.session)
        }
    }
}

/// Asks the user a [`ConfirmRequest`]. Called on the gate's prompt thread.
pub trait Prompt: Send + Sync + 'static {
    fn ask(&self, request: &ConfirmRequest) -> Answer;
}

enum GateState {
    Idle,
    Pending(oneshot::Receiver<Answer>),
    Cancelled,
}

struct GateInner {
    state: GateState,
    options: LayerOptions,
}

/// Confirmation state machine: `Idle` → `Pending` → `Idle`, or `Cancelled`
/// for good once the user cancels.
pub struct ConfirmationGate<P: Prompt> {
    prompt: Arc<P>,
    inner: Mutex<GateInner>,
}

impl<P: Prompt> ConfirmationGate<P> {
    /// A gate in non-blocking mode.
    pub fn new(prompt: P) -> Self {
        Self {
            prompt: Arc::new(prompt),
            inner: Mutex::new(GateInner {
                state: GateState::Idle,
                options: LayerOptions::empty(),
            }),
        }
    }

    pub fn is_blocking(&self) -> bool {
        self.lock().options.contains(LayerOptions::BLOCKING_CAPTURE)
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self.lock().state, GateState::Cancelled)
    }

    pub fn is_pending(&self) -> bool {
        matches!(self.lock().state, GateState::Pending(_))
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, GateInner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Start the prompt thread; `None` if the thread could not be spawned.
    fn request(&self, request: ConfirmRequest) -> Option<oneshot::Receiver<Answer>> {
        let (tx, rx) = oneshot::channel();
        let prompt = Arc::clone(&self.prompt);
        let spawned = thread::Builder::new()
            .name("xrcap-confirm".into())
            .spawn(move || {
                let answer = prompt.ask(&request);
                // The gate may have been dropped meanwhile.
                let _ = tx.send(answer);
            });

        match spawned {
            Ok(_) => {
                debug!("asking: {}", request.message());
                Some(rx)
            }
            Err(e) => {
                warn!("could not start confirmation prompt: {e}");
                None
            }
        }
    }
}

/// Map an answer onto the verdict and the state that follows it.
fn resolve(answer: Answer) -> (Decision, GateState) {
    match answer {
        Answer::Yes => (Decision::Proceed, GateState::Idle),
        Answer::No => (Decision::Skip, GateState::Idle),
        Answer::Cancel => {
            info!("capture cancelled by user; no further frames will be offered");
            (Decision::Cancelled, GateState::Cancelled)
        }
    }
}

impl<P: Prompt> DecisionProvider for ConfirmationGate<P> {
    fn decide(&self, session: Session, frame: u64) -> Decision {
        let mut inner = self.lock();
        let blocking = inner.options.contains(LayerOptions::BLOCKING_CAPTURE);

        let mut rx = match std::mem::replace(&mut inner.state, GateState::Idle) {
            GateState::Cancelled => {
                inner.state = GateState::Cancelled;
                return Decision::Cancelled;
            }
            GateState::Pending(rx) => rx,
            GateState::Idle => {
                let request = ConfirmRequest {
                    session,
                    frame,
                    blocking,
                };
                match self.request(request) {
                    Some(rx) => rx,
                    None => return Decision::Skip,
                }
            }
        };

        let answer = if blocking {
            // A dropped sender is an unanswered prompt.
            rx.blocking_recv().unwrap_or(Answer::No)
        } else {
            match rx.try_recv() {
                Ok(answer) => answer,
                Err(TryRecvError::Empty) => {
                    trace!("frame {frame}: confirmation pending, skipping");
                    inner.state = GateState::Pending(rx);
                    return Decision::Skip;
                }
                Err(TryRecvError::Closed) => Answer::No,
            }
        };

        let (decision, next) = resolve(answer);
        inner.state = next;
        trace!("frame {frame}: {answer:?} -> {decision:?}");
        decision
    }

    fn set_option(&self, index: u32, value: bool) -> Result<(), LayerError> {
        self.lock().options.apply(index, value)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::mpsc;
    use std::time::Duration;

    use super::*;

    /// Answers with whatever the test feeds it, counting requests.
    struct ScriptedPrompt {
        answers: Mutex<mpsc::Receiver<Answer>>,
        asked: Arc<AtomicUsize>,
        last: Arc<Mutex<Option<ConfirmRequest>>>,
    }

    impl Prompt for ScriptedPrompt {
        fn ask(&self, request: &ConfirmRequest) -> Answer {
            self.asked.fetch_add(1, Ordering::SeqCst);
            *self.last.lock().unwrap() = Some(*request);
            self.answers.lock().unwrap().recv().unwrap_or(Answer::No)
        }
    }

    struct Harness {
        gate: ConfirmationGate<ScriptedPrompt>,
        answers: mpsc::Sender<Answer>,
        asked: Arc<AtomicUsize>,
        last: Arc<Mutex<Option<ConfirmRequest>>>,
    }

    fn harness() -> Harness {
        let (tx, rx) = mpsc::channel();
        let asked = Arc::new(AtomicUsize::new(0));
        let last = Arc::new(Mutex::new(None));
        let gate = ConfirmationGate::new(ScriptedPrompt {
            answers: Mutex::new(rx),
            asked: Arc::clone(&asked),
            last: Arc::clone(&last),
        });
        Harness {
            gate,
            answers: tx,
            asked,
            last,
        }
    }

    const SESSION: Session = Session::from_raw(0x5e55);

    /// Poll until the pending answer has been consumed.
    fn settle(gate: &ConfirmationGate<ScriptedPrompt>, frame: &mut u64) -> Decision {
        for _ in 0..2000 {
            *frame += 1;
            let decision = gate.decide(SESSION, *frame);
            if !gate.is_pending() {
                return decision;
            }
            assert_eq!(decision, Decision::Skip);
            thread::sleep(Duration::from_millis(1));
        }
        panic!("confirmation never arrived");
    }

    #[test]
    fn messages_follow_mode() {
        let blocking = ConfirmRequest {
            session: Session::from_raw(0x10),
            frame: 42,
            blocking: true,
        };
        assert_eq!(blocking.message(), "Capture frame #42 (Session 0x10) ?");
        let polled = ConfirmRequest {
            blocking: false,
            ..blocking
        };
        assert_eq!(polled.message(), "Capture current frame (Session 0x10) ?");
    }

    #[test]
    fn skips_while_pending_without_reprompting() {
        let h = harness();
        for frame in 0..5 {
            assert_eq!(h.gate.decide(SESSION, frame), Decision::Skip);
        }
        assert!(h.gate.is_pending());

        // Give the prompt thread time to pick up the request.
        for _ in 0..2000 {
            if h.asked.load(Ordering::SeqCst) > 0 {
                break;
            }
            thread::sleep(Duration::from_millis(1));
        }
        assert_eq!(h.asked.load(Ordering::SeqCst), 1);
        h.answers.send(Answer::No).unwrap();
    }

    #[test]
    fn yes_proceeds_once_then_asks_again() {
        let h = harness();
        let mut frame = 0;
        assert_eq!(h.gate.decide(SESSION, frame), Decision::Skip);
        h.answers.send(Answer::Yes).unwrap();
        assert_eq!(settle(&h.gate, &mut frame), Decision::Proceed);

        // back to idle: the next frame starts a new question
        frame += 1;
        assert_eq!(h.gate.decide(SESSION, frame), Decision::Skip);
        assert!(h.gate.is_pending());
        h.answers.send(Answer::No).unwrap();
        assert_eq!(settle(&h.gate, &mut frame), Decision::Skip);
        assert!(!h.gate.is_cancelled());
    }

    #[test]
    fn cancel_is_sticky() {
        let h = harness();
        let mut frame = 0;
        h.gate.decide(SESSION, frame);
        h.answers.send(Answer::Cancel).unwrap();
        assert_eq!(settle(&h.gate, &mut frame), Decision::Cancelled);
        assert!(h.gate.is_cancelled());

        let asked = h.asked.load(Ordering::SeqCst);
        for _ in 0..10 {
            frame += 1;
            assert_eq!(h.gate.decide(SESSION, frame), Decision::Cancelled);
        }
        assert_eq!(h.asked.load(Ordering::SeqCst), asked);
    }

    #[test]
    fn abandoned_prompt_counts_as_no() {
        let h = harness();
        let mut frame = 0;
        h.gate.decide(SESSION, frame);
        // closing the script makes the prompt thread answer No
        drop(h.answers);
        assert_eq!(settle(&h.gate, &mut frame), Decision::Skip);
        assert!(!h.gate.is_cancelled());
    }

    #[test]
    fn blocking_mode_waits_for_the_answer() {
        let h = harness();
        h.gate.set_option(0, true).unwrap();
        assert!(h.gate.is_blocking());

        h.answers.send(Answer::Yes).unwrap();
        assert_eq!(h.gate.decide(SESSION, 7), Decision::Proceed);
        let asked = h.last.lock().unwrap().unwrap();
        assert_eq!(asked.frame, 7);
        assert!(asked.blocking);

        h.answers.send(Answer::Cancel).unwrap();
        assert_eq!(h.gate.decide(SESSION, 8), Decision::Cancelled);
        assert_eq!(h.gate.decide(SESSION, 9), Decision::Cancelled);
        assert_eq!(h.asked.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn invalid_option_leaves_mode_alone() {
        let h = harness();
        assert!(matches!(h.gate.set_option(1, true), Err(LayerError::InvalidOption(1))));
        assert!(!h.gate.is_blocking());
    }
}
