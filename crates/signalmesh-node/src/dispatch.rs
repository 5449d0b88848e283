use std::any::Any;
use std::collections::HashMap;
use std::net::SocketAddr;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

use signalmesh_wire::{signal_name, Message};
use tracing::{debug, error, warn};

/// Error type handlers may return.
pub type HandlerError = Box<dyn std::error::Error + Send + Sync>;

/// Result of one handler invocation.
pub type HandlerResult = std::result::Result<(), HandlerError>;

/// A registered callback: `(message, sender address)`.
///
/// Handlers run on the receive loop. Anything slow (rule evaluation,
/// storage) belongs on a spawned task.
pub type Handler = Arc<dyn Fn(&Message, SocketAddr) -> HandlerResult + Send + Sync>;

/// What happened when one message was dispatched.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DispatchOutcome {
    /// Handlers invoked, per-signal and global.
    pub invoked: usize,
    /// Handlers that returned an error.
    pub failed: usize,
    /// Handlers that panicked.
    pub panicked: usize,
}

impl DispatchOutcome {
    /// Handlers that did not complete normally.
    pub fn failures(&self) -> usize {
        self.failed + self.panicked
    }
}

/// Signal-indexed handler registry.
///
/// For one message the order is fixed: every handler registered for that
/// exact signal in registration order, then every global observer in
/// registration order. A failing or panicking handler never stops the rest.
#[derive(Default)]
pub struct SignalDispatcher {
    by_signal: HashMap<u16, Vec<Handler>>,
    global: Vec<Handler>,
}

impl SignalDispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a handler for one signal.
    pub fn on<F>(&mut self, signal: u16, handler: F) -> &mut Self
    where
        F: Fn(&Message, SocketAddr) -> HandlerResult + Send + Sync + 'static,
    {
        self.by_signal
            .entry(signal)
            .or_default()
            .push(Arc::new(handler));
        self
    }

    /// Append a handler that observes every dispatched message.
    pub fn on_any<F>(&mut self, handler: F) -> &mut Self
    where
        F: Fn(&Message, SocketAddr) -> HandlerResult + Send + Sync + 'static,
    {
        self.global.push(Arc::new(handler));
        self
    }

    /// Number of handlers registered for exactly this signal.
    pub fn handler_count(&self, signal: u16) -> usize {
        self.by_signal.get(&signal).map_or(0, Vec::len)
    }

    /// Number of global observers.
    pub fn global_count(&self) -> usize {
        self.global.len()
    }

    /// Signals with at least one dedicated handler, ascending.
    pub fn signals(&self) -> Vec<u16> {
        let mut signals: Vec<u16> = self.by_signal.keys().copied().collect();
        signals.sort_unstable();
        signals
    }

    /// Invoke every matching handler, then every global observer.
    pub fn dispatch(&self, message: &Message, from: SocketAddr) -> DispatchOutcome {
        let mut outcome = DispatchOutcome::default();
        let dedicated = self
            .by_signal
            .get(&message.signal)
            .map(Vec::as_slice)
            .unwrap_or_default();

        for handler in dedicated.iter().chain(self.global.iter()) {
            outcome.invoked += 1;
            invoke(handler, message, from, &mut outcome);
        }

        if dedicated.is_empty() {
            debug!(
                signal = message.signal,
                signal_name = signal_name(message.signal),
                %from,
                observers = self.global.len(),
                "no dedicated handler for signal"
            );
        }
        outcome
    }
}

fn invoke(handler: &Handler, message: &Message, from: SocketAddr, outcome: &mut DispatchOutcome) {
    match panic::catch_unwind(AssertUnwindSafe(|| handler(message, from))) {
        Ok(Ok(())) => {}
        Ok(Err(err)) => {
            outcome.failed += 1;
            warn!(
                signal = message.signal,
                signal_name = signal_name(message.signal),
                %from,
                error = %err,
                "handler failed"
            );
        }
        Err(payload) => {
            outcome.panicked += 1;
            error!(
                signal = message.signal,
                signal_name = signal_name(message.signal),
                %from,
                panic = panic_message(payload.as_ref()),
                "handler panicked"
            );
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    if let Some(text) = payload.downcast_ref::<&'static str>() {
        text
    } else if let Some(text) = payload.downcast_ref::<String>() {
        text.as_str()
    } else {
        "non-string panic payload"
    }
}

impl std::fmt::Debug for SignalDispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SignalDispatcher")
            .field("signals", &self.signals())
            .field("global", &self.global.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use serde_json::json;
    use signalmesh_wire::{BUILD_STARTED, INSPECTION_REQUESTED};

    use super::*;

    type Spy = Arc<Mutex<Vec<&'static str>>>;

    fn record(spy: &Spy, label: &'static str) -> impl Fn(&Message, SocketAddr) -> HandlerResult {
        let spy = Arc::clone(spy);
        move |_, _| {
            spy.lock().unwrap().push(label);
            Ok(())
        }
    }

    fn from() -> SocketAddr {
        "127.0.0.1:41001".parse().unwrap()
    }

    #[test]
    fn dedicated_handlers_run_before_global_in_registration_order() {
        let spy: Spy = Arc::default();
        let mut dispatcher = SignalDispatcher::new();
        dispatcher.on_any(record(&spy, "G"));
        dispatcher.on(BUILD_STARTED, record(&spy, "H1"));
        dispatcher.on(BUILD_STARTED, record(&spy, "H2"));

        let outcome = dispatcher.dispatch(&Message::new(BUILD_STARTED, json!({})), from());

        assert_eq!(*spy.lock().unwrap(), ["H1", "H2", "G"]);
        assert_eq!(outcome.invoked, 3);
        assert_eq!(outcome.failures(), 0);
    }

    #[test]
    fn failing_handler_does_not_block_later_handlers() {
        let spy: Spy = Arc::default();
        let mut dispatcher = SignalDispatcher::new();
        dispatcher
            .on(BUILD_STARTED, |_, _| Err("rule engine unavailable".into()))
            .on(BUILD_STARTED, record(&spy, "H2"))
            .on_any(record(&spy, "G"));

        let outcome = dispatcher.dispatch(&Message::new(BUILD_STARTED, json!({})), from());

        assert_eq!(*spy.lock().unwrap(), ["H2", "G"]);
        assert_eq!(outcome.failed, 1);
        assert_eq!(outcome.invoked, 3);
    }

    #[test]
    fn panicking_handler_is_contained() {
        let spy: Spy = Arc::default();
        let mut dispatcher = SignalDispatcher::new();
        dispatcher
            .on(BUILD_STARTED, |_, _| panic!("handler bug"))
            .on(BUILD_STARTED, record(&spy, "H2"))
            .on_any(record(&spy, "G"));

        let outcome = dispatcher.dispatch(&Message::new(BUILD_STARTED, json!({})), from());

        assert_eq!(*spy.lock().unwrap(), ["H2", "G"]);
        assert_eq!(outcome.panicked, 1);
        assert_eq!(outcome.failures(), 1);
    }

    #[test]
    fn other_signals_only_reach_global_observers() {
        let spy: Spy = Arc::default();
        let mut dispatcher = SignalDispatcher::new();
        dispatcher
            .on(BUILD_STARTED, record(&spy, "build"))
            .on_any(record(&spy, "G"));

        let outcome =
            dispatcher.dispatch(&Message::new(INSPECTION_REQUESTED, json!(null)), from());

        assert_eq!(*spy.lock().unwrap(), ["G"]);
        assert_eq!(outcome.invoked, 1);
    }

    #[test]
    fn handlers_see_message_and_sender() {
        let seen = Arc::new(Mutex::new(None));
        let mut dispatcher = SignalDispatcher::new();
        let sink = Arc::clone(&seen);
        dispatcher.on(BUILD_STARTED, move |msg, addr| {
            *sink.lock().unwrap() = Some((msg.payload["build_id"].clone(), addr));
            Ok(())
        });

        dispatcher.dispatch(
            &Message::new(BUILD_STARTED, json!({"build_id": "b-1"})),
            from(),
        );

        assert_eq!(*seen.lock().unwrap(), Some((json!("b-1"), from())));
    }

    #[test]
    fn counts_and_signals() {
        let mut dispatcher = SignalDispatcher::new();
        dispatcher
            .on(INSPECTION_REQUESTED, |_, _| Ok(()))
            .on(BUILD_STARTED, |_, _| Ok(()))
            .on(BUILD_STARTED, |_, _| Ok(()))
            .on_any(|_, _| Ok(()));

        assert_eq!(dispatcher.handler_count(BUILD_STARTED), 2);
        assert_eq!(dispatcher.handler_count(0xFFFF), 0);
        assert_eq!(dispatcher.global_count(), 1);
        assert_eq!(dispatcher.signals(), vec![BUILD_STARTED, INSPECTION_REQUESTED]);
    }

    #[test]
    fn empty_dispatcher_invokes_nothing() {
        let dispatcher = SignalDispatcher::new();
        let outcome = dispatcher.dispatch(&Message::new(BUILD_STARTED, json!({})), from());
        assert_eq!(outcome, DispatchOutcome::default());
    }
}
