use std::{
    cell::{RefCell, RefMut},
    rc::Rc,
    sync::mpsc::{Receiver, RecvTimeoutError},
    thread,
    time::{Duration, Instant},
};

use libpulse_binding::{
    context::{Context, FlagSet as ContextFlags, State, introspect::Introspector},
    mainloop::threaded::Mainloop,
    operation::{Operation, State as OperationState},
    proplist::{Proplist, properties},
};
use tracing::debug;

use crate::error::{ControlError, ControlResult};

const CONNECT_TIMEOUT: Duration = Duration::from_secs(5);
const CONNECT_POLL: Duration = Duration::from_millis(10);
const COMPLETION_POLL: Duration = Duration::from_millis(50);

/// Connection to the PulseAudio server: the threaded event loop plus the
/// context bound to it.
///
/// The loop thread owns callback dispatch. Callers submit requests under
/// the loop lock and block on a per-operation completion channel whose
/// sending half lives inside the callback.
pub(crate) struct PulseLink {
    mainloop: Rc<RefCell<Mainloop>>,
    context: Rc<RefCell<Context>>,
}

impl PulseLink {
    /// Create the event loop and context, connect to the default server,
    /// start the loop thread, and wait for the context to become ready.
    ///
    /// # Errors
    /// `ResourceInit` when loop, context or proplist allocation fails;
    /// `ConnectionFailed` when the context enters a terminal state or does
    /// not become ready within the connect timeout.
    pub(crate) fn connect(app_name: &str) -> ControlResult<Self> {
        let mut proplist = Proplist::new().ok_or(ControlError::ResourceInit("proplist"))?;
        proplist
            .set_str(properties::APPLICATION_NAME, app_name)
            .map_err(|_| ControlError::ResourceInit("application name property"))?;

        let mainloop = Rc::new(RefCell::new(
            Mainloop::new().ok_or(ControlError::ResourceInit("threaded mainloop"))?,
        ));
        let context = Rc::new(RefCell::new(
            Context::new_with_proplist(&*mainloop.borrow(), app_name, &proplist)
                .ok_or(ControlError::ResourceInit("context"))?,
        ));

        context
            .borrow_mut()
            .connect(None, ContextFlags::NOFLAGS, None)
            .map_err(|e| ControlError::ConnectionFailed(format!("connect: {e}")))?;
        mainloop
            .borrow_mut()
            .start()
            .map_err(|e| ControlError::ConnectionFailed(format!("mainloop start: {e}")))?;

        let link = Self { mainloop, context };
        link.wait_until_ready()?;
        debug!("PulseAudio context ready");
        Ok(link)
    }

    fn wait_until_ready(&self) -> ControlResult<()> {
        let started = Instant::now();
        loop {
            let state = self.with_lock(|| self.context.borrow().get_state());
            match state {
                State::Ready => return Ok(()),
                State::Failed | State::Terminated => {
                    return Err(ControlError::ConnectionFailed(
                        "context entered a terminal state".to_string(),
                    ));
                }
                _ => {
                    if started.elapsed() > CONNECT_TIMEOUT {
                        return Err(ControlError::ConnectionFailed(
                            "timed out waiting for the context to become ready".to_string(),
                        ));
                    }
                    thread::sleep(CONNECT_POLL);
                }
            }
        }
    }

    /// Run `f` with the loop lock held.
    ///
    /// Re-entrancy rule: a callback dispatched by the loop thread already
    /// holds the lock, so inside the loop thread the lock is not
    /// re-acquired.
    pub(crate) fn with_lock<T>(&self, f: impl FnOnce() -> T) -> T {
        let in_loop_thread = self.mainloop.borrow().in_thread();
        if !in_loop_thread {
            self.mainloop.borrow_mut().lock();
        }
        let result = f();
        if !in_loop_thread {
            self.mainloop.borrow_mut().unlock();
        }
        result
    }

    /// Fail fast when the context has left the ready state.
    pub(crate) fn ensure_ready(&self) -> ControlResult<()> {
        let state = self.with_lock(|| self.context.borrow().get_state());
        if state == State::Ready {
            Ok(())
        } else {
            Err(ControlError::NotReady)
        }
    }

    /// Introspection handle for read queries and indexed mutations.
    pub(crate) fn introspect(&self) -> Introspector {
        self.context.borrow().introspect()
    }

    /// Mutable context access for context-level commands
    /// (default-device changes). Call under `with_lock`.
    pub(crate) fn context_mut(&self) -> RefMut<'_, Context> {
        self.context.borrow_mut()
    }

    /// Block until the operation's callback delivers its result over `rx`.
    ///
    /// No overall timeout is imposed: the receive parks in short intervals
    /// and inspects the operation state in between, so an operation the
    /// server cancelled (callback never ran) fails instead of blocking
    /// forever.
    ///
    /// # Errors
    /// `OperationFailed` when the operation was cancelled, finished without
    /// delivering a result, or the callback was dropped unrun; otherwise
    /// whatever the callback sent.
    pub(crate) fn finish<T, G>(
        &self,
        operation: Operation<G>,
        rx: &Receiver<ControlResult<T>>,
    ) -> ControlResult<T>
    where
        G: ?Sized,
    {
        let result = loop {
            match rx.recv_timeout(COMPLETION_POLL) {
                Ok(result) => break result,
                Err(RecvTimeoutError::Timeout) => {
                    match self.with_lock(|| operation.get_state()) {
                        OperationState::Running => {}
                        OperationState::Done => {
                            // Completed between the timeout and the state
                            // check; drain the send that must have landed.
                            break rx.try_recv().unwrap_or(Err(ControlError::OperationFailed(
                                "operation finished without a result",
                            )));
                        }
                        OperationState::Cancelled => {
                            break Err(ControlError::OperationFailed("operation cancelled"));
                        }
                    }
                }
                Err(RecvTimeoutError::Disconnected) => {
                    break Err(ControlError::OperationFailed("callback dropped unrun"));
                }
            }
        };
        // Dropping the handle unrefs a loop-owned object, which must
        // happen under the loop lock.
        self.with_lock(|| drop(operation));
        result
    }
}

impl Drop for PulseLink {
    fn drop(&mut self) {
        self.with_lock(|| {
            if let Ok(mut context) = self.context.try_borrow_mut() {
                if context.get_state() == State::Ready {
                    context.disconnect();
                }
            }
        });
        if let Ok(mut mainloop) = self.mainloop.try_borrow_mut() {
            mainloop.stop();
        }
    }
}
