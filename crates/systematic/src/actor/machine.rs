use std::sync::atomic::Ordering;
use std::sync::Arc;

use parking_lot::Mutex;

use systematic_core::{ActorId, BugKind, Event, OperationId, OperationStatus, SchedulingPointType};

use crate::engine::{ActorHandle, Engine};
use crate::error::OpResult;
use crate::operation::WakePredicate;

use super::state::{Handler, RaiseSlot, StateMachineDescriptor};

/// Reserved event type: raising this halts the actor after the current
/// dispatch (§4.4 point 4, "RaiseHaltEvent"). It is legal to reach a
/// state with no explicit handler for it; halting from any state is
/// always allowed.
pub struct HaltEvent;

/// A running actor: mailbox, inherited state-machine descriptor, and the
/// user's own context, tied to one controlled operation (§4.4 Actor).
///
/// Dispatch of a single event is synchronous; only the wait for the next
/// dequeuable event crosses a scheduling point. The push-transition stack
/// here models the common flat case (`goto` fully replaces the active
/// state even if something was pushed beneath it) rather than general
/// hierarchical exit/entry unwinding to a common ancestor; no exercised
/// scenario nests a `push` underneath a `goto` to a sibling branch.
pub struct Actor<C> {
    pub id: ActorId,
    pub op: OperationId,
    engine: Arc<Engine>,
    handle: Arc<ActorHandle>,
    descriptor: Arc<StateMachineDescriptor<C>>,
    context: C,
    stack: Vec<String>,
    current_state: Arc<Mutex<String>>,
    raised: Option<Event>,
}

impl<C: Send + 'static> Actor<C> {
    pub fn new(
        engine: Arc<Engine>,
        op: OperationId,
        id: ActorId,
        handle: Arc<ActorHandle>,
        descriptor: Arc<StateMachineDescriptor<C>>,
        context: C,
    ) -> Self {
        Actor {
            id,
            op,
            engine,
            handle,
            descriptor,
            context,
            stack: Vec::new(),
            current_state: Arc::new(Mutex::new(String::new())),
            raised: None,
        }
    }

    /// Runs the actor's event loop until it halts or the mailbox loop is
    /// cancelled from outside.
    pub async fn run(mut self) -> OpResult<()> {
        let start = self.descriptor.start.clone();
        self.enter(start);
        loop {
            let event = match self.raised.take() {
                Some(event) => event,
                None => self.receive().await?,
            };
            if !self.dispatch(event)? {
                break;
            }
        }
        Ok(())
    }

    async fn receive(&mut self) -> OpResult<Event> {
        loop {
            let index = {
                let state = self.current_state.lock().clone();
                let mailbox = self.handle.mailbox.lock();
                mailbox.next_to_process(self.descriptor.state(&state))
            };
            if let Some(index) = index {
                self.engine
                    .schedule_next_operation(self.op, SchedulingPointType::Receive)
                    .await?;
                let mut mailbox = self.handle.mailbox.lock();
                return Ok(mailbox.remove(index));
            }
            let predicate = self.wake_predicate();
            self.engine
                .block_until(
                    self.op,
                    OperationStatus::BlockedOnReceive,
                    predicate,
                    SchedulingPointType::Wait,
                )
                .await?;
        }
    }

    fn wake_predicate(&self) -> WakePredicate {
        let descriptor = self.descriptor.clone();
        let handle = self.handle.clone();
        let current_state = self.current_state.clone();
        Box::new(move || {
            let state = current_state.lock().clone();
            let mailbox = handle.mailbox.lock();
            mailbox.next_to_process(descriptor.state(&state)).is_some()
        })
    }

    fn enter(&mut self, state: String) {
        self.stack.push(state.clone());
        *self.current_state.lock() = state.clone();
        let mut raise = RaiseSlot::default();
        if let Some(entry) = self.descriptor.state(&state).entry.clone() {
            entry(&mut self.context, &mut raise);
        }
        self.raised = raise.take();
    }

    fn goto(&mut self, target: String, raise: &mut RaiseSlot) {
        let current = self.current_state.lock().clone();
        if let Some(exit) = self.descriptor.state(&current).exit.clone() {
            exit(&mut self.context);
        }
        self.stack.clear();
        self.stack.push(target.clone());
        *self.current_state.lock() = target.clone();
        if let Some(entry) = self.descriptor.state(&target).entry.clone() {
            entry(&mut self.context, raise);
        }
    }

    fn push(&mut self, target: String, raise: &mut RaiseSlot) {
        self.stack.push(target.clone());
        *self.current_state.lock() = target.clone();
        if let Some(entry) = self.descriptor.state(&target).entry.clone() {
            entry(&mut self.context, raise);
        }
    }

    /// Returns `false` once the actor should stop its event loop.
    fn dispatch(&mut self, event: Event) -> OpResult<bool> {
        let state = self.current_state.lock().clone();
        let effective = self.descriptor.state(&state);
        let is_halt = event.is::<HaltEvent>();

        if effective.ignores(&event) {
            return Ok(true);
        }

        let handler = effective.handler(&event).cloned();
        let mut raise = RaiseSlot::default();
        match handler {
            Some(Handler::Do(action)) => action(&mut self.context, &event, &mut raise),
            Some(Handler::Goto(target)) => self.goto(target, &mut raise),
            Some(Handler::Push(target)) => self.push(target, &mut raise),
            None if is_halt => {}
            None => {
                self.engine.raise(BugKind::UnhandledEvent {
                    machine: self.handle.name.clone(),
                    state: state.clone(),
                    event_type: event.type_name().to_owned(),
                })?;
            }
        }

        self.raised = raise.take();
        if is_halt {
            self.handle.halted.store(true, Ordering::SeqCst);
            return Ok(false);
        }
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::actor::state::StateDef;
    use systematic_core::Config;

    struct Ctx {
        log: Vec<&'static str>,
    }

    struct Ping;

    fn descriptor() -> Arc<StateMachineDescriptor<Ctx>> {
        let idle = StateDef::<Ctx>::new("Idle")
            .start()
            .on_entry(|c, _| c.log.push("enter-idle"))
            .on_event::<Ping>(|c, _, _| c.log.push("ping"));
        Arc::new(StateMachineDescriptor::build("M", vec![idle]).unwrap())
    }

    #[tokio::test]
    async fn dispatches_a_sent_event_and_then_halts() {
        let engine = Engine::new(Config::default(), 1);
        let op = engine.register_root("actor");
        let (actor_id, handle) = engine.register_actor("a", None);
        handle.mailbox.lock().enqueue(Event::new(Ping)).unwrap();
        handle.mailbox.lock().enqueue(Event::new(HaltEvent)).unwrap();

        let actor = Actor::new(engine.clone(), op, actor_id, handle.clone(), descriptor(), Ctx { log: Vec::new() });
        actor.run().await.unwrap();
        assert!(handle.halted.load(Ordering::SeqCst));
    }
}
