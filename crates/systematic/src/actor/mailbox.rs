use std::collections::VecDeque;

use systematic_core::Event;

use super::state::EffectiveState;

/// Raised when an actor's mailbox has a configured capacity and that
/// capacity is exceeded (§4.4 Mailbox: "overflow is a bug").
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MailboxOverflow;

/// FIFO mailbox with O(1) enqueue and a linear scan on dequeue to honor
/// defer semantics (§4.4 Mailbox).
pub struct Mailbox {
    queue: VecDeque<Event>,
    capacity: Option<usize>,
}

impl Mailbox {
    pub fn new(capacity: Option<usize>) -> Self {
        Mailbox {
            queue: VecDeque::new(),
            capacity,
        }
    }

    pub fn enqueue(&mut self, event: Event) -> Result<(), MailboxOverflow> {
        if let Some(capacity) = self.capacity {
            if self.queue.len() >= capacity {
                return Err(MailboxOverflow);
            }
        }
        self.queue.push_back(event);
        Ok(())
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    pub fn len(&self) -> usize {
        self.queue.len()
    }

    /// The index of the first event in FIFO order that the current
    /// effective state does not defer. Deferred events remain in the
    /// mailbox, in order, until a state change makes them eligible
    /// again (§4.4 point 2).
    pub fn next_to_process<C>(&self, state: &EffectiveState<C>) -> Option<usize> {
        self.queue.iter().position(|event| !state.defers(event))
    }

    pub fn peek(&self, index: usize) -> &Event {
        &self.queue[index]
    }

    pub fn remove(&mut self, index: usize) -> Event {
        self.queue
            .remove(index)
            .expect("index returned by next_to_process is always in range")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::actor::state::StateDef;

    struct Ctx;
    struct A;
    struct B;

    #[test]
    fn fifo_order_is_preserved_for_non_deferred_events() {
        let mut mailbox = Mailbox::new(None);
        mailbox.enqueue(Event::new(A)).unwrap();
        mailbox.enqueue(Event::new(B)).unwrap();

        let state = StateDef::<Ctx>::new("S").start().on_event::<A>(|_, _, _| {}).on_event::<B>(|_, _, _| {});
        let descriptor =
            crate::actor::state::StateMachineDescriptor::build("M", vec![state]).unwrap();
        let effective = descriptor.state("S");

        let first = mailbox.next_to_process(effective).unwrap();
        assert!(mailbox.peek(first).is::<A>());
        mailbox.remove(first);
        let second = mailbox.next_to_process(effective).unwrap();
        assert!(mailbox.peek(second).is::<B>());
    }

    #[test]
    fn deferred_event_is_skipped_in_place() {
        let mut mailbox = Mailbox::new(None);
        mailbox.enqueue(Event::new(A)).unwrap();
        mailbox.enqueue(Event::new(B)).unwrap();

        let state = StateDef::<Ctx>::new("S")
            .start()
            .defers::<A>()
            .on_event::<B>(|_, _, _| {});
        let descriptor =
            crate::actor::state::StateMachineDescriptor::build("M", vec![state]).unwrap();
        let effective = descriptor.state("S");

        let index = mailbox.next_to_process(effective).unwrap();
        assert!(mailbox.peek(index).is::<B>());
    }

    #[test]
    fn overflow_is_reported_once_capacity_is_reached() {
        let mut mailbox = Mailbox::new(Some(1));
        mailbox.enqueue(Event::new(A)).unwrap();
        assert_eq!(mailbox.enqueue(Event::new(B)), Err(MailboxOverflow));
    }
}
