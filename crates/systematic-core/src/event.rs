use std::any::{Any, TypeId};
use std::fmt;
use std::sync::Arc;

use crate::id::EventGroupId;

/// Marker type used as a reserved handler-table key that matches any
/// concrete event type (§3 Event, §4.5 Wildcard events).
///
/// `WildcardEvent` is never itself sent; state descriptors use
/// `TypeId::of::<WildcardEvent>()` as the fallback key in their
/// event -> action maps, consulted only after every concrete-type lookup
/// has failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct WildcardEvent;

/// An immutable message with a concrete type tag and optional payload
/// (§3 Event).
///
/// Cloning an `Event` is cheap: the payload is reference-counted, so the
/// same event can be enqueued, inspected during defer-scanning, and
/// dispatched without forcing a payload copy.
#[derive(Clone)]
pub struct Event {
    type_id: TypeId,
    type_name: &'static str,
    group: Option<EventGroupId>,
    payload: Arc<dyn Any + Send + Sync>,
}

impl Event {
    pub fn new<T: Send + Sync + 'static>(payload: T) -> Self {
        Event {
            type_id: TypeId::of::<T>(),
            type_name: std::any::type_name::<T>(),
            group: None,
            payload: Arc::new(payload),
        }
    }

    pub fn with_group(mut self, group: EventGroupId) -> Self {
        self.group = Some(group);
        self
    }

    pub fn type_id(&self) -> TypeId {
        self.type_id
    }

    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    pub fn group(&self) -> Option<EventGroupId> {
        self.group
    }

    pub fn is<T: 'static>(&self) -> bool {
        self.type_id == TypeId::of::<T>()
    }

    pub fn downcast_ref<T: 'static>(&self) -> Option<&T> {
        self.payload.downcast_ref::<T>()
    }
}

impl fmt::Debug for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Event")
            .field("type_name", &self.type_name)
            .field("group", &self.group)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Ping(u32);

    #[test]
    fn downcast_ref_recovers_payload() {
        let event = Event::new(Ping(7));
        assert!(event.is::<Ping>());
        assert_eq!(event.downcast_ref::<Ping>().unwrap().0, 7);
        assert!(event.downcast_ref::<WildcardEvent>().is_none());
    }

    #[test]
    fn clone_shares_the_payload() {
        let event = Event::new(Ping(1)).with_group(EventGroupId(9));
        let cloned = event.clone();
        assert_eq!(cloned.group(), Some(EventGroupId(9)));
        assert_eq!(cloned.downcast_ref::<Ping>().unwrap().0, 1);
    }
}
