use std::any::TypeId;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use systematic_core::{ConfigurationError, Event, WildcardEvent};

/// Where an entry or `do` action stashes an event it wants raised
/// immediately after the action returns (§4.4 point 3: "entry actions may
/// raise a single event via RaiseEvent"). Last write wins within one
/// action; the actor loop takes it before going back to the mailbox.
#[derive(Default)]
pub struct RaiseSlot(Option<Event>);

impl RaiseSlot {
    pub fn raise<T: Send + Sync + 'static>(&mut self, payload: T) {
        self.0 = Some(Event::new(payload));
    }

    pub fn take(&mut self) -> Option<Event> {
        self.0.take()
    }
}

/// What a state does with a matched event (§3 Actor state, §4.4 Dispatch).
pub enum Handler<C> {
    Do(Arc<dyn Fn(&mut C, &Event, &mut RaiseSlot) + Send + Sync>),
    Goto(String),
    Push(String),
}

impl<C> Clone for Handler<C> {
    fn clone(&self) -> Self {
        match self {
            Handler::Do(action) => Handler::Do(action.clone()),
            Handler::Goto(target) => Handler::Goto(target.clone()),
            Handler::Push(target) => Handler::Push(target.clone()),
        }
    }
}

/// One state as declared by the user, before inheritance is resolved.
pub struct StateDef<C> {
    pub name: String,
    pub parent: Option<String>,
    pub is_start: bool,
    pub is_hot: bool,
    pub is_cold: bool,
    pub entry: Option<Arc<dyn Fn(&mut C, &mut RaiseSlot) + Send + Sync>>,
    pub exit: Option<Arc<dyn Fn(&mut C) + Send + Sync>>,
    pub on: HashMap<TypeId, Handler<C>>,
    pub ignore: HashSet<TypeId>,
    pub defer: HashSet<TypeId>,
    pub wildcard: Option<Handler<C>>,
}

impl<C> StateDef<C> {
    pub fn new(name: impl Into<String>) -> Self {
        StateDef {
            name: name.into(),
            parent: None,
            is_start: false,
            is_hot: false,
            is_cold: false,
            entry: None,
            exit: None,
            on: HashMap::new(),
            ignore: HashSet::new(),
            defer: HashSet::new(),
            wildcard: None,
        }
    }

    pub fn start(mut self) -> Self {
        self.is_start = true;
        self
    }

    pub fn hot(mut self) -> Self {
        self.is_hot = true;
        self
    }

    pub fn cold(mut self) -> Self {
        self.is_cold = true;
        self
    }

    pub fn inherits(mut self, parent: impl Into<String>) -> Self {
        self.parent = Some(parent.into());
        self
    }

    pub fn on_entry(mut self, action: impl Fn(&mut C, &mut RaiseSlot) + Send + Sync + 'static) -> Self {
        self.entry = Some(Arc::new(action));
        self
    }

    pub fn on_exit(mut self, action: impl Fn(&mut C) + Send + Sync + 'static) -> Self {
        self.exit = Some(Arc::new(action));
        self
    }

    pub fn on_event<T: 'static>(
        mut self,
        action: impl Fn(&mut C, &Event, &mut RaiseSlot) + Send + Sync + 'static,
    ) -> Self {
        self.on.insert(TypeId::of::<T>(), Handler::Do(Arc::new(action)));
        self
    }

    pub fn goto<T: 'static>(mut self, target: impl Into<String>) -> Self {
        self.on.insert(TypeId::of::<T>(), Handler::Goto(target.into()));
        self
    }

    pub fn push<T: 'static>(mut self, target: impl Into<String>) -> Self {
        self.on.insert(TypeId::of::<T>(), Handler::Push(target.into()));
        self
    }

    pub fn ignores<T: 'static>(mut self) -> Self {
        self.ignore.insert(TypeId::of::<T>());
        self
    }

    pub fn defers<T: 'static>(mut self) -> Self {
        self.defer.insert(TypeId::of::<T>());
        self
    }

    pub fn on_wildcard(
        mut self,
        action: impl Fn(&mut C, &Event, &mut RaiseSlot) + Send + Sync + 'static,
    ) -> Self {
        self.wildcard = Some(Handler::Do(Arc::new(action)));
        self
    }
}

/// A state after its inheritance chain has been walked (§4.4 State
/// inheritance rules, §9 "static per-state descriptor table").
pub struct EffectiveState<C> {
    pub name: String,
    pub is_hot: bool,
    pub is_cold: bool,
    pub entry: Option<Arc<dyn Fn(&mut C, &mut RaiseSlot) + Send + Sync>>,
    pub exit: Option<Arc<dyn Fn(&mut C) + Send + Sync>>,
    on: HashMap<TypeId, Handler<C>>,
    ignore: HashSet<TypeId>,
    defer: HashSet<TypeId>,
    wildcard: Option<Handler<C>>,
}

impl<C> EffectiveState<C> {
    /// Whether `event` should be skipped in place rather than dequeued
    /// (§4.4 point 2: "a deferred event is skipped in-place").
    pub fn defers(&self, event: &Event) -> bool {
        self.defer.contains(&event.type_id())
    }

    pub fn ignores(&self, event: &Event) -> bool {
        self.ignore.contains(&event.type_id())
    }

    /// The effective handler for `event`: an explicit handler always
    /// takes priority over the wildcard handler (§4.5, §8 boundary
    /// behavior).
    pub fn handler(&self, event: &Event) -> Option<&Handler<C>> {
        self.on.get(&event.type_id()).or(self.wildcard.as_ref())
    }

    pub fn is_dequeuable(&self, event: &Event) -> bool {
        self.ignores(event) || self.handler(event).is_some()
    }
}

/// Static per-state descriptor table built once at registration, shared
/// by actors and monitors (§4.4, §4.5: "same inheritance rules as
/// actors").
pub struct StateMachineDescriptor<C> {
    pub machine_name: String,
    pub start: String,
    states: HashMap<String, EffectiveState<C>>,
}

impl<C> StateMachineDescriptor<C> {
    pub fn build(
        machine_name: impl Into<String>,
        defs: Vec<StateDef<C>>,
    ) -> Result<Self, ConfigurationError> {
        let machine_name = machine_name.into();
        let mut start_states: Vec<&str> = defs
            .iter()
            .filter(|def| def.is_start)
            .map(|def| def.name.as_str())
            .collect();

        let start = match start_states.len() {
            0 => {
                return Err(ConfigurationError::MissingStartState {
                    machine: machine_name,
                })
            }
            1 => start_states.remove(0).to_owned(),
            _ => {
                return Err(ConfigurationError::DuplicateStartState {
                    machine: machine_name,
                    first: start_states[0].to_owned(),
                    second: start_states[1].to_owned(),
                })
            }
        };

        let declared: HashMap<String, StateDef<C>> =
            defs.into_iter().map(|def| (def.name.clone(), def)).collect();

        let mut states = HashMap::new();
        for name in declared.keys() {
            states.insert(name.clone(), resolve(&declared, name));
        }

        Ok(StateMachineDescriptor {
            machine_name,
            start,
            states,
        })
    }

    pub fn state(&self, name: &str) -> &EffectiveState<C> {
        self.states
            .get(name)
            .unwrap_or_else(|| panic!("unknown state {name:?} in machine {}", self.machine_name))
    }
}

fn resolve<C>(declared: &HashMap<String, StateDef<C>>, name: &str) -> EffectiveState<C> {
    let mut chain = Vec::new();
    let mut cursor = Some(name.to_owned());
    while let Some(current) = cursor {
        let def = &declared[&current];
        cursor = def.parent.clone();
        chain.push(current);
    }

    let mut entry = None;
    let mut exit = None;
    let mut wildcard = None;
    let mut on: HashMap<TypeId, Handler<C>> = HashMap::new();
    let mut ignore: HashSet<TypeId> = HashSet::new();
    let mut defer: HashSet<TypeId> = HashSet::new();
    let mut settled: HashSet<TypeId> = HashSet::new();
    settled.insert(TypeId::of::<WildcardEvent>());

    for state_name in &chain {
        let def = &declared[state_name];
        if entry.is_none() {
            entry = def.entry.clone();
        }
        if exit.is_none() {
            exit = def.exit.clone();
        }
        if wildcard.is_none() {
            wildcard = def.wildcard.clone();
        }
        for (ty, handler) in &def.on {
            if settled.insert(*ty) {
                on.insert(*ty, handler.clone());
            }
        }
        for ty in &def.ignore {
            if settled.insert(*ty) {
                ignore.insert(*ty);
            }
        }
        for ty in &def.defer {
            if settled.insert(*ty) {
                defer.insert(*ty);
            }
        }
    }

    let declared_self = &declared[name];
    EffectiveState {
        name: name.to_owned(),
        is_hot: declared_self.is_hot,
        is_cold: declared_self.is_cold,
        entry,
        exit,
        on,
        ignore,
        defer,
        wildcard,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Ctx {
        entered: Vec<&'static str>,
    }

    struct Ping;
    struct Pong;

    #[test]
    fn duplicate_start_states_are_rejected() {
        let defs = vec![
            StateDef::<Ctx>::new("A").start(),
            StateDef::<Ctx>::new("B").start(),
        ];
        let err = StateMachineDescriptor::build("M", defs).unwrap_err();
        assert!(matches!(err, ConfigurationError::DuplicateStartState { .. }));
    }

    #[test]
    fn missing_start_state_is_rejected() {
        let defs = vec![StateDef::<Ctx>::new("A")];
        let err = StateMachineDescriptor::build("M", defs).unwrap_err();
        assert!(matches!(err, ConfigurationError::MissingStartState { .. }));
    }

    #[test]
    fn derived_entry_overrides_rather_than_chains_with_base() {
        let base = StateDef::<Ctx>::new("Base").on_entry(|c, _| c.entered.push("base"));
        let child = StateDef::<Ctx>::new("Child")
            .start()
            .inherits("Base")
            .on_entry(|c, _| c.entered.push("child"));
        let descriptor = StateMachineDescriptor::build("M", vec![base, child]).unwrap();

        let mut ctx = Ctx { entered: Vec::new() };
        let mut raise = RaiseSlot::default();
        (descriptor.state("Child").entry.clone().unwrap())(&mut ctx, &mut raise);
        assert_eq!(ctx.entered, vec!["child"]);
    }

    #[test]
    fn handler_is_inherited_when_not_overridden() {
        let base = StateDef::<Ctx>::new("Base").goto::<Ping>("Other");
        let child = StateDef::<Ctx>::new("Child").start().inherits("Base");
        let other = StateDef::<Ctx>::new("Other");
        let descriptor = StateMachineDescriptor::build("M", vec![base, child, other]).unwrap();

        let event = Event::new(Ping);
        match descriptor.state("Child").handler(&event) {
            Some(Handler::Goto(target)) => assert_eq!(target, "Other"),
            _ => panic!("expected an inherited goto handler"),
        }
    }

    #[test]
    fn explicit_handler_takes_priority_over_wildcard() {
        let state = StateDef::<Ctx>::new("S")
            .start()
            .on_event::<Ping>(|_, _, _| {})
            .on_wildcard(|_, _, _| {});
        let descriptor = StateMachineDescriptor::build("M", vec![state]).unwrap();

        assert!(matches!(
            descriptor.state("S").handler(&Event::new(Ping)),
            Some(Handler::Do(_))
        ));
        assert!(matches!(
            descriptor.state("S").handler(&Event::new(Pong)),
            Some(Handler::Do(_))
        ));
    }
}
