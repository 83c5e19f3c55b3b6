use std::any::TypeId;
use std::collections::HashMap;
use std::sync::Arc;

use systematic_core::{BugKind, Config, Event};

use crate::actor::state::{RaiseSlot, StateMachineDescriptor};
use crate::strategy::SchedulingHint;

/// Type-erased handle to one registered monitor instance, so
/// `MonitorRegistry` can hold monitors with different context types in
/// the same collection (§4.5 Monitor).
trait MonitorDyn: Send {
    fn name(&self) -> &str;
    fn dispatch(&mut self, event: &Event);
    fn is_hot(&self) -> bool;
    fn is_cold(&self) -> bool;
    fn temperature(&self) -> u32;
    /// Bumps the temperature by one step if currently hot, resets it to
    /// zero if currently cold, and leaves it alone otherwise.
    fn tick(&mut self) -> u32;
}

struct MonitorInstance<C> {
    name: String,
    descriptor: Arc<StateMachineDescriptor<C>>,
    context: C,
    state: String,
    temperature: u32,
}

impl<C: Send> MonitorDyn for MonitorInstance<C> {
    fn name(&self) -> &str {
        &self.name
    }

    /// Monitor dispatch is synchronous and unconditional: every
    /// registered monitor sees every raised event, and an event the
    /// current state neither handles nor wildcard-matches is simply
    /// ignored (monitors have no mailbox to defer into; §4.5).
    fn dispatch(&mut self, event: &Event) {
        let effective = self.descriptor.state(&self.state);
        let mut raise = RaiseSlot::default();
        match effective.handler(event) {
            Some(crate::actor::state::Handler::Do(action)) => action(&mut self.context, event, &mut raise),
            Some(crate::actor::state::Handler::Goto(target)) => self.goto(target.clone()),
            Some(crate::actor::state::Handler::Push(_)) => {
                tracing::warn!(monitor = %self.name, "Push transitions are not meaningful on monitors, ignoring");
            }
            None => {}
        }
        // A monitor's own entry action may raise a follow-up event; since
        // monitors have no mailbox, it is dispatched immediately.
        if let Some(next) = raise.take() {
            self.dispatch(&next);
        }
    }

    fn is_hot(&self) -> bool {
        self.descriptor.state(&self.state).is_hot
    }

    fn is_cold(&self) -> bool {
        self.descriptor.state(&self.state).is_cold
    }

    fn temperature(&self) -> u32 {
        self.temperature
    }

    fn tick(&mut self) -> u32 {
        if self.is_hot() {
            self.temperature += 1;
        } else if self.is_cold() {
            self.temperature = 0;
        }
        self.temperature
    }
}

impl<C: Send> MonitorInstance<C> {
    /// Runs the start state's own entry action once, the same override
    /// rules `resolve` already applied when building the descriptor mean
    /// a derived start state's entry fully replaces its base's rather
    /// than chaining with it (§4.4/§4.5 inheritance, mirrored from
    /// `Actor::enter`).
    fn enter_start_state(&mut self) {
        let mut raise = RaiseSlot::default();
        if let Some(entry) = self.descriptor.state(&self.state).entry.clone() {
            entry(&mut self.context, &mut raise);
        }
        if let Some(next) = raise.take() {
            self.dispatch(&next);
        }
    }

    fn goto(&mut self, target: String) {
        if let Some(exit) = self.descriptor.state(&self.state).exit.clone() {
            exit(&mut self.context);
        }
        self.state = target;
        let mut raise = RaiseSlot::default();
        if let Some(entry) = self.descriptor.state(&self.state).entry.clone() {
            entry(&mut self.context, &mut raise);
        }
        if let Some(next) = raise.take() {
            self.dispatch(&next);
        }
    }
}

/// Holds exactly one running instance per monitor type, keyed by `C`'s
/// `TypeId` (§4.5: "monitors are per-type singletons").
#[derive(Default)]
pub struct MonitorRegistry {
    monitors: HashMap<TypeId, Box<dyn MonitorDyn>>,
}

impl MonitorRegistry {
    pub fn new() -> Self {
        MonitorRegistry::default()
    }

    pub fn register<C: Send + 'static>(
        &mut self,
        name: impl Into<String>,
        descriptor: Arc<StateMachineDescriptor<C>>,
        context: C,
    ) {
        let start = descriptor.start.clone();
        let mut instance = MonitorInstance {
            name: name.into(),
            descriptor,
            context,
            state: start,
            temperature: 0,
        };
        instance.enter_start_state();
        self.monitors.insert(TypeId::of::<C>(), Box::new(instance));
    }

    /// Delivers `event` to every registered monitor (§4.5: monitors
    /// observe every event raised through `Engine::notify_monitors`,
    /// regardless of which actor or task raised it).
    pub fn dispatch_all(&mut self, event: &Event) {
        for monitor in self.monitors.values_mut() {
            monitor.dispatch(event);
        }
    }

    /// Called once per scheduling point: advances every monitor's
    /// temperature, returning the liveness bug for the first monitor that
    /// crosses `config.liveness_temperature_threshold`, plus a scheduling
    /// hint asking the strategy to bias away from a livelock once any
    /// monitor is more than halfway to that threshold.
    pub fn step(&mut self, config: &Config) -> (SchedulingHint, Option<BugKind>) {
        let mut hint = SchedulingHint::default();
        let mut bug = None;
        for monitor in self.monitors.values_mut() {
            let temperature = monitor.tick();
            if temperature * 2 >= config.liveness_temperature_threshold {
                hint.hot_monitor_critical = true;
            }
            if bug.is_none() && temperature >= config.liveness_temperature_threshold {
                bug = Some(BugKind::Liveness {
                    monitor: monitor.name().to_owned(),
                    state: "hot".to_owned(),
                    temperature,
                });
            }
        }
        (hint, bug)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::actor::state::StateDef;

    struct Ctx;
    struct Ping;

    fn hot_cold_descriptor() -> Arc<StateMachineDescriptor<Ctx>> {
        let hot = StateDef::<Ctx>::new("Hot").start().hot().goto::<Ping>("Cold");
        let cold = StateDef::<Ctx>::new("Cold").cold();
        Arc::new(StateMachineDescriptor::build("M", vec![hot, cold]).unwrap())
    }

    #[test]
    fn temperature_rises_while_hot_and_resets_on_cold_entry() {
        let mut registry = MonitorRegistry::new();
        registry.register("m", hot_cold_descriptor(), Ctx);
        let config = Config { liveness_temperature_threshold: 100, ..Config::default() };

        let (_, bug) = registry.step(&config);
        assert!(bug.is_none());
        let (_, bug) = registry.step(&config);
        assert!(bug.is_none());

        registry.dispatch_all(&Event::new(Ping));
        let (_, bug) = registry.step(&config);
        assert!(bug.is_none(), "temperature should have reset on entering Cold");
    }

    #[test]
    fn temperature_crossing_threshold_is_reported_as_a_liveness_bug() {
        let mut registry = MonitorRegistry::new();
        registry.register("m", hot_cold_descriptor(), Ctx);
        let config = Config { liveness_temperature_threshold: 2, ..Config::default() };

        registry.step(&config);
        let (_, bug) = registry.step(&config);
        assert!(matches!(bug, Some(BugKind::Liveness { .. })));
    }
}
