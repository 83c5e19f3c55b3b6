pub mod mailbox;
pub mod machine;
pub mod state;

pub use machine::{Actor, HaltEvent};
pub use mailbox::{Mailbox, MailboxOverflow};
pub use state::{EffectiveState, Handler, RaiseSlot, StateDef, StateMachineDescriptor};
