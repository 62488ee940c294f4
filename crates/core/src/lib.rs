//! Domain core for the nextaction GTD bot.
//!
//! Everything in this crate is pure: the task state machine, the record
//! types persisted by `nextaction-db`, configuration loading, and id/token
//! generation. No I/O beyond reading the config file.

pub mod config;
pub mod domain;
pub mod errors;
pub mod id;

pub use domain::context::{Context, ContextId};
pub use domain::export::ExportToken;
pub use domain::patch::Patch;
pub use domain::project::{Project, ProjectId};
pub use domain::task::{
    ClarifyTarget, EnergyLevel, MoveTarget, Priority, Task, TaskCommand, TaskId, TaskStatus,
    TimeEstimate, TransitionError,
};
pub use domain::user::User;
pub use errors::{ApplicationError, DomainError, InterfaceError};
