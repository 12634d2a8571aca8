//! CLI commands module.

mod compare;
mod run;
mod util;

pub use compare::CompareCommand;
pub use run::RunCommand;

pub(crate) use util::*;
