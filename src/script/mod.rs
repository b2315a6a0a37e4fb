//! Host side of the script runtime
//!
//! Scripts see the alert engine through named modules of host functions.
//! The interpreter itself lives outside this crate; it asks a [`ScriptEnv`]
//! for modules and calls into them with [`ScriptValue`] arguments.

pub mod alert_module;
pub mod datasource_module;
pub mod env;
pub mod value;

pub use alert_module::AlertModule;
pub use datasource_module::DatasourceModule;
pub use env::{host_fn, HostFunction, Module, ModuleLoader, Script, ScriptEnv, ScriptError};
pub use value::ScriptValue;
