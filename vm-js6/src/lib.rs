//! A metered, embeddable tree-walking interpreter for a sandboxed ES6 subset.
//!
//! Built for multi-tenant execution of untrusted scripts inside a host
//! process:
//! - Parse once ([`parse`]), evaluate any number of times: a [`ParsedScript`]
//!   is immutable, `Send + Sync`, and shared lock-free across threads.
//! - Every execution runs in its own [`EvalCtx`] with hard budgets for
//!   operations, allocated bytes, wall-clock time, and call depth
//!   ([`EvalOpts`]); exceeding any budget terminates the run with a fixed
//!   [`LimitKind`] message that scripts cannot catch.
//! - Scripts reach the host only through explicitly registered globals:
//!   marshalled values ([`JsValue`]), host objects with typed/varargs methods
//!   ([`HostObjectDef`]), and dynamic-property objects ([`PropResolver`]).
//! - There is no regex engine, no I/O, no timers, and no reflection in any
//!   dispatch path.
//!
//! ```
//! let result = vm_js6::eval("20 + 30").unwrap();
//! assert_eq!(result, vm_js6::JsValue::Int(50));
//! ```

mod budget;
mod builtins;
mod ctx;
mod date;
mod env;
mod error;
mod exec;
mod func;
mod heap;
mod host;
mod json;
mod ops;
mod render;
mod script;
mod source;
mod value;

pub use crate::budget::InterruptHandle;
pub use crate::budget::InterruptToken;
pub use crate::ctx::EvalCtx;
pub use crate::error::Error;
pub use crate::error::EvalError;
pub use crate::error::EvalErrorKind;
pub use crate::error::LimitKind;
pub use crate::error::StackFrame;
pub use crate::error::SyntaxError;
pub use crate::host::HostError;
pub use crate::host::HostMethod;
pub use crate::host::HostObjectDef;
pub use crate::host::HostResult;
pub use crate::host::JsValue;
pub use crate::host::PropResolver;
pub use crate::script::eval;
pub use crate::script::eval_with;
pub use crate::script::parse;
pub use crate::script::parse_with_info;
pub use crate::script::EvalOpts;
pub use crate::script::Evaluation;
pub use crate::script::ExecutionStats;
pub use crate::script::ParsedScript;
pub use crate::script::ScriptInfo;
pub use crate::source::SourceText;
pub use crate::value::ObjId;
pub use crate::value::Value;
