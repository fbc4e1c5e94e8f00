//! An embeddable ECMAScript 5.1 interpreter.
//!
//! The engine is a tree-walking evaluator over a hand-written parser, with
//! the ES5 standard library installed per VM. Host programs evaluate
//! scripts, expose Rust data and functions to them through a serde-driven
//! bridge, and read results back out:
//!
//! ```
//! use skua::Vm;
//!
//! let mut vm = Vm::new();
//! vm.set("threshold", 40).unwrap();
//! let value = vm.run("threshold + 2").unwrap();
//! assert_eq!(value.as_f64(), Some(42.0));
//!
//! vm.run("function classify(n) { return n > threshold ? 'high' : 'low' }")
//!     .unwrap();
//! let n = vm.value(97).unwrap();
//! let label = vm.call("classify", None, &[n]).unwrap();
//! assert_eq!(label.as_str().as_deref(), Some("high"));
//! ```
//!
//! One `Vm` is not safe for concurrent use; [`Vm::copy`] produces a fully
//! independent instance. Long-running scripts can be aborted through
//! [`Vm::interrupt_handle`] and bounded with [`Vm::set_stack_depth_limit`].

mod ast;
mod bridge;
mod error;
mod interpreter;
mod lexer;
mod parser;
mod types;
mod vm;

pub use error::{Error, ParseErrorList, ScriptError};
pub use parser::ParseError;
pub use vm::{Context, InterruptHandle, Invocation, Object, Script, Signal, Value, Vm};
