// Event script parser module

pub mod ast;
pub mod event;
pub mod lexer;

// Public API re-exports
pub use ast::{Event, ScriptLine};
pub use event::{parse_event, parse_script};
