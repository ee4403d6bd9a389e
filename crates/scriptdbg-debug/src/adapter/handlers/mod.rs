//! Request handlers grouped by DAP area.
//! - initialize: capabilities + session attach
//! - lifecycle: attach/launch/configurationDone/disconnect
//! - breakpoints: setBreakpoints + setExceptionBreakpoints
//! - threads: thread list
//! - stack_trace: stackTrace request
//! - scopes: scope enumeration
//! - variables: variable listing
//! - source: sourceReference content
//! - run_control: continue/pause/step
//! - evaluate: expression evaluation

mod breakpoints;
mod evaluate;
mod initialize;
mod lifecycle;
mod run_control;
mod scopes;
mod source;
mod stack_trace;
mod threads;
mod variables;
