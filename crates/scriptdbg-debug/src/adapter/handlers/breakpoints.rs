//! Breakpoint-related requests.
//! - handle_set_breakpoints: replace the breakpoints of one source
//! - handle_set_exception_breakpoints: choose when exceptions stop the debuggee

use serde_json::Value;

use scriptdbg_runtime::debug::{BreakpointSpec, ExceptionMode};

use crate::protocol::{
    Breakpoint, Request, SetBreakpointsArguments, SetBreakpointsResponseBody,
    SetExceptionBreakpointsArguments, SourceBreakpoint,
};

use super::super::util::parse_hit_condition;
use super::super::{DebugAdapter, DispatchOutcome};

impl DebugAdapter {
    pub(in crate::adapter) fn handle_set_breakpoints(
        &mut self,
        request: Request<Value>,
    ) -> DispatchOutcome {
        let Some(args) = request
            .arguments
            .clone()
            .and_then(|value| serde_json::from_value::<SetBreakpointsArguments>(value).ok())
        else {
            return self.error_outcome(&request, "invalid setBreakpoints args");
        };

        // Sources without a path (sourceReference only) cannot carry breakpoints.
        let Some(path) = args.source.path.clone() else {
            let body = SetBreakpointsResponseBody {
                breakpoints: Vec::new(),
            };
            return DispatchOutcome {
                responses: vec![self.ok_response(&request, Some(body))],
                ..DispatchOutcome::default()
            };
        };

        let requested = args.breakpoints.clone().unwrap_or_else(|| {
            args.lines
                .iter()
                .flatten()
                .map(|line| SourceBreakpoint {
                    line: *line,
                    column: None,
                    condition: None,
                    hit_condition: None,
                })
                .collect()
        });

        let mut specs = Vec::with_capacity(requested.len());
        let mut messages = Vec::with_capacity(requested.len());
        for item in &requested {
            let mut spec = BreakpointSpec::new(item.line);
            if let Some(condition) = item
                .condition
                .as_deref()
                .map(str::trim)
                .filter(|text| !text.is_empty())
            {
                spec = spec.with_condition(condition);
            }
            let mut message = None;
            if let Some(raw) = item.hit_condition.as_deref().filter(|text| !text.trim().is_empty()) {
                match parse_hit_condition(raw) {
                    Some(ignore_count) => spec = spec.with_ignore_count(ignore_count),
                    None => message = Some(format!("unsupported hit condition '{raw}' ignored")),
                }
            }
            specs.push(spec);
            messages.push(message);
        }

        let installed = self.control.set_breakpoints(&path, specs);
        let breakpoints = installed
            .iter()
            .zip(messages)
            .map(|(breakpoint, message)| Breakpoint {
                id: Some(breakpoint.id()),
                verified: true,
                message,
                source: Some(args.source.clone()),
                line: Some(breakpoint.line()),
            })
            .collect::<Vec<_>>();

        let events = vec![self.debug_output_message(format!(
            "[scriptdbg] setBreakpoints: path={} count={}",
            path,
            breakpoints.len()
        ))];
        DispatchOutcome {
            responses: vec![self.ok_response(
                &request,
                Some(SetBreakpointsResponseBody { breakpoints }),
            )],
            events,
            ..DispatchOutcome::default()
        }
    }

    pub(in crate::adapter) fn handle_set_exception_breakpoints(
        &mut self,
        request: Request<Value>,
    ) -> DispatchOutcome {
        let args = request
            .arguments
            .clone()
            .and_then(|value| {
                serde_json::from_value::<SetExceptionBreakpointsArguments>(value).ok()
            })
            .unwrap_or_default();

        let mut mode = if args.filters.iter().any(|filter| filter == "always") {
            ExceptionMode::All
        } else if args.filters.iter().any(|filter| filter == "unhandled") {
            ExceptionMode::Unhandled
        } else {
            ExceptionMode::Never
        };
        // Explicit break modes take precedence; the last one given wins.
        for option in args.exception_options.iter().flatten() {
            if let Some(explicit) = ExceptionMode::from_filter(&option.break_mode) {
                mode = explicit;
            }
        }
        self.control.set_exception_mode(mode);

        DispatchOutcome {
            responses: vec![self.ok_response::<Value>(&request, None)],
            events: vec![self.debug_output_message(format!(
                "[scriptdbg] setExceptionBreakpoints: mode={mode:?}"
            ))],
            ..DispatchOutcome::default()
        }
    }
}
