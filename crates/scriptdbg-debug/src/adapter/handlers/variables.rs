//! Variable listing handler.
//! - handle_variables: scope entries or container children

use serde_json::Value;
use smol_str::SmolStr;

use scriptdbg_runtime::value::Value as ScriptValue;

use crate::protocol::{Request, Variable, VariablesArguments, VariablesResponseBody};

use super::super::core::NOT_STOPPED;
use super::super::{DebugAdapter, DispatchOutcome, VariableHandle};

impl DebugAdapter {
    pub(in crate::adapter) fn handle_variables(
        &mut self,
        request: Request<Value>,
    ) -> DispatchOutcome {
        let Some(args) = request
            .arguments
            .clone()
            .and_then(|value| serde_json::from_value::<VariablesArguments>(value).ok())
        else {
            return self.error_outcome(&request, "invalid variables args");
        };
        if !self.await_stopped() {
            return self.error_outcome(&request, NOT_STOPPED);
        }
        self.sync_handles();

        let unknown = format!("Unknown variablesReference '{}'", args.variables_reference);
        let Some(handle) = self.variable_handles.get(&args.variables_reference).cloned() else {
            return self.error_outcome(&request, &unknown);
        };
        let entries: Option<Vec<(SmolStr, ScriptValue)>> = match handle {
            VariableHandle::Locals(index) => self.control.with_snapshot(|snapshot| {
                snapshot.frame(index).map(|frame| {
                    frame
                        .locals
                        .iter()
                        .map(|(name, value)| (name.clone(), value.clone()))
                        .collect::<Vec<_>>()
                })
            }),
            VariableHandle::Globals(index) => self.control.with_snapshot(|snapshot| {
                snapshot.frame(index).map(|frame| {
                    frame
                        .globals
                        .iter()
                        .map(|(name, value)| (name.clone(), value.clone()))
                        .collect::<Vec<_>>()
                })
            }),
            VariableHandle::Children(value) => Some(Some(value.children())),
        }
        .flatten();
        let Some(entries) = entries else {
            return self.error_outcome(&request, &unknown);
        };

        let variables = entries
            .into_iter()
            .map(|(name, value)| self.variable(name, value))
            .collect();
        DispatchOutcome {
            responses: vec![self.ok_response(&request, Some(VariablesResponseBody { variables }))],
            ..DispatchOutcome::default()
        }
    }

    fn variable(&mut self, name: SmolStr, value: ScriptValue) -> Variable {
        let display = value.to_string();
        let type_name = value.type_name().to_string();
        let variables_reference = if value.has_children() {
            self.alloc_variable_handle(VariableHandle::Children(value))
        } else {
            0
        };
        Variable {
            name: name.to_string(),
            value: display,
            r#type: Some(type_name),
            variables_reference,
        }
    }
}
