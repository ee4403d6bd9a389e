//! Source content handler.
//! - handle_source: text for a `sourceReference` (or a plain path)

use std::sync::Arc;

use serde_json::Value;
use tracing::warn;

use crate::protocol::{Request, SourceArguments, SourceResponseBody};

use super::super::{DebugAdapter, DispatchOutcome, SourceHandle};

impl DebugAdapter {
    pub(in crate::adapter) fn handle_source(&mut self, request: Request<Value>) -> DispatchOutcome {
        let Some(args) = request
            .arguments
            .clone()
            .and_then(|value| serde_json::from_value::<SourceArguments>(value).ok())
        else {
            return self.error_outcome(&request, "Invalid SourceRequest");
        };

        let reference = Some(args.source_reference)
            .filter(|reference| *reference > 0)
            .or_else(|| {
                args.source
                    .as_ref()
                    .and_then(|source| source.source_reference)
                    .filter(|reference| *reference > 0)
            });
        let resolver = Arc::clone(&self.resolver);

        let content = match reference {
            Some(reference) => {
                if let Some(cached) = self.source_cache.get(&reference) {
                    cached.clone()
                } else {
                    let Some(handle) = self.source_refs.get(&reference).cloned() else {
                        return self.error_outcome(
                            &request,
                            &format!("Unknown source reference '{reference}'"),
                        );
                    };
                    let resolved = match handle {
                        SourceHandle::Synthetic {
                            text: Some(text), ..
                        } => Ok(text),
                        SourceHandle::Synthetic { name, text: None } => resolver.resolve(&name),
                        SourceHandle::Archive(path) => resolver.resolve(&path),
                    };
                    match resolved {
                        Ok(text) => {
                            self.source_cache.insert(reference, text.clone());
                            text
                        }
                        Err(err) => {
                            warn!(reference, %err, "source lookup failed");
                            return self.error_outcome(&request, &err.to_string());
                        }
                    }
                }
            }
            None => {
                let Some(path) = args.source.as_ref().and_then(|source| source.path.clone())
                else {
                    return self.error_outcome(&request, "Invalid SourceRequest");
                };
                match resolver.resolve(&path) {
                    Ok(text) => text,
                    Err(err) => return self.error_outcome(&request, &err.to_string()),
                }
            }
        };

        let body = SourceResponseBody {
            content,
            mime_type: Some("text/plain".to_string()),
        };
        DispatchOutcome {
            responses: vec![self.ok_response(&request, Some(body))],
            ..DispatchOutcome::default()
        }
    }
}
