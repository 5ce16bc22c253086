use std::collections::HashMap;

use dispatch_core::{FunctionCall, ToolCall};

use crate::types::StreamToolCall;

/// Reassembles streamed tool-call fragments into complete calls.
///
/// Providers send a call's metadata (id, function name) in its first
/// fragment and the argument string split across later ones. Fragments are
/// merged by wire index; completed calls come back in index order.
#[derive(Debug, Default)]
pub struct StreamToolAccumulator {
    tool_calls: HashMap<u32, PartialToolCall>,
}

#[derive(Debug, Default)]
struct PartialToolCall {
    id: Option<String>,
    tool_type: Option<String>,
    name: Option<String>,
    arguments: String,
}

impl StreamToolAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Merge one chunk's fragments. Already-set metadata is not overwritten.
    pub fn process_chunk(&mut self, fragments: &[StreamToolCall]) {
        for fragment in fragments {
            let entry = self.tool_calls.entry(fragment.index).or_default();

            if let Some(id) = &fragment.id {
                entry.id = Some(id.clone());
            }
            if let Some(tool_type) = &fragment.tool_type {
                entry.tool_type = Some(tool_type.clone());
            }
            if let Some(function) = &fragment.function {
                if let Some(name) = &function.name {
                    entry.name = Some(name.clone());
                }
                if let Some(args) = &function.arguments {
                    entry.arguments.push_str(args);
                }
            }
        }
    }

    /// Finish accumulation. Calls missing an id or name are dropped.
    pub fn into_tool_calls(self) -> Vec<ToolCall> {
        let mut calls: Vec<_> = self.tool_calls.into_iter().collect();
        calls.sort_by_key(|(index, _)| *index);

        calls
            .into_iter()
            .filter_map(|(_, partial)| {
                Some(ToolCall {
                    id: partial.id?,
                    tool_type: partial.tool_type.unwrap_or_else(|| "function".to_string()),
                    function: FunctionCall {
                        name: partial.name?,
                        arguments: partial.arguments,
                    },
                })
            })
            .collect()
    }

    pub fn has_tool_calls(&self) -> bool {
        !self.tool_calls.is_empty()
    }
}
