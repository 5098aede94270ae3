use anyhow::{Context, Result, anyhow};
use async_trait::async_trait;
use context_server::{Tool, ToolContent, ToolExecutor};
use conversation_analysis::{CallMetadata, analyze};
use indoc::indoc;
use serde_json::{Value, json};

use crate::{required_str, text_content};

#[derive(Default)]
pub struct AnalyzeConversationTool;

impl AnalyzeConversationTool {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl ToolExecutor for AnalyzeConversationTool {
    async fn execute(&self, arguments: Option<Value>) -> Result<Vec<ToolContent>> {
        log::debug!("Executing AnalyzeConversationTool");
        let args = arguments.ok_or_else(|| anyhow!("Missing arguments"))?;

        let conversation = required_str(&args, "conversation")?;
        let metadata: CallMetadata =
            serde_json::from_value(args.clone()).context("Invalid call metadata")?;

        let call = analyze(conversation, metadata);

        text_content(&json!({
            "success": true,
            "call_id": call.call_id,
            "analysis": call.analysis,
            "message": "Conversation analyzed",
        }))
    }

    fn to_tool(&self) -> Tool {
        Tool {
            name: "analyze_conversation".into(),
            description: Some(
                indoc! {"
                    Classify a support call transcript: problem type, urgency, customer
                    sentiment, resolution status and whether a follow-up is needed. Also
                    extracts callback time, location and service indicators, and suggests
                    next actions for the ticket. Nothing is stored.
                "}
                .into(),
            ),
            input_schema: json!({
                "type": "object",
                "properties": {
                    "conversation": {
                        "type": "string",
                        "description": "Full transcript of the call"
                    },
                    "operator_id": {
                        "type": "integer",
                        "description": "Operator who handled the call"
                    },
                    "client_ref": {
                        "type": "string",
                        "description": "External client reference, e.g. CLI-001"
                    },
                    "call_date": {
                        "type": "string",
                        "format": "date",
                        "description": "Date of the call (YYYY-MM-DD)"
                    },
                    "call_label": {
                        "type": "string",
                        "description": "Free-form label for the call"
                    }
                },
                "required": ["conversation", "operator_id", "client_ref"]
            }),
        }
    }
}
