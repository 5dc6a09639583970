//! Function-call interpreter.
//!
//! A generation is a structured call only when the trimmed text is a JSON
//! object holding both `function_name` and `arguments`. Everything else is a
//! plain reply.

use cinemate_core::capability::{CallArguments, StructuredCall};
use serde_json::Value;

#[derive(Debug, Clone, PartialEq)]
pub enum Interpretation {
    Call(StructuredCall),
    Reply(String),
}

pub fn interpret(text: &str) -> Interpretation {
    let Ok(Value::Object(mut object)) = serde_json::from_str::<Value>(text.trim()) else {
        return Interpretation::Reply(text.to_string());
    };

    let (Some(name), Some(arguments)) = (object.remove("function_name"), object.remove("arguments"))
    else {
        return Interpretation::Reply(text.to_string());
    };

    let function_name = match name {
        Value::String(s) => s,
        // Resolves to an unknown function at dispatch
        other => other.to_string(),
    };

    Interpretation::Call(StructuredCall {
        function_name,
        arguments: CallArguments::new(arguments),
    })
}

/// Render a call the way the model is asked to write it.
pub fn render_call(call: &StructuredCall) -> String {
    serde_json::json!({
        "function_name": call.function_name,
        "arguments": call.arguments.as_value(),
    })
    .to_string()
}
