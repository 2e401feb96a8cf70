use serde::Deserialize;
use serde_json::{json, Value};
use studio_core::{validate_allocations, AllocationSlice, OutputSchema, Payload};

use crate::GenerationError;

/// Response schema sent with a structured-output request.
pub fn response_schema(schema: OutputSchema) -> Value {
    match schema {
        OutputSchema::Allocations => json!({
            "type": "OBJECT",
            "properties": {
                "allocations": {
                    "type": "ARRAY",
                    "items": {
                        "type": "OBJECT",
                        "properties": {
                            "category": { "type": "STRING" },
                            "percentage": { "type": "NUMBER" }
                        },
                        "required": ["category", "percentage"]
                    }
                }
            },
            "required": ["allocations"]
        }),
    }
}

#[derive(Debug, Deserialize)]
struct AllocationResponse {
    allocations: Vec<AllocationSlice>,
}

/// Parses and validates a structured response. Any mismatch is a validation error.
pub fn parse_structured(schema: OutputSchema, text: &str) -> Result<Payload, GenerationError> {
    match schema {
        OutputSchema::Allocations => {
            let response: AllocationResponse = serde_json::from_str(strip_code_fence(text))
                .map_err(|err| GenerationError::validation(format!("allocations: {err}")))?;
            validate_allocations(&response.allocations)
                .map_err(|err| GenerationError::validation(err.to_string()))?;
            Ok(Payload::Allocation(response.allocations))
        }
    }
}

fn strip_code_fence(text: &str) -> &str {
    let trimmed = text.trim();
    let Some(body) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    let body = body.strip_prefix("json").unwrap_or(body);
    body.strip_suffix("```").unwrap_or(body).trim()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::FailureKind;

    const VALID: &str = r#"{"allocations":[
        {"category":"US Equities","percentage":35},
        {"category":"International Equities","percentage":20},
        {"category":"Bonds","percentage":25},
        {"category":"Real Estate","percentage":10},
        {"category":"Cash","percentage":10}
    ]}"#;

    #[test]
    fn accepts_valid_allocations() {
        match parse_structured(OutputSchema::Allocations, VALID).unwrap() {
            Payload::Allocation(slices) => {
                assert_eq!(slices.len(), 5);
                assert_eq!(slices[0].category, "US Equities");
            }
            other => panic!("unexpected payload {other:?}"),
        }
    }

    #[test]
    fn accepts_fenced_json() {
        let fenced = format!("```json\n{VALID}\n```");
        assert!(parse_structured(OutputSchema::Allocations, &fenced).is_ok());
    }

    #[test]
    fn missing_array_is_a_validation_error() {
        let err = parse_structured(OutputSchema::Allocations, r#"{"portfolio":[]}"#).unwrap_err();
        assert_eq!(err.kind, FailureKind::Validation);
    }

    #[test]
    fn wrong_sum_is_a_validation_error() {
        let text = VALID.replace("\"percentage\":35", "\"percentage\":30");
        let err = parse_structured(OutputSchema::Allocations, &text).unwrap_err();
        assert_eq!(err.kind, FailureKind::Validation);
        assert!(err.message.contains("95"));
    }

    #[test]
    fn non_json_is_a_validation_error() {
        let err = parse_structured(OutputSchema::Allocations, "Here is your allocation!").unwrap_err();
        assert_eq!(err.kind, FailureKind::Validation);
    }
}
