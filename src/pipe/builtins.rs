use crate::pipe::{ArgumentMetadata, Pipe, PipeError, PipeResult};
use async_trait::async_trait;
use serde_json::Value;

/// A pipe that parses a string into an integer
#[derive(Default)]
pub struct ParseIntPipe;

#[async_trait]
impl Pipe for ParseIntPipe {
    async fn transform(&self, value: Value, _metadata: &ArgumentMetadata) -> PipeResult<Value> {
        let parsed = match &value {
            Value::Number(n) if n.is_i64() => n.as_i64(),
            Value::String(s) => s.trim().parse::<i64>().ok(),
            _ => None,
        };
        parsed
            .map(Value::from)
            .ok_or_else(|| PipeError::Validation("numeric string is expected".to_string()).into())
    }
}

/// A pipe that parses `"true"` / `"false"` into a boolean
#[derive(Default)]
pub struct ParseBoolPipe;

#[async_trait]
impl Pipe for ParseBoolPipe {
    async fn transform(&self, value: Value, _metadata: &ArgumentMetadata) -> PipeResult<Value> {
        match value {
            Value::Bool(b) => Ok(Value::Bool(b)),
            Value::String(s) if s == "true" => Ok(Value::Bool(true)),
            Value::String(s) if s == "false" => Ok(Value::Bool(false)),
            _ => Err(PipeError::Validation("boolean string is expected".to_string()).into()),
        }
    }
}

/// Substitutes a default for missing (`null`) arguments
pub struct DefaultValuePipe {
    default: Value,
}

impl DefaultValuePipe {
    pub fn new(default: impl Into<Value>) -> Self {
        Self {
            default: default.into(),
        }
    }
}

#[async_trait]
impl Pipe for DefaultValuePipe {
    async fn transform(&self, value: Value, _metadata: &ArgumentMetadata) -> PipeResult<Value> {
        match value {
            Value::Null => Ok(self.default.clone()),
            other => Ok(other),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipe::ParamKind;
    use serde_json::json;

    fn metadata() -> ArgumentMetadata {
        ArgumentMetadata {
            kind: ParamKind::Param,
            data: Some("id".to_string()),
            index: 0,
        }
    }

    #[tokio::test]
    async fn test_parse_int() {
        let pipe = ParseIntPipe;
        assert_eq!(pipe.transform(json!("42"), &metadata()).await.unwrap(), json!(42));
        assert_eq!(pipe.transform(json!(7), &metadata()).await.unwrap(), json!(7));

        let err = pipe.transform(json!("abc"), &metadata()).await.unwrap_err();
        assert!(err.downcast_ref::<PipeError>().is_some());
    }

    #[tokio::test]
    async fn test_parse_bool() {
        let pipe = ParseBoolPipe;
        assert_eq!(pipe.transform(json!("true"), &metadata()).await.unwrap(), json!(true));
        assert!(pipe.transform(json!("yes"), &metadata()).await.is_err());
    }

    #[tokio::test]
    async fn test_default_value() {
        let pipe = DefaultValuePipe::new(10);
        assert_eq!(pipe.transform(Value::Null, &metadata()).await.unwrap(), json!(10));
        assert_eq!(pipe.transform(json!(3), &metadata()).await.unwrap(), json!(3));
    }
}
