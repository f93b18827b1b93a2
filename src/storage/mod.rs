use async_trait::async_trait;
use aws_sdk_dynamodb::error::DisplayErrorContext;
use aws_sdk_dynamodb::types::AttributeValue;
use aws_sdk_dynamodb::Client as DynamoClient;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{Map, Number, Value};
use std::collections::HashMap;

use crate::transcribe::record::TranscriptRecord;
use crate::{Result, TranscriptorError};

/// DynamoDB item in its wire representation
pub type Item = HashMap<String, AttributeValue>;

/// Errors converting between serde values and DynamoDB attributes
#[derive(thiserror::Error, Debug)]
pub enum MarshallError {
    #[error("Serialization failed: {0}")]
    Serde(#[from] serde_json::Error),

    #[error("Item must serialize to a map, got {0}")]
    NotAMap(&'static str),

    #[error("Invalid number attribute: {0}")]
    InvalidNumber(String),

    #[error("Unsupported attribute type: {0}")]
    UnsupportedAttribute(String),
}

/// Writes transcript records to the key-value store
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait TranscriptStore: Send + Sync {
    async fn save(&self, record: &TranscriptRecord, table_name: &str) -> Result<()>;
}

/// Transcript store backed by DynamoDB
pub struct DynamoTranscriptStore {
    client: DynamoClient,
}

impl DynamoTranscriptStore {
    pub fn new(client: DynamoClient) -> Self {
        Self { client }
    }

    pub fn from_conf(sdk_config: &aws_types::SdkConfig) -> Self {
        Self::new(DynamoClient::new(sdk_config))
    }
}

#[async_trait]
impl TranscriptStore for DynamoTranscriptStore {
    async fn save(&self, record: &TranscriptRecord, table_name: &str) -> Result<()> {
        let item = marshall(record).map_err(|e| TranscriptorError::PersistenceFailed {
            table: table_name.to_string(),
            reason: e.to_string(),
            source: Some(Box::new(e)),
        })?;

        tracing::debug!("Putting item {}/{} into {}", record.pk, record.sk, table_name);

        // Unconditional put: the sort key is a fresh UUID
        self.client
            .put_item()
            .table_name(table_name)
            .set_item(Some(item))
            .send()
            .await
            .map_err(|e| TranscriptorError::PersistenceFailed {
                table: table_name.to_string(),
                reason: DisplayErrorContext(&e).to_string(),
                source: Some(Box::new(e)),
            })?;

        Ok(())
    }
}

/// Convert any serializable map-like value into a DynamoDB item
pub fn marshall<T: Serialize>(value: &T) -> std::result::Result<Item, MarshallError> {
    match serde_json::to_value(value)? {
        Value::Object(map) => Ok(map
            .iter()
            .map(|(key, value)| (key.clone(), to_attribute(value)))
            .collect()),
        other => Err(MarshallError::NotAMap(json_type(&other))),
    }
}

/// Convert a DynamoDB item back into a typed value
pub fn unmarshall<T: DeserializeOwned>(item: &Item) -> std::result::Result<T, MarshallError> {
    let map = item
        .iter()
        .map(|(key, attr)| Ok((key.clone(), from_attribute(attr)?)))
        .collect::<std::result::Result<Map<String, Value>, MarshallError>>()?;

    Ok(serde_json::from_value(Value::Object(map))?)
}

pub fn to_attribute(value: &Value) -> AttributeValue {
    match value {
        Value::Null => AttributeValue::Null(true),
        Value::Bool(b) => AttributeValue::Bool(*b),
        Value::Number(n) => AttributeValue::N(n.to_string()),
        Value::String(s) => AttributeValue::S(s.clone()),
        Value::Array(items) => AttributeValue::L(items.iter().map(to_attribute).collect()),
        Value::Object(map) => AttributeValue::M(
            map.iter()
                .map(|(key, value)| (key.clone(), to_attribute(value)))
                .collect(),
        ),
    }
}

pub fn from_attribute(attr: &AttributeValue) -> std::result::Result<Value, MarshallError> {
    let value = match attr {
        AttributeValue::S(s) => Value::String(s.clone()),
        AttributeValue::N(n) => Value::Number(parse_number(n)?),
        AttributeValue::Bool(b) => Value::Bool(*b),
        AttributeValue::Null(_) => Value::Null,
        AttributeValue::L(items) => Value::Array(
            items
                .iter()
                .map(from_attribute)
                .collect::<std::result::Result<_, _>>()?,
        ),
        AttributeValue::M(map) => Value::Object(
            map.iter()
                .map(|(key, attr)| Ok((key.clone(), from_attribute(attr)?)))
                .collect::<std::result::Result<_, MarshallError>>()?,
        ),
        other => return Err(MarshallError::UnsupportedAttribute(format!("{:?}", other))),
    };

    Ok(value)
}

fn parse_number(raw: &str) -> std::result::Result<Number, MarshallError> {
    if let Ok(n) = raw.parse::<i64>() {
        return Ok(n.into());
    }
    if let Ok(n) = raw.parse::<u64>() {
        return Ok(n.into());
    }

    raw.parse::<f64>()
        .ok()
        .and_then(Number::from_f64)
        .ok_or_else(|| MarshallError::InvalidNumber(raw.to_string()))
}

fn json_type(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "map",
    }
}
