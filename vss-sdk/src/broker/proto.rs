//! Generated protobuf bindings and conversions to the wire model.
//!
//! The broker speaks the `kuksa.val.v2` protocol; the bindings are
//! generated at build time from the `proto/` directory. Everything above
//! this module works with the types in [`super::types`]; conversions in
//! both directions live here so protobuf details never leak upward.

use super::types::{
    ActuateCommand, MetadataEntry, PublishError, SignalSelector, StreamEvent, StreamFrame,
    TransportError,
};
use crate::value::{Value, ValueError, ValueKind};
use tracing::warn;

pub mod pb {
    tonic::include_proto!("kuksa.val.v2");
}

impl From<Value> for pb::Value {
    fn from(value: Value) -> Self {
        use pb::value::TypedValue;
        let typed = match value {
            Value::Bool(v) => TypedValue::Bool(v),
            Value::Int32(v) => TypedValue::Int32(v),
            Value::Uint32(v) => TypedValue::Uint32(v),
            Value::Int64(v) => TypedValue::Int64(v),
            Value::Uint64(v) => TypedValue::Uint64(v),
            Value::Float(v) => TypedValue::Float(v),
            Value::Double(v) => TypedValue::Double(v),
            Value::String(v) => TypedValue::String(v),
        };
        pb::Value {
            typed_value: Some(typed),
        }
    }
}

impl TryFrom<pb::Value> for Value {
    type Error = ValueError;

    fn try_from(value: pb::Value) -> Result<Self, ValueError> {
        use pb::value::TypedValue;
        match value.typed_value {
            Some(TypedValue::Bool(v)) => Ok(Value::Bool(v)),
            Some(TypedValue::Int32(v)) => Ok(Value::Int32(v)),
            Some(TypedValue::Uint32(v)) => Ok(Value::Uint32(v)),
            Some(TypedValue::Int64(v)) => Ok(Value::Int64(v)),
            Some(TypedValue::Uint64(v)) => Ok(Value::Uint64(v)),
            Some(TypedValue::Float(v)) => Ok(Value::Float(v)),
            Some(TypedValue::Double(v)) => Ok(Value::Double(v)),
            Some(TypedValue::String(v)) => Ok(Value::String(v)),
            None => Err(ValueError::Empty),
        }
    }
}

/// Extracts the value from a datapoint, failing if either the datapoint
/// or its tagged variant is absent. Absence is a decode error, never a
/// default value.
pub fn datapoint_value(datapoint: pb::Datapoint) -> Result<Value, ValueError> {
    datapoint.value.ok_or(ValueError::Empty)?.try_into()
}

pub fn value_datapoint(value: Value) -> pb::Datapoint {
    pb::Datapoint {
        value: Some(value.into()),
    }
}

pub fn path_signal_id(path: &str) -> pb::SignalId {
    pb::SignalId {
        signal: Some(pb::signal_id::Signal::Path(path.to_string())),
    }
}

fn data_type_kind(data_type: i32) -> Option<ValueKind> {
    match pb::DataType::try_from(data_type) {
        Ok(pb::DataType::String) => Some(ValueKind::String),
        Ok(pb::DataType::Boolean) => Some(ValueKind::Bool),
        Ok(pb::DataType::Int32) => Some(ValueKind::Int32),
        Ok(pb::DataType::Int64) => Some(ValueKind::Int64),
        Ok(pb::DataType::Uint32) => Some(ValueKind::Uint32),
        Ok(pb::DataType::Uint64) => Some(ValueKind::Uint64),
        Ok(pb::DataType::Float) => Some(ValueKind::Float),
        Ok(pb::DataType::Double) => Some(ValueKind::Double),
        Ok(pb::DataType::Unspecified) | Err(_) => None,
    }
}

impl From<pb::Metadata> for MetadataEntry {
    fn from(metadata: pb::Metadata) -> Self {
        Self {
            id: metadata.id,
            path: metadata.path,
            data_type: data_type_kind(metadata.data_type),
        }
    }
}

impl From<StreamFrame> for pb::OpenProviderStreamRequest {
    fn from(frame: StreamFrame) -> Self {
        use pb::open_provider_stream_request::Action;
        let action = match frame {
            StreamFrame::Claim { paths } => Action::ProvideActuationRequest(
                pb::ProvideActuationRequest {
                    actuator_identifiers: paths
                        .iter()
                        .map(|path| path_signal_id(path))
                        .collect(),
                },
            ),
            StreamFrame::Ack { signal_id } => {
                // Receipt only: the error payload stays unpopulated.
                Action::BatchActuateStreamResponse(pb::BatchActuateStreamResponse {
                    signal_id: Some(pb::SignalId {
                        signal: Some(pb::signal_id::Signal::Id(signal_id)),
                    }),
                    error: None,
                })
            }
            StreamFrame::Publish { entries } => {
                Action::PublishValuesRequest(pb::PublishValuesRequest {
                    request_id: 0,
                    data_points: entries
                        .into_iter()
                        .map(|(id, value)| (id, value_datapoint(value)))
                        .collect(),
                })
            }
        };
        pb::OpenProviderStreamRequest {
            action: Some(action),
        }
    }
}

fn decode_actuate_command(request: pb::ActuateRequest) -> Option<ActuateCommand> {
    let selector = match request.signal_id.and_then(|id| id.signal) {
        Some(pb::signal_id::Signal::Id(id)) => SignalSelector::Id(id),
        Some(pb::signal_id::Signal::Path(path)) => SignalSelector::Path(path),
        None => {
            warn!("Dropping actuation command without a signal identifier");
            return None;
        }
    };
    let value = match request
        .value
        .ok_or(ValueError::Empty)
        .and_then(Value::try_from)
    {
        Ok(value) => value,
        Err(e) => {
            warn!(error = %e, ?selector, "Dropping actuation command with undecodable value");
            return None;
        }
    };
    Some(ActuateCommand { selector, value })
}

impl TryFrom<pb::OpenProviderStreamResponse> for StreamEvent {
    type Error = TransportError;

    fn try_from(response: pb::OpenProviderStreamResponse) -> Result<Self, TransportError> {
        use pb::open_provider_stream_response::Action;
        match response.action {
            Some(Action::ProvideActuationResponse(_)) => Ok(StreamEvent::ClaimAccepted),
            Some(Action::BatchActuateStreamRequest(batch)) => Ok(StreamEvent::ActuateBatch(
                batch
                    .actuate_requests
                    .into_iter()
                    .filter_map(decode_actuate_command)
                    .collect(),
            )),
            Some(Action::PublishValuesResponse(ack)) => Ok(StreamEvent::PublishAck {
                errors: ack
                    .status
                    .into_iter()
                    .filter(|(_, error)| {
                        error.code != pb::ErrorCode::Ok as i32
                            && error.code != pb::ErrorCode::Unspecified as i32
                    })
                    .map(|(id, error)| {
                        (
                            id,
                            PublishError {
                                code: error.code,
                                message: error.message,
                            },
                        )
                    })
                    .collect(),
            }),
            None => Err(TransportError::InvalidFrame(
                "provider stream response carried no action".to_string(),
            )),
        }
    }
}
