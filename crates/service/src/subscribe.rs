//! Log subscriptions on a deployed service.

use std::sync::Arc;

use futures_util::StreamExt;

use dg_codec::{keccak256, Coder};
use dg_domain::error::{Error, Result};
use dg_domain::stream::BoxStream;
use dg_domain::value::{from_hex, to_hex, Value};
use dg_gateway::{Event, LogRecord};

use crate::service::Service;

/// Topic a service logs `event` under: hex of `keccak256(event)`.
pub fn topic(event: &str) -> String {
    to_hex(&keccak256(event))
}

impl Service {
    /// Stream the decoded values of every `event` log this service emits.
    /// A failed poll shows up as one `Err` item, after which the stream ends.
    pub async fn subscribe(&self, event: &str) -> Result<BoxStream<'static, Result<Value>>> {
        if !self.schema().events.iter().any(|e| e == event) {
            return Err(Error::Schema(format!(
                "{} declares no event {event:?}",
                self.schema().name
            )));
        }
        let address = self
            .address()
            .ok_or_else(|| Error::Config(format!("cannot subscribe to {event:?} without a service address")))?;

        let subscription = self.ctx.provider.subscribe(address, &topic(event)).await?;
        let coder = Arc::clone(&self.ctx.coder);
        Ok(Box::pin(
            subscription
                .into_stream()
                .map(move |e| e.and_then(|e| decode_log(coder.as_ref(), e))),
        ))
    }
}

/// Unwrap a log event: hex of a JSON record whose `data` is hex of the
/// encoded value.
fn decode_log(coder: &dyn Coder, event: Event) -> Result<Value> {
    let log = match event {
        Event::Log(log) => log,
        other => {
            return Err(Error::Decode(format!(
                "expected a log event on a subscription, got {other:?}"
            )))
        }
    };
    let record: LogRecord = serde_json::from_slice(&from_hex(&log.data)?)
        .map_err(|e| Error::Decode(format!("log {}: {e}", log.id)))?;
    coder.decode_output(&from_hex(&record.data)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use dg_codec::wire::encode_value;
    use dg_codec::PlaintextCoder;
    use dg_gateway::LogEvent;

    fn log_event(id: u64, value: &Value) -> Event {
        let record = serde_json::json!({ "data": to_hex(&encode_value(value).unwrap()) });
        Event::Log(LogEvent {
            id,
            data: hex::encode(record.to_string()),
        })
    }

    #[test]
    fn topic_is_keccak_of_event_name() {
        assert_eq!(&topic("Transfer")[..10], "0xf099cd8b");
    }

    #[test]
    fn decodes_log_payload() {
        let value = Value::Map(vec![(Value::Text("amount".into()), Value::Integer(5.into()))]);
        assert_eq!(decode_log(&PlaintextCoder, log_event(0, &value)).unwrap(), value);
    }

    #[test]
    fn non_log_event_is_decode_error() {
        let event = Event::Service(Default::default());
        assert!(matches!(decode_log(&PlaintextCoder, event), Err(Error::Decode(_))));
    }

    #[test]
    fn malformed_record_is_decode_error() {
        let event = Event::Log(LogEvent {
            id: 1,
            data: hex::encode("not json"),
        });
        assert!(matches!(decode_log(&PlaintextCoder, event), Err(Error::Decode(_))));
    }
}
