//! Deploying a service and connecting to it.

use serde_json::Value as Json;

use dg_codec::wire::encode_value;
use dg_codec::{build_schema, DeployHeader, DeployHeaderBody};
use dg_domain::error::{Error, Result};
use dg_domain::value::Value;
use dg_gateway::{Event, SendRequest};

use crate::service::{Service, ServiceOptions};

/// What to deploy.
#[derive(Debug, Clone, Default)]
pub struct DeployRequest {
    pub bytecode: Vec<u8>,
    /// Constructor arguments, checked against the IDL's constructor.
    pub args: Vec<Value>,
    pub header: DeployHeaderBody,
}

/// Deploy data: `header || code || cbor(args)`. The argument array is only
/// appended when there are arguments.
pub fn deploy_data(request: &DeployRequest) -> Result<Vec<u8>> {
    let mut data = DeployHeader::new(request.header.clone()).write(&request.bytecode)?;
    if !request.args.is_empty() {
        data.extend(encode_value(&Value::Array(request.args.clone()))?);
    }
    Ok(data)
}

/// Deploy `request` through the options' provider and return a [`Service`]
/// bound to the new address.
pub async fn deploy(idl: &Json, request: DeployRequest, options: ServiceOptions) -> Result<Service> {
    let schema = build_schema(idl)?;
    if request.args.len() != schema.constructor.len() {
        return Err(Error::ArgumentCount { args: request.args });
    }

    let data = deploy_data(&request)?;
    let bytes = data.len();
    let submission = options.provider.send(SendRequest { data, address: None }).await?;
    tracing::debug!(id = submission.id, service = %schema.name, bytes, "deploy submitted");

    let address = match options.provider.response(submission.id).await? {
        Event::Service(event) => event.address.ok_or_else(|| {
            Error::Decode(format!("deploy {} returned no address", submission.id))
        })?,
        Event::Error(event) => {
            return Err(Error::Gateway {
                code: event.cause.error_code,
                description: event.cause.description,
            })
        }
        Event::Log(_) => {
            return Err(Error::Decode(format!(
                "deploy {} was answered by a log event",
                submission.id
            )))
        }
    };
    tracing::info!(service = %schema.name, address = %address, "service deployed");

    Service::connect(idl, &address, options).await
}
