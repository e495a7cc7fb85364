// src/notifiers/sms.rs
use super::Notifier;
use crate::error::{ConfigError, NotifyError};
use crate::registry::{plugin_arg, PluginArgs};
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::warn;

pub const NAME: &str = "sms";

const DEFAULT_ENDPOINT: &str = "https://api.enco.io/sms/1.0.0/sms/outboundmessages";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Serialize)]
struct OutboundMessage<'a> {
    message: &'a str,
    binary: bool,
    destinations: [&'a str; 1],
}

#[derive(Debug, Deserialize)]
struct FaultResponse {
    fault: Fault,
}

#[derive(Debug, Deserialize)]
struct Fault {
    code: i64,
    message: String,
    #[serde(default)]
    description: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct DeliveryResponse {
    #[serde(default)]
    delivery_info: Vec<DeliveryInfo>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct DeliveryInfo {
    delivery_status: String,
}

/// Sends each notification as a text message through an HTTP SMS gateway.
///
/// Arguments: `apiToken`, `destination` (phone number) and an optional
/// `endpoint` overriding the gateway URL.
pub struct SmsNotifier {
    http_client: Client,
    endpoint: String,
    api_token: String,
    destination: String,
}

impl SmsNotifier {
    pub fn from_args(args: &PluginArgs) -> Result<Self, ConfigError> {
        let api_token = plugin_arg(args, "apiToken")
            .ok_or_else(|| ConfigError::MissingArgument("apiToken".to_string()))?;
        let destination = plugin_arg(args, "destination")
            .ok_or_else(|| ConfigError::MissingArgument("destination".to_string()))?;
        let endpoint = plugin_arg(args, "endpoint").unwrap_or(DEFAULT_ENDPOINT);

        let http_client = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| ConfigError::invalid("notifier", e))?;

        Ok(Self {
            http_client,
            endpoint: endpoint.to_string(),
            api_token: api_token.to_string(),
            destination: destination.to_string(),
        })
    }
}

#[async_trait]
impl Notifier for SmsNotifier {
    fn name(&self) -> &str {
        NAME
    }

    async fn notify(&self, message: &[u8]) -> Result<(), NotifyError> {
        let text = String::from_utf8_lossy(message);
        let body = serde_json::to_vec(&OutboundMessage {
            message: &text,
            binary: false,
            destinations: [&self.destination],
        })?;

        let response = self
            .http_client
            .post(&self.endpoint)
            .header("Content-Type", "application/json")
            .header("Accept", "application/json")
            .bearer_auth(&self.api_token)
            .body(body)
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;

        if status != StatusCode::CREATED {
            return Err(match serde_json::from_str::<FaultResponse>(&body) {
                Ok(fault) => NotifyError::Service {
                    code: fault.fault.code,
                    message: format!("{} {}", fault.fault.message, fault.fault.description)
                        .trim()
                        .to_string(),
                },
                Err(_) => NotifyError::Service {
                    code: i64::from(status.as_u16()),
                    message: body,
                },
            });
        }

        let delivery: DeliveryResponse = serde_json::from_str(&body)?;
        match delivery.delivery_info.first() {
            None => Err(NotifyError::Service {
                code: i64::from(status.as_u16()),
                message: "no delivery information".to_string(),
            }),
            Some(info)
                if info.delivery_status == "AddressInvalid"
                    || info.delivery_status == "DeliveryImpossible" =>
            {
                warn!(status = %info.delivery_status, "SMS was accepted but cannot be delivered");
                Ok(())
            }
            Some(_) => Ok(()),
        }
    }
}
