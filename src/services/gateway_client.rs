use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD as BASE64_ENGINE;
use base64::Engine;
use chrono::{DateTime, Local};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::Duration;
use thiserror::Error;
use tracing::{error, info, warn};

use crate::app::config::MpesaConfig;
use crate::models::payment::CorrelationIds;

const TOKEN_PATH: &str = "/oauth/v1/generate?grant_type=client_credentials";
const STK_PUSH_PATH: &str = "/mpesa/stkpush/v1/processrequest";
const TRANSACTION_TYPE: &str = "CustomerPayBillOnline";
const ACCEPTED_RESPONSE_CODE: &str = "0";

#[derive(Error, Debug)]
pub enum GatewayError {
    #[error("M-Pesa consumer key or secret is missing")]
    MissingCredentials,
    #[error("M-Pesa {0} is missing")]
    MissingConfig(&'static str),
    #[error("token request rejected with HTTP {status}")]
    AuthRejected { status: u16 },
    #[error("token response did not contain an access token")]
    MissingAccessToken,
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),
}

/// Short-lived credential for the push endpoint.
#[derive(Clone, PartialEq, Eq)]
pub struct BearerToken(String);

impl BearerToken {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Debug for BearerToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("BearerToken(***)")
    }
}

/// What the caller knows about the push; the client adds the merchant settings.
#[derive(Debug, Clone, PartialEq)]
pub struct PushRequest {
    pub amount: u64,
    pub phone: String,
    pub account_reference: String,
    pub description: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PushAccepted {
    pub correlation: CorrelationIds,
    pub response_description: Option<String>,
    pub raw: Value,
}

#[derive(Debug, Clone, PartialEq)]
pub enum PushOutcome {
    Accepted(PushAccepted),
    Rejected { reason: String },
}

#[async_trait]
pub trait PaymentGateway: Send + Sync {
    async fn authenticate(&self) -> Result<BearerToken, GatewayError>;

    /// `Err` only for local misconfiguration; anything the gateway or the network
    /// does wrong comes back as [`PushOutcome::Rejected`].
    async fn initiate_push(
        &self,
        token: &BearerToken,
        request: &PushRequest,
    ) -> Result<PushOutcome, GatewayError>;
}

// Payload para enviar ao endpoint de STK push
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct StkPushPayload {
    pub business_short_code: String,
    pub password: String,
    pub timestamp: String,
    pub transaction_type: String,
    pub amount: String,
    pub party_a: String,
    pub party_b: String,
    pub phone_number: String,
    #[serde(rename = "CallBackURL")]
    pub call_back_url: String,
    pub account_reference: String,
    pub transaction_desc: String,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: Option<String>,
}

#[derive(Debug, Deserialize)]
struct StkPushResponse {
    #[serde(rename = "ResponseCode")]
    response_code: Option<String>,
    #[serde(rename = "MerchantRequestID")]
    merchant_request_id: Option<String>,
    #[serde(rename = "CheckoutRequestID")]
    checkout_request_id: Option<String>,
    #[serde(rename = "ResponseDescription")]
    response_description: Option<String>,
    #[serde(rename = "errorMessage")]
    error_message: Option<String>,
}

/// `YYYYMMDDHHmmss` in server local time. The same string must go into the
/// password and the `Timestamp` field.
pub fn gateway_timestamp(now: DateTime<Local>) -> String {
    now.format("%Y%m%d%H%M%S").to_string()
}

pub fn push_password(short_code: &str, passkey: &str, timestamp: &str) -> String {
    BASE64_ENGINE.encode(format!("{short_code}{passkey}{timestamp}"))
}

#[allow(clippy::too_many_arguments)]
pub fn build_push_payload(
    short_code: &str,
    passkey: &str,
    timestamp: &str,
    amount: u64,
    payer_phone: &str,
    callback_url: &str,
    account_reference: &str,
    description: &str,
) -> StkPushPayload {
    StkPushPayload {
        business_short_code: short_code.to_string(),
        password: push_password(short_code, passkey, timestamp),
        timestamp: timestamp.to_string(),
        transaction_type: TRANSACTION_TYPE.to_string(),
        amount: amount.to_string(),
        party_a: payer_phone.to_string(),
        party_b: short_code.to_string(),
        phone_number: payer_phone.to_string(),
        call_back_url: callback_url.to_string(),
        account_reference: account_reference.to_string(),
        transaction_desc: description.to_string(),
    }
}

pub struct MpesaClient {
    client: Client,
    config: MpesaConfig,
}

impl MpesaClient {
    pub fn new(config: MpesaConfig) -> Result<Self, GatewayError> {
        let client = Client::builder()
            .timeout(Duration::from_millis(config.timeout_ms))
            .build()?;

        Ok(Self { client, config })
    }

    fn push_settings(&self) -> Result<(&str, &str, &str), GatewayError> {
        let short_code = self
            .config
            .short_code
            .as_deref()
            .ok_or(GatewayError::MissingConfig("short code"))?;
        let passkey = self
            .config
            .passkey
            .as_deref()
            .ok_or(GatewayError::MissingConfig("passkey"))?;
        let callback_url = self
            .config
            .callback_url
            .as_deref()
            .ok_or(GatewayError::MissingConfig("callback URL"))?;
        Ok((short_code, passkey, callback_url))
    }

    async fn send_push(
        &self,
        token: &BearerToken,
        payload: &StkPushPayload,
    ) -> Result<(reqwest::StatusCode, Value), reqwest::Error> {
        let response = self
            .client
            .post(format!("{}{}", self.config.base_url(), STK_PUSH_PATH))
            .bearer_auth(token.as_str())
            .json(payload)
            .send()
            .await?;

        let status = response.status();
        // Error bodies are not always JSON
        let body = response.json::<Value>().await.unwrap_or(Value::Null);
        Ok((status, body))
    }
}

#[async_trait]
impl PaymentGateway for MpesaClient {
    async fn authenticate(&self) -> Result<BearerToken, GatewayError> {
        let (key, secret) = match (&self.config.consumer_key, &self.config.consumer_secret) {
            (Some(key), Some(secret)) if !key.is_empty() && !secret.is_empty() => (key, secret),
            _ => {
                error!("M-Pesa consumer key or secret missing from configuration");
                return Err(GatewayError::MissingCredentials);
            }
        };

        let response = self
            .client
            .get(format!("{}{}", self.config.base_url(), TOKEN_PATH))
            .basic_auth(key, Some(secret))
            .send()
            .await
            .map_err(|e| {
                error!(error = %e, "M-Pesa token request failed");
                GatewayError::Transport(e)
            })?;

        if !response.status().is_success() {
            error!(status = %response.status(), "M-Pesa token request rejected");
            return Err(GatewayError::AuthRejected {
                status: response.status().as_u16(),
            });
        }

        let body: TokenResponse = response.json().await?;
        match body.access_token {
            Some(token) if !token.is_empty() => {
                info!("Obtained M-Pesa access token");
                Ok(BearerToken::new(token))
            }
            _ => Err(GatewayError::MissingAccessToken),
        }
    }

    async fn initiate_push(
        &self,
        token: &BearerToken,
        request: &PushRequest,
    ) -> Result<PushOutcome, GatewayError> {
        let (short_code, passkey, callback_url) = self.push_settings()?;
        let timestamp = gateway_timestamp(Local::now());

        let payload = build_push_payload(
            short_code,
            passkey,
            &timestamp,
            request.amount,
            &request.phone,
            callback_url,
            &request.account_reference,
            &request.description,
        );

        info!(
            account_reference = %payload.account_reference,
            timestamp = %payload.timestamp,
            "Sending STK push request"
        );

        let (status, body) = match self.send_push(token, &payload).await {
            Ok(result) => result,
            Err(e) => {
                error!(error = %e, "No usable response from M-Pesa for STK push");
                return Ok(PushOutcome::Rejected {
                    reason: "No response from M-Pesa service for STK Push.".to_string(),
                });
            }
        };

        Ok(interpret_push_response(status, body))
    }
}

fn interpret_push_response(status: reqwest::StatusCode, body: Value) -> PushOutcome {
    let parsed: Option<StkPushResponse> = serde_json::from_value(body.clone()).ok();

    if let Some(response) = parsed {
        let accepted = status.is_success()
            && response.response_code.as_deref() == Some(ACCEPTED_RESPONSE_CODE);

        if accepted {
            if let (Some(merchant), Some(checkout)) =
                (response.merchant_request_id, response.checkout_request_id)
            {
                return PushOutcome::Accepted(PushAccepted {
                    correlation: CorrelationIds {
                        merchant_request_id: merchant,
                        checkout_request_id: checkout,
                    },
                    response_description: response.response_description,
                    raw: body,
                });
            }
            warn!("STK push accepted without correlation identifiers");
            return PushOutcome::Rejected {
                reason: "M-Pesa accepted the push without correlation identifiers".to_string(),
            };
        }

        let reason = response
            .response_description
            .or(response.error_message)
            .unwrap_or_else(|| "Failed to initiate STK push with M-Pesa API".to_string());
        warn!(http_status = %status, reason = %reason, "STK push rejected");
        return PushOutcome::Rejected { reason };
    }

    warn!(http_status = %status, "Unrecognized STK push response");
    PushOutcome::Rejected {
        reason: "Failed to initiate STK push with M-Pesa API".to_string(),
    }
}
