use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

pub const RECEIPT_FIELD: &str = "MpesaReceiptNumber";
pub const CANCELLED_RESULT_CODE: &str = "1032";

// Payload recebido do gateway: { Body: { stkCallback: { ... } } }
// Só o aninhamento e os dois ids são obrigatórios; o resto é lido com tolerância.
#[derive(Debug, Clone, Deserialize)]
pub struct StkCallback {
    #[serde(rename = "MerchantRequestID")]
    pub merchant_request_id: String,
    #[serde(rename = "CheckoutRequestID")]
    pub checkout_request_id: String,
    /// Arrives as a number from the live gateway and as a string from some simulators.
    /// Absent reads as `Null`, which never counts as success.
    #[serde(rename = "ResultCode", default)]
    pub result_code: Value,
    #[serde(rename = "ResultDesc", default, deserialize_with = "lenient")]
    pub result_desc: Option<String>,
    #[serde(rename = "CallbackMetadata", default, deserialize_with = "lenient")]
    pub callback_metadata: Option<CallbackMetadata>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CallbackMetadata {
    #[serde(rename = "Item", default, deserialize_with = "lenient_items")]
    pub items: Vec<MetadataItem>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MetadataItem {
    #[serde(rename = "Name", default, deserialize_with = "lenient")]
    pub name: Option<String>,
    #[serde(rename = "Value", default)]
    pub value: Option<Value>,
}

/// Wrong-typed optional fields read as absent instead of failing the whole payload.
fn lenient<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    let value = Value::deserialize(deserializer)?;
    Ok(serde_json::from_value(value).ok())
}

// null ou não-array vira lista vazia; itens irregulares são descartados
fn lenient_items<'de, D>(deserializer: D) -> Result<Vec<MetadataItem>, D::Error>
where
    D: Deserializer<'de>,
{
    let items = match Value::deserialize(deserializer)? {
        Value::Array(items) => items,
        _ => return Ok(Vec::new()),
    };
    Ok(items
        .into_iter()
        .filter_map(|item| serde_json::from_value(item).ok())
        .collect())
}

/// Parsed callback alongside the verbatim `stkCallback` object kept for audit.
#[derive(Debug, Clone)]
pub struct ParsedCallback {
    pub callback: StkCallback,
    pub raw: Value,
}

impl ParsedCallback {
    /// Returns `None` when the payload is missing the nested `Body.stkCallback`
    /// structure or either correlation id.
    pub fn from_slice(bytes: &[u8]) -> Option<Self> {
        let value: Value = serde_json::from_slice(bytes).ok()?;
        Self::from_value(value)
    }

    pub fn from_value(value: Value) -> Option<Self> {
        let raw = value.get("Body")?.get("stkCallback")?.clone();
        let callback: StkCallback = serde_json::from_value(raw.clone()).ok()?;
        if callback.merchant_request_id.trim().is_empty()
            || callback.checkout_request_id.trim().is_empty()
        {
            return None;
        }
        Some(Self { callback, raw })
    }
}

impl StkCallback {
    /// Result code compared by its string form, so `0` and `"0"` are equal.
    pub fn result_code(&self) -> String {
        match &self.result_code {
            Value::String(code) => code.trim().to_string(),
            Value::Null => String::new(),
            other => other.to_string(),
        }
    }

    pub fn is_success(&self) -> bool {
        self.result_code() == "0"
    }

    pub fn is_cancellation(&self) -> bool {
        let described_as_cancel = self
            .result_desc
            .as_deref()
            .map(|desc| desc.to_lowercase().contains("cancel"))
            .unwrap_or(false);
        described_as_cancel || self.result_code() == CANCELLED_RESULT_CODE
    }

    pub fn receipt_number(&self) -> Option<String> {
        let item = self
            .callback_metadata
            .as_ref()?
            .items
            .iter()
            .find(|item| item.name.as_deref() == Some(RECEIPT_FIELD))?;

        match item.value.as_ref()? {
            Value::String(receipt) if !receipt.is_empty() => Some(receipt.clone()),
            Value::Number(receipt) => Some(receipt.to_string()),
            _ => None,
        }
    }
}

/// Body returned to the gateway; always sent with HTTP 200.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CallbackAck {
    #[serde(rename = "ResultCode")]
    pub result_code: u8,
    #[serde(rename = "ResultDesc")]
    pub result_desc: String,
}

impl CallbackAck {
    pub fn accepted(desc: impl Into<String>) -> Self {
        Self {
            result_code: 0,
            result_desc: desc.into(),
        }
    }

    pub fn rejected(desc: impl Into<String>) -> Self {
        Self {
            result_code: 1,
            result_desc: desc.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn payload(result_code: Value, desc: &str) -> Value {
        json!({
            "Body": {
                "stkCallback": {
                    "MerchantRequestID": "M1",
                    "CheckoutRequestID": "C1",
                    "ResultCode": result_code,
                    "ResultDesc": desc,
                    "CallbackMetadata": {
                        "Item": [
                            { "Name": "Amount", "Value": 1500 },
                            { "Name": "MpesaReceiptNumber", "Value": "QAX123" },
                            { "Name": "PhoneNumber", "Value": 254712345678u64 }
                        ]
                    }
                }
            }
        })
    }

    #[test]
    fn test_parses_successful_callback() {
        let parsed = ParsedCallback::from_value(payload(json!(0), "Processed")).unwrap();

        assert_eq!(parsed.callback.merchant_request_id, "M1");
        assert_eq!(parsed.callback.checkout_request_id, "C1");
        assert!(parsed.callback.is_success());
        assert_eq!(parsed.callback.receipt_number().as_deref(), Some("QAX123"));
        assert!(parsed.raw.get("Body").is_none());
        assert_eq!(parsed.raw["CheckoutRequestID"], "C1");
    }

    #[test]
    fn test_result_code_compared_as_string() {
        let parsed = ParsedCallback::from_value(payload(json!("0"), "ok")).unwrap();
        assert!(parsed.callback.is_success());

        let parsed = ParsedCallback::from_value(payload(json!(1), "Insufficient funds")).unwrap();
        assert!(!parsed.callback.is_success());
        assert!(!parsed.callback.is_cancellation());
    }

    #[test]
    fn test_detects_cancellation_by_code_or_description() {
        let by_code = ParsedCallback::from_value(payload(json!(1032), "Request failed")).unwrap();
        assert!(by_code.callback.is_cancellation());

        let by_desc =
            ParsedCallback::from_value(payload(json!(1), "Request Cancelled by user")).unwrap();
        assert!(by_desc.callback.is_cancellation());
    }

    #[test]
    fn test_missing_receipt_yields_none() {
        let value = json!({
            "Body": { "stkCallback": {
                "MerchantRequestID": "M1",
                "CheckoutRequestID": "C1",
                "ResultCode": 0,
                "ResultDesc": "ok"
            }}
        });
        let parsed = ParsedCallback::from_value(value).unwrap();
        assert_eq!(parsed.callback.receipt_number(), None);
    }

    #[test]
    fn test_rejects_missing_nested_structure() {
        assert!(ParsedCallback::from_value(json!({ "Body": {} })).is_none());
        assert!(ParsedCallback::from_value(json!({ "stkCallback": {} })).is_none());
        assert!(ParsedCallback::from_slice(b"not json").is_none());
        assert!(ParsedCallback::from_value(json!({
            "Body": { "stkCallback": { "ResultCode": 0 } }
        }))
        .is_none());
        assert!(ParsedCallback::from_value(json!({
            "Body": { "stkCallback": { "MerchantRequestID": "M1", "CheckoutRequestID": " " } }
        }))
        .is_none());
    }

    #[test]
    fn test_irregular_metadata_does_not_reject_callback() {
        let value = json!({
            "Body": { "stkCallback": {
                "MerchantRequestID": "M1",
                "CheckoutRequestID": "C1",
                "ResultCode": 0,
                "ResultDesc": "ok",
                "CallbackMetadata": { "Item": [
                    { "Name": "MpesaReceiptNumber", "Value": "QAX123" },
                    { "Value": 5 },
                    "garbage"
                ]}
            }}
        });
        let parsed = ParsedCallback::from_value(value).unwrap();
        assert!(parsed.callback.is_success());
        assert_eq!(parsed.callback.receipt_number().as_deref(), Some("QAX123"));
    }

    #[test]
    fn test_null_metadata_items_read_as_empty() {
        for metadata in [json!({ "Item": null }), json!(null), json!("n/a")] {
            let value = json!({
                "Body": { "stkCallback": {
                    "MerchantRequestID": "M1",
                    "CheckoutRequestID": "C1",
                    "ResultCode": 0,
                    "ResultDesc": 42,
                    "CallbackMetadata": metadata
                }}
            });
            let parsed = ParsedCallback::from_value(value).unwrap();
            assert!(parsed.callback.is_success());
            assert_eq!(parsed.callback.receipt_number(), None);
            assert_eq!(parsed.callback.result_desc, None);
        }
    }

    #[test]
    fn test_absent_or_odd_result_code_is_not_success() {
        for code in [None, Some(json!(null)), Some(json!({ "code": 0 })), Some(json!(""))] {
            let mut stk = json!({ "MerchantRequestID": "M1", "CheckoutRequestID": "C1" });
            if let Some(code) = code {
                stk["ResultCode"] = code;
            }
            let parsed = ParsedCallback::from_value(json!({ "Body": { "stkCallback": stk } })).unwrap();
            assert!(!parsed.callback.is_success());
            assert!(!parsed.callback.is_cancellation());
        }
    }

    #[test]
    fn test_ack_serializes_gateway_field_names() {
        let ack = serde_json::to_value(CallbackAck::accepted("Accepted")).unwrap();
        assert_eq!(ack, json!({ "ResultCode": 0, "ResultDesc": "Accepted" }));
    }
}
