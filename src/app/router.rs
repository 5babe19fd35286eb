use axum::{
    http::StatusCode,
    routing::{get, post},
    Router,
};

use crate::app::state::AppState;
use crate::handlers::*;

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health_handler))
        .route("/payments/push", post(payments::push_payment))
        .route("/payments/callback", post(payments::payment_callback))
        // Path registered with the gateway by the previous deployment
        .route("/payments/stk-notification", post(payments::payment_callback))
        .route("/payments/:id", get(payments::get_payment))
        .route("/payments-summary", get(payments_summary::get_summary))
        .route("/metrics", get(metrics::get_metrics))
        .with_state(state)
}

async fn health_handler() -> StatusCode {
    StatusCode::OK
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::catalog::ClassItem;
    use crate::models::principal::{Principal, Role};
    use crate::models::payment::CorrelationIds;
    use crate::services::gateway_client::{
        BearerToken, GatewayError, PaymentGateway, PushAccepted, PushOutcome, PushRequest,
    };
    use crate::services::{
        InMemoryClassCatalog, InMemoryPaymentLedger, PaymentLedger, PaymentService,
        StaticSessionStore,
    };
    use async_trait::async_trait;
    use axum::body::{to_bytes, Body};
    use axum::http::Request;
    use serde_json::{json, Value};
    use std::sync::Arc;
    use tower::ServiceExt;

    struct AcceptingGateway;

    #[async_trait]
    impl PaymentGateway for AcceptingGateway {
        async fn authenticate(&self) -> Result<BearerToken, GatewayError> {
            Ok(BearerToken::new("tok"))
        }

        async fn initiate_push(
            &self,
            _token: &BearerToken,
            _request: &PushRequest,
        ) -> Result<PushOutcome, GatewayError> {
            Ok(PushOutcome::Accepted(PushAccepted {
                correlation: CorrelationIds {
                    merchant_request_id: "M1".into(),
                    checkout_request_id: "C1".into(),
                },
                response_description: None,
                raw: json!({ "MerchantRequestID": "M1", "CheckoutRequestID": "C1", "ResponseCode": "0" }),
            }))
        }
    }

    fn app() -> (Router, Arc<InMemoryPaymentLedger>) {
        let ledger = Arc::new(InMemoryPaymentLedger::new());
        let catalog = InMemoryClassCatalog::with_classes([ClassItem {
            id: "cls-1".into(),
            name: "Boxing Fundamentals".into(),
            price: 1500,
        }]);
        let payments = Arc::new(PaymentService::new(
            ledger.clone(),
            Arc::new(catalog),
            Arc::new(AcceptingGateway),
        ));
        let sessions = StaticSessionStore::new();
        sessions.insert("user-token", Principal::new("user-1", Role::User));
        sessions.insert("staff-token", Principal::new("staff-1", Role::Staff));

        (build_router(AppState::new(payments, Arc::new(sessions))), ledger)
    }

    fn post_json(uri: &str, token: Option<&str>, body: &str) -> Request<Body> {
        let mut builder = Request::post(uri).header("content-type", "application/json");
        if let Some(token) = token {
            builder = builder.header("authorization", format!("Bearer {token}"));
        }
        builder.body(Body::from(body.to_string())).unwrap()
    }

    fn get_with(uri: &str, token: &str) -> Request<Body> {
        Request::get(uri)
            .header("authorization", format!("Bearer {token}"))
            .body(Body::empty())
            .unwrap()
    }

    async fn json_body(response: axum::response::Response) -> Value {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    const PUSH_BODY: &str = r#"{"itemId":"cls-1","amount":1500,"phone":"0712345678"}"#;

    #[tokio::test]
    async fn test_health() {
        let (app, _) = app();
        let response = app
            .oneshot(Request::get("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_push_requires_authentication() {
        let (app, ledger) = app();

        let response = app.clone().oneshot(post_json("/payments/push", None, PUSH_BODY)).await.unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

        let response = app
            .oneshot(post_json("/payments/push", Some("forged"), PUSH_BODY))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(json_body(response).await["message"], "User not authenticated.");
        assert!(ledger.is_empty());
    }

    #[tokio::test]
    async fn test_push_then_callback_end_to_end() {
        let (app, ledger) = app();

        let response = app
            .clone()
            .oneshot(post_json("/payments/push", Some("user-token"), PUSH_BODY))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = json_body(response).await;
        assert_eq!(body["checkoutAccepted"], true);
        assert_eq!(body["providerData"]["CheckoutRequestID"], "C1");
        let payment_id = body["paymentId"].as_str().unwrap().to_string();

        let callback = json!({
            "Body": { "stkCallback": {
                "MerchantRequestID": "M1",
                "CheckoutRequestID": "C1",
                "ResultCode": 0,
                "ResultDesc": "The service request is processed successfully.",
                "CallbackMetadata": { "Item": [
                    { "Name": "MpesaReceiptNumber", "Value": "QAX123" }
                ]}
            }}
        });
        let response = app
            .clone()
            .oneshot(post_json("/payments/callback", None, &callback.to_string()))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(json_body(response).await, json!({ "ResultCode": 0, "ResultDesc": "Accepted" }));

        let response = app
            .oneshot(get_with(&format!("/payments/{payment_id}"), "user-token"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let attempt = json_body(response).await;
        assert_eq!(attempt["status"], "completed");
        assert_eq!(attempt["providerReceiptNumber"], "QAX123");
        assert_eq!(ledger.len(), 1);
    }

    #[tokio::test]
    async fn test_amount_mismatch_is_bad_request() {
        let (app, ledger) = app();
        let response = app
            .oneshot(post_json(
                "/payments/push",
                Some("user-token"),
                r#"{"classId":"cls-1","amount":"100","phoneNumber":"0712345678"}"#,
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = json_body(response).await;
        assert_eq!(body["success"], false);
        assert_eq!(body["message"], "Invalid amount for the selected class.");
        assert!(ledger.is_empty());
    }

    #[tokio::test]
    async fn test_unknown_class_is_not_found() {
        let (app, _) = app();
        let response = app
            .oneshot(post_json(
                "/payments/push",
                Some("user-token"),
                r#"{"itemId":"cls-404","amount":1500,"phone":"0712345678"}"#,
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_malformed_callback_still_gets_200() {
        let (app, _) = app();

        for body in [r#"{"Body":{}}"#, "not json at all"] {
            let response = app
                .clone()
                .oneshot(post_json("/payments/stk-notification", None, body))
                .await
                .unwrap();
            assert_eq!(response.status(), StatusCode::OK);
            assert_eq!(json_body(response).await["ResultCode"], 1);
        }
    }

    #[tokio::test]
    async fn test_unmatched_callback_acknowledged() {
        let (app, ledger) = app();
        let callback = json!({
            "Body": { "stkCallback": {
                "MerchantRequestID": "M404",
                "CheckoutRequestID": "C404",
                "ResultCode": 0,
                "ResultDesc": "ok"
            }}
        });

        let response = app
            .oneshot(post_json("/payments/callback", None, &callback.to_string()))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(json_body(response).await["ResultCode"], 0);
        assert!(ledger.list().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_operations_endpoints_need_staff() {
        let (app, _) = app();

        for uri in ["/metrics", "/payments-summary"] {
            let response = app.clone().oneshot(get_with(uri, "user-token")).await.unwrap();
            assert_eq!(response.status(), StatusCode::FORBIDDEN, "{uri}");

            let response = app.clone().oneshot(get_with(uri, "staff-token")).await.unwrap();
            assert_eq!(response.status(), StatusCode::OK, "{uri}");
        }
    }
}
