use retreat_backend::config::{ResendConfig, StripeConfig, TwilioConfig};
use retreat_backend::error::AppError;
use retreat_backend::providers::{
    CheckoutRequest, EmailMessage, EmailSender, PaymentGateway, SmsSender, StripeClient,
    ResendClient, TwilioClient,
};
use retreat_backend::services::pricing::LineItem;
use serde_json::json;
use uuid::Uuid;
use wiremock::matchers::{body_string_contains, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn twilio(api_base: &str) -> TwilioClient {
    TwilioClient::new(TwilioConfig {
        account_sid: "AC123".to_string(),
        auth_token: "token".to_string(),
        from_number: "+15550001111".to_string(),
        api_base: api_base.to_string(),
    })
}

#[tokio::test]
async fn test_twilio_send_returns_sid() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/2010-04-01/Accounts/AC123/Messages.json"))
        .and(body_string_contains("To=%2B14045551234"))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({ "sid": "SM42" })))
        .expect(1)
        .mount(&server)
        .await;

    let sid = twilio(&server.uri())
        .send_sms("+14045551234", "See you at the gate")
        .await
        .unwrap();
    assert_eq!(sid.as_deref(), Some("SM42"));
}

#[tokio::test]
async fn test_twilio_error_status_is_external_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(400).set_body_string("bad number"))
        .mount(&server)
        .await;

    let err = twilio(&server.uri()).send_sms("+1", "hi").await.unwrap_err();
    assert!(matches!(err, AppError::External(_)));
}

#[tokio::test]
async fn test_unconfigured_senders_skip() {
    let sms = TwilioClient::new(TwilioConfig {
        account_sid: String::new(),
        auth_token: String::new(),
        from_number: String::new(),
        api_base: "http://127.0.0.1:1".to_string(),
    });
    assert_eq!(sms.send_sms("+14045551234", "hi").await.unwrap(), None);

    let email = ResendClient::new(ResendConfig {
        api_key: String::new(),
        from: "hello@example.org".to_string(),
        api_base: "http://127.0.0.1:1".to_string(),
    });
    let message = EmailMessage::new("a@example.org", "Hi", "<p>Hi</p>");
    assert_eq!(email.send_email(&message).await.unwrap(), None);
}

#[tokio::test]
async fn test_resend_send_email() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/emails"))
        .and(header("authorization", "Bearer re_test"))
        .and(body_string_contains("\"subject\":\"You're in\""))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "id": "email_1" })))
        .expect(1)
        .mount(&server)
        .await;

    let client = ResendClient::new(ResendConfig {
        api_key: "re_test".to_string(),
        from: "Retreats <hello@example.org>".to_string(),
        api_base: server.uri(),
    });
    let id = client
        .send_email(&EmailMessage::new("jane@example.com", "You're in", "<p>See you</p>"))
        .await
        .unwrap();
    assert_eq!(id.as_deref(), Some("email_1"));
}

#[tokio::test]
async fn test_stripe_checkout_session() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/checkout/sessions"))
        .and(header("authorization", "Bearer sk_test"))
        .and(body_string_contains("client_reference_id="))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": "cs_test_1",
            "url": "https://checkout.stripe.com/c/pay/cs_test_1"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let client = StripeClient::new(
        StripeConfig {
            api_key: "sk_test".to_string(),
            webhook_secret: String::new(),
            api_base: server.uri(),
        },
        "https://retreats.example.org/",
    );
    let session = client
        .create_checkout_session(&CheckoutRequest {
            registration_id: Uuid::new_v4(),
            event_id: Uuid::new_v4(),
            event_slug: "desert-sit".to_string(),
            customer_email: "jane@example.com".to_string(),
            line_items: vec![LineItem::amount("Desert Sit", 15_000)],
        })
        .await
        .unwrap();
    assert_eq!(session.id, "cs_test_1");
    assert!(session.url.unwrap().contains("cs_test_1"));
}

#[tokio::test]
async fn test_stripe_unconfigured_fails() {
    let client = StripeClient::new(
        StripeConfig {
            api_key: String::new(),
            webhook_secret: String::new(),
            api_base: "http://127.0.0.1:1".to_string(),
        },
        "http://localhost:3000",
    );
    let result = client
        .create_checkout_session(&CheckoutRequest {
            registration_id: Uuid::new_v4(),
            event_id: Uuid::new_v4(),
            event_slug: "x".to_string(),
            customer_email: "x@example.com".to_string(),
            line_items: Vec::new(),
        })
        .await;
    assert!(matches!(result, Err(AppError::External(_))));
}
