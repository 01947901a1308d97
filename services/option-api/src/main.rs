use actix_web::{web, App, HttpResponse, HttpServer};
use option_builder::envelope::{account_sequence, envelope_hash, pre_auth_signer, to_xdr_hex};
use option_builder::{
    HorizonClient, LedgerQuery, OptionContract, OptionEngine, OptionError, OptionTransactionSet,
    TransactionEnvelope,
};
use option_model::{NetworkOverrides, OptionParams};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::{error, info, warn, Level};

mod config;

use crate::config::ApiConfig;

struct AppState<L> {
    engine: OptionEngine<L>,
    network: NetworkOverrides,
}

#[derive(Debug, Deserialize)]
struct OptionRequest {
    buyer: String,
    seller: String,
    params: OptionParams,
    #[serde(default)]
    network: NetworkOverrides,
}

#[derive(Debug, Serialize)]
struct EnvelopeView {
    hash: String,
    /// Kept as a string so 64-bit sequences survive JSON number parsing.
    sequence: String,
    xdr: String,
}

#[derive(Debug, Serialize)]
struct OptionResponse {
    escrow_account_id: String,
    lock_sequence: String,
    escrow_balance: Decimal,
    exercise_signer: String,
    refund_signer: String,
    setup: EnvelopeView,
    exercise: EnvelopeView,
    refund: EnvelopeView,
}

impl OptionResponse {
    fn new(set: &OptionTransactionSet, network_passphrase: &str) -> Result<Self, OptionError> {
        let view = |envelope: &TransactionEnvelope| -> Result<EnvelopeView, OptionError> {
            Ok(EnvelopeView {
                hash: hex::encode(envelope_hash(envelope, network_passphrase)?),
                sequence: (account_sequence(envelope)? + 1).to_string(),
                xdr: to_xdr_hex(envelope)?,
            })
        };
        Ok(Self {
            escrow_account_id: set.escrow_account_id.to_string(),
            lock_sequence: set.lock_sequence.to_string(),
            escrow_balance: set.escrow_balance,
            exercise_signer: pre_auth_signer(envelope_hash(&set.exercise, network_passphrase)?),
            refund_signer: pre_auth_signer(envelope_hash(&set.refund, network_passphrase)?),
            setup: view(&set.setup)?,
            exercise: view(&set.exercise)?,
            refund: view(&set.refund)?,
        })
    }
}

fn error_response(e: &OptionError) -> HttpResponse {
    let body = serde_json::json!({ "error": e.to_string() });
    match e {
        OptionError::Ledger(_) => HttpResponse::BadGateway().json(body),
        _ if e.is_precondition() => HttpResponse::BadRequest().json(body),
        _ => HttpResponse::InternalServerError().json(body),
    }
}

async fn create_option<L: LedgerQuery + 'static>(
    state: web::Data<AppState<L>>,
    req: web::Json<OptionRequest>,
) -> HttpResponse {
    let req = req.into_inner();

    // 1. Validate terms; request overrides win over the service defaults
    let overrides = req.network.or(state.network.clone());
    let contract = match OptionContract::new(&req.buyer, &req.seller, req.params, overrides) {
        Ok(contract) => contract,
        Err(e) => {
            warn!("⚠️ Rejected option request: {}", e);
            return error_response(&e);
        }
    };

    // 2. Build against a fresh ledger snapshot
    let passphrase = &contract.network().network_passphrase;
    let built = state
        .engine
        .build(&contract)
        .await
        .and_then(|set| OptionResponse::new(&set, passphrase));
    match built {
        Ok(response) => {
            info!("✅ Option built, escrow {}", response.escrow_account_id);
            HttpResponse::Ok().json(response)
        }
        Err(e) => {
            error!("❌ Option build failed: {}", e);
            error_response(&e)
        }
    }
}

fn routes<L: LedgerQuery + 'static>(cfg: &mut web::ServiceConfig) {
    cfg.route("/options", web::post().to(create_option::<L>));
}

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt().with_max_level(Level::INFO).init();

    let config = ApiConfig::from_env()?;
    let state = web::Data::new(AppState {
        engine: OptionEngine::new(HorizonClient::new(config.horizon_url.clone())),
        network: config.network.clone(),
    });

    info!(
        "🚀 Option API running on {} (horizon {})",
        config.bind_addr, config.horizon_url
    );

    HttpServer::new(move || {
        App::new()
            .app_data(state.clone())
            .configure(routes::<HorizonClient>)
    })
    .bind(config.bind_addr.as_str())?
    .run()
    .await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::http::StatusCode;
    use actix_web::test;
    use async_trait::async_trait;
    use chrono::Utc;
    use option_builder::{AccountId, AccountState, LedgerSnapshot};
    use option_model::TEST_NETWORK_PASSPHRASE;
    use serde_json::{json, Value};
    use stellar_xdr::curr::{Limits, ReadXdr};

    struct FixedLedger;

    #[async_trait]
    impl LedgerQuery for FixedLedger {
        async fn latest_ledger(&self) -> Result<LedgerSnapshot, OptionError> {
            Ok(LedgerSnapshot {
                height: 50_000_000,
                close_time: Utc::now(),
            })
        }

        async fn load_account(&self, account_id: &AccountId) -> Result<AccountState, OptionError> {
            Ok(AccountState {
                account_id: *account_id,
                sequence: 4_000_000_017,
            })
        }
    }

    fn service_defaults() -> NetworkOverrides {
        NetworkOverrides {
            base_reserve: Some(Decimal::ONE),
            base_fee: Some(200),
            ..Default::default()
        }
    }

    fn request(delay: i64, network: Value) -> Value {
        json!({
            "buyer": AccountId([0xb0; 32]).to_string(),
            "seller": AccountId([0x5e; 32]).to_string(),
            "params": {
                "underlying": {"asset": {"type": "native"}, "amount": "1"},
                "premium": {"asset": {"type": "native"}, "amount": "10"},
                "exercise": {"asset": {"type": "native"}, "amount": "200"},
                "expiry": "2030-01-01T00:00:00Z",
                "delay": delay
            },
            "network": network
        })
    }

    async fn post_option(body: Value) -> (StatusCode, Value) {
        let state = web::Data::new(AppState {
            engine: OptionEngine::new(FixedLedger),
            network: service_defaults(),
        });
        let app = test::init_service(
            App::new()
                .app_data(state.clone())
                .configure(routes::<FixedLedger>),
        )
        .await;
        let req = test::TestRequest::post()
            .uri("/options")
            .set_json(body)
            .to_request();
        let resp = test::call_service(&app, req).await;
        let status = resp.status();
        (status, test::read_body_json(resp).await)
    }

    fn decode(view: &Value) -> TransactionEnvelope {
        let bytes = hex::decode(view["xdr"].as_str().unwrap()).unwrap();
        TransactionEnvelope::from_xdr(bytes, Limits::none()).unwrap()
    }

    #[::core::prelude::v1::test]
    fn request_accepts_missing_network_block() {
        let raw = r#"{
            "buyer": "GB",
            "seller": "GS",
            "params": {
                "underlying": {"asset": {"type": "native"}, "amount": "1"},
                "premium": {"asset": {"type": "native"}, "amount": "10"},
                "exercise": {"asset": {"type": "native"}, "amount": "200"},
                "expiry": "2030-01-01T00:00:00Z",
                "delay": 600
            }
        }"#;
        let req: OptionRequest = serde_json::from_str(raw).unwrap();
        assert_eq!(req.network, NetworkOverrides::default());
        assert_eq!(req.params.delay, 600);
    }

    #[::core::prelude::v1::test]
    fn errors_map_to_client_gateway_or_server_status() {
        let bad_input = error_response(&OptionError::NegativeDelay(-5));
        assert_eq!(bad_input.status(), StatusCode::BAD_REQUEST);
        let down = error_response(&OptionError::Ledger("timeout".into()));
        assert_eq!(down.status(), StatusCode::BAD_GATEWAY);
        let signing = error_response(&OptionError::Signing("invalid escrow seed".into()));
        assert_eq!(signing.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[actix_web::test]
    async fn builds_option_with_layered_network_settings() {
        let (status, body) = post_option(request(
            600,
            json!({"network_passphrase": TEST_NETWORK_PASSPHRASE, "base_fee": 50}),
        ))
        .await;
        assert_eq!(status, StatusCode::OK);

        // Request fee wins; the service's reserve still applies: 1 * 4 + 50e-7 * 3.
        let balance: Decimal = body["escrow_balance"].as_str().unwrap().parse().unwrap();
        assert_eq!(balance, Decimal::new(4_000_015, 6));

        let exercise = decode(&body["exercise"]);
        let TransactionEnvelope::Tx(v1) = &exercise else {
            panic!("expected a v1 envelope");
        };
        assert_eq!(v1.tx.fee, 3 * 50);
        let testnet_hash = envelope_hash(&exercise, TEST_NETWORK_PASSPHRASE).unwrap();
        assert_eq!(body["exercise"]["hash"], hex::encode(testnet_hash));
        assert_eq!(body["exercise_signer"], pre_auth_signer(testnet_hash));
    }

    #[actix_web::test]
    async fn response_carries_strkeys_strings_and_envelopes() {
        let (status, body) = post_option(request(600, json!({}))).await;
        assert_eq!(status, StatusCode::OK);

        let escrow = body["escrow_account_id"].as_str().unwrap();
        assert!(stellar_strkey::ed25519::PublicKey::from_string(escrow).is_ok());
        for signer in ["exercise_signer", "refund_signer"] {
            let raw = body[signer].as_str().unwrap();
            assert!(stellar_strkey::PreAuthTx::from_string(raw).is_ok(), "{}", raw);
        }

        let lock: i64 = body["lock_sequence"].as_str().unwrap().parse().unwrap();
        assert_eq!(lock & 0xffff_ffff, 0);
        assert_eq!(body["setup"]["sequence"], "4000000018");
        assert_eq!(body["exercise"]["sequence"], (lock + 1).to_string());
        assert_eq!(body["refund"]["sequence"], (lock + 1).to_string());

        for leg in ["setup", "exercise", "refund"] {
            let view = &body[leg];
            let envelope = decode(view);
            let hash = envelope_hash(&envelope, option_model::PUBLIC_NETWORK_PASSPHRASE).unwrap();
            assert_eq!(view["hash"], hex::encode(hash));
        }
    }

    #[actix_web::test]
    async fn invalid_terms_are_a_bad_request() {
        let (status, body) = post_option(request(-5, json!({}))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["error"].as_str().unwrap().contains("delay"));

        let mut unknown_buyer = request(600, json!({}));
        unknown_buyer["buyer"] = json!("GBUYER");
        let (status, body) = post_option(unknown_buyer).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["error"].as_str().unwrap().contains("GBUYER"));
    }
}
