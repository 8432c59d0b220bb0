mod config;
mod db;
mod dtos;
mod error;
mod handler;
mod middleware;
mod models;
mod routes;
mod service;
mod utils;

use std::sync::Arc;

use axum::http::{
    header::{ACCEPT, AUTHORIZATION, CONTENT_TYPE},
    HeaderValue, Method,
};
use config::Config;
use dotenv::dotenv;
use routes::create_router;
use sqlx::postgres::PgPoolOptions;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tracing_subscriber::filter::LevelFilter;

use crate::db::db::DBClient;

// Import the services
use service::{
    advert_service::AdvertService,
    chat_service::ChatService,
    escrow_service::EscrowService,
    negotiation_service::NegotiationService,
    notification_service::NotificationService,
    payment_gateway::PaymentGatewayService,
    realtime_service::RealtimeService,
    settlement_service::SettlementService,
    webhook_service::WebhookService,
};

#[derive(Clone)]
pub struct AppState {
    pub env: Config,
    pub db_client: Arc<DBClient>,
    // Services
    pub negotiation_service: Arc<NegotiationService>,
    pub escrow_service: Arc<EscrowService>,
    pub settlement_service: Arc<SettlementService>,
    pub webhook_service: Arc<WebhookService>,
    pub advert_service: Arc<AdvertService>,
    pub notification_service: Arc<NotificationService>,
    pub chat_service: Arc<ChatService>,
}

impl AppState {
    pub fn new(db_client: DBClient, config: Config) -> Self {
        let db_client_arc = Arc::new(db_client);

        // Leaf collaborators first, then the services composed from them.
        // The dependency graph is explicit: no service reaches for a global.
        let realtime_service = Arc::new(RealtimeService::new());
        let notification_service = Arc::new(NotificationService::new(
            db_client_arc.clone(),
            realtime_service.clone(),
        ));
        let chat_service = Arc::new(ChatService::new(db_client_arc.clone()));
        let gateway = Arc::new(PaymentGatewayService::new(&config));

        let negotiation_service = Arc::new(NegotiationService::new(
            db_client_arc.clone(),
            chat_service.clone(),
            notification_service.clone(),
        ));

        let escrow_service = Arc::new(EscrowService::new(
            db_client_arc.clone(),
            gateway.clone(),
            config.clone(),
        ));

        let settlement_service = Arc::new(SettlementService::new(
            db_client_arc.clone(),
            escrow_service.clone(),
            notification_service.clone(),
            chat_service.clone(),
        ));

        let webhook_service = Arc::new(WebhookService::new(
            db_client_arc.clone(),
            gateway.clone(),
            settlement_service.clone(),
        ));

        let advert_service = Arc::new(AdvertService::new(
            db_client_arc.clone(),
            gateway,
            notification_service.clone(),
        ));

        Self {
            env: config,
            db_client: db_client_arc,
            negotiation_service,
            escrow_service,
            settlement_service,
            webhook_service,
            advert_service,
            notification_service,
            chat_service,
        }
    }
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_max_level(LevelFilter::DEBUG)
        .init();

    dotenv().ok();

    let config = Config::init();

    // Connect to PostgreSQL
    let pool = match PgPoolOptions::new()
        .max_connections(20)
        .min_connections(5)
        .connect(&config.database_url)
        .await
    {
        Ok(pool) => {
            tracing::info!("Connection to the database is successful");
            pool
        }
        Err(err) => {
            tracing::error!("Failed to connect to the database: {:?}", err);
            std::process::exit(1);
        }
    };

    let db_client = DBClient::new(pool);

    let allowed_origins = vec![
        config.app_url.parse::<HeaderValue>().unwrap(),
        "http://localhost:5173".parse::<HeaderValue>().unwrap(),
        "http://localhost:8000".parse::<HeaderValue>().unwrap(),
    ];

    let cors = CorsLayer::new()
        .allow_origin(AllowOrigin::list(allowed_origins))
        .allow_headers([AUTHORIZATION, ACCEPT, CONTENT_TYPE])
        .allow_credentials(true)
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE]);

    let app_state = Arc::new(AppState::new(db_client, config.clone()));

    let app = create_router(app_state.clone()).layer(cors);

    // Start the payment reconciliation sweep
    let app_state_clone = app_state.clone();
    tokio::spawn(async move {
        service::background_jobs::start_payment_reconciliation_job(app_state_clone).await;
    });

    tracing::info!("Server is running on http://localhost:{}", config.port);

    let listener = tokio::net::TcpListener::bind(format!("0.0.0.0:{}", &config.port))
        .await
        .unwrap();

    axum::serve(listener, app).await.unwrap();
}
