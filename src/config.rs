// config.rs
#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub app_url: String,
    pub jwt_secret: String,
    pub jwt_maxage: i64,
    pub port: u16,
    // Payment gateway configuration
    pub gateway_base_url: String,
    pub gateway_secret_key: String,
    pub gateway_webhook_secret: String,
    pub checkout_success_url: String,
    pub checkout_cancel_url: String,
    pub platform_currency: String,
}

impl Config {
    pub fn init() -> Config {
        let database_url = std::env::var("DATABASE_URL").expect("DATABASE_URL must be set");
        let jwt_secret = std::env::var("JWT_SECRET_KEY").expect("JWT_SECRET_KEY must be set");
        let jwt_maxage = std::env::var("JWT_MAXAGE").expect("JWT_MAXAGE must be set");
        let app_url = std::env::var("APP_URL").expect("APP_URL must be set");

        // Gateway configuration (with defaults for local development)
        let gateway_base_url = std::env::var("GATEWAY_BASE_URL")
            .unwrap_or_else(|_| "https://api.gateway.example.com/v1".to_string());
        let gateway_secret_key = std::env::var("GATEWAY_SECRET_KEY")
            .unwrap_or_else(|_| "test_secret_key".to_string());
        let gateway_webhook_secret = std::env::var("GATEWAY_WEBHOOK_SECRET")
            .unwrap_or_else(|_| "test_webhook_secret".to_string());
        let checkout_success_url = std::env::var("CHECKOUT_SUCCESS_URL")
            .unwrap_or_else(|_| format!("{}/payments/success", app_url));
        let checkout_cancel_url = std::env::var("CHECKOUT_CANCEL_URL")
            .unwrap_or_else(|_| format!("{}/payments/cancelled", app_url));
        let platform_currency =
            std::env::var("PLATFORM_CURRENCY").unwrap_or_else(|_| "usd".to_string());

        let port = std::env::var("PORT")
            .ok()
            .and_then(|p| p.parse::<u16>().ok())
            .unwrap_or(8000);

        Config {
            database_url,
            app_url,
            jwt_secret,
            jwt_maxage: jwt_maxage.parse::<i64>().unwrap(),
            port,
            gateway_base_url,
            gateway_secret_key,
            gateway_webhook_secret,
            checkout_success_url,
            checkout_cancel_url,
            platform_currency,
        }
    }
}
