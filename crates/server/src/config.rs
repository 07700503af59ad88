#[derive(Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub cors_origins: Option<Vec<String>>,
    pub google_api_key: Option<String>,
}

impl Config {
    pub fn from_env() -> Self {
        dotenvy::dotenv().ok();

        let host = std::env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string());
        let port: u16 = std::env::var("PORT")
            .unwrap_or_else(|_| "5050".to_string())
            .parse()
            .unwrap_or(5050);

        // CORS_ORIGIN is a comma-separated allowlist; unset means any origin
        let cors_origins = std::env::var("CORS_ORIGIN")
            .ok()
            .map(|raw| {
                raw.split(',')
                    .map(|origin| origin.trim().to_string())
                    .filter(|origin| !origin.is_empty())
                    .collect::<Vec<_>>()
            })
            .filter(|origins| !origins.is_empty());

        let google_api_key = std::env::var("GOOGLE_API_KEY")
            .ok()
            .filter(|key| !key.trim().is_empty());

        Self {
            host,
            port,
            cors_origins,
            google_api_key,
        }
    }
}
