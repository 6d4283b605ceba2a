use dotenvy::dotenv;
use std::env;

#[derive(Debug, Clone)]
pub struct BrokerConfig {
    pub app_key: String,
    pub app_secret: String,
    /// Upper bound on a single publish call; a timeout is a best-effort
    /// delivery failure, never a persistence failure.
    pub publish_timeout_ms: u64,
}

/// Gravatar settings are carried opaquely for the avatar layer; this
/// service only reads them.
#[derive(Debug, Clone)]
pub struct GravatarConfig {
    pub enabled: bool,
    pub size: u32,
    pub imageset: String,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub redis_url: String,
    pub port: u16,
    pub jwt_secret: String,
    pub broker: BrokerConfig,
    pub storage_bucket: String,
    pub storage_public_url: String,
    pub attachments_folder: String,
    pub avatars_folder: String,
    pub max_upload_bytes: i64,
    pub allowed_images: Vec<String>,
    pub allowed_files: Vec<String>,
    pub gravatar: GravatarConfig,
}

impl Config {
    fn parse_list(value: &str) -> Vec<String> {
        value
            .split(',')
            .map(|s| s.trim())
            .filter(|s| !s.is_empty())
            .map(|s| s.to_string())
            .collect()
    }

    pub fn from_env() -> Result<Self, crate::error::AppError> {
        dotenv().ok();
        let database_url = env::var("DATABASE_URL")
            .map_err(|_| crate::error::AppError::Config("DATABASE_URL missing".into()))?;
        let redis_url = env::var("REDIS_URL").unwrap_or_else(|_| "redis://127.0.0.1:6379".into());
        let port = env::var("PORT")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(3000);
        let jwt_secret = env::var("JWT_SECRET")
            .map_err(|_| crate::error::AppError::Config("JWT_SECRET missing".into()))?;

        let broker = BrokerConfig {
            app_key: env::var("BROKER_APP_KEY").unwrap_or_else(|_| "chat-dev".into()),
            app_secret: env::var("BROKER_APP_SECRET").unwrap_or_else(|_| "chat-dev-secret".into()),
            publish_timeout_ms: env::var("BROKER_PUBLISH_TIMEOUT_MS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(2000),
        };

        let storage_bucket = env::var("STORAGE_BUCKET").unwrap_or_else(|_| "chat".into());
        let storage_public_url =
            env::var("STORAGE_PUBLIC_URL").unwrap_or_else(|_| "http://localhost:9000/chat".into());
        let attachments_folder =
            env::var("ATTACHMENTS_FOLDER").unwrap_or_else(|_| "attachments".into());
        let avatars_folder = env::var("AVATARS_FOLDER").unwrap_or_else(|_| "avatars".into());

        let max_upload_bytes = env::var("MAX_UPLOAD_BYTES")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(150_000_000);
        let allowed_images = Self::parse_list(
            &env::var("ALLOWED_IMAGES").unwrap_or_else(|_| "png,jpg,jpeg,gif".into()),
        );
        let allowed_files = Self::parse_list(
            &env::var("ALLOWED_FILES").unwrap_or_else(|_| "zip,rar,txt,pdf".into()),
        );

        let gravatar = GravatarConfig {
            enabled: env::var("GRAVATAR_ENABLED")
                .unwrap_or_else(|_| "true".into())
                .eq_ignore_ascii_case("true"),
            size: env::var("GRAVATAR_SIZE")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(200),
            imageset: env::var("GRAVATAR_IMAGESET").unwrap_or_else(|_| "identicon".into()),
        };

        Ok(Self {
            database_url,
            redis_url,
            port,
            jwt_secret,
            broker,
            storage_bucket,
            storage_public_url,
            attachments_folder,
            avatars_folder,
            max_upload_bytes,
            allowed_images,
            allowed_files,
            gravatar,
        })
    }

    /// Fixed settings for tests; no environment access.
    pub fn test_defaults() -> Self {
        Self {
            database_url: "postgres://localhost/chat_test".into(),
            redis_url: "redis://127.0.0.1:6379/1".into(),
            port: 3000,
            jwt_secret: "test-secret".into(),
            broker: BrokerConfig {
                app_key: "test-key".into(),
                app_secret: "test-broker-secret".into(),
                publish_timeout_ms: 2000,
            },
            storage_bucket: "chat-test".into(),
            storage_public_url: "http://localhost:9000/chat-test".into(),
            attachments_folder: "attachments".into(),
            avatars_folder: "avatars".into(),
            max_upload_bytes: 150_000_000,
            allowed_images: vec!["png".into(), "jpg".into(), "jpeg".into(), "gif".into()],
            allowed_files: vec!["zip".into(), "rar".into(), "txt".into(), "pdf".into()],
            gravatar: GravatarConfig {
                enabled: true,
                size: 200,
                imageset: "identicon".into(),
            },
        }
    }
}
