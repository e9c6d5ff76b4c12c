//! Configuration module
//!
//! Environment-driven configuration for the API server, storage providers and
//! confirmation emails. Values are read once at startup.

use std::env;

use crate::storage_types::StorageBackend;

// Common constants
const SERVER_PORT: u16 = 5050;
const MAX_FILE_SIZE_BYTES: u64 = 52_428_800;
const LOCAL_STORAGE_PATH: &str = "./uploads/submissions";
const REMOTE_FOLDER: &str = "kids-competition";
const REMOTE_API_BASE_URL: &str = "https://api.cloudinary.com";
const REMOTE_TIMEOUT_SECS: u64 = 60;
const SMTP_PORT: u16 = 587;
const EMAIL_MAX_RETRIES: u32 = 3;
const COMPETITION_YEAR: u16 = 2025;
const HTTP_CONCURRENCY_LIMIT: usize = 1024;

/// Server-level settings
#[derive(Clone, Debug)]
pub struct BaseConfig {
    pub server_port: u16,
    pub cors_origins: Vec<String>,
    pub environment: String,
    /// Absolute base used when rendering links in outgoing emails
    pub public_base_url: String,
    /// Requests handled at once; uploads are buffered in memory
    pub http_concurrency_limit: usize,
}

/// Full service configuration
#[derive(Clone, Debug)]
pub struct ServiceConfig {
    pub base: BaseConfig,
    /// Raw `UPLOAD_PROVIDER` value
    pub upload_provider: String,
    /// `upload_provider` resolved at load time
    pub storage_backend: StorageBackend,
    pub max_file_size_bytes: u64,
    pub local_storage_path: String,
    // Remote CDN credentials
    pub remote_cloud_name: Option<String>,
    pub remote_api_key: Option<String>,
    pub remote_api_secret: Option<String>,
    pub remote_folder: String,
    pub remote_api_base_url: String,
    pub remote_timeout_secs: u64,
    // Confirmation emails
    pub smtp_host: Option<String>,
    pub smtp_port: u16,
    pub smtp_user: Option<String>,
    pub smtp_password: Option<String>,
    pub smtp_from: Option<String>,
    pub smtp_tls: bool,
    pub admin_email: Option<String>,
    pub email_max_retries: u32,
    pub competition_year: u16,
}

/// Application configuration.
#[derive(Clone, Debug)]
pub struct Config(pub Box<ServiceConfig>);

impl Config {
    fn inner(&self) -> &ServiceConfig {
        &self.0
    }

    pub fn from_env() -> Result<Self, anyhow::Error> {
        let config = ServiceConfig::from_env()?;
        Ok(Config(Box::new(config)))
    }

    /// Build configuration from an arbitrary key lookup. Used by tests so they
    /// don't have to mutate the process environment.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, anyhow::Error>
    where
        F: Fn(&str) -> Option<String>,
    {
        Ok(Config(Box::new(ServiceConfig::from_lookup(lookup)?)))
    }

    pub fn validate(&self) -> Result<(), anyhow::Error> {
        self.inner().validate()
    }

    /// Check if the application is running in production mode
    pub fn is_production(&self) -> bool {
        let env = self.inner().base.environment.to_lowercase();
        env == "production" || env == "prod"
    }

    pub fn server_port(&self) -> u16 {
        self.inner().base.server_port
    }

    pub fn cors_origins(&self) -> &[String] {
        &self.inner().base.cors_origins
    }

    pub fn environment(&self) -> &str {
        &self.inner().base.environment
    }

    pub fn public_base_url(&self) -> &str {
        &self.inner().base.public_base_url
    }

    pub fn http_concurrency_limit(&self) -> usize {
        self.inner().base.http_concurrency_limit
    }

    pub fn upload_provider(&self) -> &str {
        &self.inner().upload_provider
    }

    /// Backend for new uploads. Unknown `UPLOAD_PROVIDER` values were
    /// resolved to remote (with a warning) when the configuration was loaded.
    pub fn storage_backend(&self) -> StorageBackend {
        self.inner().storage_backend
    }

    pub fn max_file_size_bytes(&self) -> u64 {
        self.inner().max_file_size_bytes
    }

    pub fn local_storage_path(&self) -> &str {
        &self.inner().local_storage_path
    }

    pub fn remote_cloud_name(&self) -> Option<&str> {
        self.inner().remote_cloud_name.as_deref()
    }

    pub fn remote_api_key(&self) -> Option<&str> {
        self.inner().remote_api_key.as_deref()
    }

    pub fn remote_api_secret(&self) -> Option<&str> {
        self.inner().remote_api_secret.as_deref()
    }

    pub fn remote_folder(&self) -> &str {
        &self.inner().remote_folder
    }

    pub fn remote_api_base_url(&self) -> &str {
        &self.inner().remote_api_base_url
    }

    pub fn remote_timeout_secs(&self) -> u64 {
        self.inner().remote_timeout_secs
    }

    pub fn smtp_host(&self) -> Option<&str> {
        self.inner().smtp_host.as_deref()
    }

    pub fn smtp_port(&self) -> u16 {
        self.inner().smtp_port
    }

    pub fn smtp_user(&self) -> Option<&str> {
        self.inner().smtp_user.as_deref()
    }

    pub fn smtp_password(&self) -> Option<&str> {
        self.inner().smtp_password.as_deref()
    }

    pub fn smtp_from(&self) -> Option<&str> {
        self.inner().smtp_from.as_deref()
    }

    pub fn smtp_tls(&self) -> bool {
        self.inner().smtp_tls
    }

    pub fn admin_email(&self) -> Option<&str> {
        self.inner().admin_email.as_deref()
    }

    pub fn email_max_retries(&self) -> u32 {
        self.inner().email_max_retries
    }

    pub fn competition_year(&self) -> u16 {
        self.inner().competition_year
    }
}

impl ServiceConfig {
    pub fn from_env() -> Result<Self, anyhow::Error> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, anyhow::Error>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str| lookup(key).filter(|s| !s.trim().is_empty());
        // First non-empty value among several accepted names
        let var_any = |keys: &[&str]| keys.iter().find_map(|k| var(*k));

        let environment = var_any(&["ENVIRONMENT", "APP_ENV"])
            .unwrap_or_else(|| "development".to_string());

        let cors_origins: Vec<String> = var("CORS_ORIGINS")
            .unwrap_or_else(|| "*".to_string())
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();

        let server_port = var("PORT")
            .unwrap_or_else(|| SERVER_PORT.to_string())
            .parse()
            .unwrap_or(SERVER_PORT);

        let public_base_url = var("PUBLIC_BASE_URL")
            .unwrap_or_else(|| format!("http://localhost:{}", server_port))
            .trim_end_matches('/')
            .to_string();

        let http_concurrency_limit = var("HTTP_CONCURRENCY_LIMIT")
            .and_then(|s| s.trim().parse::<usize>().ok())
            .unwrap_or(HTTP_CONCURRENCY_LIMIT)
            .max(1);

        let upload_provider = var("UPLOAD_PROVIDER").unwrap_or_else(|| "remote".to_string());
        let storage_backend = StorageBackend::from_config_value(&upload_provider);

        let config = ServiceConfig {
            base: BaseConfig {
                server_port,
                cors_origins,
                environment,
                public_base_url,
                http_concurrency_limit,
            },
            upload_provider,
            storage_backend,
            max_file_size_bytes: var("MAX_FILE_SIZE_BYTES")
                .unwrap_or_else(|| MAX_FILE_SIZE_BYTES.to_string())
                .parse()
                .unwrap_or(MAX_FILE_SIZE_BYTES),
            local_storage_path: var("LOCAL_STORAGE_PATH")
                .unwrap_or_else(|| LOCAL_STORAGE_PATH.to_string()),
            remote_cloud_name: var_any(&["REMOTE_CLOUD_NAME", "CLOUDINARY_CLOUD_NAME"]),
            remote_api_key: var_any(&["REMOTE_API_KEY", "CLOUDINARY_API_KEY"]),
            remote_api_secret: var_any(&["REMOTE_API_SECRET", "CLOUDINARY_API_SECRET"]),
            remote_folder: var_any(&["REMOTE_FOLDER", "CLOUDINARY_FOLDER"])
                .unwrap_or_else(|| REMOTE_FOLDER.to_string()),
            remote_api_base_url: var("REMOTE_API_BASE_URL")
                .unwrap_or_else(|| REMOTE_API_BASE_URL.to_string())
                .trim_end_matches('/')
                .to_string(),
            remote_timeout_secs: var("REMOTE_TIMEOUT_SECS")
                .unwrap_or_else(|| REMOTE_TIMEOUT_SECS.to_string())
                .parse()
                .unwrap_or(REMOTE_TIMEOUT_SECS),
            smtp_host: var("SMTP_HOST"),
            smtp_port: var("SMTP_PORT")
                .and_then(|s| s.parse().ok())
                .filter(|&p| p > 0)
                .unwrap_or(SMTP_PORT),
            smtp_user: var("SMTP_USER"),
            smtp_password: var("SMTP_PASSWORD"),
            smtp_from: var("SMTP_FROM"),
            smtp_tls: var("SMTP_TLS")
                .unwrap_or_else(|| "true".to_string())
                .to_lowercase()
                .parse()
                .unwrap_or(true),
            admin_email: var("ADMIN_EMAIL"),
            email_max_retries: var("EMAIL_MAX_RETRIES")
                .unwrap_or_else(|| EMAIL_MAX_RETRIES.to_string())
                .parse()
                .unwrap_or(EMAIL_MAX_RETRIES),
            competition_year: var("COMPETITION_YEAR")
                .unwrap_or_else(|| COMPETITION_YEAR.to_string())
                .parse()
                .unwrap_or(COMPETITION_YEAR),
        };

        Ok(config)
    }

    pub fn validate(&self) -> Result<(), anyhow::Error> {
        let env = self.base.environment.to_lowercase();
        let is_production = env == "production" || env == "prod";
        if is_production && self.base.cors_origins.iter().any(|o| o == "*") {
            return Err(anyhow::anyhow!(
                "CORS_ORIGINS cannot be '*' in production. Please specify explicit origins."
            ));
        }

        if self.max_file_size_bytes == 0 {
            return Err(anyhow::anyhow!("MAX_FILE_SIZE_BYTES must be greater than 0"));
        }

        if self.remote_timeout_secs == 0 {
            return Err(anyhow::anyhow!("REMOTE_TIMEOUT_SECS must be greater than 0"));
        }

        // Unknown provider values resolve to remote, so they need credentials too
        match self.storage_backend {
            StorageBackend::Remote => {
                if self.remote_cloud_name.is_none()
                    || self.remote_api_key.is_none()
                    || self.remote_api_secret.is_none()
                {
                    return Err(anyhow::anyhow!(
                        "REMOTE_CLOUD_NAME, REMOTE_API_KEY and REMOTE_API_SECRET must be set when using remote storage"
                    ));
                }
            }
            StorageBackend::Local => {
                if self.local_storage_path.trim().is_empty() {
                    return Err(anyhow::anyhow!(
                        "LOCAL_STORAGE_PATH must be set when using local storage backend"
                    ));
                }
            }
        }

        if self.smtp_host.is_some() && self.smtp_from.is_none() {
            return Err(anyhow::anyhow!("SMTP_HOST requires SMTP_FROM to be set"));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config_from(pairs: &[(&str, &str)]) -> Config {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|key| map.get(key).cloned()).unwrap()
    }

    #[test]
    fn test_defaults() {
        let config = config_from(&[]);
        assert_eq!(config.upload_provider(), "remote");
        assert_eq!(config.storage_backend(), StorageBackend::Remote);
        assert_eq!(config.max_file_size_bytes(), 52_428_800);
        assert_eq!(config.local_storage_path(), "./uploads/submissions");
        assert_eq!(config.remote_folder(), "kids-competition");
        assert_eq!(config.remote_api_base_url(), "https://api.cloudinary.com");
        assert_eq!(config.remote_timeout_secs(), 60);
        assert_eq!(config.email_max_retries(), 3);
        assert_eq!(config.server_port(), 5050);
        assert!(!config.is_production());
    }

    #[test]
    fn test_cloudinary_aliases() {
        let config = config_from(&[
            ("CLOUDINARY_CLOUD_NAME", "demo"),
            ("CLOUDINARY_API_KEY", "key"),
            ("CLOUDINARY_API_SECRET", "secret"),
            ("CLOUDINARY_FOLDER", "entries"),
        ]);
        assert_eq!(config.remote_cloud_name(), Some("demo"));
        assert_eq!(config.remote_api_key(), Some("key"));
        assert_eq!(config.remote_api_secret(), Some("secret"));
        assert_eq!(config.remote_folder(), "entries");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_invalid_numbers_use_defaults() {
        let config = config_from(&[("MAX_FILE_SIZE_BYTES", "lots"), ("PORT", "-1")]);
        assert_eq!(config.max_file_size_bytes(), 52_428_800);
        assert_eq!(config.server_port(), 5050);
    }

    #[test]
    fn test_validate_remote_requires_credentials() {
        let config = config_from(&[("UPLOAD_PROVIDER", "remote")]);
        assert!(config.validate().is_err());

        let config = config_from(&[("UPLOAD_PROVIDER", "bogus")]);
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_unknown_provider_resolved_once_at_load() {
        let config = config_from(&[("UPLOAD_PROVIDER", "bogus")]);
        assert_eq!(config.upload_provider(), "bogus");
        assert_eq!(config.0.storage_backend, StorageBackend::Remote);
        assert_eq!(config.storage_backend(), StorageBackend::Remote);

        let config = config_from(&[("UPLOAD_PROVIDER", "Cloudinary")]);
        assert_eq!(config.0.storage_backend, StorageBackend::Remote);
    }

    #[test]
    fn test_http_concurrency_limit() {
        assert_eq!(config_from(&[]).http_concurrency_limit(), 1024);
        assert_eq!(
            config_from(&[("HTTP_CONCURRENCY_LIMIT", "64")]).http_concurrency_limit(),
            64
        );
        assert_eq!(
            config_from(&[("HTTP_CONCURRENCY_LIMIT", "0")]).http_concurrency_limit(),
            1
        );
        assert_eq!(
            config_from(&[("HTTP_CONCURRENCY_LIMIT", "many")]).http_concurrency_limit(),
            1024
        );
    }

    #[test]
    fn test_app_env_alias_selects_production() {
        let config = config_from(&[("APP_ENV", "prod")]);
        assert!(config.is_production());
        assert_eq!(config.environment(), "prod");
    }

    #[test]
    fn test_validate_local_needs_no_credentials() {
        let config = config_from(&[("UPLOAD_PROVIDER", "local")]);
        assert!(config.validate().is_ok());
        assert_eq!(config.storage_backend(), StorageBackend::Local);
    }

    #[test]
    fn test_validate_rejects_wildcard_cors_in_production() {
        let config = config_from(&[
            ("UPLOAD_PROVIDER", "local"),
            ("ENVIRONMENT", "production"),
        ]);
        assert!(config.is_production());
        assert!(config.validate().is_err());

        let config = config_from(&[
            ("UPLOAD_PROVIDER", "local"),
            ("ENVIRONMENT", "production"),
            ("CORS_ORIGINS", "https://entries.example.org"),
        ]);
        assert!(config.validate().is_ok());
    }
}
