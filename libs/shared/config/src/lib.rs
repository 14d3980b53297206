use std::env;
use serde::{Deserialize, Serialize};
use tracing::warn;

const DEFAULT_PORT: u16 = 3000;

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub supabase_url: String,
    pub supabase_anon_key: String,
    pub supabase_jwt_secret: String,
    pub port: u16,
    pub mail: MailConfig,
}

/// Mail API settings, loaded once at startup and handed to the notifier.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MailConfig {
    pub api_url: String,
    pub api_key: String,
    pub from_address: String,
}

fn var_or_empty(key: &str) -> String {
    env::var(key).unwrap_or_else(|_| {
        warn!("{} not set, using empty value", key);
        String::new()
    })
}

impl AppConfig {
    pub fn from_env() -> Self {
        let port = match env::var("PORT") {
            Ok(raw) => raw.parse().unwrap_or_else(|_| {
                warn!("PORT value {:?} is not a valid port, using {}", raw, DEFAULT_PORT);
                DEFAULT_PORT
            }),
            Err(_) => DEFAULT_PORT,
        };

        let config = Self {
            supabase_url: var_or_empty("SUPABASE_URL"),
            supabase_anon_key: var_or_empty("SUPABASE_ANON_PUBLIC_KEY"),
            supabase_jwt_secret: var_or_empty("SUPABASE_JWT_SECRET"),
            port,
            mail: MailConfig::from_env(),
        };

        if !config.is_configured() {
            warn!("Application not fully configured - missing environment variables");
        }
        if !config.mail.is_configured() {
            warn!("Mail transport not configured - booking confirmations will be skipped");
        }

        config
    }

    pub fn is_configured(&self) -> bool {
        !self.supabase_url.is_empty()
            && !self.supabase_anon_key.is_empty()
            && !self.supabase_jwt_secret.is_empty()
    }
}

impl MailConfig {
    pub fn from_env() -> Self {
        Self {
            api_url: var_or_empty("MAIL_API_URL"),
            api_key: var_or_empty("MAIL_API_KEY"),
            from_address: var_or_empty("MAIL_FROM_ADDRESS"),
        }
    }

    pub fn is_configured(&self) -> bool {
        !self.api_url.is_empty() && !self.api_key.is_empty() && !self.from_address.is_empty()
    }
}
