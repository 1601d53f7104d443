// Archivo: config.rs
// Propósito: configuración de la consola a partir del entorno (`.env`
// incluido).
use resource_rest::{Format, Principal, ROLE_ADMIN};
use std::env;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Valor inválido para {key}: '{value}'")]
    InvalidValue { key: &'static str, value: String },
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Cargar datos de ejemplo al arrancar.
    pub seed: bool,
    pub format: Format,
    /// Roles del principal de la consola.
    pub roles: Vec<String>,
}

impl AppConfig {
    /// Lee `.env` (si existe) y las variables `RESOURCE_CLI_*`.
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();
        let seed = match env::var("RESOURCE_CLI_SEED") {
            Ok(v) => parse_bool("RESOURCE_CLI_SEED", &v)?,
            Err(_) => true,
        };
        let format = match env::var("RESOURCE_CLI_FORMAT").map(|v| v.trim().to_lowercase()) {
            Ok(v) if v == "xml" => Format::Xml,
            Ok(v) if v == "json" || v.is_empty() => Format::Json,
            Ok(v) => return Err(ConfigError::InvalidValue { key: "RESOURCE_CLI_FORMAT", value: v }),
            Err(_) => Format::Json,
        };
        let roles = env::var("RESOURCE_CLI_ROLES").map(|v| parse_roles(&v))
                                                  .unwrap_or_else(|_| vec![ROLE_ADMIN.to_string()]);
        Ok(Self { seed, format, roles })
    }

    pub fn principal(&self) -> Principal {
        Principal::user("console", self.roles.clone())
    }
}

fn parse_bool(key: &'static str, raw: &str) -> Result<bool, ConfigError> {
    match raw.trim().to_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" | "" => Ok(false),
        _ => Err(ConfigError::InvalidValue { key, value: raw.to_string() }),
    }
}

fn parse_roles(raw: &str) -> Vec<String> {
    raw.split(',').map(str::trim).filter(|r| !r.is_empty()).map(str::to_string).collect()
}
