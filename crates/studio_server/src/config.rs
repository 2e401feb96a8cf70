use std::path::PathBuf;

pub const DEFAULT_HOST: &str = "0.0.0.0";
pub const DEFAULT_PORT: u16 = 3000;
pub const DEFAULT_STATIC_DIR: &str = "public";

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid value for {name}: {value}")]
pub struct ServerConfigError {
    pub name: &'static str,
    pub value: String,
}

/// Where the server listens and which directory it serves the page from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub static_dir: PathBuf,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
            static_dir: PathBuf::from(DEFAULT_STATIC_DIR),
        }
    }
}

impl ServerConfig {
    pub fn from_env() -> Result<Self, ServerConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ServerConfigError> {
        let var = |name: &str| lookup(name).filter(|value| !value.trim().is_empty());
        let mut config = Self::default();

        if let Some(host) = var("HOST") {
            config.host = host;
        }
        if let Some(port) = var("PORT") {
            config.port = port.trim().parse().map_err(|_| ServerConfigError {
                name: "PORT",
                value: port.clone(),
            })?;
        }
        if let Some(dir) = var("STATIC_DIR") {
            config.static_dir = PathBuf::from(dir);
        }
        Ok(config)
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_listen_on_port_3000() {
        let config = ServerConfig::from_lookup(|_| None).unwrap();
        assert_eq!(config, ServerConfig::default());
        assert_eq!(config.bind_address(), "0.0.0.0:3000");
    }

    #[test]
    fn environment_overrides_defaults() {
        let config = ServerConfig::from_lookup(|name| match name {
            "HOST" => Some("127.0.0.1".into()),
            "PORT" => Some("8080".into()),
            "STATIC_DIR" => Some("site".into()),
            _ => None,
        })
        .unwrap();
        assert_eq!(config.bind_address(), "127.0.0.1:8080");
        assert_eq!(config.static_dir, PathBuf::from("site"));
    }

    #[test]
    fn bad_port_is_rejected() {
        let err = ServerConfig::from_lookup(|name| (name == "PORT").then(|| "http".to_string()))
            .unwrap_err();
        assert_eq!(err.name, "PORT");
    }
}
