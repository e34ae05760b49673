use clap::Parser;
use serde::Serialize;
use std::time::Duration;
use thiserror::Error;

pub const DEFAULT_REGISTRY_URL: &str = "https://index.docker.io/v1/";

/// Command line / environment settings. Flags win over environment variables.
#[derive(Debug, Clone, Parser)]
#[command(name = "imagehook")]
#[command(about = "Pull a fresh image on webhook and recreate the containers running it")]
#[command(version)]
pub struct CliArgs {
    /// Shared secret expected in the `token` form field
    #[arg(long, env = "TOKEN", hide_env_values = true)]
    pub token: Option<String>,

    /// Address to bind
    #[arg(short = 'H', long, env = "HOST", default_value = "0.0.0.0")]
    pub host: String,

    /// Port to listen on
    #[arg(short, long, env = "PORT", default_value_t = 8080)]
    pub port: u16,

    /// Enable debug logging
    #[arg(long, env = "DEBUG")]
    pub debug: bool,

    #[arg(long, env = "REGISTRY_USERNAME")]
    pub registry_username: Option<String>,

    #[arg(long, env = "REGISTRY_PASSWORD", hide_env_values = true)]
    pub registry_password: Option<String>,

    #[arg(long, env = "REGISTRY_URL", default_value = DEFAULT_REGISTRY_URL)]
    pub registry_url: String,

    /// Docker daemon socket (unix path or unix:// URL)
    #[arg(long, env = "DOCKER_SOCKET", default_value = "/var/run/docker.sock")]
    pub docker_socket: String,

    /// Seconds a container gets to stop before the daemon kills it
    #[arg(long, env = "STOP_TIMEOUT", default_value_t = 30)]
    pub stop_timeout: u64,

    /// How many containers to recreate at once
    #[arg(long, env = "PARALLELISM", default_value_t = 1)]
    pub parallelism: usize,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Missing TOKEN env variable")]
    MissingToken,
    #[error("REGISTRY_USERNAME and REGISTRY_PASSWORD must be set together")]
    IncompleteRegistryCredentials,
    #[error("parallelism must be at least 1")]
    InvalidParallelism,
}

#[derive(Debug, Clone, Serialize)]
pub struct Config {
    pub version: String,
    pub server: ServerConfig,
    pub authorization: AuthorizationConfig,
    pub registry: Option<RegistryCredentials>,
    pub docker: DockerConfig,
    pub update: UpdateConfig,
}

#[derive(Debug, Clone, Serialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub debug: bool,
}

#[derive(Clone, Serialize)]
pub struct AuthorizationConfig {
    #[serde(skip_serializing)]
    pub token: String,
}

impl std::fmt::Debug for AuthorizationConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthorizationConfig")
            .field("token", &"<redacted>")
            .finish()
    }
}

#[derive(Clone, Serialize)]
pub struct RegistryCredentials {
    pub username: String,
    #[serde(skip_serializing)]
    pub password: String,
    pub server_address: String,
}

impl std::fmt::Debug for RegistryCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RegistryCredentials")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .field("server_address", &self.server_address)
            .finish()
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct DockerConfig {
    pub socket_path: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct UpdateConfig {
    pub stop_timeout_secs: u64,
    pub parallelism: usize,
}

impl UpdateConfig {
    pub fn stop_grace(&self) -> Duration {
        Duration::from_secs(self.stop_timeout_secs)
    }
}

impl Config {
    pub fn from_args(args: CliArgs) -> Result<Self, ConfigError> {
        let token = args
            .token
            .filter(|t| !t.is_empty())
            .ok_or(ConfigError::MissingToken)?;

        let registry = match (
            args.registry_username.filter(|u| !u.is_empty()),
            args.registry_password.filter(|p| !p.is_empty()),
        ) {
            (Some(username), Some(password)) => Some(RegistryCredentials {
                username,
                password,
                server_address: args.registry_url,
            }),
            (None, None) => None,
            _ => return Err(ConfigError::IncompleteRegistryCredentials),
        };

        if args.parallelism == 0 {
            return Err(ConfigError::InvalidParallelism);
        }

        Ok(Self {
            version: env!("CARGO_PKG_VERSION").to_string(),
            server: ServerConfig {
                host: args.host,
                port: args.port,
                debug: args.debug,
            },
            authorization: AuthorizationConfig { token },
            registry,
            docker: DockerConfig {
                socket_path: args.docker_socket,
            },
            update: UpdateConfig {
                stop_timeout_secs: args.stop_timeout,
                parallelism: args.parallelism,
            },
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> CliArgs {
        let mut argv = vec!["imagehook"];
        argv.extend_from_slice(args);
        CliArgs::try_parse_from(argv).unwrap()
    }

    #[test]
    fn defaults_apply() {
        let config = Config::from_args(parse(&["--token", "s3cret"])).unwrap();
        assert_eq!(config.authorization.token, "s3cret");
        assert_eq!(config.update.stop_grace(), Duration::from_secs(30));
        assert_eq!(config.update.parallelism, 1);
        assert!(config.registry.is_none());
    }

    #[test]
    fn empty_token_is_rejected() {
        let err = Config::from_args(parse(&["--token", ""])).unwrap_err();
        assert_eq!(err, ConfigError::MissingToken);
    }

    #[test]
    fn registry_credentials_need_both_parts() {
        let err = Config::from_args(parse(&["--token", "t", "--registry-username", "ci"]))
            .unwrap_err();
        assert_eq!(err, ConfigError::IncompleteRegistryCredentials);

        let config = Config::from_args(parse(&[
            "--token",
            "t",
            "--registry-username",
            "ci",
            "--registry-password",
            "pw",
            "--registry-url",
            "registry.local:5000",
        ]))
        .unwrap();
        let registry = config.registry.unwrap();
        assert_eq!(registry.server_address, "registry.local:5000");
    }

    #[test]
    fn serialized_config_hides_secrets() {
        let config = Config::from_args(parse(&[
            "--token",
            "s3cret",
            "--registry-username",
            "ci",
            "--registry-password",
            "hunter2",
        ]))
        .unwrap();
        let json = serde_json::to_string(&config).unwrap();
        assert!(!json.contains("s3cret"));
        assert!(!json.contains("hunter2"));
        assert!(json.contains("\"username\":\"ci\""));
    }
}
