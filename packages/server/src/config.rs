//! Command-line and environment configuration for the server binary.

use clap::Parser;
use thiserror::Error;

use crate::domain::{AvatarRef, UserId, ValueObjectError};

/// Command-line arguments. Every flag can also be set from a `LOUNGE_*`
/// environment variable.
#[derive(Parser, Debug)]
#[command(name = "lounge-server")]
#[command(about = "Room presence and broadcast coordinator for Lounge chat", long_about = None)]
pub struct Args {
    /// Host address to bind the server to
    #[arg(short = 'H', long, env = "LOUNGE_HOST", default_value = "127.0.0.1")]
    pub host: String,

    /// Port number to bind the server to
    #[arg(short = 'p', long, env = "LOUNGE_PORT", default_value = "8080")]
    pub port: u16,

    /// Default log level (overridden by RUST_LOG)
    #[arg(long, env = "LOUNGE_LOG_LEVEL", default_value = "info")]
    pub log_level: String,

    /// Avatar shown for users without a profile
    #[arg(long, env = "LOUNGE_DEFAULT_AVATAR", default_value = "/media/default.jpg")]
    pub default_avatar: String,

    /// Known user avatar as USER_ID=AVATAR (repeatable; comma separated in the env var)
    #[arg(
        long = "profile",
        env = "LOUNGE_PROFILES",
        value_delimiter = ',',
        value_parser = parse_profile_pair
    )]
    pub profiles: Vec<(String, String)>,
}

fn parse_profile_pair(raw: &str) -> Result<(String, String), String> {
    match raw.split_once('=') {
        Some((user_id, avatar)) if !user_id.trim().is_empty() && !avatar.trim().is_empty() => {
            Ok((user_id.trim().to_string(), avatar.trim().to_string()))
        }
        _ => Err(format!("expected USER_ID=AVATAR, got '{raw}'")),
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("invalid default avatar: {0}")]
    DefaultAvatar(ValueObjectError),

    #[error("invalid profile for '{user_id}': {source}")]
    Profile {
        user_id: String,
        source: ValueObjectError,
    },
}

/// Validated server configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub log_level: String,
    pub default_avatar: AvatarRef,
    pub profiles: Vec<(UserId, AvatarRef)>,
}

impl TryFrom<Args> for ServerConfig {
    type Error = ConfigError;

    fn try_from(args: Args) -> Result<Self, Self::Error> {
        let default_avatar =
            AvatarRef::new(args.default_avatar).map_err(ConfigError::DefaultAvatar)?;

        let profiles = args
            .profiles
            .into_iter()
            .map(|(user_id, avatar)| {
                let to_error = |source| ConfigError::Profile {
                    user_id: user_id.clone(),
                    source,
                };
                let id = UserId::new(user_id.clone()).map_err(to_error)?;
                let avatar = AvatarRef::new(avatar).map_err(to_error)?;
                Ok((id, avatar))
            })
            .collect::<Result<Vec<_>, ConfigError>>()?;

        Ok(Self {
            host: args.host,
            port: args.port,
            log_level: args.log_level,
            default_avatar,
            profiles,
        })
    }
}
