//! Configuration validation.
//!
//! Validates configuration values and provides helpful error messages.

use crate::common::error::ConfigError;
use crate::config::types::Config;

/// Validate a configuration and return detailed errors.
pub fn validate_config(config: &Config) -> Result<(), ConfigError> {
    let mut errors = Vec::new();

    // Validate Matrix config
    if config.matrix.homeserver.is_empty() {
        errors.push("matrix.homeserver is required".to_string());
    } else if !config.matrix.homeserver.starts_with("http://")
        && !config.matrix.homeserver.starts_with("https://")
    {
        errors.push(format!(
            "matrix.homeserver must be an http(s) URL (got '{}')",
            config.matrix.homeserver
        ));
    }
    if config.matrix.user_id.is_empty() {
        errors.push("matrix.user_id is required".to_string());
    } else if !config.matrix.user_id.starts_with('@') {
        errors.push(format!(
            "matrix.user_id must be fully qualified, e.g. '@bridge:example.org' (got '{}')",
            config.matrix.user_id
        ));
    }
    if config.matrix.access_token.is_empty() {
        errors.push("matrix.access_token is required".to_string());
    }
    if config.matrix.access_token == "YOUR_ACCESS_TOKEN_HERE" {
        errors.push(
            "matrix.access_token has not been configured (still using placeholder)".to_string(),
        );
    }

    // Validate Delta config
    if config.delta.addr.is_empty() {
        errors.push("delta.addr is required".to_string());
    } else if !config.delta.addr.contains('@') {
        errors.push(format!(
            "delta.addr must be an email address (got '{}')",
            config.delta.addr
        ));
    }
    if config.delta.password.is_empty() {
        errors.push("delta.password is required".to_string());
    }

    // Validate relay tuning
    if config.queue_capacity() == 0 {
        errors.push("relay.queue_capacity must be non-zero".to_string());
    }
    if config.dedup_capacity() == 0 {
        errors.push("relay.dedup_capacity must be non-zero".to_string());
    }
    if config.cleanup_after_days() <= 0 {
        errors.push("relay.cleanup_after_days must be positive".to_string());
    }

    // Validate mapping seeds
    if let Some(ref rooms) = config.rooms {
        for (i, room) in rooms.iter().enumerate() {
            if room.matrix_room.is_empty() {
                errors.push(format!("rooms[{}].matrix_room is required", i));
            }
            if room.delta_group.is_empty() {
                errors.push(format!("rooms[{}].delta_group is required", i));
            }
        }
    }
    if let Some(ref users) = config.users {
        for (i, user) in users.iter().enumerate() {
            if user.matrix_user.is_empty() {
                errors.push(format!("users[{}].matrix_user is required", i));
            }
            if !user.delta_addr.contains('@') {
                errors.push(format!(
                    "users[{}].delta_addr must be an email address (got '{}')",
                    i, user.delta_addr
                ));
            }
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(ConfigError::ValidationError {
            message: errors.join("; "),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::parser::load_config_str;

    fn valid_config() -> Config {
        load_config_str(
            r#"
            matrix {
                homeserver = "https://matrix.example.org"
                user_id = "@bridge:example.org"
                access_token = "syt_secret"
            }
            delta {
                addr = "bridge@example.org"
                password = "hunter2"
            }
            "#,
        )
        .unwrap()
    }

    #[test]
    fn test_valid_config_passes() {
        assert!(validate_config(&valid_config()).is_ok());
    }

    #[test]
    fn test_bad_homeserver_rejected() {
        let mut config = valid_config();
        config.matrix.homeserver = "matrix.example.org".to_string();
        let err = validate_config(&config).unwrap_err();
        assert!(err.to_string().contains("matrix.homeserver"));
    }

    #[test]
    fn test_placeholder_token_rejected() {
        let mut config = valid_config();
        config.matrix.access_token = "YOUR_ACCESS_TOKEN_HERE".to_string();
        assert!(validate_config(&config).is_err());
    }

    #[test]
    fn test_non_email_delta_addr_rejected() {
        let mut config = valid_config();
        config.delta.addr = "not-an-address".to_string();
        let err = validate_config(&config).unwrap_err();
        assert!(err.to_string().contains("delta.addr"));
    }

    #[test]
    fn test_errors_are_aggregated() {
        let mut config = valid_config();
        config.matrix.user_id = "bridge".to_string();
        config.delta.password = String::new();
        let err = validate_config(&config).unwrap_err();
        let message = err.to_string();
        assert!(message.contains("matrix.user_id"));
        assert!(message.contains("delta.password"));
    }
}
