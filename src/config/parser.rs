//! Configuration file parsing (HOCON format).

use std::path::Path;

use crate::common::error::ConfigError;
use crate::config::types::Config;
use hocon::HoconLoader;

/// Load configuration from a HOCON file.
pub fn load_config(path: impl AsRef<Path>) -> Result<Config, ConfigError> {
    let path = path.as_ref();

    HoconLoader::new()
        .load_file(path)
        .map_err(|e| ConfigError::IoError {
            path: path.display().to_string(),
            source: std::io::Error::new(std::io::ErrorKind::Other, e.to_string()),
        })?
        .resolve()
        .map_err(|e| ConfigError::ParseError {
            message: e.to_string(),
        })
}

/// Load configuration from a HOCON string.
pub fn load_config_str(content: &str) -> Result<Config, ConfigError> {
    HoconLoader::new()
        .load_str(content)
        .map_err(|e| ConfigError::ParseError {
            message: e.to_string(),
        })?
        .resolve()
        .map_err(|e| ConfigError::ParseError {
            message: e.to_string(),
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"
        matrix {
            homeserver = "https://matrix.example.org"
            user_id = "@bridge:example.org"
            access_token = "syt_secret"
        }
        delta {
            addr = "bridge@example.org"
            password = "hunter2"
        }
        relay {
            queue_capacity = 500
        }
        rooms = [
            {
                matrix_room = "!general:example.org"
                delta_group = "grp-general"
                bidirectional = true
            }
        ]
        users = [
            {
                matrix_user = "@alice:example.org"
                matrix_name = "alice"
                delta_addr = "alice@example.org"
            }
        ]
    "#;

    #[test]
    fn test_parse_sample_config() {
        let config = load_config_str(SAMPLE).expect("sample config should parse");
        assert_eq!(config.matrix.user_id, "@bridge:example.org");
        assert_eq!(config.delta.addr, "bridge@example.org");
        assert_eq!(config.queue_capacity(), 500);

        let rooms = config.room_mappings();
        assert_eq!(rooms.len(), 1);
        assert_eq!(rooms[0].matrix_room_id, "!general:example.org");
        assert!(rooms[0].bidirectional);
        // Name falls back to the id when not given.
        assert_eq!(rooms[0].matrix_room_name, "!general:example.org");

        let users = config.user_mappings();
        assert_eq!(users.len(), 1);
        assert_eq!(users[0].matrix_display_name, "alice");
        assert!(!users[0].superseded);
    }

    #[test]
    fn test_defaults_applied_when_sections_missing() {
        let minimal = r#"
            matrix {
                homeserver = "https://matrix.example.org"
                user_id = "@bridge:example.org"
                access_token = "syt_secret"
            }
            delta {
                addr = "bridge@example.org"
                password = "hunter2"
            }
        "#;
        let config = load_config_str(minimal).expect("minimal config should parse");
        assert_eq!(config.queue_capacity(), crate::config::types::DEFAULT_QUEUE_CAPACITY);
        assert_eq!(config.dedup_capacity(), crate::config::types::DEFAULT_DEDUP_CAPACITY);
        assert!(config.room_mappings().is_empty());
        assert!(config.user_mappings().is_empty());
    }

    #[test]
    fn test_malformed_config_is_an_error() {
        assert!(load_config_str("matrix { homeserver = ").is_err());
    }
}
