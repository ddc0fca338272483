use serde::{Deserialize, Serialize};
use serde_inline_default::serde_inline_default;
use std::path::PathBuf;
use std::time::Duration;

#[serde_inline_default]
#[derive(Deserialize, Serialize, Debug, PartialEq, Eq, Clone)]
pub struct ClientConfig {
    /// Optional per-call deadline. Off by default: a pending call then only
    /// resolves early when the connection becomes unhealthy.
    #[serde_inline_default(None)]
    #[serde(with = "humantime_serde")]
    pub call_timeout: Option<Duration>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        serde_json::from_value(serde_json::Value::Object(serde_json::Map::default())).unwrap()
    }
}

#[serde_inline_default]
#[derive(Deserialize, Serialize, Debug, PartialEq, Eq, Clone)]
pub struct SshConfig {
    /// Port used when the ssh:// URI does not carry one.
    #[serde_inline_default(22)]
    pub default_port: u16,

    /// Private key used when the URI carries no password.
    /// Defaults to `~/.ssh/id_ed25519`.
    #[serde_inline_default(None)]
    pub key_path: Option<PathBuf>,

    #[serde_inline_default(Duration::from_secs(10))]
    #[serde(with = "humantime_serde")]
    pub connect_timeout: Duration,
}

impl Default for SshConfig {
    fn default() -> Self {
        serde_json::from_value(serde_json::Value::Object(serde_json::Map::default())).unwrap()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let client = ClientConfig::default();
        assert_eq!(client.call_timeout, None);

        let ssh = SshConfig::default();
        assert_eq!(ssh.default_port, 22);
        assert_eq!(ssh.key_path, None);
        assert_eq!(ssh.connect_timeout, Duration::from_secs(10));
    }

    #[test]
    fn test_config_from_json() {
        let client: ClientConfig =
            serde_json::from_str(r#"{"call_timeout": "2s 500ms"}"#).unwrap();
        assert_eq!(client.call_timeout, Some(Duration::from_millis(2500)));
    }
}
