use std::path::PathBuf;

use clap::Parser;

use crate::rooms::EchoPolicy;

/// Room based chat relay
#[derive(Parser, Clone, Debug)]
#[command(name = "roomrelay", version, about = "Room based chat relay")]
pub struct Config {
    /// Port to listen on
    #[arg(long, env = "RELAY_PORT", default_value_t = 3005)]
    pub port: u16,

    /// Bind address
    #[arg(long, env = "RELAY_BIND_ADDRESS", default_value = "0.0.0.0")]
    pub bind_address: String,

    /// Snapshot file holding every room's history
    #[arg(long = "store", env = "RELAY_STORE", default_value = "./messages.json")]
    pub store_path: PathBuf,

    /// Whether senders receive their own messages
    #[arg(long, env = "RELAY_ECHO", value_enum, default_value_t = EchoPolicy::Include)]
    pub echo: EchoPolicy,

    /// Structured JSON logs
    #[arg(long, env = "RELAY_JSON_LOGS")]
    pub json_logs: bool,
}

impl Config {
    /// `.env` first, then the real environment and the command line.
    pub fn load() -> Self {
        dotenv::dotenv().ok();
        Self::parse()
    }

    pub fn addr(&self) -> String {
        format!("{}:{}", self.bind_address, self.port)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let config = Config::try_parse_from(["roomrelay"]).unwrap();

        assert_eq!(config.port, 3005);
        assert_eq!(config.addr(), "0.0.0.0:3005");
        assert_eq!(config.store_path, PathBuf::from("./messages.json"));
        assert_eq!(config.echo, EchoPolicy::Include);
    }

    #[test]
    fn flags_override_defaults() {
        let config = Config::try_parse_from([
            "roomrelay", "--port", "4000", "--store", "/tmp/chat.json", "--echo", "exclude",
        ]).unwrap();

        assert_eq!(config.port, 4000);
        assert_eq!(config.store_path, PathBuf::from("/tmp/chat.json"));
        assert_eq!(config.echo, EchoPolicy::Exclude);
    }
}
