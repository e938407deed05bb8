use serde::{Deserialize, Serialize};

pub const DEFAULT_BASE_URL: &str = "https://quipubase.online";

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ClientConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Event subscription transport: "auto", "push" (SSE) or "pull" (chunked body)
    #[serde(default)]
    pub transport: TransportMode,

    #[serde(default)]
    pub insecure_skip_verify: bool,

    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

#[derive(Debug, Clone, Copy, Deserialize, Serialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum TransportMode {
    /// Resolved once when the client is constructed
    #[default]
    Auto,
    Push,
    Pull,
}

fn default_base_url() -> String {
    DEFAULT_BASE_URL.to_string()
}

fn default_user_agent() -> String {
    "quipubase-rs".to_string()
}

impl ClientConfig {
    pub fn load(path: &str) -> anyhow::Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        let config: ClientConfig = serde_json::from_str(&contents)?;
        Ok(config)
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn with_transport(mut self, transport: TransportMode) -> Self {
        self.transport = transport;
        self
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            transport: TransportMode::default(),
            insecure_skip_verify: false,
            user_agent: default_user_agent(),
        }
    }
}
