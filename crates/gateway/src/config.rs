use serde::Deserialize;

/// Base URL for every downstream service the gateway fronts.
///
/// Per spec.md §4.1 the gateway performs no business logic of its own: it
/// routes by path prefix, forwards the `Authorization` header unmodified
/// (downstream services validate the token themselves), and reverse-proxies
/// the teaching WebSocket channel to conversation.
#[derive(Debug, Clone, Deserialize)]
pub struct GatewayConfig {
    #[serde(default = "default_bind")]
    pub bind: String,
    #[serde(default = "default_port")]
    pub port: u16,
    pub auth_url: String,
    pub ingestion_url: String,
    pub lesson_url: String,
    pub visualization_url: String,
    pub quiz_url: String,
    pub conversation_url: String,
}

fn default_bind() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8080
}

impl GatewayConfig {
    pub fn load() -> lumen_core::Result<Self> {
        lumen_core::config::load("LUMEN_GATEWAY", None, "gateway.toml")
    }

    /// Resolve the upstream base URL for a given routed service name.
    pub fn upstream(&self, service: &str) -> Option<&str> {
        match service {
            "auth" => Some(&self.auth_url),
            "ingestion" => Some(&self.ingestion_url),
            "lesson" => Some(&self.lesson_url),
            "visualization" => Some(&self.visualization_url),
            "quiz" => Some(&self.quiz_url),
            "conversation" => Some(&self.conversation_url),
            _ => None,
        }
    }
}
