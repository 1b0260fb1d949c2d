use serde::Deserialize;

#[derive(Debug, Deserialize)]
pub struct AgentConfig {
    /// Source tag attached to every data point.
    pub agent_id: String,
    /// Directory holding the `stat` counter source.
    #[serde(default = "default_proc_path")]
    pub proc_path: String,
    #[serde(default = "default_collection_interval")]
    pub collection_interval_secs: u64,
    /// Namespaces to collect. Empty means the full catalog.
    #[serde(default)]
    pub metrics: Vec<String>,
}

fn default_proc_path() -> String {
    "/proc".to_string()
}

fn default_collection_interval() -> u64 {
    10
}

impl AgentConfig {
    pub fn load(path: &str) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml(&content)
    }

    pub fn from_toml(content: &str) -> anyhow::Result<Self> {
        let config: Self = toml::from_str(content)?;
        if config.collection_interval_secs == 0 {
            anyhow::bail!("collection_interval_secs must be greater than zero");
        }
        Ok(config)
    }
}
