use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};

use agent_core::{LlmTextInterface, SearchBackend, ToolDispatcher};
use marketscout_cli::llm::{OpenAiConfig, OpenAiTextClient};
use marketscout_cli::{Config, DetachedBrowser, SerperBackend};

pub struct CliContext {
    config: Arc<Config>,
    config_path: PathBuf,
}

impl CliContext {
    pub fn new(config: Config, config_path: PathBuf) -> Self {
        Self {
            config: Arc::new(config),
            config_path,
        }
    }

    pub fn config(&self) -> &Config {
        self.config.as_ref()
    }

    pub fn config_path(&self) -> &Path {
        &self.config_path
    }

    pub fn search_backend(&self) -> Result<Option<Arc<dyn SearchBackend>>> {
        let backend = SerperBackend::from_settings(&self.config.search)
            .context("Failed to configure the web search client")?;
        Ok(backend.map(|backend| Arc::new(backend) as Arc<dyn SearchBackend>))
    }

    /// Dispatcher with no page attached: page tools fail per call,
    /// external search runs live when a key is configured.
    pub fn dispatcher(&self) -> Result<ToolDispatcher> {
        let browser = Arc::new(DetachedBrowser);
        let mut dispatcher =
            ToolDispatcher::new(browser.clone(), browser, self.config.engine.clone());
        if let Some(backend) = self.search_backend()? {
            dispatcher = dispatcher.with_search_backend(backend);
        }
        Ok(dispatcher)
    }

    pub fn llm(&self) -> Result<Arc<dyn LlmTextInterface>> {
        let config = OpenAiConfig::from_settings(&self.config.llm, self.config.engine.llm_timeout());
        let client = OpenAiTextClient::new(config).context("Failed to configure the LLM client")?;
        Ok(Arc::new(client))
    }
}
