//! Command execution context
//!
//! Loads configuration, opens the resource store and builds the proxy so
//! command handlers don't repeat that setup.

use crate::cli::OutputFormat;
use crate::cli::args::GlobalOptions;
use crate::config::Config;
use crate::error::Result;
use crate::http::HttpFetcher;
use crate::proxy::Proxy;
use crate::store::ResourceStore;

/// Context for commands that talk to the network through the proxy
pub struct ProxyContext {
    pub proxy: Proxy<HttpFetcher>,
    pub format: OutputFormat,
}

impl ProxyContext {
    /// Load config and build a proxy over the live HTTP client.
    ///
    /// A store that fails to open is logged and left out; the proxy then
    /// runs uncached instead of failing the command.
    pub fn new(opts: &GlobalOptions) -> Result<Self> {
        let config = load_config(opts)?;
        let store = if opts.no_store {
            log::debug!("Resource store disabled by --no-store");
            None
        } else {
            match ResourceStore::open(&config) {
                Ok(store) => Some(store),
                Err(e) => {
                    log::warn!("Resource store unavailable, continuing uncached: {}", e);
                    None
                }
            }
        };
        let fetcher = HttpFetcher::new()?;

        Ok(Self {
            proxy: Proxy::new(config, fetcher, store),
            format: opts.format,
        })
    }

    pub fn config(&self) -> &Config {
        self.proxy.config()
    }
}

/// Load and validate the configuration the options point at
pub fn load_config(opts: &GlobalOptions) -> Result<Config> {
    let config = Config::load_at(opts.config_ref())?;
    config.validate()?;
    Ok(config)
}
