use std::sync::Arc;

use crate::clock::{Clock, SystemClock};
use crate::config::Config;
use crate::vfs::{LocalFs, MemFs, Vfs};

/// Everything an array session needs from its environment: configuration,
/// the filesystem and the clock. Cheap to clone.
#[derive(Clone)]
pub struct Context {
    config: Arc<Config>,
    vfs: Arc<dyn Vfs>,
    clock: Arc<dyn Clock>,
}

impl Context {
    /// Local filesystem, wall clock, default config.
    pub fn local() -> Self {
        Self::from_config(Config::default())
    }

    /// Local filesystem and wall clock with the given config.
    pub fn from_config(config: Config) -> Self {
        let vfs = Arc::new(LocalFs::new(config.sync_on_write));
        ContextBuilder::new().config(config).vfs(vfs).build()
    }

    /// Fresh in-memory filesystem, wall clock.
    pub fn in_memory() -> Self {
        ContextBuilder::new().vfs(Arc::new(MemFs::new())).build()
    }

    pub fn builder() -> ContextBuilder {
        ContextBuilder::new()
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn vfs(&self) -> &dyn Vfs {
        self.vfs.as_ref()
    }

    pub fn now_ms(&self) -> u64 {
        self.clock.now_ms()
    }
}

/// Builder for [`Context`]. Unset parts fall back to the local filesystem,
/// the system clock and the default config.
#[derive(Default)]
pub struct ContextBuilder {
    config: Option<Config>,
    vfs: Option<Arc<dyn Vfs>>,
    clock: Option<Arc<dyn Clock>>,
}

impl ContextBuilder {
    pub fn new() -> Self {
        ContextBuilder::default()
    }

    pub fn config(mut self, config: Config) -> Self {
        self.config = Some(config);
        self
    }

    pub fn vfs(mut self, vfs: Arc<dyn Vfs>) -> Self {
        self.vfs = Some(vfs);
        self
    }

    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = Some(clock);
        self
    }

    pub fn build(self) -> Context {
        let config = self.config.unwrap_or_default();
        let vfs: Arc<dyn Vfs> = match self.vfs {
            Some(vfs) => vfs,
            None => Arc::new(LocalFs::new(config.sync_on_write)),
        };
        let clock: Arc<dyn Clock> = match self.clock {
            Some(clock) => clock,
            None => Arc::new(SystemClock),
        };
        Context {
            config: Arc::new(config),
            vfs,
            clock,
        }
    }
}
