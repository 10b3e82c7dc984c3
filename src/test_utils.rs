use crate::{config::Config, server::Server};

/// Test server builder backed by in-memory SQLite unless told otherwise
pub struct TestServerBuilder {
    config: Config,
    use_memory_db: bool,
}

impl TestServerBuilder {
    pub fn new() -> Self {
        Self {
            config: Config::default(),
            use_memory_db: true,
        }
    }

    /// Keep the configured database URL instead of in-memory SQLite
    pub fn with_real_database(mut self) -> Self {
        self.use_memory_db = false;
        self
    }

    /// Set a custom configuration
    pub fn with_config(mut self, config: Config) -> Self {
        self.config = config;
        self
    }

    /// Build the server and run migrations
    pub async fn build(self) -> Server {
        let mut config = self.config;

        if self.use_memory_db {
            config.database.url = "sqlite::memory:".to_string();
        }

        // The Prometheus recorder is process-global
        config.metrics.enabled = false;

        let server = Server::new(config).await.unwrap();
        server.database.migrate().await.unwrap();
        server
    }
}

impl Default for TestServerBuilder {
    fn default() -> Self {
        Self::new()
    }
}
