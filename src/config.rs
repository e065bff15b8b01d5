use std::time::Duration;

use serde::de::DeserializeOwned;
use serde::Deserialize;

pub use config::ConfigError;

pub trait EnvConfig: Sized {
    fn from_env() -> Result<Self, ConfigError>;
    fn from_env_with_prefix(prefix: &str) -> Result<Self, ConfigError>;
}

impl<D> EnvConfig for D
where
    D: DeserializeOwned,
{
    fn from_env() -> Result<Self, ConfigError> {
        let c = config::Config::builder()
            .add_source(config::Environment::default())
            .build()
            .expect("basic config builder");
        c.try_deserialize()
    }

    fn from_env_with_prefix(prefix: &str) -> Result<Self, ConfigError> {
        let c = config::Config::builder()
            .add_source(config::Environment::with_prefix(prefix))
            .build()
            .expect("basic config builder");
        c.try_deserialize()
    }
}

/// Tunables for job execution.
///
/// Loadable from the environment via [`EnvConfig`]:
///
/// ```ignore
/// let config = DispatcherConfig::from_env_with_prefix("CERTMAIL")?;
/// ```
#[derive(Debug, Clone, Deserialize)]
pub struct DispatcherConfig {
    /// Delay between consecutive send attempts within a job, in
    /// milliseconds (default: 1000). Third-party SMTP relays throttle
    /// bursty senders; the interval applies after failures too.
    #[serde(default = "default_pacing_ms")]
    pub pacing_ms: u64,

    /// Upper bound on a single send attempt, in seconds (default: 20).
    /// A timed-out attempt counts as a failed recipient.
    #[serde(default = "default_send_timeout_secs")]
    pub send_timeout_secs: u64,

    /// Attempts for each counter/status/log persistence write before the
    /// job is surfaced as failed (default: 3).
    #[serde(default = "default_store_retries")]
    pub store_retries: u32,
}

fn default_pacing_ms() -> u64 {
    1000
}

fn default_send_timeout_secs() -> u64 {
    20
}

fn default_store_retries() -> u32 {
    3
}

impl Default for DispatcherConfig {
    fn default() -> Self {
        Self {
            pacing_ms: default_pacing_ms(),
            send_timeout_secs: default_send_timeout_secs(),
            store_retries: default_store_retries(),
        }
    }
}

impl DispatcherConfig {
    /// Pacing interval between consecutive send attempts.
    pub fn pacing(&self) -> Duration {
        Duration::from_millis(self.pacing_ms)
    }

    /// Timeout applied to each individual send attempt.
    pub fn send_timeout(&self) -> Duration {
        Duration::from_secs(self.send_timeout_secs)
    }
}
