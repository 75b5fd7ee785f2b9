/**
 * Server Configuration
 *
 * This module loads server configuration from environment variables, with
 * sensible defaults for local development.
 *
 * # Configuration Sources
 *
 * - `SERVER_PORT` - TCP port to bind (default 3000)
 * - `HOUSEKEEPING_INTERVAL_SECS` - period of the gauge-logging task
 *   (default 300)
 *
 * # Error Handling
 *
 * Malformed values are logged and replaced by the default; configuration
 * never prevents server startup.
 */

use std::net::SocketAddr;
use std::time::Duration;

const DEFAULT_PORT: u16 = 3000;
const DEFAULT_HOUSEKEEPING_SECS: u64 = 300;

/// Runtime configuration of the coordinator server.
#[derive(Debug, Clone)]
pub struct CoordinatorConfig {
    /// TCP port the server binds on all interfaces
    pub port: u16,
    /// Period of the housekeeping task that logs coordinator gauges
    pub housekeeping_interval: Duration,
}

impl CoordinatorConfig {
    /// Load configuration from the environment.
    pub fn load() -> Self {
        let port = env_parse("SERVER_PORT", DEFAULT_PORT);
        let housekeeping_secs =
            env_parse("HOUSEKEEPING_INTERVAL_SECS", DEFAULT_HOUSEKEEPING_SECS);
        Self {
            port,
            housekeeping_interval: Duration::from_secs(housekeeping_secs),
        }
    }

    /// Address to bind: all interfaces on the configured port.
    pub fn socket_addr(&self) -> SocketAddr {
        SocketAddr::from(([0, 0, 0, 0], self.port))
    }
}

impl Default for CoordinatorConfig {
    fn default() -> Self {
        Self {
            port: DEFAULT_PORT,
            housekeeping_interval: Duration::from_secs(DEFAULT_HOUSEKEEPING_SECS),
        }
    }
}

fn env_parse<T: std::str::FromStr + std::fmt::Display>(name: &str, default: T) -> T {
    match std::env::var(name) {
        Ok(raw) => match raw.parse() {
            Ok(value) => value,
            Err(_) => {
                tracing::warn!(
                    "Invalid {} value '{}', falling back to {}",
                    name,
                    raw,
                    default
                );
                default
            }
        },
        Err(_) => default,
    }
}
