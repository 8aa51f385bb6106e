/// Usable connection slots when `BOUNCER_MAX_CONNECTIONS` is unset: one
/// event-table entry out of 1024 is reserved for the listener.
const DEFAULT_MAX_CONNECTIONS: usize = 1023;

#[derive(Clone)]
pub struct Config {
    pub listen_addr: String,
    pub hostname: String,
    pub max_connections: usize,
}

impl Config {
    pub fn load() -> Self {
        let listen_addr =
            std::env::var("BOUNCER_LISTEN")
                .unwrap_or_else(|_| "127.0.0.1:10025".to_string());
        let hostname =
            std::env::var("BOUNCER_HOSTNAME")
                .unwrap_or_else(|_| "localhost.localdomain".to_string());
        let max_connections =
            std::env::var("BOUNCER_MAX_CONNECTIONS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(DEFAULT_MAX_CONNECTIONS);
        Self { listen_addr, hostname, max_connections }
    }
}
