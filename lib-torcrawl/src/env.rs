use std::env;

/// Process environment relevant to torcrawl. Loaded once at startup and
/// passed through constructors; nothing here is a module-level singleton.
#[derive(Debug, Clone)]
pub struct Env {
    pub socks5_host: String,
    pub socks5_port: u16,
    pub use_tor: bool,
    pub debug: bool,
}

impl Default for Env {
    fn default() -> Env {
        Env {
            socks5_host: "127.0.0.1".to_owned(),
            socks5_port: 9050,
            use_tor: true,
            debug: false,
        }
    }
}

impl Env {
    /// Reads `SOCKS5_HOST`, `SOCKS5_PORT`, `USE_TOR` and `DEBUG`, with a
    /// best-effort `.env` load first. A missing `.env` is not an error.
    pub fn load() -> Env {
        dotenv::dotenv().ok();

        let defaults = Env::default();

        let socks5_host = env::var("SOCKS5_HOST")
            .ok()
            .filter(|host| !host.is_empty())
            .unwrap_or(defaults.socks5_host);
        let socks5_port = env::var("SOCKS5_PORT")
            .ok()
            .and_then(|port| port.parse().ok())
            .unwrap_or(defaults.socks5_port);

        // Tor stays on unless explicitly switched off.
        let use_tor = !matches!(
            env::var("USE_TOR").as_deref().map(str::trim),
            Ok(setting) if setting.eq_ignore_ascii_case("false")
        );
        let is_debug = matches!(
            env::var("DEBUG").as_deref().map(str::trim),
            Ok(setting) if setting.eq_ignore_ascii_case("true")
        );

        Env {
            socks5_host,
            socks5_port,
            use_tor,
            debug: is_debug,
        }
    }
}
