//! Command-line arguments for the presenter daemon
//!
//! Every option can also be set through a `PRESENTER_*` environment variable.

use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;

use clap::Parser;

use crate::paths::{default_data_dir, AppPaths};

/// Presenter state server
#[derive(Parser, Debug, Clone)]
#[command(name = "presenter-daemon")]
#[command(about = "Keeps Shabad and Bani displays in sync over WebSocket")]
#[command(version)]
pub struct Args {
    /// Address to bind both listeners to
    #[arg(long, env = "PRESENTER_HOST", default_value = "0.0.0.0")]
    pub host: IpAddr,

    /// WebSocket port
    #[arg(short, long, env = "PRESENTER_PORT", default_value_t = 1699)]
    pub port: u16,

    /// HTTP API port
    #[arg(long, env = "PRESENTER_HTTP_PORT", default_value_t = 1700)]
    pub http_port: u16,

    /// Data folder for settings, history, logs and user themes
    #[arg(long, env = "PRESENTER_DATA_DIR")]
    pub data_dir: Option<PathBuf>,

    /// Corpus database [default: <data-dir>/database.sqlite]
    #[arg(long, env = "PRESENTER_DATABASE")]
    pub database: Option<PathBuf>,

    /// Bundled themes folder [default: <data-dir>/themes/bundled]
    #[arg(long, env = "PRESENTER_THEMES_DIR")]
    pub themes_dir: Option<PathBuf>,

    /// Talk to a supervising process over stdout/stdin
    #[arg(long, env = "PRESENTER_IPC")]
    pub ipc: bool,
}

impl Args {
    pub fn data_dir(&self) -> PathBuf {
        self.data_dir.clone().unwrap_or_else(default_data_dir)
    }

    pub fn database(&self) -> PathBuf {
        self.database
            .clone()
            .unwrap_or_else(|| self.data_dir().join("database.sqlite"))
    }

    pub fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }

    pub fn http_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.http_port)
    }

    /// Folder layout for this run
    pub fn paths(&self, started_at: chrono::DateTime<chrono::Utc>) -> AppPaths {
        let paths = AppPaths::new(self.data_dir(), started_at);
        match &self.themes_dir {
            Some(dir) => paths.with_bundled_themes(dir.clone()),
            None => paths,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let args = Args::try_parse_from(["presenter-daemon", "--data-dir", "/srv/presenter"]).unwrap();

        assert_eq!(args.socket_addr(), "0.0.0.0:1699".parse().unwrap());
        assert_eq!(args.http_addr(), "0.0.0.0:1700".parse().unwrap());
        assert_eq!(args.database(), PathBuf::from("/srv/presenter/database.sqlite"));
        assert!(!args.ipc);
    }

    #[test]
    fn test_themes_override() {
        let args = Args::try_parse_from([
            "presenter-daemon",
            "--data-dir",
            "/srv/presenter",
            "--themes-dir",
            "/opt/themes",
            "--port",
            "8080",
        ])
        .unwrap();

        let paths = args.paths(chrono::Utc::now());
        assert_eq!(paths.bundled_themes_dir, PathBuf::from("/opt/themes"));
        assert_eq!(args.port, 8080);
    }
}
