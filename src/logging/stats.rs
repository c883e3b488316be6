use crate::logging::attack_log::LogStream;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Instantánea de los contadores de ataque, un contador por stream.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SecurityStats {
    pub timestamp: DateTime<Utc>,
    pub login_attempts: u64,
    pub sql_injection_attempts: u64,
    pub xss_attempts: u64,
    pub path_traversal_attempts: u64,
    pub rate_limit_violations: u64,
}

/// Agregador de solo lectura sobre los logs de ataque.
///
/// No interpreta el contenido: cuenta líneas completas no vacías de cada
/// stream, y reporta 0 para los que todavía no existen.
pub struct SecurityStatsReporter {
    log_dir: PathBuf,
}

impl SecurityStatsReporter {
    pub fn new(log_dir: impl Into<PathBuf>) -> Self {
        Self {
            log_dir: log_dir.into(),
        }
    }

    /// Toma una instantánea de los cinco contadores.
    pub async fn snapshot(&self) -> SecurityStats {
        SecurityStats {
            timestamp: Utc::now(),
            login_attempts: self.count_lines(LogStream::LoginAttempts).await,
            sql_injection_attempts: self.count_lines(LogStream::SqlInjection).await,
            xss_attempts: self.count_lines(LogStream::Xss).await,
            path_traversal_attempts: self.count_lines(LogStream::PathTraversal).await,
            rate_limit_violations: self.count_lines(LogStream::RateLimit).await,
        }
    }

    async fn count_lines(&self, stream: LogStream) -> u64 {
        let path = self.log_dir.join(stream.file_name());

        match tokio::fs::read_to_string(&path).await {
            Ok(contents) => contents
                .lines()
                .filter(|line| !line.trim().is_empty())
                .count() as u64,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => 0,
            Err(e) => {
                tracing::warn!("No se pudo leer {}: {}", path.display(), e);
                0
            }
        }
    }
}
