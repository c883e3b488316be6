use crate::logging::events::{AccessLogEntry, AttackEvent, LoginAttemptEntry};
use serde::Serialize;
use std::path::{Path, PathBuf};
use tokio::fs::OpenOptions;
use tokio::io::AsyncWriteExt;
use tokio::sync::{mpsc, oneshot};

/// Streams append-only del honeypot, un archivo por categoría.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LogStream {
    Access,
    LoginAttempts,
    SqlInjection,
    Xss,
    PathTraversal,
    RateLimit,
}

impl LogStream {
    /// Los cinco streams que cuenta el reporter de estadísticas.
    pub const ATTACK_STREAMS: [LogStream; 5] = [
        LogStream::LoginAttempts,
        LogStream::SqlInjection,
        LogStream::Xss,
        LogStream::PathTraversal,
        LogStream::RateLimit,
    ];

    pub fn file_name(&self) -> &'static str {
        match self {
            LogStream::Access => "access.log",
            LogStream::LoginAttempts => "login_attempts.log",
            LogStream::SqlInjection => "sql_injection_attempts.log",
            LogStream::Xss => "xss_attempts.log",
            LogStream::PathTraversal => "path_traversal_attempts.log",
            LogStream::RateLimit => "rate_limit_attacks.log",
        }
    }
}

enum LogCommand {
    Append { stream: LogStream, line: String },
    Flush(oneshot::Sender<()>),
}

/// Sink de eventos de seguridad.
///
/// Los productores encolan líneas ya serializadas en un canal sin límite y
/// una única tarea de escritura posee los archivos: cada línea se escribe
/// entera y en orden de llegada dentro de su stream, y una escritura lenta
/// nunca bloquea el camino de la respuesta. Si una escritura falla se
/// registra el error y se descarta la línea; la petición que la originó no
/// se ve afectada.
#[derive(Clone)]
pub struct AttackLogger {
    sender: mpsc::UnboundedSender<LogCommand>,
    log_dir: PathBuf,
}

impl AttackLogger {
    /// Crea el logger y lanza la tarea de escritura en background.
    pub fn new(log_dir: impl Into<PathBuf>) -> Self {
        let log_dir = log_dir.into();
        let (sender, receiver) = mpsc::unbounded_channel();

        tokio::spawn(writer_task(log_dir.clone(), receiver));

        Self { sender, log_dir }
    }

    pub fn log_dir(&self) -> &Path {
        &self.log_dir
    }

    /// Encola una entrada del log de accesos.
    pub fn record_access(&self, entry: &AccessLogEntry) {
        self.enqueue(LogStream::Access, entry);
    }

    /// Encola el registro completo de un intento de login.
    pub fn record_login_attempt(&self, entry: &LoginAttemptEntry) {
        self.enqueue(LogStream::LoginAttempts, entry);
    }

    /// Encola un evento de ataque en el stream que le corresponde.
    pub fn record_attack(&self, event: &AttackEvent) {
        self.enqueue(event.stream(), event);
    }

    /// Espera a que la tarea de escritura drene todo lo encolado hasta
    /// ahora. Pensado para el apagado ordenado y para los tests.
    pub async fn flush(&self) {
        let (ack, done) = oneshot::channel();
        if self.sender.send(LogCommand::Flush(ack)).is_ok() {
            let _ = done.await;
        }
    }

    fn enqueue<T: Serialize>(&self, stream: LogStream, record: &T) {
        let line = match serde_json::to_string(record) {
            Ok(line) => line,
            Err(e) => {
                tracing::error!(
                    "No se pudo serializar un registro para {}: {}",
                    stream.file_name(),
                    e
                );
                return;
            }
        };

        if self
            .sender
            .send(LogCommand::Append { stream, line })
            .is_err()
        {
            tracing::error!(
                "La tarea de escritura de logs ya no existe; se descarta una línea de {}",
                stream.file_name()
            );
        }
    }
}

async fn writer_task(log_dir: PathBuf, mut receiver: mpsc::UnboundedReceiver<LogCommand>) {
    if let Err(e) = tokio::fs::create_dir_all(&log_dir).await {
        tracing::error!(
            "No se pudo crear el directorio de logs {}: {}",
            log_dir.display(),
            e
        );
    }

    while let Some(command) = receiver.recv().await {
        match command {
            LogCommand::Append { stream, line } => {
                let path = log_dir.join(stream.file_name());
                if let Err(e) = append_line(&path, &line).await {
                    tracing::error!("Error escribiendo en {}: {}", path.display(), e);
                }
            }
            LogCommand::Flush(ack) => {
                let _ = ack.send(());
            }
        }
    }
}

async fn append_line(path: &Path, line: &str) -> std::io::Result<()> {
    let mut file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .await?;

    // Una única escritura por registro: línea completa o nada.
    file.write_all(format!("{}\n", line).as_bytes()).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{DetectionResult, Severity};
    use chrono::Utc;

    fn sample_access_entry() -> AccessLogEntry {
        AccessLogEntry {
            timestamp: Utc::now(),
            method: "GET".to_string(),
            url: "/api/creators".to_string(),
            ip: "10.0.0.1".to_string(),
            user_agent: Some("Mozilla/5.0".to_string()),
            referer: "direct".to_string(),
        }
    }

    #[tokio::test]
    async fn test_appends_one_json_line_per_record() {
        let dir = tempfile::tempdir().unwrap();
        let logger = AttackLogger::new(dir.path());

        for _ in 0..3 {
            logger.record_access(&sample_access_entry());
        }
        logger.flush().await;

        let contents = tokio::fs::read_to_string(dir.path().join("access.log"))
            .await
            .unwrap();
        let lines: Vec<&str> = contents.lines().collect();
        assert_eq!(lines.len(), 3);
        for line in lines {
            let parsed: serde_json::Value = serde_json::from_str(line).unwrap();
            assert_eq!(parsed["method"], "GET");
        }
    }

    #[tokio::test]
    async fn test_events_route_to_their_stream() {
        let dir = tempfile::tempdir().unwrap();
        let logger = AttackLogger::new(dir.path());

        logger.record_attack(&AttackEvent::RateLimitExceeded {
            timestamp: Utc::now(),
            severity: Severity::Medium,
            ip: "10.0.0.1".to_string(),
            requests_per_minute: 51,
            url: "/api/stats".to_string(),
            method: "GET".to_string(),
            user_agent: None,
        });
        logger.record_attack(&AttackEvent::XssAttempt {
            timestamp: Utc::now(),
            severity: Severity::High,
            ip: "10.0.0.1".to_string(),
            user_agent: None,
            payload: crate::logging::events::XssPayload {
                supporter_name: "<script>".to_string(),
                message: "hola".to_string(),
            },
            pattern_detected: "<script".to_string(),
            field: "supporter_name".to_string(),
        });
        logger.flush().await;

        let rate = tokio::fs::read_to_string(dir.path().join("rate_limit_attacks.log"))
            .await
            .unwrap();
        assert_eq!(rate.lines().count(), 1);
        assert!(rate.contains("RATE_LIMIT_EXCEEDED"));

        let xss = tokio::fs::read_to_string(dir.path().join("xss_attempts.log"))
            .await
            .unwrap();
        assert_eq!(xss.lines().count(), 1);
        assert!(xss.contains("XSS_ATTEMPT"));
    }

    #[tokio::test]
    async fn test_login_attempts_keep_arrival_order() {
        let dir = tempfile::tempdir().unwrap();
        let logger = AttackLogger::new(dir.path());

        for i in 0..5 {
            let entry = LoginAttemptEntry {
                timestamp: Utc::now(),
                kind: LoginAttemptEntry::KIND.to_string(),
                ip: "10.0.0.1".to_string(),
                email_attempted: format!("user{}@mail.com", i),
                password_attempted: "x".to_string(),
                user_agent: None,
                referer: "direct".to_string(),
                sql_injection_detected: false,
                sql_injection_details: crate::logging::events::SqlInjectionDetails {
                    email: DetectionResult::clean(),
                    password: DetectionResult::clean(),
                },
            };
            logger.record_login_attempt(&entry);
        }
        logger.flush().await;

        let contents = tokio::fs::read_to_string(dir.path().join("login_attempts.log"))
            .await
            .unwrap();
        for (i, line) in contents.lines().enumerate() {
            let parsed: serde_json::Value = serde_json::from_str(line).unwrap();
            assert_eq!(parsed["email_attempted"], format!("user{}@mail.com", i));
        }
    }
}
