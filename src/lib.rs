
//! Cafecito - plataforma "invítame un café" con honeypot de seguridad.
//!
//! El endpoint de login acepta y registra credenciales sospechosas en lugar
//! de bloquearlas; los clasificadores de firmas y la ventana de tasa alimentan
//! logs de ataques append-only que se pueden analizar después.


pub mod api;
pub mod detector;
pub mod logging;
pub mod storage;

use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::path::PathBuf;

/// Niveles de severidad de una detección
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord)]
#[serde(rename_all = "UPPERCASE")]
pub enum Severity {
    Low,
    Medium,
    High,
    Critical,
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            Severity::Low => "LOW",
            Severity::Medium => "MEDIUM",
            Severity::High => "HIGH",
            Severity::Critical => "CRITICAL",
        };
        write!(f, "{}", label)
    }
}

/// Resultado de pasar un input por un catálogo de firmas.
///
/// Un resultado sin detección no lleva firma ni severidad; se serializa como
/// `{"detected":false}`, igual que el esquema de los logs existentes.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DetectionResult {
    pub detected: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pattern: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub severity: Option<Severity>,
}

impl DetectionResult {
    /// Resultado limpio: sin firma, sin severidad.
    pub fn clean() -> Self {
        Self {
            detected: false,
            pattern: None,
            severity: None,
        }
    }

    /// Resultado con la firma reportada y su severidad.
    pub fn hit(pattern: &str, severity: Severity) -> Self {
        Self {
            detected: true,
            pattern: Some(pattern.to_string()),
            severity: Some(severity),
        }
    }
}

/// Metadatos de una petición entrante, tal como los consume el monitor
/// de seguridad: método, destino completo (path + query) y cabeceras de
/// identificación del cliente.
#[derive(Debug, Clone)]
pub struct RequestContext {
    pub method: String,
    pub target: String,
    pub ip: String,
    pub user_agent: Option<String>,
    pub referer: Option<String>,
}

impl RequestContext {
    pub fn new(
        method: &str,
        path: &str,
        query: &str,
        user_agent: Option<String>,
        referer: Option<String>,
        forwarded_for: Option<String>,
        remote: Option<SocketAddr>,
    ) -> Self {
        let target = if query.is_empty() {
            path.to_string()
        } else {
            format!("{}?{}", path, query)
        };

        // La cabecera forwarded-for manda; si no está, la dirección del peer.
        let ip = forwarded_for
            .as_deref()
            .and_then(|header| header.split(',').next())
            .map(|first| first.trim().to_string())
            .filter(|first| !first.is_empty())
            .or_else(|| remote.map(|addr| addr.ip().to_string()))
            .unwrap_or_else(|| "unknown".to_string());

        Self {
            method: method.to_string(),
            target,
            ip,
            user_agent,
            referer,
        }
    }

    /// Referer con el mismo valor por defecto que usa el log de accesos.
    pub fn referer_or_direct(&self) -> String {
        self.referer.clone().unwrap_or_else(|| "direct".to_string())
    }
}

/// Configuración general del servidor
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub port: u16,
    pub database_url: String,
    pub log_dir: PathBuf,
    pub jwt_secret: String,
    pub token_ttl_secs: i64,
    pub rate_window_secs: i64,
    pub rate_threshold: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: 3000,
            database_url: "sqlite:database.db".to_string(),
            log_dir: PathBuf::from("."),
            jwt_secret: "miclavesecretaparaelhoneypot123".to_string(),
            token_ttl_secs: 3600,
            rate_window_secs: 60,
            rate_threshold: 50,
        }
    }
}

impl ServerConfig {
    /// Carga la configuración por defecto con overrides de entorno.
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(port) = std::env::var("PORT") {
            if let Ok(port) = port.parse() {
                config.port = port;
            }
        }
        if let Ok(database_url) = std::env::var("DATABASE_URL") {
            config.database_url = database_url;
        }
        if let Ok(log_dir) = std::env::var("LOG_DIR") {
            config.log_dir = PathBuf::from(log_dir);
        }
        if let Ok(secret) = std::env::var("JWT_SECRET") {
            config.jwt_secret = secret;
        }

        config
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clean_result_carries_no_pattern() {
        let result = DetectionResult::clean();

        assert!(!result.detected);
        assert!(result.pattern.is_none());
        assert!(result.severity.is_none());

        let json = serde_json::to_string(&result).unwrap();
        assert_eq!(json, r#"{"detected":false}"#);
    }

    #[test]
    fn test_hit_result_serializes_severity_label() {
        let result = DetectionResult::hit("' OR '1'='1", Severity::High);
        let json = serde_json::to_value(&result).unwrap();

        assert_eq!(json["detected"], true);
        assert_eq!(json["pattern"], "' OR '1'='1");
        assert_eq!(json["severity"], "HIGH");
    }

    #[test]
    fn test_request_context_prefers_forwarded_for() {
        let remote: SocketAddr = "10.0.0.9:4444".parse().unwrap();
        let ctx = RequestContext::new(
            "GET",
            "/api/creators",
            "",
            None,
            None,
            Some("203.0.113.7, 10.0.0.1".to_string()),
            Some(remote),
        );

        assert_eq!(ctx.ip, "203.0.113.7");
        assert_eq!(ctx.target, "/api/creators");
    }

    #[test]
    fn test_request_context_falls_back_to_peer_address() {
        let remote: SocketAddr = "10.0.0.9:4444".parse().unwrap();
        let ctx = RequestContext::new("GET", "/x", "a=1", None, None, None, Some(remote));

        assert_eq!(ctx.ip, "10.0.0.9");
        assert_eq!(ctx.target, "/x?a=1");
    }

    #[test]
    fn test_request_context_without_identity() {
        let ctx = RequestContext::new("GET", "/", "", None, None, None, None);
        assert_eq!(ctx.ip, "unknown");
        assert_eq!(ctx.referer_or_direct(), "direct");
    }
}
