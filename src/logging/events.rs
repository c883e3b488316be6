use crate::logging::attack_log::LogStream;
use crate::{DetectionResult, Severity};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Entrada del log de accesos; se emite una por petición, detecte algo o no.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccessLogEntry {
    pub timestamp: DateTime<Utc>,
    pub method: String,
    pub url: String,
    pub ip: String,
    #[serde(rename = "userAgent", default, skip_serializing_if = "Option::is_none")]
    pub user_agent: Option<String>,
    pub referer: String,
}

/// Resultados SQLI por campo embebidos en cada intento de login.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SqlInjectionDetails {
    pub email: DetectionResult,
    pub password: DetectionResult,
}

/// Registro completo de un intento de login contra el honeypot.
///
/// Se escribe siempre, antes de evaluar las credenciales reales, con las
/// credenciales intentadas en claro: capturarlas es el propósito del
/// honeypot.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoginAttemptEntry {
    pub timestamp: DateTime<Utc>,
    #[serde(rename = "type")]
    pub kind: String,
    pub ip: String,
    pub email_attempted: String,
    pub password_attempted: String,
    #[serde(rename = "userAgent", default, skip_serializing_if = "Option::is_none")]
    pub user_agent: Option<String>,
    pub referer: String,
    pub sql_injection_detected: bool,
    pub sql_injection_details: SqlInjectionDetails,
}

impl LoginAttemptEntry {
    pub const KIND: &'static str = "LOGIN_ATTEMPT";
}

/// Campos de texto libre capturados en un intento de XSS.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct XssPayload {
    pub supporter_name: String,
    pub message: String,
}

/// Evento de ataque detectado. Cada variante se serializa como una línea
/// JSON autocontenida con la etiqueta `type` y se enruta a su stream.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AttackEvent {
    SqlInjectionUrlParam {
        timestamp: DateTime<Utc>,
        severity: Severity,
        ip: String,
        parameter: String,
        value: String,
        pattern: String,
        #[serde(rename = "userAgent", default, skip_serializing_if = "Option::is_none")]
        user_agent: Option<String>,
    },
    SqlInjectionLogin {
        timestamp: DateTime<Utc>,
        severity: Severity,
        ip: String,
        email_attempted: String,
        password_attempted: String,
        pattern: String,
        field: String,
        #[serde(rename = "userAgent", default, skip_serializing_if = "Option::is_none")]
        user_agent: Option<String>,
    },
    XssAttempt {
        timestamp: DateTime<Utc>,
        severity: Severity,
        ip: String,
        #[serde(rename = "userAgent", default, skip_serializing_if = "Option::is_none")]
        user_agent: Option<String>,
        payload: XssPayload,
        pattern_detected: String,
        field: String,
    },
    PathTraversalAttempt {
        timestamp: DateTime<Utc>,
        severity: Severity,
        ip: String,
        url: String,
        pattern: String,
        #[serde(rename = "userAgent", default, skip_serializing_if = "Option::is_none")]
        user_agent: Option<String>,
        method: String,
    },
    RateLimitExceeded {
        timestamp: DateTime<Utc>,
        severity: Severity,
        ip: String,
        requests_per_minute: usize,
        url: String,
        method: String,
        #[serde(rename = "userAgent", default, skip_serializing_if = "Option::is_none")]
        user_agent: Option<String>,
    },
}

impl AttackEvent {
    /// Stream de log al que se enruta el evento.
    pub fn stream(&self) -> LogStream {
        match self {
            AttackEvent::SqlInjectionUrlParam { .. } | AttackEvent::SqlInjectionLogin { .. } => {
                LogStream::SqlInjection
            }
            AttackEvent::XssAttempt { .. } => LogStream::Xss,
            AttackEvent::PathTraversalAttempt { .. } => LogStream::PathTraversal,
            AttackEvent::RateLimitExceeded { .. } => LogStream::RateLimit,
        }
    }

    pub fn severity(&self) -> Severity {
        match self {
            AttackEvent::SqlInjectionUrlParam { severity, .. }
            | AttackEvent::SqlInjectionLogin { severity, .. }
            | AttackEvent::XssAttempt { severity, .. }
            | AttackEvent::PathTraversalAttempt { severity, .. }
            | AttackEvent::RateLimitExceeded { severity, .. } => *severity,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_attack_event_tagged_serialization() {
        let event = AttackEvent::PathTraversalAttempt {
            timestamp: Utc::now(),
            severity: Severity::Critical,
            ip: "10.0.0.1".to_string(),
            url: "/../../etc/passwd".to_string(),
            pattern: "../".to_string(),
            user_agent: Some("curl/8.0".to_string()),
            method: "GET".to_string(),
        };

        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "PATH_TRAVERSAL_ATTEMPT");
        assert_eq!(json["severity"], "CRITICAL");
        assert_eq!(json["userAgent"], "curl/8.0");
        assert_eq!(event.stream(), LogStream::PathTraversal);
    }

    #[test]
    fn test_both_sql_injection_kinds_share_stream() {
        let url_param = AttackEvent::SqlInjectionUrlParam {
            timestamp: Utc::now(),
            severity: Severity::High,
            ip: "10.0.0.1".to_string(),
            parameter: "username".to_string(),
            value: "' OR 1=1--".to_string(),
            pattern: "' OR 1=1--".to_string(),
            user_agent: None,
        };
        let login = AttackEvent::SqlInjectionLogin {
            timestamp: Utc::now(),
            severity: Severity::Critical,
            ip: "10.0.0.1".to_string(),
            email_attempted: "' OR '1'='1".to_string(),
            password_attempted: "x".to_string(),
            pattern: "' OR '1'='1".to_string(),
            field: "email".to_string(),
            user_agent: None,
        };

        assert_eq!(url_param.stream(), LogStream::SqlInjection);
        assert_eq!(login.stream(), LogStream::SqlInjection);
    }

    #[test]
    fn test_absent_user_agent_is_omitted() {
        let entry = AccessLogEntry {
            timestamp: Utc::now(),
            method: "GET".to_string(),
            url: "/api/stats".to_string(),
            ip: "10.0.0.1".to_string(),
            user_agent: None,
            referer: "direct".to_string(),
        };

        let json = serde_json::to_string(&entry).unwrap();
        assert!(!json.contains("userAgent"));
    }

    #[test]
    fn test_login_attempt_round_trip() {
        let entry = LoginAttemptEntry {
            timestamp: Utc::now(),
            kind: LoginAttemptEntry::KIND.to_string(),
            ip: "10.0.0.1".to_string(),
            email_attempted: "alex@dev.io".to_string(),
            password_attempted: "pass123".to_string(),
            user_agent: Some("Mozilla/5.0".to_string()),
            referer: "direct".to_string(),
            sql_injection_detected: false,
            sql_injection_details: SqlInjectionDetails {
                email: crate::DetectionResult::clean(),
                password: crate::DetectionResult::clean(),
            },
        };

        let json = serde_json::to_string(&entry).unwrap();
        assert!(json.contains(r#""type":"LOGIN_ATTEMPT""#));

        let back: LoginAttemptEntry = serde_json::from_str(&json).unwrap();
        assert_eq!(back.email_attempted, "alex@dev.io");
        assert!(!back.sql_injection_details.email.detected);
    }
}
