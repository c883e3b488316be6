use crate::detector::{
    path_traversal::PathTraversalDetector, rate_limit::RateTracker,
    sql_injection::SqlInjectionDetector, xss::XssDetector,
};
use crate::logging::{
    AccessLogEntry, AttackEvent, AttackLogger, LoginAttemptEntry, SqlInjectionDetails, XssPayload,
};
use crate::{RequestContext, Severity};
use chrono::Utc;
use colored::Colorize;

/// Monitor de seguridad: coordina los tres clasificadores de firmas y la
/// ventana de tasa, y hace converger todas las detecciones en el logger de
/// ataques.
///
/// Ninguna comprobación bloquea ni altera la petición que la dispara; el
/// valor del honeypot depende de completar siempre la interacción.
pub struct SecurityMonitor {
    sql_detector: SqlInjectionDetector,
    xss_detector: XssDetector,
    path_detector: PathTraversalDetector,
    rate_tracker: RateTracker,
    rate_threshold: usize,
    logger: AttackLogger,
}

impl SecurityMonitor {
    pub fn new(logger: AttackLogger, rate_window_secs: i64, rate_threshold: usize) -> Self {
        Self {
            sql_detector: SqlInjectionDetector::new(),
            xss_detector: XssDetector::new(),
            path_detector: PathTraversalDetector::new(),
            rate_tracker: RateTracker::new(rate_window_secs),
            rate_threshold,
            logger,
        }
    }

    /// Pasa una petición entrante por el pipeline de intercepción: log de
    /// acceso incondicional, path traversal sobre el destino y ventana de
    /// tasa por cliente. Siempre devuelve el control sin denegar nada.
    pub fn inspect_request(&self, ctx: &RequestContext) {
        let now = Utc::now();

        self.logger.record_access(&AccessLogEntry {
            timestamp: now,
            method: ctx.method.clone(),
            url: ctx.target.clone(),
            ip: ctx.ip.clone(),
            user_agent: ctx.user_agent.clone(),
            referer: ctx.referer_or_direct(),
        });
        tracing::info!("{} {} - {}", ctx.method, ctx.target, ctx.ip);

        let traversal = self.path_detector.analyze(&ctx.target);
        if traversal.detected {
            let pattern = traversal.pattern.unwrap_or_default();
            self.console_warning("PATH TRAVERSAL", &ctx.ip, &pattern, Severity::Critical);
            self.logger.record_attack(&AttackEvent::PathTraversalAttempt {
                timestamp: Utc::now(),
                severity: Severity::Critical,
                ip: ctx.ip.clone(),
                url: ctx.target.clone(),
                pattern,
                user_agent: ctx.user_agent.clone(),
                method: ctx.method.clone(),
            });
        }

        let requests_in_window = self.rate_tracker.touch(&ctx.ip, now);
        if requests_in_window > self.rate_threshold {
            self.console_warning(
                "RATE LIMIT",
                &ctx.ip,
                &format!("{} peticiones/min", requests_in_window),
                Severity::Medium,
            );
            self.logger.record_attack(&AttackEvent::RateLimitExceeded {
                timestamp: Utc::now(),
                severity: Severity::Medium,
                ip: ctx.ip.clone(),
                requests_per_minute: requests_in_window,
                url: ctx.target.clone(),
                method: ctx.method.clone(),
                user_agent: ctx.user_agent.clone(),
            });
        }
    }

    /// Comprueba SQLI en un parámetro de URL y registra el evento si detecta.
    pub fn inspect_url_param(&self, parameter: &str, value: &str, ctx: &RequestContext) {
        let check = self.sql_detector.analyze(value);
        if !check.detected {
            return;
        }

        let pattern = check.pattern.unwrap_or_default();
        self.console_warning("SQL INJECTION", &ctx.ip, &pattern, Severity::High);
        self.logger.record_attack(&AttackEvent::SqlInjectionUrlParam {
            timestamp: Utc::now(),
            severity: Severity::High,
            ip: ctx.ip.clone(),
            parameter: parameter.to_string(),
            value: value.to_string(),
            pattern,
            user_agent: ctx.user_agent.clone(),
        });
    }

    /// Registro de honeypot de un intento de login.
    ///
    /// Siempre escribe el intento completo, credenciales en claro incluidas,
    /// antes de que nadie evalúe las credenciales reales. Si algún campo trae
    /// una firma SQLI se emite además el evento escalado; el reporte sigue
    /// orden de campos: si el email detecta, la contraseña ya no se reporta.
    pub fn inspect_login(&self, email: &str, password: &str, ctx: &RequestContext) {
        let email_check = self.sql_detector.analyze(email);
        let password_check = self.sql_detector.analyze(password);
        let detected = email_check.detected || password_check.detected;

        self.logger.record_login_attempt(&LoginAttemptEntry {
            timestamp: Utc::now(),
            kind: LoginAttemptEntry::KIND.to_string(),
            ip: ctx.ip.clone(),
            email_attempted: email.to_string(),
            password_attempted: password.to_string(),
            user_agent: ctx.user_agent.clone(),
            referer: ctx.referer_or_direct(),
            sql_injection_detected: detected,
            sql_injection_details: SqlInjectionDetails {
                email: email_check.clone(),
                password: password_check.clone(),
            },
        });

        if !detected {
            return;
        }

        // Primer campo que detecta gana el reporte: email antes que password.
        let (pattern, field) = if email_check.detected {
            (email_check.pattern.unwrap_or_default(), "email")
        } else {
            (password_check.pattern.unwrap_or_default(), "password")
        };

        self.console_warning("SQL INJECTION LOGIN", &ctx.ip, &pattern, Severity::Critical);
        self.logger.record_attack(&AttackEvent::SqlInjectionLogin {
            timestamp: Utc::now(),
            severity: Severity::Critical,
            ip: ctx.ip.clone(),
            email_attempted: email.to_string(),
            password_attempted: password.to_string(),
            pattern,
            field: field.to_string(),
            user_agent: ctx.user_agent.clone(),
        });
    }

    /// Comprueba XSS en los campos de texto libre de un café. El orden de
    /// comprobación es fijo (nombre antes que mensaje) y el evento nombra el
    /// primer campo que detecta, embebiendo ambos valores crudos.
    pub fn inspect_coffee_fields(&self, supporter_name: &str, message: &str, ctx: &RequestContext) {
        let name_check = self.xss_detector.analyze(supporter_name);
        let message_check = self.xss_detector.analyze(message);

        let (pattern, field) = if name_check.detected {
            (name_check.pattern.unwrap_or_default(), "supporter_name")
        } else if message_check.detected {
            (message_check.pattern.unwrap_or_default(), "message")
        } else {
            return;
        };

        self.console_warning("XSS", &ctx.ip, &pattern, Severity::High);
        self.logger.record_attack(&AttackEvent::XssAttempt {
            timestamp: Utc::now(),
            severity: Severity::High,
            ip: ctx.ip.clone(),
            user_agent: ctx.user_agent.clone(),
            payload: XssPayload {
                supporter_name: supporter_name.to_string(),
                message: message.to_string(),
            },
            pattern_detected: pattern,
            field: field.to_string(),
        });
    }

    /// Aviso por consola coloreado por severidad, al estilo del resto de la
    /// salida del servidor.
    fn console_warning(&self, kind: &str, ip: &str, detail: &str, severity: Severity) {
        let tag = format!("⚠ {} DETECTADO", kind);
        let tag = match severity {
            Severity::Critical => tag.red().bold(),
            Severity::High => tag.red(),
            Severity::Medium => tag.yellow(),
            Severity::Low => tag.normal(),
        };
        println!("{} desde {}: {}", tag, ip, detail);
    }
}
