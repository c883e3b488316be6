use crate::{DetectionResult, Severity};
use once_cell::sync::Lazy;

/// Secuencias de traversal y rutas absolutas sensibles. Las variantes
/// percent-encoded cubren payloads con doble codificación que sobreviven
/// a una sola pasada de decodificación.
static TRAVERSAL_SIGNATURES: Lazy<Vec<&'static str>> = Lazy::new(|| {
    vec![
        "../",
        "..\\",
        "/etc/passwd",
        "/etc/shadow",
        "C:\\Windows\\",
        "%2e%2e%2f",
        "..%2F",
        "%252e%252e%252f",
        "etc/passwd",
        "etc/shadow",
    ]
});

/// Detector de path traversal sobre el destino de la petición.
///
/// El destino se decodifica (percent-encoding) y se pasa a minúsculas antes
/// de comparar; si la decodificación falla se compara contra el destino
/// crudo en lugar de fallar la petición. Severidad siempre CRITICAL.
#[derive(Debug, Clone)]
pub struct PathTraversalDetector {
    signatures: &'static [&'static str],
}

impl PathTraversalDetector {
    pub fn new() -> Self {
        Self {
            signatures: TRAVERSAL_SIGNATURES.as_slice(),
        }
    }

    /// Analiza el destino (path + query) de una petición.
    pub fn analyze(&self, target: &str) -> DetectionResult {
        let decoded = match urlencoding::decode(target) {
            Ok(decoded) => decoded.into_owned(),
            // Secuencias inválidas no tumban el matcher: se usa el crudo.
            Err(_) => target.to_string(),
        };
        let haystack = decoded.to_lowercase();

        for signature in self.signatures {
            if haystack.contains(&signature.to_lowercase()) {
                return DetectionResult::hit(signature, Severity::Critical);
            }
        }

        DetectionResult::clean()
    }
}

impl Default for PathTraversalDetector {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_traversal_sequence() {
        let detector = PathTraversalDetector::new();

        let result = detector.analyze("/api/../../etc/passwd");

        assert!(result.detected);
        assert_eq!(result.pattern.as_deref(), Some("../"));
        assert_eq!(result.severity, Some(Severity::Critical));
    }

    #[test]
    fn test_sensitive_absolute_path() {
        let detector = PathTraversalDetector::new();

        let result = detector.analyze("/download?file=/etc/shadow");

        assert!(result.detected);
        assert_eq!(result.pattern.as_deref(), Some("/etc/shadow"));
    }

    #[test]
    fn test_percent_encoded_traversal_is_decoded() {
        let detector = PathTraversalDetector::new();

        // %2e%2e%2f se decodifica a "../" antes de comparar.
        let result = detector.analyze("/files/%2e%2e%2f%2e%2e%2fetc%2fpasswd");

        assert!(result.detected);
        assert_eq!(result.pattern.as_deref(), Some("../"));
    }

    #[test]
    fn test_double_encoded_traversal() {
        let detector = PathTraversalDetector::new();

        // Una pasada de decodificación deja %2e%2e%2f, que está en el catálogo.
        let result = detector.analyze("/files/%252e%252e%252f");

        assert!(result.detected);
        assert_eq!(result.pattern.as_deref(), Some("%2e%2e%2f"));
    }

    #[test]
    fn test_windows_backslash_traversal() {
        let detector = PathTraversalDetector::new();

        let result = detector.analyze("/static/..\\..\\boot.ini");

        assert!(result.detected);
        assert_eq!(result.pattern.as_deref(), Some("..\\"));
    }

    #[test]
    fn test_invalid_encoding_falls_back_to_raw_target() {
        let detector = PathTraversalDetector::new();

        // %FF no es UTF-8 válido al decodificar; el crudo aún contiene "../".
        let result = detector.analyze("/files/%FF/../secret");

        assert!(result.detected);
        assert_eq!(result.pattern.as_deref(), Some("../"));
    }

    #[test]
    fn test_normal_route_is_clean() {
        let detector = PathTraversalDetector::new();

        let result = detector.analyze("/api/creator/alex_dev/coffees");

        assert!(!result.detected);
        assert!(result.pattern.is_none());
    }
}
