use crate::{DetectionResult, Severity};
use once_cell::sync::Lazy;

/// Firmas literales de inyección SQL, en orden de prioridad de reporte:
/// tautologías, terminadores de comentario y palabras clave UNION/DROP.
static SQL_SIGNATURES: Lazy<Vec<&'static str>> = Lazy::new(|| {
    vec![
        "' OR '1'='1",
        "' OR 1=1--",
        "admin'--",
        "' UNION SELECT",
        "'; DROP TABLE",
        "' OR 'a'='a",
        "1' OR '1' = '1",
        "OR 1=1",
        "' OR ''='",
        "1' AND '1'='1",
        "' OR '1'='1' --",
        "' OR '1'='1' /*",
        "' OR '1'='1' #",
        "1' OR '1'='1",
        "admin' #",
        "admin' /*",
        "' UNION ALL SELECT",
        "' AND 1=1--",
        "' AND 'a'='a",
    ]
});

/// Detector especializado en inyección SQL sobre credenciales y parámetros.
///
/// Busca las firmas del catálogo como substrings literales, sin distinguir
/// mayúsculas. Gana la primera firma del catálogo presente en el input; la
/// severidad reportada es siempre HIGH.
#[derive(Debug, Clone)]
pub struct SqlInjectionDetector {
    signatures: &'static [&'static str],
}

impl SqlInjectionDetector {
    pub fn new() -> Self {
        Self {
            signatures: SQL_SIGNATURES.as_slice(),
        }
    }

    /// Analiza un input y devuelve la primera firma detectada, si la hay.
    pub fn analyze(&self, input: &str) -> DetectionResult {
        let haystack = input.to_lowercase();

        for signature in self.signatures {
            if haystack.contains(&signature.to_lowercase()) {
                return DetectionResult::hit(signature, Severity::High);
            }
        }

        DetectionResult::clean()
    }
}

impl Default for SqlInjectionDetector {
    fn default() -> Self {
        Self::new()
    }
}
