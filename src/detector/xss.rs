use crate::{DetectionResult, Severity};
use once_cell::sync::Lazy;

/// Firmas literales de XSS: aperturas de tag, atributos de evento y
/// llamadas de ejecución de scripts. Todas en minúsculas; el input se
/// normaliza antes de comparar.
static XSS_SIGNATURES: Lazy<Vec<&'static str>> = Lazy::new(|| {
    vec![
        "<script",
        "javascript:",
        "onerror=",
        "onload=",
        "<iframe",
        "<img src=x onerror=",
        "<svg",
        "onclick=",
        "onmouseover=",
        "<body onload=",
        "eval(",
        "alert(",
        "prompt(",
        "confirm(",
    ]
});

/// Detector especializado en Cross-Site Scripting sobre campos de texto
/// libre. Mismo contrato que el detector SQL: substring literal, sin
/// distinguir mayúsculas, primera firma del catálogo gana, severidad HIGH.
#[derive(Debug, Clone)]
pub struct XssDetector {
    signatures: &'static [&'static str],
}

impl XssDetector {
    pub fn new() -> Self {
        Self {
            signatures: XSS_SIGNATURES.as_slice(),
        }
    }

    /// Analiza un input y devuelve la primera firma detectada, si la hay.
    pub fn analyze(&self, input: &str) -> DetectionResult {
        let haystack = input.to_lowercase();

        for signature in self.signatures {
            if haystack.contains(signature) {
                return DetectionResult::hit(signature, Severity::High);
            }
        }

        DetectionResult::clean()
    }
}

impl Default for XssDetector {
    fn default() -> Self {
        Self::new()
    }
}
