use chrono::{DateTime, Duration, Utc};
use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;

/// Ventana deslizante de peticiones por identidad de cliente.
///
/// Estado propio, creado una vez al arrancar el proceso e inyectado en el
/// monitor; no sobrevive reinicios y en despliegues multi-instancia cada
/// proceso cuenta por su lado (aceptable para una señal consultiva).
pub struct RateTracker {
    window: Duration,
    history: Mutex<HashMap<String, VecDeque<DateTime<Utc>>>>,
}

impl RateTracker {
    /// Crea un tracker con el horizonte de ventana en segundos.
    pub fn new(window_secs: i64) -> Self {
        Self {
            window: Duration::seconds(window_secs),
            history: Mutex::new(HashMap::new()),
        }
    }

    /// Registra una petición del cliente en `now` y devuelve cuántas
    /// peticiones suyas caen dentro de la ventana.
    ///
    /// La secuencia leer-filtrar-añadir-guardar ocurre bajo un único lock,
    /// así la actualización por clave es una sección crítica también con
    /// hilos preemptivos.
    pub fn touch(&self, client_id: &str, now: DateTime<Utc>) -> usize {
        let mut history = self.history.lock().unwrap();
        let timestamps = history.entry(client_id.to_string()).or_default();

        let window = self.window;
        timestamps.retain(|seen| now.signed_duration_since(*seen) < window);
        timestamps.push_back(now);

        timestamps.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counts_requests_within_window() {
        let tracker = RateTracker::new(60);
        let start = Utc::now();

        for i in 0..50 {
            let count = tracker.touch("10.0.0.1", start + Duration::seconds(i));
            assert_eq!(count, (i + 1) as usize);
        }

        // La llamada 51 dentro de los 60 segundos supera el umbral de 50.
        let count = tracker.touch("10.0.0.1", start + Duration::seconds(50));
        assert!(count > 50);
    }

    #[test]
    fn test_old_entries_are_evicted() {
        let tracker = RateTracker::new(60);
        let start = Utc::now();

        for i in 0..51 {
            tracker.touch("10.0.0.1", start + Duration::seconds(i * 2));
        }

        // Con 51 llamadas repartidas en 100 s, ninguna ventana de 60 s
        // llega a contener más de las que realmente caen dentro.
        let count = tracker.touch("10.0.0.1", start + Duration::seconds(102));
        assert!(count <= 31);
        assert!(count > 1);
    }

    #[test]
    fn test_window_never_retains_beyond_horizon() {
        let tracker = RateTracker::new(60);
        let start = Utc::now();

        tracker.touch("10.0.0.1", start);
        tracker.touch("10.0.0.1", start + Duration::seconds(1));

        // 61 s después solo queda la llamada nueva.
        let count = tracker.touch("10.0.0.1", start + Duration::seconds(62));
        assert_eq!(count, 1);
    }

    #[test]
    fn test_clients_are_tracked_independently() {
        let tracker = RateTracker::new(60);
        let now = Utc::now();

        for _ in 0..10 {
            tracker.touch("10.0.0.1", now);
        }
        let count = tracker.touch("10.0.0.2", now);

        assert_eq!(count, 1);
    }
}
