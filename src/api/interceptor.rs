use crate::detector::SecurityMonitor;
use crate::RequestContext;
use std::net::SocketAddr;
use std::sync::Arc;
use warp::http::Method;
use warp::path::FullPath;
use warp::Filter;

/// Filtro de intercepción por petición.
///
/// Extrae los metadatos que necesita el monitor (método, destino completo,
/// cabeceras de identidad) y pasa la petición por el pipeline de seguridad
/// antes de entregar el contexto al handler. La intercepción nunca rechaza:
/// registrar y dejar pasar es todo su trabajo.
pub fn request_context(
    monitor: Arc<SecurityMonitor>,
) -> impl Filter<Extract = (RequestContext,), Error = warp::Rejection> + Clone {
    warp::method()
        .and(warp::path::full())
        .and(optional_raw_query())
        .and(warp::header::optional::<String>("user-agent"))
        .and(warp::header::optional::<String>("referer"))
        .and(warp::header::optional::<String>("x-forwarded-for"))
        .and(warp::addr::remote())
        .map(
            move |method: Method,
                  path: FullPath,
                  query: String,
                  user_agent: Option<String>,
                  referer: Option<String>,
                  forwarded_for: Option<String>,
                  remote: Option<SocketAddr>| {
                let ctx = RequestContext::new(
                    method.as_str(),
                    path.as_str(),
                    &query,
                    user_agent,
                    referer,
                    forwarded_for,
                    remote,
                );
                monitor.inspect_request(&ctx);
                ctx
            },
        )
}

/// Query string crudo, o vacío cuando la petición no trae ninguno.
fn optional_raw_query() -> impl Filter<Extract = (String,), Error = warp::Rejection> + Clone {
    warp::query::raw().or_else(|_| async { Ok::<(String,), warp::Rejection>((String::new(),)) })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logging::AttackLogger;

    fn test_monitor(dir: &std::path::Path) -> (Arc<SecurityMonitor>, AttackLogger) {
        let logger = AttackLogger::new(dir);
        let monitor = Arc::new(SecurityMonitor::new(logger.clone(), 60, 50));
        (monitor, logger)
    }

    #[tokio::test]
    async fn test_context_includes_query_in_target() {
        let dir = tempfile::tempdir().unwrap();
        let (monitor, _logger) = test_monitor(dir.path());
        let filter = request_context(monitor);

        let ctx = warp::test::request()
            .method("GET")
            .path("/api/creators?page=2")
            .header("user-agent", "Mozilla/5.0")
            .filter(&filter)
            .await
            .unwrap();

        assert_eq!(ctx.method, "GET");
        assert_eq!(ctx.target, "/api/creators?page=2");
        assert_eq!(ctx.user_agent.as_deref(), Some("Mozilla/5.0"));
    }

    #[tokio::test]
    async fn test_interception_writes_access_log() {
        let dir = tempfile::tempdir().unwrap();
        let (monitor, logger) = test_monitor(dir.path());
        let filter = request_context(monitor);

        warp::test::request()
            .method("GET")
            .path("/api/stats")
            .header("x-forwarded-for", "203.0.113.9")
            .filter(&filter)
            .await
            .unwrap();
        logger.flush().await;

        let contents = tokio::fs::read_to_string(dir.path().join("access.log"))
            .await
            .unwrap();
        assert_eq!(contents.lines().count(), 1);
        assert!(contents.contains("203.0.113.9"));
    }

    #[tokio::test]
    async fn test_traversal_in_query_is_detected() {
        let dir = tempfile::tempdir().unwrap();
        let (monitor, logger) = test_monitor(dir.path());
        let filter = request_context(monitor);

        warp::test::request()
            .method("GET")
            .path("/download?file=..%2F..%2Fetc%2Fpasswd")
            .filter(&filter)
            .await
            .unwrap();
        logger.flush().await;

        let contents = tokio::fs::read_to_string(dir.path().join("path_traversal_attempts.log"))
            .await
            .unwrap();
        assert_eq!(contents.lines().count(), 1);
        assert!(contents.contains("PATH_TRAVERSAL_ATTEMPT"));
    }
}
