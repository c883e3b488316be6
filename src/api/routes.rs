use crate::api::auth::{authenticate, AuthOutcome, TokenService};
use crate::api::interceptor::request_context;
use crate::detector::SecurityMonitor;
use crate::logging::SecurityStatsReporter;
use crate::storage::SqliteStorage;
use crate::RequestContext;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use bytes::Bytes;
use warp::http::StatusCode;
use warp::reply::{Json, WithStatus};
use warp::Filter;

/// Credenciales enviadas al honeypot de login. Los campos se aceptan como
/// JSON arbitrario y se coaccionan a texto: un valor ausente o no-string
/// nunca tumba la petición, simplemente no matchea ninguna firma.
#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    #[serde(default)]
    pub email: serde_json::Value,
    #[serde(default)]
    pub password: serde_json::Value,
}

/// Cuerpo de un envío de café. Mismo criterio de coacción que el login.
#[derive(Debug, Deserialize)]
pub struct CoffeeRequest {
    #[serde(default)]
    pub creator_username: serde_json::Value,
    #[serde(default)]
    pub supporter_name: serde_json::Value,
    #[serde(default)]
    pub message: serde_json::Value,
    #[serde(default)]
    pub coffee_count: serde_json::Value,
}

/// Representación textual de un campo JSON para los matchers y la base de
/// datos: ausente/null es vacío, strings van tal cual, el resto se
/// serializa.
fn coerce_text(value: &serde_json::Value) -> String {
    match value {
        serde_json::Value::Null => String::new(),
        serde_json::Value::String(text) => text.clone(),
        other => other.to_string(),
    }
}

/// Número de cafés: entero positivo, o 1 si falta o no se entiende.
fn coerce_coffee_count(value: &serde_json::Value) -> i64 {
    let count = match value {
        serde_json::Value::Number(number) => number.as_i64().unwrap_or(1),
        serde_json::Value::String(text) => text.trim().parse().unwrap_or(1),
        _ => 1,
    };

    if count == 0 {
        1
    } else {
        count
    }
}

/// Rutas de la API pública y del dashboard de creadores.
#[derive(Clone)]
pub struct ApiRoutes {
    storage: Arc<SqliteStorage>,
    monitor: Arc<SecurityMonitor>,
    tokens: Arc<TokenService>,
    reporter: Arc<SecurityStatsReporter>,
}

impl ApiRoutes {
    pub fn new(
        storage: Arc<SqliteStorage>,
        monitor: Arc<SecurityMonitor>,
        tokens: Arc<TokenService>,
        reporter: Arc<SecurityStatsReporter>,
    ) -> Self {
        Self {
            storage,
            monitor,
            tokens,
            reporter,
        }
    }

    /// Árbol completo de rutas. El catch-all del final registra también las
    /// peticiones que no casan con ninguna ruta: para el honeypot son las
    /// más interesantes.
    pub fn build(&self) -> impl Filter<Extract = impl warp::Reply, Error = warp::Rejection> + Clone {
        self.creators_route()
            .or(self.creator_coffees_route())
            .or(self.creator_profile_route())
            .or(self.send_coffee_route())
            .or(self.site_stats_route())
            .or(self.login_route())
            .or(self.my_coffees_route())
            .or(self.security_stats_route())
            .or(self.fallback_route())
    }

    /// GET /api/creators - lista pública de creadores
    fn creators_route(
        &self,
    ) -> impl Filter<Extract = impl warp::Reply, Error = warp::Rejection> + Clone {
        let storage = self.storage.clone();

        warp::path!("api" / "creators")
            .and(warp::get())
            .and(request_context(self.monitor.clone()))
            .and_then(move |_ctx: RequestContext| {
                let storage = storage.clone();
                async move { Self::handle_list_creators(storage).await }
            })
    }

    /// GET /api/creator/:username - perfil, con chequeo SQLI del parámetro
    fn creator_profile_route(
        &self,
    ) -> impl Filter<Extract = impl warp::Reply, Error = warp::Rejection> + Clone {
        let storage = self.storage.clone();
        let monitor = self.monitor.clone();

        warp::path!("api" / "creator" / String)
            .and(warp::get())
            .and(request_context(self.monitor.clone()))
            .and_then(move |username: String, ctx: RequestContext| {
                let storage = storage.clone();
                let monitor = monitor.clone();
                async move { Self::handle_creator_profile(storage, monitor, username, ctx).await }
            })
    }

    /// GET /api/creator/:username/coffees - cafés recientes de un creador
    fn creator_coffees_route(
        &self,
    ) -> impl Filter<Extract = impl warp::Reply, Error = warp::Rejection> + Clone {
        let storage = self.storage.clone();

        warp::path!("api" / "creator" / String / "coffees")
            .and(warp::get())
            .and(request_context(self.monitor.clone()))
            .and_then(move |username: String, _ctx: RequestContext| {
                let storage = storage.clone();
                async move { Self::handle_creator_coffees(storage, username).await }
            })
    }

    /// POST /api/coffee - envía un café, con chequeo XSS de los campos
    fn send_coffee_route(
        &self,
    ) -> impl Filter<Extract = impl warp::Reply, Error = warp::Rejection> + Clone {
        let storage = self.storage.clone();
        let monitor = self.monitor.clone();

        warp::path!("api" / "coffee")
            .and(warp::post())
            .and(request_context(self.monitor.clone()))
            .and(warp::body::bytes())
            .and_then(move |ctx: RequestContext, body: Bytes| {
                let storage = storage.clone();
                let monitor = monitor.clone();
                async move { Self::handle_send_coffee(storage, monitor, ctx, body).await }
            })
    }

    /// GET /api/stats - agregados públicos del sitio
    fn site_stats_route(
        &self,
    ) -> impl Filter<Extract = impl warp::Reply, Error = warp::Rejection> + Clone {
        let storage = self.storage.clone();

        warp::path!("api" / "stats")
            .and(warp::get())
            .and(request_context(self.monitor.clone()))
            .and_then(move |_ctx: RequestContext| {
                let storage = storage.clone();
                async move { Self::handle_site_stats(storage).await }
            })
    }

    /// POST /api/login - honeypot de login + autenticación real
    fn login_route(
        &self,
    ) -> impl Filter<Extract = impl warp::Reply, Error = warp::Rejection> + Clone {
        let storage = self.storage.clone();
        let monitor = self.monitor.clone();
        let tokens = self.tokens.clone();

        warp::path!("api" / "login")
            .and(warp::post())
            .and(request_context(self.monitor.clone()))
            .and(warp::body::bytes())
            .and_then(move |ctx: RequestContext, body: Bytes| {
                let storage = storage.clone();
                let monitor = monitor.clone();
                let tokens = tokens.clone();
                async move { Self::handle_login(storage, monitor, tokens, ctx, body).await }
            })
    }

    /// GET /api/dashboard/my-coffees - cafés del creador autenticado
    fn my_coffees_route(
        &self,
    ) -> impl Filter<Extract = impl warp::Reply, Error = warp::Rejection> + Clone {
        let storage = self.storage.clone();

        warp::path!("api" / "dashboard" / "my-coffees")
            .and(warp::get())
            .and(request_context(self.monitor.clone()))
            .and(authenticate(self.tokens.clone()))
            .and_then(move |_ctx: RequestContext, auth: AuthOutcome| {
                let storage = storage.clone();
                async move { Self::handle_my_coffees(storage, auth).await }
            })
    }

    /// GET /api/security/stats - contadores de los logs de ataque
    fn security_stats_route(
        &self,
    ) -> impl Filter<Extract = impl warp::Reply, Error = warp::Rejection> + Clone {
        let reporter = self.reporter.clone();

        warp::path!("api" / "security" / "stats")
            .and(warp::get())
            .and(request_context(self.monitor.clone()))
            .and_then(move |_ctx: RequestContext| {
                let reporter = reporter.clone();
                async move {
                    let stats = reporter.snapshot().await;
                    Ok::<WithStatus<Json>, warp::Rejection>(json_reply(StatusCode::OK, &stats))
                }
            })
    }

    /// Catch-all: registra la petición y responde 404.
    fn fallback_route(
        &self,
    ) -> impl Filter<Extract = impl warp::Reply, Error = warp::Rejection> + Clone {
        warp::any()
            .and(request_context(self.monitor.clone()))
            .map(|_ctx: RequestContext| {
                error_reply(StatusCode::NOT_FOUND, "Recurso no encontrado")
            })
    }

    async fn handle_list_creators(
        storage: Arc<SqliteStorage>,
    ) -> Result<WithStatus<Json>, warp::Rejection> {
        match storage.list_creators().await {
            Ok(creators) => Ok(json_reply(StatusCode::OK, &creators)),
            Err(e) => {
                tracing::error!("Error listando creadores: {}", e);
                Ok(database_error())
            }
        }
    }

    async fn handle_creator_profile(
        storage: Arc<SqliteStorage>,
        monitor: Arc<SecurityMonitor>,
        username: String,
        ctx: RequestContext,
    ) -> Result<WithStatus<Json>, warp::Rejection> {
        // El segmento llega percent-encoded; para el matcher y la búsqueda
        // cuenta el valor decodificado. Si no decodifica, se usa el crudo.
        let username = match urlencoding::decode(&username) {
            Ok(decoded) => decoded.into_owned(),
            Err(_) => username,
        };

        monitor.inspect_url_param("username", &username, &ctx);

        match storage.find_creator_by_username(&username).await {
            Ok(Some(profile)) => Ok(json_reply(StatusCode::OK, &profile)),
            Ok(None) => Ok(error_reply(StatusCode::NOT_FOUND, "Creador no encontrado")),
            Err(e) => {
                tracing::error!("Error buscando creador: {}", e);
                Ok(database_error())
            }
        }
    }

    async fn handle_creator_coffees(
        storage: Arc<SqliteStorage>,
        username: String,
    ) -> Result<WithStatus<Json>, warp::Rejection> {
        let username = match urlencoding::decode(&username) {
            Ok(decoded) => decoded.into_owned(),
            Err(_) => username,
        };

        match storage.coffees_for_creator(&username).await {
            Ok(coffees) => Ok(json_reply(StatusCode::OK, &coffees)),
            Err(e) => {
                tracing::error!("Error listando cafés: {}", e);
                Ok(database_error())
            }
        }
    }

    async fn handle_send_coffee(
        storage: Arc<SqliteStorage>,
        monitor: Arc<SecurityMonitor>,
        ctx: RequestContext,
        body: Bytes,
    ) -> Result<WithStatus<Json>, warp::Rejection> {
        let request: CoffeeRequest = match serde_json::from_slice(&body) {
            Ok(request) => request,
            Err(_) => return Ok(error_reply(StatusCode::BAD_REQUEST, "JSON inválido")),
        };

        let creator_username = coerce_text(&request.creator_username);
        let supporter_name = coerce_text(&request.supporter_name);
        let message = coerce_text(&request.message);

        // La detección corre antes que la validación: un payload malicioso
        // en un cuerpo incompleto también interesa.
        monitor.inspect_coffee_fields(&supporter_name, &message, &ctx);

        if creator_username.is_empty() || supporter_name.is_empty() {
            return Ok(error_reply(
                StatusCode::BAD_REQUEST,
                "Faltan campos requeridos",
            ));
        }

        let creator_id = match storage.creator_id_by_username(&creator_username).await {
            Ok(Some(id)) => id,
            Ok(None) => {
                return Ok(error_reply(StatusCode::NOT_FOUND, "Creador no encontrado"))
            }
            Err(e) => {
                tracing::error!("Error resolviendo creador: {}", e);
                return Ok(database_error());
            }
        };

        let coffee_count = coerce_coffee_count(&request.coffee_count);

        match storage
            .insert_coffee(creator_id, &supporter_name, &message, coffee_count)
            .await
        {
            Ok(coffee_id) => Ok(json_reply(
                StatusCode::CREATED,
                &serde_json::json!({
                    "success": true,
                    "message": "¡Café enviado con éxito!",
                    "coffee_id": coffee_id,
                }),
            )),
            Err(e) => {
                tracing::error!("Error insertando café: {}", e);
                Ok(database_error())
            }
        }
    }

    async fn handle_site_stats(
        storage: Arc<SqliteStorage>,
    ) -> Result<WithStatus<Json>, warp::Rejection> {
        match storage.site_stats().await {
            Ok(stats) => Ok(json_reply(StatusCode::OK, &stats)),
            Err(e) => {
                tracing::error!("Error agregando estadísticas: {}", e);
                Ok(database_error())
            }
        }
    }

    async fn handle_login(
        storage: Arc<SqliteStorage>,
        monitor: Arc<SecurityMonitor>,
        tokens: Arc<TokenService>,
        ctx: RequestContext,
        body: Bytes,
    ) -> Result<WithStatus<Json>, warp::Rejection> {
        let request: LoginRequest = match serde_json::from_slice(&body) {
            Ok(request) => request,
            Err(_) => return Ok(error_reply(StatusCode::BAD_REQUEST, "JSON inválido")),
        };

        let email = coerce_text(&request.email);
        let password = coerce_text(&request.password);

        // Captura de honeypot primero, pase lo que pase después.
        monitor.inspect_login(&email, &password, &ctx);

        let account = match storage.find_account_by_email(&email).await {
            Ok(account) => account,
            Err(e) => {
                tracing::error!("Error buscando cuenta: {}", e);
                return Ok(database_error());
            }
        };

        // Cuenta inexistente y contraseña incorrecta responden lo mismo:
        // el que prueba no distingue una de otra.
        let account = match account {
            Some(account) if account.password == password => account,
            _ => {
                return Ok(error_reply(
                    StatusCode::UNAUTHORIZED,
                    "Credenciales incorrectas",
                ))
            }
        };

        match tokens.issue(account.id, &account.username, &account.email) {
            Ok(token) => Ok(json_reply(
                StatusCode::OK,
                &serde_json::json!({
                    "success": true,
                    "message": "Login exitoso",
                    "token": token,
                    "username": account.display_name,
                }),
            )),
            Err(e) => {
                tracing::error!("Error firmando token: {}", e);
                Ok(error_reply(
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Error interno del servidor",
                ))
            }
        }
    }

    async fn handle_my_coffees(
        storage: Arc<SqliteStorage>,
        auth: AuthOutcome,
    ) -> Result<WithStatus<Json>, warp::Rejection> {
        let claims = match auth {
            AuthOutcome::Missing => {
                return Ok(error_reply(StatusCode::UNAUTHORIZED, "No autorizado"))
            }
            AuthOutcome::Invalid => {
                return Ok(error_reply(
                    StatusCode::FORBIDDEN,
                    "Token inválido o expirado",
                ))
            }
            AuthOutcome::Authorized(claims) => claims,
        };

        match storage.coffees_by_creator_id(claims.id).await {
            Ok(coffees) => Ok(json_reply(StatusCode::OK, &coffees)),
            Err(e) => {
                tracing::error!("Error listando cafés del creador: {}", e);
                Ok(database_error())
            }
        }
    }
}

fn json_reply<T: Serialize>(status: StatusCode, value: &T) -> WithStatus<Json> {
    warp::reply::with_status(warp::reply::json(value), status)
}

fn error_reply(status: StatusCode, message: &str) -> WithStatus<Json> {
    json_reply(status, &serde_json::json!({ "error": message }))
}

fn database_error() -> WithStatus<Json> {
    error_reply(
        StatusCode::INTERNAL_SERVER_ERROR,
        "Error en la base de datos",
    )
}
