use anyhow::{Context, Result};
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use warp::Filter;

/// Claims del token de sesión de un creador.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub id: i64,
    pub username: String,
    pub email: String,
    pub exp: i64,
}

/// Emisión y verificación de credenciales bearer firmadas (HS256).
#[derive(Clone)]
pub struct TokenService {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    ttl: Duration,
}

impl TokenService {
    pub fn new(secret: &str, ttl_secs: i64) -> Self {
        Self {
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            ttl: Duration::seconds(ttl_secs),
        }
    }

    /// Firma un token con la identidad del creador y el vencimiento
    /// configurado (1 hora por defecto).
    pub fn issue(&self, id: i64, username: &str, email: &str) -> Result<String> {
        let claims = Claims {
            id,
            username: username.to_string(),
            email: email.to_string(),
            exp: (Utc::now() + self.ttl).timestamp(),
        };

        encode(&Header::default(), &claims, &self.encoding_key).context("Failed to sign token")
    }

    /// Verifica firma y vencimiento; devuelve los claims si el token vale.
    pub fn verify(&self, token: &str) -> Result<Claims> {
        let data = decode::<Claims>(token, &self.decoding_key, &Validation::default())
            .context("Invalid or expired token")?;
        Ok(data.claims)
    }
}

/// Desenlace de autenticar la cabecera Authorization de una petición.
/// Cabecera ausente o sin token es distinto de token inválido: la primera
/// responde 401 y la segunda 403, como espera el cliente.
#[derive(Debug, Clone)]
pub enum AuthOutcome {
    Missing,
    Invalid,
    Authorized(Claims),
}

/// Filtro warp que evalúa `Authorization: Bearer <token>` sin rechazar la
/// petición: el handler decide la respuesta según el desenlace.
pub fn authenticate(
    tokens: Arc<TokenService>,
) -> impl Filter<Extract = (AuthOutcome,), Error = warp::Rejection> + Clone {
    warp::header::optional::<String>("authorization").map(move |header: Option<String>| {
        let header = match header {
            Some(header) => header,
            None => return AuthOutcome::Missing,
        };
        let token = match header.split_whitespace().nth(1) {
            Some(token) => token,
            None => return AuthOutcome::Missing,
        };

        match tokens.verify(token) {
            Ok(claims) => AuthOutcome::Authorized(claims),
            Err(_) => AuthOutcome::Invalid,
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_issue_and_verify_round_trip() {
        let tokens = TokenService::new("secreto-de-test", 3600);

        let token = tokens.issue(7, "alex_dev", "alex@dev.io").unwrap();
        let claims = tokens.verify(&token).unwrap();

        assert_eq!(claims.id, 7);
        assert_eq!(claims.username, "alex_dev");
        assert_eq!(claims.email, "alex@dev.io");
        assert!(claims.exp > Utc::now().timestamp());
    }

    #[test]
    fn test_expired_token_is_rejected() {
        // TTL negativo: el token nace vencido.
        let tokens = TokenService::new("secreto-de-test", -120);

        let token = tokens.issue(1, "alex_dev", "alex@dev.io").unwrap();
        assert!(tokens.verify(&token).is_err());
    }

    #[test]
    fn test_token_signed_with_other_secret_is_rejected() {
        let issuer = TokenService::new("secreto-a", 3600);
        let verifier = TokenService::new("secreto-b", 3600);

        let token = issuer.issue(1, "alex_dev", "alex@dev.io").unwrap();
        assert!(verifier.verify(&token).is_err());
    }

    #[tokio::test]
    async fn test_authenticate_filter_outcomes() {
        let tokens = Arc::new(TokenService::new("secreto-de-test", 3600));
        let filter = authenticate(tokens.clone());

        let outcome = warp::test::request().filter(&filter).await.unwrap();
        assert!(matches!(outcome, AuthOutcome::Missing));

        let outcome = warp::test::request()
            .header("authorization", "Bearer no-es-un-token")
            .filter(&filter)
            .await
            .unwrap();
        assert!(matches!(outcome, AuthOutcome::Invalid));

        let token = tokens.issue(3, "maria_art", "maria@art.com").unwrap();
        let outcome = warp::test::request()
            .header("authorization", format!("Bearer {}", token))
            .filter(&filter)
            .await
            .unwrap();
        match outcome {
            AuthOutcome::Authorized(claims) => assert_eq!(claims.id, 3),
            other => panic!("Se esperaba Authorized, fue {:?}", other),
        }
    }
}
