use anyhow::{Context, Result};
use serde::Serialize;
use sqlx::{migrate::MigrateDatabase, Row, Sqlite, SqlitePool};

/// Fila pública de creador, sin email ni credenciales.
#[derive(Debug, Clone, Serialize)]
pub struct CreatorSummary {
    pub id: i64,
    pub username: String,
    pub display_name: String,
    pub bio: Option<String>,
    pub created_at: String,
}

/// Perfil de creador tal como lo expone la ruta de perfil.
#[derive(Debug, Clone, Serialize)]
pub struct CreatorProfile {
    pub id: i64,
    pub username: String,
    pub display_name: String,
    pub bio: Option<String>,
    pub email: String,
    pub created_at: String,
}

/// Fila completa de la cuenta; solo la consume la verificación de login.
#[derive(Debug, Clone)]
pub struct CreatorAccount {
    pub id: i64,
    pub username: String,
    pub display_name: String,
    pub email: String,
    pub password: String,
}

/// Café visible públicamente en el perfil de un creador.
#[derive(Debug, Clone, Serialize)]
pub struct CoffeeRow {
    pub supporter_name: String,
    pub message: Option<String>,
    pub coffee_count: i64,
    pub created_at: String,
}

/// Café completo, para el dashboard del propio creador.
#[derive(Debug, Clone, Serialize)]
pub struct CoffeeRecord {
    pub id: i64,
    pub creator_id: i64,
    pub supporter_name: String,
    pub message: Option<String>,
    pub coffee_count: i64,
    pub created_at: String,
}

/// Agregados públicos del sitio.
#[derive(Debug, Clone, Serialize)]
pub struct SiteStats {
    pub total_creators: i64,
    pub total_coffees: i64,
    pub total_coffee_count: i64,
}

/// Persistencia en SQLite de creadores y cafés.
pub struct SqliteStorage {
    pool: SqlitePool,
}

impl SqliteStorage {
    /// Abre (creando si hace falta) la base de datos, inicializa el esquema
    /// y siembra los creadores de demostración si la tabla está vacía.
    pub async fn new(database_url: &str) -> Result<Self> {
        if !Sqlite::database_exists(database_url).await.unwrap_or(false) {
            Sqlite::create_database(database_url)
                .await
                .context("Failed to create SQLite database")?;
            tracing::info!("Created SQLite database: {}", database_url);
        }

        let pool = SqlitePool::connect(database_url)
            .await
            .context("Failed to connect to SQLite database")?;

        let storage = Self { pool };
        storage.initialize_schema().await?;
        storage.seed_demo_creators().await?;

        tracing::info!("SQLite storage initialized successfully");
        Ok(storage)
    }

    /// Inicializa el esquema de la base de datos
    async fn initialize_schema(&self) -> Result<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS creators (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                username TEXT UNIQUE NOT NULL,
                display_name TEXT NOT NULL,
                bio TEXT,
                email TEXT UNIQUE NOT NULL,
                password TEXT NOT NULL,
                created_at DATETIME DEFAULT CURRENT_TIMESTAMP
            )
        "#,
        )
        .execute(&self.pool)
        .await
        .context("Failed to create creators table")?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS coffees (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                creator_id INTEGER NOT NULL,
                supporter_name TEXT NOT NULL,
                message TEXT,
                coffee_count INTEGER DEFAULT 1,
                created_at DATETIME DEFAULT CURRENT_TIMESTAMP,
                FOREIGN KEY (creator_id) REFERENCES creators(id)
            )
        "#,
        )
        .execute(&self.pool)
        .await
        .context("Failed to create coffees table")?;

        tracing::debug!("Database schema initialized");
        Ok(())
    }

    /// Siembra los tres creadores de ejemplo si no hay ninguno.
    async fn seed_demo_creators(&self) -> Result<()> {
        let row = sqlx::query("SELECT COUNT(*) as count FROM creators")
            .fetch_one(&self.pool)
            .await
            .context("Failed to count creators")?;
        let count: i64 = row.try_get("count")?;

        if count > 0 {
            return Ok(());
        }

        let demo_creators = [
            (
                "alex_dev",
                "Alex Developer",
                "Creando contenido sobre programación y ciberseguridad.",
                "alex@dev.io",
                "pass123",
            ),
            (
                "maria_art",
                "María Artista",
                "Ilustradora digital y diseñadora gráfica.",
                "maria@art.com",
                "artista456",
            ),
            (
                "carlos_music",
                "Carlos Música",
                "Compositor y productor musical independiente.",
                "carlos@music.net",
                "guitarra789",
            ),
        ];

        for (username, display_name, bio, email, password) in demo_creators {
            sqlx::query(
                "INSERT INTO creators (username, display_name, bio, email, password) VALUES (?, ?, ?, ?, ?)",
            )
            .bind(username)
            .bind(display_name)
            .bind(bio)
            .bind(email)
            .bind(password)
            .execute(&self.pool)
            .await
            .context("Failed to seed demo creator")?;
        }

        tracing::info!("Demo creators seeded");
        Ok(())
    }

    /// Lista pública de creadores, los más recientes primero.
    pub async fn list_creators(&self) -> Result<Vec<CreatorSummary>> {
        let rows = sqlx::query(
            r#"
            SELECT id, username, display_name, bio, created_at
            FROM creators
            ORDER BY created_at DESC
        "#,
        )
        .fetch_all(&self.pool)
        .await
        .context("Failed to fetch creators")?;

        let mut creators = Vec::new();
        for row in rows {
            creators.push(CreatorSummary {
                id: row.try_get("id")?,
                username: row.try_get("username")?,
                display_name: row.try_get("display_name")?,
                bio: row.try_get("bio")?,
                created_at: row.try_get("created_at")?,
            });
        }

        Ok(creators)
    }

    /// Busca el perfil de un creador por username.
    pub async fn find_creator_by_username(&self, username: &str) -> Result<Option<CreatorProfile>> {
        let row = sqlx::query(
            r#"
            SELECT id, username, display_name, bio, email, created_at
            FROM creators
            WHERE username = ?
        "#,
        )
        .bind(username)
        .fetch_optional(&self.pool)
        .await
        .context("Failed to fetch creator by username")?;

        match row {
            Some(row) => Ok(Some(CreatorProfile {
                id: row.try_get("id")?,
                username: row.try_get("username")?,
                display_name: row.try_get("display_name")?,
                bio: row.try_get("bio")?,
                email: row.try_get("email")?,
                created_at: row.try_get("created_at")?,
            })),
            None => Ok(None),
        }
    }

    /// Busca la cuenta completa por email, para verificar un login.
    pub async fn find_account_by_email(&self, email: &str) -> Result<Option<CreatorAccount>> {
        let row = sqlx::query(
            r#"
            SELECT id, username, display_name, email, password
            FROM creators
            WHERE email = ?
        "#,
        )
        .bind(email)
        .fetch_optional(&self.pool)
        .await
        .context("Failed to fetch creator by email")?;

        match row {
            Some(row) => Ok(Some(CreatorAccount {
                id: row.try_get("id")?,
                username: row.try_get("username")?,
                display_name: row.try_get("display_name")?,
                email: row.try_get("email")?,
                password: row.try_get("password")?,
            })),
            None => Ok(None),
        }
    }

    /// Id de un creador por username, para validar antes de insertar.
    pub async fn creator_id_by_username(&self, username: &str) -> Result<Option<i64>> {
        let row = sqlx::query("SELECT id FROM creators WHERE username = ?")
            .bind(username)
            .fetch_optional(&self.pool)
            .await
            .context("Failed to resolve creator id")?;

        match row {
            Some(row) => Ok(Some(row.try_get("id")?)),
            None => Ok(None),
        }
    }

    /// Cafés públicos de un creador, los más recientes primero.
    pub async fn coffees_for_creator(&self, username: &str) -> Result<Vec<CoffeeRow>> {
        let rows = sqlx::query(
            r#"
            SELECT c.supporter_name, c.message, c.coffee_count, c.created_at
            FROM coffees c
            JOIN creators cr ON c.creator_id = cr.id
            WHERE cr.username = ?
            ORDER BY c.created_at DESC
            LIMIT 50
        "#,
        )
        .bind(username)
        .fetch_all(&self.pool)
        .await
        .context("Failed to fetch coffees for creator")?;

        let mut coffees = Vec::new();
        for row in rows {
            coffees.push(CoffeeRow {
                supporter_name: row.try_get("supporter_name")?,
                message: row.try_get("message")?,
                coffee_count: row.try_get("coffee_count")?,
                created_at: row.try_get("created_at")?,
            });
        }

        Ok(coffees)
    }

    /// Todos los cafés recibidos por un creador, para su dashboard.
    pub async fn coffees_by_creator_id(&self, creator_id: i64) -> Result<Vec<CoffeeRecord>> {
        let rows = sqlx::query(
            r#"
            SELECT id, creator_id, supporter_name, message, coffee_count, created_at
            FROM coffees
            WHERE creator_id = ?
            ORDER BY created_at DESC
        "#,
        )
        .bind(creator_id)
        .fetch_all(&self.pool)
        .await
        .context("Failed to fetch coffees by creator id")?;

        let mut coffees = Vec::new();
        for row in rows {
            coffees.push(CoffeeRecord {
                id: row.try_get("id")?,
                creator_id: row.try_get("creator_id")?,
                supporter_name: row.try_get("supporter_name")?,
                message: row.try_get("message")?,
                coffee_count: row.try_get("coffee_count")?,
                created_at: row.try_get("created_at")?,
            });
        }

        Ok(coffees)
    }

    /// Inserta un café y devuelve su id.
    pub async fn insert_coffee(
        &self,
        creator_id: i64,
        supporter_name: &str,
        message: &str,
        coffee_count: i64,
    ) -> Result<i64> {
        let result = sqlx::query(
            "INSERT INTO coffees (creator_id, supporter_name, message, coffee_count) VALUES (?, ?, ?, ?)",
        )
        .bind(creator_id)
        .bind(supporter_name)
        .bind(message)
        .bind(coffee_count)
        .execute(&self.pool)
        .await
        .context("Failed to insert coffee")?;

        Ok(result.last_insert_rowid())
    }

    /// Agregados del sitio para la ruta pública de estadísticas.
    pub async fn site_stats(&self) -> Result<SiteStats> {
        let row = sqlx::query(
            r#"
            SELECT
                (SELECT COUNT(*) FROM creators) as total_creators,
                (SELECT COUNT(*) FROM coffees) as total_coffees,
                (SELECT COALESCE(SUM(coffee_count), 0) FROM coffees) as total_coffee_count
        "#,
        )
        .fetch_one(&self.pool)
        .await
        .context("Failed to fetch site stats")?;

        Ok(SiteStats {
            total_creators: row.try_get("total_creators")?,
            total_coffees: row.try_get("total_coffees")?,
            total_coffee_count: row.try_get("total_coffee_count")?,
        })
    }
}
