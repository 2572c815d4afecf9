use std::sync::Arc;

use anyhow::{Context, Result};
use axum::{
    Router,
    http::{HeaderValue, Method, header},
};
use sqlx::postgres::PgPoolOptions;
use tower_http::{
    cors::{AllowOrigin, Any, CorsLayer},
    trace::TraceLayer,
};
use tracing::{info, warn};

use crate::{
    api,
    auth::{PasswordHasher, TokenIssuer},
    classification::{Classifier, Rulebook},
    config::Config,
    observability::Telemetry,
    store::dao::{ArticleDao, MemoryDao, PgDao, UserDao},
};

#[derive(Clone)]
pub(crate) struct AppState {
    registry: Arc<ComponentRegistry>,
}

pub struct ComponentRegistry {
    config: Arc<Config>,
    telemetry: Telemetry,
    classifier: Arc<Classifier>,
    articles: Arc<dyn ArticleDao>,
    users: Arc<dyn UserDao>,
    tokens: TokenIssuer,
    passwords: PasswordHasher,
}

impl AppState {
    pub(crate) fn new(registry: ComponentRegistry) -> Self {
        Self {
            registry: Arc::new(registry),
        }
    }

    pub(crate) fn telemetry(&self) -> &Telemetry {
        &self.registry.telemetry
    }

    pub(crate) fn classifier(&self) -> &Classifier {
        &self.registry.classifier
    }

    pub(crate) fn articles(&self) -> &dyn ArticleDao {
        self.registry.articles.as_ref()
    }

    pub(crate) fn users(&self) -> &dyn UserDao {
        self.registry.users.as_ref()
    }

    pub(crate) fn tokens(&self) -> &TokenIssuer {
        &self.registry.tokens
    }

    pub(crate) fn passwords(&self) -> PasswordHasher {
        self.registry.passwords
    }
}

impl ComponentRegistry {
    /// 構成情報と依存をまとめて初期化し、アプリケーションの共有レジストリを構築する。
    ///
    /// `DATABASE_URL` があれば PostgreSQL に接続してスキーマを適用し、なければメモリストアを使う。
    ///
    /// # Errors
    /// ルールブックの読み込み、接続プールの構成、スキーマ適用のいずれかが失敗した場合はエラーを返す。
    pub async fn build(config: Config) -> Result<Self> {
        let config = Arc::new(config);
        let telemetry = Telemetry::new()?;

        let rulebook = match config.classifier_rules_path() {
            Some(path) => Rulebook::from_yaml_file(path)
                .with_context(|| format!("failed to load rulebook from {}", path.display()))?,
            None => Rulebook::default(),
        };
        info!(
            rules = rulebook.rules().len(),
            custom = config.classifier_rules_path().is_some(),
            "classifier rulebook loaded"
        );
        let classifier = Arc::new(Classifier::new(rulebook).context("failed to build classifier")?);

        let (articles, users): (Arc<dyn ArticleDao>, Arc<dyn UserDao>) =
            match config.database_url() {
                Some(dsn) => {
                    let pool = PgPoolOptions::new()
                        .max_connections(config.db_max_connections())
                        .min_connections(config.db_min_connections())
                        .acquire_timeout(config.db_acquire_timeout())
                        .idle_timeout(Some(config.db_idle_timeout()))
                        .max_lifetime(Some(config.db_max_lifetime()))
                        .test_before_acquire(true)
                        .connect_lazy(dsn)
                        .context("failed to configure news_check connection pool")?;
                    let dao = Arc::new(PgDao::new(pool));
                    dao.migrate().await.context("failed to apply database schema")?;
                    info!("using PostgreSQL article store");
                    (dao.clone() as Arc<dyn ArticleDao>, dao as Arc<dyn UserDao>)
                }
                None => {
                    warn!("DATABASE_URL is not set; articles and users are kept in memory only");
                    let dao = Arc::new(MemoryDao::new());
                    (dao.clone() as Arc<dyn ArticleDao>, dao as Arc<dyn UserDao>)
                }
            };

        let tokens = TokenIssuer::new(config.jwt_secret(), config.jwt_ttl());
        let passwords = PasswordHasher::new(config.password_hash_rounds());

        Ok(Self {
            config,
            telemetry,
            classifier,
            articles,
            users,
            tokens,
            passwords,
        })
    }
}

pub fn build_router(registry: ComponentRegistry) -> Router {
    let cors = cors_layer(registry.config.cors_allowed_origins());
    let state = AppState::new(registry);
    api::router(state)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
}

fn cors_layer(origins: &[String]) -> CorsLayer {
    if origins.is_empty() {
        return CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any);
    }

    let allowed: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(error) => {
                warn!(%origin, %error, "ignoring invalid CORS origin");
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(allowed))
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE])
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;

    pub(crate) const TEST_SECRET: &str = "unit-test-secret-0123456789";

    pub(crate) fn test_config() -> Config {
        Config::from_lookup(|name| match name {
            "JWT_SECRET" => Some(TEST_SECRET.to_string()),
            "PASSWORD_HASH_ROUNDS" => Some("1000".to_string()),
            _ => None,
        })
        .expect("test config loads")
    }

    pub(crate) async fn test_state() -> AppState {
        let registry = ComponentRegistry::build(test_config())
            .await
            .expect("registry builds");
        AppState::new(registry)
    }
}
