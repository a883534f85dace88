//! Service wiring: stores, token service, ledger and mediator.

use std::sync::Arc;

use anyhow::Context;
use chrono::Utc;
use tracing::info;

use expensegate_auth::{
    Authenticator, CredentialStore, InMemoryPrincipalRepository, InMemoryRevocationSet,
    PrincipalRepository, RevocationSet, TokenService,
};
use expensegate_expenses::{
    AuthorizationMediator, ExpenseLedger, ExpenseRepository, InMemoryExpenseRepository,
};
use expensegate_infra::{AppConfig, db, seed_demo_data};

/// Which storage backs the running instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreBackend {
    InMemory,
    Postgres,
}

impl StoreBackend {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::InMemory => "in_memory",
            Self::Postgres => "postgres",
        }
    }
}

#[derive(Clone)]
pub struct AppServices {
    authenticator: Authenticator,
    mediator: AuthorizationMediator,
    backend: StoreBackend,
}

impl AppServices {
    pub fn new(
        config: &AppConfig,
        principals: Arc<dyn PrincipalRepository>,
        expenses: Arc<dyn ExpenseRepository>,
        revocations: Arc<dyn RevocationSet>,
        backend: StoreBackend,
    ) -> Self {
        let credentials = Arc::new(CredentialStore::plaintext(principals));
        let tokens = Arc::new(TokenService::new(config.token_config(), revocations));

        Self {
            authenticator: Authenticator::new(credentials.clone(), tokens),
            mediator: AuthorizationMediator::new(credentials, ExpenseLedger::new(expenses)),
            backend,
        }
    }

    pub fn in_memory(config: &AppConfig) -> Self {
        Self::new(
            config,
            Arc::new(InMemoryPrincipalRepository::new()),
            Arc::new(InMemoryExpenseRepository::new()),
            Arc::new(InMemoryRevocationSet::new()),
            StoreBackend::InMemory,
        )
    }

    /// Postgres stores, plus Redis revocations when built with `redis`.
    pub async fn persistent(config: &AppConfig) -> anyhow::Result<Self> {
        let url = config
            .database_url
            .as_deref()
            .context("DATABASE_URL is required for persistent stores")?;
        let pool = db::connect(url).await.context("connecting to Postgres")?;
        db::migrate(&pool).await.context("applying database schema")?;

        Ok(Self::new(
            config,
            Arc::new(db::PostgresPrincipalRepository::new(pool.clone())),
            Arc::new(db::PostgresExpenseRepository::new(pool)),
            revocation_backend(config)?,
            StoreBackend::Postgres,
        ))
    }

    pub fn authenticator(&self) -> &Authenticator {
        &self.authenticator
    }

    pub fn mediator(&self) -> &AuthorizationMediator {
        &self.mediator
    }

    pub fn backend(&self) -> StoreBackend {
        self.backend
    }
}

#[cfg(feature = "redis")]
fn revocation_backend(config: &AppConfig) -> anyhow::Result<Arc<dyn RevocationSet>> {
    let set = expensegate_infra::redis::RedisRevocationSet::new(&config.redis_url, None)
        .context("opening Redis client")?;
    Ok(Arc::new(set))
}

#[cfg(not(feature = "redis"))]
fn revocation_backend(_config: &AppConfig) -> anyhow::Result<Arc<dyn RevocationSet>> {
    tracing::warn!("built without the `redis` feature; revocations are process-local");
    Ok(Arc::new(InMemoryRevocationSet::new()))
}

/// Build services for `config` and seed demo data if enabled.
pub async fn build_services(config: &AppConfig) -> anyhow::Result<AppServices> {
    let services = if config.use_persistent_stores {
        AppServices::persistent(config).await?
    } else {
        AppServices::in_memory(config)
    };
    info!(backend = services.backend().as_str(), "services ready");

    if config.seed_demo_data {
        seed_demo_data(
            services.authenticator().credentials().principals().as_ref(),
            services.mediator().ledger().repository().as_ref(),
            Utc::now(),
        )
        .await
        .context("seeding demo data")?;
    }

    Ok(services)
}
