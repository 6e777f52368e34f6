//! Wiring - builds the booking core from configuration.
//!
//! Nothing here is global. The in-memory fallback stores are constructed,
//! seeded and injected explicitly, and every concrete rule store is required
//! by trait bound to support administration, so a store lacking that
//! capability is a compile error rather than a request-time failure.

use std::sync::Arc;

use reqwest::Client;
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use thiserror::Error;

use crate::adapters::calendar::{GoogleCalendarConfig, GoogleCalendarGateway};
use crate::adapters::credentials::{
    FileRefreshTokenStore, InMemoryRefreshTokenStore, OAuthRefreshConfig, RefreshingOAuthStrategy,
    StaticTokenStrategy, TokenSourceChain,
};
use crate::adapters::memory::{InMemoryReservationRepository, InMemoryRuleRepository, SeedData, SeedError};
use crate::adapters::postgres::{run_migrations, PostgresReservationRepository, PostgresRuleRepository};
use crate::adapters::resilient::{ResilientReservationRepository, ResilientRuleRepository};
use crate::application::{
    CancelReservationHandler, ComputeSlotsHandler, GetReservationHandler, ReserveSlotHandler,
    SchedulingSettings,
};
use crate::config::{AppConfig, CredentialsConfig, StrategyKind, ValidationError};
use crate::domain::foundation::DomainError;
use crate::ports::{
    AvailabilityRuleRepository, CalendarGateway, Clock, RefreshTokenStore, ReservationRepository,
    RuleAdministration, SystemClock, TokenStrategy,
};

#[derive(Debug, Error)]
pub enum BootstrapError {
    #[error("invalid configuration: {0}")]
    Config(#[from] ValidationError),

    #[error("failed to build HTTP client: {0}")]
    HttpClient(#[from] reqwest::Error),

    #[error("invalid database settings: {0}")]
    Database(#[from] sqlx::Error),

    #[error("migrations failed: {0}")]
    Migration(DomainError),

    #[error(transparent)]
    Seed(#[from] SeedError),
}

/// Repositories as the handlers see them.
#[derive(Clone)]
pub struct Stores {
    pub rules: Arc<dyn AvailabilityRuleRepository>,
    pub rule_admin: Arc<dyn RuleAdministration>,
    pub reservations: Arc<dyn ReservationRepository>,
    /// The in-memory canonical rule store; seed data lands here.
    pub fallback_rules: InMemoryRuleRepository,
}

impl Stores {
    /// In-memory stores only.
    pub fn in_memory() -> Self {
        let fallback_rules = InMemoryRuleRepository::new();
        let shared = Arc::new(fallback_rules.clone());
        Self {
            rules: shared.clone(),
            rule_admin: shared,
            reservations: Arc::new(InMemoryReservationRepository::new()),
            fallback_rules,
        }
    }

    /// Postgres primaries wrapped by the resilient selector.
    pub fn postgres(pool: PgPool, config: &AppConfig) -> Self {
        let fallback_rules = InMemoryRuleRepository::new();
        let rules = Arc::new(ResilientRuleRepository::new(
            PostgresRuleRepository::new(pool.clone()),
            fallback_rules.clone(),
            config.store.rules_policy,
        ));
        let reservations = ResilientReservationRepository::new(
            PostgresReservationRepository::new(pool),
            InMemoryReservationRepository::new(),
            config.store.reservations_policy,
        );
        Self {
            rules: rules.clone(),
            rule_admin: rules,
            reservations: Arc::new(reservations),
            fallback_rules,
        }
    }
}

/// The four entry points plus the rule administration capability.
pub struct BookingCore {
    pub compute_slots: ComputeSlotsHandler,
    pub reserve_slot: ReserveSlotHandler,
    pub cancel_reservation: CancelReservationHandler,
    pub get_reservation: GetReservationHandler,
    pub rules: Arc<dyn RuleAdministration>,
}

impl BookingCore {
    /// Builds the handlers over already-constructed collaborators.
    pub fn assemble(
        stores: &Stores,
        gateway: Arc<dyn CalendarGateway>,
        clock: Arc<dyn Clock>,
        settings: SchedulingSettings,
    ) -> Self {
        let settings = Arc::new(settings);
        Self {
            compute_slots: ComputeSlotsHandler::new(
                stores.rules.clone(),
                stores.reservations.clone(),
                gateway.clone(),
                clock.clone(),
                settings.clone(),
            ),
            reserve_slot: ReserveSlotHandler::new(
                stores.rules.clone(),
                stores.reservations.clone(),
                gateway.clone(),
                clock.clone(),
                settings.clone(),
            ),
            cancel_reservation: CancelReservationHandler::new(
                stores.reservations.clone(),
                gateway,
                clock,
                settings.clone(),
            ),
            get_reservation: GetReservationHandler::new(stores.reservations.clone(), settings),
            rules: stores.rule_admin.clone(),
        }
    }
}

/// Builds the whole core from validated configuration.
pub async fn build(config: &AppConfig) -> Result<BookingCore, BootstrapError> {
    config.validate()?;

    let client = Client::builder().build()?;
    let chain = build_token_chain(&config.credentials, &client);
    tracing::info!(strategies = ?chain.strategy_names(), "Credential chain ready");

    let gateway = GoogleCalendarGateway::new(
        GoogleCalendarConfig::default()
            .with_base_url(&config.calendar.api_base_url)
            .with_request_timeout(config.calendar.request_timeout())
            .with_notify_attendees(config.calendar.notify_attendees),
        client,
        Arc::new(chain),
    );

    let stores = build_stores(config).await?;
    if let Some(path) = &config.store.seed_path {
        let seed = SeedData::load(path).await?;
        seed.apply(&stores.fallback_rules).await?;
    }

    Ok(BookingCore::assemble(
        &stores,
        Arc::new(gateway),
        Arc::new(SystemClock),
        scheduling_settings(config),
    ))
}

async fn build_stores(config: &AppConfig) -> Result<Stores, BootstrapError> {
    let Some(url) = config.database.url() else {
        tracing::info!("No database configured, using in-memory stores");
        return Ok(Stores::in_memory());
    };

    // Lazy so a store that is down at startup is handled per call by the selector.
    let pool = PgPoolOptions::new()
        .min_connections(config.database.min_connections)
        .max_connections(config.database.max_connections)
        .acquire_timeout(config.database.acquire_timeout())
        .connect_lazy(url)?;

    if config.database.run_migrations {
        run_migrations(&pool).await.map_err(BootstrapError::Migration)?;
        tracing::info!("Database migrations applied");
    }

    tracing::info!(
        rules_policy = ?config.store.rules_policy,
        reservations_policy = ?config.store.reservations_policy,
        "Using PostgreSQL stores with in-memory fallback"
    );
    Ok(Stores::postgres(pool, config))
}

/// Strategies in configured order.
pub fn build_token_chain(config: &CredentialsConfig, client: &Client) -> TokenSourceChain {
    let mut chain = TokenSourceChain::new();
    for kind in &config.strategies {
        let strategy: Option<Arc<dyn TokenStrategy>> = match kind {
            StrategyKind::OauthRefresh => oauth_strategy(config, client).map(|s| Arc::new(s) as Arc<dyn TokenStrategy>),
            StrategyKind::StaticEnv => Some(Arc::new(StaticTokenStrategy::from_env(
                kind.as_str(),
                config.static_token_env.clone(),
            ))),
            StrategyKind::StaticSecret => config
                .static_token
                .clone()
                .map(|token| Arc::new(StaticTokenStrategy::from_secret(kind.as_str(), token)) as Arc<dyn TokenStrategy>),
        };
        match strategy {
            Some(strategy) => chain = chain.with_strategy(strategy),
            None => tracing::warn!(strategy = kind.as_str(), "Credential strategy skipped: incomplete configuration"),
        }
    }
    chain
}

fn oauth_strategy(config: &CredentialsConfig, client: &Client) -> Option<RefreshingOAuthStrategy> {
    let client_id = config.oauth_client_id.clone()?;
    let client_secret = config.oauth_client_secret.clone()?;

    let store: Arc<dyn RefreshTokenStore> = match &config.refresh_token_path {
        Some(path) => Arc::new(FileRefreshTokenStore::new(path)),
        None => Arc::new(InMemoryRefreshTokenStore::new()),
    };

    let mut oauth = OAuthRefreshConfig::new(StrategyKind::OauthRefresh.as_str(), client_id, client_secret)
        .with_token_url(&config.oauth_token_url)
        .with_expiry_skew(config.refresh_skew())
        .with_request_timeout(config.token_request_timeout());
    if let Some(token) = config.oauth_refresh_token.clone() {
        oauth = oauth.with_initial_refresh_token(token);
    }
    Some(RefreshingOAuthStrategy::new(oauth, client.clone(), store))
}

pub fn scheduling_settings(config: &AppConfig) -> SchedulingSettings {
    SchedulingSettings {
        max_range_days: config.scheduling.max_range_days,
        min_notice: config.scheduling.min_notice(),
        store_timeout: config.scheduling.store_timeout(),
        confirmation_timeout: config.scheduling.confirmation_timeout(),
        default_calendar_id: config.calendar.default_calendar_id.clone(),
        owner_calendars: config.calendar.owner_calendars.clone(),
        request_conference: config.calendar.request_conference,
    }
}
