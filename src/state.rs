use std::sync::Arc;
use tokio::sync::RwLock;

use crate::clients::mail::{self, Mailer};
use crate::config::Config;
use crate::db::Store;
use crate::services::{
    AuthService, MemberService, Notifier, SeaOrmAuthService, SeaOrmMemberService,
};

#[derive(Clone)]
pub struct SharedState {
    pub config: Arc<RwLock<Config>>,

    pub store: Store,

    pub auth_service: Arc<dyn AuthService>,

    pub member_service: Arc<dyn MemberService>,

    pub notifier: Notifier,
}

impl SharedState {
    pub async fn new(config: Config) -> anyhow::Result<Self> {
        let mailer = mail::from_config(&config.mail)?;
        Self::init_with_mailer(config, mailer).await
    }

    /// Same as [`SharedState::new`] but delivering mail through `mailer`.
    pub async fn with_mailer(config: Config, mailer: Arc<dyn Mailer>) -> anyhow::Result<Self> {
        Self::init_with_mailer(config, mailer).await
    }

    async fn init_with_mailer(config: Config, mailer: Arc<dyn Mailer>) -> anyhow::Result<Self> {
        let store = Store::with_pool_options(
            &config.general.database_path,
            config.general.max_db_connections,
            config.general.min_db_connections,
        )
        .await?;

        let notifier = Notifier::start(
            mailer,
            config.mail.from_name.clone(),
            config.mail.outbox_buffer_size,
        );

        let auth_service = Arc::new(SeaOrmAuthService::new(
            store.clone(),
            notifier.clone(),
            config.security.clone(),
        )) as Arc<dyn AuthService>;

        let member_service = Arc::new(SeaOrmMemberService::new(
            store.clone(),
            notifier.clone(),
            config.security.clone(),
        )) as Arc<dyn MemberService>;

        Ok(Self {
            config: Arc::new(RwLock::new(config)),
            store,
            auth_service,
            member_service,
            notifier,
        })
    }
}
