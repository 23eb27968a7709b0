use formstore_core::error::CoreError;
use formstore_core::schema::Catalog;
use formstore_db::auth::{self, AuthenticatedUser};
use formstore_db::{EntityStore, StoreConfig, StoreResult};

/// State shared by every command of one invocation.
pub struct AppState {
    pub store: EntityStore,
    /// Set by a successful [`AppState::login`].
    pub user: Option<AuthenticatedUser>,
}

impl AppState {
    pub async fn open(config: &StoreConfig, catalog: Catalog) -> StoreResult<Self> {
        let store = EntityStore::open(config, catalog).await?;
        Ok(Self::new(store))
    }

    pub fn new(store: EntityStore) -> Self {
        Self { store, user: None }
    }

    pub async fn login(&mut self, username: &str, password: &str) -> StoreResult<&AuthenticatedUser> {
        let user = auth::login(&self.store, username, password).await?;
        Ok(self.user.insert(user))
    }

    /// The logged-in user, if their role is `role`.
    pub fn require_role(&self, role: &str) -> Result<&AuthenticatedUser, CoreError> {
        let user = self
            .user
            .as_ref()
            .ok_or_else(|| CoreError::Unauthorized("Login required".into()))?;
        user.require_role(role)?;
        Ok(user)
    }
}
