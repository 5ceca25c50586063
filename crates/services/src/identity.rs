use async_trait::async_trait;
use course_core::model::UserId;

/// Source of the signed-in learner.
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// The authenticated user, or `None` when signed out.
    async fn current_user(&self) -> Option<UserId>;
}

/// Identity fixed at construction, e.g. from a CLI flag or a verified session.
#[derive(Debug, Clone, Copy, Default)]
pub struct StaticIdentity {
    user_id: Option<UserId>,
}

impl StaticIdentity {
    #[must_use]
    pub fn signed_in(user_id: UserId) -> Self {
        Self {
            user_id: Some(user_id),
        }
    }

    #[must_use]
    pub fn anonymous() -> Self {
        Self { user_id: None }
    }
}

#[async_trait]
impl IdentityProvider for StaticIdentity {
    async fn current_user(&self) -> Option<UserId> {
        self.user_id
    }
}
