//! Account flows on top of [`AuthApi`] and the shared [`AuthSession`].

use std::sync::Arc;

use crate::client::{AuthApi, ClientError};
use crate::models::{LoginRequest, Organization, UsageStats, User, UserRole, UserUpdate};

use super::session::AuthSession;
use super::store::StoreError;
use super::validation::{RegistrationForm, ValidationError};

#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("{0}")]
    Rejected(String),
    #[error(transparent)]
    Invalid(#[from] ValidationError),
    #[error("Not signed in")]
    NotSignedIn,
    #[error(transparent)]
    Storage(#[from] StoreError),
}

impl AuthError {
    /// Backend `detail` when it sent one, otherwise `fallback`.
    fn from_client(err: ClientError, fallback: &str) -> Self {
        match err {
            ClientError::Status {
                detail: Some(detail),
                ..
            } => Self::Rejected(detail),
            other => {
                tracing::debug!(error = %other, "Auth call failed");
                Self::Rejected(fallback.to_string())
            }
        }
    }
}

/// Outcome of a protected-screen check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AccessDecision {
    Allowed,
    LoginRequired,
    Forbidden { required: UserRole, actual: String },
}

pub struct AuthService<A: AuthApi> {
    api: Arc<A>,
    session: Arc<AuthSession>,
}

impl<A: AuthApi> AuthService<A> {
    pub fn new(api: Arc<A>, session: Arc<AuthSession>) -> Self {
        Self { api, session }
    }

    pub fn session(&self) -> &Arc<AuthSession> {
        &self.session
    }

    pub fn current_user(&self) -> Option<User> {
        self.session.user()
    }

    pub async fn login(&self, email: &str, password: &str) -> Result<User, AuthError> {
        let request = LoginRequest {
            email: email.trim().to_string(),
            password: password.to_string(),
        };
        let response = self.api.login(&request).await.map_err(|e| {
            AuthError::from_client(e, "Login failed. Please check your credentials.")
        })?;

        self.session.establish(&response.access_token, &response.user)?;
        tracing::info!(role = %response.user.role, "Signed in");
        Ok(response.user)
    }

    /// Validate, create the account, then sign in with the same credentials.
    pub async fn register(&self, form: &RegistrationForm) -> Result<User, AuthError> {
        let request = form.validate()?;
        self.api
            .register(&request)
            .await
            .map_err(|e| AuthError::from_client(e, "Registration failed. Please try again."))?;
        tracing::info!("Account registered, signing in");
        self.login(&request.email, &request.password).await
    }

    /// The local session is cleared even when the backend call fails.
    pub async fn logout(&self) -> Result<(), AuthError> {
        if let Err(e) = self.api.logout().await {
            tracing::warn!(error = %e, "Logout request failed, clearing session anyway");
        }
        self.session.clear()?;
        tracing::info!("Signed out");
        Ok(())
    }

    /// Startup check: a stored session is only trusted after the backend
    /// confirms it. Returns the verified user.
    pub async fn restore(&self) -> Option<User> {
        if !self.session.is_authenticated() {
            return None;
        }
        match self.api.current_user().await {
            Ok(user) => {
                if let Err(e) = self.session.set_user(&user) {
                    tracing::warn!(error = %e, "Failed to re-cache user");
                }
                Some(user)
            }
            Err(e) => {
                tracing::info!(error = %e, "Stored session no longer valid");
                let _ = self.session.clear();
                None
            }
        }
    }

    /// Re-fetch the user. Any failure signs out.
    pub async fn refresh_user(&self) -> Result<User, AuthError> {
        if self.session.token().is_none() {
            return Err(AuthError::NotSignedIn);
        }
        match self.api.current_user().await {
            Ok(user) => {
                self.session.set_user(&user)?;
                Ok(user)
            }
            Err(e) => {
                tracing::warn!(error = %e, "Failed to refresh user, signing out");
                self.logout().await?;
                Err(AuthError::NotSignedIn)
            }
        }
    }

    pub async fn update_user(&self, update: &UserUpdate) -> Result<User, AuthError> {
        if self.session.user().is_none() {
            return Err(AuthError::NotSignedIn);
        }
        let user = self
            .api
            .update_current_user(update)
            .await
            .map_err(|e| AuthError::from_client(e, "Failed to update user information."))?;
        self.session.set_user(&user)?;
        Ok(user)
    }

    pub async fn usage(&self) -> Result<UsageStats, AuthError> {
        self.api
            .usage_stats()
            .await
            .map_err(|e| AuthError::from_client(e, "Failed to load usage statistics."))
    }

    /// Organizations offered on the sign-up screen. No session needed.
    pub async fn public_organizations(&self) -> Result<Vec<Organization>, AuthError> {
        self.api
            .public_organizations()
            .await
            .map_err(|e| AuthError::from_client(e, "Failed to load organizations."))
    }

    /// Gate for a screen that may require one specific role.
    pub fn authorize(&self, required: Option<UserRole>) -> AccessDecision {
        let user = match (self.session.token(), self.session.user()) {
            (Some(_), Some(user)) => user,
            _ => return AccessDecision::LoginRequired,
        };
        match required {
            Some(role) if user.role != role.as_str() => AccessDecision::Forbidden {
                required: role,
                actual: user.role,
            },
            _ => AccessDecision::Allowed,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::mock::MockAuthApi;
    use crate::models::LoginResponse;

    fn user(role: &str) -> User {
        User {
            id: Some("u1".into()),
            email: "ada@example.com".into(),
            role: role.into(),
            ..User::default()
        }
    }

    fn service(api: MockAuthApi) -> (AuthService<MockAuthApi>, Arc<MockAuthApi>) {
        let api = Arc::new(api);
        let session = Arc::new(AuthSession::in_memory());
        (AuthService::new(api.clone(), session), api)
    }

    fn login_ok() -> Result<LoginResponse, ClientError> {
        Ok(LoginResponse {
            access_token: "tok".into(),
            token_type: Some("bearer".into()),
            expires_in: Some(3600),
            user: user("SALES_AGENT"),
        })
    }

    #[tokio::test]
    async fn login_establishes_session() {
        let (svc, _) = service(MockAuthApi::new().with_login(login_ok()));
        let user = svc.login("ada@example.com", "Secret123").await.unwrap();
        assert_eq!(user.email, "ada@example.com");
        assert!(svc.session().is_authenticated());
        assert_eq!(svc.session().token().as_deref(), Some("tok"));
    }

    #[tokio::test]
    async fn login_failure_surfaces_detail_or_generic() {
        let (svc, _) = service(MockAuthApi::new().with_login(Err(ClientError::Status {
            status: 401,
            detail: Some("Incorrect email or password".into()),
        })));
        let err = svc.login("a@b.co", "x").await.unwrap_err();
        assert_eq!(err.to_string(), "Incorrect email or password");
        assert!(!svc.session().is_authenticated());

        let (svc, _) =
            service(MockAuthApi::new().with_login(Err(ClientError::Transport("refused".into()))));
        let err = svc.login("a@b.co", "x").await.unwrap_err();
        assert_eq!(err.to_string(), "Login failed. Please check your credentials.");
    }

    #[tokio::test]
    async fn register_then_login() {
        let (svc, api) = service(MockAuthApi::new().with_login(login_ok()));
        let form = RegistrationForm {
            email: "ada@example.com".into(),
            password: "Secret123".into(),
            confirm_password: "Secret123".into(),
            first_name: "Ada".into(),
            last_name: "Lovelace".into(),
            role: None,
            organization_id: "org-1".into(),
        };
        svc.register(&form).await.unwrap();
        assert_eq!(api.calls(), vec!["register", "login"]);
        assert!(svc.session().is_authenticated());
    }

    #[tokio::test]
    async fn register_rejects_invalid_form_locally() {
        let (svc, api) = service(MockAuthApi::new());
        let form = RegistrationForm {
            email: "ada@example.com".into(),
            password: "short".into(),
            confirm_password: "short".into(),
            first_name: "Ada".into(),
            last_name: "Lovelace".into(),
            organization_id: "org-1".into(),
            ..RegistrationForm::default()
        };
        let err = svc.register(&form).await.unwrap_err();
        assert!(matches!(err, AuthError::Invalid(ValidationError::WeakPassword(_))));
        assert!(api.calls().is_empty());
    }

    #[tokio::test]
    async fn logout_clears_even_when_backend_fails() {
        let (svc, _) = service(
            MockAuthApi::new()
                .with_login(login_ok())
                .with_logout(Err(ClientError::Transport("down".into()))),
        );
        svc.login("ada@example.com", "Secret123").await.unwrap();
        svc.logout().await.unwrap();
        assert!(!svc.session().is_authenticated());
    }

    #[tokio::test]
    async fn restore_verifies_stored_session() {
        let (svc, _) = service(MockAuthApi::new().with_current_user(Ok(user("ADMIN"))));
        assert!(svc.restore().await.is_none());

        svc.session().establish("tok", &user("SALES_AGENT")).unwrap();
        let restored = svc.restore().await.unwrap();
        assert_eq!(restored.role, "ADMIN");
        assert_eq!(svc.current_user().unwrap().role, "ADMIN");
    }

    #[tokio::test]
    async fn restore_clears_rejected_session() {
        let (svc, _) =
            service(MockAuthApi::new().with_current_user(Err(ClientError::Unauthorized)));
        svc.session().establish("tok", &user("SALES_AGENT")).unwrap();
        assert!(svc.restore().await.is_none());
        assert!(!svc.session().is_authenticated());
    }

    #[tokio::test]
    async fn refresh_failure_signs_out() {
        let (svc, _) = service(
            MockAuthApi::new().with_current_user(Err(ClientError::Transport("down".into()))),
        );
        svc.session().establish("tok", &user("SALES_AGENT")).unwrap();
        assert!(matches!(svc.refresh_user().await, Err(AuthError::NotSignedIn)));
        assert!(!svc.session().is_authenticated());
    }

    #[tokio::test]
    async fn update_recaches_user() {
        let mut updated = user("SALES_AGENT");
        updated.first_name = "Ada".into();
        let (svc, _) = service(MockAuthApi::new().with_update(Ok(updated)));

        let patch = UserUpdate {
            first_name: Some("Ada".into()),
            ..UserUpdate::default()
        };
        assert!(matches!(svc.update_user(&patch).await, Err(AuthError::NotSignedIn)));

        svc.session().establish("tok", &user("SALES_AGENT")).unwrap();
        svc.update_user(&patch).await.unwrap();
        assert_eq!(svc.current_user().unwrap().first_name, "Ada");
    }

    #[test]
    fn authorize_checks_session_and_role() {
        let (svc, _) = service(MockAuthApi::new());
        assert_eq!(svc.authorize(None), AccessDecision::LoginRequired);

        svc.session().establish("tok", &user("SALES_AGENT")).unwrap();
        assert_eq!(svc.authorize(None), AccessDecision::Allowed);
        assert_eq!(svc.authorize(Some(UserRole::SalesAgent)), AccessDecision::Allowed);
        assert_eq!(
            svc.authorize(Some(UserRole::Admin)),
            AccessDecision::Forbidden {
                required: UserRole::Admin,
                actual: "SALES_AGENT".into()
            }
        );
    }
}
