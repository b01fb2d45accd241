//! User and institution registration. Both are admin-gated at the API
//! layer; users are only ever mutated to attach a notification target.

use tracing::info;
use uuid::Uuid;

use crate::{
    auth::password,
    error::AppError,
    models::{fields, Institution, Role, User, UserSnapshot},
    store::{keys, SharedStore},
};

#[derive(Debug)]
pub struct NewUser {
    pub name: String,
    pub email: String,
    pub password: String,
    pub institution_name: String,
    pub is_admin: bool,
}

#[derive(Debug)]
pub struct NewInstitution {
    pub name: String,
    pub street: String,
    pub city: String,
    pub zip: String,
}

pub struct AccountService {
    store: SharedStore,
}

impl AccountService {
    pub fn new(store: SharedStore) -> Self {
        Self { store }
    }

    pub async fn register_user(&self, req: NewUser) -> Result<UserSnapshot, AppError> {
        let key = keys::user(&req.email);
        if self.store.hash_exists(&key, fields::EMAIL).await? {
            return Err(AppError::Conflict("user"));
        }

        let user = User {
            id: Uuid::new_v4().to_string(),
            name: req.name,
            email: req.email,
            password: password::hash_password(&req.password)?,
            institution_name: req.institution_name,
            role: Role::from_flag(req.is_admin),
            fcm_token: None,
        };
        self.store.hash_set(&key, &user.to_fields()).await?;

        info!(email = %user.email, institution = %user.institution_name, "user registered");
        Ok(user.snapshot())
    }

    pub async fn register_institution(
        &self,
        req: NewInstitution,
    ) -> Result<Institution, AppError> {
        let key = keys::institution(&req.name);
        if self.store.hash_exists(&key, fields::NAME).await? {
            return Err(AppError::Conflict("institution"));
        }

        let institution = Institution {
            id: Uuid::new_v4().to_string(),
            name: req.name,
            street: req.street,
            city: req.city,
            zip: req.zip,
        };
        self.store.hash_set(&key, &institution.to_fields()).await?;

        info!(name = %institution.name, "institution registered");
        Ok(institution)
    }

    /// Attaches (or replaces) the push-notification target of a user.
    pub async fn attach_notification_target(
        &self,
        email: &str,
        fcm_token: String,
    ) -> Result<(), AppError> {
        let key = keys::user(email);
        if !self.store.hash_exists(&key, fields::EMAIL).await? {
            return Err(AppError::NotFound("user"));
        }
        self.store
            .hash_set(&key, &[(fields::FCM_TOKEN.to_owned(), fcm_token)])
            .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::store::memory::MemoryStore;
    use crate::store::KvStore;

    fn service() -> (Arc<MemoryStore>, AccountService) {
        let store = Arc::new(MemoryStore::new());
        (store.clone(), AccountService::new(store))
    }

    fn new_user(email: &str, is_admin: bool) -> NewUser {
        NewUser {
            name: "Ada".into(),
            email: email.into(),
            password: "s3cret".into(),
            institution_name: "Acme School".into(),
            is_admin,
        }
    }

    #[tokio::test]
    async fn register_user_stores_hashed_password() {
        let (store, accounts) = service();
        let snapshot = accounts.register_user(new_user("ada@example.org", false)).await.unwrap();
        assert_eq!(snapshot.email, "ada@example.org");
        assert!(!snapshot.role.is_admin());

        let stored = store
            .hash_get(&keys::user("ada@example.org"), fields::PASSWORD)
            .await
            .unwrap()
            .unwrap();
        assert_ne!(stored, "s3cret");
        assert!(password::verify_password("s3cret", &stored).unwrap());
    }

    #[tokio::test]
    async fn duplicate_user_is_conflict() {
        let (_, accounts) = service();
        accounts.register_user(new_user("ada@example.org", false)).await.unwrap();
        assert!(matches!(
            accounts
                .register_user(new_user("ada@example.org", true))
                .await
                .unwrap_err(),
            AppError::Conflict("user")
        ));
    }

    #[tokio::test]
    async fn register_institution_and_duplicate() {
        let (_, accounts) = service();
        let req = || NewInstitution {
            name: "Acme School".into(),
            street: "Main St 1".into(),
            city: "Springfield".into(),
            zip: "12345".into(),
        };
        let institution = accounts.register_institution(req()).await.unwrap();
        assert_eq!(institution.name, "Acme School");
        assert!(matches!(
            accounts.register_institution(req()).await.unwrap_err(),
            AppError::Conflict("institution")
        ));
    }

    #[tokio::test]
    async fn attach_notification_target_sets_field() {
        let (store, accounts) = service();
        accounts.register_user(new_user("ada@example.org", false)).await.unwrap();

        accounts
            .attach_notification_target("ada@example.org", "fcm-123".into())
            .await
            .unwrap();
        let token = store
            .hash_get(&keys::user("ada@example.org"), fields::FCM_TOKEN)
            .await
            .unwrap();
        assert_eq!(token.as_deref(), Some("fcm-123"));
    }

    #[tokio::test]
    async fn attach_to_unknown_user_is_not_found() {
        let (_, accounts) = service();
        assert!(matches!(
            accounts
                .attach_notification_target("ghost@example.org", "fcm-123".into())
                .await
                .unwrap_err(),
            AppError::NotFound("user")
        ));
    }
}
