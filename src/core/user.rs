//! User management business logic.
//!
//! Creates, reads, updates and deletes ledger users together with their login
//! credentials. Balances are never written here; a new user starts at zero and every
//! later change goes through the transaction engine.

use crate::{
    core::auth::{self, Actor, AdminGrant, Grant},
    entities::{Credential, Role, Transaction, User, credential, transaction, user},
    errors::{Error, Result},
};
use sea_orm::{QueryOrder, Set, TransactionTrait, prelude::*, sea_query::Expr};
use tracing::{debug, info};

/// Input for [`create_user`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewUser {
    /// Display name, 2-100 characters
    pub name: String,
    /// Email address, unique
    pub email: String,
    /// Optional age, 1-120
    pub age: Option<i32>,
    /// Role claim
    pub role: Role,
    /// Login name, 3-50 characters, unique
    pub username: String,
    /// Discord account the user authenticates with
    pub discord_user_id: Option<String>,
}

impl NewUser {
    /// A regular user with the given name, email and username.
    pub fn new(
        name: impl Into<String>,
        email: impl Into<String>,
        username: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            email: email.into(),
            age: None,
            role: Role::User,
            username: username.into(),
            discord_user_id: None,
        }
    }
}

/// Fields to change in [`update_user`]; `None` leaves a field untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UserUpdate {
    /// New display name
    pub name: Option<String>,
    /// New email address
    pub email: Option<String>,
    /// New age
    pub age: Option<i32>,
    /// New role, admin only
    pub role: Option<Role>,
    /// New login name
    pub username: Option<String>,
    /// New linked Discord account
    pub discord_user_id: Option<String>,
}

/// A user with its credential row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserProfile {
    /// The account
    pub user: user::Model,
    /// Its login credentials
    pub credential: Option<credential::Model>,
}

fn validate_name(name: &str) -> Result<String> {
    let name = name.trim();
    let len = name.chars().count();
    if !(2..=100).contains(&len) {
        return Err(Error::validation(format!(
            "name must be 2-100 characters, got {len}"
        )));
    }
    Ok(name.to_string())
}

fn validate_email(email: &str) -> Result<String> {
    let email = email.trim().to_lowercase();
    let valid = email.len() <= 254
        && !email.contains(char::is_whitespace)
        && email.split_once('@').is_some_and(|(local, domain)| {
            !local.is_empty()
                && domain.contains('.')
                && !domain.starts_with('.')
                && !domain.ends_with('.')
                && !domain.contains('@')
        });
    if !valid {
        return Err(Error::validation(format!("'{email}' is not a valid email")));
    }
    Ok(email)
}

fn validate_age(age: Option<i32>) -> Result<Option<i32>> {
    match age {
        Some(age) if !(1..=120).contains(&age) => Err(Error::validation(format!(
            "age must be between 1 and 120, got {age}"
        ))),
        other => Ok(other),
    }
}

fn validate_username(username: &str) -> Result<String> {
    let username = username.trim();
    let len = username.chars().count();
    if !(3..=50).contains(&len) {
        return Err(Error::validation(format!(
            "username must be 3-50 characters, got {len}"
        )));
    }
    Ok(username.to_string())
}

fn validate_discord_id(discord_user_id: Option<String>) -> Result<Option<String>> {
    match discord_user_id.as_deref().map(str::trim) {
        None | Some("") => Ok(None),
        Some(id) if id.parse::<u64>().is_ok() => Ok(Some(id.to_string())),
        Some(id) => Err(Error::validation(format!(
            "'{id}' is not a Discord user id"
        ))),
    }
}

/// Rejects a value already used by another user.
async fn ensure_unique<C>(
    db: &C,
    email: Option<&str>,
    username: Option<&str>,
    discord_user_id: Option<&str>,
    except_user: Option<i64>,
) -> Result<()>
where
    C: ConnectionTrait,
{
    if let Some(email) = email {
        let mut query = User::find().filter(user::Column::Email.eq(email));
        if let Some(id) = except_user {
            query = query.filter(user::Column::Id.ne(id));
        }
        if query.one(db).await?.is_some() {
            return Err(Error::validation(format!(
                "email '{email}' is already registered"
            )));
        }
    }
    if let Some(username) = username {
        let mut query = Credential::find().filter(credential::Column::Username.eq(username));
        if let Some(id) = except_user {
            query = query.filter(credential::Column::UserId.ne(id));
        }
        if query.one(db).await?.is_some() {
            return Err(Error::validation(format!(
                "username '{username}' is already taken"
            )));
        }
    }
    if let Some(discord_user_id) = discord_user_id {
        let mut query =
            Credential::find().filter(credential::Column::DiscordUserId.eq(discord_user_id));
        if let Some(id) = except_user {
            query = query.filter(credential::Column::UserId.ne(id));
        }
        if query.one(db).await?.is_some() {
            return Err(Error::validation(
                "that Discord account is already linked to another user",
            ));
        }
    }
    Ok(())
}

/// Creates a user with a zero balance and its credential row.
///
/// # Errors
/// [`Error::Validation`] for malformed fields or a duplicate email, username or
/// Discord account.
pub async fn create_user(
    db: &DatabaseConnection,
    admin: &AdminGrant,
    new_user: NewUser,
) -> Result<UserProfile> {
    let name = validate_name(&new_user.name)?;
    let email = validate_email(&new_user.email)?;
    let age = validate_age(new_user.age)?;
    let username = validate_username(&new_user.username)?;
    let discord_user_id = validate_discord_id(new_user.discord_user_id)?;

    let txn = db.begin().await?;
    ensure_unique(&txn, Some(&email), Some(&username), discord_user_id.as_deref(), None).await?;

    let user = user::ActiveModel {
        name: Set(name),
        email: Set(email),
        age: Set(age),
        role: Set(new_user.role),
        balance_cents: Set(0),
        ..Default::default()
    }
    .insert(&txn)
    .await?;

    let credential = credential::ActiveModel {
        user_id: Set(user.id),
        username: Set(username),
        discord_user_id: Set(discord_user_id),
        ..Default::default()
    }
    .insert(&txn)
    .await?;

    txn.commit().await?;

    info!(
        "Created user {} ({}) with role {} by admin {}",
        user.id,
        credential.username,
        user.role.as_str(),
        admin.actor().id
    );
    Ok(UserProfile {
        user,
        credential: Some(credential),
    })
}

/// Every user, ordered by id.
pub async fn get_users(db: &DatabaseConnection, _admin: &AdminGrant) -> Result<Vec<user::Model>> {
    let users = User::find().order_by_asc(user::Column::Id).all(db).await?;
    debug!("Fetched {} users", users.len());
    Ok(users)
}

/// The granted user with its credentials.
pub async fn get_user(db: &DatabaseConnection, grant: &Grant) -> Result<UserProfile> {
    let user = User::find_by_id(grant.user_id())
        .one(db)
        .await?
        .ok_or(Error::NotFound {
            what: "user",
            id: grant.user_id(),
        })?;
    let credential = user.find_related(Credential).one(db).await?;
    Ok(UserProfile { user, credential })
}

/// Updates profile fields of the granted user.
///
/// # Errors
/// * [`Error::Authorization`] when a non-admin tries to change a role
/// * [`Error::Validation`] for malformed or duplicate values
/// * [`Error::NotFound`] if the user does not exist
pub async fn update_user(
    db: &DatabaseConnection,
    grant: &Grant,
    update: UserUpdate,
) -> Result<UserProfile> {
    if update.role.is_some() && !auth::is_admin(grant.actor()) {
        return Err(Error::authorization(format!(
            "user {} may not change roles",
            grant.actor().id
        )));
    }
    let name = update.name.as_deref().map(validate_name).transpose()?;
    let email = update.email.as_deref().map(validate_email).transpose()?;
    let age = validate_age(update.age)?;
    let username = update.username.as_deref().map(validate_username).transpose()?;
    let discord_user_id = validate_discord_id(update.discord_user_id)?;

    let user_id = grant.user_id();
    let txn = db.begin().await?;

    let existing = User::find_by_id(user_id)
        .one(&txn)
        .await?
        .ok_or(Error::NotFound {
            what: "user",
            id: user_id,
        })?;
    ensure_unique(
        &txn,
        email.as_deref(),
        username.as_deref(),
        discord_user_id.as_deref(),
        Some(user_id),
    )
    .await?;

    let mut active: user::ActiveModel = existing.into();
    if let Some(name) = name {
        active.name = Set(name);
    }
    if let Some(email) = email {
        active.email = Set(email);
    }
    if let Some(age) = age {
        active.age = Set(Some(age));
    }
    if let Some(role) = update.role {
        active.role = Set(role);
    }
    let user = active.update(&txn).await?;

    let mut credential = user.find_related(Credential).one(&txn).await?;
    if username.is_some() || discord_user_id.is_some() {
        if let Some(existing) = credential.take() {
            let mut active: credential::ActiveModel = existing.into();
            if let Some(username) = username {
                active.username = Set(username);
            }
            if let Some(discord_user_id) = discord_user_id {
                active.discord_user_id = Set(Some(discord_user_id));
            }
            credential = Some(active.update(&txn).await?);
        }
    }

    txn.commit().await?;
    info!("Updated user {} by actor {}", user_id, grant.actor().id);
    Ok(UserProfile { user, credential })
}

/// Deletes a user, its credentials and every transaction it owns.
///
/// Transactions of other users that name the deleted user as counterparty keep
/// existing with no counterparty.
pub async fn delete_user(db: &DatabaseConnection, admin: &AdminGrant, user_id: i64) -> Result<()> {
    let txn = db.begin().await?;

    let related = Transaction::update_many()
        .col_expr(
            transaction::Column::RelatedUserId,
            Expr::value(sea_orm::Value::BigInt(None)),
        )
        .filter(transaction::Column::RelatedUserId.eq(user_id))
        .exec(&txn)
        .await?;
    let owned = Transaction::delete_many()
        .filter(transaction::Column::UserId.eq(user_id))
        .exec(&txn)
        .await?;
    Credential::delete_many()
        .filter(credential::Column::UserId.eq(user_id))
        .exec(&txn)
        .await?;
    let deleted = User::delete_by_id(user_id).exec(&txn).await?;
    if deleted.rows_affected == 0 {
        return Err(Error::NotFound {
            what: "user",
            id: user_id,
        });
    }

    txn.commit().await?;
    info!(
        "Deleted user {} with {} transactions ({} counterparty references cleared) by admin {}",
        user_id,
        owned.rows_affected,
        related.rows_affected,
        admin.actor().id
    );
    Ok(())
}

/// Resolves the ledger actor linked to a Discord account.
///
/// Returns `None` for a Discord account that is not linked to any user.
pub async fn find_actor_by_discord_id<C>(db: &C, discord_user_id: &str) -> Result<Option<Actor>>
where
    C: ConnectionTrait,
{
    let Some(credential) = Credential::find()
        .filter(credential::Column::DiscordUserId.eq(discord_user_id))
        .one(db)
        .await?
    else {
        return Ok(None);
    };
    let user = User::find_by_id(credential.user_id).one(db).await?;
    Ok(user.map(|u| Actor::new(u.id, u.role)))
}

/// Discord account linked to a user, if any.
pub async fn find_discord_id<C>(db: &C, user_id: i64) -> Result<Option<String>>
where
    C: ConnectionTrait,
{
    Ok(Credential::find()
        .filter(credential::Column::UserId.eq(user_id))
        .one(db)
        .await?
        .and_then(|c| c.discord_user_id))
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;
    use crate::core::money::Money;
    use crate::core::transaction::TransactionEngine;
    use crate::errors::ErrorKind;
    use crate::test_utils::*;

    #[tokio::test]
    async fn test_create_user_with_credentials() -> Result<()> {
        let db = setup_test_db().await?;
        let mut new_user = NewUser::new("Alice", " Alice@Example.com ", "alice");
        new_user.age = Some(30);
        new_user.discord_user_id = Some("123456789012345678".to_string());

        let profile = create_user(&db, &admin_grant(), new_user).await?;
        assert_eq!(profile.user.name, "Alice");
        assert_eq!(profile.user.email, "alice@example.com");
        assert_eq!(profile.user.role, Role::User);
        assert_eq!(profile.user.balance(), Money::ZERO);
        let credential = profile.credential.unwrap();
        assert_eq!(credential.user_id, profile.user.id);
        assert_eq!(credential.username, "alice");

        let actor = find_actor_by_discord_id(&db, "123456789012345678").await?;
        assert_eq!(actor, Some(Actor::new(profile.user.id, Role::User)));
        assert_eq!(find_actor_by_discord_id(&db, "42").await?, None);
        assert_eq!(
            find_discord_id(&db, profile.user.id).await?.as_deref(),
            Some("123456789012345678")
        );
        Ok(())
    }

    #[tokio::test]
    async fn test_create_user_validation() -> Result<()> {
        let db = setup_test_db().await?;
        let admin = admin_grant();

        let cases = [
            NewUser::new("A", "a@example.com", "alice"),
            NewUser::new("Alice", "not-an-email", "alice"),
            NewUser::new("Alice", "alice@nodot", "alice"),
            NewUser::new("Alice", "alice@example.com", "al"),
            NewUser {
                age: Some(0),
                ..NewUser::new("Alice", "alice@example.com", "alice")
            },
            NewUser {
                discord_user_id: Some("not-a-snowflake".to_string()),
                ..NewUser::new("Alice", "alice@example.com", "alice")
            },
        ];
        for case in cases {
            let err = create_user(&db, &admin, case).await.unwrap_err();
            assert_eq!(err.kind(), ErrorKind::Validation);
        }
        assert!(get_users(&db, &admin).await?.is_empty());
        Ok(())
    }

    #[tokio::test]
    async fn test_duplicates_rejected() -> Result<()> {
        let db = setup_test_db().await?;
        let admin = admin_grant();
        create_user(&db, &admin, NewUser::new("Alice", "alice@example.com", "alice")).await?;

        let same_email = NewUser::new("Other", "ALICE@example.com", "other");
        assert_eq!(
            create_user(&db, &admin, same_email).await.unwrap_err().kind(),
            ErrorKind::Validation
        );
        let same_username = NewUser::new("Other", "other@example.com", "alice");
        assert_eq!(
            create_user(&db, &admin, same_username).await.unwrap_err().kind(),
            ErrorKind::Validation
        );
        assert_eq!(get_users(&db, &admin).await?.len(), 1);
        Ok(())
    }

    #[tokio::test]
    async fn test_update_user_and_role_change() -> Result<()> {
        let (db, alice) = setup_with_user("Alice").await?;
        let own = user_grant(alice.id);

        let profile = update_user(
            &db,
            &own,
            UserUpdate {
                name: Some("Alice Cooper".to_string()),
                age: Some(41),
                username: Some("alice_c".to_string()),
                ..Default::default()
            },
        )
        .await?;
        assert_eq!(profile.user.name, "Alice Cooper");
        assert_eq!(profile.user.age, Some(41));
        assert_eq!(profile.credential.unwrap().username, "alice_c");

        let promote = UserUpdate {
            role: Some(Role::Admin),
            ..Default::default()
        };
        let err = update_user(&db, &own, promote.clone()).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Authorization);

        let promoted = update_user(&db, &admin_grant().grant_for(alice.id), promote).await?;
        assert_eq!(promoted.user.role, Role::Admin);

        let missing = update_user(&db, &admin_grant().grant_for(999), UserUpdate::default())
            .await
            .unwrap_err();
        assert_eq!(missing.kind(), ErrorKind::NotFound);
        Ok(())
    }

    #[tokio::test]
    async fn test_get_user_profile() -> Result<()> {
        let (db, alice) = setup_with_user("Alice").await?;
        let profile = get_user(&db, &user_grant(alice.id)).await?;
        assert_eq!(profile.user, alice);
        assert!(profile.credential.is_some());
        assert_eq!(
            get_user(&db, &user_grant(999)).await.unwrap_err().kind(),
            ErrorKind::NotFound
        );
        Ok(())
    }

    #[tokio::test]
    async fn test_delete_user_cascades() -> Result<()> {
        let db = setup_test_db().await?;
        let alice = create_test_user(&db, "Alice").await?;
        let bob = create_test_user(&db, "Bob").await?;
        seed_balance(&db, alice.id, Money::from_cents(10_000)).await?;
        let engine = TransactionEngine::new(db.clone(), FailingNotifier);

        engine
            .transfer(&user_grant(alice.id), bob.id, Money::from_cents(3_000), None)
            .await?;
        engine
            .record_expense(&user_grant(alice.id), Money::from_cents(500), None, "Coffee", None)
            .await?;

        delete_user(&db, &admin_grant(), alice.id).await?;

        assert!(User::find_by_id(alice.id).one(&db).await?.is_none());
        assert!(find_discord_id(&db, alice.id).await?.is_none());
        let remaining = Transaction::find().all(&db).await?;
        assert_eq!(remaining.len(), 1);
        assert_eq!(remaining[0].user_id, bob.id);
        assert_eq!(remaining[0].related_user_id, None);
        assert_eq!(
            crate::core::ledger::get_balance(&db, bob.id).await?,
            Money::from_cents(3_000)
        );

        let again = delete_user(&db, &admin_grant(), alice.id).await.unwrap_err();
        assert_eq!(again.kind(), ErrorKind::NotFound);
        Ok(())
    }
}
