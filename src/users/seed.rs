//! First-run seeding of the three fixed accounts.

use sqlx::SqlitePool;
use tracing::{debug, info, warn};

use crate::auth::password::hash_password;
use crate::users::repo;
use crate::users::repo_types::Role;

const SEED_ACCOUNTS: &[(&str, &str, Role)] = &[
    ("admin", "Admin123!", Role::Admin),
    ("captura", "Captura123!", Role::Captura),
    ("lectura", "Lectura123!", Role::Lectura),
];

/// Creates the seed accounts when the store is empty; otherwise leaves it
/// untouched.
pub async fn ensure_seed_users(db: &SqlitePool) -> anyhow::Result<()> {
    if repo::count(db).await? > 0 {
        debug!("users already exist, skipping seed");
        return Ok(());
    }

    for (username, password, role) in SEED_ACCOUNTS {
        let hash = hash_password(password)?;
        repo::create(db, username, &hash, *role).await?;
        info!(username, role = role.as_str(), "seeded default account");
    }
    warn!("seeded default accounts with well-known passwords; change them");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::password::verify_password;
    use crate::state::test_pool;

    #[tokio::test]
    async fn seeds_three_accounts_into_an_empty_store() {
        let db = test_pool().await;
        ensure_seed_users(&db).await.unwrap();

        assert_eq!(repo::count(&db).await.unwrap(), 3);

        let admin = repo::find_by_username(&db, "admin").await.unwrap().unwrap();
        assert_eq!(admin.role, Role::Admin);
        assert!(verify_password("Admin123!", &admin.password_hash).unwrap());
        assert_ne!(admin.password_hash, "Admin123!");

        let lectura = repo::find_by_username(&db, "lectura").await.unwrap().unwrap();
        assert_eq!(lectura.role, Role::Lectura);
    }

    #[tokio::test]
    async fn leaves_a_non_empty_store_untouched() {
        let db = test_pool().await;
        repo::create(&db, "existing", "hash", Role::Admin).await.unwrap();

        ensure_seed_users(&db).await.unwrap();

        assert_eq!(repo::count(&db).await.unwrap(), 1);
        assert!(repo::find_by_username(&db, "admin").await.unwrap().is_none());
    }
}
