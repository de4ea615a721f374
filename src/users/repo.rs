use sqlx::SqlitePool;
use time::OffsetDateTime;

use crate::users::repo_types::{Role, User};

#[derive(Debug, thiserror::Error)]
pub enum CreateError {
    #[error("username '{0}' already exists")]
    Duplicate(String),
    #[error(transparent)]
    Db(#[from] sqlx::Error),
}

/// Insert a new user with an already-hashed password.
pub async fn create(
    db: &SqlitePool,
    username: &str,
    password_hash: &str,
    role: Role,
) -> Result<User, CreateError> {
    let created_at = OffsetDateTime::now_utc();
    let result = sqlx::query(
        r#"
        INSERT INTO users (username, password_hash, role, created_at)
        VALUES (?, ?, ?, ?)
        "#,
    )
    .bind(username)
    .bind(password_hash)
    .bind(role)
    .bind(created_at)
    .execute(db)
    .await
    .map_err(|e| {
        if e.to_string().contains("UNIQUE constraint failed") {
            CreateError::Duplicate(username.to_string())
        } else {
            CreateError::Db(e)
        }
    })?;

    Ok(User {
        id: result.last_insert_rowid(),
        username: username.to_string(),
        password_hash: password_hash.to_string(),
        role,
        created_at,
    })
}

/// Exact, case-sensitive username lookup.
pub async fn find_by_username(db: &SqlitePool, username: &str) -> anyhow::Result<Option<User>> {
    let user = sqlx::query_as::<_, User>(
        r#"
        SELECT id, username, password_hash, role, created_at
        FROM users
        WHERE username = ?
        "#,
    )
    .bind(username)
    .fetch_optional(db)
    .await?;
    Ok(user)
}

pub async fn find_by_id(db: &SqlitePool, id: i64) -> anyhow::Result<Option<User>> {
    let user = sqlx::query_as::<_, User>(
        r#"
        SELECT id, username, password_hash, role, created_at
        FROM users
        WHERE id = ?
        "#,
    )
    .bind(id)
    .fetch_optional(db)
    .await?;
    Ok(user)
}

/// All users, ordered by username for the console listing.
pub async fn list(db: &SqlitePool) -> anyhow::Result<Vec<User>> {
    let users = sqlx::query_as::<_, User>(
        r#"
        SELECT id, username, password_hash, role, created_at
        FROM users
        ORDER BY username
        "#,
    )
    .fetch_all(db)
    .await?;
    Ok(users)
}

pub async fn update_role(db: &SqlitePool, id: i64, role: Role) -> anyhow::Result<()> {
    sqlx::query("UPDATE users SET role = ? WHERE id = ?")
        .bind(role)
        .bind(id)
        .execute(db)
        .await?;
    Ok(())
}

pub async fn update_password(db: &SqlitePool, id: i64, password_hash: &str) -> anyhow::Result<()> {
    sqlx::query("UPDATE users SET password_hash = ? WHERE id = ?")
        .bind(password_hash)
        .bind(id)
        .execute(db)
        .await?;
    Ok(())
}

pub async fn delete(db: &SqlitePool, id: i64) -> anyhow::Result<()> {
    sqlx::query("DELETE FROM users WHERE id = ?")
        .bind(id)
        .execute(db)
        .await?;
    Ok(())
}

pub async fn count(db: &SqlitePool) -> anyhow::Result<i64> {
    let n: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM users")
        .fetch_one(db)
        .await?;
    Ok(n)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::test_pool;

    #[tokio::test]
    async fn create_and_find_user() {
        let db = test_pool().await;

        let user = create(&db, "marta", "hash123", Role::Captura)
            .await
            .expect("create user");
        assert_eq!(user.username, "marta");
        assert_eq!(user.role, Role::Captura);

        let found = find_by_username(&db, "marta")
            .await
            .expect("find user")
            .expect("user present");
        assert_eq!(found.id, user.id);
        assert_eq!(found.role, Role::Captura);

        // lookup is case-sensitive, as stored
        assert!(find_by_username(&db, "Marta").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn duplicate_username_is_rejected_and_leaves_store_unchanged() {
        let db = test_pool().await;

        create(&db, "ana", "h1", Role::Lectura).await.unwrap();
        let err = create(&db, "ana", "h2", Role::Admin).await.unwrap_err();
        assert!(matches!(err, CreateError::Duplicate(ref name) if name == "ana"));

        assert_eq!(count(&db).await.unwrap(), 1);
        let kept = find_by_username(&db, "ana").await.unwrap().unwrap();
        assert_eq!(kept.password_hash, "h1");
        assert_eq!(kept.role, Role::Lectura);
    }

    #[tokio::test]
    async fn list_orders_by_username() {
        let db = test_pool().await;

        create(&db, "zoe", "h", Role::Lectura).await.unwrap();
        create(&db, "alba", "h", Role::Admin).await.unwrap();
        create(&db, "mario", "h", Role::Captura).await.unwrap();

        let names: Vec<String> = list(&db)
            .await
            .unwrap()
            .into_iter()
            .map(|u| u.username)
            .collect();
        assert_eq!(names, vec!["alba", "mario", "zoe"]);
    }

    #[tokio::test]
    async fn role_and_password_updates_persist() {
        let db = test_pool().await;

        let user = create(&db, "leo", "old-hash", Role::Lectura).await.unwrap();

        update_role(&db, user.id, Role::Admin).await.unwrap();
        update_password(&db, user.id, "new-hash").await.unwrap();

        let reloaded = find_by_id(&db, user.id).await.unwrap().unwrap();
        assert_eq!(reloaded.role, Role::Admin);
        assert_eq!(reloaded.password_hash, "new-hash");
    }

    #[tokio::test]
    async fn delete_removes_the_row() {
        let db = test_pool().await;

        let user = create(&db, "tmp", "h", Role::Lectura).await.unwrap();
        delete(&db, user.id).await.unwrap();

        assert!(find_by_id(&db, user.id).await.unwrap().is_none());
        assert_eq!(count(&db).await.unwrap(), 0);
    }
}
