use sqlx::{PgPool, Postgres, QueryBuilder};
use uuid::Uuid;

use super::repo_types::{AccessState, Role, User};

const USER_COLUMNS: &str =
    "id, username, email, password_hash, role, is_active, created_at, updated_at";

pub struct NewUser<'a> {
    pub username: &'a str,
    pub email: &'a str,
    pub password_hash: &'a str,
    pub role: Role,
    pub is_active: bool,
}

#[derive(Debug, Default)]
pub struct UserChanges {
    pub username: Option<String>,
    pub email: Option<String>,
    pub role: Option<Role>,
    pub is_active: Option<bool>,
}

impl User {
    pub async fn find_by_email(db: &PgPool, email: &str) -> sqlx::Result<Option<User>> {
        sqlx::query_as::<_, User>(&format!("SELECT {USER_COLUMNS} FROM users WHERE email = $1"))
            .bind(email)
            .fetch_optional(db)
            .await
    }

    pub async fn find_by_id(db: &PgPool, id: Uuid) -> sqlx::Result<Option<User>> {
        sqlx::query_as::<_, User>(&format!("SELECT {USER_COLUMNS} FROM users WHERE id = $1"))
            .bind(id)
            .fetch_optional(db)
            .await
    }

    pub async fn exists_with(db: &PgPool, username: &str, email: &str) -> sqlx::Result<bool> {
        sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS (SELECT 1 FROM users WHERE username = $1 OR email = $2)",
        )
        .bind(username)
        .bind(email)
        .fetch_one(db)
        .await
    }

    pub async fn list(db: &PgPool) -> sqlx::Result<Vec<User>> {
        sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users ORDER BY created_at DESC"
        ))
        .fetch_all(db)
        .await
    }

    /// Emails of every active admin, used as alert recipients.
    pub async fn active_admin_emails(db: &PgPool) -> sqlx::Result<Vec<String>> {
        sqlx::query_scalar::<_, String>(
            "SELECT email FROM users WHERE role = 'admin' AND is_active ORDER BY email",
        )
        .fetch_all(db)
        .await
    }

    pub async fn create(db: &PgPool, new: NewUser<'_>) -> sqlx::Result<User> {
        sqlx::query_as::<_, User>(&format!(
            r#"
            INSERT INTO users (id, username, email, password_hash, role, is_active)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING {USER_COLUMNS}
            "#
        ))
        .bind(Uuid::new_v4())
        .bind(new.username)
        .bind(new.email)
        .bind(new.password_hash)
        .bind(new.role)
        .bind(new.is_active)
        .fetch_one(db)
        .await
    }

    /// Bootstrap registration: the first account becomes an active admin,
    /// later ones are inactive employees. Runs under a table lock so two
    /// concurrent first registrations cannot both become admin.
    pub async fn register(
        db: &PgPool,
        username: &str,
        email: &str,
        password_hash: &str,
    ) -> sqlx::Result<User> {
        let mut tx = db.begin().await?;
        sqlx::query("LOCK TABLE users IN SHARE ROW EXCLUSIVE MODE")
            .execute(&mut *tx)
            .await?;
        let existing: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM users")
            .fetch_one(&mut *tx)
            .await?;
        let first = existing == 0;
        let user = sqlx::query_as::<_, User>(&format!(
            r#"
            INSERT INTO users (id, username, email, password_hash, role, is_active)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING {USER_COLUMNS}
            "#
        ))
        .bind(Uuid::new_v4())
        .bind(username)
        .bind(email)
        .bind(password_hash)
        .bind(if first { Role::Admin } else { Role::Employee })
        .bind(first)
        .fetch_one(&mut *tx)
        .await?;
        tx.commit().await?;
        Ok(user)
    }

    pub async fn update(db: &PgPool, id: Uuid, changes: UserChanges) -> sqlx::Result<Option<User>> {
        let mut qb: QueryBuilder<Postgres> = QueryBuilder::new("UPDATE users SET updated_at = now()");
        if let Some(username) = changes.username {
            qb.push(", username = ").push_bind(username);
        }
        if let Some(email) = changes.email {
            qb.push(", email = ").push_bind(email);
        }
        if let Some(role) = changes.role {
            qb.push(", role = ").push_bind(role);
        }
        if let Some(active) = changes.is_active {
            qb.push(", is_active = ").push_bind(active);
        }
        qb.push(" WHERE id = ").push_bind(id);
        qb.push(format!(" RETURNING {USER_COLUMNS}"));
        qb.build_query_as::<User>().fetch_optional(db).await
    }

    pub async fn delete(db: &PgPool, id: Uuid) -> sqlx::Result<bool> {
        let res = sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(id)
            .execute(db)
            .await?;
        Ok(res.rows_affected() > 0)
    }

    pub async fn access_state(db: &PgPool, id: Uuid) -> sqlx::Result<Option<AccessState>> {
        sqlx::query_as::<_, AccessState>(
            "SELECT is_active, role, username FROM users WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(db)
        .await
    }
}
