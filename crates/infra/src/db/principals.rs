use std::sync::Arc;

use async_trait::async_trait;
use sqlx::postgres::PgArguments;
use sqlx::{PgPool, Postgres, Row};
use tracing::instrument;

use expensegate_auth::{Principal, PrincipalRepository, PrincipalStoreError, Secret};
use expensegate_core::{DepartmentId, UserId, Username};

use super::describe_sqlx_error;

const SELECT_BY_USERNAME: &str = r#"
    SELECT user_id, username, name, password, department_id, is_approver
    FROM principals
    WHERE username = $1
"#;

const SELECT_BY_ID: &str = r#"
    SELECT user_id, username, name, password, department_id, is_approver
    FROM principals
    WHERE user_id = $1
"#;

const SELECT_APPROVER: &str = r#"
    SELECT user_id, username, name, password, department_id, is_approver
    FROM principals
    WHERE department_id = $1 AND is_approver
    ORDER BY user_id
    LIMIT 1
"#;

/// Postgres-backed principal store (`principals` table).
#[derive(Debug, Clone)]
pub struct PostgresPrincipalRepository {
    pool: Arc<PgPool>,
}

impl PostgresPrincipalRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool: Arc::new(pool) }
    }

    async fn fetch_principal(
        &self,
        operation: &str,
        query: sqlx::query::Query<'_, Postgres, PgArguments>,
    ) -> Result<Option<Principal>, PrincipalStoreError> {
        let row = query
            .fetch_optional(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error(operation, e))?;
        row.map(|r| principal_from_row(&r))
            .transpose()
            .map_err(|e| map_sqlx_error(operation, e))
    }
}

#[async_trait]
impl PrincipalRepository for PostgresPrincipalRepository {
    #[instrument(skip(self), fields(username = %username), err)]
    async fn find_by_username(
        &self,
        username: &Username,
    ) -> Result<Option<Principal>, PrincipalStoreError> {
        let query = sqlx::query(SELECT_BY_USERNAME).bind(username.as_str());
        self.fetch_principal("find_by_username", query).await
    }

    #[instrument(skip(self), fields(user_id = %user_id), err)]
    async fn find_by_id(&self, user_id: &UserId) -> Result<Option<Principal>, PrincipalStoreError> {
        let query = sqlx::query(SELECT_BY_ID).bind(user_id.as_str());
        self.fetch_principal("find_by_id", query).await
    }

    /// Lowest `user_id` among the department's approvers.
    #[instrument(skip(self), fields(department = %department), err)]
    async fn find_approver(
        &self,
        department: DepartmentId,
    ) -> Result<Option<Principal>, PrincipalStoreError> {
        let query = sqlx::query(SELECT_APPROVER).bind(department.get());
        self.fetch_principal("find_approver", query).await
    }

    #[instrument(skip(self, principal), fields(user_id = %principal.user_id), err)]
    async fn provision(&self, principal: Principal) -> Result<bool, PrincipalStoreError> {
        let result = sqlx::query(
            r#"
            INSERT INTO principals (user_id, username, name, password, department_id, is_approver)
            VALUES ($1, $2, $3, $4, $5, $6)
            ON CONFLICT DO NOTHING
            "#,
        )
        .bind(principal.user_id.as_str())
        .bind(principal.username.as_str())
        .bind(&principal.display_name)
        .bind(principal.secret().expose())
        .bind(principal.department_id.get())
        .bind(principal.is_approver)
        .execute(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("provision", e))?;

        Ok(result.rows_affected() == 1)
    }
}

fn principal_from_row(row: &sqlx::postgres::PgRow) -> Result<Principal, sqlx::Error> {
    Ok(Principal::new(
        UserId::new(row.try_get::<String, _>("user_id")?),
        Username::new(row.try_get::<String, _>("username")?),
        row.try_get::<String, _>("name")?,
        DepartmentId::new(row.try_get::<i32, _>("department_id")?),
        row.try_get::<bool, _>("is_approver")?,
        Secret::new(row.try_get::<String, _>("password")?),
    ))
}

fn map_sqlx_error(operation: &str, err: sqlx::Error) -> PrincipalStoreError {
    PrincipalStoreError::Storage(describe_sqlx_error(operation, err))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::scratch::ScratchSchema;

    fn principal(id: &str, username: &str, dept: i32, approver: bool) -> Principal {
        Principal::new(
            UserId::new(id),
            Username::new(username),
            username,
            DepartmentId::new(dept),
            approver,
            Secret::new("password"),
        )
    }

    #[tokio::test]
    async fn provision_conflicts_and_approver_order() {
        let Some(schema) = ScratchSchema::create("principals").await else {
            return;
        };
        let repo = PostgresPrincipalRepository::new(schema.pool.clone());

        assert!(repo.provision(principal("UID07", "second", 1, true)).await.unwrap());
        assert!(repo.provision(principal("UID03", "first", 1, true)).await.unwrap());
        assert!(!repo.provision(principal("UID09", "first", 2, false)).await.unwrap());

        let approver = repo.find_approver(DepartmentId::new(1)).await.unwrap().unwrap();
        assert_eq!(approver.user_id.as_str(), "UID03");
        assert!(repo.find_approver(DepartmentId::new(2)).await.unwrap().is_none());

        let found = repo.find_by_username(&Username::new("second")).await.unwrap().unwrap();
        assert_eq!(found.secret().expose(), "password");

        schema.drop_schema().await;
    }
}
