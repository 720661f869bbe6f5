// region:    --- Imports
use sqlx::postgres::{PgPool, PgPoolOptions};
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

// endregion: --- Imports

// region:    --- Database Manager
/// 데이터베이스 커넥션 관리자
/// 커넥션의 생성과 수명은 프로세스 진입점이 소유하고, 각 컴포넌트에는 주입된다.
pub struct DatabaseManager {
    pub pool: Arc<PgPool>,
}

impl DatabaseManager {
    /// 데이터베이스 매니저 생성
    pub async fn new(database_url: &str) -> Result<Self, sqlx::Error> {
        let pool = PgPoolOptions::new()
            .max_connections(5)
            .connect(database_url)
            .await?;
        Ok(Self {
            pool: Arc::new(pool),
        })
    }

    /// 데이터베이스 풀 가져오기
    pub fn get_pool(&self) -> Arc<PgPool> {
        Arc::clone(&self.pool)
    }

    /// 트랜잭션 실행
    pub async fn transaction<F, R, E>(&self, f: F) -> Result<R, E>
    where
        F: for<'c> FnOnce(
            &'c mut sqlx::Transaction<'_, sqlx::Postgres>,
        ) -> Pin<Box<dyn Future<Output = Result<R, E>> + Send + 'c>>,
        E: From<sqlx::Error>,
    {
        let mut tx = self.pool.begin().await?;
        let result = f(&mut tx).await;
        match result {
            Ok(r) => {
                tx.commit().await?;
                Ok(r)
            }
            Err(e) => {
                tx.rollback().await?;
                Err(e)
            }
        }
    }

    /// 스키마 초기화 (멱등: CREATE TABLE IF NOT EXISTS)
    pub async fn initialize_database(&self) -> Result<(), sqlx::Error> {
        let create_schema_sql = include_str!("../sql/01-create-schema.sql");
        self.execute_multi_query(create_schema_sql).await?;
        Ok(())
    }

    /// 여러 쿼리 실행
    async fn execute_multi_query(&self, sql: &str) -> Result<(), sqlx::Error> {
        for query in sql.split(';') {
            let query = query.trim();
            if !query.is_empty() {
                sqlx::query(query).execute(&*self.pool).await?;
            }
        }
        Ok(())
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}
// endregion: --- Database Manager
