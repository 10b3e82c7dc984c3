use axum::{
    Router,
    body::Body,
    http::{Method, Request, StatusCode},
};
use sea_orm::{ConnectionTrait, Database};
use serde_json::{Value, json};
use subscription_tracker::{Config, Server, test_utils::TestServerBuilder};
use tower::ServiceExt;
use uuid::Uuid;

/// Run the same scenario against in-memory SQLite and, when reachable, PostgreSQL
macro_rules! database_test {
    ($test_name:ident, $test_impl:ident) => {
        pastey::paste! {
            #[tokio::test]
            async fn [<sqlite_ $test_name>]() {
                let harness = crate::common::TestHarness::sqlite().await;
                $test_impl(&harness).await;
            }

            #[tokio::test]
            async fn [<postgres_ $test_name>]() {
                let postgres_db = match crate::common::PostgresTestDb::new().await {
                    Ok(db) => db,
                    Err(_) => {
                        println!("Skipping PostgreSQL test - database not available");
                        return;
                    }
                };

                let harness = crate::common::TestHarness::postgres(&postgres_db).await;
                $test_impl(&harness).await;

                // Clean up
                drop(harness);
                let _ = postgres_db.cleanup().await;
            }
        }
    };
}

/// Application router plus the server it was built from
pub struct TestHarness {
    #[allow(dead_code)]
    pub server: Server,
    pub app: Router,
}

impl TestHarness {
    pub async fn sqlite() -> Self {
        Self::from_server(TestServerBuilder::new().build().await)
    }

    pub async fn postgres(db: &PostgresTestDb) -> Self {
        let mut config = Config::default();
        config.database.url = db.database_url.clone();

        let server = TestServerBuilder::new()
            .with_config(config)
            .with_real_database()
            .build()
            .await;
        Self::from_server(server)
    }

    pub fn from_server(server: Server) -> Self {
        let app = server.create_app();
        Self { server, app }
    }

    /// Send a request and decode the JSON body (`Value::Null` when empty)
    pub async fn request(&self, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
        let builder = Request::builder()
            .method(method)
            .uri(uri)
            .header("Content-Type", "application/json");
        let request = match body {
            Some(body) => builder.body(Body::from(body.to_string())).unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };

        let response = self.app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let json = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, json)
    }

    pub async fn get(&self, uri: &str) -> (StatusCode, Value) {
        self.request(Method::GET, uri, None).await
    }

    #[allow(dead_code)]
    pub async fn put(&self, uri: &str, body: Value) -> (StatusCode, Value) {
        self.request(Method::PUT, uri, Some(body)).await
    }

    #[allow(dead_code)]
    pub async fn delete(&self, uri: &str) -> (StatusCode, Value) {
        self.request(Method::DELETE, uri, None).await
    }

    /// Create a subscription through the API, returning the stored record
    pub async fn create_subscription(
        &self,
        user_id: Uuid,
        service_name: &str,
        price: i64,
        start_date: &str,
        end_date: Option<&str>,
    ) -> Value {
        let mut body = json!({
            "service_name": service_name,
            "price": price,
            "user_id": user_id,
            "start_date": start_date,
        });
        if let Some(end_date) = end_date {
            body["end_date"] = json!(end_date);
        }

        let (status, record) = self
            .request(Method::POST, "/api/v1/subscriptions", Some(body))
            .await;
        assert_eq!(status, StatusCode::CREATED, "create failed: {record}");
        record
    }

    /// Aggregate total for a window, asserting success
    #[allow(dead_code)]
    pub async fn total(&self, query: &str) -> u64 {
        let (status, json) = self
            .get(&format!("/api/v1/subscriptions/aggregate/total?{query}"))
            .await;
        assert_eq!(status, StatusCode::OK, "aggregate failed: {json}");
        json["total"].as_u64().unwrap()
    }
}

/// Throwaway PostgreSQL database created from `TEST_POSTGRES_URL`
pub struct PostgresTestDb {
    pub database_url: String,
    admin_url: String,
    name: String,
}

impl PostgresTestDb {
    pub async fn new() -> Result<Self, Box<dyn std::error::Error>> {
        let admin_url = std::env::var("TEST_POSTGRES_URL")?;
        let name = format!("subscriptions_test_{}", Uuid::new_v4().simple());

        let admin = Database::connect(&admin_url).await?;
        admin
            .execute_unprepared(&format!("CREATE DATABASE \"{name}\""))
            .await?;
        admin.close().await?;

        let base = admin_url
            .split('?')
            .next()
            .and_then(|url| url.rsplit_once('/'))
            .map(|(base, _)| base)
            .ok_or("TEST_POSTGRES_URL has no database path")?;

        Ok(Self {
            database_url: format!("{base}/{name}"),
            admin_url,
            name,
        })
    }

    pub async fn cleanup(&self) -> Result<(), sea_orm::DbErr> {
        let admin = Database::connect(&self.admin_url).await?;
        admin
            .execute_unprepared(&format!(
                "DROP DATABASE IF EXISTS \"{}\" WITH (FORCE)",
                self.name
            ))
            .await?;
        admin.close().await
    }
}
