use std::net::SocketAddr;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use reqwest::{Client, StatusCode};
use serde_json::{Value, json};
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use uuid::Uuid;

use paperflow::auth::password;
use paperflow::config::{AppMode, Config};
use paperflow::process::engine::{DocumentEngine, EngineError, EngineOutput, EngineRequest};

/// Test double for the external converter.
pub struct StubEngine {
    pub fail: bool,
}

#[async_trait]
impl DocumentEngine for StubEngine {
    async fn generate(&self, _req: &EngineRequest) -> Result<EngineOutput, EngineError> {
        if self.fail {
            Err(EngineError {
                code: "ENGINE_FAILED".to_string(),
                message: "converter rejected the input".to_string(),
                detail: Some("stub failure".to_string()),
            })
        } else {
            Ok(EngineOutput {
                workbook: b"stub-workbook".to_vec(),
                order_pdf: b"stub-order-pdf".to_vec(),
                inspection_pdf: b"stub-inspection-pdf".to_vec(),
            })
        }
    }
}

/// A running test server instance with a dedicated test database.
pub struct TestApp {
    pub addr: SocketAddr,
    pub pool: PgPool,
    pub client: Client,
    pub db_name: String,
}

impl TestApp {
    pub fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }

    /// Register the bootstrap user (first user = administrator).
    pub async fn register(&self, email: &str, pass: &str) -> (Value, StatusCode) {
        let resp = self
            .client
            .post(self.url("/api/auth/register"))
            .json(&json!({ "email": email, "password": pass }))
            .send()
            .await
            .expect("register request failed");
        let status = resp.status();
        let body: Value = resp.json().await.unwrap_or(json!(null));
        (body, status)
    }

    pub async fn login(&self, email: &str, pass: &str) -> (Value, StatusCode) {
        let resp = self
            .client
            .post(self.url("/api/auth/login"))
            .json(&json!({ "email": email, "password": pass }))
            .send()
            .await
            .expect("login request failed");
        let status = resp.status();
        let body: Value = resp.json().await.unwrap_or(json!(null));
        (body, status)
    }

    /// Register the bootstrap administrator, return the access token.
    pub async fn bootstrap(&self) -> String {
        let (body, status) = self.register("admin@test.com", "password123").await;
        assert_eq!(status, StatusCode::OK, "bootstrap register failed: {body}");
        body["access_token"].as_str().unwrap().to_string()
    }

    /// Insert a user directly with a hashed password, bypassing invitation
    /// mail. Returns the user id.
    pub async fn seed_user(&self, email: &str, role: &str, pass: &str) -> Uuid {
        let hash = password::hash(pass).unwrap();
        let (id,): (Uuid,) = sqlx::query_as(
            "INSERT INTO users (email, password_hash, role) VALUES ($1, $2, $3) RETURNING id",
        )
        .bind(email)
        .bind(hash)
        .bind(role)
        .fetch_one(&self.pool)
        .await
        .expect("seed_user failed");
        id
    }

    /// Companies are registered out-of-band in production; tests insert them
    /// directly.
    pub async fn seed_company(&self, name: &str, patterns: &[&str]) -> Uuid {
        let patterns: Vec<String> = patterns.iter().map(|s| s.to_string()).collect();
        let (id,): (Uuid,) = sqlx::query_as(
            "INSERT INTO companies (name, display_name, match_patterns)
             VALUES ($1, $2, $3) RETURNING id",
        )
        .bind(name)
        .bind(format!("{name} Inc."))
        .bind(&patterns)
        .fetch_one(&self.pool)
        .await
        .expect("seed_company failed");
        id
    }

    /// Insert a history row with small artifact blobs.
    pub async fn seed_history(
        &self,
        user_id: Uuid,
        company_id: Uuid,
        status: &str,
        process_date: &str,
    ) -> Uuid {
        let (excel, order, inspection) = if status == "success" {
            (
                Some(b"excel-bytes".to_vec()),
                Some(b"order-bytes".to_vec()),
                Some(b"inspection-bytes".to_vec()),
            )
        } else {
            (None, None, None)
        };

        let (id,): (Uuid,) = sqlx::query_as(
            "INSERT INTO processed_files (
                 user_id, company_id, process_date, status,
                 excel_file, excel_filename, order_pdf, order_pdf_filename,
                 inspection_pdf, inspection_pdf_filename, error_message
             ) VALUES ($1, $2, $3::date, $4, $5, $6, $7, $8, $9, $10, $11)
             RETURNING id",
        )
        .bind(user_id)
        .bind(company_id)
        .bind(process_date)
        .bind(status)
        .bind(&excel)
        .bind(excel.as_ref().map(|_| "report_2605.xlsx"))
        .bind(&order)
        .bind(order.as_ref().map(|_| "order_2605.pdf"))
        .bind(&inspection)
        .bind(inspection.as_ref().map(|_| "inspection_2605.pdf"))
        .bind((status == "error").then_some("converter rejected the input"))
        .fetch_one(&self.pool)
        .await
        .expect("seed_history failed");
        id
    }

    pub async fn admin_user_id(&self) -> Uuid {
        let (id,): (Uuid,) =
            sqlx::query_as("SELECT id FROM users ORDER BY created_at ASC LIMIT 1")
                .fetch_one(&self.pool)
                .await
                .expect("no users seeded");
        id
    }

    pub async fn get_auth(&self, path: &str, token: &str) -> (Value, StatusCode) {
        let resp = self
            .client
            .get(self.url(path))
            .bearer_auth(token)
            .send()
            .await
            .expect("get request failed");
        let status = resp.status();
        let body: Value = resp.json().await.unwrap_or(json!(null));
        (body, status)
    }

    pub async fn post_auth(&self, path: &str, token: &str, body: &Value) -> (Value, StatusCode) {
        let resp = self
            .client
            .post(self.url(path))
            .bearer_auth(token)
            .json(body)
            .send()
            .await
            .expect("post request failed");
        let status = resp.status();
        let body: Value = resp.json().await.unwrap_or(json!(null));
        (body, status)
    }

    pub async fn put_auth(&self, path: &str, token: &str, body: &Value) -> (Value, StatusCode) {
        let resp = self
            .client
            .put(self.url(path))
            .bearer_auth(token)
            .json(body)
            .send()
            .await
            .expect("put request failed");
        let status = resp.status();
        let body: Value = resp.json().await.unwrap_or(json!(null));
        (body, status)
    }

    pub async fn patch_auth(&self, path: &str, token: &str, body: &Value) -> (Value, StatusCode) {
        let resp = self
            .client
            .patch(self.url(path))
            .bearer_auth(token)
            .json(body)
            .send()
            .await
            .expect("patch request failed");
        let status = resp.status();
        let body: Value = resp.json().await.unwrap_or(json!(null));
        (body, status)
    }

    pub async fn delete_auth(&self, path: &str, token: &str) -> (Value, StatusCode) {
        let resp = self
            .client
            .delete(self.url(path))
            .bearer_auth(token)
            .send()
            .await
            .expect("delete request failed");
        let status = resp.status();
        let body: Value = resp.json().await.unwrap_or(json!(null));
        (body, status)
    }

    /// POST a multipart form, `files` being (field, filename, bytes) triples.
    pub async fn post_multipart(
        &self,
        path: &str,
        token: &str,
        files: &[(&str, &str, &[u8])],
        fields: &[(&str, &str)],
    ) -> (Value, StatusCode) {
        let mut form = reqwest::multipart::Form::new();
        for (field, filename, data) in files {
            let part = reqwest::multipart::Part::bytes(data.to_vec())
                .file_name(filename.to_string())
                .mime_str("application/octet-stream")
                .unwrap();
            form = form.part(field.to_string(), part);
        }
        for (name, value) in fields {
            form = form.text(name.to_string(), value.to_string());
        }

        let resp = self
            .client
            .post(self.url(path))
            .bearer_auth(token)
            .multipart(form)
            .send()
            .await
            .expect("multipart request failed");
        let status = resp.status();
        let body: Value = resp.json().await.unwrap_or(json!(null));
        (body, status)
    }
}

pub async fn spawn_app() -> TestApp {
    spawn_app_with(AppMode::Web, false).await
}

pub async fn spawn_app_desktop() -> TestApp {
    spawn_app_with(AppMode::Desktop, false).await
}

pub async fn spawn_app_failing_engine() -> TestApp {
    spawn_app_with(AppMode::Web, true).await
}

/// Spawn a test app with a fresh temporary database.
async fn spawn_app_with(mode: AppMode, engine_fails: bool) -> TestApp {
    let _ = dotenvy::dotenv();

    let base_url = std::env::var("DATABASE_URL").expect("DATABASE_URL must be set for tests");

    // Create a unique test database
    let db_name = format!(
        "paperflow_test_{}",
        Uuid::now_v7().to_string().replace('-', "")
    );

    let admin_url = base_url
        .rsplit_once('/')
        .map(|(base, _)| format!("{base}/postgres"))
        .unwrap_or_else(|| base_url.clone());

    let admin_pool = PgPoolOptions::new()
        .max_connections(2)
        .connect(&admin_url)
        .await
        .expect("Failed to connect to postgres for test DB creation");

    sqlx::query(&format!("CREATE DATABASE \"{db_name}\""))
        .execute(&admin_pool)
        .await
        .expect("Failed to create test database");

    admin_pool.close().await;

    let test_url = base_url
        .rsplit_once('/')
        .map(|(base, _)| format!("{base}/{db_name}"))
        .unwrap_or_else(|| base_url.clone());

    let pool = PgPoolOptions::new()
        .max_connections(5)
        .connect(&test_url)
        .await
        .expect("Failed to connect to test database");

    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .expect("Failed to run migrations on test database");

    let config = Config {
        database_url: test_url,
        jwt_secret: "test-jwt-secret-that-is-long-enough".to_string(),
        host: "127.0.0.1".parse().unwrap(),
        port: 0, // unused, we bind to a random port
        base_url: "http://localhost:0".to_string(),
        allowed_origins: vec![],
        max_upload_size: 10 * 1024 * 1024,
        app_mode: mode,
        engine_command: "unused-in-tests".to_string(),
        log_level: "warn".to_string(),
        smtp: None,
    };

    let engine = Arc::new(StubEngine { fail: engine_fails });
    let app = paperflow::build_app(pool.clone(), config, engine);

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind to random port");
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        axum::serve(listener, app).await.expect("Server failed");
    });

    let client = Client::builder()
        .redirect(reqwest::redirect::Policy::none())
        .build()
        .unwrap();

    TestApp {
        addr,
        pool,
        client,
        db_name,
    }
}

/// Drop the test database after tests complete.
pub async fn cleanup(app: TestApp) {
    let db_name = app.db_name.clone();
    app.pool.close().await;

    let base_url = std::env::var("DATABASE_URL").expect("DATABASE_URL must be set for tests");
    let admin_url = base_url
        .rsplit_once('/')
        .map(|(base, _)| format!("{base}/postgres"))
        .unwrap_or_else(|| base_url.clone());

    let admin_pool = PgPoolOptions::new()
        .max_connections(2)
        .connect(&admin_url)
        .await
        .expect("Failed to connect for cleanup");

    let _ = sqlx::query(&format!(
        "DROP DATABASE IF EXISTS \"{db_name}\" WITH (FORCE)"
    ))
    .execute(&admin_pool)
    .await;

    admin_pool.close().await;
}

/// Stamp distinct created_at values so sort-order assertions are stable.
pub async fn backdate_history(pool: &PgPool, id: Uuid, minutes_ago: i64) {
    sqlx::query("UPDATE processed_files SET created_at = $2 WHERE id = $1")
        .bind(id)
        .bind(Utc::now() - chrono::Duration::minutes(minutes_ago))
        .execute(pool)
        .await
        .expect("backdate failed");
}
