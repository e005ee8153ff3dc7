#![allow(dead_code)]

use std::process::{Child, Command, Stdio};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::OnceLock;
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};

use anyhow::{Context, Result};
use reqwest::StatusCode;
use serde_json::{json, Value};

static SERVER: OnceLock<Option<TestServer>> = OnceLock::new();
static COUNTER: AtomicU64 = AtomicU64::new(0);

pub struct TestServer {
    pub port: u16,
    pub base_url: String,
    pub database_url: String,
    child: Child,
}

impl TestServer {
    fn spawn(database_url: String) -> Result<Self> {
        // Pick an unused port for isolation
        let port = portpicker::pick_unused_port().context("failed to pick free port")?;
        let base_url = format!("http://127.0.0.1:{}", port);

        let mut cmd = Command::new(env!("CARGO_BIN_EXE_kpop-api"));
        cmd.args(["--port", &port.to_string(), "--env", "development", "--migrate"])
            .args(["--db-dsn", &database_url])
            .env("SECURITY_EXPOSE_ACTIVATION_TOKENS", "true")
            .stdin(Stdio::null())
            .stdout(Stdio::inherit())
            .stderr(Stdio::inherit());

        let child = cmd.spawn().context("failed to spawn server binary")?;

        Ok(Self { port, base_url, database_url, child })
    }

    async fn wait_ready(&self, timeout: Duration) -> Result<()> {
        let client = reqwest::Client::new();
        let deadline = Instant::now() + timeout;
        while Instant::now() < deadline {
            let url = format!("{}/v1/healthcheck", self.base_url);
            if let Ok(resp) = client.get(&url).send().await {
                if resp.status() == StatusCode::OK {
                    return Ok(());
                }
            }
            tokio::time::sleep(Duration::from_millis(150)).await;
        }
        anyhow::bail!("server did not become ready on {} within {:?}", self.base_url, timeout)
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }
}

/// The shared server, or `None` when `TEST_DATABASE_URL` is unset and the
/// database-backed tests should be skipped.
pub async fn ensure_server() -> Result<Option<&'static TestServer>> {
    let server = SERVER.get_or_init(|| {
        let url = std::env::var("TEST_DATABASE_URL").ok()?;
        Some(TestServer::spawn(url).expect("failed to spawn server binary"))
    });

    match server {
        Some(server) => {
            server.wait_ready(Duration::from_secs(15)).await?;
            Ok(Some(server))
        }
        None => {
            eprintln!("TEST_DATABASE_URL not set; skipping");
            Ok(None)
        }
    }
}

/// A value unique to this test run, usable as a name or email local part.
pub fn unique(prefix: &str) -> String {
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_nanos())
        .unwrap_or_default();
    format!("{}{}x{}", prefix, nanos, COUNTER.fetch_add(1, Ordering::Relaxed))
}

/// Registers, activates and logs in a fresh user. Returns the bearer token.
pub async fn signup(server: &TestServer, extra_permissions: &[&str]) -> Result<String> {
    let client = reqwest::Client::new();
    let email = format!("{}@example.com", unique("user"));

    let res = client
        .post(server.url("/v1/users"))
        .json(&json!({"name": "Test User", "email": email, "password": "pa55word!"}))
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::ACCEPTED);
    let body: Value = res.json().await?;
    let activation = body["activation_token"]["token"]
        .as_str()
        .context("activation token not exposed")?
        .to_string();

    let res = client
        .put(server.url("/v1/users/activated"))
        .json(&json!({"token": activation}))
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::OK);

    if !extra_permissions.is_empty() {
        grant(server, &email, extra_permissions).await?;
    }

    let res = client
        .post(server.url("/v1/tokens/login"))
        .json(&json!({"email": email, "password": "pa55word!"}))
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::CREATED);
    let body: Value = res.json().await?;
    Ok(body["authentication_token"]["token"]
        .as_str()
        .context("missing authentication token")?
        .to_string())
}

async fn grant(server: &TestServer, email: &str, codes: &[&str]) -> Result<()> {
    let pool = sqlx::PgPool::connect(&server.database_url).await?;
    let codes: Vec<String> = codes.iter().map(|c| c.to_string()).collect();
    sqlx::query(
        r#"
        INSERT INTO users_permissions (user_id, permission_id)
        SELECT users.id, permissions.id FROM users, permissions
        WHERE lower(users.email) = lower($1) AND permissions.code = ANY($2)
        ON CONFLICT DO NOTHING
        "#,
    )
    .bind(email)
    .bind(&codes)
    .execute(&pool)
    .await?;
    pool.close().await;
    Ok(())
}
