use anyhow::{anyhow, Context, Result};
use reqwest::header::{HeaderMap, HeaderValue};
use reqwest::Url;

#[derive(Clone)]
pub struct HttpSession {
    base: Url,
    client: reqwest::Client,
    csrf: String,
}

impl HttpSession {
    /// Staff sign-in with a provider access token.
    pub async fn connect_staff(base: &str, access_token: &str) -> Result<Self> {
        let base_url = Url::parse(base).context("invalid base URL")?;
        let client = reqwest::Client::builder().cookie_store(true).build()?;
        let login_url = base_url.join("/auth/session")?;
        let resp = client
            .post(login_url)
            .json(&serde_json::json!({"access_token": access_token}))
            .send()
            .await?;
        let status = resp.status();
        let v: serde_json::Value =
            resp.json().await.unwrap_or(serde_json::json!({"status":"error"}));
        if !status.is_success() || v.get("status").and_then(|s| s.as_str()) != Some("ok") {
            return Err(anyhow!("sign-in failed: HTTP {} {}", status, v));
        }
        Self::finish(base_url, client).await
    }

    /// Customer sign-in with invoice number + phone.
    pub async fn connect_customer(base: &str, invoice_number: &str, phone: &str) -> Result<Self> {
        let base_url = Url::parse(base).context("invalid base URL")?;
        let client = reqwest::Client::builder().cookie_store(true).build()?;
        let login_url = base_url.join("/auth/login/customer")?;
        let resp = client
            .post(login_url)
            .json(&serde_json::json!({"invoice_number": invoice_number, "phone": phone}))
            .send()
            .await?;
        let status = resp.status();
        let v: serde_json::Value =
            resp.json().await.unwrap_or(serde_json::json!({"status":"error"}));
        if !status.is_success() || v.get("status").and_then(|s| s.as_str()) != Some("ok") {
            return Err(anyhow!("sign-in failed: HTTP {} {}", status, v));
        }
        Self::finish(base_url, client).await
    }

    // Fetch the CSRF token after any successful sign-in.
    async fn finish(base: Url, client: reqwest::Client) -> Result<Self> {
        let csrf_url = base.join("/auth/csrf")?;
        let resp = client.get(csrf_url).send().await?;
        if !resp.status().is_success() {
            return Err(anyhow!("failed to obtain csrf: HTTP {}", resp.status()));
        }
        let v: serde_json::Value = resp.json().await.unwrap_or(serde_json::json!({}));
        let csrf = v.get("csrf").and_then(|s| s.as_str()).unwrap_or("").to_string();
        if csrf.is_empty() {
            return Err(anyhow!("csrf token missing"));
        }
        Ok(Self { base, client, csrf })
    }

    pub fn base(&self) -> &Url {
        &self.base
    }

    pub async fn get(&self, path: &str) -> Result<serde_json::Value> {
        let url = self.base.join(path)?;
        let resp = self.client.get(url).send().await?;
        let status = resp.status();
        let val: serde_json::Value =
            resp.json().await.unwrap_or(serde_json::json!({"status":"error"}));
        if !status.is_success() {
            return Err(anyhow!("remote error: {}", val));
        }
        Ok(val)
    }

    pub async fn post(&self, path: &str, body: &serde_json::Value) -> Result<serde_json::Value> {
        let url = self.base.join(path)?;
        let mut headers = HeaderMap::new();
        headers.insert("x-csrf-token", HeaderValue::from_str(&self.csrf).unwrap());
        let resp = self.client.post(url).headers(headers).json(body).send().await?;
        let status = resp.status();
        let val: serde_json::Value =
            resp.json().await.unwrap_or(serde_json::json!({"status":"error"}));
        if !status.is_success() {
            return Err(anyhow!("remote error: {}", val));
        }
        Ok(val)
    }

    pub async fn put(&self, path: &str, body: &serde_json::Value) -> Result<serde_json::Value> {
        let url = self.base.join(path)?;
        let mut headers = HeaderMap::new();
        headers.insert("x-csrf-token", HeaderValue::from_str(&self.csrf).unwrap());
        let resp = self.client.put(url).headers(headers).json(body).send().await?;
        let status = resp.status();
        let val: serde_json::Value =
            resp.json().await.unwrap_or(serde_json::json!({"status":"error"}));
        if !status.is_success() {
            return Err(anyhow!("remote error: {}", val));
        }
        Ok(val)
    }

    pub async fn logout(&self) -> Result<()> {
        let url = self.base.join("/auth/logout")?;
        let mut headers = HeaderMap::new();
        headers.insert("x-csrf-token", HeaderValue::from_str(&self.csrf).unwrap());
        let resp = self.client.post(url).headers(headers).send().await?;
        if !resp.status().is_success() {
            return Err(anyhow!("logout failed: HTTP {}", resp.status()));
        }
        Ok(())
    }
}
