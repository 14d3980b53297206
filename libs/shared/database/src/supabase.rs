use reqwest::{
    header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_RANGE, CONTENT_TYPE},
    Client, Method, Response,
};
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::{debug, error};

use shared_config::AppConfig;

use crate::error::SupabaseError;
use crate::query::PostgrestQuery;

pub const PREFER_REPRESENTATION: &str = "return=representation";
pub const PREFER_MINIMAL: &str = "return=minimal";
const PREFER_COUNT_EXACT: &str = "count=exact";

#[derive(Clone)]
pub struct SupabaseClient {
    client: Client,
    base_url: String,
    anon_key: String,
}

impl SupabaseClient {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            client: Client::new(),
            base_url: config.supabase_url.trim_end_matches('/').to_string(),
            anon_key: config.supabase_anon_key.clone(),
        }
    }

    fn get_headers(&self, auth_token: Option<&str>) -> Result<HeaderMap, SupabaseError> {
        let mut headers = HeaderMap::new();

        headers.insert("apikey", HeaderValue::from_str(&self.anon_key)?);
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        if let Some(token) = auth_token {
            headers.insert(
                AUTHORIZATION,
                HeaderValue::from_str(&format!("Bearer {}", token))?,
            );
        }

        Ok(headers)
    }

    async fn send(
        &self,
        method: Method,
        path: &str,
        query: &PostgrestQuery,
        auth_token: Option<&str>,
        body: Option<Value>,
        extra_headers: Option<HeaderMap>,
    ) -> Result<Response, SupabaseError> {
        let url = format!("{}{}", self.base_url, path);
        debug!("Making {} request to {}", method, url);

        let mut headers = self.get_headers(auth_token)?;
        if let Some(extra) = extra_headers {
            headers.extend(extra);
        }

        let mut req = self
            .client
            .request(method, &url)
            .headers(headers)
            .query(query.pairs());

        if let Some(body_data) = body {
            req = req.json(&body_data);
        }

        let response = req.send().await?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await?;
            error!("API error ({}): {}", status, error_text);
            return Err(SupabaseError::from_response(status, &error_text));
        }

        Ok(response)
    }

    /// Request against `/rest/v1/{table}` with encoded filter pairs.
    pub async fn query<T>(
        &self,
        method: Method,
        table: &str,
        query: &PostgrestQuery,
        auth_token: Option<&str>,
        body: Option<Value>,
        prefer: Option<&'static str>,
    ) -> Result<T, SupabaseError>
    where
        T: DeserializeOwned,
    {
        let path = format!("/rest/v1/{}", table);
        let response = self
            .send(method, &path, query, auth_token, body, prefer_header(prefer))
            .await?;
        let bytes = response.bytes().await?;
        Ok(serde_json::from_slice(&bytes)?)
    }

    /// Like [`SupabaseClient::query`] but discards the response body.
    pub async fn execute(
        &self,
        method: Method,
        table: &str,
        query: &PostgrestQuery,
        auth_token: Option<&str>,
        body: Option<Value>,
    ) -> Result<(), SupabaseError> {
        let path = format!("/rest/v1/{}", table);
        self.send(method, &path, query, auth_token, body, prefer_header(Some(PREFER_MINIMAL)))
            .await?;
        Ok(())
    }

    /// Exact number of rows matching the query's filters.
    pub async fn count(
        &self,
        table: &str,
        query: &PostgrestQuery,
        auth_token: Option<&str>,
    ) -> Result<u64, SupabaseError> {
        let path = format!("/rest/v1/{}", table);
        let filters = query.filters_only();
        let response = self
            .send(Method::HEAD, &path, &filters, auth_token, None, prefer_header(Some(PREFER_COUNT_EXACT)))
            .await?;

        let range = response
            .headers()
            .get(CONTENT_RANGE)
            .and_then(|value| value.to_str().ok())
            .ok_or_else(|| SupabaseError::Api {
                status: response.status().as_u16(),
                message: "Missing Content-Range header on count request".to_string(),
            })?;

        parse_content_range_total(range).ok_or_else(|| SupabaseError::Api {
            status: response.status().as_u16(),
            message: format!("Unparseable Content-Range: {}", range),
        })
    }
}

fn prefer_header(prefer: Option<&'static str>) -> Option<HeaderMap> {
    prefer.map(|value| {
        let mut headers = HeaderMap::new();
        headers.insert("Prefer", HeaderValue::from_static(value));
        headers
    })
}

/// Total from a PostgREST `Content-Range` value such as `0-24/57` or `*/0`.
pub fn parse_content_range_total(range: &str) -> Option<u64> {
    let (_, total) = range.split_once('/')?;
    total.trim().parse().ok()
}
