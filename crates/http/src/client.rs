// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The retrying JSON client against the control service. See spec.md §4.2.

use crate::backoff::{jittered, ConnectionObserver, NoopObserver, RetryOptions, SERVICE_DOWN_PERIOD};
use crate::error::HttpError;
use reqwest::StatusCode;
use serde::{de::DeserializeOwned, Serialize};
use std::sync::Arc;
use tracing::warn;

/// A configured control-service client.
///
/// Every call carries the `project-id`, `access-key`, and `retry-count`
/// headers. Retry/backoff policy is shared across all calls but may be
/// overridden per invocation via [`RetryOptions`].
pub struct HttpClient {
    http: reqwest::Client,
    base_url: String,
    project_id: String,
    access_key: String,
    observer: Arc<dyn ConnectionObserver>,
}

impl HttpClient {
    pub fn new(base_url: impl Into<String>, project_id: impl Into<String>, access_key: impl Into<String>) -> Self {
        Self::with_observer(base_url, project_id, access_key, Arc::new(NoopObserver))
    }

    pub fn with_observer(
        base_url: impl Into<String>,
        project_id: impl Into<String>,
        access_key: impl Into<String>,
        observer: Arc<dyn ConnectionObserver>,
    ) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.into(),
            project_id: project_id.into(),
            access_key: access_key.into(),
            observer,
        }
    }

    /// POST `body` to `path` and decode the JSON response as `Resp`, per
    /// the retry contract in spec.md §4.2.
    pub async fn post<Req, Resp>(&self, path: &str, body: &Req, opts: RetryOptions) -> Result<Resp, HttpError>
    where
        Req: Serialize + ?Sized,
        Resp: DeserializeOwned,
    {
        let url = format!("{}{path}", self.base_url);
        let mut retry_count: u32 = 0;
        let mut connecting_notified = false;

        loop {
            let result = self
                .http
                .post(&url)
                .header("project-id", &self.project_id)
                .header("access-key", &self.access_key)
                .header("retry-count", retry_count.to_string())
                .json(body)
                .send()
                .await;

            match result {
                Ok(response) => {
                    let status = response.status();

                    if status.as_u16() < 400 {
                        if connecting_notified {
                            self.observer.done_connecting();
                        }
                        return response.json::<Resp>().await.map_err(HttpError::Decode);
                    }

                    if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
                        if connecting_notified {
                            self.observer.done_connecting();
                        }
                        return Err(HttpError::FatalAuth { status: status.as_u16() });
                    }

                    if status == StatusCode::BAD_GATEWAY {
                        if !connecting_notified {
                            self.observer.connecting();
                            connecting_notified = true;
                        }
                        warn!(%url, "control service reports 502, entering indefinite retry");
                        tokio::time::sleep(SERVICE_DOWN_PERIOD).await;
                        continue;
                    }

                    retry_count += 1;
                    if retry_count == 1 {
                        self.observer.connecting();
                        connecting_notified = true;
                    }
                    if retry_count > opts.max_retries {
                        self.observer.done_connecting();
                        return Err(HttpError::TransportExhausted {
                            attempts: retry_count,
                            last_error: format!("HTTP {status}"),
                        });
                    }
                    tokio::time::sleep(jittered(opts.retry_period)).await;
                }
                Err(e) => {
                    retry_count += 1;
                    if retry_count == 1 {
                        self.observer.connecting();
                        connecting_notified = true;
                    }
                    if retry_count > opts.max_retries {
                        self.observer.done_connecting();
                        return Err(HttpError::TransportExhausted {
                            attempts: retry_count,
                            last_error: e.to_string(),
                        });
                    }
                    warn!(%url, error = %e, retry_count, "control service call failed, retrying");
                    tokio::time::sleep(jittered(opts.retry_period)).await;
                }
            }
        }
    }
}

#[cfg(test)]
#[path = "client_tests.rs"]
mod tests;
