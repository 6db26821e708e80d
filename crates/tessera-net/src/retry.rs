use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use tokio::time::sleep;
use tracing::debug;
use url::Url;

use crate::{
    error::NetError,
    traits::Net,
    types::{Headers, RetryPolicy},
};

pub struct DefaultRetryPolicy {
    policy: RetryPolicy,
}

impl DefaultRetryPolicy {
    pub fn new(policy: RetryPolicy) -> Self {
        Self { policy }
    }

    pub fn max_attempts(&self) -> u32 {
        self.policy.max_retries
    }

    pub fn should_retry(&self, error: &NetError, attempt: u32) -> bool {
        if attempt >= self.policy.max_retries {
            return false;
        }

        error.is_retryable()
    }

    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        self.policy.delay_for_attempt(attempt)
    }
}

/// Retry decorator for Net implementations
pub struct RetryNet<N, P> {
    inner: N,
    retry_policy: P,
}

impl<N: Net> RetryNet<N, DefaultRetryPolicy> {
    pub fn new(inner: N, retry_policy: DefaultRetryPolicy) -> Self {
        Self {
            inner,
            retry_policy,
        }
    }
}

#[async_trait]
impl<N: Net> Net for RetryNet<N, DefaultRetryPolicy> {
    async fn get_bytes(&self, url: Url, headers: Option<Headers>) -> Result<Bytes, NetError> {
        let mut attempt = 0;

        loop {
            match self.inner.get_bytes(url.clone(), headers.clone()).await {
                Ok(bytes) => return Ok(bytes),
                Err(error) => {
                    if !self.retry_policy.should_retry(&error, attempt) {
                        if attempt == 0 || !error.is_retryable() {
                            return Err(error);
                        }
                        return Err(NetError::RetryExhausted {
                            max_retries: self.retry_policy.max_attempts(),
                            source: Box::new(error),
                        });
                    }

                    attempt += 1;
                    let delay = self.retry_policy.delay_for_attempt(attempt);
                    debug!(%url, attempt, ?delay, %error, "retrying request");
                    sleep(delay).await;
                }
            }
        }
    }
}
