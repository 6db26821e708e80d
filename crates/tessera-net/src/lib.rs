#![forbid(unsafe_code)]

//! HTTP transport for tessera.
//!
//! [`HttpClient`] is the base [`Net`] implementation. Retry and timeout
//! behavior are layered on top through [`NetExt`].

mod client;
mod error;
mod retry;
mod timeout;
mod traits;
mod types;

pub use crate::{
    client::HttpClient,
    error::{NetError, NetResult},
    retry::{DefaultRetryPolicy, RetryNet},
    timeout::TimeoutNet,
    traits::{Net, NetExt},
    types::{Headers, NetOptions, RetryPolicy},
};
