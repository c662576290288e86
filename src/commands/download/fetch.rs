use std::thread;

use anyhow::{Context, Result};
use reqwest::blocking::Client;
use tracing::{debug, warn};

use crate::settings::NetworkSettings;

const PDF_MAGIC: &[u8] = b"%PDF";

#[derive(Debug, Clone)]
pub struct FetchResponse {
    pub status: u16,
    pub body: Vec<u8>,
}

pub trait PdfSource {
    fn get(&self, url: &str) -> Result<FetchResponse>;
}

pub struct HttpSource {
    client: Client,
}

impl HttpSource {
    pub fn new(network: &NetworkSettings) -> Result<Self> {
        let client = Client::builder()
            .timeout(network.timeout)
            .user_agent(concat!("cruscotto/", env!("CARGO_PKG_VERSION")))
            .build()
            .context("failed to build http client")?;
        Ok(Self { client })
    }
}

impl PdfSource for HttpSource {
    fn get(&self, url: &str) -> Result<FetchResponse> {
        let response = self
            .client
            .get(url)
            .send()
            .with_context(|| format!("request failed: {url}"))?;
        let status = response.status().as_u16();
        let body = response
            .bytes()
            .with_context(|| format!("failed to read response body: {url}"))?
            .to_vec();
        Ok(FetchResponse { status, body })
    }
}

#[derive(Debug)]
pub enum Attempt {
    Fetched(Vec<u8>),
    Missing(String),
    Failed(String),
}

pub fn fetch_pdf(source: &dyn PdfSource, network: &NetworkSettings, url: &str) -> Attempt {
    let mut last_error = String::new();

    for attempt in 1..=network.max_retries {
        match source.get(url) {
            Ok(response) if (200..300).contains(&response.status) => {
                if !response.body.starts_with(PDF_MAGIC) {
                    return Attempt::Failed(format!("{url}: response is not a PDF"));
                }
                debug!(url, bytes = response.body.len(), "fetched report");
                return Attempt::Fetched(response.body);
            }
            Ok(response) if (400..500).contains(&response.status) => {
                return Attempt::Missing(format!("{url}: HTTP {}", response.status));
            }
            Ok(response) => {
                last_error = format!("{url}: HTTP {}", response.status);
            }
            Err(err) => {
                last_error = format!("{err:#}");
            }
        }

        warn!(url, attempt, error = %last_error, "download attempt failed");
        if attempt < network.max_retries {
            thread::sleep(network.retry_pause);
        }
    }

    Attempt::Failed(last_error)
}
