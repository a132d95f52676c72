//! Remote sink for the cluster events API

use eyre::{Context, Result};
use std::thread;
use std::time::Duration;
use ureq::Agent;
use ureq::tls::{Certificate, PemItem, RootCerts, TlsConfig};

use super::EventSink;
use crate::config::ServerSettings;
use crate::event::Event;

/// POSTs events to `{endpoint}/api/v1/namespaces/{namespace}/events`.
///
/// Transport failures and 5xx responses are retried up to `max_attempts`
/// times; any other rejection fails immediately.
pub struct HttpSink {
    agent: Agent,
    endpoint: String,
    token: Option<String>,
    max_attempts: u32,
    retry_delay: Duration,
}

impl HttpSink {
    pub fn new(server: &ServerSettings) -> Result<Self> {
        let mut tls = TlsConfig::builder();
        if let Some(pem) = &server.ca_pem {
            tls = tls.root_certs(RootCerts::new_with_certs(&parse_certificates(pem)?));
        }
        if server.insecure_skip_tls_verify {
            log::warn!("TLS certificate verification is disabled for {}", server.endpoint);
            tls = tls.disable_verification(true);
        }

        let config = Agent::config_builder()
            .timeout_global(Some(server.timeout))
            .tls_config(tls.build())
            .build();

        Ok(Self {
            agent: config.into(),
            endpoint: server.endpoint.clone(),
            token: server.token.clone(),
            max_attempts: server.max_attempts.max(1),
            retry_delay: server.retry_delay,
        })
    }

    pub fn url_for(&self, event: &Event) -> String {
        format!("{}/api/v1/namespaces/{}/events", self.endpoint, event.metadata.namespace)
    }

    fn post(&self, url: &str, body: &str) -> Result<(), ureq::Error> {
        let mut request = self.agent.post(url).header("Content-Type", "application/json");
        if let Some(token) = &self.token {
            request = request.header("Authorization", format!("Bearer {}", token));
        }
        request.send(body.as_bytes())?;
        Ok(())
    }
}

/// Every certificate in a PEM bundle; other items (keys) are skipped
fn parse_certificates(pem: &[u8]) -> Result<Vec<Certificate<'static>>> {
    let mut certs = Vec::new();
    for item in ureq::tls::parse_pem(pem) {
        if let PemItem::Certificate(cert) = item.context("Failed to parse CA bundle")? {
            certs.push(cert.to_owned());
        }
    }
    if certs.is_empty() {
        eyre::bail!("CA bundle contains no certificates");
    }
    Ok(certs)
}

fn is_retryable(err: &ureq::Error) -> bool {
    match err {
        ureq::Error::StatusCode(code) => *code >= 500,
        _ => true,
    }
}

impl EventSink for HttpSink {
    fn name(&self) -> &str {
        "http"
    }

    fn write(&self, event: &Event) -> Result<()> {
        let url = self.url_for(event);
        let body = serde_json::to_string(event).context("Failed to serialize event")?;

        let mut attempt = 1;
        loop {
            match self.post(&url, &body) {
                Ok(()) => {
                    log::debug!("Posted event {} to {}", event.metadata.name, url);
                    return Ok(());
                }
                Err(e) if attempt < self.max_attempts && is_retryable(&e) => {
                    log::debug!(
                        "Attempt {}/{} to post event {} failed: {}",
                        attempt,
                        self.max_attempts,
                        event.metadata.name,
                        e
                    );
                    attempt += 1;
                    thread::sleep(self.retry_delay);
                }
                Err(e) => {
                    return Err(e).with_context(|| {
                        format!("Failed to post event {} after {} attempt(s)", event.metadata.name, attempt)
                    });
                }
            }
        }
    }
}
