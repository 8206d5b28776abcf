use serde::Serialize;
use std::process::{Command, Stdio};
use std::thread;
use std::time::{Duration, Instant};
use tracing::{debug, info};

use crate::error::{Error, Result};
use crate::models::config::{NotifierConfig, NotifierKind};
use crate::models::target::DeliveryTarget;

/// One reminder as handed to a delivery channel.
#[derive(Debug, Clone, Serialize)]
pub struct Reminder<'a> {
    pub token: &'a str,
    pub title: &'a str,
    pub body: &'a str,
    /// The dose event id, so the receiving client can deep-link back to it.
    pub correlation_id: &'a str,
}

/// Outbound delivery of reminders.
///
/// An `Err` means "not delivered this cycle"; the dose stays pending and the
/// next poll retries it while it is still inside the lookback window.
pub trait Notifier {
    fn send(
        &self,
        target: &DeliveryTarget,
        title: &str,
        body: &str,
        correlation_id: &str,
    ) -> Result<()>;
}

/// Writes reminders to the log. Useful for local runs and dry-runs.
#[derive(Debug, Default)]
pub struct LogNotifier;

impl Notifier for LogNotifier {
    fn send(
        &self,
        target: &DeliveryTarget,
        title: &str,
        body: &str,
        correlation_id: &str,
    ) -> Result<()> {
        info!(
            user = %target.user_id,
            dose = %correlation_id,
            "{title}: {body}"
        );
        Ok(())
    }
}

/// POSTs each reminder as JSON to a push gateway.
pub struct WebhookNotifier {
    client: reqwest::blocking::Client,
    url: String,
}

impl WebhookNotifier {
    pub fn new(url: impl Into<String>, timeout: Duration) -> Result<Self> {
        let client = reqwest::blocking::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| Error::Delivery(format!("cannot build webhook client: {e}")))?;
        Ok(Self {
            client,
            url: url.into(),
        })
    }
}

impl Notifier for WebhookNotifier {
    fn send(
        &self,
        target: &DeliveryTarget,
        title: &str,
        body: &str,
        correlation_id: &str,
    ) -> Result<()> {
        let payload = Reminder {
            token: &target.token,
            title,
            body,
            correlation_id,
        };
        // a timeout surfaces here as an error, i.e. failed for this cycle
        let resp = self
            .client
            .post(&self.url)
            .json(&payload)
            .send()
            .map_err(|e| Error::Delivery(e.to_string()))?;
        let status = resp.status();
        if !status.is_success() {
            return Err(Error::Delivery(format!("gateway answered {status}")));
        }
        Ok(())
    }
}

/// Runs a local program once per reminder: `program TOKEN TITLE BODY DOSE_ID`.
///
/// Exit status zero means delivered. A program still running after `timeout`
/// is killed and the reminder counts as failed.
pub struct CommandNotifier {
    program: String,
    timeout: Duration,
}

const CHILD_POLL: Duration = Duration::from_millis(20);

impl CommandNotifier {
    pub fn new(program: impl Into<String>, timeout: Duration) -> Self {
        Self {
            program: program.into(),
            timeout,
        }
    }
}

impl Notifier for CommandNotifier {
    fn send(
        &self,
        target: &DeliveryTarget,
        title: &str,
        body: &str,
        correlation_id: &str,
    ) -> Result<()> {
        let mut child = Command::new(&self.program)
            .args([target.token.as_str(), title, body, correlation_id])
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()
            .map_err(|e| Error::Delivery(format!("cannot run {}: {e}", self.program)))?;

        let started = Instant::now();
        loop {
            let polled = child
                .try_wait()
                .map_err(|e| Error::Delivery(e.to_string()))?;
            if let Some(status) = polled {
                if status.success() {
                    debug!(program = %self.program, dose = %correlation_id, "reminder handed off");
                    return Ok(());
                }
                return Err(Error::Delivery(format!("{} exited with {status}", self.program)));
            }
            if started.elapsed() >= self.timeout {
                let _ = child.kill();
                let _ = child.wait();
                return Err(Error::Delivery(format!(
                    "{} timed out after {:?}",
                    self.program, self.timeout
                )));
            }
            thread::sleep(CHILD_POLL);
        }
    }
}

/// Build the notifier selected in the config.
pub fn from_config(config: &NotifierConfig) -> Result<Box<dyn Notifier>> {
    match config.kind {
        NotifierKind::Log => Ok(Box::new(LogNotifier)),
        NotifierKind::Webhook => {
            let url = config
                .url
                .as_deref()
                .filter(|u| !u.trim().is_empty())
                .ok_or_else(|| Error::validation("notifier.url is required for the webhook notifier"))?;
            let notifier = WebhookNotifier::new(url, Duration::from_secs(config.timeout_secs))?;
            Ok(Box::new(notifier))
        }
        NotifierKind::Command => {
            let program = config
                .program
                .as_deref()
                .filter(|p| !p.trim().is_empty())
                .ok_or_else(|| Error::validation("notifier.program is required for the command notifier"))?;
            Ok(Box::new(CommandNotifier::new(
                program,
                Duration::from_secs(config.timeout_secs),
            )))
        }
    }
}
