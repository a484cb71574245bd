use std::fs;
use std::io::{self, IsTerminal};
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{bail, Context, Result};
use grade_watch_engine::{CheckSettings, PollSettings};
use serde::{Deserialize, Serialize};
use watch_logging::watch_info;

use super::cli::{Cli, Command};
use super::logging::LogDestination;

const DEFAULT_BACKEND_URL: &str = "http://localhost:8000";
const DEFAULT_SESSION: &str = "default";

/// Settings read from `grade_watch.ron`; every field is optional in the file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub backend_url: String,
    #[serde(with = "humantime_serde")]
    pub poll_interval: Duration,
    #[serde(with = "humantime_serde")]
    pub connect_timeout: Duration,
    #[serde(with = "humantime_serde")]
    pub request_timeout: Duration,
    #[serde(with = "humantime_serde")]
    pub max_age: Option<Duration>,
    pub state_dir: PathBuf,
    pub session: String,
    /// Wait for Enter after each completion notice. Unset means: only when
    /// stdin is a terminal.
    pub acknowledge: Option<bool>,
    pub log: LogDestination,
    pub verbose: bool,
}

impl Default for AppConfig {
    fn default() -> Self {
        let poll = PollSettings::default();
        let check = CheckSettings::default();
        Self {
            backend_url: DEFAULT_BACKEND_URL.to_string(),
            poll_interval: poll.interval,
            connect_timeout: check.connect_timeout,
            request_timeout: check.request_timeout,
            max_age: poll.max_age,
            state_dir: PathBuf::from(".grade_watch"),
            session: DEFAULT_SESSION.to_string(),
            acknowledge: None,
            log: LogDestination::default(),
            verbose: false,
        }
    }
}

impl AppConfig {
    /// Reads the config file; a missing file yields the defaults.
    pub fn load(path: &Path) -> Result<Self> {
        let content = match fs::read_to_string(path) {
            Ok(text) => text,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                return Ok(Self::default());
            }
            Err(err) => {
                return Err(err).with_context(|| format!("reading config {}", path.display()))
            }
        };
        Self::parse(&content).with_context(|| format!("parsing config {}", path.display()))
    }

    pub fn parse(content: &str) -> Result<Self> {
        let config: Self = ron::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Command-line flags win over the file.
    pub fn apply_cli(mut self, cli: &Cli) -> Result<Self> {
        if let Some(backend) = &cli.backend {
            self.backend_url = backend.clone();
        }
        if let Some(session) = &cli.session {
            self.session = session.clone();
        }
        if let Some(state_dir) = &cli.state_dir {
            self.state_dir = state_dir.clone();
        }
        if let Some(log) = cli.log {
            self.log = log;
        }
        if cli.verbose {
            self.verbose = true;
        }
        if let Command::Watch {
            interval,
            max_age,
            acknowledge,
            no_acknowledge,
            ..
        } = &cli.command
        {
            if let Some(interval) = interval {
                self.poll_interval = **interval;
            }
            if let Some(max_age) = max_age {
                self.max_age = Some(**max_age);
            }
            if *acknowledge {
                self.acknowledge = Some(true);
            } else if *no_acknowledge {
                self.acknowledge = Some(false);
            }
        }
        self.validate()?;
        Ok(self)
    }

    pub fn poll_settings(&self) -> PollSettings {
        PollSettings {
            interval: self.poll_interval,
            max_age: self.max_age,
        }
    }

    pub fn check_settings(&self) -> CheckSettings {
        CheckSettings {
            connect_timeout: self.connect_timeout,
            request_timeout: self.request_timeout,
        }
    }

    pub fn acknowledge_notices(&self) -> bool {
        self.acknowledge.unwrap_or_else(|| io::stdin().is_terminal())
    }

    pub fn log_summary(&self) {
        watch_info!(
            "Backend {} | session {:?} | interval {} | max age {}",
            self.backend_url,
            self.session,
            humantime::format_duration(self.poll_interval),
            self.max_age
                .map(|age| humantime::format_duration(age).to_string())
                .unwrap_or_else(|| "none".to_string())
        );
    }

    fn validate(&self) -> Result<()> {
        if self.poll_interval.is_zero() {
            bail!("poll_interval must be greater than zero");
        }
        let session_ok = !self.session.is_empty()
            && self
                .session
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
        if !session_ok {
            bail!(
                "session name {:?} may only contain ASCII letters, digits, '-' and '_'",
                self.session
            );
        }
        Ok(())
    }
}
