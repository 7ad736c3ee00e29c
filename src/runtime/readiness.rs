use crate::config::ReadinessSettings;
use std::net::{TcpStream, ToSocketAddrs};
use std::thread;
use std::time::Duration;

const CONNECT_TIMEOUT: Duration = Duration::from_millis(250);

/// How `start` decides a freshly spawned process is ready to take queries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Readiness {
    FixedDelay(Duration),
    TcpProbe {
        attempts: u32,
        initial_backoff: Duration,
        max_backoff: Duration,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadinessOutcome {
    Assumed,
    Ready { attempts: u32 },
    Exited,
    TimedOut { attempts: u32 },
}

impl Default for Readiness {
    fn default() -> Self {
        Readiness::from(ReadinessSettings::default())
    }
}

impl From<ReadinessSettings> for Readiness {
    fn from(settings: ReadinessSettings) -> Self {
        match settings {
            ReadinessSettings::FixedDelay { delay_ms } => {
                Readiness::FixedDelay(Duration::from_millis(delay_ms))
            }
            ReadinessSettings::TcpProbe {
                attempts,
                initial_backoff_ms,
                max_backoff_ms,
            } => Readiness::TcpProbe {
                attempts,
                initial_backoff: Duration::from_millis(initial_backoff_ms),
                max_backoff: Duration::from_millis(max_backoff_ms),
            },
        }
    }
}

impl Readiness {
    pub fn immediate() -> Self {
        Readiness::FixedDelay(Duration::ZERO)
    }

    /// Blocks the caller until the policy is satisfied. `alive` is polled between
    /// probe attempts so a process that dies early is reported without waiting out
    /// the remaining backoff.
    pub fn wait(&self, host: &str, port: u16, alive: impl Fn() -> bool) -> ReadinessOutcome {
        match *self {
            Readiness::FixedDelay(delay) => {
                if !delay.is_zero() {
                    thread::sleep(delay);
                }
                ReadinessOutcome::Assumed
            }
            Readiness::TcpProbe {
                attempts,
                initial_backoff,
                max_backoff,
            } => {
                let mut backoff = initial_backoff;
                for attempt in 1..=attempts {
                    if !alive() {
                        return ReadinessOutcome::Exited;
                    }
                    if accepts_connections(host, port) {
                        return ReadinessOutcome::Ready { attempts: attempt };
                    }
                    if attempt < attempts {
                        thread::sleep(backoff);
                        backoff = (backoff * 2).min(max_backoff);
                    }
                }
                if !alive() {
                    return ReadinessOutcome::Exited;
                }
                ReadinessOutcome::TimedOut { attempts }
            }
        }
    }
}

pub fn accepts_connections(host: &str, port: u16) -> bool {
    let Ok(addrs) = (host, port).to_socket_addrs() else {
        return false;
    };
    addrs
        .into_iter()
        .any(|addr| TcpStream::connect_timeout(&addr, CONNECT_TIMEOUT).is_ok())
}
