//! Power command execution with retries.
//!
//! BLE links to lighthouses drop easily, so every command runs in a bounded
//! retry loop: connect, read the current power state, write the command
//! payload, disconnect. A lighthouse that already reports itself off is left
//! alone rather than written to again.

use tracing::{debug, info};

use crate::descriptor::{Generation, LighthouseDescriptor, PowerCommand};
use crate::error::Result;
use crate::transport::{Session, Transport};

/// How many attempts a command gets before giving up.
pub const DEFAULT_MAX_ATTEMPTS: u32 = 10;

/// The result of a command run. Exhaustion is an expected outcome, not an
/// error: the caller moves on to the next lighthouse either way.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandOutcome {
    Succeeded,
    Exhausted { attempts: u32 },
}

enum Attempt {
    AlreadyOff,
    Written,
}

/// Bring one lighthouse to the requested power state.
///
/// Runs up to `max_attempts` connect/read/write rounds against the
/// lighthouse's power characteristic. Transient radio failures are logged and
/// retried immediately; the connection is released on every exit path where
/// it was established.
pub async fn run_command(
    transport: &dyn Transport,
    lighthouse: &LighthouseDescriptor,
    command: PowerCommand,
    max_attempts: u32,
) -> CommandOutcome {
    let address = lighthouse.address;

    for attempt in 1..=max_attempts {
        if attempt == 1 {
            info!("{address}: attempting to switch {command}");
        } else {
            info!("{address}: retrying command, attempt #{attempt}");
        }

        let session = match transport.connect(address).await {
            Ok(session) => session,
            Err(err) => {
                debug!("{address}: connect failed: {err}");
                continue;
            }
        };

        let result = attempt_once(&*session, lighthouse.generation, command).await;

        // Always release the link; a failed disconnect must not mask the
        // outcome of the attempt itself.
        if let Err(err) = session.disconnect().await {
            debug!("{address}: disconnect failed: {err}");
        }

        match result {
            Ok(Attempt::AlreadyOff) => {
                info!("{address}: is already off, skipping");
                return CommandOutcome::Succeeded;
            }
            Ok(Attempt::Written) => {
                match (command, lighthouse.generation) {
                    (PowerCommand::On, _) => info!("{address}: switched on"),
                    (PowerCommand::Off, Generation::V1) => {
                        info!("{address}: will enter standby in one minute")
                    }
                    (PowerCommand::Off, Generation::V2) => info!("{address}: switched off"),
                }
                return CommandOutcome::Succeeded;
            }
            Err(err) => debug!("{address}: attempt failed: {err}"),
        }
    }

    info!("{address}: reached max attempts ({max_attempts}).");
    CommandOutcome::Exhausted {
        attempts: max_attempts,
    }
}

async fn attempt_once(
    session: &dyn Session,
    generation: Generation,
    command: PowerCommand,
) -> Result<Attempt> {
    let characteristic = generation.characteristic();
    let state = session.read(characteristic).await?;

    // "off" is idempotent; "on" always issues the write.
    if command == PowerCommand::Off && generation.is_off_state(&state) {
        return Ok(Attempt::AlreadyOff);
    }

    session
        .write(characteristic, generation.payload_for(command))
        .await?;

    Ok(Attempt::Written)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::{ConnectScript, MockTransport, SessionScript};

    fn lighthouse(generation: Generation) -> LighthouseDescriptor {
        LighthouseDescriptor::new("AA:BB:CC:DD:EE:FF", generation).unwrap()
    }

    #[tokio::test]
    async fn off_short_circuits_when_already_off() {
        let transport = MockTransport::granting(SessionScript {
            state: Some(vec![0x00]),
            ..SessionScript::default()
        });

        let outcome = run_command(
            &transport,
            &lighthouse(Generation::V2),
            PowerCommand::Off,
            DEFAULT_MAX_ATTEMPTS,
        )
        .await;

        assert_eq!(outcome, CommandOutcome::Succeeded);
        let log = transport.log();
        assert_eq!(log.connects, 1);
        assert_eq!(log.reads, 1);
        assert!(log.writes.is_empty(), "no write for an already-off device");
        assert_eq!(log.disconnects, 1);
    }

    #[tokio::test]
    async fn on_writes_even_when_already_on() {
        let transport = MockTransport::granting(SessionScript {
            state: Some(vec![0x01]),
            ..SessionScript::default()
        });

        let outcome = run_command(
            &transport,
            &lighthouse(Generation::V2),
            PowerCommand::On,
            DEFAULT_MAX_ATTEMPTS,
        )
        .await;

        assert_eq!(outcome, CommandOutcome::Succeeded);
        assert_eq!(transport.log().writes, vec![vec![0x01]]);
    }

    #[tokio::test]
    async fn v1_off_writes_command_frame() {
        let transport = MockTransport::granting(SessionScript {
            state: Some(vec![0x00; 20]),
            ..SessionScript::default()
        });

        let outcome = run_command(
            &transport,
            &lighthouse(Generation::V1),
            PowerCommand::Off,
            DEFAULT_MAX_ATTEMPTS,
        )
        .await;

        assert_eq!(outcome, CommandOutcome::Succeeded);
        let log = transport.log();
        assert_eq!(log.writes.len(), 1);
        assert_eq!(log.writes[0][..4], [0x12, 0x01, 0x00, 0x04]);
    }

    #[tokio::test]
    async fn connect_failures_are_retried_to_the_bound() {
        let transport = MockTransport::refusing();

        let outcome = run_command(
            &transport,
            &lighthouse(Generation::V2),
            PowerCommand::On,
            DEFAULT_MAX_ATTEMPTS,
        )
        .await;

        assert_eq!(outcome, CommandOutcome::Exhausted { attempts: 10 });
        let log = transport.log();
        assert_eq!(log.connects, 10);
        assert_eq!(log.disconnects, 0, "no session was ever established");
    }

    #[tokio::test]
    async fn read_failure_retries_and_then_succeeds() {
        let transport = MockTransport::granting(SessionScript::default()).queued(vec![
            ConnectScript::Grant(SessionScript {
                state: None,
                ..SessionScript::default()
            }),
        ]);

        let outcome = run_command(
            &transport,
            &lighthouse(Generation::V2),
            PowerCommand::On,
            DEFAULT_MAX_ATTEMPTS,
        )
        .await;

        assert_eq!(outcome, CommandOutcome::Succeeded);
        let log = transport.log();
        assert_eq!(log.connects, 2);
        // One disconnect per attempt where connect succeeded, failed read
        // included.
        assert_eq!(log.disconnects, 2);
        assert_eq!(log.writes.len(), 1);
    }

    #[tokio::test]
    async fn write_failures_exhaust_with_disconnect_per_attempt() {
        let transport = MockTransport::granting(SessionScript {
            write_ok: false,
            ..SessionScript::default()
        });

        let outcome =
            run_command(&transport, &lighthouse(Generation::V2), PowerCommand::On, 3).await;

        assert_eq!(outcome, CommandOutcome::Exhausted { attempts: 3 });
        let log = transport.log();
        assert_eq!(log.connects, 3);
        assert_eq!(log.reads, 3);
        assert_eq!(log.disconnects, 3);
        assert_eq!(log.writes.len(), 3, "every attempt tried the write");
    }

    #[tokio::test]
    async fn disconnect_failure_does_not_mask_success() {
        let transport = MockTransport::granting(SessionScript {
            disconnect_ok: false,
            ..SessionScript::default()
        });

        let outcome = run_command(
            &transport,
            &lighthouse(Generation::V2),
            PowerCommand::On,
            DEFAULT_MAX_ATTEMPTS,
        )
        .await;

        assert_eq!(outcome, CommandOutcome::Succeeded);
        assert_eq!(transport.log().connects, 1);
    }
}
