use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use helperlink_channel::{
    Capabilities, CapabilityResult, ChannelConfig, ChannelError, HelperChannel, Outbox, Pump,
    Status,
};
use helperlink_frame::{Opcode, HEADER_SIZE};
use tracing::{debug, info, warn};

use crate::cmd::{parse_duration, RunArgs};
use crate::exit::{channel_error, CliError, CliResult, FAILURE, INTERNAL, SUCCESS, USAGE};
use crate::output::{
    print_events, print_summary, EventRecord, Origin, OutputFormat, SessionSummary,
};

/// Console stand-in for a game server: answers helper requests from the
/// command line and records the whole conversation.
#[derive(Debug)]
pub struct ConsoleServer {
    started: Instant,
    userinfo: String,
    serverinfo: String,
    inputs: VecDeque<String>,
    events: Vec<EventRecord>,
    auth: Option<String>,
    login: Option<bool>,
}

impl ConsoleServer {
    pub fn new(userinfo: String, serverinfo: String, inputs: Vec<String>) -> Self {
        Self {
            started: Instant::now(),
            userinfo,
            serverinfo,
            inputs: inputs.into(),
            events: Vec::new(),
            auth: None,
            login: None,
        }
    }

    fn record(&mut self, from: Origin, opcode: Opcode, text: &str) {
        let elapsed_ms = u64::try_from(self.started.elapsed().as_millis()).unwrap_or(u64::MAX);
        self.events.push(EventRecord {
            seq: self.events.len(),
            elapsed_ms,
            from,
            opcode: opcode.as_str(),
            text: text.to_string(),
        });
    }

    fn reply(&mut self, outbox: &mut Outbox, opcode: Opcode, text: &str) -> CapabilityResult {
        outbox.send(opcode, text)?;
        self.record(Origin::Server, opcode, text);
        Ok(())
    }

    pub fn events(&self) -> &[EventRecord] {
        &self.events
    }

    /// The helper's login verdict, once it has sent one.
    pub fn verdict(&self) -> Option<bool> {
        self.login
    }
}

impl Capabilities for ConsoleServer {
    fn server_info(&mut self, outbox: &mut Outbox) -> CapabilityResult {
        self.record(Origin::Helper, Opcode::ServerInfo, "");
        let info = self.serverinfo.clone();
        self.reply(outbox, Opcode::ServerInfo, &info)
    }

    fn user_info(&mut self, outbox: &mut Outbox) -> CapabilityResult {
        self.record(Origin::Helper, Opcode::UserInfo, "");
        let info = self.userinfo.clone();
        self.reply(outbox, Opcode::UserInfo, &info)
    }

    fn set_auth(&mut self, _outbox: &mut Outbox, auth: &str) -> CapabilityResult {
        self.record(Origin::Helper, Opcode::SetAuth, auth);
        self.auth = Some(auth.to_string());
        Ok(())
    }

    fn print(&mut self, _outbox: &mut Outbox, message: &str) -> CapabilityResult {
        self.record(Origin::Helper, Opcode::Print, message);
        Ok(())
    }

    fn center_print(&mut self, _outbox: &mut Outbox, message: &str) -> CapabilityResult {
        self.record(Origin::Helper, Opcode::CenterPrint, message);
        Ok(())
    }

    fn broadcast(&mut self, _outbox: &mut Outbox, message: &str) -> CapabilityResult {
        self.record(Origin::Helper, Opcode::Broadcast, message);
        Ok(())
    }

    fn input(&mut self, outbox: &mut Outbox) -> CapabilityResult {
        self.record(Origin::Helper, Opcode::Input, "");
        match self.inputs.pop_front() {
            Some(line) => self.reply(outbox, Opcode::ClientOutput, &line),
            None => {
                warn!("helper asked for input but no scripted lines are left");
                Ok(())
            }
        }
    }

    fn server_command(&mut self, outbox: &mut Outbox, command: &str) -> CapabilityResult {
        self.record(Origin::Helper, Opcode::ServerCommand, command);
        self.reply(outbox, Opcode::ServerOutput, &format!("] {command}"))?;
        self.reply(outbox, Opcode::EndOfCommand, "")
    }

    fn client_command(&mut self, _outbox: &mut Outbox, command: &str) -> CapabilityResult {
        self.record(Origin::Helper, Opcode::ClientCommand, command);
        Ok(())
    }

    fn login(&mut self, _outbox: &mut Outbox, accepted: bool) -> CapabilityResult {
        self.record(
            Origin::Helper,
            Opcode::Login,
            if accepted { "success" } else { "failure" },
        );
        info!(accepted, auth = ?self.auth, "login verdict");
        self.login = Some(accepted);
        Ok(())
    }
}

#[derive(Debug)]
enum Stop {
    HelperClosed,
    LoginDecided,
    TimedOut,
    Interrupted,
    Failed(ChannelError),
}

impl Stop {
    fn as_str(&self) -> &'static str {
        match self {
            Stop::HelperClosed => "helper-closed",
            Stop::LoginDecided => "login-decided",
            Stop::TimedOut => "timed-out",
            Stop::Interrupted => "interrupted",
            Stop::Failed(_) => "failed",
        }
    }

    fn from_error(err: ChannelError) -> Self {
        if err.status() == Status::HelperClosed {
            debug!(error = %err, "helper gone");
            Stop::HelperClosed
        } else {
            Stop::Failed(err)
        }
    }
}

struct Timing {
    tick: Duration,
    timeout: Duration,
    linger: Duration,
}

pub fn run(args: RunArgs, format: OutputFormat) -> CliResult<i32> {
    let timing = Timing {
        tick: parse_duration(&args.tick)?,
        timeout: parse_duration(&args.timeout)?,
        linger: parse_duration(&args.linger)?,
    };
    if args.buffer_capacity <= HEADER_SIZE {
        return Err(CliError::new(
            USAGE,
            format!("buffer capacity must exceed {HEADER_SIZE} bytes"),
        ));
    }
    let config = ChannelConfig {
        buffer_capacity: args.buffer_capacity,
        max_text_len: args.max_text_len,
    };

    let server = ConsoleServer::new(args.userinfo, args.serverinfo, args.inputs);
    let mut channel = HelperChannel::spawn_with_config(&args.command, server, config)
        .map_err(|err| channel_error("helper launch failed", err))?;
    let pid = channel.pid();
    info!(
        ?pid,
        command = %args.command,
        capacity = channel.config().buffer_capacity,
        max_text_len = channel.config().max_text_len,
        "helper started"
    );

    let running = Arc::new(AtomicBool::new(true));
    install_ctrlc_handler(running.clone())?;

    let stop = pump(&mut channel, &running, &timing, &args.says);
    let server = channel.into_handler();
    info!(stop = stop.as_str(), "session ended");

    print_events(server.events(), format);
    print_summary(
        &SessionSummary {
            command: args.command,
            pid,
            stop: stop.as_str(),
            login: server.login,
            auth: server.auth.clone(),
            events: server.events.len(),
        },
        format,
    );

    if let Stop::Failed(err) = stop {
        return Err(channel_error("helper session failed", err));
    }
    Ok(if server.login == Some(true) {
        SUCCESS
    } else {
        FAILURE
    })
}

/// Drive the channel until the helper leaves, the verdict has lingered, the
/// timeout hits or the user interrupts.
fn pump(
    channel: &mut HelperChannel<ConsoleServer>,
    running: &AtomicBool,
    timing: &Timing,
    says: &[String],
) -> Stop {
    let deadline = Instant::now() + timing.timeout;
    let mut decided_at: Option<Instant> = None;

    loop {
        if !running.load(Ordering::SeqCst) {
            return Stop::Interrupted;
        }
        let now = Instant::now();
        if now >= deadline {
            warn!(timeout = ?timing.timeout, "helper session timed out");
            return Stop::TimedOut;
        }
        if decided_at.is_some_and(|at| now.duration_since(at) >= timing.linger) {
            return Stop::LoginDecided;
        }

        match channel.check() {
            Ok(Pump::Idle) => thread::sleep(timing.tick),
            Ok(Pump::Progress { .. }) => {}
            Err(err) => return Stop::from_error(err),
        }

        if decided_at.is_none() {
            if let Some(accepted) = channel.handler().verdict() {
                decided_at = Some(Instant::now());
                if accepted {
                    if let Err(stop) = say_lines(channel, says) {
                        return stop;
                    }
                }
            }
        }
    }
}

fn say_lines(channel: &mut HelperChannel<ConsoleServer>, says: &[String]) -> Result<(), Stop> {
    for line in says {
        match channel.send(Opcode::ClientOutput, line) {
            Ok(()) => channel
                .handler_mut()
                .record(Origin::Server, Opcode::ClientOutput, line),
            Err(err) if !err.is_fatal() => warn!(error = %err, "chat line not sent"),
            Err(err) => return Err(Stop::from_error(err)),
        }
    }
    Ok(())
}

fn install_ctrlc_handler(running: Arc<AtomicBool>) -> CliResult<()> {
    ctrlc::set_handler(move || {
        running.store(false, Ordering::SeqCst);
    })
    .map_err(|err| CliError::new(INTERNAL, format!("signal handler setup failed: {err}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn server(inputs: &[&str]) -> ConsoleServer {
        ConsoleServer::new(
            "\\name\\mihawk".into(),
            "\\hostname\\test".into(),
            inputs.iter().map(|s| s.to_string()).collect(),
        )
    }

    fn summary(server: &ConsoleServer) -> Vec<(Origin, &'static str, String)> {
        server
            .events()
            .iter()
            .map(|e| (e.from, e.opcode, e.text.clone()))
            .collect()
    }

    #[test]
    fn answers_info_requests() {
        let mut server = server(&[]);
        let mut outbox = Outbox::with_capacity(256);

        server.user_info(&mut outbox).unwrap();
        server.server_info(&mut outbox).unwrap();

        assert_eq!(
            summary(&server),
            vec![
                (Origin::Helper, "UINFO", String::new()),
                (Origin::Server, "UINFO", "\\name\\mihawk".to_string()),
                (Origin::Helper, "SINFO", String::new()),
                (Origin::Server, "SINFO", "\\hostname\\test".to_string()),
            ]
        );
        assert_eq!(outbox.pending(), 2 * 9 + 12 + 14);
    }

    #[test]
    fn input_consumes_scripted_lines_in_order() {
        let mut server = server(&["mihawk", "hunter2"]);
        let mut outbox = Outbox::with_capacity(256);

        for _ in 0..3 {
            server.input(&mut outbox).unwrap();
        }

        let replies: Vec<_> = summary(&server)
            .into_iter()
            .filter(|(from, _, _)| *from == Origin::Server)
            .map(|(_, opcode, text)| (opcode, text))
            .collect();
        assert_eq!(
            replies,
            vec![("CLOUT", "mihawk".to_string()), ("CLOUT", "hunter2".to_string())]
        );
    }

    #[test]
    fn server_command_is_acknowledged() {
        let mut server = server(&[]);
        let mut outbox = Outbox::with_capacity(256);

        server.server_command(&mut outbox, "status").unwrap();

        let opcodes: Vec<_> = summary(&server).into_iter().map(|(_, op, _)| op).collect();
        assert_eq!(opcodes, vec!["SVCMD", "SVOUT", "EOCMD"]);
    }

    #[test]
    fn full_outbox_fails_the_callback() {
        let mut server = server(&[]);
        let mut outbox = Outbox::with_capacity(16);

        assert!(server.user_info(&mut outbox).is_err());
        assert_eq!(summary(&server).len(), 1);
    }

    #[test]
    fn login_and_auth_are_tracked() {
        let mut server = server(&[]);
        let mut outbox = Outbox::with_capacity(64);

        server.set_auth(&mut outbox, "mihawk").unwrap();
        server.login(&mut outbox, true).unwrap();

        assert_eq!(server.verdict(), Some(true));
        assert_eq!(server.auth.as_deref(), Some("mihawk"));
    }

    #[test]
    fn helper_closed_is_a_normal_stop() {
        assert!(matches!(
            Stop::from_error(ChannelError::HelperClosed),
            Stop::HelperClosed
        ));
        assert!(matches!(
            Stop::from_error(ChannelError::Overflow { capacity: 8 }),
            Stop::Failed(_)
        ));
    }
}
