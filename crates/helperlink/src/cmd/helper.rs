use std::io::{self, Read, Write};

use helperlink_frame::{FrameError, FrameReader, FrameWriter, Opcode};
use tracing::{debug, info};

use crate::cmd::HelperArgs;
use crate::exit::{frame_error, CliResult, SUCCESS};

pub fn run(args: HelperArgs) -> CliResult<i32> {
    let mut reader = FrameReader::new(io::stdin().lock());
    let mut writer = FrameWriter::new(io::stdout().lock());

    match converse(&args, &mut reader, &mut writer) {
        Ok(()) | Err(FrameError::ConnectionClosed) => Ok(SUCCESS),
        Err(err) => Err(frame_error("helper session failed", err)),
    }
}

/// Greet, ask for credentials, deliver the verdict, then echo the client's
/// lines back until the server closes the pipe.
fn converse<R: Read, W: Write>(
    args: &HelperArgs,
    reader: &mut FrameReader<R>,
    writer: &mut FrameWriter<W>,
) -> Result<(), FrameError> {
    writer.send(Opcode::Print, &args.motd)?;

    writer.send(Opcode::UserInfo, "")?;
    let userinfo = reader.read_text()?;
    writer.send(Opcode::Print, &format!("Your userinfo: {userinfo}"))?;

    writer.send(Opcode::Print, "&c0f0Type your username:")?;
    writer.send(Opcode::Input, "")?;
    let username = reader.read_text()?;

    writer.send(Opcode::Print, "&c0f0Now your password:")?;
    writer.send(Opcode::Input, "")?;
    let password = reader.read_text()?;

    if username != args.user || password != args.password {
        info!(%username, "rejecting login");
        writer.send(Opcode::Print, "Login failed")?;
        writer.send(Opcode::Login, "failure")?;
        return Ok(());
    }

    info!(%username, "accepting login");
    writer.send(Opcode::SetAuth, &username)?;
    writer.send(Opcode::Login, "success")?;
    writer.send(Opcode::Broadcast, &format!("Have no fear {username} is here!"))?;

    loop {
        let line = reader.read_text()?;
        debug!(%line, "echoing client line");
        writer.send(Opcode::Print, &line)?;
    }
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use helperlink_frame::Frame;

    use super::*;

    fn args() -> HelperArgs {
        HelperArgs {
            user: "mihawk".into(),
            password: "hunter2".into(),
            motd: "hi".into(),
        }
    }

    fn server_frames(frames: &[(Opcode, &str)]) -> Cursor<Vec<u8>> {
        let mut writer = FrameWriter::new(Vec::new());
        for (opcode, text) in frames {
            writer.send(*opcode, text).unwrap();
        }
        Cursor::new(writer.into_inner())
    }

    fn helper_frames(bytes: Vec<u8>) -> Vec<(String, String)> {
        let mut reader = FrameReader::new(Cursor::new(bytes));
        let mut out = Vec::new();
        loop {
            match reader.read_frame() {
                Ok(frame) => out.push(pair(&frame)),
                Err(FrameError::ConnectionClosed) => return out,
                Err(err) => panic!("bad helper output: {err}"),
            }
        }
    }

    fn pair(frame: &Frame) -> (String, String) {
        (frame.tag(), frame.text().into_owned())
    }

    fn session(input: &[(Opcode, &str)]) -> (Result<(), FrameError>, Vec<(String, String)>) {
        let mut reader = FrameReader::new(server_frames(input));
        let mut writer = FrameWriter::new(Vec::new());
        let result = converse(&args(), &mut reader, &mut writer);
        (result, helper_frames(writer.into_inner()))
    }

    fn owned(frames: &[(&str, &str)]) -> Vec<(String, String)> {
        frames
            .iter()
            .map(|(tag, text)| (tag.to_string(), text.to_string()))
            .collect()
    }

    #[test]
    fn accepted_login_then_echo() {
        let (result, frames) = session(&[
            (Opcode::UserInfo, "\\name\\mihawk"),
            (Opcode::ClientOutput, "mihawk"),
            (Opcode::ClientOutput, "hunter2"),
            (Opcode::ClientOutput, "hello there"),
        ]);

        assert!(matches!(result, Err(FrameError::ConnectionClosed)));
        assert_eq!(
            frames,
            owned(&[
                ("PRINT", "hi"),
                ("UINFO", ""),
                ("PRINT", "Your userinfo: \\name\\mihawk"),
                ("PRINT", "&c0f0Type your username:"),
                ("INPUT", ""),
                ("PRINT", "&c0f0Now your password:"),
                ("INPUT", ""),
                ("SAUTH", "mihawk"),
                ("LOGIN", "success"),
                ("BCAST", "Have no fear mihawk is here!"),
                ("PRINT", "hello there"),
            ])
        );
    }

    #[test]
    fn wrong_password_is_rejected() {
        let (result, frames) = session(&[
            (Opcode::UserInfo, ""),
            (Opcode::ClientOutput, "mihawk"),
            (Opcode::ClientOutput, "letmein"),
        ]);

        assert!(result.is_ok());
        assert_eq!(
            frames[frames.len() - 2..],
            owned(&[("PRINT", "Login failed"), ("LOGIN", "failure")])[..]
        );
    }

    #[test]
    fn server_hangup_before_credentials() {
        let (result, frames) = session(&[(Opcode::UserInfo, "")]);
        assert!(matches!(result, Err(FrameError::ConnectionClosed)));
        assert_eq!(frames.last().map(|f| f.0.as_str()), Some("INPUT"));
    }
}
