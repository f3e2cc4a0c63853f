//! A collection of external commands used throughout the program.

#[macro_use]
extern crate log;

pub mod luks;
pub mod mapper;
pub mod mkfs;
pub mod partition;
pub mod udev;

pub use self::{luks::*, mapper::*, mkfs::*, partition::*, udev::*};

use std::{
    ffi::OsString,
    io::{self, Write},
    process::{Command, Stdio},
};

/// A generic function for executing a variety of external commands.
pub fn exec(
    cmd: &str,
    stdin: Option<&[u8]>,
    valid_codes: Option<&'static [i32]>,
    args: &[OsString],
) -> io::Result<()> {
    info!("executing {} with {:?}", cmd, args);

    let mut child = Command::new(cmd)
        .args(args)
        .stdin(if stdin.is_some() { Stdio::piped() } else { Stdio::null() })
        .stdout(Stdio::null())
        .spawn()?;

    if let Some(stdin) = stdin {
        child.stdin.as_mut().expect("stdin not obtained").write_all(stdin)?;
    }

    let status = child.wait()?;
    let success = status.success()
        || valid_codes
            .map_or(false, |codes| status.code().map_or(false, |code| codes.contains(&code)));

    if success {
        Ok(())
    } else {
        Err(io::Error::new(
            io::ErrorKind::Other,
            format!(
                "{} failed with status: {}",
                cmd,
                match status.code() {
                    Some(code) => format!("{} ({})", code, io::Error::from_raw_os_error(code)),
                    None => "unknown".into(),
                }
            ),
        ))
    }
}

/// Runs `cmd` with `args`, feeding `stdin` and returning the captured stdout.
pub fn exec_with_output(cmd: &str, stdin: Option<&[u8]>, args: &[OsString]) -> io::Result<Vec<u8>> {
    info!("executing {} with {:?}", cmd, args);

    let mut child = Command::new(cmd)
        .args(args)
        .stdin(if stdin.is_some() { Stdio::piped() } else { Stdio::null() })
        .stdout(Stdio::piped())
        .spawn()?;

    if let Some(stdin) = stdin {
        child.stdin.as_mut().expect("stdin not obtained").write_all(stdin)?;
    }

    let output = child.wait_with_output()?;
    if output.status.success() {
        Ok(output.stdout)
    } else {
        Err(io::Error::new(
            io::ErrorKind::Other,
            format!("{} failed with status: {:?}", cmd, output.status.code()),
        ))
    }
}
