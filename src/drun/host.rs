//! Read-only view of the invoking host.
//!
//! Everything the launcher learns about its surroundings (environment variables, filesystem
//! entries, identity, terminal) goes through [`Host`], so assembly can be exercised against a
//! canned host in tests.
use std::env;
use std::ffi::OsString;
use std::fs;
use std::io::{self, IsTerminal};
use std::path::{Path, PathBuf};

use users::os::unix::UserExt;

use super::error::{Error, Result};

/// What a filesystem lookup found at a path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryKind {
    Directory,
    File,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    pub uid: u32,
    pub gid: u32,
    pub home: PathBuf,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TerminalSize {
    pub columns: u16,
    pub lines: u16,
}

pub trait Host {
    fn var(&self, key: &str) -> Option<OsString>;
    fn stat(&self, path: &Path) -> Option<EntryKind>;
    fn current_dir(&self) -> Result<PathBuf>;
    fn identity(&self) -> Result<Identity>;
    fn hostname(&self) -> Option<String>;
    fn stdin_is_terminal(&self) -> bool;
    fn terminal_size(&self) -> Option<TerminalSize>;

    fn exists(&self, path: &Path) -> bool {
        self.stat(path).is_some()
    }
}

/// The real host this process runs on.
#[derive(Default)]
pub struct SystemHost {}

impl Host for SystemHost {
    fn var(&self, key: &str) -> Option<OsString> {
        env::var_os(key)
    }

    fn stat(&self, path: &Path) -> Option<EntryKind> {
        match fs::metadata(path) {
            Ok(m) if m.is_dir() => Some(EntryKind::Directory),
            Ok(_) => Some(EntryKind::File),
            Err(_) => None,
        }
    }

    fn current_dir(&self) -> Result<PathBuf> {
        env::current_dir().map_err(Error::MissingWorkdir)
    }

    fn identity(&self) -> Result<Identity> {
        let uid = users::get_current_uid();
        let gid = users::get_current_gid();
        let home = match users::get_user_by_uid(uid) {
            Some(u) => u.home_dir().to_path_buf(),
            None => return Err(Error::MissingUser(uid.to_string())),
        };
        Ok(Identity { uid, gid, home })
    }

    fn hostname(&self) -> Option<String> {
        let mut buf = [0u8; 256];
        // SAFETY: buf is valid for writes of buf.len() bytes for the duration of the call.
        let rc = unsafe { libc::gethostname(buf.as_mut_ptr() as *mut libc::c_char, buf.len()) };
        if rc != 0 {
            return None;
        }
        let end = buf.iter().position(|b| *b == 0).unwrap_or(buf.len());
        match String::from_utf8_lossy(&buf[..end]).into_owned() {
            s if s.is_empty() => None,
            s => Some(s),
        }
    }

    fn stdin_is_terminal(&self) -> bool {
        io::stdin().is_terminal()
    }

    fn terminal_size(&self) -> Option<TerminalSize> {
        // SAFETY: winsize is plain old data; TIOCGWINSZ only writes into the struct we pass.
        let mut ws: libc::winsize = unsafe { std::mem::zeroed() };
        let rc = unsafe { libc::ioctl(libc::STDIN_FILENO, libc::TIOCGWINSZ, &mut ws) };
        if rc != 0 || ws.ws_col == 0 {
            return None;
        }
        Some(TerminalSize {
            columns: ws.ws_col,
            lines: ws.ws_row,
        })
    }
}
