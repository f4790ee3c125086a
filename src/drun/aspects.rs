use std::ffi::{OsStr, OsString};
use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::Deserialize;

use super::error::{Error, Result};
use super::host::Host;
use super::volumes::VolumeSet;

/// A group of `docker run` arguments contributed by one concern of the invocation.
pub trait ContainerAspect {
    fn name(&self) -> String;
    fn run_args(&self, _: &dyn Host) -> Result<Vec<OsString>> {
        Ok(Vec::new())
    }
}

/// `<a>:<b>[:<mode>]` without going through UTF-8.
fn volume_spec(host_path: &OsStr, container_path: &OsStr, mode: Option<&str>) -> OsString {
    let mut spec = OsString::from(host_path);
    spec.push(":");
    spec.push(container_path);
    if let Some(mode) = mode {
        spec.push(":");
        spec.push(mode);
    }
    spec
}

fn env_arg<V: AsRef<OsStr>>(key: &str, value: V) -> Vec<OsString> {
    let mut pair = OsString::from(key);
    pair.push("=");
    pair.push(value);
    vec!["--env".into(), pair]
}

fn forward_env(host: &dyn Host, key: &str) -> Vec<OsString> {
    match host.var(key) {
        Some(v) => env_arg(key, v),
        None => Vec::new(),
    }
}

#[derive(Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(transparent)]
pub struct Network(pub String);

impl Default for Network {
    fn default() -> Self {
        Network("host".to_string())
    }
}

impl ContainerAspect for Network {
    fn name(&self) -> String {
        String::from("Network")
    }
    fn run_args(&self, _: &dyn Host) -> Result<Vec<OsString>> {
        Ok(vec!["--network".into(), self.0.clone().into()])
    }
}

/// Maps the container process onto the invoking user so files written to mounts keep host
/// ownership.
#[derive(Clone, Debug)]
pub struct CurrentUser {
    pub uid: u32,
    pub gid: u32,
}

impl ContainerAspect for CurrentUser {
    fn name(&self) -> String {
        format!("User: {}:{}", self.uid, self.gid)
    }
    fn run_args(&self, _: &dyn Host) -> Result<Vec<OsString>> {
        Ok(vec![
            "--user".into(),
            format!("{}:{}", self.uid, self.gid).into(),
        ])
    }
}

#[derive(Clone, Debug)]
pub struct Workdir(pub PathBuf);

impl ContainerAspect for Workdir {
    fn name(&self) -> String {
        String::from("Workdir")
    }
    fn run_args(&self, _: &dyn Host) -> Result<Vec<OsString>> {
        Ok(vec!["--workdir".into(), self.0.clone().into_os_string()])
    }
}

/// Debian's default bashrc shows `debian_chroot` in the prompt.
#[derive(Clone, Debug)]
pub struct ChrootLabel(pub String);

impl ContainerAspect for ChrootLabel {
    fn name(&self) -> String {
        String::from("ChrootLabel")
    }
    fn run_args(&self, _: &dyn Host) -> Result<Vec<OsString>> {
        Ok(env_arg("debian_chroot", &self.0))
    }
}

#[derive(Clone, Debug)]
pub struct Hostname {}

impl ContainerAspect for Hostname {
    fn name(&self) -> String {
        String::from("Hostname")
    }
    fn run_args(&self, host: &dyn Host) -> Result<Vec<OsString>> {
        Ok(match host.hostname() {
            Some(h) => vec!["--hostname".into(), h.into()],
            None => Vec::new(),
        })
    }
}

/// An explicitly chosen IANA timezone, passed to the container as `TZ`.
#[derive(Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(try_from = "String")]
pub struct Timezone(pub String);

impl ContainerAspect for Timezone {
    fn name(&self) -> String {
        "Timezone".to_string()
    }
    fn run_args(&self, _: &dyn Host) -> Result<Vec<OsString>> {
        Ok(env_arg("TZ", &self.0))
    }
}

impl TryFrom<&String> for Timezone {
    type Error = Error;
    fn try_from(input: &String) -> Result<Self> {
        let tz = input.to_string();
        match chrono_tz::Tz::from_str(input) {
            Ok(_) => Ok(Timezone(tz)),
            Err(_) => Err(Error::InvalidTimezone(tz)),
        }
    }
}

impl TryFrom<String> for Timezone {
    type Error = Error;
    fn try_from(input: String) -> Result<Self> {
        Timezone::try_from(&input)
    }
}

const LOCALTIME: &str = "/etc/localtime";

/// Shares the host's zone: bind-mounts `/etc/localtime` when it exists, otherwise forwards `TZ`
/// (falling back to UTC).
#[derive(Clone, Debug)]
pub struct HostTimezone {}

impl ContainerAspect for HostTimezone {
    fn name(&self) -> String {
        "HostTimezone".to_string()
    }
    fn run_args(&self, host: &dyn Host) -> Result<Vec<OsString>> {
        if host.exists(Path::new(LOCALTIME)) {
            let localtime = OsStr::new(LOCALTIME);
            return Ok(vec![
                "--volume".into(),
                volume_spec(localtime, localtime, Some("ro")),
            ]);
        }
        let zone = host
            .var("TZ")
            .filter(|tz| !tz.is_empty())
            .unwrap_or_else(|| OsString::from("UTC"));
        Ok(env_arg("TZ", zone))
    }
}

/// Forwards whichever of `LANG`, `LANGUAGE` and `LC_ALL` the host has set.
#[derive(Clone, Debug)]
pub struct Locale {}

impl ContainerAspect for Locale {
    fn name(&self) -> String {
        "Locale".to_string()
    }
    fn run_args(&self, host: &dyn Host) -> Result<Vec<OsString>> {
        Ok(["LANG", "LANGUAGE", "LC_ALL"]
            .iter()
            .flat_map(|key| forward_env(host, key))
            .collect())
    }
}

const CONTAINER_XAUTHORITY: &str = "/root/.Xauthority";

#[derive(Clone, Debug)]
pub struct X11 {
    pub home: PathBuf,
}

impl X11 {
    fn xauthority(&self, host: &dyn Host) -> PathBuf {
        match host.var("XAUTHORITY") {
            Some(p) => PathBuf::from(p),
            None => self.home.join(".Xauthority"),
        }
    }
}

impl ContainerAspect for X11 {
    fn name(&self) -> String {
        String::from("X11")
    }
    fn run_args(&self, host: &dyn Host) -> Result<Vec<OsString>> {
        let display = match host.var("DISPLAY") {
            Some(d) => d,
            None => return Ok(Vec::new()),
        };

        let mut args = env_arg("DISPLAY", display);
        let xauthority = self.xauthority(host);
        if host.exists(&xauthority) {
            args.push("--volume".into());
            args.push(volume_spec(
                xauthority.as_os_str(),
                OsStr::new(CONTAINER_XAUTHORITY),
                Some("ro"),
            ));
            args.extend(env_arg("XAUTHORITY", CONTAINER_XAUTHORITY));
        }
        Ok(args)
    }
}

#[derive(Clone, Debug)]
pub struct TerminalType {}

impl ContainerAspect for TerminalType {
    fn name(&self) -> String {
        String::from("TerminalType")
    }
    fn run_args(&self, host: &dyn Host) -> Result<Vec<OsString>> {
        Ok(["TERM", "COLORTERM"]
            .iter()
            .flat_map(|key| forward_env(host, key))
            .collect())
    }
}

/// Allocates a pseudo-terminal when stdin is interactive and tells the container its size.
#[derive(Clone, Debug)]
pub struct Tty {}

impl ContainerAspect for Tty {
    fn name(&self) -> String {
        String::from("Tty")
    }
    fn run_args(&self, host: &dyn Host) -> Result<Vec<OsString>> {
        if !host.stdin_is_terminal() {
            return Ok(Vec::new());
        }
        let mut args: Vec<OsString> = vec!["--tty".into()];
        if let Some(size) = host.terminal_size() {
            args.extend(env_arg("COLUMNS", size.columns.to_string()));
            args.extend(env_arg("LINES", size.lines.to_string()));
        }
        Ok(args)
    }
}

/// Every derived volume mounted read-write at its own path.
#[derive(Clone, Debug)]
pub struct Volumes(pub VolumeSet);

impl ContainerAspect for Volumes {
    fn name(&self) -> String {
        String::from("Volumes")
    }
    fn run_args(&self, _: &dyn Host) -> Result<Vec<OsString>> {
        Ok(self
            .0
            .iter()
            .flat_map(|v| {
                vec![
                    "--volume".into(),
                    volume_spec(v.as_os_str(), v.as_os_str(), Some("rw")),
                ]
            })
            .collect())
    }
}

#[derive(Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(try_from = "String")]
pub struct Mount {
    pub host_path: String,
    pub container_path: String,
}

impl ContainerAspect for Mount {
    fn name(&self) -> String {
        String::from("Mount")
    }
    fn run_args(&self, _: &dyn Host) -> Result<Vec<OsString>> {
        Ok(vec![
            "--volume".into(),
            volume_spec(
                OsStr::new(&self.host_path),
                OsStr::new(&self.container_path),
                None,
            ),
        ])
    }
}

impl TryFrom<&String> for Mount {
    type Error = Error;
    fn try_from(value: &String) -> Result<Self> {
        let vs: Vec<&str> = value.split(':').collect();
        if vs.len() != 2 || vs[0].is_empty() || vs[1].is_empty() {
            return Err(Error::InvalidMount(value.to_string()));
        }
        Ok(Mount {
            host_path: vs[0].to_string(),
            container_path: vs[1].to_string(),
        })
    }
}

impl TryFrom<String> for Mount {
    type Error = Error;
    fn try_from(value: String) -> Result<Self> {
        Mount::try_from(&value)
    }
}
