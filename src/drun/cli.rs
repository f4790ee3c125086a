use std::ffi::{OsStr, OsString};
use std::os::unix::ffi::OsStrExt;

use clap::{value_parser, Arg, ArgAction, ArgMatches, Command};

use super::error::{Error, Result};

/// Boolean flags as Go's flag package spells them, and the form clap expects. Each may be given
/// with one or two dashes and an optional `=<bool>` value.
const BOOL_FLAGS: &[(&str, &str)] = &[
    ("dry", "--dry"),
    ("help", "--help"),
    ("h", "-h"),
    ("v", "-v"),
    ("verbose", "--verbose"),
];

/// The parsed intent of one invocation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InvocationRequest {
    pub image: Option<String>,
    pub command: Vec<OsString>,
    pub dry: bool,
    pub version: bool,
    pub help: bool,
    pub verbose: u8,
}

impl InvocationRequest {
    pub fn image(&self) -> Result<&str> {
        self.image.as_deref().ok_or(Error::MissingImage)
    }
}

pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

pub fn command() -> Command {
    Command::new("drun")
        .about("Run a command in a new container")
        .override_usage("drun [OPTIONS] IMAGE [COMMAND] [ARG...]")
        .disable_help_flag(true)
        .disable_version_flag(true)
        .args(cli_args())
}

pub fn usage() -> String {
    command().render_help().to_string()
}

fn cli_args() -> Vec<Arg> {
    vec![
        Arg::new("dry")
            .long("dry")
            .action(ArgAction::SetTrue)
            .help("dry run: print the docker command instead of running it"),
        Arg::new("version")
            .short('v')
            .action(ArgAction::SetTrue)
            .help("show version"),
        Arg::new("help")
            .short('h')
            .long("help")
            .action(ArgAction::SetTrue)
            .help("show help"),
        Arg::new("verbose")
            .long("verbose")
            .action(ArgAction::Count)
            .help("increase log verbosity (repeatable)"),
        Arg::new("image").value_name("IMAGE").action(ArgAction::Set),
        Arg::new("command")
            .value_name("COMMAND")
            .num_args(1..)
            .value_parser(value_parser!(OsString))
            .action(ArgAction::Append),
    ]
}

fn parse_bool(value: &str) -> Option<bool> {
    match value {
        "1" | "t" | "T" | "true" | "TRUE" | "True" => Some(true),
        "0" | "f" | "F" | "false" | "FALSE" | "False" => Some(false),
        _ => None,
    }
}

/// `Some(Some(flag))` to pass `flag` on, `Some(None)` to drop an explicit `=false`, `None` to leave
/// the argument for clap to judge.
fn rewrite_flag(arg: &str) -> Option<Option<String>> {
    let body = arg.strip_prefix("--").or_else(|| arg.strip_prefix('-'))?;
    let (name, value) = match body.split_once('=') {
        Some((n, v)) => (n, Some(v)),
        None => (body, None),
    };
    let (_, canonical) = BOOL_FLAGS.iter().find(|(n, _)| *n == name)?;
    match value.map(parse_bool) {
        None | Some(Some(true)) => Some(Some(canonical.to_string())),
        Some(Some(false)) => Some(None),
        Some(None) => None,
    }
}

fn is_flag(arg: &OsStr) -> bool {
    let bytes = arg.as_bytes();
    bytes.len() >= 2 && bytes[0] == b'-'
}

/// Rewrites Go-style flags (`-dry`, `-v=false`) to what clap accepts and fences everything from
/// the first positional argument onwards behind `--`, so nothing after the image is ever
/// interpreted as a launcher flag. Arguments are kept as raw OS strings.
pub fn normalize<I, T>(args: I) -> Vec<OsString>
where
    I: IntoIterator<Item = T>,
    T: Into<OsString>,
{
    let mut iter = args.into_iter().map(|a: T| -> OsString { a.into() });
    let mut out: Vec<OsString> = iter.next().into_iter().collect();

    let mut positional: Vec<OsString> = Vec::new();
    for arg in iter.by_ref() {
        if arg == "--" {
            break;
        }
        if !is_flag(&arg) {
            positional.push(arg);
            break;
        }
        match arg.to_str().and_then(rewrite_flag) {
            Some(Some(flag)) => out.push(OsString::from(flag)),
            Some(None) => {}
            None => out.push(arg),
        }
    }
    positional.extend(iter);

    out.push(OsString::from("--"));
    out.extend(positional);
    out
}

pub fn parse<I, T>(args: I) -> Result<InvocationRequest>
where
    I: IntoIterator<Item = T>,
    T: Into<OsString>,
{
    let matches = command().try_get_matches_from(normalize(args))?;
    Ok(InvocationRequest::from(&matches))
}

impl From<&ArgMatches> for InvocationRequest {
    fn from(matches: &ArgMatches) -> Self {
        InvocationRequest {
            image: matches.get_one::<String>("image").cloned(),
            command: matches
                .get_many::<OsString>("command")
                .map(|values| values.cloned().collect())
                .unwrap_or_default(),
            dry: matches.get_flag("dry"),
            version: matches.get_flag("version"),
            help: matches.get_flag("help"),
            verbose: matches.get_count("verbose"),
        }
    }
}
