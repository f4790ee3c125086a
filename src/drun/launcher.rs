use std::ffi::OsString;
use std::io::Write;

use super::aspects::{self, ContainerAspect};
use super::cli::{self, InvocationRequest};
use super::config::Config;
use super::docker::Runner;
use super::error::Result;
use super::host::Host;
use super::volumes::{self, VolumeSet};

/// Label shown in the container's shell prompt.
const CHROOT_LABEL: &str = "drun";

/// A fully assembled `docker run` invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunSpec {
    program: String,
    args: Vec<OsString>,
}

impl RunSpec {
    /// Accumulates arguments in a fixed order: lifecycle, network, user, workdir, environment,
    /// volumes, image, command.
    pub fn assemble(request: &InvocationRequest, host: &dyn Host, config: &Config) -> Result<Self> {
        let image = request.image()?;
        let workdir = volumes::clean(&host.current_dir()?);
        let identity = host.identity()?;
        let volumes = VolumeSet::derive(host, workdir.clone(), &request.command)?;

        let timezone: Box<dyn ContainerAspect> = match &config.timezone {
            Some(tz) => Box::new(tz.clone()),
            None => Box::new(aspects::HostTimezone {}),
        };

        let mut aspects: Vec<Box<dyn ContainerAspect>> = vec![
            Box::new(config.network()),
            Box::new(aspects::CurrentUser {
                uid: identity.uid,
                gid: identity.gid,
            }),
            Box::new(aspects::Workdir(workdir)),
            Box::new(aspects::ChrootLabel(CHROOT_LABEL.to_string())),
            Box::new(aspects::Hostname {}),
            timezone,
            Box::new(aspects::Locale {}),
            Box::new(aspects::X11 {
                home: identity.home,
            }),
            Box::new(aspects::TerminalType {}),
            Box::new(aspects::Tty {}),
            Box::new(aspects::Volumes(volumes)),
        ];
        for mount in config.mounts() {
            aspects.push(Box::new(mount));
        }

        let mut args: Vec<OsString> = vec!["run".into(), "--interactive".into(), "--rm".into()];
        for aspect in &aspects {
            let aspect_args = aspect.run_args(host)?;
            log::trace!("{}: {:?}", aspect.name(), aspect_args);
            args.extend(aspect_args);
        }
        args.push(image.into());
        args.extend(request.command.iter().cloned());

        Ok(RunSpec {
            program: config.docker(),
            args,
        })
    }

    pub fn program(&self) -> &str {
        &self.program
    }

    pub fn args(&self) -> &[OsString] {
        &self.args
    }

    /// The command line as it would be typed, space-joined without quoting. Bytes that are not
    /// UTF-8 are shown as U+FFFD.
    pub fn render(&self) -> String {
        let args: Vec<_> = self.args.iter().map(|a| a.to_string_lossy()).collect();
        format!("{} {}", self.program, args.join(" "))
    }
}

pub struct Launcher<'a> {
    host: &'a dyn Host,
    runner: &'a dyn Runner,
    config: Config,
}

impl<'a> Launcher<'a> {
    pub fn new(host: &'a dyn Host, runner: &'a dyn Runner, config: Config) -> Self {
        Launcher {
            host,
            runner,
            config,
        }
    }

    /// Handles help and version requests, otherwise assembles the invocation and either prints it
    /// (dry run) or hands it to the runner.
    pub fn launch(&self, request: &InvocationRequest, out: &mut dyn Write) -> Result<()> {
        if request.help {
            writeln!(out, "{}", cli::usage())?;
            return Ok(());
        }
        if request.version {
            writeln!(out, "{}", cli::version())?;
            return Ok(());
        }

        let spec = RunSpec::assemble(request, self.host, &self.config)?;
        log::debug!("{}", spec.render());

        if request.dry {
            writeln!(out, "{}", spec.render())?;
            return Ok(());
        }

        self.runner.run(spec.program(), spec.args())
    }
}

#[cfg(test)]
mod run_spec_should {
    use std::path::PathBuf;

    use super::*;
    use crate::host::fake::FakeHost;
    use crate::error::Error;
    use crate::host::{Identity, TerminalSize};

    fn host() -> FakeHost {
        FakeHost {
            cwd: Some(PathBuf::from("/home/u/proj")),
            identity: Some(Identity {
                uid: 1000,
                gid: 100,
                home: PathBuf::from("/home/u"),
            }),
            ..FakeHost::default()
        }
    }

    fn request(image: &str, command: &[&str]) -> InvocationRequest {
        InvocationRequest {
            image: Some(image.to_string()),
            command: command.iter().map(OsString::from).collect(),
            ..InvocationRequest::default()
        }
    }

    fn position(args: &[OsString], needle: &str) -> usize {
        args.iter()
            .position(|a| a == needle)
            .unwrap_or_else(|| panic!("{} missing from {:?}", needle, args))
    }

    #[test]
    fn assemble_minimal_invocation() -> Result<()> {
        let spec = RunSpec::assemble(&request("alpine", &[]), &host(), &Config::empty())?;
        assert_eq!(
            spec.render(),
            "docker run --interactive --rm --network host --user 1000:100 \
             --workdir /home/u/proj --env debian_chroot=drun --env TZ=UTC \
             --volume /home/u/proj:/home/u/proj:rw alpine"
        );
        Ok(())
    }

    #[test]
    fn forward_host_environment_in_order() -> Result<()> {
        let host = FakeHost {
            hostname: Some("box".to_string()),
            interactive: true,
            terminal: Some(TerminalSize {
                columns: 100,
                lines: 30,
            }),
            ..host()
        }
        .with_file("/etc/localtime")
        .with_file("/home/u/.Xauthority")
        .with_var("LANG", "en_US.UTF-8")
        .with_var("LC_ALL", "C")
        .with_var("DISPLAY", ":0")
        .with_var("TERM", "xterm-256color")
        .with_var("COLORTERM", "truecolor");

        let spec = RunSpec::assemble(&request("alpine", &["sh"]), &host, &Config::empty())?;
        let args = spec.args();

        let order = [
            "--network",
            "--user",
            "--workdir",
            "debian_chroot=drun",
            "--hostname",
            "/etc/localtime:/etc/localtime:ro",
            "LANG=en_US.UTF-8",
            "LC_ALL=C",
            "DISPLAY=:0",
            "/home/u/.Xauthority:/root/.Xauthority:ro",
            "XAUTHORITY=/root/.Xauthority",
            "TERM=xterm-256color",
            "COLORTERM=truecolor",
            "--tty",
            "COLUMNS=100",
            "LINES=30",
            "/home/u/proj:/home/u/proj:rw",
            "alpine",
            "sh",
        ];
        let positions: Vec<usize> = order.iter().map(|n| position(args, n)).collect();
        let mut sorted = positions.clone();
        sorted.sort();
        assert_eq!(positions, sorted);
        assert!(!args
            .iter()
            .any(|a| a.to_string_lossy().starts_with("LANGUAGE=")));
        assert!(!args.iter().any(|a| a.to_string_lossy().starts_with("TZ=")));
        Ok(())
    }

    #[test]
    fn omit_tty_when_stdin_is_not_a_terminal() -> Result<()> {
        let host = FakeHost {
            terminal: Some(TerminalSize {
                columns: 100,
                lines: 30,
            }),
            ..host()
        };
        let spec = RunSpec::assemble(&request("alpine", &[]), &host, &Config::empty())?;
        assert!(!spec.args().iter().any(|a| a == "--tty"));
        assert!(!spec
            .args()
            .iter()
            .map(|a| a.to_string_lossy())
            .any(|a| a.starts_with("COLUMNS=") || a.starts_with("LINES=")));
        Ok(())
    }

    #[test]
    fn mount_directories_named_by_arguments() -> Result<()> {
        let host = host()
            .with_dir("/home/u/proj/src")
            .with_file("/home/u/proj/src/main.c")
            .with_dir("/data");
        let spec = RunSpec::assemble(
            &request("gcc", &["gcc", "-o", "out/a.out", "./src/main.c", "/data", "src"]),
            &host,
            &Config::empty(),
        )?;

        let volumes: Vec<&OsString> = spec
            .args()
            .iter()
            .zip(spec.args().iter().skip(1))
            .filter(|(flag, value)| {
                *flag == "--volume" && value.to_string_lossy().ends_with(":rw")
            })
            .map(|(_, value)| value)
            .collect();
        assert_eq!(
            volumes,
            vec![
                "/home/u/proj:/home/u/proj:rw",
                "/home/u/proj/src:/home/u/proj/src:rw",
                "/data:/data:rw",
                "/home/u/proj/src:/home/u/proj/src:rw",
            ]
        );
        assert!(spec
            .render()
            .ends_with("gcc gcc -o out/a.out ./src/main.c /data src"));
        Ok(())
    }

    #[test]
    fn apply_configuration() -> Result<()> {
        let config = Config {
            mounts: Some(vec![aspects::Mount {
                host_path: "/srv/cache".to_string(),
                container_path: "/cache".to_string(),
            }]),
            timezone: Some(aspects::Timezone("Europe/Oslo".to_string())),
            network: Some(aspects::Network("bridge".to_string())),
            docker: Some("podman".to_string()),
        };
        let host = host().with_file("/etc/localtime");
        let spec = RunSpec::assemble(&request("alpine", &[]), &host, &config)?;

        assert_eq!(spec.program(), "podman");
        let args = spec.args();
        assert_eq!(args[position(args, "--network") + 1], "bridge");
        assert!(args.iter().any(|a| a == "TZ=Europe/Oslo"));
        assert!(!args.iter().any(|a| a == "/etc/localtime:/etc/localtime:ro"));
        assert!(position(args, "/srv/cache:/cache") < position(args, "alpine"));
        assert!(
            position(args, "/home/u/proj:/home/u/proj:rw") < position(args, "/srv/cache:/cache")
        );
        Ok(())
    }

    #[test]
    fn carry_non_utf8_arguments_into_command_and_volumes() -> Result<()> {
        use std::os::unix::ffi::OsStringExt;

        let raw = OsString::from_vec(b"d\xe9p/out.o".to_vec());
        let dir = PathBuf::from(OsString::from_vec(b"/home/u/proj/d\xe9p".to_vec()));
        let host = host().with_dir(dir.clone());
        let req = cli::parse(vec![
            OsString::from("drun"),
            OsString::from("alpine"),
            OsString::from("touch"),
            raw.clone(),
        ])?;
        let spec = RunSpec::assemble(&req, &host, &Config::empty())?;

        let mut volume = dir.clone().into_os_string();
        volume.push(":");
        volume.push(&dir);
        volume.push(":rw");
        let args = spec.args();
        assert!(args.contains(&volume));
        assert_eq!(args.last(), Some(&raw));
        assert_eq!(args[args.len() - 2], "touch");
        Ok(())
    }

    #[test]
    fn fail_without_image() {
        let req = InvocationRequest::default();
        assert!(matches!(
            RunSpec::assemble(&req, &host(), &Config::empty()),
            Err(Error::MissingImage)
        ));
    }

    #[test]
    fn fail_without_workdir_or_user() {
        let no_cwd = FakeHost {
            cwd: None,
            ..host()
        };
        assert!(matches!(
            RunSpec::assemble(&request("alpine", &[]), &no_cwd, &Config::empty()),
            Err(Error::MissingWorkdir(_))
        ));

        let no_user = FakeHost {
            identity: None,
            ..host()
        };
        assert!(matches!(
            RunSpec::assemble(&request("alpine", &[]), &no_user, &Config::empty()),
            Err(Error::MissingUser(_))
        ));
    }
}
