//! Access to a site's git history. Repository discovery goes through
//! `git2`; history queries shell out to the `git` executable.

use log::{debug, warn};
use std::ffi::{OsStr, OsString};
use std::fmt;
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use std::process::{Child, Command, ExitStatus, Stdio};
use std::thread;
use std::time::{Duration, Instant};

/// How long a single `git` invocation may run before it is killed.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

const POLL_INTERVAL: Duration = Duration::from_millis(10);

/// Runs `git` subcommands against a working tree.
#[derive(Clone, Debug)]
pub struct GitCommand {
    program: PathBuf,
    workdir: PathBuf,
    timeout: Duration,
}

impl GitCommand {
    /// Creates a handle running `git` in `workdir`.
    pub fn new<P: Into<PathBuf>>(workdir: P) -> GitCommand {
        GitCommand {
            program: PathBuf::from("git"),
            workdir: workdir.into(),
            timeout: DEFAULT_TIMEOUT,
        }
    }

    /// Uses `program` instead of the `git` found on `PATH`.
    pub fn with_program<P: Into<PathBuf>>(mut self, program: P) -> GitCommand {
        self.program = program.into();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> GitCommand {
        self.timeout = timeout;
        self
    }

    pub fn workdir(&self) -> &Path {
        &self.workdir
    }

    /// Returns the trimmed stdout of `git log -n 1` for `path`, formatted
    /// with `format`. `diff_filter` restricts the commits considered (e.g.,
    /// `AR` for additions and renames).
    pub fn log_one(
        &self,
        path: &Path,
        format: &str,
        diff_filter: Option<&str>,
    ) -> Result<String> {
        let mut args: Vec<OsString> = vec![
            "log".into(),
            "-n".into(),
            "1".into(),
            "--date=short".into(),
            format!("--format={}", format).into(),
        ];
        if let Some(diff_filter) = diff_filter {
            args.push(format!("--diff-filter={}", diff_filter).into());
        }
        args.push("--".into());
        args.push(path.as_os_str().to_owned());
        self.run(&args)
    }

    /// Runs `git` with `args` and returns its trimmed stdout. A non-zero exit
    /// status is an error.
    pub fn run<S: AsRef<OsStr>>(&self, args: &[S]) -> Result<String> {
        let mut child = Command::new(&self.program)
            .current_dir(&self.workdir)
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|err| match err.kind() {
                io::ErrorKind::NotFound => Error::NotFound(err),
                _ => Error::Io(err),
            })?;

        // Drain both pipes on their own threads so a chatty child can't block
        // on a full pipe while we wait on it.
        let stdout = spawn_reader(child.stdout.take());
        let stderr = spawn_reader(child.stderr.take());

        let status = self.wait(&mut child)?;
        let stdout = stdout.join().unwrap_or_default();
        let stderr = stderr.join().unwrap_or_default();

        if !status.success() {
            return Err(Error::Failed {
                command: self.describe(args),
                status,
                stderr: String::from_utf8_lossy(&stderr).trim().to_owned(),
            });
        }
        Ok(String::from_utf8_lossy(&stdout).trim().to_owned())
    }

    fn wait(&self, child: &mut Child) -> Result<ExitStatus> {
        let deadline = Instant::now() + self.timeout;
        loop {
            if let Some(status) = child.try_wait()? {
                return Ok(status);
            }
            if Instant::now() >= deadline {
                let _ = child.kill();
                let _ = child.wait();
                return Err(Error::Timeout(self.timeout));
            }
            thread::sleep(POLL_INTERVAL);
        }
    }

    fn describe<S: AsRef<OsStr>>(&self, args: &[S]) -> String {
        let mut command = self.program.to_string_lossy().into_owned();
        for arg in args {
            command.push(' ');
            command.push_str(&arg.as_ref().to_string_lossy());
        }
        command
    }
}

fn spawn_reader<R: Read + Send + 'static>(
    pipe: Option<R>,
) -> thread::JoinHandle<Vec<u8>> {
    thread::spawn(move || pipe.map(read_pipe).unwrap_or_default())
}

// Returns whatever was read before an error; the error is only logged.
fn read_pipe<R: Read>(mut pipe: R) -> Vec<u8> {
    let mut buf = Vec::new();
    if let Err(err) = pipe.read_to_end(&mut buf) {
        debug!("Reading git output failed after {} bytes: {}", buf.len(), err);
    }
    buf
}

/// The state of the site's repository. History lookups are only attempted
/// against a [`Repository::Valid`] handle.
#[derive(Clone, Debug)]
pub enum Repository {
    Valid(GitCommand),
    Unavailable,
}

impl Repository {
    /// Looks for a git working tree at `path` or any of its ancestors. Every
    /// failure is logged and yields [`Repository::Unavailable`]; a site build
    /// never stops because history is missing.
    pub fn probe(path: &Path) -> Repository {
        match git2::Repository::discover(path) {
            Ok(repo) => match repo.workdir() {
                Some(workdir) => {
                    let workdir = workdir
                        .canonicalize()
                        .unwrap_or_else(|_| workdir.to_owned());
                    debug!("Using git working tree at {}", workdir.display());
                    Repository::Valid(GitCommand::new(workdir))
                }
                None => {
                    warn!(
                        "Git repository at {} has no working tree; \
                         page dates will fall back to the build date",
                        repo.path().display()
                    );
                    Repository::Unavailable
                }
            },
            Err(err) if err.code() == git2::ErrorCode::NotFound => {
                warn!(
                    "Path {} is not a valid git directory; \
                     page dates will fall back to the build date. Trace: {}",
                    path.display(),
                    err
                );
                Repository::Unavailable
            }
            Err(err) => {
                warn!("Git issue: {}", err);
                Repository::Unavailable
            }
        }
    }

    pub fn git(&self) -> Option<&GitCommand> {
        match self {
            Repository::Valid(git) => Some(git),
            Repository::Unavailable => None,
        }
    }

    pub fn is_valid(&self) -> bool {
        matches!(self, Repository::Valid(_))
    }
}

/// Represents the result of a git command.
pub type Result<T> = std::result::Result<T, Error>;

/// Represents a failed git command.
#[derive(Debug)]
pub enum Error {
    /// Returned when the `git` executable can't be found.
    NotFound(io::Error),

    /// Returned when `git` ran but exited unsuccessfully.
    Failed {
        command: String,
        status: ExitStatus,
        stderr: String,
    },

    /// Returned when `git` didn't finish within the timeout and was killed.
    Timeout(Duration),

    /// Returned for other I/O errors spawning or waiting on `git`.
    Io(io::Error),
}

impl fmt::Display for Error {
    /// Implements [`fmt::Display`] for [`Error`].
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Error::NotFound(err) => write!(f, "git executable not found: {}", err),
            Error::Failed {
                command,
                status,
                stderr,
            } => write!(f, "`{}` failed with {}: {}", command, status, stderr),
            Error::Timeout(timeout) => {
                write!(f, "git did not finish within {:?}", timeout)
            }
            Error::Io(err) => err.fmt(f),
        }
    }
}

impl std::error::Error for Error {
    /// Implements [`std::error::Error`] for [`Error`].
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::NotFound(err) => Some(err),
            Error::Failed { .. } => None,
            Error::Timeout(_) => None,
            Error::Io(err) => Some(err),
        }
    }
}

impl From<io::Error> for Error {
    /// Converts [`io::Error`]s into [`Error`]. This allows us to use the `?`
    /// operator.
    fn from(err: io::Error) -> Error {
        Error::Io(err)
    }
}
