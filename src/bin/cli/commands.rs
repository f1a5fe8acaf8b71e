//! Command implementations for the CLI tool.

use std::io::{self, Write};
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;

use arcwalk::{
    ArchiveArgs, ArchiveInnerArgs, ArchiveSource, Error, Password, Registry, Result, Tool,
};

use crate::OutputFormat;
use crate::exit_codes::{ExitCode, error_to_exit_code};
use crate::output::{ExtractSummary, FormatRow, create_formatter};
use crate::password;
use crate::progress::PercentBar;

/// Configuration for the extract command.
pub struct ExtractConfig<'a> {
    pub registry: &'a Registry,
    pub archive_path: &'a Path,
    pub inner: &'a str,
    pub output_dir: &'a Path,
    pub password: Option<String>,
    pub format: OutputFormat,
    pub quiet: bool,
}

/// An archive resolved to its tool and physical volumes
struct Session {
    tool: Arc<dyn Tool>,
    volumes: Vec<std::path::PathBuf>,
}

impl Session {
    /// Resolves the tool and locates continuation volumes next to the first one.
    fn resolve(registry: &Registry, archive_path: &Path) -> Result<Self> {
        let name = archive_path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let resolved = registry.resolve(&name)?;

        let mut volumes = vec![archive_path.to_path_buf()];
        if let Some(parts) = &resolved.multipart {
            let dir = archive_path.parent().unwrap_or_else(|| Path::new(""));
            for index in 1.. {
                let candidate = dir.join(parts.volume_name(index));
                if !candidate.is_file() {
                    break;
                }
                volumes.push(candidate);
            }
            log::debug!("found {} volume(s) for {}", volumes.len(), name);
        }

        Ok(Self {
            tool: resolved.tool,
            volumes,
        })
    }

    /// Opens every volume from the start.
    fn open(&self) -> Result<Vec<ArchiveSource>> {
        self.volumes.iter().map(ArchiveSource::open).collect()
    }
}

/// Runs `op`, prompting once for a password if the archive asks for one
/// and none was given on the command line.
fn with_password<T>(
    archive_path: &Path,
    given: Option<String>,
    mut op: impl FnMut(Option<&Password>) -> Result<T>,
) -> Result<T> {
    let given = password::provided(given);
    match op(given.as_ref()) {
        Err(e) if e.is_password_error() && given.is_none() => {
            match password::prompt(&archive_path.display().to_string()) {
                Some(pwd) => op(Some(&pwd)),
                None => Err(e),
            }
        }
        result => result,
    }
}

fn archive_args(password: Option<&Password>) -> ArchiveArgs {
    ArchiveArgs {
        password: password.cloned(),
    }
}

fn inner_args(inner: &str, password: Option<&Password>) -> ArchiveInnerArgs {
    ArchiveInnerArgs {
        args: archive_args(password),
        inner_path: inner.to_string(),
    }
}

fn report(error: &Error) -> ExitCode {
    eprintln!("Error: {}", error);
    error_to_exit_code(error)
}

/// Meta command implementation
pub fn meta(
    registry: &Registry,
    archive_path: &Path,
    password: Option<String>,
    format: OutputFormat,
) -> ExitCode {
    let formatter = create_formatter(format);

    let result = Session::resolve(registry, archive_path).and_then(|session| {
        with_password(archive_path, password, |pwd| {
            let mut sources = session.open()?;
            session.tool.get_meta(&mut sources, &archive_args(pwd))
        })
    });

    match result {
        Ok(meta) => {
            print!("{}", formatter.format_meta(&meta));
            ExitCode::Success
        }
        Err(e) => report(&e),
    }
}

/// List command implementation
pub fn list(
    registry: &Registry,
    archive_path: &Path,
    inner: &str,
    password: Option<String>,
    format: OutputFormat,
) -> ExitCode {
    let formatter = create_formatter(format);

    let result = Session::resolve(registry, archive_path).and_then(|session| {
        if !session.tool.capabilities().list {
            return Err(Error::NotSupported {
                format: session.tool.name(),
                operation: "list",
            });
        }
        with_password(archive_path, password, |pwd| {
            let mut sources = session.open()?;
            session.tool.list(&mut sources, &inner_args(inner, pwd))
        })
    });

    match result {
        Ok(objects) => {
            print!("{}", formatter.format_list(&objects));
            ExitCode::Success
        }
        Err(e) => report(&e),
    }
}

/// Cat command implementation
pub fn cat(
    registry: &Registry,
    archive_path: &Path,
    inner: &str,
    password: Option<String>,
) -> ExitCode {
    let result = Session::resolve(registry, archive_path).and_then(|session| {
        with_password(archive_path, password, |pwd| {
            let mut sources = session.open()?;
            let mut stream = session.tool.extract(&mut sources, &inner_args(inner, pwd))?;
            let stdout = io::stdout();
            let mut out = stdout.lock();
            io::copy(&mut stream, &mut out)?;
            out.flush()?;
            Ok(())
        })
    });

    match result {
        Ok(()) => ExitCode::Success,
        Err(e) => report(&e),
    }
}

/// Extract command implementation
pub fn extract(config: &ExtractConfig<'_>) -> ExitCode {
    let formatter = create_formatter(config.format);
    let started = Instant::now();

    let session = match Session::resolve(config.registry, config.archive_path) {
        Ok(s) => s,
        Err(e) => return report(&e),
    };

    // Ask for the password before anything is written, so a retry never
    // collides with files from a failed first attempt.
    let meta = with_password(config.archive_path, config.password.clone(), |pwd| {
        let mut sources = session.open()?;
        let meta = session.tool.get_meta(&mut sources, &archive_args(pwd))?;
        Ok((meta, pwd.cloned()))
    });
    let pwd = match meta {
        Ok((meta, pwd)) if meta.encrypted && pwd.is_none() => {
            password::prompt(&config.archive_path.display().to_string())
        }
        Ok((_, pwd)) => pwd,
        Err(e) => return report(&e),
    };

    if let Err(e) = std::fs::create_dir_all(config.output_dir) {
        return report(&Error::Io(e));
    }

    let bar = PercentBar::new(
        &format!("Extracting {}", config.archive_path.display()),
        config.quiet || config.format == OutputFormat::Json,
    );
    let args = inner_args(config.inner, pwd.as_ref());
    let result = session.open().and_then(|mut sources| {
        session
            .tool
            .decompress(&mut sources, config.output_dir, &args, &mut |pct| bar.set(pct))
    });

    match result {
        Ok(()) => {
            bar.finish();
            let summary = ExtractSummary {
                archive: config.archive_path,
                inner: config.inner,
                output: config.output_dir,
                elapsed: started.elapsed(),
            };
            if !config.quiet || config.format == OutputFormat::Json {
                print!("{}", formatter.format_extract_result(&summary));
            }
            ExitCode::Success
        }
        Err(e) => {
            bar.abandon();
            report(&e)
        }
    }
}

/// Formats command implementation
pub fn formats(registry: &Registry, format: OutputFormat) -> ExitCode {
    let formatter = create_formatter(format);

    let rows: Vec<FormatRow> = registry
        .tools()
        .map(|tool| FormatRow {
            name: tool.name(),
            extensions: tool.accepted_extensions().to_vec(),
            multipart: tool
                .accepted_multipart_patterns()
                .iter()
                .map(|(first, next)| format!("{} ({})", first, next.pattern))
                .collect(),
            list: tool.capabilities().list,
        })
        .collect();

    print!("{}", formatter.format_formats(&rows));
    ExitCode::Success
}
