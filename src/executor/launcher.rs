use std::ffi::CString;
use std::ptr;
use std::os::fd::RawFd;

use nix::errno::Errno;
use nix::fcntl::{self, OFlag};
use nix::sys::signal::{self, SigHandler, Signal};
use nix::sys::stat::Mode;
use nix::unistd::{self, ForkResult, Pid};
use tracing::warn;

use super::pipe_set::PipeSet;
use super::planner::{Stage, StageInput, StageOutput};
use super::redirect::Redirections;
use crate::config::{ArgOverflow, PipelineConfig};
use crate::error::{exec_exit_code, PipelineError, StageError};
use crate::PROGRAM_NAME;

/// Prefix of a diagnostic whose OS reason is only known in the child,
/// e.g. `"tiny-pipeline: open in.txt: "`.
fn diagnostic_prefix(template: &StageError) -> Vec<u8> {
    format!("{}: {}: ", PROGRAM_NAME, template.operation()).into_bytes()
}

/// A file a stage's stdin or stdout is redirected to, ready for `open(2)`.
#[derive(Debug)]
struct RedirectTarget {
    path: CString,
    diagnostic: Vec<u8>,
    code: i32,
}

impl RedirectTarget {
    fn new(path: &str) -> Result<Self, StageError> {
        let c_path = CString::new(path).map_err(|_| StageError::NulByte { arg: path.to_string() })?;
        let template = StageError::Redirect { path: path.to_string(), source: Errno::UnknownErrno };
        Ok(RedirectTarget {
            path: c_path,
            diagnostic: diagnostic_prefix(&template),
            code: template.exit_code(),
        })
    }
}

/// A stage that failed before it could run; its child only reports it.
#[derive(Debug)]
struct Failure {
    message: Vec<u8>,
    code: i32,
}

impl From<StageError> for Failure {
    fn from(err: StageError) -> Self {
        Failure {
            message: format!("{}: {}\n", PROGRAM_NAME, err).into_bytes(),
            code: err.exit_code(),
        }
    }
}

#[derive(Debug)]
struct Image {
    argv: Vec<CString>,
    /// Null-terminated pointers into `argv`, handed to `execvp(3)` as is.
    argv_ptrs: Vec<*const libc::c_char>,
    diagnostic: Vec<u8>,
}

impl Image {
    fn new(argv: Vec<CString>, program: &str) -> Self {
        let mut argv_ptrs: Vec<_> = argv.iter().map(|a| a.as_ptr()).collect();
        argv_ptrs.push(ptr::null());
        let template = StageError::Exec { program: program.to_string(), source: Errno::UnknownErrno };
        Image { argv, argv_ptrs, diagnostic: diagnostic_prefix(&template) }
    }
}

/// Everything a child needs, built by the parent before `fork`.
///
/// The forked child only runs async-signal-safe calls, so it must not
/// allocate: argument strings and their pointer array, paths and diagnostic
/// prefixes all live here.
#[derive(Debug)]
pub struct PreparedStage {
    pub index: usize,
    pub program: String,
    input: Option<RedirectTarget>,
    output: Option<RedirectTarget>,
    image: Result<Image, Failure>,
}

impl PreparedStage {
    pub fn new(stage: &Stage, config: &PipelineConfig) -> Self {
        let redirections = Redirections::parse(&stage.args);
        let program = redirections.args.first().cloned().unwrap_or_default();

        let mut prepared = PreparedStage {
            index: stage.index,
            program,
            input: None,
            output: None,
            image: Err(Failure::from(StageError::EmptyCommand)),
        };

        let input = redirections.input.map(RedirectTarget::new).transpose();
        let output = redirections.output.map(RedirectTarget::new).transpose();
        match (input, output) {
            (Ok(input), Ok(output)) => {
                prepared.input = input;
                prepared.output = output;
            }
            (Err(err), _) | (_, Err(err)) => {
                prepared.image = Err(err.into());
                return prepared;
            }
        }

        prepared.image = materialize(stage.index, redirections.args, config)
            .map(|argv| Image::new(argv, &prepared.program))
            .map_err(Failure::from);
        prepared
    }

    /// The stage error the child is going to report instead of running.
    pub fn failure(&self) -> Option<(&[u8], i32)> {
        self.image.as_ref().err().map(|f| (f.message.as_slice(), f.code))
    }

    pub fn argv(&self) -> Option<&[CString]> {
        self.image.as_ref().ok().map(|image| image.argv.as_slice())
    }
}

/// Builds the argument vector, applying the configured cap.
pub fn materialize(
    stage: usize,
    args: &[String],
    config: &PipelineConfig,
) -> Result<Vec<CString>, StageError> {
    if args.is_empty() {
        return Err(StageError::EmptyCommand);
    }

    let mut args = args;
    if let Some(max) = config.max_args {
        if args.len() > max {
            match config.arg_overflow {
                ArgOverflow::Truncate => {
                    warn!(stage, count = args.len(), max, "dropping arguments over the limit");
                    args = &args[..max];
                }
                ArgOverflow::Reject => {
                    return Err(StageError::TooManyArgs { count: args.len(), max });
                }
            }
        }
    }

    args.iter()
        .map(|a| CString::new(a.as_str()).map_err(|_| StageError::NulByte { arg: a.clone() }))
        .collect()
}

/// Forks the child for one stage and returns its pid to the parent
/// right away. The child never returns from here.
pub fn launch(stage: &Stage, prepared: &PreparedStage, pipes: &PipeSet) -> Result<Pid, PipelineError> {
    // Safety: the child branch only makes async-signal-safe calls before
    // exec or `_exit`.
    match unsafe { unistd::fork() } {
        Ok(ForkResult::Parent { child }) => Ok(child),
        Ok(ForkResult::Child) => run_child(stage, prepared, pipes),
        Err(source) => Err(PipelineError::Fork { stage: stage.index, source }),
    }
}

fn run_child(stage: &Stage, prepared: &PreparedStage, pipes: &PipeSet) -> ! {
    if let StageInput::Pipe(i) = stage.input {
        let _ = unistd::dup2(pipes.read_end(i), libc::STDIN_FILENO);
    }
    if let StageOutput::Pipe(i) = stage.output {
        let _ = unistd::dup2(pipes.write_end(i), libc::STDOUT_FILENO);
    }

    // The input file is opened first: if it is missing, the output file is
    // never created.
    if let Some(target) = &prepared.input {
        redirect_or_exit(target, OFlag::O_RDONLY, libc::STDIN_FILENO, pipes);
    }
    if let Some(target) = &prepared.output {
        redirect_or_exit(
            target,
            OFlag::O_WRONLY | OFlag::O_CREAT | OFlag::O_TRUNC,
            libc::STDOUT_FILENO,
            pipes,
        );
    }

    pipes.close_all_in_child();

    let image = match &prepared.image {
        Ok(image) => image,
        Err(failure) => {
            write_stderr(&failure.message);
            exit_child(failure.code);
        }
    };

    // Rust ignores SIGPIPE; the program should die when its reader goes away.
    let _ = unsafe { signal::signal(Signal::SIGPIPE, SigHandler::SigDfl) };

    // libc directly: nix would build the pointer array here, after fork.
    unsafe {
        libc::execvp(image.argv_ptrs[0], image.argv_ptrs.as_ptr());
    }
    let errno = Errno::last();
    report_errno(&image.diagnostic, errno);
    exit_child(exec_exit_code(errno));
}

fn redirect_or_exit(target: &RedirectTarget, flags: OFlag, onto: RawFd, pipes: &PipeSet) {
    if let Err(errno) = redirect(target, flags, onto) {
        report_errno(&target.diagnostic, errno);
        pipes.close_all_in_child();
        exit_child(target.code);
    }
}

fn redirect(target: &RedirectTarget, flags: OFlag, onto: RawFd) -> Result<(), Errno> {
    let fd = fcntl::open(target.path.as_c_str(), flags, Mode::from_bits_truncate(0o666))?;
    if fd != onto {
        let dup = unistd::dup2(fd, onto).map(drop);
        let _ = unistd::close(fd);
        dup?;
    }
    Ok(())
}

fn report_errno(prefix: &[u8], errno: Errno) {
    write_stderr(prefix);
    write_stderr(errno.desc().as_bytes());
    write_stderr(b"\n");
}

fn write_stderr(bytes: &[u8]) {
    // Raw write: the std stderr lock may be held by another thread of the
    // parent at fork time.
    unsafe {
        libc::write(libc::STDERR_FILENO, bytes.as_ptr().cast(), bytes.len());
    }
}

fn exit_child(code: i32) -> ! {
    unsafe { libc::_exit(code) }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::executor::planner::plan;

    fn toks(s: &str) -> Vec<String> {
        s.split_whitespace().map(String::from).collect()
    }

    fn prepare(line: &str, config: &PipelineConfig) -> PreparedStage {
        let plan = plan(&toks(line));
        PreparedStage::new(&plan.stages[0], config)
    }

    fn argv_strings(p: &PreparedStage) -> Vec<String> {
        p.argv()
            .unwrap()
            .iter()
            .map(|c| c.to_str().unwrap().to_string())
            .collect()
    }

    #[test]
    fn test_prepare_strips_redirections() {
        let p = prepare("cat -n < in.txt > out.txt", &PipelineConfig::default());
        assert_eq!(p.program, "cat");
        assert_eq!(argv_strings(&p), vec!["cat", "-n"]);
        assert_eq!(p.input.as_ref().unwrap().path.to_str().unwrap(), "in.txt");
        assert_eq!(p.output.as_ref().unwrap().path.to_str().unwrap(), "out.txt");
        assert_eq!(p.output.as_ref().unwrap().diagnostic, b"tiny-pipeline: open out.txt: ");
        assert_eq!(p.output.as_ref().unwrap().code, 1);
        assert!(p.failure().is_none());
    }

    #[test]
    fn test_argv_pointers_are_null_terminated() {
        let p = prepare("wc -l -c", &PipelineConfig::default());
        let image = p.image.as_ref().unwrap();
        assert_eq!(image.argv_ptrs.len(), 4);
        assert!(image.argv_ptrs[3].is_null());
        for (arg, ptr) in image.argv.iter().zip(&image.argv_ptrs) {
            assert_eq!(arg.as_ptr(), *ptr);
        }
        assert_eq!(image.diagnostic, b"tiny-pipeline: exec wc: ");
    }

    #[test]
    fn test_prepare_empty_stage_fails() {
        let p = prepare("", &PipelineConfig::default());
        let (message, code) = p.failure().unwrap();
        assert_eq!(message, b"tiny-pipeline: empty command\n");
        assert_eq!(code, 1);
    }

    #[test]
    fn test_redirection_only_stage_keeps_targets() {
        let p = prepare("> out.txt", &PipelineConfig::default());
        assert!(p.failure().is_some());
        assert!(p.output.is_some());
    }

    #[test]
    fn test_no_cap_by_default() {
        let line = (0..50).map(|i| i.to_string()).collect::<Vec<_>>().join(" ");
        let p = prepare(&format!("echo {}", line), &PipelineConfig::default());
        assert_eq!(p.argv().unwrap().len(), 51);
    }

    #[test]
    fn test_cap_truncates_silently() {
        let config = PipelineConfig { max_args: Some(3), ..PipelineConfig::default() };
        let p = prepare("echo a b c d e", &config);
        assert_eq!(argv_strings(&p), vec!["echo", "a", "b"]);
    }

    #[test]
    fn test_cap_can_reject() {
        let config = PipelineConfig {
            max_args: Some(3),
            arg_overflow: ArgOverflow::Reject,
            ..PipelineConfig::default()
        };
        let p = prepare("echo a b c d e", &config);
        let (message, code) = p.failure().unwrap();
        assert_eq!(code, 1);
        assert!(String::from_utf8_lossy(message).contains("too many arguments: 6 (limit 3)"));
    }

    #[test]
    fn test_nul_byte_is_a_stage_error() {
        let args = vec!["echo".to_string(), "a\0b".to_string()];
        let err = materialize(0, &args, &PipelineConfig::default()).unwrap_err();
        assert!(matches!(err, StageError::NulByte { .. }));
    }
}
