use std::os::fd::{AsRawFd, OwnedFd, RawFd};

use nix::unistd;

use crate::error::PipelineError;

/// Every pipe of one pipeline, created up front by the parent.
///
/// Dropping the set closes all of the parent's descriptors. Children get a
/// copy of the whole set at fork time and must call
/// [`PipeSet::close_all_in_child`] once their own endpoints are bound.
#[derive(Debug)]
pub struct PipeSet {
    pipes: Vec<(OwnedFd, OwnedFd)>,
}

impl PipeSet {
    /// Creates `count` close-on-exec pipes. On failure the pipes created so
    /// far are closed before the error is returned.
    pub fn allocate(count: usize) -> Result<Self, PipelineError> {
        let mut pipes = Vec::with_capacity(count);
        for _ in 0..count {
            let pair = cloexec_pipe().map_err(|source| PipelineError::PipeCreation { source })?;
            pipes.push(pair);
        }
        Ok(PipeSet { pipes })
    }

    pub fn len(&self) -> usize {
        self.pipes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pipes.is_empty()
    }

    pub fn descriptor_count(&self) -> usize {
        self.pipes.len() * 2
    }

    pub fn read_end(&self, index: usize) -> RawFd {
        self.pipes[index].0.as_raw_fd()
    }

    pub fn write_end(&self, index: usize) -> RawFd {
        self.pipes[index].1.as_raw_fd()
    }

    pub fn raw_descriptors(&self) -> impl Iterator<Item = RawFd> + '_ {
        self.pipes
            .iter()
            .flat_map(|(r, w)| [r.as_raw_fd(), w.as_raw_fd()])
    }

    /// Closes every descriptor of the set without giving up ownership.
    ///
    /// Only valid in a forked child that ends in exec or `_exit`, where the
    /// owning destructors never run.
    pub(crate) fn close_all_in_child(&self) {
        for fd in self.raw_descriptors() {
            let _ = unistd::close(fd);
        }
    }
}

#[cfg(not(target_vendor = "apple"))]
fn cloexec_pipe() -> nix::Result<(OwnedFd, OwnedFd)> {
    use nix::fcntl::OFlag;
    unistd::pipe2(OFlag::O_CLOEXEC)
}

#[cfg(target_vendor = "apple")]
fn cloexec_pipe() -> nix::Result<(OwnedFd, OwnedFd)> {
    use nix::fcntl::{fcntl, FcntlArg, FdFlag};
    let (r, w) = unistd::pipe()?;
    for fd in [r.as_raw_fd(), w.as_raw_fd()] {
        fcntl(fd, FcntlArg::F_SETFD(FdFlag::FD_CLOEXEC))?;
    }
    Ok((r, w))
}
