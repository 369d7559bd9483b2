// SPDX-License-Identifier: Apache-2.0

use std::collections::BTreeMap;

use nix::sys::resource::{setrlimit, Resource};
use seccompiler::{
    apply_filter, BpfProgram, SeccompAction, SeccompFilter, SeccompRule,
    TargetArch,
};

use crate::CliError;

/// Confine the process before reading untrusted profiles, for the rest of
/// its lifetime:
///  * no child processes and no core dumps,
///  * `no_new_privs` is set,
///  * only the system calls needed to read and write network
///    configuration files are permitted, others fail with `EPERM`.
///
/// Sockets, process creation and program execution are all refused.
pub(crate) fn restrict_process() -> Result<(), CliError> {
    setrlimit(Resource::RLIMIT_NPROC, 0, 0)?;
    setrlimit(Resource::RLIMIT_CORE, 0, 0)?;
    apply_filter(&build_filter()?)?;
    log::debug!(
        "Process restricted: no child processes, no core dumps, \
         {} system calls allowed",
        allowed_syscalls().len()
    );
    Ok(())
}

fn build_filter() -> Result<BpfProgram, CliError> {
    let rules: BTreeMap<i64, Vec<SeccompRule>> = allowed_syscalls()
        .into_iter()
        .map(|nr| (nr, Vec::new()))
        .collect();
    let filter = SeccompFilter::new(
        rules,
        SeccompAction::Errno(libc::EPERM as u32),
        SeccompAction::Allow,
        TargetArch::try_from(std::env::consts::ARCH)?,
    )?;
    Ok(BpfProgram::try_from(filter)?)
}

fn allowed_syscalls() -> Vec<i64> {
    #[allow(unused_mut)]
    let mut ret: Vec<libc::c_long> = vec![
        // file access
        libc::SYS_read,
        libc::SYS_write,
        libc::SYS_writev,
        libc::SYS_openat,
        libc::SYS_close,
        libc::SYS_fstat,
        libc::SYS_newfstatat,
        libc::SYS_statx,
        libc::SYS_lseek,
        libc::SYS_getdents64,
        libc::SYS_mkdirat,
        libc::SYS_renameat,
        libc::SYS_renameat2,
        libc::SYS_unlinkat,
        libc::SYS_faccessat,
        libc::SYS_readlinkat,
        libc::SYS_fsync,
        libc::SYS_fdatasync,
        libc::SYS_fcntl,
        libc::SYS_ioctl,
        // memory
        libc::SYS_mmap,
        libc::SYS_munmap,
        libc::SYS_mremap,
        libc::SYS_mprotect,
        libc::SYS_brk,
        libc::SYS_madvise,
        // runtime
        libc::SYS_futex,
        libc::SYS_getrandom,
        libc::SYS_clock_gettime,
        libc::SYS_rt_sigaction,
        libc::SYS_rt_sigprocmask,
        libc::SYS_rt_sigreturn,
        libc::SYS_sigaltstack,
        libc::SYS_exit,
        libc::SYS_exit_group,
    ];
    #[cfg(target_arch = "x86_64")]
    ret.extend_from_slice(&[
        libc::SYS_open,
        libc::SYS_stat,
        libc::SYS_lstat,
        libc::SYS_access,
        libc::SYS_mkdir,
        libc::SYS_rename,
        libc::SYS_unlink,
        libc::SYS_readlink,
    ]);
    ret.into_iter().map(i64::from).collect()
}
