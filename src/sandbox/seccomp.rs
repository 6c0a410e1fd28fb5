//! Seccomp syscall filtering.
//!
//! Translates pledge-style promises into a deny list. Syscalls that belong to
//! none of the supported categories are always denied with `EPERM`:
//! - networking, exec and process creation (threads are still allowed)
//! - signals to other processes and terminal input injection
//! - ptrace and cross-process memory access
//! - mounts, namespaces and chroot
//! - uid/gid/capability changes and file attribute changes
//! - kernel administration and io_uring
//!
//! Path reads are governed by Landlock, not by this filter.

use std::collections::BTreeMap;
use std::io;

use seccompiler::{
    BpfProgram, SeccompAction, SeccompCmpArgLen, SeccompCmpOp, SeccompCondition, SeccompFilter,
    SeccompRule, TargetArch,
};
use tracing::debug;

use super::{Promise, Promises};
use crate::error::{Result, SqliteUnsafeError};

type RuleMap = BTreeMap<i64, Vec<SeccompRule>>;

fn filter_err(e: impl std::fmt::Display) -> SqliteUnsafeError {
    SqliteUnsafeError::restriction("seccomp", io::Error::other(e.to_string()))
}

fn target_arch() -> Result<TargetArch> {
    if cfg!(target_arch = "x86_64") {
        Ok(TargetArch::x86_64)
    } else if cfg!(target_arch = "aarch64") {
        Ok(TargetArch::aarch64)
    } else {
        Err(SqliteUnsafeError::restriction_msg(
            "seccomp",
            "unsupported architecture for seccomp filter",
        ))
    }
}

const ALWAYS_DENIED: &[i64] = &[
    // network
    libc::SYS_socket,
    libc::SYS_socketpair,
    libc::SYS_connect,
    libc::SYS_accept,
    libc::SYS_accept4,
    libc::SYS_bind,
    libc::SYS_listen,
    libc::SYS_getpeername,
    libc::SYS_getsockname,
    libc::SYS_getsockopt,
    libc::SYS_setsockopt,
    libc::SYS_shutdown,
    libc::SYS_sendmmsg,
    libc::SYS_recvmmsg,
    // signals by thread id
    libc::SYS_tkill,
    libc::SYS_rt_sigqueueinfo,
    libc::SYS_rt_tgsigqueueinfo,
    libc::SYS_pidfd_send_signal,
    libc::SYS_pidfd_open,
    // exec
    libc::SYS_execve,
    libc::SYS_execveat,
    // debugging
    libc::SYS_ptrace,
    libc::SYS_process_vm_readv,
    libc::SYS_process_vm_writev,
    // mounts and namespaces
    libc::SYS_mount,
    libc::SYS_umount2,
    libc::SYS_pivot_root,
    libc::SYS_chroot,
    libc::SYS_unshare,
    libc::SYS_setns,
    // credentials
    libc::SYS_setuid,
    libc::SYS_setgid,
    libc::SYS_setreuid,
    libc::SYS_setregid,
    libc::SYS_setresuid,
    libc::SYS_setresgid,
    libc::SYS_setgroups,
    libc::SYS_setfsuid,
    libc::SYS_setfsgid,
    libc::SYS_capset,
    // file attributes
    libc::SYS_fchmod,
    libc::SYS_fchmodat,
    libc::SYS_fchown,
    libc::SYS_fchownat,
    // kernel administration
    libc::SYS_reboot,
    libc::SYS_kexec_load,
    libc::SYS_init_module,
    libc::SYS_finit_module,
    libc::SYS_delete_module,
    libc::SYS_swapon,
    libc::SYS_swapoff,
    libc::SYS_settimeofday,
    libc::SYS_clock_settime,
    libc::SYS_adjtimex,
    libc::SYS_sethostname,
    libc::SYS_setdomainname,
    libc::SYS_acct,
    libc::SYS_bpf,
    libc::SYS_perf_event_open,
    libc::SYS_keyctl,
    libc::SYS_add_key,
    libc::SYS_request_key,
    libc::SYS_userfaultfd,
    libc::SYS_io_uring_setup,
    libc::SYS_io_uring_enter,
    libc::SYS_io_uring_register,
];

#[cfg(target_arch = "x86_64")]
const ALWAYS_DENIED_LEGACY: &[i64] = &[
    libc::SYS_fork,
    libc::SYS_vfork,
    libc::SYS_chmod,
    libc::SYS_chown,
    libc::SYS_lchown,
];

#[cfg(not(target_arch = "x86_64"))]
const ALWAYS_DENIED_LEGACY: &[i64] = &[];

const CPATH: &[i64] = &[
    libc::SYS_mkdirat,
    libc::SYS_unlinkat,
    libc::SYS_renameat2,
    libc::SYS_linkat,
    libc::SYS_symlinkat,
    libc::SYS_mknodat,
];

#[cfg(target_arch = "x86_64")]
const CPATH_LEGACY: &[i64] = &[
    libc::SYS_mkdir,
    libc::SYS_rmdir,
    libc::SYS_unlink,
    libc::SYS_rename,
    libc::SYS_renameat,
    libc::SYS_link,
    libc::SYS_symlink,
    libc::SYS_mknod,
    libc::SYS_creat,
];

#[cfg(not(target_arch = "x86_64"))]
const CPATH_LEGACY: &[i64] = &[];

/// Terminal ioctls that push input into or control another session.
const TTY_COMMANDS: [libc::c_ulong; 2] = [
    libc::TIOCSTI as libc::c_ulong,
    libc::TIOCLINUX as libc::c_ulong,
];

const LOCK_COMMANDS: [libc::c_int; 4] = [
    libc::F_SETLK,
    libc::F_SETLKW,
    libc::F_OFD_SETLK,
    libc::F_OFD_SETLKW,
];

/// Denies `nr` when argument `arg` equals any of `values`.
fn deny_when_eq(rules: &mut RuleMap, nr: i64, arg: u8, values: &[u64]) -> Result<()> {
    let mut conditional = Vec::with_capacity(values.len());
    for &value in values {
        let rule = SeccompRule::new(vec![SeccompCondition::new(
            arg,
            SeccompCmpArgLen::Dword,
            SeccompCmpOp::Eq,
            value,
        )
        .map_err(filter_err)?])
        .map_err(filter_err)?;
        conditional.push(rule);
    }
    rules.insert(nr, conditional);
    Ok(())
}

/// Builds the deny rules for everything outside `promises`.
///
/// An empty rule list denies the syscall unconditionally. Signals may only
/// target this process; `own_pid` is baked into the filter.
pub fn deny_rules(promises: &Promises, own_pid: u32) -> Result<RuleMap> {
    let mut rules = RuleMap::new();
    let mut deny = |nrs: &[i64]| {
        for &nr in nrs {
            rules.insert(nr, vec![]);
        }
    };

    deny(ALWAYS_DENIED);
    deny(ALWAYS_DENIED_LEGACY);

    if !promises.contains(Promise::Cpath) {
        deny(CPATH);
        deny(CPATH_LEGACY);
    }

    if !promises.contains(Promise::Wpath) {
        deny(&[libc::SYS_truncate]);
    }

    // Process clones are denied; thread clones carry CLONE_THREAD.
    let process_clone = SeccompRule::new(vec![SeccompCondition::new(
        0,
        SeccompCmpArgLen::Qword,
        SeccompCmpOp::MaskedEq(libc::CLONE_THREAD as u64),
        0,
    )
    .map_err(filter_err)?])
    .map_err(filter_err)?;
    rules.insert(libc::SYS_clone, vec![process_clone]);

    if !promises.contains(Promise::Flock) {
        rules.insert(libc::SYS_flock, vec![]);
        let commands = LOCK_COMMANDS.map(|cmd| cmd as u64);
        deny_when_eq(&mut rules, libc::SYS_fcntl, 1, &commands)?;
    }

    // kill(2) and tgkill(2) aimed anywhere but this process.
    for nr in [libc::SYS_kill, libc::SYS_tgkill] {
        let other_process = SeccompRule::new(vec![SeccompCondition::new(
            0,
            SeccompCmpArgLen::Dword,
            SeccompCmpOp::Ne,
            u64::from(own_pid),
        )
        .map_err(filter_err)?])
        .map_err(filter_err)?;
        rules.insert(nr, vec![other_process]);
    }

    // The kernel reads the ioctl command as 32 bits.
    let tty_commands = TTY_COMMANDS.map(|cmd| cmd as u64);
    deny_when_eq(&mut rules, libc::SYS_ioctl, 1, &tty_commands)?;

    Ok(rules)
}

/// Installs the syscall filter for `promises` on every thread of the calling
/// process.
///
/// `clone3` gets `ENOSYS` so thread creation falls back to `clone`, whose
/// flags the filter can inspect.
pub fn apply_syscall_filter(promises: &Promises) -> Result<()> {
    let arch = target_arch()?;

    let mut clone3 = RuleMap::new();
    clone3.insert(libc::SYS_clone3, vec![]);
    let clone3_filter = SeccompFilter::new(
        clone3,
        SeccompAction::Allow,
        SeccompAction::Errno(libc::ENOSYS as u32),
        arch,
    )
    .map_err(filter_err)?;

    let deny_filter = SeccompFilter::new(
        deny_rules(promises, std::process::id())?,
        SeccompAction::Allow,
        SeccompAction::Errno(libc::EPERM as u32),
        arch,
    )
    .map_err(filter_err)?;

    // Both programs are compiled before either is installed.
    let clone3_prog: BpfProgram = clone3_filter.try_into().map_err(filter_err)?;
    let deny_prog: BpfProgram = deny_filter.try_into().map_err(filter_err)?;

    seccompiler::apply_filter_all_threads(&clone3_prog).map_err(filter_err)?;
    seccompiler::apply_filter_all_threads(&deny_prog).map_err(filter_err)?;

    debug!(%promises, "Seccomp filter applied");
    Ok(())
}
