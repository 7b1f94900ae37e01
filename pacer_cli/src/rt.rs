//! Real-time scheduling helpers (Linux SCHED_FIFO / affinity / mlockall; mlockall elsewhere).
//!
//! Every step is best-effort: a failure is logged and the control loop runs
//! with normal scheduling.

use crate::cli::RtLock;

#[derive(Debug, Clone, Copy)]
pub struct RtOptions {
    pub prio: Option<i32>,
    pub lock: RtLock,
    pub cpu: Option<usize>,
}

#[cfg(unix)]
fn memlock_limit_hint() -> Option<String> {
    let mut rlim = std::mem::MaybeUninit::<libc::rlimit>::uninit();
    // SAFETY: getrlimit only writes into the provided struct.
    let rc = unsafe { libc::getrlimit(libc::RLIMIT_MEMLOCK, rlim.as_mut_ptr()) };
    if rc != 0 {
        return None;
    }
    // SAFETY: rc == 0 means the struct was initialised.
    let cur = unsafe { rlim.assume_init() }.rlim_cur;
    if cur == libc::RLIM_INFINITY {
        Some("memlock limit: unlimited".into())
    } else {
        Some(format!("memlock limit: {} KiB", cur / 1024))
    }
}

#[cfg(unix)]
fn mlockall(flags: libc::c_int) -> std::io::Result<()> {
    // SAFETY: plain syscall without pointers.
    let rc = unsafe { libc::mlockall(flags) };
    if rc == 0 {
        Ok(())
    } else {
        Err(std::io::Error::last_os_error())
    }
}

/// Lock process memory; `All` falls back to `Current` on EPERM / ENOMEM.
#[cfg(unix)]
fn lock_memory(lock: RtLock) -> eyre::Result<()> {
    let retryable = |e: &std::io::Error| {
        matches!(e.raw_os_error(), Some(code) if code == libc::EPERM || code == libc::ENOMEM)
    };
    let (result, label) = match lock {
        RtLock::None => return Ok(()),
        RtLock::Current => (mlockall(libc::MCL_CURRENT), "current"),
        RtLock::All => (
            mlockall(libc::MCL_CURRENT | libc::MCL_FUTURE),
            "current|future",
        ),
    };
    let Err(err) = result else {
        return Ok(());
    };
    if lock == RtLock::All && retryable(&err) && mlockall(libc::MCL_CURRENT).is_ok() {
        tracing::warn!(error = %err, "mlockall(current|future) failed; locked current pages only");
        return Ok(());
    }
    let mut msg = format!("mlockall({label}) failed: {err}");
    if retryable(&err) {
        if let Some(h) = memlock_limit_hint() {
            msg.push_str(&format!("; {h}"));
        }
        msg.push_str("; hint: needs CAP_IPC_LOCK (or root) and sufficient 'ulimit -l'");
    }
    Err(eyre::eyre!(msg))
}

#[cfg(target_os = "linux")]
fn set_fifo_priority(prio: Option<i32>) -> eyre::Result<i32> {
    // SAFETY: plain syscalls without pointers.
    let (min, max) = unsafe {
        (
            libc::sched_get_priority_min(libc::SCHED_FIFO),
            libc::sched_get_priority_max(libc::SCHED_FIFO),
        )
    };
    let (min, max) = if min < 0 || max < 0 { (1, 99) } else { (min, max) };
    let prio = prio.unwrap_or(max).clamp(min, max);
    let param = libc::sched_param {
        sched_priority: prio,
    };
    // SAFETY: `param` outlives the call.
    let rc = unsafe { libc::sched_setscheduler(0, libc::SCHED_FIFO, &param) };
    if rc != 0 {
        let err = std::io::Error::last_os_error();
        // SAFETY: no arguments.
        let euid = unsafe { libc::geteuid() };
        eyre::bail!(
            "sched_setscheduler(SCHED_FIFO, {prio}) failed: {err}; needs CAP_SYS_NICE or root (euid {euid})"
        );
    }
    Ok(prio)
}

#[cfg(target_os = "linux")]
fn pin_cpu(cpu: Option<usize>) -> eyre::Result<usize> {
    let bits = std::mem::size_of::<libc::cpu_set_t>() * 8;
    let target = cpu.unwrap_or(0);
    if target >= bits {
        eyre::bail!("requested CPU {target} exceeds cpu_set_t capacity {bits}");
    }
    // SAFETY: cpu_set_t is plain data; the CPU_* helpers only touch the set.
    unsafe {
        let mut allowed: libc::cpu_set_t = std::mem::zeroed();
        if libc::sched_getaffinity(0, std::mem::size_of::<libc::cpu_set_t>(), &mut allowed) != 0 {
            eyre::bail!("sched_getaffinity: {}", std::io::Error::last_os_error());
        }
        if !libc::CPU_ISSET(target, &allowed) {
            eyre::bail!("CPU {target} not permitted by current affinity mask");
        }
        let mut desired: libc::cpu_set_t = std::mem::zeroed();
        libc::CPU_ZERO(&mut desired);
        libc::CPU_SET(target, &mut desired);
        if libc::sched_setaffinity(0, std::mem::size_of::<libc::cpu_set_t>(), &desired) != 0 {
            eyre::bail!("sched_setaffinity: {}", std::io::Error::last_os_error());
        }
    }
    Ok(target)
}

/// Apply real-time settings once per process.
pub fn setup_rt_once(opts: RtOptions) {
    use std::sync::OnceLock;
    static RT_ONCE: OnceLock<()> = OnceLock::new();

    RT_ONCE.get_or_init(|| {
        #[cfg(unix)]
        match lock_memory(opts.lock) {
            Ok(()) => tracing::info!(lock = ?opts.lock, "rt: memory lock"),
            Err(e) => tracing::warn!(error = %e, "rt: memory lock not applied"),
        }
        #[cfg(target_os = "linux")]
        {
            match set_fifo_priority(opts.prio) {
                Ok(prio) => tracing::info!(prio, "rt: SCHED_FIFO"),
                Err(e) => tracing::warn!(error = %e, "rt: priority not applied"),
            }
            match pin_cpu(opts.cpu) {
                Ok(cpu) => tracing::info!(cpu, "rt: pinned"),
                Err(e) => tracing::warn!(error = %e, "rt: affinity not applied"),
            }
        }
        #[cfg(not(target_os = "linux"))]
        {
            let _ = (opts.prio, opts.cpu);
            tracing::warn!("rt: SCHED_FIFO and affinity are only supported on Linux");
        }
    });
}
