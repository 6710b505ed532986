//! Real-time scheduling helpers (Linux SCHED_FIFO + mlockall; macOS mlockall).

use crate::cli::RtLock;

#[cfg(any(target_os = "linux", target_os = "macos"))]
fn lock_memory(lock: RtLock) -> eyre::Result<()> {
    use libc::{MCL_CURRENT, MCL_FUTURE, mlockall};

    fn call(flags: libc::c_int) -> std::io::Result<()> {
        // SAFETY: mlockall only takes flags and reports failure through errno.
        let rc = unsafe { mlockall(flags) };
        if rc != 0 {
            Err(std::io::Error::last_os_error())
        } else {
            Ok(())
        }
    }

    fn retryable(err: &std::io::Error) -> bool {
        matches!(err.raw_os_error(), Some(code) if code == libc::EPERM || code == libc::ENOMEM)
    }

    let result = match lock {
        RtLock::None => return Ok(()),
        RtLock::Current => call(MCL_CURRENT),
        RtLock::All => call(MCL_CURRENT | MCL_FUTURE),
    };
    let Err(err) = result else {
        return Ok(());
    };

    // All failed for lack of privilege or memory: settle for Current.
    if lock == RtLock::All && retryable(&err) && call(MCL_CURRENT).is_ok() {
        tracing::warn!(error = %err, "mlockall(current|future) failed; locked current pages only");
        return Ok(());
    }
    let mut msg = format!("mlockall failed: {err}");
    if retryable(&err) {
        msg.push_str("; hint: needs CAP_IPC_LOCK (or root) and sufficient 'ulimit -l'");
    }
    Err(eyre::eyre!(msg))
}

#[cfg(target_os = "linux")]
fn fifo_priority(prio: Option<i32>) -> eyre::Result<i32> {
    use libc::{SCHED_FIFO, sched_get_priority_max, sched_get_priority_min, sched_param};

    // SAFETY: plain queries with a valid policy constant.
    let (min, max) = unsafe {
        let min = sched_get_priority_min(SCHED_FIFO);
        let max = sched_get_priority_max(SCHED_FIFO);
        if min < 0 || max < 0 { (1, 99) } else { (min, max) }
    };
    let prio_val = prio.unwrap_or(max).clamp(min, max);
    let param = sched_param {
        sched_priority: prio_val,
    };
    // SAFETY: `param` outlives the call; pid 0 is the calling process.
    let rc = unsafe { libc::sched_setscheduler(0, SCHED_FIFO, &param) };
    if rc != 0 {
        let err = std::io::Error::last_os_error();
        eyre::bail!(
            "sched_setscheduler(SCHED_FIFO, {prio_val}) failed: {err}; hint: needs CAP_SYS_NICE or root"
        );
    }
    Ok(prio_val)
}

/// Apply real-time settings once per process. Failures are logged and the
/// run continues without them.
pub fn setup_rt_once(rt: bool, prio: Option<i32>, lock: RtLock) {
    use std::sync::OnceLock;
    static RT_ONCE: OnceLock<()> = OnceLock::new();

    if !rt {
        return;
    }
    RT_ONCE.get_or_init(|| {
        #[cfg(any(target_os = "linux", target_os = "macos"))]
        {
            match lock_memory(lock) {
                Ok(()) => tracing::info!(?lock, "RT memory lock applied"),
                Err(err) => tracing::warn!(error = %err, "RT memory lock not applied"),
            }
        }

        #[cfg(target_os = "linux")]
        {
            match fifo_priority(prio) {
                Ok(p) => tracing::info!(priority = p, "RT SCHED_FIFO applied"),
                Err(err) => tracing::warn!(error = %err, "RT priority not applied"),
            }
        }

        #[cfg(not(target_os = "linux"))]
        {
            let _ = prio;
            tracing::warn!("SCHED_FIFO is only available on Linux");
        }
        #[cfg(not(any(target_os = "linux", target_os = "macos")))]
        {
            let _ = lock;
        }
    });
}
