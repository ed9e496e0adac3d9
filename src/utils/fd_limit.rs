//! File descriptor limit detection for capping worker pools (Unix).

use log::debug;

/// Descriptors a scanner holds at once: one directory handle, also used for the listing.
pub const FDS_PER_SCANNER: usize = 1;

/// Descriptors a reader holds at once.
pub const FDS_PER_READER: usize = 1;

/// Fraction of the process FD limit to use (leave headroom for other code).
const FD_LIMIT_FRACTION: f64 = 0.8;

/// Returns the soft limit for max open file descriptors, or `None` if unavailable (e.g. Windows).
#[cfg(unix)]
pub fn max_open_fds() -> Option<u64> {
    use std::mem::MaybeUninit;
    let mut rlim = MaybeUninit::<libc::rlimit>::uninit();
    if unsafe { libc::getrlimit(libc::RLIMIT_NOFILE, rlim.as_mut_ptr()) } != 0 {
        return None;
    }
    let rlim = unsafe { rlim.assume_init() };
    let cur = rlim.rlim_cur;
    // RLIM_INFINITY is typically !0 or u64::MAX; treat as "no practical limit"
    if cur == libc::RLIM_INFINITY || cur > i64::MAX as u64 {
        return None;
    }
    Some(cur)
}

#[cfg(not(unix))]
pub fn max_open_fds() -> Option<u64> {
    None
}

/// Scale `(dir_workers, file_workers)` down proportionally so both pools together stay under
/// ~80% of the FD limit. Each pool keeps at least one worker.
pub fn cap_workers_by_fd_limit(dir_workers: usize, file_workers: usize) -> (usize, usize) {
    let dir_workers = dir_workers.max(1);
    let file_workers = file_workers.max(1);
    let Some(limit) = max_open_fds() else {
        return (dir_workers, file_workers);
    };
    let usable = (limit as f64 * FD_LIMIT_FRACTION) as usize;
    let wanted = dir_workers * FDS_PER_SCANNER + file_workers * FDS_PER_READER;
    if wanted <= usable {
        return (dir_workers, file_workers);
    }
    let scale = usable as f64 / wanted as f64;
    let capped = (
        ((dir_workers as f64 * scale) as usize).max(1),
        ((file_workers as f64 * scale) as usize).max(1),
    );
    debug!(
        "Capping workers {}+{} -> {}+{} (FD limit ~80%)",
        dir_workers, file_workers, capped.0, capped.1
    );
    capped
}
