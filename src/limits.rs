//! Optional address-space ceiling for the browsing process
//!
//! Rendering an adversarial object can allocate without bound. Before the
//! interactive loop starts, the guard caps the address space at the peak
//! resident size so far plus a configured headroom, so a runaway conversion
//! fails an allocation instead of taking the machine down.
//!
//! The guard is advisory: failure to install it is logged and the session
//! proceeds without it.

use crate::error::LimitError;

const BYTES_PER_MB: u64 = 1024 * 1024;

/// Peak resident set size of this process, in bytes
#[cfg(unix)]
pub fn max_rss_bytes() -> Result<u64, LimitError> {
    // ru_maxrss is in kilobytes on Linux and in bytes on macOS
    #[cfg(target_os = "macos")]
    const RSS_UNIT: u64 = 1;
    #[cfg(not(target_os = "macos"))]
    const RSS_UNIT: u64 = 1024;

    let mut usage = std::mem::MaybeUninit::<libc::rusage>::zeroed();
    // SAFETY: getrusage only writes into the provided struct
    let rc = unsafe { libc::getrusage(libc::RUSAGE_SELF, usage.as_mut_ptr()) };
    if rc != 0 {
        return Err(LimitError::Usage(std::io::Error::last_os_error()));
    }
    // SAFETY: zero-initialized and filled by a successful getrusage
    let usage = unsafe { usage.assume_init() };
    Ok(usage.ru_maxrss.max(0) as u64 * RSS_UNIT)
}

#[cfg(not(unix))]
pub fn max_rss_bytes() -> Result<u64, LimitError> {
    Err(LimitError::Unsupported)
}

#[cfg(unix)]
fn set_address_space_limit(limit: u64) -> Result<(), LimitError> {
    let rlim = libc::rlimit {
        rlim_cur: limit as libc::rlim_t,
        rlim_max: limit as libc::rlim_t,
    };
    // SAFETY: setrlimit reads the struct and has no other memory effects
    let rc = unsafe { libc::setrlimit(libc::RLIMIT_AS, &rlim) };
    if rc != 0 {
        return Err(LimitError::SetLimit {
            limit,
            source: std::io::Error::last_os_error(),
        });
    }
    Ok(())
}

#[cfg(not(unix))]
fn set_address_space_limit(_limit: u64) -> Result<(), LimitError> {
    Err(LimitError::Unsupported)
}

/// Address-space ceiling for a given peak RSS and headroom
pub fn ceiling(rss_bytes: u64, headroom_mb: u64) -> u64 {
    rss_bytes.saturating_add(headroom_mb.saturating_mul(BYTES_PER_MB))
}

/// Cap the address space at peak RSS + `headroom_mb`.
///
/// Returns the installed limit, or `None` when `headroom_mb` is 0.
pub fn apply_memory_limit(headroom_mb: u64) -> Result<Option<u64>, LimitError> {
    if headroom_mb == 0 {
        return Ok(None);
    }
    let limit = ceiling(max_rss_bytes()?, headroom_mb);
    set_address_space_limit(limit)?;
    Ok(Some(limit))
}

/// [`apply_memory_limit`], logging the outcome instead of returning it
pub fn install_memory_guard(headroom_mb: u64) {
    match apply_memory_limit(headroom_mb) {
        Ok(Some(limit)) => log::info!("Address space limited to {} bytes", limit),
        Ok(None) => log::info!("Memory guard disabled"),
        Err(e) => log::error!("Memory guard not installed: {}", e),
    }
}
