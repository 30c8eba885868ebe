use super::util::Result;

pub fn readable_size(bytes: usize) -> (f64, &'static str) {
    let units: Vec<(f64, &'static str)> = vec![
        (1.0, "B"),
        (1024.0, "KiB"),
        (1024.0 * 1024.0, "MiB"),
        (1024.0 * 1024.0 * 1024.0, "GiB"),
        (1024.0 * 1024.0 * 1024.0 * 1024.0, "TiB"),
    ];

    let value = bytes as f64;
    let mut unit = units[0];
    for next in units.iter().skip(1) {
        if value >= next.0 {
            unit = *next;
        } else {
            break;
        }
    }

    (value / unit.0, unit.1)
}

/// Peak resident set size in bytes, from the `VmHWM` line of `/proc/self/status`.
#[cfg(target_os = "linux")]
pub fn peak_memory_usage() -> Result<usize> {
    let status = std::fs::read_to_string("/proc/self/status")?;
    parse_vm_hwm(&status)
        .ok_or_else(|| crate::tabmerge_error!("VmHWM missing from /proc/self/status"))
}

#[cfg(target_os = "macos")]
pub fn peak_memory_usage() -> Result<usize> {
    unsafe {
        let mut rusage: libc::rusage = std::mem::zeroed();
        let retval = libc::getrusage(libc::RUSAGE_SELF, &mut rusage as *mut _);
        match retval {
            0 => Ok(rusage.ru_maxrss as usize),
            _ => Err(crate::tabmerge_error!("libc::getrusage call failed")),
        }
    }
}

#[cfg(not(any(target_os = "linux", target_os = "macos")))]
pub fn peak_memory_usage() -> Result<usize> {
    Err(crate::tabmerge_error!(
        "No peak_memory_usage implementation for this OS"
    ))
}

#[cfg_attr(not(target_os = "linux"), allow(dead_code))]
fn parse_vm_hwm(status: &str) -> Option<usize> {
    let line = status.lines().find(|line| line.starts_with("VmHWM:"))?;
    let kib: usize = line
        .trim_start_matches("VmHWM:")
        .trim()
        .trim_end_matches("kB")
        .trim()
        .parse()
        .ok()?;
    Some(kib * 1024)
}
