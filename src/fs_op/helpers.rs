use std::fs;
use std::io;
use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

/// Ensure parent directory exists for a path.
pub fn ensure_parent_exists(p: &Path) -> io::Result<()> {
    if let Some(parent) = p.parent() {
        fs::create_dir_all(parent)?;
    }
    Ok(())
}

/// Write `data` to `target` atomically, refusing to replace an existing file.
///
/// The bytes go to a temporary sibling first, which is then hard-linked into
/// place. `link(2)` fails with `AlreadyExists` instead of overwriting, so a
/// concurrent writer can never be clobbered and readers never observe a
/// partial file. Filesystems without hard links fall back to an exclusive
/// create of `target`.
pub fn atomic_write_new(target: &Path, data: &[u8]) -> io::Result<()> {
    ensure_parent_exists(target)?;
    let Some(dir) = target.parent() else {
        return write_new(target, data);
    };
    let tmp = dir.join(format!(".tmp_atomic_write.{}", unique_suffix()));
    if let Err(e) = fs::write(&tmp, data) {
        let _ = fs::remove_file(&tmp);
        return Err(e);
    }
    let linked = fs::hard_link(&tmp, target);
    let _ = fs::remove_file(&tmp);
    match linked {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == io::ErrorKind::AlreadyExists => Err(e),
        Err(_) => write_new(target, data),
    }
}

fn write_new(target: &Path, data: &[u8]) -> io::Result<()> {
    use std::io::Write;
    let mut f = fs::OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(target)?;
    f.write_all(data)?;
    f.sync_all()
}

// pid + clock + sequence; unique enough for sibling temp files.
fn unique_suffix() -> String {
    static NEXT_ID: AtomicU64 = AtomicU64::new(0);
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_nanos())
        .unwrap_or(0);
    let seq = NEXT_ID.fetch_add(1, Ordering::Relaxed);
    format!("{:x}{:x}{:x}", std::process::id(), nanos, seq)
}
