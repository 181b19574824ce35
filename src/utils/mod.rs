//! Small helpers shared by the pipeline workers.

use std::{ffi::CString, thread};

/// Sets the current process's name (cosmetic only, visible in `ps`/`top`).
pub fn set_proc_name(name: impl AsRef<str>) {
    if let Ok(title) = CString::new(name.as_ref().as_bytes()) {
        unsafe { libc::prctl(libc::PR_SET_NAME, title.as_ptr(), 0, 0, 0) };
    }
}

/// Spawns a new thread, setting its unix thread name to `name`.
pub fn spawn_named_thread<F, T>(name: impl Into<String>, f: F) -> thread::JoinHandle<T>
where
    F: FnOnce() -> T,
    F: Send + 'static,
    T: Send + 'static,
{
    let name = name.into();
    thread::Builder::new()
        .name(name.clone())
        .spawn(move || {
            set_proc_name(name);
            f()
        })
        .expect("failed to spawn thread")
}
