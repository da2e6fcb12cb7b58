use std::sync::{Mutex, MutexGuard};

#[derive(Debug)]
struct LibraryState {
    handles: usize,
    initializations: u64,
}

static LIBRARY: Mutex<LibraryState> = Mutex::new(LibraryState {
    handles: 0,
    initializations: 0,
});

fn lock() -> MutexGuard<'static, LibraryState> {
    LIBRARY.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Reference-counted handle on the process-wide ENet state.
///
/// The first handle brings the library up, the last one dropped tears it
/// down. Every transport owns one for its whole lifetime.
#[derive(Debug)]
pub struct EnetLibrary {
    _private: (),
}

impl EnetLibrary {
    pub fn acquire() -> Self {
        let mut state = lock();
        if state.handles == 0 {
            state.initializations += 1;
            log::debug!("ENet initialized (#{})", state.initializations);
        }
        state.handles += 1;
        Self { _private: () }
    }

    pub fn live_handles() -> usize {
        lock().handles
    }
}

impl Clone for EnetLibrary {
    fn clone(&self) -> Self {
        Self::acquire()
    }
}

impl Drop for EnetLibrary {
    fn drop(&mut self) {
        let mut state = lock();
        state.handles = state.handles.saturating_sub(1);
        if state.handles == 0 {
            log::debug!("ENet deinitialized");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_handles_are_reference_counted() {
        let first = EnetLibrary::acquire();
        let base = EnetLibrary::live_handles();
        assert!(base >= 1);

        let second = first.clone();
        assert_eq!(EnetLibrary::live_handles(), base + 1);

        drop(first);
        assert_eq!(EnetLibrary::live_handles(), base);

        drop(second);
        assert_eq!(EnetLibrary::live_handles(), base - 1);
    }
}
