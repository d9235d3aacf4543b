#![allow(dead_code)]

pub mod recorder {
    use parking_lot::Mutex;
    use std::sync::Arc;

    /// Ordered log of events written by handlers under test
    #[derive(Clone, Default)]
    pub struct EventLog(Arc<Mutex<Vec<String>>>);

    impl EventLog {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn push(&self, event: impl Into<String>) {
            self.0.lock().push(event.into());
        }

        pub fn events(&self) -> Vec<String> {
            self.0.lock().clone()
        }

        /// Position of `event`; panics if it was never recorded
        pub fn position(&self, event: &str) -> usize {
            self.0
                .lock()
                .iter()
                .position(|e| e == event)
                .unwrap_or_else(|| panic!("event '{event}' not recorded"))
        }
    }
}

pub mod tracing_init {
    use std::sync::Once;

    static INIT: Once = Once::new();

    /// Route tracing output through the test writer once per binary
    pub fn init() {
        INIT.call_once(|| {
            let _ = tracing_subscriber::fmt()
                .with_env_filter("cascade_router=debug")
                .with_test_writer()
                .try_init();
        });
    }
}
