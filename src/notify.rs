//! User-visible notices (toasts)

/// Severity of a notice
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeLevel {
    Info,
    Success,
    Warning,
    Error,
}

/// Sink for short messages shown to the user.
///
/// Messages are already user-facing; details belong in the log.
pub trait Notifier {
    fn notify(&self, level: NoticeLevel, message: &str);

    fn info(&self, message: &str) {
        self.notify(NoticeLevel::Info, message)
    }

    fn success(&self, message: &str) {
        self.notify(NoticeLevel::Success, message)
    }

    fn warning(&self, message: &str) {
        self.notify(NoticeLevel::Warning, message)
    }

    fn error(&self, message: &str) {
        self.notify(NoticeLevel::Error, message)
    }
}

/// Notifier that forwards to the `log` facade
#[derive(Debug, Default, Clone, Copy)]
pub struct LogNotifier;

impl Notifier for LogNotifier {
    fn notify(&self, level: NoticeLevel, message: &str) {
        match level {
            NoticeLevel::Info | NoticeLevel::Success => log::info!("[notice] {}", message),
            NoticeLevel::Warning => log::warn!("[notice] {}", message),
            NoticeLevel::Error => log::error!("[notice] {}", message),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;

    #[derive(Default)]
    struct Recorder(RefCell<Vec<(NoticeLevel, String)>>);

    impl Notifier for Recorder {
        fn notify(&self, level: NoticeLevel, message: &str) {
            self.0.borrow_mut().push((level, message.to_string()));
        }
    }

    #[test]
    fn helpers_route_levels() {
        let r = Recorder::default();
        r.warning("w");
        r.success("s");
        let seen = r.0.borrow();
        assert_eq!(seen[0], (NoticeLevel::Warning, "w".to_string()));
        assert_eq!(seen[1].0, NoticeLevel::Success);
        LogNotifier.error("no panic");
    }
}
