//! What a user action produces: a view to re-render, a toast-like notice and
//! a navigation instruction.

use serde::Serialize;
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum NoticeLevel {
    Success,
    Info,
    Warning,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Notice {
    pub level: NoticeLevel,
    pub message: String,
}

impl Notice {
    pub fn new(level: NoticeLevel, message: impl Into<String>) -> Self {
        Self {
            level,
            message: message.into(),
        }
    }

    pub fn success(message: impl Into<String>) -> Self {
        Self::new(NoticeLevel::Success, message)
    }

    pub fn info(message: impl Into<String>) -> Self {
        Self::new(NoticeLevel::Info, message)
    }

    pub fn warning(message: impl Into<String>) -> Self {
        Self::new(NoticeLevel::Warning, message)
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self::new(NoticeLevel::Error, message)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Navigation {
    Stay,
    Dashboard,
    /// Go to the login view once `after` has elapsed.
    Login { after: Duration },
}

#[derive(Debug, Clone, PartialEq)]
pub struct Outcome<V> {
    pub view: Option<V>,
    pub notice: Option<Notice>,
    pub navigation: Navigation,
}

impl<V> Outcome<V> {
    pub fn view(view: V) -> Self {
        Self {
            view: Some(view),
            notice: None,
            navigation: Navigation::Stay,
        }
    }

    pub fn notice(notice: Notice) -> Self {
        Self {
            view: None,
            notice: Some(notice),
            navigation: Navigation::Stay,
        }
    }

    pub fn navigate(navigation: Navigation) -> Self {
        Self {
            view: None,
            notice: None,
            navigation,
        }
    }

    pub fn with_notice(mut self, notice: Notice) -> Self {
        self.notice = Some(notice);
        self
    }

    pub fn with_navigation(mut self, navigation: Navigation) -> Self {
        self.navigation = navigation;
        self
    }

    pub fn map<U>(self, f: impl FnOnce(V) -> U) -> Outcome<U> {
        Outcome {
            view: self.view.map(f),
            notice: self.notice,
            navigation: self.navigation,
        }
    }

    pub fn notice_level(&self) -> Option<NoticeLevel> {
        self.notice.as_ref().map(|n| n.level)
    }

    pub fn redirects_to_login(&self) -> bool {
        matches!(self.navigation, Navigation::Login { .. })
    }
}
