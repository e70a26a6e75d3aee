//! App-switch resume contract
//!
//! When an identity app finishes, it opens the configured resume link to
//! bring this app back to the foreground. The link is parameter-free and
//! carries no result: the authorization response still arrives through the
//! agent. Handling it only signals that control came back.

use idswitch_common::auth::callback::targets_redirect;
use tokio::sync::watch;
use tracing::{debug, info};
use url::Url;

/// What a handled link turned out to be.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResumeSignal {
    /// The link was the resume link; the app has been brought back
    Resumed,
    /// Some other link; left for the host to route
    NotResumeLink,
}

/// Recognizes the resume link and counts returns from identity apps.
#[derive(Debug)]
pub struct AppSwitchResume {
    resume_uri: Url,
    returns: watch::Sender<u64>,
}

impl AppSwitchResume {
    pub fn new(resume_uri: Url) -> Self {
        let (returns, _) = watch::channel(0);
        Self { resume_uri, returns }
    }

    pub fn resume_uri(&self) -> &Url {
        &self.resume_uri
    }

    /// Whether `uri` is the resume link. Query and fragment are ignored.
    pub fn matches(&self, uri: &Url) -> bool {
        targets_redirect(uri, &self.resume_uri)
    }

    /// Handle an inbound link opened by another app.
    pub fn handle_link(&self, uri: &Url) -> ResumeSignal {
        if !self.matches(uri) {
            return ResumeSignal::NotResumeLink;
        }
        if uri.query().is_some() {
            debug!("Resume link carried parameters, ignoring them");
        }
        self.returns.send_modify(|count| *count += 1);
        info!(returns = *self.returns.borrow(), "Returned from identity app");
        ResumeSignal::Resumed
    }

    /// Number of returns observed so far.
    pub fn return_count(&self) -> u64 {
        *self.returns.borrow()
    }

    /// Watch returns; the value is the running count.
    pub fn subscribe(&self) -> watch::Receiver<u64> {
        self.returns.subscribe()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn resume() -> AppSwitchResume {
        AppSwitchResume::new(Url::parse("https://app.example/resume").unwrap())
    }

    #[test]
    fn resume_link_is_recognized() {
        let resume = resume();
        let signal = resume.handle_link(&Url::parse("https://app.example/resume").unwrap());

        assert_eq!(signal, ResumeSignal::Resumed);
        assert_eq!(resume.return_count(), 1);
    }

    #[test]
    fn parameters_are_ignored_but_link_still_resumes() {
        let resume = resume();
        let signal = resume.handle_link(&Url::parse("https://app.example/resume/?code=x").unwrap());

        assert_eq!(signal, ResumeSignal::Resumed);
    }

    #[test]
    fn other_links_are_left_alone() {
        let resume = resume();
        for other in [
            "https://app.example/callback",
            "https://other.example/resume",
            "https://app.example:8443/resume",
            "myapp://resume",
        ] {
            assert_eq!(resume.handle_link(&Url::parse(other).unwrap()), ResumeSignal::NotResumeLink);
        }
        assert_eq!(resume.return_count(), 0);
    }

    #[test]
    fn default_port_and_trailing_slash_still_match() {
        let resume = resume();
        for link in ["https://app.example:443/resume/", "https://app.example/resume#top"] {
            assert!(resume.matches(&Url::parse(link).unwrap()), "{link}");
        }
        for link in ["http://app.example/resume", "https://app.example/resume/more"] {
            assert!(!resume.matches(&Url::parse(link).unwrap()), "{link}");
        }
    }

    #[tokio::test]
    async fn subscribers_observe_returns() {
        let resume = resume();
        let mut rx = resume.subscribe();

        resume.handle_link(resume.resume_uri());
        rx.changed().await.unwrap();
        assert_eq!(*rx.borrow(), 1);
    }
}
