//! Build-time identity of a plugin.

const SHORT_COMMIT_LEN: usize = 7;

/// Immutable build constants, created once at startup and shared by reference.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildInfo {
    pub name: String,
    pub version: String,
    pub commit: String,
    pub date: String,
}

impl BuildInfo {
    pub fn new(name: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            version: version.into(),
            commit: "none".to_string(),
            date: "unknown".to_string(),
        }
    }

    pub fn with_commit(mut self, commit: impl Into<String>) -> Self {
        self.commit = commit.into();
        self
    }

    pub fn with_date(mut self, date: impl Into<String>) -> Self {
        self.date = date.into();
        self
    }

    /// The first seven characters of the commit, or the whole commit if shorter.
    pub fn short_commit(&self) -> &str {
        match self.commit.char_indices().nth(SHORT_COMMIT_LEN) {
            Some((idx, _)) => &self.commit[..idx],
            None => &self.commit,
        }
    }
}
