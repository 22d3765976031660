// Copyright (c) Microsoft. All rights reserved.

/// Problems found while decoding a single message.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct DecodeIssues {
    pub info: Vec<String>,
    pub warnings: Vec<String>,
    pub errors: Vec<String>,
}

impl DecodeIssues {
    pub fn clear(&mut self) {
        self.info.clear();
        self.warnings.clear();
        self.errors.clear();
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.info.is_empty() && self.warnings.is_empty() && self.errors.is_empty()
    }

    pub(crate) fn info(&mut self, message: impl Into<String>) {
        self.info.push(message.into());
    }

    pub(crate) fn warn(&mut self, message: impl Into<String>) {
        self.warnings.push(message.into());
    }

    pub(crate) fn error(&mut self, message: impl Into<String>) {
        self.errors.push(message.into());
    }

    /// Writes every issue to the log, info first and errors last, and empties the buffers.
    pub fn flush(&mut self) {
        for message in self.info.drain(..) {
            log::info!("{}", message);
        }

        for message in self.warnings.drain(..) {
            log::warn!("{}", message);
        }

        for message in self.errors.drain(..) {
            log::error!("{}", message);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::DecodeIssues;

    #[test]
    fn flush_empties_buffers() {
        let mut issues = DecodeIssues::default();
        issues.info("decoding");
        issues.warn("content type");
        issues.error("bad json");
        assert!(!issues.is_empty());

        issues.flush();
        assert!(issues.is_empty());
    }
}
