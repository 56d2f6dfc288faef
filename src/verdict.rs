use std::fmt;

/// Pass/fail outcome of an assertion-style query.
///
/// A failing verdict carries a human-readable reason suitable for a test
/// failure message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verdict {
    Pass,
    Fail(String),
}

impl Verdict {
    pub fn is_pass(&self) -> bool {
        matches!(self, Verdict::Pass)
    }

    pub fn is_fail(&self) -> bool {
        !self.is_pass()
    }

    /// The failure reason, `None` for a pass.
    pub fn reason(&self) -> Option<&str> {
        match self {
            Verdict::Pass => None,
            Verdict::Fail(reason) => Some(reason),
        }
    }
}

impl fmt::Display for Verdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Verdict::Pass => f.write_str("pass"),
            Verdict::Fail(reason) => write!(f, "fail: {reason}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fail_keeps_its_reason() {
        let verdict = Verdict::Fail("found javascript".into());
        assert!(verdict.is_fail());
        assert_eq!(verdict.reason(), Some("found javascript"));
        assert_eq!(verdict.to_string(), "fail: found javascript");
        assert!(Verdict::Pass.is_pass());
        assert_eq!(Verdict::Pass.reason(), None);
    }
}
