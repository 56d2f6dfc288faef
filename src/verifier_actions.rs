use crate::action_walker::{ActionReport, ActionWalker, FindPolicy};
use crate::model::ActionKind;
use crate::Verdict;

/// Action reachability assertions for PdfVerifier.
impl super::PdfVerifier {
    /// Passes when at least one action of a kind in `kinds` is reachable from
    /// any trigger, the open action, or a form field.
    ///
    /// # Example
    ///
    /// ```no_run
    /// use pdfverify::{ActionKind, PdfVerifier};
    ///
    /// let verifier = PdfVerifier::from_path("form.pdf").unwrap();
    /// assert!(verifier.contains_actions_of_type(&[ActionKind::SubmitForm]).is_pass());
    /// ```
    pub fn contains_actions_of_type(&self, kinds: &[ActionKind]) -> Verdict {
        self.action_report(kinds, FindPolicy::FailIfAbsent).verdict()
    }

    /// Passes when no reachable action has a kind in `kinds`. A failing
    /// verdict lists every offending action with its location and position
    /// in its chain.
    pub fn contains_no_actions_of_type(&self, kinds: &[ActionKind]) -> Verdict {
        self.action_report(kinds, FindPolicy::FailIfFound).verdict()
    }

    /// Run the walker and return the raw matches.
    pub fn action_report(&self, kinds: &[ActionKind], policy: FindPolicy) -> ActionReport {
        ActionWalker::new(self.document(), kinds).run(policy)
    }
}
