//! Reachability analysis for automation actions.
//!
//! [`ActionWalker`] visits every place an action can hang off a document, in
//! a fixed order:
//!
//! 1. the five document-level trigger slots of the catalog,
//! 2. the catalog's open action,
//! 3. each page's open and close triggers, in page order,
//! 4. the form field tree, depth first: terminal fields first report a
//!    field-level additional-actions record (as JavaScript), then the action
//!    chain of each widget.
//!
//! Each action chain is followed through every `/Next` entry with a visited
//! set, so chains that loop back on themselves terminate.

use std::collections::HashSet;
use std::fmt;
use std::ops::ControlFlow;

use crate::model::{
    ActionId, ActionKind, ActionKinds, DocumentTrigger, Document, Field, PageTrigger, Trigger,
};
use crate::verdict::Verdict;

// ── Match reporting ──────────────────────────────────────────────────────────

/// Where in the document a matching action chain starts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ActionLocation {
    DocumentTrigger(DocumentTrigger),
    OpenAction,
    PageTrigger { page: u32, trigger: PageTrigger },
    /// A terminal field's additional-actions record.
    FieldAdditionalActions { field: String },
    /// The activation action of a terminal field's widget.
    Widget { field: String, widget: usize },
}

impl fmt::Display for ActionLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ActionLocation::DocumentTrigger(t) => write!(f, "document trigger /{}", t.key()),
            ActionLocation::OpenAction => f.write_str("document open action"),
            ActionLocation::PageTrigger { page, trigger } => {
                write!(f, "page {page} trigger /{}", trigger.key())
            }
            ActionLocation::FieldAdditionalActions { field } => {
                write!(f, "additional actions of field '{field}'")
            }
            ActionLocation::Widget { field, widget } => {
                write!(f, "widget {widget} of field '{field}'")
            }
        }
    }
}

/// One action of a requested kind found during a walk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActionMatch {
    pub kind: ActionKind,
    pub location: ActionLocation,
    /// Steps from the head of the chain; 0 is the action in the trigger slot.
    pub chain_position: usize,
}

impl fmt::Display for ActionMatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} action (/S /{}) at {}, chain position {}",
            self.kind,
            self.kind.pdf_name(),
            self.location,
            self.chain_position
        )
    }
}

/// Whether finding a requested action is a failure or the goal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FindPolicy {
    /// Every match is a violation; the walk reports all of them.
    FailIfFound,
    /// At least one match is required; the walk may stop at the first.
    FailIfAbsent,
}

/// The outcome of [`ActionWalker::run`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActionReport {
    pub policy: FindPolicy,
    pub kinds: ActionKinds,
    pub matches: Vec<ActionMatch>,
}

impl ActionReport {
    pub fn found(&self) -> bool {
        !self.matches.is_empty()
    }

    /// Map the matches onto pass/fail under the report's policy.
    pub fn verdict(&self) -> Verdict {
        match (self.policy, self.found()) {
            (FindPolicy::FailIfFound, false) | (FindPolicy::FailIfAbsent, true) => Verdict::Pass,
            (FindPolicy::FailIfFound, true) => {
                let lines: Vec<String> = self.matches.iter().map(|m| format!("  {m}")).collect();
                Verdict::Fail(format!(
                    "expected no actions of type {}, found {}:\n{}",
                    self.kinds,
                    self.matches.len(),
                    lines.join("\n")
                ))
            }
            (FindPolicy::FailIfAbsent, false) => Verdict::Fail(format!(
                "expected at least one action of type {}, found none",
                self.kinds
            )),
        }
    }
}

// ── Walker ───────────────────────────────────────────────────────────────────

/// Walks all action attachment points of a [`Document`] looking for
/// actions whose kind is in a requested set.
pub struct ActionWalker<'a> {
    document: &'a Document,
    kinds: ActionKinds,
}

impl<'a> ActionWalker<'a> {
    pub fn new(document: &'a Document, kinds: impl Into<ActionKinds>) -> Self {
        Self {
            document,
            kinds: kinds.into(),
        }
    }

    /// Walk under `policy` and collect the matches.
    ///
    /// `FailIfFound` visits the whole document; `FailIfAbsent` stops at the
    /// first match.
    pub fn run(&self, policy: FindPolicy) -> ActionReport {
        let mut matches = Vec::new();
        let _ = self.walk(|found| {
            matches.push(found);
            match policy {
                FindPolicy::FailIfFound => ControlFlow::Continue(()),
                FindPolicy::FailIfAbsent => ControlFlow::Break(()),
            }
        });
        ActionReport {
            policy,
            kinds: self.kinds,
            matches,
        }
    }

    /// Visit every match in traversal order. The walk ends early when
    /// `visit` returns `Break`, and the `Break` is passed back.
    pub fn walk<F>(&self, mut visit: F) -> ControlFlow<()>
    where
        F: FnMut(ActionMatch) -> ControlFlow<()>,
    {
        if self.kinds.is_empty() {
            return ControlFlow::Continue(());
        }
        let doc = self.document;

        for (trigger, action) in doc.catalog.additional_actions.iter() {
            self.walk_chain(action, ActionLocation::DocumentTrigger(trigger), &mut visit)?;
        }

        if let Some(action) = doc.catalog.open_action {
            self.walk_chain(action, ActionLocation::OpenAction, &mut visit)?;
        }

        for page in &doc.pages {
            for (trigger, action) in page.additional_actions.iter() {
                let location = ActionLocation::PageTrigger {
                    page: page.number,
                    trigger,
                };
                self.walk_chain(action, location, &mut visit)?;
            }
        }

        if let Some(acro_form) = &doc.acro_form {
            for field in &acro_form.fields {
                self.walk_field(field, None, &mut visit)?;
            }
        }

        ControlFlow::Continue(())
    }

    fn walk_field<F>(&self, field: &Field, parent: Option<&str>, visit: &mut F) -> ControlFlow<()>
    where
        F: FnMut(ActionMatch) -> ControlFlow<()>,
    {
        let name = qualified_name(parent, field.name());

        match field {
            Field::NonTerminal(node) => {
                for child in &node.children {
                    self.walk_field(child, Some(&name), visit)?;
                }
            }
            Field::Terminal(leaf) => {
                // Field triggers (format, validate, calculate, keystroke)
                // run JavaScript; any populated record counts.
                if self.kinds.contains(ActionKind::JavaScript) && leaf.additional_actions.is_some()
                {
                    visit(ActionMatch {
                        kind: ActionKind::JavaScript,
                        location: ActionLocation::FieldAdditionalActions {
                            field: name.clone(),
                        },
                        chain_position: 0,
                    })?;
                }

                for (index, widget) in leaf.widgets.iter().enumerate() {
                    if let Some(action) = widget.action {
                        let location = ActionLocation::Widget {
                            field: name.clone(),
                            widget: index,
                        };
                        self.walk_chain(action, location, visit)?;
                    }
                }
            }
        }

        ControlFlow::Continue(())
    }

    /// Depth-first over one chain, each node at most once.
    fn walk_chain<F>(&self, head: ActionId, location: ActionLocation, visit: &mut F) -> ControlFlow<()>
    where
        F: FnMut(ActionMatch) -> ControlFlow<()>,
    {
        let mut visited = HashSet::new();
        let mut pending = vec![(head, 0usize)];

        while let Some((id, position)) = pending.pop() {
            if !visited.insert(id) {
                continue;
            }
            let Some(action) = self.document.action(id) else {
                continue;
            };

            if let Some(kind) = action.kind.filter(|k| self.kinds.contains(*k)) {
                visit(ActionMatch {
                    kind,
                    location: location.clone(),
                    chain_position: position,
                })?;
            }

            // Reversed so the first successor is visited first.
            for next in action.next.iter().rev() {
                pending.push((*next, position + 1));
            }
        }

        ControlFlow::Continue(())
    }
}

/// Fully qualified field name: partial names joined with `.`.
fn qualified_name(parent: Option<&str>, partial: Option<&str>) -> String {
    match (parent, partial) {
        (Some(p), Some(n)) if !p.is_empty() => format!("{p}.{n}"),
        (Some(p), None) => p.to_owned(),
        (_, Some(n)) => n.to_owned(),
        (None, None) => String::new(),
    }
}
