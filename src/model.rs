//! Read-only document model consumed by the action walker and the image
//! locator.
//!
//! The model is produced by the loader from a parsed `lopdf` document, but it
//! can also be assembled by hand. Actions and XObjects live in arenas owned by
//! the [`Document`] and are referenced by index, so a `/Next` chain that loops
//! back on itself or a form that draws itself stays representable without
//! shared ownership.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use image::RgbImage;

use crate::geometry::Matrix;

// ── Actions ───────────────────────────────────────────────────────────────────

/// The action types a query can ask for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ActionKind {
    EmbeddedGoTo,
    GoTo,
    Hide,
    ImportData,
    JavaScript,
    Launch,
    Movie,
    Named,
    RemoteGoTo,
    ResetForm,
    Sound,
    SubmitForm,
    Thread,
    Uri,
}

impl ActionKind {
    pub const ALL: [ActionKind; 14] = [
        ActionKind::EmbeddedGoTo,
        ActionKind::GoTo,
        ActionKind::Hide,
        ActionKind::ImportData,
        ActionKind::JavaScript,
        ActionKind::Launch,
        ActionKind::Movie,
        ActionKind::Named,
        ActionKind::RemoteGoTo,
        ActionKind::ResetForm,
        ActionKind::Sound,
        ActionKind::SubmitForm,
        ActionKind::Thread,
        ActionKind::Uri,
    ];

    /// The `/S` name identifying this action type in a PDF action dictionary.
    pub fn pdf_name(self) -> &'static str {
        match self {
            ActionKind::EmbeddedGoTo => "GoToE",
            ActionKind::GoTo => "GoTo",
            ActionKind::Hide => "Hide",
            ActionKind::ImportData => "ImportData",
            ActionKind::JavaScript => "JavaScript",
            ActionKind::Launch => "Launch",
            ActionKind::Movie => "Movie",
            ActionKind::Named => "Named",
            ActionKind::RemoteGoTo => "GoToR",
            ActionKind::ResetForm => "ResetForm",
            ActionKind::Sound => "Sound",
            ActionKind::SubmitForm => "SubmitForm",
            ActionKind::Thread => "Thread",
            ActionKind::Uri => "URI",
        }
    }

    /// Look up the kind for an `/S` name; `None` for subtypes outside the
    /// supported set (e.g. `/Rendition`).
    pub fn from_pdf_name(name: &[u8]) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|kind| kind.pdf_name().as_bytes() == name)
    }

    /// Lower-case identifier used on the command line and in messages.
    pub fn identifier(self) -> &'static str {
        match self {
            ActionKind::EmbeddedGoTo => "embedded-goto",
            ActionKind::GoTo => "goto",
            ActionKind::Hide => "hide",
            ActionKind::ImportData => "import-data",
            ActionKind::JavaScript => "javascript",
            ActionKind::Launch => "launch",
            ActionKind::Movie => "movie",
            ActionKind::Named => "named",
            ActionKind::RemoteGoTo => "remote-goto",
            ActionKind::ResetForm => "reset-form",
            ActionKind::Sound => "sound",
            ActionKind::SubmitForm => "submit-form",
            ActionKind::Thread => "thread",
            ActionKind::Uri => "uri",
        }
    }

    fn bit(self) -> u16 {
        1 << (self as u16)
    }
}

impl fmt::Display for ActionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.identifier())
    }
}

impl FromStr for ActionKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|kind| {
                kind.identifier().eq_ignore_ascii_case(s) || kind.pdf_name().eq_ignore_ascii_case(s)
            })
            .ok_or_else(|| format!("unknown action type '{s}'"))
    }
}

/// A set of [`ActionKind`]s.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ActionKinds(u16);

impl ActionKinds {
    pub fn new() -> Self {
        Self(0)
    }

    pub fn insert(&mut self, kind: ActionKind) {
        self.0 |= kind.bit();
    }

    pub fn contains(&self, kind: ActionKind) -> bool {
        self.0 & kind.bit() != 0
    }

    pub fn is_empty(&self) -> bool {
        self.0 == 0
    }

    pub fn iter(&self) -> impl Iterator<Item = ActionKind> + '_ {
        ActionKind::ALL.into_iter().filter(|k| self.contains(*k))
    }
}

impl FromIterator<ActionKind> for ActionKinds {
    fn from_iter<I: IntoIterator<Item = ActionKind>>(iter: I) -> Self {
        let mut set = Self::new();
        for kind in iter {
            set.insert(kind);
        }
        set
    }
}

impl From<&[ActionKind]> for ActionKinds {
    fn from(kinds: &[ActionKind]) -> Self {
        kinds.iter().copied().collect()
    }
}

impl fmt::Display for ActionKinds {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names: Vec<&str> = self.iter().map(ActionKind::identifier).collect();
        write!(f, "[{}]", names.join(", "))
    }
}

/// Index of an [`Action`] in its document's action arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ActionId(pub(crate) usize);

/// One node of an action chain.
#[derive(Debug, Clone, PartialEq)]
pub struct Action {
    /// The raw `/S` subtype name.
    pub subtype: String,
    /// `None` when the subtype is not one of the supported kinds.
    pub kind: Option<ActionKind>,
    /// Actions executed after this one, in order.
    pub next: Vec<ActionId>,
}

// ── Trigger slots ─────────────────────────────────────────────────────────────

/// A fixed family of trigger events carrying an action each
/// (an "additional actions" dictionary).
pub trait Trigger: Copy + Eq + fmt::Debug + 'static {
    /// Every trigger of the family in traversal order.
    const ALL: &'static [Self];

    /// Dictionary key of the trigger inside its `/AA` dictionary.
    fn key(self) -> &'static str;
}

/// Document-level triggers from the catalog's `/AA` dictionary.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentTrigger {
    WillClose,
    WillSave,
    DidSave,
    WillPrint,
    DidPrint,
}

impl Trigger for DocumentTrigger {
    const ALL: &'static [Self] = &[
        DocumentTrigger::WillClose,
        DocumentTrigger::WillSave,
        DocumentTrigger::DidSave,
        DocumentTrigger::WillPrint,
        DocumentTrigger::DidPrint,
    ];

    fn key(self) -> &'static str {
        match self {
            DocumentTrigger::WillClose => "WC",
            DocumentTrigger::WillSave => "WS",
            DocumentTrigger::DidSave => "DS",
            DocumentTrigger::WillPrint => "WP",
            DocumentTrigger::DidPrint => "DP",
        }
    }
}

/// Page open/close triggers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageTrigger {
    Open,
    Close,
}

impl Trigger for PageTrigger {
    const ALL: &'static [Self] = &[PageTrigger::Open, PageTrigger::Close];

    fn key(self) -> &'static str {
        match self {
            PageTrigger::Open => "O",
            PageTrigger::Close => "C",
        }
    }
}

/// Form field triggers (keystroke, format, validate, calculate).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldTrigger {
    Keystroke,
    Format,
    Validate,
    Calculate,
}

impl Trigger for FieldTrigger {
    const ALL: &'static [Self] = &[
        FieldTrigger::Keystroke,
        FieldTrigger::Format,
        FieldTrigger::Validate,
        FieldTrigger::Calculate,
    ];

    fn key(self) -> &'static str {
        match self {
            FieldTrigger::Keystroke => "K",
            FieldTrigger::Format => "F",
            FieldTrigger::Validate => "V",
            FieldTrigger::Calculate => "C",
        }
    }
}

/// An additional-actions record: at most one action per trigger.
#[derive(Debug, Clone, PartialEq)]
pub struct AdditionalActions<T: Trigger> {
    slots: Vec<(T, ActionId)>,
}

impl<T: Trigger> Default for AdditionalActions<T> {
    fn default() -> Self {
        Self { slots: Vec::new() }
    }
}

impl<T: Trigger> AdditionalActions<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Populate `trigger`, replacing any previous action.
    pub fn set(&mut self, trigger: T, action: ActionId) {
        match self.slots.iter_mut().find(|(t, _)| *t == trigger) {
            Some(slot) => slot.1 = action,
            None => self.slots.push((trigger, action)),
        }
    }

    pub fn get(&self, trigger: T) -> Option<ActionId> {
        self.slots
            .iter()
            .find(|(t, _)| *t == trigger)
            .map(|(_, id)| *id)
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Populated slots in the trigger family's fixed order.
    pub fn iter(&self) -> impl Iterator<Item = (T, ActionId)> + '_ {
        T::ALL
            .iter()
            .filter_map(move |t| self.get(*t).map(|id| (*t, id)))
    }
}

// ── Catalog, pages, resources ────────────────────────────────────────────────

/// Document-level action entry points.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Catalog {
    pub open_action: Option<ActionId>,
    pub additional_actions: AdditionalActions<DocumentTrigger>,
}

/// Index of an [`XObject`] in its document's XObject arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct XObjectId(pub(crate) usize);

/// A name → XObject lookup scope.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Resources {
    xobjects: BTreeMap<Vec<u8>, XObjectId>,
}

impl Resources {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert_xobject(&mut self, name: impl Into<Vec<u8>>, id: XObjectId) {
        self.xobjects.insert(name.into(), id);
    }

    pub fn xobject(&self, name: &[u8]) -> Option<XObjectId> {
        self.xobjects.get(name).copied()
    }

    pub fn xobjects(&self) -> impl Iterator<Item = (&[u8], XObjectId)> + '_ {
        self.xobjects.iter().map(|(n, id)| (n.as_slice(), *id))
    }

    pub fn is_empty(&self) -> bool {
        self.xobjects.is_empty()
    }
}

/// One page of the document.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Page {
    /// 1-based page number.
    pub number: u32,
    pub additional_actions: AdditionalActions<PageTrigger>,
    /// Decoded content stream bytes (all `/Contents` streams concatenated).
    pub content: Vec<u8>,
    pub resources: Resources,
}

/// A decoded raster image XObject.
#[derive(Debug, Clone, PartialEq)]
pub struct ImageXObject {
    pub raster: RgbImage,
}

/// A form XObject: a nested content stream with its own resource scope.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FormXObject {
    pub content: Vec<u8>,
    /// `None` when the form declares no `/Resources` and draws with the
    /// scope it is invoked from.
    pub resources: Option<Resources>,
    /// Form space → user space transform (`/Matrix`).
    pub matrix: Matrix,
}

/// A reusable drawable resource.
#[derive(Debug, Clone, PartialEq)]
pub enum XObject {
    Image(ImageXObject),
    Form(FormXObject),
}

// ── Form fields ──────────────────────────────────────────────────────────────

/// A widget annotation of a terminal field.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Widget {
    /// The widget's activation action (`/A`).
    pub action: Option<ActionId>,
}

/// An internal node of the field tree.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NonTerminalField {
    /// Partial field name (`/T`).
    pub name: Option<String>,
    pub children: Vec<Field>,
}

/// A leaf of the field tree.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TerminalField {
    /// Partial field name (`/T`).
    pub name: Option<String>,
    pub widgets: Vec<Widget>,
    pub additional_actions: Option<AdditionalActions<FieldTrigger>>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Field {
    NonTerminal(NonTerminalField),
    Terminal(TerminalField),
}

impl Field {
    pub fn name(&self) -> Option<&str> {
        match self {
            Field::NonTerminal(f) => f.name.as_deref(),
            Field::Terminal(f) => f.name.as_deref(),
        }
    }
}

/// The interactive form (`/AcroForm`).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AcroForm {
    pub fields: Vec<Field>,
}

// ── Document ─────────────────────────────────────────────────────────────────

/// A parsed document: catalog, pages, optional form, and the arenas the
/// other entities point into.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Document {
    pub catalog: Catalog,
    pub pages: Vec<Page>,
    pub acro_form: Option<AcroForm>,
    actions: Vec<Action>,
    xobjects: Vec<XObject>,
}

impl Document {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an action without successors and return its id.
    pub fn add_action(&mut self, kind: ActionKind) -> ActionId {
        self.push_action(Action {
            subtype: kind.pdf_name().to_owned(),
            kind: Some(kind),
            next: Vec::new(),
        })
    }

    pub fn push_action(&mut self, action: Action) -> ActionId {
        self.actions.push(action);
        ActionId(self.actions.len() - 1)
    }

    /// Append `next` to the chain after `action`.
    ///
    /// # Panics
    ///
    /// Panics if `action` does not belong to this document.
    pub fn chain(&mut self, action: ActionId, next: ActionId) {
        self.actions[action.0].next.push(next);
    }

    pub fn action(&self, id: ActionId) -> Option<&Action> {
        self.actions.get(id.0)
    }

    pub fn action_count(&self) -> usize {
        self.actions.len()
    }

    pub fn add_xobject(&mut self, xobject: XObject) -> XObjectId {
        self.xobjects.push(xobject);
        XObjectId(self.xobjects.len() - 1)
    }

    pub fn xobject(&self, id: XObjectId) -> Option<&XObject> {
        self.xobjects.get(id.0)
    }

    pub(crate) fn xobject_mut(&mut self, id: XObjectId) -> Option<&mut XObject> {
        self.xobjects.get_mut(id.0)
    }

    pub(crate) fn action_mut(&mut self, id: ActionId) -> Option<&mut Action> {
        self.actions.get_mut(id.0)
    }

    /// Look up a page by its 1-based number.
    pub fn page(&self, number: u32) -> Option<&Page> {
        let index = usize::try_from(number).ok()?.checked_sub(1)?;
        self.pages.get(index)
    }
}
