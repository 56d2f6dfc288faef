use std::collections::{HashMap, HashSet};

use lopdf::{Dictionary, Object, ObjectId};
use tracing::{debug, warn};

use crate::geometry::Matrix;
use crate::image_decode::decode_image;
use crate::model::{
    AcroForm, Action, ActionId, ActionKind, AdditionalActions, Document, Field, FormXObject,
    ImageXObject, NonTerminalField, Page, Resources, TerminalField, Trigger, Widget, XObject,
    XObjectId,
};
use crate::pdf_utils::{self, resolve, resolve_dict};
use crate::{Result, VerifierConfig, VerifyError};

/// Upper bound on `/Parent` hops when looking for inherited page resources.
const MAX_INHERITANCE_DEPTH: usize = 32;

/// Converts a parsed lopdf document into the read-only [`Document`] model.
///
/// Indirect actions and XObjects are converted once each; a second
/// reference to the same object id maps to the same arena entry.
pub(crate) struct ModelLoader<'a> {
    source: &'a lopdf::Document,
    config: &'a VerifierConfig,
    model: Document,
    action_ids: HashMap<ObjectId, ActionId>,
    xobject_ids: HashMap<ObjectId, XObjectId>,
}

impl<'a> ModelLoader<'a> {
    pub(crate) fn new(source: &'a lopdf::Document, config: &'a VerifierConfig) -> Self {
        Self {
            source,
            config,
            model: Document::new(),
            action_ids: HashMap::new(),
            xobject_ids: HashMap::new(),
        }
    }

    /// Build the whole model: catalog triggers, pages, and the form field tree.
    pub(crate) fn load(mut self) -> Result<Document> {
        let source = self.source;
        let catalog = source
            .catalog()
            .map_err(|e| VerifyError::InvalidPdf(format!("missing or invalid catalog: {e}")))?;

        if let Some(aa) = resolve_dict(source, catalog, b"AA") {
            self.model.catalog.additional_actions = self.load_additional_actions(aa);
        }

        // Destination arrays and other non-action values are "no action".
        if let Ok(open_action) = catalog.get(b"OpenAction") {
            self.model.catalog.open_action = self.load_action(open_action);
        }

        for (number, page_id) in source.get_pages() {
            let page = self.load_page(number, page_id)?;
            self.model.pages.push(page);
        }

        if let Some(acro_form) = resolve_dict(source, catalog, b"AcroForm") {
            let acro_form = self.load_acro_form(acro_form);
            self.model.acro_form = Some(acro_form);
        }

        debug!(
            pages = self.model.pages.len(),
            actions = self.model.action_count(),
            "document model loaded"
        );
        Ok(self.model)
    }

    // ── Actions ───────────────────────────────────────────────────────────────

    /// Convert an action dictionary (inline or referenced) and everything
    /// reachable through its `/Next` entries. Returns `None` when `object` is
    /// not an action dictionary.
    fn load_action(&mut self, object: &'a Object) -> Option<ActionId> {
        let (head, fresh) = self.intern_action(object)?;

        // Worklist of converted actions whose successors are not linked yet.
        let mut pending: Vec<(ActionId, &'a Dictionary)> =
            fresh.map(|d| (head, d)).into_iter().collect();
        while let Some((id, dict)) = pending.pop() {
            let mut next = Vec::new();
            for successor in self.next_entries(dict) {
                if let Some((next_id, fresh)) = self.intern_action(successor) {
                    next.push(next_id);
                    if let Some(d) = fresh {
                        pending.push((next_id, d));
                    }
                }
            }
            if let Some(action) = self.model.action_mut(id) {
                action.next = next;
            }
        }

        Some(head)
    }

    /// Map `object` to an arena node. The dictionary is returned alongside
    /// the id only when the node was created by this call.
    fn intern_action(&mut self, object: &'a Object) -> Option<(ActionId, Option<&'a Dictionary>)> {
        let reference = match object {
            Object::Reference(id) => Some(*id),
            _ => None,
        };
        if let Some(existing) = reference.and_then(|r| self.action_ids.get(&r)) {
            return Some((*existing, None));
        }

        let dict = resolve(self.source, object)?.as_dict().ok()?;
        let subtype = pdf_utils::name_from_dict(dict, b"S")?;

        let id = self.model.push_action(Action {
            subtype: String::from_utf8_lossy(subtype).into_owned(),
            kind: ActionKind::from_pdf_name(subtype),
            next: Vec::new(),
        });
        if let Some(r) = reference {
            self.action_ids.insert(r, id);
        }
        Some((id, Some(dict)))
    }

    /// The `/Next` entry as a list: a single action or an array of them.
    fn next_entries(&self, dict: &'a Dictionary) -> Vec<&'a Object> {
        let Ok(next) = dict.get(b"Next") else {
            return Vec::new();
        };
        match resolve(self.source, next) {
            Some(Object::Array(items)) => items.iter().collect(),
            Some(_) => vec![next],
            None => Vec::new(),
        }
    }

    fn load_additional_actions<T: Trigger>(&mut self, aa: &'a Dictionary) -> AdditionalActions<T> {
        let mut record = AdditionalActions::new();
        for trigger in T::ALL {
            if let Ok(object) = aa.get(trigger.key().as_bytes()) {
                match self.load_action(object) {
                    Some(id) => record.set(*trigger, id),
                    None => warn!(trigger = trigger.key(), "ignoring non-action trigger entry"),
                }
            }
        }
        record
    }

    // ── Pages and resources ──────────────────────────────────────────────────

    fn load_page(&mut self, number: u32, page_id: ObjectId) -> Result<Page> {
        let source = self.source;
        let page_dict = source.get_object(page_id)?.as_dict()?;

        let additional_actions = match resolve_dict(source, page_dict, b"AA") {
            Some(aa) => self.load_additional_actions(aa),
            None => AdditionalActions::new(),
        };

        let content = source.get_page_content(page_id).unwrap_or_else(|e| {
            warn!(page = number, error = %e, "unreadable page content, treating as empty");
            Vec::new()
        });

        let resources = match self.inherited_resources(page_dict) {
            Some(dict) => self.load_resources(dict)?,
            None => Resources::new(),
        };

        Ok(Page {
            number,
            additional_actions,
            content,
            resources,
        })
    }

    /// The page's `/Resources`, or the nearest ancestor's.
    fn inherited_resources(&self, page_dict: &'a Dictionary) -> Option<&'a Dictionary> {
        let mut node = page_dict;
        for _ in 0..MAX_INHERITANCE_DEPTH {
            if let Some(resources) = resolve_dict(self.source, node, b"Resources") {
                return Some(resources);
            }
            node = resolve_dict(self.source, node, b"Parent")?;
        }
        None
    }

    fn load_resources(&mut self, resources: &Dictionary) -> Result<Resources> {
        let mut scope = Resources::new();
        let Some(xobjects) = resolve_dict(self.source, resources, b"XObject") else {
            return Ok(scope);
        };

        for (name, object) in xobjects.iter() {
            if let Some(id) = self.load_xobject(name, object)? {
                scope.insert_xobject(name.clone(), id);
            }
        }
        Ok(scope)
    }

    fn load_xobject(&mut self, name: &[u8], object: &Object) -> Result<Option<XObjectId>> {
        let source = self.source;
        let reference = match object {
            Object::Reference(id) => Some(*id),
            _ => None,
        };
        if let Some(existing) = reference.and_then(|r| self.xobject_ids.get(&r)) {
            return Ok(Some(*existing));
        }

        let display_name = String::from_utf8_lossy(name).into_owned();
        let Some(Object::Stream(stream)) = resolve(source, object) else {
            warn!(xobject = %display_name, "XObject entry is not a stream");
            return Ok(None);
        };

        match pdf_utils::name_from_dict(&stream.dict, b"Subtype") {
            Some(b"Image") => match decode_image(source, stream, &display_name) {
                Ok(raster) => {
                    let id = self.model.add_xobject(XObject::Image(ImageXObject { raster }));
                    if let Some(r) = reference {
                        self.xobject_ids.insert(r, id);
                    }
                    Ok(Some(id))
                }
                Err(e) if self.config.strict_image_decoding => Err(e),
                Err(e) => {
                    warn!(xobject = %display_name, error = %e, "skipping undecodable image");
                    Ok(None)
                }
            },
            Some(b"Form") => {
                let content = pdf_utils::stream_bytes(stream)?;
                let matrix = match stream.dict.get(b"Matrix").ok().and_then(|m| resolve(source, m)) {
                    Some(Object::Array(items)) => Matrix::from_operands(items).unwrap_or_default(),
                    _ => Matrix::IDENTITY,
                };
                let id = self.model.add_xobject(XObject::Form(FormXObject {
                    content,
                    resources: None,
                    matrix,
                }));
                if let Some(r) = reference {
                    self.xobject_ids.insert(r, id);
                }

                let resources = match resolve_dict(source, &stream.dict, b"Resources") {
                    Some(dict) => Some(self.load_resources(dict)?),
                    None => None,
                };
                if let Some(XObject::Form(form)) = self.model.xobject_mut(id) {
                    form.resources = resources;
                }
                Ok(Some(id))
            }
            other => {
                debug!(
                    xobject = %display_name,
                    subtype = ?other.map(String::from_utf8_lossy),
                    "ignoring XObject subtype"
                );
                Ok(None)
            }
        }
    }

    // ── Form fields ──────────────────────────────────────────────────────────

    fn load_acro_form(&mut self, acro_form: &'a Dictionary) -> AcroForm {
        let source = self.source;
        let mut visited = HashSet::new();
        let fields = match acro_form.get(b"Fields").ok().and_then(|f| resolve(source, f)) {
            Some(Object::Array(items)) => items
                .iter()
                .filter_map(|item| self.load_field(item, &mut visited))
                .collect(),
            _ => Vec::new(),
        };
        AcroForm { fields }
    }

    /// A field whose kids include at least one named field is non-terminal;
    /// otherwise the kids (or the field itself) are its widgets.
    fn load_field(&mut self, object: &'a Object, visited: &mut HashSet<ObjectId>) -> Option<Field> {
        let source = self.source;
        if let Object::Reference(id) = object {
            if !visited.insert(*id) {
                warn!(object = ?id, "field tree revisits an object, cutting the cycle");
                return None;
            }
        }

        let dict = resolve(source, object)?.as_dict().ok()?;
        let name = pdf_utils::extract_string_from_dict(dict, b"T");

        let kids: Vec<&Object> = match dict.get(b"Kids").ok().and_then(|k| resolve(source, k)) {
            Some(Object::Array(items)) => items.iter().collect(),
            _ => Vec::new(),
        };
        let is_named_field = |kid: &&Object| {
            resolve(source, kid)
                .and_then(|o| o.as_dict().ok())
                .is_some_and(|d| d.has(b"T"))
        };

        if kids.iter().any(is_named_field) {
            let children = kids
                .into_iter()
                .filter_map(|kid| self.load_field(kid, visited))
                .collect();
            return Some(Field::NonTerminal(NonTerminalField { name, children }));
        }

        let widget_dicts: Vec<&Dictionary> = if kids.is_empty() {
            vec![dict]
        } else {
            kids.into_iter()
                .filter_map(|kid| resolve(source, kid).and_then(|o| o.as_dict().ok()))
                .collect()
        };
        let widgets = widget_dicts
            .into_iter()
            .map(|widget| Widget {
                action: widget.get(b"A").ok().and_then(|a| self.load_action(a)),
            })
            .collect();

        let additional_actions =
            resolve_dict(source, dict, b"AA").map(|aa| self.load_additional_actions(aa));

        Some(Field::Terminal(TerminalField {
            name,
            widgets,
            additional_actions,
        }))
    }
}
