// Integration tests for pdfverify.
//
// Every test builds its PDF in memory with lopdf, serialises it and loads it
// back through the public API, so no fixture files are needed.

use std::io::Cursor;

use image::{Rgb, RgbImage};
use lopdf::{dictionary, Dictionary, Object, ObjectId, Stream};
use pdfverify::{
    load_reference, rasters_equal, save_rasters, ActionKind, ActionLocation, FindPolicy,
    Matrix, PdfVerifier, Rect, Unit, Verdict, VerifierConfig, VerifyError,
};

// ── Fixture builder ──────────────────────────────────────────────────────────

struct PdfBuilder {
    doc: lopdf::Document,
    pages_id: ObjectId,
    pages: Vec<Object>,
    catalog: Dictionary,
}

impl PdfBuilder {
    fn new() -> Self {
        let mut doc = lopdf::Document::with_version("1.7");
        let pages_id = doc.new_object_id();
        Self {
            doc,
            pages_id,
            pages: Vec::new(),
            catalog: dictionary! { "Type" => "Catalog", "Pages" => pages_id },
        }
    }

    fn add(&mut self, object: impl Into<Object>) -> ObjectId {
        self.doc.add_object(object)
    }

    /// Uncompressed DeviceRGB image XObject.
    fn image(&mut self, raster: &RgbImage) -> ObjectId {
        let stream = Stream::new(
            dictionary! {
                "Type" => "XObject",
                "Subtype" => "Image",
                "Width" => raster.width() as i64,
                "Height" => raster.height() as i64,
                "ColorSpace" => "DeviceRGB",
                "BitsPerComponent" => 8,
            },
            raster.as_raw().clone(),
        );
        self.add(stream)
    }

    fn form(&mut self, content: &[u8], xobjects: Dictionary) -> ObjectId {
        let stream = Stream::new(
            dictionary! {
                "Type" => "XObject",
                "Subtype" => "Form",
                "BBox" => vec![0.into(), 0.into(), 1000.into(), 1000.into()],
                "Resources" => dictionary! { "XObject" => xobjects },
            },
            content.to_vec(),
        );
        self.add(stream)
    }

    fn page(&mut self, content: &[u8], xobjects: Dictionary) -> ObjectId {
        let content_id = self.add(Stream::new(dictionary! {}, content.to_vec()));
        let page_id = self.add(dictionary! {
            "Type" => "Page",
            "Parent" => self.pages_id,
            "MediaBox" => vec![0.into(), 0.into(), 595.into(), 842.into()],
            "Contents" => content_id,
            "Resources" => dictionary! { "XObject" => xobjects },
        });
        self.pages.push(page_id.into());
        page_id
    }

    fn catalog_entry(&mut self, key: &str, value: impl Into<Object>) {
        self.catalog.set(key, value);
    }

    fn finish(mut self) -> Vec<u8> {
        let count = self.pages.len() as i64;
        self.doc.objects.insert(
            self.pages_id,
            Object::Dictionary(dictionary! {
                "Type" => "Pages",
                "Kids" => self.pages,
                "Count" => count,
            }),
        );
        let catalog_id = self.doc.add_object(self.catalog);
        self.doc.trailer.set("Root", catalog_id);

        let mut bytes = Vec::new();
        self.doc.save_to(&mut bytes).unwrap();
        bytes
    }
}

fn logo() -> RgbImage {
    RgbImage::from_fn(4, 3, |x, y| Rgb([(x * 60) as u8, (y * 80) as u8, 200]))
}

fn javascript(code: &str) -> Dictionary {
    dictionary! { "S" => "JavaScript", "JS" => Object::string_literal(code) }
}

fn blank_pdf() -> Vec<u8> {
    let mut pdf = PdfBuilder::new();
    pdf.page(b"", dictionary! {});
    pdf.finish()
}

// ── Configuration & errors ───────────────────────────────────────────────────

#[test]
fn default_config_is_lenient() {
    let cfg = VerifierConfig::default();
    assert!(cfg.password.is_none());
    assert_eq!(cfg.max_form_depth, 32);
    assert!(!cfg.strict_image_decoding);
}

#[test]
fn error_display_is_non_empty() {
    let errors: &[VerifyError] = &[
        VerifyError::PasswordRequired,
        VerifyError::InvalidPassword("incorrect password".into()),
        VerifyError::InvalidPdf("no catalog".into()),
        VerifyError::PageOutOfRange { page: 3, count: 1 },
        VerifyError::UnsupportedImage("Im0".into(), "JPXDecode".into()),
        VerifyError::RecursiveForm("Fm0".into()),
        VerifyError::FormDepthExceeded(32),
    ];
    for e in errors {
        assert!(!e.to_string().is_empty(), "empty display for {e:?}");
    }
}

#[test]
fn from_bytes_rejects_empty_slice() {
    assert!(PdfVerifier::from_bytes(&[]).is_err());
}

#[test]
fn from_bytes_rejects_non_pdf() {
    let result = PdfVerifier::from_bytes(b"This is not a PDF file at all.");
    assert!(result.is_err());
}

#[test]
fn reader_and_path_constructors_load_the_same_document() {
    let bytes = blank_pdf();
    let from_reader = PdfVerifier::from_reader(Cursor::new(bytes.clone())).unwrap();
    assert_eq!(from_reader.page_count(), 1);

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("blank.pdf");
    std::fs::write(&path, &bytes).unwrap();
    let from_path = PdfVerifier::from_path(&path).unwrap();
    assert_eq!(from_path.page_count(), 1);
    assert!(matches!(
        from_path.page(2),
        Err(VerifyError::PageOutOfRange { page: 2, count: 1 })
    ));
}

// ── Action reachability ──────────────────────────────────────────────────────

#[test]
fn document_without_actions_passes_absence_and_fails_presence() {
    let verifier = PdfVerifier::from_bytes(&blank_pdf()).unwrap();
    let all = ActionKind::ALL;

    assert_eq!(verifier.contains_no_actions_of_type(&all), Verdict::Pass);
    let verdict = verifier.contains_actions_of_type(&all);
    assert!(verdict.is_fail());
    assert!(verdict.reason().unwrap().contains("found none"));
}

#[test]
fn widget_javascript_is_found_and_named() {
    let mut pdf = PdfBuilder::new();
    pdf.page(b"", dictionary! {});
    let widget = pdf.add(dictionary! {
        "Type" => "Annot",
        "Subtype" => "Widget",
        "Rect" => vec![0.into(), 0.into(), 50.into(), 20.into()],
        "A" => javascript("this.submitForm()"),
    });
    let button = pdf.add(dictionary! {
        "FT" => "Btn",
        "T" => Object::string_literal("send"),
        "Kids" => vec![widget.into()],
    });
    let name = pdf.add(dictionary! {
        "FT" => "Tx",
        "T" => Object::string_literal("name"),
        "Subtype" => "Widget",
    });
    let group = pdf.add(dictionary! {
        "T" => Object::string_literal("order"),
        "Kids" => vec![name.into(), button.into()],
    });
    pdf.catalog_entry("AcroForm", dictionary! { "Fields" => vec![group.into()] });
    let verifier = PdfVerifier::from_bytes(&pdf.finish()).unwrap();

    assert!(verifier.contains_actions_of_type(&[ActionKind::JavaScript]).is_pass());

    let verdict = verifier.contains_no_actions_of_type(&[ActionKind::JavaScript]);
    let reason = verdict.reason().unwrap();
    assert!(reason.contains("order.send"), "{reason}");
    assert!(reason.contains("/S /JavaScript"), "{reason}");

    assert!(verifier.contains_no_actions_of_type(&[ActionKind::Launch]).is_pass());
}

#[test]
fn open_action_chain_is_followed_past_its_head() {
    let mut pdf = PdfBuilder::new();
    let page = pdf.page(b"", dictionary! {});
    let launch = pdf.add(dictionary! {
        "S" => "Launch",
        "F" => Object::string_literal("calc.exe"),
    });
    let uri = pdf.add(dictionary! {
        "S" => "URI",
        "URI" => Object::string_literal("https://example.com"),
        "Next" => vec![launch.into()],
    });
    pdf.catalog_entry(
        "OpenAction",
        dictionary! {
            "S" => "GoTo",
            "D" => vec![page.into(), Object::Name(b"Fit".to_vec())],
            "Next" => uri,
        },
    );
    let verifier = PdfVerifier::from_bytes(&pdf.finish()).unwrap();

    let report = verifier.action_report(&[ActionKind::Launch], FindPolicy::FailIfFound);
    assert_eq!(report.matches.len(), 1);
    assert_eq!(report.matches[0].location, ActionLocation::OpenAction);
    assert_eq!(report.matches[0].chain_position, 2);
}

#[test]
fn destination_open_action_is_not_an_action() {
    let mut pdf = PdfBuilder::new();
    let page = pdf.page(b"", dictionary! {});
    pdf.catalog_entry("OpenAction", vec![page.into(), Object::Name(b"Fit".to_vec())]);
    let verifier = PdfVerifier::from_bytes(&pdf.finish()).unwrap();

    assert!(verifier.document().catalog.open_action.is_none());
    assert!(verifier.contains_no_actions_of_type(&ActionKind::ALL).is_pass());
}

#[test]
fn cyclic_next_chain_terminates() {
    let mut pdf = PdfBuilder::new();
    pdf.page(b"", dictionary! {});
    let first = pdf.doc.new_object_id();
    let second = pdf.add(dictionary! { "S" => "Named", "N" => "NextPage", "Next" => first });
    pdf.doc.objects.insert(
        first,
        Object::Dictionary(dictionary! { "S" => "JavaScript", "JS" => Object::string_literal("1"), "Next" => second }),
    );
    pdf.catalog_entry("AA", dictionary! { "WC" => first });
    let verifier = PdfVerifier::from_bytes(&pdf.finish()).unwrap();

    let report = verifier.action_report(
        &[ActionKind::JavaScript, ActionKind::Named],
        FindPolicy::FailIfFound,
    );
    assert_eq!(report.matches.len(), 2);
}

#[test]
fn page_and_field_triggers_are_reported() {
    let mut pdf = PdfBuilder::new();
    let page = pdf.page(b"", dictionary! {});
    let field = pdf.add(dictionary! {
        "FT" => "Tx",
        "T" => Object::string_literal("total"),
        "Subtype" => "Widget",
        "AA" => dictionary! { "C" => javascript("event.value = 1") },
    });
    pdf.catalog_entry("AcroForm", dictionary! { "Fields" => vec![field.into()] });
    let bytes = {
        let page_dict = pdf.doc.get_object_mut(page).unwrap().as_dict_mut().unwrap();
        page_dict.set("AA", dictionary! { "O" => dictionary! { "S" => "Sound" } });
        pdf.finish()
    };
    let verifier = PdfVerifier::from_bytes(&bytes).unwrap();

    let sound = verifier.action_report(&[ActionKind::Sound], FindPolicy::FailIfFound);
    assert_eq!(sound.matches[0].location.to_string(), "page 1 trigger /O");

    let scripts = verifier.action_report(&[ActionKind::JavaScript], FindPolicy::FailIfFound);
    assert_eq!(
        scripts.matches[0].location,
        ActionLocation::FieldAdditionalActions {
            field: "total".into()
        }
    );
}

// ── Image location ───────────────────────────────────────────────────────────

fn placed_logo_pdf() -> Vec<u8> {
    let mut pdf = PdfBuilder::new();
    let im0 = pdf.image(&logo());
    pdf.page(b"q 50 0 0 50 10 10 cm /Im0 Do Q", dictionary! { "Im0" => im0 });
    pdf.finish()
}

#[test]
fn image_is_found_inside_region() {
    let verifier = PdfVerifier::from_bytes(&placed_logo_pdf()).unwrap();
    let region = Rect::new(0.0, 0.0, 100.0, 100.0);

    assert!(verifier
        .page_contains_image_in_region(1, &logo(), region)
        .unwrap()
        .is_pass());
    let placement = verifier.locate_image(1, &logo(), region).unwrap().unwrap();
    assert_eq!(placement.name, "Im0");
    assert_eq!(placement.ctm.translate_x(), 10.0);
}

#[test]
fn image_larger_than_region_is_not_found() {
    let verifier = PdfVerifier::from_bytes(&placed_logo_pdf()).unwrap();
    let verdict = verifier
        .page_contains_image_in_region(1, &logo(), Rect::new(0.0, 0.0, 40.0, 40.0))
        .unwrap();
    assert!(verdict.is_fail());
    assert!(verdict.reason().unwrap().contains("page 1"));
}

#[test]
fn region_in_millimetres_is_converted_to_points() {
    let verifier = PdfVerifier::from_bytes(&placed_logo_pdf()).unwrap();
    // 25.4mm is 72pt, enough for a 50pt image at 10pt.
    let region = Rect::from_units(Unit::Millimeter, 0.0, 0.0, 25.4, 25.4);
    assert!(verifier
        .page_contains_image_in_region(1, &logo(), region)
        .unwrap()
        .is_pass());
    let too_small = Rect::from_millimeters(0.0, 0.0, 10.0, 10.0);
    assert!(verifier
        .page_contains_image_in_region(1, &logo(), too_small)
        .unwrap()
        .is_fail());
}

#[test]
fn text_positioning_does_not_move_a_later_image() {
    let mut pdf = PdfBuilder::new();
    let im0 = pdf.image(&logo());
    pdf.page(
        b"BT /F1 12 Tf 1 0 0 1 100 700 Tm (Hello) Tj ET q 50 0 0 50 10 10 cm /Im0 Do Q",
        dictionary! { "Im0" => im0 },
    );
    let verifier = PdfVerifier::from_bytes(&pdf.finish()).unwrap();

    let placement = verifier
        .locate_image(1, &logo(), Rect::new(0.0, 0.0, 100.0, 100.0))
        .unwrap()
        .unwrap();
    assert_eq!(placement.ctm, Matrix::new(50.0, 0.0, 0.0, 50.0, 10.0, 10.0));
}

#[test]
fn page_with_inline_image_still_locates_xobject() {
    let mut pdf = PdfBuilder::new();
    let im0 = pdf.image(&logo());
    pdf.page(
        b"q 10 0 0 10 0 0 cm BI /W 1 /H 1 /CS /G /BPC 8 ID \x80 EI Q q 50 0 0 50 10 10 cm /Im0 Do Q",
        dictionary! { "Im0" => im0 },
    );
    let verifier = PdfVerifier::from_bytes(&pdf.finish()).unwrap();

    assert!(verifier
        .page_contains_image_in_region(1, &logo(), Rect::new(0.0, 0.0, 100.0, 100.0))
        .unwrap()
        .is_pass());
}

#[test]
fn image_drawn_only_inside_a_form_is_found() {
    let mut pdf = PdfBuilder::new();
    let im0 = pdf.image(&logo());
    let form = pdf.form(b"q 40 0 0 40 0 0 cm /Logo Do Q", dictionary! { "Logo" => im0 });
    pdf.page(b"q 1 0 0 1 300 500 cm /Fm0 Do Q", dictionary! { "Fm0" => form });
    let verifier = PdfVerifier::from_bytes(&pdf.finish()).unwrap();

    let placement = verifier
        .locate_image(1, &logo(), Rect::new(250.0, 450.0, 100.0, 100.0))
        .unwrap()
        .unwrap();
    assert_eq!(placement.form_depth, 1);
    assert_eq!(placement.ctm.translate_y(), 500.0);
    assert!(verifier
        .locate_image(1, &logo(), Rect::new(0.0, 0.0, 100.0, 100.0))
        .unwrap()
        .is_none());
}

#[test]
fn self_drawing_form_is_an_error_not_a_hang() {
    let mut pdf = PdfBuilder::new();
    let form_id = pdf.doc.new_object_id();
    let form = Stream::new(
        dictionary! {
            "Type" => "XObject",
            "Subtype" => "Form",
            "BBox" => vec![0.into(), 0.into(), 10.into(), 10.into()],
            "Resources" => dictionary! { "XObject" => dictionary! { "Again" => form_id } },
        },
        b"/Again Do".to_vec(),
    );
    pdf.doc.objects.insert(form_id, Object::Stream(form));
    pdf.page(b"/Fm0 Do", dictionary! { "Fm0" => form_id });
    let verifier = PdfVerifier::from_bytes(&pdf.finish()).unwrap();

    let result = verifier.page_contains_image_in_region(1, &logo(), Rect::new(0.0, 0.0, 10.0, 10.0));
    assert!(matches!(result, Err(VerifyError::RecursiveForm(_))));
}

#[test]
fn image_presence_ignores_placement() {
    let mut pdf = PdfBuilder::new();
    let im0 = pdf.image(&logo());
    let form = pdf.form(b"", dictionary! { "Im0" => im0 });
    pdf.page(b"", dictionary! { "Fm0" => form });
    let verifier = PdfVerifier::from_bytes(&pdf.finish()).unwrap();

    assert!(verifier.page_contains_image(1, &logo()).unwrap().is_pass());
    assert!(verifier
        .page_contains_image(1, &RgbImage::new(4, 3))
        .unwrap()
        .is_fail());
    assert!(verifier.page_contains_image(5, &logo()).is_err());
}

#[test]
fn reference_image_is_read_from_file() {
    let dir = tempfile::tempdir().unwrap();
    let written = save_rasters(dir.path(), [&logo()]).unwrap();
    let verifier = PdfVerifier::from_bytes(&placed_logo_pdf()).unwrap();

    assert!(verifier
        .page_contains_image_in_region_file(1, &written[0], Rect::new(0.0, 0.0, 100.0, 100.0))
        .unwrap()
        .is_pass());
    assert!(verifier.page_contains_image_file(1, &written[0]).unwrap().is_pass());
    assert!(verifier
        .page_contains_image_file(1, dir.path().join("missing.png"))
        .is_err());
}

// ── Export ───────────────────────────────────────────────────────────────────

#[test]
fn export_writes_each_image_once() {
    let mut pdf = PdfBuilder::new();
    let im0 = pdf.image(&logo());
    let other = RgbImage::from_pixel(2, 2, Rgb([9, 9, 9]));
    let im1 = pdf.image(&other);
    pdf.page(b"/Im0 Do", dictionary! { "Im0" => im0 });
    pdf.page(b"/Im0 Do /Im1 Do", dictionary! { "Im0" => im0, "Im1" => im1 });
    let verifier = PdfVerifier::from_bytes(&pdf.finish()).unwrap();

    let dir = tempfile::tempdir().unwrap();
    let paths = verifier.export_images(dir.path().join("out")).unwrap();
    assert_eq!(paths.len(), 2);
    assert!(paths[0].ends_with("img-0.png"));
    assert!(paths[1].ends_with("img-1.png"));

    let first = load_reference(&paths[0]).unwrap();
    assert!(rasters_equal(&first, &logo()));
    let second = load_reference(&paths[1]).unwrap();
    assert!(rasters_equal(&second, &other));
}
