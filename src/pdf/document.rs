use crate::error::FileError;
use crate::oracle::BoundingBox;
use lopdf::{Dictionary, Document, Object};
use std::path::Path;

/// Thin wrapper around a loaded `lopdf::Document`.
///
/// This is the only module that touches the PDF object model; the pipeline
/// reads page counts and the cropped marker, extracts single pages, and
/// rewrites page geometry exclusively through here.
pub struct PdfDocument {
    pub doc: Document,
}

impl PdfDocument {
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, FileError> {
        let doc = Document::load(&path)?;
        Ok(PdfDocument { doc })
    }

    pub fn page_count(&self) -> usize {
        self.doc.get_pages().len()
    }

    /// Whether a previous run already cropped this document.
    ///
    /// The marker is the presence of a `Cropped` key in the Info dictionary;
    /// its value is not inspected.
    pub fn is_cropped(&self) -> bool {
        match self.doc.trailer.get(b"Info") {
            Ok(Object::Reference(info_id)) => {
                if let Ok(Object::Dictionary(dict)) = self.doc.get_object(*info_id) {
                    dict.has(b"Cropped")
                } else {
                    false
                }
            }
            Ok(Object::Dictionary(dict)) => dict.has(b"Cropped"),
            _ => false,
        }
    }

    /// Extract one page (0-based) as a new single-page document.
    ///
    /// The cropped marker is always stripped from the result: a freshly
    /// extracted page has not been cropped, whatever its source claimed.
    pub fn extract_page(&self, page_index: usize) -> Result<Document, FileError> {
        let total = self.page_count();
        if page_index >= total {
            return Err(FileError::PageOutOfRange {
                page: page_index,
                total,
            });
        }

        let keep = page_index as u32 + 1;
        let mut new_doc = self.doc.clone();
        let delete: Vec<u32> = (1..=total as u32).filter(|&n| n != keep).collect();
        if !delete.is_empty() {
            new_doc.delete_pages(&delete);
        }
        new_doc.prune_objects();
        new_doc.compress();
        clear_cropped(&mut new_doc);
        Ok(new_doc)
    }

    /// Save to a file.
    pub fn save<P: AsRef<Path>>(doc: &mut Document, path: P) -> Result<(), FileError> {
        doc.save(&path)?;
        Ok(())
    }
}

/// Set the first page's MediaBox to the given rectangle.
pub fn set_media_box(doc: &mut Document, bounds: &BoundingBox) -> Result<(), FileError> {
    let page_id = doc
        .get_pages()
        .values()
        .next()
        .copied()
        .ok_or(FileError::NoPages)?;
    let page = doc.get_dictionary_mut(page_id)?;
    page.set(
        "MediaBox",
        Object::Array(vec![
            Object::Real(bounds.lx as f32),
            Object::Real(bounds.ly as f32),
            Object::Real(bounds.ux as f32),
            Object::Real(bounds.uy as f32),
        ]),
    );
    Ok(())
}

/// Stamp the cropped marker (`Cropped` = `True`) into the Info dictionary,
/// creating the dictionary if the document has none.
pub fn stamp_cropped(doc: &mut Document) {
    let info_id = match doc.trailer.get(b"Info") {
        Ok(Object::Reference(id)) => Some(*id),
        _ => None,
    };
    if let Some(id) = info_id {
        if let Ok(dict) = doc.get_dictionary_mut(id) {
            dict.set("Cropped", Object::string_literal("True"));
            return;
        }
    }
    let mut info = Dictionary::new();
    info.set("Cropped", Object::string_literal("True"));
    let id = doc.add_object(info);
    doc.trailer.set("Info", Object::Reference(id));
}

/// Remove the cropped marker, if any.
pub fn clear_cropped(doc: &mut Document) {
    let info_id = match doc.trailer.get(b"Info") {
        Ok(Object::Reference(id)) => Some(*id),
        _ => None,
    };
    if let Some(id) = info_id {
        if let Ok(dict) = doc.get_dictionary_mut(id) {
            dict.remove(b"Cropped");
        }
    }
}

/// Build an in-memory document with `pages` pages, each carrying a content
/// stream `"<label> <page number>"` so tests can tell pages apart after
/// splitting and renumbering.
#[cfg(test)]
pub(crate) fn sample_document(label: &str, pages: usize) -> Document {
    use lopdf::{dictionary, Stream};

    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();
    let font_id = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Helvetica",
    });

    let mut kids: Vec<Object> = Vec::new();
    for i in 0..pages {
        let content = format!("BT /F1 12 Tf 72 720 Td ({} {}) Tj ET", label, i + 1);
        let content_id = doc.add_object(Stream::new(dictionary! {}, content.into_bytes()));
        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "MediaBox" => vec![0.into(), 0.into(), 612.into(), 792.into()],
            "Contents" => content_id,
            "Resources" => dictionary! {
                "Font" => dictionary! { "F1" => font_id },
            },
        });
        kids.push(page_id.into());
    }

    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => kids,
            "Count" => pages as i64,
        }),
    );
    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", Object::Reference(catalog_id));
    doc
}
