use std::path::{Path, PathBuf};

use lopdf::{Dictionary, Document, Object, ObjectId};

use crate::error::{InvoiceError, Result};
use crate::io::{PdfReader, PdfWriter};

/// Page attributes a page may inherit from its ancestors in the page tree.
const INHERITABLE_KEYS: [&[u8]; 4] = [b"Resources", b"MediaBox", b"CropBox", b"Rotate"];

/// Guard against cyclic `Parent` chains in malformed files.
const MAX_TREE_DEPTH: usize = 64;

/// Summary of a completed merge.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MergeStatistics {
    /// Number of source documents concatenated.
    pub files_merged: usize,
    /// Number of pages in the written document.
    pub total_pages: usize,
}

/// Concatenates the pages of several PDF documents, in append order.
///
/// Sources are loaded as they are appended, so a broken file is reported
/// before anything is written.
#[derive(Default)]
pub struct PdfMerger {
    sources: Vec<(PathBuf, Document)>,
}

impl PdfMerger {
    /// Create an empty merger.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append all pages of the PDF at `path`.
    ///
    /// # Errors
    ///
    /// Returns [`InvoiceError::FailedToLoadPdf`] or
    /// [`InvoiceError::EncryptedPdf`] if the file cannot be used.
    pub fn append<P: AsRef<Path>>(&mut self, path: P) -> Result<&mut Self> {
        let path = path.as_ref();
        let doc = PdfReader::read(path)?;
        self.sources.push((path.to_path_buf(), doc));
        Ok(self)
    }

    /// Build the concatenated document.
    ///
    /// Content streams are carried over untouched.
    ///
    /// # Errors
    ///
    /// Returns [`InvoiceError::MergeFailed`] if nothing was appended or a page
    /// tree is malformed.
    pub fn merge(self) -> Result<Document> {
        let mut sources = self.sources.into_iter();
        let (first_path, mut merged) = sources
            .next()
            .ok_or_else(|| InvoiceError::merge_failed("no documents to merge"))?;

        tracing::debug!(base = %first_path.display(), "Merging documents");
        let mut max_id = merged.max_id;

        for (path, mut doc) in sources {
            inherit_page_attributes(&mut doc);

            doc.renumber_objects_with(max_id + 1);
            max_id = doc.max_id;

            let page_ids: Vec<ObjectId> = doc.get_pages().into_values().collect();
            tracing::debug!(source = %path.display(), pages = page_ids.len(), "Appending pages");

            merged.objects.extend(doc.objects);
            append_pages_to_page_tree(&mut merged, &page_ids)?;
        }

        merged.max_id = max_id;
        merged.renumber_objects();

        Ok(merged)
    }

    /// Merge and write the result to `output`, then release the sources.
    ///
    /// # Errors
    ///
    /// Returns any error from [`PdfMerger::merge`] or [`PdfWriter::write`].
    pub fn write_and_close<P: AsRef<Path>>(self, output: P) -> Result<MergeStatistics> {
        let files_merged = self.sources.len();
        let mut doc = self.merge()?;
        PdfWriter::write(&mut doc, output)?;

        Ok(MergeStatistics {
            files_merged,
            total_pages: doc.get_pages().len(),
        })
    }
}

/// Append `page_ids` to the root page tree of `merged` and reparent them.
fn append_pages_to_page_tree(merged: &mut Document, page_ids: &[ObjectId]) -> Result<()> {
    let pages_id = merged.catalog()?.get(b"Pages")?.as_reference()?;

    for &id in page_ids {
        if let Ok(page) = merged.get_object_mut(id).and_then(Object::as_dict_mut) {
            page.set("Parent", Object::Reference(pages_id));
        }
    }

    let pages_dict = merged.get_object_mut(pages_id)?.as_dict_mut()?;

    let kids = pages_dict.get_mut(b"Kids")?.as_array_mut()?;
    kids.extend(page_ids.iter().map(|&id| Object::Reference(id)));

    let count = pages_dict.get(b"Count")?.as_i64()?;
    pages_dict.set("Count", Object::Integer(count + page_ids.len() as i64));

    Ok(())
}

/// Copy inherited attributes onto each page so they survive reparenting.
fn inherit_page_attributes(doc: &mut Document) {
    for page_id in doc.get_pages().into_values() {
        let Ok(page) = doc.get_dictionary(page_id) else {
            continue;
        };

        let inherited: Vec<(&[u8], Object)> = INHERITABLE_KEYS
            .into_iter()
            .filter(|key| !page.has(key))
            .filter_map(|key| find_inherited(doc, page, key).map(|value| (key, value)))
            .collect();

        if inherited.is_empty() {
            continue;
        }

        if let Ok(page) = doc.get_dictionary_mut(page_id) {
            for (key, value) in inherited {
                page.set(key.to_vec(), value);
            }
        }
    }
}

fn find_inherited(doc: &Document, page: &Dictionary, key: &[u8]) -> Option<Object> {
    let mut parent = page.get(b"Parent").and_then(Object::as_reference).ok();

    for _ in 0..MAX_TREE_DEPTH {
        let node = doc.get_dictionary(parent?).ok()?;
        if let Ok(value) = node.get(key) {
            return Some(value.clone());
        }
        parent = node.get(b"Parent").and_then(Object::as_reference).ok();
    }

    None
}
