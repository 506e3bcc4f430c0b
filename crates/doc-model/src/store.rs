//! Page annotation store.
//!
//! Owns the captured state of every page the user has left. Entries are only
//! ever replaced wholesale by [`AnnotationStore::flush`]; there is no partial
//! update and no removal during a session.

use crate::freehand::FreehandLayer;
use crate::page::{PageIndex, ZoomFactor};
use crate::text_box::TextBoxRecord;
use std::collections::BTreeMap;

#[derive(Debug, Clone, PartialEq)]
pub struct PageAnnotationEntry {
    pub freehand: Option<FreehandLayer>,
    pub text_boxes: Vec<TextBoxRecord>,
    /// Zoom whose edit space the text-box geometry is expressed in.
    pub capture_zoom: ZoomFactor,
}

static EMPTY_ENTRY: PageAnnotationEntry =
    PageAnnotationEntry { freehand: None, text_boxes: Vec::new(), capture_zoom: ZoomFactor::ONE };

impl Default for PageAnnotationEntry {
    fn default() -> Self {
        EMPTY_ENTRY.clone()
    }
}

impl PageAnnotationEntry {
    pub fn is_empty(&self) -> bool {
        self.freehand.is_none() && self.text_boxes.is_empty()
    }
}

#[derive(Debug, Clone, Default)]
pub struct AnnotationStore {
    entries: BTreeMap<PageIndex, PageAnnotationEntry>,
}

impl AnnotationStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces the entry for `page` and returns whatever it displaced.
    pub fn flush(
        &mut self,
        page: PageIndex,
        freehand: Option<FreehandLayer>,
        text_boxes: Vec<TextBoxRecord>,
        capture_zoom: ZoomFactor,
    ) -> Option<PageAnnotationEntry> {
        self.entries.insert(page, PageAnnotationEntry { freehand, text_boxes, capture_zoom })
    }

    /// Entry for `page`, or the shared empty entry if the page was never flushed.
    pub fn get(&self, page: PageIndex) -> &PageAnnotationEntry {
        self.entries.get(&page).unwrap_or(&EMPTY_ENTRY)
    }

    pub fn contains(&self, page: PageIndex) -> bool {
        self.entries.contains_key(&page)
    }

    /// Pages that hold at least one annotation, ascending.
    pub fn annotated_pages(&self) -> impl Iterator<Item = PageIndex> + '_ {
        self.entries.iter().filter(|(_, entry)| !entry.is_empty()).map(|(page, _)| *page)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::coords::EditRect;
    use crate::text_box::TextContent;

    fn page(n: u32) -> PageIndex {
        PageIndex::new(n).expect("valid page")
    }

    fn text_box(text: &str) -> TextBoxRecord {
        TextBoxRecord::new(
            TextContent::default().with_text(text),
            EditRect::new(50.0, 50.0, 100.0, 30.0),
        )
    }

    #[test]
    fn unflushed_pages_read_as_empty() {
        let store = AnnotationStore::new();

        for n in 1..=5 {
            let entry = store.get(page(n));
            assert!(entry.freehand.is_none());
            assert!(entry.text_boxes.is_empty());
            assert!(!store.contains(page(n)));
        }
    }

    #[test]
    fn second_flush_replaces_instead_of_merging() {
        let mut store = AnnotationStore::new();
        store.flush(page(2), None, vec![text_box("first"), text_box("second")], ZoomFactor::ONE);

        let zoom = ZoomFactor::new(2.0).expect("valid zoom");
        let displaced = store.flush(page(2), None, vec![text_box("third")], zoom);

        assert_eq!(displaced.map(|entry| entry.text_boxes.len()), Some(2));
        let entry = store.get(page(2));
        assert_eq!(entry.text_boxes, vec![text_box("third")]);
        assert_eq!(entry.capture_zoom, zoom);
    }

    #[test]
    fn flushing_empty_state_keeps_the_entry_but_not_as_annotated() {
        let mut store = AnnotationStore::new();
        store.flush(page(1), None, vec![text_box("x")], ZoomFactor::ONE);
        store.flush(page(3), None, Vec::new(), ZoomFactor::ONE);

        assert!(store.contains(page(3)));
        assert_eq!(store.len(), 2);
        assert_eq!(store.annotated_pages().collect::<Vec<_>>(), vec![page(1)]);
    }
}
