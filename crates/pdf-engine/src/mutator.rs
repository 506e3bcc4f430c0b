//! Writable document backend used by export.
//!
//! Every page that receives a drawing gets its original content wrapped in a
//! `q`/`Q` pair first, so whatever graphics state the original leaves behind
//! cannot leak into the appended overlay streams.

use crate::fonts::{encode_win_ansi, StandardFont};
use crate::{page_box, reject_encrypted, PageBox, PdfEngineError, RgbaImage, MAX_PAGE_TREE_DEPTH};
use lopdf::content::{Content, Operation};
use lopdf::{dictionary, Dictionary, Document, Object, ObjectId, Stream, StringFormat};
use pagemark_model::{PageSize, Rgb};
use std::collections::HashMap;

/// Leading between lines of multi-line text, as a multiple of the font size.
pub const LINE_HEIGHT_FACTOR: f32 = 1.2;

/// Rectangle in document space: points, origin bottom-left of the page.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DocRect {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl DocRect {
    pub fn covering(size: PageSize) -> Self {
        Self { x: 0.0, y: 0.0, width: size.width_pt, height: size.height_pt }
    }
}

/// Text to draw. `x`/`y` is the baseline origin of the first line.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TextRun<'a> {
    pub text: &'a str,
    pub font_family: &'a str,
    pub size_pt: f32,
    pub color: Rgb,
    pub x: f32,
    pub y: f32,
}

/// Mutable copy of a document. Page indices are zero-based.
pub trait DocumentMutator: Sized {
    fn load(bytes: &[u8]) -> Result<Self, PdfEngineError>;
    fn page_count(&self) -> u32;
    fn page_size(&self, page_index: u32) -> Result<PageSize, PdfEngineError>;
    /// Draws `image` stretched over `rect`, honoring its alpha channel.
    fn draw_image(
        &mut self,
        page_index: u32,
        image: &RgbaImage,
        rect: DocRect,
    ) -> Result<(), PdfEngineError>;
    fn draw_text(&mut self, page_index: u32, run: &TextRun<'_>) -> Result<(), PdfEngineError>;
    fn finalize(self) -> Result<Vec<u8>, PdfEngineError>;
}

#[derive(Debug, Clone, Copy)]
struct PageSlot {
    id: ObjectId,
    page_box: PageBox,
    isolated: bool,
}

pub struct LopdfMutator {
    doc: Document,
    pages: Vec<PageSlot>,
    fonts: HashMap<StandardFont, ObjectId>,
    image_counter: u32,
}

impl LopdfMutator {
    fn slot_index(&self, page_index: u32) -> Result<usize, PdfEngineError> {
        let index = page_index as usize;
        if index < self.pages.len() {
            Ok(index)
        } else {
            Err(PdfEngineError::PageOutOfRange {
                page: page_index,
                page_count: self.pages.len() as u32,
            })
        }
    }

    /// Returns the slot for `page_index`, wrapping its original content on first use.
    fn prepare_page(&mut self, page_index: u32) -> Result<PageSlot, PdfEngineError> {
        let index = self.slot_index(page_index)?;
        if !self.pages[index].isolated {
            self.isolate_contents(self.pages[index].id)?;
            self.pages[index].isolated = true;
        }
        Ok(self.pages[index])
    }

    fn isolate_contents(&mut self, page_id: ObjectId) -> Result<(), PdfEngineError> {
        let existing = {
            let page = self.doc.get_dictionary(page_id)?;
            match page.get(b"Contents") {
                Ok(Object::Array(items)) => items.clone(),
                Ok(Object::Reference(id)) => match self.doc.get_object(*id) {
                    Ok(Object::Array(items)) => items.clone(),
                    _ => vec![Object::Reference(*id)],
                },
                _ => Vec::new(),
            }
        };

        let push_id = self.doc.add_object(Stream::new(dictionary! {}, b"q\n".to_vec()));
        let pop_id = self.doc.add_object(Stream::new(dictionary! {}, b"\nQ\n".to_vec()));

        let mut contents = Vec::with_capacity(existing.len() + 2);
        contents.push(Object::Reference(push_id));
        contents.extend(existing);
        contents.push(Object::Reference(pop_id));

        self.doc.get_dictionary_mut(page_id)?.set("Contents", Object::Array(contents));
        Ok(())
    }

    fn append_operations(
        &mut self,
        page_id: ObjectId,
        operations: Vec<Operation>,
    ) -> Result<(), PdfEngineError> {
        let mut bytes = b"\n".to_vec();
        bytes.extend(Content { operations }.encode()?);
        let stream_id = self.doc.add_object(Stream::new(dictionary! {}, bytes));

        let page = self.doc.get_dictionary_mut(page_id)?;
        match page.get_mut(b"Contents") {
            Ok(Object::Array(items)) => items.push(Object::Reference(stream_id)),
            _ => page.set("Contents", vec![Object::Reference(stream_id)]),
        }
        Ok(())
    }

    fn resolve_dict<'a>(&'a self, object: &'a Object) -> Option<&'a Dictionary> {
        match object {
            Object::Reference(id) => self.doc.get_dictionary(*id).ok(),
            Object::Dictionary(dict) => Some(dict),
            _ => None,
        }
    }

    /// The resource dictionary in effect for a page, including one inherited
    /// from an ancestor in the page tree.
    fn effective_resources(
        &self,
        page_id: ObjectId,
        page_number: u32,
    ) -> Result<Dictionary, PdfEngineError> {
        let mut current = Some(page_id);
        let mut depth = 0;

        while let Some(id) = current {
            if depth > MAX_PAGE_TREE_DEPTH {
                return Err(PdfEngineError::MalformedPage {
                    page: page_number,
                    reason: "page tree is too deep or cyclic".to_owned(),
                });
            }
            depth += 1;

            let dict = self.doc.get_dictionary(id)?;
            if let Ok(resources) = dict.get(b"Resources") {
                return Ok(self.resolve_dict(resources).cloned().unwrap_or_else(Dictionary::new));
            }
            current = dict.get(b"Parent").and_then(Object::as_reference).ok();
        }

        Ok(Dictionary::new())
    }

    /// Adds `name` to a resource category of one page. Shared dictionaries are
    /// copied onto the page before being touched, so other pages never see
    /// the new entry.
    fn register_resource(
        &mut self,
        page_index: u32,
        page_id: ObjectId,
        category: &str,
        name: &str,
        value: Object,
    ) -> Result<(), PdfEngineError> {
        let mut resources = self.effective_resources(page_id, page_index + 1)?;
        let mut entries = resources
            .get(category.as_bytes())
            .ok()
            .and_then(|object| self.resolve_dict(object))
            .cloned()
            .unwrap_or_else(Dictionary::new);

        entries.set(name, value);
        resources.set(category, Object::Dictionary(entries));
        self.doc.get_dictionary_mut(page_id)?.set("Resources", Object::Dictionary(resources));
        Ok(())
    }

    fn font_object(&mut self, font: StandardFont) -> ObjectId {
        if let Some(id) = self.fonts.get(&font) {
            return *id;
        }

        let id = self.doc.add_object(dictionary! {
            "Type" => "Font",
            "Subtype" => "Type1",
            "BaseFont" => font.base_font(),
            "Encoding" => "WinAnsiEncoding",
        });
        self.fonts.insert(font, id);
        id
    }

    fn add_image_xobject(&mut self, image: &RgbaImage) -> ObjectId {
        let (width, height) = image.dimensions();
        let pixel_count = width as usize * height as usize;
        let mut rgb = Vec::with_capacity(pixel_count * 3);
        let mut alpha = Vec::with_capacity(pixel_count);

        for pixel in image.pixels() {
            rgb.extend_from_slice(&pixel.0[..3]);
            alpha.push(pixel.0[3]);
        }

        let smask_id = self.doc.add_object(Stream::new(
            dictionary! {
                "Type" => "XObject",
                "Subtype" => "Image",
                "Width" => width as i64,
                "Height" => height as i64,
                "ColorSpace" => "DeviceGray",
                "BitsPerComponent" => 8,
            },
            alpha,
        ));

        self.doc.add_object(Stream::new(
            dictionary! {
                "Type" => "XObject",
                "Subtype" => "Image",
                "Width" => width as i64,
                "Height" => height as i64,
                "ColorSpace" => "DeviceRGB",
                "BitsPerComponent" => 8,
                "SMask" => smask_id,
            },
            rgb,
        ))
    }
}

impl DocumentMutator for LopdfMutator {
    fn load(bytes: &[u8]) -> Result<Self, PdfEngineError> {
        reject_encrypted(bytes)?;
        let doc = Document::load_mem(bytes)?;

        let mut pages = Vec::new();
        for (number, id) in doc.get_pages() {
            pages.push(PageSlot { id, page_box: page_box(&doc, id, number)?, isolated: false });
        }

        Ok(Self { doc, pages, fonts: HashMap::new(), image_counter: 0 })
    }

    fn page_count(&self) -> u32 {
        self.pages.len() as u32
    }

    fn page_size(&self, page_index: u32) -> Result<PageSize, PdfEngineError> {
        let index = self.slot_index(page_index)?;
        Ok(self.pages[index].page_box.size)
    }

    fn draw_image(
        &mut self,
        page_index: u32,
        image: &RgbaImage,
        rect: DocRect,
    ) -> Result<(), PdfEngineError> {
        let slot = self.prepare_page(page_index)?;
        let image_id = self.add_image_xobject(image);

        self.image_counter += 1;
        let name = format!("PgMkIm{}", self.image_counter);
        self.register_resource(page_index, slot.id, "XObject", &name, Object::Reference(image_id))?;

        let origin = slot.page_box;
        let operations = vec![
            Operation::new("q", vec![]),
            Operation::new(
                "cm",
                vec![
                    rect.width.into(),
                    0.into(),
                    0.into(),
                    rect.height.into(),
                    (origin.origin_x + rect.x).into(),
                    (origin.origin_y + rect.y).into(),
                ],
            ),
            Operation::new("Do", vec![Object::Name(name.into_bytes())]),
            Operation::new("Q", vec![]),
        ];
        self.append_operations(slot.id, operations)
    }

    fn draw_text(&mut self, page_index: u32, run: &TextRun<'_>) -> Result<(), PdfEngineError> {
        if run.text.is_empty() {
            return Ok(());
        }

        let (font, fell_back) = StandardFont::resolve(run.font_family);
        if fell_back {
            log::debug!(
                "font family {:?} is not available, drawing with {}",
                run.font_family,
                font.base_font()
            );
        }

        let slot = self.prepare_page(page_index)?;
        let font_id = self.font_object(font);
        self.register_resource(
            page_index,
            slot.id,
            "Font",
            font.resource_name(),
            Object::Reference(font_id),
        )?;

        let (r, g, b) = run.color.to_normalized();
        let mut operations = vec![
            Operation::new("q", vec![]),
            Operation::new("BT", vec![]),
            Operation::new("rg", vec![r.into(), g.into(), b.into()]),
            Operation::new("Tf", vec![font.resource_name().into(), run.size_pt.into()]),
            Operation::new("TL", vec![(run.size_pt * LINE_HEIGHT_FACTOR).into()]),
            Operation::new(
                "Td",
                vec![
                    (slot.page_box.origin_x + run.x).into(),
                    (slot.page_box.origin_y + run.y).into(),
                ],
            ),
        ];

        for (line_number, line) in run.text.split('\n').enumerate() {
            if line_number > 0 {
                operations.push(Operation::new("T*", vec![]));
            }
            let encoded = encode_win_ansi(line.trim_end_matches('\r'));
            operations.push(Operation::new(
                "Tj",
                vec![Object::String(encoded, StringFormat::Literal)],
            ));
        }

        operations.push(Operation::new("ET", vec![]));
        operations.push(Operation::new("Q", vec![]));
        self.append_operations(slot.id, operations)
    }

    fn finalize(mut self) -> Result<Vec<u8>, PdfEngineError> {
        self.doc.compress();
        let mut output = Vec::new();
        self.doc.save_to(&mut output)?;
        Ok(output)
    }
}
