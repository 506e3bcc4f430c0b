use crate::PdfEngineError;
use lopdf::content::{Content, Operation};
use lopdf::{dictionary, Document, Object, Stream, StringFormat};
use pagemark_model::PageSize;

/// Builds a document whose pages only carry a small "Page N" label.
///
/// Fonts are declared once on the page tree root and inherited by every page,
/// which is how many producers lay out their resources.
pub fn build_numbered_pages(page_sizes: &[PageSize]) -> Result<Vec<u8>, PdfEngineError> {
    if page_sizes.is_empty() {
        return Err(PdfEngineError::Backend("a document needs at least one page".to_owned()));
    }

    let mut doc = Document::with_version("1.7");
    let pages_id = doc.new_object_id();
    let font_id = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Helvetica",
    });
    let resources_id = doc.add_object(dictionary! {
        "Font" => dictionary! { "F1" => font_id },
    });

    let mut kids = Vec::with_capacity(page_sizes.len());
    for (index, size) in page_sizes.iter().enumerate() {
        let label = Object::String(format!("Page {}", index + 1).into_bytes(), StringFormat::Literal);
        let content = Content {
            operations: vec![
                Operation::new("BT", vec![]),
                Operation::new("Tf", vec!["F1".into(), 12.into()]),
                Operation::new("Td", vec![36.into(), 36.into()]),
                Operation::new("Tj", vec![label]),
                Operation::new("ET", vec![]),
            ],
        };
        let content_id = doc.add_object(Stream::new(dictionary! {}, content.encode()?));
        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "MediaBox" => vec![0.into(), 0.into(), size.width_pt.into(), size.height_pt.into()],
            "Contents" => content_id,
        });
        kids.push(Object::Reference(page_id));
    }

    let count = kids.len() as i64;
    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => kids,
            "Count" => count,
            "Resources" => resources_id,
        }),
    );
    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);

    let mut output = Vec::new();
    doc.save_to(&mut output)?;
    Ok(output)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builds_requested_pages_with_sizes() {
        let sizes = [PageSize::new(612.0, 792.0), PageSize::new(300.0, 200.0)];
        let bytes = build_numbered_pages(&sizes).expect("build should succeed");

        let doc = Document::load_mem(&bytes).expect("output should parse");
        let pages = doc.get_pages();
        assert_eq!(pages.len(), 2);

        let second = doc.get_dictionary(pages[&2]).expect("page dict");
        let media_box = second.get(b"MediaBox").and_then(Object::as_array).expect("media box");
        assert_eq!(media_box[2].as_float().expect("width"), 300.0);
        assert_eq!(media_box[3].as_float().expect("height"), 200.0);
    }

    #[test]
    fn zero_pages_is_an_error() {
        assert!(build_numbered_pages(&[]).is_err());
    }
}
