//! PDF encoding with `lopdf`.
//!
//! Each page is a single DCT-encoded image XObject drawn at the origin with
//! the page's MediaBox equal to the image's pixel size (1 px = 1 pt). The JPEG
//! bytes are embedded as-is; nothing is re-encoded.

use lopdf::content::{Content, Operation};
use lopdf::{Dictionary, Document, Object, ObjectId, Stream, dictionary};

use super::{AssemblyError, DocumentEncoder};

const PDF_VERSION: &str = "1.5";

/// [`DocumentEncoder`] producing a PDF.
pub struct PdfEncoder {
    doc: Document,
    pages_id: ObjectId,
    page_ids: Vec<ObjectId>,
}

impl PdfEncoder {
    /// Creates an empty document.
    #[must_use]
    pub fn new() -> Self {
        let mut doc = Document::with_version(PDF_VERSION);
        let pages_id = doc.new_object_id();
        Self {
            doc,
            pages_id,
            page_ids: Vec::new(),
        }
    }

    /// Pages added so far.
    #[must_use]
    pub fn page_count(&self) -> usize {
        self.page_ids.len()
    }
}

impl Default for PdfEncoder {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for PdfEncoder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PdfEncoder")
            .field("pages", &self.page_ids.len())
            .finish_non_exhaustive()
    }
}

impl DocumentEncoder for PdfEncoder {
    fn add_page(&mut self, jpeg: &[u8], width: u32, height: u32) -> Result<(), AssemblyError> {
        let index = self.page_ids.len();
        if width == 0 || height == 0 {
            return Err(AssemblyError::InvalidPage {
                index,
                width,
                height,
            });
        }
        let (w, h) = (i64::from(width), i64::from(height));

        let image = Stream::new(
            dictionary! {
                "Type" => "XObject",
                "Subtype" => "Image",
                "Width" => w,
                "Height" => h,
                "ColorSpace" => "DeviceRGB",
                "BitsPerComponent" => 8_i64,
                "Filter" => "DCTDecode",
            },
            jpeg.to_vec(),
        )
        // Already DCT-compressed.
        .with_compression(false);
        let image_id = self.doc.add_object(image);

        let image_name = format!("Im{index}");
        let content = Content {
            operations: vec![
                Operation::new("q", vec![]),
                Operation::new(
                    "cm",
                    vec![
                        w.into(),
                        0_i64.into(),
                        0_i64.into(),
                        h.into(),
                        0_i64.into(),
                        0_i64.into(),
                    ],
                ),
                Operation::new("Do", vec![Object::Name(image_name.clone().into_bytes())]),
                Operation::new("Q", vec![]),
            ],
        };
        let encoded = content
            .encode()
            .map_err(|e| AssemblyError::encode(e.to_string()))?;
        let content_id = self.doc.add_object(Stream::new(Dictionary::new(), encoded));

        let page_id = self.doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => self.pages_id,
            "MediaBox" => vec![0_i64.into(), 0_i64.into(), w.into(), h.into()],
            "Contents" => content_id,
            "Resources" => dictionary! {
                "XObject" => dictionary! {
                    image_name => image_id,
                },
            },
        });
        self.page_ids.push(page_id);
        Ok(())
    }

    fn save(mut self) -> Result<Vec<u8>, AssemblyError> {
        if self.page_ids.is_empty() {
            return Err(AssemblyError::Empty);
        }

        let count = i64::try_from(self.page_ids.len())
            .map_err(|_| AssemblyError::encode("too many pages"))?;
        let kids: Vec<Object> = self.page_ids.iter().map(|id| (*id).into()).collect();
        let pages = dictionary! {
            "Type" => "Pages",
            "Kids" => kids,
            "Count" => count,
        };
        self.doc.objects.insert(self.pages_id, Object::Dictionary(pages));

        let catalog_id = self.doc.add_object(dictionary! {
            "Type" => "Catalog",
            "Pages" => self.pages_id,
        });
        self.doc.trailer.set("Root", catalog_id);

        let mut data = Vec::new();
        self.doc
            .save_to(&mut data)
            .map_err(|e| AssemblyError::encode(e.to_string()))?;
        Ok(data)
    }
}
