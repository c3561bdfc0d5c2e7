//! Product crop writer backed by the original page image.

use std::cell::Cell;
use std::path::PathBuf;

use image::DynamicImage;
use tracing::debug;

use garimpo_core::layout::Rect;
use garimpo_core::pipeline::ProductCropper;
use garimpo_core::Result;

/// Crops product regions out of the page image and saves them as JPEGs
/// named `page_NN_<CODIGO>.jpg`.
pub struct ImageCropper {
    page_image: DynamicImage,
    out_dir: PathBuf,
    /// Counter for products without a code.
    unnamed: Cell<u32>,
}

impl ImageCropper {
    pub fn new(page_image: DynamicImage, out_dir: impl Into<PathBuf>) -> Self {
        Self {
            page_image,
            out_dir: out_dir.into(),
            unnamed: Cell::new(0),
        }
    }

    fn file_name(&self, page: u32, code: Option<&str>) -> String {
        match code {
            Some(code) => format!("page_{page:02}_{}.jpg", sanitize(code)),
            None => {
                let n = self.unnamed.get() + 1;
                self.unnamed.set(n);
                format!("page_{page:02}_produto_{n:02}.jpg")
            }
        }
    }
}

impl ProductCropper for ImageCropper {
    fn crop(&self, page: u32, code: Option<&str>, region: &Rect) -> Result<Option<String>> {
        let (img_w, img_h) = (self.page_image.width(), self.page_image.height());

        let x = region.x.clamp(0, img_w as i32) as u32;
        let y = region.y.clamp(0, img_h as i32) as u32;
        let w = (region.x2().clamp(0, img_w as i32) as u32).saturating_sub(x);
        let h = (region.y2().clamp(0, img_h as i32) as u32).saturating_sub(y);
        if w == 0 || h == 0 {
            debug!("page {page}: empty crop region, skipping");
            return Ok(None);
        }

        let cropped = self.page_image.crop_imm(x, y, w, h);
        let path = self.out_dir.join(self.file_name(page, code));
        cropped.save(&path)?;

        Ok(Some(path.to_string_lossy().into_owned()))
    }
}

/// Keep codes filesystem-safe: variant separators become hyphens.
fn sanitize(code: &str) -> String {
    code.chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '-' })
        .collect()
}
