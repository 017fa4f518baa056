use std::collections::HashMap;

use axum::extract::Multipart;

use super::services::UploadItem;
use crate::error::AppError;

/// Multipart body with at most one image file and any number of text fields.
#[derive(Debug, Default)]
pub struct ImageForm {
    pub text: HashMap<String, String>,
    pub file: Option<UploadItem>,
}

impl ImageForm {
    pub fn text(&self, name: &str) -> Option<&str> {
        self.text.get(name).map(String::as_str)
    }
}

/// Reads every part; `file_field` is the part expected to carry the image.
/// An empty file part counts as no file.
pub async fn read_image_form(mut mp: Multipart, file_field: &str) -> Result<ImageForm, AppError> {
    let mut form = ImageForm::default();
    while let Some(field) = mp.next_field().await? {
        let Some(name) = field.name().map(str::to_string) else {
            continue;
        };
        if name == file_field {
            let content_type = field
                .content_type()
                .unwrap_or("application/octet-stream")
                .to_string();
            let body = field.bytes().await?;
            if body.is_empty() {
                continue;
            }
            form.file = Some(UploadItem::new(body, &content_type)?);
        } else {
            let value = field.text().await?;
            form.text.insert(name, value);
        }
    }
    Ok(form)
}
