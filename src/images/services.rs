use base64ct::{Base64, Encoding};

use crate::error::AppError;

/// Only the declared content type is checked; the bytes are not sniffed.
pub fn is_image_type(content_type: &str) -> bool {
    content_type.starts_with("image/")
}

/// Wraps the whole upload as `data:<content-type>;base64,<payload>`.
pub fn to_data_url(content_type: Option<&str>, body: &[u8]) -> Result<String, AppError> {
    let content_type = match content_type {
        Some(ct) if is_image_type(ct) => ct,
        _ => return Err(AppError::invalid("Uploaded file must be an image")),
    };
    Ok(format!(
        "data:{};base64,{}",
        content_type,
        Base64::encode_string(body)
    ))
}
