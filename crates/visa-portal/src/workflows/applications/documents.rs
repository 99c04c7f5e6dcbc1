use mime::Mime;

use super::domain::DocumentUpload;
use crate::workflows::catalog::ValidationError;

pub const MAX_DOCUMENT_BYTES: u64 = 10 * 1024 * 1024;

fn allowed_types() -> [Mime; 3] {
    [mime::APPLICATION_PDF, mime::IMAGE_JPEG, mime::IMAGE_PNG]
}

/// Guess the content type from the file name and check it against the allow-list and size cap.
pub fn check_document(upload: &DocumentUpload) -> Result<Mime, ValidationError> {
    if upload.document_name.trim().is_empty() || upload.file_name.trim().is_empty() {
        return Err(ValidationError::MissingFields {
            fields: vec!["document_name", "file_name"],
        });
    }
    if upload.size_bytes == 0 {
        return Err(ValidationError::Invalid {
            field: "size_bytes",
            reason: format!("{} is empty", upload.file_name),
        });
    }
    if upload.size_bytes > MAX_DOCUMENT_BYTES {
        return Err(ValidationError::Invalid {
            field: "size_bytes",
            reason: format!("{} exceeds the 10 MiB limit", upload.file_name),
        });
    }

    let guessed = mime_guess::from_path(&upload.file_name).first();
    match guessed {
        Some(mime)
            if allowed_types()
                .iter()
                .any(|allowed| allowed.essence_str() == mime.essence_str()) =>
        {
            Ok(mime)
        }
        _ => Err(ValidationError::Invalid {
            field: "file_name",
            reason: format!("{} must be a PDF, JPEG or PNG file", upload.file_name),
        }),
    }
}

/// Validate every upload and record the detected content type on each.
pub fn classify_documents(uploads: &mut [DocumentUpload]) -> Result<(), ValidationError> {
    for upload in uploads.iter_mut() {
        let mime = check_document(upload)?;
        upload.content_type = Some(mime.essence_str().to_string());
    }
    Ok(())
}
