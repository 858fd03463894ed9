use bytes::Bytes;
use docvault_core::models::{DocumentType, RequestContext, UploadRequest};

pub const OWNER: &str = "owner-7f3a";

/// A PDF of exactly `size` bytes with no threat markers
pub fn pdf_of_size(size: usize) -> Bytes {
    let head = b"%PDF-1.4\n";
    let tail = b"\n%%EOF";
    let mut data = Vec::with_capacity(size);
    data.extend_from_slice(head);
    data.resize(size.saturating_sub(tail.len()).max(head.len()), b' ');
    data.extend_from_slice(tail);
    data.truncate(size.max(head.len()));
    Bytes::from(data)
}

/// A PDF whose body is `text`
pub fn pdf_with_text(text: &str) -> Bytes {
    Bytes::from(format!("%PDF-1.4\n1 0 obj\n({})\nendobj\n%%EOF", text))
}

pub fn minimal_png() -> Bytes {
    Bytes::from_static(&[
        0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A, // PNG signature
        0x00, 0x00, 0x00, 0x0D, 0x49, 0x48, 0x44, 0x52, // IHDR chunk
        0x00, 0x00, 0x00, 0x01, 0x00, 0x00, 0x00, 0x01, // 1x1 dimensions
        0x08, 0x02, 0x00, 0x00, 0x00, 0x90, 0x77, 0x53, 0xDE, // IHDR data + CRC
        0x00, 0x00, 0x00, 0x00, 0x49, 0x45, 0x4E, 0x44, // IEND chunk
        0xAE, 0x42, 0x60, 0x82, // IEND CRC
    ])
}

pub fn minimal_jpeg() -> Bytes {
    Bytes::from_static(&[0xFF, 0xD8, 0xFF, 0xE0, 0x00, 0x10, b'J', b'F', b'I', b'F', 0x00, 0xFF, 0xD9])
}

pub fn pdf_request(data: Bytes, document_type: DocumentType) -> UploadRequest {
    UploadRequest::new(data, "application/pdf", "scan.pdf", document_type, OWNER)
}

pub fn identity_pdf() -> UploadRequest {
    pdf_request(pdf_with_text("Passport data page"), DocumentType::Identity)
}

pub fn with_client(request: UploadRequest, client_id: &str) -> UploadRequest {
    request.with_context(RequestContext {
        client_id: Some(client_id.to_string()),
        client_ip: Some("203.0.113.9".to_string()),
        ..Default::default()
    })
}
