//! Cross-check extraction against multer on well-formed bodies

use bytes::Bytes;
use courier_multipart::{extract, Boundary, MultipartEncoder};

async fn parse_with_multer(body: Bytes, boundary: &str) -> Vec<(Bytes, Option<String>)> {
    let stream = futures_util::stream::once(async move { Ok::<Bytes, std::io::Error>(body) });
    let mut multipart = multer::Multipart::new(stream, boundary);

    let mut parts = Vec::new();
    while let Some(field) = multipart.next_field().await.unwrap() {
        let filename = field.file_name().map(str::to_string);
        let data = field.bytes().await.unwrap();
        parts.push((data, filename));
    }
    parts
}

async fn assert_agrees(encoder: MultipartEncoder) {
    let boundary = encoder.boundary().as_str().to_string();
    let content_type = encoder.content_type();
    let body = encoder.finish();

    let ours = extract(body.clone(), Some(&content_type)).into_pairs();
    let theirs = parse_with_multer(body, &boundary).await;

    assert_eq!(ours, theirs);
}

#[tokio::test]
async fn test_agrees_on_single_file() {
    let mut encoder = MultipartEncoder::new(Boundary::new("XYZ").unwrap());
    encoder.add_file("f", Some("a.txt"), b"hello");
    assert_agrees(encoder).await;
}

#[tokio::test]
async fn test_agrees_on_mixed_fields_and_files() {
    let mut encoder = MultipartEncoder::new(Boundary::new("----courier7MA4YWxk").unwrap());
    encoder
        .add_text("title", "Holiday photos")
        .add_file("photo", Some("beach.jpg"), &[0xFF, 0xD8, 0xFF, 0xE0, 0x00, 0x10])
        .add_file("photo", Some("sunset.jpg"), b"\r\n\r\nnot headers\r\n")
        .add_text("empty", "");
    assert_agrees(encoder).await;
}

#[tokio::test]
async fn test_agrees_on_binary_payload() {
    let payload: Vec<u8> = (0..4096u32).map(|i| (i * 31 % 251) as u8).collect();
    let mut encoder = MultipartEncoder::new(Boundary::new("bin-boundary").unwrap());
    encoder.add_file("blob", Some("blob.bin"), &payload);
    assert_agrees(encoder).await;
}
