//! NetFontSource against local files

use scenefont_net::*;

#[test]
fn test_reads_file_url() {
    let dir = std::env::temp_dir().join(format!("scenefont-net-{}", std::process::id()));
    std::fs::create_dir_all(&dir).unwrap();
    let path = dir.join("Lilita One.woff2");
    std::fs::write(&path, b"wOF2fake").unwrap();

    let url = Url::from_file_path(&path).unwrap();
    assert!(url.as_str().contains("Lilita%20One.woff2"));

    let source = NetFontSource::new(NetOptions::default()).unwrap();
    let bytes = smol::block_on(source.fetch(&url)).unwrap();
    assert_eq!(bytes, b"wOF2fake");

    std::fs::remove_dir_all(&dir).unwrap();
}

#[test]
fn test_missing_file_is_io_error() {
    let path = std::env::temp_dir().join("scenefont-net-missing").join("Virgil.woff2");
    let url = Url::from_file_path(&path).unwrap();

    let source = NetFontSource::new(NetOptions::default()).unwrap();
    let err = smol::block_on(source.fetch(&url)).unwrap_err();
    assert!(matches!(err, FetchError::Io(_)));
    assert_eq!(err.status(), None);
}

async fn fetch_with<S: FontSource>(source: S, url: &Url) -> Result<Vec<u8>, FetchError> {
    source.fetch(url).await
}

#[test]
fn test_borrowed_source_delegates() {
    let source = MemoryFontSource::new().with_font("http://localhost/Virgil.woff2", vec![9]);
    let url = Url::parse("http://localhost/Virgil.woff2").unwrap();
    assert_eq!(smol::block_on(fetch_with(&source, &url)).unwrap(), vec![9]);
    assert_eq!(source.requests().len(), 1);
}
