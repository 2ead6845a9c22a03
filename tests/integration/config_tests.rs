//! Configuration files as the binary reads them

use std::io::Write;
use tempfile::NamedTempFile;
use zip_ingest::config::{load_config, load_config_with_hash, FailurePolicy};
use zip_ingest::ConfigError;

fn write_config(content: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().expect("Failed to create config file");
    file.write_all(content.as_bytes())
        .expect("Failed to write config file");
    file.flush().expect("Failed to flush config file");
    file
}

#[test]
fn test_production_style_config() {
    let file = write_config(
        r#"
[listing]
url = "https://feeds.example.com/archives/"

[workers]
count = 8
queue-capacity = 4
scratch-dir = "/var/tmp/zip-ingest"
on-error = "skip"
drain-on-complete = true

[redis]
url = "redis://cache.internal:6379/2"
downloaded-key = "news:zips"
processed-key = "news:xmls"
queue = "NEWS_XML"

[user-agent]
crawler-name = "news-ingest"
crawler-version = "2.1.0"
contact-url = "https://example.com/ingest"
"#,
    );

    let (config, hash) = load_config_with_hash(file.path()).expect("Failed to load config");

    assert_eq!(config.workers.count, 8);
    assert_eq!(config.workers.on_error, FailurePolicy::Skip);
    assert!(config.workers.drain_on_complete);
    assert_eq!(config.redis.downloaded_key, "news:zips");
    assert_eq!(config.listing.archive_suffix, ".zip");
    assert_eq!(hash.len(), 64);
}

#[test]
fn test_listing_section_is_required() {
    let file = write_config(
        r#"
[redis]
url = "redis://127.0.0.1:6379"
"#,
    );

    assert!(matches!(
        load_config(file.path()),
        Err(ConfigError::Parse(_))
    ));
}

#[test]
fn test_invalid_values_are_rejected_at_load() {
    let file = write_config(
        r#"
[listing]
url = "https://feeds.example.com/archives/"

[redis]
downloaded-key = "ledger"
processed-key = "ledger"
"#,
    );

    assert!(matches!(
        load_config(file.path()),
        Err(ConfigError::Validation(_))
    ));
}

#[test]
fn test_hash_changes_with_content() {
    let a = write_config("[listing]\nurl = \"https://a.example.com/\"\n");
    let b = write_config("[listing]\nurl = \"https://b.example.com/\"\n");

    let (_, hash_a) = load_config_with_hash(a.path()).expect("Failed to load config");
    let (_, hash_b) = load_config_with_hash(b.path()).expect("Failed to load config");
    assert_ne!(hash_a, hash_b);
}
