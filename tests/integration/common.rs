//! Shared fixtures for the integration tests

use std::io::{Cursor, Write};
use std::path::Path;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};
use zip::write::FileOptions;
use zip_ingest::Config;

/// Builds an in-memory zip archive with the given entries, in order
pub fn zip_bytes(entries: &[(&str, &str)]) -> Vec<u8> {
    let mut writer = zip::ZipWriter::new(Cursor::new(Vec::new()));
    for (name, content) in entries {
        writer
            .start_file(*name, FileOptions::default())
            .expect("Failed to start zip entry");
        writer
            .write_all(content.as_bytes())
            .expect("Failed to write zip entry");
    }
    writer
        .finish()
        .expect("Failed to finish zip archive")
        .into_inner()
}

/// Serves an HTML listing page with one anchor per link at `/listing/`
pub async fn mount_listing(server: &MockServer, links: &[String]) {
    let mut page = String::from("<html><head><title>Archives</title></head><body><ul>\n");
    for link in links {
        page.push_str(&format!("<li><a href=\"{}\">{}</a></li>\n", link, link));
    }
    page.push_str("</ul></body></html>");

    Mock::given(method("GET"))
        .and(path("/listing/"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string(page)
                .insert_header("content-type", "text/html"),
        )
        .mount(server)
        .await;
}

/// Serves an archive at `route`, expecting exactly `hits` requests for it
pub async fn mount_archive(server: &MockServer, route: &str, body: Vec<u8>, hits: u64) {
    Mock::given(method("GET"))
        .and(path(route))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(body))
        .expect(hits)
        .mount(server)
        .await;
}

/// A config pointing at the mock listing page, with two workers
pub fn test_config(server: &MockServer, scratch_dir: &Path) -> Config {
    let mut config = Config::new(format!("{}/listing/", server.uri()));
    config.workers.count = 2;
    config.workers.scratch_dir = Some(scratch_dir.to_path_buf());
    config
}

/// True if `dir` holds no files
pub fn is_empty_dir(dir: &Path) -> bool {
    std::fs::read_dir(dir)
        .expect("Failed to read scratch dir")
        .next()
        .is_none()
}
