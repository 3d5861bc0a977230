//! Catalog source loading
//!
//! A catalog source is a directory of definition files, a local zip
//! archive, or an `http(s)` URL pointing at one. Files ending `.yml` or
//! `.yaml` are service definitions; everything else is ignored.

use std::fs;
use std::io::{Cursor, Read};
use std::path::Path;

use crate::error::{CatalogError, Result};
use crate::service::{add_service_definition, ServiceMap};

/// Load a service map from any supported source
pub async fn parse_any(source: &str) -> Result<ServiceMap> {
    if source.starts_with("http://") || source.starts_with("https://") {
        return parse_zip_url(source).await;
    }

    let metadata = fs::metadata(source)?;
    if metadata.is_dir() {
        parse_dir(Path::new(source))
    } else {
        parse_zip_file(Path::new(source))
    }
}

/// Parse all definition files under a directory, recursively
pub fn parse_dir(dir: &Path) -> Result<ServiceMap> {
    let mut services = ServiceMap::new();
    visit_dir(dir, &mut services)?;

    if services.is_empty() {
        return Err(CatalogError::EmptySource {
            origin: dir.display().to_string(),
        });
    }

    Ok(services)
}

fn visit_dir(dir: &Path, services: &mut ServiceMap) -> Result<()> {
    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        let path = entry.path();

        if path.is_dir() {
            visit_dir(&path, services)?;
            continue;
        }

        if !is_definition_file(&path) {
            continue;
        }

        let input = fs::read_to_string(&path)?;
        add_service_definition(services, &input, &path.display().to_string())?;
    }

    Ok(())
}

/// Parse a local zip archive of definition files
pub fn parse_zip_file(path: &Path) -> Result<ServiceMap> {
    let bytes = fs::read(path)?;
    parse_zip_bytes(&bytes, &path.display().to_string())
}

/// Download and parse a zip archive of definition files
pub async fn parse_zip_url(url: &str) -> Result<ServiceMap> {
    let response = reqwest::get(url).await?.error_for_status()?;
    let bytes = response.bytes().await?;
    parse_zip_bytes(&bytes, url)
}

fn parse_zip_bytes(bytes: &[u8], origin: &str) -> Result<ServiceMap> {
    let mut archive = zip::ZipArchive::new(Cursor::new(bytes))?;
    let mut services = ServiceMap::new();

    for index in 0..archive.len() {
        let mut entry = archive.by_index(index)?;
        if entry.is_dir() || !is_definition_name(entry.name()) {
            continue;
        }

        let name = entry.name().to_string();
        let mut input = String::new();
        entry.read_to_string(&mut input)?;
        add_service_definition(&mut services, &input, &format!("{}!{}", origin, name))?;
    }

    if services.is_empty() {
        return Err(CatalogError::EmptySource {
            origin: origin.to_string(),
        });
    }

    Ok(services)
}

fn is_definition_file(path: &Path) -> bool {
    matches!(
        path.extension().and_then(|ext| ext.to_str()),
        Some("yml") | Some("yaml")
    )
}

fn is_definition_name(name: &str) -> bool {
    name.ends_with(".yml") || name.ends_with(".yaml")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::service::TEST_DEFINITION;
    use std::io::Write;
    use zip::write::SimpleFileOptions;

    fn zip_with_definition() -> Vec<u8> {
        let mut writer = zip::ZipWriter::new(Cursor::new(Vec::new()));
        writer
            .start_file("services/test.yaml", SimpleFileOptions::default())
            .unwrap();
        writer.write_all(TEST_DEFINITION.as_bytes()).unwrap();
        writer
            .start_file("README.md", SimpleFileOptions::default())
            .unwrap();
        writer.write_all(b"ignored").unwrap();
        writer.finish().unwrap().into_inner()
    }

    #[test]
    fn test_bundled_catalog_parses() {
        let dir = Path::new(env!("CARGO_MANIFEST_DIR")).join("../../catalog");
        let services = parse_dir(&dir).unwrap();
        assert!(!services.is_empty());
    }

    #[test]
    fn test_parse_dir_recursive() {
        let dir = tempfile::tempdir().unwrap();
        let nested = dir.path().join("nested");
        fs::create_dir(&nested).unwrap();
        fs::write(nested.join("test.yaml"), TEST_DEFINITION).unwrap();
        fs::write(dir.path().join("notes.txt"), "not a definition").unwrap();

        let services = parse_dir(dir.path()).unwrap();
        assert_eq!(services.len(), 1);
        assert!(services.contains_key("12345"));
    }

    #[test]
    fn test_parse_dir_empty_is_error() {
        let dir = tempfile::tempdir().unwrap();
        assert!(matches!(
            parse_dir(dir.path()),
            Err(CatalogError::EmptySource { .. })
        ));
    }

    #[test]
    fn test_parse_zip_bytes() {
        let services = parse_zip_bytes(&zip_with_definition(), "catalog.zip").unwrap();
        assert_eq!(services.len(), 1);
        assert!(services.contains_key("12345"));
    }

    #[test]
    fn test_parse_zip_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("catalog.zip");
        fs::write(&path, zip_with_definition()).unwrap();

        let services = parse_zip_file(&path).unwrap();
        assert!(services.contains_key("12345"));
    }

    #[tokio::test]
    async fn test_parse_zip_url() {
        use wiremock::matchers::{method, path};
        use wiremock::{Mock, MockServer, ResponseTemplate};

        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/catalog.zip"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(zip_with_definition()))
            .mount(&server)
            .await;

        let services = parse_any(&format!("{}/catalog.zip", server.uri()))
            .await
            .unwrap();
        assert!(services.contains_key("12345"));
    }

    #[tokio::test]
    async fn test_parse_zip_url_http_error() {
        use wiremock::matchers::{method, path};
        use wiremock::{Mock, MockServer, ResponseTemplate};

        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/missing.zip"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let result = parse_any(&format!("{}/missing.zip", server.uri())).await;
        assert!(matches!(result, Err(CatalogError::Http(_))));
    }

    #[tokio::test]
    async fn test_unknown_path_is_error() {
        assert!(parse_any("/does/not/exist").await.is_err());
    }
}
