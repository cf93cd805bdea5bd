//! `RemoteStore` over the store's HTTP endpoints.

use std::time::Duration;

use reqwest::multipart::{Form, Part};
use url::Url;

use super::RemoteStore;
use crate::base::catalog::{ActiveSelection, Catalog, CatalogEntry};
use crate::base::source::LeafFile;
use crate::prelude::*;
use crate::settings::ClientSettings;
use crate::utils::http;

const UPLOAD_FIELD: &str = "image";
const SELECT_FIELD: &str = "filename";

const UPLOAD_FAILED: &str = "Upload failed";
const SELECT_FAILED: &str = "Image selection failed";
const CATALOG_FAILED: &str = "Failed to load images";
const CURRENT_FAILED: &str = "Failed to load current image";

#[derive(Deserialize)]
struct Envelope<T> {
    data: Option<T>,
}

#[derive(Deserialize)]
struct CurrentImage {
    #[serde(default)]
    current: Option<String>,
}

pub struct HttpStore {
    client: reqwest::Client,
    base: Url,
    slow_threshold: Duration,
}

impl HttpStore {
    pub fn new(settings: &ClientSettings) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(settings.request_timeout_secs))
            .build()?;
        Ok(Self {
            client,
            base: directory_url(&settings.server_url)?,
            slow_threshold: Duration::from_secs(settings.slow_request_warn_secs),
        })
    }

    pub fn base_url(&self) -> &Url {
        &self.base
    }

    /// Base URL under which ingested files are served, e.g. `http://host/uploads/`.
    pub fn public_url(&self, public_prefix: &str) -> Result<Url> {
        let prefix = public_prefix.trim_start_matches('/');
        let mut url = self.base.join(prefix)?;
        if !url.path().ends_with('/') {
            url.set_path(&format!("{}/", url.path()));
        }
        Ok(url)
    }

    fn endpoint(&self, path: &str) -> Result<Url> {
        Ok(self.base.join(path)?)
    }
}

/// Parses `raw` so that relative joins append to its path instead of replacing
/// the last segment.
fn directory_url(raw: &str) -> Result<Url> {
    let mut url = Url::parse(raw)?;
    if !url.path().ends_with('/') {
        url.set_path(&format!("{}/", url.path()));
    }
    Ok(url)
}

#[async_trait]
impl RemoteStore for HttpStore {
    async fn upload(&self, file: &LeafFile) -> Result<CatalogEntry> {
        let contents = file.contents().await?;
        let part = Part::bytes(contents.to_vec())
            .file_name(file.name().to_owned())
            .mime_str(file.media_type())?;
        let form = Form::new().part(UPLOAD_FIELD, part);
        let url = self.endpoint("upload")?;

        let resp = http::request(&self.client, self.slow_threshold, UPLOAD_FAILED, |c| {
            c.post(url).multipart(form)
        })
        .await?;
        let envelope: Envelope<CatalogEntry> = http::read_json(resp).await?;
        envelope
            .data
            .ok_or_else(|| Error::parse("upload response carries no catalog entry"))
    }

    async fn current_selection(&self) -> Result<ActiveSelection> {
        let url = self.endpoint("current-image")?;
        let resp =
            http::request(&self.client, self.slow_threshold, CURRENT_FAILED, |c| c.get(url))
                .await?;
        let envelope: Envelope<CurrentImage> = http::read_json(resp).await?;
        Ok(ActiveSelection::from_optional(
            envelope.data.and_then(|d| d.current),
        ))
    }

    async fn catalog(&self) -> Result<Catalog> {
        let url = self.endpoint("images")?;
        let resp =
            http::request(&self.client, self.slow_threshold, CATALOG_FAILED, |c| c.get(url))
                .await?;
        let envelope: Envelope<Vec<String>> = http::read_json(resp).await?;
        let filenames = envelope
            .data
            .ok_or_else(|| Error::parse("catalog response carries no filenames"))?;
        Ok(Catalog::new(filenames))
    }

    async fn select(&self, filename: &str) -> Result<()> {
        let url = self.endpoint("select-image")?;
        http::request(&self.client, self.slow_threshold, SELECT_FAILED, |c| {
            c.post(url).form(&[(SELECT_FIELD, filename)])
        })
        .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store(server_url: &str) -> HttpStore {
        HttpStore::new(&ClientSettings {
            server_url: server_url.to_owned(),
            ..Default::default()
        })
        .unwrap()
    }

    #[test]
    fn endpoints_resolve_against_base() {
        let root = store("http://localhost:8080");
        assert_eq!(
            root.endpoint("upload").unwrap().as_str(),
            "http://localhost:8080/upload"
        );

        let nested = store("http://example.com/imgdrop");
        assert_eq!(
            nested.endpoint("select-image").unwrap().as_str(),
            "http://example.com/imgdrop/select-image"
        );
    }

    #[test]
    fn public_url_is_a_directory() {
        let root = store("http://localhost:8080");
        assert_eq!(
            root.public_url("uploads").unwrap().as_str(),
            "http://localhost:8080/uploads/"
        );
        assert_eq!(
            root.public_url("/uploads/").unwrap().as_str(),
            "http://localhost:8080/uploads/"
        );
    }

    #[test]
    fn invalid_server_url_is_rejected() {
        let result = HttpStore::new(&ClientSettings {
            server_url: "not a url".to_owned(),
            ..Default::default()
        });
        assert!(matches!(result, Err(Error::Url(_))));
    }

    #[test]
    fn envelope_tolerates_missing_data() {
        let envelope: Envelope<CurrentImage> =
            serde_json::from_str(r#"{"success":true,"message":""}"#).unwrap();
        assert!(envelope.data.is_none());

        let envelope: Envelope<CurrentImage> =
            serde_json::from_str(r#"{"data":{"current":null}}"#).unwrap();
        assert!(envelope.data.unwrap().current.is_none());
    }
}
