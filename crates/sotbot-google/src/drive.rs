//! Google Drive uploads. Inspection photos and documents land in a folder
//! chain `ONZS/<округ>/row_<строка>` and are shared by direct link.

use std::sync::Arc;

use reqwest::header;
use serde::Deserialize;
use serde_json::json;
use time::OffsetDateTime;
use url::Url;

use crate::{build_http_client, execute_with_retry, GoogleError, RequestConfig, TokenProvider};

const DRIVE_FILES_URL: &str = "https://www.googleapis.com/drive/v3/files";
const DRIVE_UPLOAD_URL: &str = "https://www.googleapis.com/upload/drive/v3/files";
const FOLDER_MIME: &str = "application/vnd.google-apps.folder";

/// Root folder for all inspection uploads.
const ROOT_FOLDER_NAME: &str = "ONZS";

#[derive(Debug, Deserialize)]
struct FileList {
    #[serde(default)]
    files: Vec<FileRef>,
}

#[derive(Debug, Deserialize)]
struct FileRef {
    id: String,
}

/// Escapes a value for embedding in a Drive `q` search expression.
fn escape_query_value(value: &str) -> String {
    value.replace('\\', "\\\\").replace('\'', "\\'")
}

/// Content type for an uploaded file, from its extension.
fn guess_mime(file_name: &str) -> &'static str {
    let extension = file_name.rsplit('.').next().map(str::to_lowercase);
    match extension.as_deref() {
        Some("jpg" | "jpeg") => "image/jpeg",
        Some("png") => "image/png",
        Some("pdf") => "application/pdf",
        Some("doc") => "application/msword",
        Some("docx") => {
            "application/vnd.openxmlformats-officedocument.wordprocessingml.document"
        }
        Some("xls") => "application/vnd.ms-excel",
        Some("xlsx") => "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet",
        _ => "application/octet-stream",
    }
}

/// Builds a `multipart/related` upload body: a JSON metadata part followed by
/// the raw file bytes.
fn build_multipart_related(
    metadata_json: &str,
    mime: &str,
    bytes: &[u8],
    boundary: &str,
) -> Vec<u8> {
    let mut body = Vec::with_capacity(bytes.len() + metadata_json.len() + 256);
    body.extend_from_slice(format!("--{boundary}\r\n").as_bytes());
    body.extend_from_slice(b"Content-Type: application/json; charset=UTF-8\r\n\r\n");
    body.extend_from_slice(metadata_json.as_bytes());
    body.extend_from_slice(format!("\r\n--{boundary}\r\n").as_bytes());
    body.extend_from_slice(format!("Content-Type: {mime}\r\n\r\n").as_bytes());
    body.extend_from_slice(bytes);
    body.extend_from_slice(format!("\r\n--{boundary}--\r\n").as_bytes());
    body
}

fn fresh_boundary() -> String {
    format!("sotbot-{}", OffsetDateTime::now_utc().unix_timestamp_nanos())
}

/// Public download link for an uploaded file.
fn public_download_url(file_id: &str) -> String {
    format!("https://drive.google.com/uc?id={file_id}&export=download")
}

pub struct DriveClient {
    http: reqwest::Client,
    auth: Arc<TokenProvider>,
    config: RequestConfig,
}

impl DriveClient {
    #[must_use]
    pub fn new(auth: Arc<TokenProvider>) -> Self {
        Self::with_config(auth, RequestConfig::default())
    }

    #[must_use]
    pub fn with_config(auth: Arc<TokenProvider>, config: RequestConfig) -> Self {
        Self { http: build_http_client(&config), auth, config }
    }

    /// Looks up a folder by name, optionally under a parent.
    ///
    /// # Errors
    /// Returns an error when the request fails.
    pub async fn find_folder(
        &self,
        name: &str,
        parent: Option<&str>,
    ) -> Result<Option<String>, GoogleError> {
        let mut query = format!(
            "name = '{}' and mimeType = '{FOLDER_MIME}' and trashed = false",
            escape_query_value(name)
        );
        if let Some(parent) = parent {
            query.push_str(&format!(" and '{}' in parents", escape_query_value(parent)));
        }

        let mut url = Url::parse(DRIVE_FILES_URL)
            .map_err(|err| GoogleError::Api(format!("invalid drive url: {err}")))?;
        url.query_pairs_mut()
            .append_pair("q", &query)
            .append_pair("fields", "files(id)")
            .append_pair("pageSize", "1");
        let bearer = self.auth.bearer().await?;

        let response = execute_with_retry(&self.config, || async {
            self.http
                .get(url.clone())
                .header(header::AUTHORIZATION, bearer.clone())
                .send()
                .await
        })
        .await?;

        let list: FileList = response.json().await?;
        Ok(list.files.into_iter().next().map(|file| file.id))
    }

    /// Creates a folder and returns its id.
    ///
    /// # Errors
    /// Returns an error when the request fails.
    pub async fn create_folder(
        &self,
        name: &str,
        parent: Option<&str>,
    ) -> Result<String, GoogleError> {
        let mut metadata = json!({ "name": name, "mimeType": FOLDER_MIME });
        if let Some(parent) = parent {
            metadata["parents"] = json!([parent]);
        }
        let bearer = self.auth.bearer().await?;

        let response = execute_with_retry(&self.config, || async {
            self.http
                .post(DRIVE_FILES_URL)
                .header(header::AUTHORIZATION, bearer.clone())
                .json(&metadata)
                .send()
                .await
        })
        .await?;

        let file: FileRef = response.json().await?;
        Ok(file.id)
    }

    async fn ensure_folder(
        &self,
        name: &str,
        parent: Option<&str>,
    ) -> Result<String, GoogleError> {
        if let Some(id) = self.find_folder(name, parent).await? {
            return Ok(id);
        }
        tracing::debug!(folder = name, "creating drive folder");
        self.create_folder(name, parent).await
    }

    /// Resolves (creating as needed) the folder chain
    /// `ONZS/<округ>/row_<строка>` and returns the leaf folder id.
    ///
    /// # Errors
    /// Returns an error when any lookup or creation fails.
    pub async fn ensure_row_folder(
        &self,
        district: &str,
        sheet_row: u32,
    ) -> Result<String, GoogleError> {
        let root = self.ensure_folder(ROOT_FOLDER_NAME, None).await?;
        let district_folder = self.ensure_folder(district, Some(&root)).await?;
        self.ensure_folder(&format!("row_{sheet_row}"), Some(&district_folder)).await
    }

    /// Uploads a file into a folder, makes it readable by anyone with the
    /// link and returns the direct download URL.
    ///
    /// # Errors
    /// Returns an error when the upload or the permission change fails.
    pub async fn upload_public_file(
        &self,
        folder_id: &str,
        file_name: &str,
        bytes: Vec<u8>,
    ) -> Result<String, GoogleError> {
        let metadata = json!({ "name": file_name, "parents": [folder_id] }).to_string();
        let mime = guess_mime(file_name);
        let boundary = fresh_boundary();
        let body = build_multipart_related(&metadata, mime, &bytes, &boundary);

        let mut url = Url::parse(DRIVE_UPLOAD_URL)
            .map_err(|err| GoogleError::Api(format!("invalid upload url: {err}")))?;
        url.query_pairs_mut()
            .append_pair("uploadType", "multipart")
            .append_pair("fields", "id");
        let bearer = self.auth.bearer().await?;
        let content_type = format!("multipart/related; boundary={boundary}");

        let response = execute_with_retry(&self.config, || async {
            self.http
                .post(url.clone())
                .header(header::AUTHORIZATION, bearer.clone())
                .header(header::CONTENT_TYPE, content_type.clone())
                .body(body.clone())
                .send()
                .await
        })
        .await?;

        let file: FileRef = response.json().await?;
        self.share_with_anyone(&file.id).await?;
        tracing::info!(file = file_name, id = %file.id, "uploaded file to drive");
        Ok(public_download_url(&file.id))
    }

    async fn share_with_anyone(&self, file_id: &str) -> Result<(), GoogleError> {
        let url = format!("{DRIVE_FILES_URL}/{file_id}/permissions");
        let permission = json!({ "role": "reader", "type": "anyone" });
        let bearer = self.auth.bearer().await?;

        execute_with_retry(&self.config, || async {
            self.http
                .post(url.clone())
                .header(header::AUTHORIZATION, bearer.clone())
                .json(&permission)
                .send()
                .await
        })
        .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn query_values_escape_quotes_and_backslashes() {
        assert_eq!(escape_query_value("o'brien"), "o\\'brien");
        assert_eq!(escape_query_value("a\\b"), "a\\\\b");
        assert_eq!(escape_query_value("Округ 3"), "Округ 3");
    }

    #[test]
    fn mime_types_follow_the_extension() {
        assert_eq!(guess_mime("photo.JPG"), "image/jpeg");
        assert_eq!(guess_mime("act.pdf"), "application/pdf");
        assert_eq!(
            guess_mime("report.xlsx"),
            "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet"
        );
        assert_eq!(guess_mime("noext"), "application/octet-stream");
    }

    #[test]
    fn multipart_body_has_two_parts_and_a_terminator() {
        let body =
            build_multipart_related(r#"{"name":"a.png"}"#, "image/png", &[1, 2, 3], "xyz");
        let text = String::from_utf8_lossy(&body);
        assert!(text.starts_with("--xyz\r\n"));
        assert!(text.contains("Content-Type: application/json; charset=UTF-8"));
        assert!(text.contains("Content-Type: image/png"));
        assert!(text.ends_with("\r\n--xyz--\r\n"));
    }

    #[test]
    fn download_links_point_at_the_uc_endpoint() {
        assert_eq!(
            public_download_url("abc123"),
            "https://drive.google.com/uc?id=abc123&export=download"
        );
    }
}
