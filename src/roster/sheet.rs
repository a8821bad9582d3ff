//! Google Sheets roster source, authenticated with a service-account key.

use crate::credential::ServiceAccountKey;
use crate::error::{GraderError, Result};
use crate::http::check_status;
use crate::retry::with_retry;
use crate::types::config::RetryPolicy;
use chrono::Utc;
use jsonwebtoken::{Algorithm, EncodingKey, Header};
use reqwest::blocking::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

const SCOPES: &str = "https://www.googleapis.com/auth/spreadsheets.readonly \
                      https://www.googleapis.com/auth/drive.readonly";
const DRIVE_FILES_URL: &str = "https://www.googleapis.com/drive/v3/files";
const SHEETS_URL: &str = "https://sheets.googleapis.com/v4/spreadsheets";
// Omitting the sheet name selects the first visible worksheet.
const FULL_RANGE: &str = "A1:ZZ";

/// A tabular roster source: first row is the header.
pub trait SheetSource {
    fn fetch_rows(&self) -> Result<Vec<Vec<String>>>;
}

pub struct GoogleSheet<'a> {
    client: &'a Client,
    key: ServiceAccountKey,
    title: String,
    retry: RetryPolicy,
}

#[derive(Serialize)]
struct Claims<'a> {
    iss: &'a str,
    scope: &'a str,
    aud: &'a str,
    iat: i64,
    exp: i64,
}

#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,
}

#[derive(Deserialize)]
struct FileList {
    #[serde(default)]
    files: Vec<DriveFile>,
}

#[derive(Deserialize)]
struct DriveFile {
    id: String,
}

#[derive(Deserialize)]
struct ValueRange {
    #[serde(default)]
    values: Vec<Vec<String>>,
}

impl<'a> GoogleSheet<'a> {
    pub fn new(client: &'a Client, key: ServiceAccountKey, title: &str, retry: RetryPolicy) -> Self {
        Self {
            client,
            key,
            title: title.to_string(),
            retry,
        }
    }

    fn signed_assertion(&self) -> Result<String> {
        let iat = Utc::now().timestamp();
        let claims = Claims {
            iss: &self.key.client_email,
            scope: SCOPES,
            aud: &self.key.token_uri,
            iat,
            exp: iat + 3600,
        };
        let encoding_key = EncodingKey::from_rsa_pem(self.key.private_key.as_bytes())
            .map_err(|e| GraderError::InvalidCredential(format!("private key: {e}")))?;
        jsonwebtoken::encode(&Header::new(Algorithm::RS256), &claims, &encoding_key)
            .map_err(|e| GraderError::InvalidCredential(format!("signing assertion: {e}")))
    }

    fn access_token(&self) -> Result<String> {
        let assertion = self.signed_assertion()?;
        let token: TokenResponse = with_retry(&self.retry, "google token", || {
            let response = self
                .client
                .post(&self.key.token_uri)
                .form(&[
                    ("grant_type", "urn:ietf:params:oauth:grant-type:jwt-bearer"),
                    ("assertion", assertion.as_str()),
                ])
                .send()?;
            Ok(check_status("google", response)?.json()?)
        })?;
        Ok(token.access_token)
    }

    fn spreadsheet_id(&self, token: &str) -> Result<String> {
        let query = format!(
            "name = '{}' and mimeType = 'application/vnd.google-apps.spreadsheet' and trashed = false",
            self.title.replace('\\', "\\\\").replace('\'', "\\'")
        );
        let list: FileList = with_retry(&self.retry, "drive lookup", || {
            let response = self
                .client
                .get(DRIVE_FILES_URL)
                .bearer_auth(token)
                .query(&[("q", query.as_str()), ("fields", "files(id)")])
                .send()?;
            Ok(check_status("google", response)?.json()?)
        })?;
        list.files
            .into_iter()
            .next()
            .map(|file| file.id)
            .ok_or_else(|| GraderError::Roster(format!("no spreadsheet named `{}`", self.title)))
    }
}

impl SheetSource for GoogleSheet<'_> {
    fn fetch_rows(&self) -> Result<Vec<Vec<String>>> {
        let token = self.access_token()?;
        let id = self.spreadsheet_id(&token)?;
        debug!(spreadsheet = %id, "resolved roster spreadsheet");
        let url = format!("{SHEETS_URL}/{id}/values/{FULL_RANGE}");
        let range: ValueRange = with_retry(&self.retry, "sheet values", || {
            let response = self.client.get(&url).bearer_auth(&token).send()?;
            Ok(check_status("google", response)?.json()?)
        })?;
        info!(title = %self.title, rows = range.values.len(), "read roster sheet");
        Ok(range.values)
    }
}

/// Splits header from data rows and builds the roster.
pub fn roster_from_sheet(
    source: &impl SheetSource,
    username_column: &str,
    id_column: &str,
) -> Result<super::Roster> {
    let mut rows = source.fetch_rows()?;
    if rows.is_empty() {
        return Err(GraderError::Roster("roster sheet is empty".to_string()));
    }
    let header = rows.remove(0);
    super::Roster::from_table(&header, &rows, username_column, id_column)
}
