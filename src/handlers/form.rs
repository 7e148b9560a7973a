// src/handlers/form.rs

use axum::{body::Bytes, extract::Multipart};

use crate::error::AppError;

/// A file part of a multipart form.
#[derive(Debug)]
pub struct UploadedFile {
    /// Client-provided name; only its extension is used.
    pub file_name: String,
    pub bytes: Bytes,
}

/// A multipart form drained into text fields and file parts, in arrival order.
#[derive(Debug, Default)]
pub struct FormData {
    pub fields: Vec<(String, String)>,
    pub files: Vec<(String, UploadedFile)>,
}

impl FormData {
    /// Reads every part. Parts with a filename are files; a file input left
    /// empty (no filename) is dropped. Named zero-byte files are kept.
    pub async fn read(mut multipart: Multipart) -> Result<Self, AppError> {
        let mut form = FormData::default();

        while let Some(field) = multipart.next_field().await? {
            let name = field.name().unwrap_or_default().to_string();

            match field.file_name().map(str::to_string) {
                Some(file_name) => {
                    let bytes = field.bytes().await?;
                    if file_name.is_empty() {
                        continue;
                    }
                    form.files.push((name, UploadedFile { file_name, bytes }));
                }
                None => {
                    let value = field.text().await?;
                    form.fields.push((name, value));
                }
            }
        }

        Ok(form)
    }

    /// Last value of a text field, or an empty string.
    pub fn text(&self, name: &str) -> String {
        self.fields
            .iter()
            .rev()
            .find(|(field, _)| field == name)
            .map(|(_, value)| value.clone())
            .unwrap_or_default()
    }

    /// Whether a checkbox/submit-style field was sent with a truthy value.
    pub fn flag(&self, name: &str) -> bool {
        self.fields.iter().any(|(field, value)| {
            field == name && !matches!(value.trim(), "" | "0" | "false" | "off" | "no")
        })
    }

    /// Takes all file parts sent under `name`.
    pub fn take_files(&mut self, name: &str) -> Vec<UploadedFile> {
        let (matching, rest): (Vec<_>, Vec<_>) = std::mem::take(&mut self.files)
            .into_iter()
            .partition(|(field, _)| field == name);
        self.files = rest;
        matching.into_iter().map(|(_, file)| file).collect()
    }
}
