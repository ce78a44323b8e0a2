use crate::model::{TemplateFile, WizardOutcome};
use anyhow::{bail, Context, Result};
use std::path::{Path, PathBuf};

/// Only `.docx` templates are supported.
pub const TEMPLATE_EXTENSION: &str = "docx";

/// Read a template from disk, refusing anything that is not a `.docx` file.
pub fn load_template(path: &Path) -> Result<TemplateFile> {
    let is_docx = path
        .extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case(TEMPLATE_EXTENSION));
    if !is_docx {
        bail!(crate::error::NO_TEMPLATE_MESSAGE);
    }
    let name = path
        .file_name()
        .and_then(|n| n.to_str())
        .map(str::to_string)
        .with_context(|| format!("invalid template path {}", path.display()))?;
    let bytes =
        std::fs::read(path).with_context(|| format!("read template {}", path.display()))?;
    Ok(TemplateFile::new(name, bytes))
}

/// Default location for fetched documents.
pub fn default_output_dir() -> PathBuf {
    dirs::download_dir()
        .or_else(dirs::home_dir)
        .unwrap_or_else(|| PathBuf::from("."))
}

/// `<template-stem>-filled-<fileId prefix>.docx`
pub fn document_file_name(template_stem: &str, file_id: &str) -> String {
    let short: String = file_id
        .chars()
        .filter(|c| c.is_ascii_alphanumeric())
        .take(8)
        .collect();
    if short.is_empty() {
        format!("{template_stem}-filled.{TEMPLATE_EXTENSION}")
    } else {
        format!("{template_stem}-filled-{short}.{TEMPLATE_EXTENSION}")
    }
}

/// Write the document into `dir`, adding a numeric suffix instead of overwriting.
pub fn save_document(dir: &Path, file_name: &str, bytes: &[u8]) -> Result<PathBuf> {
    std::fs::create_dir_all(dir).with_context(|| format!("create {}", dir.display()))?;

    let candidate = Path::new(file_name);
    let stem = candidate
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("document");
    let ext = candidate
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or(TEMPLATE_EXTENSION);

    let mut path = dir.join(file_name);
    let mut n = 1;
    while path.exists() {
        path = dir.join(format!("{stem}-{n}.{ext}"));
        n += 1;
    }

    std::fs::write(&path, bytes).with_context(|| format!("write {}", path.display()))?;
    Ok(path)
}

pub fn export_json(path: &Path, outcome: &WizardOutcome) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("create {}", parent.display()))?;
    }
    let data = serde_json::to_vec_pretty(outcome)?;
    std::fs::write(path, data).with_context(|| format!("write {}", path.display()))?;
    Ok(())
}

/// Read a JSON object of answers keyed by placeholder.
pub fn load_answers(path: &Path) -> Result<std::collections::BTreeMap<String, String>> {
    let data =
        std::fs::read_to_string(path).with_context(|| format!("read {}", path.display()))?;
    serde_json::from_str(&data)
        .with_context(|| format!("{} must be a JSON object of string answers", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    #[test]
    fn load_template_requires_docx() {
        let dir = tempfile::tempdir().unwrap();
        let pdf = dir.path().join("letter.pdf");
        std::fs::write(&pdf, b"%PDF").unwrap();
        let err = load_template(&pdf).unwrap_err();
        assert_eq!(err.to_string(), crate::error::NO_TEMPLATE_MESSAGE);

        let docx = dir.path().join("Letter.DOCX");
        std::fs::write(&docx, b"PK").unwrap();
        let t = load_template(&docx).unwrap();
        assert_eq!(t.name, "Letter.DOCX");
        assert_eq!(&t.bytes[..], b"PK");
    }

    #[test]
    fn load_template_reports_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let err = load_template(&dir.path().join("missing.docx")).unwrap_err();
        assert!(format!("{err:#}").contains("read template"));
    }

    #[test]
    fn document_name_uses_stem_and_id_prefix() {
        assert_eq!(
            document_file_name("offer", "4f1c9a2e-1234"),
            "offer-filled-4f1c9a2e.docx"
        );
        assert_eq!(document_file_name("offer", "--"), "offer-filled.docx");
    }

    #[test]
    fn save_document_never_overwrites() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("nested");

        let first = save_document(&out, "offer-filled.docx", b"one").unwrap();
        let second = save_document(&out, "offer-filled.docx", b"two").unwrap();

        assert_eq!(first, out.join("offer-filled.docx"));
        assert_eq!(second, out.join("offer-filled-1.docx"));
        assert_eq!(std::fs::read(&first).unwrap(), b"one");
        assert_eq!(std::fs::read(&second).unwrap(), b"two");
    }

    #[test]
    fn export_and_answers_files_are_json() {
        let dir = tempfile::tempdir().unwrap();
        let outcome = WizardOutcome {
            generated_at_utc: "2024-01-01T00:00:00Z".into(),
            base_url: "http://127.0.0.1:5000".into(),
            template: Some("offer.docx".into()),
            file_id: "f".into(),
            answers: BTreeMap::from([("NAME".to_string(), "Alice".to_string())]),
            download_url: "https://x/doc.docx".into(),
            saved_to: None,
        };
        let path = dir.path().join("out/outcome.json");
        export_json(&path, &outcome).unwrap();
        let v: serde_json::Value =
            serde_json::from_slice(&std::fs::read(&path).unwrap()).unwrap();
        assert_eq!(v["downloadUrl"], "https://x/doc.docx");
        assert_eq!(v["answers"]["NAME"], "Alice");

        let answers = dir.path().join("answers.json");
        std::fs::write(&answers, r#"{"NAME":"Alice","DATE":""}"#).unwrap();
        let loaded = load_answers(&answers).unwrap();
        assert_eq!(loaded["DATE"], "");

        std::fs::write(&answers, r#"["not", "an", "object"]"#).unwrap();
        assert!(load_answers(&answers).is_err());
    }
}
