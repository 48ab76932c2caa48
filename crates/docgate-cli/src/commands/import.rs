//! Import command - load documents into an index directory.
//!
//! The input holds one JSON object per line. String values become text
//! fields; arrays of strings are joined with spaces, which is how access
//! groups are listed:
//!
//! ```json
//! {"url": "file:///srv/docs/plan.pdf", "title": "Plan", "content": "...", "groups": ["staff", "board"]}
//! ```
//!
//! Fields named with `--compress` are stored lz4-compressed. They are not
//! searchable but can be shown with `search --show-field`.

use crate::app::App;
use anyhow::{bail, Context};
use docgate_core::{Document, DocumentIndex, IndexStore};
use serde_json::Value;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;
use std::time::Instant;
use tracing::warn;

/// Run the import command.
pub fn run(
    app: &App,
    index_name: &str,
    input: &Path,
    append: bool,
    compress: &[String],
) -> anyhow::Result<()> {
    let config = app.config()?;
    let index_config = config.index_config(index_name).with_context(|| {
        format!(
            "the configuration does not contain the index '{}' (configured: {})",
            index_name,
            config.all_index_names().join(", ")
        )
    })?;

    if index_config.is_parent() {
        bail!(
            "'{}' is a parent index; import into one of its children instead",
            index_name
        );
    }

    let store = IndexStore::new(index_config.directory());
    let index = if append {
        store.load_or_new()?
    } else {
        DocumentIndex::new()
    };
    let existing = index.len();

    let start = Instant::now();
    let reader = BufReader::new(
        File::open(input).with_context(|| format!("opening {}", input.display()))?,
    );

    let mut documents = Vec::new();
    for (number, line) in reader.lines().enumerate() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        let document = parse_document(&line, compress)
            .with_context(|| format!("{}:{}", input.display(), number + 1))?;
        if document.url().is_none() {
            warn!(line = number + 1, "Document has no url field and can never be served");
        }
        documents.push(document);
    }

    let imported = documents.len();
    let replaced = merge_documents(&index, documents);
    store.save(&index)?;

    println!("Import complete!");
    println!("  Index:      {}", index_name);
    println!("  Directory:  {}", index_config.directory().display());
    println!("  Imported:   {}", imported);
    println!("  Replaced:   {}", replaced);
    println!("  Kept:       {}", existing - replaced);
    println!("  Time:       {:.2}s", start.elapsed().as_secs_f64());

    // Searchers opened before the import still see the old index
    app.toolkit.pool().invalidate(index_config.directory());

    Ok(())
}

/// Add `documents` to `index`, dropping older documents with the same URL.
///
/// Returns how many older documents were replaced.
fn merge_documents(index: &DocumentIndex, documents: Vec<Document>) -> usize {
    let replaced: usize = documents
        .iter()
        .filter_map(Document::url)
        .map(|url| index.remove_by_url(url))
        .sum();
    index.add_documents(documents);
    replaced
}

/// Turn one JSON object into a document
fn parse_document(line: &str, compress: &[String]) -> anyhow::Result<Document> {
    let object = match serde_json::from_str::<Value>(line)? {
        Value::Object(object) => object,
        other => bail!("expected a JSON object, found {}", other),
    };

    let mut document = Document::new();
    for (name, value) in object {
        let text = match value {
            Value::Null => continue,
            Value::String(s) => s,
            Value::Bool(b) => b.to_string(),
            Value::Number(n) => n.to_string(),
            Value::Array(items) => items
                .iter()
                .map(|item| match item {
                    Value::String(s) => Ok(s.clone()),
                    other => bail!("field '{}' must hold strings, found {}", name, other),
                })
                .collect::<anyhow::Result<Vec<_>>>()?
                .join(" "),
            Value::Object(_) => bail!("field '{}' holds a nested object", name),
        };
        document = if compress.contains(&name) {
            document.with_compressed(name, &text)
        } else {
            document.with_text(name, text)
        };
    }

    Ok(document)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_document() {
        let doc = parse_document(
            r#"{"url": "file:///srv/a.pdf", "year": 2021, "groups": ["staff", "board"], "note": null}"#,
            &[],
        )
        .unwrap();

        assert_eq!(doc.url(), Some("file:///srv/a.pdf"));
        assert_eq!(doc.get("year"), Some("2021"));
        assert_eq!(doc.get("groups"), Some("staff board"));
        assert_eq!(doc.get("note"), None);
    }

    #[test]
    fn test_append_replaces_documents_with_same_url() {
        let index = DocumentIndex::new();
        merge_documents(
            &index,
            vec![
                parse_document(r#"{"url": "file:///srv/a.pdf", "title": "Old"}"#, &[]).unwrap(),
                parse_document(r#"{"url": "file:///srv/b.pdf", "title": "Other"}"#, &[]).unwrap(),
            ],
        );

        let replaced = merge_documents(
            &index,
            vec![
                parse_document(r#"{"url": "file:///srv/a.pdf", "title": "New"}"#, &[]).unwrap(),
                parse_document(r#"{"title": "No url"}"#, &[]).unwrap(),
            ],
        );

        assert_eq!(replaced, 1);
        assert_eq!(index.len(), 3);
        let titles: Vec<_> = index
            .all_documents()
            .iter()
            .filter(|d| d.url() == Some("file:///srv/a.pdf"))
            .map(|d| d.get("title").unwrap_or_default().to_string())
            .collect();
        assert_eq!(titles, vec!["New"]);
    }

    #[test]
    fn test_parse_document_compresses_named_fields() {
        let compress = vec!["content".to_string()];
        let doc = parse_document(
            r#"{"url": "file:///srv/a.pdf", "content": "Costs rose"}"#,
            &compress,
        )
        .unwrap();

        assert_eq!(doc.get("content"), None);
        assert_eq!(doc.compressed_field_value("content").unwrap(), "Costs rose");
        assert_eq!(doc.url(), Some("file:///srv/a.pdf"));
    }

    #[test]
    fn test_parse_document_rejects_nesting() {
        assert!(parse_document(r#"["not", "an", "object"]"#, &[]).is_err());
        assert!(parse_document(r#"{"meta": {"a": 1}}"#, &[]).is_err());
        assert!(parse_document(r#"{"groups": ["staff", 1]}"#, &[]).is_err());
        assert!(parse_document("not json", &[]).is_err());
    }
}
