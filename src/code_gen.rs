use std::io;
use std::path::{Path, PathBuf};

const EXTENSIONS: &[(&str, &str)] = &[
    ("javascript", ".js"),
    ("typescript", ".ts"),
    ("html", ".html"),
    ("css", ".css"),
    ("python", ".py"),
    ("java", ".java"),
    ("cpp", ".cpp"),
    ("c", ".c"),
    ("go", ".go"),
    ("rust", ".rs"),
    ("php", ".php"),
    ("ruby", ".rb"),
    ("swift", ".swift"),
    ("kotlin", ".kt"),
    ("dart", ".dart"),
    ("sql", ".sql"),
    ("json", ".json"),
    ("yaml", ".yml"),
    ("xml", ".xml"),
    ("markdown", ".md"),
];

pub fn file_extension(language: &str) -> &'static str {
    let language = language.to_lowercase();
    EXTENSIONS
        .iter()
        .find(|(name, _)| *name == language)
        .map(|(_, ext)| *ext)
        .unwrap_or(".txt")
}

pub fn generation_prompt(prompt: &str, language: &str) -> String {
    format!(
        "Generate {language} code for: {prompt}. \n    Please provide clean, well-commented code. \n    Only return the code without explanations or markdown formatting."
    )
}

/// Wraps code into a standalone HTML page. Only html, css and javascript
/// can be previewed.
pub fn render_preview(code: &str, language: &str) -> Option<String> {
    match language {
        "html" => Some(code.to_string()),
        "css" => Some(format!(
            r#"
<!DOCTYPE html>
<html>
<head>
  <style>{code}</style>
</head>
<body>
  <div class="preview-container">
    <h1>CSS Preview</h1>
    <p>Your CSS styles are applied to this page.</p>
  </div>
</body>
</html>"#
        )),
        "javascript" => Some(format!(
            r#"
<!DOCTYPE html>
<html>
<head>
  <title>JavaScript Preview</title>
</head>
<body>
  <div id="output"></div>
  <script>{code}</script>
</body>
</html>"#
        )),
        _ => None,
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Preview {
    pub id: String,
    pub url: String,
    pub path: PathBuf,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SavedFile {
    pub filename: String,
    pub path: PathBuf,
}

/// Accepts a bare file name only; anything that would leave `dir` is refused.
pub fn plain_file_name(name: &str) -> io::Result<&str> {
    let path = Path::new(name);
    match path.file_name().and_then(|n| n.to_str()) {
        Some(file_name) if file_name == name && !name.contains('\\') => Ok(file_name),
        _ => Err(io::Error::new(
            io::ErrorKind::InvalidInput,
            format!("Invalid file name: {name:?}"),
        )),
    }
}

pub fn resolve_filename(filename: &str, language: &str) -> io::Result<String> {
    let filename = plain_file_name(filename)?;
    let extension = file_extension(language);
    if filename.ends_with(extension) {
        Ok(filename.to_string())
    } else {
        Ok(format!("{filename}{extension}"))
    }
}

/// Writes a preview page for `code`. `Ok(None)` when the language has no preview.
pub async fn write_preview(dir: &Path, code: &str, language: &str) -> io::Result<Option<Preview>> {
    let Some(html) = render_preview(code, language) else {
        return Ok(None);
    };
    tokio::fs::create_dir_all(dir).await?;
    let id = chrono::Utc::now().timestamp_millis().to_string();
    let name = format!("preview-{id}.html");
    let path = dir.join(&name);
    tokio::fs::write(&path, html).await?;
    log::info!("Preview written to {}", path.display());
    Ok(Some(Preview {
        id,
        url: format!("/generated/{name}"),
        path,
    }))
}

pub async fn save_code(
    dir: &Path,
    filename: &str,
    code: &str,
    language: &str,
) -> io::Result<SavedFile> {
    let filename = resolve_filename(filename, language)?;
    tokio::fs::create_dir_all(dir).await?;
    let path = dir.join(&filename);
    tokio::fs::write(&path, code).await?;
    log::info!("Code saved to {}", path.display());
    Ok(SavedFile { filename, path })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extension_lookup_ignores_case_and_defaults_to_txt() {
        assert_eq!(file_extension("Rust"), ".rs");
        assert_eq!(file_extension("YAML"), ".yml");
        assert_eq!(file_extension("brainfuck"), ".txt");
    }

    #[test]
    fn filename_keeps_matching_extension() {
        assert_eq!(resolve_filename("main.py", "python").unwrap(), "main.py");
        assert_eq!(resolve_filename("main", "python").unwrap(), "main.py");
        assert_eq!(resolve_filename("notes.md", "go").unwrap(), "notes.md.go");
    }

    #[test]
    fn filename_with_path_components_is_refused() {
        assert!(resolve_filename("../escape", "rust").is_err());
        assert!(resolve_filename("a/b", "rust").is_err());
        assert!(resolve_filename("", "rust").is_err());
        assert!(resolve_filename("..", "rust").is_err());
    }

    #[test]
    fn preview_only_for_web_languages() {
        assert_eq!(render_preview("<p>x</p>", "html").unwrap(), "<p>x</p>");
        assert!(render_preview("body{}", "css").unwrap().contains("<style>body{}</style>"));
        assert!(
            render_preview("alert(1)", "javascript")
                .unwrap()
                .contains("<script>alert(1)</script>")
        );
        assert!(render_preview("print(1)", "python").is_none());
    }

    #[test]
    fn prompt_names_language_and_task() {
        let prompt = generation_prompt("a fizzbuzz", "go");
        assert!(prompt.starts_with("Generate go code for: a fizzbuzz."));
        assert!(prompt.contains("without explanations"));
    }

    #[tokio::test]
    async fn save_and_preview_write_into_directory() {
        let dir = tempfile::tempdir().unwrap();
        let saved = save_code(dir.path(), "hello", "fn main() {}", "rust")
            .await
            .unwrap();
        assert_eq!(saved.filename, "hello.rs");
        assert_eq!(
            std::fs::read_to_string(&saved.path).unwrap(),
            "fn main() {}"
        );

        let preview = write_preview(dir.path(), "<b>hi</b>", "html")
            .await
            .unwrap()
            .unwrap();
        assert!(preview.url.starts_with("/generated/preview-"));
        assert_eq!(std::fs::read_to_string(&preview.path).unwrap(), "<b>hi</b>");

        assert!(
            write_preview(dir.path(), "x", "rust")
                .await
                .unwrap()
                .is_none()
        );
    }
}
