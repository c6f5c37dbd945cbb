// Static viewer output: one PNG per page plus index.html

use crate::config::OutputConfig;
use crate::error::ViewerError;
use crate::protection::ContentGuard;
use image::{ImageFormat, RgbaImage};
use std::fmt::Write as _;
use std::path::PathBuf;

pub const INDEX_FILE: &str = "index.html";

/// File name of a 1-based page image.
pub fn page_file_name(index: u32) -> String {
    format!("page-{:04}.png", index)
}

/// A page image already written to the output directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageEntry {
    pub index: u32,
    pub file_name: String,
    pub width: u32,
    pub height: u32,
}

/// Banner shown above the pages.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub heading: String,
    pub body: String,
    pub status: Option<String>,
}

impl Notice {
    pub fn access_denied(status: Option<String>) -> Self {
        Self {
            heading: "Access restricted".to_string(),
            body: "You don't have permission to view this PDF. Showing the sample document instead."
                .to_string(),
            status,
        }
    }
}

/// What index.html shows.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PageContent {
    Document {
        pages: Vec<PageEntry>,
        label: String,
        notice: Option<Notice>,
    },
    /// Textual message in place of the viewer
    Message { text: String },
}

pub fn escape_html(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            c => escaped.push(c),
        }
    }
    escaped
}

#[derive(Debug, Clone)]
pub struct OutputWriter {
    directory: PathBuf,
    title: String,
    ad_slot_text: Option<String>,
    guard: ContentGuard,
}

impl OutputWriter {
    pub fn new(config: &OutputConfig, guard: ContentGuard) -> Self {
        Self {
            directory: config.directory.clone(),
            title: config.title.clone(),
            ad_slot_text: config.ad_slot_text.clone(),
            guard,
        }
    }

    pub fn page_path(&self, index: u32) -> PathBuf {
        self.directory.join(page_file_name(index))
    }

    /// Create the output directory and remove page images of a previous run.
    pub fn prepare(&self) -> Result<(), ViewerError> {
        std::fs::create_dir_all(&self.directory)?;
        self.clear_pages()
    }

    /// Remove every `page-*.png` in the output directory.
    pub fn clear_pages(&self) -> Result<(), ViewerError> {
        if !self.directory.exists() {
            return Ok(());
        }
        for entry in std::fs::read_dir(&self.directory)? {
            let path = entry?.path();
            let is_page = path
                .file_name()
                .and_then(|n| n.to_str())
                .map(|n| n.starts_with("page-") && n.ends_with(".png"))
                .unwrap_or(false);
            if is_page {
                std::fs::remove_file(&path)?;
            }
        }
        Ok(())
    }

    /// Encode `surface` as the PNG for page `index`. Blocking.
    pub fn write_page(&self, index: u32, surface: &RgbaImage) -> Result<PageEntry, ViewerError> {
        let file_name = page_file_name(index);
        surface
            .save_with_format(self.page_path(index), ImageFormat::Png)
            .map_err(|e| ViewerError::Io(format!("Failed to write {}: {}", file_name, e)))?;

        Ok(PageEntry {
            index,
            file_name,
            width: surface.width(),
            height: surface.height(),
        })
    }

    pub fn write_index(&self, content: &PageContent) -> Result<PathBuf, ViewerError> {
        let path = self.directory.join(INDEX_FILE);
        std::fs::write(&path, self.render_index(content))?;
        Ok(path)
    }

    pub fn render_index(&self, content: &PageContent) -> String {
        let mut html = String::new();
        let title = escape_html(&self.title);

        let _ = write!(
            html,
            "<!DOCTYPE html>\n<html lang=\"en\">\n<head>\n<meta charset=\"utf-8\">\n\
             <meta name=\"viewport\" content=\"width=device-width, initial-scale=1\">\n\
             <title>{title}</title>\n<style>\n\
             body {{ margin: 0; font-family: system-ui, Arial, sans-serif; background: #f2f2f2; }}\n\
             header {{ position: sticky; top: 0; padding: 8px 16px; background: #fff; border-bottom: 1px solid #ddd; }}\n\
             #viewer {{ display: flex; flex-direction: column; align-items: center; gap: 12px; padding: 16px; }}\n\
             .page img {{ display: block; max-width: 100%; height: auto; box-shadow: 0 1px 4px rgba(0,0,0,0.2); }}\n\
             .ad-slot {{ width: 100%; max-width: 728px; padding: 24px 0; text-align: center; color: #888; border: 1px dashed #bbb; }}\n\
             .notice {{ padding: 24px; text-align: center; }}\n\
             .message {{ padding: 24px; color: #a00; }}\n\
             {protection}\n</style>\n</head>\n<body>\n",
            title = title,
            protection = self.guard.stylesheet(),
        );

        match content {
            PageContent::Message { text } => {
                let _ = writeln!(
                    html,
                    "<div id=\"viewer\"><div class=\"message\">{}</div></div>",
                    escape_html(text)
                );
            }
            PageContent::Document {
                pages,
                label,
                notice,
            } => {
                let _ = writeln!(
                    html,
                    "<header><span>{}</span> <span id=\"progress\">{}</span></header>",
                    title,
                    escape_html(label)
                );
                let _ = writeln!(html, "<div id=\"viewer\">");

                if let Some(notice) = notice {
                    let _ = writeln!(
                        html,
                        "<div class=\"notice\"><h3>{}</h3><p>{}</p>",
                        escape_html(&notice.heading),
                        escape_html(&notice.body)
                    );
                    if let Some(status) = &notice.status {
                        let _ = writeln!(html, "<p class=\"status\">{}</p>", escape_html(status));
                    }
                    let _ = writeln!(html, "</div>");
                }

                for page in pages {
                    let _ = writeln!(
                        html,
                        "<div class=\"page\" data-page=\"{index}\"><img src=\"{file}\" width=\"{w}\" height=\"{h}\" alt=\"Page {index}\"></div>",
                        index = page.index,
                        file = page.file_name,
                        w = page.width,
                        h = page.height,
                    );
                    if let Some(ad) = &self.ad_slot_text {
                        let _ = writeln!(html, "<div class=\"ad-slot\">{}</div>", escape_html(ad));
                    }
                }

                let _ = writeln!(html, "</div>");
            }
        }

        let script = self.guard.script();
        if !script.is_empty() {
            let _ = writeln!(html, "<script>\n{}\n</script>", script);
        }
        html.push_str("</body>\n</html>\n");
        html
    }
}
