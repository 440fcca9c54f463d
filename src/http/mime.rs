//! MIME type detection module
//!
//! Maps a requested file to one of four content classes and returns the
//! Content-Type for that class.

use std::path::Path;

/// How a static asset is loaded and labelled
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContentClass {
    /// `.jpg`/`.png`, served as raw bytes
    Image,
    /// `.js`
    Script,
    /// `.css`
    Stylesheet,
    /// Everything else, including files without an extension
    Page,
}

impl ContentClass {
    /// Classify by file extension (case-insensitive)
    ///
    /// # Examples
    /// ```
    /// use static_router::http::mime::ContentClass;
    /// assert_eq!(ContentClass::from_path("img/photo.PNG"), ContentClass::Image);
    /// assert_eq!(ContentClass::from_path("app.js"), ContentClass::Script);
    /// assert_eq!(ContentClass::from_path("README"), ContentClass::Page);
    /// ```
    pub fn from_path(path: &str) -> Self {
        match extension(path).map(str::to_ascii_lowercase).as_deref() {
            Some("jpg" | "png") => Self::Image,
            Some("js") => Self::Script,
            Some("css") => Self::Stylesheet,
            _ => Self::Page,
        }
    }

    /// Text classes are decoded before serving and cached as text
    pub const fn is_text(self) -> bool {
        !matches!(self, Self::Image)
    }

    /// Content-Type header value for a file of this class
    ///
    /// In legacy mode every image is labelled `image/jpg` and scripts
    /// `application/js`, matching what existing clients were served.
    pub fn content_type(self, path: &str, legacy: bool) -> &'static str {
        match self {
            Self::Image if legacy => "image/jpg",
            Self::Image => get_image_type(extension(path)),
            Self::Script if legacy => "application/js",
            Self::Script => "application/javascript",
            Self::Stylesheet => "text/css",
            Self::Page => "text/html",
        }
    }
}

fn extension(path: &str) -> Option<&str> {
    Path::new(path).extension().and_then(|e| e.to_str())
}

fn get_image_type(extension: Option<&str>) -> &'static str {
    match extension.map(str::to_ascii_lowercase).as_deref() {
        Some("png") => "image/png",
        Some("jpg" | "jpeg") => "image/jpeg",
        _ => "application/octet-stream",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classification() {
        assert_eq!(ContentClass::from_path("a.jpg"), ContentClass::Image);
        assert_eq!(ContentClass::from_path("dir/b.png"), ContentClass::Image);
        assert_eq!(ContentClass::from_path("c.js"), ContentClass::Script);
        assert_eq!(ContentClass::from_path("d.css"), ContentClass::Stylesheet);
        assert_eq!(ContentClass::from_path("e.html"), ContentClass::Page);
        assert_eq!(ContentClass::from_path("f.gif"), ContentClass::Page);
        assert_eq!(ContentClass::from_path("noext"), ContentClass::Page);
        assert_eq!(ContentClass::from_path("v1.2/site.css"), ContentClass::Stylesheet);
    }

    #[test]
    fn test_legacy_types() {
        assert_eq!(ContentClass::Image.content_type("a.png", true), "image/jpg");
        assert_eq!(ContentClass::Image.content_type("a.jpg", true), "image/jpg");
        assert_eq!(ContentClass::Script.content_type("a.js", true), "application/js");
        assert_eq!(ContentClass::Stylesheet.content_type("a.css", true), "text/css");
        assert_eq!(ContentClass::Page.content_type("a.html", true), "text/html");
    }

    #[test]
    fn test_correct_types() {
        assert_eq!(ContentClass::Image.content_type("a.png", false), "image/png");
        assert_eq!(ContentClass::Image.content_type("a.JPG", false), "image/jpeg");
        assert_eq!(
            ContentClass::Script.content_type("a.js", false),
            "application/javascript"
        );
        assert_eq!(ContentClass::Page.content_type("x", false), "text/html");
    }
}
