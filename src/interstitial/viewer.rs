use url::Url;
use wasm_bindgen::JsValue;
use web_sys::HtmlIFrameElement;

pub type SessionId = u64;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FrameStatus {
    /// No load signal has arrived yet.
    Loading,
    Loaded,
    /// Presumed refused by the embedded site; the fallback panel is shown.
    Blocked,
}

/// What could be observed about the embedded document when probed.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum FrameProbe {
    /// Neither `contentDocument` nor `contentWindow.document` is available.
    NoDocument,
    Document { href: String },
    /// Reading the document threw a cross-origin security error.
    CrossOrigin,
}

impl FrameProbe {
    pub fn is_blank(&self) -> bool {
        match self {
            FrameProbe::NoDocument => true,
            FrameProbe::Document { href } => href == "about:blank",
            FrameProbe::CrossOrigin => false,
        }
    }
}

pub trait FrameInspector {
    fn probe(&self) -> FrameProbe;
    fn has_source(&self) -> bool;
}

/// One open full-screen viewer.
#[derive(Clone, Debug, PartialEq)]
pub struct ViewerSession {
    id: SessionId,
    url: String,
    status: FrameStatus,
    load_seen: bool,
}

impl ViewerSession {
    pub fn new(id: SessionId, url: String) -> Self {
        Self {
            id,
            url,
            status: FrameStatus::Loading,
            load_seen: false,
        }
    }

    pub fn id(&self) -> SessionId {
        self.id
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn status(&self) -> FrameStatus {
        self.status
    }

    pub fn is_blocked(&self) -> bool {
        self.status == FrameStatus::Blocked
    }

    /// Whether the frame has fired at least one load event.
    pub fn load_seen(&self) -> bool {
        self.load_seen
    }

    pub(super) fn record_load(&mut self) {
        self.load_seen = true;
    }

    pub(super) fn mark_loaded(&mut self) {
        if self.status == FrameStatus::Loading {
            self.status = FrameStatus::Loaded;
        }
    }

    pub(super) fn mark_blocked(&mut self) {
        self.status = FrameStatus::Blocked;
    }

    /// Host shown in the attribution footer.
    pub fn origin_label(&self) -> String {
        origin_label(&self.url)
    }
}

pub fn origin_label(url: &str) -> String {
    Url::parse(url)
        .ok()
        .and_then(|parsed| parsed.host_str().map(str::to_string))
        .unwrap_or_else(|| url.to_string())
}

impl FrameInspector for HtmlIFrameElement {
    fn probe(&self) -> FrameProbe {
        let document = match self.content_document() {
            Some(document) => JsValue::from(document),
            // Cross-origin frames report a null contentDocument; reaching through
            // contentWindow throws instead, which is how they are told apart
            // from frames that have no document at all.
            None => match self.content_window() {
                Some(window) => match js_sys::Reflect::get(&window, &JsValue::from_str("document")) {
                    Ok(document) => document,
                    Err(_) => return FrameProbe::CrossOrigin,
                },
                None => return FrameProbe::NoDocument,
            },
        };
        if document.is_null() || document.is_undefined() {
            return FrameProbe::NoDocument;
        }

        let href = js_sys::Reflect::get(&document, &JsValue::from_str("location"))
            .and_then(|location| js_sys::Reflect::get(&location, &JsValue::from_str("href")));
        match href {
            Ok(href) => FrameProbe::Document {
                href: href.as_string().unwrap_or_default(),
            },
            Err(_) => FrameProbe::CrossOrigin,
        }
    }

    fn has_source(&self) -> bool {
        !self.src().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn origin_label_is_hostname() {
        assert_eq!(origin_label("https://manga.example.jp/read/42?page=3"), "manga.example.jp");
    }

    #[test]
    fn origin_label_falls_back_to_raw_url() {
        assert_eq!(origin_label("not a url"), "not a url");
    }

    #[test]
    fn blank_probes() {
        assert!(FrameProbe::NoDocument.is_blank());
        assert!(FrameProbe::Document { href: "about:blank".to_string() }.is_blank());
        assert!(!FrameProbe::Document { href: "https://example.com/".to_string() }.is_blank());
        assert!(!FrameProbe::CrossOrigin.is_blank());
    }

    #[test]
    fn loaded_does_not_unblock() {
        let mut session = ViewerSession::new(1, "https://example.com".to_string());
        session.mark_blocked();
        session.mark_loaded();
        assert_eq!(session.status(), FrameStatus::Blocked);
    }
}
