//! Streaming markup editor with a typed element accessor.
//!
//! Documents are read as a quick-xml event stream and written back event by
//! event. Only the elements the rewriters care about (`<link>`, `<a>`,
//! `<meta>`) are decoded into an [`Element`]; everything else, including
//! tags the visitor leaves untouched, is copied through verbatim.
//!
//! ```text
//! text ──▶ Reader ──▶ Start/Empty(link|a|meta)? ──▶ visitor ──▶ Writer ──▶ text
//!                 └──▶ any other event ───────────────────────────┘
//! ```

use quick_xml::{
    Reader, Writer,
    events::{BytesStart, Event, attributes::Attribute},
};

use super::{ParseMode, RewriteError};
use crate::utils::html::{escape_attr, unescape};

/// Class name of the container holding social-share anchors.
pub const SHARE_LINKS_CLASS: &str = "share_links";

// =============================================================================
// Typed accessors
// =============================================================================

/// Elements the rewriters can select.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ElementKind {
    /// `<link>`
    Link,
    /// `<a>`
    Anchor,
    /// `<meta>`
    Meta,
}

impl ElementKind {
    fn from_name(name: &[u8]) -> Option<Self> {
        if name.eq_ignore_ascii_case(b"link") {
            Some(Self::Link)
        } else if name.eq_ignore_ascii_case(b"a") {
            Some(Self::Anchor)
        } else if name.eq_ignore_ascii_case(b"meta") {
            Some(Self::Meta)
        } else {
            None
        }
    }

    pub const fn tag(self) -> &'static str {
        match self {
            Self::Link => "link",
            Self::Anchor => "a",
            Self::Meta => "meta",
        }
    }
}

/// Attributes the rewriters read or write.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Attr {
    Href,
    Content,
    Property,
    Name,
}

impl Attr {
    pub const fn name(self) -> &'static str {
        match self {
            Self::Href => "href",
            Self::Content => "content",
            Self::Property => "property",
            Self::Name => "name",
        }
    }
}

/// Social meta tags whose `content` carries a URL.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MetaKind {
    /// `og:url` / `twitter:url`
    Url,
    /// `og:image` / `twitter:image`
    Image,
}

/// A decoded `<link>`, `<a>` or `<meta>` start tag.
#[derive(Debug)]
pub struct Element {
    kind: ElementKind,
    /// Tag name as written in the source (case preserved).
    name: String,
    attrs: Vec<(String, String)>,
    in_share_links: bool,
    dirty: bool,
}

impl Element {
    pub const fn kind(&self) -> ElementKind {
        self.kind
    }

    /// Decoded attribute value.
    pub fn get(&self, attr: Attr) -> Option<&str> {
        self.attrs
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(attr.name()))
            .map(|(_, value)| value.as_str())
    }

    /// Replace an attribute value, appending the attribute if absent.
    pub fn set(&mut self, attr: Attr, value: String) {
        match self
            .attrs
            .iter_mut()
            .find(|(key, _)| key.eq_ignore_ascii_case(attr.name()))
        {
            Some((_, existing)) if *existing == value => return,
            Some((_, existing)) => *existing = value,
            None => self.attrs.push((attr.name().to_string(), value)),
        }
        self.dirty = true;
    }

    /// Whether this element sits inside a `.share_links` container.
    pub const fn in_share_links(&self) -> bool {
        self.in_share_links
    }

    /// Social meta classification (`None` for other elements).
    pub fn meta_kind(&self) -> Option<MetaKind> {
        if self.kind != ElementKind::Meta {
            return None;
        }
        let property = self.get(Attr::Property).unwrap_or_default();
        let name = self.get(Attr::Name).unwrap_or_default();
        if property == "og:url" || name == "twitter:url" {
            Some(MetaKind::Url)
        } else if property == "og:image" || name == "twitter:image" {
            Some(MetaKind::Image)
        } else {
            None
        }
    }

    /// Serialize the tag content (name and attributes, without brackets).
    fn to_content(&self) -> String {
        let mut content = self.name.clone();
        for (key, value) in &self.attrs {
            content.push(' ');
            content.push_str(key);
            content.push_str("=\"");
            content.push_str(&escape_attr(value));
            content.push('"');
        }
        content
    }
}

// =============================================================================
// Share-links scope tracking
// =============================================================================

/// Open `.share_links` container: its tag name and how many same-named
/// tags are currently nested inside it.
struct ShareScope {
    name: Vec<u8>,
    depth: usize,
}

#[derive(Default)]
struct ScopeStack {
    scopes: Vec<ShareScope>,
}

impl ScopeStack {
    fn active(&self) -> bool {
        !self.scopes.is_empty()
    }

    fn on_start(&mut self, name: &[u8], opens_scope: bool) {
        if let Some(scope) = self.scopes.last_mut()
            && scope.name.eq_ignore_ascii_case(name)
        {
            scope.depth += 1;
            return;
        }
        if opens_scope {
            self.scopes.push(ShareScope {
                name: name.to_vec(),
                depth: 1,
            });
        }
    }

    fn on_end(&mut self, name: &[u8]) {
        if let Some(scope) = self.scopes.last_mut()
            && scope.name.eq_ignore_ascii_case(name)
        {
            scope.depth -= 1;
            if scope.depth == 0 {
                self.scopes.pop();
            }
        }
    }
}

// =============================================================================
// Stream editing
// =============================================================================

fn create_reader(text: &str, mode: ParseMode) -> Reader<&[u8]> {
    let mut reader = Reader::from_str(text);
    let config = reader.config_mut();
    if mode == ParseMode::Markup {
        // HTML: void elements, stray end tags and bare `&` are all legal
        config.check_end_names = false;
        config.allow_unmatched_ends = true;
        config.allow_dangling_amp = true;
    }
    reader
}

/// Stream `text` through `visit`, which may edit any `<link>`, `<a>` or
/// `<meta>` element. Returns the re-serialized document.
pub fn edit_elements<F>(text: &str, mode: ParseMode, mut visit: F) -> Result<String, RewriteError>
where
    F: FnMut(&mut Element) -> Result<(), RewriteError>,
{
    let mut reader = create_reader(text, mode);
    let mut writer = Writer::new(Vec::with_capacity(text.len()));
    let mut scopes = ScopeStack::default();

    loop {
        let event = reader.read_event().map_err(|source| RewriteError::Parse {
            mode,
            position: reader.error_position(),
            source,
        })?;

        match event {
            Event::Eof => break,
            Event::Start(start) => {
                let start = edit_open(start, mode, &mut scopes, &mut visit)?;
                writer.write_event(Event::Start(start))?;
            }
            Event::Empty(start)
                if mode == ParseMode::Markup && ends_with_unquoted_value(&start) =>
            {
                let start = edit_open(reopen(&start), mode, &mut scopes, &mut visit)?;
                writer.write_event(Event::Start(start))?;
            }
            Event::Empty(start) => {
                let start = edit_start(start, mode, scopes.active(), &mut visit)?;
                writer.write_event(Event::Empty(start))?;
            }
            Event::End(end) => {
                scopes.on_end(end.local_name().as_ref());
                writer.write_event(Event::End(end))?;
            }
            event => writer.write_event(event)?,
        }
    }

    Ok(String::from_utf8(writer.into_inner())?)
}

/// Edit a start tag that opens an element, tracking `.share_links` scope.
fn edit_open<'a, F>(
    start: BytesStart<'a>,
    mode: ParseMode,
    scopes: &mut ScopeStack,
    visit: &mut F,
) -> Result<BytesStart<'a>, RewriteError>
where
    F: FnMut(&mut Element) -> Result<(), RewriteError>,
{
    let name = start.local_name().as_ref().to_vec();
    let opens_scope = has_class(&start, mode, SHARE_LINKS_CLASS);
    let start = edit_start(start, mode, scopes.active(), visit)?;
    scopes.on_start(&name, opens_scope);
    Ok(start)
}

/// Decode a selectable start tag, let the visitor edit it, and rebuild the
/// tag only if something changed.
fn edit_start<'a, F>(
    start: BytesStart<'a>,
    mode: ParseMode,
    in_share_links: bool,
    visit: &mut F,
) -> Result<BytesStart<'a>, RewriteError>
where
    F: FnMut(&mut Element) -> Result<(), RewriteError>,
{
    let Some(kind) = ElementKind::from_name(start.local_name().as_ref()) else {
        return Ok(start);
    };

    let name = String::from_utf8_lossy(start.name().as_ref()).into_owned();
    let attrs = decode_attributes(&start, mode, &name)?;
    let mut element = Element {
        kind,
        name,
        attrs,
        in_share_links,
        dirty: false,
    };

    visit(&mut element)?;

    if !element.dirty {
        return Ok(start);
    }
    let name_len = element.name.len();
    Ok(BytesStart::from_content(element.to_content(), name_len))
}

fn decode_attributes(
    start: &BytesStart<'_>,
    mode: ParseMode,
    element: &str,
) -> Result<Vec<(String, String)>, RewriteError> {
    let mut attrs = Vec::new();
    for attr in attributes(start, mode) {
        let attr = attr.map_err(|source| RewriteError::Attribute {
            element: element.to_string(),
            source,
        })?;
        attrs.push(decode_attribute(&attr));
    }
    Ok(attrs)
}

fn decode_attribute(attr: &Attribute<'_>) -> (String, String) {
    let key = String::from_utf8_lossy(attr.key.as_ref()).into_owned();
    let raw = String::from_utf8_lossy(&attr.value);
    let value = unescape(&raw).into_owned();
    (key, value)
}

/// HTML attributes may be unquoted, valueless or repeated; XML ones may not.
fn attributes<'a>(
    start: &'a BytesStart<'_>,
    mode: ParseMode,
) -> quick_xml::events::attributes::Attributes<'a> {
    match mode {
        ParseMode::Markup => {
            let mut attrs = start.html_attributes();
            attrs.with_checks(false);
            attrs
        }
        ParseMode::Feed => start.attributes(),
    }
}

/// Whether the tag ends in an unquoted value such as `href=/foo`.
///
/// HTML keeps a `/` right after an unquoted value as part of the value, so
/// `<a href=/foo/>` opens an anchor to `/foo/`. quick-xml reads it as an
/// empty `<a href=/foo/>` with the `/` consumed as the terminator.
fn ends_with_unquoted_value(start: &BytesStart<'_>) -> bool {
    let raw = start.attributes_raw();
    if raw.last().is_none_or(|&b| b.is_ascii_whitespace() || matches!(b, b'"' | b'\'')) {
        return false;
    }
    let last = raw.rsplit(u8::is_ascii_whitespace).next().unwrap_or_default();
    last.iter()
        .position(|&b| b == b'=')
        .is_some_and(|eq| !matches!(last.get(eq + 1), None | Some(b'"' | b'\'')))
}

/// Turn an empty tag back into a start tag, returning the `/` to its last value.
fn reopen(start: &BytesStart<'_>) -> BytesStart<'static> {
    let name_len = start.name().as_ref().len();
    let mut content = String::from_utf8_lossy(&start[..]).into_owned();
    content.push('/');
    BytesStart::from_content(content, name_len)
}

/// Whether the start tag carries `class` token `class`.
fn has_class(start: &BytesStart<'_>, mode: ParseMode, class: &str) -> bool {
    attributes(start, mode)
        .flatten()
        .find(|attr| attr.key.as_ref().eq_ignore_ascii_case(b"class"))
        .is_some_and(|attr| {
            String::from_utf8_lossy(&attr.value)
                .split_ascii_whitespace()
                .any(|token| token == class)
        })
}

// =============================================================================
// Tests
// =============================================================================
