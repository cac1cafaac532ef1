/// Closed classification of elements by what the engine may do with them.
///
/// Other modules ask capability questions ([`ElementKind::is_metadata`],
/// [`ElementKind::is_void`]) instead of matching tag strings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ElementKind {
    /// Non-rendered infrastructure: scripts, styles, templates, head content.
    Metadata,
    /// Sectioning and grouping elements whose children can be collapsed.
    Container,
    /// `h1`..`h6`.
    Heading(u8),
    /// Elements that never have children.
    Void,
    /// Any other rendered element.
    Content,
}

impl ElementKind {
    pub fn from_tag(tag: &str) -> Self {
        match tag.to_ascii_lowercase().as_str() {
            "script" | "style" | "template" | "noscript" | "link" | "meta" | "head" | "title"
            | "base" => Self::Metadata,
            "html" | "body" | "main" | "div" | "section" | "article" | "aside" | "nav"
            | "header" | "footer" | "details" | "ul" | "ol" | "dl" | "table" | "thead"
            | "tbody" | "tfoot" | "tr" | "blockquote" | "figure" | "form" | "fieldset" => {
                Self::Container
            }
            "h1" => Self::Heading(1),
            "h2" => Self::Heading(2),
            "h3" => Self::Heading(3),
            "h4" => Self::Heading(4),
            "h5" => Self::Heading(5),
            "h6" => Self::Heading(6),
            "area" | "br" | "col" | "embed" | "hr" | "img" | "input" | "source" | "track"
            | "wbr" => Self::Void,
            _ => Self::Content,
        }
    }

    pub fn is_metadata(self) -> bool {
        matches!(self, Self::Metadata)
    }

    /// Whether the element can never hold children.
    pub fn is_void(self) -> bool {
        matches!(self, Self::Void)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("script", ElementKind::Metadata)]
    #[case("SECTION", ElementKind::Container)]
    #[case("h3", ElementKind::Heading(3))]
    #[case("br", ElementKind::Void)]
    #[case("p", ElementKind::Content)]
    #[case("custom-element", ElementKind::Content)]
    fn test_from_tag(#[case] tag: &str, #[case] expected: ElementKind) {
        assert_eq!(ElementKind::from_tag(tag), expected);
    }
}
