use html5ever::tendril::TendrilSink;
use html5ever::{LocalName, Namespace, QualName, parse_fragment};
use markup5ever_rcdom::{Handle, NodeData, RcDom};

const HTML_NAMESPACE: &str = "http://www.w3.org/1999/xhtml";

/// Reduce HTML-flavoured subtitle text to its visible content.
///
/// The text is parsed as a `<body>` fragment and only its text nodes are
/// kept, so tags and comments disappear and every HTML5 character reference
/// is decoded. ASS override blocks like `{\i1}` are plain text to the parser
/// and pass through.
pub fn strip_markup(text: &str) -> String {
    let context = QualName::new(None, Namespace::from(HTML_NAMESPACE), LocalName::from("body"));
    let dom = parse_fragment(RcDom::default(), Default::default(), context, Vec::new()).one(text);

    let mut visible = String::new();
    collect_text(&dom.document, &mut visible);
    visible
}

fn collect_text(node: &Handle, out: &mut String) {
    if let NodeData::Text { ref contents } = node.data {
        out.push_str(&contents.borrow());
    }
    for child in node.children.borrow().iter() {
        collect_text(child, out);
    }
}
