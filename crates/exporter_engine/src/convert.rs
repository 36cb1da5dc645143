use ego_tree::NodeRef;
use scraper::node::Node;
use scraper::{ElementRef, Html, Selector};

pub trait Converter: Send + Sync {
    fn to_markdown(&self, html: &str) -> String;
}

/// Recursive HTML to Markdown transducer.
///
/// Every node renders to a string built from its already-rendered children,
/// then wrapped according to the [`Rule`] for its tag.
#[derive(Debug, Default, Clone, Copy)]
pub struct MarkdownConverter;

impl Converter for MarkdownConverter {
    fn to_markdown(&self, html: &str) -> String {
        let document = Html::parse_document(html);
        let body = Selector::parse("body")
            .ok()
            .and_then(|sel| document.select(&sel).next())
            .unwrap_or_else(|| document.root_element());
        render_children(*body, Mode::Flow).trim().to_string()
    }
}

/// Per-tag rendering rule; anything unknown passes its content through.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Rule {
    Heading(usize),
    Strong,
    Emphasis,
    Underline,
    Strikethrough,
    Highlight,
    InlineCode,
    Preformatted,
    Anchor,
    Image,
    Video,
    Audio,
    UnorderedList,
    OrderedList,
    ListItem,
    Table,
    Blockquote,
    HorizontalRule,
    Figure,
    Figcaption,
    Paragraph,
    LineBreak,
    Division,
    Skip,
    PassThrough,
}

impl Rule {
    fn for_tag(tag: &str) -> Self {
        match tag {
            "h1" => Rule::Heading(1),
            "h2" => Rule::Heading(2),
            "h3" => Rule::Heading(3),
            "h4" => Rule::Heading(4),
            "h5" => Rule::Heading(5),
            "h6" => Rule::Heading(6),
            "strong" | "b" => Rule::Strong,
            "em" | "i" => Rule::Emphasis,
            "u" => Rule::Underline,
            "del" | "s" | "strike" => Rule::Strikethrough,
            "mark" => Rule::Highlight,
            "code" => Rule::InlineCode,
            "pre" => Rule::Preformatted,
            "a" => Rule::Anchor,
            "img" => Rule::Image,
            "video" => Rule::Video,
            "audio" => Rule::Audio,
            "ul" => Rule::UnorderedList,
            "ol" => Rule::OrderedList,
            "li" => Rule::ListItem,
            "table" => Rule::Table,
            "blockquote" => Rule::Blockquote,
            "hr" => Rule::HorizontalRule,
            "figure" => Rule::Figure,
            "figcaption" => Rule::Figcaption,
            "p" => Rule::Paragraph,
            "br" => Rule::LineBreak,
            "div" => Rule::Division,
            "script" | "style" | "noscript" | "template" => Rule::Skip,
            _ => Rule::PassThrough,
        }
    }
}

/// Text inside `<pre>` keeps its whitespace and is not decorated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mode {
    Flow,
    Preformatted,
}

fn render_node(node: NodeRef<'_, Node>, mode: Mode) -> String {
    match node.value() {
        Node::Text(text) => match mode {
            Mode::Flow => collapse_whitespace(text),
            Mode::Preformatted => text.to_string(),
        },
        Node::Element(_) => match ElementRef::wrap(node) {
            Some(element) => render_element(element, mode),
            None => String::new(),
        },
        Node::Document | Node::Fragment => render_children(node, mode),
        _ => String::new(),
    }
}

fn render_children(node: NodeRef<'_, Node>, mode: Mode) -> String {
    node.children().map(|child| render_node(child, mode)).collect()
}

fn render_element(element: ElementRef<'_>, mode: Mode) -> String {
    let tag = element.value().name().to_ascii_lowercase();
    let rule = Rule::for_tag(&tag);
    let attr = |name: &str| element.value().attr(name).unwrap_or("").trim().to_string();

    if mode == Mode::Preformatted && rule != Rule::LineBreak {
        return render_children(*element, mode);
    }

    match rule {
        Rule::Skip => String::new(),
        Rule::Preformatted => {
            let code = render_children(*element, Mode::Preformatted);
            format!("\n```\n{}\n```\n", code.trim_matches('\n'))
        }
        Rule::UnorderedList => render_list(element, |_| "- ".to_string()),
        Rule::OrderedList => {
            let start = element
                .value()
                .attr("start")
                .and_then(|s| s.trim().parse::<usize>().ok())
                .unwrap_or(1);
            render_list(element, move |i| format!("{}. ", start + i))
        }
        Rule::Table => render_table(element),
        Rule::Image => format!("![{}]({})", attr("alt"), attr("src")),
        Rule::Video => media_link("Video", &attr("src")),
        Rule::Audio => media_link("Audio", &attr("src")),
        Rule::LineBreak => match mode {
            Mode::Flow => "  \n".to_string(),
            Mode::Preformatted => "\n".to_string(),
        },
        Rule::HorizontalRule => "\n---\n".to_string(),
        _ => {
            let content = render_children(*element, mode);
            let trimmed = content.trim();
            match rule {
                Rule::Heading(level) => format!("{} {}\n\n", "#".repeat(level), trimmed),
                Rule::Strong => format!("**{trimmed}**"),
                Rule::Emphasis => format!("*{trimmed}*"),
                Rule::Underline => format!("<u>{trimmed}</u>"),
                Rule::Strikethrough => format!("~~{trimmed}~~"),
                Rule::Highlight => format!("=={trimmed}=="),
                Rule::InlineCode => format!("`{trimmed}`"),
                Rule::Anchor => format!("[{}]({})", trimmed, attr("href")),
                Rule::ListItem => trimmed.to_string(),
                Rule::Blockquote => format!("\n> {}\n", trimmed.replace('\n', "\n> ")),
                Rule::Figure => format!("\n{trimmed}\n"),
                Rule::Figcaption => format!("\n*{trimmed}*\n"),
                Rule::Paragraph => format!("{trimmed}\n\n"),
                Rule::Division => format!("{content}\n"),
                _ => content,
            }
        }
    }
}

fn media_link(label: &str, src: &str) -> String {
    if src.is_empty() {
        String::new()
    } else {
        format!("[{label}]({src})")
    }
}

/// One line per child element; continuation lines are indented under the marker.
fn render_list(list: ElementRef<'_>, marker: impl Fn(usize) -> String) -> String {
    let items: Vec<String> = list
        .children()
        .filter_map(ElementRef::wrap)
        .enumerate()
        .map(|(i, item)| {
            let marker = marker(i);
            let indent = " ".repeat(marker.len());
            let body = render_node(*item, Mode::Flow);
            let body = body.trim();
            let mut lines = body.lines();
            let mut out = format!("{marker}{}", lines.next().unwrap_or(""));
            for line in lines {
                out.push('\n');
                if !line.is_empty() {
                    out.push_str(&indent);
                    out.push_str(line);
                }
            }
            out
        })
        .collect();
    format!("\n{}\n", items.join("\n"))
}

fn render_table(table: ElementRef<'_>) -> String {
    let rows: Vec<String> = Selector::parse("tr")
        .map(|sel| {
            table
                .select(&sel)
                .enumerate()
                .map(|(idx, row)| {
                    let cells: Vec<String> = row
                        .children()
                        .filter_map(ElementRef::wrap)
                        .map(|cell| {
                            render_node(*cell, Mode::Flow)
                                .trim()
                                .replace('\n', " ")
                        })
                        .collect();
                    let line = format!("| {} |", cells.join(" | "));
                    if idx == 0 {
                        let separator = vec!["---"; cells.len()].join(" | ");
                        format!("{line}\n| {separator} |")
                    } else {
                        line
                    }
                })
                .collect()
        })
        .unwrap_or_default();
    format!("\n{}\n\n", rows.join("\n"))
}

/// Replaces every whitespace run with a single space.
fn collapse_whitespace(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut in_space = false;
    for ch in text.chars() {
        if ch.is_whitespace() {
            if !in_space {
                out.push(' ');
            }
            in_space = true;
        } else {
            out.push(ch);
            in_space = false;
        }
    }
    out
}
