//! 敘述文字的 markdown 呈現。
//!
//! 解析成區塊 / 行內元素後，以固定的 class 對應輸出 HTML。只支援分析敘述
//! 會用到的語法：ATX 與 setext 標題、段落、清單、表格、程式碼區塊、引言、
//! 分隔線，以及粗體、斜體、行內程式碼與連結。

use regex::Regex;
use std::collections::HashMap;
use std::sync::LazyLock;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Inline {
    Text(String),
    Strong(Vec<Inline>),
    Emphasis(Vec<Inline>),
    Code(String),
    Link { text: Vec<Inline>, href: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Block {
    Heading { level: u8, content: Vec<Inline> },
    Paragraph(Vec<Inline>),
    List { ordered: bool, items: Vec<Vec<Inline>> },
    Table {
        header: Vec<Vec<Inline>>,
        rows: Vec<Vec<Vec<Inline>>>,
    },
    CodeBlock { language: Option<String>, code: String },
    Quote(Vec<Inline>),
    Rule,
}

static INLINE_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"\*\*(.+?)\*\*|__(.+?)__|`([^`]+)`|\[([^\]]+)\]\(((?:[^()\s]|\([^()\s]*\))+)\)|\*([^*\s](?:[^*]*?[^*\s])?)\*",
    )
    .expect("inline markdown pattern is valid")
});

static ORDERED_ITEM: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\d+[.)]\s+(.*)$").expect("ordered item pattern is valid"));

/// 整段敘述被 ```markdown 包起來時取出內容
pub fn unwrap_fence(narrative: &str) -> &str {
    let trimmed = narrative.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return narrative;
    };

    let (info, body) = rest.split_once('\n').unwrap_or((rest, ""));
    if !matches!(info.trim(), "" | "markdown" | "md") {
        return narrative;
    }

    let body = body.trim_end();
    body.strip_suffix("```").unwrap_or(body)
}

pub fn parse_inlines(text: &str) -> Vec<Inline> {
    let mut out = Vec::new();
    let mut last = 0;

    for caps in INLINE_PATTERN.captures_iter(text) {
        let Some(whole) = caps.get(0) else { continue };
        if whole.start() > last {
            out.push(Inline::Text(text[last..whole.start()].to_string()));
        }

        let inline = if let Some(m) = caps.get(1).or_else(|| caps.get(2)) {
            Inline::Strong(parse_inlines(m.as_str()))
        } else if let Some(m) = caps.get(3) {
            Inline::Code(m.as_str().to_string())
        } else if let (Some(label), Some(href)) = (caps.get(4), caps.get(5)) {
            Inline::Link {
                text: parse_inlines(label.as_str()),
                href: href.as_str().to_string(),
            }
        } else if let Some(m) = caps.get(6) {
            Inline::Emphasis(parse_inlines(m.as_str()))
        } else {
            Inline::Text(whole.as_str().to_string())
        };

        out.push(inline);
        last = whole.end();
    }

    if last < text.len() {
        out.push(Inline::Text(text[last..].to_string()));
    }
    out
}

fn atx_heading(line: &str) -> Option<(u8, &str)> {
    let hashes = line.chars().take_while(|c| *c == '#').count();
    if hashes == 0 || hashes > 6 {
        return None;
    }
    let rest = &line[hashes..];
    if !rest.is_empty() && !rest.starts_with(' ') {
        return None;
    }
    Some((hashes as u8, rest.trim().trim_end_matches('#').trim_end()))
}

fn setext_level(line: &str) -> Option<u8> {
    if !line.is_empty() && line.chars().all(|c| c == '=') {
        Some(1)
    } else if !line.is_empty() && line.chars().all(|c| c == '-') {
        Some(2)
    } else {
        None
    }
}

fn is_rule(line: &str) -> bool {
    let compact: String = line.chars().filter(|c| !c.is_whitespace()).collect();
    compact.len() >= 3
        && ['-', '*', '_']
            .iter()
            .any(|marker| compact.chars().all(|c| c == *marker))
}

/// 回傳 (是否有序, 項目內容)
fn list_item(line: &str) -> Option<(bool, &str)> {
    for marker in ["* ", "- ", "+ "] {
        if let Some(rest) = line.strip_prefix(marker) {
            return Some((false, rest.trim()));
        }
    }
    ORDERED_ITEM
        .captures(line)
        .and_then(|caps| caps.get(1))
        .map(|m| (true, m.as_str().trim()))
}

fn starts_block(line: &str) -> bool {
    line.starts_with('#')
        || line.starts_with("```")
        || line.starts_with('|')
        || line.starts_with('>')
        || is_rule(line)
        || list_item(line).is_some()
}

fn table_cells(line: &str) -> Vec<&str> {
    let inner = line.trim().trim_start_matches('|');
    let inner = inner.strip_suffix('|').unwrap_or(inner);
    inner.split('|').map(str::trim).collect()
}

fn is_separator_row(cells: &[&str]) -> bool {
    !cells.is_empty()
        && cells.iter().all(|cell| {
            let core = cell.trim_matches(':');
            !core.is_empty() && core.chars().all(|c| c == '-')
        })
}

pub fn parse_blocks(text: &str) -> Vec<Block> {
    let lines: Vec<&str> = text.lines().collect();
    let mut blocks = Vec::new();
    let mut paragraph: Vec<&str> = Vec::new();
    let mut i = 0;

    fn flush(paragraph: &mut Vec<&str>, blocks: &mut Vec<Block>) {
        if !paragraph.is_empty() {
            blocks.push(Block::Paragraph(parse_inlines(&paragraph.join(" "))));
            paragraph.clear();
        }
    }

    while i < lines.len() {
        let line = lines[i].trim();

        if line.is_empty() {
            flush(&mut paragraph, &mut blocks);
            i += 1;
            continue;
        }

        if let Some(info) = line.strip_prefix("```") {
            flush(&mut paragraph, &mut blocks);
            let language = Some(info.trim().to_string()).filter(|l| !l.is_empty());
            let mut code = Vec::new();
            i += 1;
            while i < lines.len() && !lines[i].trim_start().starts_with("```") {
                code.push(lines[i]);
                i += 1;
            }
            // 跳過結尾的 ```
            i += 1;
            blocks.push(Block::CodeBlock {
                language,
                code: code.join("\n"),
            });
            continue;
        }

        if !paragraph.is_empty() {
            if let Some(level) = setext_level(line) {
                let content = parse_inlines(&paragraph.join(" "));
                paragraph.clear();
                blocks.push(Block::Heading { level, content });
                i += 1;
                continue;
            }
        }

        if is_rule(line) {
            flush(&mut paragraph, &mut blocks);
            blocks.push(Block::Rule);
            i += 1;
            continue;
        }

        if let Some((level, content)) = atx_heading(line) {
            flush(&mut paragraph, &mut blocks);
            blocks.push(Block::Heading {
                level,
                content: parse_inlines(content),
            });
            i += 1;
            continue;
        }

        if line.starts_with('|') {
            flush(&mut paragraph, &mut blocks);
            let mut rows: Vec<Vec<&str>> = Vec::new();
            while i < lines.len() && lines[i].trim().starts_with('|') {
                rows.push(table_cells(lines[i]));
                i += 1;
            }

            let parse_row =
                |cells: &[&str]| -> Vec<Vec<Inline>> { cells.iter().map(|c| parse_inlines(c)).collect() };

            let (header, body) = if rows.len() >= 2 && is_separator_row(&rows[1]) {
                (parse_row(&rows[0]), &rows[2..])
            } else {
                (Vec::new(), &rows[..])
            };
            blocks.push(Block::Table {
                header,
                rows: body.iter().map(|r| parse_row(r)).collect(),
            });
            continue;
        }

        if line.starts_with('>') {
            flush(&mut paragraph, &mut blocks);
            let mut quoted = Vec::new();
            while i < lines.len() && lines[i].trim().starts_with('>') {
                quoted.push(lines[i].trim().trim_start_matches('>').trim());
                i += 1;
            }
            blocks.push(Block::Quote(parse_inlines(&quoted.join(" "))));
            continue;
        }

        if let Some((ordered, first)) = list_item(line) {
            flush(&mut paragraph, &mut blocks);
            let mut items: Vec<String> = vec![first.to_string()];
            i += 1;

            while i < lines.len() {
                let next = lines[i].trim();
                if next.is_empty() {
                    // 空行後若還是同類項目就視為同一個清單
                    let following = lines[i + 1..].iter().map(|l| l.trim()).find(|l| !l.is_empty());
                    match following.and_then(list_item) {
                        Some((o, _)) if o == ordered => {
                            i += 1;
                            continue;
                        }
                        _ => break,
                    }
                }
                match list_item(next) {
                    Some((o, content)) if o == ordered => {
                        items.push(content.to_string());
                        i += 1;
                    }
                    Some(_) => break,
                    None if starts_block(next) => break,
                    None => {
                        if let Some(last) = items.last_mut() {
                            last.push(' ');
                            last.push_str(next);
                        }
                        i += 1;
                    }
                }
            }

            blocks.push(Block::List {
                ordered,
                items: items.iter().map(|item| parse_inlines(item)).collect(),
            });
            continue;
        }

        paragraph.push(line);
        i += 1;
    }

    flush(&mut paragraph, &mut blocks);
    blocks
}

/// 各元素固定使用的 class
#[derive(Debug, Clone)]
pub struct StyleMap {
    classes: HashMap<&'static str, &'static str>,
}

impl Default for StyleMap {
    fn default() -> Self {
        let classes = HashMap::from([
            ("h1", "text-xl font-bold text-white mt-6 mb-4"),
            ("h2", "text-lg font-semibold text-blue-400 mt-6 mb-3"),
            ("h3", "text-base font-semibold text-blue-300 mt-4 mb-2"),
            ("h4", "text-sm font-semibold text-blue-300 mt-4 mb-2"),
            ("h5", "text-sm font-semibold text-gray-200 mt-4 mb-2"),
            ("h6", "text-xs font-semibold text-gray-300 mt-4 mb-2"),
            ("p", "text-gray-300 mb-4"),
            ("ul", "space-y-2 mb-4"),
            ("ol", "list-decimal space-y-2 mb-4 pl-6"),
            ("li", "text-gray-300 flex items-start"),
            ("bullet", "text-blue-500 mr-2"),
            ("strong", "text-blue-300"),
            ("em", "italic text-gray-200"),
            ("code", "px-1 rounded bg-white/10 text-blue-200"),
            ("pre", "p-4 rounded-lg bg-black/40 overflow-x-auto mb-4"),
            ("table", "w-full text-sm mb-4 border-collapse"),
            ("th", "text-left text-gray-400 border-b border-white/10 p-2"),
            ("td", "text-gray-300 border-b border-white/5 p-2"),
            ("blockquote", "border-l-4 border-blue-500 pl-4 text-gray-400 mb-4"),
            ("hr", "my-6 border-white/10"),
            ("a", "text-blue-400 underline"),
        ]);
        Self { classes }
    }
}

impl StyleMap {
    pub fn class(&self, element: &str) -> &str {
        self.classes.get(element).copied().unwrap_or_default()
    }

    fn open(&self, tag: &str) -> String {
        match self.class(tag) {
            "" => format!("<{}>", tag),
            class => format!("<{} class=\"{}\">", tag, class),
        }
    }
}

pub fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(ch),
        }
    }
    out
}

/// 只允許 http、https、mailto 與相對路徑
fn is_safe_href(href: &str) -> bool {
    let scheme_end = href.find(':');
    let path_start = href.find(['/', '?', '#']);
    match (scheme_end, path_start) {
        (None, _) => true,
        (Some(colon), Some(path)) if path < colon => true,
        (Some(colon), _) => matches!(
            href[..colon].to_ascii_lowercase().as_str(),
            "http" | "https" | "mailto"
        ),
    }
}

fn render_inlines(inlines: &[Inline], styles: &StyleMap, out: &mut String) {
    for inline in inlines {
        match inline {
            Inline::Text(text) => out.push_str(&escape_html(text)),
            Inline::Strong(children) => {
                out.push_str(&styles.open("strong"));
                render_inlines(children, styles, out);
                out.push_str("</strong>");
            }
            Inline::Emphasis(children) => {
                out.push_str(&styles.open("em"));
                render_inlines(children, styles, out);
                out.push_str("</em>");
            }
            Inline::Code(code) => {
                out.push_str(&styles.open("code"));
                out.push_str(&escape_html(code));
                out.push_str("</code>");
            }
            Inline::Link { text, href } if !is_safe_href(href) => {
                tracing::debug!("Dropping link with disallowed target: {}", href);
                render_inlines(text, styles, out);
            }
            Inline::Link { text, href } => {
                out.push_str(&format!(
                    "<a class=\"{}\" href=\"{}\">",
                    styles.class("a"),
                    escape_html(href)
                ));
                render_inlines(text, styles, out);
                out.push_str("</a>");
            }
        }
    }
}

pub fn render_html(blocks: &[Block], styles: &StyleMap) -> String {
    let mut out = String::new();

    for block in blocks {
        match block {
            Block::Heading { level, content } => {
                let tag = format!("h{}", level);
                out.push_str(&styles.open(&tag));
                render_inlines(content, styles, &mut out);
                out.push_str(&format!("</{}>\n", tag));
            }
            Block::Paragraph(content) => {
                out.push_str(&styles.open("p"));
                render_inlines(content, styles, &mut out);
                out.push_str("</p>\n");
            }
            Block::List { ordered, items } => {
                let tag = if *ordered { "ol" } else { "ul" };
                out.push_str(&styles.open(tag));
                out.push('\n');
                for item in items {
                    out.push_str(&styles.open("li"));
                    if !ordered {
                        out.push_str(&format!(
                            "<span class=\"{}\">•</span>",
                            styles.class("bullet")
                        ));
                    }
                    render_inlines(item, styles, &mut out);
                    out.push_str("</li>\n");
                }
                out.push_str(&format!("</{}>\n", tag));
            }
            Block::Table { header, rows } => {
                out.push_str(&styles.open("table"));
                out.push('\n');
                if !header.is_empty() {
                    out.push_str("<thead><tr>");
                    for cell in header {
                        out.push_str(&styles.open("th"));
                        render_inlines(cell, styles, &mut out);
                        out.push_str("</th>");
                    }
                    out.push_str("</tr></thead>\n");
                }
                out.push_str("<tbody>\n");
                for row in rows {
                    out.push_str("<tr>");
                    for cell in row {
                        out.push_str(&styles.open("td"));
                        render_inlines(cell, styles, &mut out);
                        out.push_str("</td>");
                    }
                    out.push_str("</tr>\n");
                }
                out.push_str("</tbody>\n</table>\n");
            }
            Block::CodeBlock { language, code } => {
                out.push_str(&styles.open("pre"));
                match language {
                    Some(lang) => out.push_str(&format!(
                        "<code class=\"language-{}\">",
                        escape_html(lang)
                    )),
                    None => out.push_str("<code>"),
                }
                out.push_str(&escape_html(code));
                out.push_str("</code></pre>\n");
            }
            Block::Quote(content) => {
                out.push_str(&styles.open("blockquote"));
                render_inlines(content, styles, &mut out);
                out.push_str("</blockquote>\n");
            }
            Block::Rule => {
                out.push_str(&format!("<hr class=\"{}\" />\n", styles.class("hr")));
            }
        }
    }

    out
}

/// 敘述字串 -> HTML
pub fn render_narrative(narrative: &str, styles: &StyleMap) -> String {
    render_html(&parse_blocks(unwrap_fence(narrative)), styles)
}
