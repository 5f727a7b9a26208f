//! Conversion of extracted pages into the content handed to summarization.

use super::types::{ContentFormat, ConvertedContent, DocumentType};

/// Slide titles that mark a page worth keeping.
pub const HIGH_PRIORITY_PAGE_KEYWORDS: [&str; 15] = [
    "背景",
    "現状",
    "課題",
    "問題",
    "方向性",
    "戦略",
    "ロードマップ",
    "施策",
    "取組",
    "予算",
    "スケジュール",
    "目標",
    "kpi",
    "実績",
    "成果",
];

/// Slide titles that mark a page to skip.
pub const LOW_PRIORITY_PAGE_KEYWORDS: [&str; 9] = [
    "表紙", "目次", "参考", "補足", "用語集", "組織図", "名簿", "免責", "注記",
];

const LEADING_PAGES: usize = 5;

/// Produce converted content for a classified document.
///
/// Slide decks are condensed to their important pages; everything else keeps the full text.
pub fn convert(document_type: DocumentType, pages: &[String]) -> ConvertedContent {
    match document_type {
        DocumentType::PowerpointLike => {
            let important_pages = important_pages(pages);
            ConvertedContent {
                format: ContentFormat::Markdown,
                text: render_markdown(pages, &important_pages),
                important_pages,
            }
        }
        _ => ConvertedContent {
            format: ContentFormat::Text,
            text: pages.join("\n"),
            important_pages: Vec::new(),
        },
    }
}

fn non_blank_lines(page: &str) -> impl Iterator<Item = &str> {
    page.lines().map(str::trim).filter(|line| !line.is_empty())
}

/// 1-based pages whose title lines hit a high-priority keyword, plus the first five pages.
///
/// A low-priority title excludes the page even within the first five. Falls back to the first
/// five pages when nothing qualifies.
pub fn important_pages(pages: &[String]) -> Vec<usize> {
    let mut important: Vec<usize> = pages
        .iter()
        .enumerate()
        .filter_map(|(index, page)| {
            let heading: Vec<&str> = non_blank_lines(page).take(2).collect();
            if heading.is_empty() {
                return None;
            }
            let heading = heading.join(" ").to_lowercase();
            let number = index + 1;
            if LOW_PRIORITY_PAGE_KEYWORDS.iter().any(|k| heading.contains(k)) {
                None
            } else if HIGH_PRIORITY_PAGE_KEYWORDS.iter().any(|k| heading.contains(k))
                || number <= LEADING_PAGES
            {
                Some(number)
            } else {
                None
            }
        })
        .collect();
    if important.is_empty() {
        important = (1..=pages.len().min(LEADING_PAGES)).collect();
    }
    important
}

/// Markdown excerpt with one `## Page N: <title>` section per kept page.
pub fn render_markdown(pages: &[String], important_pages: &[usize]) -> String {
    let listed = important_pages
        .iter()
        .map(usize::to_string)
        .collect::<Vec<_>>()
        .join(", ");
    let mut out = vec![
        "# 重要ページ抜粋".to_string(),
        String::new(),
        format!("- 抽出ページ: {listed}"),
        String::new(),
    ];
    for &number in important_pages {
        let Some(page) = number.checked_sub(1).and_then(|index| pages.get(index)) else {
            continue;
        };
        let title = non_blank_lines(page)
            .next()
            .map_or_else(|| format!("Page {number}"), str::to_string);
        out.push(format!("## Page {number}: {title}"));
        out.push(String::new());
        let body: Vec<&str> = page.lines().map(str::trim_end).collect();
        out.push(body.join("\n").trim().to_string());
        out.push(String::new());
    }
    format!("{}\n", out.join("\n").trim())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn deck() -> Vec<String> {
        [
            "表紙\nデジタル政策",
            "目次\n1. 現状",
            "現状と課題\n・人材不足",
            "事例紹介\n・A市",
            "補足資料\n・用語",
            "今後のスケジュール\n・2025年度",
            "事例紹介その2\n・B市",
        ]
        .iter()
        .map(|page| page.to_string())
        .collect()
    }

    #[test]
    fn keeps_leading_and_keyword_pages_but_skips_low_priority() {
        assert_eq!(important_pages(&deck()), vec![3, 4, 6]);
    }

    #[test]
    fn falls_back_to_first_pages() {
        let pages: Vec<String> = vec!["表紙".into(), "目次".into()];
        assert_eq!(important_pages(&pages), vec![1, 2]);
    }

    #[test]
    fn slide_decks_become_markdown_excerpts() {
        let content = convert(DocumentType::PowerpointLike, &deck());
        assert_eq!(content.format, ContentFormat::Markdown);
        assert!(content.text.starts_with("# 重要ページ抜粋\n\n- 抽出ページ: 3, 4, 6\n"));
        assert!(content.text.contains("## Page 3: 現状と課題\n\n現状と課題\n・人材不足"));
        assert!(!content.text.contains("表紙"));
    }

    #[test]
    fn other_types_keep_full_text() {
        let content = convert(DocumentType::WordLike, &deck());
        assert_eq!(content.format, ContentFormat::Text);
        assert!(content.text.contains("表紙"));
        assert!(content.important_pages.is_empty());
    }
}
